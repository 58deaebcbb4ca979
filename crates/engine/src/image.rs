//! Input image with 8 implicit fractional bits per pixel

/// Flattened grayscale image; pixel `p` stands for `p / 2^IMG_BITS`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputImage {
    pixels: Vec<u8>,
}

impl InputImage {
    /// Wrap raw pixel bytes
    pub fn from_pixels(pixels: Vec<u8>) -> Self {
        Self { pixels }
    }

    /// A black image of the given length
    pub fn zeros(len: usize) -> Self {
        Self {
            pixels: vec![0; len],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixels widened to the accumulator type
    pub fn to_i32(&self) -> Vec<i32> {
        self.pixels.iter().map(|&p| p as i32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let image = InputImage::zeros(196);
        assert_eq!(image.len(), 196);
        assert!(image.to_i32().iter().all(|&p| p == 0));
    }
}
