//! Labelled test images stored as safetensors

use std::collections::HashMap;
use std::path::Path;

use digitnet_engine::InputImage;
use digitnet_model::{ModelError, SafetensorsLoader};
use safetensors::tensor::TensorView;
use safetensors::Dtype;

use crate::error::{HarnessError, Result};

const IMAGES: &str = "test_images";
const LABELS: &str = "test_labels";

/// Images with their true digit labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub images: Vec<InputImage>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn new(images: Vec<InputImage>, labels: Vec<u8>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(HarnessError::InvalidInput(format!(
                "{} images but {} labels",
                images.len(),
                labels.len()
            )));
        }
        Ok(Self { images, labels })
    }

    /// Load `test_images` (u8 `[N, H, W]` or `[N, H*W]`) and `test_labels` (u8 `[N]`)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let loader = SafetensorsLoader::from_file(path.as_ref())?;

        let (pixels, shape) = loader.load_tensor_bytes(IMAGES, Dtype::U8)?;
        let (labels, label_shape) = loader.load_tensor_bytes(LABELS, Dtype::U8)?;

        let image_len: usize = shape.iter().skip(1).product();
        if shape.len() < 2 || image_len == 0 {
            return Err(ModelError::InvalidShape {
                expected: vec![labels.len(), 196],
                got: shape,
            }
            .into());
        }
        if label_shape != [shape[0]] {
            return Err(ModelError::InvalidShape {
                expected: vec![shape[0]],
                got: label_shape,
            }
            .into());
        }

        let images = pixels
            .chunks_exact(image_len)
            .map(|chunk| InputImage::from_pixels(chunk.to_vec()))
            .collect();

        let dataset = Self::new(images, labels)?;
        tracing::info!(
            path = %path.as_ref().display(),
            images = dataset.len(),
            image_len,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Write the dataset as flattened `[N, len]` images
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image_len = self.images.first().map_or(0, InputImage::len);
        if self.images.iter().any(|image| image.len() != image_len) {
            return Err(HarnessError::InvalidInput(
                "images have differing lengths".into(),
            ));
        }

        let pixels: Vec<u8> = self
            .images
            .iter()
            .flat_map(|image| image.pixels().iter().copied())
            .collect();
        let to_model_err = |e: safetensors::SafeTensorError| ModelError::Safetensors(e.to_string());

        let views = vec![
            (
                IMAGES,
                TensorView::new(Dtype::U8, vec![self.len(), image_len], &pixels)
                    .map_err(to_model_err)?,
            ),
            (
                LABELS,
                TensorView::new(Dtype::U8, vec![self.len()], &self.labels)
                    .map_err(to_model_err)?,
            ),
        ];
        let bytes = safetensors::serialize(views, &None::<HashMap<String, String>>)
            .map_err(to_model_err)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keep only the first `limit` images
    pub fn truncate(&mut self, limit: usize) {
        self.images.truncate(limit);
        self.labels.truncate(limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InputImage, u8)> {
        self.images.iter().zip(self.labels.iter().copied())
    }
}
