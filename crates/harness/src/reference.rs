//! Batch reference implementation of the integer forward pass
//!
//! Works on a whole image matrix at once with 64-bit accumulators, then folds
//! each sum to 32 bits the way the device accumulator would have wrapped. The
//! rescale and bias add are also done in 64 bits and clamped back, so nothing
//! here shares arithmetic with the engine's per-neuron loop.

use digitnet_engine::{argmax, EngineError, InputImage, Prediction};
use digitnet_fixed_point::QuantizedTensor;
use digitnet_model::QuantizedNetwork;

use crate::error::Result;

/// Reference inference over a quantized model
pub struct ReferenceInference<'a> {
    network: &'a QuantizedNetwork,
}

impl<'a> ReferenceInference<'a> {
    pub fn new(network: &'a QuantizedNetwork) -> Self {
        Self { network }
    }

    /// Flatten images into a row-major `[batch, input]` matrix
    fn image_matrix(&self, images: &[InputImage]) -> Result<Vec<i64>> {
        let input_size = self.network.input_size();
        let mut matrix = Vec::with_capacity(images.len() * input_size);
        for image in images {
            if image.len() != input_size {
                return Err(EngineError::DimensionMismatch {
                    expected: input_size,
                    got: image.len(),
                }
                .into());
            }
            matrix.extend(image.pixels().iter().map(|&p| p as i64));
        }
        Ok(matrix)
    }

    /// Shift a 32-bit accumulator by `amount`, right for positive amounts and
    /// left for negative ones, clamped to the i32 range
    fn shift(acc: i32, amount: i32) -> i64 {
        let acc = acc as i64;
        if amount >= 0 {
            acc >> amount.min(63)
        } else {
            (acc << amount.unsigned_abs().min(32)).clamp(i32::MIN as i64, i32::MAX as i64)
        }
    }

    /// `inputs [batch, in] × weightsᵀ [in, out]`, rescaled, plus bias
    fn layer(
        &self,
        inputs: &[i64],
        batch: usize,
        weights: &QuantizedTensor,
        bias: &QuantizedTensor,
        shift: i32,
    ) -> Vec<i64> {
        let (out_features, in_features) = (weights.shape()[0], weights.shape()[1]);
        let mut outputs = Vec::with_capacity(batch * out_features);
        let mut wrapped = 0usize;

        for row in inputs.chunks_exact(in_features).take(batch) {
            for (w_row, &b) in weights.data().chunks_exact(in_features).zip(bias.data()) {
                let sum: i64 = w_row.iter().zip(row).map(|(&w, &x)| w as i64 * x).sum();
                if sum < i32::MIN as i64 || sum > i32::MAX as i64 {
                    wrapped += 1;
                }
                // Device accumulators are 32 bits wide
                let out = Self::shift(sum as i32, shift) + b as i64;
                outputs.push(out.clamp(i32::MIN as i64, i32::MAX as i64));
            }
        }

        if wrapped > 0 {
            tracing::warn!(wrapped, shift, "accumulator exceeded 32 bits and wrapped");
        }
        outputs
    }

    /// Classify a batch of images
    pub fn infer_batch(&self, images: &[InputImage]) -> Result<Vec<Prediction>> {
        let net = self.network;
        let batch = images.len();
        let matrix = self.image_matrix(images)?;

        let mut hidden = self.layer(
            &matrix,
            batch,
            net.l1_weights(),
            net.l1_bias(),
            net.layer1_rescale(),
        );
        for h in hidden.iter_mut() {
            *h = (*h).max(0);
        }

        let logits = self.layer(
            &hidden,
            batch,
            net.l2_weights(),
            net.l2_bias(),
            net.layer2_rescale(),
        );

        Ok(logits
            .chunks_exact(net.output_size())
            .map(|row| {
                let logits: Vec<i32> = row.iter().map(|&v| v as i32).collect();
                Prediction {
                    class: argmax(&logits),
                    logits,
                    logit_bits: net.l2_bias().shift(),
                }
            })
            .collect())
    }

    /// Classify one image
    pub fn infer(&self, image: &InputImage) -> Result<Prediction> {
        let mut predictions = self.infer_batch(std::slice::from_ref(image))?;
        predictions
            .pop()
            .ok_or_else(|| crate::HarnessError::InvalidInput("empty batch result".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digitnet_engine::Engine;
    use digitnet_fixed_point::OverflowPolicy;
    use digitnet_model::{FloatNetwork, NetworkConfig, Quantizer};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn network(seed: u64) -> QuantizedNetwork {
        let float = FloatNetwork::random(&NetworkConfig::default(), seed);
        Quantizer::new(OverflowPolicy::ReduceShift)
            .quantize(&float)
            .unwrap()
    }

    #[test]
    fn test_matches_engine() {
        let net = network(21);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let images: Vec<InputImage> = (0..32)
            .map(|_| InputImage::from_pixels((0..196).map(|_| rng.gen()).collect()))
            .collect();

        let reference = ReferenceInference::new(&net).infer_batch(&images).unwrap();
        let engine = Engine::new(&net);
        for (image, expected) in images.iter().zip(&reference) {
            assert_eq!(&engine.predict(image).unwrap(), expected);
        }
    }

    #[test]
    fn test_shift() {
        assert_eq!(ReferenceInference::shift(100, 2), 25);
        assert_eq!(ReferenceInference::shift(-7, 1), -4);
        assert_eq!(ReferenceInference::shift(-5, 40), -1);
        assert_eq!(ReferenceInference::shift(i32::MAX, 40), 0);
        assert_eq!(ReferenceInference::shift(3, -2), 12);
        assert_eq!(ReferenceInference::shift(1 << 30, -4), i32::MAX as i64);
        assert_eq!(ReferenceInference::shift(-(1 << 30), -4), i32::MIN as i64);
    }

    /// A left rescale that saturates stays at the i32 limit through the bias
    /// add instead of wrapping to the opposite sign
    #[test]
    fn test_saturated_hidden_unit() {
        let tensor = |data, shape, shift| QuantizedTensor::from_raw(data, shape, shift).unwrap();
        // layer 1 rescale = 8 + 0 - 30 = -22, layer 2 rescale = 30 + 0 - 30 = 0
        let net = QuantizedNetwork::new(
            tensor(vec![127], vec![1, 1], 0),
            tensor(vec![1], vec![1], 30),
            tensor(vec![1, -1], vec![2, 1], 0),
            tensor(vec![0, 0], vec![2], 30),
            8,
        )
        .unwrap();
        assert_eq!(net.layer1_rescale(), -22);

        let image = InputImage::from_pixels(vec![255]);
        let engine = Engine::new(&net).forward(&image).unwrap();
        assert_eq!(engine.hidden, vec![i32::MAX]);
        assert_eq!(engine.logits, vec![i32::MAX, -i32::MAX]);

        let reference = ReferenceInference::new(&net).infer(&image).unwrap();
        assert_eq!(reference.logits, engine.logits);
        assert_eq!(reference.class, 0);
    }

    #[test]
    fn test_empty_batch() {
        let net = network(1);
        assert!(ReferenceInference::new(&net).infer_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let net = network(1);
        let result = ReferenceInference::new(&net).infer(&InputImage::zeros(10));
        assert!(matches!(
            result,
            Err(crate::HarnessError::Engine(EngineError::DimensionMismatch {
                expected: 196,
                got: 10
            }))
        ));
    }
}
