//! Floating-point forward pass for accuracy comparison

use digitnet_engine::{argmax, softmax, InputImage};
use digitnet_model::FloatNetwork;

use crate::error::Result;

/// Class and probabilities from the float model
#[derive(Debug, Clone, PartialEq)]
pub struct FloatPrediction {
    pub class: usize,
    pub probabilities: Vec<f64>,
}

/// The trained float network the quantized model was derived from
pub struct FloatReference<'a> {
    network: &'a FloatNetwork,
}

impl<'a> FloatReference<'a> {
    pub fn new(network: &'a FloatNetwork) -> Self {
        Self { network }
    }

    pub fn predict(&self, image: &InputImage) -> Result<FloatPrediction> {
        let logits: Vec<f64> = self
            .network
            .forward(image.pixels())?
            .into_iter()
            .map(f64::from)
            .collect();
        let probabilities = softmax(&logits);
        Ok(FloatPrediction {
            class: argmax(&probabilities),
            probabilities,
        })
    }
}
