//! Forward inference over a quantized model

use digitnet_fixed_point::Fixed;
use digitnet_model::QuantizedNetwork;

use crate::activation::{argmax, relu_in_place, softmax};
use crate::dense::dense_layer;
use crate::error::{EngineError, Result};
use crate::image::InputImage;

/// Intermediate and final integer vectors of one forward pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activations {
    /// Layer-1 output after ReLU, `hidden_bits` fractional bits
    pub hidden: Vec<i32>,
    /// Layer-2 pre-activation logits, `logit_bits` fractional bits
    pub logits: Vec<i32>,
    pub hidden_bits: i32,
    pub logit_bits: i32,
}

/// Predicted class with the logits it was chosen from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub class: usize,
    pub logits: Vec<i32>,
    pub logit_bits: i32,
}

impl Prediction {
    /// Logits as real numbers
    pub fn logit_values(&self) -> Vec<f64> {
        self.logits
            .iter()
            .map(|&raw| Fixed::from_raw(raw, self.logit_bits).to_f64())
            .collect()
    }

    /// Class probabilities; only meaningful on a host with floating point
    pub fn probabilities(&self) -> Vec<f64> {
        softmax(&self.logit_values())
    }
}

/// The device inference algorithm bound to one model
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    network: &'a QuantizedNetwork,
}

impl<'a> Engine<'a> {
    pub fn new(network: &'a QuantizedNetwork) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &'a QuantizedNetwork {
        self.network
    }

    /// Run both layers. Layer 2 only starts once every hidden unit is final.
    pub fn forward(&self, image: &InputImage) -> Result<Activations> {
        let net = self.network;
        if image.len() != net.input_size() {
            return Err(EngineError::DimensionMismatch {
                expected: net.input_size(),
                got: image.len(),
            });
        }

        let mut hidden = dense_layer(
            net.l1_weights(),
            net.l1_bias(),
            &image.to_i32(),
            net.layer1_rescale(),
        );
        relu_in_place(&mut hidden);

        let logits = dense_layer(net.l2_weights(), net.l2_bias(), &hidden, net.layer2_rescale());

        Ok(Activations {
            hidden,
            logits,
            hidden_bits: net.l1_bias().shift(),
            logit_bits: net.l2_bias().shift(),
        })
    }

    /// Classify one image by hard-max over the logits
    pub fn predict(&self, image: &InputImage) -> Result<Prediction> {
        let activations = self.forward(image)?;
        let class = argmax(&activations.logits);
        tracing::trace!(class, logits = ?activations.logits, "prediction");
        Ok(Prediction {
            class,
            logits: activations.logits,
            logit_bits: activations.logit_bits,
        })
    }
}
