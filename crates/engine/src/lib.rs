//! digitnet Fixed-Point Inference Engine
//!
//! The integer datapath that runs on the device: two 8-bit matrix-vector
//! products with 32-bit accumulators, power-of-two rescaling, bias add, ReLU
//! and a hard-max over the output logits.

mod activation;
mod dense;
mod engine;
mod error;
mod image;

pub use activation::{argmax, relu_in_place, softmax};
pub use dense::dense_layer;
pub use engine::{Activations, Engine, Prediction};
pub use error::{EngineError, Result};
pub use image::InputImage;
