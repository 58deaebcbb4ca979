//! digitnet Model
//!
//! Two-layer dense network weights, quantization to 8-bit fixed-point and
//! export of the quantized constants for a microcontroller build.

mod config;
mod error;
mod export;
mod loader;
mod network;
mod quantizer;
mod weights;

pub use config::{NetworkConfig, IMG_BITS};
pub use error::{ModelError, Result};
pub use export::{render_header, write_header};
pub use loader::{load_quantized, save_quantized, serialize_quantized, SafetensorsLoader};
pub use network::QuantizedNetwork;
pub use quantizer::Quantizer;
pub use weights::{DenseLayer, FloatNetwork};
