//! digitnet Test Harness
//!
//! Host-side counterparts of the device: a batch reference implementation used
//! to verify the integer engine bit for bit, float-vs-fixed accuracy
//! validation, and a simulated device link for end-to-end runs.

mod config;
mod dataset;
mod device;
mod error;
mod float_reference;
mod pipeline;
mod reference;
mod transport;

pub use config::ValidationConfig;
pub use dataset::Dataset;
pub use device::{DeviceSimulator, ServeStats};
pub use error::{HarnessError, Result};
pub use float_reference::{FloatPrediction, FloatReference};
pub use pipeline::{Pipeline, ValidationReport};
pub use reference::ReferenceInference;
pub use transport::{LoopbackTransport, StreamTransport, Transport};
