//! digitnet Fixed-Point Encoding
//!
//! Per-tensor power-of-two quantization to signed 8-bit integers.
//! A value `x` with `f` fractional bits is stored as `round(x * 2^f)`.

mod error;
mod fixed;
mod shift;
mod tensor;

pub use error::{FixedPointError, Result};
pub use fixed::{layer_shift, rescale, Fixed};
pub use shift::{fractional_bits, OverflowPolicy, MAX_FRAC_BITS, SIGN_HEADROOM_BITS};
pub use tensor::QuantizedTensor;
