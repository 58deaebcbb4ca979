//! Fixed-point error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FixedPointError {
    #[error("Degenerate tensor: all {len} elements are zero, no fractional bit count exists")]
    DegenerateTensor { len: usize },

    #[error("Range exceeded: max |x| = {max_abs} needs shift {shift}, values do not fit in 8 bits")]
    RangeExceeded { max_abs: f64, shift: i32 },

    #[error("Rounding overflow at element {index}: {value} * 2^{shift} rounds to {rounded}, outside [-127, 127]")]
    RoundingOverflow {
        index: usize,
        value: f64,
        rounded: i64,
        shift: i32,
    },

    #[error("Non-finite value at element {index}")]
    NonFinite { index: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid shift: {0} (must be 0-30)")]
    InvalidShift(i32),
}

pub type Result<T> = std::result::Result<T, FixedPointError>;
