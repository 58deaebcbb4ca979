//! Fractional bit selection for a tensor

use crate::error::{FixedPointError, Result};

/// Bits available for magnitude in a signed 8-bit integer (one bit is the sign)
pub const SIGN_HEADROOM_BITS: i32 = 7;

/// Largest fractional bit count a tensor may use
pub const MAX_FRAC_BITS: i32 = 30;

/// What the quantizer does when an element rounds to a magnitude of 128.
///
/// `7 - ceil(log2(max_abs))` leaves exactly enough room for `max_abs` itself
/// only when it is not a power of two and does not round up; otherwise the
/// largest element lands on 128, which an `i8` cannot hold (or only as -128).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail with `RoundingOverflow`
    #[default]
    Reject,
    /// Saturate to [-127, 127]
    Clamp,
    /// Drop one fractional bit and quantize again
    ReduceShift,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            "reduce-shift" => Ok(Self::ReduceShift),
            other => Err(format!(
                "unknown overflow policy '{}' (expected reject, clamp or reduce-shift)",
                other
            )),
        }
    }
}

/// Number of fractional bits for a tensor: `7 - ceil(log2(max |x|))`.
pub fn fractional_bits(values: &[f32]) -> Result<i32> {
    let mut max_abs = 0.0f64;
    for (index, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(FixedPointError::NonFinite { index });
        }
        max_abs = max_abs.max((v as f64).abs());
    }

    if max_abs == 0.0 {
        return Err(FixedPointError::DegenerateTensor { len: values.len() });
    }

    let shift = SIGN_HEADROOM_BITS - max_abs.log2().ceil() as i32;
    if shift < 0 {
        return Err(FixedPointError::RangeExceeded { max_abs, shift });
    }
    if shift > MAX_FRAC_BITS {
        return Err(FixedPointError::InvalidShift(shift));
    }

    Ok(shift)
}
