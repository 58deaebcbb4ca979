//! Fixed-point scalar type and sign-aware rescaling

/// A fixed-point number represented as i32 with an implicit scaling factor 2^frac_bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixed {
    /// The raw integer value
    pub raw: i32,
    /// Fractional bit count (value represents raw / 2^frac_bits)
    pub frac_bits: i32,
}

impl Fixed {
    /// Create a new fixed-point value from raw integer and fractional bit count
    pub fn from_raw(raw: i32, frac_bits: i32) -> Self {
        Self { raw, frac_bits }
    }

    /// Convert back to floating-point
    pub fn to_f64(self) -> f64 {
        self.raw as f64 / 2f64.powi(self.frac_bits)
    }
}

/// Shift a signed accumulator by `amount` bits.
///
/// Positive amounts are an arithmetic (sign-preserving) right shift; amounts of
/// 32 or more collapse to `0` or `-1` exactly as repeated shifting would.
/// Negative amounts shift left, saturating at the i32 range.
pub fn rescale(value: i32, amount: i32) -> i32 {
    if amount >= 0 {
        value >> amount.min(31)
    } else {
        let n = amount.unsigned_abs().min(32);
        let widened = (value as i64) << n;
        widened.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

/// Rescale amount that brings `input_bits + weight_bits` fractional bits of a
/// product down to `bias_bits`.
pub fn layer_shift(input_bits: i32, weight_bits: i32, bias_bits: i32) -> i32 {
    input_bits + weight_bits - bias_bits
}
