//! Quantized 8-bit tensors with a per-tensor fractional bit count

use crate::error::{FixedPointError, Result};
use crate::shift::{fractional_bits, OverflowPolicy};

/// A dense i8 tensor whose elements carry `shift` implicit fractional bits.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedTensor {
    data: Vec<i8>,
    shape: Vec<usize>,
    shift: i32,
}

impl QuantizedTensor {
    /// Wrap already-quantized data
    pub fn from_raw(data: Vec<i8>, shape: Vec<usize>, shift: i32) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(FixedPointError::DimensionMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { data, shape, shift })
    }

    /// Quantize floating-point values, choosing the shift from the tensor's range
    pub fn quantize(values: &[f32], shape: &[usize], policy: OverflowPolicy) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(FixedPointError::DimensionMismatch {
                expected,
                got: values.len(),
            });
        }

        let shift = fractional_bits(values)?;
        let data = match (quantize_at(values, shift, false), policy) {
            (Ok(data), _) => data,
            (Err(err), OverflowPolicy::Reject) => return Err(err),
            (Err(_), OverflowPolicy::Clamp) => quantize_at(values, shift, true)?,
            (Err(_), OverflowPolicy::ReduceShift) => {
                let reduced = shift - 1;
                if reduced < 0 {
                    return Err(FixedPointError::RangeExceeded {
                        max_abs: max_abs(values),
                        shift: reduced,
                    });
                }
                tracing::debug!(shift, reduced, "rounding overflow, dropping one fractional bit");
                return Ok(Self {
                    data: quantize_at(values, reduced, false)?,
                    shape: shape.to_vec(),
                    shift: reduced,
                });
            }
        };

        Ok(Self {
            data,
            shape: shape.to_vec(),
            shift,
        })
    }

    /// Raw i8 values, row-major over `shape`
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Fractional bit count shared by every element
    pub fn shift(&self) -> i32 {
        self.shift
    }

    /// Convert back to floating-point
    pub fn dequantize(&self) -> Vec<f64> {
        let scale_factor = 2f64.powi(self.shift);
        self.data.iter().map(|&q| q as f64 / scale_factor).collect()
    }

    /// Worst-case absolute rounding error of an element: 2^(-shift-1)
    pub fn max_quantization_error(&self) -> f64 {
        2f64.powi(-self.shift - 1)
    }

    /// Element count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn max_abs(values: &[f32]) -> f64 {
    values.iter().fold(0.0f64, |m, &v| m.max((v as f64).abs()))
}

/// Scale by 2^shift and round half to even; magnitudes of 128 or more are
/// either saturated to 127 or reported.
fn quantize_at(values: &[f32], shift: i32, saturate: bool) -> Result<Vec<i8>> {
    let scale_factor = 2f64.powi(shift);
    values
        .iter()
        .enumerate()
        .map(|(index, &v)| {
            let rounded = (v as f64 * scale_factor).round_ties_even() as i64;
            if rounded.abs() <= 127 {
                Ok(rounded as i8)
            } else if saturate {
                Ok(rounded.clamp(-127, 127) as i8)
            } else {
                Err(FixedPointError::RoundingOverflow {
                    index,
                    value: v as f64,
                    rounded,
                    shift,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_basic() {
        let t = QuantizedTensor::quantize(&[0.1, -0.3, 0.25], &[3], OverflowPolicy::Reject)
            .unwrap();
        assert_eq!(t.shift, 8);
        // 0.1*256 = 25.6 -> 26, -0.3*256 = -76.8 -> -77, 0.25*256 = 64
        assert_eq!(t.data, vec![26, -77, 64]);
    }

    #[test]
    fn test_rounding_overflow_flagged() {
        let result = QuantizedTensor::quantize(&[-2.0, 0.5, 1.9], &[3], OverflowPolicy::Reject);
        assert_eq!(
            result,
            Err(FixedPointError::RoundingOverflow {
                index: 0,
                value: -2.0,
                rounded: -128,
                shift: 6,
            })
        );
    }

    #[test]
    fn test_clamp_policy() {
        let t = QuantizedTensor::quantize(&[-2.0, 0.5, 1.9], &[3], OverflowPolicy::Clamp)
            .unwrap();
        assert_eq!(t.shift, 6);
        // 1.9*64 = 121.6 -> 122
        assert_eq!(t.data, vec![-127, 32, 122]);
    }

    #[test]
    fn test_reduce_shift_policy() {
        let t = QuantizedTensor::quantize(&[-2.0, 0.5, 1.9], &[3], OverflowPolicy::ReduceShift)
            .unwrap();
        assert_eq!(t.shift, 5);
        // 1.9*32 = 60.8 -> 61
        assert_eq!(t.data, vec![-64, 16, 61]);
    }

    #[test]
    fn test_round_up_to_boundary() {
        // 1.999 * 64 = 127.936 rounds to 128 even though max |x| < 2
        let result = QuantizedTensor::quantize(&[1.999, 0.1], &[2], OverflowPolicy::Reject);
        assert!(matches!(
            result,
            Err(FixedPointError::RoundingOverflow { index: 0, rounded: 128, .. })
        ));
    }

    #[test]
    fn test_reduce_shift_at_zero_shift() {
        let result = QuantizedTensor::quantize(&[128.0], &[1], OverflowPolicy::ReduceShift);
        assert!(matches!(
            result,
            Err(FixedPointError::RangeExceeded { shift: -1, .. })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let result = QuantizedTensor::quantize(&[0.1, 0.2], &[3], OverflowPolicy::Reject);
        assert_eq!(
            result,
            Err(FixedPointError::DimensionMismatch { expected: 3, got: 2 })
        );
    }

    #[test]
    fn test_dequantize_error_bound() {
        let values = [0.013f32, -0.41, 0.377, 0.0, -0.0051, 0.2222];
        let t = QuantizedTensor::quantize(&values, &[2, 3], OverflowPolicy::Reject).unwrap();
        let bound = t.max_quantization_error();
        for (v, d) in values.iter().zip(t.dequantize()) {
            assert!(
                (*v as f64 - d).abs() <= bound,
                "{} dequantized to {}, bound {}",
                v,
                d,
                bound
            );
        }
    }

    #[test]
    fn test_from_raw() {
        let t = QuantizedTensor::from_raw(vec![1, 2, 3, 4, 5, 6], vec![2, 3], 4).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.shift(), 4);
        assert_eq!(t.len(), 6);
        assert_eq!(
            QuantizedTensor::from_raw(vec![1], vec![2], 0),
            Err(FixedPointError::DimensionMismatch { expected: 2, got: 1 })
        );
    }
}
