//! Integer dense layer, one output neuron at a time

use digitnet_fixed_point::{rescale, QuantizedTensor};

/// `out[o] = rescale(Σ_i w[o][i] * x[i], shift) + b[o]`
///
/// `weights` is output-neuron-major (`[out, in]`), so each neuron reads one
/// contiguous row as it would from program memory. Products and sums use
/// 32-bit two's complement arithmetic, the accumulator width of the device.
/// The bias add saturates so a rescale pinned at the i32 limit keeps its sign.
pub fn dense_layer(
    weights: &QuantizedTensor,
    bias: &QuantizedTensor,
    input: &[i32],
    shift: i32,
) -> Vec<i32> {
    let in_features = input.len();

    weights
        .data()
        .chunks_exact(in_features)
        .zip(bias.data())
        .map(|(row, &b)| {
            let mut acc: i32 = 0;
            for (&w, &x) in row.iter().zip(input) {
                acc = acc.wrapping_add((w as i32).wrapping_mul(x));
            }
            rescale(acc, shift).saturating_add(b as i32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(data: Vec<i8>, shape: Vec<usize>, shift: i32) -> QuantizedTensor {
        QuantizedTensor::from_raw(data, shape, shift).unwrap()
    }

    #[test]
    fn test_dense_layer() {
        // 2 outputs, 3 inputs
        let w = tensor(vec![1, 2, 3, -1, -2, -3], vec![2, 3], 0);
        let b = tensor(vec![5, -5], vec![2], 0);
        let out = dense_layer(&w, &b, &[10, 20, 30], 2);
        // 140 >> 2 = 35, -140 >> 2 = -35
        assert_eq!(out, vec![40, -40]);
    }

    #[test]
    fn test_negative_shift_scales_up() {
        let w = tensor(vec![3], vec![1, 1], 0);
        let b = tensor(vec![1], vec![1], 0);
        assert_eq!(dense_layer(&w, &b, &[5], -2), vec![61]);
    }

    #[test]
    fn test_saturated_shift_keeps_sign_through_bias() {
        // 127 * 255 << 22 exceeds i32::MAX
        let w = tensor(vec![127], vec![1, 1], 0);
        let b = tensor(vec![1], vec![1], 0);
        assert_eq!(dense_layer(&w, &b, &[255], -22), vec![i32::MAX]);

        let w = tensor(vec![-127], vec![1, 1], 0);
        let b = tensor(vec![-1], vec![1], 0);
        assert_eq!(dense_layer(&w, &b, &[255], -22), vec![i32::MIN]);
    }

    #[test]
    fn test_arithmetic_shift_floors_negative() {
        let w = tensor(vec![-1], vec![1, 1], 0);
        let b = tensor(vec![0], vec![1], 0);
        // -3 >> 1 = -2 (not -1)
        assert_eq!(dense_layer(&w, &b, &[3], 1), vec![-2]);
    }

    #[test]
    fn test_full_range_accumulator() {
        // 196 products of -128 * 255 need more than 16 bits
        let w = tensor(vec![-128; 196], vec![1, 196], 0);
        let b = tensor(vec![0], vec![1], 0);
        let input = vec![255; 196];
        assert_eq!(dense_layer(&w, &b, &input, 0), vec![-128 * 255 * 196]);
    }
}
