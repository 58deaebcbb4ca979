//! Quantized model handle

use digitnet_fixed_point::{layer_shift, QuantizedTensor};

use crate::config::NetworkConfig;
use crate::error::{ModelError, Result};

/// Largest rescale amount a 32-bit accumulator can meaningfully take
const MAX_RESCALE: i32 = 31;

/// The read-only fixed-point model consumed by every inference call.
///
/// Weight matrices are stored output-neuron-major: row `o` of `l1_weights`
/// holds every input weight of hidden neuron `o`. Shapes and rescale amounts
/// are checked once in [`QuantizedNetwork::new`] and cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedNetwork {
    l1_weights: QuantizedTensor,
    l1_bias: QuantizedTensor,
    l2_weights: QuantizedTensor,
    l2_bias: QuantizedTensor,
    img_bits: i32,
}

impl QuantizedNetwork {
    /// Assemble a model, validating every shape against the others
    pub fn new(
        l1_weights: QuantizedTensor,
        l1_bias: QuantizedTensor,
        l2_weights: QuantizedTensor,
        l2_bias: QuantizedTensor,
        img_bits: i32,
    ) -> Result<Self> {
        let hidden = l1_bias.len();
        let output = l2_bias.len();

        if l1_bias.shape() != [hidden] || l2_bias.shape() != [output] {
            return Err(ModelError::InvalidShape {
                expected: vec![hidden, output],
                got: [l1_bias.shape(), l2_bias.shape()].concat(),
            });
        }
        if l1_weights.shape().len() != 2 || l1_weights.shape()[0] != hidden {
            return Err(ModelError::InvalidShape {
                expected: vec![hidden, l1_weights.shape().get(1).copied().unwrap_or(0)],
                got: l1_weights.shape().to_vec(),
            });
        }
        if l2_weights.shape() != [output, hidden] {
            return Err(ModelError::InvalidShape {
                expected: vec![output, hidden],
                got: l2_weights.shape().to_vec(),
            });
        }

        let network = Self {
            l1_weights,
            l1_bias,
            l2_weights,
            l2_bias,
            img_bits,
        };
        network.config().validate()?;

        for (layer, amount) in [(1, network.layer1_rescale()), (2, network.layer2_rescale())] {
            if amount.abs() > MAX_RESCALE {
                return Err(ModelError::InvalidRescale { layer, amount });
            }
        }

        Ok(network)
    }

    /// Topology of this model
    pub fn config(&self) -> NetworkConfig {
        NetworkConfig {
            input_size: self.input_size(),
            hidden_size: self.hidden_size(),
            output_size: self.output_size(),
            img_bits: self.img_bits,
        }
    }

    /// Layer 1 weights `[hidden, input]`
    pub fn l1_weights(&self) -> &QuantizedTensor {
        &self.l1_weights
    }

    /// Layer 1 bias `[hidden]`
    pub fn l1_bias(&self) -> &QuantizedTensor {
        &self.l1_bias
    }

    /// Layer 2 weights `[output, hidden]`
    pub fn l2_weights(&self) -> &QuantizedTensor {
        &self.l2_weights
    }

    /// Layer 2 bias `[output]`
    pub fn l2_bias(&self) -> &QuantizedTensor {
        &self.l2_bias
    }

    /// Fractional bits of the input pixels
    pub fn img_bits(&self) -> i32 {
        self.img_bits
    }

    pub fn input_size(&self) -> usize {
        self.l1_weights.shape()[1]
    }

    pub fn hidden_size(&self) -> usize {
        self.l1_bias.len()
    }

    pub fn output_size(&self) -> usize {
        self.l2_bias.len()
    }

    /// Shift applied to the layer-1 accumulator: `img + l1w - l1b`
    pub fn layer1_rescale(&self) -> i32 {
        layer_shift(self.img_bits, self.l1_weights.shift(), self.l1_bias.shift())
    }

    /// Shift applied to the layer-2 accumulator: `l1b + l2w - l2b`
    pub fn layer2_rescale(&self) -> i32 {
        layer_shift(self.l1_bias.shift(), self.l2_weights.shift(), self.l2_bias.shift())
    }

    /// Bytes of constant data the model occupies on the device
    pub fn size_bytes(&self) -> usize {
        self.l1_weights.len() + self.l1_bias.len() + self.l2_weights.len() + self.l2_bias.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(data: Vec<i8>, shape: Vec<usize>, shift: i32) -> QuantizedTensor {
        QuantizedTensor::from_raw(data, shape, shift).unwrap()
    }

    fn tiny() -> QuantizedNetwork {
        QuantizedNetwork::new(
            tensor(vec![1, 2, 3, 4, 5, 6], vec![2, 3], 7),
            tensor(vec![10, -10], vec![2], 6),
            tensor(vec![1, -1, 2, 0], vec![2, 2], 5),
            tensor(vec![3, 4], vec![2], 4),
            8,
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_rows() {
        let net = tiny();
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.hidden_size(), 2);
        assert_eq!(net.output_size(), 2);
        assert_eq!(&net.l1_weights().data()[3..6], &[4, 5, 6]);
        assert_eq!(net.l2_weights().shape(), &[2, 2]);
        assert_eq!(net.img_bits(), 8);
        assert_eq!(net.size_bytes(), 14);
    }

    #[test]
    fn test_rescale_amounts() {
        let net = tiny();
        assert_eq!(net.layer1_rescale(), 8 + 7 - 6);
        assert_eq!(net.layer2_rescale(), 6 + 5 - 4);
    }

    #[test]
    fn test_rejects_mismatched_hidden() {
        let result = QuantizedNetwork::new(
            tensor(vec![0; 6], vec![2, 3], 7),
            tensor(vec![0; 3], vec![3], 6),
            tensor(vec![0; 4], vec![2, 2], 5),
            tensor(vec![0; 2], vec![2], 4),
            8,
        );
        assert!(matches!(result, Err(ModelError::InvalidShape { .. })));
    }

    #[test]
    fn test_rejects_huge_rescale() {
        let result = QuantizedNetwork::new(
            tensor(vec![1; 6], vec![2, 3], 30),
            tensor(vec![1; 2], vec![2], 0),
            tensor(vec![1; 4], vec![2, 2], 5),
            tensor(vec![1; 2], vec![2], 4),
            8,
        );
        assert!(matches!(
            result,
            Err(ModelError::InvalidRescale { layer: 1, amount: 38 })
        ));
    }
}
