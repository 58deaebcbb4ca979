//! Float → fixed-point conversion of a trained network

use digitnet_fixed_point::{OverflowPolicy, QuantizedTensor};

use crate::config::IMG_BITS;
use crate::error::{ModelError, Result};
use crate::network::QuantizedNetwork;
use crate::weights::FloatNetwork;

/// Quantizes each of the four tensors independently, with its own shift
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantizer {
    /// Handling of elements that round to a magnitude of 128
    pub policy: OverflowPolicy,
}

impl Quantizer {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self { policy }
    }

    /// Quantize a whole network. Any failing tensor aborts the conversion.
    pub fn quantize(&self, network: &FloatNetwork) -> Result<QuantizedNetwork> {
        let l1 = &network.layer1;
        let l2 = &network.layer2;

        let l1_weights = self.quantize_tensor(
            "layer1 weights",
            &l1.output_major_kernel(),
            &[l1.out_features, l1.in_features],
        )?;
        let l1_bias = self.quantize_tensor("layer1 bias", &l1.bias, &[l1.out_features])?;
        let l2_weights = self.quantize_tensor(
            "layer2 weights",
            &l2.output_major_kernel(),
            &[l2.out_features, l2.in_features],
        )?;
        let l2_bias = self.quantize_tensor("layer2 bias", &l2.bias, &[l2.out_features])?;

        let quantized = QuantizedNetwork::new(l1_weights, l1_bias, l2_weights, l2_bias, IMG_BITS)?;
        tracing::info!(
            l1w_bits = quantized.l1_weights().shift(),
            l1b_bits = quantized.l1_bias().shift(),
            l2w_bits = quantized.l2_weights().shift(),
            l2b_bits = quantized.l2_bias().shift(),
            bytes = quantized.size_bytes(),
            "quantized network"
        );
        Ok(quantized)
    }

    fn quantize_tensor(
        &self,
        tensor: &'static str,
        values: &[f32],
        shape: &[usize],
    ) -> Result<QuantizedTensor> {
        let quantized = QuantizedTensor::quantize(values, shape, self.policy)
            .map_err(|source| ModelError::Quantization { tensor, source })?;
        let max_error = values
            .iter()
            .zip(quantized.dequantize())
            .fold(0.0f64, |m, (&v, d)| m.max((v as f64 - d).abs()));
        tracing::debug!(
            tensor,
            shift = quantized.shift(),
            ?shape,
            max_error,
            bound = quantized.max_quantization_error(),
            "quantized tensor"
        );
        Ok(quantized)
    }
}
