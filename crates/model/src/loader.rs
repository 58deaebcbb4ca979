//! Safetensors loading and saving of float and quantized networks

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use digitnet_fixed_point::QuantizedTensor;
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};

use crate::error::{ModelError, Result};
use crate::network::QuantizedNetwork;
use crate::weights::{DenseLayer, FloatNetwork};

/// Tensor names of the trained float model (Keras dense layer naming)
const L1_KERNEL: &str = "dense/kernel";
const L1_BIAS: &str = "dense/bias";
const L2_KERNEL: &str = "dense_1/kernel";
const L2_BIAS: &str = "dense_1/bias";

/// Tensor names of the quantized model
const Q_L1_WEIGHTS: &str = "layer1_weights";
const Q_L1_BIAS: &str = "layer1_bias";
const Q_L2_WEIGHTS: &str = "layer2_weights";
const Q_L2_BIAS: &str = "layer2_bias";

/// Load tensors from a safetensors file
pub struct SafetensorsLoader {
    /// Raw safetensors data
    data: Vec<u8>,
}

impl SafetensorsLoader {
    /// Read a whole safetensors file into memory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Self { data })
    }

    /// Wrap an in-memory safetensors buffer
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    fn tensors(&self) -> Result<SafeTensors<'_>> {
        SafeTensors::deserialize(&self.data).map_err(|e| ModelError::Safetensors(e.to_string()))
    }

    fn tensor(&self, name: &str) -> Result<TensorView<'_>> {
        self.tensors()?
            .tensor(name)
            .map_err(|_| ModelError::MissingTensor(name.to_string()))
    }

    /// Get tensor names in the safetensors file
    pub fn tensor_names(&self) -> Result<Vec<String>> {
        Ok(self.tensors()?.names().into_iter().map(String::from).collect())
    }

    /// String metadata stored in the file header
    pub fn metadata(&self) -> Result<HashMap<String, String>> {
        let (_, metadata) = SafeTensors::read_metadata(&self.data)
            .map_err(|e| ModelError::Safetensors(e.to_string()))?;
        Ok(metadata.metadata().clone().unwrap_or_default())
    }

    /// Load a tensor as f32 values along with its shape
    pub fn load_tensor_f32(&self, name: &str) -> Result<(Vec<f32>, Vec<usize>)> {
        let tensor = self.tensor(name)?;
        let data = tensor.data();

        let values: Vec<f32> = match tensor.dtype() {
            Dtype::F32 => data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            Dtype::F64 => data
                .chunks_exact(8)
                .map(|b| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(b);
                    f64::from_le_bytes(bytes) as f32
                })
                .collect(),
            Dtype::F16 => data
                .chunks_exact(2)
                .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            Dtype::BF16 => data
                .chunks_exact(2)
                .map(|b| half::bf16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            other => {
                return Err(ModelError::InvalidDtype {
                    expected: "f32, f64, f16 or bf16".to_string(),
                    got: format!("{:?}", other),
                });
            }
        };

        Ok((values, tensor.shape().to_vec()))
    }

    /// Load a tensor of raw bytes (u8 or i8) along with its shape
    pub fn load_tensor_bytes(&self, name: &str, dtype: Dtype) -> Result<(Vec<u8>, Vec<usize>)> {
        let tensor = self.tensor(name)?;
        if tensor.dtype() != dtype {
            return Err(ModelError::InvalidDtype {
                expected: format!("{:?}", dtype),
                got: format!("{:?}", tensor.dtype()),
            });
        }
        Ok((tensor.data().to_vec(), tensor.shape().to_vec()))
    }

    fn load_dense(&self, kernel_name: &str, bias_name: &str) -> Result<DenseLayer> {
        let (kernel, kernel_shape) = self.load_tensor_f32(kernel_name)?;
        let (bias, bias_shape) = self.load_tensor_f32(bias_name)?;

        let (in_features, out_features) = match kernel_shape.as_slice() {
            &[i, o] => (i, o),
            _ => {
                return Err(ModelError::InvalidShape {
                    expected: vec![kernel.len() / bias.len().max(1), bias.len()],
                    got: kernel_shape,
                })
            }
        };
        if bias_shape != [out_features] {
            return Err(ModelError::InvalidShape {
                expected: vec![out_features],
                got: bias_shape,
            });
        }

        DenseLayer::new(kernel, bias, in_features, out_features)
    }

    /// Load the trained float network (kernels stored `[in, out]`)
    pub fn load_float_network(&self) -> Result<FloatNetwork> {
        let layer1 = self.load_dense(L1_KERNEL, L1_BIAS)?;
        let layer2 = self.load_dense(L2_KERNEL, L2_BIAS)?;
        let network = FloatNetwork::new(layer1, layer2)?;
        tracing::info!(config = ?network.config(), "loaded float network");
        Ok(network)
    }

    fn load_quantized_tensor(
        &self,
        name: &str,
        metadata: &HashMap<String, String>,
        bits_key: &str,
    ) -> Result<QuantizedTensor> {
        let (bytes, shape) = self.load_tensor_bytes(name, Dtype::I8)?;
        let shift = parse_metadata(metadata, bits_key)?;
        let data = bytes.into_iter().map(|b| b as i8).collect();
        Ok(QuantizedTensor::from_raw(data, shape, shift)?)
    }

    /// Load a quantized network saved by [`save_quantized`]
    pub fn load_quantized_network(&self) -> Result<QuantizedNetwork> {
        let metadata = self.metadata()?;
        QuantizedNetwork::new(
            self.load_quantized_tensor(Q_L1_WEIGHTS, &metadata, "l1w_bits")?,
            self.load_quantized_tensor(Q_L1_BIAS, &metadata, "l1b_bits")?,
            self.load_quantized_tensor(Q_L2_WEIGHTS, &metadata, "l2w_bits")?,
            self.load_quantized_tensor(Q_L2_BIAS, &metadata, "l2b_bits")?,
            parse_metadata(&metadata, "img_bits")?,
        )
    }
}

fn parse_metadata(metadata: &HashMap<String, String>, key: &str) -> Result<i32> {
    metadata
        .get(key)
        .ok_or_else(|| ModelError::MissingMetadata(key.to_string()))?
        .parse()
        .map_err(|_| ModelError::MissingMetadata(format!("{} (not an integer)", key)))
}

/// Load a quantized network from a file
pub fn load_quantized<P: AsRef<Path>>(path: P) -> Result<QuantizedNetwork> {
    SafetensorsLoader::from_file(path)?.load_quantized_network()
}

/// Serialize a quantized network: four I8 tensors plus the shifts as metadata
pub fn serialize_quantized(network: &QuantizedNetwork) -> Result<Vec<u8>> {
    let tensors = [
        (Q_L1_WEIGHTS, network.l1_weights()),
        (Q_L1_BIAS, network.l1_bias()),
        (Q_L2_WEIGHTS, network.l2_weights()),
        (Q_L2_BIAS, network.l2_bias()),
    ];
    let buffers: Vec<(&str, Vec<u8>, &QuantizedTensor)> = tensors
        .iter()
        .map(|&(name, t)| (name, t.data().iter().map(|&v| v as u8).collect(), t))
        .collect();

    let mut views = Vec::with_capacity(buffers.len());
    for (name, bytes, tensor) in &buffers {
        let view = TensorView::new(Dtype::I8, tensor.shape().to_vec(), bytes)
            .map_err(|e| ModelError::Safetensors(e.to_string()))?;
        views.push((*name, view));
    }

    let metadata: HashMap<String, String> = [
        ("img_bits", network.img_bits()),
        ("l1w_bits", network.l1_weights().shift()),
        ("l1b_bits", network.l1_bias().shift()),
        ("l2w_bits", network.l2_weights().shift()),
        ("l2b_bits", network.l2_bias().shift()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    safetensors::serialize(views, &Some(metadata))
        .map_err(|e| ModelError::Safetensors(e.to_string()))
}

/// Save a quantized network to a file
pub fn save_quantized<P: AsRef<Path>>(network: &QuantizedNetwork, path: P) -> Result<()> {
    let bytes = serialize_quantized(network)?;
    std::fs::write(path.as_ref(), bytes)?;
    tracing::info!(path = %path.as_ref().display(), "saved quantized network");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::quantizer::Quantizer;
    use digitnet_fixed_point::OverflowPolicy;

    fn float_bytes(network: &FloatNetwork) -> Vec<u8> {
        let to_bytes = |v: &[f32]| -> Vec<u8> { v.iter().flat_map(|x| x.to_le_bytes()).collect() };
        let l1k = to_bytes(&network.layer1.kernel);
        let l1b = to_bytes(&network.layer1.bias);
        let l2k = to_bytes(&network.layer2.kernel);
        let l2b = to_bytes(&network.layer2.bias);
        let (i, h, o) = (
            network.layer1.in_features,
            network.layer1.out_features,
            network.layer2.out_features,
        );
        let views = vec![
            (L1_KERNEL, TensorView::new(Dtype::F32, vec![i, h], &l1k).unwrap()),
            (L1_BIAS, TensorView::new(Dtype::F32, vec![h], &l1b).unwrap()),
            (L2_KERNEL, TensorView::new(Dtype::F32, vec![h, o], &l2k).unwrap()),
            (L2_BIAS, TensorView::new(Dtype::F32, vec![o], &l2b).unwrap()),
        ];
        safetensors::serialize(views, &None).unwrap()
    }

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            input_size: 12,
            hidden_size: 6,
            output_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_float_network_load() {
        let network = FloatNetwork::random(&small_config(), 11);
        let loader = SafetensorsLoader::from_bytes(float_bytes(&network));
        assert_eq!(loader.load_float_network().unwrap(), network);
    }

    #[test]
    fn test_missing_tensor() {
        let loader = SafetensorsLoader::from_bytes(safetensors::serialize(
            Vec::<(&str, TensorView<'_>)>::new(),
            &None,
        )
        .unwrap());
        assert!(matches!(
            loader.load_float_network(),
            Err(ModelError::MissingTensor(name)) if name == L1_KERNEL
        ));
    }

    #[test]
    fn test_quantized_file_roundtrip() {
        let network = FloatNetwork::random(&small_config(), 5);
        let quantized = Quantizer::new(OverflowPolicy::ReduceShift)
            .quantize(&network)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixedpoint.safetensors");
        save_quantized(&quantized, &path).unwrap();

        let loaded = load_quantized(&path).unwrap();
        assert_eq!(loaded, quantized);
    }

    #[test]
    fn test_quantized_wrong_dtype() {
        let network = FloatNetwork::random(&small_config(), 5);
        let loader = SafetensorsLoader::from_bytes(float_bytes(&network));
        assert!(loader.load_quantized_network().is_err());
    }
}
