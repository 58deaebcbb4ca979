//! Floating-point network weights

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::NetworkConfig;
use crate::error::{ModelError, Result};

/// Weights for a dense layer (y = xW + b), as produced by training
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Kernel matrix (in_features × out_features), row-major
    pub kernel: Vec<f32>,
    /// Bias vector (out_features)
    pub bias: Vec<f32>,
    /// Input dimension
    pub in_features: usize,
    /// Output dimension
    pub out_features: usize,
}

impl DenseLayer {
    /// Create from a row-major `[in, out]` kernel and bias
    pub fn new(
        kernel: Vec<f32>,
        bias: Vec<f32>,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        if kernel.len() != in_features * out_features {
            return Err(ModelError::InvalidShape {
                expected: vec![in_features, out_features],
                got: vec![kernel.len()],
            });
        }
        if bias.len() != out_features {
            return Err(ModelError::InvalidShape {
                expected: vec![out_features],
                got: vec![bias.len()],
            });
        }
        Ok(Self {
            kernel,
            bias,
            in_features,
            out_features,
        })
    }

    /// Create a random layer (for testing)
    pub fn random<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        // Kaiming-like range
        let bound = (2.0 / in_features as f32).sqrt();
        let kernel = (0..in_features * out_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let bias = (0..out_features).map(|_| rng.gen_range(-0.5..0.5)).collect();

        Self {
            kernel,
            bias,
            in_features,
            out_features,
        }
    }

    /// Get kernel weight at (in_idx, out_idx)
    pub fn get_weight(&self, in_idx: usize, out_idx: usize) -> f32 {
        self.kernel[in_idx * self.out_features + out_idx]
    }

    /// Kernel reordered so each output neuron's weights are contiguous: `[out, in]`
    pub fn output_major_kernel(&self) -> Vec<f32> {
        let mut transposed = vec![0.0f32; self.kernel.len()];
        for i in 0..self.in_features {
            for o in 0..self.out_features {
                transposed[o * self.in_features + i] = self.get_weight(i, o);
            }
        }
        transposed
    }

    /// Float forward pass without activation
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.in_features {
            return Err(ModelError::InvalidShape {
                expected: vec![self.in_features],
                got: vec![input.len()],
            });
        }

        let mut output = self.bias.clone();
        for (i, &xi) in input.iter().enumerate() {
            let row = &self.kernel[i * self.out_features..(i + 1) * self.out_features];
            for (o, &w) in output.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
        Ok(output)
    }
}

/// Trained floating-point network: dense → ReLU → dense
#[derive(Debug, Clone, PartialEq)]
pub struct FloatNetwork {
    pub layer1: DenseLayer,
    pub layer2: DenseLayer,
}

impl FloatNetwork {
    /// Combine two layers, checking that they chain
    pub fn new(layer1: DenseLayer, layer2: DenseLayer) -> Result<Self> {
        if layer1.out_features != layer2.in_features {
            return Err(ModelError::InvalidShape {
                expected: vec![layer1.out_features, layer2.out_features],
                got: vec![layer2.in_features, layer2.out_features],
            });
        }
        Ok(Self { layer1, layer2 })
    }

    /// Deterministic random network (for testing)
    pub fn random(config: &NetworkConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            layer1: DenseLayer::random(config.input_size, config.hidden_size, &mut rng),
            layer2: DenseLayer::random(config.hidden_size, config.output_size, &mut rng),
        }
    }

    /// Topology derived from the layer shapes
    pub fn config(&self) -> NetworkConfig {
        NetworkConfig {
            input_size: self.layer1.in_features,
            hidden_size: self.layer1.out_features,
            output_size: self.layer2.out_features,
            ..Default::default()
        }
    }

    /// Logits for an input already normalized to [0, 1)
    pub fn forward_normalized(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut hidden = self.layer1.forward(input)?;
        for h in hidden.iter_mut() {
            *h = h.max(0.0);
        }
        self.layer2.forward(&hidden)
    }

    /// Logits for raw 8-bit pixels, normalized by 256 like the training data
    pub fn forward(&self, pixels: &[u8]) -> Result<Vec<f32>> {
        let input: Vec<f32> = pixels.iter().map(|&p| p as f32 / 256.0).collect();
        self.forward_normalized(&input)
    }
}
