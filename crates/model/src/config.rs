//! Network topology configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ModelError, Result};

/// Fractional bits of an input pixel: a byte `p` stands for `p / 256`
pub const IMG_BITS: i32 = 8;

/// Dimensions of the two-layer dense classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Flattened image length (14 × 14 after max-pooling)
    #[serde(default = "default_input_size")]
    pub input_size: usize,

    /// Hidden layer width
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Number of classes
    #[serde(default = "default_output_size")]
    pub output_size: usize,

    /// Fractional bits of the input pixels
    #[serde(default = "default_img_bits")]
    pub img_bits: i32,
}

fn default_input_size() -> usize { 196 }
fn default_hidden_size() -> usize { 32 }
fn default_output_size() -> usize { 10 }
fn default_img_bits() -> i32 { IMG_BITS }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            hidden_size: default_hidden_size(),
            output_size: default_output_size(),
            img_bits: default_img_bits(),
        }
    }
}

impl NetworkConfig {
    /// Load config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.hidden_size == 0 || self.output_size == 0 {
            return Err(ModelError::Config(format!(
                "layer sizes must be non-zero (input {}, hidden {}, output {})",
                self.input_size, self.hidden_size, self.output_size
            )));
        }
        // The class index travels as a single byte on the device link
        if self.output_size > 256 {
            return Err(ModelError::Config(format!(
                "output_size ({}) must fit in one byte",
                self.output_size
            )));
        }
        if !(0..=8).contains(&self.img_bits) {
            return Err(ModelError::Config(format!(
                "img_bits ({}) must be within 0-8 for 8-bit pixels",
                self.img_bits
            )));
        }
        Ok(())
    }

    /// Check that another topology has the same layer sizes
    pub fn ensure_matches(&self, other: &NetworkConfig) -> Result<()> {
        let ours = [self.input_size, self.hidden_size, self.output_size];
        let theirs = [other.input_size, other.hidden_size, other.output_size];
        if ours != theirs {
            return Err(ModelError::InvalidShape {
                expected: ours.to_vec(),
                got: theirs.to_vec(),
            });
        }
        Ok(())
    }
}
