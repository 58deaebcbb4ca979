//! Host-side validation pipeline

use rayon::prelude::*;
use serde::Serialize;

use digitnet_engine::{Engine, InputImage, Prediction};
use digitnet_model::{FloatNetwork, QuantizedNetwork};

use crate::config::ValidationConfig;
use crate::dataset::Dataset;
use crate::error::{HarnessError, Result};
use crate::float_reference::FloatReference;
use crate::reference::ReferenceInference;

/// Outcome of comparing the fixed-point and float models on a labelled dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    /// Images the fixed-point model got wrong
    pub fixed_wrong: usize,
    /// Images the float model got wrong
    pub float_wrong: usize,
    /// Images where the two models picked different classes
    pub disagreements: usize,
    pub fixed_accuracy: f64,
    pub float_accuracy: f64,
    pub max_accuracy_drop: f64,
}

impl ValidationReport {
    /// Accuracy lost by quantization (negative if fixed-point did better)
    pub fn accuracy_drop(&self) -> f64 {
        self.float_accuracy - self.fixed_accuracy
    }

    pub fn within_tolerance(&self) -> bool {
        self.accuracy_drop() <= self.max_accuracy_drop
    }
}

/// Runs the quantized model through the engine, the batch reference and,
/// when attached, the float model it came from
pub struct Pipeline {
    network: QuantizedNetwork,
    float: Option<FloatNetwork>,
    config: ValidationConfig,
}

impl Pipeline {
    pub fn new(network: QuantizedNetwork) -> Self {
        Self {
            network,
            float: None,
            config: ValidationConfig::default(),
        }
    }

    /// Attach the float network, which must have the same topology
    pub fn with_float(mut self, float: FloatNetwork) -> Result<Self> {
        self.network.config().ensure_matches(&float.config())?;
        self.float = Some(float);
        Ok(self)
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn network(&self) -> &QuantizedNetwork {
        &self.network
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Classify every image with the integer engine, one image per task
    pub fn run_fixed(&self, images: &[InputImage]) -> Result<Vec<Prediction>> {
        let engine = Engine::new(&self.network);
        images
            .par_iter()
            .map(|image| engine.predict(image).map_err(HarnessError::from))
            .collect()
    }

    /// Classify every image with the batch reference
    pub fn run_reference(&self, images: &[InputImage]) -> Result<Vec<Prediction>> {
        ReferenceInference::new(&self.network).infer_batch(images)
    }

    /// Check the engine against the reference, logits included.
    /// Returns the number of images verified.
    pub fn verify_bit_exact(&self, images: &[InputImage]) -> Result<usize> {
        let fixed = self.run_fixed(images)?;
        let reference = self.run_reference(images)?;

        if let Some(index) = fixed.iter().zip(&reference).position(|(a, b)| a != b) {
            return Err(HarnessError::VerificationFailed {
                message: format!(
                    "image {}: engine {:?} vs reference {:?}",
                    index, fixed[index], reference[index]
                ),
            });
        }

        tracing::info!(images = images.len(), "engine matches reference bit for bit");
        Ok(images.len())
    }

    /// Compare fixed-point and float classification on a labelled dataset
    pub fn compare(&self, dataset: &Dataset) -> Result<ValidationReport> {
        let float = self.float.as_ref().ok_or_else(|| {
            HarnessError::InvalidInput("no float network attached for comparison".into())
        })?;
        let float_reference = FloatReference::new(float);

        let count = self
            .config
            .img_count
            .map_or(dataset.len(), |limit| limit.min(dataset.len()));
        let images = &dataset.images[..count];
        let labels = &dataset.labels[..count];

        let fixed = self.run_fixed(images)?;
        let floats = images
            .par_iter()
            .map(|image| float_reference.predict(image))
            .collect::<Result<Vec<_>>>()?;

        let mut fixed_wrong = 0;
        let mut float_wrong = 0;
        let mut disagreements = 0;
        for ((fixed, float), &label) in fixed.iter().zip(&floats).zip(labels) {
            let label = label as usize;
            if fixed.class != label {
                fixed_wrong += 1;
            }
            if float.class != label {
                float_wrong += 1;
            }
            if fixed.class != float.class {
                disagreements += 1;
            }
        }

        let accuracy = |wrong: usize| {
            if count == 0 {
                0.0
            } else {
                (count - wrong) as f64 / count as f64
            }
        };

        let report = ValidationReport {
            total: count,
            fixed_wrong,
            float_wrong,
            disagreements,
            fixed_accuracy: accuracy(fixed_wrong),
            float_accuracy: accuracy(float_wrong),
            max_accuracy_drop: self.config.max_accuracy_drop,
        };

        if report.within_tolerance() {
            tracing::info!(
                total = report.total,
                fixed_wrong,
                float_wrong,
                disagreements,
                "fixed-point model within tolerance"
            );
        } else {
            tracing::warn!(
                drop = report.accuracy_drop(),
                max = report.max_accuracy_drop,
                "fixed-point accuracy drop exceeds tolerance"
            );
        }
        Ok(report)
    }
}
