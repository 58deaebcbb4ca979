//! Validation configuration

/// Thresholds and limits for float-vs-fixed validation runs
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Largest acceptable accuracy loss of the fixed-point model (fraction, not percent)
    pub max_accuracy_drop: f64,

    /// Only use the first N dataset images (all if unset)
    pub img_count: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_accuracy_drop: 0.01,
            img_count: None,
        }
    }
}

impl ValidationConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(drop) = std::env::var("DIGITNET_MAX_ACCURACY_DROP") {
            match drop.parse::<f64>() {
                Ok(d) if d.is_finite() && d >= 0.0 => config.max_accuracy_drop = d,
                _ => tracing::warn!(value = %drop, "ignoring invalid DIGITNET_MAX_ACCURACY_DROP"),
            }
        }

        if let Ok(count) = std::env::var("DIGITNET_IMG_COUNT") {
            match count.parse() {
                Ok(c) => config.img_count = Some(c),
                Err(_) => tracing::warn!(value = %count, "ignoring invalid DIGITNET_IMG_COUNT"),
            }
        }

        config
    }

    /// Override the image limit, keeping the configured one when `None`
    pub fn with_img_count(mut self, img_count: Option<usize>) -> Self {
        if img_count.is_some() {
            self.img_count = img_count;
        }
        self
    }
}
