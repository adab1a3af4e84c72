//! Training hyperparameters, loadable from JSON.
//!
//! Every field is optional in the file and falls back to the layer defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "learning": 0.05,
//!   "momentum": 0.9,
//!   "batch_size": 16,
//!   "contractive": true,
//!   "jacobian_penalty": 0.2
//! }
//! ```

use crate::layers::contractive::DEFAULT_NOISE_LEVEL;
use crate::layers::dense::{DEFAULT_JACOBIAN_PENALTY, DEFAULT_LEARNING, DEFAULT_MOMENTUM};
use crate::{Error, Result};

use std::fs;
use std::path::Path;

/// Hyperparameters applied to every layer of an architecture.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub learning: f64,
    pub momentum: f64,
    /// L2 penalty on weights. Must be zero when `contractive` is set.
    pub regularizer: f64,
    pub batch_size: usize,
    /// Penalize the Jacobian of every layer's encoding.
    pub contractive: bool,
    pub jacobian_penalty: f64,
    /// Standard deviation of the denoising noise for autoencoder layers.
    pub noise_level: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            learning: DEFAULT_LEARNING,
            momentum: DEFAULT_MOMENTUM,
            regularizer: 0.0,
            batch_size: 1,
            contractive: false,
            jacobian_penalty: DEFAULT_JACOBIAN_PENALTY,
            noise_level: DEFAULT_NOISE_LEVEL,
        }
    }
}

impl Hyperparameters {
    /// Checks the values are usable together.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("learning", self.learning),
            ("momentum", self.momentum),
            ("regularizer", self.regularizer),
            ("jacobian_penalty", self.jacobian_penalty),
            ("noise_level", self.noise_level),
        ];
        for &(name, value) in &rates {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch_size must be at least 1".to_owned(),
            ));
        }
        if self.contractive && self.regularizer != 0.0 {
            return Err(Error::MutuallyExclusive);
        }
        Ok(())
    }
}

/// Loads and validates hyperparameters from a JSON file.
///
/// ```no_run
/// use layerwise::config::load_config;
///
/// let params = load_config("params.json").unwrap();
/// assert!(params.batch_size >= 1);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Hyperparameters> {
    let contents = fs::read_to_string(path)?;
    let config: Hyperparameters = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
