/// Cascade kernel — Engine Configuration
///
/// The only tunable is the simulated step length. Loaded from JSON, with an
/// environment override, and validated before the engine accepts it.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `time_step_hours`.
pub const TIME_STEP_ENV: &str = "CASCADE_TIME_STEP_HOURS";

/// Default step length in simulated hours.
pub const DEFAULT_TIME_STEP_HOURS: f64 = 0.5;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("failed to parse config JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Step length is zero, negative, non-finite or not a number.
    #[error("invalid time step {value:?}: must be a finite number of hours > 0")]
    InvalidTimeStep { value: String },
}

/// Kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Simulated hours advanced per step.
    #[serde(default = "default_time_step")]
    pub time_step_hours: f64,
}

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP_HOURS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_step_hours: DEFAULT_TIME_STEP_HOURS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, then apply `CASCADE_TIME_STEP_HOURS` if set.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(TIME_STEP_ENV) {
            self.time_step_hours = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeStep { value: raw.clone() })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_step_hours.is_finite() || self.time_step_hours <= 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step_hours.to_string(),
            });
        }
        Ok(())
    }
}
