//! User configuration, loaded from ~/.barbeat/config.yaml.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::BEAT_EPSILON;

/// Repeat patterns producing more positions than this log a warning.
pub const DEFAULT_REPEAT_WARNING_THRESHOLD: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Tunables for the notation interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Soft limit on positions generated by one repeat pattern. Exceeding it
    /// only raises an advisory.
    #[serde(default = "Config::default_repeat_warning_threshold")]
    pub repeat_warning_threshold: usize,
    /// Window in beats within which a `v0` note deletes an earlier note.
    #[serde(default = "Config::default_deletion_tolerance")]
    pub deletion_tolerance: f64,
}

impl Config {
    /// Load config from the standard path (~/.barbeat/config.yaml).
    /// Returns None if the file doesn't exist or doesn't parse.
    pub fn load() -> Option<Self> {
        let home = dirs::home_dir()?;
        Self::load_from(&home.join(".barbeat").join("config.yaml"))
    }

    /// Like `load`, for an explicit path. A bad file logs a warning.
    pub fn load_from(path: &Path) -> Option<Self> {
        match Self::from_path(path) {
            Ok(config) => Some(config),
            Err(ConfigError::Io(_)) => None,
            Err(e) => {
                tracing::warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn default_repeat_warning_threshold() -> usize {
        DEFAULT_REPEAT_WARNING_THRESHOLD
    }

    fn default_deletion_tolerance() -> f64 {
        BEAT_EPSILON
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repeat_warning_threshold: Self::default_repeat_warning_threshold(),
            deletion_tolerance: Self::default_deletion_tolerance(),
        }
    }
}
