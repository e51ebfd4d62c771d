//! Coordinator configuration.
//!
//! ```json
//! {
//!   "peer_set_size": 3,
//!   "proximity_shift": { "enabled": true, "queue_depth": 256 }
//! }
//! ```
//!
//! Every field is optional; omitted fields take the defaults below.

use corelib::{RequestOptions, DEFAULT_PEER_SET_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Replica-set width used when a request does not override it.
    pub peer_set_size: usize,
    pub proximity_shift: ProximityShiftConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityShiftConfig {
    /// Create a hint outlet at startup.
    pub enabled: bool,
    /// Capacity of the hint channel.
    pub queue_depth: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            peer_set_size: DEFAULT_PEER_SET_SIZE,
            proximity_shift: ProximityShiftConfig::default(),
        }
    }
}

impl Default for ProximityShiftConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_depth: 256,
        }
    }
}

impl RingConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: RingConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_set_size == 0 {
            return Err(ConfigError::Invalid("peer_set_size must be at least 1".into()));
        }
        if self.proximity_shift.queue_depth == 0 {
            return Err(ConfigError::Invalid("proximity_shift.queue_depth must be at least 1".into()));
        }
        Ok(())
    }

    /// Default per-request options under this config.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::with_peer_set_size(self.peer_set_size)
    }
}
