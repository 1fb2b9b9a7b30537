//! Controller connection settings
//!
//! Stored as JSON; every field is optional and falls back to the defaults
//! of a point-to-point RS-232 link at 9600 baud.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::protocol::{Addressing, DeviceAddress, QueryConfig, DEFAULT_BAUD_RATE};

/// Errors loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to talk to one controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// RS-232 point-to-point or RS-485 multi-drop
    pub addressing: Addressing,
    /// Bus address of the controller (0 for point-to-point)
    pub devno: u8,
    /// Retry and timing policy
    pub query: QueryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            addressing: Addressing::PointToPoint,
            devno: 0,
            query: QueryConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check values that serde alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".into()));
        }
        DeviceAddress::new(self.devno, self.addressing)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.query.max_read == 0 {
            return Err(ConfigError::Invalid("query.max_read must be non-zero".into()));
        }
        Ok(())
    }
}
