//! Static monitor settings read from `config.toml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::ParamRanges;

pub const DEFAULT_START_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_INPUT_DEVICE: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Upper bound on context resume + microphone request
    pub start_timeout_ms: u64,
    /// Input device name, or "default"
    pub input_device: String,
    pub ranges: ParamRanges,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            input_device: DEFAULT_INPUT_DEVICE.to_string(),
            ranges: ParamRanges::default(),
        }
    }
}

impl MonitorConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(config.validated())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Repair ranges and replace a zero timeout or blank device name
    pub fn validated(self) -> Self {
        let start_timeout_ms = if self.start_timeout_ms == 0 {
            DEFAULT_START_TIMEOUT_MS
        } else {
            self.start_timeout_ms
        };
        let input_device = if self.input_device.trim().is_empty() {
            DEFAULT_INPUT_DEVICE.to_string()
        } else {
            self.input_device
        };
        Self {
            start_timeout_ms,
            input_device,
            ranges: self.ranges.validated(),
        }
    }
}
