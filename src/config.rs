//! Decoder configuration.
//!
//! Every key is optional; missing keys take their defaults.
//!
//! ```yaml
//! perimeter_mm: 2100        # wheel circumference used for ANT+ speed
//! idle_threshold_ms: 5000   # silence before an idle event
//! idle_enabled: true
//! max_buffered_bytes: 65536 # cap on an unterminated frame
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ant::DEFAULT_PERIMETER_MM;
use crate::frame::assembler::DEFAULT_MAX_BUFFERED;
use crate::{HubError, Result};

/// Default idle threshold in milliseconds.
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Wheel perimeter in millimeters
    pub perimeter_mm: u32,
    pub idle_threshold_ms: u64,
    /// Start the idle watchdog when the decoder is built
    pub idle_enabled: bool,
    pub max_buffered_bytes: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            perimeter_mm: DEFAULT_PERIMETER_MM,
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_MS,
            idle_enabled: false,
            max_buffered_bytes: DEFAULT_MAX_BUFFERED,
        }
    }
}

impl HubConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| HubError::Config {
            reason: format!("invalid YAML: {e}"),
            path: None,
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            HubError::config_file(path.to_path_buf(), "cannot read config file", Box::new(e))
        })?;
        let config: Self = serde_yaml_ng::from_str(&yaml).map_err(|e| {
            HubError::config_file(path.to_path_buf(), format!("invalid YAML: {e}"), Box::new(e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.perimeter_mm == 0 {
            return Err(HubError::config("perimeter_mm must be greater than zero"));
        }
        if self.idle_threshold_ms == 0 {
            return Err(HubError::config("idle_threshold_ms must be greater than zero"));
        }
        if self.max_buffered_bytes == 0 {
            return Err(HubError::config("max_buffered_bytes must be greater than zero"));
        }
        Ok(())
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }
}
