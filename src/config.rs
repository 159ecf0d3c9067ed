//! Session configuration
//!
//! Pacing constants and target-specific locations, loadable from TOML. Every
//! field has a default, so an empty file (or no file) is a valid config.
//!
//! ```
//! use lib4510::config::Config;
//!
//! let config = Config::from_toml_str("stall_threshold = 8").unwrap();
//! assert_eq!(config.stall_threshold, 8);
//! assert_eq!(config.poll_interval_ms, 10);
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Problems loading a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device the front end opens
    pub device: String,

    /// Delay between register polls while the CPU runs
    pub poll_interval_ms: u64,

    /// Consecutive identical PC samples that mean the CPU has halted
    pub stall_threshold: u32,

    /// Unusable reply lines tolerated before a read times out
    pub link_retry_limit: u32,

    /// Register samples taken when probing whether the CPU is stopped
    pub stopped_check_polls: u32,

    /// Base-page scratch area used for one-shot execution
    pub scratch_address: u16,

    /// Base-page location of the software stack pointer
    pub soft_stack_pointer: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB1".to_string(),
            poll_interval_ms: 10,
            stall_threshold: 5,
            link_retry_limit: 64,
            stopped_check_polls: 10,
            scratch_address: 0x00F0,
            soft_stack_pointer: 0x0002,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
