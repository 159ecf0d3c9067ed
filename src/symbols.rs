//! Hand-written debug information
//!
//! A minimal TOML description of functions, their stack locals and source
//! line ranges. It feeds [`FunctionLookup`] and [`LineLookup`] when no
//! toolchain-specific reader is available.
//!
//! ```toml
//! [[functions]]
//! name = "main"
//! address = 0x2000
//! param_size = 0
//! locals = [{ name = "i", offset = -1, size = 1 }]
//!
//! [[lines]]
//! start = 0x2000
//! end = 0x2005
//! ```

use crate::config::ConfigError;
use crate::controller::LineLookup;
use crate::stack::{FunctionInfo, FunctionLookup};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;

/// Addresses generated for one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebugInfo {
    pub functions: Vec<FunctionInfo>,
    pub lines: Vec<LineRange>,
}

impl DebugInfo {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut info: DebugInfo = toml::from_str(text)?;
        info.functions.sort_by_key(|function| function.address);
        Ok(info)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl FunctionLookup for DebugInfo {
    /// The last function starting at or below `address`.
    fn function_containing(&self, address: u16) -> Option<&FunctionInfo> {
        let index = self
            .functions
            .partition_point(|function| function.address <= address);
        index.checked_sub(1).map(|i| &self.functions[i])
    }
}

impl LineLookup for DebugInfo {
    fn line_range(&self, pc: u16) -> Option<RangeInclusive<u16>> {
        self.lines
            .iter()
            .find(|line| line.start <= pc && pc <= line.end)
            .map(|line| line.start..=line.end)
    }
}
