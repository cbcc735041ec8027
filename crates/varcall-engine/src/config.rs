//! Dispatch configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_RECORD_STATS, DEFAULT_VALIDATE_ENTRY_POINTS};
use crate::error::BridgeError;

/// Configuration for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Reject misaligned entry points returned by the generator (default: true).
    /// A rejected entry is handled like a generation failure.
    pub validate_entry_points: bool,
    /// Count slow-path events in `DispatchStats` (default: true)
    pub record_stats: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            validate_entry_points: DEFAULT_VALIDATE_ENTRY_POINTS,
            record_stats: DEFAULT_RECORD_STATS,
        }
    }
}

impl DispatchConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML config file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
