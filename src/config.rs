//! The single source of truth for chunk-codec configuration.
//!
//! This module defines the `CodecConfig` struct, which is created once at the
//! application boundary (e.g., from an engine-wide JSON settings file) and
//! then passed down through the system via a shared, read-only
//! `Arc<CodecConfig>`. Every accumulator built for a (column, block) pair
//! holds a clone of that `Arc`.

use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// The hard ceiling a block row count may be configured to. Row ids inside
/// sparse buffers are stored as `u32`, so a block can never address more.
pub const ABSOLUTE_MAX_ROWS: usize = u32::MAX as usize;

/// The unified configuration for chunk construction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    /// **The maximum number of rows one block may hold.**
    /// Appending past this limit is a fatal construction error; the upstream
    /// ingestion layer is responsible for cutting blocks at this boundary.
    #[serde(default = "default_max_rows_per_block")]
    pub max_rows_per_block: usize,
}

impl CodecConfig {
    /// Parses a `CodecConfig` from a JSON document, then validates it.
    pub fn from_json(json: &str) -> Result<Self, StrataError> {
        let cfg: CodecConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serializes the config back to its canonical JSON form.
    pub fn to_json(&self) -> Result<String, StrataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rejects configurations the codec cannot honor.
    pub fn validate(&self) -> Result<(), StrataError> {
        if self.max_rows_per_block == 0 {
            return Err(StrataError::ConfigError(
                "max_rows_per_block must be at least 1".to_string(),
            ));
        }
        if self.max_rows_per_block > ABSOLUTE_MAX_ROWS {
            return Err(StrataError::ConfigError(format!(
                "max_rows_per_block ({}) exceeds the addressable limit ({})",
                self.max_rows_per_block, ABSOLUTE_MAX_ROWS
            )));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_rows_per_block: default_max_rows_per_block(),
        }
    }
}

/// Helper for `serde` to provide the default block size (4M rows).
fn default_max_rows_per_block() -> usize {
    1 << 22
}
