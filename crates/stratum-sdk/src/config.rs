use serde::{Deserialize, Serialize};
use stratum_big::BigConfig;

use crate::error::SdkResult;

/// Configuration for a [`Storage`](crate::Storage) stack.
///
/// ```toml
/// chunked = true
///
/// [big]
/// max_item_bytes = 8192
/// lock_resource = "big-storage-lock"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Whether oversized values are split into chunks. When `false`, views
    /// write straight to the area and its per-item quota applies.
    pub chunked: bool,
    /// Chunking parameters; ignored unless `chunked` is set.
    pub big: BigConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chunked: true,
            big: BigConfig::default(),
        }
    }
}

impl StorageConfig {
    /// A configuration that stores values as-is.
    pub fn unchunked() -> Self {
        Self {
            chunked: false,
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        Ok(toml::from_str(s)?)
    }
}
