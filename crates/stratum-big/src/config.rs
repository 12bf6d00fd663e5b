use serde::{Deserialize, Serialize};
use stratum_area::{StorageError, StorageResult};

use crate::manifest::CHUNK_KEY_LEN;

/// Per-item quota of a browser extension's sync storage area.
pub const DEFAULT_MAX_ITEM_BYTES: usize = 8192;

/// Lock resource shared by chunked stores unless configured otherwise.
pub const DEFAULT_LOCK_RESOURCE: &str = "big-storage-lock";

/// Configuration for a chunked store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigConfig {
    /// Maximum size of the key plus serialized value of a physical entry.
    pub max_item_bytes: usize,
    /// Name of the lock taken around every operation. Stores sharing a
    /// name (and a lock registry) serialize against each other.
    pub lock_resource: String,
}

impl Default for BigConfig {
    fn default() -> Self {
        Self {
            max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
            lock_resource: DEFAULT_LOCK_RESOURCE.to_string(),
        }
    }
}

impl BigConfig {
    /// Default configuration with a different item quota.
    pub fn with_max_item_bytes(max_item_bytes: usize) -> Self {
        Self {
            max_item_bytes,
            ..Default::default()
        }
    }

    /// Whether `key` with JSON-encoded value `json` can be stored as-is.
    ///
    /// The backend may escape characters when it stores the value, so the
    /// value is counted twice.
    pub fn can_store(&self, key: &str, json: &str) -> bool {
        key.len() + json.len() * 2 <= self.max_item_bytes
    }

    /// Largest base64 chunk that fits in one entry alongside its key. Two
    /// bytes are reserved for the quotes added when the chunk is stored as
    /// a string.
    pub fn max_chunk_size(&self) -> StorageResult<usize> {
        self.max_item_bytes
            .checked_sub(CHUNK_KEY_LEN + 2)
            .filter(|n| *n > 0)
            .ok_or_else(|| self.insufficient())
    }

    /// Number of raw bytes per chunk, chosen so the base64 encoding of a
    /// chunk fits in [`max_chunk_size`](Self::max_chunk_size).
    pub fn chunk_window(&self) -> StorageResult<usize> {
        match self.max_chunk_size()? / 4 * 3 {
            0 => Err(self.insufficient()),
            n => Ok(n),
        }
    }

    /// Check that at least one chunk fits in an entry.
    pub fn validate(&self) -> StorageResult<()> {
        self.chunk_window().map(|_| ())
    }

    fn insufficient(&self) -> StorageError {
        StorageError::Config {
            max_item_bytes: self.max_item_bytes,
            chunk_key_len: CHUNK_KEY_LEN,
        }
    }
}
