use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use stratum_area::{Entries, StorageError, StorageResult};

/// Magic string encoded in every manifest. It distinguishes manifests from
/// any other value that may have been stored.
pub const MANIFEST_MAGIC: &str = "3cc36853-b864-4122-beaa-516aa24448f6";

/// Prefix of every chunk key: `"chunk-" + MANIFEST_MAGIC + ":"`.
pub const CHUNK_KEY_PREFIX: &str = "chunk-3cc36853-b864-4122-beaa-516aa24448f6:";

/// Length of every chunk key: the prefix plus a base64-encoded SHA-256.
pub const CHUNK_KEY_LEN: usize = CHUNK_KEY_PREFIX.len() + 44;

/// Key under which a chunk with the given (base64) content is stored.
///
/// The key is derived from the content, so identical chunks share a key
/// and are stored once.
pub fn chunk_key(chunk: &str) -> String {
    let digest = Sha256::digest(chunk.as_bytes());
    format!("{CHUNK_KEY_PREFIX}{}", STANDARD.encode(digest))
}

/// Detect whether `key` refers to a chunk.
pub fn is_chunk_key(key: &str) -> bool {
    key.starts_with(CHUNK_KEY_PREFIX)
}

/// Value stored in place of an oversized value. It lists, in order, the
/// chunks whose concatenated content is the value's JSON encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Must equal [`MANIFEST_MAGIC`].
    pub magic: String,
    /// Keys of the chunks holding the value, in split order.
    #[serde(default)]
    pub chunk_keys: Vec<String>,
}

impl Manifest {
    /// An empty manifest carrying the magic marker.
    pub fn new() -> Self {
        Self {
            magic: MANIFEST_MAGIC.to_string(),
            chunk_keys: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == MANIFEST_MAGIC
    }

    /// Interpret a stored value as a manifest. Returns `None` for anything
    /// that is not a valid manifest.
    pub fn from_value(value: &Value) -> Option<Self> {
        Manifest::deserialize(value)
            .ok()
            .filter(Manifest::is_valid)
    }

    pub fn to_value(&self) -> StorageResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Concatenate the decoded chunks listed by this manifest, looking them
    /// up in `data`, and parse the result.
    pub fn reassemble(&self, data: &Entries) -> StorageResult<Value> {
        let mut json = Vec::new();
        for key in &self.chunk_keys {
            let chunk = data
                .get(key)
                .ok_or_else(|| StorageError::MissingChunk(key.clone()))?;
            let encoded = chunk.as_str().ok_or_else(|| StorageError::ChunkDecode {
                key: key.clone(),
                reason: "chunk is not a string".into(),
            })?;
            let decoded = STANDARD
                .decode(encoded)
                .map_err(|e| StorageError::ChunkDecode {
                    key: key.clone(),
                    reason: format!("base64 decode failed: {e}"),
                })?;
            json.extend_from_slice(&decoded);
        }
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunk keys present in `data` that no manifest in `data` references,
/// in sorted order.
pub fn dangling_chunk_keys(data: &Entries) -> Vec<String> {
    let mut dangling: HashSet<&str> = data
        .keys()
        .filter(|k| is_chunk_key(k))
        .map(String::as_str)
        .collect();

    for manifest in data.values().filter_map(Manifest::from_value) {
        for key in &manifest.chunk_keys {
            dangling.remove(key.as_str());
        }
    }

    let mut keys: Vec<String> = dangling.into_iter().map(str::to_string).collect();
    keys.sort();
    keys
}
