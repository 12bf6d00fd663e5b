/// Errors from storage layer operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Opaque failure reported by the physical storage area.
    #[error("{0}")]
    Backend(String),

    /// The lock collaborator failed to grant or hold access.
    #[error("lock {resource} unavailable: {reason}")]
    Lock { resource: String, reason: String },

    /// A manifest references a chunk that is not present.
    #[error("failed to read data; chunk key {0} missing")]
    MissingChunk(String),

    /// A chunk's content could not be decoded.
    #[error("failed to read data; chunk {key} undecodable: {reason}")]
    ChunkDecode { key: String, reason: String },

    /// The configured item size cannot hold even a single chunk.
    #[error("max_item_bytes={max_item_bytes} is insufficient; chunk_key_len={chunk_key_len}")]
    Config {
        max_item_bytes: usize,
        chunk_key_len: usize,
    },

    /// A stored singleton value could not be deserialized.
    #[error("parse failed for {key}: {reason}")]
    Parse { key: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An inner failure annotated with the step that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Wrap this error with a description of the failing step.
    pub fn context(self, context: impl Into<String>) -> Self {
        StorageError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &StorageError {
        match self {
            StorageError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
