//! High-level API for Stratum.
//!
//! Stratum persists key-value data in storage areas that cap the size of
//! each item, such as a browser extension's sync storage. [`Storage`]
//! wires the layers together:
//!
//! ```text
//! Typed / Value  ->  View (prefixes)  ->  Big (chunking)  ->  Area
//! ```
//!
//! Applications supply the physical [`Area`]; [`MemArea`] serves for
//! tests and embedding.

pub mod config;
pub mod error;
pub mod storage;

pub use config::StorageConfig;
pub use error::{SdkError, SdkResult};
pub use storage::Storage;

// Re-export key types
pub use stratum_area::{
    run_exclusive, Area, AreaFaults, Entries, Lock, LockGuard, MemArea, NamedLock, StorageError,
    StorageResult,
};
pub use stratum_big::{is_chunk_key, Big, BigConfig, Manifest};
pub use stratum_view::{delete_view_prefixes, Typed, Value, View};
