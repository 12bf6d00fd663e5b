//! Chunked storage for Stratum.
//!
//! Browser extension storage caps the size of each item. [`Big`] wraps an
//! [`Area`](stratum_area::Area) and lifts that cap: values whose JSON
//! encoding does not fit are split into base64 chunks, each stored under a
//! key derived from the SHA-256 of its content, and the value itself is
//! replaced by a [`Manifest`] listing those keys.
//!
//! # Physical Layout
//!
//! - plain values are stored unchanged under their own key
//! - chunks live under `chunk-<magic>:<base64 sha256>`
//! - manifests are `{"magic": <magic>, "chunkKeys": [...]}`
//!
//! # Design Rules
//!
//! 1. Chunks are immutable; identical content is stored once.
//! 2. All staged entries of a `set` go to the area in one call.
//! 3. Every `delete` sweeps chunks no manifest references.
//! 4. All operations on a store hold the same named lock.

pub mod big;
pub mod config;
pub mod manifest;

pub use big::Big;
pub use config::{BigConfig, DEFAULT_LOCK_RESOURCE, DEFAULT_MAX_ITEM_BYTES};
pub use manifest::{
    chunk_key, dangling_chunk_keys, is_chunk_key, Manifest, CHUNK_KEY_LEN, CHUNK_KEY_PREFIX,
    MANIFEST_MAGIC,
};
