use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use stratum_area::{run_exclusive, Area, Entries, Lock, StorageResult};
use tracing::debug;

use crate::config::BigConfig;
use crate::manifest::{chunk_key, dangling_chunk_keys, is_chunk_key, Manifest};

/// Stores keys and values of arbitrary size. Items that fit within the
/// per-item quota are stored normally; larger ones are split into chunks
/// and replaced by a [`Manifest`].
///
/// The overall quota of the underlying area still applies; only the
/// per-item quota is bypassed.
///
/// Chunks can be shared by several manifests, so every operation runs
/// under one named lock to give garbage collection a consistent view.
pub struct Big {
    config: BigConfig,
    area: Arc<dyn Area>,
    lock: Arc<dyn Lock>,
}

impl Big {
    /// Create a chunked store over `area`, coordinating through `lock`.
    ///
    /// Fails if `config` leaves no room for a single chunk.
    pub fn new(config: BigConfig, area: Arc<dyn Area>, lock: Arc<dyn Lock>) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self { config, area, lock })
    }

    pub fn config(&self) -> &BigConfig {
        &self.config
    }

    /// The area holding manifests and chunks.
    pub fn inner(&self) -> &Arc<dyn Area> {
        &self.area
    }

    /// Delete chunks that no manifest references. Returns how many were
    /// removed.
    pub async fn collect_garbage(&self) -> StorageResult<usize> {
        let removed = run_exclusive(self.lock.as_ref(), &self.config.lock_resource, || {
            self.sweep()
        })
        .await?;
        debug!(removed, "garbage collection complete");
        Ok(removed)
    }

    /// Replace oversized values in `data` by manifests, adding their chunks.
    fn stage(&self, data: Entries) -> StorageResult<Entries> {
        let window = self.config.chunk_window()?;

        let mut staged = Entries::with_capacity(data.len());
        for (key, value) in data {
            let json = serde_json::to_string(&value)?;
            if self.config.can_store(&key, &json) {
                staged.insert(key, value);
                continue;
            }

            // Split on byte boundaries; chunks are base64-encoded so a
            // multi-byte character may safely straddle two of them.
            let mut manifest = Manifest::new();
            for window_bytes in json.as_bytes().chunks(window) {
                let chunk = STANDARD.encode(window_bytes);
                let ckey = chunk_key(&chunk);
                manifest.chunk_keys.push(ckey.clone());
                staged.insert(ckey, Value::String(chunk));
            }
            debug!(
                key = %key,
                bytes = json.len(),
                chunks = manifest.chunk_keys.len(),
                "value chunked"
            );
            staged.insert(key, manifest.to_value()?);
        }
        Ok(staged)
    }

    /// Must be called with the lock held.
    async fn sweep(&self) -> StorageResult<usize> {
        let data = self
            .area
            .get()
            .await
            .map_err(|e| e.context("failed to query for dangling chunks"))?;

        let dangling = dangling_chunk_keys(&data);
        if dangling.is_empty() {
            return Ok(0);
        }
        self.area
            .delete(&dangling)
            .await
            .map_err(|e| e.context("failed to delete dangling chunks"))?;
        Ok(dangling.len())
    }
}

#[async_trait]
impl Area for Big {
    async fn set(&self, data: Entries) -> StorageResult<()> {
        let staged = self.stage(data)?;
        run_exclusive(self.lock.as_ref(), &self.config.lock_resource, || {
            self.area.set(staged)
        })
        .await
    }

    async fn get(&self) -> StorageResult<Entries> {
        let data = run_exclusive(self.lock.as_ref(), &self.config.lock_resource, || {
            self.area.get()
        })
        .await?;

        let mut values = Entries::with_capacity(data.len());
        for (key, value) in &data {
            if is_chunk_key(key) {
                // Chunks are only read through their manifests.
                continue;
            }
            let value = match Manifest::from_value(value) {
                Some(manifest) => manifest.reassemble(&data)?,
                None => value.clone(),
            };
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<()> {
        let removed = run_exclusive(self.lock.as_ref(), &self.config.lock_resource, || async move {
            self.area.delete(keys).await?;
            // Sweeping after every delete reclaims the chunks of the values
            // just deleted as well as any left dangling earlier.
            self.sweep().await
        })
        .await?;
        debug!(deleted = keys.len(), removed, "keys deleted");
        Ok(())
    }
}

impl std::fmt::Debug for Big {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Big").field("config", &self.config).finish()
    }
}
