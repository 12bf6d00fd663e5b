use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stratum_area::{Area, Lock, MemArea, NamedLock};
use stratum_big::Big;
use stratum_view::{delete_view_prefixes, Typed, Value, View};
use tracing::info;

use crate::config::StorageConfig;
use crate::error::SdkResult;

/// A storage stack over a physical area: views and typed accessors on top,
/// optionally chunking oversized values underneath.
pub struct Storage {
    area: Arc<dyn Area>,
    big: Option<Arc<Big>>,
}

impl Storage {
    /// Build the stack over `area`, coordinating chunked operations through
    /// the process-wide [`NamedLock`].
    pub fn open(config: &StorageConfig, area: Arc<dyn Area>) -> SdkResult<Self> {
        Self::open_with_lock(config, area, NamedLock::global())
    }

    /// Build the stack over `area`, coordinating chunked operations through
    /// `lock`.
    pub fn open_with_lock(
        config: &StorageConfig,
        area: Arc<dyn Area>,
        lock: Arc<dyn Lock>,
    ) -> SdkResult<Self> {
        let big = if config.chunked {
            Some(Arc::new(Big::new(config.big.clone(), area.clone(), lock)?))
        } else {
            None
        };
        info!(
            chunked = config.chunked,
            max_item_bytes = config.big.max_item_bytes,
            "storage opened"
        );
        Ok(Self { area, big })
    }

    /// A stack over a fresh in-memory area, with its own lock registry.
    pub fn in_memory(config: &StorageConfig) -> SdkResult<(Self, Arc<MemArea>)> {
        let mem = Arc::new(MemArea::new());
        let storage = Self::open_with_lock(config, mem.clone(), Arc::new(NamedLock::new()))?;
        Ok((storage, mem))
    }

    /// The area views are built on: the chunked store when chunking is
    /// enabled, the physical area otherwise.
    pub fn area(&self) -> Arc<dyn Area> {
        match &self.big {
            Some(big) => big.clone() as Arc<dyn Area>,
            None => self.area.clone(),
        }
    }

    /// The physical area underneath every layer.
    pub fn physical(&self) -> &Arc<dyn Area> {
        &self.area
    }

    pub fn view<I, S>(&self, prefixes: I) -> View
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        View::new(prefixes, self.area())
    }

    pub fn typed<V, I, S>(&self, prefixes: I) -> Typed<V>
    where
        V: Serialize + DeserializeOwned,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Typed::new(self.area(), prefixes)
    }

    pub fn value<V, I, S>(&self, prefixes: I) -> Value<V>
    where
        V: Serialize + DeserializeOwned + Default,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Value::new(self.area(), prefixes)
    }

    /// Delete all data stored under retired view prefixes.
    pub async fn purge_prefixes<I, S>(&self, prefixes: I) -> SdkResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        delete_view_prefixes(prefixes, self.area()).await?;
        Ok(())
    }

    /// Reclaim chunks no value references. Returns how many were removed;
    /// always zero without chunking.
    pub async fn collect_garbage(&self) -> SdkResult<usize> {
        match &self.big {
            Some(big) => Ok(big.collect_garbage().await?),
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("chunked", &self.big.is_some())
            .finish()
    }
}
