//! In-process named locks.
//!
//! [`NamedLock`] hands out one async mutex per resource name. Waiters on a
//! resource are served first-in first-out, as `tokio::sync::Mutex` is fair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::error::{StorageError, StorageResult};
use crate::traits::{Lock, LockGuard};

/// A registry of async mutexes keyed by resource name.
#[derive(Default)]
pub struct NamedLock {
    resources: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NamedLock {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. Stores that share it and use the same
    /// resource name serialize against each other.
    pub fn global() -> Arc<NamedLock> {
        static GLOBAL: OnceLock<Arc<NamedLock>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(NamedLock::new())))
    }

    /// Number of distinct resources that have been requested.
    pub fn resource_count(&self) -> usize {
        self.resources.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn mutex_for(&self, resource: &str) -> StorageResult<Arc<AsyncMutex<()>>> {
        let mut resources = self.resources.lock().map_err(|e| StorageError::Lock {
            resource: resource.to_string(),
            reason: format!("registry poisoned: {e}"),
        })?;
        Ok(Arc::clone(
            resources
                .entry(resource.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        ))
    }
}

#[async_trait]
impl Lock for NamedLock {
    async fn acquire(&self, resource: &str) -> StorageResult<LockGuard> {
        let mutex = self.mutex_for(resource)?;
        let held = mutex.lock_owned().await;
        trace!(resource, "lock acquired");
        Ok(LockGuard::new(resource, held))
    }
}

impl std::fmt::Debug for NamedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedLock")
            .field("resource_count", &self.resource_count())
            .finish()
    }
}
