use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;

/// A set of key-value pairs as exchanged with an [`Area`].
pub type Entries = HashMap<String, Value>;

/// Flat key-value storage area.
///
/// This is the contract every layer builds on and every layer implements,
/// so layers stack freely. It mirrors the small subset of a browser
/// extension's storage area API that the layers need:
/// - `set` stores all pairs, overwriting existing keys.
/// - `get` returns every item currently stored.
/// - `delete` removes the given keys; unknown keys are silently ignored.
///
/// Errors are opaque to callers and propagate unchanged through layers.
#[async_trait]
pub trait Area: Send + Sync {
    /// Store `data`, overwriting any existing keys.
    async fn set(&self, data: Entries) -> StorageResult<()>;

    /// Read all items currently stored.
    async fn get(&self) -> StorageResult<Entries>;

    /// Remove the items with the given keys. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> StorageResult<()>;
}

/// Held while exclusive access to a named resource is granted. Access is
/// released when the guard is dropped.
pub struct LockGuard {
    resource: String,
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    /// Build a guard that keeps `held` alive until it is dropped.
    pub fn new(resource: impl Into<String>, held: impl Send + Sync + 'static) -> Self {
        Self {
            resource: resource.into(),
            _held: Box::new(held),
        }
    }

    /// The resource this guard grants access to.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("resource", &self.resource)
            .finish()
    }
}

/// Mutual exclusion over named resources.
///
/// Callers waiting on the same resource are granted access in the
/// implementation's fairness order.
#[async_trait]
pub trait Lock: Send + Sync {
    /// Wait for exclusive access to `resource`.
    async fn acquire(&self, resource: &str) -> StorageResult<LockGuard>;
}

/// Run `f` while holding exclusive access to `resource`.
///
/// `f` may itself perform further async operations; access is released
/// once its future completes, whether it succeeded or not.
pub async fn run_exclusive<F, Fut, T>(lock: &dyn Lock, resource: &str, f: F) -> StorageResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let _guard = lock.acquire(resource).await?;
    f().await
}
