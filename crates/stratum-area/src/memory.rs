use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StorageError, StorageResult};
use crate::traits::{Area, Entries};

/// Failures that [`MemArea`] should report instead of performing an
/// operation. Useful for exercising error paths in tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AreaFaults {
    /// Error message returned by `get`.
    pub get: Option<String>,
    /// Error message returned by `set`.
    pub set: Option<String>,
    /// Error message returned by `delete`.
    pub delete: Option<String>,
}

/// In-memory, HashMap-based storage area.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`
/// and cloned on read. Every operation is counted so tests can assert how
/// many physical calls a layer issued.
pub struct MemArea {
    entries: RwLock<HashMap<String, Value>>,
    faults: RwLock<AreaFaults>,
    set_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemArea {
    /// Create a new empty area.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            faults: RwLock::new(AreaFaults::default()),
            set_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Create an area pre-populated with `entries`.
    pub fn with_entries(entries: Entries) -> Self {
        let area = Self::new();
        area.entries.write().expect("lock poisoned").extend(entries);
        area
    }

    /// Make subsequent operations fail as described by `faults`.
    pub fn set_faults(&self, faults: AreaFaults) {
        *self.faults.write().expect("lock poisoned") = faults;
    }

    /// Stop injecting failures.
    pub fn clear_faults(&self) {
        self.set_faults(AreaFaults::default());
    }

    /// A copy of everything stored, bypassing faults and counters.
    pub fn snapshot(&self) -> Entries {
        self.entries.read().expect("lock poisoned").clone()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the area is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Return a sorted list of all stored keys.
    pub fn keys(&self) -> Vec<String> {
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of `set` calls made so far.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Number of `get` calls made so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls made so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn fault(&self, pick: impl Fn(&AreaFaults) -> Option<String>) -> StorageResult<()> {
        match pick(&self.faults.read().expect("lock poisoned")) {
            Some(msg) => Err(StorageError::Backend(msg)),
            None => Ok(()),
        }
    }
}

impl Default for MemArea {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Area for MemArea {
    async fn set(&self, data: Entries) -> StorageResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.fault(|f| f.set.clone())?;
        self.entries.write().expect("lock poisoned").extend(data);
        Ok(())
    }

    async fn get(&self) -> StorageResult<Entries> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.fault(|f| f.get.clone())?;
        Ok(self.snapshot())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.fault(|f| f.delete.clone())?;
        if keys.is_empty() {
            return Ok(());
        }
        let mut map = self.entries.write().expect("lock poisoned");
        for k in keys {
            map.remove(k);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemArea")
            .field("entry_count", &self.len())
            .finish()
    }
}
