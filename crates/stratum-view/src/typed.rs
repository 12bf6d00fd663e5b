use std::marker::PhantomData;
use std::sync::Arc;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stratum_area::{Area, Entries, StorageResult};
use tracing::warn;

use crate::view::View;

/// A collection of typed values. Values are serialized on write and
/// deserialized on read; values that fail to deserialize are skipped.
///
/// Each value is stored under its own randomly generated key, so
/// concurrent writers never touch each other's entries.
pub struct Typed<V> {
    view: View,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Typed<V>
where
    V: Serialize + DeserializeOwned,
{
    /// A collection stored in `area` under the given key prefixes. Several
    /// prefixes may be supplied to migrate between them; see [`View`].
    pub fn new<I, S>(area: Arc<dyn Area>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            view: View::new(prefixes, area),
            _marker: PhantomData,
        }
    }

    /// All stored values that parse, along with their keys.
    async fn read_all_items(&self) -> StorageResult<Vec<(String, V)>> {
        let data = self.view.get().await?;

        let mut items = Vec::with_capacity(data.len());
        for (key, value) in data {
            match serde_json::from_value::<V>(value) {
                Ok(v) => items.push((key, v)),
                Err(e) => warn!(key = %key, error = %e, "failed to parse value; dropping"),
            }
        }
        Ok(items)
    }

    /// All stored values, in no particular order.
    pub async fn read_all(&self) -> StorageResult<Vec<V>> {
        let items = self.read_all_items().await?;
        Ok(items.into_iter().map(|(_, v)| v).collect())
    }

    /// A value matching `test`, or `None` if there is none. If several
    /// values match, which one is returned is unspecified.
    pub async fn read<F>(&self, test: F) -> StorageResult<Option<V>>
    where
        F: Fn(&V) -> bool,
    {
        let values = self.read_all().await?;
        Ok(values.into_iter().find(|v| test(v)))
    }

    /// Store a new value and return the key it was stored under.
    pub async fn write(&self, value: &V) -> StorageResult<String> {
        let key = rand::thread_rng().gen_range(0..i64::MAX).to_string();
        let mut data = Entries::with_capacity(1);
        data.insert(key.clone(), serde_json::to_value(value)?);
        self.view.set(data).await?;
        Ok(key)
    }

    /// Remove every value matching `test`. Returns how many were removed.
    pub async fn delete<F>(&self, test: F) -> StorageResult<usize>
    where
        F: Fn(&V) -> bool,
    {
        let items = self
            .read_all_items()
            .await
            .map_err(|e| e.context("failed to enumerate values"))?;

        let keys: Vec<String> = items
            .into_iter()
            .filter(|(_, v)| test(v))
            .map(|(k, _)| k)
            .collect();
        self.view.delete(&keys).await?;
        Ok(keys.len())
    }
}

impl<V> std::fmt::Debug for Typed<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typed").field("view", &self.view).finish()
    }
}
