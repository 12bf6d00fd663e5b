use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stratum_area::{Area, Entries, StorageError, StorageResult};

use crate::view::View;

/// Key under which the single value is stored.
pub const VALUE_KEY: &str = "current";

/// Reads and writes a single value.
///
/// Unlike [`Typed`](crate::Typed), a stored value that fails to parse is an
/// error rather than something to skip.
pub struct Value<V> {
    view: View,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Value<V>
where
    V: Serialize + DeserializeOwned + Default,
{
    /// A value stored in `area` under the given key prefixes. Several
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

    /// The current value, or the default if none has been stored.
    pub async fn get(&self) -> StorageResult<V> {
        let mut data = self.view.get().await?;
        let Some(value) = data.remove(VALUE_KEY) else {
            return Ok(V::default());
        };
        serde_json::from_value(value).map_err(|e| StorageError::Parse {
            key: VALUE_KEY.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the stored value.
    pub async fn set(&self, value: &V) -> StorageResult<()> {
        let mut data = Entries::with_capacity(1);
        data.insert(VALUE_KEY.to_string(), serde_json::to_value(value)?);
        self.view.set(data).await
    }
}

impl<V> std::fmt::Debug for Value<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value").field("view", &self.view).finish()
    }
}
