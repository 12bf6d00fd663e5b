use std::sync::Arc;

use async_trait::async_trait;
use stratum_area::{Area, Entries, StorageResult};

/// Separator between a view's prefix and a logical key.
pub const PREFIX_SEPARATOR: char = '.';

/// Stores and retrieves keys under particular key prefixes, so several
/// users can share one area without trampling on each other. Callers are
/// responsible for choosing unique prefixes.
///
/// With more than one prefix, writes and deletes apply to every prefix.
/// This supports migrating data between prefixes:
///
/// 1. Read/write under the old prefix only.
/// 2. Read/write under the new and old prefixes, so older and newer
///    versions can run side by side.
/// 3. Once the older version is gone, read/write under the new prefix.
/// 4. Delete the data under the old prefix with [`delete_view_prefixes`].
///
/// Prefixes are in preference order: when a key is present under several
/// prefixes, reads return the value under the earliest one.
pub struct View {
    /// Each prefix already carries the trailing separator.
    prefixes: Vec<String>,
    area: Arc<dyn Area>,
}

impl View {
    /// A view of `area` under the given prefixes, in preference order.
    pub fn new<I, S>(prefixes: I, area: Arc<dyn Area>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|p| format!("{}{PREFIX_SEPARATOR}", p.as_ref()))
            .collect();
        Self { prefixes, area }
    }

    /// The configured prefixes, without separator, in preference order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes
            .iter()
            .map(|p| p.strip_suffix(PREFIX_SEPARATOR).unwrap_or(p.as_str()))
    }

    fn physical_keys<'a>(&'a self, key: &'a str) -> impl Iterator<Item = String> + 'a {
        self.prefixes.iter().map(move |prefix| format!("{prefix}{key}"))
    }
}

#[async_trait]
impl Area for View {
    async fn set(&self, data: Entries) -> StorageResult<()> {
        let mut physical = Entries::with_capacity(data.len() * self.prefixes.len());
        for (key, value) in &data {
            for pkey in self.physical_keys(key) {
                physical.insert(pkey, value.clone());
            }
        }
        self.area.set(physical).await
    }

    async fn get(&self) -> StorageResult<Entries> {
        let data = self.area.get().await?;

        let mut logical = Entries::new();
        for prefix in &self.prefixes {
            for (key, value) in &data {
                let Some(lkey) = key.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                if !logical.contains_key(lkey) {
                    logical.insert(lkey.to_string(), value.clone());
                }
            }
        }
        Ok(logical)
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<()> {
        let physical: Vec<String> = keys.iter().flat_map(|k| self.physical_keys(k)).collect();
        self.area.delete(&physical).await
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("prefixes", &self.prefixes().collect::<Vec<_>>())
            .finish()
    }
}

/// Delete every entry stored under the given view prefixes.
///
/// Used to reclaim the space of a retired prefix once a migration is
/// complete. No prefixes means nothing to delete.
pub async fn delete_view_prefixes<I, S>(prefixes: I, area: Arc<dyn Area>) -> StorageResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let view = View::new(prefixes, area);
    if view.prefixes.is_empty() {
        return Ok(());
    }

    let data = view
        .get()
        .await
        .map_err(|e| e.context("failed to get keys"))?;
    let keys: Vec<String> = data.into_keys().collect();

    view.delete(&keys)
        .await
        .map_err(|e| e.context("failed to delete keys"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use stratum_area::{AreaFaults, MemArea, StorageError};

    fn entries(pairs: Vec<(&str, Value)>) -> Entries {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn mem_with(pairs: Vec<(&str, Value)>) -> Arc<MemArea> {
        Arc::new(MemArea::with_entries(entries(pairs)))
    }

    // -----------------------------------------------------------------------
    // Set
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_simple() {
        let mem = mem_with(vec![]);
        View::new(["foo"], mem.clone())
            .set(entries(vec![("my-key", json!(2))]))
            .await
            .unwrap();
        assert_eq!(mem.snapshot(), entries(vec![("foo.my-key", json!(2))]));
    }

    #[tokio::test]
    async fn set_multiple_values() {
        let mem = mem_with(vec![]);
        View::new(["foo"], mem.clone())
            .set(entries(vec![("my-key", json!(2)), ("other-key", json!("some-val"))]))
            .await
            .unwrap();
        assert_eq!(
            mem.snapshot(),
            entries(vec![("foo.my-key", json!(2)), ("foo.other-key", json!("some-val"))])
        );
    }

    #[tokio::test]
    async fn set_overwrites_same_prefix() {
        let mem = mem_with(vec![("foo.my-key", json!(3)), ("foo.other-key", json!("other-val"))]);
        View::new(["foo"], mem.clone())
            .set(entries(vec![("my-key", json!(2)), ("other-key", json!("some-val"))]))
            .await
            .unwrap();
        assert_eq!(
            mem.snapshot(),
            entries(vec![("foo.my-key", json!(2)), ("foo.other-key", json!("some-val"))])
        );
    }

    #[tokio::test]
    async fn set_leaves_other_prefixes() {
        let mem = mem_with(vec![("bar.my-key", json!(3)), ("bar.other-key", json!("other-val"))]);
        View::new(["foo"], mem.clone())
            .set(entries(vec![("my-key", json!(2)), ("other-key", json!("some-val"))]))
            .await
            .unwrap();
        assert_eq!(
            mem.snapshot(),
            entries(vec![
                ("bar.my-key", json!(3)),
                ("bar.other-key", json!("other-val")),
                ("foo.my-key", json!(2)),
                ("foo.other-key", json!("some-val")),
            ])
        );
    }

    #[tokio::test]
    async fn set_writes_every_prefix_in_one_call() {
        let mem = mem_with(vec![]);
        View::new(["new", "old"], mem.clone())
            .set(entries(vec![("k", json!(1))]))
            .await
            .unwrap();
        assert_eq!(
            mem.snapshot(),
            entries(vec![("new.k", json!(1)), ("old.k", json!(1))])
        );
        assert_eq!(mem.set_calls(), 1);
    }

    // -----------------------------------------------------------------------
    // Get
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_strips_prefix() {
        let mem = mem_with(vec![("foo.my-key", json!(2)), ("foo.other-key", json!("some-val"))]);
        let got = View::new(["foo"], mem).get().await.unwrap();
        assert_eq!(
            got,
            entries(vec![("my-key", json!(2)), ("other-key", json!("some-val"))])
        );
    }

    #[tokio::test]
    async fn get_ignores_other_prefixes() {
        let mem = mem_with(vec![
            ("foo.my-key", json!(2)),
            ("bar.other-key", json!("some-val")),
            ("unprefixed", json!(true)),
        ]);
        let got = View::new(["foo"], mem).get().await.unwrap();
        assert_eq!(got, entries(vec![("my-key", json!(2))]));
    }

    #[tokio::test]
    async fn isolated_from_other_views() {
        let mem = mem_with(vec![]);
        View::new(["foo"], mem.clone())
            .set(entries(vec![("k", json!(1))]))
            .await
            .unwrap();
        let got = View::new(["bar"], mem).get().await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn earlier_prefix_takes_precedence() {
        let mem = mem_with(vec![
            ("new.k", json!("new-val")),
            ("old.k", json!("old-val")),
            ("old.only-old", json!(1)),
        ]);
        let got = View::new(["new", "old"], mem.clone()).get().await.unwrap();
        assert_eq!(
            got,
            entries(vec![("k", json!("new-val")), ("only-old", json!(1))])
        );

        let got = View::new(["old", "new"], mem).get().await.unwrap();
        assert_eq!(got["k"], json!("old-val"));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_simple() {
        let mem = mem_with(vec![("foo.my-key", json!(2)), ("foo.other-key", json!("some-val"))]);
        View::new(["foo"], mem.clone())
            .delete(&["my-key".into()])
            .await
            .unwrap();
        assert_eq!(mem.snapshot(), entries(vec![("foo.other-key", json!("some-val"))]));
    }

    #[tokio::test]
    async fn delete_ignores_other_prefixes() {
        let mem = mem_with(vec![("foo.my-key", json!(2)), ("bar.my-key", json!(3))]);
        View::new(["foo"], mem.clone())
            .delete(&["my-key".into()])
            .await
            .unwrap();
        assert_eq!(mem.snapshot(), entries(vec![("bar.my-key", json!(3))]));
    }

    #[tokio::test]
    async fn delete_applies_to_every_prefix() {
        let mem = mem_with(vec![
            ("new.k", json!(1)),
            ("old.k", json!(2)),
            ("other.k", json!(3)),
        ]);
        View::new(["new", "old"], mem.clone())
            .delete(&["k".into()])
            .await
            .unwrap();
        assert_eq!(mem.snapshot(), entries(vec![("other.k", json!(3))]));
        assert_eq!(mem.delete_calls(), 1);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let mem = mem_with(vec![]);
        mem.set_faults(AreaFaults {
            get: Some("Storage.Get failed".into()),
            set: Some("Storage.Set failed".into()),
            delete: Some("Storage.Delete failed".into()),
        });
        let view = View::new(["foo"], mem);

        let err = view.get().await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(m) if m == "Storage.Get failed"));
        let err = view.set(Entries::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(m) if m == "Storage.Set failed"));
        let err = view.delete(&[]).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(m) if m == "Storage.Delete failed"));
    }

    #[test]
    fn prefixes_round_trip() {
        let view = View::new(vec!["new".to_string(), "old".to_string()], Arc::new(MemArea::new()));
        assert_eq!(view.prefixes().collect::<Vec<_>>(), vec!["new", "old"]);
        assert!(format!("{view:?}").contains("\"new\""));
    }

    // -----------------------------------------------------------------------
    // Prefix purge
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_view_prefixes_removes_all() {
        let mem = mem_with(vec![
            ("old.a", json!(1)),
            ("old.b", json!(2)),
            ("older.c", json!(3)),
            ("new.a", json!(4)),
        ]);
        delete_view_prefixes(["old", "older"], mem.clone())
            .await
            .unwrap();
        assert_eq!(mem.snapshot(), entries(vec![("new.a", json!(4))]));
    }

    #[tokio::test]
    async fn delete_view_prefixes_with_none_is_noop() {
        let mem = mem_with(vec![("old.a", json!(1))]);
        delete_view_prefixes(Vec::<String>::new(), mem.clone())
            .await
            .unwrap();
        assert_eq!(mem.len(), 1);
        assert_eq!(mem.get_calls(), 0);
        assert_eq!(mem.delete_calls(), 0);
    }

    #[tokio::test]
    async fn delete_view_prefixes_reports_step() {
        let mem = mem_with(vec![("old.a", json!(1))]);
        mem.set_faults(AreaFaults {
            delete: Some("Storage.Delete failed".into()),
            ..Default::default()
        });
        let err = delete_view_prefixes(["old"], mem.clone()).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to delete keys: Storage.Delete failed");

        mem.set_faults(AreaFaults {
            get: Some("Storage.Get failed".into()),
            ..Default::default()
        });
        let err = delete_view_prefixes(["old"], mem).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to get keys: Storage.Get failed");
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    proptest! {
        #[test]
        fn first_prefix_wins(
            keys in proptest::collection::btree_set("[a-z]{1,6}", 1..8),
            first in any::<i32>(),
            second in any::<i32>(),
        ) {
            let mem = Arc::new(MemArea::new());
            let newer = View::new(["new"], mem.clone());
            let older = View::new(["old"], mem.clone());
            let both = View::new(["new", "old"], mem.clone());

            let data = |v: i32| keys.iter().map(|k| (k.clone(), json!(v))).collect::<Entries>();
            block_on(older.set(data(second))).unwrap();
            block_on(newer.set(data(first))).unwrap();

            let got = block_on(both.get()).unwrap();
            prop_assert_eq!(got, data(first));
        }
    }
}
