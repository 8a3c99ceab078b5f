use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::store::ExtraData;

/// In-memory extra data store. Backs tests and offline assembly of a
/// namespace; `save` has nothing to flush to and always succeeds.
#[derive(Debug)]
pub struct MemoryExtraData {
    scope: String,
    data: BTreeMap<String, String>,
}

impl MemoryExtraData {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            data: BTreeMap::new(),
        }
    }

    /// Build a store pre-seeded with `entries`.
    pub fn with_entries<I>(scope: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            scope: scope.into(),
            data: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryExtraData {
    fn default() -> Self {
        Self::new("global")
    }
}

#[async_trait]
impl ExtraData for MemoryExtraData {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), value.to_string());
    }

    fn delete(&mut self, key: &str) {
        self.data.remove(key);
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }

    async fn save(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut store = MemoryExtraData::new("test-vm");
        store.set("a/b", "1");
        assert_eq!(store.get("a/b").as_deref(), Some("1"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let mut store = MemoryExtraData::new("test-vm");
        store.set("k", "old");
        store.set("k", "new");
        assert_eq!(store.get("k").as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_removes_the_key() {
        let mut store = MemoryExtraData::new("test-vm");
        store.set("k", "v");
        store.delete("k");
        assert_eq!(store.get("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut store = MemoryExtraData::new("test-vm");
        store.set("k", "v");
        let snap = store.snapshot();
        store.set("k2", "v2");
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn with_entries_seeds_the_namespace() {
        let store = MemoryExtraData::with_entries(
            "test-vm",
            [("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())],
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.scope(), "test-vm");
    }

    #[tokio::test]
    async fn save_always_succeeds() {
        let mut store = MemoryExtraData::default();
        store.set("k", "v");
        store.save().await.unwrap();
        assert_eq!(store.scope(), "global");
    }
}
