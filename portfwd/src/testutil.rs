use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use extradata::{ExtraData, SharedExtraData};

/// Everything a [`RecordingStore`] observed.
#[derive(Default)]
pub(crate) struct Recorded {
    pub data: BTreeMap<String, String>,
    pub sets: Vec<(String, String)>,
    pub deletes: Vec<String>,
    pub saves: usize,
}

/// Store double that records every call so tests can assert on the exact
/// persistence traffic a record produces.
#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingStore {
    /// Seed the namespace without recording the writes.
    pub fn with_data<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let store = Self::default();
        store.inner.lock().unwrap().data = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        store
    }

    pub fn shared(&self) -> SharedExtraData {
        extradata::shared(self.clone())
    }

    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl ExtraData for RecordingStore {
    fn scope(&self) -> &str {
        "test-vm"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.insert(key.to_string(), value.to_string());
        inner.sets.push((key.to_string(), value.to_string()));
    }

    fn delete(&mut self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.remove(key);
        inner.deletes.push(key.to_string());
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.lock().unwrap().data.clone()
    }

    async fn save(&mut self) -> extradata::Result<()> {
        self.inner.lock().unwrap().saves += 1;
        Ok(())
    }
}
