use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

/// A machine's flat string key-value configuration namespace.
///
/// `set` and `delete` apply to the in-memory view immediately; `save` flushes
/// the buffered mutations to the underlying store. Readers always see the
/// mutated view, whether or not it has been flushed yet.
#[async_trait]
pub trait ExtraData: Send {
    /// The machine this namespace belongs to, or `"global"`.
    fn scope(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn delete(&mut self, key: &str);

    /// A point-in-time copy of the full namespace.
    fn snapshot(&self) -> BTreeMap<String, String>;

    /// Flush buffered mutations to the underlying store.
    async fn save(&mut self) -> Result<()>;
}

/// Handle a record holds on its parent machine's store.
pub type SharedExtraData = Arc<Mutex<dyn ExtraData>>;

/// Wrap a store into a [`SharedExtraData`] handle.
pub fn shared<S: ExtraData + 'static>(store: S) -> SharedExtraData {
    Arc::new(Mutex::new(store))
}
