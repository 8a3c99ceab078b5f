use std::collections::BTreeMap;

use async_trait::async_trait;
use extradata::{ExtraData, ExtraDataError};
use tracing::debug;

use crate::driver::VBoxManage;
use crate::error::Result;

/// One machine's extra-data namespace, loaded up front and written back as a
/// batch of buffered mutations on `save`.
pub struct VmExtraData {
    driver: VBoxManage,
    vm: String,
    data: BTreeMap<String, String>,
    /// key -> `Some(value)` for a pending set, `None` for a pending delete.
    pending: BTreeMap<String, Option<String>>,
}

impl VmExtraData {
    /// Load the namespace of `vm` (a name or UUID).
    pub async fn load(driver: VBoxManage, vm: impl Into<String>) -> Result<Self> {
        let vm = vm.into();
        let data = driver.get_extra_data(&vm).await?;
        debug!(vm = %vm, entries = data.len(), "loaded extra data");
        Ok(Self {
            driver,
            vm,
            data,
            pending: BTreeMap::new(),
        })
    }

    /// Whether there are buffered mutations `save` would flush.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[async_trait]
impl ExtraData for VmExtraData {
    fn scope(&self) -> &str {
        &self.vm
    }

    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), value.to_string());
        self.pending.insert(key.to_string(), Some(value.to_string()));
    }

    fn delete(&mut self, key: &str) {
        if self.data.remove(key).is_some() || self.pending.contains_key(key) {
            self.pending.insert(key.to_string(), None);
        }
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }

    async fn save(&mut self) -> extradata::Result<()> {
        while let Some((key, value)) = self.pending.pop_first() {
            if let Err(e) = self
                .driver
                .set_extra_data(&self.vm, &key, value.as_deref())
                .await
            {
                // keep the failed write buffered so a retry can flush it
                self.pending.insert(key, value);
                return Err(ExtraDataError::WriteFailed(e.to_string()));
            }
        }
        Ok(())
    }
}
