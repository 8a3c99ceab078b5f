use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use extradata::SharedExtraData;
use tracing::warn;

use crate::error::Result;
use crate::port::{ForwardedPort, parse_guestport_key};

/// The forwarding rules bound to one machine's extra-data store.
pub struct Collection {
    parent: SharedExtraData,
    items: Vec<ForwardedPort>,
}

impl Collection {
    pub fn new(parent: SharedExtraData) -> Self {
        Self {
            parent,
            items: Vec::new(),
        }
    }

    /// Read all well-formed forwarding rules out of the parent store.
    pub async fn populate(parent: SharedExtraData) -> Self {
        let entries = parent.lock().await.snapshot();
        Self::from_entries(parent, &entries)
    }

    /// Build a collection from a point-in-time snapshot of the namespace.
    /// Keys that do not look like forwarding rules are ignored.
    pub fn from_entries(parent: SharedExtraData, entries: &BTreeMap<String, String>) -> Self {
        let mut items = Vec::new();
        for key in entries.keys() {
            let Some(rule) = parse_guestport_key(key) else {
                continue;
            };
            if let Some(port) = ForwardedPort::from_store_entry(parent.clone(), &rule, entries) {
                items.push(port);
            }
        }
        Self { parent, items }
    }

    /// Attach `port` to this collection's parent machine and take ownership.
    pub fn push(&mut self, mut port: ForwardedPort) {
        port.attach(self.parent.clone());
        self.items.push(port);
    }

    pub fn find(&self, name: &str) -> Option<&ForwardedPort> {
        self.items.iter().find(|p| p.name() == Some(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ForwardedPort> {
        self.items.iter_mut().find(|p| p.name() == Some(name))
    }

    /// Detach and hand back the named rule without touching the store.
    pub fn remove(&mut self, name: &str) -> Option<ForwardedPort> {
        let idx = self.items.iter().position(|p| p.name() == Some(name))?;
        let mut port = self.items.remove(idx);
        port.detach();
        Some(port)
    }

    /// Save every rule in the collection. Returns `false` when any rule
    /// failed validation; store errors abort immediately.
    pub async fn save_all(&mut self) -> Result<bool> {
        let mut all_saved = true;
        for port in &mut self.items {
            if !port.save().await? {
                warn!(
                    name = %port.name().unwrap_or("<unnamed>"),
                    "skipping invalid forwarding rule"
                );
                all_saved = false;
            }
        }
        Ok(all_saved)
    }

    /// Destroy the named rule's keys and drop it from the collection.
    /// Returns `false` when no rule has that name. The parent store still
    /// needs a flush for the deletes to reach the hypervisor.
    pub async fn destroy(&mut self, name: &str) -> Result<bool> {
        let Some(idx) = self.items.iter().position(|p| p.name() == Some(name)) else {
            return Ok(false);
        };
        let mut port = self.items.remove(idx);
        port.destroy().await?;
        Ok(true)
    }
}

impl Deref for Collection {
    type Target = [ForwardedPort];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl DerefMut for Collection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}
