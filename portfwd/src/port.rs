use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use extradata::SharedExtraData;
use tracing::warn;

use crate::dirty::Tracked;
use crate::error::{PortError, Result};
use crate::validation::ValidationErrors;

/// NAT device name VirtualBox wires up by default.
pub const DEFAULT_DEVICE: &str = "pcnet";

/// Leaf keys a rule occupies under its prefix.
const LEAVES: [&str; 3] = ["GuestPort", "HostPort", "Protocol"];

fn rule_prefix(device: &str, instance: u32, name: &str) -> String {
    format!("VBoxInternal/Devices/{device}/{instance}/LUN#0/Config/{name}/")
}

#[derive(Debug, thiserror::Error)]
#[error("unknown protocol: {0}")]
pub struct ParseProtocolError(String);

/// Transport protocol of a forwarding rule. VirtualBox stores it uppercase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Protocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Protocol::Udp)
        } else {
            Err(ParseProtocolError(s.to_string()))
        }
    }
}

/// Identity parsed out of a rule's `GuestPort` key.
pub(crate) struct RuleKey {
    pub device: String,
    pub instance: u32,
    pub name: String,
}

/// Parse `VBoxInternal/Devices/<device>/<instance>/LUN#0/Config/<name>/GuestPort`.
/// Any other key shape is not a forwarding rule.
pub(crate) fn parse_guestport_key(key: &str) -> Option<RuleKey> {
    let rest = key.strip_prefix("VBoxInternal/Devices/")?;
    let mut parts = rest.split('/');
    let device = parts.next()?;
    let instance: u32 = parts.next()?.parse().ok()?;
    if parts.next()? != "LUN#0" || parts.next()? != "Config" {
        return None;
    }
    let name = parts.next()?;
    if parts.next()? != "GuestPort" || parts.next().is_some() {
        return None;
    }
    if device.is_empty() || name.is_empty() {
        return None;
    }
    Some(RuleKey {
        device: device.to_string(),
        instance,
        name: name.to_string(),
    })
}

/// One NAT port-forwarding rule, persisted as three extra-data keys under a
/// prefix derived from device, instance, and rule name.
pub struct ForwardedPort {
    parent: Option<SharedExtraData>,
    new_record: bool,
    name: Tracked<Option<String>>,
    protocol: Tracked<Protocol>,
    guestport: Tracked<Option<u16>>,
    hostport: Tracked<Option<u16>>,
    device: Tracked<String>,
    instance: Tracked<u32>,
}

impl Default for ForwardedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardedPort {
    pub fn new() -> Self {
        Self {
            parent: None,
            new_record: true,
            name: Tracked::new(None),
            protocol: Tracked::new(Protocol::Tcp),
            guestport: Tracked::new(None),
            hostport: Tracked::new(None),
            device: Tracked::new(DEFAULT_DEVICE.to_string()),
            instance: Tracked::new(0),
        }
    }

    // -- attributes --

    pub fn name(&self) -> Option<&str> {
        self.name.get().as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set(Some(name.into()));
    }

    pub fn clear_name(&mut self) {
        self.name.set(None);
    }

    pub fn name_changed(&self) -> bool {
        self.name.changed()
    }

    /// The name the rule was last persisted under, falling back to the
    /// current name when no rename is pending.
    pub fn previous_name(&self) -> Option<&str> {
        self.name.previous().unwrap_or_else(|| self.name.get()).as_deref()
    }

    pub fn guestport(&self) -> Option<u16> {
        *self.guestport.get()
    }

    pub fn set_guestport(&mut self, port: u16) {
        self.guestport.set(Some(port));
    }

    pub fn clear_guestport(&mut self) {
        self.guestport.set(None);
    }

    pub fn hostport(&self) -> Option<u16> {
        *self.hostport.get()
    }

    pub fn set_hostport(&mut self, port: u16) {
        self.hostport.set(Some(port));
    }

    pub fn clear_hostport(&mut self) {
        self.hostport.set(None);
    }

    pub fn protocol(&self) -> Protocol {
        *self.protocol.get()
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol.set(protocol);
    }

    pub fn device(&self) -> &str {
        self.device.get()
    }

    pub fn set_device(&mut self, device: impl Into<String>) {
        self.device.set(device.into());
    }

    pub fn instance(&self) -> u32 {
        *self.instance.get()
    }

    pub fn set_instance(&mut self, instance: u32) {
        self.instance.set(instance);
    }

    // -- relationship --

    /// Bind the record to its parent machine's store.
    pub fn attach(&mut self, parent: SharedExtraData) {
        self.parent = Some(parent);
    }

    pub fn detach(&mut self) {
        self.parent = None;
    }

    pub fn attached(&self) -> bool {
        self.parent.is_some()
    }

    // -- record state --

    /// Whether the record has never been persisted.
    pub fn new_record(&self) -> bool {
        self.new_record
    }

    /// Mark the record as already persisted. The current attribute values
    /// become the persisted baseline.
    pub fn mark_existing(&mut self) {
        self.new_record = false;
        self.commit_all();
    }

    pub fn changed(&self) -> bool {
        self.name.changed()
            || self.protocol.changed()
            || self.guestport.changed()
            || self.hostport.changed()
            || self.device.changed()
            || self.instance.changed()
    }

    fn commit_all(&mut self) {
        self.name.commit();
        self.protocol.commit();
        self.guestport.commit();
        self.hostport.commit();
        self.device.commit();
        self.instance.commit();
    }

    // -- validation --

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        errors.require(self.name.get().is_some(), "name");
        errors.require(self.guestport.get().is_some(), "guestport");
        errors.require(self.hostport.get().is_some(), "hostport");
        if self.parent.is_none() {
            errors.add("parent", "record must be attached to a machine");
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    // -- keys --

    /// Extra-data key prefix for this rule.
    pub fn key_prefix(&self) -> String {
        rule_prefix(
            self.device.get(),
            *self.instance.get(),
            self.name().unwrap_or_default(),
        )
    }

    /// Key prefix the rule was last persisted under: uses the pre-rename
    /// name while a rename is pending.
    pub fn previous_key_prefix(&self) -> String {
        rule_prefix(
            self.device.get(),
            *self.instance.get(),
            self.previous_name().unwrap_or_default(),
        )
    }

    // -- persistence --

    /// Validate and persist the rule. A validation failure is reported as
    /// `Ok(false)`; an existing, unchanged record is `Ok(true)` without any
    /// store access. Renames delete the prior key set first.
    pub async fn save(&mut self) -> Result<bool> {
        match self.save_inner().await {
            Ok(()) => Ok(true),
            Err(PortError::Validation(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like [`save`](Self::save), but a validation failure is an error.
    pub async fn save_strict(&mut self) -> Result<()> {
        self.save_inner().await
    }

    async fn save_inner(&mut self) -> Result<()> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(PortError::Validation(errors));
        }
        if !self.new_record && !self.changed() {
            return Ok(());
        }

        // validate() guarantees all of these are present
        let (Some(guestport), Some(hostport), Some(parent)) = (
            self.guestport(),
            self.hostport(),
            self.parent.clone(),
        ) else {
            return Err(PortError::Detached);
        };

        if !self.new_record && self.name.changed() {
            // the old keys live under the old name; drop them first
            self.destroy().await?;
        }

        let prefix = self.key_prefix();
        {
            let mut store = parent.lock().await;
            store.set(&format!("{prefix}GuestPort"), &guestport.to_string());
            store.set(&format!("{prefix}HostPort"), &hostport.to_string());
            store.set(&format!("{prefix}Protocol"), &self.protocol().to_string());
            store.save().await?;
        }

        self.new_record = false;
        self.commit_all();
        Ok(())
    }

    /// Delete the rule's keys from the parent store's view. A record that
    /// was never persisted is a no-op. The record reverts to a new record.
    pub async fn destroy(&mut self) -> Result<()> {
        if self.new_record {
            return Ok(());
        }
        let Some(parent) = self.parent.clone() else {
            return Err(PortError::Detached);
        };
        let prefix = self.previous_key_prefix();
        let mut store = parent.lock().await;
        for leaf in LEAVES {
            store.delete(&format!("{prefix}{leaf}"));
        }
        self.new_record = true;
        Ok(())
    }

    /// Rebuild a persisted rule from a snapshot of its parent's namespace.
    /// Returns `None` when the port values do not round-trip as `u16`.
    pub(crate) fn from_store_entry(
        parent: SharedExtraData,
        key: &RuleKey,
        entries: &BTreeMap<String, String>,
    ) -> Option<Self> {
        let prefix = rule_prefix(&key.device, key.instance, &key.name);

        let parse_port = |leaf: &str| -> Option<u16> {
            let raw = entries.get(&format!("{prefix}{leaf}"))?;
            match raw.parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(rule = %key.name, leaf = %leaf, value = %raw, "unparsable port value");
                    None
                }
            }
        };
        let guestport = parse_port("GuestPort")?;
        let Some(hostport) = parse_port("HostPort") else {
            warn!(rule = %key.name, "skipping rule without a usable host port");
            return None;
        };

        let protocol = match entries.get(&format!("{prefix}Protocol")) {
            None => Protocol::Tcp,
            Some(raw) => match raw.parse() {
                Ok(protocol) => protocol,
                Err(_) => {
                    warn!(rule = %key.name, value = %raw, "unknown protocol, defaulting to TCP");
                    Protocol::Tcp
                }
            },
        };

        let mut port = Self::new();
        port.set_device(&key.device);
        port.set_instance(key.instance);
        port.set_name(&key.name);
        port.set_guestport(guestport);
        port.set_hostport(hostport);
        port.set_protocol(protocol);
        port.attach(parent);
        port.mark_existing();
        Some(port)
    }
}
