use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::trace;

use crate::command;
use crate::error::{Result, VBoxManageError};

/// Handle to the host's `VBoxManage` binary.
#[derive(Debug, Clone)]
pub struct VBoxManage {
    binary: PathBuf,
}

impl VBoxManage {
    /// Locate `VBoxManage` on `PATH`.
    pub fn locate() -> Result<Self> {
        let binary =
            which::which("VBoxManage").map_err(|e| VBoxManageError::NotFound(e.to_string()))?;
        Ok(Self { binary })
    }

    /// Use an explicit binary path (non-standard installs, tests).
    pub fn at(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub async fn version(&self) -> Result<String> {
        Ok(command::exec(&self.binary, &["--version"]).await?)
    }

    /// Read the full extra-data namespace of `vm` (a name or UUID).
    pub async fn get_extra_data(&self, vm: &str) -> Result<BTreeMap<String, String>> {
        let output = command::exec(&self.binary, &["getextradata", vm, "enumerate"]).await?;
        Ok(parse_enumerate(&output))
    }

    /// Write one key. An empty value deletes the key, as VBoxManage defines
    /// it, so deletion is `value = None`.
    pub async fn set_extra_data(&self, vm: &str, key: &str, value: Option<&str>) -> Result<()> {
        let mut args = vec!["setextradata", vm, key];
        if let Some(value) = value {
            args.push(value);
        }
        command::exec(&self.binary, &args).await?;
        trace!(vm = %vm, key = %key, deleted = value.is_none(), "setextradata");
        Ok(())
    }
}

/// Parse `getextradata <vm> enumerate` output.
///
/// Each entry is a line of the form `Key: <key>, Value: <value>`. Anything
/// else (version banners, `No value set!`) is ignored.
fn parse_enumerate(output: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in output.lines() {
        let Some(rest) = line.strip_prefix("Key: ") else {
            continue;
        };
        let Some((key, value)) = rest.split_once(", Value: ") else {
            continue;
        };
        entries.insert(key.to_string(), value.to_string());
    }
    entries
}
