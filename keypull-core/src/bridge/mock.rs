//! Scripted bridge for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{parse_device_list, Bridge};
use crate::error::{KeypullError, Result};

/// One recorded bridge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    StartServer,
    ListDevices,
    RunOnDevice { device: String, args: Vec<String> },
    Pull { device: String, remote: String, local: String },
    ShellFind { device: String, remote_dir: String },
}

/// In-memory bridge with scripted responses.
///
/// Records every call and every settle wait instead of touching a device.
/// WARNING: for tests only, nothing here talks to real hardware.
#[derive(Debug, Default)]
pub struct MockBridge {
    device_listing: String,
    bridge_root: bool,
    su_root: bool,
    directories: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<BridgeCall>>,
    restarts: Mutex<Vec<Duration>>,
}

impl MockBridge {
    /// A bridge with no devices, no root and no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge listing a single online device.
    pub fn with_device(id: &str) -> Self {
        Self::new().device_listing(&format!("List of devices attached\n{id}\tdevice\n"))
    }

    /// Raw text returned by the `devices` subcommand.
    pub fn device_listing(mut self, listing: &str) -> Self {
        self.device_listing = listing.to_string();
        self
    }

    /// Whether `-s <id> root` succeeds.
    pub fn bridge_root(mut self, ok: bool) -> Self {
        self.bridge_root = ok;
        self
    }

    /// Whether `-s <id> shell su -c id` succeeds.
    pub fn su_root(mut self, ok: bool) -> Self {
        self.su_root = ok;
        self
    }

    /// Listing returned by `shell find <dir> -type f`.
    pub fn directory(mut self, dir: &str, files: &[&str]) -> Self {
        self.directories
            .insert(dir.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Content served when `remote` is pulled. Unknown paths fail to pull.
    pub fn file(mut self, remote: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(remote.to_string(), content.into());
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<BridgeCall> {
        lock(&self.calls).clone()
    }

    /// Settle delays requested so far.
    pub fn restarts(&self) -> Vec<Duration> {
        lock(&self.restarts).clone()
    }

    /// Remote paths pulled so far, in order.
    pub fn pulled(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BridgeCall::Pull { remote, .. } => Some(remote),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BridgeCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Bridge for MockBridge {
    fn start_server(&self) -> Result<()> {
        self.record(BridgeCall::StartServer);
        Ok(())
    }

    fn list_devices(&self) -> Result<Vec<String>> {
        self.record(BridgeCall::ListDevices);
        Ok(parse_device_list(&self.device_listing))
    }

    fn run_on_device(&self, device: &str, args: &[&str]) -> Result<String> {
        self.record(BridgeCall::RunOnDevice {
            device: device.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });

        let ok = match args {
            ["root"] => self.bridge_root,
            ["shell", "su", "-c", "id"] => self.su_root,
            _ => false,
        };
        if ok {
            Ok(String::new())
        } else {
            Err(KeypullError::BridgeCommandFailed {
                command: format!("adb -s {device} {}", args.join(" ")),
                stderr: "adbd cannot run as root in production builds".into(),
            })
        }
    }

    fn pull(&self, device: &str, remote: &str, local: &Path) -> Result<()> {
        self.record(BridgeCall::Pull {
            device: device.to_string(),
            remote: remote.to_string(),
            local: local.display().to_string(),
        });

        let Some(content) = self.files.get(remote) else {
            return Err(KeypullError::PullFailed {
                remote_path: remote.to_string(),
                stderr: format!("adb: error: remote object '{remote}' does not exist"),
            });
        };
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|source| KeypullError::LocalIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(local, content).map_err(|source| KeypullError::LocalIo {
            path: local.to_path_buf(),
            source,
        })
    }

    fn shell_find(&self, device: &str, remote_dir: &str) -> Result<Vec<String>> {
        self.record(BridgeCall::ShellFind {
            device: device.to_string(),
            remote_dir: remote_dir.to_string(),
        });

        self.directories.get(remote_dir).cloned().ok_or_else(|| {
            KeypullError::BridgeCommandFailed {
                command: format!("adb -s {device} shell find {remote_dir} -type f"),
                stderr: format!("find: {remote_dir}: No such file or directory"),
            }
        })
    }

    fn wait_for_restart(&self, delay: Duration) {
        lock(&self.restarts).push(delay);
    }
}
