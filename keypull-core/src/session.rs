//! Device session: discovery, privilege escalation and the output directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::bridge::Bridge;
use crate::error::{KeypullError, Result};

/// Wait after `adb root` for adbd to come back up as root.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Outcome of privilege escalation on the selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootState {
    NotAttempted,
    /// adbd restarted as root.
    RootViaBridge,
    /// adbd stays unprivileged but `su` works.
    RootViaSu,
    /// Neither path worked. Terminal.
    Failed,
}

impl RootState {
    pub fn is_rooted(self) -> bool {
        matches!(self, Self::RootViaBridge | Self::RootViaSu)
    }
}

impl std::fmt::Display for RootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAttempted => write!(f, "not attempted"),
            Self::RootViaBridge => write!(f, "root via adb"),
            Self::RootViaSu => write!(f, "root via su"),
            Self::Failed => write!(f, "unavailable"),
        }
    }
}

/// A connection to one device plus the local directory pulled files go to.
///
/// The device identifier is set once by [`Session::discover_device`] and is
/// read-only afterwards.
#[derive(Debug)]
pub struct Session<B> {
    bridge: B,
    output_dir: PathBuf,
    device: Option<String>,
    root: RootState,
    settle_delay: Duration,
}

impl<B: Bridge> Session<B> {
    pub fn new(bridge: B, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bridge,
            output_dir: output_dir.into(),
            device: None,
            root: RootState::NotAttempted,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Override the wait after bridge-native root elevation.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn root_state(&self) -> RootState {
        self.root
    }

    /// The selected device, or `DeviceNotInitialized` before discovery.
    pub fn device(&self) -> Result<&str> {
        self.device
            .as_deref()
            .ok_or(KeypullError::DeviceNotInitialized)
    }

    /// Start the bridge server and select the first online device.
    ///
    /// Once a device has been selected it is kept; later calls return it
    /// without touching the bridge.
    pub fn discover_device(&mut self) -> Result<&str> {
        if self.device.is_none() {
            self.bridge.start_server()?;
            let first = self
                .bridge
                .list_devices()?
                .into_iter()
                .next()
                .ok_or(KeypullError::NoDeviceFound)?;
            info!(device = %first, "Connected to device");
            self.device = Some(first);
        }
        self.device()
    }

    /// Obtain root on the selected device.
    ///
    /// Tries `adb root` first and waits for the service restart on success;
    /// otherwise probes `su -c id`. A failed escalation is terminal and is
    /// not retried by later calls.
    pub fn escalate_privileges(&mut self) -> Result<RootState> {
        let device = self.device()?.to_string();

        if self.root.is_rooted() {
            return Ok(self.root);
        }
        if self.root == RootState::Failed {
            return Err(KeypullError::RootUnavailable);
        }

        match self.bridge.run_on_device(&device, &["root"]) {
            Ok(_) => {
                info!(device = %device, "Obtained root via adb");
                self.root = RootState::RootViaBridge;
                self.bridge.wait_for_restart(self.settle_delay);
            }
            Err(e) => {
                warn!(device = %device, error = %e, "adb root failed, attempting via su");
                if let Err(e) = self.bridge.run_on_device(&device, &["shell", "su", "-c", "id"]) {
                    warn!(device = %device, error = %e, "su probe failed");
                    self.root = RootState::Failed;
                    return Err(KeypullError::RootUnavailable);
                }
                info!(device = %device, "Obtained root via su");
                self.root = RootState::RootViaSu;
            }
        }

        Ok(self.root)
    }

    /// Create the output directory (and parents) if needed.
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            KeypullError::OutputDirectory {
                path: self.output_dir.clone(),
                source,
            }
        })
    }
}
