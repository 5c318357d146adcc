//! Device bridge clients.
//!
//! The bridge is the external executable (normally `adb`) used to list
//! devices, run shell commands and pull files. Every call blocks until the
//! subprocess exits.
//!
//! - [`AdbBridge`] - runs the real executable
//! - [`MockBridge`] - scripted in-memory bridge for tests

mod adb;
mod mock;

pub use adb::AdbBridge;
pub use mock::{BridgeCall, MockBridge};

use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Header line printed by `adb devices` before the device table.
const DEVICE_LIST_HEADER: &str = "List of devices";

/// State reported for an online, authorised device.
const ONLINE_STATE: &str = "device";

/// Operations the extractor needs from a device bridge.
///
/// Implementations are driven strictly sequentially; no two calls are ever
/// in flight at the same time.
pub trait Bridge {
    /// Start the bridge server.
    fn start_server(&self) -> Result<()>;

    /// Identifiers of online devices, in the order the bridge lists them.
    fn list_devices(&self) -> Result<Vec<String>>;

    /// Run a subcommand scoped to one device (`-s <device> <args...>`),
    /// returning its standard output.
    fn run_on_device(&self, device: &str, args: &[&str]) -> Result<String>;

    /// Copy `remote` from the device to `local`, creating parent directories.
    fn pull(&self, device: &str, remote: &str, local: &Path) -> Result<()>;

    /// Regular files below `remote_dir` on the device.
    fn shell_find(&self, device: &str, remote_dir: &str) -> Result<Vec<String>>;

    /// Block while the on-device service restarts after root elevation.
    fn wait_for_restart(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Parse `adb devices` output into the identifiers whose state is `device`.
///
/// Blank lines and the header are skipped; offline and unauthorised entries
/// are dropped.
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(DEVICE_LIST_HEADER))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(id), Some(ONLINE_STATE)) => Some(id.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Parse `find <dir> -type f` output into trimmed, non-blank paths.
pub fn parse_find_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
