//! Extractor configuration
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::AdbBridge;
use crate::locations::default_locations;
use crate::session::{Session, DEFAULT_SETTLE_DELAY};

/// Extraction configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Bridge executable (default: `adb` on PATH)
    pub adb_path: PathBuf,
    /// Directory pulled files are written to (default: `output`)
    pub output_dir: PathBuf,
    /// Wait after `adb root` (default: 2 seconds)
    pub settle_delay: Duration,
    /// Device paths to extract, in order (default: the well-known set)
    pub locations: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            output_dir: PathBuf::from("output"),
            settle_delay: DEFAULT_SETTLE_DELAY,
            locations: default_locations(),
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from environment variables
    ///
    /// - `KEYPULL_ADB` - bridge executable
    /// - `KEYPULL_OUTPUT` - output directory
    /// - `KEYPULL_SETTLE_SECS` - settle delay in whole seconds
    /// - `KEYPULL_LOCATIONS` - comma-separated device paths
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let adb_path = lookup("KEYPULL_ADB")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.adb_path);

        let output_dir = lookup("KEYPULL_OUTPUT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let settle_delay = lookup("KEYPULL_SETTLE_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.settle_delay);

        let locations = lookup("KEYPULL_LOCATIONS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.locations);

        Self {
            adb_path,
            output_dir,
            settle_delay,
            locations,
        }
    }

    /// Build a session over the real `adb` bridge.
    pub fn session(&self) -> Session<AdbBridge> {
        Session::new(AdbBridge::new(&self.adb_path), &self.output_dir)
            .with_settle_delay(self.settle_delay)
    }
}
