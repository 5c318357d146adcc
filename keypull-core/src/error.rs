use std::path::PathBuf;

use thiserror::Error;

use crate::keybox::KeyboxError;

#[derive(Error, Debug)]
pub enum KeypullError {
    #[error("device bridge '{program}' unavailable: {message}")]
    BridgeUnavailable { program: String, message: String },

    #[error("bridge command `{command}` failed: {stderr}")]
    BridgeCommandFailed { command: String, stderr: String },

    #[error("could not find any connected devices via the device bridge")]
    NoDeviceFound,

    #[error("device not initialised; run device discovery first")]
    DeviceNotInitialized,

    #[error(
        "root access required but not available; root the device or enable root access in Developer Options"
    )]
    RootUnavailable,

    #[error("pull failed for {remote_path}: {stderr}")]
    PullFailed { remote_path: String, stderr: String },

    #[error("no files found in {path}")]
    EmptyDirectory { path: String },

    #[error("downloaded keybox {} failed validation: {source}", path.display())]
    DownloadedKeyboxInvalid {
        path: PathBuf,
        #[source]
        source: KeyboxError,
    },

    #[error("could not create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KeypullError {
    /// Errors raised before any location is attempted. These abort a run.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::BridgeUnavailable { .. }
                | Self::NoDeviceFound
                | Self::DeviceNotInitialized
                | Self::RootUnavailable
                | Self::OutputDirectory { .. }
        )
    }

    /// Errors that mean the bridge or the device cannot be reached at all.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::BridgeUnavailable { .. } | Self::NoDeviceFound | Self::DeviceNotInitialized
        )
    }
}

pub type Result<T> = std::result::Result<T, KeypullError>;
