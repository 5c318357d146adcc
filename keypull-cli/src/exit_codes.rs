//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts a way to tell a missing device from a device
//! without root or a keybox that failed validation.

use keypull_core::{KeyboxError, KeypullError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all, including "nothing extracted").
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Keybox document failed validation.
/// Maps to EX_DATAERR from sysexits.h.
pub const INVALID_KEYBOX: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Device bridge missing, failing, or no device connected.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output directory or pulled file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Root access unavailable on the device.
/// Maps to EX_NOPERM from sysexits.h.
pub const NO_PERMISSION: i32 = 77;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify by the first typed error in the chain
        let code = if let Some(e) = err.chain().find_map(|e| e.downcast_ref::<KeypullError>()) {
            classify(e)
        } else if let Some(e) = err.chain().find_map(|e| e.downcast_ref::<KeyboxError>()) {
            match e {
                KeyboxError::Io(_) => INPUT_ERROR,
                _ => INVALID_KEYBOX,
            }
        } else if err.chain().any(|e| {
            e.downcast_ref::<std::io::Error>().is_some()
                || e.downcast_ref::<serde_json::Error>().is_some()
        }) {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify(err: &KeypullError) -> i32 {
    match err {
        KeypullError::RootUnavailable => NO_PERMISSION,
        KeypullError::OutputDirectory { .. } | KeypullError::LocalIo { .. } => IO_ERROR,
        KeypullError::DownloadedKeyboxInvalid { .. } => INVALID_KEYBOX,
        KeypullError::BridgeCommandFailed { .. } => UNAVAILABLE,
        e if e.is_device_error() => UNAVAILABLE,
        _ => GENERAL_ERROR,
    }
}
