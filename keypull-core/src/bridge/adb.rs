//! Subprocess-backed bridge that shells out to `adb`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, trace};

use super::{parse_device_list, parse_find_output, Bridge};
use crate::error::{KeypullError, Result};

/// Default bridge executable, looked up on `PATH`.
pub const DEFAULT_ADB: &str = "adb";

/// Bridge client that runs the `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: PathBuf,
}

impl AdbBridge {
    /// Create a client for the given executable (name on `PATH` or a path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The configured executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Resolve the executable, failing with `BridgeUnavailable` when missing.
    pub fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| KeypullError::BridgeUnavailable {
            program: self.program.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Run the bridge with `args` and wait for it to exit.
    fn output<I, S>(&self, args: I) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = std::iter::once(self.program.as_os_str())
            .chain(args.iter().map(|a| a.as_os_str()))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        trace!(command = %command, "Running bridge command");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| KeypullError::BridgeUnavailable {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        debug!(command = %command, status = %output.status, "Bridge command finished");
        Ok((command, output))
    }

    /// Run the bridge and turn a non-zero exit into `BridgeCommandFailed`.
    fn checked<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args)?;
        if !output.status.success() {
            return Err(KeypullError::BridgeCommandFailed {
                command,
                stderr: stderr_text(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new(DEFAULT_ADB)
    }
}

impl Bridge for AdbBridge {
    fn start_server(&self) -> Result<()> {
        self.locate()?;
        self.checked(["start-server"])?;
        Ok(())
    }

    fn list_devices(&self) -> Result<Vec<String>> {
        let stdout = self.checked(["devices"])?;
        Ok(parse_device_list(&stdout))
    }

    fn run_on_device(&self, device: &str, args: &[&str]) -> Result<String> {
        let mut full = vec!["-s", device];
        full.extend_from_slice(args);
        self.checked(full)
    }

    fn pull(&self, device: &str, remote: &str, local: &Path) -> Result<()> {
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| KeypullError::LocalIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let args: [&OsStr; 5] = [
            "-s".as_ref(),
            device.as_ref(),
            "pull".as_ref(),
            remote.as_ref(),
            local.as_os_str(),
        ];
        let (_, output) = self.output(args)?;
        if !output.status.success() {
            return Err(KeypullError::PullFailed {
                remote_path: remote.to_string(),
                stderr: stderr_text(&output),
            });
        }
        Ok(())
    }

    fn shell_find(&self, device: &str, remote_dir: &str) -> Result<Vec<String>> {
        let stdout = self.run_on_device(device, &["shell", "find", remote_dir, "-type", "f"])?;
        Ok(parse_find_output(&stdout))
    }
}

fn stderr_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}
