//! Mount backend abstraction.
//!
//! The executor talks to the system only through [`MountBackend`]. The
//! [`SystemBackend`] remounts with the `mount` program, passing arguments as
//! a vector, and answers state probes from the live mount table.

use std::path::PathBuf;
use std::process::{Command, Output};

use crate::command::{ProbeSpec, RemountSpec};
use crate::config::{MOUNT_PROGRAM, MOUNT_TABLE};
use crate::error::{Error, IoResultExt, Result};
use crate::mounts::MountTable;

/// Capability to change and query mount state.
pub trait MountBackend {
    /// Applies the target access mode to a mounted filesystem.
    fn remount(&mut self, spec: &RemountSpec) -> Result<()>;

    /// Returns true if the mountpoint is currently mounted with the probed
    /// access mode. A mountpoint missing from the mount table is `false`.
    fn probe(&mut self, spec: &ProbeSpec) -> Result<bool>;
}

/// Backend using the `mount` program and `/proc/mounts`.
#[derive(Debug, Clone)]
pub struct SystemBackend {
    mount_program: PathBuf,
    mount_table: PathBuf,
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self {
            mount_program: PathBuf::from(MOUNT_PROGRAM),
            mount_table: PathBuf::from(MOUNT_TABLE),
        }
    }
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different mount table, e.g. a fixture in tests.
    pub fn with_mount_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_table = path.into();
        self
    }

    /// Uses a different program in place of `mount`.
    pub fn with_mount_program(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_program = path.into();
        self
    }
}

impl MountBackend for SystemBackend {
    fn remount(&mut self, spec: &RemountSpec) -> Result<()> {
        let command = spec.to_string();
        tracing::debug!(%command, "running remount");

        let output = Command::new(&self.mount_program)
            .args(spec.args())
            .output()
            .command_context(&command)?;

        check_status(&command, &output)
    }

    fn probe(&mut self, spec: &ProbeSpec) -> Result<bool> {
        let table = MountTable::read(&self.mount_table)?;
        let access = table
            .find(spec.mountpoint.as_path())
            .and_then(|entry| entry.access());

        tracing::debug!(probe = %spec, current = ?access, "probed mount table");
        Ok(access == Some(spec.access))
    }
}

/// Maps a non-zero exit status to [`Error::CommandExit`].
fn check_status(command: &str, output: &Output) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::CommandExit {
            command: command.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(())
}
