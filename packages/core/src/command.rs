//! Operation descriptors.
//!
//! Each mountpoint is turned into either a remount or a pair of state
//! probes. Descriptors are never executed here; see [`crate::backend`].
//! Every descriptor has a serialized form whose length is bounded by the
//! working buffer capacity, checked once for the worst case at startup and
//! again for each concrete mountpoint.

use std::ffi::OsString;
use std::fmt;

use crate::config::{Limits, MOUNT_PROGRAM};
use crate::error::{Error, Result};
use crate::mode::{AccessMode, Mode};
use crate::source::Mountpoint;

/// Prefix of the serialized probe form, followed by the access option and path.
const PROBE_PREFIX: &str = "probe ";

/// What an operation should do with a mountpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Remount,
    CheckState,
}

/// Remount of one mountpoint with a target access mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemountSpec {
    pub access: AccessMode,
    pub mountpoint: Mountpoint,
}

/// Query whether one mountpoint is currently mounted with an access mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub access: AccessMode,
    pub mountpoint: Mountpoint,
}

/// Operation built for one mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationSpec {
    Remount(RemountSpec),
    Check {
        read_only: ProbeSpec,
        read_write: ProbeSpec,
    },
}

impl RemountSpec {
    /// Returns the `mount` arguments, passed as a vector and never through a shell.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-o"),
            OsString::from(format!("remount,{}", self.access)),
            OsString::from("--"),
            self.mountpoint.as_path().as_os_str().to_os_string(),
        ]
    }

    /// Serialized length including separators and terminator.
    pub fn serialized_len(&self) -> usize {
        remount_len(self.access, self.mountpoint.len())
    }
}

impl ProbeSpec {
    pub fn serialized_len(&self) -> usize {
        probe_len(self.access, self.mountpoint.len())
    }
}

impl fmt::Display for RemountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -o remount,{} -- {}",
            MOUNT_PROGRAM, self.access, self.mountpoint
        )
    }
}

impl fmt::Display for ProbeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", PROBE_PREFIX, self.access, self.mountpoint)
    }
}

fn remount_len(access: AccessMode, path_len: usize) -> usize {
    // mount -o remount,XX -- PATH\0
    MOUNT_PROGRAM.len() + " -o remount,".len() + access.option().len() + " -- ".len() + path_len + 1
}

fn probe_len(access: AccessMode, path_len: usize) -> usize {
    // probe XX PATH\0
    PROBE_PREFIX.len() + access.option().len() + 1 + path_len + 1
}

/// Largest serialized operation for a path of `path_len` bytes.
fn worst_case_len(path_len: usize) -> usize {
    [AccessMode::ReadOnly, AccessMode::ReadWrite]
        .into_iter()
        .flat_map(|access| [remount_len(access, path_len), probe_len(access, path_len)])
        .max()
        .unwrap_or(0)
}

fn ensure_fits(required: usize, capacity: usize) -> Result<()> {
    if required > capacity {
        return Err(Error::CommandTooLarge { required, capacity });
    }
    Ok(())
}

/// Startup check that any operation on any valid mountpoint fits the buffer.
pub fn check_capacity(limits: &Limits) -> Result<()> {
    let longest_path = limits.max_path.saturating_sub(1);
    ensure_fits(worst_case_len(longest_path), limits.buffer_capacity)
}

/// Builds the operation for `mountpoint`.
///
/// A remount intent requires a remount mode; a check intent is valid for
/// every mode.
pub fn build(
    mode: Mode,
    intent: Intent,
    mountpoint: &Mountpoint,
    limits: &Limits,
) -> Result<OperationSpec> {
    if mountpoint.len() >= limits.max_path {
        return Err(Error::PathTooLong {
            path: mountpoint.as_path().to_path_buf(),
            max: limits.max_path,
        });
    }

    let spec = match intent {
        Intent::Remount => {
            let access = mode.target_access().ok_or(Error::InvalidIntent { mode })?;
            let remount = RemountSpec {
                access,
                mountpoint: mountpoint.clone(),
            };
            ensure_fits(remount.serialized_len(), limits.buffer_capacity)?;
            OperationSpec::Remount(remount)
        }
        Intent::CheckState => {
            let read_only = ProbeSpec {
                access: AccessMode::ReadOnly,
                mountpoint: mountpoint.clone(),
            };
            let read_write = ProbeSpec {
                access: AccessMode::ReadWrite,
                mountpoint: mountpoint.clone(),
            };
            ensure_fits(read_only.serialized_len(), limits.buffer_capacity)?;
            ensure_fits(read_write.serialized_len(), limits.buffer_capacity)?;
            OperationSpec::Check {
                read_only,
                read_write,
            }
        }
    };

    Ok(spec)
}

/// Returns the intent matching `mode`.
pub fn intent_for(mode: Mode) -> Intent {
    if mode.is_remount() {
        Intent::Remount
    } else {
        Intent::CheckState
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mountpoint(path: &str) -> Mountpoint {
        Mountpoint::new(path, &Limits::default()).unwrap()
    }

    #[test]
    fn test_default_limits_fit() {
        assert!(check_capacity(&Limits::default()).is_ok());
    }

    #[test]
    fn test_small_buffer_rejected_at_startup() {
        let limits = Limits {
            buffer_capacity: 128,
            ..Limits::default()
        };
        let err = check_capacity(&limits).unwrap_err();
        match err {
            Error::CommandTooLarge { required, capacity } => {
                assert_eq!(capacity, 128);
                assert!(required > 255);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_remount() {
        let spec = build(Mode::ReadOnly, Intent::Remount, &mountpoint("/data"), &Limits::default())
            .unwrap();
        let OperationSpec::Remount(remount) = spec else {
            panic!("expected remount");
        };
        assert_eq!(remount.access, AccessMode::ReadOnly);
        assert_eq!(remount.to_string(), "mount -o remount,ro -- /data");
        assert_eq!(remount.serialized_len(), remount.to_string().len() + 1);
        assert_eq!(remount.args(), vec!["-o", "remount,ro", "--", "/data"]);
    }

    #[test]
    fn test_remount_args_keep_metacharacters() {
        let spec = build(
            Mode::ReadWrite,
            Intent::Remount,
            &mountpoint("/mnt/a\"; rm -rf /"),
            &Limits::default(),
        )
        .unwrap();
        let OperationSpec::Remount(remount) = spec else {
            panic!("expected remount");
        };
        assert_eq!(remount.args()[3], "/mnt/a\"; rm -rf /");
    }

    #[test]
    fn test_build_check() {
        let spec = build(Mode::Check, Intent::CheckState, &mountpoint("/"), &Limits::default())
            .unwrap();
        let OperationSpec::Check {
            read_only,
            read_write,
        } = spec
        else {
            panic!("expected check");
        };
        assert_eq!(read_only.access, AccessMode::ReadOnly);
        assert_eq!(read_write.access, AccessMode::ReadWrite);
        assert_eq!(read_only.to_string(), "probe ro /");
        assert_eq!(read_only.serialized_len(), "probe ro /".len() + 1);
    }

    #[test]
    fn test_build_remount_in_check_mode() {
        let err = build(Mode::Check, Intent::Remount, &mountpoint("/"), &Limits::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidIntent { mode: Mode::Check }));
        assert_eq!(err.exit_code(), 255);
    }

    #[test]
    fn test_build_rejects_oversized_operation() {
        let limits = Limits {
            buffer_capacity: 32,
            ..Limits::default()
        };
        let mp = mountpoint("/a/rather/long/mountpoint");
        let err = build(Mode::ReadOnly, Intent::Remount, &mp, &limits).unwrap_err();
        assert!(matches!(err, Error::CommandTooLarge { capacity: 32, .. }));
        assert_eq!(err.exit_code(), 4);

        assert!(build(Mode::ReadOnly, Intent::Remount, &mountpoint("/"), &limits).is_ok());
    }

    #[test]
    fn test_build_rejects_path_over_limit() {
        let strict = Limits {
            max_path: 4,
            ..Limits::default()
        };
        let err = build(Mode::Check, Intent::CheckState, &mountpoint("/data"), &strict)
            .unwrap_err();
        assert!(matches!(err, Error::PathTooLong { max: 4, .. }));
    }

    #[test]
    fn test_intent_for() {
        assert_eq!(intent_for(Mode::ReadOnly), Intent::Remount);
        assert_eq!(intent_for(Mode::ReadWrite), Intent::Remount);
        assert_eq!(intent_for(Mode::Check), Intent::CheckState);
    }
}
