//! Static configuration: file locations, limits and backend programs.

use std::path::PathBuf;

/// Primary configuration file.
pub const CONFIG_FILE: &str = "/etc/remount.conf";

/// Fallback configuration file, used when the primary one cannot be opened.
pub const DEFCONFIG_FILE: &str = "/usr/local/share/remount/remount.conf.default";

/// Maximum number of mountpoints handled in one invocation.
pub const MOUNTPOINT_MAX_COUNT: usize = 16;

/// Path length bound, including the terminator of the legacy format.
/// A mountpoint must be strictly shorter than this many bytes.
pub const MOUNTPOINT_MAX_PATH: usize = 256;

/// Capacity of the buffer an operation is serialized into (glibc `BUFSIZ`).
pub const WORK_BUFFER_CAPACITY: usize = 8192;

/// Program used to remount filesystems.
pub const MOUNT_PROGRAM: &str = "mount";

/// Live mount table consulted by the check probes.
pub const MOUNT_TABLE: &str = "/proc/mounts";

/// Configuration files searched when no mountpoint is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub primary: PathBuf,
    pub fallback: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            primary: PathBuf::from(CONFIG_FILE),
            fallback: PathBuf::from(DEFCONFIG_FILE),
        }
    }
}

/// Size limits applied to mountpoints and operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_count: usize,
    pub max_path: usize,
    pub buffer_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_count: MOUNTPOINT_MAX_COUNT,
            max_path: MOUNTPOINT_MAX_PATH,
            buffer_capacity: WORK_BUFFER_CAPACITY,
        }
    }
}
