//! Unified error types for the remount-core library.
//!
//! Uses SNAFU for context-rich error handling. Every variant maps to one of
//! the process exit codes through [`Error::exit_code`], so the CLI never has
//! to inspect error internals.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

use crate::mode::Mode;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const BAD_ARGUMENT: u8 = 1;
    pub const PERMISSION_DENIED: u8 = 2;
    pub const CONFIG: u8 = 3;
    pub const BUFFER: u8 = 4;
    pub const TOO_MANY_MOUNTPOINTS: u8 = 5;
    pub const INTERNAL: u8 = 255;
}

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The mode token is not one of `ro`, `rw`, `ch`.
    #[snafu(display("Unknown mode \"{mode}\", use --help to get help"))]
    UnknownMode { mode: String },

    /// The effective uid is not root for a remount mode.
    #[snafu(display("The program must be run as root to use mode \"{mode}\""))]
    EffectiveRootRequired { mode: Mode },

    /// The real uid is not root for a read-write remount.
    #[snafu(display("Remounting read-write requires root permissions"))]
    RealRootRequired,

    /// Switching the real uid to root failed.
    #[snafu(display("failed to assume real root identity"))]
    Elevation { source: nix::Error },

    /// Neither configuration file could be opened.
    #[snafu(display(
        "Could not access configuration files {} and {}",
        primary.display(),
        fallback.display()
    ))]
    ConfigAccess {
        primary: PathBuf,
        fallback: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file was opened but reading it failed.
    #[snafu(display("failed to read configuration file {}", path.display()))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A mountpoint path reaches the maximum path length.
    #[snafu(display("Path too large: {}, maximum is {max} bytes", path.display()))]
    PathTooLong { path: PathBuf, max: usize },

    /// An empty mountpoint was supplied.
    #[snafu(display("Empty mountpoint given"))]
    EmptyMountpoint,

    /// More mountpoints than the list can hold.
    #[snafu(display("Too many mountpoints, maximum is {max}"))]
    TooManyMountpoints { max: usize },

    /// A serialized operation could exceed the working buffer.
    #[snafu(display(
        "Buffer size is {capacity} while the maximal command size is {required}, risk of overflow"
    ))]
    CommandTooLarge { required: usize, capacity: usize },

    /// An operation was requested that the mode cannot perform.
    #[snafu(display("mode \"{mode}\" cannot build a remount operation, this should never happen"))]
    InvalidIntent { mode: Mode },

    /// Failed to execute a system command.
    #[snafu(display("failed to execute command '{command}'"))]
    CommandExecution {
        command: String,
        source: std::io::Error,
    },

    /// Command executed but returned non-zero exit code.
    #[snafu(display("command '{command}' exited with code {code}: {stderr}"))]
    CommandExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The mount table could not be read.
    #[snafu(display("failed to read mount table at {}", path.display()))]
    MountTableRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::UnknownMode { .. } => exit::BAD_ARGUMENT,
            Error::EffectiveRootRequired { .. }
            | Error::RealRootRequired
            | Error::Elevation { .. } => exit::PERMISSION_DENIED,
            Error::ConfigAccess { .. }
            | Error::ConfigRead { .. }
            | Error::PathTooLong { .. }
            | Error::EmptyMountpoint => exit::CONFIG,
            Error::CommandTooLarge { .. } => exit::BUFFER,
            Error::TooManyMountpoints { .. } => exit::TOO_MANY_MOUNTPOINTS,
            // Backend failures are normally reported per mountpoint instead.
            Error::InvalidIntent { .. }
            | Error::CommandExecution { .. }
            | Error::CommandExit { .. }
            | Error::MountTableRead { .. } => exit::INTERNAL,
        }
    }
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for command execution errors.
    fn command_context(self, command: impl Into<String>) -> Result<T>;

    /// Add context for configuration read errors.
    fn config_read_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for mount table read errors.
    fn mount_table_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn command_context(self, command: impl Into<String>) -> Result<T> {
        self.context(CommandExecutionSnafu {
            command: command.into(),
        })
    }

    fn config_read_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(ConfigReadSnafu { path: path.into() })
    }

    fn mount_table_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountTableReadSnafu { path: path.into() })
    }
}
