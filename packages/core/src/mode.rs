//! Invocation modes and access modes.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// What the invocation does to every mountpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Remount read-only.
    ReadOnly,
    /// Remount read-write.
    ReadWrite,
    /// Report the current state without changing it.
    Check,
}

/// Access mode of a mounted filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl Mode {
    /// Returns the token used on the command line.
    pub fn token(&self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
            Self::Check => "ch",
        }
    }

    /// Returns the access mode a remount should apply, or `None` for `Check`.
    pub fn target_access(&self) -> Option<AccessMode> {
        match self {
            Self::ReadOnly => Some(AccessMode::ReadOnly),
            Self::ReadWrite => Some(AccessMode::ReadWrite),
            Self::Check => None,
        }
    }

    /// Returns true if the mode changes mount state.
    pub fn is_remount(&self) -> bool {
        self.target_access().is_some()
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            "ch" => Ok(Self::Check),
            _ => Err(Error::UnknownMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl AccessMode {
    /// Returns the mount option naming this access mode.
    pub fn option(&self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option())
    }
}
