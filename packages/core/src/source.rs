//! Mountpoint resolution.
//!
//! Mountpoints come either from the command line or, when none are given,
//! from the first readable configuration file. The configuration format is
//! one path per line; blank lines and lines starting with `#` are ignored.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::config::{ConfigPaths, Limits};
use crate::error::{ConfigAccessSnafu, Error, IoResultExt, Result};

/// A validated mountpoint path.
///
/// Never empty and always shorter than the configured path bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mountpoint(PathBuf);

impl Mountpoint {
    /// Validates a path against the length limits.
    pub fn new(path: impl Into<PathBuf>, limits: &Limits) -> Result<Self> {
        let path = path.into();
        let len = path.as_os_str().len();

        if len == 0 {
            return Err(Error::EmptyMountpoint);
        }
        if len >= limits.max_path {
            return Err(Error::PathTooLong {
                path,
                max: limits.max_path,
            });
        }

        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Length of the path in bytes.
    pub fn len(&self) -> usize {
        self.0.as_os_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_os_str().is_empty()
    }
}

impl fmt::Display for Mountpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for Mountpoint {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Ordered, bounded list of mountpoints in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountpointList {
    entries: Vec<Mountpoint>,
}

impl MountpointList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mountpoint, failing once the list is full.
    pub fn push(&mut self, mountpoint: Mountpoint, limits: &Limits) -> Result<()> {
        if self.entries.len() >= limits.max_count {
            return Err(Error::TooManyMountpoints {
                max: limits.max_count,
            });
        }
        self.entries.push(mountpoint);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mountpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest mountpoint, in bytes.
    pub fn longest_path(&self) -> usize {
        self.entries.iter().map(Mountpoint::len).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a MountpointList {
    type Item = &'a Mountpoint;
    type IntoIter = std::slice::Iter<'a, Mountpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resolves the mountpoints to act on.
///
/// Non-empty `args` are used verbatim; otherwise the configuration files in
/// `paths` are consulted.
pub fn resolve(args: &[OsString], paths: &ConfigPaths, limits: &Limits) -> Result<MountpointList> {
    if !args.is_empty() {
        tracing::debug!(count = args.len(), "using mountpoints from arguments");
        return from_args(args, limits);
    }

    let (file, path) = open_config(paths)?;
    tracing::debug!(path = %path.display(), "reading mountpoints from configuration");
    parse_config(BufReader::new(file), &path, limits)
}

/// Builds the list from command line arguments.
pub fn from_args(args: &[OsString], limits: &Limits) -> Result<MountpointList> {
    let mut list = MountpointList::new();
    for arg in args {
        list.push(Mountpoint::new(arg, limits)?, limits)?;
    }
    Ok(list)
}

/// Opens the primary configuration file, falling back to the default one.
fn open_config(paths: &ConfigPaths) -> Result<(File, PathBuf)> {
    match File::open(&paths.primary) {
        Ok(file) => Ok((file, paths.primary.clone())),
        Err(e) => {
            tracing::debug!(
                path = %paths.primary.display(),
                error = %e,
                "primary configuration unavailable, trying fallback"
            );
            let file = File::open(&paths.fallback).context(ConfigAccessSnafu {
                primary: paths.primary.clone(),
                fallback: paths.fallback.clone(),
            })?;
            Ok((file, paths.fallback.clone()))
        }
    }
}

/// Parses configuration content into a mountpoint list.
///
/// `path` is only used for error context.
pub fn parse_config<R: BufRead>(reader: R, path: &Path, limits: &Limits) -> Result<MountpointList> {
    let mut list = MountpointList::new();

    for line in reader.split(b'\n') {
        let line = line.config_read_context(path)?;
        let Some(entry) = config_entry(&line) else {
            continue;
        };
        list.push(Mountpoint::new(OsStr::from_bytes(entry), limits)?, limits)?;
    }

    Ok(list)
}

/// Extracts the path from a configuration line, or `None` for skipped lines.
fn config_entry(line: &[u8]) -> Option<&[u8]> {
    match line.first() {
        None | Some(b'#') | Some(b'\r') | Some(b'\n') => None,
        Some(_) => {
            let end = line
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')
                .unwrap_or(line.len());
            Some(&line[..end])
        }
    }
}
