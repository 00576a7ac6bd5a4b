//! Mount table parsing.
//!
//! Reads `/proc/mounts`, whose lines have the fstab layout
//! `source target fstype options dump pass`. The kernel escapes space,
//! tab, newline and backslash in paths as three-digit octal sequences.

use std::ffi::OsString;
use std::fs;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, Result};
use crate::mode::AccessMode;

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mounted device or pseudo filesystem name.
    pub source: String,
    /// Mount point path, unescaped.
    pub mount_point: PathBuf,
    /// Filesystem type (e.g., "ext4", "tmpfs").
    pub vfs_type: String,
    /// Mount options.
    pub options: Vec<String>,
}

impl MountEntry {
    /// Parses a single mount table line.
    ///
    /// Returns None for empty or malformed lines.
    pub fn from_line(line: &[u8]) -> Option<Self> {
        let mut parts = line
            .split(|b| *b == b' ' || *b == b'\t')
            .filter(|field| !field.is_empty());
        let source = parts.next()?;
        let mount_point = parts.next()?;
        let vfs_type = parts.next()?;
        let options = parts.next()?;

        Some(Self {
            source: String::from_utf8_lossy(source).into_owned(),
            mount_point: unescape_mount_path(mount_point),
            vfs_type: String::from_utf8_lossy(vfs_type).into_owned(),
            options: String::from_utf8_lossy(options)
                .split(',')
                .map(|s| s.to_string())
                .collect(),
        })
    }

    /// Returns true if `option` is one of the mount options.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Returns the access mode the entry is mounted with.
    pub fn access(&self) -> Option<AccessMode> {
        if self.has_option("ro") {
            Some(AccessMode::ReadOnly)
        } else if self.has_option("rw") {
            Some(AccessMode::ReadWrite)
        } else {
            None
        }
    }
}

/// Unescapes octal sequences in mount table paths.
fn unescape_mount_path(input: &[u8]) -> PathBuf {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] == b'\\'
            && let Some(byte) = input.get(i + 1..i + 4).and_then(octal_byte)
        {
            result.push(byte);
            i += 4;
            continue;
        }
        result.push(input[i]);
        i += 1;
    }

    PathBuf::from(OsString::from_vec(result))
}

/// Decodes three octal digits into a byte.
fn octal_byte(digits: &[u8]) -> Option<u8> {
    digits
        .iter()
        .try_fold(0u16, |acc, d| match d {
            b'0'..=b'7' => Some(acc * 8 + u16::from(d - b'0')),
            _ => None,
        })
        .and_then(|value| u8::try_from(value).ok())
}

/// Parsed mount table.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    pub entries: Vec<MountEntry>,
}

impl MountTable {
    /// Reads and parses the mount table at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read(path).mount_table_context(path)?;
        Ok(Self::parse(&content))
    }

    /// Parses mount table content, skipping malformed lines.
    pub fn parse(content: &[u8]) -> Self {
        Self {
            entries: content
                .split(|b| *b == b'\n')
                .filter_map(MountEntry::from_line)
                .collect(),
        }
    }

    /// Finds the entry for `mount_point`.
    ///
    /// When several filesystems are stacked on the same path, the last one
    /// is the visible one.
    pub fn find(&self, mount_point: &Path) -> Option<&MountEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.mount_point == mount_point)
    }
}
