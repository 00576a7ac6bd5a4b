//! Privilege checks for the requested mode.
//!
//! Checking state needs no privilege. Remounting needs an effective uid of
//! root, and read-write remounts additionally need a real uid of root.

use nix::unistd::{Uid, getuid, geteuid, setuid};

use crate::error::{Error, Result};
use crate::mode::Mode;

/// Real and effective user ids of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub real_uid: u32,
    pub effective_uid: u32,
}

impl ProcessIdentity {
    pub fn root() -> Self {
        Self {
            real_uid: 0,
            effective_uid: 0,
        }
    }

    pub fn user(uid: u32) -> Self {
        Self {
            real_uid: uid,
            effective_uid: uid,
        }
    }
}

/// Source of the process identity.
pub trait IdentityProvider {
    /// Returns the current real and effective uid.
    fn identity(&self) -> ProcessIdentity;

    /// Makes root the real uid, as `mount` requires for remounts.
    fn assume_real_root(&self) -> Result<()>;
}

/// Identity of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentityProvider for SystemIdentity {
    fn identity(&self) -> ProcessIdentity {
        ProcessIdentity {
            real_uid: getuid().as_raw(),
            effective_uid: geteuid().as_raw(),
        }
    }

    fn assume_real_root(&self) -> Result<()> {
        setuid(Uid::from_raw(0)).map_err(|source| Error::Elevation { source })
    }
}

/// Checks that `identity` may run `mode`.
pub fn authorize(mode: Mode, identity: ProcessIdentity) -> Result<()> {
    if mode == Mode::Check {
        return Ok(());
    }

    if identity.effective_uid != 0 {
        return Err(Error::EffectiveRootRequired { mode });
    }
    if mode == Mode::ReadWrite && identity.real_uid != 0 {
        return Err(Error::RealRootRequired);
    }

    Ok(())
}
