//! One complete run of the tool.
//!
//! Order matters: privileges are checked before the mountpoints are
//! resolved, and nothing reaches the backend until every precondition has
//! passed.

use std::ffi::OsString;

use crate::backend::MountBackend;
use crate::command;
use crate::config::{ConfigPaths, Limits};
use crate::error::Result;
use crate::executor::{ModeExecutor, ReportSink, RunSummary};
use crate::mode::Mode;
use crate::privilege::{self, IdentityProvider};
use crate::source;

/// A parsed command line plus the static configuration it runs against.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub mountpoints: Vec<OsString>,
    pub config_paths: ConfigPaths,
    pub limits: Limits,
}

impl Invocation {
    /// Creates an invocation with the default configuration paths and limits.
    pub fn new(mode: Mode, mountpoints: Vec<OsString>) -> Self {
        Self {
            mode,
            mountpoints,
            config_paths: ConfigPaths::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_config_paths(mut self, config_paths: ConfigPaths) -> Self {
        self.config_paths = config_paths;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Authorizes, resolves mountpoints and executes the mode.
    pub fn run<B, I, S>(&self, identity: &I, backend: &mut B, sink: &mut S) -> Result<RunSummary>
    where
        B: MountBackend,
        I: IdentityProvider,
        S: ReportSink,
    {
        let current = identity.identity();
        tracing::debug!(mode = %self.mode, ?current, "authorizing");
        privilege::authorize(self.mode, current)?;

        let list = source::resolve(&self.mountpoints, &self.config_paths, &self.limits)?;
        command::check_capacity(&self.limits)?;
        tracing::debug!(
            count = list.len(),
            longest = list.longest_path(),
            "mountpoints resolved"
        );

        ModeExecutor::new(backend, identity, self.limits).run(self.mode, &list, sink)
    }
}
