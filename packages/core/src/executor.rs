//! Per-mountpoint execution of a mode.
//!
//! Mountpoints are processed one at a time in list order. A failed remount
//! is reported as a warning and the loop moves on, as does a result line
//! that cannot be written. Only a failed elevation or an operation that
//! cannot be built stops the run.

use std::fmt;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;

use crate::backend::MountBackend;
use crate::command::{self, OperationSpec, ProbeSpec};
use crate::config::Limits;
use crate::error::Result;
use crate::mode::Mode;
use crate::privilege::IdentityProvider;
use crate::source::{Mountpoint, MountpointList};

/// Outcome for one mountpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Remounted,
    RemountFailed,
    StateReadOnly,
    StateReadWrite,
    StateUnmounted,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Remounted => "remounted",
            Self::RemountFailed => "could not be remounted",
            Self::StateReadOnly => "is ro",
            Self::StateReadWrite => "is rw",
            Self::StateUnmounted => "is not mounted",
        };
        f.write_str(text)
    }
}

/// Receives each outcome as soon as it is known.
pub trait ReportSink {
    fn record(&mut self, mountpoint: &Mountpoint, result: OperationResult) -> std::io::Result<()>;
}

/// Sink writing state lines to `out` and warnings to `err`.
///
/// Successful remounts print nothing.
pub struct WriterSink<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> WriterSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> ReportSink for WriterSink<O, E> {
    fn record(&mut self, mountpoint: &Mountpoint, result: OperationResult) -> std::io::Result<()> {
        match result {
            OperationResult::Remounted => Ok(()),
            OperationResult::RemountFailed => {
                self.err.write_all(b"Warning: Could not remount \"")?;
                self.err.write_all(path_bytes(mountpoint))?;
                self.err.write_all(b"\"\n")
            }
            OperationResult::StateReadOnly
            | OperationResult::StateReadWrite
            | OperationResult::StateUnmounted => {
                self.out.write_all(path_bytes(mountpoint))?;
                writeln!(self.out, " {}", result)
            }
        }
    }
}

/// Raw path bytes, so non-UTF-8 mountpoints are printed unchanged.
fn path_bytes(mountpoint: &Mountpoint) -> &[u8] {
    mountpoint.as_path().as_os_str().as_bytes()
}

/// Counts collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Drives the per-mountpoint loop for a mode.
pub struct ModeExecutor<'a, B, I> {
    backend: &'a mut B,
    identity: &'a I,
    limits: Limits,
}

impl<'a, B: MountBackend, I: IdentityProvider> ModeExecutor<'a, B, I> {
    pub fn new(backend: &'a mut B, identity: &'a I, limits: Limits) -> Self {
        Self {
            backend,
            identity,
            limits,
        }
    }

    /// Runs `mode` over every mountpoint, reporting each outcome to `sink`.
    pub fn run<S: ReportSink>(
        &mut self,
        mode: Mode,
        list: &MountpointList,
        sink: &mut S,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if mode.is_remount() {
            self.identity.assume_real_root()?;
        }

        for mountpoint in list {
            let spec = command::build(mode, command::intent_for(mode), mountpoint, &self.limits)?;
            let result = match spec {
                OperationSpec::Remount(remount) => match self.backend.remount(&remount) {
                    Ok(()) => OperationResult::Remounted,
                    Err(e) => {
                        tracing::warn!(%mountpoint, error = %e, "remount failed");
                        summary.failed += 1;
                        OperationResult::RemountFailed
                    }
                },
                OperationSpec::Check {
                    read_only,
                    read_write,
                } => {
                    if self.probe(&read_only) {
                        OperationResult::StateReadOnly
                    } else if self.probe(&read_write) {
                        OperationResult::StateReadWrite
                    } else {
                        OperationResult::StateUnmounted
                    }
                }
            };

            summary.processed += 1;
            tracing::info!(%mountpoint, "{}", result);
            if let Err(e) = sink.record(mountpoint, result) {
                tracing::warn!(%mountpoint, error = %e, "failed to write result");
            }
        }

        Ok(summary)
    }

    /// Runs a probe, counting a backend error as a negative answer.
    fn probe(&mut self, spec: &ProbeSpec) -> bool {
        match self.backend.probe(spec) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(probe = %spec, error = %e, "probe failed");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, FakeBackend, FakeIdentity};
    use super::*;
    use crate::error::Error;
    use crate::mode::AccessMode;
    use crate::privilege::ProcessIdentity;
    use crate::source::from_args;
    use std::ffi::OsString;
    use std::io;
    use std::os::unix::ffi::OsStringExt;
    use std::path::PathBuf;

    /// Writer whose reader went away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn list(paths: &[&str]) -> MountpointList {
        let args: Vec<OsString> = paths.iter().map(OsString::from).collect();
        from_args(&args, &Limits::default()).unwrap()
    }

    fn run(
        mode: Mode,
        paths: &[&str],
        backend: &mut FakeBackend,
        identity: &FakeIdentity,
    ) -> (Result<RunSummary>, String, String) {
        let mut sink = WriterSink::new(Vec::new(), Vec::new());
        let result = ModeExecutor::new(backend, identity, Limits::default()).run(
            mode,
            &list(paths),
            &mut sink,
        );
        let (out, err) = sink.into_inner();
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_check_read_only_skips_rw_probe() {
        let mut backend = FakeBackend::default().with_state("/boot", AccessMode::ReadOnly);
        let identity = FakeIdentity::new(ProcessIdentity::user(1000));

        let (result, out, _) = run(Mode::Check, &["/boot"], &mut backend, &identity);

        assert_eq!(result.unwrap().processed, 1);
        assert_eq!(out, "/boot is ro\n");
        assert_eq!(
            backend.calls,
            vec![Call::Probe(PathBuf::from("/boot"), AccessMode::ReadOnly)]
        );
    }

    #[test]
    fn test_check_classifies_each_state() {
        let mut backend = FakeBackend::default()
            .with_state("/", AccessMode::ReadWrite)
            .with_state("/boot", AccessMode::ReadOnly);
        let identity = FakeIdentity::new(ProcessIdentity::user(1000));

        let (result, out, err) = run(Mode::Check, &["/", "/boot", "/nope"], &mut backend, &identity);

        assert_eq!(
            result.unwrap(),
            RunSummary {
                processed: 3,
                failed: 0
            }
        );
        assert_eq!(out, "/ is rw\n/boot is ro\n/nope is not mounted\n");
        assert!(err.is_empty());
        // check never elevates
        assert_eq!(identity.elevations.get(), 0);
    }

    #[test]
    fn test_check_probe_error_is_not_mounted() {
        let mut backend = FakeBackend {
            broken_table: true,
            ..FakeBackend::default()
        };
        let identity = FakeIdentity::new(ProcessIdentity::user(1000));

        let (result, out, _) = run(Mode::Check, &["/"], &mut backend, &identity);

        assert!(result.is_ok());
        assert_eq!(out, "/ is not mounted\n");
        assert_eq!(backend.calls.len(), 2);
    }

    #[test]
    fn test_remount_failure_is_isolated() {
        let mut backend = FakeBackend::default().failing_on("/b");
        let identity = FakeIdentity::new(ProcessIdentity::root());

        let (result, out, err) = run(Mode::ReadOnly, &["/a", "/b", "/c"], &mut backend, &identity);

        assert_eq!(
            result.unwrap(),
            RunSummary {
                processed: 3,
                failed: 1
            }
        );
        assert!(out.is_empty());
        assert_eq!(err, "Warning: Could not remount \"/b\"\n");
        assert_eq!(
            backend.calls,
            vec![
                Call::Remount(PathBuf::from("/a"), AccessMode::ReadOnly),
                Call::Remount(PathBuf::from("/b"), AccessMode::ReadOnly),
                Call::Remount(PathBuf::from("/c"), AccessMode::ReadOnly),
            ]
        );
    }

    #[test]
    fn test_remount_elevates_once() {
        let mut backend = FakeBackend::default();
        let identity = FakeIdentity::new(ProcessIdentity::root());

        let (result, _, _) = run(Mode::ReadWrite, &["/a", "/b"], &mut backend, &identity);

        assert!(result.is_ok());
        assert_eq!(identity.elevations.get(), 1);
        assert_eq!(backend.state.get(&PathBuf::from("/b")), Some(&AccessMode::ReadWrite));
    }

    #[test]
    fn test_elevation_failure_stops_before_backend() {
        let mut backend = FakeBackend::default();
        let mut identity = FakeIdentity::new(ProcessIdentity::root());
        identity.refuse_elevation = true;

        let (result, _, _) = run(Mode::ReadOnly, &["/a"], &mut backend, &identity);

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Elevation { .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_empty_list() {
        let mut backend = FakeBackend::default();
        let identity = FakeIdentity::new(ProcessIdentity::root());

        let (result, out, err) = run(Mode::ReadOnly, &[], &mut backend, &identity);

        assert_eq!(result.unwrap(), RunSummary::default());
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn test_oversized_operation_is_fatal() {
        let mut backend = FakeBackend::default();
        let identity = FakeIdentity::new(ProcessIdentity::root());
        let limits = Limits {
            buffer_capacity: 32,
            ..Limits::default()
        };
        let mut sink = WriterSink::new(Vec::new(), Vec::new());

        let err = ModeExecutor::new(&mut backend, &identity, limits)
            .run(Mode::ReadOnly, &list(&["/", "/a/rather/long/mountpoint"]), &mut sink)
            .unwrap_err();

        assert!(matches!(err, Error::CommandTooLarge { .. }));
        assert_eq!(backend.calls.len(), 1);
    }

    #[test]
    fn test_closed_stderr_does_not_stop_remounts() {
        let mut backend = FakeBackend::default().failing_on("/a");
        let identity = FakeIdentity::new(ProcessIdentity::root());
        let mut sink = WriterSink::new(Vec::new(), ClosedPipe);

        let summary = ModeExecutor::new(&mut backend, &identity, Limits::default())
            .run(Mode::ReadOnly, &list(&["/a", "/b", "/c"]), &mut sink)
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                processed: 3,
                failed: 1
            }
        );
        assert_eq!(backend.calls.len(), 3);
        assert_eq!(backend.state.get(&PathBuf::from("/c")), Some(&AccessMode::ReadOnly));
    }

    #[test]
    fn test_closed_stdout_does_not_stop_check() {
        let mut backend = FakeBackend::default()
            .with_state("/", AccessMode::ReadWrite)
            .with_state("/boot", AccessMode::ReadOnly);
        let identity = FakeIdentity::new(ProcessIdentity::user(1000));
        let mut sink = WriterSink::new(ClosedPipe, Vec::new());

        let summary = ModeExecutor::new(&mut backend, &identity, Limits::default())
            .run(Mode::Check, &list(&["/", "/boot"]), &mut sink)
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(
            backend.calls.last(),
            Some(&Call::Probe(PathBuf::from("/boot"), AccessMode::ReadOnly))
        );
    }

    #[test]
    fn test_sink_writes_raw_path_bytes() {
        let raw = OsString::from_vec(b"/mnt/\xff".to_vec());
        let mountpoint = Mountpoint::new(raw, &Limits::default()).unwrap();
        let mut sink = WriterSink::new(Vec::new(), Vec::new());

        sink.record(&mountpoint, OperationResult::StateReadOnly).unwrap();
        sink.record(&mountpoint, OperationResult::RemountFailed).unwrap();
        sink.record(&mountpoint, OperationResult::Remounted).unwrap();

        let (out, err) = sink.into_inner();
        assert_eq!(out, b"/mnt/\xff is ro\n");
        assert_eq!(err, b"Warning: Could not remount \"/mnt/\xff\"\n");
    }

    #[test]
    fn test_operation_result_display() {
        assert_eq!(OperationResult::StateReadOnly.to_string(), "is ro");
        assert_eq!(OperationResult::StateUnmounted.to_string(), "is not mounted");
        assert_eq!(OperationResult::RemountFailed.to_string(), "could not be remounted");
    }
}
