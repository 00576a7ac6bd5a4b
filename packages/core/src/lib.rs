//! remount-core: Core library for toggling mountpoints between read-only
//! and read-write.
//!
//! # Modules
//!
//! - [`source`]: Mountpoint resolution from arguments or configuration files
//! - [`privilege`]: Privilege checks per mode
//! - [`command`]: Remount and probe operation descriptors with size checks
//! - [`backend`]: Mount backend trait and the `mount`/`/proc/mounts` backend
//! - [`mounts`]: Mount table parsing
//! - [`executor`]: Per-mountpoint execution and reporting
//! - [`invocation`]: A complete run, from authorization to summary
//! - [`error`]: Error types and exit codes
//!
//! # Example
//!
//! ```no_run
//! use remount_core::{Invocation, Mode, SystemBackend, SystemIdentity, WriterSink};
//!
//! let invocation = Invocation::new(Mode::Check, vec!["/".into()]);
//! let mut sink = WriterSink::new(std::io::stdout(), std::io::stderr());
//! let summary = invocation
//!     .run(&SystemIdentity, &mut SystemBackend::new(), &mut sink)
//!     .unwrap();
//! assert_eq!(summary.processed, 1);
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod mode;
pub mod mounts;
pub mod privilege;
pub mod source;

// Re-export commonly used types
pub use backend::{MountBackend, SystemBackend};
pub use config::{ConfigPaths, Limits};
pub use error::{Error, Result};
pub use executor::{ModeExecutor, OperationResult, ReportSink, RunSummary, WriterSink};
pub use invocation::Invocation;
pub use mode::{AccessMode, Mode};
pub use privilege::{IdentityProvider, ProcessIdentity, SystemIdentity};
pub use source::{Mountpoint, MountpointList};
