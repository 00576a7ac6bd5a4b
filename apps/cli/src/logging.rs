//! Diagnostic logging setup.
//!
//! Result lines and warnings are program output and bypass this; logging is
//! for diagnostics only and stays quiet unless `REMOUNT_LOG` asks otherwise.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `REMOUNT_LOG=debug`.
const LOG_ENV: &str = "REMOUNT_LOG";

const DEFAULT_DIRECTIVE: &str = "error";

pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
