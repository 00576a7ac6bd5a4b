//! remount - Quickly manage read-only/read-write mountpoints.
//!
//! Thin front end over `remount-core`: parses the command line, sets up
//! logging and maps errors to exit codes.

mod logging;

use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use snafu::ErrorCompat;

use remount_core::config::{CONFIG_FILE, DEFCONFIG_FILE};
use remount_core::error::exit;
use remount_core::{Error, Invocation, Mode, SystemBackend, SystemIdentity, WriterSink};

/// Remount tool.
#[derive(Parser, Debug)]
#[command(name = "remount", version)]
#[command(about = "Quickly manage read-only/read-write mountpoints", long_about = None)]
#[command(after_help = after_help())]
struct Cli {
    /// ro: remount read-only, rw: remount read-write, ch: check mount state (ro/rw)
    #[arg(value_name = "MODE", value_parser = parse_mode)]
    mode: Mode,

    /// Mountpoints to remount or check
    #[arg(value_name = "MOUNTPOINT", allow_hyphen_values = true)]
    mountpoints: Vec<OsString>,
}

fn after_help() -> String {
    format!(
        "Default mountpoint list is defined in the configuration file \"{}\". \
         If no configuration file is found, the default configuration file \
         located in \"{}\" is used.",
        CONFIG_FILE, DEFCONFIG_FILE
    )
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

/// Exit code for a command line that could not be parsed.
fn parse_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit::SUCCESS,
        _ => exit::BAD_ARGUMENT,
    }
}

/// Formats an error with its causes on one line.
fn report(error: &Error) -> String {
    error
        .iter_chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

fn run(cli: Cli) -> ExitCode {
    tracing::debug!(mode = %cli.mode, count = cli.mountpoints.len(), "starting");

    let invocation = Invocation::new(cli.mode, cli.mountpoints);
    let mut sink = WriterSink::new(io::stdout(), io::stderr());

    match invocation.run(&SystemIdentity, &mut SystemBackend::new(), &mut sink) {
        Ok(summary) => {
            tracing::debug!(
                processed = summary.processed,
                failed = summary.failed,
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", report(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_code(e.kind()));
        }
    };

    logging::init();
    run(cli)
}
