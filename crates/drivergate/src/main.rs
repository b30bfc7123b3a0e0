//! Dry-run entrypoint for GPU driver selection.
//!
//! The binary delegates to [`drivergate::run`], which loads configuration,
//! reads a device scenario, runs setup, and prints the resulting report.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    drivergate::run(std::env::args_os(), &mut stdout, &mut stderr)
}
