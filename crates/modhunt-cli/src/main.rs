//! CLI entrypoint for the `modhunt` crash finder.
//!
//! The binary delegates to [`modhunt_cli::run`], which loads configuration,
//! parses the command, and drives the hunt against the configured server.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    modhunt_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
