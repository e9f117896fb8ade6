//! Entry point for the `rfs` binary.
//!
//! All work happens in [`rfs_cli::run`], which parses arguments, loads
//! configuration, spawns the helper and renders the result.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    rfs_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
