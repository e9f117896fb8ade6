//! Runtime for the `rfs` command-line client.
//!
//! [`run`] splits leading configuration flags from the command, loads
//! [`rfs_config::Config`] through `ortho_config`, installs logging, spawns
//! the `fs_server` helper and renders the result of one operation. Output
//! and diagnostics go to the writers passed in, so tests can capture both.

use std::ffi::OsString;
use std::fmt::Display;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use rfs_client::{ClientError, ServerExit};
use tracing::warn;

mod cli;
mod commands;
mod config;
mod errors;
mod output;
mod telemetry;

use cli::Cli;
use commands::{Connector, SpawnConnector, execute};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

/// Tracing target for CLI diagnostics.
pub(crate) const CLI_TARGET: &str = "rfs_cli";

/// Runs the CLI with the given arguments and output streams.
///
/// Returns success when the operation completed and the helper exited
/// cleanly. When the helper exits with one of its named start-up failures,
/// the process exits with the same code.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &SpawnConnector)
}

pub(crate) fn run_with<I, W, E, L, C>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    connector: &C,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    C: Connector,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let result = Cli::try_parse_from(command_arguments(&args, &split))
        .map_err(AppError::CliUsage)
        .and_then(|cli| loader.load(&split.config_arguments).map(|config| (cli, config)))
        .and_then(|(cli, config)| {
            telemetry::initialise(&config)?;
            let client = connector.connect(&config)?;
            execute(&cli.command, client, stdout)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error))
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            write_diagnostic(stdout, &error);
            ExitCode::SUCCESS
        }
        Err(error) => {
            write_diagnostic(stderr, &error);
            exit_code_for(&error)
        }
    }
}

fn write_diagnostic<W: Write>(out: &mut W, message: &impl Display) {
    let text = message.to_string();
    let written = if text.ends_with('\n') {
        out.write_all(text.as_bytes())
    } else {
        writeln!(out, "{text}")
    };
    if let Err(error) = written {
        warn!(target: CLI_TARGET, %error, "failed to write diagnostic");
    }
}

fn exit_code_for(error: &AppError) -> ExitCode {
    match error {
        AppError::CliUsage(usage) => {
            u8::try_from(usage.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        AppError::Client(ClientError::ServerExited(ServerExit::Failure(failure))) => {
            u8::try_from(failure.code()).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests;
