//! Runs one parsed command against a connected client.

use std::io::Write;

use rfs_client::{ClientError, FsClient, ServerExit};
use rfs_config::Config;
use tracing::debug;

use crate::CLI_TARGET;
use crate::cli::CliCommand;
use crate::errors::AppError;
use crate::output;

/// Opens a client for the loaded configuration.
pub(crate) trait Connector {
    fn connect(&self, config: &Config) -> Result<FsClient, ClientError>;
}

/// Spawns the configured helper binary.
pub(crate) struct SpawnConnector;

impl Connector for SpawnConnector {
    fn connect(&self, config: &Config) -> Result<FsClient, ClientError> {
        FsClient::spawn(config)
    }
}

impl<F> Connector for F
where
    F: Fn(&Config) -> Result<FsClient, ClientError>,
{
    fn connect(&self, config: &Config) -> Result<FsClient, ClientError> {
        self(config)
    }
}

/// Runs `command`, then shuts the client down.
///
/// A command failure takes precedence over a shutdown failure, except when
/// the command lost its connection because the helper died with one of its
/// named failures: that exit is the better diagnosis.
pub(crate) fn execute<W: Write>(
    command: &CliCommand,
    client: FsClient,
    stdout: &mut W,
) -> Result<(), AppError> {
    let outcome = run_command(command, &client, stdout);
    let shutdown = client.shutdown();
    match (outcome, shutdown) {
        (
            Err(AppError::Client(ClientError::ConnectionClosed { .. } | ClientError::Io { .. })),
            Err(exited @ ClientError::ServerExited(ServerExit::Failure(_))),
        ) => Err(exited.into()),
        (command_result, shutdown_result) => {
            command_result?;
            let exit = shutdown_result?;
            debug!(target: CLI_TARGET, ?exit, "helper shut down");
            Ok(())
        }
    }
}

fn run_command<W: Write>(
    command: &CliCommand,
    client: &FsClient,
    stdout: &mut W,
) -> Result<(), AppError> {
    match command {
        CliCommand::Ls {
            recursive: false,
            path,
        } => output::write_entries(stdout, &client.ls(path)?)?,
        CliCommand::Ls {
            recursive: true,
            path,
        } => output::write_listing(stdout, &client.recursive_ls(path)?)?,
        CliCommand::Stat { path } => output::write_entry(stdout, &client.stat(path)?)?,
        CliCommand::Lstat { path } => output::write_entry(stdout, &client.lstat(path)?)?,
        CliCommand::Cp { from, to } => output::write_entries(stdout, &client.copy(from, to)?)?,
        CliCommand::Mv { from, to } => output::write_entry(stdout, &client.move_file(from, to)?)?,
        CliCommand::Rm { path } => output::write_entries(stdout, &client.delete(path)?)?,
        CliCommand::Info => writeln!(stdout, "fs_server {}", client.server_info()?)?,
        CliCommand::Refresh { path } => output::write_lines(stdout, &client.refresh(path)?)?,
    }
    stdout.flush()?;
    Ok(())
}
