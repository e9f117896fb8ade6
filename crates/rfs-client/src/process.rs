//! Spawning and reaping the `fs_server` helper process.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rfs_config::Config;
use tracing::{debug, warn};

use crate::CLIENT_TARGET;
use crate::error::ClientError;
use crate::exit_code::ServerExit;

/// How long a helper gets to exit on its own before it is killed.
const GRACE_PERIOD: Duration = Duration::from_millis(200);

/// The helper command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: Utf8PathBuf,
    threads: u16,
    persistence: bool,
    refresh_interval_secs: Option<u32>,
}

impl ServerCommand {
    /// A command running `program` with default settings.
    #[must_use]
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            threads: rfs_config::DEFAULT_SERVER_THREADS,
            persistence: false,
            refresh_interval_secs: None,
        }
    }

    /// Builds the command from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.server_path().to_owned(),
            threads: config.server_threads(),
            persistence: config.persistence(),
            refresh_interval_secs: config.refresh_interval_secs(),
        }
    }

    /// Sets the helper's worker thread count (`-t`).
    #[must_use]
    pub const fn with_threads(mut self, threads: u16) -> Self {
        self.threads = threads;
        self
    }

    /// Enables the helper's directory cache (`-p`).
    #[must_use]
    pub const fn with_persistence(mut self, persistence: bool) -> Self {
        self.persistence = persistence;
        self
    }

    /// Sets the background refresh interval (`-r`).
    #[must_use]
    pub const fn with_refresh_interval(mut self, seconds: Option<u32>) -> Self {
        self.refresh_interval_secs = seconds;
        self
    }

    /// The helper binary.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// Command-line arguments passed to the helper.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-t".to_owned(), self.threads.to_string()];
        if self.persistence {
            args.push("-p".to_owned());
        }
        if let Some(seconds) = self.refresh_interval_secs {
            args.push("-r".to_owned());
            args.push(seconds.to_string());
        }
        args
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.program)?;
        for arg in self.args() {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// A running helper process.
///
/// Its stdin and stdout are handed to the caller by [`ServerProcess::spawn`];
/// stderr is drained into debug logs. Dropping a process that was not
/// terminated kills it.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    command: String,
    stderr: Option<JoinHandle<()>>,
    exit: Option<ServerExit>,
}

impl ServerProcess {
    /// Spawns the helper described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the process cannot be started.
    pub fn spawn(config: &Config) -> Result<(Self, ChildStdout, ChildStdin), ClientError> {
        Self::spawn_command(&ServerCommand::from_config(config))
    }

    /// Spawns `command` with piped standard streams.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the process cannot be started.
    pub fn spawn_command(
        command: &ServerCommand,
    ) -> Result<(Self, ChildStdout, ChildStdin), ClientError> {
        let rendered = command.to_string();
        debug!(target: CLIENT_TARGET, command = %rendered, "spawning fs_server");

        let spawn_error = |source: std::io::Error| ClientError::Spawn {
            command: rendered.clone(),
            source: Arc::new(source),
        };
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            kill_quietly(&mut child);
            return Err(spawn_error(std::io::Error::other(
                "failed to capture helper stdio",
            )));
        };
        let stderr = child.stderr.take().and_then(|pipe| drain_stderr(pipe, child.id()));

        debug!(target: CLIENT_TARGET, pid = child.id(), "fs_server spawned");
        let process = Self {
            child,
            command: rendered,
            stderr,
            exit: None,
        };
        Ok((process, stdout, stdin))
    }

    /// The helper's process id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The exit classification, if the helper has exited.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] wrapping the error if the status
    /// cannot be queried.
    pub fn try_exit(&mut self) -> Result<Option<ServerExit>, ClientError> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }
        let status = self.child.try_wait().map_err(|source| ClientError::Spawn {
            command: self.command.clone(),
            source: Arc::new(source),
        })?;
        Ok(status.map(|exited| self.record(ServerExit::from_status(exited))))
    }

    /// Waits briefly for the helper to exit, then kills it, and returns how
    /// it ended.
    pub fn terminate(&mut self) -> ServerExit {
        if let Some(exit) = self.exit {
            return exit;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => return self.record(ServerExit::from_status(status)),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    target: CLIENT_TARGET,
                    %error,
                    "failed to check fs_server status, waiting before killing"
                );
            }
        }
        thread::sleep(GRACE_PERIOD);
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(target: CLIENT_TARGET, ?status, "fs_server exited during grace period");
            return self.record(ServerExit::from_status(status));
        }

        warn!(
            target: CLIENT_TARGET,
            pid = self.child.id(),
            "fs_server did not exit gracefully, killing"
        );
        if let Err(error) = self.child.kill() {
            debug!(target: CLIENT_TARGET, %error, "kill failed");
        }
        let exit = match self.child.wait() {
            Ok(status) => ServerExit::from_status(status),
            Err(error) => {
                warn!(target: CLIENT_TARGET, %error, "failed to reap fs_server");
                ServerExit::Other(-1)
            }
        };
        self.record(exit)
    }

    fn record(&mut self, exit: ServerExit) -> ServerExit {
        self.exit = Some(exit);
        if let Some(handle) = self.stderr.take() {
            if handle.join().is_err() {
                warn!(target: CLIENT_TARGET, "stderr drain thread panicked");
            }
        }
        if exit.is_success() {
            debug!(target: CLIENT_TARGET, %exit, "fs_server exited");
        } else {
            warn!(target: CLIENT_TARGET, %exit, "fs_server exited abnormally");
        }
        exit
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if self.exit.is_none() {
            kill_quietly(&mut self.child);
        }
    }
}

fn kill_quietly(child: &mut Child) {
    if child.kill().is_ok() {
        let _reaped = child.wait();
    }
}

fn drain_stderr(pipe: ChildStderr, pid: u32) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name(format!("rfs-stderr-{pid}"))
        .spawn(move || {
            for line in BufReader::new(pipe).lines() {
                match line {
                    Ok(text) => debug!(target: CLIENT_TARGET, pid, "fs_server: {text}"),
                    Err(error) => {
                        debug!(target: CLIENT_TARGET, pid, %error, "stopped reading fs_server stderr");
                        break;
                    }
                }
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(error) => {
            warn!(target: CLIENT_TARGET, %error, "failed to start stderr drain thread");
            None
        }
    }
}
