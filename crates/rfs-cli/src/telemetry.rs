//! Tracing subscriber set-up for the CLI.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use rfs_config::{Config, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    /// The configured filter does not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber on the first call; later calls do nothing.
///
/// Logs go to stderr so they never mix with command output.
pub(crate) fn initialise(config: &Config) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| ())
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
