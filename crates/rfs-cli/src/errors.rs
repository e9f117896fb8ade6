//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use rfs_client::ClientError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write output: {0}")]
    WriteOutput(#[from] io::Error),
}
