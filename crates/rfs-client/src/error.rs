//! Error types for the remote file-system client.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rfs_protocol::{DecodeError, RequestKind, ResponseKind};
use thiserror::Error;

use crate::exit_code::ServerExit;

/// A failure reported by the helper for one path.
///
/// Produced from `E` records by [`errno_error`](crate::errno_error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// The path does not exist or cannot be seen by the helper's user.
    #[error("{path}: not found ({message}, errno {errno})")]
    NotFound {
        /// Errno reported by the helper.
        errno: i32,
        /// Message reported by the helper.
        message: String,
        /// Path the helper named in its report: the request's path, or the
        /// destination of a copy or move when the failure concerns it.
        path: String,
    },

    /// Any other I/O failure on the remote side.
    #[error("{path}: {message} (errno {errno})")]
    Io {
        /// Errno reported by the helper.
        errno: i32,
        /// Message reported by the helper.
        message: String,
        /// Path the helper named in its report: the request's path, or the
        /// destination of a copy or move when the failure concerns it.
        path: String,
    },
}

impl FsError {
    /// The errno reported by the helper.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::NotFound { errno, .. } | Self::Io { errno, .. } => *errno,
        }
    }

    /// Whether this is [`FsError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while talking to the helper.
///
/// The type is `Clone` so a single connection failure can be handed to every
/// caller waiting on the same response.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No record arrived within the timeout.
    #[error("{kind} {path} on {host}: no response within {elapsed:?}")]
    Timeout {
        /// Operation that was waiting.
        kind: RequestKind,
        /// Path of the request.
        path: String,
        /// Host the helper runs on.
        host: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The helper reported a failure for the request.
    #[error(transparent)]
    Remote(#[from] FsError),

    /// An earlier timeout marked the host as hung.
    #[error("host {host} is marked as hung")]
    HungUp {
        /// The hung host.
        host: String,
    },

    /// The helper's output ended or failed.
    #[error("connection to {host} closed: {reason}")]
    ConnectionClosed {
        /// Host the helper runs on.
        host: String,
        /// Why the connection closed.
        reason: String,
    },

    /// Writing a request to the helper failed.
    #[error("I/O error talking to {host}: {source}")]
    Io {
        /// Host the helper runs on.
        host: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A response record could not be decoded.
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),

    /// A record of the wrong kind arrived for the request.
    #[error("unexpected '{kind}' record for {request}")]
    UnexpectedPackage {
        /// The record kind that arrived.
        kind: ResponseKind,
        /// The request, rendered for diagnostics.
        request: String,
    },

    /// A one-way request was passed where a response is required.
    #[error("{kind} requests carry id 0 and receive no response")]
    NoResponseExpected {
        /// The operation.
        kind: RequestKind,
    },

    /// A request that needs a path was given an empty one.
    #[error("{kind} requires a non-empty path")]
    EmptyPath {
        /// The operation.
        kind: RequestKind,
    },

    /// The helper process could not be started.
    #[error("failed to start {command}: {source}")]
    Spawn {
        /// The helper command line.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The helper process exited with a failure status.
    #[error("fs_server exited: {0}")]
    ServerExited(ServerExit),
}

impl ClientError {
    /// Whether the error is a remote not-found failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(error) if error.is_not_found())
    }
}
