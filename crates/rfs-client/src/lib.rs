//! Client for the `fs_server` remote file-system helper.
//!
//! The helper is a native process that answers file-system queries over its
//! standard input and output using the line protocol in [`rfs_protocol`].
//! This crate correlates its answers with the requests that caused them:
//!
//! - [`Response`]: the per-request queue of records with a blocking,
//!   timeout-bounded [`Response::next_package`]
//! - [`Dispatcher`]: the id-keyed table of in-flight responses and the
//!   reader thread that fills them
//! - [`errno_error`]: how helper errno values map onto [`FsError`]
//! - [`ServerExit`]: how helper exit statuses are classified
//! - [`HangupRegistry`]: hosts that stopped answering
//! - [`FsClient`]: typed operations (`ls`, `stat`, `copy`, ...) on top of
//!   the dispatcher, optionally owning a spawned [`ServerProcess`]
//!
//! # Example
//!
//! ```no_run
//! use rfs_client::FsClient;
//! use rfs_config::Config;
//!
//! let client = FsClient::spawn(&Config::default())?;
//! for entry in client.ls("/tmp")? {
//!     println!("{} {}", entry.file_type().as_char(), entry.name());
//! }
//! client.shutdown()?;
//! # Ok::<(), rfs_client::ClientError>(())
//! ```

mod dispatcher;
mod errno;
mod error;
mod exit_code;
mod fs;
mod hangup;
mod options;
mod process;
mod response;

pub use self::dispatcher::{ChangeNotice, Dispatcher, PendingRequest, PendingResponse};
pub use self::errno::errno_error;
pub use self::error::{ClientError, FsError};
pub use self::exit_code::{ExitFailure, ServerExit};
pub use self::fs::{DirectoryListing, FsClient};
pub use self::hangup::HangupRegistry;
pub use self::options::ClientOptions;
pub use self::process::{ServerCommand, ServerProcess};
pub use self::response::{Package, Response};

/// Tracing target for client diagnostics.
pub(crate) const CLIENT_TARGET: &str = "rfs_client";

#[cfg(test)]
mod tests;
