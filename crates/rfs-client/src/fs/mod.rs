//! Typed file-system operations on top of the dispatcher.
//!
//! Each method sends one request and reads the records the helper answers
//! with, in the order the helper writes them:
//!
//! | Operation        | Records                                        |
//! |------------------|------------------------------------------------|
//! | `ls`, `delete`   | `l` header, `f` entries, `e`                   |
//! | `copy`           | `l` header of the destination parent, `f`, `e` |
//! | `recursive_ls`   | per directory `r`, `f`, `e`; one final `e`     |
//! | `stat`, `lstat`, `move_file` | one `f` entry                      |
//! | `server_info`    | one `i` record                                 |
//! | `refresh`        | `R` header, `c` notices, `e`                   |
//!
//! An `E` record at any point fails the whole operation.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::mpsc::Receiver;

use rfs_config::Config;
use rfs_protocol::{FsEntry, Request, RequestKind, ResponseKind, ServerVersion};
use tracing::{debug, warn};

use crate::CLIENT_TARGET;
use crate::dispatcher::{ChangeNotice, Dispatcher, PendingResponse};
use crate::error::ClientError;
use crate::exit_code::ServerExit;
use crate::options::ClientOptions;
use crate::process::ServerProcess;
use crate::response::Package;

/// Result of [`FsClient::recursive_ls`]: entries keyed by directory path.
pub type DirectoryListing = BTreeMap<String, Vec<FsEntry>>;

/// A connection to one helper with typed operations.
#[derive(Debug)]
pub struct FsClient {
    dispatcher: Dispatcher,
    process: Option<ServerProcess>,
}

impl FsClient {
    /// Spawns the helper described by `config` and connects to it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the helper cannot be started, or
    /// [`ClientError::Io`] if the reader thread cannot be.
    pub fn spawn(config: &Config) -> Result<Self, ClientError> {
        let (process, stdout, stdin) = ServerProcess::spawn(config)?;
        let dispatcher = Dispatcher::new(stdout, stdin, ClientOptions::from_config(config))?;
        debug!(target: CLIENT_TARGET, host = config.host(), pid = process.id(), "connected");
        Ok(Self {
            dispatcher,
            process: Some(process),
        })
    }

    /// Connects to a helper whose streams the caller already owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the reader thread cannot be started.
    pub fn from_streams<R, W>(input: R, output: W, options: ClientOptions) -> Result<Self, ClientError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Ok(Self {
            dispatcher: Dispatcher::new(input, output, options)?,
            process: None,
        })
    }

    /// The underlying dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Receiver for change notifications no request claims, such as those
    /// from the helper's background refresh.
    #[must_use]
    pub fn changes(&self) -> Receiver<ChangeNotice> {
        self.dispatcher.subscribe_changes()
    }

    /// Lists a directory.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Remote`] when the helper reports an error,
    /// and with any dispatch or timeout error.
    pub fn ls(&self, path: &str) -> Result<Vec<FsEntry>, ClientError> {
        let pending = self.dispatcher.dispatch(Request::new(RequestKind::Ls, path))?;
        read_listing(&pending)
    }

    /// Lists a directory and every directory below it.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`]; an error in any subdirectory fails the whole
    /// listing.
    pub fn recursive_ls(&self, path: &str) -> Result<DirectoryListing, ClientError> {
        let pending = self
            .dispatcher
            .dispatch(Request::new(RequestKind::RecursiveLs, path))?;
        let mut listing = DirectoryListing::new();
        let mut current: Option<String> = None;
        let mut headers = 0_usize;
        let mut ends = 0_usize;
        loop {
            let package = pending.next_package()?;
            match package.kind() {
                ResponseKind::RecursiveLs => {
                    headers += 1;
                    let directory = package.buffer().get_string();
                    listing.entry(directory.clone()).or_default();
                    current = Some(directory);
                }
                ResponseKind::Entry => {
                    let Some(directory) = current.as_ref() else {
                        return Err(unexpected(&package, &pending));
                    };
                    let entry = FsEntry::decode(package.data())?;
                    listing.entry(directory.clone()).or_default().push(entry);
                }
                ResponseKind::End => {
                    ends += 1;
                    if ends > headers {
                        break;
                    }
                    current = None;
                }
                _ => return Err(unexpected(&package, &pending)),
            }
        }
        pending.dispose();
        Ok(listing)
    }

    /// Stats a path, following symbolic links.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`].
    pub fn stat(&self, path: &str) -> Result<FsEntry, ClientError> {
        let pending = self.dispatcher.dispatch(Request::new(RequestKind::Stat, path))?;
        read_entry(&pending)
    }

    /// Stats a path without following symbolic links.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`].
    pub fn lstat(&self, path: &str) -> Result<FsEntry, ClientError> {
        let pending = self.dispatcher.dispatch(Request::new(RequestKind::Lstat, path))?;
        read_entry(&pending)
    }

    /// Copies a file, link or directory tree and returns the listing of the
    /// destination's parent directory.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`]. The helper refuses existing destinations.
    pub fn copy(&self, from: &str, to: &str) -> Result<Vec<FsEntry>, ClientError> {
        let pending = self
            .dispatcher
            .dispatch(Request::with_second_path(RequestKind::Copy, from, to))?;
        read_listing(&pending)
    }

    /// Moves a plain file and returns the entry at its new location.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`]. The helper refuses to move directories.
    pub fn move_file(&self, from: &str, to: &str) -> Result<FsEntry, ClientError> {
        let pending = self
            .dispatcher
            .dispatch(Request::with_second_path(RequestKind::Move, from, to))?;
        read_entry(&pending)
    }

    /// Deletes a file or directory tree and returns the listing of its
    /// parent directory.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`].
    pub fn delete(&self, path: &str) -> Result<Vec<FsEntry>, ClientError> {
        let pending = self
            .dispatcher
            .dispatch(Request::new(RequestKind::Delete, path))?;
        read_listing(&pending)
    }

    /// Asks the helper for its version.
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`], plus [`ClientError::Decode`] for a
    /// malformed version.
    pub fn server_info(&self) -> Result<ServerVersion, ClientError> {
        let pending = self.dispatcher.dispatch(Request::server_info())?;
        let package = pending.next_package()?;
        if package.kind() != ResponseKind::ServerInfo {
            return Err(unexpected(&package, &pending));
        }
        Ok(package.data().parse()?)
    }

    /// Runs a refresh cycle for the watched directories under `path` and
    /// returns the directories that changed.
    ///
    /// The helper answers nothing while another refresh of the same path is
    /// running, so this call then ends with [`ClientError::Timeout`].
    ///
    /// # Errors
    ///
    /// As for [`FsClient::ls`].
    pub fn refresh(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let pending = self
            .dispatcher
            .dispatch(Request::new(RequestKind::Refresh, path))?;
        expect_header(&pending, ResponseKind::Refresh)?;
        let mut changed = Vec::new();
        loop {
            let package = pending.next_package()?;
            match package.kind() {
                ResponseKind::Change => changed.push(package.buffer().get_string()),
                ResponseKind::End => break,
                _ => return Err(unexpected(&package, &pending)),
            }
        }
        pending.dispose();
        Ok(changed)
    }

    /// Starts polling `path` for changes.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn add_watch(&self, path: &str) -> Result<(), ClientError> {
        self.dispatcher
            .send(&Request::one_way(RequestKind::AddWatch, path))
    }

    /// Stops polling `path`.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn remove_watch(&self, path: &str) -> Result<(), ClientError> {
        self.dispatcher
            .send(&Request::one_way(RequestKind::RemoveWatch, path))
    }

    /// Asks the helper to delete `path` when it exits.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn delete_on_disconnect(&self, path: &str) -> Result<(), ClientError> {
        self.dispatcher
            .send(&Request::one_way(RequestKind::DeleteOnDisconnect, path))
    }

    /// Sets a helper option.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn set_option(&self, name: &str, value: &str) -> Result<(), ClientError> {
        self.dispatcher.send(&Request::option(name, value))
    }

    /// Makes the helper's request loop sleep, for diagnosing timeouts.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn sleep(&self, seconds: u32) -> Result<(), ClientError> {
        self.dispatcher.send(&Request::sleep(seconds))
    }

    /// Asks the helper to exit without waiting for it.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be written.
    pub fn quit(&self) -> Result<(), ClientError> {
        self.dispatcher.send(&Request::quit())
    }

    /// Sends `q` and, for a spawned helper, waits briefly for it to exit
    /// before killing it.
    ///
    /// Returns the helper's exit classification, or `None` when the client
    /// was built from caller-owned streams.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ServerExited`] when the helper did not exit
    /// cleanly.
    pub fn shutdown(self) -> Result<Option<ServerExit>, ClientError> {
        if let Err(error) = self.quit() {
            debug!(target: CLIENT_TARGET, %error, "could not send quit");
        }
        let Self {
            dispatcher,
            process,
        } = self;
        let Some(mut child) = process else {
            return Ok(None);
        };
        let exit = child.terminate();
        dispatcher.join_reader();
        if exit.is_success() {
            Ok(Some(exit))
        } else {
            Err(ClientError::ServerExited(exit))
        }
    }
}

fn unexpected(package: &Package, pending: &PendingResponse) -> ClientError {
    warn!(
        target: CLIENT_TARGET,
        kind = %package.kind(),
        request = %pending.request(),
        "unexpected record"
    );
    ClientError::UnexpectedPackage {
        kind: package.kind(),
        request: pending.request().to_string(),
    }
}

fn expect_header(pending: &PendingResponse, kind: ResponseKind) -> Result<(), ClientError> {
    let package = pending.next_package()?;
    if package.kind() == kind {
        Ok(())
    } else {
        Err(unexpected(&package, pending))
    }
}

/// Reads an `l` header, its entries and the closing `e`.
fn read_listing(pending: &PendingResponse) -> Result<Vec<FsEntry>, ClientError> {
    expect_header(pending, ResponseKind::Ls)?;
    let mut entries = Vec::new();
    loop {
        let package = pending.next_package()?;
        match package.kind() {
            ResponseKind::Entry => entries.push(FsEntry::decode(package.data())?),
            ResponseKind::End => return Ok(entries),
            _ => return Err(unexpected(&package, pending)),
        }
    }
}

fn read_entry(pending: &PendingResponse) -> Result<FsEntry, ClientError> {
    let package = pending.next_package()?;
    if package.kind() != ResponseKind::Entry {
        return Err(unexpected(&package, pending));
    }
    Ok(FsEntry::decode(package.data())?)
}
