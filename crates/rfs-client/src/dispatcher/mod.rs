//! Request/response multiplexing over one helper connection.
//!
//! A [`Dispatcher`] writes encoded requests to the helper's input and keeps a
//! table of in-flight [`Response`]s keyed by request id. A dedicated reader
//! thread splits the helper's output into records and routes each one to its
//! response. When the output ends, every pending response fails with
//! [`ClientError::ConnectionClosed`] and the dispatcher refuses new work.

mod pending;
mod reader;

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use rfs_protocol::{Request, RequestId, RequestKind};
use tracing::{debug, warn};

pub use self::pending::PendingResponse;
use crate::CLIENT_TARGET;
use crate::error::ClientError;
use crate::options::ClientOptions;
use crate::response::Response;

/// An unsolicited change notification (`c` record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Id of the record; 0 for background refresh cycles.
    pub request_id: RequestId,
    /// Directory whose contents changed.
    pub path: String,
}

/// Summary of one in-flight request, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Request id.
    pub id: RequestId,
    /// Operation.
    pub kind: RequestKind,
    /// Primary path.
    pub path: String,
}

impl fmt::Display for PendingRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{} {} {}", self.id, self.kind, self.path)
    }
}

/// State shared between the dispatcher, its reader thread and every
/// [`PendingResponse`].
#[derive(Debug)]
pub(crate) struct Shared {
    options: ClientOptions,
    table: Mutex<HashMap<RequestId, Arc<Response>>>,
    closed: Mutex<Option<String>>,
    changes: Mutex<Option<Sender<ChangeNotice>>>,
}

impl Shared {
    fn new(options: ClientOptions) -> Self {
        Self {
            options,
            table: Mutex::new(HashMap::new()),
            closed: Mutex::new(None),
            changes: Mutex::new(None),
        }
    }

    pub(crate) const fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn table(&self) -> MutexGuard<'_, HashMap<RequestId, Arc<Response>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lookup(&self, id: RequestId) -> Option<Arc<Response>> {
        self.table().get(&id).cloned()
    }

    pub(crate) fn remove(&self, id: RequestId) {
        self.table().remove(&id);
    }

    pub(crate) fn pending(&self) -> Vec<PendingRequest> {
        let mut pending: Vec<PendingRequest> = self
            .table()
            .values()
            .map(|response| PendingRequest {
                id: response.request().id(),
                kind: response.request().kind(),
                path: response.request().path().to_owned(),
            })
            .collect();
        pending.sort_by_key(|request| request.id);
        pending
    }

    fn closed_reason(&self) -> Option<String> {
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_usable(&self) -> Result<(), ClientError> {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_usable(closed.as_deref())
    }

    fn check_usable(&self, closed: Option<&str>) -> Result<(), ClientError> {
        let host = self.options.host();
        if self.options.hangups().is_hung(host) {
            return Err(ClientError::HungUp {
                host: host.to_owned(),
            });
        }
        if let Some(reason) = closed {
            return Err(ClientError::ConnectionClosed {
                host: host.to_owned(),
                reason: reason.to_owned(),
            });
        }
        Ok(())
    }

    /// Adds a response to the table unless the connection is unusable.
    ///
    /// The `closed` lock is held across the insert so a concurrent
    /// [`Shared::close`] either sees the new entry or is seen by it.
    fn register(&self, response: &Arc<Response>) -> Result<(), ClientError> {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_usable(closed.as_deref())?;
        self.table()
            .insert(response.request().id(), Arc::clone(response));
        Ok(())
    }

    /// Marks the connection closed and fails every pending response.
    pub(crate) fn close(&self, reason: &str) {
        {
            let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
            if closed.is_some() {
                return;
            }
            *closed = Some(reason.to_owned());
        }
        let responses: Vec<Arc<Response>> = self.table().drain().map(|(_, value)| value).collect();
        debug!(
            target: CLIENT_TARGET,
            host = self.options.host(),
            reason,
            pending = responses.len(),
            "connection closed"
        );
        for response in responses {
            response.fail(ClientError::ConnectionClosed {
                host: self.options.host().to_owned(),
                reason: reason.to_owned(),
            });
        }
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn notify_change(&self, notice: ChangeNotice) {
        let mut changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        let delivered = changes
            .as_ref()
            .is_some_and(|sender| sender.send(notice.clone()).is_ok());
        if !delivered {
            if changes.take().is_some() {
                debug!(target: CLIENT_TARGET, "change listener went away");
            }
            debug!(
                target: CLIENT_TARGET,
                path = %notice.path,
                "dropping change notification without listener"
            );
        }
    }

    /// Logs every in-flight request; used when a host is marked hung.
    pub(crate) fn dump_pending(&self) {
        let pending = self.pending();
        warn!(
            target: CLIENT_TARGET,
            host = self.options.host(),
            count = pending.len(),
            "dumping pending requests"
        );
        for request in pending {
            warn!(target: CLIENT_TARGET, host = self.options.host(), %request, "pending");
        }
    }
}

/// Multiplexes requests over one helper connection.
pub struct Dispatcher {
    shared: Arc<Shared>,
    writer: Mutex<Box<dyn Write + Send>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Starts a dispatcher reading records from `input` (the helper's
    /// stdout) and writing requests to `output` (its stdin).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the reader thread cannot be started.
    pub fn new<R, W>(input: R, output: W, options: ClientOptions) -> Result<Self, ClientError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared::new(options));
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("rfs-reader-{}", shared.options.host()))
            .spawn(move || reader::run(input, &thread_shared))
            .map_err(|source| ClientError::Io {
                host: shared.options.host().to_owned(),
                source: Arc::new(source),
            })?;
        Ok(Self {
            shared,
            writer: Mutex::new(Box::new(output)),
            reader: Mutex::new(Some(handle)),
        })
    }

    /// The options this dispatcher runs with.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        self.shared.options()
    }

    /// Sends a request that expects an answer and returns its handle.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::NoResponseExpected`] for id-0 requests,
    /// [`ClientError::EmptyPath`] when a needed path is empty, with
    /// [`ClientError::HungUp`] or [`ClientError::ConnectionClosed`] when the
    /// connection is unusable, and with [`ClientError::Io`] if the write
    /// fails.
    pub fn dispatch(&self, request: Request) -> Result<PendingResponse, ClientError> {
        if !request.needs_response() {
            return Err(ClientError::NoResponseExpected {
                kind: request.kind(),
            });
        }
        reject_empty_path(&request)?;
        let line = request.encode();
        let response = Arc::new(Response::new(request, self.shared.options.host()));
        self.shared.register(&response)?;
        let pending = PendingResponse::new(Arc::clone(&self.shared), response);

        debug!(target: CLIENT_TARGET, request = %pending.request(), "dispatching");
        self.write_line(&line)?;
        Ok(pending)
    }

    /// Sends a request without registering a response.
    ///
    /// One-way requests (id 0) are the normal use; a request with an id is
    /// sent as well, and any records the helper returns for it are logged
    /// and dropped.
    ///
    /// # Errors
    ///
    /// As for [`Dispatcher::dispatch`], minus the one-way check.
    pub fn send(&self, request: &Request) -> Result<(), ClientError> {
        reject_empty_path(request)?;
        self.shared.ensure_usable()?;
        debug!(target: CLIENT_TARGET, %request, "sending one-way request");
        self.write_line(&request.encode())
    }

    /// In-flight requests ordered by id.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.shared.pending()
    }

    /// Registers the listener for change notifications that no request
    /// claims. A later call replaces the earlier listener.
    #[must_use]
    pub fn subscribe_changes(&self) -> Receiver<ChangeNotice> {
        let (sender, receiver) = mpsc::channel();
        *self
            .shared
            .changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sender);
        receiver
    }

    /// Whether the helper's output has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed_reason().is_some()
    }

    /// Waits for the reader thread to finish. It finishes once the helper's
    /// output ends.
    pub fn join_reader(&self) {
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reader_thread) = handle {
            if reader_thread.join().is_err() {
                warn!(target: CLIENT_TARGET, "reader thread panicked");
                self.shared.close("reader thread panicked");
            }
        }
    }

    fn write_line(&self, line: &str) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|source| {
                warn!(
                    target: CLIENT_TARGET,
                    host = self.shared.options.host(),
                    error = %source,
                    "failed to write request"
                );
                ClientError::Io {
                    host: self.shared.options.host().to_owned(),
                    source: Arc::new(source),
                }
            })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("host", &self.shared.options.host())
            .field("pending", &self.shared.pending().len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// The helper ignores path requests with an empty path, so waiting for
/// their answer would only run into the timeout.
fn reject_empty_path(request: &Request) -> Result<(), ClientError> {
    if request.has_empty_path() {
        return Err(ClientError::EmptyPath {
            kind: request.kind(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
