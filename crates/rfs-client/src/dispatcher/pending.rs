//! Caller-side handle on an in-flight request.

use std::sync::Arc;
use std::time::Duration;

use rfs_protocol::{Request, RequestId};

use super::Shared;
use crate::error::ClientError;
use crate::response::{Package, Response};

/// Handle returned by [`Dispatcher::dispatch`](super::Dispatcher::dispatch).
///
/// Records are taken with [`PendingResponse::next_package`]. Dropping the
/// handle (or calling [`PendingResponse::dispose`]) removes the request from
/// the dispatcher's table; records that arrive afterwards are logged and
/// dropped. There is no way to cancel the work on the helper's side.
#[derive(Debug)]
pub struct PendingResponse {
    shared: Arc<Shared>,
    response: Arc<Response>,
}

impl PendingResponse {
    pub(super) const fn new(shared: Arc<Shared>, response: Arc<Response>) -> Self {
        Self { shared, response }
    }

    /// The request id.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.response.request().id()
    }

    /// The request this handle waits on.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.response.request()
    }

    /// Takes the next record, waiting at most the configured request timeout.
    ///
    /// # Errors
    ///
    /// See [`PendingResponse::next_package_within`].
    pub fn next_package(&self) -> Result<Package, ClientError> {
        self.next_package_within(self.shared.options().request_timeout())
    }

    /// Takes the next record, waiting at most `timeout`.
    ///
    /// In instrumented mode a timeout also marks the host hung, so later
    /// requests fail fast, and logs every pending request.
    ///
    /// # Errors
    ///
    /// Returns the response's failure (a remote error or a closed
    /// connection) or [`ClientError::Timeout`].
    pub fn next_package_within(&self, timeout: Duration) -> Result<Package, ClientError> {
        let result = self.response.next_package(timeout);
        if let Err(ClientError::Timeout { .. }) = &result {
            let options = self.shared.options();
            if options.instrumented() && options.hangups().mark(options.host()) {
                self.shared.dump_pending();
            }
        }
        result
    }

    /// Releases the request's table entry.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.shared.remove(self.id());
    }
}
