//! Per-request response queues.
//!
//! Every request that expects an answer owns a [`Response`]: a FIFO of
//! [`Package`]s filled by the connection's reader thread and drained by the
//! caller. Each response has its own mutex and condition variable, so a slow
//! consumer never blocks records routed to other requests.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rfs_protocol::{Buffer, Request, RequestId, ResponseKind};
use tracing::debug;

use crate::CLIENT_TARGET;
use crate::error::ClientError;

/// One response record: its kind and the payload after the request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    kind: ResponseKind,
    id: RequestId,
    data: String,
}

impl Package {
    /// Creates a package from a decoded record header and its payload.
    #[must_use]
    pub fn new(kind: ResponseKind, id: RequestId, data: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            data: data.into(),
        }
    }

    /// The record kind.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// The request id the record belongs to.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The raw payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// A decoding cursor over the payload.
    #[must_use]
    pub fn buffer(&self) -> Buffer<'_> {
        Buffer::new(&self.data)
    }
}

#[derive(Debug, Default)]
struct State {
    packages: VecDeque<Package>,
    failure: Option<ClientError>,
}

/// The queue of records for one in-flight request.
#[derive(Debug)]
pub struct Response {
    request: Request,
    host: String,
    state: Mutex<State>,
    ready: Condvar,
}

impl Response {
    /// Creates an empty response for `request` sent to `host`.
    #[must_use]
    pub fn new(request: Request, host: impl Into<String>) -> Self {
        Self {
            request,
            host: host.into(),
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
        }
    }

    /// The request this response answers.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Host the request was sent to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Queues a record and wakes one waiter.
    ///
    /// Records arriving after a failure are dropped: the failure is terminal.
    pub fn add_package(&self, package: Package) {
        let mut state = self.lock();
        if state.failure.is_some() {
            debug!(
                target: CLIENT_TARGET,
                request = %self.request,
                kind = %package.kind(),
                "dropping record that arrived after a failure"
            );
            return;
        }
        state.packages.push_back(package);
        drop(state);
        self.ready.notify_one();
    }

    /// Records a terminal failure and wakes every waiter.
    ///
    /// Only the first failure is kept.
    pub fn fail(&self, error: ClientError) {
        let mut state = self.lock();
        if state.failure.is_none() {
            state.failure = Some(error);
        }
        drop(state);
        self.ready.notify_all();
    }

    /// Whether a failure has been recorded.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.lock().failure.is_some()
    }

    /// Number of records waiting to be taken.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.lock().packages.len()
    }

    /// Takes the next record, blocking for at most `timeout`.
    ///
    /// Queued records come first in arrival order. Once the queue is empty a
    /// recorded failure is returned, to this and every later caller. If
    /// neither shows up in time a [`ClientError::Timeout`] names the request
    /// kind, path and host.
    ///
    /// # Errors
    ///
    /// Returns the recorded failure or a timeout error.
    pub fn next_package(&self, timeout: Duration) -> Result<Package, ClientError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let mut state = self.lock();
        loop {
            if let Some(package) = state.packages.pop_front() {
                return Ok(package);
            }
            if let Some(failure) = &state.failure {
                return Err(failure.clone());
            }
            state = match deadline {
                None => self
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(until) => {
                    let remaining = until.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(self.timeout_error(started.elapsed()));
                    }
                    self.ready
                        .wait_timeout(state, remaining)
                        .map_or_else(|poison| poison.into_inner().0, |(guard, _)| guard)
                }
            };
        }
    }

    fn timeout_error(&self, elapsed: Duration) -> ClientError {
        ClientError::Timeout {
            kind: self.request.kind(),
            path: self.request.path().to_owned(),
            host: self.host.clone(),
            elapsed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
