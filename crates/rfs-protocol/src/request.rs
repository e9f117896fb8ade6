//! Request construction and encoding.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::escape::escape;
use crate::kinds::RequestKind;

/// The helper parses ids as C `int`s, so allocation wraps before `i32::MAX`.
const MAX_REQUEST_ID: u32 = 0x7fff_ffff;

/// Process-wide id source. Id 0 is reserved for one-way requests.
static REQUEST_ID: AtomicU32 = AtomicU32::new(1);

fn next_request_id() -> RequestId {
    let previous = REQUEST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(if current >= MAX_REQUEST_ID { 1 } else { current + 1 })
        })
        .unwrap_or(1);
    RequestId(previous)
}

/// Correlates a request with its response records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u32);

impl RequestId {
    /// The id of requests that expect no response.
    pub const ONE_WAY: Self = Self(0);

    /// Wraps a raw id, typically one read from a response line.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the one-way id 0.
    #[must_use]
    pub const fn is_one_way(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One request to the helper.
///
/// Requests built with [`Request::new`] receive a fresh id and expect a
/// response; those built with [`Request::one_way`] carry id 0 and are
/// fire-and-forget.
///
/// # Example
///
/// ```
/// use rfs_protocol::{Request, RequestKind};
///
/// let request = Request::one_way(RequestKind::AddWatch, "/tmp/a b");
/// assert!(!request.needs_response());
/// assert_eq!(request.encode(), "W 0 8 /tmp/a b\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    kind: RequestKind,
    path: String,
    second_path: Option<String>,
}

impl Request {
    /// Creates a request with a freshly allocated id.
    #[must_use]
    pub fn new(kind: RequestKind, path: impl Into<String>) -> Self {
        Self {
            id: next_request_id(),
            kind,
            path: path.into(),
            second_path: None,
        }
    }

    /// Creates a copy or move request with a source and destination.
    #[must_use]
    pub fn with_second_path(
        kind: RequestKind,
        path: impl Into<String>,
        second_path: impl Into<String>,
    ) -> Self {
        Self {
            second_path: Some(second_path.into()),
            ..Self::new(kind, path)
        }
    }

    /// Creates a fire-and-forget request with id 0.
    #[must_use]
    pub fn one_way(kind: RequestKind, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::ONE_WAY,
            kind,
            path: path.into(),
            second_path: None,
        }
    }

    /// Asks the helper for its version.
    #[must_use]
    pub fn server_info() -> Self {
        Self::new(RequestKind::ServerInfo, "")
    }

    /// Asks the helper to exit.
    #[must_use]
    pub fn quit() -> Self {
        Self::one_way(RequestKind::Quit, "")
    }

    /// Asks the helper to print its request kinds on stdout.
    #[must_use]
    pub fn help() -> Self {
        Self::one_way(RequestKind::Help, "")
    }

    /// Makes the helper sleep for `seconds`.
    #[must_use]
    pub fn sleep(seconds: u32) -> Self {
        Self::one_way(RequestKind::Sleep, seconds.to_string())
    }

    /// Sets a helper option such as `access=fast`.
    #[must_use]
    pub fn option(name: &str, value: &str) -> Self {
        Self::one_way(RequestKind::Option, format!("{name}={value}"))
    }

    /// The request id; [`RequestId::ONE_WAY`] for fire-and-forget requests.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The operation.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The primary path (or payload for sleep and option requests).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The destination path of a copy or move.
    #[must_use]
    pub fn second_path(&self) -> Option<&str> {
        self.second_path.as_deref()
    }

    /// Whether a path the request needs is empty.
    #[must_use]
    pub fn has_empty_path(&self) -> bool {
        self.kind.takes_path()
            && (self.path.is_empty() || self.second_path.as_deref() == Some(""))
    }

    /// Whether the helper will answer this request.
    #[must_use]
    pub const fn needs_response(&self) -> bool {
        !self.id.is_one_way()
    }

    /// Renders the request as one protocol line, including the newline.
    ///
    /// Path lengths count characters of the escaped path.
    #[must_use]
    pub fn encode(&self) -> String {
        let kind = self.kind.as_char();
        match self.kind {
            RequestKind::Quit | RequestKind::Help => format!("{kind}\n"),
            RequestKind::ServerInfo => format!("{kind} {}\n", self.id),
            _ => {
                let mut line = format!("{kind} {}", self.id);
                push_path(&mut line, &self.path);
                if let Some(second) = &self.second_path {
                    push_path(&mut line, second);
                }
                line.push('\n');
                line
            }
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{} {} {}", self.id, self.kind, self.path)?;
        if let Some(second) = &self.second_path {
            write!(formatter, " -> {second}")?;
        }
        Ok(())
    }
}

fn push_path(line: &mut String, path: &str) {
    let escaped = escape(path);
    line.push(' ');
    line.push_str(&escaped.chars().count().to_string());
    line.push(' ');
    line.push_str(&escaped);
}
