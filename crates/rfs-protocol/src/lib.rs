//! Wire codec for the `fs_server` remote file-system protocol.
//!
//! The helper process speaks a newline-delimited text protocol. Requests are
//! single lines of the form `<kind> <id> <len> <path>`; responses are lines
//! of the form `<kind> <id> <payload>`, where the payload is a sequence of
//! space-separated fields. Each field is either a decimal number or a
//! length-prefixed escaped string.
//!
//! This crate owns the pieces of that format that do not depend on a live
//! connection:
//!
//! - [`Buffer`]: a cursor over one response line with pull-based decoding
//! - [`escape`] and [`unescape`]: the string escaping shared by both sides
//! - [`RequestKind`] and [`ResponseKind`]: the wire characters
//! - [`Request`]: id allocation and request line encoding
//! - [`FsEntry`] and [`ServerVersion`]: typed payload decoders
//!
//! # Example
//!
//! ```
//! use rfs_protocol::{Buffer, FsEntry, FileType};
//!
//! let mut line = Buffer::new("f 17 3 foo - 12 1700000000000 rw- 2049 131 0 ");
//! assert_eq!(line.get_char(), Some('f'));
//! assert_eq!(line.get_int(), 17);
//!
//! let entry = FsEntry::decode(line.get_rest()).expect("well-formed entry");
//! assert_eq!(entry.name(), "foo");
//! assert_eq!(entry.file_type(), FileType::Regular);
//! assert_eq!(entry.size(), 12);
//! ```

mod buffer;
mod entry;
mod error;
mod escape;
mod info;
mod kinds;
mod request;

pub use self::buffer::Buffer;
pub use self::entry::{Access, FileType, FsEntry};
pub use self::error::DecodeError;
pub use self::escape::{escape, unescape};
pub use self::info::ServerVersion;
pub use self::kinds::{RequestKind, ResponseKind};
pub use self::request::{Request, RequestId};

/// Tracing target for protocol decoding diagnostics.
pub(crate) const PROTOCOL_TARGET: &str = "rfs_protocol";
