//! Errors raised while decoding protocol payloads.

use thiserror::Error;

/// Errors produced when a protocol line or payload cannot be decoded.
///
/// [`Buffer`](crate::Buffer) itself never fails; these errors come from the
/// typed decoders layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The line carried no content at all.
    #[error("empty protocol line")]
    Empty,

    /// The leading character is not a known request kind.
    #[error("unknown request kind '{0}'")]
    UnknownRequestKind(char),

    /// The leading character is not a known response kind.
    #[error("unknown response kind '{0}'")]
    UnknownResponseKind(char),

    /// The line ended before a required field was read.
    #[error("line ended before the {field} field")]
    Truncated {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A numeric field held no digits or an out-of-range value.
    #[error("invalid numeric value for the {field} field")]
    InvalidNumber {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The access triple held something other than `r`, `w`, `x` or `-`.
    #[error("invalid access flags '{flags}'")]
    InvalidAccess {
        /// The raw access field.
        flags: String,
    },

    /// The server version was not of the form `major.mid.minor`.
    #[error("malformed server version '{text}'")]
    InvalidVersion {
        /// The raw version text.
        text: String,
    },
}
