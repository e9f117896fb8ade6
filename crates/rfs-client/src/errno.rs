//! Mapping of helper errno values onto client errors.

use nix::errno::Errno;
use tracing::warn;

use crate::CLIENT_TARGET;
use crate::error::FsError;

/// Converts an errno reported in an `E` record into an [`FsError`].
///
/// `ENOENT` and `EACCES` become [`FsError::NotFound`]: a path the helper
/// cannot read is indistinguishable from a missing one for callers. An errno
/// of 0 is also treated as not-found and logged, since the helper should
/// never report success as an error. Everything else is [`FsError::Io`].
#[must_use]
pub fn errno_error(errno: i32, message: &str, path: &str) -> FsError {
    if errno == 0 {
        warn!(
            target: CLIENT_TARGET,
            path,
            message,
            "helper reported an error with errno 0"
        );
    }
    if errno == 0 || errno == Errno::ENOENT as i32 || errno == Errno::EACCES as i32 {
        FsError::NotFound {
            errno,
            message: message.to_owned(),
            path: path.to_owned(),
        }
    } else {
        FsError::Io {
            errno,
            message: message.to_owned(),
            path: path.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(0)]
    #[case::enoent(Errno::ENOENT as i32)]
    #[case::eacces(Errno::EACCES as i32)]
    fn maps_missing_and_forbidden_to_not_found(#[case] errno: i32) {
        let error = errno_error(errno, "No such file", "/nope");
        assert!(error.is_not_found(), "{error:?}");
        assert_eq!(error.errno(), errno);
    }

    #[rstest]
    #[case::eio(Errno::EIO as i32)]
    #[case::enotdir(Errno::ENOTDIR as i32)]
    #[case::eexist(Errno::EEXIST as i32)]
    #[case::unknown(4242)]
    fn maps_other_errno_to_io(#[case] errno: i32) {
        let error = errno_error(errno, "failure", "/p");
        assert_eq!(
            error,
            FsError::Io {
                errno,
                message: "failure".to_owned(),
                path: "/p".to_owned(),
            }
        );
    }

    #[test]
    fn keeps_message_and_path() {
        let error = errno_error(Errno::ENOENT as i32, "lstat failed", "/a b");
        assert_eq!(error.to_string(), "/a b: not found (lstat failed, errno 2)");
    }
}
