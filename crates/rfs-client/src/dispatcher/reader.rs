//! The reader thread: splits helper output into records and routes them.

use std::io::{BufRead, BufReader, Read};

use rfs_protocol::{Buffer, Request, RequestId, ResponseKind};
use tracing::{debug, trace, warn};

use super::{ChangeNotice, Shared};
use crate::CLIENT_TARGET;
use crate::errno::errno_error;
use crate::error::ClientError;
use crate::response::Package;

/// Reads records until the stream ends, then closes the connection.
pub(super) fn run<R: Read>(input: R, shared: &Shared) {
    let mut reader = BufReader::new(input);
    let mut line = Vec::new();
    let reason = loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break "helper closed its output".to_owned(),
            Ok(_) => route(shared, &String::from_utf8_lossy(&line)),
            Err(error) => {
                warn!(target: CLIENT_TARGET, %error, "failed to read helper output");
                break format!("read failed: {error}");
            }
        }
    };
    shared.close(&reason);
}

/// A record split into kind, id and payload.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct Record<'a> {
    pub(super) kind: ResponseKind,
    pub(super) id: RequestId,
    pub(super) payload: &'a str,
}

/// Splits a line into its record header and payload.
///
/// Returns `None`, after logging, for blank or malformed lines.
pub(super) fn parse_record(line: &str) -> Option<Record<'_>> {
    if line.trim().is_empty() {
        return None;
    }
    let mut buffer = Buffer::new(line);
    let ch = buffer.get_char()?;
    let kind = match ResponseKind::try_from(ch) {
        Ok(kind) => kind,
        Err(error) => {
            warn!(target: CLIENT_TARGET, %error, line, "skipping malformed record");
            return None;
        }
    };
    let Some(id) = buffer
        .try_get_long()
        .and_then(|raw| u32::try_from(raw).ok())
        .map(RequestId::new)
    else {
        warn!(target: CLIENT_TARGET, line, "skipping record without a valid id");
        return None;
    };
    let rest = buffer.get_rest();
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    Some(Record { kind, id, payload })
}

fn route(shared: &Shared, line: &str) {
    let Some(record) = parse_record(line) else {
        return;
    };
    trace!(target: CLIENT_TARGET, kind = %record.kind, id = %record.id, "record");

    let registered = if record.id.is_one_way() {
        None
    } else {
        shared.lookup(record.id)
    };
    let Some(response) = registered else {
        if record.kind == ResponseKind::Change {
            let path = Buffer::new(record.payload).get_string();
            shared.notify_change(ChangeNotice {
                request_id: record.id,
                path,
            });
        } else {
            debug!(
                target: CLIENT_TARGET,
                kind = %record.kind,
                id = %record.id,
                "dropping record for unknown request"
            );
        }
        return;
    };

    if record.kind == ResponseKind::Error {
        let mut buffer = Buffer::new(record.payload);
        let errno = buffer.get_int();
        let rest = buffer.get_rest();
        let message = rest.strip_prefix(' ').unwrap_or(rest);
        response.fail(ClientError::Remote(errno_error(
            errno,
            message,
            reported_path(response.request(), message),
        )));
    } else {
        response.add_package(Package::new(record.kind, record.id, record.payload));
    }
}

/// The path an `E` record is about. Messages end in `: <path>`; copy and
/// move failures may name the destination instead of the source.
fn reported_path<'a>(request: &'a Request, message: &str) -> &'a str {
    request
        .second_path()
        .filter(|second| {
            message
                .strip_suffix(*second)
                .is_some_and(|head| head.ends_with(": "))
        })
        .unwrap_or_else(|| request.path())
}
