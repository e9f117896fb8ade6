//! Stand-ins for the `fs_server` helper.
//!
//! [`manual`] and [`scripted`] talk to the client over `std::io::pipe` pairs,
//! so tests run the real reader thread and request encoding without spawning
//! a process. [`fake_server`] writes a shell script for the tests that do
//! need a child process.

use std::fs;
use std::io::{BufRead, BufReader, PipeReader, PipeWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::process::{ChildStdin, ChildStdout};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rfs_config::Config;
use rfs_protocol::Buffer;
use tempfile::TempDir;

use crate::{ClientOptions, Dispatcher, HangupRegistry, ServerCommand, ServerProcess};

/// How long a test waits for the client to write a request.
const REQUEST_WAIT: Duration = Duration::from_secs(5);

/// Options with a private hang-up registry so tests do not interfere.
pub(crate) fn test_options(host: &str) -> ClientOptions {
    ClientOptions::new(host)
        .with_request_timeout(Duration::from_secs(5))
        .with_hangups(Arc::new(HangupRegistry::default()))
}

/// Extracts the id from an encoded request line.
pub(crate) fn request_id(line: &str) -> u32 {
    let mut buffer = Buffer::new(line);
    buffer.get_char();
    u32::try_from(buffer.get_long()).expect("request id should be non-negative")
}

/// Reads request lines from `input` and forwards them to a channel.
fn forward_requests(input: PipeReader) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(input).lines() {
            let Ok(text) = line else { break };
            if sender.send(text).is_err() {
                break;
            }
        }
    });
    receiver
}

/// A helper whose replies are written by the test itself.
pub(crate) struct ManualHelper {
    requests: Receiver<String>,
    output: Option<PipeWriter>,
}

impl ManualHelper {
    /// Waits for the next request line written by the client.
    pub(crate) fn next_request(&self) -> String {
        self.requests
            .recv_timeout(REQUEST_WAIT)
            .expect("client should have written a request")
    }

    /// Whether the client wrote nothing within `wait`.
    pub(crate) fn is_silent_for(&self, wait: Duration) -> bool {
        self.requests.recv_timeout(wait).is_err()
    }

    /// Writes one record; a trailing newline is added when missing.
    pub(crate) fn reply(&mut self, line: &str) {
        let output = self.output.as_mut().expect("helper output already closed");
        output
            .write_all(line.as_bytes())
            .expect("write record to client");
        if !line.ends_with('\n') {
            output.write_all(b"\n").expect("terminate record");
        }
        output.flush().expect("flush record");
    }

    /// Closes the helper's output so the client sees end of stream.
    pub(crate) fn hang_up(&mut self) {
        self.output.take();
    }
}

/// Connects a dispatcher to a [`ManualHelper`].
pub(crate) fn manual(options: ClientOptions) -> (Dispatcher, ManualHelper) {
    let (client_input, helper_output) = std::io::pipe().expect("create response pipe");
    let (helper_input, client_output) = std::io::pipe().expect("create request pipe");
    let dispatcher =
        Dispatcher::new(client_input, client_output, options).expect("start dispatcher");
    let helper = ManualHelper {
        requests: forward_requests(helper_input),
        output: Some(helper_output),
    };
    (dispatcher, helper)
}

/// Streams handed to the client under test plus the helper thread, which
/// returns every request line it saw once the client closes its output.
pub(crate) struct ScriptedHelper {
    pub(crate) client_input: PipeReader,
    pub(crate) client_output: PipeWriter,
    pub(crate) thread: JoinHandle<Vec<String>>,
}

/// Starts a helper that answers each request with the lines returned by
/// `script`. Returning `None` closes the helper's output.
pub(crate) fn scripted<F>(mut script: F) -> ScriptedHelper
where
    F: FnMut(&str) -> Option<Vec<String>> + Send + 'static,
{
    let (client_input, mut helper_output) = std::io::pipe().expect("create response pipe");
    let (helper_input, client_output) = std::io::pipe().expect("create request pipe");
    let thread = thread::spawn(move || {
        let mut seen = Vec::new();
        for line in BufReader::new(helper_input).lines() {
            let Ok(request) = line else { break };
            let replies = script(&request);
            seen.push(request);
            let Some(lines) = replies else { break };
            for reply in lines {
                if writeln!(helper_output, "{reply}").is_err() {
                    return seen;
                }
            }
        }
        seen
    });
    ScriptedHelper {
        client_input,
        client_output,
        thread,
    }
}

/// Answers `i`, `l` and `S` requests the way the helper would, for paths
/// without spaces.
pub(crate) const PROTOCOL_SCRIPT: &str = r#"while IFS= read -r line; do
  set -- $line
  case "$1" in
    q) exit 0 ;;
    i) echo "i $2 1.2.3" ;;
    l) echo "l $2 $3 $4"
       echo "f $2 5 a.txt - 12 1000 rw- 1 10 0 "
       echo "f $2 3 sub d 4096 1000 rwx 1 11 0 "
       echo "e $2 $3 $4" ;;
    S) echo "E $2 2 No such file or directory: $4" ;;
  esac
done
"#;

/// Serialises script creation and process spawning.
///
/// A child forked while another thread still holds a freshly written
/// script open for writing would make `exec` fail with `ETXTBSY`.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Runs `action` while holding the spawn lock.
pub(crate) fn serialised<T>(action: impl FnOnce() -> T) -> T {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    action()
}

/// An executable shell script standing in for the helper binary.
pub(crate) struct FakeServer {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl FakeServer {
    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Configuration pointing at this script.
    pub(crate) fn config(&self) -> Config {
        Config::default()
            .with_server_path(self.path())
            .with_request_timeout(5_000)
    }

    /// Spawns the script as a helper process.
    pub(crate) fn spawn(&self) -> (ServerProcess, ChildStdout, ChildStdin) {
        serialised(|| ServerProcess::spawn_command(&ServerCommand::new(self.path())))
            .expect("spawn fake server")
    }
}

/// Writes `body` into an executable `/bin/sh` script.
pub(crate) fn fake_server(body: &str) -> FakeServer {
    serialised(|| {
        let dir = TempDir::new().expect("create script directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("fs_server"))
            .expect("temporary paths should be UTF-8");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("mark executable");
        FakeServer { _dir: dir, path }
    })
}
