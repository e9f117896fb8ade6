//! Unit tests for the CLI runtime, against an in-process helper.

use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use rfs_client::{ClientError, ClientOptions, ExitFailure, FsClient, HangupRegistry, ServerExit};
use rfs_config::Config;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[fixture]
fn loader() -> StaticConfigLoader {
    StaticConfigLoader {
        config: Config::default().with_host("test-host"),
    }
}

/// Connects to a helper thread that answers each request line with the
/// lines `answer` returns, `{id}` replaced by the request id.
fn helper(answer: fn(char) -> Vec<&'static str>) -> impl Fn(&Config) -> Result<FsClient, ClientError> {
    move |config: &Config| {
        let (client_input, mut helper_output) = std::io::pipe().expect("response pipe");
        let (helper_input, client_output) = std::io::pipe().expect("request pipe");
        thread::spawn(move || {
            for line in BufReader::new(helper_input).lines() {
                let Ok(request) = line else { break };
                let kind = request.chars().next().unwrap_or('?');
                if kind == 'q' {
                    break;
                }
                let id = request
                    .split(' ')
                    .nth(1)
                    .unwrap_or("0")
                    .to_owned();
                for reply in answer(kind) {
                    if writeln!(helper_output, "{}", reply.replace("{id}", &id)).is_err() {
                        return;
                    }
                }
            }
        });
        let options = ClientOptions::from_config(config)
            .with_hangups(Arc::new(HangupRegistry::default()));
        FsClient::from_streams(client_input, client_output, options)
    }
}

fn answers(kind: char) -> Vec<&'static str> {
    match kind {
        'l' => vec![
            "l {id} 4 /srv",
            "f {id} 3 www d 4096 0 rwx 1 2 0 ",
            "f {id} 9 notes.txt - 12 0 rw- 1 3 0 ",
            "e {id} 4 /srv",
        ],
        'r' => vec![
            "r {id} 2 /a",
            "f {id} 1 b d 0 0 rwx 1 2 0 ",
            "e {id} 2 /a",
            "r {id} 4 /a/b",
            "e {id} 4 /a/b",
            "e {id} 2 /a",
        ],
        'S' => vec!["E {id} 2 No such file or directory: /missing"],
        'i' => vec!["i {id} 1.12.8"],
        _ => Vec::new(),
    }
}

struct Captured {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_cli<C: Connector>(args: &[&str], loader: &StaticConfigLoader, connector: &C) -> Captured {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with(
        args.iter().map(OsString::from),
        &mut stdout,
        &mut stderr,
        loader,
        connector,
    );
    Captured {
        exit,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

#[rstest]
fn lists_a_directory(loader: StaticConfigLoader) {
    let captured = run_cli(&["rfs", "ls", "/srv"], &loader, &helper(answers));
    assert_eq!(captured.exit, ExitCode::SUCCESS, "{}", captured.stderr);
    let names: Vec<&str> = captured
        .stdout
        .lines()
        .filter_map(|line| line.rsplit(' ').next())
        .collect();
    assert_eq!(names, ["www", "notes.txt"]);
}

#[rstest]
fn lists_recursively(loader: StaticConfigLoader) {
    let captured = run_cli(&["rfs", "ls", "--recursive", "/a"], &loader, &helper(answers));
    assert_eq!(captured.exit, ExitCode::SUCCESS, "{}", captured.stderr);
    assert!(captured.stdout.starts_with("/a:\n"));
    assert!(captured.stdout.contains("\n\n/a/b:\n"));
}

#[rstest]
fn prints_server_version(loader: StaticConfigLoader) {
    let captured = run_cli(
        &["rfs", "--host", "ignored", "info"],
        &loader,
        &helper(answers),
    );
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert_eq!(captured.stdout, "fs_server 1.12.8\n");
}

#[rstest]
fn reports_remote_errors(loader: StaticConfigLoader) {
    let captured = run_cli(&["rfs", "stat", "/missing"], &loader, &helper(answers));
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stdout.is_empty());
    assert!(captured.stderr.contains("/missing: not found"), "{}", captured.stderr);
}

#[rstest]
fn reports_spawn_failures(loader: StaticConfigLoader) {
    let failing = |_: &Config| -> Result<FsClient, ClientError> {
        Err(ClientError::Spawn {
            command: "fs_server -t 4".to_owned(),
            source: Arc::new(std::io::Error::from(std::io::ErrorKind::NotFound)),
        })
    };
    let captured = run_cli(&["rfs", "info"], &loader, &failing);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.contains("failed to start fs_server -t 4"));
}

#[rstest]
fn help_goes_to_stdout(loader: StaticConfigLoader) {
    let captured = run_cli(&["rfs", "--help"], &loader, &helper(answers));
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert!(captured.stdout.contains("Usage"));
    assert!(captured.stderr.is_empty());
}

#[rstest]
fn usage_errors_exit_with_two(loader: StaticConfigLoader) {
    let captured = run_cli(&["rfs", "mv", "/only-one"], &loader, &helper(answers));
    assert_eq!(captured.exit, ExitCode::from(2));
    assert!(captured.stderr.contains("Usage"));
}

#[rstest]
fn helper_start_up_failures_keep_their_exit_code() {
    let failure = ExitFailure::from_code(207).expect("named failure");
    let error = AppError::Client(ClientError::ServerExited(ServerExit::Failure(failure)));
    assert_eq!(exit_code_for(&error), ExitCode::from(207));
}

/// Writes an executable helper script that runs `body`.
fn helper_script(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("fs_server");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write helper script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("mark script executable");
    path.to_str().expect("utf-8 temp path").to_owned()
}

#[rstest]
#[case::lock_file(213)]
#[case::wrong_argument(215)]
fn helper_dying_at_start_up_reports_its_exit_code(#[case] code: u8) {
    let dir = TempDir::new().expect("temp dir");
    let script = helper_script(&dir, &format!("exit {code}"));
    let loader = StaticConfigLoader {
        config: Config::default()
            .with_host("test-host")
            .with_server_path(script)
            .with_request_timeout(5_000),
    };
    let captured = run_cli(&["rfs", "info"], &loader, &SpawnConnector);
    assert_eq!(captured.exit, ExitCode::from(code), "{}", captured.stderr);
    assert!(captured.stdout.is_empty());
    assert!(captured.stderr.contains("fs_server exited"), "{}", captured.stderr);
}

#[rstest]
fn signals_map_to_plain_failure() {
    let error = AppError::Client(ClientError::ServerExited(ServerExit::Signal(9)));
    assert_eq!(exit_code_for(&error), ExitCode::FAILURE);
}
