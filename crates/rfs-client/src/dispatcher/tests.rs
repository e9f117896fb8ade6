//! Unit tests for request dispatch and record routing.

use std::sync::Arc;
use std::time::Duration;

use rfs_protocol::{Request, RequestKind, ResponseKind};
use rstest::rstest;

use super::*;
use crate::HangupRegistry;
use crate::error::FsError;
use crate::tests::support::{manual, request_id, test_options};

const WAIT: Duration = Duration::from_secs(5);

#[rstest]
fn routes_records_to_their_requests_in_order() {
    let (dispatcher, mut helper) = manual(test_options("routing"));
    let first = dispatcher
        .dispatch(Request::new(RequestKind::Ls, "/a"))
        .expect("dispatch first");
    let second = dispatcher
        .dispatch(Request::new(RequestKind::Stat, "/b"))
        .expect("dispatch second");
    helper.next_request();
    helper.next_request();

    let (a, b) = (first.id(), second.id());
    helper.reply(&format!("l {a} 2 /a"));
    helper.reply(&format!("f {b} 1 b - 0 0 rw- 0 0 0 "));
    helper.reply(&format!("f {a} 1 x - 0 0 rw- 0 0 0 "));
    helper.reply(&format!("e {a} 2 /a"));

    let kinds: Vec<ResponseKind> = (0..3)
        .map(|_| first.next_package_within(WAIT).expect("record for /a").kind())
        .collect();
    assert_eq!(
        kinds,
        [ResponseKind::Ls, ResponseKind::Entry, ResponseKind::End]
    );
    let entry = second.next_package_within(WAIT).expect("record for /b");
    assert_eq!(entry.buffer().get_string(), "b");
}

#[rstest]
fn writes_encoded_request_line() {
    let (dispatcher, helper) = manual(test_options("encoding"));
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Lstat, "/with space"))
        .expect("dispatch");
    let line = helper.next_request();
    assert_eq!(line, format!("s {} 11 /with space", pending.id()));
    assert_eq!(request_id(&line), pending.id().get());
}

#[rstest]
fn rejects_one_way_requests_in_dispatch() {
    let (dispatcher, helper) = manual(test_options("one-way"));
    let result = dispatcher.dispatch(Request::one_way(RequestKind::AddWatch, "/w"));
    assert!(matches!(
        result,
        Err(ClientError::NoResponseExpected {
            kind: RequestKind::AddWatch
        })
    ));
    assert!(helper.is_silent_for(Duration::from_millis(50)));
    assert!(dispatcher.pending().is_empty());
}

#[rstest]
fn sends_one_way_requests_without_registering() {
    let (dispatcher, helper) = manual(test_options("send"));
    dispatcher
        .send(&Request::one_way(RequestKind::DeleteOnDisconnect, "/tmp/x"))
        .expect("send");
    assert_eq!(helper.next_request(), "D 0 6 /tmp/x");
    assert!(dispatcher.pending().is_empty());
}

#[rstest]
fn error_record_fails_the_request() {
    let (dispatcher, mut helper) = manual(test_options("errors"));
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Stat, "/missing"))
        .expect("dispatch");
    helper.next_request();
    helper.reply(&format!("E {} 2 No such file or directory: /missing", pending.id()));

    let error = pending.next_package_within(WAIT).expect_err("remote error");
    match error {
        ClientError::Remote(FsError::NotFound {
            errno,
            message,
            path,
        }) => {
            assert_eq!(errno, 2);
            assert_eq!(message, "No such file or directory: /missing");
            assert_eq!(path, "/missing");
        }
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[rstest]
fn disposing_removes_the_table_entry() {
    let (dispatcher, _helper) = manual(test_options("dispose"));
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Ls, "/d"))
        .expect("dispatch");
    let listed = dispatcher.pending();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().map(|request| request.kind), Some(RequestKind::Ls));
    pending.dispose();
    assert!(dispatcher.pending().is_empty());
}

#[rstest]
fn end_of_stream_fails_pending_and_later_requests() {
    let (dispatcher, mut helper) = manual(test_options("eof"));
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::RecursiveLs, "/r"))
        .expect("dispatch");
    helper.next_request();
    helper.hang_up();

    let error = pending.next_package_within(WAIT).expect_err("closed");
    assert!(matches!(error, ClientError::ConnectionClosed { .. }));
    dispatcher.join_reader();
    assert!(dispatcher.is_closed());
    assert!(matches!(
        dispatcher.dispatch(Request::new(RequestKind::Ls, "/")),
        Err(ClientError::ConnectionClosed { .. })
    ));
    assert!(matches!(
        dispatcher.send(&Request::quit()),
        Err(ClientError::ConnectionClosed { .. })
    ));
}

#[rstest]
fn unclaimed_changes_reach_the_listener() {
    let (dispatcher, mut helper) = manual(test_options("changes"));
    let changes = dispatcher.subscribe_changes();
    helper.reply("c 0 8 /watched");
    helper.reply("c 999 6 /other");
    let first = changes.recv_timeout(WAIT).expect("background change");
    assert_eq!(
        first,
        ChangeNotice {
            request_id: RequestId::ONE_WAY,
            path: "/watched".to_owned(),
        }
    );
    let second = changes.recv_timeout(WAIT).expect("orphan change");
    assert_eq!(second.path, "/other");
}

#[rstest]
fn records_for_unknown_ids_are_dropped() {
    let (dispatcher, mut helper) = manual(test_options("unknown"));
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Stat, "/s"))
        .expect("dispatch");
    helper.next_request();
    helper.reply("f 4000000 1 z - 0 0 rw- 0 0 0 ");
    helper.reply("garbage line");
    helper.reply(&format!("f {} 1 s - 0 0 rw- 0 0 0 ", pending.id()));
    let package = pending.next_package_within(WAIT).expect("own record");
    assert_eq!(package.buffer().get_string(), "s");
}

#[rstest]
fn instrumented_timeout_marks_host_hung() {
    let hangups = Arc::new(HangupRegistry::default());
    let options = test_options("slow-host")
        .with_instrumented(true)
        .with_hangups(Arc::clone(&hangups));
    let (dispatcher, _helper) = manual(options);
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Ls, "/slow"))
        .expect("dispatch");

    let error = pending
        .next_package_within(Duration::from_millis(1))
        .expect_err("timeout");
    assert!(matches!(error, ClientError::Timeout { .. }));
    assert!(hangups.is_hung("slow-host"));
    assert!(matches!(
        dispatcher.dispatch(Request::new(RequestKind::Ls, "/again")),
        Err(ClientError::HungUp { host }) if host == "slow-host"
    ));

    hangups.clear("slow-host");
    assert!(dispatcher.dispatch(Request::new(RequestKind::Ls, "/again")).is_ok());
}

#[rstest]
fn plain_timeout_leaves_host_usable() {
    let hangups = Arc::new(HangupRegistry::default());
    let options = test_options("plain-host").with_hangups(Arc::clone(&hangups));
    let (dispatcher, _helper) = manual(options);
    let pending = dispatcher
        .dispatch(Request::new(RequestKind::Ls, "/slow"))
        .expect("dispatch");
    assert!(pending.next_package_within(Duration::from_millis(1)).is_err());
    assert!(!hangups.is_hung("plain-host"));
}
