use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pycbcc_bridge::memory::{Delivery, ScriptedPendingOperation, ScriptedQuery};
use pycbcc_bridge::{ErrorKind, NextRow, QueryStream, RowOutcome, StreamPhase};

#[test]
fn cancel_while_pending_targets_the_pending_operation() {
    let op = Arc::new(ScriptedPendingOperation::default());
    let (stream, _resolver) = QueryStream::pending(op.clone(), None);

    stream.cancel();
    assert_eq!(op.cancel_count(), 1);
    assert_eq!(stream.state(), StreamPhase::Cancelled);

    let err = stream.wait_for_core_query_result().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

#[test]
fn cancel_twice_is_a_no_op() {
    let query = Arc::new(ScriptedQuery::new([b"a".to_vec()]));
    let stream = QueryStream::active(query.clone(), None);

    stream.cancel();
    stream.cancel();
    assert_eq!(query.cancel_count(), 1);
    assert_eq!(stream.state(), StreamPhase::Cancelled);
}

#[test]
fn cancel_after_exhaustion_is_ignored() {
    let query = Arc::new(ScriptedQuery::new(Vec::<Vec<u8>>::new()));
    let stream = QueryStream::active(query.clone(), None);
    assert_eq!(stream.next(), NextRow::Delivered(RowOutcome::End));

    stream.cancel();
    assert_eq!(query.cancel_count(), 0);
    assert_eq!(stream.state(), StreamPhase::Exhausted);
}

#[test]
fn next_after_cancel_does_not_reach_the_engine() {
    let query = Arc::new(ScriptedQuery::new([b"a".to_vec()]));
    let stream = QueryStream::active(query.clone(), None);
    stream.cancel();

    match stream.next() {
        NextRow::Delivered(RowOutcome::Error(e)) => assert_eq!(e.kind, ErrorKind::Cancelled),
        other => panic!("expected a cancellation error, got {other:?}"),
    }
    assert_eq!(query.request_count(), 0);
}

#[test]
fn request_in_flight_during_cancel_still_completes() {
    let query = Arc::new(
        ScriptedQuery::new([b"a".to_vec()])
            .with_delivery(Delivery::Threaded(Some(Duration::from_millis(50)))),
    );
    let stream = Arc::new(QueryStream::active(query.clone(), None));

    let reader = {
        let stream = stream.clone();
        thread::spawn(move || stream.next())
    };
    while query.request_count() == 0 {
        thread::yield_now();
    }
    stream.cancel();

    // The answer was already on its way; it arrives even though the stream
    // is now cancelled.
    match reader.join().unwrap() {
        NextRow::Delivered(_) => {}
        NextRow::Polling => panic!("blocking stream returned Polling"),
    }
    assert_eq!(stream.state(), StreamPhase::Cancelled);
    assert_eq!(query.cancel_count(), 1);
}
