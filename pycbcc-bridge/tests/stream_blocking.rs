use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pycbcc_bridge::memory::{Delivery, ScriptedPendingOperation, ScriptedQuery};
use pycbcc_bridge::{
    CoreError, ErrorKind, NextRow, QueryMetadata, QueryMetrics, QueryRow, QueryStream,
    RowOutcome, RowResult, StreamPhase,
};

fn row(bytes: &[u8]) -> NextRow {
    NextRow::Delivered(RowOutcome::Row(QueryRow::new(bytes)))
}

fn metadata(request_id: &str) -> QueryMetadata {
    QueryMetadata {
        request_id: request_id.to_string(),
        warnings: vec![],
        metrics: QueryMetrics {
            result_count: 2,
            ..QueryMetrics::default()
        },
    }
}

#[test]
fn yields_rows_then_end_then_metadata() {
    let query = Arc::new(
        ScriptedQuery::new([&b"{\"a\":1}"[..], &b"{\"a\":2}"[..]])
            .with_metadata(metadata("req-1")),
    );
    let stream = QueryStream::active(query.clone(), None);

    assert!(stream.metadata().is_none());
    assert_eq!(stream.next(), row(b"{\"a\":1}"));
    assert_eq!(stream.next(), row(b"{\"a\":2}"));
    assert_eq!(stream.next(), NextRow::Delivered(RowOutcome::End));
    assert_eq!(stream.state(), StreamPhase::Exhausted);

    // After the end the engine is not asked again.
    assert_eq!(stream.next(), NextRow::Delivered(RowOutcome::End));
    assert_eq!(query.request_count(), 3);

    let md = stream.metadata().unwrap();
    assert_eq!(md.request_id, "req-1");
    assert_eq!(md.metrics.result_count, 2);
}

#[test]
fn inline_delivery_does_not_deadlock() {
    let query = Arc::new(ScriptedQuery::new([b"x".to_vec()]).with_delivery(Delivery::Inline));
    let stream = QueryStream::active(query, None);
    let rows: Vec<_> = stream.rows().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows, vec![QueryRow::new(b"x".to_vec())]);
}

#[test]
fn engine_error_is_delivered_as_a_value_and_repeated() {
    let query = Arc::new(
        ScriptedQuery::new([b"r1".to_vec()]).with_error(CoreError::engine(23000, "Timeout")),
    );
    let stream = QueryStream::active(query.clone(), None);

    assert_eq!(stream.next(), row(b"r1"));
    let first = match stream.next() {
        NextRow::Delivered(RowOutcome::Error(e)) => e,
        other => panic!("expected an error, got {other:?}"),
    };
    assert_eq!(first.code, 23000);
    assert_eq!(first.message, "Timeout");
    assert_eq!(stream.state(), StreamPhase::Failed);

    assert_eq!(stream.next(), NextRow::Delivered(RowOutcome::Error(first)));
    assert_eq!(query.request_count(), 2);
}

#[test]
fn empty_engine_answer_becomes_an_error() {
    let query = Arc::new(ScriptedQuery::new(Vec::<Vec<u8>>::new()).with_answer(Ok(RowResult::Empty)));
    let stream = QueryStream::active(query, None);
    match stream.next() {
        NextRow::Delivered(RowOutcome::Error(e)) => assert_eq!(e.kind, ErrorKind::InternalSdk),
        other => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn dropped_handler_yields_internal_error() {
    let query = Arc::new(ScriptedQuery::new([b"never".to_vec()]).with_delivery(Delivery::Dropped));
    let stream = QueryStream::active(query, None);
    match stream.next() {
        NextRow::Delivered(RowOutcome::Error(e)) => {
            assert_eq!(e.kind, ErrorKind::InternalSdk);
            assert_eq!(e.message, "Error retrieving next query row.");
        }
        other => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn next_waits_for_pending_operation() {
    let op = Arc::new(ScriptedPendingOperation::default());
    let (stream, resolver) = QueryStream::pending(op, None);
    assert_eq!(stream.state(), StreamPhase::Pending);
    assert!(stream.metadata().is_none());

    let query = Arc::new(ScriptedQuery::new([b"late".to_vec()]));
    let engine = {
        let query = query.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolver.resolve(Ok(query));
        })
    };

    assert_eq!(stream.next(), row(b"late"));
    engine.join().unwrap();
    assert!(stream.wait_for_core_query_result().is_ok());
    assert_eq!(stream.state(), StreamPhase::Active);
}

#[test]
fn failed_operation_surfaces_through_wait_and_next() {
    let op = Arc::new(ScriptedPendingOperation::default());
    let (stream, resolver) = QueryStream::pending(op, None);
    resolver.resolve(Err(CoreError::engine(20001, "Authentication failure")));

    let err = stream.wait_for_core_query_result().unwrap_err();
    assert_eq!(err.code, 20001);
    assert_eq!(stream.next(), NextRow::Delivered(RowOutcome::Error(err)));
}
