//! A scripted in-process engine.
//!
//! Plays back a fixed list of rows through the [`StreamingQuery`] interface,
//! answering each request from a fresh thread the way the real engine answers
//! from its I/O threads. Used by the tests and handy for exercising the
//! extension without a cluster.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{
    PendingOperation, QueryMetadata, QueryRow, RowHandler, RowResult, StreamingQuery,
};
use crate::error::{CANCELLED_CODE, CoreError};
use crate::logging::{Direction, protocol_trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Answer from a newly spawned thread, optionally after a delay.
    Threaded(Option<Duration>),
    /// Answer on the calling thread before `next_row` returns.
    Inline,
    /// Drop the handler without answering.
    Dropped,
}

pub struct ScriptedQuery {
    script: Mutex<VecDeque<Result<RowResult, CoreError>>>,
    metadata: Option<QueryMetadata>,
    delivery: Delivery,
    cancelled: AtomicBool,
    finished: AtomicBool,
    requests: AtomicUsize,
    cancels: AtomicUsize,
}

impl ScriptedQuery {
    /// Rows in order, followed by the end marker.
    pub fn new<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Vec<u8>>,
    {
        let mut script: VecDeque<_> = rows
            .into_iter()
            .map(|row| Ok(RowResult::Row(QueryRow::new(row))))
            .collect();
        script.push_back(Ok(RowResult::End));
        Self {
            script: Mutex::new(script),
            metadata: None,
            delivery: Delivery::Threaded(None),
            cancelled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    /// End the script with `error` instead of the end marker.
    pub fn with_error(self, error: CoreError) -> Self {
        {
            let mut script = self.script.lock();
            script.pop_back();
            script.push_back(Err(error));
        }
        self
    }

    /// Append a raw engine answer after the scripted rows.
    pub fn with_answer(self, answer: Result<RowResult, CoreError>) -> Self {
        {
            let mut script = self.script.lock();
            let end = script.pop_back();
            script.push_back(answer);
            if let Some(end) = end {
                script.push_back(end);
            }
        }
        self
    }

    /// Metadata reported once the end marker has been delivered.
    pub fn with_metadata(mut self, metadata: QueryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn next_answer(&self) -> Result<RowResult, CoreError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(CoreError::engine(CANCELLED_CODE, "request canceled"));
        }
        // An exhausted script keeps answering with the end marker.
        let answer = self.script.lock().pop_front().unwrap_or(Ok(RowResult::End));
        match &answer {
            Ok(RowResult::Row(row)) => protocol_trace(Direction::Received, row.as_bytes()),
            Ok(RowResult::End) => self.finished.store(true, Ordering::SeqCst),
            _ => {}
        }
        answer
    }
}

impl StreamingQuery for ScriptedQuery {
    fn next_row(&self, handler: RowHandler) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.delivery {
            Delivery::Dropped => drop(handler),
            Delivery::Inline => handler(self.next_answer()),
            Delivery::Threaded(delay) => {
                let answer = self.next_answer();
                let spawned = std::thread::Builder::new()
                    .name("scripted-engine".to_string())
                    .spawn(move || {
                        if let Some(delay) = delay {
                            std::thread::sleep(delay);
                        }
                        handler(answer)
                    });
                if let Err(e) = spawned {
                    tracing::warn!(error = %e, "could not spawn delivery thread; row request dropped");
                }
            }
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn metadata(&self) -> Option<QueryMetadata> {
        if self.finished.load(Ordering::SeqCst) {
            self.metadata.clone()
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct ScriptedPendingOperation {
    cancels: AtomicUsize,
}

impl ScriptedPendingOperation {
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl PendingOperation for ScriptedPendingOperation {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
