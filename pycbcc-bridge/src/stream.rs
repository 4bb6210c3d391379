//! Pull-based iterator over a query row stream the engine pushes from its own
//! threads.
//!
//! A [`QueryStream`] runs in one of two modes, fixed at construction:
//!
//! - **Blocking** (no callback): [`QueryStream::next`] issues one row request,
//!   then parks the calling thread on a fresh one-shot channel until the engine
//!   answers. The answer is returned as [`NextRow::Delivered`].
//! - **Callback**: [`QueryStream::next`] issues the request and returns
//!   [`NextRow::Polling`] straight away. The engine thread later hands the
//!   answer to the stored [`RowCallback`], exactly once per request; a handler
//!   the engine drops unanswered still reaches the callback as an error. A
//!   request made before the pending operation resolves is held and sent on
//!   resolution (or answered with the failure or cancellation instead).
//!
//! Either way the answer is a [`RowOutcome`]: a row, the end marker, or an
//! error. Stream errors are values, never panics or early returns, because they
//! originate on another thread.
//!
//! # Outstanding requests
//!
//! Only one row request may be outstanding at a time. This is the caller's
//! responsibility; a second `next()` before the first is answered is logged but
//! not queued, and which answer lands where is undefined.
//!
//! # Cancellation
//!
//! [`QueryStream::cancel`] forwards to the pending operation or the active
//! result, whichever exists, and does not wait for the engine. A request already
//! in flight may still come back with a row, an error or the end marker. Calling
//! `cancel` on a finished or already cancelled stream does nothing.
//!
//! # After the end
//!
//! Once a stream is Exhausted, Failed or Cancelled, `next()` no longer calls the
//! engine: Exhausted answers `End` again, Failed repeats its error, Cancelled
//! answers a cancellation error.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::engine::{QueryMetadata, QueryRow, RowResult, SharedPending, SharedQuery};
use crate::error::CoreError;

/// One answer to a row request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Row(QueryRow),
    End,
    Error(CoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRow {
    Delivered(RowOutcome),
    /// Callback mode: the answer goes to the callback. Keep polling.
    Polling,
}

/// Raised by a row callback. The callback contract forbids this; when it
/// happens anyway it is logged as an internal error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

pub type RowCallback = Arc<dyn Fn(RowOutcome) -> Result<(), CallbackError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Pending,
    Active,
    Cancelled,
    Exhausted,
    Failed,
}

/// Terminal states keep the result handle (when there was one) so metadata can
/// still be read after the stream ends.
enum StreamState {
    Pending(SharedPending),
    Active(SharedQuery),
    Cancelled(Option<SharedQuery>),
    Exhausted(SharedQuery),
    Failed {
        handle: Option<SharedQuery>,
        error: CoreError,
    },
}

impl StreamState {
    fn phase(&self) -> StreamPhase {
        match self {
            StreamState::Pending(_) => StreamPhase::Pending,
            StreamState::Active(_) => StreamPhase::Active,
            StreamState::Cancelled(_) => StreamPhase::Cancelled,
            StreamState::Exhausted(_) => StreamPhase::Exhausted,
            StreamState::Failed { .. } => StreamPhase::Failed,
        }
    }

    fn handle(&self) -> Option<&SharedQuery> {
        match self {
            StreamState::Pending(_) => None,
            StreamState::Active(handle) | StreamState::Exhausted(handle) => Some(handle),
            StreamState::Cancelled(handle) => handle.as_ref(),
            StreamState::Failed { handle, .. } => handle.as_ref(),
        }
    }
}

struct Shared {
    state: Mutex<StreamState>,
    resolved: Condvar,
    in_flight: AtomicBool,
    /// A callback-mode request made while Pending; only touched under `state`.
    deferred: AtomicBool,
    callback: Option<RowCallback>,
}

/// What a deferred request turns into once the operation resolves.
enum Deferred {
    Fetch(SharedQuery),
    Answer(RowOutcome),
}

impl Shared {
    fn new(state: StreamState, callback: Option<RowCallback>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            resolved: Condvar::new(),
            in_flight: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
            callback,
        })
    }

    fn resolve(self: &Arc<Self>, result: Result<SharedQuery, CoreError>) {
        let mut state = self.state.lock();
        let mut late = None;
        let prior = state.phase();
        match (prior, result) {
            (StreamPhase::Pending, Ok(handle)) => {
                *state = StreamState::Active(handle);
            }
            (StreamPhase::Pending, Err(error)) => {
                *state = StreamState::Failed {
                    handle: None,
                    error,
                };
            }
            (StreamPhase::Cancelled, Ok(handle)) if state.handle().is_none() => {
                // Cancelled while pending; the engine produced a result anyway.
                *state = StreamState::Cancelled(Some(handle.clone()));
                late = Some(handle);
            }
            _ => {}
        }
        let deferred = if self.deferred.swap(false, Ordering::AcqRel) {
            Some(match fetch_target(&state) {
                Ok(handle) => Deferred::Fetch(handle),
                Err(outcome) => Deferred::Answer(outcome),
            })
        } else {
            None
        };
        let phase = state.phase();
        self.resolved.notify_all();
        drop(state);

        // Logging may call back into the host, so never under the lock.
        tracing::debug!(?prior, ?phase, "query operation resolved");
        if let Some(handle) = late {
            handle.cancel();
        }
        if let (Some(deferred), Some(callback)) = (deferred, &self.callback) {
            match deferred {
                Deferred::Fetch(handle) => self.fetch_with_callback(&handle, callback.clone()),
                Deferred::Answer(outcome) => {
                    self.in_flight.store(false, Ordering::Release);
                    invoke_callback(callback, outcome);
                }
            }
        }
    }

    /// Turn the engine's answer into a [`RowOutcome`] and advance the state.
    ///
    /// The error slot wins over the variant; an `Empty` variant is reported as
    /// an error rather than dropped.
    fn settle(&self, result: Result<RowResult, CoreError>) -> RowOutcome {
        self.in_flight.store(false, Ordering::Release);
        let outcome = match result {
            Err(error) => RowOutcome::Error(error),
            Ok(RowResult::Row(row)) => RowOutcome::Row(row),
            Ok(RowResult::End) => RowOutcome::End,
            Ok(RowResult::Empty) => RowOutcome::Error(CoreError::internal_sdk(
                "Engine delivered neither a row nor the end of the stream.",
            )),
        };

        let mut state = self.state.lock();
        let active = match &*state {
            StreamState::Active(handle) => Some(handle.clone()),
            _ => None,
        };
        let next = active.and_then(|handle| match &outcome {
            RowOutcome::Row(_) => None,
            RowOutcome::End => Some(StreamState::Exhausted(handle)),
            RowOutcome::Error(error) => Some(StreamState::Failed {
                handle: Some(handle),
                error: error.clone(),
            }),
        });
        let Some(next) = next else {
            return outcome;
        };
        *state = next;
        let phase = state.phase();
        drop(state);

        tracing::debug!(?phase, "query stream finished");
        outcome
    }

    /// The engine dropped a row handler without answering. The stream state is
    /// left alone; only this request fails.
    fn abandon(&self) -> RowOutcome {
        self.in_flight.store(false, Ordering::Release);
        RowOutcome::Error(CoreError::internal_sdk("Error retrieving next query row."))
    }

    fn mark_in_flight(&self) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::warn!("next() called while a previous row request is still outstanding");
        }
    }

    fn fetch_with_callback(self: &Arc<Self>, handle: &SharedQuery, callback: RowCallback) {
        let delivery = CallbackDelivery {
            shared: self.clone(),
            callback,
            answered: false,
        };
        handle.next_row(Box::new(move |result| delivery.answer(result)));
    }
}

/// Carries one callback-mode request to the engine. If the engine drops the
/// handler unanswered, the callback still runs once, with an error.
struct CallbackDelivery {
    shared: Arc<Shared>,
    callback: RowCallback,
    answered: bool,
}

impl CallbackDelivery {
    fn answer(mut self, result: Result<RowResult, CoreError>) {
        self.answered = true;
        let outcome = self.shared.settle(result);
        invoke_callback(&self.callback, outcome);
    }
}

impl Drop for CallbackDelivery {
    fn drop(&mut self) {
        if !self.answered {
            let outcome = self.shared.abandon();
            invoke_callback(&self.callback, outcome);
        }
    }
}

/// The handle to fetch from, or the answer a non-streaming state gives
/// without asking the engine.
fn fetch_target(state: &StreamState) -> Result<SharedQuery, RowOutcome> {
    match state {
        StreamState::Active(handle) => Ok(handle.clone()),
        StreamState::Exhausted(_) => Err(RowOutcome::End),
        StreamState::Failed { error, .. } => Err(RowOutcome::Error(error.clone())),
        StreamState::Cancelled(_) => Err(RowOutcome::Error(CoreError::cancelled())),
        StreamState::Pending(_) => Err(RowOutcome::Error(CoreError::internal_sdk(
            "Query result is not available yet.",
        ))),
    }
}

/// Hands the engine's eventual result for a pending operation to its stream.
///
/// Dropping a resolver without calling [`resolve`](Self::resolve) fails the
/// stream, so nothing waits forever on an operation the engine abandoned.
pub struct QueryResolver {
    shared: Option<Arc<Shared>>,
}

impl QueryResolver {
    pub fn resolve(mut self, result: Result<SharedQuery, CoreError>) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(result);
        }
    }
}

impl Drop for QueryResolver {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(Err(CoreError::internal_sdk(
                "Query operation was dropped before producing a result.",
            )));
        }
    }
}

enum CancelTarget {
    Pending(SharedPending),
    Query(SharedQuery),
}

/// One query's row stream. See the module docs for the protocol.
pub struct QueryStream {
    shared: Arc<Shared>,
}

impl fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("phase", &self.state())
            .field("callback", &self.is_callback_mode())
            .finish()
    }
}

impl QueryStream {
    /// Wrap an operation the engine has not turned into a result yet.
    pub fn pending(op: SharedPending, callback: Option<RowCallback>) -> (Self, QueryResolver) {
        let shared = Shared::new(StreamState::Pending(op), callback);
        let resolver = QueryResolver {
            shared: Some(shared.clone()),
        };
        (Self { shared }, resolver)
    }

    /// Wrap a result that is already streaming.
    pub fn active(handle: SharedQuery, callback: Option<RowCallback>) -> Self {
        Self {
            shared: Shared::new(StreamState::Active(handle), callback),
        }
    }

    pub fn state(&self) -> StreamPhase {
        self.shared.state.lock().phase()
    }

    pub fn is_callback_mode(&self) -> bool {
        self.shared.callback.is_some()
    }

    /// Block until the pending operation has produced a result (or failed, or
    /// was cancelled). Returns at once if that already happened; may be called
    /// any number of times.
    pub fn wait_for_core_query_result(&self) -> Result<(), CoreError> {
        let mut state = self.shared.state.lock();
        while matches!(*state, StreamState::Pending(_)) {
            self.shared.resolved.wait(&mut state);
        }
        match &*state {
            StreamState::Failed {
                handle: None,
                error,
            } => Err(error.clone()),
            StreamState::Cancelled(None) => Err(CoreError::cancelled()),
            _ => Ok(()),
        }
    }

    /// Request the next row.
    ///
    /// In blocking mode a stream that is still pending is waited on first. In
    /// callback mode the request is remembered instead and sent once the
    /// operation resolves; `next()` itself never waits.
    pub fn next(&self) -> NextRow {
        match &self.shared.callback {
            None => NextRow::Delivered(self.next_blocking()),
            Some(callback) => {
                self.request_with_callback(callback);
                NextRow::Polling
            }
        }
    }

    /// Cancel the pending operation or the active result. No-op once terminal.
    ///
    /// A callback-mode request still waiting on the pending operation is
    /// answered with a cancellation error.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        let target = match &*state {
            StreamState::Pending(op) => CancelTarget::Pending(op.clone()),
            StreamState::Active(handle) => CancelTarget::Query(handle.clone()),
            other => {
                let phase = other.phase();
                drop(state);
                tracing::debug!(?phase, "cancel on a finished stream ignored");
                return;
            }
        };
        *state = match &target {
            CancelTarget::Pending(_) => StreamState::Cancelled(None),
            CancelTarget::Query(handle) => StreamState::Cancelled(Some(handle.clone())),
        };
        let deferred = self.shared.deferred.swap(false, Ordering::AcqRel);
        self.shared.resolved.notify_all();
        drop(state);

        match target {
            CancelTarget::Pending(op) => op.cancel(),
            CancelTarget::Query(handle) => handle.cancel(),
        }
        if let (true, Some(callback)) = (deferred, &self.shared.callback) {
            self.shared.in_flight.store(false, Ordering::Release);
            invoke_callback(callback, RowOutcome::Error(CoreError::cancelled()));
        }
    }

    /// Engine metadata for the query, once a result handle exists and the
    /// engine has it. `None` while still pending.
    pub fn metadata(&self) -> Option<QueryMetadata> {
        let handle = self.shared.state.lock().handle().cloned()?;
        handle.metadata()
    }

    /// Blocking-mode convenience: rows until the end marker, then any error
    /// once. Yields nothing in callback mode and sends no request.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            stream: self,
            done: false,
        }
    }

    fn next_blocking(&self) -> RowOutcome {
        if self.state() == StreamPhase::Pending {
            // The outcome is read back from the state below.
            let _ = self.wait_for_core_query_result();
        }
        let handle = match fetch_target(&self.shared.state.lock()) {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };
        self.shared.mark_in_flight();

        let (tx, rx) = mpsc::sync_channel(1);
        let shared = self.shared.clone();
        handle.next_row(Box::new(move |result| {
            let outcome = shared.settle(result);
            let _ = tx.send(outcome);
        }));
        rx.recv().unwrap_or_else(|_| self.shared.abandon())
    }

    fn request_with_callback(&self, callback: &RowCallback) {
        let target = {
            let state = self.shared.state.lock();
            if matches!(*state, StreamState::Pending(_)) {
                self.shared.deferred.store(true, Ordering::Release);
                None
            } else {
                Some(fetch_target(&state))
            }
        };
        match target {
            None => {
                self.shared.mark_in_flight();
                tracing::debug!("row requested before the query started; sent on resolution");
            }
            Some(Ok(handle)) => {
                self.shared.mark_in_flight();
                self.shared.fetch_with_callback(&handle, callback.clone());
            }
            Some(Err(outcome)) => invoke_callback(callback, outcome),
        }
    }
}

fn invoke_callback(callback: &RowCallback, outcome: RowOutcome) {
    if let Err(cause) = callback(outcome) {
        let error = CoreError::internal_sdk("Columnar query next row callback failed.");
        let context = error.context().unwrap_or_default();
        tracing::error!(
            code = error.code,
            %context,
            %cause,
            "{}",
            error.message
        );
    }
}

pub struct Rows<'a> {
    stream: &'a QueryStream,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<QueryRow, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.stream.is_callback_mode() {
            self.done = true;
            return None;
        }
        match self.stream.next() {
            NextRow::Delivered(RowOutcome::Row(row)) => Some(Ok(row)),
            NextRow::Delivered(RowOutcome::Error(error)) => {
                self.done = true;
                Some(Err(error))
            }
            NextRow::Delivered(RowOutcome::End) | NextRow::Polling => {
                self.done = true;
                None
            }
        }
    }
}
