//! Interfaces consumed from the client engine.
//!
//! The engine executes queries on its own worker threads and hands results back
//! through one-shot handlers. Nothing in this module executes anything; it only
//! describes the handles the bridge wraps.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;

/// One streamed item of a query result, kept as the raw bytes the engine produced.
#[derive(Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub content: Vec<u8>,
}

impl QueryRow {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Debug for QueryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryRow({:?})", String::from_utf8_lossy(&self.content))
    }
}

/// What the engine hands to a row handler when the call itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowResult {
    /// Neither a row nor the end marker. Engines should not produce this.
    Empty,
    Row(QueryRow),
    End,
}

/// Invoked exactly once per `next_row` request, on whichever thread the engine
/// chooses (possibly inline, before `next_row` returns).
pub type RowHandler = Box<dyn FnOnce(Result<RowResult, CoreError>) + Send + 'static>;

/// A ready streaming query result.
pub trait StreamingQuery: Send + Sync {
    /// Request the next row; the answer arrives through `handler`.
    fn next_row(&self, handler: RowHandler);

    /// Ask the engine to stop streaming. Best effort and non-blocking.
    fn cancel(&self);

    /// Metadata becomes available once the stream has been fully consumed.
    fn metadata(&self) -> Option<QueryMetadata>;
}

/// An operation the engine has accepted but not yet turned into a [`StreamingQuery`].
pub trait PendingOperation: Send + Sync {
    fn cancel(&self);
}

pub type SharedQuery = Arc<dyn StreamingQuery>;
pub type SharedPending = Arc<dyn PendingOperation>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryWarning {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetrics {
    pub elapsed_time: Duration,
    pub execution_time: Duration,
    pub result_count: u64,
    pub result_size: u64,
    pub processed_objects: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetadata {
    pub request_id: String,
    pub warnings: Vec<QueryWarning>,
    pub metrics: QueryMetrics,
}
