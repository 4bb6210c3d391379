//! Engine-facing core of the `pycbcc_core` extension module.
//!
//! Everything here works without a Python interpreter; the `pycbcc-pyo3`
//! crate only converts between these types and Python objects.
//!
//! - [`logging`]: engine log routing (sink, console, protocol log) and level
//!   mapping.
//! - [`result`]: the read-only key/value result box.
//! - [`marshal`]: query metrics and metadata as plain maps.
//! - [`stream`]: the streaming query iterator.
//! - [`engine`]: the handles the engine gives us.
//! - [`memory`]: a scripted engine for tests.

pub mod config;
pub mod engine;
mod error;
pub mod logging;
pub mod marshal;
pub mod memory;
pub mod result;
pub mod stream;

pub use crate::error::{
    CANCELLED_CODE, CoreError, Error, ErrorKind, INTERNAL_SDK_CODE, INVALID_ARGUMENT_CODE,
    Result,
};
pub use engine::{
    PendingOperation, QueryMetadata, QueryMetrics, QueryRow, QueryWarning, RowHandler, RowResult,
    SharedPending, SharedQuery, StreamingQuery,
};
pub use logging::{LogLevel, LoggerRegistry};
pub use result::{ResultBox, ResultBoxBuilder};
pub use stream::{NextRow, QueryResolver, QueryStream, RowCallback, RowOutcome, StreamPhase};
