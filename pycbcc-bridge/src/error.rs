use std::panic::Location;

use thiserror::Error;

/// Errors raised synchronously by bridge configuration calls.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where a [`CoreError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported by the engine while executing the operation.
    Engine,
    /// A malformed argument crossed the bridge.
    InvalidArgument,
    /// The bridge itself failed (dropped handler, failing callback, ...).
    InternalSdk,
    /// The operation was cancelled before it produced a value.
    Cancelled,
}

/// Error code used for bridge-originated failures.
pub const INTERNAL_SDK_CODE: i32 = 5000;
/// Error code used for argument failures.
pub const INVALID_ARGUMENT_CODE: i32 = 5001;
/// Error code used when a stream is cancelled.
pub const CANCELLED_CODE: i32 = 2;

/// A failure delivered as the *value* of a stream operation rather than raised.
///
/// Engine errors keep the engine's code and message untouched. Errors built by
/// the bridge record the source location that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub code: i32,
    pub message: String,
    pub location: Option<&'static Location<'static>>,
}

impl CoreError {
    /// Wrap an engine-reported failure.
    pub fn engine(code: i32, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Engine,
            code,
            message: message.into(),
            location: None,
        }
    }

    #[track_caller]
    pub fn internal_sdk(message: impl Into<String>) -> Self {
        Self::client(ErrorKind::InternalSdk, INTERNAL_SDK_CODE, message)
    }

    #[track_caller]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::client(ErrorKind::InvalidArgument, INVALID_ARGUMENT_CODE, message)
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        Self::client(ErrorKind::Cancelled, CANCELLED_CODE, "Columnar query was cancelled.")
    }

    #[track_caller]
    fn client(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            location: Some(Location::caller()),
        }
    }

    /// `file:line` of the bridge code that built this error, if any.
    pub fn context(&self) -> Option<String> {
        self.location
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_carry_no_location() {
        let err = CoreError::engine(23003, "Syntax error");
        assert_eq!(err.kind, ErrorKind::Engine);
        assert!(err.context().is_none());
        assert_eq!(err.to_string(), "Syntax error (code 23003)");
    }

    #[test]
    fn client_errors_point_at_the_caller() {
        let err = CoreError::internal_sdk("boom");
        let ctx = err.context().unwrap();
        assert!(ctx.contains("error.rs"), "unexpected context: {ctx}");
        assert_eq!(err.code, INTERNAL_SDK_CODE);
    }
}
