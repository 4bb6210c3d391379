//! Routing of engine log records to the caller.
//!
//! Three entry points mirror the extension module's logger methods:
//!
//! - [`configure_logging_sink`]: forward records to a caller-supplied sink.
//! - [`create_console_logger`]: write records to stderr.
//! - [`enable_protocol_logger`]: trace wire traffic to a file.
//!
//! The first two share one set-once [`LoggerRegistry`]; the protocol logger is
//! independent of it.

mod level;
mod protocol;
mod registry;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

pub use level::LogLevel;
pub use protocol::{
    Direction, ProtocolLogger, ProtocolLoggerConfig, create_protocol_logger,
    protocol_logger_active, protocol_trace,
};
pub use registry::{LoggerConfig, LoggerRegistry};
pub use sink::{LogRecord, LogSink, SinkLayer};

use crate::error::Result;

/// Forward engine records at or above `level` to `sink`.
pub fn configure_logging_sink(
    registry: &LoggerRegistry,
    sink: Arc<dyn LogSink>,
    level: LogLevel,
) -> Result<()> {
    registry.create_file_logger(LoggerConfig {
        console: false,
        sink: Some(sink),
        filename: None,
        level,
    })
}

/// Create a stderr logger and apply `level`.
///
/// An existing logger is reported before the level string is looked at, so a
/// bad level on an initialized registry still yields `AlreadyInitialized`.
pub fn create_console_logger(registry: &LoggerRegistry, level: &str) -> Result<()> {
    if registry.is_initialized() {
        return Err(crate::Error::AlreadyInitialized(
            "Cannot create logger.  Another logger has already been initialized. \
             Make sure to not use configure_logging if going to set PYCBCC_LOG_LEVEL env."
                .to_string(),
        ));
    }
    let level: LogLevel = level.parse()?;
    registry.create_console_logger()?;
    registry.set_log_levels(level)
}

pub fn enable_protocol_logger(filename: impl Into<PathBuf>) -> Result<()> {
    create_protocol_logger(ProtocolLoggerConfig {
        filename: filename.into(),
    })
}
