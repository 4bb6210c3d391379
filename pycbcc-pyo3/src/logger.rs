use std::path::PathBuf;
use std::sync::Arc;

use pycbcc_bridge::logging::{self, LogRecord, LogSink};
use pycbcc_bridge::{LogLevel, LoggerRegistry};
use pyo3::prelude::*;

use crate::errors::{classify_bridge_error, AlreadyInitializedError, InvalidArgumentError};

/// Forwards engine log records to a Python `logging.Logger` (or any object
/// with a `log(level, msg)` method, or a plain callable).
struct PyLogSink {
    logger: PyObject,
}

impl LogSink for PyLogSink {
    fn log(&self, record: &LogRecord) {
        let level = record.level.to_external();
        let message = record.formatted();
        Python::with_gil(|py| {
            let logger = self.logger.bind(py);
            let sent = if logger.hasattr("log").unwrap_or(false) {
                logger.call_method1("log", (level, message))
            } else {
                logger.call1((level, message))
            };
            // Reporting through tracing here would recurse into this sink.
            if let Err(e) = sent {
                e.write_unraisable_bound(py, Some(logger));
            }
        });
    }
}

fn unparsable_args(action: &str) -> PyErr {
    InvalidArgumentError::new_err(format!("Cannot {action}.  Unable to parse args/kwargs."))
}

/// Logger configuration entry points of the extension.
///
/// ```python
/// import logging
/// from pycbcc_core import pycbcc_logger
///
/// pycbcc_logger().configure_logging_sink(logging.getLogger("pycbcc"), logging.DEBUG)
/// ```
#[pyclass(name = "pycbcc_logger", module = "pycbcc_core")]
#[derive(Default)]
pub struct Logger {}

#[pymethods]
impl Logger {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    /// Route engine logs at or above `level` (a Python `logging` level) to
    /// `logger`.
    #[pyo3(signature = (logger=None, level=None))]
    fn configure_logging_sink(
        &self,
        py: Python<'_>,
        logger: Option<Bound<'_, PyAny>>,
        level: Option<Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        let registry = LoggerRegistry::global();
        if registry.is_initialized() {
            return Err(AlreadyInitializedError::new_err(
                "Cannot create logger.  Another logger has already been initialized.",
            ));
        }
        let parse_error = || unparsable_args("set pycbcc_logger sink");
        let logger = logger.filter(|l| !l.is_none()).ok_or_else(parse_error)?;
        let level = level
            .ok_or_else(parse_error)?
            .extract::<i64>()
            .map_err(|_| parse_error())?;

        let sink = Arc::new(PyLogSink {
            logger: logger.unbind(),
        });
        let level = LogLevel::from_external(level);
        py.allow_threads(|| logging::configure_logging_sink(registry, sink, level))
            .map_err(classify_bridge_error)
    }

    /// Log to stderr at `level` (`"trace"` .. `"critical"`, or `"off"`).
    #[pyo3(signature = (level=None))]
    fn create_console_logger(
        &self,
        py: Python<'_>,
        level: Option<Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        let parse_error = || unparsable_args("create console logger");
        let level: String = level
            .ok_or_else(parse_error)?
            .extract()
            .map_err(|_| parse_error())?;
        py.allow_threads(|| logging::create_console_logger(LoggerRegistry::global(), &level))
            .map_err(classify_bridge_error)
    }

    /// Trace wire traffic to `filename`. Replaces any earlier protocol logger.
    #[pyo3(signature = (filename=None))]
    fn enable_protocol_logger(
        &self,
        py: Python<'_>,
        filename: Option<Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        let parse_error = || unparsable_args("create protocol logger");
        let filename: PathBuf = filename
            .ok_or_else(parse_error)?
            .extract()
            .map_err(|_| parse_error())?;
        py.allow_threads(|| logging::enable_protocol_logger(filename))
            .map_err(classify_bridge_error)
    }

    fn is_initialized(&self) -> bool {
        LoggerRegistry::global().is_initialized()
    }
}
