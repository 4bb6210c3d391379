//! Python extension module `pycbcc_core`.
#![allow(clippy::useless_conversion)]
//!
//! ```python
//! import logging
//! import pycbcc_core
//!
//! pycbcc_core.pycbcc_logger().configure_logging_sink(logging.getLogger(), logging.INFO)
//! it = pycbcc_core._scripted_query_iterator([b'{"a":1}'])
//! row = next(it)
//! ```

use std::sync::Arc;

use pycbcc_bridge::config::LoggingEnv;
use pycbcc_bridge::memory::ScriptedQuery;
use pycbcc_bridge::{CoreError, LoggerRegistry, QueryMetadata, QueryStream};
use pyo3::exceptions::PyRuntimeWarning;
use pyo3::prelude::*;

mod convert;
mod errors;
mod iterator;
mod logger;
mod result;

pub use iterator::QueryIterator;
pub use logger::Logger;
pub use result::ResultObject;

/// Iterator over a fixed list of rows, served by the in-process scripted
/// engine. `error=(code, message)` ends the stream with an engine error
/// instead of the end marker.
#[pyfunction]
#[pyo3(signature = (rows, request_id=None, error=None, row_callback=None))]
fn _scripted_query_iterator(
    rows: Vec<Vec<u8>>,
    request_id: Option<String>,
    error: Option<(i32, String)>,
    row_callback: Option<PyObject>,
) -> QueryIterator {
    let mut query = ScriptedQuery::new(rows);
    if let Some((code, message)) = error {
        query = query.with_error(CoreError::engine(code, message));
    }
    if let Some(request_id) = request_id {
        query = query.with_metadata(QueryMetadata {
            request_id,
            ..QueryMetadata::default()
        });
    }
    let callback = row_callback.map(iterator::python_row_callback);
    QueryIterator::new(QueryStream::active(Arc::new(query), callback))
}

/// Loggers requested through the environment. A bad setting is reported as a
/// warning; the import still succeeds.
fn apply_logging_env(py: Python<'_>) -> PyResult<()> {
    let env = LoggingEnv::from_env();
    if let Err(e) = py.allow_threads(|| env.apply(LoggerRegistry::global())) {
        let category = py.get_type_bound::<PyRuntimeWarning>();
        PyErr::warn_bound(
            py,
            &category,
            &format!("pycbcc_core: ignoring logging environment: {e}"),
            1,
        )?;
    }
    Ok(())
}

#[pymodule]
#[pyo3(name = "pycbcc_core")]
fn pycbcc_core_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    errors::register_exceptions(py, m)?;
    m.add_class::<Logger>()?;
    m.add_class::<ResultObject>()?;
    m.add_class::<QueryIterator>()?;
    m.add_function(wrap_pyfunction!(_scripted_query_iterator, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    apply_logging_env(py)?;
    Ok(())
}
