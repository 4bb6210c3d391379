use std::sync::Arc;

use pycbcc_bridge::marshal::marshal_metadata;
use pycbcc_bridge::stream::CallbackError;
use pycbcc_bridge::{NextRow, QueryStream, RowCallback};
use pyo3::prelude::*;

use crate::convert::{map_to_dict, outcome_to_py};
use crate::errors::core_error_to_py;

/// Wrap a Python callable as a row callback. Each call takes the GIL.
pub fn python_row_callback(callback: PyObject) -> RowCallback {
    Arc::new(move |outcome| {
        Python::with_gil(|py| {
            let value = outcome_to_py(py, outcome);
            callback
                .call1(py, (value,))
                .map(drop)
                .map_err(|e| CallbackError(e.to_string()))
        })
    })
}

/// Streaming iterator over the rows of one columnar query.
///
/// In blocking mode `__next__` returns the row as `bytes`, `None` at the end
/// of the stream, or an error object. With a row callback it returns `True`
/// at once and the callback receives the same values.
///
/// Iterating again after the end keeps returning `None`.
#[pyclass(name = "columnar_query_iterator", module = "pycbcc_core")]
pub struct QueryIterator {
    pub(crate) inner: QueryStream,
}

impl QueryIterator {
    pub fn new(inner: QueryStream) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl QueryIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&self, py: Python<'_>) -> PyObject {
        match py.allow_threads(|| self.inner.next()) {
            NextRow::Delivered(outcome) => outcome_to_py(py, outcome),
            NextRow::Polling => true.into_py(py),
        }
    }

    /// Stop the query. Rows already requested may still arrive.
    fn cancel(&self, py: Python<'_>) {
        py.allow_threads(|| self.inner.cancel())
    }

    /// `True` once the query has started streaming, otherwise the error that
    /// prevented it.
    fn wait_for_core_query_result(&self, py: Python<'_>) -> PyObject {
        match py.allow_threads(|| self.inner.wait_for_core_query_result()) {
            Ok(()) => true.into_py(py),
            Err(e) => core_error_to_py(py, &e),
        }
    }

    /// Request id, warnings and metrics, or `None` if the engine has none yet.
    fn metadata(&self, py: Python<'_>) -> Option<PyObject> {
        py.allow_threads(|| self.inner.metadata())
            .map(|metadata| map_to_dict(py, &marshal_metadata(&metadata)).into_py(py))
    }

    fn __repr__(&self) -> String {
        format!(
            "columnar_query_iterator(state={:?}, callback={})",
            self.inner.state(),
            self.inner.is_callback_mode()
        )
    }
}
