use pycbcc_bridge::RowOutcome;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyList};
use serde_json::{Map, Value};

use crate::errors::core_error_to_py;

/// Convert a marshalled JSON value to a Python object.
pub fn value_to_py(py: Python<'_>, value: &Value) -> PyObject {
    match value {
        Value::Null => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u.into_py(py)
            } else if let Some(i) = n.as_i64() {
                i.into_py(py)
            } else {
                n.as_f64().unwrap_or(f64::NAN).into_py(py)
            }
        }
        Value::String(s) => s.into_py(py),
        Value::Array(items) => {
            PyList::new_bound(py, items.iter().map(|v| value_to_py(py, v))).into_py(py)
        }
        Value::Object(map) => map_to_dict(py, map).into_py(py),
    }
}

/// Key-by-key dict construction; a key that cannot be inserted is logged and
/// skipped.
pub fn map_to_dict<'py>(py: Python<'py>, map: &Map<String, Value>) -> Bound<'py, PyDict> {
    let dict = PyDict::new_bound(py);
    for (key, value) in map {
        if let Err(e) = dict.set_item(key, value_to_py(py, value)) {
            tracing::warn!(key = %key, error = %e, "dropping field from marshalled mapping");
        }
    }
    dict
}

/// `bytes` for a row, `None` for the end of the stream, an exception instance
/// for an error.
pub fn outcome_to_py(py: Python<'_>, outcome: RowOutcome) -> PyObject {
    match outcome {
        RowOutcome::Row(row) => PyBytes::new_bound(py, row.as_bytes()).into_py(py),
        RowOutcome::End => py.None(),
        RowOutcome::Error(err) => core_error_to_py(py, &err),
    }
}
