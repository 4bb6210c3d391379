use pycbcc_bridge::{CoreError, Error, ErrorKind};
use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;

create_exception!(pycbcc_core, ColumnarError, PyException);
create_exception!(pycbcc_core, InvalidArgumentError, ColumnarError);
create_exception!(pycbcc_core, AlreadyInitializedError, ColumnarError);
create_exception!(pycbcc_core, InternalError, ColumnarError);
create_exception!(pycbcc_core, StreamError, ColumnarError);

pub fn register_exceptions(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("ColumnarError", py.get_type_bound::<ColumnarError>())?;
    m.add("InvalidArgumentError", py.get_type_bound::<InvalidArgumentError>())?;
    m.add(
        "AlreadyInitializedError",
        py.get_type_bound::<AlreadyInitializedError>(),
    )?;
    m.add("InternalError", py.get_type_bound::<InternalError>())?;
    m.add("StreamError", py.get_type_bound::<StreamError>())?;
    Ok(())
}

/// Raise a bridge configuration failure.
pub fn classify_bridge_error(err: Error) -> PyErr {
    match err {
        Error::InvalidArgument(msg) => InvalidArgumentError::new_err(msg),
        Error::AlreadyInitialized(msg) => AlreadyInitializedError::new_err(msg),
        Error::Internal(msg) => InternalError::new_err(msg),
        Error::Io(e) => InternalError::new_err(e.to_string()),
    }
}

/// Build (not raise) the exception object a stream hands back as a value.
///
/// The instance carries `code`, `message` and, for errors raised inside the
/// extension, `context` (`file:line`).
pub fn core_error_to_py(py: Python<'_>, err: &CoreError) -> PyObject {
    let exc = match err.kind {
        ErrorKind::Engine | ErrorKind::Cancelled => StreamError::new_err(err.message.clone()),
        ErrorKind::InvalidArgument => InvalidArgumentError::new_err(err.message.clone()),
        ErrorKind::InternalSdk => InternalError::new_err(err.message.clone()),
    };
    let value = exc.value_bound(py);
    let attrs = [
        ("code", err.code.into_py(py)),
        ("message", err.message.clone().into_py(py)),
        ("context", err.context().into_py(py)),
    ];
    for (name, attr) in attrs {
        if let Err(e) = value.setattr(name, attr) {
            tracing::warn!(attribute = name, error = %e, "could not annotate stream error");
        }
    }
    exc.into_value(py).into_py(py)
}
