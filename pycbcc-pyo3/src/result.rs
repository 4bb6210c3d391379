use pycbcc_bridge::ResultBox;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

/// Read-only wrapper around a key/value operation result.
#[pyclass(name = "result", module = "pycbcc_core")]
pub struct ResultObject {
    pub(crate) inner: ResultBox<PyObject>,
}

impl ResultObject {
    pub fn from_box(inner: ResultBox<PyObject>) -> Self {
        Self { inner }
    }

    fn dict<'py>(&self, py: Python<'py>) -> Bound<'py, PyDict> {
        let dict = PyDict::new_bound(py);
        for (key, value) in self.inner.fields() {
            if let Err(e) = dict.set_item(key, value.clone_ref(py)) {
                tracing::warn!(key = %key, error = %e, "dropping field from result mapping");
            }
        }
        dict
    }
}

#[pymethods]
impl ResultObject {
    #[new]
    #[pyo3(signature = (raw=None))]
    fn new(raw: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let mut fields = Vec::new();
        if let Some(raw) = raw {
            for (key, value) in raw.iter() {
                fields.push((key.extract::<String>()?, value.unbind()));
            }
        }
        Ok(Self::from_box(ResultBox::from_fields(fields)))
    }

    /// `get(field, default=None)`. Never raises: a call that cannot be parsed
    /// returns `None`.
    #[pyo3(signature = (*args))]
    fn get(&self, py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyObject {
        let field = args.get_item(0).and_then(|f| f.extract::<String>());
        let default = args.get_item(1).ok().map(Bound::unbind);
        self.inner
            .get_or_none(args.len(), field, default.as_ref())
            .map(|v| v.clone_ref(py))
            .unwrap_or_else(|| py.None())
    }

    /// A snapshot of the fields as a new `dict` on every access; edits to it
    /// do not change this result.
    #[getter]
    fn raw_result<'py>(&self, py: Python<'py>) -> Bound<'py, PyDict> {
        self.dict(py)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self, py: Python<'_>) -> PyResult<String> {
        Ok(format!("result:{{value={}}}", self.dict(py).repr()?))
    }

    fn __str__(&self, py: Python<'_>) -> PyResult<String> {
        self.__repr__(py)
    }
}
