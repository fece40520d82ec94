//! Python Bindings
//!
//! Exposes factories over Python dicts. A dict store merges like a dynamic
//! record: the stored dict is copied, the patch is applied with
//! `dict.update`, and the copy is committed. A patch that cannot be merged
//! commits nothing and notifies nobody. Dicts handed out by `get` are
//! snapshots; mutating one does not write to the store.

use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing::warn;

use crate::error::PatchError;
use crate::scope::PubSub;
use crate::store::{CallbackKey, ShallowMerge, Store, Unsubscribe};

/// A Python dict used as store data.
#[derive(Debug)]
pub struct PyRecord(Py<PyDict>);

impl Clone for PyRecord {
    fn clone(&self) -> Self {
        Python::with_gil(|py| Self(self.0.clone_ref(py)))
    }
}

impl ShallowMerge for PyRecord {
    type Patch = PyRecord;

    fn merge(&mut self, patch: Self::Patch) {
        if let Err(err) = self.try_merge(patch) {
            warn!(error = %err, "dict patch could not be merged; keeping previous value");
        }
    }

    fn try_merge(&mut self, patch: Self::Patch) -> Result<(), PatchError> {
        let merged = Python::with_gil(|py| -> PyResult<Py<PyDict>> {
            let next = self.0.bind(py).copy()?;
            next.update(patch.0.bind(py).as_mapping())?;
            Ok(next.unbind())
        });

        self.0 = merged.map_err(|err| PatchError::Rejected(err.to_string()))?;
        Ok(())
    }
}

/// Python-exposed factory.
#[pyclass(name = "PubSub")]
pub struct PyPubSub {
    inner: PubSub<PyRecord>,
}

#[pymethods]
impl PyPubSub {
    #[new]
    fn new(initial: &Bound<'_, PyDict>) -> PyResult<Self> {
        // Own a private copy so later mutation of the caller's dict is not seen.
        let initial = PyRecord(initial.copy()?.unbind());
        Ok(Self {
            inner: PubSub::new(initial),
        })
    }

    /// Instantiate a fresh store seeded with the initial dict.
    fn provider(&self) -> PyStore {
        PyStore {
            inner: Arc::clone(self.inner.provider().store()),
        }
    }

    /// The detached store used when no provider is available.
    fn default_store(&self) -> PyStore {
        PyStore {
            inner: self.inner.fallback(),
        }
    }
}

/// Python-exposed store.
#[pyclass(name = "Store")]
pub struct PyStore {
    inner: Arc<Store<PyRecord>>,
}

#[pymethods]
impl PyStore {
    /// A copy of the current value.
    fn get<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let snapshot = py.allow_threads(|| self.inner.get());
        snapshot.0.bind(py).copy()
    }

    /// Merge `partial` into the current value and notify subscribers.
    fn set(&self, partial: &Bound<'_, PyDict>) -> PyResult<()> {
        let patch = PyRecord(partial.copy()?.unbind());
        let py = partial.py();
        py.allow_threads(|| self.inner.set(patch));
        Ok(())
    }

    /// Register a callable. The same callable registered twice is notified
    /// once per write.
    fn subscribe(&self, callback: PyObject) -> PyUnsubscribe {
        let key = CallbackKey::from_raw(callback.as_ptr() as usize);
        let notify = Arc::new(move || {
            Python::with_gil(|py| {
                if let Err(err) = callback.call0(py) {
                    err.print(py);
                }
            });
        });

        PyUnsubscribe {
            inner: self.inner.subscribe_keyed(key, notify),
        }
    }

    #[getter]
    fn version(&self) -> u64 {
        self.inner.version()
    }

    #[getter]
    fn detached(&self) -> bool {
        self.inner.is_detached()
    }

    fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    fn __repr__(&self) -> String {
        format!(
            "Store(id={}, version={}, subscribers={})",
            self.inner.id().raw(),
            self.inner.version(),
            self.inner.subscriber_count()
        )
    }
}

/// Python-exposed unsubscribe handle. Call it to unsubscribe.
#[pyclass(name = "Unsubscribe")]
pub struct PyUnsubscribe {
    inner: Unsubscribe,
}

#[pymethods]
impl PyUnsubscribe {
    fn __call__(&self) {
        self.inner.unsubscribe();
    }

    #[getter]
    fn spent(&self) -> bool {
        self.inner.is_spent()
    }
}
