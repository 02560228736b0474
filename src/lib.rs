//! rust_hts — hierarchical time series with coherent forecast reconciliation.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! hierarchical-series construction and forecast reconciliation to Python via
//! the `_rust_hts` extension module. When the `python-bindings` feature is
//! enabled, this module defines the Python-facing classes and the
//! `hierarchical` submodule.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`hierarchy`, `reconciliation`,
//!   `dataset`) as the public crate surface.
//! - Define `#[pyclass]` wrappers (`HierarchicalTimeSeries`, `Reconciler`)
//!   and the `#[pymodule]` initializer for the `_rust_hts` extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, input conversion, and error mapping.
//! - Python-visible types mirror the invariants of their Rust counterparts:
//!   a `HierarchicalTimeSeries` is always coherent, and a `Reconciler` always
//!   holds a valid projection.
//!
//! Conventions
//! -----------
//! - Series are ordered as the rows of the aggregation matrix `S`: upper
//!   levels first, bottom level last.
//! - Forecast samples use the `series × sample × horizon` layout; other
//!   layouts are supported by passing the series `axis` explicitly.
//! - Errors from core Rust code are converted to `ValueError` at the PyO3
//!   boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code depends directly on the inner modules and can ignore
//!   the PyO3 items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules, the
//!   end-to-end pipeline test, and property tests under `tests/`.

pub mod dataset;
pub mod hierarchy;
pub mod reconciliation;
pub mod utils;

#[cfg(feature = "python-bindings")]
use ndarray::Axis;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray2, PyArrayDyn, ToPyArray};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    hierarchy::{
        store::HierarchicalSeriesStore,
        time_index::{Frequency, TimeIndex},
    },
    reconciliation::reconciler::Reconciler,
    utils::{
        extract_aggregation_matrix, extract_f64_matrix, extract_f64_samples, extract_method,
        extract_start,
    },
};

/// HierarchicalTimeSeries — Python-facing wrapper for [`HierarchicalSeriesStore`].
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `HierarchicalTimeSeries(bottom, s, start, freq, identity_block="present")`:
/// - `bottom`: `T × m` array-like of bottom-level values.
/// - `s`: aggregation matrix; full `S` or, with `identity_block="absent"`,
///   only the upper block.
/// - `start`: first timestamp, `"YYYY-MM-DD[ HH:MM:SS]"`.
/// - `freq`: pandas-style alias such as `"H"`, `"15min"`, `"D"`.
///
/// Notes
/// -----
/// - Native Rust callers should use [`HierarchicalSeriesStore`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hts.hierarchical")]
pub struct HierarchicalTimeSeries {
    inner: HierarchicalSeriesStore,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl HierarchicalTimeSeries {
    #[new]
    #[pyo3(
        signature = (bottom, s, start, freq, identity_block = None),
        text_signature = "(bottom, s, start, freq, /, identity_block='present')"
    )]
    pub fn new<'py>(
        bottom: &Bound<'py, PyAny>, s: &Bound<'py, PyAny>, start: &str, freq: &str,
        identity_block: Option<&str>,
    ) -> PyResult<Self> {
        let bottom = extract_f64_matrix(bottom)?;
        let aggregation = extract_aggregation_matrix(s, identity_block)?;
        let freq: Frequency = freq.parse()?;
        let index = TimeIndex::regular(extract_start(start)?, freq, bottom.nrows())?;
        let inner = HierarchicalSeriesStore::new(index, bottom, aggregation)?;
        Ok(HierarchicalTimeSeries { inner })
    }

    /// `T × n` values of every level, upper levels first.
    #[getter]
    pub fn ts_at_all_levels<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.ts_at_all_levels().to_pyarray(py)
    }

    #[getter]
    pub fn ts_at_bottom_level<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.ts_at_bottom_level().to_pyarray(py)
    }

    #[getter]
    pub fn s<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.aggregation().matrix().to_pyarray(py)
    }

    #[getter]
    pub fn num_ts(&self) -> usize {
        self.inner.num_ts()
    }

    #[getter]
    pub fn num_bottom_ts(&self) -> usize {
        self.inner.num_bottom_ts()
    }

    #[getter]
    pub fn freq(&self) -> PyResult<String> {
        Ok(self.inner.freq()?.alias())
    }

    /// Timestamps in ISO 8601 form.
    #[getter]
    pub fn timestamps(&self) -> Vec<String> {
        self.inner
            .index()
            .timestamps()
            .iter()
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .collect()
    }

    pub fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Split off the last `withheld` steps as `(train, test)`.
    #[pyo3(text_signature = "(self, withheld, /)")]
    pub fn train_test_split(&self, withheld: usize) -> PyResult<(Self, Self)> {
        let (train, test) = self.inner.train_test_split(withheld)?;
        Ok((HierarchicalTimeSeries { inner: train }, HierarchicalTimeSeries { inner: test }))
    }

    /// Exchange records as `(series_id, timestamp, value, freq)` tuples.
    pub fn to_dataset(&self) -> PyResult<Vec<(usize, String, f64, String)>> {
        let data = self.inner.to_exchange_format()?;
        Ok(data
            .into_records()
            .into_iter()
            .map(|r| {
                (r.series_id, r.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(), r.value, r.freq)
            })
            .collect())
    }
}

/// Reconciler — Python-facing wrapper for [`Reconciler`].
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `Reconciler(s, method="ols", weights=None, identity_block="present")`:
/// - `method`: `"ols"`, `"structural"`, `"bottom_up"`, or `"wls"` (requires
///   `weights`).
/// - `weights`: optional positive weights of length `n`.
///
/// Notes
/// -----
/// - The projection is computed once at construction; `reconcile` reuses it.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "Reconciler", module = "rust_hts.hierarchical")]
pub struct PyReconciler {
    inner: Reconciler,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyReconciler {
    #[new]
    #[pyo3(
        signature = (s, method = None, weights = None, identity_block = None),
        text_signature = "(s, /, method='ols', weights=None, identity_block='present')"
    )]
    pub fn new<'py>(
        py: Python<'py>, s: &Bound<'py, PyAny>, method: Option<&str>,
        weights: Option<&Bound<'py, PyAny>>, identity_block: Option<&str>,
    ) -> PyResult<Self> {
        let aggregation = extract_aggregation_matrix(s, identity_block)?;
        let method = extract_method(py, method, weights)?;
        let inner = Reconciler::with_method(&aggregation, method)?;
        Ok(PyReconciler { inner })
    }

    /// Reconcile every lane of `samples` along `axis`; the shape is preserved.
    #[pyo3(signature = (samples, axis = 0), text_signature = "(self, samples, /, axis=0)")]
    pub fn reconcile<'py>(
        &self, py: Python<'py>, samples: &Bound<'py, PyAny>, axis: isize,
    ) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
        let values = extract_f64_samples(samples)?;
        let ndim = values.ndim() as isize;
        let resolved = if axis < 0 { axis + ndim } else { axis };
        if resolved < 0 {
            return Err(PyValueError::new_err(format!(
                "axis {axis} is out of bounds for an array with {ndim} dimensions"
            )));
        }
        let out = self.inner.reconcile_axis(values.view(), Axis(resolved as usize))?;
        Ok(out.into_pyarray(py))
    }

    #[getter]
    pub fn method(&self) -> String {
        self.inner.method().name().to_string()
    }

    #[getter]
    pub fn projection_matrix<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.projection_matrix().to_pyarray(py)
    }
}

/// _rust_hts — PyO3 module initializer for the Python extension.
///
/// Creates the `hierarchical` submodule, attaches it to `_rust_hts`, and
/// registers it in `sys.modules` so `rust_hts.hierarchical` is importable
/// with dot notation.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_hts<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let hierarchical_mod = PyModule::new(_py, "hierarchical")?;
    hierarchical(_py, m, &hierarchical_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_hts.hierarchical", hierarchical_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn hierarchical<'py>(
    _py: Python, rust_hts: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<HierarchicalTimeSeries>()?;
    m.add_class::<PyReconciler>()?;
    rust_hts.add_submodule(m)?;
    Ok(())
}
