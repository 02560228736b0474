#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2, ArrayD};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use chrono::NaiveDateTime;

#[cfg(feature = "python-bindings")]
use crate::{
    dataset::{io::parse_datetime, options::IdentityBlock},
    hierarchy::aggregation::AggregationMatrix,
    reconciliation::method::ReconciliationMethod,
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
    PyReadonlyArrayDyn,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 2-D array-like (ndarray, DataFrame, or nested sequence) into an
/// owned `Array2<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64",
        )
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err("all rows must have the same length"));
    }
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| PyValueError::new_err(format!("invalid matrix shape: {e}")))
}

/// Copy an array-like of any rank into an owned `ArrayD<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_samples<'py>(raw_data: &Bound<'py, PyAny>) -> PyResult<ArrayD<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArrayDyn<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    let obj = raw_data.call_method1("__array__", ()).map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err("expected a numpy.ndarray of float64 samples")
    })?;
    let arr_ro = obj.extract::<PyReadonlyArrayDyn<f64>>().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err("expected a numpy.ndarray of float64 samples")
    })?;
    Ok(arr_ro.as_array().to_owned())
}

/// Build and validate an [`AggregationMatrix`] from a Python matrix.
#[cfg(feature = "python-bindings")]
pub fn extract_aggregation_matrix<'py>(
    raw_s: &Bound<'py, PyAny>, identity_block: Option<&str>,
) -> PyResult<AggregationMatrix> {
    let matrix = extract_f64_matrix(raw_s)?;
    let block: IdentityBlock = identity_block.unwrap_or("present").parse()?;
    let aggregation = match block {
        IdentityBlock::Present => AggregationMatrix::new(matrix),
        IdentityBlock::Absent => AggregationMatrix::from_upper(matrix),
    };
    Ok(aggregation?)
}

/// Parse a start timestamp in any of the default import formats.
#[cfg(feature = "python-bindings")]
pub fn extract_start(start: &str) -> PyResult<NaiveDateTime> {
    parse_datetime(start.trim(), None).ok_or_else(|| {
        PyValueError::new_err(format!(
            "invalid start {start:?} (expected 'YYYY-MM-DD', 'YYYY-MM-DD HH:MM:SS', or 'YYYY-MM-DDTHH:MM:SS')"
        ))
    })
}

/// Resolve `method` / `weights` keyword arguments into a
/// [`ReconciliationMethod`].
///
/// Custom weights select WLS and are only valid with `method=None` or
/// `method="wls"`.
#[cfg(feature = "python-bindings")]
pub fn extract_method<'py>(
    py: Python<'py>, method: Option<&str>, weights: Option<&Bound<'py, PyAny>>,
) -> PyResult<ReconciliationMethod> {
    match (method.map(str::to_lowercase), weights) {
        (None, Some(w)) => Ok(ReconciliationMethod::Wls(extract_weights(py, w)?)),
        (Some(name), Some(w)) if name == "wls" => {
            Ok(ReconciliationMethod::Wls(extract_weights(py, w)?))
        }
        (Some(name), Some(_)) => Err(PyValueError::new_err(format!(
            "weights are only valid with method='wls', got method={name:?}"
        ))),
        (Some(name), None) if name == "wls" => {
            Err(PyValueError::new_err("method='wls' requires a weights array"))
        }
        (Some(name), None) => Ok(name.parse::<ReconciliationMethod>()?),
        (None, None) => Ok(ReconciliationMethod::Ols),
    }
}

#[cfg(feature = "python-bindings")]
fn extract_weights<'py>(py: Python<'py>, raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err("weights must be a 1-D contiguous float64 array or sequence")
    })?;
    Ok(Array1::from(slice.to_vec()))
}
