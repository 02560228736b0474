//! dataset::errors — failures at the exchange boundary.
//!
//! Purpose
//! -------
//! Provide [`DatasetError`] and [`DatasetResult`] for everything that crosses
//! the boundary with external estimators and files: forecast-shape checks,
//! aggregation-structure agreement, CSV/I/O failures, and field parsing.
//! Hierarchy and reconciliation failures are wrapped unchanged so callers
//! can match on the original variant.
//!
//! Conventions
//! -----------
//! - `Parse::row` is the 1-based data row of the offending file (header
//!   excluded); `column` is 0-based.
//! - `csv::Error` and `std::io::Error` are stored as rendered strings so the
//!   enum stays `Clone + PartialEq` like the other error types of the crate.
//! - Converted to a Python `ValueError` when `python-bindings` is enabled.
use crate::{hierarchy::errors::HierarchyError, reconciliation::errors::ReconcileError};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Error conditions for [`crate::dataset`].
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    // ---- Wrapped ----
    /// Structural or time-index failure.
    Hierarchy(HierarchyError),

    /// Projection construction or application failure.
    Reconcile(ReconcileError),

    // ---- Forecast exchange ----
    /// Forecast series dimension differs from the adapter's hierarchy.
    Shape { expected: usize, found: usize },

    /// Store and adapter were built from different aggregation matrices.
    AggregationMismatch,

    /// Forecast has no samples or no horizon steps.
    EmptyForecast,

    /// Per-series forecasts disagree on `(samples, horizon)`.
    MisalignedSeries { series: usize, expected: (usize, usize), found: (usize, usize) },

    /// Quantile level must lie in `[0, 1]`.
    InvalidQuantile { q: f64 },

    // ---- Files ----
    /// CSV reader/writer failure.
    Csv(String),

    /// File-system failure.
    Io(String),

    /// A field could not be parsed.
    Parse { row: usize, column: usize, value: String, reason: String },

    /// File contained no data rows.
    EmptyFile,

    /// A data row has the wrong number of fields.
    RaggedRow { row: usize, expected: usize, found: usize },
}

impl std::error::Error for DatasetError {}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Hierarchy(err) => write!(f, "{err}"),
            DatasetError::Reconcile(err) => write!(f, "{err}"),
            DatasetError::Shape { expected, found } => {
                write!(f, "Forecast has {found} series; the hierarchy has {expected}.")
            }
            DatasetError::AggregationMismatch => {
                write!(f, "Store aggregation matrix differs from the adapter's aggregation matrix.")
            }
            DatasetError::EmptyForecast => {
                write!(f, "Forecast must have at least one sample and one horizon step.")
            }
            DatasetError::MisalignedSeries { series, expected, found } => {
                write!(
                    f,
                    "Forecast for series {series} has (samples, horizon) = {found:?}; expected {expected:?}."
                )
            }
            DatasetError::InvalidQuantile { q } => {
                write!(f, "Quantile level must lie in [0, 1]; got {q}")
            }
            DatasetError::Csv(msg) => write!(f, "CSV error: {msg}"),
            DatasetError::Io(msg) => write!(f, "I/O error: {msg}"),
            DatasetError::Parse { row, column, value, reason } => {
                write!(f, "Row {row}, column {column}: cannot parse {value:?}: {reason}")
            }
            DatasetError::EmptyFile => write!(f, "File contains no data rows."),
            DatasetError::RaggedRow { row, expected, found } => {
                write!(f, "Row {row} has {found} fields; expected {expected}.")
            }
        }
    }
}

impl From<HierarchyError> for DatasetError {
    fn from(err: HierarchyError) -> Self {
        DatasetError::Hierarchy(err)
    }
}

impl From<ReconcileError> for DatasetError {
    fn from(err: ReconcileError) -> Self {
        DatasetError::Reconcile(err)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        DatasetError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        DatasetError::Io(err.to_string())
    }
}

/// Convert a [`DatasetError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<DatasetError> for PyErr {
    fn from(err: DatasetError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: DatasetError = HierarchyError::EmptyMatrix.into();
        assert_eq!(err.to_string(), HierarchyError::EmptyMatrix.to_string());
        let err: DatasetError = ReconcileError::ShapeMismatch { expected: 3, found: 2 }.into();
        assert!(matches!(err, DatasetError::Reconcile(ReconcileError::ShapeMismatch { .. })));
    }
}
