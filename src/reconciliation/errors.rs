//! reconciliation::errors — failures while building or applying a projection.
//!
//! Purpose
//! -------
//! Provide [`ReconcileError`] and [`ReconcileResult`] for the reconciliation
//! layer. Construction failures (singular `SᵗWS`, invalid weights, malformed
//! raw matrices) and application failures (shape, axis, non-finite
//! forecasts) are reported before any output is produced.
//!
//! Conventions
//! -----------
//! - Indices are 0-based. For multi-dimensional forecast arrays,
//!   `NonFiniteInput::index` is the position in logical (row-major) order.
//! - Converted to a Python `ValueError` when `python-bindings` is enabled.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Error conditions for [`crate::reconciliation::Reconciler`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    // ---- Summing matrix ----
    /// Summing matrix has no rows or no columns.
    EmptyMatrix,

    /// Summing matrix entry is NaN/±inf.
    NonFiniteMatrix { row: usize, col: usize, value: f64 },

    /// Fewer rows than bottom series.
    InsufficientRows { rows: usize, bottom: usize },

    /// A row of the summing matrix sums to zero (structural weights undefined).
    DegenerateRow { row: usize },

    /// `SᵗWS` is not invertible; only reachable with an unvalidated matrix.
    SingularMatrix { min_eigenvalue: f64 },

    /// Bottom-up needs the last `m` rows of `S` to be `I_m`.
    MissingIdentityBlock { row: usize, col: usize, value: f64 },

    // ---- Method configuration ----
    /// WLS weight vector length differs from the number of series.
    WeightLengthMismatch { expected: usize, found: usize },

    /// WLS weights must be finite and strictly positive.
    InvalidWeight { index: usize, value: f64 },

    /// Method name could not be parsed.
    InvalidMethod { name: String, reason: &'static str },

    // ---- Application ----
    /// Series dimension of the forecast differs from the number of series.
    ShapeMismatch { expected: usize, found: usize },

    /// Requested series axis does not exist.
    AxisOutOfBounds { axis: usize, ndim: usize },

    /// Forecast entry is NaN/±inf.
    NonFiniteInput { index: usize, value: f64 },
}

impl std::error::Error for ReconcileError {}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::EmptyMatrix => {
                write!(f, "Summing matrix must have at least one row and one column.")
            }
            ReconcileError::NonFiniteMatrix { row, col, value } => {
                write!(f, "Summing matrix entry ({row}, {col}) is non-finite: {value}")
            }
            ReconcileError::InsufficientRows { rows, bottom } => {
                write!(f, "Summing matrix has {rows} rows but {bottom} bottom series.")
            }
            ReconcileError::DegenerateRow { row } => {
                write!(f, "Summing matrix row {row} sums to zero; structural weights are undefined.")
            }
            ReconcileError::SingularMatrix { min_eigenvalue } => {
                write!(
                    f,
                    "Normal-equation matrix SᵗWS is singular (smallest eigenvalue {min_eigenvalue:e}); \
                     the summing matrix does not have full column rank."
                )
            }
            ReconcileError::MissingIdentityBlock { row, col, value } => {
                write!(
                    f,
                    "Bottom-up reconciliation needs the bottom rows of the summing matrix to form \
                     the identity; entry ({row}, {col}) is {value}."
                )
            }
            ReconcileError::WeightLengthMismatch { expected, found } => {
                write!(f, "Weight vector has length {found}; expected {expected}.")
            }
            ReconcileError::InvalidWeight { index, value } => {
                write!(f, "Weight at index {index} must be finite and > 0; got {value}")
            }
            ReconcileError::InvalidMethod { name, reason } => {
                write!(f, "Invalid reconciliation method {name:?}: {reason}")
            }
            ReconcileError::ShapeMismatch { expected, found } => {
                write!(f, "Forecast has {found} series along the series axis; expected {expected}.")
            }
            ReconcileError::AxisOutOfBounds { axis, ndim } => {
                write!(f, "Series axis {axis} is out of bounds for an array with {ndim} dimensions.")
            }
            ReconcileError::NonFiniteInput { index, value } => {
                write!(f, "Forecast value at flat index {index} is non-finite: {value}")
            }
        }
    }
}

/// Convert a [`ReconcileError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ReconcileError> for PyErr {
    fn from(err: ReconcileError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
