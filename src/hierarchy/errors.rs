//! hierarchy::errors — validation failures for aggregation matrices, time
//! indices, and hierarchical series stores.
//!
//! This module defines [`HierarchyError`], the error type shared by
//! [`AggregationMatrix`](crate::hierarchy::AggregationMatrix),
//! [`TimeIndex`](crate::hierarchy::TimeIndex) and
//! [`HierarchicalSeriesStore`](crate::hierarchy::HierarchicalSeriesStore),
//! plus the [`HierarchyResult`] alias. It implements `Display`/`Error` and
//! converts to `PyErr` when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (rows of `S`, rows/columns of series tables,
//!   positions in a time index).
//! - Matrix-structure failures carry the offending row/column so the caller
//!   can locate the problem in the imported file.
//! - Frequency failures report the expected and observed step as
//!   `chrono::Duration` values.
use chrono::Duration;

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for hierarchy construction and slicing.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Unified error type for the hierarchy layer.
///
/// Covers aggregation-matrix structure, series-table validation, and
/// time-index regularity. Every variant is raised at construction or at the
/// boundary of a slicing operation; nothing is deferred into downstream
/// numerics.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyError {
    // ---- Aggregation matrix: shape ----
    /// Matrix has no rows or no columns.
    EmptyMatrix,

    /// Fewer rows than columns, so the identity suffix cannot exist.
    InsufficientRows { rows: usize, bottom: usize },

    /// Bottom `m` rows are not the identity matrix.
    IdentitySuffixViolated { row: usize, col: usize, value: f64 },

    // ---- Aggregation matrix: values ----
    /// A row sums to zero (an aggregate that sums nothing).
    DegenerateRow { row: usize },

    /// Aggregation weights must be finite.
    NonFiniteWeight { row: usize, col: usize, value: f64 },

    /// Aggregation weights must be non-negative.
    NegativeWeight { row: usize, col: usize, value: f64 },

    // ---- Series table ----
    /// Series count of a table or vector disagrees with `S`.
    DimensionMismatch { expected: usize, found: usize },

    /// Number of rows disagrees with the time index length.
    TimestampCountMismatch { timestamps: usize, rows: usize },

    /// A bottom-level value is NaN/±inf.
    NonFiniteValue { row: usize, col: usize, value: f64 },

    // ---- Time index / frequency ----
    /// Time index has no timestamps.
    EmptyIndex,

    /// Frequency cannot be inferred from fewer than two timestamps.
    InsufficientTimestamps { len: usize },

    /// Two consecutive timestamps are equal.
    DuplicateTimestamp { index: usize },

    /// Timestamps are not sorted in increasing order.
    UnsortedIndex { index: usize },

    /// Step between consecutive timestamps differs from the frequency.
    IrregularIndex { index: usize, expected: Duration, found: Duration },

    /// Frequency step must be strictly positive.
    NonPositiveFrequency { step: Duration },

    /// Frequency alias could not be parsed.
    InvalidFrequency { alias: String, reason: &'static str },

    /// Timestamp arithmetic left the representable range.
    TimestampOverflow,

    // ---- Slicing ----
    /// Requested slice contains no timestamps.
    EmptySlice,

    /// Withheld length leaves no training data (or exceeds the series).
    InvalidSplit { withheld: usize, len: usize },
}

impl std::error::Error for HierarchyError {}

impl std::fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Aggregation matrix: shape ----
            HierarchyError::EmptyMatrix => {
                write!(f, "Aggregation matrix must have at least one row and one column.")
            }
            HierarchyError::InsufficientRows { rows, bottom } => {
                write!(
                    f,
                    "Aggregation matrix has {rows} rows but {bottom} bottom series; \
                     at least {bottom} rows are required for the identity block."
                )
            }
            HierarchyError::IdentitySuffixViolated { row, col, value } => {
                write!(
                    f,
                    "Bottom rows of the aggregation matrix must form the identity; \
                     entry ({row}, {col}) is {value}."
                )
            }
            // ---- Aggregation matrix: values ----
            HierarchyError::DegenerateRow { row } => {
                write!(f, "Aggregation matrix row {row} sums to zero.")
            }
            HierarchyError::NonFiniteWeight { row, col, value } => {
                write!(f, "Aggregation weight at ({row}, {col}) is non-finite: {value}")
            }
            HierarchyError::NegativeWeight { row, col, value } => {
                write!(f, "Aggregation weight at ({row}, {col}) is negative: {value}")
            }
            // ---- Series table ----
            HierarchyError::DimensionMismatch { expected, found } => {
                write!(
                    f,
                    "Input has {found} series; aggregation matrix expects {expected}."
                )
            }
            HierarchyError::TimestampCountMismatch { timestamps, rows } => {
                write!(f, "Time index has {timestamps} timestamps but the table has {rows} rows.")
            }
            HierarchyError::NonFiniteValue { row, col, value } => {
                write!(f, "Bottom-level value at row {row}, column {col} is non-finite: {value}")
            }
            // ---- Time index / frequency ----
            HierarchyError::EmptyIndex => write!(f, "Time index is empty."),
            HierarchyError::InsufficientTimestamps { len } => {
                write!(f, "Frequency requires at least 2 timestamps; got {len}.")
            }
            HierarchyError::DuplicateTimestamp { index } => {
                write!(f, "Duplicate timestamp at position {index}.")
            }
            HierarchyError::UnsortedIndex { index } => {
                write!(f, "Timestamp at position {index} precedes its predecessor.")
            }
            HierarchyError::IrregularIndex { index, expected, found } => {
                write!(
                    f,
                    "Irregular time index at position {index}: expected step {expected}, found {found}."
                )
            }
            HierarchyError::NonPositiveFrequency { step } => {
                write!(f, "Frequency step must be strictly positive; got {step}.")
            }
            HierarchyError::InvalidFrequency { alias, reason } => {
                write!(f, "Invalid frequency alias {alias:?}: {reason}")
            }
            HierarchyError::TimestampOverflow => {
                write!(f, "Timestamp arithmetic overflowed the supported range.")
            }
            // ---- Slicing ----
            HierarchyError::EmptySlice => write!(f, "Requested time slice is empty."),
            HierarchyError::InvalidSplit { withheld, len } => {
                write!(
                    f,
                    "Cannot withhold {withheld} steps from a series of length {len}; \
                     both pieces must be non-empty."
                )
            }
        }
    }
}

/// Convert a [`HierarchyError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<HierarchyError> for PyErr {
    fn from(err: HierarchyError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
