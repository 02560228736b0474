//! hierarchy::aggregation — validated summation matrix `S`.
//!
//! Purpose
//! -------
//! Store the fixed linear structure of a hierarchy: which bottom-level series
//! sum into which upper-level series. The matrix is stacked as
//! `S = [S_agg; I_m]`, so applying it to a bottom-level vector yields every
//! level at once, bottom series included.
//!
//! Key behaviors
//! -------------
//! - [`AggregationMatrix::new`] validates a full `S` (identity suffix
//!   present); [`AggregationMatrix::from_upper`] appends the identity block
//!   to a caller-supplied `S_agg`.
//! - [`AggregationMatrix::aggregate`] / [`AggregationMatrix::aggregate_rows`]
//!   compute `S·b` for one vector or for a `T × m` table.
//! - [`AggregationMatrix::is_coherent`] checks whether a full-length vector
//!   already satisfies `y_upper = S_agg · y_bottom`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Shape `n × m` with `n ≥ m ≥ 1`.
//! - Bottom `m` rows equal `I_m` exactly.
//! - Entries are finite and non-negative; conventionally 0/1, but general
//!   non-negative weights are accepted.
//! - No row sums to zero.
//!
//! Conventions
//! -----------
//! - Row order defines the series identifiers of the whole crate: upper
//!   levels first (`0..n-m`), bottom series last (`n-m..n`).
//! - Immutable after construction; stores share it through `Arc`.
use crate::hierarchy::errors::{HierarchyError, HierarchyResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, concatenate, s};

/// `AggregationMatrix` — validated `n × m` summation matrix.
///
/// Fields
/// ------
/// - `matrix`: `Array2<f64>`
///   Full `S = [S_agg; I_m]`.
/// - `num_bottom`: `usize`
///   Number of bottom-level series `m` (= number of columns).
///
/// Invariants
/// ----------
/// - See module docs; enforced by [`AggregationMatrix::new`].
///
/// Performance
/// -----------
/// - Validation is `O(n·m)`; aggregation of a `T × m` table is one matrix
///   product.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationMatrix {
    matrix: Array2<f64>,
    num_bottom: usize,
}

impl AggregationMatrix {
    /// Validate a full summation matrix.
    ///
    /// Parameters
    /// ----------
    /// - `matrix`: `Array2<f64>`
    ///   `n × m` matrix whose bottom `m` rows must be the identity.
    ///
    /// Returns
    /// -------
    /// `HierarchyResult<AggregationMatrix>`
    ///
    /// Errors
    /// ------
    /// - `EmptyMatrix` when `n == 0` or `m == 0`.
    /// - `InsufficientRows` when `n < m`.
    /// - `NonFiniteWeight` / `NegativeWeight` for invalid entries.
    /// - `IdentitySuffixViolated` when the bottom block is not `I_m`; the
    ///   first offending entry is reported.
    /// - `DegenerateRow` when an upper row sums to zero.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use rust_hts::hierarchy::AggregationMatrix;
    /// let s = AggregationMatrix::new(array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    /// assert_eq!(s.num_total_series(), 3);
    /// assert_eq!(s.num_upper_series(), 1);
    /// assert_eq!(s.aggregate(array![3.0, 5.0].view()).unwrap(), array![8.0, 3.0, 5.0]);
    /// ```
    pub fn new(matrix: Array2<f64>) -> HierarchyResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows == 0 || cols == 0 {
            return Err(HierarchyError::EmptyMatrix);
        }
        if rows < cols {
            return Err(HierarchyError::InsufficientRows { rows, bottom: cols });
        }

        for ((row, col), &value) in matrix.indexed_iter() {
            if !value.is_finite() {
                return Err(HierarchyError::NonFiniteWeight { row, col, value });
            }
            if value < 0.0 {
                return Err(HierarchyError::NegativeWeight { row, col, value });
            }
        }

        let num_upper = rows - cols;
        let suffix = matrix.slice(s![num_upper.., ..]);
        for ((i, col), &value) in suffix.indexed_iter() {
            let expected = if i == col { 1.0 } else { 0.0 };
            if value != expected {
                return Err(HierarchyError::IdentitySuffixViolated {
                    row: num_upper + i,
                    col,
                    value,
                });
            }
        }

        for (row, upper_row) in matrix.slice(s![..num_upper, ..]).outer_iter().enumerate() {
            if upper_row.sum() == 0.0 {
                return Err(HierarchyError::DegenerateRow { row });
            }
        }

        Ok(AggregationMatrix { matrix, num_bottom: cols })
    }

    /// Build `S = [S_agg; I_m]` from the upper block alone.
    ///
    /// `upper` may have zero rows (a flat collection of bottom series), but
    /// must have at least one column.
    pub fn from_upper(upper: Array2<f64>) -> HierarchyResult<Self> {
        let cols = upper.ncols();
        if cols == 0 {
            return Err(HierarchyError::EmptyMatrix);
        }
        let identity = Array2::<f64>::eye(cols);
        let full = concatenate(Axis(0), &[upper.view(), identity.view()])
            .map_err(|_| HierarchyError::EmptyMatrix)?;
        Self::new(full)
    }

    /// Number of bottom-level series `m`.
    pub fn num_bottom_series(&self) -> usize {
        self.num_bottom
    }

    /// Number of aggregated series `n - m`.
    pub fn num_upper_series(&self) -> usize {
        self.matrix.nrows() - self.num_bottom
    }

    /// Number of series across all levels `n`.
    pub fn num_total_series(&self) -> usize {
        self.matrix.nrows()
    }

    /// Read-only view of the full matrix `S`.
    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// Read-only view of the upper block `S_agg`.
    pub fn upper(&self) -> ArrayView2<'_, f64> {
        self.matrix.slice(s![..self.num_upper_series(), ..])
    }

    /// Apply `S` to one bottom-level vector of length `m`.
    ///
    /// Errors
    /// ------
    /// - `DimensionMismatch` when `bottom.len() != m`.
    pub fn aggregate(&self, bottom: ArrayView1<'_, f64>) -> HierarchyResult<Array1<f64>> {
        let m = self.num_bottom_series();
        if bottom.len() != m {
            return Err(HierarchyError::DimensionMismatch { expected: m, found: bottom.len() });
        }
        Ok(self.matrix.dot(&bottom))
    }

    /// Apply `S` row-wise to a `T × m` table, returning `T × n`.
    ///
    /// Errors
    /// ------
    /// - `DimensionMismatch` when `bottom.ncols() != m`.
    pub fn aggregate_rows(&self, bottom: ArrayView2<'_, f64>) -> HierarchyResult<Array2<f64>> {
        let m = self.num_bottom_series();
        if bottom.ncols() != m {
            return Err(HierarchyError::DimensionMismatch { expected: m, found: bottom.ncols() });
        }
        Ok(bottom.dot(&self.matrix.t()))
    }

    /// Whether a full-length vector satisfies `y_upper = S_agg · y_bottom`
    /// within an absolute tolerance.
    ///
    /// Errors
    /// ------
    /// - `DimensionMismatch` when `y.len() != n`.
    pub fn is_coherent(&self, y: ArrayView1<'_, f64>, tol: f64) -> HierarchyResult<bool> {
        let n = self.num_total_series();
        if y.len() != n {
            return Err(HierarchyError::DimensionMismatch { expected: n, found: y.len() });
        }
        let num_upper = self.num_upper_series();
        let implied = self.upper().dot(&y.slice(s![num_upper..]));
        Ok(implied
            .iter()
            .zip(y.slice(s![..num_upper]).iter())
            .all(|(a, b)| (a - b).abs() <= tol))
    }
}
