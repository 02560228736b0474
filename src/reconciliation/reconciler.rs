//! reconciliation::reconciler — apply a cached projection to forecast samples.
//!
//! Purpose
//! -------
//! Map incoherent forecast vectors (one value per series, ordered as the
//! rows of `S`) onto the coherent subspace `{S·b}`. The projection matrix is
//! computed once per summing matrix and reused for every vector, batch, and
//! sample array.
//!
//! Key behaviors
//! -------------
//! - [`Reconciler::new`] / [`Reconciler::with_method`] build from a validated
//!   [`AggregationMatrix`]; [`Reconciler::from_raw`] accepts any matrix and
//!   surfaces `SingularMatrix` when `SᵗWS` cannot be inverted.
//! - [`Reconciler::reconcile`] handles one vector, [`Reconciler::reconcile_batch`]
//!   a `k × n` table of row vectors, and [`Reconciler::reconcile_axis`] any
//!   array whose series dimension sits on a given axis (e.g.
//!   `series × sample × horizon`).
//! - Every entry point validates shape and finiteness of the whole input
//!   before writing any output, so there are no partially reconciled results.
//!
//! Invariants & assumptions
//! ------------------------
//! - The cached matrices are never mutated after construction, so a
//!   `Reconciler` is `Send + Sync` and may be shared by reference across
//!   worker threads.
//! - Lanes along the series axis are reconciled independently; values from
//!   different samples or horizon steps never mix.
//!
//! Performance
//! -----------
//! - Construction: one `m × m` symmetric eigendecomposition plus
//!   `O(n²·m)` products.
//! - Application: `O(n²)` per vector, written in place into the output
//!   buffer without per-lane allocations.
use crate::{
    hierarchy::AggregationMatrix,
    reconciliation::{
        errors::{ReconcileError, ReconcileResult},
        method::ReconciliationMethod,
        projection::{Projection, compute_projection},
    },
};
use ndarray::{
    Array, Array1, Array2, ArrayView, ArrayView1, ArrayView2, Axis, Dimension, Zip,
    linalg::general_mat_vec_mul,
};
use tracing::debug;

/// `Reconciler` — cached coherent projection for one hierarchy.
///
/// Fields
/// ------
/// - `method`: [`ReconciliationMethod`]
///   Weighting scheme the matrices were built with.
/// - `summing`: `Array2<f64>`
///   `n × m` summing matrix `S`.
/// - `projection`: [`Projection`]
///   Bottom map `P` (`m × n`) and projection `M = S·P` (`n × n`).
///
/// Notes
/// -----
/// - Build one reconciler per hierarchy and reuse it; construction is the
///   only step that performs linear-algebra factorisations.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciler {
    method: ReconciliationMethod,
    summing: Array2<f64>,
    projection: Projection,
}

impl Reconciler {
    /// OLS reconciler (orthogonal projection) for a validated matrix.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use rust_hts::hierarchy::AggregationMatrix;
    /// # use rust_hts::reconciliation::Reconciler;
    /// let s = AggregationMatrix::new(array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    /// let reconciler = Reconciler::new(&s).unwrap();
    /// let y_hat = reconciler.reconcile(array![10.0, 3.0, 5.0].view()).unwrap();
    /// assert!((y_hat[0] - y_hat[1] - y_hat[2]).abs() < 1e-12);
    /// ```
    pub fn new(aggregation: &AggregationMatrix) -> ReconcileResult<Self> {
        Self::with_method(aggregation, ReconciliationMethod::Ols)
    }

    /// Reconciler for a validated matrix under `method`.
    pub fn with_method(
        aggregation: &AggregationMatrix, method: ReconciliationMethod,
    ) -> ReconcileResult<Self> {
        Self::from_raw(aggregation.matrix(), method)
    }

    /// Reconciler for a matrix that has not been validated as an
    /// [`AggregationMatrix`].
    ///
    /// Errors
    /// ------
    /// - `SingularMatrix` when `S` lacks full column rank.
    /// - Any other error from [`compute_projection`].
    pub fn from_raw(summing: ArrayView2<'_, f64>, method: ReconciliationMethod) -> ReconcileResult<Self> {
        let projection = compute_projection(summing, &method)?;
        debug!(
            method = method.name(),
            total_series = summing.nrows(),
            bottom_series = summing.ncols(),
            "built reconciler projection"
        );
        Ok(Reconciler { method, summing: summing.to_owned(), projection })
    }

    pub fn method(&self) -> &ReconciliationMethod {
        &self.method
    }

    pub fn num_total_series(&self) -> usize {
        self.summing.nrows()
    }

    pub fn num_bottom_series(&self) -> usize {
        self.summing.ncols()
    }

    /// Summing matrix `S` the reconciler was built from.
    pub fn summing_matrix(&self) -> ArrayView2<'_, f64> {
        self.summing.view()
    }

    /// Cached `n × n` projection `M`.
    pub fn projection_matrix(&self) -> ArrayView2<'_, f64> {
        self.projection.projection.view()
    }

    /// Cached `m × n` bottom map `P`.
    pub fn bottom_map(&self) -> ArrayView2<'_, f64> {
        self.projection.bottom_map.view()
    }

    /// Reconcile one forecast vector of length `n`.
    ///
    /// Errors
    /// ------
    /// - `ShapeMismatch` when `y.len() != n`.
    /// - `NonFiniteInput` for the first NaN/±inf entry.
    pub fn reconcile(&self, y: ArrayView1<'_, f64>) -> ReconcileResult<Array1<f64>> {
        self.check_vector(y)?;
        Ok(self.projection.projection.dot(&y))
    }

    /// Coherent bottom-level values `b` such that `reconcile(y) = S·b`.
    pub fn reconcile_bottom(&self, y: ArrayView1<'_, f64>) -> ReconcileResult<Array1<f64>> {
        self.check_vector(y)?;
        Ok(self.projection.bottom_map.dot(&y))
    }

    /// Reconcile a `k × n` table whose rows are forecast vectors.
    ///
    /// Errors
    /// ------
    /// - `ShapeMismatch` when `ys.ncols() != n`.
    /// - `NonFiniteInput` for the first NaN/±inf entry (row-major index).
    pub fn reconcile_batch(&self, ys: ArrayView2<'_, f64>) -> ReconcileResult<Array2<f64>> {
        let n = self.num_total_series();
        if ys.ncols() != n {
            return Err(ReconcileError::ShapeMismatch { expected: n, found: ys.ncols() });
        }
        check_finite(ys.iter())?;
        Ok(ys.dot(&self.projection.projection.t()))
    }

    /// Reconcile every lane of `samples` along `axis`.
    ///
    /// Parameters
    /// ----------
    /// - `samples`: `ArrayView<f64, D>`
    ///   Forecast array of any rank whose extent along `axis` is `n`; e.g.
    ///   `series × sample × horizon` with `axis = Axis(0)`.
    /// - `axis`: `Axis`
    ///   Position of the series dimension.
    ///
    /// Returns
    /// -------
    /// `ReconcileResult<Array<f64, D>>`
    ///   Array with exactly the input shape; each lane along `axis` is the
    ///   reconciliation of the matching input lane.
    ///
    /// Errors
    /// ------
    /// - `AxisOutOfBounds` when `axis.index() >= samples.ndim()`.
    /// - `ShapeMismatch` when `samples.len_of(axis) != n`.
    /// - `NonFiniteInput` for the first NaN/±inf entry (logical order).
    pub fn reconcile_axis<D: Dimension>(
        &self, samples: ArrayView<'_, f64, D>, axis: Axis,
    ) -> ReconcileResult<Array<f64, D>> {
        let ndim = samples.ndim();
        if axis.index() >= ndim {
            return Err(ReconcileError::AxisOutOfBounds { axis: axis.index(), ndim });
        }
        let n = self.num_total_series();
        let found = samples.len_of(axis);
        if found != n {
            return Err(ReconcileError::ShapeMismatch { expected: n, found });
        }
        check_finite(samples.iter())?;

        let projection = &self.projection.projection;
        let mut out = Array::<f64, D>::zeros(samples.raw_dim());
        Zip::from(out.lanes_mut(axis)).and(samples.lanes(axis)).for_each(|mut y_hat, y| {
            general_mat_vec_mul(1.0, projection, &y, 0.0, &mut y_hat);
        });
        debug!(
            vectors = samples.len() / n,
            series = n,
            method = self.method.name(),
            "reconciled forecast samples"
        );
        Ok(out)
    }

    /// Whether `y` already lies in the coherent subspace, i.e.
    /// `max_i |y_i − (M·y)_i| <= tol`.
    pub fn is_coherent(&self, y: ArrayView1<'_, f64>, tol: f64) -> ReconcileResult<bool> {
        let y_hat = self.reconcile(y)?;
        Ok(y.iter().zip(y_hat.iter()).all(|(a, b)| (a - b).abs() <= tol))
    }

    fn check_vector(&self, y: ArrayView1<'_, f64>) -> ReconcileResult<()> {
        let n = self.num_total_series();
        if y.len() != n {
            return Err(ReconcileError::ShapeMismatch { expected: n, found: y.len() });
        }
        check_finite(y.iter())
    }
}

fn check_finite<'a, I: Iterator<Item = &'a f64>>(values: I) -> ReconcileResult<()> {
    for (index, &value) in values.enumerate() {
        if !value.is_finite() {
            return Err(ReconcileError::NonFiniteInput { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array3, array};
    use std::sync::Arc;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The one-total example under OLS, structural WLS, and bottom-up.
    // - Idempotence on coherent inputs.
    // - Batch and axis-wise reconciliation: shape preservation and lane
    //   independence.
    // - Error paths (shape, axis, non-finite, singular raw matrix).
    // - Read-only sharing across threads.
    //
    // They intentionally DO NOT cover:
    // - Minimality against an independent least-squares solve; that lives
    //   in the property tests under `tests/`.
    // -------------------------------------------------------------------------

    const TOL: f64 = 1e-10;

    fn total_of_two() -> AggregationMatrix {
        AggregationMatrix::new(array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]).unwrap()
    }

    fn assert_vec_close(a: &Array1<f64>, b: &Array1<f64>) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = TOL);
        }
    }

    #[test]
    // Purpose
    // -------
    // OLS reconciliation of `[10, 3, 5]` is the orthogonal projection.
    //
    // Given
    // -----
    // - `S = [[1,1],[1,0],[0,1]]`, `y = [10, 3, 5]`.
    //
    // Expect
    // ------
    // - `b = (SᵗS)⁻¹Sᵗy = [11/3, 17/3]`, `ŷ = [28/3, 11/3, 17/3]`.
    fn ols_reconciles_worked_example() {
        let reconciler = Reconciler::new(&total_of_two()).unwrap();
        let y = array![10.0, 3.0, 5.0];
        let y_hat = reconciler.reconcile(y.view()).unwrap();
        assert_vec_close(&y_hat, &array![28.0 / 3.0, 11.0 / 3.0, 17.0 / 3.0]);
        let b = reconciler.reconcile_bottom(y.view()).unwrap();
        assert_vec_close(&b, &array![11.0 / 3.0, 17.0 / 3.0]);
    }

    #[test]
    // Purpose
    // -------
    // Bottom-up keeps the bottom forecasts and re-derives the total.
    fn bottom_up_reconciles_worked_example() {
        let reconciler =
            Reconciler::with_method(&total_of_two(), ReconciliationMethod::BottomUp).unwrap();
        let y_hat = reconciler.reconcile(array![10.0, 3.0, 5.0].view()).unwrap();
        assert_vec_close(&y_hat, &array![8.0, 3.0, 5.0]);
    }

    #[test]
    // Purpose
    // -------
    // Structural weights `[1/2, 1, 1]` pull the total less strongly.
    //
    // Expect
    // ------
    // - `SᵗWS = [[1.5, 0.5], [0.5, 1.5]]`, `SᵗWy = [8, 10]`, `b = [3.5, 5.5]`,
    //   `ŷ = [9, 3.5, 5.5]`.
    fn structural_reconciles_worked_example() {
        let reconciler =
            Reconciler::with_method(&total_of_two(), ReconciliationMethod::Structural).unwrap();
        let y_hat = reconciler.reconcile(array![10.0, 3.0, 5.0].view()).unwrap();
        assert_vec_close(&y_hat, &array![9.0, 3.5, 5.5]);
    }

    #[test]
    // Purpose
    // -------
    // A coherent vector is a fixed point under every method.
    fn coherent_vectors_are_unchanged() {
        let coherent = array![8.0, 3.0, 5.0];
        for method in [
            ReconciliationMethod::Ols,
            ReconciliationMethod::Structural,
            ReconciliationMethod::BottomUp,
        ] {
            let reconciler = Reconciler::with_method(&total_of_two(), method).unwrap();
            assert_vec_close(&reconciler.reconcile(coherent.view()).unwrap(), &coherent);
            assert!(reconciler.is_coherent(coherent.view(), 1e-9).unwrap());
            assert!(!reconciler.is_coherent(array![10.0, 3.0, 5.0].view(), 1e-9).unwrap());
        }
    }

    #[test]
    // Purpose
    // -------
    // A batch of 100 samples × 24 steps keeps its shape and each lane equals
    // the single-vector reconciliation of the matching input lane.
    fn reconcile_axis_preserves_shape_without_mixing_lanes() {
        let reconciler = Reconciler::new(&total_of_two()).unwrap();
        let samples = Array3::from_shape_fn((3, 100, 24), |(i, j, k)| {
            (i as f64 + 1.0) * 10.0 + (j as f64) * 0.5 - (k as f64) * 0.25
        });

        let out = reconciler.reconcile_axis(samples.view(), Axis(0)).unwrap();
        assert_eq!(out.shape(), samples.shape());

        for j in [0, 17, 99] {
            for k in [0, 5, 23] {
                let lane = samples.slice(ndarray::s![.., j, k]);
                let expected = reconciler.reconcile(lane).unwrap();
                assert_vec_close(&out.slice(ndarray::s![.., j, k]).to_owned(), &expected);
                assert_relative_eq!(out[[0, j, k]], out[[1, j, k]] + out[[2, j, k]], epsilon = TOL);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The series axis may sit anywhere; the last-axis layout matches the
    // row-wise batch API.
    fn reconcile_axis_last_axis_matches_batch() {
        let reconciler = Reconciler::new(&total_of_two()).unwrap();
        let ys = array![[10.0, 3.0, 5.0], [1.0, 1.0, 1.0], [0.0, 2.0, -2.0]];
        let by_axis = reconciler.reconcile_axis(ys.view(), Axis(1)).unwrap();
        let by_batch = reconciler.reconcile_batch(ys.view()).unwrap();
        for (a, b) in by_axis.iter().zip(by_batch.iter()) {
            assert_relative_eq!(*a, *b, epsilon = TOL);
        }
    }

    #[test]
    fn shape_axis_and_finiteness_errors() {
        let reconciler = Reconciler::new(&total_of_two()).unwrap();
        assert_eq!(
            reconciler.reconcile(array![1.0, 2.0].view()),
            Err(ReconcileError::ShapeMismatch { expected: 3, found: 2 })
        );
        let samples = Array3::<f64>::zeros((4, 2, 2));
        assert_eq!(
            reconciler.reconcile_axis(samples.view(), Axis(0)),
            Err(ReconcileError::ShapeMismatch { expected: 3, found: 4 })
        );
        assert_eq!(
            reconciler.reconcile_axis(samples.view(), Axis(3)),
            Err(ReconcileError::AxisOutOfBounds { axis: 3, ndim: 3 })
        );
        let mut bad = Array2::<f64>::ones((2, 3));
        bad[[1, 2]] = f64::NAN;
        assert!(matches!(
            reconciler.reconcile_batch(bad.view()),
            Err(ReconcileError::NonFiniteInput { index: 5, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A raw matrix that bypasses validation and lacks full column rank is
    // rejected as singular.
    fn from_raw_reports_singular_matrix() {
        let degenerate = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            Reconciler::from_raw(degenerate.view(), ReconciliationMethod::Ols),
            Err(ReconcileError::SingularMatrix { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Bottom-up on a raw rank-deficient matrix fails the same way as the
    // least-squares methods instead of yielding a non-projection.
    fn from_raw_bottom_up_reports_singular_matrix() {
        let degenerate = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            Reconciler::from_raw(degenerate.view(), ReconciliationMethod::BottomUp),
            Err(ReconcileError::SingularMatrix { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A validated hierarchy with very large aggregation weights reconciles.
    //
    // Given
    // -----
    // - `S = [[1e6,1e6],[1,0],[0,1]]`, `y = [10, 3, 5]`.
    // - Minimizing `(1e6·(b₁+b₂) − 10)² + (b₁−3)² + (b₂−5)²` gives
    //   `b₁ − b₂ = −2` and `b₁ + b₂ ≈ 1e-5`.
    //
    // Expect
    // ------
    // - Construction succeeds for the structural and bottom-up methods too.
    // - `ŷ ≈ [10, −1, 1]`.
    fn large_aggregation_weights_reconcile() {
        let s = AggregationMatrix::new(array![[1e6, 1e6], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        for method in [ReconciliationMethod::Structural, ReconciliationMethod::BottomUp] {
            assert!(Reconciler::with_method(&s, method).is_ok());
        }

        let reconciler = Reconciler::new(&s).unwrap();
        let y = array![10.0, 3.0, 5.0];
        let y_hat = reconciler.reconcile(y.view()).unwrap();
        assert_relative_eq!(y_hat[0], 10.0, epsilon = 1e-3);
        assert_relative_eq!(y_hat[1], -1.0, epsilon = 1e-3);
        assert_relative_eq!(y_hat[2], 1.0, epsilon = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // One reconciler can be shared read-only by several threads.
    fn reconciler_is_shareable_across_threads() {
        let reconciler = Arc::new(Reconciler::new(&total_of_two()).unwrap());
        let results: Vec<Array1<f64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|k| {
                    let reconciler = Arc::clone(&reconciler);
                    scope.spawn(move || {
                        let y = array![10.0 + k as f64, 3.0, 5.0];
                        reconciler.reconcile(y.view()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (k, y_hat) in results.iter().enumerate() {
            let expected = reconciler.reconcile(array![10.0 + k as f64, 3.0, 5.0].view()).unwrap();
            assert_vec_close(y_hat, &expected);
        }
    }
}
