//! reconciliation::projection — cached linear maps onto the coherent subspace.
//!
//! Purpose
//! -------
//! Compute, once per summing matrix `S` and method, the bottom map `P`
//! (`m × n`, `b = P·y`) and the projection `M = S·P` (`n × n`, `ŷ = M·y`).
//! Reconcilers apply these matrices to every forecast sample without
//! recomputing them.
//!
//! Key behaviors
//! -------------
//! - Copy `S` from `ndarray` into `nalgebra::DMatrix`, form the normal
//!   matrix `G = SᵗWS`, and invert it through a symmetric eigendecomposition.
//! - Declare `G` singular when its smallest eigenvalue is at most
//!   `ε · max(n, m) · λ_max`, the rank cutoff used for pseudo-inverses
//!   ([`SINGULARITY_TOL`] is `ε`).
//! - Build `P = [0 | I_m]` directly for bottom-up reconciliation, after the
//!   same rank check and a check that the last `m` rows of `S` are `I_m`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `S` is `n × m` with `n ≥ m ≥ 1` and finite entries (checked here, since
//!   raw matrices may bypass [`crate::hierarchy::AggregationMatrix`]).
//! - WLS weights are finite and strictly positive with length `n`.
//! - On success `M` is idempotent (`M² = M`) and `M·S = S`.
//!
//! Conventions
//! -----------
//! - No explicit `try_inverse`; the inverse of `G` is `Q Λ⁻¹ Qᵗ` from
//!   `symmetric_eigen`, which also yields the eigenvalue used for the
//!   singularity check.
use crate::reconciliation::{
    errors::{ReconcileError, ReconcileResult},
    method::ReconciliationMethod,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2, s};

/// Machine-precision factor of the eigenvalue cutoff; scaled by
/// `max(n, m) · λ_max` before comparison.
pub const SINGULARITY_TOL: f64 = f64::EPSILON;

/// Bottom map and projection for one `(S, method)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// `m × n`; maps a full forecast vector to coherent bottom-level values.
    pub bottom_map: Array2<f64>,
    /// `n × n`; maps a full forecast vector to its reconciled counterpart.
    pub projection: Array2<f64>,
}

/// Compute the cached matrices for `summing` under `method`.
///
/// Parameters
/// ----------
/// - `summing`: `ArrayView2<f64>`
///   `n × m` summing matrix. Need not have passed
///   [`crate::hierarchy::AggregationMatrix`] validation.
/// - `method`: `&ReconciliationMethod`
///   Weighting scheme (see [`ReconciliationMethod`]).
///
/// Errors
/// ------
/// - `EmptyMatrix`, `NonFiniteMatrix`, `InsufficientRows` for malformed `S`.
/// - `WeightLengthMismatch`, `InvalidWeight` for bad WLS weights.
/// - `DegenerateRow` for structural weights on a zero row.
/// - `SingularMatrix` when `SᵗWS` is not invertible (every method).
/// - `MissingIdentityBlock` for bottom-up on a full-rank `S` whose last `m`
///   rows are not `I_m`.
pub fn compute_projection(
    summing: ArrayView2<'_, f64>, method: &ReconciliationMethod,
) -> ReconcileResult<Projection> {
    let (n, m) = summing.dim();
    if n == 0 || m == 0 {
        return Err(ReconcileError::EmptyMatrix);
    }
    if n < m {
        return Err(ReconcileError::InsufficientRows { rows: n, bottom: m });
    }
    for ((row, col), &value) in summing.indexed_iter() {
        if !value.is_finite() {
            return Err(ReconcileError::NonFiniteMatrix { row, col, value });
        }
    }

    let bottom_map = match method {
        ReconciliationMethod::BottomUp => {
            invert_gram(summing, &Array1::ones(n))?;
            check_identity_suffix(summing)?;
            bottom_up_map(n, m)
        }
        _ => {
            let weights = resolve_weights(summing, method)?;
            weighted_least_squares_map(summing, &weights)?
        }
    };
    let projection = summing.dot(&bottom_map);
    Ok(Projection { bottom_map, projection })
}

/// First entry of the last `m` rows of `S` that differs from `I_m`.
fn check_identity_suffix(summing: ArrayView2<'_, f64>) -> ReconcileResult<()> {
    let (n, m) = summing.dim();
    let suffix = summing.slice(s![n - m.., ..]);
    for ((i, col), &value) in suffix.indexed_iter() {
        let expected = if i == col { 1.0 } else { 0.0 };
        if value != expected {
            return Err(ReconcileError::MissingIdentityBlock { row: n - m + i, col, value });
        }
    }
    Ok(())
}

/// `P = [0 | I_m]`, selecting the last `m` entries of a forecast vector.
fn bottom_up_map(n: usize, m: usize) -> Array2<f64> {
    let mut map = Array2::<f64>::zeros((m, n));
    map.slice_mut(s![.., n - m..]).assign(&Array2::<f64>::eye(m));
    map
}

/// Diagonal of `W` for the least-squares methods.
fn resolve_weights(
    summing: ArrayView2<'_, f64>, method: &ReconciliationMethod,
) -> ReconcileResult<Array1<f64>> {
    let n = summing.nrows();
    match method {
        ReconciliationMethod::Ols | ReconciliationMethod::BottomUp => Ok(Array1::ones(n)),
        ReconciliationMethod::Wls(weights) => {
            if weights.len() != n {
                return Err(ReconcileError::WeightLengthMismatch {
                    expected: n,
                    found: weights.len(),
                });
            }
            for (index, &value) in weights.iter().enumerate() {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ReconcileError::InvalidWeight { index, value });
                }
            }
            Ok(weights.clone())
        }
        ReconciliationMethod::Structural => {
            let mut weights = Array1::<f64>::zeros(n);
            for (row, values) in summing.outer_iter().enumerate() {
                let total = values.sum();
                if total <= 0.0 {
                    return Err(ReconcileError::DegenerateRow { row });
                }
                weights[row] = 1.0 / total;
            }
            Ok(weights)
        }
    }
}

/// `(SᵗWS)⁻¹` via symmetric eigendecomposition, or `SingularMatrix` when the
/// smallest eigenvalue falls under the rank cutoff.
fn invert_gram(
    summing: ArrayView2<'_, f64>, weights: &Array1<f64>,
) -> ReconcileResult<DMatrix<f64>> {
    let (n, m) = summing.dim();
    let s_nalg = DMatrix::<f64>::from_fn(n, m, |i, j| summing[[i, j]]);
    let ws_nalg = DMatrix::<f64>::from_fn(n, m, |i, j| weights[i] * summing[[i, j]]);

    let gram = s_nalg.transpose() * &ws_nalg;
    let eigen_decomp = gram.symmetric_eigen();
    let eigenvals = eigen_decomp.eigenvalues;
    let max_lambda = eigenvals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_lambda = eigenvals.iter().cloned().fold(f64::INFINITY, f64::min);
    let cutoff = SINGULARITY_TOL * n.max(m) as f64 * max_lambda;
    if !(max_lambda > 0.0) || min_lambda <= cutoff {
        return Err(ReconcileError::SingularMatrix { min_eigenvalue: min_lambda });
    }

    let q = eigen_decomp.eigenvectors;
    let inv_diag = DMatrix::from_diagonal(&eigenvals.map(|lambda| 1.0 / lambda));
    Ok(&q * inv_diag * q.transpose())
}

/// `P = (SᵗWS)⁻¹ SᵗW`.
fn weighted_least_squares_map(
    summing: ArrayView2<'_, f64>, weights: &Array1<f64>,
) -> ReconcileResult<Array2<f64>> {
    let (n, m) = summing.dim();
    let gram_inv = invert_gram(summing, weights)?;
    let ws_nalg = DMatrix::<f64>::from_fn(n, m, |i, j| weights[i] * summing[[i, j]]);
    let map = gram_inv * ws_nalg.transpose();

    Ok(Array2::from_shape_fn((m, n), |(i, j)| map[(i, j)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Closed-form projections for a one-total, two-bottom hierarchy.
    // - Idempotence and `M·S = S` for every method.
    // - Singularity and malformed-input detection on raw matrices.
    // -------------------------------------------------------------------------

    const TOL: f64 = 1e-10;

    fn total_of_two() -> Array2<f64> {
        array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]
    }

    fn assert_matrices_close(a: &Array2<f64>, b: &Array2<f64>) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = TOL);
        }
    }

    #[test]
    // Purpose
    // -------
    // The OLS projection matches `S (SᵗS)⁻¹ Sᵗ` computed by hand.
    //
    // Given
    // -----
    // - `S = [[1,1],[1,0],[0,1]]`, so `SᵗS = [[2,1],[1,2]]` and
    //   `(SᵗS)⁻¹ = (1/3)[[2,-1],[-1,2]]`.
    //
    // Expect
    // ------
    // - `M = (1/3)[[2,1,1],[1,2,-1],[1,-1,2]]`.
    fn ols_projection_matches_closed_form() {
        let proj = compute_projection(total_of_two().view(), &ReconciliationMethod::Ols).unwrap();
        let expected = array![[2.0, 1.0, 1.0], [1.0, 2.0, -1.0], [1.0, -1.0, 2.0]] / 3.0;
        assert_matrices_close(&proj.projection, &expected);
    }

    #[test]
    // Purpose
    // -------
    // Every method yields an idempotent map that fixes the columns of `S`.
    fn all_methods_are_idempotent_and_fix_columns() {
        let s_mat = array![
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let methods = [
            ReconciliationMethod::Ols,
            ReconciliationMethod::Structural,
            ReconciliationMethod::BottomUp,
            ReconciliationMethod::Wls(array![0.2, 0.5, 1.0, 2.0, 3.0]),
        ];
        for method in methods.iter() {
            let proj = compute_projection(s_mat.view(), method).unwrap();
            let m2 = proj.projection.dot(&proj.projection);
            assert_matrices_close(&m2, &proj.projection);
            assert_matrices_close(&proj.projection.dot(&s_mat), &s_mat);
            assert_matrices_close(&proj.bottom_map.dot(&s_mat), &Array2::eye(3));
        }
    }

    #[test]
    fn bottom_up_map_selects_bottom_rows() {
        let proj =
            compute_projection(total_of_two().view(), &ReconciliationMethod::BottomUp).unwrap();
        assert_eq!(proj.bottom_map, array![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    // Purpose
    // -------
    // A raw matrix without full column rank is reported as singular.
    fn rank_deficient_matrix_is_singular() {
        let s_mat = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            compute_projection(s_mat.view(), &ReconciliationMethod::Ols),
            Err(ReconcileError::SingularMatrix { .. })
        ));
        let zeros = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            compute_projection(zeros.view(), &ReconciliationMethod::Ols),
            Err(ReconcileError::SingularMatrix { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Bottom-up runs the same rank check as the least-squares methods and
    // needs an identity bottom block to be a projection.
    //
    // Given
    // -----
    // - A rank-one raw matrix.
    // - A full-rank raw matrix whose last two rows are `[[2,0],[0,1]]`.
    //
    // Expect
    // ------
    // - `SingularMatrix` for the first, `MissingIdentityBlock` at `(1, 0)`
    //   for the second.
    fn bottom_up_checks_rank_and_identity_block() {
        let s_mat = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            compute_projection(s_mat.view(), &ReconciliationMethod::BottomUp),
            Err(ReconcileError::SingularMatrix { .. })
        ));
        let scaled = array![[1.0, 1.0], [2.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            compute_projection(scaled.view(), &ReconciliationMethod::BottomUp),
            Err(ReconcileError::MissingIdentityBlock { row: 1, col: 0, value: 2.0 })
        );
    }

    #[test]
    // Purpose
    // -------
    // The rank cutoff scales with machine precision, so large but valid
    // aggregation weights stay invertible.
    //
    // Given
    // -----
    // - `S = [[1e6,1e6],[1,0],[0,1]]`: `SᵗS` has eigenvalues `2e12 + 1` and `1`.
    //
    // Expect
    // ------
    // - A projection that fixes the columns of `S`.
    fn large_weights_are_not_singular() {
        let s_mat = array![[1e6, 1e6], [1.0, 0.0], [0.0, 1.0]];
        let proj = compute_projection(s_mat.view(), &ReconciliationMethod::Ols).unwrap();
        let fixed = proj.bottom_map.dot(&s_mat);
        for (x, y) in fixed.iter().zip(Array2::<f64>::eye(2).iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let empty = Array2::<f64>::zeros((0, 0));
        assert_eq!(
            compute_projection(empty.view(), &ReconciliationMethod::Ols),
            Err(ReconcileError::EmptyMatrix)
        );
        let wide = Array2::<f64>::zeros((1, 2));
        assert_eq!(
            compute_projection(wide.view(), &ReconciliationMethod::Ols),
            Err(ReconcileError::InsufficientRows { rows: 1, bottom: 2 })
        );
        let short_weights = ReconciliationMethod::Wls(array![1.0, 1.0]);
        assert_eq!(
            compute_projection(total_of_two().view(), &short_weights),
            Err(ReconcileError::WeightLengthMismatch { expected: 3, found: 2 })
        );
        let bad_weights = ReconciliationMethod::Wls(array![1.0, 0.0, 1.0]);
        assert_eq!(
            compute_projection(total_of_two().view(), &bad_weights),
            Err(ReconcileError::InvalidWeight { index: 1, value: 0.0 })
        );
        let zero_row = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            compute_projection(zero_row.view(), &ReconciliationMethod::Structural),
            Err(ReconcileError::DegenerateRow { row: 0 })
        );
    }
}
