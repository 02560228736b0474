//! reconciliation — map incoherent forecasts onto the coherent subspace.
//!
//! Purpose
//! -------
//! Given a summing matrix `S` (`n × m`), project any forecast vector
//! `y ∈ ℝⁿ` onto `col(S) = {S·b : b ∈ ℝᵐ}` so that every upper-level
//! forecast equals the sum of its bottom-level forecasts.
//!
//! Key behaviors
//! -------------
//! - [`ReconciliationMethod`] selects OLS (default), custom WLS, structural
//!   WLS, or bottom-up.
//! - [`projection::compute_projection`] builds the bottom map `P` and the
//!   projection `M = S·P` once.
//! - [`Reconciler`] applies `M` to single vectors, row batches, and
//!   arbitrary-rank sample arrays along a chosen series axis.
//!
//! Invariants & assumptions
//! ------------------------
//! - `M` is idempotent and fixes `col(S)`: reconciling a coherent vector
//!   returns it unchanged.
//! - Under OLS, `‖y − M·y‖₂` is minimal over all coherent vectors.
//!
//! Testing notes
//! -------------
//! - Unit tests pin the closed-form projection of a one-total hierarchy and
//!   every error branch; `tests/proptest_reconciliation.rs` checks
//!   idempotence and minimality on random hierarchies.

pub mod errors;
pub mod method;
pub mod projection;
pub mod reconciler;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ReconcileError, ReconcileResult};
pub use self::method::ReconciliationMethod;
pub use self::projection::{Projection, SINGULARITY_TOL, compute_projection};
pub use self::reconciler::Reconciler;

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::errors::{ReconcileError, ReconcileResult};
    pub use super::method::ReconciliationMethod;
    pub use super::reconciler::Reconciler;
}
