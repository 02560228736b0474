//! hierarchy — aggregation structure, regular time indices, and coherent
//! historical series.
//!
//! Purpose
//! -------
//! Hold everything needed to describe a hierarchical (or grouped) collection
//! of time series before any forecasting happens: the summation matrix `S`,
//! the shared time index, and a store that derives every aggregate series
//! from the bottom level so historical data is coherent by construction.
//!
//! Key behaviors
//! -------------
//! - [`AggregationMatrix`] validates `S = [S_agg; I_m]` (identity suffix,
//!   non-degenerate rows, finite non-negative weights).
//! - [`TimeIndex`] and [`Frequency`] enforce sorted, duplicate-free,
//!   regularly spaced timestamps and render pandas-style frequency aliases.
//! - [`HierarchicalSeriesStore`] derives `ts_at_all_levels`, slices by time
//!   into new stores, and flattens into the exchange dataset.
//! - [`HierarchyError`] / [`HierarchyResult`] report every validation
//!   failure at construction time.
//!
//! Invariants & assumptions
//! ------------------------
//! - All instances are immutable after construction; slicing returns new
//!   values.
//! - Series identifiers are row positions of `S`: upper levels first, bottom
//!   level last.
//!
//! Downstream usage
//! ----------------
//! - Build an [`AggregationMatrix`], a [`TimeIndex`], and a
//!   [`HierarchicalSeriesStore`]; hand the store to
//!   [`crate::dataset::DatasetAdapter`] for exchange with an external
//!   estimator, and build a [`crate::reconciliation::Reconciler`] from the
//!   same matrix.
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover every error branch, aggregation
//!   arithmetic, slicing, and the partition property.

pub mod aggregation;
pub mod errors;
pub mod store;
pub mod time_index;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::aggregation::AggregationMatrix;
pub use self::errors::{HierarchyError, HierarchyResult};
pub use self::store::HierarchicalSeriesStore;
pub use self::time_index::{Frequency, TimeIndex};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::aggregation::AggregationMatrix;
    pub use super::errors::{HierarchyError, HierarchyResult};
    pub use super::store::HierarchicalSeriesStore;
    pub use super::time_index::{Frequency, TimeIndex};
}
