//! hierarchy::store — bottom-level series plus their derived upper levels.
//!
//! Purpose
//! -------
//! Own the historical data of one hierarchy: a `T × m` bottom-level table on
//! a regular [`TimeIndex`], the [`AggregationMatrix`] describing the
//! hierarchy, and the derived `T × n` table of every level. The derived
//! table is computed once at construction and never mutated.
//!
//! Key behaviors
//! -------------
//! - [`HierarchicalSeriesStore::new`] validates shapes and finiteness, then
//!   computes `ts_at_all_levels = bottom · Sᵗ`.
//! - [`HierarchicalSeriesStore::slice_by_time`] accepts any
//!   `RangeBounds<NaiveDateTime>` and returns a new store re-derived on the
//!   subset; [`HierarchicalSeriesStore::split_at`] and
//!   [`HierarchicalSeriesStore::train_test_split`] build train/withheld pairs
//!   that partition the original index.
//! - [`HierarchicalSeriesStore::to_exchange_format`] flattens every level
//!   into `(series_id, timestamp, value, freq)` records.
//!
//! Invariants & assumptions
//! ------------------------
//! - `bottom.nrows() == index.len()` and `bottom.ncols() == S.num_bottom_series()`.
//! - Every bottom-level value is finite, so every derived value is finite.
//! - For each row `t`, the first `n - m` columns of `ts_at_all_levels`
//!   equal `S_agg · bottom[t, :]` and the last `m` columns equal
//!   `bottom[t, :]` (coherency by construction).
//!
//! Conventions
//! -----------
//! - Column `i` of `ts_at_all_levels` is row `i` of `S`; series identifiers
//!   in the exchange dataset are these column positions.
//! - Slices share the aggregation matrix through an `Arc` and inherit the
//!   parent frequency.
use crate::{
    dataset::exchange::ExchangeDataset,
    hierarchy::{
        aggregation::AggregationMatrix,
        errors::{HierarchyError, HierarchyResult},
        time_index::{Frequency, TimeIndex},
    },
};
use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView1, ArrayView2, s};
use std::ops::{Range, RangeBounds};
use std::sync::Arc;
use tracing::debug;

/// `HierarchicalSeriesStore` — coherent historical series at every level.
///
/// Fields
/// ------
/// - `index`: [`TimeIndex`]
///   Shared row index.
/// - `bottom`: `Array2<f64>`
///   `T × m` bottom-level values.
/// - `aggregation`: `Arc<AggregationMatrix>`
///   Hierarchy structure, shared with slices.
/// - `all_levels`: `Array2<f64>`
///   `T × n` derived table, upper levels first.
///
/// Performance
/// -----------
/// - Construction is one `O(T·n·m)` matrix product plus an `O(T·m)`
///   finiteness scan. Accessors return views and never copy.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalSeriesStore {
    index: TimeIndex,
    bottom: Array2<f64>,
    aggregation: Arc<AggregationMatrix>,
    all_levels: Array2<f64>,
}

impl HierarchicalSeriesStore {
    /// Validate the bottom-level table and derive every level.
    ///
    /// Parameters
    /// ----------
    /// - `index`: [`TimeIndex`]
    ///   Regular timestamps; one per row of `bottom`.
    /// - `bottom`: `Array2<f64>`
    ///   `T × m` bottom-level values, columns ordered as the bottom rows of `S`.
    /// - `aggregation`: `impl Into<Arc<AggregationMatrix>>`
    ///   Hierarchy structure; pass an `Arc` to share it between stores.
    ///
    /// Errors
    /// ------
    /// - `DimensionMismatch` when `bottom.ncols() != S.num_bottom_series()`.
    /// - `TimestampCountMismatch` when `bottom.nrows() != index.len()`.
    /// - `NonFiniteValue` for the first NaN/±inf entry (row-major order).
    ///
    /// Frequency errors (duplicates, gaps) are raised by [`TimeIndex`]
    /// before a store can be built.
    pub fn new(
        index: TimeIndex, bottom: Array2<f64>, aggregation: impl Into<Arc<AggregationMatrix>>,
    ) -> HierarchyResult<Self> {
        let aggregation = aggregation.into();
        let expected = aggregation.num_bottom_series();
        if bottom.ncols() != expected {
            return Err(HierarchyError::DimensionMismatch { expected, found: bottom.ncols() });
        }
        if bottom.nrows() != index.len() {
            return Err(HierarchyError::TimestampCountMismatch {
                timestamps: index.len(),
                rows: bottom.nrows(),
            });
        }
        for ((row, col), &value) in bottom.indexed_iter() {
            if !value.is_finite() {
                return Err(HierarchyError::NonFiniteValue { row, col, value });
            }
        }

        let all_levels = aggregation.aggregate_rows(bottom.view())?;
        debug!(
            timestamps = index.len(),
            bottom_series = expected,
            total_series = aggregation.num_total_series(),
            "built hierarchical series store"
        );
        Ok(HierarchicalSeriesStore { index, bottom, aggregation, all_levels })
    }

    /// `T × n` table of every level, upper levels first.
    pub fn ts_at_all_levels(&self) -> ArrayView2<'_, f64> {
        self.all_levels.view()
    }

    /// `T × m` bottom-level table as supplied.
    pub fn ts_at_bottom_level(&self) -> ArrayView2<'_, f64> {
        self.bottom.view()
    }

    /// One series across time, by its row position in `S`.
    ///
    /// Returns `None` when `series_id >= num_ts()`.
    pub fn series(&self, series_id: usize) -> Option<ArrayView1<'_, f64>> {
        (series_id < self.num_ts()).then(|| self.all_levels.column(series_id))
    }

    pub fn aggregation(&self) -> &AggregationMatrix {
        &self.aggregation
    }

    /// Shared handle to the aggregation matrix.
    pub fn aggregation_arc(&self) -> Arc<AggregationMatrix> {
        Arc::clone(&self.aggregation)
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    /// Number of series across all levels.
    pub fn num_ts(&self) -> usize {
        self.aggregation.num_total_series()
    }

    pub fn num_bottom_ts(&self) -> usize {
        self.aggregation.num_bottom_series()
    }

    /// Number of timestamps.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sampling frequency of the index.
    ///
    /// Errors
    /// ------
    /// - `InsufficientTimestamps` for a one-row store whose frequency was
    ///   neither declared nor inherited.
    pub fn freq(&self) -> HierarchyResult<Frequency> {
        self.index.freq()
    }

    /// New store restricted to the timestamps inside `range`.
    ///
    /// `a..b` is half-open, `a..=b` closed, and `..b` / `a..` open-ended, so
    /// `slice_by_time(..t)` and `slice_by_time(t..)` partition the index.
    ///
    /// Errors
    /// ------
    /// - `EmptySlice` when no timestamp falls inside `range`.
    pub fn slice_by_time<R: RangeBounds<NaiveDateTime>>(&self, range: R) -> HierarchyResult<Self> {
        let rows = self.index.positions(&range);
        self.slice_rows(rows)
    }

    /// Split into `(..boundary, boundary..)`.
    ///
    /// Errors
    /// ------
    /// - `EmptySlice` when either side would be empty.
    pub fn split_at(&self, boundary: NaiveDateTime) -> HierarchyResult<(Self, Self)> {
        let train = self.slice_by_time(..boundary)?;
        let withheld = self.slice_by_time(boundary..)?;
        Ok((train, withheld))
    }

    /// Withhold the last `withheld` steps, e.g. one forecast horizon.
    ///
    /// Errors
    /// ------
    /// - `InvalidSplit` unless `0 < withheld < len()`.
    pub fn train_test_split(&self, withheld: usize) -> HierarchyResult<(Self, Self)> {
        let len = self.len();
        if withheld == 0 || withheld >= len {
            return Err(HierarchyError::InvalidSplit { withheld, len });
        }
        let boundary = len - withheld;
        Ok((self.slice_rows(0..boundary)?, self.slice_rows(boundary..len)?))
    }

    /// Flatten every level into exchange records, series-major.
    ///
    /// Errors
    /// ------
    /// - `InsufficientTimestamps` when the frequency is unknown.
    pub fn to_exchange_format(&self) -> HierarchyResult<ExchangeDataset> {
        let freq = self.freq()?;
        Ok(ExchangeDataset::from_table(self.index.timestamps(), self.all_levels.view(), freq))
    }

    fn slice_rows(&self, rows: Range<usize>) -> HierarchyResult<Self> {
        let index = self.index.slice(rows.clone())?;
        let bottom = self.bottom.slice(s![rows.clone(), ..]).to_owned();
        debug!(start = rows.start, end = rows.end, "sliced hierarchical series store");
        HierarchicalSeriesStore::new(index, bottom, Arc::clone(&self.aggregation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Derivation of all levels and coherency by construction.
    // - Each rejection branch of `HierarchicalSeriesStore::new`.
    // - Time slicing, split helpers, and the partition property.
    // - Exchange-format flattening order and identifiers.
    // -------------------------------------------------------------------------

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn hourly_index(len: usize) -> TimeIndex {
        let freq = Frequency::new(Duration::hours(1)).unwrap();
        TimeIndex::regular(start(), freq, len).unwrap()
    }

    fn total_of_two() -> AggregationMatrix {
        AggregationMatrix::new(array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]).unwrap()
    }

    fn make_store() -> HierarchicalSeriesStore {
        let bottom = array![[3.0, 5.0], [1.0, 2.0], [0.5, 0.5], [4.0, 0.0], [2.0, 2.0]];
        HierarchicalSeriesStore::new(hourly_index(5), bottom, total_of_two()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The worked example: bottom `[3, 5]` under one total gives `[8, 3, 5]`.
    fn ts_at_all_levels_sums_bottom_series() {
        let store = make_store();
        assert_eq!(store.num_ts(), 3);
        assert_eq!(store.ts_at_all_levels().dim(), (5, 3));
        assert_eq!(store.ts_at_all_levels().row(0), array![8.0, 3.0, 5.0]);
        assert_eq!(store.series(0).unwrap(), array![8.0, 3.0, 1.0, 4.0, 4.0]);
        assert!(store.series(3).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Every historical row is coherent under `S`.
    fn historical_rows_are_coherent() {
        let store = make_store();
        for row in store.ts_at_all_levels().outer_iter() {
            assert!(store.aggregation().is_coherent(row, 1e-12).unwrap());
        }
    }

    #[test]
    fn new_rejects_dimension_and_length_mismatches() {
        let wide = Array2::zeros((5, 3));
        assert_eq!(
            HierarchicalSeriesStore::new(hourly_index(5), wide, total_of_two()),
            Err(HierarchyError::DimensionMismatch { expected: 2, found: 3 })
        );
        let short = Array2::zeros((4, 2));
        assert_eq!(
            HierarchicalSeriesStore::new(hourly_index(5), short, total_of_two()),
            Err(HierarchyError::TimestampCountMismatch { timestamps: 5, rows: 4 })
        );
    }

    #[test]
    fn new_rejects_non_finite_values() {
        let bottom = array![[1.0, 2.0], [f64::INFINITY, 0.0]];
        assert!(matches!(
            HierarchicalSeriesStore::new(hourly_index(2), bottom, total_of_two()),
            Err(HierarchyError::NonFiniteValue { row: 1, col: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Splitting at a boundary yields disjoint pieces whose union is the
    // original index, each re-derived and sharing `S`.
    fn split_at_partitions_index() {
        let store = make_store();
        let boundary = start() + Duration::hours(3);
        let (train, withheld) = store.split_at(boundary).unwrap();

        assert_eq!(train.len(), 3);
        assert_eq!(withheld.len(), 2);
        let mut union: Vec<_> = train.index().timestamps().to_vec();
        union.extend_from_slice(withheld.index().timestamps());
        assert_eq!(union, store.index().timestamps());
        assert_eq!(withheld.ts_at_all_levels().row(0), array![4.0, 4.0, 0.0]);
        assert!(Arc::ptr_eq(&train.aggregation_arc(), &store.aggregation_arc()));
    }

    #[test]
    fn slice_by_time_supports_closed_ranges_and_rejects_empty() {
        let store = make_store();
        let closed = store.slice_by_time(start()..=start() + Duration::hours(1)).unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(
            store.slice_by_time(start() + Duration::hours(10)..),
            Err(HierarchyError::EmptySlice)
        );
        assert_eq!(store.split_at(start()), Err(HierarchyError::EmptySlice));
    }

    #[test]
    // Purpose
    // -------
    // A one-step withheld piece keeps the parent frequency.
    fn train_test_split_keeps_frequency_on_short_tail() {
        let store = make_store();
        let (train, test) = store.train_test_split(1).unwrap();
        assert_eq!(train.len(), 4);
        assert_eq!(test.len(), 1);
        assert_eq!(test.freq().unwrap().alias(), "H");
        assert_eq!(
            store.train_test_split(5),
            Err(HierarchyError::InvalidSplit { withheld: 5, len: 5 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Exchange records are series-major with ids following `S` rows.
    fn to_exchange_format_is_series_major() {
        let store = make_store();
        let data = store.to_exchange_format().unwrap();
        assert_eq!(data.len(), 15);
        let first = &data.records()[0];
        assert_eq!((first.series_id, first.value, first.freq.as_str()), (0, 8.0, "H"));
        let sixth = &data.records()[5];
        assert_eq!((sixth.series_id, sixth.timestamp, sixth.value), (1, start(), 3.0));
    }
}
