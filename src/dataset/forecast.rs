//! dataset::forecast — sample-based forecasts before and after reconciliation.
//!
//! Purpose
//! -------
//! Carry forecast samples in the `series × sample × horizon` layout used at
//! the exchange boundary. [`ForecastSamples`] is what an external estimator
//! returns; [`ReconciledForecast`] is what [`crate::dataset::DatasetAdapter`]
//! hands to an evaluator, with timestamps and summary statistics attached.
//!
//! Invariants & assumptions
//! ------------------------
//! - All three dimensions are non-zero.
//! - A `ReconciledForecast` holds one timestamp per horizon step, spaced by
//!   the store frequency and starting one step after the training data.
//!
//! Conventions
//! -----------
//! - Summaries are `series × horizon` tables; quantiles follow `statrs`
//!   order-statistic interpolation.
use crate::{
    dataset::errors::{DatasetError, DatasetResult},
    hierarchy::{aggregation::AggregationMatrix, time_index::Frequency},
};
use chrono::NaiveDateTime;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use statrs::statistics::{Data, OrderStatistics};
use std::sync::Arc;

/// Raw forecast samples for every series of a hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSamples {
    values: Array3<f64>,
}

impl ForecastSamples {
    /// Wrap a `series × sample × horizon` array.
    ///
    /// Errors
    /// ------
    /// - `EmptyForecast` when any dimension is zero.
    pub fn new(values: Array3<f64>) -> DatasetResult<Self> {
        let (series, samples, horizon) = values.dim();
        if series == 0 || samples == 0 || horizon == 0 {
            return Err(DatasetError::EmptyForecast);
        }
        Ok(ForecastSamples { values })
    }

    /// Stack per-series `sample × horizon` tables along a new series axis.
    ///
    /// Errors
    /// ------
    /// - `EmptyForecast` when `per_series` is empty or the first table is
    ///   empty.
    /// - `MisalignedSeries` when a table's shape differs from the first.
    pub fn from_series(per_series: &[Array2<f64>]) -> DatasetResult<Self> {
        let first = per_series.first().ok_or(DatasetError::EmptyForecast)?;
        let expected = first.dim();
        for (series, table) in per_series.iter().enumerate().skip(1) {
            if table.dim() != expected {
                return Err(DatasetError::MisalignedSeries { series, expected, found: table.dim() });
            }
        }
        let (samples, horizon) = expected;
        let values = Array3::from_shape_fn((per_series.len(), samples, horizon), |(i, j, k)| {
            per_series[i][[j, k]]
        });
        Self::new(values)
    }

    pub fn values(&self) -> ArrayView3<'_, f64> {
        self.values.view()
    }

    pub fn into_inner(self) -> Array3<f64> {
        self.values
    }

    pub fn num_series(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn num_samples(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn horizon(&self) -> usize {
        self.values.len_of(Axis(2))
    }
}

/// Coherent forecast samples with their forecast timestamps.
///
/// Fields
/// ------
/// - `samples`: `Array3<f64>`
///   `series × sample × horizon`, every `(sample, step)` lane coherent.
/// - `timestamps`: `Vec<NaiveDateTime>`
///   One per horizon step.
/// - `freq`: [`Frequency`]
///   Step between consecutive forecast timestamps.
/// - `aggregation`: `Arc<AggregationMatrix>`
///   Hierarchy the samples are coherent under.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledForecast {
    samples: Array3<f64>,
    timestamps: Vec<NaiveDateTime>,
    freq: Frequency,
    aggregation: Arc<AggregationMatrix>,
}

impl ReconciledForecast {
    pub(crate) fn new(
        samples: Array3<f64>, timestamps: Vec<NaiveDateTime>, freq: Frequency,
        aggregation: Arc<AggregationMatrix>,
    ) -> Self {
        ReconciledForecast { samples, timestamps, freq, aggregation }
    }

    pub fn samples(&self) -> ArrayView3<'_, f64> {
        self.samples.view()
    }

    pub fn into_samples(self) -> Array3<f64> {
        self.samples
    }

    /// `sample × horizon` table of one series, or `None` when out of range.
    pub fn series(&self, series_id: usize) -> Option<ArrayView2<'_, f64>> {
        (series_id < self.num_series()).then(|| self.samples.index_axis(Axis(0), series_id))
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    pub fn num_series(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    pub fn horizon(&self) -> usize {
        self.samples.len_of(Axis(2))
    }

    /// Sample mean per `(series, step)`.
    pub fn mean(&self) -> Array2<f64> {
        self.samples.sum_axis(Axis(1)) / self.num_samples() as f64
    }

    /// Empirical `q`-quantile per `(series, step)`.
    ///
    /// Errors
    /// ------
    /// - `InvalidQuantile` unless `0 <= q <= 1`.
    pub fn quantile(&self, q: f64) -> DatasetResult<Array2<f64>> {
        if !(0.0..=1.0).contains(&q) {
            return Err(DatasetError::InvalidQuantile { q });
        }
        let (series, _, horizon) = self.samples.dim();
        let mut out = Array2::<f64>::zeros((series, horizon));
        for ((i, k), slot) in out.indexed_iter_mut() {
            let lane = self.samples.slice(ndarray::s![i, .., k]).to_vec();
            let mut data = Data::new(lane);
            *slot = data.quantile(q);
        }
        Ok(out)
    }

    /// Whether every `(sample, step)` lane satisfies `y_upper = S_agg · y_bottom`
    /// within `tol`.
    pub fn is_coherent(&self, tol: f64) -> DatasetResult<bool> {
        for lane in self.samples.lanes(Axis(0)) {
            if !self.aggregation.is_coherent(lane, tol)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
