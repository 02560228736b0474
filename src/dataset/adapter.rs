//! dataset::adapter — boundary between a hierarchy and an external estimator.
//!
//! Purpose
//! -------
//! Convert a [`HierarchicalSeriesStore`] into the exchange dataset an
//! estimator trains on, and convert the estimator's raw samples back into a
//! coherent [`ReconciledForecast`]. The adapter owns one [`Reconciler`], so
//! the projection is built once per hierarchy and reused for every call.
//!
//! Key behaviors
//! -------------
//! - [`DatasetAdapter::to_training_input`] delegates to
//!   [`HierarchicalSeriesStore::to_exchange_format`].
//! - [`DatasetAdapter::from_forecast_output`] checks the series dimension
//!   and that the store shares the adapter's aggregation matrix, reconciles
//!   every `(sample, step)` lane, and stamps the horizon with the timestamps
//!   that follow the store's last one.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output samples keep the input shape `series × sample × horizon`.
//! - Nothing is returned unless every lane was reconciled.
use crate::{
    dataset::{
        errors::{DatasetError, DatasetResult},
        exchange::ExchangeDataset,
        forecast::{ForecastSamples, ReconciledForecast},
    },
    hierarchy::{aggregation::AggregationMatrix, store::HierarchicalSeriesStore},
    reconciliation::{method::ReconciliationMethod, reconciler::Reconciler},
};
use ndarray::Axis;
use tracing::info;

/// `DatasetAdapter` — exchange conversions plus a cached reconciler.
#[derive(Debug, Clone)]
pub struct DatasetAdapter {
    reconciler: Reconciler,
}

impl DatasetAdapter {
    /// OLS adapter for `aggregation`.
    pub fn new(aggregation: &AggregationMatrix) -> DatasetResult<Self> {
        Self::with_method(aggregation, ReconciliationMethod::Ols)
    }

    /// Adapter reconciling with `method`.
    pub fn with_method(
        aggregation: &AggregationMatrix, method: ReconciliationMethod,
    ) -> DatasetResult<Self> {
        let reconciler = Reconciler::with_method(aggregation, method)?;
        Ok(DatasetAdapter { reconciler })
    }

    /// OLS adapter for the hierarchy of `store`.
    pub fn for_store(store: &HierarchicalSeriesStore) -> DatasetResult<Self> {
        Self::new(store.aggregation())
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Exchange dataset covering every level of `store`.
    ///
    /// Errors
    /// ------
    /// - `Hierarchy(InsufficientTimestamps)` when the store frequency is unknown.
    pub fn to_training_input(&self, store: &HierarchicalSeriesStore) -> DatasetResult<ExchangeDataset> {
        let data = store.to_exchange_format()?;
        info!(records = data.len(), series = store.num_ts(), "prepared training input");
        Ok(data)
    }

    /// Reconcile raw estimator samples for the period after `store`.
    ///
    /// Parameters
    /// ----------
    /// - `raw`: [`ForecastSamples`]
    ///   `series × sample × horizon`, series ordered as the rows of `S`.
    /// - `store`: [`HierarchicalSeriesStore`]
    ///   Training data the forecast continues; supplies the frequency and
    ///   the last observed timestamp.
    ///
    /// Errors
    /// ------
    /// - `Shape` when the series dimension differs from `n`.
    /// - `AggregationMismatch` when `store` uses a different `S`.
    /// - `Reconcile(NonFiniteInput)` for NaN/±inf samples.
    /// - `Hierarchy(..)` when the forecast timestamps cannot be generated.
    pub fn from_forecast_output(
        &self, raw: &ForecastSamples, store: &HierarchicalSeriesStore,
    ) -> DatasetResult<ReconciledForecast> {
        let expected = self.reconciler.num_total_series();
        if raw.num_series() != expected {
            return Err(DatasetError::Shape { expected, found: raw.num_series() });
        }
        if store.aggregation().matrix() != self.reconciler.summing_matrix() {
            return Err(DatasetError::AggregationMismatch);
        }

        let freq = store.freq()?;
        let timestamps = store.index().future(raw.horizon())?;
        let samples = self.reconciler.reconcile_axis(raw.values(), Axis(0))?;
        info!(
            series = expected,
            samples = raw.num_samples(),
            horizon = raw.horizon(),
            method = self.reconciler.method().name(),
            "reconciled forecast output"
        );
        Ok(ReconciledForecast::new(samples, timestamps, freq, store.aggregation_arc()))
    }
}
