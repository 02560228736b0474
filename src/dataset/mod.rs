//! dataset — exchange with external estimators and tabular import.
//!
//! Purpose
//! -------
//! Everything that crosses the crate boundary: the flat exchange dataset
//! handed to an estimator, the `series × sample × horizon` forecasts it
//! returns, the adapter that reconciles them, and the CSV readers that build
//! a store from files.
//!
//! Key behaviors
//! -------------
//! - [`DatasetAdapter`] owns a [`crate::reconciliation::Reconciler`] and
//!   converts stores to [`ExchangeDataset`]s and raw [`ForecastSamples`] to
//!   coherent [`ReconciledForecast`]s.
//! - [`io`] reads bottom-level tables and aggregation matrices according to
//!   [`ImportOptions`].
//! - [`DatasetError`] wraps hierarchy and reconciliation errors and adds
//!   forecast-shape, CSV, and parse failures.
//!
//! Downstream usage
//! ----------------
//! - `io::load_store` → `DatasetAdapter::for_store` →
//!   `to_training_input` → external estimator → `ForecastSamples::new` →
//!   `from_forecast_output` → `ReconciledForecast::{mean, quantile}`.

pub mod adapter;
pub mod errors;
pub mod exchange;
pub mod forecast;
pub mod io;
pub mod options;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adapter::DatasetAdapter;
pub use self::errors::{DatasetError, DatasetResult};
pub use self::exchange::{ExchangeDataset, ExchangeRecord};
pub use self::forecast::{ForecastSamples, ReconciledForecast};
pub use self::io::{load_store, read_aggregation_matrix, read_bottom_level};
pub use self::options::{IdentityBlock, ImportOptions};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::adapter::DatasetAdapter;
    pub use super::errors::{DatasetError, DatasetResult};
    pub use super::exchange::{ExchangeDataset, ExchangeRecord};
    pub use super::forecast::{ForecastSamples, ReconciledForecast};
    pub use super::options::{IdentityBlock, ImportOptions};
}
