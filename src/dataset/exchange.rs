//! dataset::exchange — flat `(series_id, timestamp, value, freq)` records.
//!
//! Purpose
//! -------
//! Represent the tabular contract used to hand historical series to an
//! external estimator: one record per (series, timestamp) pair covering
//! every level of the hierarchy. Records serialize through `serde` and can
//! be written to / read from CSV with the `csv` crate.
//!
//! Key behaviors
//! -------------
//! - [`ExchangeDataset::from_table`] flattens a `T × n` table series-major:
//!   all timestamps of series 0, then series 1, and so on.
//! - [`ExchangeDataset::write_csv`] emits a header row
//!   `series_id,timestamp,value,freq` followed by one line per record;
//!   [`ExchangeDataset::read_csv`] parses the same layout.
//!
//! Conventions
//! -----------
//! - `series_id` is the row position of the series in `S` (upper levels
//!   first, bottom level last).
//! - Timestamps serialize in ISO 8601 form (`2024-03-01T00:00:00`).
use crate::{dataset::errors::DatasetResult, hierarchy::time_index::Frequency};
use chrono::NaiveDateTime;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// One observation of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub series_id: usize,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// Pandas-style frequency alias shared by every record of a dataset.
    pub freq: String,
}

/// Series-major collection of [`ExchangeRecord`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExchangeDataset {
    records: Vec<ExchangeRecord>,
}

impl ExchangeDataset {
    /// Wrap records as-is (e.g. after filtering).
    pub fn new(records: Vec<ExchangeRecord>) -> Self {
        ExchangeDataset { records }
    }

    /// Flatten a `T × n` table whose columns are series.
    ///
    /// `timestamps.len()` must equal `table.nrows()`; the store guarantees
    /// this for its own tables.
    pub fn from_table(timestamps: &[NaiveDateTime], table: ArrayView2<'_, f64>, freq: Frequency) -> Self {
        let alias = freq.alias();
        let mut records = Vec::with_capacity(table.len());
        for (series_id, column) in table.columns().into_iter().enumerate() {
            for (&timestamp, &value) in timestamps.iter().zip(column.iter()) {
                records.push(ExchangeRecord { series_id, timestamp, value, freq: alias.clone() });
            }
        }
        ExchangeDataset { records }
    }

    pub fn records(&self) -> &[ExchangeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExchangeRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct series ids; filtered datasets need not start at 0.
    pub fn num_series(&self) -> usize {
        self.records.iter().map(|r| r.series_id).collect::<BTreeSet<_>>().len()
    }

    /// Frequency alias of the first record.
    pub fn freq(&self) -> Option<&str> {
        self.records.first().map(|r| r.freq.as_str())
    }

    /// Records belonging to one series, in stored order.
    pub fn series(&self, series_id: usize) -> impl Iterator<Item = &ExchangeRecord> + '_ {
        self.records.iter().filter(move |r| r.series_id == series_id)
    }

    /// Write a header plus one CSV line per record.
    ///
    /// Errors
    /// ------
    /// - `DatasetError::Csv` / `DatasetError::Io` from the underlying writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> DatasetResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Parse the layout produced by [`ExchangeDataset::write_csv`].
    ///
    /// Errors
    /// ------
    /// - `DatasetError::Csv` for malformed rows or unparsable fields.
    pub fn read_csv<R: Read>(reader: R) -> DatasetResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            let record: ExchangeRecord = result?;
            records.push(record);
        }
        Ok(ExchangeDataset { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::errors::DatasetError;
    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    fn stamps() -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        vec![start, start + Duration::days(1)]
    }

    fn daily() -> Frequency {
        Frequency::new(Duration::days(1)).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Columns become consecutive runs of records.
    fn from_table_flattens_series_major() {
        let table = array![[8.0, 3.0, 5.0], [3.0, 1.0, 2.0]];
        let data = ExchangeDataset::from_table(&stamps(), table.view(), daily());
        assert_eq!(data.len(), 6);
        assert_eq!(data.num_series(), 3);
        assert_eq!(data.freq(), Some("D"));
        let values: Vec<f64> = data.records().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![8.0, 3.0, 3.0, 1.0, 5.0, 2.0]);
        let ids: Vec<usize> = data.series(2).map(|r| r.series_id).collect();
        assert_eq!(ids, vec![2, 2]);
    }

    #[test]
    // Purpose
    // -------
    // A filtered dataset counts the ids it holds, not the largest id.
    //
    // Given
    // -----
    // - The upper series (id 0) of a three-series table dropped.
    //
    // Expect
    // ------
    // - Two series; an empty dataset has none.
    fn num_series_counts_distinct_ids() {
        let table = array![[8.0, 3.0, 5.0], [3.0, 1.0, 2.0]];
        let full = ExchangeDataset::from_table(&stamps(), table.view(), daily());
        let bottom: Vec<ExchangeRecord> =
            full.into_records().into_iter().filter(|r| r.series_id != 0).collect();
        let filtered = ExchangeDataset::new(bottom);
        assert_eq!(filtered.len(), 4);
        assert_eq!(filtered.num_series(), 2);
        assert_eq!(ExchangeDataset::default().num_series(), 0);
    }

    #[test]
    fn csv_layout_has_header_and_iso_timestamps() {
        let table = array![[1.5], [2.0]];
        let data = ExchangeDataset::from_table(&stamps(), table.view(), daily());
        let mut buf = Vec::new();
        data.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("series_id,timestamp,value,freq"));
        assert_eq!(lines.next(), Some("0,2024-03-01T00:00:00,1.5,D"));

        let back = ExchangeDataset::read_csv(text.as_bytes()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn read_csv_rejects_malformed_value() {
        let text = "series_id,timestamp,value,freq\n0,2024-03-01T00:00:00,abc,D\n";
        assert!(matches!(ExchangeDataset::read_csv(text.as_bytes()), Err(DatasetError::Csv(_))));
    }
}
