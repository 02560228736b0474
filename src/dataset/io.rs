//! dataset::io — CSV import of bottom-level series and aggregation matrices.
//!
//! Purpose
//! -------
//! Read the two files that describe a hierarchy and assemble a validated
//! [`HierarchicalSeriesStore`]:
//!
//! ```text
//! bottom.csv                      s.csv (IdentityBlock::Present)
//! timestamp,a,b                   1,1
//! 2024-01-01 00:00:00,3,5         1,0
//! 2024-01-01 01:00:00,1,2         0,1
//! ```
//!
//! Key behaviors
//! -------------
//! - Bottom-level file: first column is the timestamp, every other column is
//!   one bottom series in `S` column order.
//! - Matrix file: one numeric row per series; the identity suffix is
//!   required or appended according to [`IdentityBlock`].
//! - Every parse failure reports its 1-based data row and 0-based column.
//!
//! Conventions
//! -----------
//! - `parse_*` functions take any `std::io::Read`; `read_*` functions open a
//!   path and delegate.
use crate::{
    dataset::{
        errors::{DatasetError, DatasetResult},
        options::{IdentityBlock, ImportOptions},
    },
    hierarchy::{aggregation::AggregationMatrix, store::HierarchicalSeriesStore, time_index::TimeIndex},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a bottom-level table into its time index and `T × m` values.
///
/// Errors
/// ------
/// - `EmptyFile` when there are no data rows or no series columns.
/// - `RaggedRow` when a row's field count differs from the first row.
/// - `Parse` for an unreadable timestamp or value.
/// - `Hierarchy(..)` when the timestamps are not a regular index.
pub fn parse_bottom_level<R: Read>(
    reader: R, opts: &ImportOptions,
) -> DatasetResult<(TimeIndex, Array2<f64>)> {
    let rows = read_rows(reader, opts.delimiter, opts.bottom_has_header)?;
    let width = rows.first().map(|r| r.len()).ok_or(DatasetError::EmptyFile)?;
    if width < 2 {
        return Err(DatasetError::EmptyFile);
    }
    let num_bottom = width - 1;

    let mut timestamps = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len() * num_bottom);
    for (i, record) in rows.iter().enumerate() {
        let row = i + 1;
        check_width(row, width, record.len())?;
        let stamp = record.get(0).unwrap_or_default();
        timestamps.push(parse_timestamp(stamp, opts.timestamp_format.as_deref(), row)?);
        for column in 1..width {
            values.push(parse_value(record.get(column).unwrap_or_default(), row, column)?);
        }
    }

    let index = match opts.freq {
        Some(freq) => TimeIndex::with_frequency(timestamps, freq)?,
        None => TimeIndex::new(timestamps)?,
    };
    let bottom = Array2::from_shape_vec((rows.len(), num_bottom), values)
        .map_err(|_| DatasetError::EmptyFile)?;
    info!(timestamps = index.len(), bottom_series = num_bottom, "imported bottom-level table");
    Ok((index, bottom))
}

/// Parse an aggregation matrix.
///
/// Errors
/// ------
/// - `EmptyFile`, `RaggedRow`, `Parse` for malformed files.
/// - `Hierarchy(..)` when the matrix fails [`AggregationMatrix`] validation
///   (e.g. `IdentitySuffixViolated` under [`IdentityBlock::Present`]).
pub fn parse_aggregation_matrix<R: Read>(
    reader: R, opts: &ImportOptions,
) -> DatasetResult<AggregationMatrix> {
    let rows = read_rows(reader, opts.delimiter, opts.matrix_has_header)?;
    let width = rows.first().map(|r| r.len()).ok_or(DatasetError::EmptyFile)?;

    let mut values = Vec::with_capacity(rows.len() * width);
    for (i, record) in rows.iter().enumerate() {
        let row = i + 1;
        check_width(row, width, record.len())?;
        for column in 0..width {
            values.push(parse_value(record.get(column).unwrap_or_default(), row, column)?);
        }
    }
    let matrix =
        Array2::from_shape_vec((rows.len(), width), values).map_err(|_| DatasetError::EmptyFile)?;

    let aggregation = match opts.identity_block {
        IdentityBlock::Present => AggregationMatrix::new(matrix)?,
        IdentityBlock::Absent => {
            info!(bottom_series = width, "appending identity block to aggregation matrix");
            AggregationMatrix::from_upper(matrix)?
        }
    };
    info!(
        total_series = aggregation.num_total_series(),
        bottom_series = aggregation.num_bottom_series(),
        "imported aggregation matrix"
    );
    Ok(aggregation)
}

/// Open and parse a bottom-level file.
pub fn read_bottom_level(
    path: impl AsRef<Path>, opts: &ImportOptions,
) -> DatasetResult<(TimeIndex, Array2<f64>)> {
    parse_bottom_level(open(path.as_ref())?, opts)
}

/// Open and parse an aggregation-matrix file.
pub fn read_aggregation_matrix(
    path: impl AsRef<Path>, opts: &ImportOptions,
) -> DatasetResult<AggregationMatrix> {
    parse_aggregation_matrix(open(path.as_ref())?, opts)
}

/// Read both files and build the store.
///
/// Errors
/// ------
/// - Any error of [`read_bottom_level`] or [`read_aggregation_matrix`].
/// - `Hierarchy(DimensionMismatch)` when the column counts disagree.
pub fn load_store(
    bottom_path: impl AsRef<Path>, matrix_path: impl AsRef<Path>, opts: &ImportOptions,
) -> DatasetResult<HierarchicalSeriesStore> {
    let aggregation = read_aggregation_matrix(matrix_path, opts)?;
    let (index, bottom) = read_bottom_level(bottom_path, opts)?;
    Ok(HierarchicalSeriesStore::new(index, bottom, aggregation)?)
}

fn open(path: &Path) -> DatasetResult<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| DatasetError::Io(format!("cannot open {}: {e}", path.display())))?;
    Ok(BufReader::new(file))
}

fn read_rows<R: Read>(reader: R, delimiter: u8, has_headers: bool) -> DatasetResult<Vec<csv::StringRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(record);
    }
    if rows.is_empty() {
        return Err(DatasetError::EmptyFile);
    }
    Ok(rows)
}

fn check_width(row: usize, expected: usize, found: usize) -> DatasetResult<()> {
    if found != expected {
        return Err(DatasetError::RaggedRow { row, expected, found });
    }
    Ok(())
}

fn parse_value(field: &str, row: usize, column: usize) -> DatasetResult<f64> {
    field.parse::<f64>().map_err(|e| DatasetError::Parse {
        row,
        column,
        value: field.to_string(),
        reason: e.to_string(),
    })
}

/// Parse one timestamp with `format`, or with the default formats when
/// `format` is `None`.
pub fn parse_datetime(field: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    match format {
        Some(fmt) => parse_with(field, fmt),
        None => DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
            .or_else(|| parse_with(field, DATE_FORMAT)),
    }
}

fn parse_timestamp(field: &str, format: Option<&str>, row: usize) -> DatasetResult<NaiveDateTime> {
    parse_datetime(field, format).ok_or_else(|| DatasetError::Parse {
        row,
        column: 0,
        value: field.to_string(),
        reason: match format {
            Some(fmt) => format!("does not match timestamp format {fmt:?}"),
            None => "expected YYYY-MM-DD[ HH:MM:SS] or YYYY-MM-DDTHH:MM:SS".to_string(),
        },
    })
}

/// Date-time parse that also accepts date-only formats (midnight).
fn parse_with(field: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(field, fmt)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(field, fmt).ok().map(|d| d.and_time(NaiveTime::MIN)))
}
