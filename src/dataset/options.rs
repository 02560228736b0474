//! Import options for the CSV readers in [`crate::dataset::io`].
use crate::{dataset::errors::DatasetError, hierarchy::time_index::Frequency};
use std::str::FromStr;

/// Whether an aggregation-matrix file contains the bottom identity rows.
///
/// - `Present` (default): the file holds the full `S = [S_agg; I_m]`; a
///   non-identity suffix is rejected.
/// - `Absent`: the file holds only `S_agg`; `I_m` is appended on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityBlock {
    #[default]
    Present,
    Absent,
}

impl FromStr for IdentityBlock {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(IdentityBlock::Present),
            "absent" => Ok(IdentityBlock::Absent),
            _ => Err(DatasetError::Parse {
                row: 0,
                column: 0,
                value: s.to_string(),
                reason: "identity block must be 'present' or 'absent'".to_string(),
            }),
        }
    }
}

/// `ImportOptions` — how bottom-level and aggregation files are read.
///
/// Fields
/// ------
/// - `delimiter`: field separator for both files (default `b','`).
/// - `bottom_has_header`: skip the first row of the bottom-level file
///   (default `true`).
/// - `matrix_has_header`: skip the first row of the matrix file
///   (default `false`).
/// - `timestamp_format`: `chrono` format string; when `None` the ISO-like
///   formats `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` (optional fractional
///   seconds) and `%Y-%m-%d` are tried in order.
/// - `identity_block`: see [`IdentityBlock`].
/// - `freq`: declared frequency; when `None` it is inferred from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub delimiter: u8,
    pub bottom_has_header: bool,
    pub matrix_has_header: bool,
    pub timestamp_format: Option<String>,
    pub identity_block: IdentityBlock,
    pub freq: Option<Frequency>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            delimiter: b',',
            bottom_has_header: true,
            matrix_has_header: false,
            timestamp_format: None,
            identity_block: IdentityBlock::Present,
            freq: None,
        }
    }
}
