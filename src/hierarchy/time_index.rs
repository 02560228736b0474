//! hierarchy::time_index — regular, duplicate-free timestamp indices.
//!
//! Purpose
//! -------
//! Represent the shared row index of every table in a hierarchy: a strictly
//! increasing sequence of timestamps spaced by one fixed [`Frequency`]. All
//! regularity checks live here so stores and adapters can assume a clean
//! index.
//!
//! Key behaviors
//! -------------
//! - [`Frequency`] wraps a strictly positive `chrono::Duration` step and
//!   round-trips through pandas-style aliases (`"H"`, `"15min"`, `"D"`, ...).
//! - [`TimeIndex::new`] infers the frequency from the first step and rejects
//!   duplicates, unsorted stamps, and gaps.
//! - [`TimeIndex::with_frequency`] validates against a declared frequency,
//!   which also allows single-timestamp indices (e.g. a one-step slice).
//! - [`TimeIndex::slice`] and [`TimeIndex::positions`] keep the frequency of
//!   the parent index.
//!
//! Invariants & assumptions
//! ------------------------
//! - `timestamps.len() >= 1`.
//! - When `freq` is `Some(f)`, `t[i] - t[i-1] == f.step()` for every `i ≥ 1`.
//! - When `timestamps.len() >= 2`, `freq` is always `Some`.
//!
//! Conventions
//! -----------
//! - Timestamps are naive (`chrono::NaiveDateTime`); no timezone handling.
//! - Only fixed-length steps are supported. Calendar months and years are
//!   rejected by the alias parser because they are not uniform.
use crate::hierarchy::errors::{HierarchyError, HierarchyResult};
use chrono::{Duration, NaiveDateTime};
use std::ops::{Bound, Range, RangeBounds};
use std::str::FromStr;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

/// Alias suffixes ordered from the coarsest unit to the finest. `alias()`
/// picks the first unit that divides the step exactly.
const UNITS: [(&str, i64); 8] = [
    ("W", NANOS_PER_WEEK),
    ("D", NANOS_PER_DAY),
    ("H", NANOS_PER_HOUR),
    ("min", NANOS_PER_MINUTE),
    ("S", NANOS_PER_SECOND),
    ("ms", NANOS_PER_MILLI),
    ("us", NANOS_PER_MICRO),
    ("ns", 1),
];

/// `Frequency` — fixed sampling step of a regular time index.
///
/// Fields
/// ------
/// - `step`: `chrono::Duration`
///   Distance between consecutive timestamps; strictly positive.
///
/// Notes
/// -----
/// - `Display` renders the pandas-style alias used in the exchange dataset
///   (`"H"`, `"2H"`, `"15min"`, `"D"`, `"W"`); `FromStr` parses the same
///   aliases, case-insensitively for the unambiguous ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    step: Duration,
}

impl Frequency {
    /// Construct a frequency from a strictly positive step.
    ///
    /// Errors
    /// ------
    /// - `HierarchyError::NonPositiveFrequency` when `step <= 0`.
    pub fn new(step: Duration) -> HierarchyResult<Self> {
        if step <= Duration::zero() {
            return Err(HierarchyError::NonPositiveFrequency { step });
        }
        Ok(Frequency { step })
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Pandas-style alias, e.g. `"H"` for one hour or `"15min"`.
    ///
    /// The coarsest unit that divides the step exactly is used, and a
    /// multiplier of one is omitted.
    pub fn alias(&self) -> String {
        let nanos = self.step_nanos();
        for (suffix, unit) in UNITS {
            if nanos % unit == 0 {
                let count = nanos / unit;
                return if count == 1 { suffix.to_string() } else { format!("{count}{suffix}") };
            }
        }
        format!("{nanos}ns")
    }

    /// Step in nanoseconds, saturating for steps beyond ~292 years.
    fn step_nanos(&self) -> i64 {
        self.step.num_nanoseconds().unwrap_or(i64::MAX)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.alias())
    }
}

impl FromStr for Frequency {
    type Err = HierarchyError;

    /// Parse a pandas-style alias: an optional positive multiplier followed
    /// by a unit.
    ///
    /// Accepts `W`, `D`, `H`/`h`, `min`/`T`, `S`/`s`, `ms`/`L`, `us`/`U`,
    /// `ns`/`N` (e.g. `"D"`, `"2H"`, `"15min"`, `"30S"`). Month, quarter, and
    /// year aliases are rejected because their length is not fixed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
        let (count_str, unit_str) = trimmed.split_at(split);
        let invalid = |reason: &'static str| HierarchyError::InvalidFrequency {
            alias: s.to_string(),
            reason,
        };

        let count: i64 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| invalid("multiplier is not a valid integer"))?
        };
        if count == 0 {
            return Err(invalid("multiplier must be positive"));
        }

        let unit = match unit_str {
            "W" | "w" => NANOS_PER_WEEK,
            "D" | "d" => NANOS_PER_DAY,
            "H" | "h" => NANOS_PER_HOUR,
            "min" | "T" => NANOS_PER_MINUTE,
            "S" | "s" => NANOS_PER_SECOND,
            "ms" | "L" => NANOS_PER_MILLI,
            "us" | "U" => NANOS_PER_MICRO,
            "ns" | "N" => 1,
            "M" | "MS" | "Q" | "QS" | "Y" | "A" | "YS" | "AS" => {
                return Err(invalid("calendar frequencies are not fixed-length"));
            }
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit; expected W, D, H, min, S, ms, us, or ns")),
        };

        let nanos = count.checked_mul(unit).ok_or_else(|| invalid("step overflows"))?;
        Frequency::new(Duration::nanoseconds(nanos))
    }
}

/// `TimeIndex` — sorted, duplicate-free, regularly spaced timestamps.
///
/// Fields
/// ------
/// - `timestamps`: `Vec<NaiveDateTime>`
///   Row labels in strictly increasing order.
/// - `freq`: `Option<Frequency>`
///   Step between consecutive stamps. Always `Some` once two or more
///   timestamps are present; may be `Some` for a single timestamp when
///   declared or inherited from a parent index.
///
/// Invariants
/// ----------
/// - Non-empty.
/// - `timestamps[i] - timestamps[i - 1] == freq.step()` for all `i ≥ 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndex {
    timestamps: Vec<NaiveDateTime>,
    freq: Option<Frequency>,
}

impl TimeIndex {
    /// Build an index and infer its frequency from the first step.
    ///
    /// Errors
    /// ------
    /// - `EmptyIndex` for an empty vector.
    /// - `DuplicateTimestamp`, `UnsortedIndex`, `IrregularIndex` when the
    ///   stamps are not strictly increasing with a constant step; `index`
    ///   points at the later stamp of the offending pair.
    pub fn new(timestamps: Vec<NaiveDateTime>) -> HierarchyResult<Self> {
        if timestamps.is_empty() {
            return Err(HierarchyError::EmptyIndex);
        }
        if timestamps.len() == 1 {
            return Ok(TimeIndex { timestamps, freq: None });
        }
        let first_step = timestamps[1] - timestamps[0];
        check_step(1, Duration::zero(), first_step)?;
        let freq = Frequency::new(first_step)?;
        validate_steps(&timestamps, freq)?;
        Ok(TimeIndex { timestamps, freq: Some(freq) })
    }

    /// Build an index that must follow a declared frequency.
    ///
    /// Unlike [`TimeIndex::new`], a single timestamp is accepted and keeps
    /// the declared frequency.
    pub fn with_frequency(timestamps: Vec<NaiveDateTime>, freq: Frequency) -> HierarchyResult<Self> {
        if timestamps.is_empty() {
            return Err(HierarchyError::EmptyIndex);
        }
        validate_steps(&timestamps, freq)?;
        Ok(TimeIndex { timestamps, freq: Some(freq) })
    }

    /// Build `len` timestamps starting at `start` and spaced by `freq`.
    pub fn regular(start: NaiveDateTime, freq: Frequency, len: usize) -> HierarchyResult<Self> {
        if len == 0 {
            return Err(HierarchyError::EmptyIndex);
        }
        let mut timestamps = Vec::with_capacity(len);
        let mut current = start;
        timestamps.push(current);
        for _ in 1..len {
            current = current
                .checked_add_signed(freq.step())
                .ok_or(HierarchyError::TimestampOverflow)?;
            timestamps.push(current);
        }
        Ok(TimeIndex { timestamps, freq: Some(freq) })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn first(&self) -> NaiveDateTime {
        self.timestamps[0]
    }

    pub fn last(&self) -> NaiveDateTime {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Sampling frequency.
    ///
    /// Errors
    /// ------
    /// - `InsufficientTimestamps` when the index holds a single stamp and no
    ///   frequency was declared or inherited.
    pub fn freq(&self) -> HierarchyResult<Frequency> {
        self.freq.ok_or(HierarchyError::InsufficientTimestamps { len: self.timestamps.len() })
    }

    /// Positions of the timestamps that fall inside `range`, as a half-open
    /// `start..end` range over rows. May be empty.
    pub fn positions<R: RangeBounds<NaiveDateTime>>(&self, range: &R) -> Range<usize> {
        let start = match range.start_bound() {
            Bound::Included(t) => self.timestamps.partition_point(|x| x < t),
            Bound::Excluded(t) => self.timestamps.partition_point(|x| x <= t),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(t) => self.timestamps.partition_point(|x| x <= t),
            Bound::Excluded(t) => self.timestamps.partition_point(|x| x < t),
            Bound::Unbounded => self.timestamps.len(),
        };
        start..end.max(start)
    }

    /// Sub-index for a non-empty row range; keeps the parent frequency.
    pub fn slice(&self, rows: Range<usize>) -> HierarchyResult<Self> {
        if rows.start >= rows.end || rows.end > self.timestamps.len() {
            return Err(HierarchyError::EmptySlice);
        }
        Ok(TimeIndex { timestamps: self.timestamps[rows].to_vec(), freq: self.freq })
    }

    /// The `horizon` timestamps that follow the last one.
    pub fn future(&self, horizon: usize) -> HierarchyResult<Vec<NaiveDateTime>> {
        let step = self.freq()?.step();
        let mut out = Vec::with_capacity(horizon);
        let mut current = self.last();
        for _ in 0..horizon {
            current = current.checked_add_signed(step).ok_or(HierarchyError::TimestampOverflow)?;
            out.push(current);
        }
        Ok(out)
    }
}

fn validate_steps(timestamps: &[NaiveDateTime], freq: Frequency) -> HierarchyResult<()> {
    for (i, pair) in timestamps.windows(2).enumerate() {
        let found = pair[1] - pair[0];
        check_step(i + 1, freq.step(), found)?;
    }
    Ok(())
}

/// Classify a step: non-positive steps are duplicates/unsorted regardless of
/// `expected`; positive steps must equal `expected` unless it is zero.
fn check_step(index: usize, expected: Duration, found: Duration) -> HierarchyResult<()> {
    if found == Duration::zero() {
        return Err(HierarchyError::DuplicateTimestamp { index });
    }
    if found < Duration::zero() {
        return Err(HierarchyError::UnsortedIndex { index });
    }
    if expected > Duration::zero() && found != expected {
        return Err(HierarchyError::IrregularIndex { index, expected, found });
    }
    Ok(())
}
