//! Time grids and day count conventions.
//!
//! This module provides:
//! - `Frequency`: fixed step of a valuation grid (hourly or daily)
//! - `TimeGrid`: strictly increasing, fixed-frequency sequence of periods
//! - `DayCountConvention`: year fractions for discounting and simulation
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use storage_core::types::time::{DayCountConvention, TimeGrid};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
//! let grid = TimeGrid::daily(start, end).unwrap();
//! assert_eq!(grid.len(), 365);
//!
//! let yf = DayCountConvention::Actual365Fixed.year_fraction_dates(start, end);
//! assert!((yf - 1.0).abs() < 1e-12);
//! ```

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

use super::error::ConfigurationError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts a calendar date to its midnight timestamp.
#[inline]
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Step between consecutive points of a [`TimeGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Frequency {
    /// One point per hour.
    Hourly,
    /// One point per calendar day.
    Daily,
}

impl Frequency {
    /// Length of one period.
    #[inline]
    pub fn step(&self) -> Duration {
        match self {
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
        }
    }

    /// Length of one period in seconds.
    #[inline]
    pub fn step_seconds(&self) -> i64 {
        match self {
            Frequency::Hourly => 3_600,
            Frequency::Daily => 86_400,
        }
    }

    /// Short code used in configuration files ("H" / "D").
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "H" | "HOURLY" => Ok(Frequency::Hourly),
            "D" | "DAILY" => Ok(Frequency::Daily),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Ordered, fixed-frequency sequence of time points spanning `[start, end)`.
///
/// Each point marks the start of one period (a gas day or an hour). The
/// grid is never empty.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::types::time::{midnight, TimeGrid};
///
/// let grid = TimeGrid::daily(
///     NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2021, 4, 11).unwrap(),
/// )
/// .unwrap();
///
/// let t = midnight(NaiveDate::from_ymd_opt(2021, 4, 3).unwrap());
/// assert_eq!(grid.index_of(t), Some(2));
/// assert_eq!(grid.point(2), t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeGrid {
    start: NaiveDateTime,
    frequency: Frequency,
    len: usize,
}

impl TimeGrid {
    /// Builds the grid of all periods in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyGrid`] if no period starts before
    /// `end`.
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        frequency: Frequency,
    ) -> Result<Self, ConfigurationError> {
        if end <= start {
            return Err(ConfigurationError::EmptyGrid { start, end });
        }
        let span = (end - start).num_seconds();
        let step = frequency.step_seconds();
        let len = ((span + step - 1) / step) as usize;
        Ok(Self {
            start,
            frequency,
            len,
        })
    }

    /// Daily grid from `start` (inclusive) to `end` (exclusive).
    pub fn daily(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigurationError> {
        Self::new(midnight(start), midnight(end), Frequency::Daily)
    }

    /// Hourly grid from midnight of `start` to midnight of `end` (exclusive).
    pub fn hourly(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigurationError> {
        Self::new(midnight(start), midnight(end), Frequency::Hourly)
    }

    /// Grid with `len` points starting at `start`.
    pub fn with_len(
        start: NaiveDateTime,
        frequency: Frequency,
        len: usize,
    ) -> Result<Self, ConfigurationError> {
        if len == 0 {
            return Err(ConfigurationError::EmptyGrid { start, end: start });
        }
        Ok(Self {
            start,
            frequency,
            len,
        })
    }

    /// First point.
    #[inline]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Exclusive end: the point one step after the last one.
    #[inline]
    pub fn end(&self) -> NaiveDateTime {
        self.point(self.len)
    }

    /// Last point.
    #[inline]
    pub fn last(&self) -> NaiveDateTime {
        self.point(self.len - 1)
    }

    /// Grid frequency.
    #[inline]
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; kept for API symmetry with collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `i`-th point. Indices past the end continue the grid.
    #[inline]
    pub fn point(&self, i: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.frequency.step_seconds() * i as i64)
    }

    /// Index of the period containing `t`, or `None` outside `[start, end)`.
    pub fn period_index(&self, t: NaiveDateTime) -> Option<usize> {
        if t < self.start {
            return None;
        }
        let idx = ((t - self.start).num_seconds() / self.frequency.step_seconds()) as usize;
        (idx < self.len).then_some(idx)
    }

    /// Index of `t` if it is exactly a grid point.
    pub fn index_of(&self, t: NaiveDateTime) -> Option<usize> {
        self.period_index(t).filter(|&i| self.point(i) == t)
    }

    /// Whether `t` lies in `[start, end)`.
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.period_index(t).is_some()
    }

    /// Iterator over all points.
    pub fn points(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).map(move |i| self.point(i))
    }

    /// Sub-grid of the points at or after `t` (`None` if none remain).
    pub fn from_point(&self, t: NaiveDateTime) -> Option<TimeGrid> {
        let first = if t <= self.start {
            0
        } else {
            let secs = (t - self.start).num_seconds();
            let step = self.frequency.step_seconds();
            ((secs + step - 1) / step) as usize
        };
        (first < self.len).then(|| TimeGrid {
            start: self.point(first),
            frequency: self.frequency,
            len: self.len - first,
        })
    }
}

/// Day count convention (year fraction convention).
///
/// # Variants
/// - `Actual365Fixed`: actual days / 365 (default for storage discounting
///   and factor simulation)
/// - `Actual360`: actual days / 360 (money market rate curves)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DayCountConvention {
    /// Actual/365 Fixed: actual_days / 365.0
    #[default]
    Actual365Fixed,
    /// Actual/360: actual_days / 360.0
    Actual360,
}

impl DayCountConvention {
    /// Returns the standard convention name.
    ///
    /// ```
    /// use storage_core::types::time::DayCountConvention;
    ///
    /// assert_eq!(DayCountConvention::Actual365Fixed.name(), "ACT/365F");
    /// assert_eq!(DayCountConvention::Actual360.name(), "ACT/360");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            DayCountConvention::Actual365Fixed => "ACT/365F",
            DayCountConvention::Actual360 => "ACT/360",
        }
    }

    #[inline]
    fn days_per_year(&self) -> f64 {
        match self {
            DayCountConvention::Actual365Fixed => 365.0,
            DayCountConvention::Actual360 => 360.0,
        }
    }

    /// Year fraction between two timestamps, negative if `end < start`.
    ///
    /// Intra-day differences count as fractions of a day, so hourly grids
    /// get hourly year fractions.
    pub fn year_fraction(&self, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
        let days = (end - start).num_seconds() as f64 / SECONDS_PER_DAY;
        days / self.days_per_year()
    }

    /// Year fraction between two calendar dates, negative if `end < start`.
    pub fn year_fraction_dates(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        (end - start).num_days() as f64 / self.days_per_year()
    }
}

impl FromStr for DayCountConvention {
    type Err = String;

    /// Parses day count convention from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['/', ' '], "").as_str() {
            "ACT365" | "ACT365F" | "ACTUAL365" | "A365" => Ok(DayCountConvention::Actual365Fixed),
            "ACT360" | "ACTUAL360" | "A360" => Ok(DayCountConvention::Actual360),
            _ => Err(format!("Unknown day count convention: {}", s)),
        }
    }
}

impl fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
