//! Time, series and error types.
//!
//! This module provides:
//! - `time`: [`TimeGrid`], [`Frequency`] and [`DayCountConvention`]
//! - `series`: [`TimeSeries`] for per-date outputs
//! - `error`: [`ConfigurationError`] and [`InterpolationError`]

pub mod error;
pub mod series;
pub mod time;

pub use error::{ConfigurationError, InterpolationError};
pub use series::TimeSeries;
pub use time::{midnight, DayCountConvention, Frequency, TimeGrid};
