//! Grid-indexed curves.

use chrono::NaiveDateTime;

use crate::math::interpolators::{Interpolator, LinearInterpolator, StepInterpolator};
use crate::types::{ConfigurationError, InterpolationError, TimeGrid};

/// How sparse pillars are filled in between pillar dates.
///
/// Both methods hold the first pillar value before the first pillar and the
/// last pillar value after the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PillarInterpolation {
    /// Linear in time between consecutive pillars.
    #[default]
    Linear,
    /// Each pillar value holds until the next pillar.
    Pad,
}

/// Scalar defined at every point of a [`TimeGrid`].
///
/// Used for forward prices, interest rates, inventory limits and factor
/// volatilities. Lookups before the grid return the first value, lookups at
/// or after the grid end return the last value, and lookups inside a period
/// return the value of the period's grid point.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::market_data::curves::{Curve, PillarInterpolation};
/// use storage_core::types::{midnight, TimeGrid};
///
/// let d = |m, d| midnight(NaiveDate::from_ymd_opt(2021, m, d).unwrap());
/// let grid = TimeGrid::new(d(4, 1), d(5, 1), storage_core::types::Frequency::Daily).unwrap();
///
/// let curve = Curve::from_pillars(
///     &[d(4, 1), d(4, 11)],
///     &[10.0, 20.0],
///     &grid,
///     PillarInterpolation::Linear,
/// )
/// .unwrap();
///
/// assert_eq!(curve.value_at(d(4, 11)), 20.0);
/// assert!((curve.value_at(d(4, 6)) - 15.0).abs() < 1e-12);
/// assert_eq!(curve.value_at(d(6, 1)), 20.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Curve {
    grid: TimeGrid,
    values: Vec<f64>,
}

impl Curve {
    /// Curve with one value per grid point.
    ///
    /// # Errors
    ///
    /// * `ConfigurationError::LengthMismatch` - `values.len() != grid.len()`
    /// * `ConfigurationError::NonFiniteValue` - a NaN or infinite value
    pub fn new(grid: TimeGrid, values: Vec<f64>) -> Result<Self, ConfigurationError> {
        if values.len() != grid.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "curve values",
                expected: grid.len(),
                got: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ConfigurationError::NonFiniteValue {
                what: "curve values",
                index,
            });
        }
        Ok(Self { grid, values })
    }

    /// Constant curve.
    pub fn flat(grid: TimeGrid, value: f64) -> Result<Self, ConfigurationError> {
        Self::new(grid, vec![value; grid.len()])
    }

    /// Curve whose value at each grid point is `f(point)`.
    pub fn from_fn<F>(grid: TimeGrid, f: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(NaiveDateTime) -> f64,
    {
        let values = grid.points().map(f).collect();
        Self::new(grid, values)
    }

    /// Resamples sparse pillars onto `grid`.
    ///
    /// Pillar dates must be strictly increasing; at least one pillar is
    /// required. A grid point that coincides with a pillar date gets exactly
    /// the pillar value.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::Interpolation` for empty, unsorted, mismatched or
    /// non-finite pillars.
    pub fn from_pillars(
        pillar_dates: &[NaiveDateTime],
        pillar_values: &[f64],
        grid: &TimeGrid,
        method: PillarInterpolation,
    ) -> Result<Self, ConfigurationError> {
        if pillar_dates.is_empty() {
            return Err(InterpolationError::InsufficientData { got: 0, need: 1 }.into());
        }
        let origin = grid.start();
        let xs: Vec<f64> = pillar_dates
            .iter()
            .map(|d| (*d - origin).num_seconds() as f64)
            .collect();

        let sample = |interp: &dyn Interpolator<f64>| -> Vec<f64> {
            grid.points()
                .map(|t| interp.interpolate_clamped((t - origin).num_seconds() as f64))
                .collect()
        };

        let values = match method {
            PillarInterpolation::Linear if xs.len() >= 2 => {
                sample(&LinearInterpolator::new(&xs, pillar_values)?)
            }
            PillarInterpolation::Linear | PillarInterpolation::Pad => {
                sample(&StepInterpolator::new(&xs, pillar_values)?)
            }
        };
        Self::new(*grid, values)
    }

    /// The grid the curve is defined on.
    #[inline]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// All values, one per grid point.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of grid points.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Never true for a constructed curve.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at grid index `i`, padding past the end.
    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.values[i.min(self.values.len() - 1)]
    }

    /// Value at time `t` with pad extrapolation on both sides.
    pub fn value_at(&self, t: NaiveDateTime) -> f64 {
        if t < self.grid.start() {
            return self.values[0];
        }
        match self.grid.period_index(t) {
            Some(i) => self.values[i],
            None => self.values[self.values.len() - 1],
        }
    }

    /// Smallest value.
    pub fn min_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest value.
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}
