//! Piecewise linear and piecewise constant interpolation.

use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

fn validate_knots<T: Float>(xs: &[T], ys: &[T], need: usize) -> Result<(), InterpolationError> {
    if xs.len() != ys.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "xs and ys must have same length: got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < need {
        return Err(InterpolationError::InsufficientData {
            got: xs.len(),
            need,
        });
    }
    if let Some(index) = xs.iter().chain(ys.iter()).position(|v| !v.is_finite()) {
        return Err(InterpolationError::InvalidInput(format!(
            "non-finite knot value at position {}",
            index % xs.len()
        )));
    }
    if let Some(index) = xs.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NonMonotonicData { index: index + 1 });
    }
    Ok(())
}

/// Piecewise linear interpolator.
///
/// Knots must be strictly increasing; unlike a general-purpose fitter the
/// order is never silently rearranged, since pillar order carries meaning
/// for curves and ratchet tables. Querying exactly at a knot returns the
/// knot value bit-for-bit.
///
/// # Example
///
/// ```
/// use storage_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::new(&[0.0_f64, 1.0, 2.0], &[0.0, 2.0, 4.0]).unwrap();
/// assert!((interp.interpolate(0.5).unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(interp.interpolate_clamped(10.0), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
}

impl<T: Float> LinearInterpolator<T> {
    /// Construct a linear interpolator from strictly increasing knots.
    ///
    /// # Errors
    ///
    /// * `InterpolationError::InsufficientData` - fewer than 2 knots
    /// * `InterpolationError::InvalidInput` - mismatched lengths or non-finite values
    /// * `InterpolationError::NonMonotonicData` - xs not strictly increasing
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        validate_knots(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    /// Knot abscissae.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// Knot values.
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }

    /// Number of knots.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Never true for a constructed interpolator.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Index `i` with `xs[i] <= x < xs[i+1]`, clamped to `[0, n-2]`.
    #[inline]
    fn find_segment(&self, x: T) -> usize {
        let pos = self.xs.partition_point(|&xi| xi <= x);
        if pos == 0 {
            0
        } else if pos >= self.xs.len() {
            self.xs.len() - 2
        } else {
            pos - 1
        }
    }
}

impl<T: Float> Interpolator<T> for LinearInterpolator<T> {
    /// `y = y0 + (y1 - y0) * (x - x0) / (x1 - x0)` on the bracketing segment.
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (x_min, x_max) = self.domain();
        if !(x >= x_min && x <= x_max) {
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: x_min.to_f64().unwrap_or(f64::NAN),
                max: x_max.to_f64().unwrap_or(f64::NAN),
            });
        }

        let i = self.find_segment(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);

        if x == x0 {
            return Ok(y0);
        }
        if x == x1 {
            return Ok(y1);
        }
        let t = (x - x0) / (x1 - x0);
        Ok(y0 + (y1 - y0) * t)
    }

    #[inline]
    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// Piecewise constant ("pad") interpolator.
///
/// Each knot value holds from its abscissa until the next knot. A single
/// knot is allowed.
///
/// ```
/// use storage_core::math::interpolators::{Interpolator, StepInterpolator};
///
/// let step = StepInterpolator::new(&[0.0, 10.0], &[1.0, 2.0]).unwrap();
/// assert_eq!(step.interpolate(9.99).unwrap(), 1.0);
/// assert_eq!(step.interpolate(10.0).unwrap(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct StepInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
}

impl<T: Float> StepInterpolator<T> {
    /// Construct from strictly increasing knots (at least one).
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        validate_knots(xs, ys, 1)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    /// Index of the last knot at or below `x`, clamped to the first knot.
    #[inline]
    pub fn floor_index(&self, x: T) -> usize {
        self.xs.partition_point(|&xi| xi <= x).saturating_sub(1)
    }
}

impl<T: Float> Interpolator<T> for StepInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (x_min, x_max) = self.domain();
        if !(x >= x_min && x <= x_max) {
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: x_min.to_f64().unwrap_or(f64::NAN),
                max: x_max.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(self.ys[self.floor_index(x)])
    }

    #[inline]
    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
