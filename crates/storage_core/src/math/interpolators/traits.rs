//! Core interpolation trait.

use crate::types::InterpolationError;
use num_traits::Float;

/// One-dimensional interpolator over sorted knots.
///
/// Implementors return an error for points outside [`domain`](Self::domain);
/// [`interpolate_clamped`](Self::interpolate_clamped) instead holds the
/// boundary value ("pad" extrapolation).
pub trait Interpolator<T: Float> {
    /// Interpolated value at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::OutOfBounds`] if `x` lies outside the
    /// domain.
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;

    /// Valid interpolation range `(x_min, x_max)`.
    fn domain(&self) -> (T, T);

    /// Interpolated value at `x`, clamping `x` into the domain first.
    fn interpolate_clamped(&self, x: T) -> T {
        let (lo, hi) = self.domain();
        let clamped = if x < lo {
            lo
        } else if x > hi {
            hi
        } else {
            x
        };
        // Clamped points are always inside the domain.
        self.interpolate(clamped).unwrap_or_else(|_| T::nan())
    }
}
