//! Interpolation methods used by curves and ratchet tables.
//!
//! ## Available Interpolators
//!
//! - [`LinearInterpolator`]: Piecewise linear interpolation between knots
//! - [`StepInterpolator`]: Piecewise constant ("pad") interpolation
//!
//! Both are generic over `T: num_traits::Float` and implement [`Interpolator`].
//!
//! ## Example
//!
//! ```
//! use storage_core::math::interpolators::{Interpolator, LinearInterpolator};
//!
//! let interp = LinearInterpolator::new(&[0.0_f64, 1.0, 2.0, 3.0], &[0.0, 1.0, 4.0, 9.0]).unwrap();
//! assert_eq!(interp.domain(), (0.0, 3.0));
//! assert!((interp.interpolate(1.5).unwrap() - 2.5).abs() < 1e-10);
//! ```

mod linear;
mod traits;

pub use linear::{LinearInterpolator, StepInterpolator};
pub use traits::Interpolator;
