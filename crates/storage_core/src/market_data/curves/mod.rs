//! Time-indexed curves.
//!
//! - [`Curve`]: one finite value per [`TimeGrid`](crate::types::TimeGrid) point
//! - [`PillarInterpolation`]: how sparse pillars are resampled onto a grid

mod grid;

pub use grid::{Curve, PillarInterpolation};
