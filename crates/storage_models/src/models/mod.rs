//! Stochastic spot price models.
//!
//! - [`correlation`]: correlation matrices and Cholesky factors
//! - [`multi_factor`]: N-factor mean-reverting model and the three-factor
//!   seasonal special case

pub mod correlation;
pub mod multi_factor;

pub use correlation::{CholeskyFactor, CorrelationError, CorrelationMatrix};
pub use multi_factor::{Factor, MultiFactorModel, SPOT_VARIABLE, THREE_FACTOR_NAMES};
