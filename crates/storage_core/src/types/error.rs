//! Error types for structured error handling.
//!
//! This module provides:
//! - `ConfigurationError`: invalid inputs detected before any valuation work
//! - `InterpolationError`: errors from interpolation operations
//!
//! Every check that can be made from the inputs alone is made eagerly, at
//! construction time, and reported as a [`ConfigurationError`].

use chrono::NaiveDateTime;
use thiserror::Error;

/// Interpolation-related errors.
///
/// # Variants
/// - `OutOfBounds`: Query point outside valid interpolation domain
/// - `InsufficientData`: Not enough data points for interpolation
/// - `NonMonotonicData`: Abscissae not strictly increasing
/// - `InvalidInput`: General invalid input error
///
/// # Examples
/// ```
/// use storage_core::types::InterpolationError;
///
/// let err = InterpolationError::OutOfBounds { x: 5.0, min: 0.0, max: 3.0 };
/// assert!(format!("{}", err).contains("outside valid domain"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Query point outside valid interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// The query point that was out of bounds
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Insufficient data points for interpolation.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Abscissae are not strictly increasing.
    #[error("Data is not strictly increasing at index {index}")]
    NonMonotonicData {
        /// Index of the first offending point
        index: usize,
    },

    /// General invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Invalid valuation inputs.
///
/// Raised by builders and constructors (storage facilities, curves,
/// correlation matrices, basis expressions, simulation settings) and by the
/// valuation entry point before any simulation starts.
///
/// # Examples
/// ```
/// use storage_core::types::ConfigurationError;
///
/// let err = ConfigurationError::InvalidParameter {
///     name: "num_sims",
///     reason: "must be positive".to_string(),
/// };
/// assert_eq!(err.to_string(), "Invalid parameter 'num_sims': must be positive");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Time grid would contain no points.
    #[error("Empty time grid: start {start} is not before end {end}")]
    EmptyGrid {
        /// Requested start
        start: NaiveDateTime,
        /// Requested (exclusive) end
        end: NaiveDateTime,
    },

    /// Number of values does not match the grid length.
    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        /// What was being constructed
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// A NaN or infinite value was supplied.
    #[error("Non-finite value in {what} at index {index}")]
    NonFiniteValue {
        /// What was being constructed
        what: &'static str,
        /// Offending index
        index: usize,
    },

    /// Minimum inventory above maximum, or negative minimum inventory.
    #[error("Invalid inventory bounds at {date}: min {min}, max {max}")]
    InventoryBounds {
        /// Date at which the bounds are violated
        date: NaiveDateTime,
        /// Minimum inventory
        min: f64,
        /// Maximum inventory
        max: f64,
    },

    /// Malformed ratchet table.
    #[error("Invalid ratchet table: {0}")]
    Ratchet(String),

    /// Invalid correlation matrix (including failed Cholesky factorisation).
    #[error("Invalid correlation matrix: {0}")]
    Correlation(String),

    /// Basis-function expression could not be parsed.
    #[error("Basis function parse error at position {position}: {message}")]
    BasisExpression {
        /// Description of the problem
        message: String,
        /// Byte offset in the expression
        position: usize,
    },

    /// Basis-function expression refers to an unknown state variable.
    #[error("Unknown basis function variable '{name}' (available: {available})")]
    UnknownVariable {
        /// Variable name used in the expression
        name: String,
        /// Comma-separated list of known names
        available: String,
    },

    /// Inventory cannot be kept within bounds from the given starting point.
    #[error("Infeasible inventory {inventory} at {date}: reachable range is [{min}, {max}]")]
    InfeasibleInventory {
        /// Date of the infeasible state
        date: NaiveDateTime,
        /// Inventory supplied
        inventory: f64,
        /// Lowest feasible inventory
        min: f64,
        /// Highest feasible inventory
        max: f64,
    },

    /// Invalid scalar parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// Interpolation failure while building a curve.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ConfigurationError::Ratchet`].
    pub fn ratchet(message: impl Into<String>) -> Self {
        Self::Ratchet(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_interpolation_error_display() {
        let err = InterpolationError::InsufficientData { got: 1, need: 2 };
        assert_eq!(
            err.to_string(),
            "Insufficient data points: got 1, need at least 2"
        );
        let err = InterpolationError::NonMonotonicData { index: 3 };
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn test_inventory_bounds_display() {
        let err = ConfigurationError::InventoryBounds {
            date: midnight(2021, 4, 1),
            min: 10.0,
            max: 5.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("2021-04-01"));
        assert!(msg.contains("min 10"));
    }

    #[test]
    fn test_from_interpolation_error() {
        let err: ConfigurationError = InterpolationError::InvalidInput("bad".into()).into();
        assert!(matches!(err, ConfigurationError::Interpolation(_)));
    }

    #[test]
    fn test_shorthand_constructors() {
        assert_eq!(
            ConfigurationError::invalid("seed", "x"),
            ConfigurationError::InvalidParameter {
                name: "seed",
                reason: "x".to_string()
            }
        );
        assert_eq!(
            ConfigurationError::ratchet("unsorted"),
            ConfigurationError::Ratchet("unsorted".to_string())
        );
    }

    #[test]
    fn test_error_trait_implementation() {
        let err = ConfigurationError::Correlation("not PSD".into());
        let _: &dyn std::error::Error = &err;
    }
}
