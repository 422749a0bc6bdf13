//! Error and warning types for the valuation engine.
//!
//! [`ConfigError`] reports invalid simulation settings, [`ValuationError`] is
//! the top-level error of a valuation, and [`NumericalWarning`] records a
//! recoverable regression problem without aborting.

use std::fmt;

use chrono::NaiveDateTime;
use storage_core::types::ConfigurationError;
use thiserror::Error;

/// Invalid simulation settings.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Simulation count outside [1, 10_000_000].
    InvalidPathCount(usize),
    /// Invalid parameter value with name and description.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
    /// Settings file could not be read.
    Io(String),
    /// Settings document could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPathCount(count) => {
                write!(
                    f,
                    "Invalid simulation count {}: must be in range [1, 10_000_000]",
                    count
                )
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter '{}': {}", name, value)
            }
            Self::Io(msg) => write!(f, "IO error: {}", msg),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Error returned by a storage valuation.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Invalid facility, market data, model or starting inventory.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Invalid simulation settings.
    #[error("simulation settings: {0}")]
    Config(#[from] ConfigError),

    /// An internal invariant failed during the valuation.
    #[error("invariant violated on {date} (path {path:?}): {message}")]
    InvariantViolation {
        /// Decision date at which the violation occurred.
        date: NaiveDateTime,
        /// Offending path, when the violation is path specific.
        path: Option<usize>,
        /// Description.
        message: String,
    },
}

impl ValuationError {
    pub(crate) fn invariant(
        date: NaiveDateTime,
        path: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvariantViolation {
            date,
            path,
            message: message.into(),
        }
    }
}

/// Kind of recoverable regression problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WarningKind {
    /// The design matrix had fewer independent directions than basis
    /// functions; the pseudo-inverse dropped the degenerate ones.
    RankDeficient,
    /// The solve failed or produced non-finite coefficients; the date used
    /// the mean of the targets instead.
    MeanFallback,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankDeficient => write!(f, "rank deficient design matrix"),
            Self::MeanFallback => write!(f, "regression failed, mean used"),
        }
    }
}

/// Recoverable numerical problem at one decision date.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NumericalWarning {
    /// Decision date of the regression.
    pub date: NaiveDateTime,
    /// What went wrong.
    pub kind: WarningKind,
    /// Numerical rank of the normalised design matrix.
    pub rank: usize,
    /// Number of basis functions requested.
    pub basis_count: usize,
}

impl fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: rank {} of {} basis functions",
            self.kind, self.date, self.rank, self.basis_count
        )
    }
}
