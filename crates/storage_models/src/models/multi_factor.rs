//! Multi-factor mean-reverting spot price model.
//!
//! The log spot price is the log forward price plus a sum of zero-mean
//! factors, each a unit-volatility Ornstein–Uhlenbeck state scaled by the
//! factor volatility at the delivery date:
//!
//! ```text
//! S(T)    = F(T) * exp(sum_i x_i(T) - 0.5 * Var[sum_i x_i(T)])
//! x_i(T)  = sigma_i(T) * y_i(T)
//! dy_i(t) = -a_i y_i(t) dt + dW_i(t),    y_i(val_date) = 0
//! ```
//!
//! with `W` correlated Brownian motions. This is the spot implied by the
//! forward curve dynamics `dF(t, T) / F(t, T) = sum_i sigma_i(T) exp(-a_i (T - t)) dW_i(t)`,
//! so a volatility that changes sign over the year (the seasonal factor)
//! makes summer and winter prices move against each other. This module
//! holds the model parameters; path generation lives in the pricing crate.
//!
//! ## Three-factor seasonal model
//!
//! | Factor | Mean reversion         | Volatility                                   |
//! |--------|------------------------|----------------------------------------------|
//! | `x_st` | `spot_mean_reversion`  | `spot_vol`                                   |
//! | `x_lt` | 0                      | `long_term_vol`                              |
//! | `x_sw` | 0                      | `seasonal_vol * cos(2π d(t) / 365.25)`       |
//!
//! where `d(t)` is the number of days since the most recent 1 April. The
//! three factors are uncorrelated.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::f64::consts::PI;

use storage_core::market_data::Curve;
use storage_core::types::{midnight, ConfigurationError, TimeGrid};

use super::correlation::{CholeskyFactor, CorrelationMatrix};

/// Name reserved for the spot price in basis-function expressions.
pub const SPOT_VARIABLE: &str = "s";

/// Names of the three-factor seasonal model factors, in factor order.
pub const THREE_FACTOR_NAMES: [&str; 3] = ["x_st", "x_lt", "x_sw"];

const DAYS_PER_YEAR_SEASONAL: f64 = 365.25;

/// Below this value of `a * dt` the exact OU variance is replaced by its
/// Taylor limit `dt`.
const SMALL_DECAY: f64 = 1e-12;

/// One mean-reverting factor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Factor {
    name: String,
    mean_reversion: f64,
    volatility: Curve,
}

impl Factor {
    /// Factor with the given name, mean reversion speed (per year) and
    /// annualised volatility curve.
    pub fn new(name: impl Into<String>, mean_reversion: f64, volatility: Curve) -> Self {
        Self {
            name: name.into(),
            mean_reversion,
            volatility,
        }
    }

    /// Variable name used in basis-function expressions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mean reversion speed `a` (per year).
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Volatility curve.
    pub fn volatility(&self) -> &Curve {
        &self.volatility
    }

    /// One-step decay `exp(-a dt)`.
    #[inline]
    pub fn decay(&self, dt: f64) -> f64 {
        (-self.mean_reversion * dt).exp()
    }

    /// Volatility at delivery date `t`, the loading of the factor's
    /// unit-volatility state.
    #[inline]
    pub fn volatility_at(&self, t: NaiveDateTime) -> f64 {
        self.volatility.value_at(t)
    }

    /// Standard deviation of the unit-volatility state's shock over
    /// `[t, t + dt]`: `sqrt((1 - exp(-2 a dt)) / (2 a))`.
    #[inline]
    pub fn shock_scale(&self, dt: f64) -> f64 {
        let two_a_dt = 2.0 * self.mean_reversion * dt;
        let variance_time = if two_a_dt < SMALL_DECAY {
            dt
        } else {
            -(-two_a_dt).exp_m1() / (2.0 * self.mean_reversion)
        };
        variance_time.sqrt()
    }
}

/// N correlated mean-reverting factors driving the spot price.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::market_data::Curve;
/// use storage_core::types::TimeGrid;
/// use storage_models::models::correlation::CorrelationMatrix;
/// use storage_models::models::multi_factor::MultiFactorModel;
///
/// let grid = TimeGrid::daily(
///     NaiveDate::from_ymd_opt(2021, 4, 25).unwrap(),
///     NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
/// )
/// .unwrap();
///
/// let model = MultiFactorModel::new(
///     vec![
///         (16.2, Curve::flat(grid, 0.64).unwrap()),
///         (0.0, Curve::flat(grid, 0.14).unwrap()),
///     ],
///     CorrelationMatrix::from_rows(&[[1.0, 0.64], [0.64, 1.0]]).unwrap(),
/// )
/// .unwrap();
///
/// assert_eq!(model.factor_names(), vec!["x0", "x1"]);
/// ```
#[derive(Debug, Clone)]
pub struct MultiFactorModel {
    factors: Vec<Factor>,
    correlation: CorrelationMatrix,
    cholesky: CholeskyFactor,
}

impl MultiFactorModel {
    /// Generic model with factors named `x0..x{N-1}`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for an empty factor list, negative or non-finite
    /// mean reversion, a correlation matrix of the wrong size, or one that
    /// is not positive semi-definite.
    ///
    /// Volatility curves may go negative (the seasonal factor does); a
    /// factor's value takes the sign of its volatility at the delivery date.
    pub fn new(
        factors: Vec<(f64, Curve)>,
        correlation: CorrelationMatrix,
    ) -> Result<Self, ConfigurationError> {
        let named = factors
            .into_iter()
            .enumerate()
            .map(|(i, (a, vol))| Factor::new(format!("x{}", i), a, vol))
            .collect();
        Self::with_factors(named, correlation)
    }

    /// Model from explicitly named factors.
    pub fn with_factors(
        factors: Vec<Factor>,
        correlation: CorrelationMatrix,
    ) -> Result<Self, ConfigurationError> {
        if factors.is_empty() {
            return Err(ConfigurationError::invalid(
                "factors",
                "at least one factor is required",
            ));
        }
        if correlation.dim() != factors.len() {
            return Err(ConfigurationError::Correlation(format!(
                "matrix is {}x{} but there are {} factors",
                correlation.dim(),
                correlation.dim(),
                factors.len()
            )));
        }

        let mut seen = HashSet::new();
        for factor in &factors {
            if !is_identifier(&factor.name) || factor.name == SPOT_VARIABLE {
                return Err(ConfigurationError::invalid(
                    "factor_name",
                    format!("'{}' is not a usable variable name", factor.name),
                ));
            }
            if !seen.insert(factor.name.as_str()) {
                return Err(ConfigurationError::invalid(
                    "factor_name",
                    format!("duplicate factor name '{}'", factor.name),
                ));
            }
            if !(factor.mean_reversion.is_finite() && factor.mean_reversion >= 0.0) {
                return Err(ConfigurationError::invalid(
                    "mean_reversion",
                    format!(
                        "factor '{}' has mean reversion {}, must be finite and non-negative",
                        factor.name, factor.mean_reversion
                    ),
                ));
            }
        }

        let cholesky = correlation.cholesky()?;
        Ok(Self {
            factors,
            correlation,
            cholesky,
        })
    }

    /// Single mean-reverting factor named `x0`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for a negative or non-finite mean reversion.
    pub fn one_factor(mean_reversion: f64, volatility: Curve) -> Result<Self, ConfigurationError> {
        Self::new(vec![(mean_reversion, volatility)], CorrelationMatrix::identity(1))
    }

    /// Three-factor seasonal model over `grid` (factors `x_st`, `x_lt`, `x_sw`).
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use storage_core::types::TimeGrid;
    /// use storage_models::models::multi_factor::MultiFactorModel;
    ///
    /// let grid = TimeGrid::daily(
    ///     NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
    /// )
    /// .unwrap();
    /// let model = MultiFactorModel::three_factor_seasonal(91.0, 0.85, 0.30, 0.19, grid).unwrap();
    ///
    /// assert_eq!(model.factor_names(), vec!["x_st", "x_lt", "x_sw"]);
    /// // Seasonal volatility peaks on 1 April.
    /// assert!((model.factors()[2].volatility().values()[0] - 0.19).abs() < 1e-12);
    /// ```
    pub fn three_factor_seasonal(
        spot_mean_reversion: f64,
        spot_vol: f64,
        long_term_vol: f64,
        seasonal_vol: f64,
        grid: TimeGrid,
    ) -> Result<Self, ConfigurationError> {
        let [st, lt, sw] = THREE_FACTOR_NAMES;
        let factors = vec![
            Factor::new(st, spot_mean_reversion, Curve::flat(grid, spot_vol)?),
            Factor::new(lt, 0.0, Curve::flat(grid, long_term_vol)?),
            Factor::new(
                sw,
                0.0,
                Curve::from_fn(grid, |t| {
                    seasonal_vol * (2.0 * PI * days_since_april_first(t) / DAYS_PER_YEAR_SEASONAL).cos()
                })?,
            ),
        ];
        Self::with_factors(factors, CorrelationMatrix::identity(3))
    }

    /// Factors in model order.
    #[inline]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Number of factors.
    #[inline]
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    /// Factor names in model order.
    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.name()).collect()
    }

    /// Factor correlation matrix.
    #[inline]
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// Cholesky factor of the correlation matrix.
    #[inline]
    pub fn cholesky(&self) -> &CholeskyFactor {
        &self.cholesky
    }
}

/// Days (fractional for intra-day times) since the most recent 1 April.
pub fn days_since_april_first(t: NaiveDateTime) -> f64 {
    let year = t.year();
    let april = |y: i32| NaiveDate::from_ymd_opt(y, 4, 1).map(midnight);
    let anchor = match april(year) {
        Some(a) if a <= t => Some(a),
        _ => april(year - 1),
    };
    anchor
        .map(|a| (t - a).num_seconds() as f64 / 86_400.0)
        .unwrap_or(0.0)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
