//! LSMC valuation configuration.
//!
//! This module provides [`LsmcConfig`] and its builder. Construction
//! validates every setting and compiles the basis-function expression
//! against the model's factor names, so a configuration that builds can be
//! handed to the engine without further checks.

use storage_models::models::{MultiFactorModel, SPOT_VARIABLE};

use super::error::{ConfigError, ValuationError};
use crate::basis::BasisFunctions;

/// Maximum number of simulated paths.
pub const MAX_SIMS: usize = 10_000_000;

/// Default relative numerical tolerance.
pub const DEFAULT_NUMERICAL_TOLERANCE: f64 = 1e-10;

/// Default number of inventory grid points per decision date.
pub const DEFAULT_INVENTORY_POINTS: usize = 100;

/// Maximum number of inventory grid points per decision date.
pub const MAX_INVENTORY_POINTS: usize = 100_000;

/// Discretisation of the feasible inventory range at each decision date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InventoryGridSpec {
    /// Uniform grid with at most this spacing between points.
    FixedSpacing(f64),
    /// Uniform grid with this many points (at least two).
    NumPoints(usize),
}

impl Default for InventoryGridSpec {
    fn default() -> Self {
        Self::NumPoints(DEFAULT_INVENTORY_POINTS)
    }
}

impl InventoryGridSpec {
    /// Number of grid points over a range of `width`, or `None` when it
    /// would exceed [`MAX_INVENTORY_POINTS`].
    pub fn point_count(&self, width: f64, tol: f64) -> Option<usize> {
        let n = match *self {
            Self::NumPoints(n) => n.max(2),
            Self::FixedSpacing(h) => {
                let intervals = (width / h - tol).ceil().max(1.0);
                if intervals.is_nan() || intervals >= MAX_INVENTORY_POINTS as f64 {
                    return None;
                }
                intervals as usize + 1
            }
        };
        (n <= MAX_INVENTORY_POINTS).then_some(n)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::FixedSpacing(h) if !(h.is_finite() && h > 0.0) => {
                Err(ConfigError::InvalidParameter {
                    name: "inventory_grid",
                    value: format!("spacing must be positive and finite, got {}", h),
                })
            }
            Self::NumPoints(n) if n < 2 => Err(ConfigError::InvalidParameter {
                name: "inventory_grid",
                value: format!("at least 2 points required, got {}", n),
            }),
            Self::NumPoints(n) if n > MAX_INVENTORY_POINTS => Err(ConfigError::InvalidParameter {
                name: "inventory_grid",
                value: format!("at most {} points allowed, got {}", MAX_INVENTORY_POINTS, n),
            }),
            _ => Ok(()),
        }
    }
}

/// Settings of one LSMC valuation.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use storage_core::types::TimeGrid;
/// use storage_models::models::MultiFactorModel;
/// use storage_pricing::mc::LsmcConfig;
///
/// let grid = TimeGrid::daily(
///     NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
/// )
/// .unwrap();
/// let model = MultiFactorModel::three_factor_seasonal(91.0, 0.85, 0.30, 0.19, grid).unwrap();
///
/// let config = LsmcConfig::builder()
///     .num_sims(500)
///     .seed(12)
///     .model(model)
///     .basis_functions("1 + x_st + x_sw + x_lt + s + s**2 + s**3")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.basis().len(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct LsmcConfig {
    num_sims: usize,
    seed: u64,
    fwd_sim_seed: Option<u64>,
    model: MultiFactorModel,
    basis: BasisFunctions,
    discount_deltas: bool,
    numerical_tolerance: f64,
    inventory_grid: InventoryGridSpec,
}

impl LsmcConfig {
    /// Creates a builder.
    #[inline]
    pub fn builder() -> LsmcConfigBuilder {
        LsmcConfigBuilder::default()
    }

    /// Number of simulated paths.
    #[inline]
    pub fn num_sims(&self) -> usize {
        self.num_sims
    }

    /// Seed of the regression path set.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed of an independent forward path set; `None` reuses the regression
    /// paths.
    #[inline]
    pub fn fwd_sim_seed(&self) -> Option<u64> {
        self.fwd_sim_seed
    }

    /// Spot price model.
    #[inline]
    pub fn model(&self) -> &MultiFactorModel {
        &self.model
    }

    /// Compiled regression basis over the factor names followed by `s`.
    #[inline]
    pub fn basis(&self) -> &BasisFunctions {
        &self.basis
    }

    /// Whether deltas include the discount factor of their date.
    #[inline]
    pub fn discount_deltas(&self) -> bool {
        self.discount_deltas
    }

    /// Relative tolerance for the regression cutoff, decision ties and
    /// inventory-bound slack.
    #[inline]
    pub fn numerical_tolerance(&self) -> f64 {
        self.numerical_tolerance
    }

    /// Inventory discretisation.
    #[inline]
    pub fn inventory_grid(&self) -> InventoryGridSpec {
        self.inventory_grid
    }

    /// Validates the numeric settings.
    ///
    /// # Errors
    ///
    /// `ConfigError` for a simulation count outside [1, 10_000_000], a
    /// non-positive tolerance or an invalid inventory grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_sims == 0 || self.num_sims > MAX_SIMS {
            return Err(ConfigError::InvalidPathCount(self.num_sims));
        }
        if !(self.numerical_tolerance.is_finite() && self.numerical_tolerance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "numerical_tolerance",
                value: format!("must be positive and finite, got {}", self.numerical_tolerance),
            });
        }
        self.inventory_grid.validate()
    }
}

/// Builder for [`LsmcConfig`].
///
/// Required: `num_sims`, `model` and `basis_functions`.
#[derive(Debug, Default)]
pub struct LsmcConfigBuilder {
    num_sims: Option<usize>,
    seed: u64,
    fwd_sim_seed: Option<u64>,
    model: Option<MultiFactorModel>,
    basis_functions: Option<String>,
    discount_deltas: bool,
    numerical_tolerance: Option<f64>,
    inventory_grid: InventoryGridSpec,
}

impl LsmcConfigBuilder {
    /// Number of simulated paths.
    #[inline]
    pub fn num_sims(mut self, num_sims: usize) -> Self {
        self.num_sims = Some(num_sims);
        self
    }

    /// Seed of the regression path set (default 0).
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Seed of an independent forward path set.
    #[inline]
    pub fn fwd_sim_seed(mut self, seed: u64) -> Self {
        self.fwd_sim_seed = Some(seed);
        self
    }

    /// Spot price model.
    #[inline]
    pub fn model(mut self, model: MultiFactorModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Basis-function expression, a sum of terms over the factor names and `s`.
    #[inline]
    pub fn basis_functions(mut self, expression: impl Into<String>) -> Self {
        self.basis_functions = Some(expression.into());
        self
    }

    /// Multiply deltas by the discount factor of their date (default off).
    #[inline]
    pub fn discount_deltas(mut self, on: bool) -> Self {
        self.discount_deltas = on;
        self
    }

    /// Relative numerical tolerance (default 1e-10).
    #[inline]
    pub fn numerical_tolerance(mut self, tol: f64) -> Self {
        self.numerical_tolerance = Some(tol);
        self
    }

    /// Inventory discretisation (default 100 points).
    #[inline]
    pub fn inventory_grid(mut self, spec: InventoryGridSpec) -> Self {
        self.inventory_grid = spec;
        self
    }

    /// Validates the settings and compiles the basis.
    ///
    /// # Errors
    ///
    /// `ValuationError::Config` for missing or invalid settings and
    /// `ValuationError::Configuration` for a malformed basis expression or
    /// one naming an unknown variable.
    pub fn build(self) -> Result<LsmcConfig, ValuationError> {
        let num_sims = self.num_sims.ok_or(ConfigError::InvalidParameter {
            name: "num_sims",
            value: "must be specified".to_string(),
        })?;
        let model = self.model.ok_or(ConfigError::InvalidParameter {
            name: "model",
            value: "must be specified".to_string(),
        })?;
        let expression = self.basis_functions.ok_or(ConfigError::InvalidParameter {
            name: "basis_functions",
            value: "must be specified".to_string(),
        })?;

        let mut variables = model.factor_names();
        variables.push(SPOT_VARIABLE);
        let basis = BasisFunctions::parse(&expression, &variables)?;

        let config = LsmcConfig {
            num_sims,
            seed: self.seed,
            fwd_sim_seed: self.fwd_sim_seed,
            model,
            basis,
            discount_deltas: self.discount_deltas,
            numerical_tolerance: self
                .numerical_tolerance
                .unwrap_or(DEFAULT_NUMERICAL_TOLERANCE),
            inventory_grid: self.inventory_grid,
        };

        config.validate()?;
        Ok(config)
    }
}
