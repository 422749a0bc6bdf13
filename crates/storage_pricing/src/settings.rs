//! Simulation settings loaded from TOML.
//!
//! ```toml
//! num_sims = 2000
//! seed = 12
//! basis_functions = "1 + x_st + x_sw + x_lt + s + s**2 + s**3"
//!
//! [inventory_grid]
//! num_points = 100
//!
//! [model]
//! type = "three_factor_seasonal"
//! spot_mean_reversion = 91.0
//! spot_vol = 0.85
//! long_term_vol = 0.30
//! seasonal_vol = 0.19
//! ```
//!
//! Volatilities in the settings are flat; the model is laid out on the
//! storage grid by [`LsmcSettings::to_config`].

use std::path::Path;

use serde::Deserialize;
use storage_core::market_data::Curve;
use storage_core::types::{ConfigurationError, TimeGrid};
use storage_models::models::{CorrelationMatrix, Factor, MultiFactorModel};

use crate::mc::{
    ConfigError, InventoryGridSpec, LsmcConfig, ValuationError, DEFAULT_INVENTORY_POINTS,
    DEFAULT_NUMERICAL_TOLERANCE, MAX_SIMS,
};

/// Inventory discretisation; `spacing` wins when both are given.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InventoryGridSettings {
    /// Number of grid points per date.
    pub num_points: Option<usize>,
    /// Maximum spacing between grid points.
    pub spacing: Option<f64>,
}

impl InventoryGridSettings {
    fn spec(&self) -> InventoryGridSpec {
        match (self.spacing, self.num_points) {
            (Some(h), _) => InventoryGridSpec::FixedSpacing(h),
            (None, Some(n)) => InventoryGridSpec::NumPoints(n),
            (None, None) => InventoryGridSpec::NumPoints(DEFAULT_INVENTORY_POINTS),
        }
    }
}

/// One factor of a generic multi-factor model.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FactorSettings {
    /// Variable name in basis expressions (`x{i}` when omitted).
    pub name: Option<String>,
    /// Mean reversion speed per year.
    pub mean_reversion: f64,
    /// Flat annualised volatility.
    pub volatility: f64,
}

/// Spot price model section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSettings {
    /// Three uncorrelated factors: spot, long term and seasonal.
    ThreeFactorSeasonal {
        /// Mean reversion of the spot factor.
        spot_mean_reversion: f64,
        /// Volatility of the spot factor.
        spot_vol: f64,
        /// Volatility of the long-term factor.
        long_term_vol: f64,
        /// Peak volatility of the seasonal factor.
        seasonal_vol: f64,
    },
    /// Arbitrary factors with an optional correlation matrix (identity
    /// when omitted).
    MultiFactor {
        /// Factors in model order.
        factors: Vec<FactorSettings>,
        /// Correlation matrix rows.
        #[serde(default)]
        correlation: Option<Vec<Vec<f64>>>,
    },
}

impl ModelSettings {
    /// Builds the model with volatility curves over `grid`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` when the model parameters or correlation are
    /// rejected.
    pub fn build(&self, grid: TimeGrid) -> Result<MultiFactorModel, ConfigurationError> {
        match self {
            Self::ThreeFactorSeasonal {
                spot_mean_reversion,
                spot_vol,
                long_term_vol,
                seasonal_vol,
            } => MultiFactorModel::three_factor_seasonal(
                *spot_mean_reversion,
                *spot_vol,
                *long_term_vol,
                *seasonal_vol,
                grid,
            ),
            Self::MultiFactor {
                factors,
                correlation,
            } => {
                let named = factors
                    .iter()
                    .enumerate()
                    .map(|(i, f)| {
                        let name = f.name.clone().unwrap_or_else(|| format!("x{}", i));
                        Ok(Factor::new(name, f.mean_reversion, Curve::flat(grid, f.volatility)?))
                    })
                    .collect::<Result<Vec<_>, ConfigurationError>>()?;
                let correlation = match correlation {
                    Some(rows) => CorrelationMatrix::from_rows(rows)?,
                    None => CorrelationMatrix::identity(named.len()),
                };
                MultiFactorModel::with_factors(named, correlation)
            }
        }
    }
}

/// Simulation settings as read from a settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LsmcSettings {
    /// Number of simulated paths.
    pub num_sims: usize,

    /// Seed of the regression paths.
    #[serde(default)]
    pub seed: u64,

    /// Seed of an independent forward path set.
    #[serde(default)]
    pub fwd_sim_seed: Option<u64>,

    /// Basis-function expression.
    pub basis_functions: String,

    /// Multiply deltas by their discount factor.
    #[serde(default)]
    pub discount_deltas: bool,

    /// Relative numerical tolerance.
    #[serde(default = "default_numerical_tolerance")]
    pub numerical_tolerance: f64,

    /// Inventory discretisation.
    #[serde(default)]
    pub inventory_grid: InventoryGridSettings,

    /// Spot price model.
    pub model: ModelSettings,
}

fn default_numerical_tolerance() -> f64 {
    DEFAULT_NUMERICAL_TOLERANCE
}

impl LsmcSettings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Checks the numeric settings without building the model.
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
        if self.basis_functions.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "basis_functions",
                value: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Loads and validates settings from a TOML file.
    pub fn load_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builds the engine configuration with the model laid out on `grid`.
    ///
    /// # Errors
    ///
    /// `ValuationError::Config` for invalid numeric settings and
    /// `ValuationError::Configuration` for a rejected model or basis.
    pub fn to_config(&self, grid: TimeGrid) -> Result<LsmcConfig, ValuationError> {
        self.validate()?;
        let model = self.model.build(grid)?;
        let mut builder = LsmcConfig::builder()
            .num_sims(self.num_sims)
            .seed(self.seed)
            .model(model)
            .basis_functions(self.basis_functions.as_str())
            .discount_deltas(self.discount_deltas)
            .numerical_tolerance(self.numerical_tolerance)
            .inventory_grid(self.inventory_grid.spec());
        if let Some(seed) = self.fwd_sim_seed {
            builder = builder.fwd_sim_seed(seed);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid() -> TimeGrid {
        TimeGrid::daily(
            NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
        )
        .unwrap()
    }

    const THREE_FACTOR: &str = r#"
num_sims = 2000
seed = 12
basis_functions = "1 + x_st + x_sw + x_lt + s + s**2 + s**3"

[model]
type = "three_factor_seasonal"
spot_mean_reversion = 91.0
spot_vol = 0.85
long_term_vol = 0.30
seasonal_vol = 0.19
"#;

    #[test]
    fn test_three_factor_defaults() {
        let settings = LsmcSettings::from_toml_str(THREE_FACTOR).unwrap();
        assert_eq!(settings.num_sims, 2000);
        assert_eq!(settings.fwd_sim_seed, None);
        assert!(!settings.discount_deltas);
        assert_eq!(settings.numerical_tolerance, DEFAULT_NUMERICAL_TOLERANCE);
        assert_eq!(
            settings.inventory_grid.spec(),
            InventoryGridSpec::NumPoints(DEFAULT_INVENTORY_POINTS)
        );

        let config = settings.to_config(grid()).unwrap();
        assert_eq!(config.basis().len(), 7);
        assert_eq!(config.model().num_factors(), 3);
        assert_eq!(config.seed(), 12);
    }

    #[test]
    fn test_multi_factor_with_correlation() {
        let toml = r#"
num_sims = 100
fwd_sim_seed = 5
basis_functions = "1 + fast + slow + s"
discount_deltas = true

[inventory_grid]
spacing = 250.0

[model]
type = "multi_factor"
correlation = [[1.0, 0.6], [0.6, 1.0]]

[[model.factors]]
name = "fast"
mean_reversion = 16.2
volatility = 0.64

[[model.factors]]
name = "slow"
mean_reversion = 0.0
volatility = 0.14
"#;
        let settings = LsmcSettings::from_toml_str(toml).unwrap();
        let config = settings.to_config(grid()).unwrap();
        assert_eq!(config.fwd_sim_seed(), Some(5));
        assert!(config.discount_deltas());
        assert_eq!(config.inventory_grid(), InventoryGridSpec::FixedSpacing(250.0));
        assert_eq!(config.model().factor_names(), vec!["fast", "slow"]);
        assert_eq!(config.model().correlation().get(0, 1), 0.6);
    }

    #[test]
    fn test_unnamed_factors_default_names() {
        let model = ModelSettings::MultiFactor {
            factors: vec![FactorSettings {
                name: None,
                mean_reversion: 2.0,
                volatility: 0.3,
            }],
            correlation: None,
        };
        assert_eq!(model.build(grid()).unwrap().factor_names(), vec!["x0"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            LsmcSettings::from_toml_str("num_sims = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        let unknown = format!("unknown_key = 1\n{}", THREE_FACTOR);
        assert!(matches!(LsmcSettings::from_toml_str(&unknown), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = LsmcSettings::from_toml_str(THREE_FACTOR).unwrap();
        settings.num_sims = 0;
        assert_eq!(settings.validate(), Err(ConfigError::InvalidPathCount(0)));

        settings.num_sims = 10;
        settings.numerical_tolerance = -1.0;
        assert!(matches!(
            settings.to_config(grid()),
            Err(ValuationError::Config(ConfigError::InvalidParameter {
                name: "numerical_tolerance",
                ..
            }))
        ));
    }

    #[test]
    fn test_bad_basis_and_correlation() {
        let settings =
            LsmcSettings::from_toml_str(&THREE_FACTOR.replace("s**3", "unknown**3")).unwrap();
        assert!(matches!(
            settings.to_config(grid()),
            Err(ValuationError::Configuration(_))
        ));

        let model = ModelSettings::MultiFactor {
            factors: vec![
                FactorSettings { name: None, mean_reversion: 1.0, volatility: 0.2 },
                FactorSettings { name: None, mean_reversion: 0.0, volatility: 0.2 },
            ],
            correlation: Some(vec![vec![1.0, 1.5], vec![1.5, 1.0]]),
        };
        assert!(model.build(grid()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = LsmcSettings::load(Path::new("/nonexistent/lsmc.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
