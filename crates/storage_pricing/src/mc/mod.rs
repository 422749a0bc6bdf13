//! Simulation settings, spot price paths and valuation errors.
//!
//! - [`LsmcConfig`]: validated simulation and regression settings
//! - [`SpotPriceSimulator`]: correlated multi-factor path generation
//! - [`ValuationError`] and [`NumericalWarning`]: failure and diagnostics

mod config;
mod error;
mod paths;

pub use config::{
    InventoryGridSpec, LsmcConfig, LsmcConfigBuilder, DEFAULT_INVENTORY_POINTS,
    DEFAULT_NUMERICAL_TOLERANCE, MAX_INVENTORY_POINTS, MAX_SIMS,
};
pub use error::{ConfigError, NumericalWarning, ValuationError, WarningKind};
pub use paths::{SimulatedPaths, SpotPriceSimulator};
