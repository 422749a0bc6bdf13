//! # storage_pricing: Least-Squares Monte Carlo Storage Valuation
//!
//! ## Layer 3 (Engine) Role
//!
//! storage_pricing sits on top of `storage_core` and `storage_models` and
//! provides:
//! - Per-path random streams (`rng`)
//! - Simulation settings, spot price paths and errors (`mc`)
//! - Basis-function expressions compiled to closures (`basis`)
//! - SVD least-squares regression of continuation values (`regression`)
//! - Inventory space, intrinsic value, backward induction, forward
//!   simulation and trigger prices (`lsmc`)
//! - TOML simulation settings (`settings`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use storage_core::market_data::{Curve, DiscountEngine, MonthEndOffset};
//! use storage_core::types::{midnight, TimeGrid};
//! use storage_models::models::MultiFactorModel;
//! use storage_models::storage::{RatchetInterp, RatchetTable, StorageSpec};
//! use storage_pricing::lsmc::LsmcEngine;
//! use storage_pricing::mc::{InventoryGridSpec, LsmcConfig};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let grid = TimeGrid::daily(start, NaiveDate::from_ymd_opt(2021, 5, 1).unwrap()).unwrap();
//!
//! let ratchets = RatchetTable::from_rows(
//!     vec![(
//!         midnight(start),
//!         vec![
//!             (0.0, -150.0, 250.0),
//!             (2000.0, -200.0, 175.0),
//!             (5000.0, -260.0, 155.0),
//!             (7000.0, -275.0, 132.0),
//!         ],
//!     )],
//!     RatchetInterp::Linear,
//! )
//! .unwrap();
//! let storage = StorageSpec::builder()
//!     .grid(grid)
//!     .injection_cost(0.01)
//!     .withdrawal_cost(0.025)
//!     .ratchets(ratchets)
//!     .build()
//!     .unwrap();
//!
//! let config = LsmcConfig::builder()
//!     .num_sims(100)
//!     .seed(12)
//!     .model(MultiFactorModel::three_factor_seasonal(91.0, 0.85, 0.30, 0.19, grid).unwrap())
//!     .basis_functions("1 + x_st + x_sw + x_lt + s + s**2 + s**3")
//!     .inventory_grid(InventoryGridSpec::NumPoints(20))
//!     .build()
//!     .unwrap();
//!
//! let forward = Curve::flat(grid, 15.0).unwrap();
//! let discount = DiscountEngine::new(
//!     midnight(start),
//!     Curve::flat(grid, 0.005).unwrap(),
//!     MonthEndOffset::new(20),
//! );
//!
//! let result = LsmcEngine::new(config)
//!     .value(&storage, midnight(start), 0.0, &forward, &discount)
//!     .unwrap();
//! assert_eq!(result.intrinsic_npv, 0.0);
//! assert_eq!(result.trigger_prices.len(), 30);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation of valuation results

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod basis;
pub mod lsmc;
pub mod mc;
pub mod regression;
pub mod rng;
pub mod settings;

pub use lsmc::{value, LsmcEngine, ValuationResult};
pub use mc::{LsmcConfig, ValuationError};
pub use settings::LsmcSettings;
