//! # storage_core: Foundation Types for Commodity Storage Valuation
//!
//! ## Layer 1 (Foundation) Role
//!
//! storage_core is the bottom layer of the workspace, providing:
//! - Time grids and day counts (`types::time`)
//! - Dated output series (`types::series`)
//! - Error types: `ConfigurationError`, `InterpolationError` (`types::error`)
//! - Linear and step interpolators (`math::interpolators`)
//! - Grid curves built from values or sparse pillars (`market_data::curves`)
//! - Settlement rules and discounting (`market_data::discount`)
//!
//! It has no dependencies on the other workspace crates.
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use storage_core::market_data::{Curve, DiscountEngine, MonthEndOffset, PillarInterpolation};
//! use storage_core::types::{midnight, TimeGrid};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
//! let grid = TimeGrid::daily(start, end).unwrap();
//!
//! let fwd = Curve::from_pillars(
//!     &[midnight(start), midnight(NaiveDate::from_ymd_opt(2021, 10, 1).unwrap())],
//!     &[15.0, 18.0],
//!     &grid,
//!     PillarInterpolation::Pad,
//! )
//! .unwrap();
//! assert_eq!(fwd.value_at(midnight(start)), 15.0);
//!
//! let rates = Curve::flat(grid, 0.01).unwrap();
//! let discount = DiscountEngine::new(midnight(start), rates, MonthEndOffset::new(20));
//! assert!(discount.discount_factor(grid.last()) < 1.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for grids, curves and series

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
