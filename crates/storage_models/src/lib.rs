//! # storage_models: Storage Facilities and Price Models
//!
//! ## Layer 2 (Business Logic) Role
//!
//! storage_models sits on top of `storage_core` and provides:
//! - Storage facility constraints: inventory bounds, rate limits, ratchets,
//!   costs and terminal requirements (`storage`)
//! - Multi-factor mean-reverting spot price model parameters and factor
//!   correlation (`models`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use storage_core::types::{midnight, TimeGrid};
//! use storage_models::storage::{RatchetInterp, RatchetTable, StorageSpec};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let grid = TimeGrid::daily(start, NaiveDate::from_ymd_opt(2022, 4, 1).unwrap()).unwrap();
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
//!
//! let storage = StorageSpec::builder()
//!     .grid(grid)
//!     .injection_cost(0.01)
//!     .withdrawal_cost(0.025)
//!     .ratchets(ratchets)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(storage.inventory_bounds(midnight(start)), (0.0, 7000.0));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for specs, ratchets and models

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod models;
pub mod storage;
