//! Market data inputs to a storage valuation.
//!
//! - [`curves`]: forward price, interest-rate and other grid curves
//! - [`discount`]: settlement rules and the [`DiscountEngine`](discount::DiscountEngine)

pub mod curves;
pub mod discount;

pub use curves::{Curve, PillarInterpolation};
pub use discount::{DiscountEngine, MonthEndOffset, SameDay, SettlementRule};
