//! Least-squares Monte Carlo valuation of a storage facility.
//!
//! A valuation runs in five phases:
//!
//! 1. Inventory space: feasible inventory ranges and grids per date
//! 2. Intrinsic value on the forward curve
//! 3. Path simulation
//! 4. Backward induction with one regression per decision date
//! 5. Forward simulation of the regression policy, giving the NPV, deltas,
//!    the expected profile and trigger prices

mod decision;
mod engine;
mod forward;
mod intrinsic;
mod inventory_space;
mod result;
mod triggers;

pub use decision::{best_decision, Decision, Node};
pub use engine::{value, LsmcEngine};
pub use intrinsic::{intrinsic_value, IntrinsicOutcome};
pub use inventory_space::{InventoryGrid, InventorySpace};
pub use result::{ProfileRow, TriggerPrice, ValuationResult};
pub use triggers::trigger_price;
