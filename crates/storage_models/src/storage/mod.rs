//! Storage facility constraints.
//!
//! - [`ratchet`]: inventory-dependent rate profiles keyed by effective date
//! - [`spec`]: the [`StorageSpec`] facility description and its builder

pub mod ratchet;
pub mod spec;

pub use ratchet::{RatchetInterp, RatchetProfile, RatchetRow, RatchetTable};
pub use spec::{RateLimits, StorageSpec, StorageSpecBuilder, TerminalInventory, TimeVarying};
