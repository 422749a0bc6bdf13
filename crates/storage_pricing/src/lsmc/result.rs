//! Valuation outputs.

use chrono::NaiveDateTime;
use storage_core::types::TimeSeries;

use crate::mc::NumericalWarning;

/// Spot prices at which the decision switches from holding.
///
/// Volumes are magnitudes; a side with no feasible volume carries `None`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TriggerPrice {
    /// Decision date.
    pub date: NaiveDateTime,
    /// Largest injection from the expected inventory.
    pub inject_volume: Option<f64>,
    /// Spot price at which injecting `inject_volume` breaks even with holding.
    pub inject_trigger_price: Option<f64>,
    /// Largest withdrawal from the expected inventory.
    pub withdraw_volume: Option<f64>,
    /// Spot price at which withdrawing `withdraw_volume` breaks even with holding.
    pub withdraw_trigger_price: Option<f64>,
}

/// One date of an inventory and cash-flow profile.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProfileRow {
    /// Decision date.
    pub date: NaiveDateTime,
    /// Inventory before the decision.
    pub inventory: f64,
    /// Volume injected.
    pub injected: f64,
    /// Volume withdrawn, as a magnitude.
    pub withdrawn: f64,
    /// Discounted cash flow of the period.
    pub cash_flow_pv: f64,
}

impl ProfileRow {
    pub(crate) fn new(date: NaiveDateTime, inventory: f64, volume: f64, cash_flow_pv: f64) -> Self {
        Self {
            date,
            inventory,
            injected: volume.max(0.0),
            withdrawn: (-volume).max(0.0),
            cash_flow_pv,
        }
    }

    /// Signed volume, positive for injection.
    pub fn net_volume(&self) -> f64 {
        self.injected - self.withdrawn
    }
}

/// Result of a storage valuation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValuationResult {
    /// Expected discounted value of the optimal policy.
    pub npv: f64,
    /// Value of the static optimal schedule on the forward curve.
    pub intrinsic_npv: f64,
    /// `npv - intrinsic_npv`.
    pub extrinsic_npv: f64,
    /// Monte Carlo standard error of `npv`.
    pub npv_std_error: f64,
    /// Sensitivity of `npv` to the forward price of each decision date.
    pub deltas: TimeSeries,
    /// Trigger prices per decision date.
    pub trigger_prices: Vec<TriggerPrice>,
    /// Path-averaged profile of the optimal policy.
    pub expected_profile: Vec<ProfileRow>,
    /// Static schedule on the forward curve.
    pub intrinsic_profile: Vec<ProfileRow>,
    /// Recoverable regression problems.
    pub warnings: Vec<NumericalWarning>,
    /// Number of simulated paths.
    pub num_sims: usize,
}

impl ValuationResult {
    /// Result of a valuation on or after the storage end: nothing left to
    /// value.
    pub fn expired(num_sims: usize) -> Self {
        Self {
            npv: 0.0,
            intrinsic_npv: 0.0,
            extrinsic_npv: 0.0,
            npv_std_error: 0.0,
            deltas: TimeSeries::default(),
            trigger_prices: Vec::new(),
            expected_profile: Vec::new(),
            intrinsic_profile: Vec::new(),
            warnings: Vec::new(),
            num_sims,
        }
    }
}
