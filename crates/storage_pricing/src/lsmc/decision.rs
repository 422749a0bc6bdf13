//! Optimal decision at one (date, path, inventory) node.
//!
//! With continuation values linear in inventory between grid points, the
//! objective `discounted cash flow + continuation` is piecewise linear in
//! the decision volume. Its maximum over an interval is attained at an
//! interval end, at zero (where cost and fuel switch) or at a volume that
//! lands on a next-state grid point, so only those candidates are checked.

use chrono::NaiveDateTime;
use storage_models::storage::StorageSpec;

use super::inventory_space::InventoryGrid;

/// Chosen decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// Volume, positive for injection.
    pub volume: f64,
    /// Discounted cash flow of the decision.
    pub cash_flow_pv: f64,
    /// Cash flow plus estimated continuation.
    pub objective: f64,
}

/// Market state and interval of one decision node.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    /// Decision date.
    pub date: NaiveDateTime,
    /// Inventory before the decision.
    pub inventory: f64,
    /// Spot price.
    pub price: f64,
    /// Discount factor of the date's settlement.
    pub discount_factor: f64,
    /// Feasible `(min, max)` volume.
    pub interval: (f64, f64),
}

/// Maximises cash flow plus continuation over the candidates of `node`.
///
/// `continuation` holds one value per point of `next_grid`. Objectives
/// within `tol * (1 + |best|)` of the maximum count as ties, resolved in
/// favour of the smallest absolute volume. `candidates` is scratch space.
pub fn best_decision(
    storage: &StorageSpec,
    node: &Node,
    next_grid: &InventoryGrid,
    continuation: &[f64],
    tol: f64,
    candidates: &mut Vec<(f64, f64, f64)>,
) -> Decision {
    let (lo, hi) = node.interval;
    let s = node.inventory;

    candidates.clear();
    let mut push = |v: f64| {
        let v = v.clamp(lo, hi);
        let cf = storage.cash_flow(v, s, node.price) * node.discount_factor;
        let objective = cf + next_grid.interpolate(continuation, s + v);
        candidates.push((v, cf, objective));
    };

    push(lo);
    push(hi);
    if lo <= 0.0 && 0.0 <= hi {
        push(0.0);
    }
    for k in next_grid.indices_between(s + lo, s + hi) {
        push(next_grid.point(k) - s);
    }

    let best = candidates
        .iter()
        .map(|c| c.2)
        .fold(f64::NEG_INFINITY, f64::max);
    let threshold = best - tol * (1.0 + best.abs());

    let (volume, cash_flow_pv, objective) = candidates
        .iter()
        .filter(|c| c.2 >= threshold)
        .fold((f64::NAN, 0.0, f64::NEG_INFINITY), |acc, &c| {
            if acc.0.is_nan() || c.0.abs() < acc.0.abs() {
                c
            } else {
                acc
            }
        });

    Decision {
        volume,
        cash_flow_pv,
        objective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use storage_core::types::{midnight, TimeGrid};

    use crate::mc::InventoryGridSpec;

    fn storage() -> StorageSpec {
        StorageSpec::builder()
            .grid(
                TimeGrid::daily(
                    NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
                )
                .unwrap(),
            )
            .injection_cost(0.1)
            .withdrawal_cost(0.2)
            .max_inventory(1000.0)
            .max_injection_rate(100.0)
            .max_withdrawal_rate(100.0)
            .build()
            .unwrap()
    }

    fn node(inventory: f64, price: f64) -> Node {
        Node {
            date: midnight(NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()),
            inventory,
            price,
            discount_factor: 1.0,
            interval: (-100.0_f64.min(inventory), 100.0),
        }
    }

    fn grid() -> InventoryGrid {
        InventoryGrid::uniform(0.0, 1000.0, InventoryGridSpec::NumPoints(11), 1e-10)
    }

    #[test]
    fn test_injects_when_continuation_is_worth_more() {
        // Continuation worth 20 per unit, spot 10 plus 0.1 cost.
        let continuation: Vec<f64> = grid().points().map(|s| 20.0 * s).collect();
        let mut scratch = Vec::new();
        let d = best_decision(&storage(), &node(500.0, 10.0), &grid(), &continuation, 1e-10, &mut scratch);
        assert_eq!(d.volume, 100.0);
        assert_relative_eq!(d.cash_flow_pv, -100.0 * 10.1);
        assert_relative_eq!(d.objective, -1010.0 + 20.0 * 600.0);
    }

    #[test]
    fn test_withdraws_when_spot_is_high() {
        let continuation: Vec<f64> = grid().points().map(|s| 5.0 * s).collect();
        let mut scratch = Vec::new();
        let d = best_decision(&storage(), &node(500.0, 10.0), &grid(), &continuation, 1e-10, &mut scratch);
        assert_eq!(d.volume, -100.0);
        assert_relative_eq!(d.cash_flow_pv, 100.0 * 9.8);
    }

    #[test]
    fn test_tie_prefers_holding() {
        // Continuation exactly offsets injection at price + cost.
        let continuation: Vec<f64> = grid().points().map(|s| 10.1 * s).collect();
        let mut scratch = Vec::new();
        let d = best_decision(&storage(), &node(500.0, 10.0), &grid(), &continuation, 1e-10, &mut scratch);
        assert_eq!(d.volume, 0.0);
    }

    #[test]
    fn test_kinked_continuation_picks_grid_point() {
        // Continuation rises until 600 and is flat above; the optimum is the
        // grid point at the kink.
        let continuation: Vec<f64> = grid()
            .points()
            .map(|s| 30.0 * s.min(600.0))
            .collect();
        let mut scratch = Vec::new();
        let d = best_decision(&storage(), &node(550.0, 10.0), &grid(), &continuation, 1e-10, &mut scratch);
        assert_relative_eq!(d.volume, 50.0);
    }

    #[test]
    fn test_respects_interval() {
        let continuation: Vec<f64> = grid().points().map(|s| 100.0 * s).collect();
        let mut scratch = Vec::new();
        let mut n = node(990.0, 10.0);
        n.interval = (-100.0, 10.0);
        let d = best_decision(&storage(), &n, &grid(), &continuation, 1e-10, &mut scratch);
        assert_relative_eq!(d.volume, 10.0);
    }
}
