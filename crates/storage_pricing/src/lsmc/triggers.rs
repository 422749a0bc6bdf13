//! Trigger prices.
//!
//! At the expected inventory `s` of a date, with the path-averaged
//! continuation curve `C`, injecting the largest feasible volume `v` breaks
//! even with holding when
//!
//! ```text
//! -v P (1 + f_in) DF - c_in v DF + C(s + v) = C(s)
//! ```
//!
//! and withdrawing `w` breaks even when
//!
//! ```text
//! w P (1 - f_wd) DF - c_wd w DF + C(s - w) = C(s)
//! ```
//!
//! Solving for `P` gives the trigger prices. The inventory cost is paid in
//! both branches and cancels.

use storage_models::storage::StorageSpec;

use super::decision::Node;
use super::inventory_space::InventoryGrid;
use super::result::TriggerPrice;

/// Trigger prices at `node`, whose price field is ignored.
pub fn trigger_price(
    storage: &StorageSpec,
    node: &Node,
    next_grid: &InventoryGrid,
    continuation: &[f64],
    tol: f64,
) -> TriggerPrice {
    let s = node.inventory;
    let df = node.discount_factor;
    let (lo, hi) = node.interval;
    let min_volume = tol * (1.0 + s.abs());
    let hold = next_grid.interpolate(continuation, s);

    let (inject_volume, inject_trigger_price) = if hi > min_volume {
        let gain = next_grid.interpolate(continuation, s + hi) - hold;
        let price = (gain / df - storage.injection_cost() * hi)
            / (hi * (1.0 + storage.injection_fuel()));
        (Some(hi), Some(price))
    } else {
        (None, None)
    };

    let (withdraw_volume, withdraw_trigger_price) = if -lo > min_volume {
        let w = -lo;
        let loss = hold - next_grid.interpolate(continuation, s - w);
        let price = (loss / df + storage.withdrawal_cost() * w)
            / (w * (1.0 - storage.withdrawal_fuel()));
        (Some(w), Some(price))
    } else {
        (None, None)
    };

    TriggerPrice {
        date: node.date,
        inject_volume,
        inject_trigger_price,
        withdraw_volume,
        withdraw_trigger_price,
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
            .injection_fuel(0.01)
            .withdrawal_fuel(0.02)
            .max_inventory(1000.0)
            .max_injection_rate(100.0)
            .max_withdrawal_rate(100.0)
            .build()
            .unwrap()
    }

    fn node(interval: (f64, f64)) -> Node {
        Node {
            date: midnight(NaiveDate::from_ymd_opt(2021, 4, 10).unwrap()),
            inventory: 500.0,
            price: f64::NAN,
            discount_factor: 0.9,
            interval,
        }
    }

    #[test]
    fn test_linear_continuation() {
        // Each unit held is worth 18 in present value.
        let grid = InventoryGrid::uniform(0.0, 1000.0, InventoryGridSpec::NumPoints(11), 1e-10);
        let continuation: Vec<f64> = grid.points().map(|s| 18.0 * s).collect();
        let tp = trigger_price(&storage(), &node((-100.0, 100.0)), &grid, &continuation, 1e-10);

        assert_eq!(tp.inject_volume, Some(100.0));
        assert_eq!(tp.withdraw_volume, Some(100.0));
        // Inject: P (1.01) = 18 / 0.9 - 0.1
        assert_relative_eq!(tp.inject_trigger_price.unwrap(), (20.0 - 0.1) / 1.01, epsilon = 1e-9);
        // Withdraw: P (0.98) = 18 / 0.9 + 0.2
        assert_relative_eq!(tp.withdraw_trigger_price.unwrap(), (20.0 + 0.2) / 0.98, epsilon = 1e-9);
        assert!(tp.withdraw_trigger_price > tp.inject_trigger_price);
    }

    #[test]
    fn test_no_volume_no_trigger() {
        let grid = InventoryGrid::uniform(0.0, 1000.0, InventoryGridSpec::NumPoints(11), 1e-10);
        let continuation = vec![0.0; grid.len()];
        let tp = trigger_price(&storage(), &node((0.0, 50.0)), &grid, &continuation, 1e-10);
        assert_eq!(tp.withdraw_volume, None);
        assert_eq!(tp.withdraw_trigger_price, None);
        assert_eq!(tp.inject_volume, Some(50.0));
        // Worthless continuation: only a negative price pays for injecting.
        assert!(tp.inject_trigger_price.unwrap() < 0.0);
    }
}
