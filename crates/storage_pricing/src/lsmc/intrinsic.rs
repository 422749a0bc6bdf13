//! Intrinsic valuation: the optimal static schedule on the forward curve.
//!
//! The backward induction runs on the single deterministic path equal to
//! the forward curve, with exact continuation values. The schedule is then
//! rolled forward from the starting inventory.

use chrono::NaiveDateTime;
use storage_models::storage::StorageSpec;
use tracing::debug;

use super::decision::{best_decision, Node};
use super::inventory_space::InventorySpace;
use super::result::ProfileRow;
use crate::mc::ValuationError;

/// Intrinsic value and schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct IntrinsicOutcome {
    /// Sum of the schedule's discounted cash flows.
    pub npv: f64,
    /// Schedule per decision date.
    pub profile: Vec<ProfileRow>,
}

/// Values the static schedule over the decision dates of `space`.
///
/// `forward` and `discount_factors` hold one entry per decision date.
///
/// # Errors
///
/// `ValuationError::InvariantViolation` when a node has no feasible
/// decision or a value is not finite.
pub fn intrinsic_value(
    storage: &StorageSpec,
    space: &InventorySpace,
    forward: &[f64],
    discount_factors: &[f64],
    tol: f64,
) -> Result<IntrinsicOutcome, ValuationError> {
    let steps = space.num_states() - 1;
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); steps + 1];
    values[steps] = vec![0.0; space.grid(steps).len()];
    let mut candidates = Vec::new();

    for i in (0..steps).rev() {
        let date = space.date(i);
        let grid = space.grid(i);
        let next_grid = space.grid(i + 1);
        let mut current = Vec::with_capacity(grid.len());
        for s in grid.points() {
            let node = node(storage, space, i, date, s, forward[i], discount_factors[i])?;
            let d = best_decision(storage, &node, next_grid, &values[i + 1], tol, &mut candidates);
            if !d.objective.is_finite() {
                return Err(ValuationError::invariant(
                    date,
                    None,
                    format!("non-finite intrinsic value at inventory {}", s),
                ));
            }
            current.push(d.objective);
        }
        values[i] = current;
    }

    let mut profile = Vec::with_capacity(steps);
    let mut npv = 0.0;
    let mut s = space.grid(0).point(0);
    for i in 0..steps {
        let date = space.date(i);
        let node = node(storage, space, i, date, s, forward[i], discount_factors[i])?;
        let d = best_decision(
            storage,
            &node,
            space.grid(i + 1),
            &values[i + 1],
            tol,
            &mut candidates,
        );
        profile.push(ProfileRow::new(date, s, d.volume, d.cash_flow_pv));
        npv += d.cash_flow_pv;
        s += d.volume;
        if !space.is_feasible(i + 1, s) {
            return Err(ValuationError::invariant(
                date,
                None,
                format!("intrinsic schedule leaves the feasible range at inventory {}", s),
            ));
        }
    }

    debug!(intrinsic_npv = npv, steps, "intrinsic valuation complete");
    Ok(IntrinsicOutcome { npv, profile })
}

fn node(
    storage: &StorageSpec,
    space: &InventorySpace,
    i: usize,
    date: NaiveDateTime,
    inventory: f64,
    price: f64,
    discount_factor: f64,
) -> Result<Node, ValuationError> {
    let interval = space.decision_interval(storage, i, inventory).ok_or_else(|| {
        ValuationError::invariant(
            date,
            None,
            format!("no feasible decision at inventory {}", inventory),
        )
    })?;
    Ok(Node {
        date,
        inventory,
        price,
        discount_factor,
        interval,
    })
}
