//! Forward simulation of the regression policy.
//!
//! Each path starts at the initial inventory and follows the decisions
//! implied by the stored regressions. Per-path outcomes are computed in
//! parallel, collected in path order and aggregated sequentially.

use rayon::prelude::*;
use storage_models::storage::StorageSpec;

use super::decision::{best_decision, Node};
use super::engine::design_rows;
use super::inventory_space::InventorySpace;
use super::result::{ProfileRow, TriggerPrice};
use super::triggers::trigger_price;
use crate::basis::BasisFunctions;
use crate::mc::{SimulatedPaths, ValuationError};
use crate::regression::Regression;

/// Aggregated forward simulation.
#[derive(Clone, Debug)]
pub struct ForwardOutcome {
    /// Mean of the summed discounted cash flows.
    pub npv: f64,
    /// Standard error of `npv`.
    pub std_error: f64,
    /// Pathwise forward-price sensitivities per date.
    pub deltas: Vec<f64>,
    /// Path-averaged profile per date.
    pub profile: Vec<ProfileRow>,
    /// Trigger prices per date.
    pub trigger_prices: Vec<TriggerPrice>,
}

struct PathOutcome {
    pv: f64,
    inventory: Vec<f64>,
    volume: Vec<f64>,
    cash_flow: Vec<f64>,
    delta: Vec<f64>,
}

/// Inputs shared by every path of the forward pass.
pub struct ForwardInputs<'a> {
    /// Facility.
    pub storage: &'a StorageSpec,
    /// Inventory ranges and grids.
    pub space: &'a InventorySpace,
    /// Paths to simulate the policy on.
    pub paths: &'a SimulatedPaths,
    /// Regression basis.
    pub basis: &'a BasisFunctions,
    /// Regression per decision date.
    pub regressions: &'a [Regression],
    /// Discount factor per decision date.
    pub discount_factors: &'a [f64],
    /// Whether deltas include the discount factor.
    pub discount_deltas: bool,
    /// Relative numerical tolerance.
    pub tol: f64,
}

/// Runs the forward pass.
///
/// # Errors
///
/// `ValuationError::InvariantViolation` when a path reaches a node without
/// a feasible decision, leaves the feasible inventory range, or produces a
/// non-finite value.
pub fn forward_pass(inputs: &ForwardInputs<'_>) -> Result<ForwardOutcome, ValuationError> {
    let paths = inputs.paths;
    let steps = paths.num_steps();
    let num_paths = paths.num_paths();
    let k = inputs.basis.len();
    let n = paths.num_factors();

    let outcomes = (0..num_paths)
        .into_par_iter()
        .map_init(
            || (vec![0.0; n + 1], vec![0.0; k], Vec::new(), Vec::new()),
            |(state, row, continuation, candidates), p| {
                simulate_path(inputs, p, state, row, continuation, candidates)
            },
        )
        .collect::<Result<Vec<_>, _>>()?;

    let count = num_paths as f64;
    let npv = outcomes.iter().map(|o| o.pv).sum::<f64>() / count;
    let std_error = if num_paths > 1 {
        let ss: f64 = outcomes.iter().map(|o| (o.pv - npv) * (o.pv - npv)).sum();
        (ss / (count - 1.0) / count).sqrt()
    } else {
        0.0
    };

    let mut deltas = Vec::with_capacity(steps);
    let mut profile = Vec::with_capacity(steps);
    let mut trigger_prices = Vec::with_capacity(steps);
    for i in 0..steps {
        let date = paths.dates()[i];
        let mean = |f: &dyn Fn(&PathOutcome) -> f64| outcomes.iter().map(f).sum::<f64>() / count;

        let inventory = mean(&|o| o.inventory[i]);
        deltas.push(mean(&|o| o.delta[i]));
        profile.push(ProfileRow {
            date,
            inventory,
            injected: mean(&|o| o.volume[i].max(0.0)),
            withdrawn: mean(&|o| (-o.volume[i]).max(0.0)),
            cash_flow_pv: mean(&|o| o.cash_flow[i]),
        });
        trigger_prices.push(expected_trigger(inputs, i, inventory));
    }

    Ok(ForwardOutcome {
        npv,
        std_error,
        deltas,
        profile,
        trigger_prices,
    })
}

fn simulate_path(
    inputs: &ForwardInputs<'_>,
    p: usize,
    state: &mut [f64],
    row: &mut [f64],
    continuation: &mut Vec<f64>,
    candidates: &mut Vec<(f64, f64, f64)>,
) -> Result<PathOutcome, ValuationError> {
    let paths = inputs.paths;
    let space = inputs.space;
    let steps = paths.num_steps();

    let mut outcome = PathOutcome {
        pv: 0.0,
        inventory: Vec::with_capacity(steps),
        volume: Vec::with_capacity(steps),
        cash_flow: Vec::with_capacity(steps),
        delta: Vec::with_capacity(steps),
    };

    let mut s = space.grid(0).point(0);
    for i in 0..steps {
        let date = paths.dates()[i];
        let next_grid = space.grid(i + 1);
        let df = inputs.discount_factors[i];

        paths.state_into(p, i, state);
        inputs.basis.evaluate_into(state, row);
        continuation.resize(next_grid.len(), 0.0);
        inputs.regressions[i].predict_into(row, continuation);

        let interval = space
            .decision_interval(inputs.storage, i, s)
            .ok_or_else(|| {
                ValuationError::invariant(
                    date,
                    Some(p),
                    format!("no feasible decision at inventory {}", s),
                )
            })?;
        let node = Node {
            date,
            inventory: s,
            price: paths.spot(p, i),
            discount_factor: df,
            interval,
        };
        let d = best_decision(inputs.storage, &node, next_grid, continuation, inputs.tol, candidates);
        if !(d.volume.is_finite() && d.cash_flow_pv.is_finite()) {
            return Err(ValuationError::invariant(
                date,
                Some(p),
                "non-finite decision value",
            ));
        }

        let v = d.volume;
        let mut delta = -(v + inputs.storage.fuel(v) * v.abs()) * paths.price_ratio(p, i);
        if inputs.discount_deltas {
            delta *= df;
        }

        outcome.inventory.push(s);
        outcome.volume.push(v);
        outcome.cash_flow.push(d.cash_flow_pv);
        outcome.delta.push(delta);
        outcome.pv += d.cash_flow_pv;

        s += v;
        if !space.is_feasible(i + 1, s) {
            return Err(ValuationError::invariant(
                date,
                Some(p),
                format!("decision {} leaves the feasible range at inventory {}", v, s),
            ));
        }
    }

    Ok(outcome)
}

fn expected_trigger(inputs: &ForwardInputs<'_>, i: usize, inventory: f64) -> TriggerPrice {
    let paths = inputs.paths;
    let k = inputs.basis.len();
    let date = paths.dates()[i];
    let next_grid = inputs.space.grid(i + 1);

    let rows = design_rows(paths, i, inputs.basis);
    let mut mean_row = vec![0.0; k];
    for row in rows.chunks_exact(k) {
        for (m, x) in mean_row.iter_mut().zip(row) {
            *m += x;
        }
    }
    let count = paths.num_paths() as f64;
    mean_row.iter_mut().for_each(|m| *m /= count);

    let mut continuation = vec![0.0; next_grid.len()];
    inputs.regressions[i].predict_into(&mean_row, &mut continuation);

    match inputs.space.decision_interval(inputs.storage, i, inventory) {
        Some(interval) => {
            let node = Node {
                date,
                inventory,
                price: paths.forward(i),
                discount_factor: inputs.discount_factors[i],
                interval,
            };
            trigger_price(inputs.storage, &node, next_grid, &continuation, inputs.tol)
        }
        None => TriggerPrice {
            date,
            inject_volume: None,
            inject_trigger_price: None,
            withdraw_volume: None,
            withdraw_trigger_price: None,
        },
    }
}
