//! Least-squares Monte Carlo storage valuation.
//!
//! The backward induction regresses realised next-date values on the basis
//! functions of the current state, for every next-date inventory grid point
//! at once, and stores one [`Regression`] per decision date. The forward
//! pass then applies the regression policy path by path.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use storage_core::market_data::{Curve, DiscountEngine};
use storage_core::types::{ConfigurationError, TimeSeries};
use storage_models::storage::StorageSpec;
use tracing::{debug, info, warn};

use super::decision::{best_decision, Node};
use super::forward::{forward_pass, ForwardInputs};
use super::intrinsic::intrinsic_value;
use super::inventory_space::InventorySpace;
use super::result::ValuationResult;
use crate::basis::BasisFunctions;
use crate::mc::{LsmcConfig, NumericalWarning, SimulatedPaths, SpotPriceSimulator, ValuationError};
use crate::regression::{self, Regression};

/// Basis function values of every path at `step` (`paths x basis`, row
/// major).
pub(crate) fn design_rows(paths: &SimulatedPaths, step: usize, basis: &BasisFunctions) -> Vec<f64> {
    let k = basis.len();
    let mut design = vec![0.0; paths.num_paths() * k];
    if k == 0 {
        return design;
    }
    design.par_chunks_mut(k).enumerate().for_each_init(
        || vec![0.0; paths.num_factors() + 1],
        |state, (p, row)| {
            paths.state_into(p, step, state);
            basis.evaluate_into(state, row);
        },
    );
    design
}

/// Regressions per decision date and the warnings raised fitting them.
pub(crate) struct BackwardOutcome {
    pub(crate) regressions: Vec<Regression>,
    pub(crate) warnings: Vec<NumericalWarning>,
}

/// Backward induction over the regression paths.
pub(crate) fn backward_induction(
    storage: &StorageSpec,
    space: &InventorySpace,
    paths: &SimulatedPaths,
    basis: &BasisFunctions,
    discount_factors: &[f64],
    tol: f64,
) -> Result<BackwardOutcome, ValuationError> {
    let steps = paths.num_steps();
    let num_paths = paths.num_paths();
    let k = basis.len();

    // Realised values at the next date, `paths x next grid`, row major.
    // Nothing is received after the storage ends.
    let mut next_values = vec![0.0; num_paths * space.grid(steps).len()];
    let mut regressions = Vec::with_capacity(steps);
    let mut warnings = Vec::new();

    for i in (0..steps).rev() {
        let date = space.date(i);
        let grid = space.grid(i);
        let next_grid = space.grid(i + 1);
        let g_next = next_grid.len();
        let g = grid.len();

        let design = design_rows(paths, i, basis);
        let outcome = regression::fit(&design, &next_values, num_paths, k, g_next, tol);
        if let Some(kind) = outcome.warning {
            let warning = NumericalWarning {
                date,
                kind,
                rank: outcome.rank,
                basis_count: k,
            };
            warn!(%date, rank = outcome.rank, basis_count = k, "{}", kind);
            warnings.push(warning);
        }
        let regression = outcome.regression;

        let nodes = grid
            .points()
            .map(|s| {
                space
                    .decision_interval(storage, i, s)
                    .map(|interval| (s, interval))
                    .ok_or_else(|| {
                        ValuationError::invariant(
                            date,
                            None,
                            format!("no feasible decision at inventory {}", s),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let df = discount_factors[i];
        let mut values = vec![0.0; num_paths * g];
        values
            .par_chunks_mut(g)
            .zip(design.par_chunks(k.max(1)))
            .enumerate()
            .try_for_each_init(
                || (vec![0.0; g_next], Vec::new()),
                |(continuation, candidates), (p, (out, row))| {
                    regression.predict_into(row, continuation);
                    let realised_next = &next_values[p * g_next..(p + 1) * g_next];
                    let price = paths.spot(p, i);
                    for (slot, &(s, interval)) in out.iter_mut().zip(&nodes) {
                        let node = Node {
                            date,
                            inventory: s,
                            price,
                            discount_factor: df,
                            interval,
                        };
                        let d = best_decision(storage, &node, next_grid, continuation, tol, candidates);
                        let realised = d.cash_flow_pv + next_grid.interpolate(realised_next, s + d.volume);
                        if !realised.is_finite() {
                            return Err(ValuationError::invariant(
                                date,
                                Some(p),
                                format!("non-finite value at inventory {}", s),
                            ));
                        }
                        *slot = realised;
                    }
                    Ok(())
                },
            )?;

        debug!(%date, grid_points = g, mean_fit = regression.is_mean(), "regression date complete");
        regressions.push(regression);
        next_values = values;
    }

    regressions.reverse();
    Ok(BackwardOutcome {
        regressions,
        warnings,
    })
}

/// Least-squares Monte Carlo valuation engine.
///
/// # Examples
///
/// ```rust
/// use chrono::{Duration, NaiveDate};
/// use storage_core::market_data::{Curve, DiscountEngine, SameDay};
/// use storage_core::types::{midnight, TimeGrid};
/// use storage_models::models::MultiFactorModel;
/// use storage_models::storage::StorageSpec;
/// use storage_pricing::lsmc::LsmcEngine;
/// use storage_pricing::mc::{InventoryGridSpec, LsmcConfig};
///
/// let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
/// let grid = TimeGrid::daily(start, NaiveDate::from_ymd_opt(2021, 4, 11).unwrap()).unwrap();
/// let storage = StorageSpec::builder()
///     .grid(grid)
///     .max_inventory(100.0)
///     .max_injection_rate(20.0)
///     .max_withdrawal_rate(20.0)
///     .build()
///     .unwrap();
///
/// let config = LsmcConfig::builder()
///     .num_sims(200)
///     .seed(7)
///     .model(MultiFactorModel::one_factor(12.0, Curve::flat(grid, 0.6).unwrap()).unwrap())
///     .basis_functions("1 + s + s**2")
///     .inventory_grid(InventoryGridSpec::NumPoints(11))
///     .build()
///     .unwrap();
///
/// let switch = midnight(start) + Duration::days(5);
/// let forward = Curve::from_fn(grid, |t| if t < switch { 10.0 } else { 12.0 }).unwrap();
/// let discount = DiscountEngine::new(midnight(start), Curve::flat(grid, 0.0).unwrap(), SameDay);
///
/// let result = LsmcEngine::new(config)
///     .value(&storage, midnight(start), 0.0, &forward, &discount)
///     .unwrap();
/// assert!(result.intrinsic_npv > 0.0);
/// assert_eq!(result.deltas.len(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct LsmcEngine {
    config: LsmcConfig,
}

impl LsmcEngine {
    /// Engine with the given configuration.
    pub fn new(config: LsmcConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[inline]
    pub fn config(&self) -> &LsmcConfig {
        &self.config
    }

    /// Values `storage` on `val_date` holding `inventory`.
    ///
    /// # Errors
    ///
    /// - `ValuationError::Config` for invalid simulation settings
    /// - `ValuationError::Configuration` for a valuation date that differs
    ///   from the discount engine's, an infeasible starting inventory or an
    ///   unreachable terminal constraint
    /// - `ValuationError::InvariantViolation` for a node without a feasible
    ///   decision or a non-finite value
    pub fn value(
        &self,
        storage: &StorageSpec,
        val_date: NaiveDateTime,
        inventory: f64,
        forward: &Curve,
        discount: &DiscountEngine,
    ) -> Result<ValuationResult, ValuationError> {
        let config = &self.config;
        config.validate()?;
        if discount.valuation_date() != val_date {
            return Err(ConfigurationError::invalid(
                "val_date",
                format!(
                    "{} differs from the discount engine's valuation date {}",
                    val_date,
                    discount.valuation_date()
                ),
            )
            .into());
        }

        let Some(remaining) = storage.grid().from_point(val_date) else {
            info!(%val_date, end = %storage.end(), "storage has expired");
            return Ok(ValuationResult::expired(config.num_sims()));
        };
        let dates: Vec<NaiveDateTime> = remaining.points().collect();
        let tol = config.numerical_tolerance();

        info!(
            %val_date,
            decision_dates = dates.len(),
            num_sims = config.num_sims(),
            basis_functions = config.basis().len(),
            "starting storage valuation"
        );

        let space = InventorySpace::build(storage, &dates, inventory, config.inventory_grid(), tol)?;
        let discount_factors: Vec<f64> = dates.iter().map(|t| discount.discount_factor(*t)).collect();
        let forward_prices: Vec<f64> = dates.iter().map(|t| forward.value_at(*t)).collect();

        let intrinsic = intrinsic_value(storage, &space, &forward_prices, &discount_factors, tol)?;

        let simulator = SpotPriceSimulator::new(config.model());
        let paths = simulator.simulate(val_date, &dates, forward, config.num_sims(), config.seed())?;
        debug!(paths = paths.num_paths(), steps = paths.num_steps(), "regression paths simulated");

        let backward = backward_induction(
            storage,
            &space,
            &paths,
            config.basis(),
            &discount_factors,
            tol,
        )?;
        debug!(warnings = backward.warnings.len(), "backward induction complete");

        let forward_paths = match config.fwd_sim_seed() {
            Some(seed) => {
                debug!(seed, "simulating independent forward paths");
                simulator.simulate(val_date, &dates, forward, config.num_sims(), seed)?
            }
            None => paths,
        };

        let outcome = forward_pass(&ForwardInputs {
            storage,
            space: &space,
            paths: &forward_paths,
            basis: config.basis(),
            regressions: &backward.regressions,
            discount_factors: &discount_factors,
            discount_deltas: config.discount_deltas(),
            tol,
        })?;

        let extrinsic = outcome.npv - intrinsic.npv;
        info!(
            npv = outcome.npv,
            intrinsic_npv = intrinsic.npv,
            extrinsic_npv = extrinsic,
            std_error = outcome.std_error,
            "storage valuation complete"
        );

        Ok(ValuationResult {
            npv: outcome.npv,
            intrinsic_npv: intrinsic.npv,
            extrinsic_npv: extrinsic,
            npv_std_error: outcome.std_error,
            deltas: TimeSeries::new(dates, outcome.deltas)?,
            trigger_prices: outcome.trigger_prices,
            expected_profile: outcome.profile,
            intrinsic_profile: intrinsic.profile,
            warnings: backward.warnings,
            num_sims: config.num_sims(),
        })
    }
}

/// Values `storage` with a one-off engine for `config`.
///
/// # Errors
///
/// See [`LsmcEngine::value`].
pub fn value(
    config: LsmcConfig,
    storage: &StorageSpec,
    val_date: NaiveDateTime,
    inventory: f64,
    forward: &Curve,
    discount: &DiscountEngine,
) -> Result<ValuationResult, ValuationError> {
    LsmcEngine::new(config).value(storage, val_date, inventory, forward, discount)
}
