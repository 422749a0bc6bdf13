//! Simulated spot price paths.
//!
//! [`SpotPriceSimulator`] evolves the unit-volatility states of a
//! [`MultiFactorModel`] with the exact Ornstein-Uhlenbeck transition between
//! consecutive decision dates, loads them with the factor volatilities at
//! each date and maps the result onto the forward curve:
//!
//! ```text
//! y_i(t + dt) = exp(-a_i dt) y_i(t) + sqrt((1 - exp(-2 a_i dt)) / (2 a_i)) W_i
//! x_i(t)      = sigma_i(t) y_i(t)
//! S(t)        = F(t) exp(sum_i x_i(t) - Var[sum_i x_i(t)] / 2)
//! ```
//!
//! with `W = L Z` for the Cholesky factor `L` of the factor correlation.
//! The state covariance is propagated with the same discretisation, so the
//! simulated spot has expectation `F(t)` at every date.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use storage_core::market_data::Curve;
use storage_core::types::{ConfigurationError, DayCountConvention};
use storage_models::models::MultiFactorModel;

use super::config::MAX_SIMS;
use crate::rng::PathRng;

/// Spot prices and factor values over the decision dates.
///
/// Storage is path major: `spot[path * steps + step]` and
/// `factors[(path * steps + step) * num_factors + factor]`.
#[derive(Clone, Debug)]
pub struct SimulatedPaths {
    dates: Vec<NaiveDateTime>,
    forward: Vec<f64>,
    variance: Vec<f64>,
    num_paths: usize,
    num_factors: usize,
    spot: Vec<f64>,
    factors: Vec<f64>,
}

impl SimulatedPaths {
    /// Single path equal to the forward curve with all factors at zero.
    pub fn deterministic(dates: &[NaiveDateTime], forward: &Curve, num_factors: usize) -> Self {
        let fwd: Vec<f64> = dates.iter().map(|t| forward.value_at(*t)).collect();
        Self {
            dates: dates.to_vec(),
            variance: vec![0.0; dates.len()],
            num_paths: 1,
            num_factors,
            spot: fwd.clone(),
            factors: vec![0.0; dates.len() * num_factors],
            forward: fwd,
        }
    }

    /// Decision dates.
    #[inline]
    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    /// Number of paths.
    #[inline]
    pub fn num_paths(&self) -> usize {
        self.num_paths
    }

    /// Number of dates per path.
    #[inline]
    pub fn num_steps(&self) -> usize {
        self.dates.len()
    }

    /// Number of model factors.
    #[inline]
    pub fn num_factors(&self) -> usize {
        self.num_factors
    }

    /// Forward price at `step`.
    #[inline]
    pub fn forward(&self, step: usize) -> f64 {
        self.forward[step]
    }

    /// Variance of the summed factors at `step`.
    #[inline]
    pub fn variance(&self, step: usize) -> f64 {
        self.variance[step]
    }

    /// Spot price of `path` at `step`.
    #[inline]
    pub fn spot(&self, path: usize, step: usize) -> f64 {
        self.spot[path * self.dates.len() + step]
    }

    /// Whole spot path.
    #[inline]
    pub fn spot_path(&self, path: usize) -> &[f64] {
        let n = self.dates.len();
        &self.spot[path * n..(path + 1) * n]
    }

    /// Factor values of `path` at `step`.
    #[inline]
    pub fn factors_at(&self, path: usize, step: usize) -> &[f64] {
        let start = (path * self.dates.len() + step) * self.num_factors;
        &self.factors[start..start + self.num_factors]
    }

    /// `S / F` for `path` at `step`, the pathwise sensitivity of the spot to
    /// the forward price.
    #[inline]
    pub fn price_ratio(&self, path: usize, step: usize) -> f64 {
        let sum: f64 = self.factors_at(path, step).iter().sum();
        (sum - 0.5 * self.variance[step]).exp()
    }

    /// Writes the regression state (factors followed by spot) into `state`.
    #[inline]
    pub fn state_into(&self, path: usize, step: usize, state: &mut [f64]) {
        let n = self.num_factors;
        state[..n].copy_from_slice(self.factors_at(path, step));
        state[n] = self.spot(path, step);
    }

    /// Mean spot price across paths at `step`.
    pub fn mean_spot(&self, step: usize) -> f64 {
        let total: f64 = (0..self.num_paths).map(|p| self.spot(p, step)).sum();
        total / self.num_paths as f64
    }
}

/// Correlated multi-factor spot price simulator.
#[derive(Clone, Debug)]
pub struct SpotPriceSimulator<'a> {
    model: &'a MultiFactorModel,
    day_count: DayCountConvention,
}

impl<'a> SpotPriceSimulator<'a> {
    /// Simulator for `model` with Act/365F time steps.
    pub fn new(model: &'a MultiFactorModel) -> Self {
        Self {
            model,
            day_count: DayCountConvention::Actual365Fixed,
        }
    }

    /// Replaces the day count used for time steps.
    pub fn with_day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Simulates `num_sims` paths over `dates`, factors starting at zero on
    /// `val_date`.
    ///
    /// Path `p` draws from its own stream seeded by `(seed, p)`; the output
    /// does not depend on the rayon thread count.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for a simulation count outside [1, 10_000_000],
    /// dates that are not strictly increasing or that start before
    /// `val_date`.
    pub fn simulate(
        &self,
        val_date: NaiveDateTime,
        dates: &[NaiveDateTime],
        forward: &Curve,
        num_sims: usize,
        seed: u64,
    ) -> Result<SimulatedPaths, ConfigurationError> {
        if num_sims == 0 || num_sims > MAX_SIMS {
            return Err(ConfigurationError::invalid(
                "num_sims",
                format!("must be in [1, {}], got {}", MAX_SIMS, num_sims),
            ));
        }
        if dates.first().is_some_and(|d| *d < val_date) {
            return Err(ConfigurationError::invalid(
                "dates",
                "simulation dates start before the valuation date",
            ));
        }
        if let Some(i) = dates.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ConfigurationError::invalid(
                "dates",
                format!("not strictly increasing at index {}", i + 1),
            ));
        }

        let steps = dates.len();
        let n = self.model.num_factors();
        let Transition {
            decay,
            scale,
            loading,
            variance,
        } = self.transition(val_date, dates);
        let fwd: Vec<f64> = dates.iter().map(|t| forward.value_at(*t)).collect();

        let mut spot = vec![0.0; num_sims * steps];
        let mut factors = vec![0.0; num_sims * steps * n];

        if steps > 0 {
            let cholesky = self.model.cholesky();
            spot.par_chunks_mut(steps)
                .zip(factors.par_chunks_mut(steps * n))
                .enumerate()
                .for_each_init(
                    || (vec![0.0; n], vec![0.0; n], vec![0.0; n]),
                    |(y, z, w), (path, (spot_row, factor_row))| {
                        let mut rng = PathRng::for_path(seed, path);
                        y.iter_mut().for_each(|v| *v = 0.0);
                        for j in 0..steps {
                            rng.fill_normal(z);
                            cholesky.transform_into(z, w);
                            let base = j * n;
                            let x = &mut factor_row[base..base + n];
                            for k in 0..n {
                                y[k] = decay[base + k] * y[k] + scale[base + k] * w[k];
                                x[k] = loading[base + k] * y[k];
                            }
                            let sum: f64 = x.iter().sum();
                            spot_row[j] = fwd[j] * (sum - 0.5 * variance[j]).exp();
                        }
                    },
                );
        }

        Ok(SimulatedPaths {
            dates: dates.to_vec(),
            forward: fwd,
            variance,
            num_paths: num_sims,
            num_factors: n,
            spot,
            factors,
        })
    }

    /// Per-step transition of the unit-volatility states and the variance
    /// of the summed factors at each date.
    fn transition(&self, val_date: NaiveDateTime, dates: &[NaiveDateTime]) -> Transition {
        let factors = self.model.factors();
        let correlation = self.model.correlation();
        let n = factors.len();

        let mut decay = Vec::with_capacity(dates.len() * n);
        let mut scale = Vec::with_capacity(dates.len() * n);
        let mut loading = Vec::with_capacity(dates.len() * n);
        let mut variance = Vec::with_capacity(dates.len());
        // Covariance of the unit-volatility states.
        let mut cov = vec![0.0; n * n];

        let mut prev = val_date;
        for &t in dates {
            let dt = self.day_count.year_fraction(prev, t).max(0.0);
            let d: Vec<f64> = factors.iter().map(|f| f.decay(dt)).collect();
            let s: Vec<f64> = factors.iter().map(|f| f.shock_scale(dt)).collect();
            let sigma: Vec<f64> = factors.iter().map(|f| f.volatility_at(t)).collect();

            let mut total = 0.0;
            for i in 0..n {
                for j in 0..n {
                    let c = d[i] * d[j] * cov[i * n + j] + correlation.get(i, j) * s[i] * s[j];
                    cov[i * n + j] = c;
                    total += sigma[i] * sigma[j] * c;
                }
            }
            variance.push(total);
            decay.extend_from_slice(&d);
            scale.extend_from_slice(&s);
            loading.extend_from_slice(&sigma);
            prev = t;
        }

        Transition {
            decay,
            scale,
            loading,
            variance,
        }
    }
}

/// Step-major, factor-minor transition coefficients.
struct Transition {
    decay: Vec<f64>,
    scale: Vec<f64>,
    loading: Vec<f64>,
    variance: Vec<f64>,
}
