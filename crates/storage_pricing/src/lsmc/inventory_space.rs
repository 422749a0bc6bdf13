//! Feasible inventory ranges and their discretisation.
//!
//! State `i` is the inventory before the decision on decision date `i`;
//! state `T` is the inventory at the storage end. A state's range is the
//! intersection of
//!
//! - backward reachability: inventories from which the terminal constraint
//!   can still be met, and
//! - forward reachability: inventories attainable from the starting
//!   inventory.
//!
//! Both are found by bisection over the inventory-dependent period volumes,
//! assuming `s - max_withdrawal(s)` and `s + max_injection(s)` are
//! non-decreasing in `s`.

use chrono::NaiveDateTime;
use storage_core::types::ConfigurationError;
use storage_models::storage::StorageSpec;

use crate::mc::{InventoryGridSpec, MAX_INVENTORY_POINTS};

const BISECTION_ITERATIONS: usize = 100;

/// Uniform inventory grid over `[lo, hi]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InventoryGrid {
    lo: f64,
    hi: f64,
    step: f64,
    len: usize,
}

impl InventoryGrid {
    /// Grid with the single point `x`.
    pub fn single(x: f64) -> Self {
        Self {
            lo: x,
            hi: x,
            step: 0.0,
            len: 1,
        }
    }

    /// Uniform grid over `[lo, hi]`; a range narrower than `tol * (1 + |hi|)`
    /// collapses to one point. The point count is capped at
    /// [`MAX_INVENTORY_POINTS`].
    pub fn uniform(lo: f64, hi: f64, spec: InventoryGridSpec, tol: f64) -> Self {
        let width = hi - lo;
        if width <= tol * (1.0 + hi.abs()) {
            return Self::single(0.5 * (lo + hi));
        }
        let len = spec.point_count(width, tol).unwrap_or(MAX_INVENTORY_POINTS);
        Self {
            lo,
            hi,
            step: width / (len - 1) as f64,
            len,
        }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a grid has at least one point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lowest point.
    #[inline]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Highest point.
    #[inline]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Point `k`; the last point is exactly `hi`.
    #[inline]
    pub fn point(&self, k: usize) -> f64 {
        if k + 1 >= self.len {
            self.hi
        } else {
            self.lo + k as f64 * self.step
        }
    }

    /// All points in ascending order.
    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |k| self.point(k))
    }

    /// Indices of the points in `[a, b]`.
    pub fn indices_between(&self, a: f64, b: f64) -> std::ops::Range<usize> {
        if self.len == 1 {
            return if a <= self.lo && self.lo <= b { 0..1 } else { 0..0 };
        }
        let first = ((a - self.lo) / self.step).ceil().max(0.0);
        let last = ((b - self.lo) / self.step).floor();
        if last < 0.0 || first > last {
            return 0..0;
        }
        let first = first as usize;
        let last = (last as usize).min(self.len - 1);
        first.min(self.len)..last + 1
    }

    /// Linear interpolation of `values` (one per point) at `x`, clamped to
    /// the end points.
    #[inline]
    pub fn interpolate(&self, values: &[f64], x: f64) -> f64 {
        if self.len == 1 {
            return values[0];
        }
        let u = ((x - self.lo) / self.step).clamp(0.0, (self.len - 1) as f64);
        let k = (u as usize).min(self.len - 2);
        let w = u - k as f64;
        values[k] * (1.0 - w) + values[k + 1] * w
    }
}

/// Inventory ranges and grids for every state of a valuation.
#[derive(Clone, Debug)]
pub struct InventorySpace {
    dates: Vec<NaiveDateTime>,
    ranges: Vec<(f64, f64)>,
    feasible: Vec<(f64, f64)>,
    grids: Vec<InventoryGrid>,
    tol: f64,
}

impl InventorySpace {
    /// Builds the space for `decision_dates` starting from `inventory`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::InfeasibleInventory` when the starting inventory
    /// lies outside the bounds or cannot reach the terminal constraint, and
    /// `ConfigurationError::InvalidParameter` when the terminal constraint is
    /// unreachable from every inventory or a grid would need more than
    /// [`MAX_INVENTORY_POINTS`] points.
    pub fn build(
        storage: &StorageSpec,
        decision_dates: &[NaiveDateTime],
        inventory: f64,
        spec: InventoryGridSpec,
        tol: f64,
    ) -> Result<Self, ConfigurationError> {
        if !inventory.is_finite() {
            return Err(ConfigurationError::invalid(
                "inventory",
                format!("must be finite, got {}", inventory),
            ));
        }
        let n = decision_dates.len();
        let mut dates = decision_dates.to_vec();
        dates.push(storage.end());

        // Backward: inventories from which the terminal constraint is reachable.
        let mut feasible = vec![(0.0, 0.0); n + 1];
        feasible[n] = storage.inventory_bounds(storage.end());
        for i in (0..n).rev() {
            let t = dates[i];
            feasible[i] = backward_range(storage, t, storage.inventory_bounds(t), feasible[i + 1], tol)
                .ok_or_else(|| {
                    ConfigurationError::invalid(
                        "terminal_inventory",
                        format!("terminal constraint cannot be met from any inventory on {}", t),
                    )
                })?;
        }

        // Forward: inventories attainable from the start.
        let (lo0, hi0) = feasible[0];
        if inventory < lo0 - slack(tol, lo0) || inventory > hi0 + slack(tol, hi0) {
            return Err(ConfigurationError::InfeasibleInventory {
                date: dates[0],
                inventory,
                min: lo0,
                max: hi0,
            });
        }
        let start = inventory.clamp(lo0, hi0.max(lo0));
        let mut ranges = Vec::with_capacity(n + 1);
        ranges.push((start, start));
        for i in 0..n {
            let (f_lo, f_hi) = ranges[i];
            let (a, b) = feasible[i + 1];
            let t = dates[i];
            let lo = (f_lo - storage.max_withdrawal(t, f_lo)).max(a);
            let hi = (f_hi + storage.max_injection(t, f_hi)).min(b);
            let range = if lo <= hi {
                (lo, hi)
            } else if lo - hi <= slack(tol, hi) {
                (0.5 * (lo + hi), 0.5 * (lo + hi))
            } else {
                return Err(ConfigurationError::InfeasibleInventory {
                    date: dates[i + 1],
                    inventory: f_lo,
                    min: a,
                    max: b,
                });
            };
            ranges.push(range);
        }

        for (i, &(lo, hi)) in ranges.iter().enumerate().skip(1) {
            if spec.point_count(hi - lo, tol).is_none() {
                return Err(ConfigurationError::invalid(
                    "inventory_grid",
                    format!(
                        "{:?} over [{}, {}] on {} needs more than {} points",
                        spec, lo, hi, dates[i], MAX_INVENTORY_POINTS
                    ),
                ));
            }
        }

        let grids = ranges
            .iter()
            .enumerate()
            .map(|(i, &(lo, hi))| {
                if i == 0 {
                    InventoryGrid::single(lo)
                } else {
                    InventoryGrid::uniform(lo, hi, spec, tol)
                }
            })
            .collect();

        Ok(Self {
            dates,
            ranges,
            feasible,
            grids,
            tol,
        })
    }

    /// Number of states (decision dates plus the terminal state).
    #[inline]
    pub fn num_states(&self) -> usize {
        self.grids.len()
    }

    /// Date of state `i`; the last state is the storage end.
    #[inline]
    pub fn date(&self, i: usize) -> NaiveDateTime {
        self.dates[i]
    }

    /// Reachable range of state `i`.
    #[inline]
    pub fn range(&self, i: usize) -> (f64, f64) {
        self.ranges[i]
    }

    /// Range of state `i` from which the terminal constraint can be met.
    #[inline]
    pub fn feasible_range(&self, i: usize) -> (f64, f64) {
        self.feasible[i]
    }

    /// Grid of state `i`.
    #[inline]
    pub fn grid(&self, i: usize) -> &InventoryGrid {
        &self.grids[i]
    }

    /// Decision interval at state `i` and `inventory`: the facility's
    /// interval further restricted so the next state stays able to meet the
    /// terminal constraint.
    pub fn decision_interval(
        &self,
        storage: &StorageSpec,
        i: usize,
        inventory: f64,
    ) -> Option<(f64, f64)> {
        let t = self.dates[i];
        let (lo, hi) = storage.decision_interval_with_tolerance(t, inventory, self.tol)?;
        let (a, b) = self.feasible[i + 1];
        let lo = lo.max(a - inventory);
        let hi = hi.min(b - inventory);
        if lo <= hi {
            Some((lo, hi))
        } else if lo - hi <= slack(self.tol, inventory) {
            let mid = 0.5 * (lo + hi);
            Some((mid, mid))
        } else {
            None
        }
    }

    /// Whether `inventory` lies in the feasible range of state `i`, up to
    /// the numerical slack.
    pub fn is_feasible(&self, i: usize, inventory: f64) -> bool {
        let (a, b) = self.feasible[i];
        let s = slack(self.tol, inventory);
        inventory >= a - s && inventory <= b + s
    }
}

#[inline]
fn slack(tol: f64, x: f64) -> f64 {
    tol * (1.0 + x.abs())
}

/// Inventories in `bounds` at `t` that can reach `next`.
fn backward_range(
    storage: &StorageSpec,
    t: NaiveDateTime,
    bounds: (f64, f64),
    next: (f64, f64),
    tol: f64,
) -> Option<(f64, f64)> {
    let (mn, mx) = bounds;
    let (a, b) = next;
    let up = |s: f64| s + storage.max_injection(t, s);
    let down = |s: f64| s - storage.max_withdrawal(t, s);
    let reaches_floor = |s: f64| up(s) >= a - slack(tol, a);
    let under_ceiling = |s: f64| down(s) <= b + slack(tol, b);

    let lo = if reaches_floor(mn) {
        mn
    } else if !reaches_floor(mx) {
        return None;
    } else {
        bisect(mn, mx, |s| !reaches_floor(s)).1
    };
    let hi = if under_ceiling(mx) {
        mx
    } else if !under_ceiling(mn) {
        return None;
    } else {
        bisect(mn, mx, under_ceiling).0
    };

    if lo <= hi {
        Some((lo, hi))
    } else if lo - hi <= slack(tol, hi) {
        Some((0.5 * (lo + hi), 0.5 * (lo + hi)))
    } else {
        None
    }
}

/// Final bracket `(lo, hi)` of a predicate that holds at `lo` and fails
/// at `hi`.
fn bisect(mut lo: f64, mut hi: f64, holds: impl Fn(f64) -> bool) -> (f64, f64) {
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if holds(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo, hi)
}
