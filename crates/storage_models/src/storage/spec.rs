//! Storage facility description.
//!
//! [`StorageSpec`] is the immutable set of physical and cost constraints of
//! one facility over its operating grid. Decisions are volumes per grid
//! period: positive injects, negative withdraws.
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use storage_core::types::TimeGrid;
//! use storage_models::storage::spec::StorageSpec;
//!
//! let grid = TimeGrid::daily(
//!     NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
//! )
//! .unwrap();
//!
//! let storage = StorageSpec::builder()
//!     .grid(grid)
//!     .injection_cost(0.01)
//!     .withdrawal_cost(0.02)
//!     .max_inventory(10_000.0)
//!     .max_injection_rate(250.0)
//!     .max_withdrawal_rate(300.0)
//!     .build()
//!     .unwrap();
//!
//! let (lo, hi) = storage.decision_interval(grid.start(), 100.0).unwrap();
//! assert_eq!((lo, hi), (-100.0, 250.0));
//! ```

use chrono::NaiveDateTime;

use storage_core::market_data::Curve;
use storage_core::types::{ConfigurationError, TimeGrid};

use super::ratchet::RatchetTable;

/// A scalar that is either constant or varies over time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeVarying {
    /// Same value at every date.
    Constant(f64),
    /// Value read from a curve with pad extrapolation.
    Curve(Curve),
}

impl TimeVarying {
    /// Value at `t`.
    #[inline]
    pub fn value_at(&self, t: NaiveDateTime) -> f64 {
        match self {
            TimeVarying::Constant(v) => *v,
            TimeVarying::Curve(c) => c.value_at(t),
        }
    }
}

impl From<f64> for TimeVarying {
    fn from(v: f64) -> Self {
        TimeVarying::Constant(v)
    }
}

impl From<Curve> for TimeVarying {
    fn from(c: Curve) -> Self {
        TimeVarying::Curve(c)
    }
}

/// Injection and withdrawal rate limits.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RateLimits {
    /// Inventory-independent limits, as non-negative magnitudes per period.
    Simple {
        /// Largest injection per period
        max_injection: TimeVarying,
        /// Largest withdrawal per period
        max_withdrawal: TimeVarying,
    },
    /// Inventory-dependent ratchet table.
    Ratchets(RatchetTable),
}

/// Requirement on the inventory left at the storage end.
///
/// Residual inventory has no terminal value in either case.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminalInventory {
    /// Any inventory within the bounds at the storage end.
    #[default]
    Free,
    /// Exactly this inventory.
    Target(f64),
}

/// Immutable storage facility description.
///
/// Built with [`StorageSpec::builder`]; every invariant is checked at
/// build time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageSpec {
    grid: TimeGrid,
    injection_cost: f64,
    withdrawal_cost: f64,
    injection_fuel: f64,
    withdrawal_fuel: f64,
    inventory_cost: f64,
    min_inventory: TimeVarying,
    max_inventory: TimeVarying,
    rates: RateLimits,
    terminal: TerminalInventory,
}

impl StorageSpec {
    /// Creates a new builder.
    #[inline]
    pub fn builder() -> StorageSpecBuilder {
        StorageSpecBuilder::default()
    }

    /// Operating grid (one decision per period).
    #[inline]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// First operating date.
    #[inline]
    pub fn start(&self) -> NaiveDateTime {
        self.grid.start()
    }

    /// Exclusive end; the terminal inventory is measured here.
    #[inline]
    pub fn end(&self) -> NaiveDateTime {
        self.grid.end()
    }

    /// Cost per unit injected.
    #[inline]
    pub fn injection_cost(&self) -> f64 {
        self.injection_cost
    }

    /// Cost per unit withdrawn.
    #[inline]
    pub fn withdrawal_cost(&self) -> f64 {
        self.withdrawal_cost
    }

    /// Fraction of injected volume consumed as fuel.
    #[inline]
    pub fn injection_fuel(&self) -> f64 {
        self.injection_fuel
    }

    /// Fraction of withdrawn volume consumed as fuel.
    #[inline]
    pub fn withdrawal_fuel(&self) -> f64 {
        self.withdrawal_fuel
    }

    /// Cost per unit of inventory held over one period.
    #[inline]
    pub fn inventory_cost(&self) -> f64 {
        self.inventory_cost
    }

    /// Terminal inventory requirement.
    #[inline]
    pub fn terminal(&self) -> TerminalInventory {
        self.terminal
    }

    /// Rate limits.
    #[inline]
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rates
    }

    /// Minimum inventory at `t` (before the storage end).
    #[inline]
    pub fn min_inventory(&self, t: NaiveDateTime) -> f64 {
        self.min_inventory.value_at(t)
    }

    /// Maximum inventory at `t` (before the storage end).
    #[inline]
    pub fn max_inventory(&self, t: NaiveDateTime) -> f64 {
        self.max_inventory.value_at(t)
    }

    /// `(min, max)` inventory allowed at `t`; at or after the storage end
    /// the terminal requirement applies.
    pub fn inventory_bounds(&self, t: NaiveDateTime) -> (f64, f64) {
        if t >= self.end() {
            let (lo, hi) = (self.min_inventory(self.end()), self.max_inventory(self.end()));
            return match self.terminal {
                TerminalInventory::Free => (lo, hi),
                TerminalInventory::Target(x) => (x, x),
            };
        }
        (self.min_inventory(t), self.max_inventory(t))
    }

    /// Instantaneous `(min_rate, max_rate)` at `(t, inventory)`, withdrawal
    /// negative.
    pub fn rates(&self, t: NaiveDateTime, inventory: f64) -> (f64, f64) {
        match &self.rates {
            RateLimits::Simple {
                max_injection,
                max_withdrawal,
            } => (-max_withdrawal.value_at(t), max_injection.value_at(t)),
            RateLimits::Ratchets(table) => table.rates(t, inventory).unwrap_or((0.0, 0.0)),
        }
    }

    /// Largest injection over the period starting at `t`.
    pub fn max_injection(&self, t: NaiveDateTime, inventory: f64) -> f64 {
        match &self.rates {
            RateLimits::Simple { max_injection, .. } => max_injection.value_at(t),
            RateLimits::Ratchets(table) => table.max_injection_volume(t, inventory).unwrap_or(0.0),
        }
    }

    /// Largest withdrawal (non-negative magnitude) over the period starting at `t`.
    pub fn max_withdrawal(&self, t: NaiveDateTime, inventory: f64) -> f64 {
        match &self.rates {
            RateLimits::Simple { max_withdrawal, .. } => max_withdrawal.value_at(t),
            RateLimits::Ratchets(table) => {
                table.max_withdrawal_volume(t, inventory).unwrap_or(0.0)
            }
        }
    }

    /// Start of the period after the one containing `t`.
    pub fn next_date(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        self.grid.period_index(t).map(|i| self.grid.point(i + 1))
    }

    /// Feasible decision interval `[lo, hi]` at `(t, inventory)`.
    ///
    /// The rate limits are intersected with the inventory bounds at the
    /// next date. Returns `None` outside the grid or when the intersection
    /// is empty.
    pub fn decision_interval(&self, t: NaiveDateTime, inventory: f64) -> Option<(f64, f64)> {
        self.decision_interval_with_tolerance(t, inventory, 0.0)
    }

    /// As [`decision_interval`](Self::decision_interval), tolerating an
    /// overlap shortfall of `tol * (1 + |inventory|)`; a slightly inverted
    /// interval collapses to its midpoint.
    pub fn decision_interval_with_tolerance(
        &self,
        t: NaiveDateTime,
        inventory: f64,
        tol: f64,
    ) -> Option<(f64, f64)> {
        let next = self.next_date(t)?;
        let (next_min, next_max) = self.inventory_bounds(next);
        let lo = (-self.max_withdrawal(t, inventory)).max(next_min - inventory);
        let hi = self.max_injection(t, inventory).min(next_max - inventory);
        if lo <= hi {
            Some((lo, hi))
        } else if lo - hi <= tol * (1.0 + inventory.abs()) {
            let mid = 0.5 * (lo + hi);
            Some((mid, mid))
        } else {
            None
        }
    }

    /// Fuel fraction applying to decision `volume`.
    #[inline]
    pub fn fuel(&self, volume: f64) -> f64 {
        if volume > 0.0 {
            self.injection_fuel
        } else if volume < 0.0 {
            self.withdrawal_fuel
        } else {
            0.0
        }
    }

    /// Unit cost applying to decision `volume`.
    #[inline]
    pub fn unit_cost(&self, volume: f64) -> f64 {
        if volume > 0.0 {
            self.injection_cost
        } else if volume < 0.0 {
            self.withdrawal_cost
        } else {
            0.0
        }
    }

    /// Undiscounted cash flow of decision `volume` at spot `price` with
    /// `inventory` held at the start of the period:
    ///
    /// ```text
    /// -v * P - fuel(v) * |v| * P - cost(v) * |v| - inventory_cost * s
    /// ```
    #[inline]
    pub fn cash_flow(&self, volume: f64, inventory: f64, price: f64) -> f64 {
        let abs = volume.abs();
        -volume * price
            - self.fuel(volume) * abs * price
            - self.unit_cost(volume) * abs
            - self.inventory_cost * inventory
    }
}

/// Builder for [`StorageSpec`].
///
/// Required: `grid`, and either both simple rates or `ratchets`. With
/// ratchets the inventory bounds default to the first and last breakpoint
/// of the profile in force; otherwise `min_inventory` defaults to zero and
/// `max_inventory` is required.
#[derive(Debug, Clone, Default)]
pub struct StorageSpecBuilder {
    grid: Option<TimeGrid>,
    injection_cost: f64,
    withdrawal_cost: f64,
    injection_fuel: f64,
    withdrawal_fuel: f64,
    inventory_cost: f64,
    min_inventory: Option<TimeVarying>,
    max_inventory: Option<TimeVarying>,
    max_injection: Option<TimeVarying>,
    max_withdrawal: Option<TimeVarying>,
    ratchets: Option<RatchetTable>,
    terminal: TerminalInventory,
}

impl StorageSpecBuilder {
    /// Sets the operating grid.
    pub fn grid(mut self, grid: TimeGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Sets the cost per unit injected.
    pub fn injection_cost(mut self, cost: f64) -> Self {
        self.injection_cost = cost;
        self
    }

    /// Sets the cost per unit withdrawn.
    pub fn withdrawal_cost(mut self, cost: f64) -> Self {
        self.withdrawal_cost = cost;
        self
    }

    /// Sets the injection fuel fraction in `[0, 1)`.
    pub fn injection_fuel(mut self, fraction: f64) -> Self {
        self.injection_fuel = fraction;
        self
    }

    /// Sets the withdrawal fuel fraction in `[0, 1)`.
    pub fn withdrawal_fuel(mut self, fraction: f64) -> Self {
        self.withdrawal_fuel = fraction;
        self
    }

    /// Sets the cost per unit of inventory held over one period.
    pub fn inventory_cost(mut self, cost: f64) -> Self {
        self.inventory_cost = cost;
        self
    }

    /// Sets the minimum inventory.
    pub fn min_inventory(mut self, value: impl Into<TimeVarying>) -> Self {
        self.min_inventory = Some(value.into());
        self
    }

    /// Sets the maximum inventory.
    pub fn max_inventory(mut self, value: impl Into<TimeVarying>) -> Self {
        self.max_inventory = Some(value.into());
        self
    }

    /// Sets the simple maximum injection per period.
    pub fn max_injection_rate(mut self, value: impl Into<TimeVarying>) -> Self {
        self.max_injection = Some(value.into());
        self
    }

    /// Sets the simple maximum withdrawal per period (a non-negative magnitude).
    pub fn max_withdrawal_rate(mut self, value: impl Into<TimeVarying>) -> Self {
        self.max_withdrawal = Some(value.into());
        self
    }

    /// Uses an inventory-dependent ratchet table for the rates.
    pub fn ratchets(mut self, table: RatchetTable) -> Self {
        self.ratchets = Some(table);
        self
    }

    /// Sets the terminal inventory requirement.
    pub fn terminal_inventory(mut self, terminal: TerminalInventory) -> Self {
        self.terminal = terminal;
        self
    }

    /// Validates and builds the facility description.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the grid or rates are missing, both kinds of
    /// rates are given, costs are negative, fuel fractions leave `[0, 1)`,
    /// bounds are negative or inverted at any grid point or the end, simple
    /// rates are negative, the ratchet table starts after the storage, or the
    /// terminal target lies outside the end bounds.
    pub fn build(self) -> Result<StorageSpec, ConfigurationError> {
        let grid = self
            .grid
            .ok_or_else(|| ConfigurationError::invalid("grid", "storage grid is required"))?;

        for (name, value) in [
            ("injection_cost", self.injection_cost),
            ("withdrawal_cost", self.withdrawal_cost),
            ("inventory_cost", self.inventory_cost),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigurationError::invalid(
                    name,
                    format!("{} must be finite and non-negative", value),
                ));
            }
        }
        for (name, value) in [
            ("injection_fuel", self.injection_fuel),
            ("withdrawal_fuel", self.withdrawal_fuel),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigurationError::invalid(
                    name,
                    format!("{} must lie in [0, 1)", value),
                ));
            }
        }

        let rates = match (self.ratchets, self.max_injection, self.max_withdrawal) {
            (Some(table), None, None) => {
                if table.first_effective_date() > grid.start() {
                    return Err(ConfigurationError::ratchet(format!(
                        "first profile takes effect on {}, after the storage start {}",
                        table.first_effective_date(),
                        grid.start()
                    )));
                }
                RateLimits::Ratchets(table)
            }
            (None, Some(max_injection), Some(max_withdrawal)) => RateLimits::Simple {
                max_injection,
                max_withdrawal,
            },
            (Some(_), _, _) => {
                return Err(ConfigurationError::invalid(
                    "rates",
                    "ratchets cannot be combined with simple rate limits",
                ))
            }
            (None, _, _) => {
                return Err(ConfigurationError::invalid(
                    "rates",
                    "both max_injection_rate and max_withdrawal_rate are required without ratchets",
                ))
            }
        };

        let (min_inventory, max_inventory) = match (&rates, self.min_inventory, self.max_inventory) {
            (_, Some(lo), Some(hi)) => (lo, hi),
            (RateLimits::Ratchets(table), lo, hi) => {
                let profile_bound = |upper: bool| {
                    Curve::from_fn(grid, |t| {
                        table
                            .profile_at(t)
                            .map(|p| if upper { p.max_inventory() } else { p.min_inventory() })
                            .unwrap_or(0.0)
                    })
                    .map(TimeVarying::Curve)
                };
                let lo = match lo {
                    Some(lo) => lo,
                    None => profile_bound(false)?,
                };
                let hi = match hi {
                    Some(hi) => hi,
                    None => profile_bound(true)?,
                };
                (lo, hi)
            }
            (RateLimits::Simple { .. }, lo, Some(hi)) => {
                (lo.unwrap_or(TimeVarying::Constant(0.0)), hi)
            }
            (RateLimits::Simple { .. }, _, None) => {
                return Err(ConfigurationError::invalid(
                    "max_inventory",
                    "maximum inventory is required without ratchets",
                ))
            }
        };

        for t in grid.points().chain(std::iter::once(grid.end())) {
            let (lo, hi) = (min_inventory.value_at(t), max_inventory.value_at(t));
            if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo <= hi) {
                return Err(ConfigurationError::InventoryBounds {
                    date: t,
                    min: lo,
                    max: hi,
                });
            }
            if let RateLimits::Simple {
                max_injection,
                max_withdrawal,
            } = &rates
            {
                let (inj, wd) = (max_injection.value_at(t), max_withdrawal.value_at(t));
                if !(inj.is_finite() && wd.is_finite() && inj >= 0.0 && wd >= 0.0) {
                    return Err(ConfigurationError::invalid(
                        "rates",
                        format!(
                            "at {} max injection {} and max withdrawal {} must be non-negative",
                            t, inj, wd
                        ),
                    ));
                }
            }
        }

        if let TerminalInventory::Target(x) = self.terminal {
            let end = grid.end();
            let (lo, hi) = (min_inventory.value_at(end), max_inventory.value_at(end));
            if !(x >= lo && x <= hi) {
                return Err(ConfigurationError::invalid(
                    "terminal_inventory",
                    format!("target {} lies outside the end bounds [{}, {}]", x, lo, hi),
                ));
            }
        }

        Ok(StorageSpec {
            grid,
            injection_cost: self.injection_cost,
            withdrawal_cost: self.withdrawal_cost,
            injection_fuel: self.injection_fuel,
            withdrawal_fuel: self.withdrawal_fuel,
            inventory_cost: self.inventory_cost,
            min_inventory,
            max_inventory,
            rates,
            terminal: self.terminal,
        })
    }
}
