//! Inventory-dependent injection and withdrawal rate limits ("ratchets").
//!
//! A [`RatchetProfile`] lists `(inventory, min_rate, max_rate)` breakpoints.
//! Rates are volumes per grid period: `min_rate <= 0` is the fastest
//! withdrawal, `max_rate >= 0` the fastest injection. A [`RatchetTable`]
//! keys profiles by effective date; each applies until superseded.
//!
//! Between breakpoints the rates follow the table's [`RatchetInterp`]:
//!
//! | Mode     | Rate at inventory `s`                          | Volume over one period                |
//! |----------|------------------------------------------------|---------------------------------------|
//! | `None`   | breakpoint at or below `s`                     | rate at the start inventory           |
//! | `Linear` | linear between bracketing breakpoints          | rate at the start inventory           |
//! | `Step`   | breakpoint at or below `s`                     | integrated across crossed thresholds  |
//!
//! All modes clamp below the first and above the last breakpoint, and all
//! return exactly the breakpoint's rate at a breakpoint.
//!
//! # Examples
//!
//! ```
//! use storage_models::storage::ratchet::{RatchetInterp, RatchetProfile};
//!
//! let profile = RatchetProfile::new(vec![
//!     (0.0, -150.0, 250.0),
//!     (2000.0, -200.0, 175.0),
//!     (5000.0, -260.0, 155.0),
//!     (7000.0, -275.0, 132.0),
//! ])
//! .unwrap();
//!
//! assert_eq!(profile.rates(2000.0, RatchetInterp::Linear), (-200.0, 175.0));
//! assert_eq!(profile.rates(1000.0, RatchetInterp::None), (-150.0, 250.0));
//! assert_eq!(profile.rates(1000.0, RatchetInterp::Linear), (-175.0, 212.5));
//! ```

use chrono::NaiveDateTime;

use storage_core::types::ConfigurationError;

/// Interpolation of rates between ratchet breakpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RatchetInterp {
    /// Step function at the breakpoint at or below the inventory.
    None,
    /// Piecewise linear between breakpoints.
    #[default]
    Linear,
    /// Step function whose per-period volume integrates across thresholds.
    Step,
}

/// One breakpoint of a ratchet profile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatchetRow {
    /// Inventory level of the breakpoint
    pub inventory: f64,
    /// Fastest withdrawal (non-positive volume per period)
    pub min_rate: f64,
    /// Fastest injection (non-negative volume per period)
    pub max_rate: f64,
}

/// Rate envelope for one effective date.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatchetProfile {
    rows: Vec<RatchetRow>,
}

impl RatchetProfile {
    /// Builds a profile from `(inventory, min_rate, max_rate)` triples.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::Ratchet` for an empty profile, non-finite values,
    /// inventories that are negative or not strictly increasing, or rates
    /// violating `min_rate <= 0 <= max_rate`.
    pub fn new(rows: Vec<(f64, f64, f64)>) -> Result<Self, ConfigurationError> {
        if rows.is_empty() {
            return Err(ConfigurationError::ratchet("profile has no rows"));
        }
        let rows: Vec<RatchetRow> = rows
            .into_iter()
            .map(|(inventory, min_rate, max_rate)| RatchetRow {
                inventory,
                min_rate,
                max_rate,
            })
            .collect();

        for (i, row) in rows.iter().enumerate() {
            if !(row.inventory.is_finite() && row.min_rate.is_finite() && row.max_rate.is_finite())
            {
                return Err(ConfigurationError::ratchet(format!(
                    "non-finite value in row {}",
                    i
                )));
            }
            if row.inventory < 0.0 {
                return Err(ConfigurationError::ratchet(format!(
                    "negative inventory {} in row {}",
                    row.inventory, i
                )));
            }
            if row.min_rate > 0.0 || row.max_rate < 0.0 {
                return Err(ConfigurationError::ratchet(format!(
                    "row {} has min_rate {} and max_rate {}; withdrawal rates must be \
                     non-positive and injection rates non-negative",
                    i, row.min_rate, row.max_rate
                )));
            }
        }
        if let Some(i) = rows.windows(2).position(|w| w[1].inventory <= w[0].inventory) {
            return Err(ConfigurationError::ratchet(format!(
                "inventories not strictly increasing at row {}",
                i + 1
            )));
        }
        Ok(Self { rows })
    }

    /// Breakpoints in inventory order.
    #[inline]
    pub fn rows(&self) -> &[RatchetRow] {
        &self.rows
    }

    /// Lowest breakpoint inventory.
    #[inline]
    pub fn min_inventory(&self) -> f64 {
        self.rows[0].inventory
    }

    /// Highest breakpoint inventory.
    #[inline]
    pub fn max_inventory(&self) -> f64 {
        self.rows[self.rows.len() - 1].inventory
    }

    /// Index of the last breakpoint at or below `inventory`, clamped to 0.
    #[inline]
    fn floor_index(&self, inventory: f64) -> usize {
        self.rows
            .partition_point(|r| r.inventory <= inventory)
            .saturating_sub(1)
    }

    /// Index of the last breakpoint strictly below `inventory`, if any.
    #[inline]
    fn strict_floor_index(&self, inventory: f64) -> Option<usize> {
        self.rows
            .partition_point(|r| r.inventory < inventory)
            .checked_sub(1)
    }

    /// Instantaneous `(min_rate, max_rate)` at `inventory`.
    pub fn rates(&self, inventory: f64, interp: RatchetInterp) -> (f64, f64) {
        match interp {
            RatchetInterp::None | RatchetInterp::Step => {
                let row = self.rows[self.floor_index(inventory)];
                (row.min_rate, row.max_rate)
            }
            RatchetInterp::Linear => self.linear_rates(inventory),
        }
    }

    fn linear_rates(&self, inventory: f64) -> (f64, f64) {
        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];
        if inventory <= first.inventory {
            return (first.min_rate, first.max_rate);
        }
        if inventory >= last.inventory {
            return (last.min_rate, last.max_rate);
        }
        let i = self.floor_index(inventory);
        let (lo, hi) = (self.rows[i], self.rows[i + 1]);
        if inventory == lo.inventory {
            return (lo.min_rate, lo.max_rate);
        }
        let w = (inventory - lo.inventory) / (hi.inventory - lo.inventory);
        (
            lo.min_rate + (hi.min_rate - lo.min_rate) * w,
            lo.max_rate + (hi.max_rate - lo.max_rate) * w,
        )
    }

    /// Largest volume injectable over one period from `inventory`.
    pub fn max_injection_volume(&self, inventory: f64, interp: RatchetInterp) -> f64 {
        match interp {
            RatchetInterp::None | RatchetInterp::Linear => self.rates(inventory, interp).1,
            RatchetInterp::Step => self.integrated_injection(inventory),
        }
    }

    /// Largest volume withdrawable over one period from `inventory`, as a
    /// non-negative magnitude.
    pub fn max_withdrawal_volume(&self, inventory: f64, interp: RatchetInterp) -> f64 {
        match interp {
            RatchetInterp::None | RatchetInterp::Linear => -self.rates(inventory, interp).0,
            RatchetInterp::Step => self.integrated_withdrawal(inventory),
        }
    }

    /// Injects at the segment rate, moving to the next segment's rate when a
    /// breakpoint is reached before the period ends.
    fn integrated_injection(&self, inventory: f64) -> f64 {
        let mut level = inventory;
        let mut remaining = 1.0;
        let mut volume = 0.0;
        loop {
            let k = self.floor_index(level);
            let rate = self.rows[k].max_rate;
            if rate <= 0.0 {
                return volume;
            }
            let next = match self.rows.get(k + 1) {
                Some(row) if row.inventory > level => row.inventory,
                _ => return volume + rate * remaining,
            };
            let time_to_next = (next - level) / rate;
            if time_to_next >= remaining {
                return volume + rate * remaining;
            }
            volume += next - level;
            remaining -= time_to_next;
            level = next;
        }
    }

    /// Withdraws at the rate of the segment below the current level, moving
    /// down a segment each time a breakpoint is reached.
    fn integrated_withdrawal(&self, inventory: f64) -> f64 {
        let mut level = inventory;
        let mut remaining = 1.0;
        let mut volume = 0.0;
        loop {
            let (rate, floor) = match self.strict_floor_index(level) {
                Some(k) => (-self.rows[k].min_rate, Some(self.rows[k].inventory)),
                None => (-self.rows[0].min_rate, None),
            };
            if rate <= 0.0 {
                return volume;
            }
            let floor = match floor {
                Some(f) => f,
                None => return volume + rate * remaining,
            };
            let time_to_floor = (level - floor) / rate;
            if time_to_floor >= remaining {
                return volume + rate * remaining;
            }
            volume += level - floor;
            remaining -= time_to_floor;
            level = floor;
        }
    }
}

/// Ratchet profiles keyed by effective date.
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::types::midnight;
/// use storage_models::storage::ratchet::{RatchetInterp, RatchetProfile, RatchetTable};
///
/// let d = |y, m, day| midnight(NaiveDate::from_ymd_opt(y, m, day).unwrap());
/// let table = RatchetTable::new(
///     vec![
///         (d(2021, 4, 1), RatchetProfile::new(vec![(0.0, -150.0, 250.0)]).unwrap()),
///         (d(2022, 10, 1), RatchetProfile::new(vec![(0.0, -130.0, 260.0)]).unwrap()),
///     ],
///     RatchetInterp::Linear,
/// )
/// .unwrap();
///
/// assert_eq!(table.rates(d(2022, 9, 30), 0.0), Some((-150.0, 250.0)));
/// assert_eq!(table.rates(d(2022, 10, 1), 0.0), Some((-130.0, 260.0)));
/// assert_eq!(table.rates(d(2021, 3, 31), 0.0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatchetTable {
    entries: Vec<(NaiveDateTime, RatchetProfile)>,
    interp: RatchetInterp,
}

impl RatchetTable {
    /// Builds a table from `(effective_date, profile)` pairs.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::Ratchet` for an empty table or effective dates
    /// that are not strictly increasing.
    pub fn new(
        entries: Vec<(NaiveDateTime, RatchetProfile)>,
        interp: RatchetInterp,
    ) -> Result<Self, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::ratchet("table has no profiles"));
        }
        if let Some(i) = entries.windows(2).position(|w| w[1].0 <= w[0].0) {
            return Err(ConfigurationError::ratchet(format!(
                "effective dates not strictly increasing at entry {} ({})",
                i + 1,
                entries[i + 1].0
            )));
        }
        Ok(Self { entries, interp })
    }

    /// Builds a table from raw `(effective_date, rows)` pairs.
    pub fn from_rows(
        entries: Vec<(NaiveDateTime, Vec<(f64, f64, f64)>)>,
        interp: RatchetInterp,
    ) -> Result<Self, ConfigurationError> {
        let profiles = entries
            .into_iter()
            .map(|(date, rows)| RatchetProfile::new(rows).map(|p| (date, p)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(profiles, interp)
    }

    /// Interpolation mode.
    #[inline]
    pub fn interp(&self) -> RatchetInterp {
        self.interp
    }

    /// `(effective_date, profile)` entries in date order.
    #[inline]
    pub fn entries(&self) -> &[(NaiveDateTime, RatchetProfile)] {
        &self.entries
    }

    /// First effective date.
    #[inline]
    pub fn first_effective_date(&self) -> NaiveDateTime {
        self.entries[0].0
    }

    /// Profile in force at `date`: the most recent effective date `<= date`.
    pub fn profile_at(&self, date: NaiveDateTime) -> Option<&RatchetProfile> {
        let pos = self.entries.partition_point(|(d, _)| *d <= date);
        pos.checked_sub(1).map(|i| &self.entries[i].1)
    }

    /// Instantaneous `(min_rate, max_rate)` at `(date, inventory)`.
    pub fn rates(&self, date: NaiveDateTime, inventory: f64) -> Option<(f64, f64)> {
        self.profile_at(date)
            .map(|p| p.rates(inventory, self.interp))
    }

    /// Largest volume injectable over the period starting at `date`.
    pub fn max_injection_volume(&self, date: NaiveDateTime, inventory: f64) -> Option<f64> {
        self.profile_at(date)
            .map(|p| p.max_injection_volume(inventory, self.interp))
    }

    /// Largest volume withdrawable over the period starting at `date`.
    pub fn max_withdrawal_volume(&self, date: NaiveDateTime, inventory: f64) -> Option<f64> {
        self.profile_at(date)
            .map(|p| p.max_withdrawal_volume(inventory, self.interp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tutorial_profile() -> RatchetProfile {
        RatchetProfile::new(vec![
            (0.0, -150.0, 250.0),
            (2000.0, -200.0, 175.0),
            (5000.0, -260.0, 155.0),
            (7000.0, -275.0, 132.0),
        ])
        .unwrap()
    }

    // ========================================
    // Validation Tests
    // ========================================

    #[test]
    fn test_empty_profile_rejected() {
        assert!(matches!(
            RatchetProfile::new(vec![]),
            Err(ConfigurationError::Ratchet(_))
        ));
    }

    #[test]
    fn test_unsorted_inventories_rejected() {
        let result = RatchetProfile::new(vec![(100.0, -1.0, 1.0), (50.0, -1.0, 1.0)]);
        match result {
            Err(ConfigurationError::Ratchet(msg)) => assert!(msg.contains("strictly increasing")),
            other => panic!("expected ratchet error, got {:?}", other),
        }
    }

    #[test]
    fn test_sign_convention_enforced() {
        assert!(RatchetProfile::new(vec![(0.0, 10.0, 20.0)]).is_err());
        assert!(RatchetProfile::new(vec![(0.0, -10.0, -5.0)]).is_err());
        assert!(RatchetProfile::new(vec![(0.0, 0.0, 0.0)]).is_ok());
    }

    #[test]
    fn test_unsorted_table_rejected() {
        let d0 = chrono::NaiveDate::from_ymd_opt(2021, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = RatchetTable::new(
            vec![(d0, tutorial_profile()), (d0, tutorial_profile())],
            RatchetInterp::Linear,
        );
        assert!(matches!(result, Err(ConfigurationError::Ratchet(_))));
    }

    // ========================================
    // Instantaneous Rate Tests
    // ========================================

    #[test]
    fn test_rates_at_breakpoints_all_modes() {
        let profile = tutorial_profile();
        for interp in [RatchetInterp::None, RatchetInterp::Linear, RatchetInterp::Step] {
            for row in profile.rows() {
                assert_eq!(
                    profile.rates(row.inventory, interp),
                    (row.min_rate, row.max_rate),
                    "{:?} at {}",
                    interp,
                    row.inventory
                );
            }
        }
    }

    #[test]
    fn test_rates_clamp_outside_breakpoints() {
        let profile = RatchetProfile::new(vec![(100.0, -10.0, 20.0), (200.0, -30.0, 5.0)]).unwrap();
        for interp in [RatchetInterp::None, RatchetInterp::Linear, RatchetInterp::Step] {
            assert_eq!(profile.rates(0.0, interp), (-10.0, 20.0));
            assert_eq!(profile.rates(500.0, interp), (-30.0, 5.0));
        }
    }

    #[test]
    fn test_linear_between_breakpoints() {
        let profile = tutorial_profile();
        let (min_rate, max_rate) = profile.rates(3500.0, RatchetInterp::Linear);
        assert_relative_eq!(min_rate, -230.0, epsilon = 1e-12);
        assert_relative_eq!(max_rate, 165.0, epsilon = 1e-12);
    }

    #[test]
    fn test_none_rounds_down() {
        let profile = tutorial_profile();
        assert_eq!(profile.rates(4999.0, RatchetInterp::None), (-200.0, 175.0));
    }

    // ========================================
    // Per-Period Volume Tests
    // ========================================

    #[test]
    fn test_step_injection_crosses_threshold() {
        let profile = RatchetProfile::new(vec![(0.0, -10.0, 100.0), (50.0, -10.0, 20.0)]).unwrap();
        // 40 at rate 100 takes 0.4 of the period, then 0.6 * 20 = 12.
        assert_relative_eq!(
            profile.max_injection_volume(10.0, RatchetInterp::Step),
            52.0,
            epsilon = 1e-12
        );
        assert_eq!(profile.max_injection_volume(10.0, RatchetInterp::None), 100.0);
    }

    #[test]
    fn test_step_withdrawal_crosses_threshold() {
        let profile = RatchetProfile::new(vec![(0.0, -20.0, 10.0), (50.0, -100.0, 10.0)]).unwrap();
        // From 90: withdraw at 100 until 50 (0.4 period), then 0.6 * 20 = 12.
        assert_relative_eq!(
            profile.max_withdrawal_volume(90.0, RatchetInterp::Step),
            52.0,
            epsilon = 1e-12
        );
        // At exactly the breakpoint the lower segment's rate applies to the volume.
        assert_relative_eq!(
            profile.max_withdrawal_volume(50.0, RatchetInterp::Step),
            20.0,
            epsilon = 1e-12
        );
        assert_eq!(profile.max_withdrawal_volume(50.0, RatchetInterp::None), 100.0);
    }

    #[test]
    fn test_step_volume_without_crossing_matches_rate() {
        let profile = tutorial_profile();
        assert_eq!(profile.max_injection_volume(100.0, RatchetInterp::Step), 250.0);
        assert_eq!(profile.max_withdrawal_volume(6000.0, RatchetInterp::Step), 260.0);
    }

    #[test]
    fn test_zero_rate_segment_stops_injection() {
        let profile = RatchetProfile::new(vec![(0.0, -10.0, 100.0), (50.0, -10.0, 0.0)]).unwrap();
        assert_relative_eq!(
            profile.max_injection_volume(0.0, RatchetInterp::Step),
            50.0,
            epsilon = 1e-12
        );
    }
}
