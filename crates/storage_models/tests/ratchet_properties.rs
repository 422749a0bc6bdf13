//! Property tests for ratchet interpolation and decision intervals.

use chrono::NaiveDate;
use proptest::prelude::*;
use storage_core::types::{midnight, TimeGrid};
use storage_models::storage::{RatchetInterp, RatchetProfile, RatchetTable, StorageSpec};

/// Profiles with strictly increasing inventories and valid rate signs.
fn profile_strategy() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((1.0f64..500.0, -300.0f64..=0.0, 0.0f64..300.0), 1..8).prop_map(
        |rows| {
            let mut level = 0.0;
            rows.into_iter()
                .map(|(gap, min_rate, max_rate)| {
                    let row = (level, min_rate, max_rate);
                    level += gap;
                    row
                })
                .collect()
        },
    )
}

fn interp_strategy() -> impl Strategy<Value = RatchetInterp> {
    prop_oneof![
        Just(RatchetInterp::None),
        Just(RatchetInterp::Linear),
        Just(RatchetInterp::Step),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn test_rate_at_breakpoint_is_exact(rows in profile_strategy(), interp in interp_strategy()) {
        let profile = RatchetProfile::new(rows.clone()).unwrap();
        for (inventory, min_rate, max_rate) in rows {
            prop_assert_eq!(profile.rates(inventory, interp), (min_rate, max_rate));
        }
    }

    #[test]
    fn test_linear_rates_bounded_by_neighbours(rows in profile_strategy(), frac in 0.0f64..1.0) {
        prop_assume!(rows.len() >= 2);
        let profile = RatchetProfile::new(rows.clone()).unwrap();
        for w in rows.windows(2) {
            let s = w[0].0 + frac * (w[1].0 - w[0].0);
            let (lo, hi) = profile.rates(s, RatchetInterp::Linear);
            prop_assert!(lo >= w[0].1.min(w[1].1) - 1e-9 && lo <= w[0].1.max(w[1].1) + 1e-9);
            prop_assert!(hi >= w[0].2.min(w[1].2) - 1e-9 && hi <= w[0].2.max(w[1].2) + 1e-9);
        }
    }

    #[test]
    fn test_step_volume_bounded_by_segment_rates(rows in profile_strategy(), s in 0.0f64..3000.0) {
        let profile = RatchetProfile::new(rows.clone()).unwrap();
        let max_inj = rows.iter().map(|r| r.2).fold(0.0, f64::max);
        let max_wd = rows.iter().map(|r| -r.1).fold(0.0, f64::max);
        let inj = profile.max_injection_volume(s, RatchetInterp::Step);
        let wd = profile.max_withdrawal_volume(s, RatchetInterp::Step);
        prop_assert!(inj >= 0.0 && inj <= max_inj + 1e-9);
        prop_assert!(wd >= 0.0 && wd <= max_wd + 1e-9);
    }

    #[test]
    fn test_decision_interval_respects_next_bounds(
        rows in profile_strategy(),
        interp in interp_strategy(),
        frac in 0.0f64..=1.0,
    ) {
        let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
        let grid = TimeGrid::daily(start, NaiveDate::from_ymd_opt(2021, 4, 11).unwrap()).unwrap();
        let table = RatchetTable::from_rows(vec![(midnight(start), rows)], interp).unwrap();
        let spec = StorageSpec::builder().grid(grid).ratchets(table).build().unwrap();

        let t = grid.point(3);
        let (min_inv, max_inv) = spec.inventory_bounds(t);
        let s = min_inv + frac * (max_inv - min_inv);
        if let Some((lo, hi)) = spec.decision_interval(t, s) {
            prop_assert!(lo <= hi);
            prop_assert!(s + lo >= min_inv - 1e-9);
            prop_assert!(s + hi <= max_inv + 1e-9);
        }
    }
}
