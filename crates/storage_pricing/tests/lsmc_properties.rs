//! Property tests for the building blocks of the LSMC engine.

use chrono::NaiveDate;
use proptest::prelude::*;
use storage_core::types::{midnight, TimeGrid};
use storage_models::storage::StorageSpec;
use storage_pricing::basis::BasisFunctions;
use storage_pricing::lsmc::{best_decision, InventoryGrid, Node};
use storage_pricing::mc::InventoryGridSpec;
use storage_pricing::regression;

fn storage() -> StorageSpec {
    StorageSpec::builder()
        .grid(
            TimeGrid::daily(
                NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
            )
            .unwrap(),
        )
        .injection_cost(0.05)
        .withdrawal_cost(0.05)
        .injection_fuel(0.01)
        .max_inventory(1000.0)
        .max_injection_rate(80.0)
        .max_withdrawal_rate(120.0)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_polynomial_basis_matches_powers(s in -50.0f64..50.0, x in -2.0f64..2.0) {
        let basis = BasisFunctions::parse("1 + x0 + s + s**2 + s^3 + x0*s", &["x0", "s"]).unwrap();
        let mut row = [0.0; 6];
        basis.evaluate_into(&[x, s], &mut row);
        let expected = [1.0, x, s, s * s, s * s * s, x * s];
        for (got, want) in row.iter().zip(expected.iter()) {
            prop_assert!((got - want).abs() <= 1e-9 * (1.0 + want.abs()));
        }
    }

    #[test]
    fn test_grid_spans_range_and_interpolates_nodes(
        lo in 0.0f64..500.0,
        width in 1.0f64..1000.0,
        points in 2usize..60,
    ) {
        let hi = lo + width;
        let grid = InventoryGrid::uniform(lo, hi, InventoryGridSpec::NumPoints(points), 1e-10);
        prop_assert_eq!(grid.len(), points);
        prop_assert_eq!(grid.point(0), lo);
        prop_assert_eq!(grid.point(points - 1), hi);

        let values: Vec<f64> = grid.points().map(|s| (s / 100.0).sin()).collect();
        for (k, v) in values.iter().enumerate() {
            prop_assert!((grid.interpolate(&values, grid.point(k)) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fixed_spacing_respects_spacing(
        width in 1.0f64..1000.0,
        spacing in 0.5f64..200.0,
    ) {
        let grid = InventoryGrid::uniform(0.0, width, InventoryGridSpec::FixedSpacing(spacing), 1e-10);
        prop_assert!(grid.len() >= 2);
        for k in 1..grid.len() {
            prop_assert!(grid.point(k) - grid.point(k - 1) <= spacing * (1.0 + 1e-9));
        }
    }

    #[test]
    fn test_decision_stays_in_interval(
        inventory in 0.0f64..1000.0,
        price in 1.0f64..40.0,
        slope in 0.0f64..40.0,
        curvature in -0.02f64..0.0,
    ) {
        let storage = storage();
        let grid = InventoryGrid::uniform(0.0, 1000.0, InventoryGridSpec::NumPoints(21), 1e-10);
        let continuation: Vec<f64> =
            grid.points().map(|s| slope * s + curvature * s * s).collect();
        let lo = -(120.0f64.min(inventory));
        let hi = 80.0f64.min(1000.0 - inventory);
        let node = Node {
            date: midnight(NaiveDate::from_ymd_opt(2021, 4, 5).unwrap()),
            inventory,
            price,
            discount_factor: 0.99,
            interval: (lo, hi),
        };
        let mut scratch = Vec::new();
        let d = best_decision(&storage, &node, &grid, &continuation, 1e-10, &mut scratch);

        prop_assert!(d.volume >= lo && d.volume <= hi);
        // Never worse than holding.
        let hold = grid.interpolate(&continuation, inventory);
        prop_assert!(d.objective >= hold - 1e-9 * (1.0 + hold.abs()));
    }

    #[test]
    fn test_regression_reproduces_exact_fit(
        a in -10.0f64..10.0,
        b in -5.0f64..5.0,
        c in -0.5f64..0.5,
        xs in prop::collection::vec(-3.0f64..3.0, 20..60),
    ) {
        prop_assume!(xs.iter().any(|x| (x - xs[0]).abs() > 0.5));
        prop_assume!({
            let mut sorted = xs.clone();
            sorted.sort_by(|p, q| p.total_cmp(q));
            sorted.dedup_by(|p, q| (*p - *q).abs() < 1e-3);
            sorted.len() >= 3
        });
        let rows = xs.len();
        let design: Vec<f64> = xs.iter().flat_map(|&x| [1.0, x, x * x]).collect();
        let targets: Vec<f64> = xs.iter().map(|&x| a + b * x + c * x * x).collect();

        let outcome = regression::fit(&design, &targets, rows, 3, 1, 1e-10);
        prop_assert!(outcome.warning.is_none());

        let mut out = [0.0];
        for (row, target) in design.chunks_exact(3).zip(&targets) {
            outcome.regression.predict_into(row, &mut out);
            prop_assert!((out[0] - target).abs() < 1e-6 * (1.0 + target.abs()));
        }
    }
}
