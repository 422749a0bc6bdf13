//! Criterion benchmarks for the LSMC storage engine.
//!
//! Benchmarks cover:
//! - Three-factor path simulation with varying path counts
//! - Basis-function evaluation
//! - A full valuation of a one-month ratchet storage

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storage_core::market_data::{Curve, DiscountEngine, MonthEndOffset};
use storage_core::types::{midnight, TimeGrid};
use storage_models::models::MultiFactorModel;
use storage_models::storage::{RatchetInterp, RatchetTable, StorageSpec};
use storage_pricing::basis::BasisFunctions;
use storage_pricing::lsmc::LsmcEngine;
use storage_pricing::mc::{InventoryGridSpec, LsmcConfig, SpotPriceSimulator};

const BASIS: &str = "1 + x_st + x_sw + x_lt + s + s**2 + s**3";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()
}

fn grid(end: NaiveDate) -> TimeGrid {
    TimeGrid::daily(start(), end).unwrap()
}

fn model(grid: TimeGrid) -> MultiFactorModel {
    MultiFactorModel::three_factor_seasonal(91.0, 0.85, 0.30, 0.19, grid).unwrap()
}

/// Benchmark path simulation over a year of daily dates.
fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("spot_simulation");
    let grid = grid(NaiveDate::from_ymd_opt(2022, 4, 1).unwrap());
    let model = model(grid);
    let forward = Curve::flat(grid, 15.0).unwrap();
    let dates: Vec<_> = grid.points().collect();
    let simulator = SpotPriceSimulator::new(&model);

    for num_sims in [100, 1_000, 5_000] {
        group.bench_with_input(BenchmarkId::new("three_factor", num_sims), &num_sims, |b, &n| {
            b.iter(|| {
                simulator
                    .simulate(midnight(start()), black_box(&dates), &forward, n, 12)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark evaluation of the compiled basis.
fn bench_basis(c: &mut Criterion) {
    let basis = BasisFunctions::parse(BASIS, &["x_st", "x_lt", "x_sw", "s"]).unwrap();
    let state = [0.1, -0.05, 0.02, 14.7];
    let mut out = vec![0.0; basis.len()];

    c.bench_function("basis_evaluate", |b| {
        b.iter(|| basis.evaluate_into(black_box(&state), &mut out));
    });
}

/// Benchmark a full valuation.
fn bench_valuation(c: &mut Criterion) {
    let mut group = c.benchmark_group("lsmc_valuation");
    group.sample_size(10);

    let grid = grid(NaiveDate::from_ymd_opt(2021, 5, 1).unwrap());
    let ratchets = RatchetTable::from_rows(
        vec![(
            midnight(start()),
            vec![
                (0.0, -150.0, 250.0),
                (2000.0, -200.0, 175.0),
                (5000.0, -260.0, 155.0),
                (7000.0, -275.0, 132.0),
            ],
        )],
        RatchetInterp::Linear,
    )
    .unwrap();
    let storage = StorageSpec::builder()
        .grid(grid)
        .injection_cost(0.01)
        .withdrawal_cost(0.025)
        .ratchets(ratchets)
        .build()
        .unwrap();
    let forward = Curve::flat(grid, 15.0).unwrap();
    let discount = DiscountEngine::new(
        midnight(start()),
        Curve::flat(grid, 0.005).unwrap(),
        MonthEndOffset::new(20),
    );

    for num_sims in [200, 1_000] {
        let config = LsmcConfig::builder()
            .num_sims(num_sims)
            .seed(12)
            .model(model(grid))
            .basis_functions(BASIS)
            .inventory_grid(InventoryGridSpec::NumPoints(50))
            .build()
            .unwrap();
        let engine = LsmcEngine::new(config);

        group.bench_with_input(BenchmarkId::new("one_month", num_sims), &engine, |b, engine| {
            b.iter(|| {
                engine
                    .value(&storage, midnight(start()), black_box(0.0), &forward, &discount)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simulation, bench_basis, bench_valuation);
criterion_main!(benches);
