//! Engine Benchmarks for the Consensus Pledge simulator
//!
//! Run with: `cargo bench --package pledge-model --bench engine_benchmarks`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pledge_model::{run, RewardSchedule, SimulationConfig, SimulationEngine};
use std::hint::black_box;
use std::time::Duration;

// ============================================================================
// RUN BENCHMARKS
// ============================================================================

fn run_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for ticks in [90u64, 365, 1825] {
        let mut config = SimulationConfig::default();
        config.run.ticks = ticks;
        let (params, initial) = config.build().expect("reference config builds");

        group.throughput(Throughput::Elements(ticks));
        group.bench_with_input(BenchmarkId::new("reference", ticks), &ticks, |b, &ticks| {
            b.iter(|| run(black_box(initial.clone()), &params, ticks).expect("run succeeds"));
        });
    }

    group.finish();
}

// ============================================================================
// STEP BENCHMARKS
// ============================================================================

fn step_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    // a state one year in carries a few hundred cohorts with long schedules
    let config = SimulationConfig::default();
    let (params, initial) = config.build().expect("reference config builds");
    let warm = run(initial, &params, 365)
        .expect("run succeeds")
        .final_state
        .expect("final state is kept");
    let engine = SimulationEngine::new(params).expect("valid parameters");

    group.bench_function("after_one_year", |b| {
        b.iter(|| engine.step(black_box(&warm)).expect("step succeeds"));
    });

    group.finish();
}

// ============================================================================
// SCHEDULE BENCHMARKS
// ============================================================================

fn schedule_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");

    for duration in [30u64, 180, 540] {
        group.bench_with_input(
            BenchmarkId::new("merge_then_prune", duration),
            &duration,
            |b, &duration| {
                b.iter(|| {
                    let mut schedule = RewardSchedule::new();
                    for day in 0..duration {
                        schedule.prune(day);
                        schedule.merge_linear(day, duration, 1_000.0);
                    }
                    black_box(schedule.total())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, run_benchmarks, step_benchmarks, schedule_benchmarks);
criterion_main!(benches);
