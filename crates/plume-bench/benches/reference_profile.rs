//! Criterion benchmarks for whole-run quality simulation.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use plume_bench::{reference_profile, stress_profile};
use plume_core::HydraulicSource;

fn bench_reference_day(c: &mut Criterion) {
    c.bench_function("reference_30x30_day", |b| {
        b.iter_batched(
            || reference_profile().unwrap(),
            |(mut solver, mut hydraulics)| {
                solver.run(&mut hydraulics).unwrap();
                black_box(solver.mass_balance());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_reference_step(c: &mut Criterion) {
    let (mut solver, mut hydraulics) = reference_profile().unwrap();
    c.bench_function("reference_30x30_step", |b| {
        b.iter(|| {
            if solver.time() >= solver.config().duration {
                solver.initialize().unwrap();
            }
            if solver.needs_hydraulics() {
                let state = hydraulics.state_at(solver.time()).unwrap();
                solver.load_hydraulics(state).unwrap();
            }
            black_box(solver.step().unwrap());
        });
    });
}

fn bench_stress_interval(c: &mut Criterion) {
    c.bench_function("stress_100x100_interval", |b| {
        b.iter_batched(
            || stress_profile(42).unwrap(),
            |(mut solver, mut hydraulics)| {
                solver.run(&mut hydraulics).unwrap();
                black_box(solver.metrics().forced_nodes);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_reference_day,
    bench_reference_step,
    bench_stress_interval
);
criterion_main!(benches);
