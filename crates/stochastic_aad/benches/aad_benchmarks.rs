//! Criterion benchmarks for stochastic_aad.
//!
//! Measures graph recording, the backward pass and the discontinuity
//! policies across path counts, and the backward pass across graph depths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stochastic_aad::{AadConfig, AadFactory, DifferentiableValue, DiscontinuityPolicy};

/// Deterministic pseudo-paths in (-3, 3).
fn generate_paths(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| ((i as f64 * 0.618_033_988_75).fract() - 0.5) * 6.0)
        .collect()
}

/// Discounted call-like payoff with a digital kicker.
fn payoff(spot: &DifferentiableValue, shocks: &DifferentiableValue) -> DifferentiableValue {
    let terminal = spot.mult(&shocks.mult(&0.2).exp());
    let call = terminal.sub(&100.0).floor(&0.0);
    let digital = terminal.sub(&100.0).choose(&10.0, &0.0);
    call.add(&digital).discount(&0.02, &1.0).average()
}

/// Benchmark forward recording and the backward pass.
fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");

    for size in [1_000, 10_000, 100_000] {
        let factory = AadFactory::default();
        let spot = factory.scalar(100.0);
        let shocks = factory.from_paths(generate_paths(size));

        group.bench_with_input(
            BenchmarkId::new("record", size),
            &(&spot, &shocks),
            |b, (spot, shocks)| {
                b.iter(|| payoff(black_box(spot), black_box(shocks)));
            },
        );

        let price = payoff(&spot, &shocks);
        group.bench_with_input(BenchmarkId::new("backward", size), &price, |b, price| {
            b.iter(|| black_box(price).gradient(None).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the backward pass on long chains.
fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth");

    for depth in [100, 1_000, 10_000] {
        let factory = AadFactory::default();
        let x = factory.scalar(1.0);
        let mut value = x.clone();
        for _ in 0..depth {
            value = value.mult(&1.000_1).add(&x);
        }

        group.bench_with_input(BenchmarkId::new("chain", depth), &value, |b, value| {
            b.iter(|| black_box(value).gradient(None).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the discontinuity policies on a 100k-path trigger.
fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("policies");
    let paths = generate_paths(100_000);

    for policy in DiscontinuityPolicy::ALL {
        let config = AadConfig::builder()
            .discontinuity_policy(policy)
            .window_width_per_std_dev(0.2)
            .build()
            .unwrap();
        let factory = AadFactory::new(config);
        let trigger = factory.from_paths(paths.clone());
        let price = trigger.choose(&1.0, &0.0).average();

        group.bench_with_input(BenchmarkId::new("choose", policy), &price, |b, price| {
            b.iter(|| black_box(price).gradient(None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gradient, bench_depth, bench_policies);
criterion_main!(benches);
