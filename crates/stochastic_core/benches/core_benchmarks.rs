//! Criterion benchmarks for stochastic_core.
//!
//! Measures elementwise arithmetic, reductions and regression-based
//! conditional expectation across path counts to characterise scaling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stochastic_core::{ConditionalExpectationEstimator, RandomVariable, RegressionEstimator};

/// Deterministic pseudo-paths in (-3, 3).
fn generate_paths(n: usize) -> RandomVariable {
    (0..n)
        .map(|i| ((i as f64 * 0.618_033_988_75).fract() - 0.5) * 6.0)
        .collect()
}

/// Benchmark elementwise operations.
fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise");

    for size in [1_000, 10_000, 100_000] {
        let x = generate_paths(size);
        let y = x.exp();

        group.bench_with_input(BenchmarkId::new("mult", size), &(&x, &y), |b, (x, y)| {
            b.iter(|| black_box(x).mult(black_box(y)));
        });

        group.bench_with_input(
            BenchmarkId::new("add_product", size),
            &(&x, &y),
            |b, (x, y)| {
                b.iter(|| black_box(x).add_product(black_box(y), black_box(x)));
            },
        );

        group.bench_with_input(BenchmarkId::new("choose", size), &(&x, &y), |b, (x, y)| {
            b.iter(|| black_box(x).choose(black_box(y), &RandomVariable::zero()));
        });
    }

    group.finish();
}

/// Benchmark reductions.
fn bench_reductions(c: &mut Criterion) {
    let mut group = c.benchmark_group("reductions");

    for size in [1_000, 10_000, 100_000] {
        let x = generate_paths(size);

        group.bench_with_input(BenchmarkId::new("mean", size), &x, |b, x| {
            b.iter(|| black_box(x).mean());
        });

        group.bench_with_input(BenchmarkId::new("variance", size), &x, |b, x| {
            b.iter(|| black_box(x).variance());
        });
    }

    group.finish();
}

/// Benchmark regression estimator construction and projection.
fn bench_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression");

    for size in [1_000, 10_000] {
        let x = generate_paths(size);
        let target = x.exp().cap(&RandomVariable::scalar(5.0));

        group.bench_with_input(BenchmarkId::new("construction", size), &x, |b, x| {
            b.iter(|| RegressionEstimator::polynomial(black_box(x), 3).unwrap());
        });

        let estimator = RegressionEstimator::polynomial(&x, 3).unwrap();
        group.bench_with_input(
            BenchmarkId::new("conditional_expectation", size),
            &target,
            |b, target| {
                b.iter(|| estimator.conditional_expectation(black_box(target)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_elementwise, bench_reductions, bench_regression);
criterion_main!(benches);
