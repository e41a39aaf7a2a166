// Benchmarks for the overlap consensus engine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use vak_client::overlap::OverlapAlgorithm;

/// `n` intervals around zero with a few outliers mixed in.
fn intervals(n: usize) -> Vec<(i64, i64)> {
    (0..n as i64)
        .map(|i| {
            let center = if i % 7 == 3 { 3_600_000_000 } else { (i * 37) % 500_000 };
            let radius = 1_000_000 + (i * 13) % 250_000;
            (center - radius, center + radius)
        })
        .collect()
}

fn bench_add_interval(c: &mut Criterion) {
    let input = intervals(64);
    c.bench_function("add_interval_64", |b| {
        b.iter(|| {
            let mut algo = OverlapAlgorithm::new();
            for &(lo, hi) in &input {
                algo.add_interval(black_box(lo), black_box(hi)).unwrap();
            }
            algo
        })
    });
}

fn bench_find_best_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_best_overlap");
    for n in [4usize, 16, 64] {
        let mut algo = OverlapAlgorithm::new();
        for (lo, hi) in intervals(n) {
            algo.add_interval(lo, hi).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &algo, |b, a| {
            b.iter(|| black_box(a).find_best_overlap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_interval, bench_find_best_overlap);
criterion_main!(benches);
