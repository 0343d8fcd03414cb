//! Benchmarks for k-NN and threshold queries.
//!
//! Measures both backends on 10,000 pseudo-random 64-dimensional vectors:
//! - k-NN query for a batch of 32 probes at several `k`
//! - threshold query (fixed over-fetch) for the same batch

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_precision_loss)]

use annex::{
    AnyBackend, Backend, FromVectors, MutableGraphArgs, MutableGraphBackend, StaticGraphArgs,
    StaticGraphBackend,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ndarray::Array2;
use std::hint::black_box;
use std::time::Duration;

const ROWS: usize = 10_000;
const DIM: usize = 64;
const PROBES: usize = 32;

fn sample_vectors(rows: usize, offset: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, DIM), |(i, j)| {
        (((i + offset + 1) * (j + 1)) as f32 * 0.618).sin()
    })
}

fn backends(vectors: &Array2<f32>) -> Vec<(&'static str, AnyBackend)> {
    let mutable = MutableGraphBackend::from_vectors(vectors.view(), MutableGraphArgs::new(DIM))
        .expect("mutable build failed");
    let fixed = StaticGraphBackend::from_vectors(vectors.view(), StaticGraphArgs::new(DIM))
        .expect("static build failed");
    vec![
        ("mutable_graph", mutable.into()),
        ("static_graph", fixed.into()),
    ]
}

fn bench_query(c: &mut Criterion) {
    let vectors = sample_vectors(ROWS, 0);
    let probes = sample_vectors(PROBES, ROWS);
    let backends = backends(&vectors);

    let mut group = c.benchmark_group("query");
    group.measurement_time(Duration::from_secs(5));
    for (name, backend) in &backends {
        for k in [1, 10, 100] {
            group.bench_with_input(BenchmarkId::new(*name, k), &k, |b, &k| {
                b.iter(|| black_box(backend.query(probes.view(), k).expect("query failed")));
            });
        }
    }
    group.finish();
}

fn bench_threshold(c: &mut Criterion) {
    let vectors = sample_vectors(ROWS, 0);
    let probes = sample_vectors(PROBES, ROWS);
    let backends = backends(&vectors);

    let mut group = c.benchmark_group("threshold");
    group.measurement_time(Duration::from_secs(5));
    for (name, backend) in &backends {
        group.bench_function(*name, |b| {
            b.iter(|| {
                black_box(
                    backend
                        .threshold(probes.view(), 0.1)
                        .expect("threshold failed"),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_query, bench_threshold);
criterion_main!(benches);
