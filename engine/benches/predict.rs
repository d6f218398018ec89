//! Criterion benchmarks for tree scoring throughput

use arbor_engine::predict::lcg_dataset;
use arbor_engine::test_tree::{build_test_tree_categorical, grow_random_tree, random_dataset};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_predict_single_row(c: &mut Criterion) {
    let tree = build_test_tree_categorical();
    let data = lcg_dataset(1_024, 12345);

    c.bench_function("predict_single_row", |b| {
        let mut row = 0;
        b.iter(|| {
            row = (row + 1) % 1_024;
            black_box(tree.predict(black_box(&data), row, 0.1))
        })
    });
}

fn benchmark_predict_deep_tree(c: &mut Criterion) {
    let tree = grow_random_tree(7, 500);
    let data = random_dataset(7, 10_000);

    c.bench_function("predict_10k_rows_sequential", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for row in 0..10_000 {
                tree.predict_into(0, black_box(&data), row, 0.1, &mut sum);
            }
            black_box(sum)
        })
    });

    c.bench_function("predict_10k_rows_parallel", |b| {
        b.iter(|| black_box(tree.predict_all(black_box(&data), 10_000, 0.1)))
    });
}

criterion_group!(benches, benchmark_predict_single_row, benchmark_predict_deep_tree);
criterion_main!(benches);
