//! Benchmark harness for flat export and flat-array scoring

use arbor_engine::flat::FlatTree;
use arbor_engine::test_tree::{grow_random_tree, random_dataset};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn benchmark_flatten(c: &mut Criterion) {
    let tree = grow_random_tree(11, 1_000);
    let data = random_dataset(11, 16);

    c.bench_function("flatten_3001_nodes", |b| {
        b.iter(|| black_box(tree.to_flat(black_box(&data), 0.1)))
    });

    c.bench_function("flatten_append_to_existing", |b| {
        b.iter_batched(
            || {
                let mut flat = FlatTree::with_capacity(2 * tree.len());
                let mut categories = Vec::new();
                tree.flatten(&mut flat, &data, &mut categories, 0.1);
                (flat, categories)
            },
            |(mut flat, mut categories)| {
                black_box(tree.flatten(&mut flat, &data, &mut categories, 0.1))
            },
            BatchSize::SmallInput,
        )
    });
}

fn benchmark_flat_predict(c: &mut Criterion) {
    let tree = grow_random_tree(11, 1_000);
    let data = random_dataset(11, 10_000);
    let (flat, categories) = tree.to_flat(&data, 0.1);

    c.bench_function("flat_predict_10k_rows", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for row in 0..10_000 {
                sum += flat.predict(black_box(&data), row, &categories);
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, benchmark_flatten, benchmark_flat_predict);
criterion_main!(benches);
