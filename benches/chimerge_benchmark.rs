use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chimerge::{ChiMergeConfig, Dataset};

// Deterministic dataset with interleaved class bands and enough distinct
// values to drive repeated merge rounds.
fn synthetic_dataset(n: usize) -> Dataset {
    let mut dataset = Dataset::new();
    for i in 0..n {
        let value = (i % 200) as f64 / 4.0;
        let label = if (i / 50) % 2 == 0 { "low" } else { "high" };
        dataset.push(vec![value], label);
    }
    dataset
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dataset = synthetic_dataset(6_400);
    c.bench_function("chimerge fit", |b| {
        b.iter(|| {
            let table = dataset
                .discretize_by_chi(0, ChiMergeConfig::default())
                .unwrap();
            black_box(table.boundaries())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
