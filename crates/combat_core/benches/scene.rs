//! Scene benchmarks for combat_core.
//!
//! Run with: `cargo bench -p combat_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use combat_core::scene::Scene;
use combat_test_utils::fixtures::{duel_setup, run_to_completion, sample_store, started_scene};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Full duel from start to verdict, and a single mid-fight tick.
pub fn scene_benchmark(c: &mut Criterion) {
    let store = sample_store();

    c.bench_function("duel_to_completion", |b| {
        b.iter(|| {
            let mut scene = started_scene(Arc::clone(&store), 1, &duel_setup(black_box(7)));
            black_box(run_to_completion(&mut scene, 300))
        })
    });

    let mut warm = started_scene(Arc::clone(&store), 1, &duel_setup(7));
    for _ in 0..10 {
        let _ = warm.update();
    }
    c.bench_function("duel_single_tick", |b| {
        b.iter_batched(
            || warm.clone(),
            |mut scene: Scene| black_box(scene.update()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, scene_benchmark);
criterion_main!(benches);
