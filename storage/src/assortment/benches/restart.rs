use super::utils::{directory, get_random_containers, init};
use criterion::{criterion_group, Criterion};
use std::time::{Duration, Instant};

fn bench_restart(c: &mut Criterion) {
    let capacity = 4;
    for &words in &[1_000, 10_000, 100_000] {
        // Create an assortment and fill it
        let directory = directory();
        let mut assortment = init(&directory, capacity);
        for container in get_random_containers(words, capacity) {
            assortment.store(container.word(), &container).unwrap();
        }
        assortment.close().unwrap();

        // Benchmark
        c.bench_function(&format!("{}/words={}", module_path!(), words), |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let start = Instant::now();
                    let assortment = init(&directory, capacity);
                    total += start.elapsed();
                    assert_eq!(assortment.size(), words);
                }
                total
            });
        });

        // Teardown
        std::fs::remove_dir_all(&directory).unwrap();
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_restart
}
