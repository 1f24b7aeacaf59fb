use criterion::{Criterion, black_box, criterion_group, criterion_main};
use litepool::{ObjectPool, PoolConfiguration, subscriber};
use std::time::Duration;

fn acquire_release(c: &mut Criterion) {
    let pool = ObjectPool::new(
        || vec![0u8; 4096],
        PoolConfiguration::new().with_capacity(64).with_initial_size(64),
    )
    .unwrap();

    c.bench_function("acquire_release", |b| {
        b.iter(|| {
            let buf = pool.acquire().unwrap();
            black_box(buf.len());
        })
    });
}

fn acquire_release_with_hook_and_age(c: &mut Criterion) {
    let pool = ObjectPool::new(
        || vec![0u8; 4096],
        PoolConfiguration::new()
            .with_capacity(64)
            .with_initial_size(64)
            .with_max_age(Duration::from_secs(3600)),
    )
    .unwrap();
    let hook = subscriber(|buf: &Vec<u8>| {
        anyhow::ensure!(!buf.is_empty(), "empty buffer");
        Ok(())
    });
    pool.on_acquiring().subscribe(&hook);

    c.bench_function("acquire_release_hook_age", |b| {
        b.iter(|| {
            let buf = pool.acquire().unwrap();
            black_box(buf.len());
        })
    });
}

fn execute_with_action(c: &mut Criterion) {
    let pool = ObjectPool::new(String::new, PoolConfiguration::new().with_capacity(8)).unwrap();

    c.bench_function("execute_with_action", |b| {
        b.iter(|| {
            pool.execute_with_action(|s| {
                s.clear();
                s.push_str("bench");
                black_box(s.len())
            })
            .unwrap()
        })
    });
}

criterion_group!(benches, acquire_release, acquire_release_with_hook_and_age, execute_with_action);
criterion_main!(benches);
