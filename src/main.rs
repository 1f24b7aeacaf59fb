// litepool demo binary
// The library lives in lib.rs; this walks through the main operations.
// More runnable walkthroughs live under demos/ (cargo run --example basic).
// Run with RUST_LOG=litepool=debug to see pool events.

use litepool::{ObjectPool, PoolConfiguration, PoolError, subscriber};
use std::time::Duration;

fn init_tracing() {
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing disabled: {err}");
    }
}

fn main() -> Result<(), PoolError> {
    init_tracing();

    println!("=== litepool demo ===");

    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_initial_size(1)
        .with_max_age(Duration::from_secs(30))
        .with_disposer(|buf: Vec<u8>| {
            println!("  disposing buffer of {} bytes", buf.capacity());
            Ok(())
        });
    let pool = ObjectPool::new(|| Vec::<u8>::with_capacity(4096), config)?;

    let not_dirty = subscriber(|buf: &Vec<u8>| {
        anyhow::ensure!(buf.is_empty(), "buffer was returned dirty");
        Ok(())
    });
    pool.on_acquiring().subscribe(&not_dirty);

    let written = pool.execute_with_object(|buf| {
        buf.extend_from_slice(b"payload");
        let len = buf.len();
        buf.clear();
        Ok::<_, PoolError>(len)
    })?;
    println!("  wrote {written} bytes, tokens left: {}", pool.available_token_count());

    let all = pool.acquire_all()?;
    println!("  checked out {} objects", all.len());
    match pool.acquire() {
        Err(err) => println!("  extra acquire failed: {err}"),
        Ok(_) => println!("  extra acquire unexpectedly succeeded"),
    }
    drop(all);

    pool.modify_pool_size(1);
    let _one = pool.acquire()?;
    println!("  after shrink: available {}, in use {}", pool.available_count(), pool.in_use_count());

    println!("  metrics:");
    let mut metrics: Vec<_> = pool.export_metrics().into_iter().collect();
    metrics.sort();
    for (key, value) in metrics {
        println!("    {key}: {value}");
    }

    // evicted buffers are disposed on a background thread
    std::thread::sleep(Duration::from_millis(20));
    Ok(())
}
