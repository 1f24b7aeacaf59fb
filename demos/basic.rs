//! Basic usage examples for ObjectPool

use litepool::{ObjectPool, PoolConfiguration, PoolError};

fn main() -> Result<(), PoolError> {
    println!("=== litepool - Basic Examples ===\n");

    // Example 1: Simple pool of strings
    simple_pool()?;

    // Example 2: Execute a closure with a pooled object
    execute_with_object()?;

    // Example 3: Exhaustion
    exhaustion()?;

    // Example 4: Metrics
    metrics()?;

    Ok(())
}

fn simple_pool() -> Result<(), PoolError> {
    println!("1. Simple Pool:");
    let config = PoolConfiguration::new().with_capacity(4).with_initial_size(2);
    let pool = ObjectPool::new(|| String::with_capacity(256), config)?;

    {
        let mut buf = pool.acquire()?;
        buf.push_str("hello");
        println!("   Got object {} holding {:?}", buf.id(), *buf);
        println!("   Tokens while held: {}", pool.available_token_count());
        // Object automatically returned when dropped
    }

    println!("   Tokens after return: {}\n", pool.available_token_count());
    Ok(())
}

fn execute_with_object() -> Result<(), PoolError> {
    println!("2. Execute With Object:");
    let pool = ObjectPool::new(Vec::<u8>::new, PoolConfiguration::default())?;

    let len = pool.execute_with_object(|buf| {
        buf.extend_from_slice(b"payload");
        Ok::<_, PoolError>(buf.len())
    })?;
    println!("   Callback wrote {len} bytes");

    let doubled = pool.execute_with_action(|buf| buf.len() * 2)?;
    println!("   Reused buffer, doubled length: {doubled}\n");
    Ok(())
}

fn exhaustion() -> Result<(), PoolError> {
    println!("3. Exhaustion:");
    let pool = ObjectPool::new(|| 0u64, PoolConfiguration::new().with_capacity(3))?;

    let all = pool.acquire_all()?;
    println!("   Checked out {} objects", all.len());

    match pool.acquire() {
        Err(err) => println!("   Extra acquire failed: {err}"),
        Ok(_) => println!("   Extra acquire unexpectedly succeeded"),
    }

    drop(all);
    println!("   Tokens after returning all: {}\n", pool.available_token_count());
    Ok(())
}

fn metrics() -> Result<(), PoolError> {
    println!("4. Metrics:");
    let pool = ObjectPool::new(|| 0u64, PoolConfiguration::new().with_capacity(5))?;

    {
        let _a = pool.acquire()?;
        let _b = pool.acquire()?;
        let metrics = pool.get_metrics();
        println!("   Utilization: {:.1}%", metrics.utilization * 100.0);
        println!("   In use: {}, idle: {}", metrics.in_use_objects, metrics.available_objects);
    }

    let mut metrics: Vec<_> = pool.export_metrics().into_iter().collect();
    metrics.sort();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {key}: {value}");
    }
    Ok(())
}
