//! Advanced usage: hooks, age-based eviction, disposers and resizing
//!
//! Run with RUST_LOG=litepool=debug to see pool events.

use litepool::{ObjectPool, PoolConfiguration, PoolError, subscriber};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    session: usize,
    healthy: bool,
}

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== litepool - Advanced Examples ===\n");

    let sessions = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_initial_size(1)
        .with_max_age(Duration::from_millis(100))
        .with_disposer({
            let closed = Arc::clone(&closed);
            move |conn: Connection| {
                closed.fetch_add(1, Ordering::SeqCst);
                println!("   closing session {}", conn.session);
                Ok(())
            }
        });

    let pool = ObjectPool::new(
        {
            let sessions = Arc::clone(&sessions);
            move || Connection {
                session: sessions.fetch_add(1, Ordering::SeqCst),
                healthy: true,
            }
        },
        config,
    )?;

    // Example 1: Acquisition hook rejecting unhealthy connections
    println!("1. Acquisition Hook:");
    let healthy_only = subscriber(|conn: &Connection| {
        anyhow::ensure!(conn.healthy, "session {} is unhealthy", conn.session);
        Ok(())
    });
    pool.on_acquiring().subscribe(&healthy_only);

    {
        let mut conn = pool.acquire()?;
        println!("   using session {}", conn.session);
        conn.healthy = false;
    }
    let conn = pool.acquire()?;
    println!("   next acquire got session {}", conn.session);
    drop(conn);
    println!("   hook rejections: {}\n", pool.get_metrics().hook_rejections);

    // Example 2: Age-based eviction
    println!("2. Age-Based Eviction:");
    thread::sleep(Duration::from_millis(150));
    let conn = pool.acquire()?;
    println!("   after expiry got fresh session {}", conn.session);
    drop(conn);
    println!();

    // Example 3: Shrinking the pool
    println!("3. Resizing:");
    pool.modify_pool_size(1);
    let _conn = pool.acquire()?;
    println!(
        "   capacity {}, in use {}, idle {}",
        pool.capacity(),
        pool.in_use_count(),
        pool.available_count()
    );

    // disposal runs on a background thread
    thread::sleep(Duration::from_millis(50));
    println!("\n   sessions opened: {}", sessions.load(Ordering::SeqCst));
    println!("   sessions closed: {}", closed.load(Ordering::SeqCst));
    Ok(())
}
