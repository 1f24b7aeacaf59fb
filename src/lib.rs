//! # litepool
//!
//! Bounded, thread-safe object pool for expensive-to-build resources.
//!
//! ## Features
//!
//! - Lock-free acquire/release on a shared, cloneable pool handle
//! - Automatic return of objects via RAII (Drop trait)
//! - Lazy creation through a (possibly fallible) factory, with bounded retries
//! - Capacity that can be changed at runtime
//! - Acquisition hooks that can reject objects before hand-out
//! - Age-based eviction and a disposer for evicted objects
//! - Metrics and Prometheus export
//!
//! Acquisition never waits: when the pool is exhausted `acquire` fails
//! immediately with [`PoolError::NoAvailableItems`].
//!
//! ## Quick Start
//!
//! ```rust
//! use litepool::{ObjectPool, PoolConfiguration};
//!
//! let config = PoolConfiguration::new().with_capacity(4).with_initial_size(2);
//! let pool = ObjectPool::new(|| String::with_capacity(1024), config).unwrap();
//! {
//!     let mut buf = pool.acquire().unwrap();
//!     buf.push_str("hello");
//!     assert_eq!(pool.available_token_count(), 3);
//!     // Object automatically returned when `buf` goes out of scope
//! }
//! assert_eq!(pool.available_token_count(), 4);
//! ```

mod config;
mod disposal;
mod errors;
mod hooks;
mod ledger;
mod metrics;
mod pool;

pub use config::{DEFAULT_CREATION_ATTEMPTS, Disposer, PoolConfiguration};
pub use errors::{PoolError, PoolResult};
pub use hooks::{AcquisitionHook, HookFn, subscriber};
pub use ledger::ObjectId;
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{ObjectPool, PooledObject};
