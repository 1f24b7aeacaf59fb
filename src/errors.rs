//! Error types for the object pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool is at capacity and the creation attempts were used up.
    #[error("There are no available items in the pool and the maximum pool size was reached")]
    NoAvailableItems,

    /// A release without a matching acquire on this pool.
    #[error("Trying to release an object that is not checked out from this pool")]
    InvalidRelease,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    /// The factory failed while pre-populating the pool.
    #[error("Failed to create pooled object: {0}")]
    CreationFailed(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
