//! Pool configuration options

use crate::errors::{PoolError, PoolResult};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback run once on every evicted object.
pub type Disposer<T> = Arc<dyn Fn(T) -> anyhow::Result<()> + Send + Sync>;

/// Number of fallback attempts `acquire` makes before giving up.
pub const DEFAULT_CREATION_ATTEMPTS: usize = 5;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use litepool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<Vec<u8>>::new()
///     .with_capacity(100)
///     .with_initial_size(10)
///     .with_max_age(Duration::from_secs(3600));
///
/// assert_eq!(config.capacity, 100);
/// assert_eq!(config.initial_size, 10);
/// assert!(!config.discard_on_release);
/// ```
pub struct PoolConfiguration<T> {
    /// Maximum number of objects (free + checked out) the pool may hold
    pub capacity: usize,

    /// Number of objects created eagerly at construction, capped at `capacity`
    pub initial_size: usize,

    /// Evict every released object instead of keeping it
    pub discard_on_release: bool,

    /// Objects older than this are evicted instead of reused
    pub max_age: Option<Duration>,

    /// Bounded retries when `acquire` has to take or create a fresh object
    pub creation_attempts: usize,

    /// Runs on a background thread for every evicted object
    pub disposer: Option<Disposer<T>>,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            capacity: 100,
            initial_size: 0,
            discard_on_release: false,
            max_age: None,
            creation_attempts: DEFAULT_CREATION_ATTEMPTS,
            disposer: None,
        }
    }
}

impl<T> Clone for PoolConfiguration<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            initial_size: self.initial_size,
            discard_on_release: self.discard_on_release,
            max_age: self.max_age,
            creation_attempts: self.creation_attempts,
            disposer: self.disposer.clone(),
        }
    }
}

impl<T> fmt::Debug for PoolConfiguration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("capacity", &self.capacity)
            .field("initial_size", &self.initial_size)
            .field("discard_on_release", &self.discard_on_release)
            .field("max_age", &self.max_age)
            .field("creation_attempts", &self.creation_attempts)
            .field("disposer", &self.disposer.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of objects created up front
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Never return released objects to the pool
    pub fn with_discard_on_release(mut self, discard: bool) -> Self {
        self.discard_on_release = discard;
        self
    }

    /// Set the maximum age of pooled objects
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set how many fallback attempts `acquire` makes
    pub fn with_creation_attempts(mut self, attempts: usize) -> Self {
        self.creation_attempts = attempts;
        self
    }

    /// Set the disposer run on evicted objects
    ///
    /// # Examples
    ///
    /// ```
    /// use litepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::<String>::new()
    ///     .with_disposer(|s: String| {
    ///         println!("closing {s}");
    ///         Ok(())
    ///     });
    ///
    /// assert!(config.disposer.is_some());
    /// ```
    pub fn with_disposer<F>(mut self, disposer: F) -> Self
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.disposer = Some(Arc::new(disposer));
        self
    }

    /// Check the configuration before a pool is built from it
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfiguration(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.creation_attempts == 0 {
            return Err(PoolError::InvalidConfiguration(
                "creation_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Eagerly created object count, never above capacity
    pub(crate) fn effective_initial_size(&self) -> usize {
        self.initial_size.min(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::<i32>::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.initial_size, 0);
        assert_eq!(config.creation_attempts, DEFAULT_CREATION_ATTEMPTS);
        assert!(config.max_age.is_none());
        assert!(config.disposer.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PoolConfiguration::<i32>::new().with_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = PoolConfiguration::<i32>::new().with_creation_attempts(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_size_capped() {
        let config = PoolConfiguration::<i32>::new()
            .with_capacity(5)
            .with_initial_size(50);
        assert_eq!(config.effective_initial_size(), 5);
    }

    #[test]
    fn test_debug_hides_disposer() {
        let config = PoolConfiguration::<i32>::new().with_disposer(|_| Ok(()));
        let rendered = format!("{:?}", config.clone());
        assert!(rendered.contains("<fn>"));
    }
}
