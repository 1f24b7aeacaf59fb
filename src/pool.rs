//! Core object pool implementation

use crate::config::PoolConfiguration;
use crate::disposal::DisposalWorker;
use crate::errors::{PoolError, PoolResult};
use crate::hooks::AcquisitionHook;
use crate::ledger::{AgeLedger, ObjectId};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};

use crossbeam::queue::SegQueue;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Factory<T> = Arc<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// An object together with the id it was created under
struct Slot<T> {
    id: ObjectId,
    value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvictReason {
    Expired,
    Surplus,
    Rejected,
    Discarded,
    Drained,
}

/// A checked-out object. Returned to its pool when dropped.
///
/// Dropping the guard while the thread is panicking releases the object with
/// `discard = true`.
pub struct PooledObject<T: Send + 'static> {
    slot: Option<Slot<T>>,
    pool: Arc<PoolShared<T>>,
}

impl<T: Send + 'static> PooledObject<T> {
    fn new(slot: Slot<T>, pool: Arc<PoolShared<T>>) -> Self {
        Self {
            slot: Some(slot),
            pool,
        }
    }

    /// Id assigned to the object when it was created
    pub fn id(&self) -> ObjectId {
        self.slot.as_ref().expect("Value already taken").id
    }

    /// Release the object and evict it instead of returning it to the pool
    pub fn discard(mut self) -> PoolResult<()> {
        let slot = self.slot.take().expect("Value already taken");
        self.pool.release(slot, true)
    }

    /// Take the object out of the pool for good.
    ///
    /// The checkout is closed and the pool stops tracking the object. The
    /// disposer is not run; the caller owns the value from here on.
    pub fn detach(mut self) -> T {
        let slot = self.slot.take().expect("Value already taken");
        self.pool.detach(slot.id);
        slot.value
    }
}

impl<T: Send + 'static> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.slot.as_ref().expect("Value already taken").value
    }
}

impl<T: Send + 'static> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot.as_mut().expect("Value already taken").value
    }
}

impl<T: Send + 'static> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let id = slot.id;
            if let Err(err) = self.pool.release(slot, std::thread::panicking()) {
                tracing::warn!(object = %id, error = %err, "failed to return pooled object");
            }
        }
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(slot) => f
                .debug_struct("PooledObject")
                .field("id", &slot.id)
                .field("value", &slot.value)
                .finish(),
            None => f.write_str("PooledObject(<released>)"),
        }
    }
}

struct PoolShared<T> {
    available: SegQueue<Slot<T>>,
    in_use: AtomicUsize,
    capacity: AtomicUsize,
    ledger: AgeLedger,
    factory: Factory<T>,
    discard_on_release: bool,
    creation_attempts: usize,
    disposal: Option<DisposalWorker<T>>,
    on_acquiring: AcquisitionHook<T>,
    metrics: MetricsTracker,
}

impl<T: Send + 'static> PoolShared<T> {
    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    fn has_room(&self) -> bool {
        self.available.len() + self.in_use() < self.capacity()
    }

    /// True when holding `extra` more objects would exceed the capacity.
    fn is_oversized(&self, extra: usize) -> bool {
        self.available.len() + extra + self.in_use() > self.capacity()
    }

    /// Count one more checkout unless that would pass the capacity.
    fn try_reserve(&self) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity()).then_some(n + 1)
            })
            .is_ok()
    }

    fn create(&self) -> anyhow::Result<Slot<T>> {
        let value = (self.factory)()?;
        let id = ObjectId::next();
        self.ledger.track(id);
        MetricsTracker::record(&self.metrics.total_created);
        tracing::debug!(object = %id, "created pooled object");
        Ok(Slot { id, value })
    }

    fn take_or_create(&self) -> anyhow::Result<Slot<T>> {
        if let Some(slot) = self.available.pop() {
            if !self.ledger.is_expired(slot.id) {
                return Ok(slot);
            }
            self.evict(slot, EvictReason::Expired);
        }
        self.create()
    }

    /// Run the acquisition hook. Rejected objects are evicted.
    fn screen(&self, slot: Slot<T>) -> Option<Slot<T>> {
        match self.on_acquiring.invoke(&slot.value) {
            Ok(()) => Some(slot),
            Err(err) => {
                MetricsTracker::record(&self.metrics.hook_rejections);
                tracing::debug!(object = %slot.id, error = %err, "acquisition hook rejected object");
                self.evict(slot, EvictReason::Rejected);
                None
            }
        }
    }

    fn hand_out(&self, slot: Slot<T>) -> Slot<T> {
        MetricsTracker::record(&self.metrics.total_acquired);
        tracing::trace!(object = %slot.id, "object handed out");
        slot
    }

    fn exhausted(&self) -> PoolError {
        MetricsTracker::record(&self.metrics.exhausted_events);
        tracing::debug!(
            in_use = self.in_use(),
            capacity = self.capacity(),
            "no available items in pool"
        );
        PoolError::NoAvailableItems
    }

    fn acquire(&self) -> PoolResult<Slot<T>> {
        while let Some(slot) = self.available.pop() {
            if self.ledger.is_expired(slot.id) {
                self.evict(slot, EvictReason::Expired);
                continue;
            }
            // left over from a shrink
            if self.is_oversized(1) {
                self.evict(slot, EvictReason::Surplus);
                continue;
            }
            let Some(slot) = self.screen(slot) else {
                continue;
            };

            if self.try_reserve() {
                return Ok(self.hand_out(slot));
            }
            self.available.push(slot);
            return Err(self.exhausted());
        }

        for attempt in 1..=self.creation_attempts {
            if !self.has_room() {
                return Err(self.exhausted());
            }

            let slot = match self.take_or_create() {
                Ok(slot) => slot,
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "failed to create pooled object");
                    continue;
                }
            };
            let Some(slot) = self.screen(slot) else {
                continue;
            };

            if self.try_reserve() {
                return Ok(self.hand_out(slot));
            }
            self.evict(slot, EvictReason::Surplus);
            return Err(self.exhausted());
        }

        Err(self.exhausted())
    }

    fn release(&self, slot: Slot<T>, discard: bool) -> PoolResult<()> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| PoolError::InvalidRelease)?;
        MetricsTracker::record(&self.metrics.total_released);

        let reason = if discard || self.discard_on_release {
            Some(EvictReason::Discarded)
        } else if self.ledger.is_expired(slot.id) {
            Some(EvictReason::Expired)
        } else if self.is_oversized(1) {
            // the released object is no longer counted in `in_use`
            Some(EvictReason::Surplus)
        } else {
            None
        };

        match reason {
            Some(reason) => self.evict(slot, reason),
            None => {
                tracing::trace!(object = %slot.id, "object returned to pool");
                self.available.push(slot);
            }
        }
        Ok(())
    }

    fn detach(&self, id: ObjectId) {
        if self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            tracing::warn!(object = %id, "detached object was not counted as in use");
        }
        self.ledger.forget(id);
        tracing::debug!(object = %id, "object detached from pool");
    }

    /// Remove the object from the pool for good. Never fails and never waits
    /// on the disposer, which runs on the pool's disposer thread.
    fn evict(&self, slot: Slot<T>, reason: EvictReason) {
        let Slot { id, value } = slot;
        self.ledger.forget(id);
        MetricsTracker::record(&self.metrics.total_evicted);
        tracing::debug!(object = %id, ?reason, "evicting pooled object");

        if let Some(disposal) = &self.disposal {
            disposal.submit(id, value);
        }
    }

    fn drain(&self) -> usize {
        let mut drained = 0;
        while let Some(slot) = self.available.pop() {
            self.evict(slot, EvictReason::Drained);
            drained += 1;
        }
        drained
    }
}

/// Thread-safe, bounded pool of objects produced by a factory.
///
/// Cloning the pool is cheap; every clone shares the same objects.
pub struct ObjectPool<T: Send + 'static> {
    shared: Arc<PoolShared<T>>,
}

impl<T: Send + 'static> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> ObjectPool<T> {
    /// Create a pool around an infallible factory
    pub fn new<F>(factory: F, config: PoolConfiguration<T>) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_fallible_factory(move || Ok(factory()), config)
    }

    /// Create a pool around a factory that may fail.
    ///
    /// Fails with [`PoolError::CreationFailed`] if the factory fails while the
    /// initial objects are being created, or if the disposer thread cannot be
    /// started.
    pub fn with_fallible_factory<F>(factory: F, config: PoolConfiguration<T>) -> PoolResult<Self>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        config.validate()?;
        let initial_size = config.effective_initial_size();
        let disposal = config
            .disposer
            .map(DisposalWorker::start)
            .transpose()
            .map_err(|err| PoolError::CreationFailed(format!("cannot start disposer thread: {err}")))?;

        let shared = Arc::new(PoolShared {
            available: SegQueue::new(),
            in_use: AtomicUsize::new(0),
            capacity: AtomicUsize::new(config.capacity),
            ledger: AgeLedger::new(config.max_age),
            factory: Arc::new(factory),
            discard_on_release: config.discard_on_release,
            creation_attempts: config.creation_attempts,
            disposal,
            on_acquiring: AcquisitionHook::new(),
            metrics: MetricsTracker::new(),
        });

        for _ in 0..initial_size {
            match shared.create() {
                Ok(slot) => shared.available.push(slot),
                Err(err) => {
                    shared.drain();
                    return Err(PoolError::CreationFailed(err.to_string()));
                }
            }
        }

        tracing::debug!(capacity = config.capacity, initial_size, "object pool created");
        Ok(Self { shared })
    }

    /// Check out one object.
    ///
    /// Idle objects are reused first; stale, surplus and rejected ones are
    /// evicted along the way. When none is left, new objects are created
    /// within the configured number of attempts.
    pub fn acquire(&self) -> PoolResult<PooledObject<T>> {
        let slot = self.shared.acquire()?;
        Ok(PooledObject::new(slot, Arc::clone(&self.shared)))
    }

    /// Check out up to `min(count, capacity)` objects.
    ///
    /// If one acquisition fails the error is returned and the objects
    /// acquired so far go back to the pool.
    pub fn acquire_many(&self, count: usize) -> PoolResult<Vec<PooledObject<T>>> {
        let count = count.min(self.capacity());
        // capacity may be huge, so grow as objects arrive
        let mut objects = Vec::new();
        for _ in 0..count {
            objects.push(self.acquire()?);
        }
        Ok(objects)
    }

    pub fn acquire_all(&self) -> PoolResult<Vec<PooledObject<T>>> {
        self.acquire_many(self.capacity())
    }

    /// Return an object to the pool, or evict it when `discard` is set.
    ///
    /// Fails with [`PoolError::InvalidRelease`] if the object was not checked
    /// out from this pool. The object then goes back to the pool it came from.
    pub fn release(&self, mut obj: PooledObject<T>, discard: bool) -> PoolResult<()> {
        if !Arc::ptr_eq(&obj.pool, &self.shared) {
            tracing::debug!(object = %obj.id(), "release into a foreign pool rejected");
            return Err(PoolError::InvalidRelease);
        }
        match obj.slot.take() {
            Some(slot) => self.shared.release(slot, discard),
            None => Err(PoolError::InvalidRelease),
        }
    }

    /// Run `f` with a checked-out object.
    ///
    /// The object is returned on success and evicted when `f` fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use litepool::{ObjectPool, PoolConfiguration, PoolError};
    ///
    /// let pool = ObjectPool::new(Vec::<u8>::new, PoolConfiguration::default()).unwrap();
    ///
    /// let len = pool
    ///     .execute_with_object(|buf| {
    ///         buf.extend_from_slice(b"hello");
    ///         Ok::<_, PoolError>(buf.len())
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(len, 5);
    /// assert_eq!(pool.available_token_count(), 100);
    /// ```
    pub fn execute_with_object<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<PoolError>,
    {
        let mut obj = self.acquire()?;
        match f(&mut *obj) {
            Ok(result) => {
                self.release(obj, false)?;
                Ok(result)
            }
            Err(err) => {
                if let Err(release_err) = self.release(obj, true) {
                    tracing::warn!(error = %release_err, "failed to discard object after callback error");
                }
                Err(err)
            }
        }
    }

    /// Run an infallible `f` with a checked-out object
    pub fn execute_with_action<R, F>(&self, f: F) -> PoolResult<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.execute_with_object(|obj| Ok(f(obj)))
    }

    /// Change the capacity. A shrink is enforced lazily by later acquires
    /// and releases.
    pub fn modify_pool_size(&self, new_size: usize) {
        let previous = self.shared.capacity.swap(new_size, Ordering::AcqRel);
        if previous != new_size {
            tracing::debug!(previous, new_size, "pool capacity changed");
        }
    }

    /// Evict every idle object, returning how many were evicted
    pub fn drain(&self) -> usize {
        self.shared.drain()
    }

    /// Hook fired on every object before it is handed out
    pub fn on_acquiring(&self) -> &AcquisitionHook<T> {
        &self.shared.on_acquiring
    }

    /// Capacity minus checked-out objects, zero if a shrink left more
    /// objects checked out than the new capacity allows
    pub fn available_token_count(&self) -> usize {
        self.shared.capacity().saturating_sub(self.shared.in_use())
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    pub fn in_use_count(&self) -> usize {
        self.shared.in_use()
    }

    /// Idle objects currently held
    pub fn available_count(&self) -> usize {
        self.shared.available.len()
    }

    /// Objects with a creation time on record. Always zero without a max age.
    pub fn tracked_count(&self) -> usize {
        self.shared.ledger.len()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.shared.metrics.get_metrics(
            self.in_use_count(),
            self.available_count(),
            self.capacity(),
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}
