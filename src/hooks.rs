//! Acquisition hook: a gate run on every object before it is handed out

use parking_lot::RwLock;
use std::sync::Arc;

/// A hook subscriber. Returning `Err` rejects the candidate object.
pub type HookFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a [`HookFn`].
///
/// Keep the returned handle around to unsubscribe later; subscribers are
/// compared by identity, so a second `subscriber(..)` call with the same
/// closure body is a different subscriber.
pub fn subscriber<T, F>(f: F) -> HookFn<T>
where
    F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered set of subscribers fired on every acquisition.
///
/// # Examples
///
/// ```
/// use litepool::{AcquisitionHook, subscriber};
///
/// let hook = AcquisitionHook::<u32>::new();
/// let even_only = subscriber(|n: &u32| {
///     anyhow::ensure!(n % 2 == 0, "odd value {n}");
///     Ok(())
/// });
///
/// assert!(hook.subscribe(&even_only));
/// assert!(!hook.subscribe(&even_only));
/// assert!(hook.invoke(&2).is_ok());
/// assert!(hook.invoke(&3).is_err());
/// assert!(hook.unsubscribe(&even_only));
/// assert!(!hook.unsubscribe(&even_only));
/// ```
pub struct AcquisitionHook<T> {
    subscribers: RwLock<Vec<HookFn<T>>>,
}

impl<T> AcquisitionHook<T> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Returns false if the subscriber was already registered.
    pub fn subscribe(&self, hook: &HookFn<T>) -> bool {
        let mut subscribers = self.subscribers.write();
        if subscribers.iter().any(|s| same_subscriber(s, hook)) {
            return false;
        }
        subscribers.push(Arc::clone(hook));
        true
    }

    /// Returns false if the subscriber was not registered.
    pub fn unsubscribe(&self, hook: &HookFn<T>) -> bool {
        let mut subscribers = self.subscribers.write();
        match subscribers.iter().position(|s| same_subscriber(s, hook)) {
            Some(idx) => {
                subscribers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Run every subscriber in registration order, stopping at the first error.
    ///
    /// Subscribers run against a snapshot taken before the first call, so a
    /// subscriber may subscribe or unsubscribe (itself included) while firing.
    pub fn invoke(&self, item: &T) -> anyhow::Result<()> {
        let snapshot = {
            let subscribers = self.subscribers.read();
            if subscribers.is_empty() {
                return Ok(());
            }
            subscribers.to_vec()
        };

        for hook in &snapshot {
            hook(item)?;
        }
        Ok(())
    }
}

impl<T> Default for AcquisitionHook<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_subscriber<T>(a: &HookFn<T>, b: &HookFn<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_fires_in_subscription_order() {
        let hook = AcquisitionHook::<i32>::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let calls = Arc::clone(&calls);
            subscriber(move |n: &i32| {
                calls.lock().push(("first", *n));
                Ok(())
            })
        };
        let second = {
            let calls = Arc::clone(&calls);
            subscriber(move |n: &i32| {
                calls.lock().push(("second", *n));
                Ok(())
            })
        };

        hook.subscribe(&first);
        hook.subscribe(&second);
        hook.invoke(&7).unwrap();

        assert_eq!(*calls.lock(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_identity_not_value() {
        let hook = AcquisitionHook::<i32>::new();
        let a = subscriber(|_: &i32| Ok(()));
        let b = subscriber(|_: &i32| Ok(()));

        assert!(hook.subscribe(&a));
        assert!(hook.subscribe(&b));
        assert!(!hook.subscribe(&a.clone()));
        assert_eq!(hook.len(), 2);
    }

    #[test]
    fn test_error_stops_chain() {
        let hook = AcquisitionHook::<i32>::new();
        let reached = Arc::new(Mutex::new(false));

        let failing = subscriber(|_: &i32| anyhow::bail!("rejected"));
        let after = {
            let reached = Arc::clone(&reached);
            subscriber(move |_: &i32| {
                *reached.lock() = true;
                Ok(())
            })
        };

        hook.subscribe(&failing);
        hook.subscribe(&after);

        let err = hook.invoke(&1).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
        assert!(!*reached.lock());
    }

    #[test]
    fn test_unsubscribe_unknown() {
        let hook = AcquisitionHook::<i32>::new();
        let a = subscriber(|_: &i32| Ok(()));
        assert!(!hook.unsubscribe(&a));
        assert!(hook.is_empty());
    }

    #[test]
    fn test_subscriber_can_unsubscribe_itself() {
        let hook = Arc::new(AcquisitionHook::<i32>::new());
        let me: Arc<std::sync::OnceLock<HookFn<i32>>> = Arc::new(std::sync::OnceLock::new());

        let once = {
            let hook = Arc::clone(&hook);
            let me = Arc::clone(&me);
            subscriber(move |_: &i32| {
                if let Some(this) = me.get() {
                    hook.unsubscribe(this);
                }
                Ok(())
            })
        };
        assert!(me.set(Arc::clone(&once)).is_ok());

        hook.subscribe(&once);
        hook.invoke(&1).unwrap();
        assert!(hook.is_empty());
    }
}
