//! Background disposal of evicted objects

use crate::config::Disposer;
use crate::ledger::ObjectId;

use crossbeam::channel::{self, Sender};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Hands evicted objects to a dedicated thread that runs the disposer.
///
/// The thread exits once the worker is dropped and every queued object has
/// been disposed.
pub(crate) struct DisposalWorker<T> {
    jobs: Sender<(ObjectId, T)>,
}

impl<T: Send + 'static> DisposalWorker<T> {
    pub(crate) fn start(disposer: Disposer<T>) -> io::Result<Self> {
        let (jobs, queue) = channel::unbounded::<(ObjectId, T)>();

        thread::Builder::new()
            .name("litepool-disposer".to_string())
            .spawn(move || {
                tracing::trace!("disposer thread started");
                for (id, value) in queue.iter() {
                    dispose(&disposer, id, value);
                }
                tracing::trace!("disposer channel closed, exiting");
            })?;

        Ok(Self { jobs })
    }

    /// Queue an object for disposal. Never blocks.
    pub(crate) fn submit(&self, id: ObjectId, value: T) {
        if self.jobs.send((id, value)).is_err() {
            tracing::warn!(object = %id, "disposer thread is gone, object dropped without disposal");
        }
    }
}

fn dispose<T>(disposer: &Disposer<T>, id: ObjectId, value: T) {
    match panic::catch_unwind(AssertUnwindSafe(|| disposer(value))) {
        Ok(Ok(())) => tracing::trace!(object = %id, "object disposed"),
        Ok(Err(err)) => tracing::warn!(object = %id, error = %err, "disposer failed"),
        Err(_) => tracing::warn!(object = %id, "disposer panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn wait_until(done: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_disposes_in_submission_order_on_own_thread() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = DisposalWorker::start(Arc::new({
            let seen = Arc::clone(&seen);
            move |n: u32| -> anyhow::Result<()> {
                seen.lock().push((n, thread::current().name().map(str::to_owned)));
                Ok(())
            }
        }) as Disposer<u32>)
        .unwrap();

        for n in 0..3 {
            worker.submit(ObjectId::next(), n);
        }
        wait_until(|| seen.lock().len() == 3);

        let seen = seen.lock();
        let order: Vec<_> = seen.iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(seen.iter().all(|(_, name)| name.as_deref() == Some("litepool-disposer")));
    }

    #[test]
    fn test_keeps_going_after_failing_disposer() {
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let worker = DisposalWorker::start(Arc::new({
            let disposed = Arc::clone(&disposed);
            move |n: u32| -> anyhow::Result<()> {
                match n {
                    0 => anyhow::bail!("close failed"),
                    1 => panic!("disposer bug"),
                    _ => {}
                }
                disposed.lock().push(n);
                Ok(())
            }
        }) as Disposer<u32>)
        .unwrap();

        for n in 0..3 {
            worker.submit(ObjectId::next(), n);
        }
        wait_until(|| !disposed.lock().is_empty());

        assert_eq!(*disposed.lock(), vec![2]);
    }

    #[test]
    fn test_queued_objects_are_disposed_after_drop() {
        let disposed = Arc::new(Mutex::new(0));
        let worker = DisposalWorker::start(Arc::new({
            let disposed = Arc::clone(&disposed);
            move |_: u32| -> anyhow::Result<()> {
                thread::sleep(Duration::from_millis(10));
                *disposed.lock() += 1;
                Ok(())
            }
        }) as Disposer<u32>)
        .unwrap();

        for n in 0..5 {
            worker.submit(ObjectId::next(), n);
        }
        drop(worker);
        wait_until(|| *disposed.lock() == 5);

        assert_eq!(*disposed.lock(), 5);
    }
}
