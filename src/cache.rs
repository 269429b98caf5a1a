//! Suspendable async memo cell.
//!
//! [`SuspendCell`] wraps a single async producer and memoizes its
//! outcome: concurrent `get` calls share one in-flight producer run,
//! later calls hit the cached value (or the cached failure), and
//! `invalidate` starts a fresh generation. Completions belonging to a
//! superseded generation are discarded under the state lock, so a slow
//! old producer can never clobber a newer generation's state.
//!
//! Render functions use this to depend on slow-to-compute data without
//! recomputing it on every page render or blocking pipeline startup.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

/// Shared producer failure, observed identically by every waiter of a
/// generation until the next `invalidate`.
#[derive(Debug, Clone, Error)]
#[error("cached producer failed: {0}")]
pub struct CacheFailure(Arc<anyhow::Error>);

impl CacheFailure {
    fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    /// The underlying producer error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

type Producer<T> =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>> + Send + Sync>;

type Outcome<T> = Result<Arc<T>, CacheFailure>;

enum State<T> {
    /// No producer running: a lazy cell before its first `get`, or an
    /// invalidated lazy cell awaiting the next one.
    Idle,
    /// Producer in flight; waiters subscribe to the channel.
    Pending {
        tx: watch::Sender<Option<Outcome<T>>>,
        rx: watch::Receiver<Option<Outcome<T>>>,
    },
    /// Producer finished this generation, successfully or not.
    Settled(Outcome<T>),
}

struct Slot<T> {
    /// Bumped on every producer start and every invalidation. A
    /// finishing producer writes back only if its generation is still
    /// current.
    generation: u64,
    state: State<T>,
}

struct Inner<T> {
    producer: Producer<T>,
    eager: bool,
    slot: Mutex<Slot<T>>,
}

/// Memoizing cell over one async producer.
///
/// Clones share state: all handles observe the same generation.
pub struct SuspendCell<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SuspendCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> SuspendCell<T> {
    /// Create a cell and start the producer immediately.
    ///
    /// Must be called within a tokio runtime; the producer runs on a
    /// spawned task.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let cell = Self::build(producer, true);
        {
            let mut slot = cell.inner.slot.lock();
            cell.start_locked(&mut slot);
        }
        cell
    }

    /// Create a cell that defers the first producer call to the first
    /// `get`.
    pub fn lazy<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::build(producer, false)
    }

    fn build<F, Fut>(producer: F, eager: bool) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                producer: Box::new(move || Box::pin(producer())),
                eager,
                slot: Mutex::new(Slot {
                    generation: 0,
                    state: State::Idle,
                }),
            }),
        }
    }

    /// Resolve the cached value, starting or joining the producer as
    /// needed.
    ///
    /// The producer runs at most once per generation; every concurrent
    /// caller observes that generation's single outcome.
    pub async fn get(&self) -> Result<Arc<T>, CacheFailure> {
        loop {
            let mut rx = {
                let mut slot = self.inner.slot.lock();
                match &slot.state {
                    State::Settled(outcome) => return outcome.clone(),
                    State::Pending { rx, .. } => rx.clone(),
                    State::Idle => self.start_locked(&mut slot),
                }
            };

            // Wait outside the lock. A closed channel means this
            // generation was superseded; re-read the current state.
            loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return outcome;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Discard the current generation.
    ///
    /// Eager cells start the replacement producer immediately; lazy
    /// cells re-arm and wait for the next `get`. Either way, an old
    /// in-flight producer's completion becomes a no-op.
    pub fn invalidate(&self) {
        let mut slot = self.inner.slot.lock();
        if self.inner.eager {
            self.start_locked(&mut slot);
        } else {
            slot.generation += 1;
            slot.state = State::Idle;
        }
    }

    /// Start a producer run for a fresh generation and return the
    /// receiver waiters subscribe to. Caller holds the slot lock.
    fn start_locked(&self, slot: &mut Slot<T>) -> watch::Receiver<Option<Outcome<T>>> {
        slot.generation += 1;
        let generation = slot.generation;

        let (tx, rx) = watch::channel(None);
        slot.state = State::Pending { tx, rx: rx.clone() };

        let fut = (self.inner.producer)();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = match fut.await {
                Ok(value) => Ok(Arc::new(value)),
                Err(error) => Err(CacheFailure::new(error)),
            };

            let mut slot = inner.slot.lock();
            if slot.generation != generation {
                // Superseded by `invalidate` while in flight.
                return;
            }

            let previous = std::mem::replace(&mut slot.state, State::Settled(outcome.clone()));
            drop(slot);

            if let State::Pending { tx, .. } = previous {
                tx.send(Some(outcome)).ok();
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_resolves_once_for_concurrent_getters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let cell = SuspendCell::lazy(move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                Ok(7u32)
            }
        });

        let (a, b, c) = tokio::join!(cell.get(), cell.get(), cell.get());
        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(*c.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_value_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let cell = SuspendCell::lazy(move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok("value".to_string())
            }
        });

        assert_eq!(*cell.get().await.unwrap(), "value");
        assert_eq!(*cell.get().await.unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_cached_until_invalidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let cell: SuspendCell<u32> = SuspendCell::lazy(move || {
            let n = counted.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    anyhow::bail!("boom")
                } else {
                    Ok(5)
                }
            }
        });

        assert!(cell.get().await.is_err());
        // Still rejected, no second producer call.
        assert!(cell.get().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cell.invalidate();
        assert_eq!(*cell.get().await.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_eager_starts_without_get() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let _cell = SuspendCell::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_resolution_does_not_clobber_new_generation() {
        let gate = Arc::new(Semaphore::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let cell = {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            SuspendCell::lazy(move || {
                let gate = Arc::clone(&gate);
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        // First generation stalls until the test
                        // releases it, after invalidation.
                        let permit = gate.acquire().await?;
                        permit.forget();
                    }
                    Ok(n)
                }
            })
        };

        // Start generation 1, then supersede it while it is stalled.
        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.get().await })
        };
        tokio::task::yield_now().await;
        cell.invalidate();

        // Generation 2 resolves normally.
        assert_eq!(*cell.get().await.unwrap(), 2);

        // Release the stale producer; its late result must be dropped.
        gate.add_permits(1);
        let joined = waiter.await.unwrap();
        assert_eq!(*joined.unwrap(), 2, "waiter must join the new generation");
        assert_eq!(*cell.get().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_lazy_defers_restart() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let cell = SuspendCell::lazy(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        cell.get().await.unwrap();
        cell.invalidate();
        tokio::task::yield_now().await;
        // No restart until the next get.
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cell.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
