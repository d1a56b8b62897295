//! One-shot, multi-consumer result cell.
//!
//! A [`BroadcastFuture`] starts pending and is settled exactly once. Any
//! number of [`Subscription`]s can wait on it, including ones created after
//! it was settled; all of them receive a clone of the same value.
//!
//! Built on `tokio::sync::watch`: the channel always retains the latest value,
//! which is what gives late subscribers the terminal result without re-running
//! the producer.
//!
//! ```text
//! producer ── settle(v) ──► watch::Sender<Option<T>>
//!                                 │
//!               ┌─────────────────┼─────────────────┐
//!               ▼                 ▼                 ▼
//!         Subscription      Subscription      Subscription
//!         (before settle)   (during)          (after settle)
//!               │                 │                 │
//!               └───────── all receive v ───────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

/// Rejected attempt to settle a future twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettleError {
    /// The future already holds a terminal value; the new one was discarded.
    #[error("Broadcast future already settled")]
    AlreadySettled,
}

/// A subscription ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// Every producer handle was dropped while the future was still pending.
    #[error("Broadcast future dropped before it was settled")]
    Abandoned,
}

/// Producer handle of a one-shot broadcast result.
///
/// Cloning is cheap; all clones refer to the same cell. Holding a clone keeps
/// the future alive. Once every clone is dropped without settling, pending
/// subscriptions fail with [`WaitError::Abandoned`].
pub struct BroadcastFuture<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for BroadcastFuture<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> fmt::Debug for BroadcastFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastFuture")
            .field("settled", &self.tx.borrow().is_some())
            .field("waiters", &self.tx.receiver_count())
            .finish()
    }
}

impl<T: Clone> BroadcastFuture<T> {
    /// Creates a pending future.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Transitions the future to its terminal value and wakes all waiters.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::AlreadySettled`] if a value was already set.
    /// The existing value is kept and `value` is dropped.
    pub fn settle(&self, value: T) -> Result<(), SettleError> {
        let modified = self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(value);
                true
            } else {
                false
            }
        });

        if modified {
            Ok(())
        } else {
            Err(SettleError::AlreadySettled)
        }
    }

    /// Returns true once a terminal value has been set.
    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Returns the terminal value without waiting, if there is one.
    pub fn peek(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Registers a new waiter.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn waiter_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns true if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }

    /// Waits for the terminal value through a fresh subscription.
    ///
    /// The caller's handle keeps the future alive, so this never reports
    /// [`WaitError::Abandoned`] on its own; use [`subscribe`](Self::subscribe)
    /// and drop the handle to observe abandonment.
    pub async fn wait(&self) -> Result<T, WaitError> {
        self.subscribe().wait().await
    }
}

impl<V: Clone, E: Clone> BroadcastFuture<Result<V, E>> {
    /// Settles the future with a success value.
    pub fn resolve(&self, value: V) -> Result<(), SettleError> {
        self.settle(Ok(value))
    }

    /// Settles the future with a failure.
    pub fn fail(&self, error: E) -> Result<(), SettleError> {
        self.settle(Err(error))
    }
}

impl<T: Clone> Default for BroadcastFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of a [`BroadcastFuture`].
pub struct Subscription<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Waits until the future is settled and returns its value.
    ///
    /// Returns immediately if the value is already present.
    pub async fn wait(mut self) -> Result<T, WaitError> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.as_ref().cloned().ok_or(WaitError::Abandoned),
            Err(_) => Err(WaitError::Abandoned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_waiter_registered_before_settle_receives_value() {
        let future = BroadcastFuture::<u32>::new();
        let sub = future.subscribe();

        let producer = future.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            producer.settle(42).unwrap();
        });

        assert_eq!(sub.wait().await, Ok(42));
    }

    #[tokio::test]
    async fn test_waiter_registered_after_settle_receives_value() {
        let future = BroadcastFuture::<&'static str>::new();
        future.settle("done").unwrap();

        let late = future.subscribe();
        assert_eq!(late.wait().await, Ok("done"));
        assert_eq!(future.wait().await, Ok("done"));
    }

    #[tokio::test]
    async fn test_many_waiters_all_receive_same_value() {
        let future = BroadcastFuture::<Vec<u8>>::new();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let sub = future.subscribe();
                tokio::spawn(async move { sub.wait().await })
            })
            .collect();

        future.settle(vec![0xDE, 0xAD]).unwrap();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(vec![0xDE, 0xAD]));
        }
    }

    #[test]
    fn test_double_settle_is_rejected_and_keeps_first_value() {
        let future = BroadcastFuture::<u8>::new();

        assert_eq!(future.settle(1), Ok(()));
        assert_eq!(future.settle(2), Err(SettleError::AlreadySettled));
        assert_eq!(future.peek(), Some(1));
    }

    #[test]
    fn test_resolve_then_fail_is_rejected() {
        let future = BroadcastFuture::<Result<u8, String>>::new();

        future.resolve(7).unwrap();
        assert_eq!(
            future.fail("late".to_string()),
            Err(SettleError::AlreadySettled)
        );
        assert_eq!(future.peek(), Some(Ok(7)));
    }

    #[tokio::test]
    async fn test_failure_is_broadcast() {
        let future = BroadcastFuture::<Result<u8, String>>::new();
        let a = future.subscribe();
        let b = future.subscribe();

        future.fail("no tile".to_string()).unwrap();

        assert_eq!(a.wait().await, Ok(Err("no tile".to_string())));
        assert_eq!(b.wait().await, Ok(Err("no tile".to_string())));
    }

    #[tokio::test]
    async fn test_dropping_all_producers_abandons_waiters() {
        let future = BroadcastFuture::<u8>::new();
        let sub = future.subscribe();
        drop(future);

        let result = timeout(Duration::from_secs(1), sub.wait())
            .await
            .expect("waiter should not hang");
        assert_eq!(result, Err(WaitError::Abandoned));
    }

    #[tokio::test]
    async fn test_settled_value_survives_producer_drop() {
        let future = BroadcastFuture::<u8>::new();
        let sub = future.subscribe();
        future.settle(9).unwrap();
        drop(future);

        assert_eq!(sub.wait().await, Ok(9));
    }

    #[test]
    fn test_state_accessors() {
        let future = BroadcastFuture::<u8>::new();
        assert!(!future.is_settled());
        assert_eq!(future.peek(), None);
        assert_eq!(future.waiter_count(), 0);

        let _sub = future.subscribe();
        assert_eq!(future.waiter_count(), 1);

        let other = future.clone();
        assert!(future.ptr_eq(&other));
        assert!(!future.ptr_eq(&BroadcastFuture::new()));

        future.settle(3).unwrap();
        assert!(other.is_settled());
    }
}
