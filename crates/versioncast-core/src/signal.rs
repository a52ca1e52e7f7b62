//! Cooperative cancellation.
//!
//! [`CancelSignal`] stops the broadcast loop, detaches an observer whose
//! peer went away, and drives graceful server shutdown. The signal is
//! kept outside the [`VersionedCell`]: callers race their wait against
//! [`CancelSignal::cancelled`] instead of the cell growing a timeout.
//!
//! [`VersionedCell`]: crate::cell::VersionedCell

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A clonable, one-shot cancellation flag.
///
/// All clones share the same state. Once cancelled, a signal stays
/// cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal and wake every task waiting in
    /// [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until the signal fires. Returns immediately if it already has.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_signal_is_not_cancelled() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_after_cancel() {
        let signal = CancelSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(50), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_wakes_waiting_task() {
        let signal = CancelSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        tokio::task::yield_now().await;
        signal.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
