//! Coalescing single-slot signal.
//!
//! Any number of `notify()` calls between two deliveries collapse into one
//! pending signal. `notify()` never blocks and never allocates, so it is safe
//! to call from a filesystem watcher callback thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tokio::sync::Notify;

/// Single-slot "reload pending" mailbox.
#[derive(Debug, Default)]
pub struct Notifier {
    pending: AtomicBool,
    wakeup: Notify,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a signal as pending. A no-op if one already is.
    pub fn notify(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.wakeup.notify_one();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait for the pending signal and consume it.
    ///
    /// Returns immediately if a signal is already pending.
    pub async fn notified(&self) {
        loop {
            if self.pending.swap(false, Ordering::AcqRel) {
                return;
            }
            // A permit left over from an already-consumed signal only
            // costs one extra pass through the loop.
            self.wakeup.notified().await;
        }
    }

    /// Infinite stream yielding once per delivered signal.
    pub fn drain(self: Arc<Self>) -> impl Stream<Item = ()> + Send {
        stream::unfold(self, |notifier| async move {
            notifier.notified().await;
            Some(((), notifier))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_burst_collapses_to_one_signal() {
        let notifier = Notifier::new();
        for _ in 0..100 {
            notifier.notify();
        }
        assert!(notifier.is_pending());

        timeout(Duration::from_millis(50), notifier.notified())
            .await
            .expect("first signal delivered");
        assert!(!notifier.is_pending());

        assert!(
            timeout(Duration::from_millis(50), notifier.notified())
                .await
                .is_err(),
            "burst must not leave a second signal behind"
        );
    }

    #[tokio::test]
    async fn test_waiter_woken_by_later_notify() {
        let notifier = Arc::new(Notifier::new());
        let waiter = {
            let notifier = Arc::clone(&notifier);
            tokio::spawn(async move { notifier.notified().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        notifier.notify();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_yields_once_per_delivery() {
        let notifier = Arc::new(Notifier::new());
        let mut drain = Box::pin(Arc::clone(&notifier).drain());

        notifier.notify();
        notifier.notify();
        timeout(Duration::from_millis(50), drain.next())
            .await
            .expect("first delivery");

        assert!(timeout(Duration::from_millis(50), drain.next()).await.is_err());

        notifier.notify();
        timeout(Duration::from_millis(50), drain.next())
            .await
            .expect("second delivery");
    }
}
