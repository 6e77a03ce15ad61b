//! Trailing-edge debouncer.
//!
//! Each `schedule` cancels the previously scheduled callback and arms a new
//! timer, so only the last call in a burst fires, one interval after the
//! burst went quiet.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one pending timer task.
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm (or re-arm) the timer with `callback`.
    ///
    /// Must be called from within a Tokio runtime. The callback runs on its
    /// own task once the interval elapses; once started it is never aborted
    /// by a later `schedule` or `cancel`.
    pub fn schedule<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let interval = self.interval;
        let mut pending = self.lock();
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            // No await between here and the spawn, so an abort can no longer
            // land once the sleep has completed.
            tokio::spawn(callback());
        }));
    }

    /// Disarm the timer without firing. Returns true if a callback was
    /// still waiting.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|timer| !timer.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counting(&fired));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separately() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&fired));
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(counting(&fired));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&fired));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_runs_inline() {
        let debouncer = Debouncer::new(Duration::ZERO);
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&fired));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_callback_survives_reschedule() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let finished = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        debouncer.schedule(move || async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            done.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The first callback is mid-flight; cancelling must not abort it.
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
