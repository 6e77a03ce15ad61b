//! Change-to-reload pipeline.
//!
//! # Data Flow
//! ```text
//! ReloadHandle::trigger_reload()      (any thread, never blocks)
//!     → Notifier (single pending slot)
//!     → drain loop: one Debouncer::schedule per drained signal
//!     → after the quiet period: reload command (fire-and-forget)
//!     → ConnectionRegistry::broadcast("reload")
//!     → each push channel task writes the frame
//! ```
//!
//! # Design Decisions
//! - Bursts of file events become one broadcast per debounce interval
//! - The command never delays or cancels the broadcast
//! - Nothing here fails outward: per-connection errors stay per-connection

pub mod command;
pub mod debouncer;
pub mod notifier;
pub mod registry;

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;

pub use debouncer::Debouncer;
pub use notifier::Notifier;
pub use registry::{ConnectionId, ConnectionRegistry, PushChannel};

/// The only payload ever sent over a push channel.
pub const RELOAD_MESSAGE: &str = "reload";

/// Cloneable entry point for requesting a browser reload.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    notifier: Arc<Notifier>,
}

impl ReloadHandle {
    pub(crate) fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }

    /// Request a reload of every connected browser.
    ///
    /// Never blocks; calls made within one debounce interval coalesce.
    pub fn trigger_reload(&self) {
        tracing::trace!("Reload requested");
        self.notifier.notify();
    }
}

/// Spawn the loop that turns notifier signals into debounced broadcasts.
pub(crate) fn spawn_drain_loop(
    notifier: Arc<Notifier>,
    debouncer: Arc<Debouncer>,
    registry: Arc<ConnectionRegistry>,
    command: Option<Arc<str>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut signals = Box::pin(notifier.drain());
        while signals.next().await.is_some() {
            let registry = Arc::clone(&registry);
            let command = command.clone();
            debouncer.schedule(move || async move {
                handle_reload(&registry, command.as_deref());
            });
        }
    })
}

/// Run the reload command, if any, then broadcast unconditionally.
pub(crate) fn handle_reload(registry: &ConnectionRegistry, command: Option<&str>) {
    if let Some(line) = command {
        command::spawn_command(line);
    }
    let delivered = registry.broadcast(RELOAD_MESSAGE);
    tracing::info!(clients = delivered, "Reload broadcast");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_triggers_within_window_broadcast_once() {
        let notifier = Arc::new(Notifier::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let (channel, mut rx) = PushChannel::new();
        registry.register(channel);

        let drain = spawn_drain_loop(
            Arc::clone(&notifier),
            Arc::clone(&debouncer),
            Arc::clone(&registry),
            None,
        );
        let handle = ReloadHandle::new(Arc::clone(&notifier));

        for _ in 0..10 {
            handle.trigger_reload();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(rx.try_recv().unwrap(), RELOAD_MESSAGE);
        assert!(rx.try_recv().is_err());
        drain.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_window_broadcasts_again() {
        let notifier = Arc::new(Notifier::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let (channel, mut rx) = PushChannel::new();
        registry.register(channel);

        let drain = spawn_drain_loop(notifier.clone(), debouncer, registry, None);
        let handle = ReloadHandle::new(notifier);

        handle.trigger_reload();
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.trigger_reload();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(rx.try_recv().unwrap(), RELOAD_MESSAGE);
        assert_eq!(rx.try_recv().unwrap(), RELOAD_MESSAGE);
        assert!(rx.try_recv().is_err());
        drain.abort();
    }

    #[test]
    fn test_handle_reload_without_clients() {
        let registry = ConnectionRegistry::new();
        handle_reload(&registry, None);
        assert!(registry.is_empty());
    }
}
