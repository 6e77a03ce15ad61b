//! Shutdown request latch.
//!
//! A request is remembered, so a server that starts listening after the
//! interrupt arrived still stops.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Latch shared by the signal watcher and the reload server.
///
/// Clones share one latch. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct Shutdown {
    requested: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        Self {
            requested: Arc::new(requested),
        }
    }

    /// Request shutdown. Repeated calls are no-ops.
    pub fn trigger(&self) {
        self.requested.send_if_modified(|requested| !std::mem::replace(requested, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.requested.borrow()
    }

    /// Future that completes once shutdown is requested, including a request
    /// made before this call. Suitable for [`ReloadServer::run`].
    ///
    /// [`ReloadServer::run`]: crate::http::ReloadServer::run
    pub fn signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut requested = self.requested.subscribe();
        async move {
            // Every latch dropped without a trigger also ends the wait.
            let _ = requested.wait_for(|requested| *requested).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
