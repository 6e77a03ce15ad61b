//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on Unix, SIGTERM begin graceful shutdown. A second
//! signal is not special-cased; the grace period bounds the wait.

use tokio::task::JoinHandle;

use super::Shutdown;

/// Resolve when the process is asked to stop.
pub async fn interrupted() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Interrupt received"),
        () = terminate => tracing::info!("Terminate received"),
    }
}

/// Trigger `shutdown` on the first interrupt.
pub fn spawn_interrupt_watcher(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        interrupted().await;
        shutdown.trigger();
    })
}
