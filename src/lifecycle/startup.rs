//! Startup orchestration.
//!
//! Order: options → listener → server → change bridge → signal watcher → serve.

use tokio::net::TcpListener;

use crate::config::{ConfigError, ReloadConfig, ServerOptions};
use crate::http::{ReloadServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::watch::{ChangeBridge, WatchError, WatchOptions};

/// Anything that stops the proxy from coming up or running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Run the proxy described by `config` until interrupted.
pub async fn start(config: ReloadConfig) -> Result<(), StartupError> {
    let options = ServerOptions::from_config(&config)?;
    tracing::info!(
        target_host = %options.target(),
        port = options.port(),
        delay_ms = options.delay().as_millis() as u64,
        command = options.command().unwrap_or(""),
        "Configuration loaded"
    );

    let address = options.socket_addr();
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let server = ReloadServer::new(options)?;

    let watch = WatchOptions::new(config.watch_dirs(), config.exclude.clone());
    let bridge = ChangeBridge::start(&watch, server.handle())?;

    let shutdown = Shutdown::new();
    let signals = signals::spawn_interrupt_watcher(shutdown.clone());

    let result = server.run(listener, shutdown.signal()).await;

    signals.abort();
    drop(bridge);
    result.map_err(StartupError::from)
}
