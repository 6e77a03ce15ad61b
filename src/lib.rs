//! Live-reload development proxy.
//!
//! Forwards browser traffic to an upstream development server, appends a
//! small reload client to every HTML page, and pushes `reload` over a
//! WebSocket on the same port whenever watched files change.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reload;
pub mod watch;

pub use config::{ReloadConfig, ServerOptions};
pub use http::{ReloadServer, ServerState};
pub use lifecycle::Shutdown;
pub use reload::ReloadHandle;
pub use watch::{ChangeBridge, WatchOptions};
