//! Raw configuration schema.
//!
//! Mirrors the command-line surface so the same values can come from a TOML
//! file, the CLI, or both (CLI wins). Nothing here is validated yet; see
//! [`ServerOptions::from_config`](crate::config::ServerOptions::from_config).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::options::{DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE};

/// Root configuration for the reload proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Upstream to forward to (`localhost:3000`, `:3000`, `https://host`).
    pub forward_host: String,

    /// Address the listener binds to.
    pub bind_address: String,

    /// Listening port for both HTTP and the push channel.
    pub port: i64,

    /// Extra quiet time before reloading, in milliseconds.
    pub delay_ms: i64,

    /// Shell command run on every reload.
    pub command: Option<String>,

    /// Directories to watch (recursively). Empty means the current directory.
    pub watch: Vec<PathBuf>,

    /// Directories excluded from watching (recursively).
    pub exclude: Vec<PathBuf>,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for upstream requests.
    pub use_system_proxy: bool,

    /// Seconds allowed for in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,

    /// Debug-level logging.
    pub verbose: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            forward_host: String::new(),
            bind_address: "127.0.0.1".to_string(),
            port: i64::from(DEFAULT_PORT),
            delay_ms: 0,
            command: None,
            watch: Vec::new(),
            exclude: Vec::new(),
            use_system_proxy: true,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE.as_secs(),
            verbose: false,
        }
    }
}

impl ReloadConfig {
    /// Directories to watch, falling back to the current directory.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        if self.watch.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.watch.clone()
        }
    }
}
