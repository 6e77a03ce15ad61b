//! reload-proxy: live-reload development proxy.
//!
//! ```text
//! Browser ──▶ :9999 ──▶ dispatch ──▶ reverse proxy ──▶ upstream
//!                          │                              │
//!                          │          HTML injector ◀─────┘
//!                          ▼
//!                    push channel ◀── registry ◀── debouncer ◀── notifier ◀── file watcher
//! ```

use std::path::PathBuf;

use clap::Parser;

use reload_proxy::config::loader::load_config;
use reload_proxy::config::ReloadConfig;
use reload_proxy::lifecycle;
use reload_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "reload-proxy", version)]
#[command(about = "Proxy a development server and reload the browser when files change")]
struct Cli {
    /// Upstream to forward to, e.g. `localhost:3000`, `:3000` or `https://host`
    host: Option<String>,

    /// Listening port
    #[arg(short, long, allow_negative_numbers = true)]
    port: Option<i64>,

    /// Directory to watch, recursively (repeatable; default `.`)
    #[arg(short, long = "watch", value_name = "DIR")]
    watch: Vec<PathBuf>,

    /// Directory to exclude, recursively (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "DIR")]
    exclude: Vec<PathBuf>,

    /// Extra delay before reloading, in milliseconds
    #[arg(short, long, value_name = "MS", allow_negative_numbers = true)]
    delay: Option<i64>,

    /// Shell command to run on every reload
    #[arg(short, long = "cmd", value_name = "COMMAND")]
    cmd: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// TOML config file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ignore HTTP_PROXY / HTTPS_PROXY for upstream requests
    #[arg(long)]
    no_proxy: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    fn merge_into(self, mut config: ReloadConfig) -> ReloadConfig {
        if let Some(host) = self.host {
            config.forward_host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(delay) = self.delay {
            config.delay_ms = delay;
        }
        if self.cmd.is_some() {
            config.command = self.cmd;
        }
        if !self.watch.is_empty() {
            config.watch = self.watch;
        }
        config.exclude.extend(self.exclude);
        config.verbose |= self.verbose;
        if self.no_proxy {
            config.use_system_proxy = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ReloadConfig::default(),
    };
    let config = cli.merge_into(config);

    logging::init(config.verbose);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reload-proxy starting");

    if let Err(e) = lifecycle::start(config).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
