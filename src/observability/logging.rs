//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the filter follows the verbose flag.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "reload_proxy=info,tower_http=warn";
const VERBOSE_FILTER: &str = "reload_proxy=debug,tower_http=debug";

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
