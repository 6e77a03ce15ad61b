//! Configuration error type.

use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal: the server is never started with a
/// configuration that produced one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The forwarding host was empty or had neither hostname nor port.
    #[error("host undefined")]
    HostUndefined,

    /// The forwarding URL used a scheme other than `http` or `https`.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The host/port part of the forwarding host could not be split.
    #[error("invalid host: {0:?}")]
    InvalidHost(String),

    /// The normalised forwarding URL was rejected by the URL parser.
    #[error("invalid forwarding url: {0}")]
    Url(#[from] url::ParseError),

    /// Listening port outside `0..=65535`.
    #[error("port out of range: {0}")]
    PortOutOfRange(i64),

    /// Bind address is not an IP address.
    #[error("invalid bind address: {0:?}")]
    BindAddress(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
