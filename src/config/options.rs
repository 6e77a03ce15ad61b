//! Validated, immutable server options.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::config::error::ConfigError;
use crate::config::schema::ReloadConfig;
use crate::config::validation::{delay_from_millis, parse_forward_host, validate_port};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 9999;

/// Minimum debounce interval between a change and the reload broadcast.
pub const MIN_DEBOUNCE: Duration = Duration::from_millis(100);

/// Default time allowed for in-flight requests to finish on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// The upstream server every non-upgrade request is forwarded to.
///
/// Always has a hostname and an explicit port, even when the port is the
/// scheme default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    url: Url,
    port: u16,
}

impl ForwardTarget {
    /// Parse and normalise a forwarding host (`localhost`, `:4000`,
    /// `https://example.com:8443/app`, ...).
    pub fn parse(host: &str) -> Result<Self, ConfigError> {
        let (url, port) = parse_forward_host(host)?;
        Ok(Self { url, port })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or("localhost")
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `hostname:port`, with the port always present.
    pub fn host(&self) -> String {
        format!("{}:{}", self.hostname(), self.port)
    }
}

impl fmt::Display for ForwardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme(), self.host(), self.url.path())
    }
}

/// Options consumed by [`ReloadServer`](crate::http::ReloadServer).
///
/// Built once, then only read. The `with_*` methods consume and return the
/// options so nothing can change them after they are handed to the server.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    target: ForwardTarget,
    bind_address: IpAddr,
    port: u16,
    command: Option<String>,
    delay: Duration,
    use_system_proxy: bool,
    shutdown_grace: Duration,
}

impl ServerOptions {
    /// Options with defaults for everything but the forwarding target.
    pub fn new(target: ForwardTarget) -> Self {
        Self {
            target,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            command: None,
            delay: Duration::ZERO,
            use_system_proxy: true,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Shorthand for `ServerOptions::new(ForwardTarget::parse(host)?)`.
    pub fn from_host(host: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(ForwardTarget::parse(host)?))
    }

    /// Build options from raw configuration values.
    pub fn from_config(config: &ReloadConfig) -> Result<Self, ConfigError> {
        let bind_address = config
            .bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BindAddress(config.bind_address.clone()))?;

        let mut options = Self::from_host(&config.forward_host)?
            .with_port(config.port)?
            .with_delay_ms(config.delay_ms)
            .with_bind_address(bind_address)
            .with_system_proxy(config.use_system_proxy)
            .with_shutdown_grace(Duration::from_secs(config.shutdown_grace_secs));
        if let Some(command) = &config.command {
            options = options.with_command(command.clone());
        }
        Ok(options)
    }

    pub fn with_port(mut self, port: i64) -> Result<Self, ConfigError> {
        self.port = validate_port(port)?;
        Ok(self)
    }

    /// Reload delay in milliseconds; negative values clamp to zero.
    pub fn with_delay_ms(mut self, delay_ms: i64) -> Self {
        self.delay = delay_from_millis(delay_ms);
        self
    }

    /// Shell command run on every reload. A blank command is ignored.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        self.command = (!command.trim().is_empty()).then_some(command);
        self
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Whether the outbound leg honours `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY`.
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn target(&self) -> &ForwardTarget {
        &self.target
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Configured reload delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Debounce interval actually used by the reload pipeline.
    ///
    /// Never below [`MIN_DEBOUNCE`].
    pub fn effective_delay(&self) -> Duration {
        self.delay.max(MIN_DEBOUNCE)
    }

    pub fn use_system_proxy(&self) -> bool {
        self.use_system_proxy
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}
