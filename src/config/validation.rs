//! Configuration validation.
//!
//! # Responsibilities
//! - Normalise the forwarding host into an absolute `http`/`https` URL
//! - Fill in a missing hostname (`localhost`) or port (scheme default)
//! - Validate the listening port range
//! - Clamp the reload delay to a non-negative duration
//!
//! # Design Decisions
//! - Pure functions: raw value in, validated value or `ConfigError` out
//! - Accepts the short forms developers type: `localhost`, `:4000`, `host:port`

use std::time::Duration;

use url::Url;

use crate::config::error::ConfigError;

/// Returns true if the input already starts with `scheme://`.
fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) if idx > 0 => input[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+')),
        _ => false,
    }
}

/// Well-known port for a supported scheme.
pub fn known_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Split `host[:port]` (or `[v6][:port]`) into its two halves.
fn split_host_port(authority: &str) -> Result<(&str, &str), ConfigError> {
    if let Some(bracketed) = authority.strip_prefix('[') {
        let Some(end) = bracketed.find(']') else {
            return Err(ConfigError::InvalidHost(authority.to_string()));
        };
        let host = &authority[..end + 2];
        return match &bracketed[end + 1..] {
            "" => Ok((host, "")),
            rest => rest
                .strip_prefix(':')
                .map(|port| (host, port))
                .ok_or_else(|| ConfigError::InvalidHost(authority.to_string())),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => {
            Err(ConfigError::InvalidHost(authority.to_string()))
        }
        Some((host, port)) => Ok((host, port)),
        None => Ok((authority, "")),
    }
}

/// Parse a forwarding host string into a URL and its effective port.
///
/// The returned URL always carries a hostname; the port is returned
/// separately because `Url` elides a port equal to the scheme default.
pub fn parse_forward_host(input: &str) -> Result<(Url, u16), ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::HostUndefined);
    }

    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) if has_scheme(trimmed) => (scheme.to_ascii_lowercase(), rest),
        _ => ("http".to_string(), trimmed),
    };
    let Some(default_port) = known_port(&scheme) else {
        return Err(ConfigError::UnsupportedScheme(scheme));
    };

    let split_at = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(split_at);
    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => (Some(userinfo), host_port),
        None => (None, authority),
    };

    let (hostname, port) = split_host_port(host_port)?;
    if hostname.is_empty() && port.is_empty() {
        return Err(ConfigError::HostUndefined);
    }
    let hostname = if hostname.is_empty() { "localhost" } else { hostname };
    let port = if port.is_empty() {
        default_port
    } else {
        port.parse::<u16>()
            .map_err(|_| ConfigError::InvalidHost(input.trim().to_string()))?
    };

    let userinfo = userinfo.map(|u| format!("{u}@")).unwrap_or_default();
    let url = Url::parse(&format!("{scheme}://{userinfo}{hostname}:{port}{tail}"))?;
    Ok((url, port))
}

/// Validate a listening port given as a signed integer.
pub fn validate_port(port: i64) -> Result<u16, ConfigError> {
    u16::try_from(port).map_err(|_| ConfigError::PortOutOfRange(port))
}

/// Convert a delay in milliseconds to a duration, clamping negatives to zero.
pub fn delay_from_millis(delay_ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0))
}
