//! Outbound request preparation.
//!
//! # Responsibilities
//! - Rewrite the request URL onto the forwarding target
//! - Set `X-Forwarded-For`, `X-Forwarded-Host` and `X-Forwarded-Proto`
//! - Strip hop-by-hop headers and `Host` (the client sets it from the URL)
//! - Drop `Accept-Encoding` so HTML comes back uncompressed for injection
//! - Ask for `Connection: close`; upstream connections are never reused

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};
use url::Url;

use crate::http::response::strip_hop_by_hop;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Join two URL paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Map an inbound request URI onto the forwarding target.
///
/// The target's path acts as a prefix; target and request queries are both
/// kept, target first.
pub fn rewrite_url(target: &Url, uri: &Uri) -> Url {
    let mut url = target.clone();
    url.set_path(&join_paths(target.path(), uri.path()));

    let query = [target.query(), uri.query()]
        .into_iter()
        .flatten()
        .filter(|q| !q.is_empty())
        .collect::<Vec<_>>()
        .join("&");
    url.set_query((!query.is_empty()).then_some(query.as_str()));
    url
}

/// Headers for the upstream request, derived from the inbound ones.
pub fn outbound_headers(inbound: &HeaderMap, client: Option<SocketAddr>) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::ACCEPT_ENCODING);

    if let Some(client) = client {
        let ip = client.ip().to_string();
        let forwarded_for = match inbound
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(prior) if !prior.trim().is_empty() => format!("{prior}, {ip}"),
            _ => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    match inbound.get(header::HOST) {
        Some(host) => {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
        None => {
            headers.remove(X_FORWARDED_HOST);
        }
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    headers
}
