//! Reload-script injection into HTML responses.
//!
//! # Responsibilities
//! - Recognise HTML responses by `Content-Type`
//! - Buffer the body, append the client script, fix up `Content-Length`
//! - Leave every other response untouched (and unbuffered)
//!
//! # Design Decisions
//! - The script is appended after the document, not spliced before
//!   `</body>`; browsers run trailing scripts all the same
//! - Compressed bodies pass through unchanged; the proxy strips
//!   `Accept-Encoding` upstream so HTML normally arrives as identity
//! - A body that cannot be read is an upstream failure (502), never a
//!   truncated page
//!
//! Also usable on its own: [`inject_reload_script`] is an axum middleware an
//! application can install to get live reload without the proxy.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const CLIENT_SCRIPT: &str = include_str!("reload-client.js");
const PORT_PLACEHOLDER: &str = "__RELOAD_PORT__";

/// Error rewriting a response.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("failed to read response body: {0}")]
    Body(#[from] axum::Error),
}

/// Appends the reload client script to HTML responses.
#[derive(Debug, Clone)]
pub struct ResponseInjector {
    script: Bytes,
}

impl ResponseInjector {
    /// Injector whose script connects back to `port`.
    pub fn new(port: u16) -> Self {
        let client = CLIENT_SCRIPT.replace(PORT_PLACEHOLDER, &port.to_string());
        Self {
            script: Bytes::from(format!("\n<script>\n{client}\n</script>\n")),
        }
    }

    /// The exact bytes appended to each HTML body.
    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// Return `html` with the script appended.
    pub fn inject_script(&self, html: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(html.len() + self.script.len());
        out.extend_from_slice(html);
        out.extend_from_slice(&self.script);
        out
    }

    /// True for uncompressed `text/html` responses.
    pub fn applies_to(headers: &HeaderMap) -> bool {
        let is_html = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"));

        let is_encoded = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|enc| !enc.trim().eq_ignore_ascii_case("identity"));

        is_html && !is_encoded
    }

    /// Rewrite `response` if it is HTML; otherwise return it as is.
    pub async fn inject(&self, response: Response) -> Result<Response, InjectError> {
        if !Self::applies_to(response.headers()) {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let html = axum::body::to_bytes(body, usize::MAX).await?;
        let body = self.inject_script(&html);

        parts.headers.remove(header::TRANSFER_ENCODING);
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        Ok(Response::from_parts(parts, Body::from(body)))
    }
}

/// Responses that never carry a body, whatever their headers say.
fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

/// Middleware applying [`ResponseInjector`] to every response.
///
/// A response whose body fails to read becomes `502 Bad Gateway`.
pub async fn inject_reload_script(
    State(injector): State<ResponseInjector>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    if is_bodiless(&method, response.status()) {
        return response;
    }

    match injector.inject(response).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to inject reload script");
            (StatusCode::BAD_GATEWAY, "Upstream response could not be read").into_response()
        }
    }
}
