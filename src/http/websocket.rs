//! Push channel over WebSocket.
//!
//! # Responsibilities
//! - Detect upgrade requests
//! - Register each upgraded socket in the connection registry
//! - Write queued reload messages to the socket
//! - Unregister on client close, read error or write error
//!
//! # Data Flow
//! ```text
//! ConnectionRegistry::broadcast ──→ outbound queue ──→ this task ──→ Browser
//! Browser ──→ frames (ignored; only used to notice the close)
//! ```

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket},
    http::{header, HeaderMap},
};

use crate::reload::{ConnectionRegistry, PushChannel};

/// True when the request asks to upgrade to WebSocket.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::UPGRADE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|protocol| protocol.trim().eq_ignore_ascii_case("websocket"))
}

/// Serve one push channel until either side closes it.
pub async fn serve_push_channel(mut socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (channel, mut outbound) = PushChannel::new();
    let id = channel.id();
    registry.register(channel);
    tracing::debug!(connection_id = %id, clients = registry.len(), "Push channel opened");

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = socket.send(Message::Text(text.into())).await {
                        tracing::warn!(connection_id = %id, error = %e, "Push channel write failed");
                        break;
                    }
                }
                // Dropped from the registry (shutdown): say goodbye.
                None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "Push channel read failed");
                    break;
                }
            },
        }
    }

    registry.unregister(id);
    tracing::debug!(connection_id = %id, clients = registry.len(), "Push channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upgrade_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c, websocket"));
        assert!(is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_upgrade_request(&headers));
    }
}
