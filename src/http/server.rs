//! Reload coordination server.
//!
//! # Responsibilities
//! - Serve the push channel and the reverse proxy on one listener
//! - Own the connection registry and the reload notifier
//! - Run the debounced drain loop that broadcasts reloads
//! - Drain gracefully on shutdown, closing push channels last
//!
//! # State Machine
//! ```text
//! Stopped → Starting → Running → Draining → Stopped
//! ```
//! `Draining → Stopped` happens when in-flight requests finish or the grace
//! period expires, whichever is first.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{ws::WebSocketUpgrade, ConnectInfo, FromRequestParts, Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use futures_util::StreamExt;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::{ForwardTarget, ServerOptions};
use crate::http::inject::{inject_reload_script, ResponseInjector};
use crate::http::{request, response, websocket};
use crate::reload::{self, ConnectionRegistry, Debouncer, Notifier, ReloadHandle};

/// Largest request body forwarded upstream.
const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

/// Lifecycle state of a [`ReloadServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Draining,
}

/// Fatal server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// State injected into handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<ConnectionRegistry>,
    client: reqwest::Client,
    target: ForwardTarget,
}

/// Live-reload proxy: reverse proxy plus push channel on a single port.
pub struct ReloadServer {
    options: ServerOptions,
    registry: Arc<ConnectionRegistry>,
    notifier: Arc<Notifier>,
    client: reqwest::Client,
    state: Arc<watch::Sender<ServerState>>,
}

impl ReloadServer {
    /// Create a server; nothing is bound until [`run`](Self::run).
    pub fn new(options: ServerOptions) -> Result<Self, ServerError> {
        // Pooled connections are never kept idle: each upstream request uses a
        // fresh connection, so rewritten Content-Length values never meet a
        // reused keep-alive stream.
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::none());
        if !options.use_system_proxy() {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        let (state, _) = watch::channel(ServerState::Stopped);
        Ok(Self {
            options,
            registry: Arc::new(ConnectionRegistry::new()),
            notifier: Arc::new(Notifier::new()),
            client,
            state: Arc::new(state),
        })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Cloneable trigger for the change bridge (or anything else).
    pub fn handle(&self) -> ReloadHandle {
        ReloadHandle::new(Arc::clone(&self.notifier))
    }

    /// Request a reload of every connected browser.
    pub fn trigger_reload(&self) {
        self.handle().trigger_reload();
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Watch the server's lifecycle state.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Router whose injected script points at the configured port.
    pub fn router(&self) -> Router {
        self.router_for(self.options.port())
    }

    /// Build the router: push channel and proxy behind the injector. The
    /// injected script connects back to `port`.
    pub fn router_for(&self, port: u16) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            client: self.client.clone(),
            target: self.options.target().clone(),
        };
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                ResponseInjector::new(port),
                inject_reload_script,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` completes, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.state.send_replace(ServerState::Starting);
        let addr = listener.local_addr()?;

        let debouncer = Arc::new(Debouncer::new(self.options.effective_delay()));
        let drain_loop = reload::spawn_drain_loop(
            Arc::clone(&self.notifier),
            Arc::clone(&debouncer),
            Arc::clone(&self.registry),
            self.options.command().map(Arc::from),
        );

        // The bound port, which differs from the configured one for port 0.
        let app = self
            .router_for(addr.port())
            .into_make_service_with_connect_info::<SocketAddr>();
        let draining = Arc::clone(&self.state);
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                draining.send_replace(ServerState::Draining);
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        self.state.send_replace(ServerState::Running);
        tracing::info!(
            address = %addr,
            upstream = %self.options.target(),
            delay_ms = self.options.effective_delay().as_millis() as u64,
            "Reload proxy running"
        );

        let grace = self.options.shutdown_grace();
        let mut state = self.state.subscribe();
        let result = tokio::select! {
            result = serve => result.map_err(ServerError::from),
            () = grace_expired(&mut state, grace) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Grace period elapsed with requests in flight, closing anyway"
                );
                Ok(())
            }
        };

        drain_loop.abort();
        debouncer.cancel();
        let closed = self.registry.close_all();
        if closed > 0 {
            tracing::debug!(clients = closed, "Closed open push channels");
        }

        self.state.send_replace(ServerState::Stopped);
        tracing::info!("Reload proxy stopped");
        result
    }
}

/// Completes `grace` after the server enters `Draining`.
async fn grace_expired(state: &mut watch::Receiver<ServerState>, grace: Duration) {
    let draining = state
        .wait_for(|s| *s == ServerState::Draining)
        .await
        .is_ok();
    if !draining {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

/// Upgrade requests become push channels; everything else is proxied.
async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    if websocket::is_upgrade_request(req.headers()) {
        let (mut parts, _body) = req.into_parts();
        return match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(upgrade) => {
                let registry = Arc::clone(&state.registry);
                upgrade.on_upgrade(move |socket| websocket::serve_push_channel(socket, registry))
            }
            Err(rejection) => rejection.into_response(),
        };
    }
    forward(&state, req).await
}

/// Why a request body could not be forwarded.
#[derive(Debug, thiserror::Error)]
enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
}

impl BodyError {
    fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Read(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Buffer a request body of at most `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    let mut chunks = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

/// Reverse-proxy one request to the forwarding target.
async fn forward(state: &AppState, req: Request) -> Response {
    let client_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = req.into_parts();
    let url = request::rewrite_url(state.target.url(), &parts.uri);
    let headers = request::outbound_headers(&parts.headers, client_addr);

    tracing::debug!(method = %parts.method, upstream = %url, "Proxying request");

    let body = match read_body(body, MAX_REQUEST_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (e.status(), e.to_string()).into_response();
        }
    };

    let mut outbound = state.client.request(parts.method, url).headers(headers);
    if !body.is_empty() {
        outbound = outbound.body(body);
    }

    match outbound.send().await {
        Ok(upstream) => response::from_upstream(upstream),
        Err(e) => {
            tracing::error!(upstream = %state.target, error = %e, "Upstream error");
            response::bad_gateway()
        }
    }
}

impl std::fmt::Debug for ReloadServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadServer")
            .field("options", &self.options)
            .field("clients", &self.registry.len())
            .finish_non_exhaustive()
    }
}
