//! Shared helpers for integration tests: stub upstreams and a proxy harness.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use reload_proxy::http::{ReloadServer, ServerError, ServerState};
use reload_proxy::reload::ConnectionRegistry;
use reload_proxy::{ReloadHandle, ServerOptions, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const PAGE: &str = "<html><body>Hi</body></html>";

/// How long `/slow` takes to answer.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(20);

/// Start an axum upstream on an ephemeral port.
///
/// - `/` HTML page
/// - `/plain` plain text
/// - `/echo/{*rest}` the request path, query and selected headers, one per line
/// - `/redirect` 302 to `/`
/// - `/slow` answers after [`SLOW_RESPONSE`]
pub async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { Html(PAGE) }))
        .route("/plain", get(|| async { "plain text" }))
        .route("/echo/{*rest}", get(echo))
        .route(
            "/redirect",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/")]) }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(SLOW_RESPONSE).await;
                "finally"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn echo(uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let mut lines = vec![
        format!("path={}", uri.path()),
        format!("query={}", uri.query().unwrap_or("")),
    ];
    for name in [
        "x-forwarded-for",
        "x-forwarded-host",
        "x-forwarded-proto",
        "accept-encoding",
        "connection",
    ] {
        let value = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        lines.push(format!("{name}={value}"));
    }
    lines.join("\n")
}

/// Start a raw TCP backend that answers every connection with `response`
/// verbatim and closes.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running proxy plus the handles tests poke at.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub handle: ReloadHandle,
    pub registry: Arc<ConnectionRegistry>,
    pub state: watch::Receiver<ServerState>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }
}

/// Start a proxy in front of `upstream` on an ephemeral port.
pub async fn start_proxy(upstream: SocketAddr) -> TestProxy {
    start_proxy_with(upstream, |options| options).await
}

/// Like [`start_proxy`], with `configure` applied to the options last.
///
/// The listener is bound on `127.0.0.1:0` whatever port `configure` sets.
pub async fn start_proxy_with<F>(upstream: SocketAddr, configure: F) -> TestProxy
where
    F: FnOnce(ServerOptions) -> ServerOptions,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let options = ServerOptions::from_host(&format!("http://{upstream}"))
        .unwrap()
        .with_port(i64::from(addr.port()))
        .unwrap()
        .with_system_proxy(false)
        .with_shutdown_grace(Duration::from_secs(2));
    let options = configure(options);

    let server = ReloadServer::new(options).unwrap();
    let handle = server.handle();
    let registry = server.registry();
    let state = server.state();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.signal()));

    TestProxy {
        addr,
        handle,
        registry,
        state,
        shutdown,
        task,
    }
}

/// HTTP client that bypasses any proxy in the environment and never follows
/// redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Wait until exactly `count` push channels are registered.
pub async fn wait_for_clients(registry: &ConnectionRegistry, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {count} clients, have {}", registry.len()));
}
