//! Shared utilities for integration tests.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use rr_proxy::config::{LbConfig, TimeoutConfig};
use rr_proxy::load_balancer::backend::UpstreamOptions;
use rr_proxy::{Backend, Dispatcher, HttpServer, ProxyBackend, Shutdown};

/// Start a backend that answers every request with a JSON description of
/// what it received, tagged with `name`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(echo).with_state(name);
    serve(app).await
}

/// Start a backend that waits `delay` before answering.
#[allow(dead_code)]
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "slow"
    });
    serve(app).await
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// HTTP backend for `addr` with an optional path prefix.
pub fn http_backend(addr: SocketAddr, prefix: &str) -> Arc<dyn Backend> {
    http_backend_with(addr, prefix, UpstreamOptions::default())
}

#[allow(dead_code)]
pub fn http_backend_with(addr: SocketAddr, prefix: &str, options: UpstreamOptions) -> Arc<dyn Backend> {
    let address = format!("http://{}{}", addr, prefix);
    Arc::new(ProxyBackend::new(&address, &options).unwrap())
}

/// Start the load balancer over `backends` on an ephemeral port.
pub async fn start_proxy(backends: Vec<Arc<dyn Backend>>) -> (SocketAddr, Shutdown) {
    let dispatcher = Arc::new(Dispatcher::new(0, backends).unwrap());
    launch(HttpServer::new(dispatcher, &TimeoutConfig::default())).await
}

/// Start the load balancer exactly as the binary wires it from `config`.
#[allow(dead_code)]
pub async fn start_proxy_from_config(config: &LbConfig) -> (SocketAddr, Shutdown) {
    let dispatcher = Arc::new(Dispatcher::from_config(config).unwrap());
    launch(HttpServer::new(dispatcher, &config.timeouts)).await
}

async fn launch(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(State(name): State<&'static str>, request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();

    let mut headers = Map::new();
    for (key, value) in parts.headers.iter() {
        headers.insert(
            key.as_str().to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }

    let body = axum::body::to_bytes(body, 1024 * 1024).await.unwrap_or_default();

    Json(json!({
        "backend": name,
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}
