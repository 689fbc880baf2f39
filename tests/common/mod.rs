//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use bytes::Bytes;
use secrets_http_proxy::client::{ClientError, ClientResult, SecretClient, SecretPath, SecretVersion};
use secrets_http_proxy::{MemoryClient, ProxyConfig, ProxyError, RestProxy, Revision};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Token the mock secret service accepts.
pub const SERVICE_TOKEN: &str = "test-token";

/// A proxy serving on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub proxy: Arc<RestProxy>,
    pub serving: JoinHandle<Result<(), ProxyError>>,
}

impl TestProxy {
    /// URL of `secret` under the revision's mount prefix.
    pub fn url(&self, revision: Revision, secret: &str) -> String {
        format!("http://{}{}{}", self.addr, revision.mount_prefix(), secret)
    }

    /// Stop the proxy and wait for `start` to return.
    pub async fn shutdown(self) -> Result<(), ProxyError> {
        self.proxy.stop().await?;
        self.serving.await.expect("serve task panicked")
    }
}

/// Default configuration for `revision`, listening on an ephemeral port.
pub fn proxy_config(revision: Revision) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.port = 0;
    config.api.revision = revision;
    config
}

/// Start a proxy for `client` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_proxy(config: ProxyConfig, client: Arc<dyn SecretClient>) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let proxy = Arc::new(RestProxy::new(&config, client));

    let serving = tokio::spawn({
        let proxy = Arc::clone(&proxy);
        async move { proxy.serve(listener).await }
    });

    TestProxy {
        addr,
        proxy,
        serving,
    }
}

/// HTTP client that never goes through a system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Memory client that counts how often each operation is called.
#[derive(Default)]
pub struct CountingClient {
    inner: MemoryClient,
    pub gets: AtomicUsize,
    pub writes: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingClient {
    pub fn total(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretClient for CountingClient {
    async fn get(&self, path: &SecretPath) -> ClientResult<SecretVersion> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(path).await
    }

    async fn write(&self, path: &SecretPath, data: Bytes) -> ClientResult<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(path, data).await
    }

    async fn delete(&self, path: &SecretPath) -> ClientResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(path).await
    }
}

/// Client whose reads take `delay` before answering with `payload`.
pub struct SlowClient {
    pub delay: Duration,
    pub payload: Bytes,
}

#[async_trait]
impl SecretClient for SlowClient {
    async fn get(&self, _path: &SecretPath) -> ClientResult<SecretVersion> {
        tokio::time::sleep(self.delay).await;
        Ok(SecretVersion {
            version: 1,
            data: self.payload.clone(),
        })
    }

    async fn write(&self, _path: &SecretPath, _data: Bytes) -> ClientResult<u64> {
        tokio::time::sleep(self.delay).await;
        Ok(1)
    }

    async fn delete(&self, _path: &SecretPath) -> ClientResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Client failing every call with the error built by `make`.
pub struct FailingClient<F> {
    pub make: F,
}

#[async_trait]
impl<F> SecretClient for FailingClient<F>
where
    F: Fn() -> ClientError + Send + Sync,
{
    async fn get(&self, _path: &SecretPath) -> ClientResult<SecretVersion> {
        Err((self.make)())
    }

    async fn write(&self, _path: &SecretPath, _data: Bytes) -> ClientResult<u64> {
        Err((self.make)())
    }

    async fn delete(&self, _path: &SecretPath) -> ClientResult<()> {
        Err((self.make)())
    }
}

/// In-memory secret service speaking the remote wire contract.
#[derive(Clone, Default)]
pub struct MockSecretService {
    secrets: Arc<Mutex<HashMap<String, Vec<Bytes>>>>,
    pub requests: Arc<AtomicUsize>,
}

/// Start the mock service on an ephemeral port and return its endpoint URL.
pub async fn start_mock_service(service: MockSecretService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/v1/secrets/{*path}", any(mock_secret))
        .with_state(service);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

fn mock_error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({ "code": code, "message": message });
    (status, [(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {SERVICE_TOKEN}"))
}

async fn mock_secret(State(service): State<MockSecretService>, request: Request) -> Response {
    service.requests.fetch_add(1, Ordering::SeqCst);

    if !authorized(request.headers()) {
        return mock_error(StatusCode::UNAUTHORIZED, "unauthenticated", "invalid token");
    }

    let raw = request
        .uri()
        .path()
        .trim_start_matches("/v1/secrets/")
        .to_string();
    let (path, version) = match raw.rsplit_once(':') {
        Some((path, version)) => (path.to_string(), version.parse::<usize>().ok()),
        None => (raw.clone(), None),
    };

    // Paths with a reserved leaf let tests drive the error branches.
    if path.ends_with("/forbidden") {
        return mock_error(StatusCode::FORBIDDEN, "forbidden", "access denied to secret");
    }
    if path.ends_with("/unavailable") {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }

    let method = request.method().clone();
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    let mut secrets = service.secrets.lock().unwrap();
    match method {
        Method::GET => {
            let versions = secrets.get(&path);
            let found = versions.and_then(|versions| match version {
                Some(n) => versions.get(n.wrapping_sub(1)).map(|data| (n, data.clone())),
                None => versions.last().map(|data| (versions.len(), data.clone())),
            });
            match found {
                Some((n, data)) => {
                    (StatusCode::OK, [("x-secret-version", n.to_string())], data).into_response()
                }
                None => mock_error(StatusCode::NOT_FOUND, "secret_not_found", "secret not found"),
            }
        }
        Method::POST => {
            if version.is_some() {
                return mock_error(
                    StatusCode::BAD_REQUEST,
                    "cannot_write_to_version",
                    "cannot write to a specific version of a secret",
                );
            }
            if body.is_empty() {
                return mock_error(StatusCode::BAD_REQUEST, "empty_secret", "secret content is empty");
            }
            let versions = secrets.entry(path).or_default();
            versions.push(body);
            (
                StatusCode::CREATED,
                [("x-secret-version", versions.len().to_string())],
            )
                .into_response()
        }
        Method::DELETE => match secrets.remove(&path) {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => mock_error(StatusCode::NOT_FOUND, "secret_not_found", "secret not found"),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
