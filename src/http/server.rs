//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum router for the secret API
//! - Wire up middleware (tracing, request ID, timeout, metrics)
//! - Own the listening socket for the proxy session
//! - Start serving and stop gracefully, draining in-flight requests
//!
//! # Design Decisions
//! - The secret client is injected once and shared through `AppState`
//! - A deliberate stop ends `start()` with `Ok(())`; bind failures are errors
//! - Stop waits for the drain, bounded by the shutdown timeout
//! - A proxy serves at most once

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{middleware, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::client::SecretClient;
use crate::config::ProxyConfig;
use crate::http::request;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{self, Revision};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session's secret client, shared by every request.
    pub client: Arc<dyn SecretClient>,
    pub revision: Revision,
    pub max_body_bytes: usize,
}

/// Errors surfaced by the proxy lifecycle.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("proxy has already been started")]
    AlreadyStarted,

    #[error("graceful shutdown did not complete within {}s", .0.as_secs())]
    ShutdownTimeout(Duration),
}

/// Uniform start/stop contract driven by the process entry point.
#[async_trait]
pub trait ClientProxy: Send + Sync {
    /// Serve until stopped. Returns `Ok(())` after a deliberate stop.
    async fn start(&self) -> Result<(), ProxyError>;

    /// Stop accepting, drain in-flight requests and release the socket.
    /// Returns at once if `start` was never called.
    async fn stop(&self) -> Result<(), ProxyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Serving,
    Stopped,
}

/// RESTful proxy in front of a secret client.
pub struct RestProxy {
    router: Router,
    bind_address: String,
    shutdown_timeout: Duration,
    shutdown: Shutdown,
    phase: watch::Sender<Phase>,
}

impl RestProxy {
    /// Create a proxy for `client` with the given configuration.
    pub fn new(config: &ProxyConfig, client: Arc<dyn SecretClient>) -> Self {
        let state = AppState {
            client,
            revision: config.api.revision,
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(config, state);
        let (phase, _) = watch::channel(Phase::Idle);

        Self {
            router,
            bind_address: config.listener.bind_address(),
            shutdown_timeout: Duration::from_secs(config.timeouts.shutdown_secs),
            shutdown: Shutdown::new(),
            phase,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        routing::secret_routes(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(TraceLayer::new_for_http().make_span_with(request::request_span))
            .layer(request::propagate_request_id_layer())
            .layer(request::set_request_id_layer())
    }

    /// The router, for serving it on a custom transport or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Bind the configured address and serve until stopped.
    ///
    /// The proxy counts as started before the bind, so a concurrent
    /// `stop()` waits for the socket to be released.
    pub async fn start(&self) -> Result<(), ProxyError> {
        self.claim()?;
        let listener = match TcpListener::bind(&self.bind_address).await {
            Ok(listener) => listener,
            Err(source) => {
                self.phase.send_replace(Phase::Stopped);
                return Err(ProxyError::Bind {
                    address: self.bind_address.clone(),
                    source,
                });
            }
        };
        self.run(listener).await
    }

    /// Serve on an already bound listener until stopped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ProxyError> {
        self.claim()?;
        self.run(listener).await
    }

    /// Move from idle to serving; a proxy serves at most once.
    fn claim(&self) -> Result<(), ProxyError> {
        let claimed = self.phase.send_if_modified(|phase| {
            if *phase == Phase::Idle {
                *phase = Phase::Serving;
                true
            } else {
                false
            }
        });
        if claimed {
            Ok(())
        } else {
            Err(ProxyError::AlreadyStarted)
        }
    }

    async fn run(&self, listener: TcpListener) -> Result<(), ProxyError> {
        let result = match listener.local_addr() {
            Ok(address) => {
                tracing::info!(address = %address, "Secrets proxy listening");
                axum::serve(listener, self.router.clone())
                    .with_graceful_shutdown(self.shutdown.wait())
                    .await
            }
            Err(err) => Err(err),
        };

        self.phase.send_replace(Phase::Stopped);
        tracing::info!("Secrets proxy stopped");
        result.map_err(ProxyError::Serve)
    }

    /// Trigger graceful shutdown and wait for in-flight requests to drain.
    pub async fn stop(&self) -> Result<(), ProxyError> {
        self.shutdown.trigger();

        let mut phase = self.phase.subscribe();
        if *phase.borrow() == Phase::Idle {
            return Ok(());
        }

        tracing::info!(timeout = ?self.shutdown_timeout, "Draining in-flight requests");
        let drained = tokio::time::timeout(self.shutdown_timeout, async move {
            let _ = phase.wait_for(|p| *p == Phase::Stopped).await;
        })
        .await;

        drained.map_err(|_| ProxyError::ShutdownTimeout(self.shutdown_timeout))
    }
}

#[async_trait]
impl ClientProxy for RestProxy {
    async fn start(&self) -> Result<(), ProxyError> {
        RestProxy::start(self).await
    }

    async fn stop(&self) -> Result<(), ProxyError> {
        RestProxy::stop(self).await
    }
}
