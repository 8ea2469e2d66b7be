//! HTTP exposition of the metrics registry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Serves a private Prometheus registry over HTTP.
///
/// Routes: the configured metrics path (default `/metrics`) and `/healthz`.
pub struct MetricsServer {
    registry: Registry,
    addr: String,
    metrics_path: String,
    shutdown: parking_lot::Mutex<Option<CancellationToken>>,
}

impl MetricsServer {
    /// Creates a server with an empty registry.
    pub fn new(cfg: &Config) -> Self {
        Self {
            registry: Registry::new(),
            addr: cfg.listen_addr.clone(),
            metrics_path: cfg.metrics_path.clone(),
            shutdown: parking_lot::Mutex::new(None),
        }
    }

    /// Registers a collector to be gathered on every scrape.
    pub fn register<C>(&self, collector: C) -> Result<()>
    where
        C: Collector + 'static,
    {
        self.registry
            .register(Box::new(collector))
            .context("registering collector")
    }

    /// Binds the listen address and starts serving in the background.
    ///
    /// Returns the bound address. Bind failures are returned to the caller.
    pub async fn start(&self) -> Result<SocketAddr> {
        let bind_addr = bind_address(&self.addr);

        let app_state = Arc::new(AppState {
            registry: self.registry.clone(),
        });

        let app = Router::new()
            .route(&self.metrics_path, get(metrics_handler))
            .route("/healthz", get(healthz_handler))
            .with_state(app_state);

        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("listening on {bind_addr}"))?;

        let local_addr = listener.local_addr().context("getting local address")?;

        let cancel = CancellationToken::new();
        *self.shutdown.lock() = Some(cancel.clone());

        let metrics_path = self.metrics_path.clone();
        tokio::spawn(async move {
            tracing::info!(addr = %local_addr, path = %metrics_path, "metrics server started");

            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                })
                .await;

            if let Err(e) = result {
                tracing::error!(error = %e, "metrics server error");
            }
        });

        Ok(local_addr)
    }

    /// Gracefully shuts down the metrics server.
    pub async fn stop(&self) -> Result<()> {
        if let Some(cancel) = self.shutdown.lock().take() {
            cancel.cancel();
        }

        Ok(())
    }
}

/// Expands the ":port" shorthand to all interfaces.
fn bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Shared state for axum handlers.
struct AppState {
    registry: Registry,
}

/// GET /metrics - Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "encoding metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// GET /healthz - Simple health check.
async fn healthz_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_port_shorthand() {
        assert_eq!(bind_address(":9112"), "0.0.0.0:9112");
        assert_eq!(bind_address("127.0.0.1:2112"), "127.0.0.1:2112");
        assert_eq!(bind_address("[::1]:9112"), "[::1]:9112");
    }

    #[tokio::test]
    async fn test_start_fails_on_bad_address() {
        let cfg = Config {
            listen_addr: "not-an-address".to_string(),
            ..Default::default()
        };
        let server = MetricsServer::new(&cfg);
        let err = server.start().await.expect_err("bind must fail");
        assert!(err.to_string().contains("listening on not-an-address"));
    }

    #[tokio::test]
    async fn test_start_fails_when_port_taken() {
        let holder = std::net::TcpListener::bind("127.0.0.1:0").expect("bind holder");
        let addr = holder.local_addr().expect("holder addr");

        let cfg = Config {
            listen_addr: addr.to_string(),
            ..Default::default()
        };
        let server = MetricsServer::new(&cfg);
        assert!(server.start().await.is_err());
    }
}
