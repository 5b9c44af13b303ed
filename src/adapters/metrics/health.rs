//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness drops to
//! 503 once shutdown begins or the chain connection is reported lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use super::prometheus::BotMetrics;

/// Shared health state polled by readiness checks.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the chain connection answered its last check.
    pub chain_healthy: AtomicBool,
    /// Cleared when shutdown starts.
    pub running: AtomicBool,
}

impl HealthState {
    /// Create a new health state (healthy and running).
    pub fn new() -> Self {
        Self {
            chain_healthy: AtomicBool::new(true),
            running: AtomicBool::new(true),
        }
    }

    /// Check if the bot is ready to process rounds.
    pub fn is_ready(&self) -> bool {
        self.chain_healthy.load(Ordering::Relaxed) && self.running.load(Ordering::Relaxed)
    }

    pub fn set_chain_healthy(&self, healthy: bool) {
        self.chain_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn mark_stopping(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct AppState {
    health: Arc<HealthState>,
    metrics: Arc<BotMetrics>,
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    health: Arc<HealthState>,
    metrics: Arc<BotMetrics>,
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(health: Arc<HealthState>, metrics: Arc<BotMetrics>, port: u16) -> Self {
        Self {
            health,
            metrics,
            port,
        }
    }

    /// Routes served by this server.
    fn router(&self) -> Router {
        Router::new()
            .route("/live", get(liveness))
            .route("/ready", get(readiness))
            .route("/metrics", get(metrics))
            .with_state(AppState {
                health: Arc::clone(&self.health),
                metrics: Arc::clone(&self.metrics),
            })
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx), fields(port = self.port))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        let health = Arc::clone(&self.health);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                health.mark_stopping();
            })
            .await?;

        Ok(())
    }
}

/// Liveness check: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_until_stopping() {
        let state = HealthState::new();
        assert!(state.is_ready());
        state.mark_stopping();
        assert!(!state.is_ready());
    }

    #[test]
    fn test_chain_loss_not_ready() {
        let state = HealthState::new();
        state.set_chain_healthy(false);
        assert!(!state.is_ready());
        state.set_chain_healthy(true);
        assert!(state.is_ready());
    }

    #[tokio::test]
    async fn test_readiness_status_codes() {
        let health = Arc::new(HealthState::new());
        let metrics = Arc::new(BotMetrics::new().unwrap());
        let state = AppState {
            health: Arc::clone(&health),
            metrics,
        };

        let ok = readiness(State(state.clone())).await.into_response();
        assert_eq!(ok.status(), StatusCode::OK);

        health.mark_stopping();
        let down = readiness(State(state)).await.into_response();
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
