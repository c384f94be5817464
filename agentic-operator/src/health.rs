//! Health endpoints for the operator pod.
//!
//! Serves `/healthz` (liveness) and `/readyz` (readiness), separate from
//! the per-agent probes inside agent pods.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Shared readiness state.
#[derive(Default)]
pub struct HealthState {
    started: AtomicBool,
}

impl HealthState {
    /// Create a new, not-yet-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the operator as started and ready.
    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Whether startup has completed.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Run the health server until it encounters a fatal error. Spawn this
/// alongside the controller.
///
/// The state is marked started only after the listener binds, so a
/// readiness probe can't succeed before the server is actually listening.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> std::io::Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port, "Health server listening");
    state.mark_started();

    axum::serve(listener, app).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_started() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthz_is_always_ok() {
        assert_eq!(healthz().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_tracks_startup() {
        let state = Arc::new(HealthState::new());
        assert_eq!(
            readyz(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.mark_started();
        assert_eq!(readyz(State(state)).await, StatusCode::OK);
    }

    #[test]
    fn mark_started_is_idempotent() {
        let state = HealthState::new();
        state.mark_started();
        state.mark_started();
        assert!(state.is_started());
    }
}
