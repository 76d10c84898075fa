//! Liveness and readiness endpoints.
//!
//! `live` is true from construction. `ready` flips once the collector is
//! installed and the listener is bound, and drops again when shutdown
//! begins.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Probe state shared with the handlers.
///
/// The collector itself has no notion of readiness: recording never fails,
/// so these flags describe the diagnostics server, not comms health. Comms
/// health is served separately on `/diagnostics/health`.
#[derive(Debug)]
pub struct HealthState {
    /// Set at construction; the process is answering requests.
    live: AtomicBool,
    /// Set once the listener is bound, cleared when shutdown begins.
    ready: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Live, not yet ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        }
    }

    /// Mark the diagnostics server as able to serve snapshots.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Mark the server as draining; called when a shutdown signal arrives.
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Whether the process is live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether the server should receive traffic.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Create the liveness/readiness router.
///
/// # Endpoints
///
/// - `GET /health` - 200 while the process is running
/// - `GET /ready` - 200 once the listener is bound, 503 before that and
///   during shutdown
///
/// A RED comms status does not fail either endpoint.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

/// Liveness handler.
async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    ok_or_unavailable(state.is_live())
}

/// Readiness handler.
async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    ok_or_unavailable(state.is_ready())
}

fn ok_or_unavailable(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
