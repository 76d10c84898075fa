//! Diagnostics endpoints.
//!
//! The snapshot is serialized as-is; it already omits query strings and
//! carries no credentials, so it is safe to expose on an admin port.

use crate::collector::CommsTelemetry;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::health::HealthReport;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tracing::debug;

/// Router serving `GET /diagnostics` and `GET /diagnostics/health`.
pub fn diagnostics_router(telemetry: Arc<dyn CommsTelemetry>) -> Router {
    Router::new()
        .route("/diagnostics", get(snapshot_handler))
        .route("/diagnostics/health", get(health_handler))
        .with_state(telemetry)
}

async fn snapshot_handler(
    State(telemetry): State<Arc<dyn CommsTelemetry>>,
) -> Json<DiagnosticsSnapshot> {
    let snapshot = telemetry.diagnostics_summary();
    debug!(
        target: "comms.telemetry.diagnostics",
        status = snapshot.health.status.as_str(),
        recent_errors = snapshot.recent_errors.len(),
        nets = snapshot.nets.len(),
        "Serving diagnostics snapshot"
    );
    Json(snapshot)
}

async fn health_handler(State(telemetry): State<Arc<dyn CommsTelemetry>>) -> Json<HealthReport> {
    Json(telemetry.health_report())
}
