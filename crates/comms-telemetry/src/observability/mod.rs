//! HTTP surface for the telemetry service.
//!
//! - `GET /health` - liveness
//! - `GET /ready` - readiness
//! - `GET /diagnostics` - full diagnostics snapshot
//! - `GET /diagnostics/health` - health classification only
//!
//! All endpoints are read-only. [`watcher`] logs health transitions for
//! hosts that nobody is polling.

pub mod diagnostics;
pub mod health;
pub mod watcher;

pub use diagnostics::diagnostics_router;
pub use health::{health_router, HealthState};
pub use watcher::{spawn_health_watcher, DEFAULT_HEALTH_CHECK_INTERVAL};

use crate::collector::CommsTelemetry;
use axum::Router;
use std::sync::Arc;

/// Merge the liveness/readiness and diagnostics routers into the service's app.
pub fn build_router(health_state: Arc<HealthState>, telemetry: Arc<dyn CommsTelemetry>) -> Router {
    health_router(health_state).merge(diagnostics_router(telemetry))
}
