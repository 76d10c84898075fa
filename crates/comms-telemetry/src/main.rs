//! Comms Telemetry Service
//!
//! Standalone host for the collector: installs the panic hook, exposes the
//! diagnostics snapshot on an admin port and logs health transitions.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing from `COMMS_LOG_LEVEL` / `COMMS_JSON_LOGS`
//! 2. Resolve the collector from environment; unusable configuration falls
//!    back to the no-op collector on the default address
//! 3. Install the collector as the process-wide instance
//! 4. Install the panic hook
//! 5. Spawn the health transition watcher
//! 6. Serve `/health`, `/ready` and `/diagnostics` until SIGTERM/SIGINT

#![warn(clippy::pedantic)]

use std::collections::HashMap;
use std::sync::Arc;

use common::config::{init_tracing, ObservabilityConfig};
use comms_telemetry::errors::TelemetryError;
use comms_telemetry::lifecycle;
use comms_telemetry::observability::{
    build_router, spawn_health_watcher, HealthState, DEFAULT_HEALTH_CHECK_INTERVAL,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), TelemetryError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    init_tracing(&ObservabilityConfig::from_vars(&env))?;

    info!("Starting comms telemetry service");

    let lifecycle::Bootstrap {
        telemetry,
        bind_address,
    } = lifecycle::bootstrap(&env);

    info!(
        noop = telemetry.is_noop(),
        verbose_requests = telemetry.verbose_requests_enabled(),
        bind_address = %bind_address,
        "Collector resolved"
    );

    lifecycle::install_global(Arc::clone(&telemetry));

    if telemetry.install_error_capture() {
        info!("Panic hook installed");
    }

    // Receiver held for the process lifetime keeps the watcher running
    let (_watcher, _health_rx) =
        spawn_health_watcher(Arc::clone(&telemetry), DEFAULT_HEALTH_CHECK_INTERVAL);

    let health_state = Arc::new(HealthState::new());
    let app = build_router(Arc::clone(&health_state), Arc::clone(&telemetry))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|source| TelemetryError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    health_state.set_ready();
    info!(bind_address = %bind_address, "Diagnostics server listening");

    let shutdown_state = Arc::clone(&health_state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_state.set_not_ready();
        })
        .await
        .map_err(TelemetryError::Serve)?;

    info!("Comms telemetry service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
