//! Test server harness for end-to-end diagnostics tests.
//!
//! Provides `TestTelemetryServer`, which serves the real router for a given
//! collector on a random local port.

use comms_telemetry::collector::CommsTelemetry;
use comms_telemetry::observability::{build_router, HealthState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Diagnostics server running in a background task.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_diagnostics_e2e() -> Result<(), anyhow::Error> {
///     let collector = test_collector();
///     let server = TestTelemetryServer::spawn(collector.clone()).await?;
///
///     let body: serde_json::Value = reqwest::get(format!("{}/diagnostics", server.url()))
///         .await?
///         .json()
///         .await?;
///     assert_eq!(body["health"]["status"], "GREEN");
///     Ok(())
/// }
/// ```
pub struct TestTelemetryServer {
    addr: SocketAddr,
    health_state: Arc<HealthState>,
    _handle: JoinHandle<()>,
}

impl TestTelemetryServer {
    /// Bind 127.0.0.1:0 and serve the router; the server starts ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(telemetry: Arc<dyn CommsTelemetry>) -> Result<Self, anyhow::Error> {
        let health_state = Arc::new(HealthState::new());
        health_state.set_ready();
        let app = build_router(Arc::clone(&health_state), telemetry);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            health_state,
            _handle: handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Probe state, for flipping readiness mid-test.
    pub fn health_state(&self) -> &Arc<HealthState> {
        &self.health_state
    }
}

impl Drop for TestTelemetryServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
