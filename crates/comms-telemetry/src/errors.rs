//! Error types for the telemetry service binary.
//!
//! The collector itself never fails its callers, and unusable collector
//! configuration degrades to the no-op collector. These errors cover the
//! parts of startup that cannot degrade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Tracing subscriber could not be installed.
    #[error("Tracing initialization failed: {0}")]
    Tracing(#[from] common::error::CommonError),

    /// The HTTP listener could not bind its address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
