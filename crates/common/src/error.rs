//! Common error types for the comms telemetry components.

use thiserror::Error;

/// Errors shared by the binaries built on top of the collector.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tracing subscriber could not be installed
    #[error("Tracing initialization error: {0}")]
    TracingInit(String),
}

/// Result type alias using `CommonError`
pub type Result<T> = std::result::Result<T, CommonError>;
