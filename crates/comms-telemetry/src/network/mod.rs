//! Outbound HTTP call monitoring.
//!
//! - [`policy`]: URL sanitization and the critical-endpoint allowlist
//! - [`recorder`]: bounded request buffer and its queries
//! - [`layer`]: tower middleware for any HTTP client service
//! - [`client`]: recording wrapper around `reqwest::Client`

pub mod client;
pub mod layer;
pub mod policy;
pub mod recorder;

pub use client::RecordingClient;
pub use layer::{RecordingLayer, RecordingService, RequestTarget, ResponseStatus};
pub use policy::{sanitize_url, RecordingPolicy};
pub use recorder::{
    NetworkRecorder, NetworkRequestRecord, NetworkRequestReport, TRANSPORT_FAILURE_STATUS,
};
