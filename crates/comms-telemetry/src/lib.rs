//! Comms Telemetry Library
//!
//! Process-resident telemetry for the communications features of an
//! operations console. Everything lives in bounded in-memory buffers and is
//! read back through a diagnostics snapshot; nothing is persisted or shipped
//! off-host.
//!
//! # Components
//!
//! ```text
//! Collector
//! ├── ErrorCapture      panic hook + task failures, last N errors
//! ├── NetworkRecorder   outbound HTTP calls to critical endpoints
//! ├── VoiceTelemetry    per-net connection time, latency, jitter
//! └── AuxiliaryState    heartbeats, seed/wipe runs, mode flags
//! ```
//!
//! The health classifier and diagnostics aggregator are pure functions over
//! the collector's buffers.
//!
//! # Wiring
//!
//! The composition root owns an `Arc<dyn CommsTelemetry>` and hands clones
//! to the HTTP client layer, the voice client and the HTTP surface. Code
//! that cannot be reached that way uses [`lifecycle::global`]. When
//! telemetry is disabled the [`NoopCollector`] takes its place, so callers
//! never need to check.
//!
//! # Modules
//!
//! - [`config`] - Collector configuration from environment
//! - [`error_capture`] - Uncaught error and task failure capture
//! - [`network`] - Outbound request recording (tower layer and reqwest wrapper)
//! - [`voice`] - Voice net connection quality
//! - [`health`] - GREEN/AMBER/RED classification
//! - [`diagnostics`] - Point-in-time snapshot of everything above
//! - [`observability`] - HTTP endpoints for liveness, readiness and diagnostics

pub mod auxiliary;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error_capture;
pub mod errors;
pub mod health;
pub mod lifecycle;
pub mod network;
pub mod observability;
pub mod ring_buffer;
pub mod voice;

pub use collector::{Collector, CommsTelemetry, NoopCollector};
pub use config::Config;
pub use diagnostics::DiagnosticsSnapshot;
pub use error_capture::{ErrorKind, ErrorRecord, RawErrorReport};
pub use health::{HealthReport, HealthStatus, HealthThresholds};
pub use network::{NetworkRequestRecord, NetworkRequestReport, RecordingClient, RecordingLayer};
pub use voice::NetSummary;
