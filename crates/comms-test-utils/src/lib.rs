//! # Comms Test Utilities
//!
//! Shared test utilities for the comms telemetry collector.
//!
//! ## Modules
//!
//! - `fixtures` - Error, request and seed-run reports, optionally back-dated
//! - `mock_transport` - Tower HTTP client service with scripted outcomes
//! - `server_harness` - Diagnostics server on a random local port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comms_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let collector = test_collector();
//!     collector.record_error(aged_error("stale", Duration::from_secs(600)));
//!
//!     let transport = MockTransport::responding(503);
//!     // Wrap `transport` in a RecordingLayer and call it...
//! }
//! ```

pub mod fixtures;
pub mod mock_transport;
pub mod server_harness;

pub use fixtures::*;
pub use mock_transport::*;
pub use server_harness::*;
