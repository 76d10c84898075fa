//! Report fixtures for collector tests.
//!
//! Reports can be back-dated so window boundaries are testable without
//! waiting on the wall clock.

use chrono::{DateTime, Utc};
use common::types::NetId;
use comms_telemetry::auxiliary::{SeedOperation, SeedWipeRun};
use comms_telemetry::collector::{Collector, CommsTelemetry};
use comms_telemetry::config::Config;
use comms_telemetry::error_capture::{ErrorKind, RawErrorReport};
use comms_telemetry::network::NetworkRequestReport;
use std::sync::Arc;
use std::time::Duration;

/// Critical endpoint URL with a query string that must never be stored.
pub const TOKEN_URL: &str =
    "https://functions.example.test/generateLiveKitToken?room=ops-1&token=secret";

/// Sanitized form of [`TOKEN_URL`].
pub const TOKEN_URL_SANITIZED: &str = "https://functions.example.test/generateLiveKitToken";

/// Room status endpoint, also critical.
pub const ROOM_STATUS_URL: &str = "https://functions.example.test/getLiveKitRoomStatus";

/// Endpoint outside the default allowlist.
pub const ROSTER_URL: &str = "https://api.example.test/roster?page=2";

/// Collector with default configuration.
#[must_use]
pub fn test_collector() -> Arc<Collector> {
    Collector::shared(&Config::default())
}

/// Collector with small buffers, for eviction tests.
#[must_use]
pub fn small_collector(capacity: usize) -> Arc<Collector> {
    let config = Config {
        error_capacity: capacity,
        request_capacity: capacity,
        connection_sample_capacity: capacity,
        voice_sample_capacity: capacity,
        ..Config::default()
    };
    Collector::shared(&config)
}

fn ago(age: Duration) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::from_std(age).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Uncaught error report captured now.
#[must_use]
pub fn error_report(message: &str) -> RawErrorReport {
    RawErrorReport::new(ErrorKind::Uncaught, message)
}

/// Uncaught error report that occurred `age` ago.
#[must_use]
pub fn aged_error(message: &str, age: Duration) -> RawErrorReport {
    RawErrorReport {
        captured_at: Some(ago(age)),
        ..error_report(message)
    }
}

/// Completed request reported now.
#[must_use]
pub fn request_report(url: &str, status_code: u16) -> NetworkRequestReport {
    NetworkRequestReport::completed(url, status_code, 42)
}

/// Completed request that settled `age` ago.
#[must_use]
pub fn aged_request(url: &str, status_code: u16, age: Duration) -> NetworkRequestReport {
    NetworkRequestReport {
        captured_at: Some(ago(age)),
        ..request_report(url, status_code)
    }
}

/// Request that failed before a response arrived.
#[must_use]
pub fn failed_request(url: &str) -> NetworkRequestReport {
    NetworkRequestReport::transport_failure(url, "connection refused", 3)
}

/// Record `failures` server errors and `successes` 200s against the token
/// endpoint.
pub fn record_requests(collector: &Collector, failures: usize, successes: usize) {
    for _ in 0..failures {
        collector.record_network_request(request_report(TOKEN_URL, 502));
    }
    for _ in 0..successes {
        collector.record_network_request(request_report(TOKEN_URL, 200));
    }
}

/// Seed or wipe run outcome.
#[must_use]
pub fn seed_run(operation: SeedOperation, success: bool) -> SeedWipeRun {
    SeedWipeRun {
        operation,
        success,
        records_affected: success.then_some(12),
        duration_ms: Some(850),
        message: (!success).then(|| "seed script exited with status 1".to_string()),
    }
}

/// Voice net identifier.
#[must_use]
pub fn net(id: &str) -> NetId {
    NetId::from(id)
}

/// Error payload in the shape a browser-side reporter would post, with
/// camelCase keys and a non-string message.
#[must_use]
pub fn error_payload_json() -> serde_json::Value {
    serde_json::json!({
        "kind": "unhandled_rejection",
        "message": { "code": 503, "reason": "room unavailable" },
        "sourceLocation": "comms/room.ts:88:12",
        "stackTrace": "Error: room unavailable\n    at joinRoom (comms/room.ts:88:12)",
    })
}
