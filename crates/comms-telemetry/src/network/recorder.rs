//! Bounded store of outbound request outcomes.

use super::policy::{sanitize_url, RecordingPolicy};
use crate::health::within_window;
use crate::ring_buffer::{lock, RingBuffer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Status code recorded when the call never produced a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Window used for the requests-per-minute figure.
const REQUESTS_PER_MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one outbound call, as handed to the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkRequestReport {
    /// Target URL; sanitized before storage.
    pub url: String,
    /// HTTP status, or 0 for transport failure.
    pub status_code: u16,
    pub duration_ms: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl NetworkRequestReport {
    /// A call that produced an HTTP response.
    #[must_use]
    pub fn completed(url: impl Into<String>, status_code: u16, duration_ms: u64) -> Self {
        Self {
            url: url.into(),
            status_code,
            duration_ms,
            error_message: None,
            captured_at: None,
        }
    }

    /// A call that failed before any response arrived.
    #[must_use]
    pub fn transport_failure(
        url: impl Into<String>,
        error_message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            url: url.into(),
            status_code: TRANSPORT_FAILURE_STATUS,
            duration_ms,
            error_message: Some(error_message.into()),
            captured_at: None,
        }
    }
}

/// Stored request outcome. The URL has no query string or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRequestRecord {
    pub sanitized_url: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl NetworkRequestRecord {
    /// Transport failure or server error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE_STATUS || self.status_code >= 500
    }
}

/// Request buffer plus the policy that guards it.
#[derive(Debug)]
pub struct NetworkRecorder {
    buffer: Mutex<RingBuffer<NetworkRequestRecord>>,
    policy: RecordingPolicy,
    total_recorded: AtomicU64,
}

impl NetworkRecorder {
    #[must_use]
    pub fn new(capacity: usize, policy: RecordingPolicy) -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::with_capacity(capacity)),
            policy,
            total_recorded: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RecordingPolicy {
        &self.policy
    }

    /// Sanitize and store a request outcome.
    ///
    /// The recording policy is not consulted here; interceptors check
    /// [`RecordingPolicy::should_record`] before the call is made.
    pub fn record(&self, report: NetworkRequestReport) -> NetworkRequestRecord {
        let record = NetworkRequestRecord {
            sanitized_url: sanitize_url(&report.url),
            status_code: report.status_code,
            duration_ms: report.duration_ms,
            error_message: report.error_message,
            captured_at: report.captured_at.unwrap_or_else(Utc::now),
        };

        if record.is_failure() {
            warn!(
                target: "comms.telemetry.network",
                url = %record.sanitized_url,
                status_code = record.status_code,
                duration_ms = record.duration_ms,
                error = record.error_message.as_deref().unwrap_or(""),
                "Outbound request failed"
            );
        } else {
            debug!(
                target: "comms.telemetry.network",
                url = %record.sanitized_url,
                status_code = record.status_code,
                duration_ms = record.duration_ms,
                "Outbound request recorded"
            );
        }

        lock(&self.buffer).push(record.clone());
        self.total_recorded.fetch_add(1, Ordering::Relaxed);
        record
    }

    /// Up to `limit` records for critical endpoints, newest-first,
    /// regardless of verbose mode.
    #[must_use]
    pub fn recent_comms(&self, limit: usize) -> Vec<NetworkRequestRecord> {
        lock(&self.buffer)
            .iter()
            .filter(|r| self.policy.matches_critical(&r.sanitized_url))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Records captured within `window` of `now`.
    #[must_use]
    pub fn count_within(&self, window: Duration, now: DateTime<Utc>) -> usize {
        lock(&self.buffer)
            .iter()
            .filter(|r| within_window(r.captured_at, now, window))
            .count()
    }

    /// Requests recorded during the last minute.
    #[must_use]
    pub fn requests_per_minute(&self, now: DateTime<Utc>) -> usize {
        self.count_within(REQUESTS_PER_MINUTE_WINDOW, now)
    }

    /// Every buffered record, newest-first.
    #[must_use]
    pub fn all(&self) -> Vec<NetworkRequestRecord> {
        lock(&self.buffer).all()
    }

    /// Requests recorded since construction or the last reset.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded.load(Ordering::Relaxed)
    }

    /// Drop all records and zero the lifetime total. Verbose mode is kept.
    pub fn clear(&self) {
        lock(&self.buffer).clear();
        self.total_recorded.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn recorder(capacity: usize) -> NetworkRecorder {
        NetworkRecorder::new(
            capacity,
            RecordingPolicy::new(
                vec!["getLiveKitRoomStatus".to_string(), "generateLiveKitToken".to_string()],
                false,
            ),
        )
    }

    #[test]
    fn test_record_sanitizes_url() {
        let recorder = recorder(10);
        let record = recorder.record(NetworkRequestReport::completed(
            "https://api.example.com/getLiveKitRoomStatus?token=secret123",
            200,
            42,
        ));
        assert_eq!(
            record.sanitized_url,
            "https://api.example.com/getLiveKitRoomStatus"
        );
        assert!(!recorder.all()[0].sanitized_url.contains("secret123"));
    }

    #[test]
    fn test_transport_failure_recorded_as_status_zero() {
        let recorder = recorder(10);
        let record = recorder.record(NetworkRequestReport::transport_failure(
            "https://fn.example.com/generateLiveKitToken",
            "connection refused",
            5,
        ));
        assert_eq!(record.status_code, 0);
        assert!(record.is_failure());
        assert_eq!(record.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_recent_comms_filters_to_allowlist() {
        let recorder = recorder(10);
        recorder.policy().set_verbose(true);
        recorder.record(NetworkRequestReport::completed("https://api.example.com/members", 200, 1));
        recorder.record(NetworkRequestReport::completed(
            "https://api.example.com/getLiveKitRoomStatus",
            200,
            1,
        ));
        recorder.record(NetworkRequestReport::completed(
            "https://api.example.com/generateLiveKitToken",
            500,
            1,
        ));
        recorder.record(NetworkRequestReport::completed("https://api.example.com/events", 200, 1));

        let comms = recorder.recent_comms(10);
        let urls: Vec<_> = comms.iter().map(|r| r.sanitized_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/generateLiveKitToken",
                "https://api.example.com/getLiveKitRoomStatus",
            ]
        );
        assert_eq!(recorder.recent_comms(1).len(), 1);
    }

    #[test]
    fn test_requests_per_minute_counts_last_minute_only() {
        let recorder = recorder(10);
        let now = Utc::now();
        let mut old = NetworkRequestReport::completed("https://a.example.com/x", 200, 1);
        old.captured_at = Some(now - chrono::Duration::minutes(3));
        recorder.record(old);
        recorder.record(NetworkRequestReport::completed("https://a.example.com/y", 200, 1));
        recorder.record(NetworkRequestReport::completed("https://a.example.com/z", 200, 1));

        assert_eq!(recorder.requests_per_minute(Utc::now()), 2);
        assert_eq!(recorder.total_recorded(), 3);
    }

    #[test]
    fn test_capacity_bound() {
        let recorder = recorder(3);
        for i in 0..10 {
            recorder.record(NetworkRequestReport::completed(
                format!("https://a.example.com/{i}"),
                200,
                1,
            ));
        }
        let all = recorder.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].sanitized_url, "https://a.example.com/9");
        assert_eq!(all[2].sanitized_url, "https://a.example.com/7");
    }

    #[test]
    fn test_clear_keeps_verbose_setting() {
        let recorder = recorder(3);
        recorder.policy().set_verbose(true);
        recorder.record(NetworkRequestReport::completed("https://a.example.com/x", 200, 1));
        recorder.clear();
        assert!(recorder.all().is_empty());
        assert_eq!(recorder.total_recorded(), 0);
        assert!(recorder.policy().is_verbose());
    }

    #[test]
    fn test_report_deserializes_with_optional_fields() {
        let report: NetworkRequestReport = serde_json::from_str(
            r#"{"url": "https://a.example.com/x", "status_code": 204, "duration_ms": 9}"#,
        )
        .unwrap();
        assert_eq!(report.status_code, 204);
        assert!(report.error_message.is_none());
        assert!(report.captured_at.is_none());
    }
}
