//! Comms health classification.
//!
//! Derives a three-state signal from the error and network buffers:
//!
//! | Status | Condition (evaluated in order)                                              |
//! |--------|-----------------------------------------------------------------------------|
//! | GREEN  | errors <= 0 and failures < 2                                                |
//! | AMBER  | errors <= 3, or failures > 2 and failures < 0.5 x requests in the last minute |
//! | RED    | otherwise                                                                   |
//!
//! Errors are counted over the last 5 minutes. Failures (status 0 or >= 500)
//! are counted over the whole request buffer, whose fixed capacity bounds
//! recency. Every constant above is a `HealthThresholds` field.
//!
//! Classification is a pure function of the records and `now`; nothing is
//! cached between calls.

use crate::error_capture::ErrorRecord;
use crate::network::NetworkRequestRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Default window for counting recent errors (5 minutes).
pub const DEFAULT_ERROR_WINDOW: Duration = Duration::from_secs(300);

/// Default window for counting recent requests (1 minute).
pub const DEFAULT_REQUEST_WINDOW: Duration = Duration::from_secs(60);

/// Comms health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Green,
    Amber,
    Red,
}

impl HealthStatus {
    /// Returns the status as a string for logs and labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Green => "GREEN",
            HealthStatus::Amber => "AMBER",
            HealthStatus::Red => "RED",
        }
    }
}

/// Tunable classification thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthThresholds {
    /// Window for counting recent errors.
    pub error_window: Duration,
    /// Window for counting recent requests (ratio denominator).
    pub request_window: Duration,
    /// GREEN requires at most this many recent errors.
    pub green_max_errors: usize,
    /// GREEN requires strictly fewer network failures than this.
    pub green_max_failures: usize,
    /// AMBER error branch: at most this many recent errors.
    pub amber_max_errors: usize,
    /// AMBER network branch: strictly more failures than this.
    pub amber_min_failures: usize,
    /// AMBER network branch: failures below this share of recent requests.
    pub amber_failure_ratio: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            error_window: DEFAULT_ERROR_WINDOW,
            request_window: DEFAULT_REQUEST_WINDOW,
            green_max_errors: 0,
            green_max_failures: 2,
            amber_max_errors: 3,
            amber_min_failures: 2,
            amber_failure_ratio: 0.5,
        }
    }
}

/// Classification result with the counts it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub recent_error_count: usize,
    pub network_failure_count: usize,
    pub recent_request_count: usize,
}

impl HealthReport {
    /// Report shown when no collector state is available.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            status: HealthStatus::Green,
            recent_error_count: 0,
            network_failure_count: 0,
            recent_request_count: 0,
        }
    }
}

/// Classify the current collector state.
#[must_use]
pub fn classify(
    errors: &[ErrorRecord],
    requests: &[NetworkRequestRecord],
    now: DateTime<Utc>,
    thresholds: &HealthThresholds,
) -> HealthReport {
    let recent_error_count = errors
        .iter()
        .filter(|e| within_window(e.captured_at, now, thresholds.error_window))
        .count();
    let network_failure_count = requests.iter().filter(|r| r.is_failure()).count();
    let recent_request_count = requests
        .iter()
        .filter(|r| within_window(r.captured_at, now, thresholds.request_window))
        .count();

    let status = classify_counts(
        recent_error_count,
        network_failure_count,
        recent_request_count,
        thresholds,
    );

    HealthReport {
        status,
        recent_error_count,
        network_failure_count,
        recent_request_count,
    }
}

/// Apply the classification rules to precomputed counts.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Counts are bounded by buffer capacity
pub fn classify_counts(
    recent_errors: usize,
    network_failures: usize,
    recent_requests: usize,
    thresholds: &HealthThresholds,
) -> HealthStatus {
    if recent_errors <= thresholds.green_max_errors
        && network_failures < thresholds.green_max_failures
    {
        return HealthStatus::Green;
    }

    // With no recent requests the ratio clause is false, not indeterminate
    let degraded_network = recent_requests > 0
        && network_failures > thresholds.amber_min_failures
        && (network_failures as f64) < thresholds.amber_failure_ratio * recent_requests as f64;

    if recent_errors <= thresholds.amber_max_errors || degraded_network {
        HealthStatus::Amber
    } else {
        HealthStatus::Red
    }
}

/// Whether `captured_at` falls within `window` before `now`.
///
/// Timestamps ahead of `now` (clock skew between reporters) count as recent.
pub(crate) fn within_window(
    captured_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    match chrono::Duration::from_std(window) {
        Ok(window) => now.signed_duration_since(captured_at) <= window,
        // Window too large to represent: everything is recent
        Err(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error_capture::ErrorKind;

    fn error_at(now: DateTime<Utc>, age_secs: i64) -> ErrorRecord {
        ErrorRecord {
            kind: ErrorKind::Uncaught,
            message: "boom".to_string(),
            source_location: None,
            stack_trace: None,
            captured_at: now - chrono::Duration::seconds(age_secs),
        }
    }

    fn request_at(now: DateTime<Utc>, status_code: u16, age_secs: i64) -> NetworkRequestRecord {
        NetworkRequestRecord {
            sanitized_url: "https://api.example.com/getLiveKitRoomStatus".to_string(),
            status_code,
            duration_ms: 12,
            error_message: None,
            captured_at: now - chrono::Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_clean_state_is_green() {
        let now = Utc::now();
        let report = classify(&[], &[], now, &HealthThresholds::default());
        assert_eq!(report.status, HealthStatus::Green);
        assert_eq!(report, HealthReport::unknown());
    }

    #[test]
    fn test_single_failure_without_errors_is_green() {
        let now = Utc::now();
        let requests = vec![request_at(now, 503, 5), request_at(now, 200, 5)];
        let report = classify(&[], &requests, now, &HealthThresholds::default());
        assert_eq!(report.status, HealthStatus::Green);
        assert_eq!(report.network_failure_count, 1);
    }

    #[test]
    fn test_two_errors_one_failure_is_amber() {
        let now = Utc::now();
        let errors = vec![error_at(now, 10), error_at(now, 20)];
        let requests = vec![request_at(now, 0, 5)];
        let report = classify(&errors, &requests, now, &HealthThresholds::default());
        assert_eq!(report.status, HealthStatus::Amber);
        assert_eq!(report.recent_error_count, 2);
        assert_eq!(report.network_failure_count, 1);
    }

    #[test]
    fn test_five_errors_is_red() {
        let now = Utc::now();
        let errors: Vec<_> = (0..5).map(|i| error_at(now, i * 10)).collect();
        let report = classify(&errors, &[], now, &HealthThresholds::default());
        assert_eq!(report.status, HealthStatus::Red);
    }

    #[test]
    fn test_old_errors_fall_out_of_window() {
        let now = Utc::now();
        let errors: Vec<_> = (0..5).map(|_| error_at(now, 600)).collect();
        let report = classify(&errors, &[], now, &HealthThresholds::default());
        assert_eq!(report.recent_error_count, 0);
        assert_eq!(report.status, HealthStatus::Green);
    }

    #[test]
    fn test_failures_counted_over_whole_buffer() {
        let now = Utc::now();
        // Failures older than any window still count
        let requests = vec![request_at(now, 500, 3600), request_at(now, 0, 3600)];
        let report = classify(&[], &requests, now, &HealthThresholds::default());
        assert_eq!(report.network_failure_count, 2);
        assert_eq!(report.recent_request_count, 0);
        // Two failures: not GREEN; no errors so the error branch gives AMBER
        assert_eq!(report.status, HealthStatus::Amber);
    }

    #[test]
    fn test_4xx_is_not_a_failure() {
        let now = Utc::now();
        let requests = vec![request_at(now, 404, 1), request_at(now, 401, 1)];
        let report = classify(&[], &requests, now, &HealthThresholds::default());
        assert_eq!(report.network_failure_count, 0);
    }

    #[test]
    fn test_ratio_clause_rescues_many_errors() {
        let thresholds = HealthThresholds::default();
        // 5 errors alone is RED, but 3 failures among 10 recent requests is AMBER
        assert_eq!(classify_counts(5, 3, 10, &thresholds), HealthStatus::Amber);
        // Ratio not satisfied: 3 failures of 6 requests is not below half
        assert_eq!(classify_counts(5, 3, 6, &thresholds), HealthStatus::Red);
    }

    #[test]
    fn test_ratio_clause_false_without_recent_requests() {
        let thresholds = HealthThresholds::default();
        assert_eq!(classify_counts(5, 3, 0, &thresholds), HealthStatus::Red);
        assert_eq!(classify_counts(3, 3, 0, &thresholds), HealthStatus::Amber);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = HealthThresholds {
            green_max_errors: 1,
            amber_max_errors: 10,
            ..HealthThresholds::default()
        };
        assert_eq!(classify_counts(1, 0, 0, &thresholds), HealthStatus::Green);
        assert_eq!(classify_counts(8, 0, 0, &thresholds), HealthStatus::Amber);
        assert_eq!(classify_counts(11, 0, 0, &thresholds), HealthStatus::Red);
    }

    #[test]
    fn test_within_window_edges() {
        let now = Utc::now();
        let window = Duration::from_secs(60);
        assert!(within_window(now - chrono::Duration::seconds(60), now, window));
        assert!(!within_window(now - chrono::Duration::seconds(61), now, window));
        assert!(within_window(now + chrono::Duration::seconds(5), now, window));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Amber).unwrap(),
            "\"AMBER\""
        );
        assert_eq!(HealthStatus::Red.as_str(), "RED");
    }
}
