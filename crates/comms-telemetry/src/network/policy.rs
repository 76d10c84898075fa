//! URL sanitization and the request recording policy.
//!
//! Recorded URLs never keep their query string or fragment: voice-token
//! endpoints carry credentials there. The policy decides which calls are
//! worth a buffer slot. Critical comms endpoints are always recorded;
//! everything else only in verbose mode.

use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// Reduce a URL to its origin and path.
///
/// Unparseable or relative URLs fall back to truncation at the first `?`
/// or `#`.
///
/// ```
/// use comms_telemetry::network::sanitize_url;
///
/// assert_eq!(
///     sanitize_url("https://api.example.com/getLiveKitRoomStatus?token=secret123"),
///     "https://api.example.com/getLiveKitRoomStatus"
/// );
/// assert_eq!(sanitize_url("/api/commsReadiness?check=1"), "/api/commsReadiness");
/// ```
#[must_use]
pub fn sanitize_url(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw) {
        let origin = url.origin();
        if origin.is_tuple() {
            return format!("{}{}", origin.ascii_serialization(), url.path());
        }
    }

    raw.split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(raw)
        .to_string()
}

/// Decides which outbound requests are recorded.
#[derive(Debug)]
pub struct RecordingPolicy {
    critical_endpoints: Vec<String>,
    verbose: AtomicBool,
}

impl RecordingPolicy {
    /// Create a policy over the given critical endpoint fragments.
    #[must_use]
    pub fn new(critical_endpoints: Vec<String>, verbose: bool) -> Self {
        Self {
            critical_endpoints,
            verbose: AtomicBool::new(verbose),
        }
    }

    /// Toggle recording of non-critical requests.
    pub fn set_verbose(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Whether an already sanitized URL targets a critical endpoint.
    #[must_use]
    pub fn matches_critical(&self, sanitized_url: &str) -> bool {
        self.critical_endpoints
            .iter()
            .any(|fragment| sanitized_url.contains(fragment.as_str()))
    }

    /// Whether `url` targets a critical endpoint, regardless of verbose mode.
    #[must_use]
    pub fn is_critical(&self, url: &str) -> bool {
        self.matches_critical(&sanitize_url(url))
    }

    /// Whether a request to `url` should be recorded.
    #[must_use]
    pub fn should_record(&self, url: &str) -> bool {
        self.is_verbose() || self.is_critical(url)
    }

    #[must_use]
    pub fn critical_endpoints(&self) -> &[String] {
        &self.critical_endpoints
    }
}
