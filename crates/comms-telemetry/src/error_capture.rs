//! Runtime error capture.
//!
//! Two signal sources feed the error buffer:
//!
//! - **Uncaught**: panics on any thread, observed through a process-wide
//!   panic hook that chains to whatever hook was installed before it.
//! - **Unhandled rejection**: spawned tasks whose `Err` result nobody
//!   observed, reported through [`ErrorCapture::spawn_tracked`] or
//!   [`ErrorCapture::record_rejection`].
//!
//! Ingestion never fails. Payloads with missing or wrong-typed fields are
//! normalized with `None` for the absent parts.

use crate::health::within_window;
use crate::ring_buffer::{lock, RingBuffer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::future::Future;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default look-back window for [`ErrorCapture::recent`] (5 minutes).
pub const DEFAULT_RECENT_ERROR_WINDOW: Duration = Duration::from_secs(300);

/// Message used when a report carries none.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Buffered notifications per subscriber before it starts lagging.
const SUBSCRIBER_CAPACITY: usize = 64;

/// Origin of a captured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Panic or otherwise uncaught failure.
    Uncaught,
    /// Failed asynchronous task whose error nobody handled.
    UnhandledRejection,
}

impl ErrorKind {
    /// Returns the kind as a string for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Uncaught => "uncaught",
            ErrorKind::UnhandledRejection => "unhandled_rejection",
        }
    }

    /// Lenient parse used at the ingestion boundary.
    fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "uncaught" | "error" | "panic" => Some(ErrorKind::Uncaught),
            "unhandledrejection" | "rejection" => Some(ErrorKind::UnhandledRejection),
            _ => None,
        }
    }
}

/// Raw error payload as reported by a signal source or an external caller.
///
/// Every field is optional; [`ErrorCapture::record`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawErrorReport {
    pub kind: Option<ErrorKind>,
    pub message: Option<String>,
    pub source_location: Option<String>,
    pub stack_trace: Option<String>,
    /// Time the error occurred, when the reporter knows it. Defaults to now.
    pub captured_at: Option<DateTime<Utc>>,
}

impl RawErrorReport {
    /// Convenience constructor for a report with just a kind and message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Build a report from an arbitrary JSON payload.
    ///
    /// Wrong-typed or missing fields become `None`; non-string messages are
    /// rendered as compact JSON rather than dropped. Both `snake_case` and
    /// `camelCase` field names are accepted.
    #[must_use]
    pub fn from_json(payload: &Value) -> Self {
        let field = |snake: &str, camel: &str| payload.get(snake).or_else(|| payload.get(camel));
        let text = |snake: &str, camel: &str| {
            field(snake, camel)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };

        let message = match field("message", "message") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Self {
            kind: field("kind", "type")
                .and_then(Value::as_str)
                .and_then(ErrorKind::parse),
            message,
            source_location: text("source_location", "sourceLocation"),
            stack_trace: text("stack_trace", "stackTrace"),
            captured_at: text("captured_at", "capturedAt")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());

        let source_location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

        // Honors RUST_BACKTRACE; capture is skipped entirely when disabled
        let backtrace = Backtrace::capture();
        let stack_trace =
            (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string());

        Self {
            kind: Some(ErrorKind::Uncaught),
            message,
            source_location,
            stack_trace,
            captured_at: None,
        }
    }
}

/// Normalized, immutable error record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub source_location: Option<String>,
    pub stack_trace: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl From<RawErrorReport> for ErrorRecord {
    fn from(report: RawErrorReport) -> Self {
        Self {
            kind: report.kind.unwrap_or(ErrorKind::Uncaught),
            message: report
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            source_location: report.source_location,
            stack_trace: report.stack_trace,
            captured_at: report.captured_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Bounded store of captured errors plus the hooks that feed it.
#[derive(Debug)]
pub struct ErrorCapture {
    buffer: Mutex<RingBuffer<ErrorRecord>>,
    total_captured: AtomicU64,
    notifier: broadcast::Sender<ErrorRecord>,
    installed: AtomicBool,
}

impl ErrorCapture {
    /// Create an empty capture holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            buffer: Mutex::new(RingBuffer::with_capacity(capacity)),
            total_captured: AtomicU64::new(0),
            notifier,
            installed: AtomicBool::new(false),
        }
    }

    /// Register the panic hook for this capture.
    ///
    /// Returns `true` when the hook was registered by this call and `false`
    /// when it was already in place; a second call never double-registers.
    /// The hook keeps only a weak reference, so dropping the capture turns
    /// it into a pass-through to the previous hook.
    pub fn install(self: &Arc<Self>) -> bool {
        if self
            .installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(target: "comms.telemetry.errors", "Panic hook already installed");
            return false;
        }

        let capture = Arc::downgrade(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(capture) = capture.upgrade() {
                capture.record(RawErrorReport::from_panic(info));
            }
            previous(info);
        }));

        debug!(target: "comms.telemetry.errors", "Panic hook installed");
        true
    }

    /// Whether [`install`](Self::install) has run for this capture.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Normalize and store a report, then notify subscribers.
    pub fn record(&self, report: RawErrorReport) -> ErrorRecord {
        let record = ErrorRecord::from(report);

        lock(&self.buffer).push(record.clone());
        self.total_captured.fetch_add(1, Ordering::Relaxed);

        warn!(
            target: "comms.telemetry.errors",
            kind = record.kind.as_str(),
            message = %record.message,
            source_location = record.source_location.as_deref().unwrap_or("unknown"),
            "Error captured"
        );

        // No live subscriber is the common case
        let _ = self.notifier.send(record.clone());
        record
    }

    /// Record an error that a background task returned and nobody handled.
    pub fn record_rejection(&self, error: &(dyn std::error::Error + 'static)) -> ErrorRecord {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        self.record(RawErrorReport::new(ErrorKind::UnhandledRejection, message))
    }

    /// Spawn a fallible task whose error, if any, is captured as an
    /// unhandled rejection.
    ///
    /// Returns `None` (and spawns nothing) when called outside a Tokio
    /// runtime.
    pub fn spawn_tracked<F, E>(self: &Arc<Self>, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                target: "comms.telemetry.errors",
                "spawn_tracked called outside a Tokio runtime; task not started"
            );
            return None;
        };

        let capture = Arc::downgrade(self);
        Some(handle.spawn(async move {
            if let Err(e) = task.await {
                if let Some(capture) = capture.upgrade() {
                    capture.record_rejection(&e);
                }
            }
        }))
    }

    /// Up to `limit` records captured within `window` of `now`, newest-first.
    ///
    /// Older records stay stored; they are only excluded from the result.
    #[must_use]
    pub fn recent(&self, limit: usize, window: Duration, now: DateTime<Utc>) -> Vec<ErrorRecord> {
        lock(&self.buffer)
            .iter()
            .filter(|r| within_window(r.captured_at, now, window))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Every buffered record, newest-first.
    #[must_use]
    pub fn all(&self) -> Vec<ErrorRecord> {
        lock(&self.buffer).all()
    }

    /// Number of currently buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.buffer).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.buffer).is_empty()
    }

    /// Errors captured since construction or the last reset.
    #[must_use]
    pub fn total_captured(&self) -> u64 {
        self.total_captured.load(Ordering::Relaxed)
    }

    /// Receive every record captured from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorRecord> {
        self.notifier.subscribe()
    }

    /// Drop all records and zero the lifetime total. The panic hook stays
    /// installed.
    pub fn clear(&self) {
        lock(&self.buffer).clear();
        self.total_captured.store(0, Ordering::Relaxed);
    }
}
