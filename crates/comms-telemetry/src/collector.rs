//! The collector service and its no-op stand-in.
//!
//! [`CommsTelemetry`] is the whole operation set callers see. [`Collector`]
//! implements it over the error, network, voice and auxiliary stores;
//! [`NoopCollector`] implements it by recording nothing, so code that holds
//! an `Arc<dyn CommsTelemetry>` never needs to check whether telemetry is
//! available.
//!
//! Every operation is synchronous and total: none blocks on I/O, none
//! returns an error, none panics.

use crate::auxiliary::{AuxiliaryState, SeedWipeRun};
use crate::config::Config;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::error_capture::{
    ErrorCapture, ErrorRecord, RawErrorReport, DEFAULT_RECENT_ERROR_WINDOW,
};
use crate::health::{classify, HealthReport, HealthStatus, HealthThresholds};
use crate::network::{NetworkRecorder, NetworkRequestRecord, NetworkRequestReport, RecordingPolicy};
use crate::voice::{NetSummary, NetTelemetry, VoiceTelemetry};
use chrono::Utc;
use common::types::{EventId, NetId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Operations exposed to the application, the voice transport and the
/// diagnostics surface.
pub trait CommsTelemetry: Send + Sync + fmt::Debug {
    /// Register the panic hook. Idempotent; returns `true` on first install.
    fn install_error_capture(&self) -> bool;

    // Ingestion

    fn record_error(&self, report: RawErrorReport);
    fn record_network_request(&self, report: NetworkRequestReport);

    // Queries

    /// Up to `limit` errors from the last 5 minutes, newest-first.
    fn recent_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        self.recent_errors_within(limit, DEFAULT_RECENT_ERROR_WINDOW)
    }
    fn recent_errors_within(&self, limit: usize, window: Duration) -> Vec<ErrorRecord>;
    fn recent_comms_requests(&self, limit: usize) -> Vec<NetworkRequestRecord>;
    fn health_report(&self) -> HealthReport;
    fn health_status(&self) -> HealthStatus {
        self.health_report().status
    }
    fn requests_per_minute(&self) -> usize;
    fn diagnostics_summary(&self) -> DiagnosticsSnapshot;
    fn subscribe_errors(&self) -> broadcast::Receiver<ErrorRecord>;

    // Auxiliary state

    fn record_subscription_heartbeat(&self, net_id: &NetId, event_id: &EventId, status: &str);
    fn record_seed_wipe_run(&self, run: SeedWipeRun);
    fn set_comms_mode(&self, mode: &str);
    fn set_livekit_env(&self, env: &str);

    // Recording policy

    fn set_verbose_requests(&self, enabled: bool);
    fn verbose_requests_enabled(&self) -> bool;
    /// Whether an interceptor should record a call to `url`.
    fn should_record_request(&self, url: &str) -> bool;

    // Voice nets

    fn record_connection_start(&self, net_id: &NetId, label: Option<&str>);
    fn record_connection_success(&self, net_id: &NetId);
    fn record_reconnect_attempt(&self, net_id: &NetId, label: Option<&str>);
    fn record_latency_sample(&self, net_id: &NetId, latency_ms: f64, label: Option<&str>);
    fn net_summaries(&self) -> Vec<NetSummary>;

    /// Clear every buffer, counter and net in place.
    fn reset(&self);

    /// Whether this is the stand-in that records nothing.
    fn is_noop(&self) -> bool {
        false
    }
}

/// The real collector.
#[derive(Debug)]
pub struct Collector {
    errors: Arc<ErrorCapture>,
    network: NetworkRecorder,
    voice: VoiceTelemetry,
    auxiliary: AuxiliaryState,
    thresholds: HealthThresholds,
}

impl Collector {
    /// Build a collector sized and tuned by `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let policy = RecordingPolicy::new(
            config.critical_endpoints.clone(),
            config.verbose_requests,
        );

        info!(
            target: "comms.telemetry.lifecycle",
            environment = %config.environment,
            verbose_requests = config.verbose_requests,
            error_capacity = config.error_capacity,
            request_capacity = config.request_capacity,
            "Comms telemetry collector created"
        );

        Self {
            errors: Arc::new(ErrorCapture::new(config.error_capacity)),
            network: NetworkRecorder::new(config.request_capacity, policy),
            voice: VoiceTelemetry::new(
                config.connection_sample_capacity,
                config.voice_sample_capacity,
            ),
            auxiliary: AuxiliaryState::new(),
            thresholds: config.health.clone(),
        }
    }

    /// Build a shared collector.
    #[must_use]
    pub fn shared(config: &Config) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    #[must_use]
    pub fn errors(&self) -> &Arc<ErrorCapture> {
        &self.errors
    }

    #[must_use]
    pub fn network(&self) -> &NetworkRecorder {
        &self.network
    }

    #[must_use]
    pub fn voice(&self) -> &VoiceTelemetry {
        &self.voice
    }

    #[must_use]
    pub fn auxiliary(&self) -> &AuxiliaryState {
        &self.auxiliary
    }

    #[must_use]
    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Full record for one net.
    #[must_use]
    pub fn net_telemetry(&self, net_id: &NetId) -> Option<NetTelemetry> {
        self.voice.net(net_id)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl CommsTelemetry for Collector {
    fn install_error_capture(&self) -> bool {
        self.errors.install()
    }

    fn record_error(&self, report: RawErrorReport) {
        self.errors.record(report);
    }

    fn record_network_request(&self, report: NetworkRequestReport) {
        self.network.record(report);
    }

    fn recent_errors_within(&self, limit: usize, window: Duration) -> Vec<ErrorRecord> {
        self.errors.recent(limit, window, Utc::now())
    }

    fn recent_comms_requests(&self, limit: usize) -> Vec<NetworkRequestRecord> {
        self.network.recent_comms(limit)
    }

    fn health_report(&self) -> HealthReport {
        classify(
            &self.errors.all(),
            &self.network.all(),
            Utc::now(),
            &self.thresholds,
        )
    }

    fn requests_per_minute(&self) -> usize {
        self.network.requests_per_minute(Utc::now())
    }

    fn diagnostics_summary(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot::collect(self, Utc::now())
    }

    fn subscribe_errors(&self) -> broadcast::Receiver<ErrorRecord> {
        self.errors.subscribe()
    }

    fn record_subscription_heartbeat(&self, net_id: &NetId, event_id: &EventId, status: &str) {
        self.auxiliary.record_heartbeat(net_id, event_id, status);
    }

    fn record_seed_wipe_run(&self, run: SeedWipeRun) {
        self.auxiliary.record_seed_wipe_run(run);
    }

    fn set_comms_mode(&self, mode: &str) {
        self.auxiliary.set_comms_mode(mode);
    }

    fn set_livekit_env(&self, env: &str) {
        self.auxiliary.set_livekit_env(env);
    }

    fn set_verbose_requests(&self, enabled: bool) {
        self.network.policy().set_verbose(enabled);
        info!(
            target: "comms.telemetry.network",
            verbose_requests = enabled,
            "Verbose request recording toggled"
        );
    }

    fn verbose_requests_enabled(&self) -> bool {
        self.network.policy().is_verbose()
    }

    fn should_record_request(&self, url: &str) -> bool {
        self.network.policy().should_record(url)
    }

    fn record_connection_start(&self, net_id: &NetId, label: Option<&str>) {
        self.voice.record_connection_start(net_id, label);
    }

    fn record_connection_success(&self, net_id: &NetId) {
        self.voice.record_connection_success(net_id);
    }

    fn record_reconnect_attempt(&self, net_id: &NetId, label: Option<&str>) {
        self.voice.record_reconnect_attempt(net_id, label);
    }

    fn record_latency_sample(&self, net_id: &NetId, latency_ms: f64, label: Option<&str>) {
        self.voice.record_latency_sample(net_id, latency_ms, label);
    }

    fn net_summaries(&self) -> Vec<NetSummary> {
        self.voice.summaries()
    }

    fn reset(&self) {
        self.errors.clear();
        self.network.clear();
        self.voice.clear();
        self.auxiliary.clear();
        info!(target: "comms.telemetry.lifecycle", "Comms telemetry reset");
    }
}

/// Stand-in used when the collector cannot or should not run.
///
/// Accepts every call, stores nothing, and reports GREEN with empty lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCollector;

impl CommsTelemetry for NoopCollector {
    fn install_error_capture(&self) -> bool {
        false
    }

    fn record_error(&self, _report: RawErrorReport) {}

    fn record_network_request(&self, _report: NetworkRequestReport) {}

    fn recent_errors_within(&self, _limit: usize, _window: Duration) -> Vec<ErrorRecord> {
        Vec::new()
    }

    fn recent_comms_requests(&self, _limit: usize) -> Vec<NetworkRequestRecord> {
        Vec::new()
    }

    fn health_report(&self) -> HealthReport {
        HealthReport::unknown()
    }

    fn requests_per_minute(&self) -> usize {
        0
    }

    fn diagnostics_summary(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot::empty(Utc::now())
    }

    fn subscribe_errors(&self) -> broadcast::Receiver<ErrorRecord> {
        // Sender dropped immediately: receivers observe a closed channel
        broadcast::channel(1).1
    }

    fn record_subscription_heartbeat(&self, _net_id: &NetId, _event_id: &EventId, _status: &str) {}

    fn record_seed_wipe_run(&self, _run: SeedWipeRun) {}

    fn set_comms_mode(&self, _mode: &str) {}

    fn set_livekit_env(&self, _env: &str) {}

    fn set_verbose_requests(&self, _enabled: bool) {}

    fn verbose_requests_enabled(&self) -> bool {
        false
    }

    fn should_record_request(&self, _url: &str) -> bool {
        false
    }

    fn record_connection_start(&self, _net_id: &NetId, _label: Option<&str>) {}

    fn record_connection_success(&self, _net_id: &NetId) {}

    fn record_reconnect_attempt(&self, _net_id: &NetId, _label: Option<&str>) {}

    fn record_latency_sample(&self, _net_id: &NetId, _latency_ms: f64, _label: Option<&str>) {}

    fn net_summaries(&self) -> Vec<NetSummary> {
        Vec::new()
    }

    fn reset(&self) {}

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::auxiliary::SeedOperation;
    use crate::error_capture::ErrorKind;

    fn collector() -> Collector {
        Collector::new(&Config::default())
    }

    #[test]
    fn test_trait_object_usable() {
        let telemetry: Arc<dyn CommsTelemetry> = Arc::new(collector());
        telemetry.record_error(RawErrorReport::new(ErrorKind::Uncaught, "boom"));
        assert_eq!(telemetry.recent_errors(5).len(), 1);
        assert!(!telemetry.is_noop());
    }

    #[test]
    fn test_health_reflects_recorded_state() {
        let collector = collector();
        assert_eq!(collector.health_status(), HealthStatus::Green);

        collector.record_error(RawErrorReport::new(ErrorKind::Uncaught, "a"));
        collector.record_error(RawErrorReport::new(ErrorKind::UnhandledRejection, "b"));
        collector.record_network_request(NetworkRequestReport::transport_failure(
            "https://fn.example.com/generateLiveKitToken",
            "timed out",
            30_000,
        ));
        assert_eq!(collector.health_status(), HealthStatus::Amber);

        for i in 0..3 {
            collector.record_error(RawErrorReport::new(ErrorKind::Uncaught, format!("c{i}")));
        }
        assert_eq!(collector.health_status(), HealthStatus::Red);
    }

    #[test]
    fn test_verbose_toggle() {
        let collector = collector();
        assert!(!collector.verbose_requests_enabled());
        assert!(!collector.should_record_request("https://api.example.com/members"));

        collector.set_verbose_requests(true);
        assert!(collector.verbose_requests_enabled());
        assert!(collector.should_record_request("https://api.example.com/members"));
    }

    #[test]
    fn test_reset_clears_everything_in_place() {
        let collector = collector();
        let net_id = NetId::from("ALPHA");
        collector.record_error(RawErrorReport::default());
        collector.record_network_request(NetworkRequestReport::completed(
            "https://api.example.com/getLiveKitRoomStatus",
            200,
            10,
        ));
        collector.record_reconnect_attempt(&net_id, Some("Alpha"));
        collector.record_latency_sample(&net_id, 40.0, None);
        collector.record_subscription_heartbeat(&net_id, &EventId::from("evt"), "SUBSCRIBED");
        collector.record_seed_wipe_run(SeedWipeRun {
            operation: SeedOperation::Seed,
            success: true,
            records_affected: Some(12),
            duration_ms: None,
            message: None,
        });
        collector.set_comms_mode("livekit");

        collector.reset();

        let snapshot = collector.diagnostics_summary();
        assert!(snapshot.recent_errors.is_empty());
        assert!(snapshot.comms_requests.is_empty());
        assert!(snapshot.nets.is_empty());
        assert!(snapshot.latest_heartbeat.is_none());
        assert!(snapshot.last_seed_wipe_run.is_none());
        assert!(snapshot.modes.comms_mode.is_none());
        assert_eq!(snapshot.totals, crate::diagnostics::LifetimeTotals::default());
        assert_eq!(snapshot.requests_per_minute, 0);

        // Still fully usable afterwards
        collector.record_reconnect_attempt(&net_id, None);
        assert_eq!(collector.net_summaries()[0].reconnect_attempts, 1);
    }

    #[test]
    fn test_noop_accepts_everything() {
        let noop: Arc<dyn CommsTelemetry> = Arc::new(NoopCollector);
        let net_id = NetId::from("ALPHA");

        assert!(!noop.install_error_capture());
        noop.record_error(RawErrorReport::default());
        noop.record_network_request(NetworkRequestReport::completed("https://x/y", 500, 1));
        noop.record_connection_start(&net_id, None);
        noop.record_connection_success(&net_id);
        noop.record_latency_sample(&net_id, 10.0, None);
        noop.set_verbose_requests(true);
        noop.reset();

        assert!(noop.is_noop());
        assert!(noop.recent_errors(5).is_empty());
        assert!(noop.net_summaries().is_empty());
        assert!(!noop.verbose_requests_enabled());
        assert_eq!(noop.health_status(), HealthStatus::Green);
        assert_eq!(noop.diagnostics_summary().health, HealthReport::unknown());
    }

    #[tokio::test]
    async fn test_noop_subscription_is_closed() {
        let mut rx = NoopCollector.subscribe_errors();
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
