//! Diagnostics snapshot read by the admin panel.
//!
//! The snapshot is rebuilt on every request and never stored. Fields are
//! read one store at a time, so a snapshot taken while writers are active
//! is best-effort rather than transactionally consistent across fields.

use crate::auxiliary::{HeartbeatRecord, ModeFlags, SeedRunRecord};
use crate::collector::Collector;
use crate::error_capture::{ErrorRecord, DEFAULT_RECENT_ERROR_WINDOW};
use crate::health::{classify, HealthReport};
use crate::network::NetworkRequestRecord;
use crate::voice::NetSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Recent errors included in a snapshot.
pub const SUMMARY_RECENT_ERRORS: usize = 5;

/// Comms requests included in a snapshot.
pub const SUMMARY_COMMS_REQUESTS: usize = 10;

/// Counters since process start or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifetimeTotals {
    pub errors_captured: u64,
    pub requests_recorded: u64,
    pub heartbeats_received: u64,
    pub seed_wipe_runs: u64,
}

/// Point-in-time aggregation of all collector state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub health: HealthReport,
    pub latest_heartbeat: Option<HeartbeatRecord>,
    pub last_seed_wipe_run: Option<SeedRunRecord>,
    pub recent_errors: Vec<ErrorRecord>,
    pub requests_per_minute: usize,
    pub modes: ModeFlags,
    pub totals: LifetimeTotals,
    pub comms_requests: Vec<NetworkRequestRecord>,
    pub nets: Vec<NetSummary>,
}

impl DiagnosticsSnapshot {
    /// Snapshot with no data, rendered as GREEN.
    #[must_use]
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            health: HealthReport::unknown(),
            latest_heartbeat: None,
            last_seed_wipe_run: None,
            recent_errors: Vec::new(),
            requests_per_minute: 0,
            modes: ModeFlags::default(),
            totals: LifetimeTotals::default(),
            comms_requests: Vec::new(),
            nets: Vec::new(),
        }
    }

    /// Assemble a snapshot from the live collector state.
    #[must_use]
    pub fn collect(collector: &Collector, now: DateTime<Utc>) -> Self {
        let errors = collector.errors().all();
        let requests = collector.network().all();
        let health = classify(&errors, &requests, now, collector.thresholds());

        let recent_errors = collector.errors().recent(
            SUMMARY_RECENT_ERRORS,
            DEFAULT_RECENT_ERROR_WINDOW,
            now,
        );

        let aux = collector.auxiliary();
        let network = collector.network();

        Self {
            generated_at: now,
            health,
            latest_heartbeat: aux.latest_heartbeat(),
            last_seed_wipe_run: aux.last_seed_wipe_run(),
            recent_errors,
            requests_per_minute: network.requests_per_minute(now),
            modes: aux.mode_flags(network.policy().is_verbose()),
            totals: LifetimeTotals {
                errors_captured: collector.errors().total_captured(),
                requests_recorded: network.total_recorded(),
                heartbeats_received: aux.heartbeats_received(),
                seed_wipe_runs: aux.seed_wipe_runs(),
            },
            comms_requests: network.recent_comms(SUMMARY_COMMS_REQUESTS),
            nets: collector.voice().summaries(),
        }
    }
}
