//! Single-slot operational state shown alongside the telemetry buffers:
//! the latest subscription heartbeat, the last seed/wipe run and the current
//! comms mode flags.

use crate::ring_buffer::lock;
use chrono::{DateTime, Utc};
use common::types::{EventId, NetId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Latest realtime-subscription heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatRecord {
    pub net_id: NetId,
    pub event_id: EventId,
    pub status: String,
    pub received_at: DateTime<Utc>,
}

/// Kind of data maintenance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedOperation {
    Seed,
    Wipe,
}

impl SeedOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SeedOperation::Seed => "seed",
            SeedOperation::Wipe => "wipe",
        }
    }
}

/// Outcome of a seed or wipe run as reported by the admin tooling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedWipeRun {
    pub operation: SeedOperation,
    pub success: bool,
    #[serde(default)]
    pub records_affected: Option<u64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Stored seed or wipe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedRunRecord {
    pub operation: SeedOperation,
    pub success: bool,
    pub records_affected: Option<u64>,
    pub duration_ms: Option<u64>,
    pub message: Option<String>,
    pub ran_at: DateTime<Utc>,
}

/// Current comms mode flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModeFlags {
    pub comms_mode: Option<String>,
    pub livekit_env: Option<String>,
    pub verbose_requests: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ModeState {
    comms_mode: Option<String>,
    livekit_env: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Heartbeat, seed-run and mode slots plus their lifetime counters.
#[derive(Debug, Default)]
pub struct AuxiliaryState {
    heartbeat: Mutex<Option<HeartbeatRecord>>,
    seed_run: Mutex<Option<SeedRunRecord>>,
    modes: Mutex<ModeState>,
    heartbeats_received: AtomicU64,
    seed_wipe_runs: AtomicU64,
}

impl AuxiliaryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_heartbeat(&self, net_id: &NetId, event_id: &EventId, status: &str) {
        let record = HeartbeatRecord {
            net_id: net_id.clone(),
            event_id: event_id.clone(),
            status: status.to_string(),
            received_at: Utc::now(),
        };
        debug!(
            target: "comms.telemetry.aux",
            net_id = %net_id,
            event_id = %event_id,
            status,
            "Subscription heartbeat"
        );
        *lock(&self.heartbeat) = Some(record);
        self.heartbeats_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_seed_wipe_run(&self, run: SeedWipeRun) {
        if run.success {
            info!(
                target: "comms.telemetry.aux",
                operation = run.operation.as_str(),
                records_affected = run.records_affected,
                "Seed/wipe run completed"
            );
        } else {
            warn!(
                target: "comms.telemetry.aux",
                operation = run.operation.as_str(),
                message = run.message.as_deref().unwrap_or(""),
                "Seed/wipe run failed"
            );
        }

        *lock(&self.seed_run) = Some(SeedRunRecord {
            operation: run.operation,
            success: run.success,
            records_affected: run.records_affected,
            duration_ms: run.duration_ms,
            message: run.message,
            ran_at: Utc::now(),
        });
        self.seed_wipe_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_comms_mode(&self, mode: &str) {
        let mut modes = lock(&self.modes);
        modes.comms_mode = Some(mode.to_string());
        modes.updated_at = Some(Utc::now());
        info!(target: "comms.telemetry.aux", comms_mode = mode, "Comms mode set");
    }

    pub fn set_livekit_env(&self, env: &str) {
        let mut modes = lock(&self.modes);
        modes.livekit_env = Some(env.to_string());
        modes.updated_at = Some(Utc::now());
        info!(target: "comms.telemetry.aux", livekit_env = env, "LiveKit environment set");
    }

    #[must_use]
    pub fn latest_heartbeat(&self) -> Option<HeartbeatRecord> {
        lock(&self.heartbeat).clone()
    }

    #[must_use]
    pub fn last_seed_wipe_run(&self) -> Option<SeedRunRecord> {
        lock(&self.seed_run).clone()
    }

    /// Mode flags; `verbose_requests` comes from the recording policy.
    #[must_use]
    pub fn mode_flags(&self, verbose_requests: bool) -> ModeFlags {
        let modes = lock(&self.modes);
        ModeFlags {
            comms_mode: modes.comms_mode.clone(),
            livekit_env: modes.livekit_env.clone(),
            verbose_requests,
            updated_at: modes.updated_at,
        }
    }

    #[must_use]
    pub fn heartbeats_received(&self) -> u64 {
        self.heartbeats_received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn seed_wipe_runs(&self) -> u64 {
        self.seed_wipe_runs.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        *lock(&self.heartbeat) = None;
        *lock(&self.seed_run) = None;
        *lock(&self.modes) = ModeState::default();
        self.heartbeats_received.store(0, Ordering::Relaxed);
        self.seed_wipe_runs.store(0, Ordering::Relaxed);
    }
}
