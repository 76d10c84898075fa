//! Voice net connection quality.
//!
//! The voice transport reports into this module from its connection-state
//! and periodic-ping callbacks. Each net moves through a small state machine:
//!
//! ```text
//! Idle --connection_start--> Connecting --connection_success--> Connected
//!               ^                  |
//!               +--- start again --+   (replaces the pending attempt)
//! ```
//!
//! A success without a pending attempt is a no-op: duplicate connection
//! events are expected during reconnect storms. Net entries are created on
//! first observation and live until [`VoiceTelemetry::clear`].

use crate::ring_buffer::{lock, RingBuffer};
use common::types::NetId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Accumulated metrics for one voice net.
#[derive(Debug, Clone)]
pub struct NetTelemetry {
    pub net_id: NetId,
    /// Human-readable net code; refreshed without losing history.
    pub net_label: String,
    /// Time from connection start to success, ms, newest-first.
    pub connection_durations: RingBuffer<f64>,
    /// Monotonic, zeroed only by a full reset.
    pub reconnect_attempts: u64,
    /// Round-trip latency samples, ms, newest-first.
    pub latency_samples: RingBuffer<f64>,
    /// Absolute differences between consecutive latency samples, ms.
    pub jitter_samples: RingBuffer<f64>,
    pub last_latency: Option<f64>,
}

impl NetTelemetry {
    fn new(
        net_id: NetId,
        label: Option<&str>,
        connection_capacity: usize,
        sample_capacity: usize,
    ) -> Self {
        let net_label = label
            .filter(|l| !l.trim().is_empty())
            .map_or_else(|| net_id.to_string(), ToString::to_string);
        Self {
            net_id,
            net_label,
            connection_durations: RingBuffer::with_capacity(connection_capacity),
            reconnect_attempts: 0,
            latency_samples: RingBuffer::with_capacity(sample_capacity),
            jitter_samples: RingBuffer::with_capacity(sample_capacity),
            last_latency: None,
        }
    }

    fn refresh_label(&mut self, label: Option<&str>) {
        if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
            if self.net_label != label {
                self.net_label = label.to_string();
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> NetSummary {
        NetSummary {
            net_id: self.net_id.clone(),
            net_code: self.net_label.clone(),
            avg_connection_time_ms: self.connection_durations.mean(),
            avg_jitter_ms: self.jitter_samples.mean(),
            reconnect_attempts: self.reconnect_attempts,
            sample_count: self.latency_samples.len(),
        }
    }
}

/// Per-net figures shown in the diagnostics panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetSummary {
    pub net_id: NetId,
    pub net_code: String,
    /// `None` until a connection attempt has completed.
    pub avg_connection_time_ms: Option<f64>,
    /// `None` until two latency samples have arrived.
    pub avg_jitter_ms: Option<f64>,
    pub reconnect_attempts: u64,
    pub sample_count: usize,
}

#[derive(Debug, Default)]
struct VoiceState {
    nets: BTreeMap<NetId, NetTelemetry>,
    pending: HashMap<NetId, Instant>,
}

/// Aggregates connection timing, reconnects, latency and jitter per net.
#[derive(Debug)]
pub struct VoiceTelemetry {
    state: Mutex<VoiceState>,
    connection_capacity: usize,
    sample_capacity: usize,
}

impl VoiceTelemetry {
    #[must_use]
    pub fn new(connection_capacity: usize, sample_capacity: usize) -> Self {
        Self {
            state: Mutex::new(VoiceState::default()),
            connection_capacity,
            sample_capacity,
        }
    }

    /// Mark the start of a connection attempt, replacing any pending one.
    pub fn record_connection_start(&self, net_id: &NetId, label: Option<&str>) {
        let mut state = lock(&self.state);
        self.entry(&mut state, net_id, label);
        let replaced = state.pending.insert(net_id.clone(), Instant::now()).is_some();

        debug!(
            target: "comms.telemetry.voice",
            net_id = %net_id,
            replaced_pending = replaced,
            "Connection attempt started"
        );
    }

    /// Complete the pending attempt for `net_id`, if there is one.
    pub fn record_connection_success(&self, net_id: &NetId) {
        let mut state = lock(&self.state);
        let Some(started) = state.pending.remove(net_id) else {
            trace!(
                target: "comms.telemetry.voice",
                net_id = %net_id,
                "Connection success without pending attempt ignored"
            );
            return;
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(net) = state.nets.get_mut(net_id) {
            net.connection_durations.push(elapsed_ms);
        }

        info!(
            target: "comms.telemetry.voice",
            net_id = %net_id,
            connection_ms = elapsed_ms,
            "Voice net connected"
        );
    }

    /// Count a reconnect attempt.
    pub fn record_reconnect_attempt(&self, net_id: &NetId, label: Option<&str>) {
        let mut state = lock(&self.state);
        let net = self.entry(&mut state, net_id, label);
        net.reconnect_attempts = net.reconnect_attempts.saturating_add(1);

        info!(
            target: "comms.telemetry.voice",
            net_id = %net_id,
            reconnect_attempts = net.reconnect_attempts,
            "Voice net reconnecting"
        );
    }

    /// Add a latency sample and derive jitter from the previous one.
    ///
    /// Non-finite and negative samples are ignored.
    pub fn record_latency_sample(&self, net_id: &NetId, latency_ms: f64, label: Option<&str>) {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            trace!(
                target: "comms.telemetry.voice",
                net_id = %net_id,
                latency_ms,
                "Invalid latency sample ignored"
            );
            return;
        }

        let mut state = lock(&self.state);
        let net = self.entry(&mut state, net_id, label);
        net.latency_samples.push(latency_ms);
        if let Some(last) = net.last_latency {
            net.jitter_samples.push((latency_ms - last).abs());
        }
        // Seeds the next jitter computation, including on the first sample
        net.last_latency = Some(latency_ms);
    }

    /// Summaries for every observed net, ordered by net id.
    #[must_use]
    pub fn summaries(&self) -> Vec<NetSummary> {
        lock(&self.state)
            .nets
            .values()
            .map(NetTelemetry::summary)
            .collect()
    }

    /// Full record for one net.
    #[must_use]
    pub fn net(&self, net_id: &NetId) -> Option<NetTelemetry> {
        lock(&self.state).nets.get(net_id).cloned()
    }

    /// Whether a connection attempt is pending for `net_id`.
    #[must_use]
    pub fn is_connecting(&self, net_id: &NetId) -> bool {
        lock(&self.state).pending.contains_key(net_id)
    }

    /// Forget every net and pending attempt.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.nets.clear();
        state.pending.clear();
    }

    fn entry<'a>(
        &self,
        state: &'a mut VoiceState,
        net_id: &NetId,
        label: Option<&str>,
    ) -> &'a mut NetTelemetry {
        let net = state.nets.entry(net_id.clone()).or_insert_with(|| {
            debug!(target: "comms.telemetry.voice", net_id = %net_id, "Tracking new voice net");
            NetTelemetry::new(
                net_id.clone(),
                label,
                self.connection_capacity,
                self.sample_capacity,
            )
        });
        net.refresh_label(label);
        net
    }
}
