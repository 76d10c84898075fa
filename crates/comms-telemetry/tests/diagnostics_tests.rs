//! Diagnostics snapshot assembly, reset and the HTTP surface.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use comms_telemetry::auxiliary::SeedOperation;
use comms_telemetry::collector::{CommsTelemetry, NoopCollector};
use comms_telemetry::diagnostics::{SUMMARY_COMMS_REQUESTS, SUMMARY_RECENT_ERRORS};
use comms_telemetry::error_capture::{ErrorKind, RawErrorReport};
use comms_telemetry::health::HealthStatus;
use comms_telemetry::lifecycle;
use comms_test_utils::{
    aged_error, error_payload_json, error_report, net, record_requests, request_report,
    seed_run, small_collector, test_collector, TestTelemetryServer, ROSTER_URL, TOKEN_URL,
};
use common::types::EventId;

// ============================================================================
// Snapshot contents
// ============================================================================

#[test]
fn test_empty_snapshot() {
    let snapshot = test_collector().diagnostics_summary();
    assert_eq!(snapshot.health.status, HealthStatus::Green);
    assert!(snapshot.latest_heartbeat.is_none());
    assert!(snapshot.last_seed_wipe_run.is_none());
    assert!(snapshot.recent_errors.is_empty());
    assert!(snapshot.comms_requests.is_empty());
    assert!(snapshot.nets.is_empty());
    assert_eq!(snapshot.requests_per_minute, 0);
    assert_eq!(snapshot.totals.errors_captured, 0);
}

#[test]
fn test_snapshot_caps_lists() {
    let collector = test_collector();
    for i in 0..12 {
        collector.record_error(error_report(&format!("error {i}")));
    }
    record_requests(&collector, 0, 15);

    let snapshot = collector.diagnostics_summary();
    assert_eq!(snapshot.recent_errors.len(), SUMMARY_RECENT_ERRORS);
    assert_eq!(snapshot.recent_errors[0].message, "error 11");
    assert_eq!(snapshot.comms_requests.len(), SUMMARY_COMMS_REQUESTS);
    assert_eq!(snapshot.requests_per_minute, 15);
    assert_eq!(snapshot.totals.errors_captured, 12);
    assert_eq!(snapshot.totals.requests_recorded, 15);
    assert_eq!(snapshot.health.status, HealthStatus::Red);
}

#[test]
fn test_snapshot_excludes_stale_errors_but_totals_keep_them() {
    let collector = test_collector();
    collector.record_error(aged_error("stale", Duration::from_secs(600)));
    collector.record_error(error_report("fresh"));

    let snapshot = collector.diagnostics_summary();
    assert_eq!(snapshot.recent_errors.len(), 1);
    assert_eq!(snapshot.recent_errors[0].message, "fresh");
    assert_eq!(snapshot.totals.errors_captured, 2);
}

#[test]
fn test_buffers_evict_oldest_past_capacity() {
    let collector = small_collector(3);
    for i in 0..5 {
        collector.record_error(error_report(&format!("error {i}")));
    }
    let messages: Vec<String> = collector
        .recent_errors(10)
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(messages, vec!["error 4", "error 3", "error 2"]);
    assert_eq!(collector.errors().total_captured(), 5);
}

#[test]
fn test_snapshot_only_lists_critical_endpoints() {
    let collector = test_collector();
    collector.set_verbose_requests(true);
    collector.record_network_request(request_report(ROSTER_URL, 200));
    collector.record_network_request(request_report(TOKEN_URL, 200));

    let snapshot = collector.diagnostics_summary();
    assert_eq!(snapshot.comms_requests.len(), 1);
    assert_eq!(snapshot.requests_per_minute, 2);
    assert!(snapshot.modes.verbose_requests);
}

#[test]
fn test_snapshot_carries_auxiliary_state() {
    let collector = test_collector();
    collector.record_subscription_heartbeat(
        &net("net-alpha"),
        &EventId::from("evt-9"),
        "SUBSCRIBED",
    );
    collector.record_seed_wipe_run(seed_run(SeedOperation::Wipe, false));
    collector.set_comms_mode("livekit");
    collector.set_livekit_env("staging");

    let snapshot = collector.diagnostics_summary();
    let heartbeat = snapshot.latest_heartbeat.expect("heartbeat recorded");
    assert_eq!(heartbeat.net_id, net("net-alpha"));
    assert_eq!(heartbeat.status, "SUBSCRIBED");

    let run = snapshot.last_seed_wipe_run.expect("run recorded");
    assert_eq!(run.operation, SeedOperation::Wipe);
    assert!(!run.success);
    assert!(run.message.is_some());

    assert_eq!(snapshot.modes.comms_mode.as_deref(), Some("livekit"));
    assert_eq!(snapshot.modes.livekit_env.as_deref(), Some("staging"));
    assert_eq!(snapshot.totals.heartbeats_received, 1);
    assert_eq!(snapshot.totals.seed_wipe_runs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_includes_net_summaries() {
    let collector = test_collector();
    let bravo = net("net-bravo");
    let alpha = net("net-alpha");

    collector.record_connection_start(&bravo, Some("BRAVO"));
    tokio::time::advance(Duration::from_millis(300)).await;
    collector.record_connection_success(&bravo);
    collector.record_latency_sample(&bravo, 40.0, None);
    collector.record_latency_sample(&bravo, 60.0, None);
    collector.record_reconnect_attempt(&alpha, Some("ALPHA"));

    let nets = collector.diagnostics_summary().nets;
    assert_eq!(nets.len(), 2);
    assert_eq!(nets[0].net_code, "ALPHA");
    assert_eq!(nets[0].reconnect_attempts, 1);
    assert!(nets[0].avg_connection_time_ms.is_none());

    assert_eq!(nets[1].net_code, "BRAVO");
    let connect_ms = nets[1].avg_connection_time_ms.expect("connection timed");
    assert!((connect_ms - 300.0).abs() < 1.0);
    assert_eq!(nets[1].avg_jitter_ms, Some(20.0));
    assert_eq!(nets[1].sample_count, 2);
}

// ============================================================================
// Ingestion and subscription
// ============================================================================

#[tokio::test]
async fn test_subscribers_see_new_errors() {
    let collector = test_collector();
    let mut rx = collector.subscribe_errors();

    collector.record_error(RawErrorReport::from_json(&error_payload_json()));

    let record = rx.recv().await.unwrap();
    assert_eq!(record.kind, ErrorKind::UnhandledRejection);
    assert!(record.message.contains("room unavailable"));
    assert_eq!(record.source_location.as_deref(), Some("comms/room.ts:88:12"));
}

#[tokio::test]
async fn test_failed_tracked_task_is_captured_as_rejection() {
    let collector = test_collector();
    let mut rx = collector.subscribe_errors();

    let handle = collector
        .errors()
        .spawn_tracked(async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "token refresh reset",
            ))
        })
        .expect("inside a runtime");
    handle.await.unwrap();

    let record = rx.recv().await.unwrap();
    assert_eq!(record.kind, ErrorKind::UnhandledRejection);
    assert_eq!(record.message, "token refresh reset");
}

#[tokio::test]
async fn test_noop_subscription_is_closed() {
    let mut rx = NoopCollector.subscribe_errors();
    assert!(rx.recv().await.is_err());
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_clears_state_and_keeps_verbose_toggle() {
    let collector = test_collector();
    collector.set_verbose_requests(true);
    collector.record_error(error_report("boom"));
    record_requests(&collector, 2, 2);
    collector.record_reconnect_attempt(&net("net-alpha"), None);
    collector.set_comms_mode("livekit");

    collector.reset();

    let snapshot = collector.diagnostics_summary();
    assert!(snapshot.recent_errors.is_empty());
    assert!(snapshot.comms_requests.is_empty());
    assert!(snapshot.nets.is_empty());
    assert!(snapshot.modes.comms_mode.is_none());
    assert_eq!(snapshot.totals.errors_captured, 0);
    assert_eq!(snapshot.totals.requests_recorded, 0);
    assert!(collector.verbose_requests_enabled());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_disabled_environment_yields_noop() {
    let vars = HashMap::from([("COMMS_TELEMETRY_ENABLED".to_string(), "0".to_string())]);
    let telemetry = lifecycle::from_vars(&vars);
    assert!(telemetry.is_noop());

    telemetry.record_error(error_report("dropped"));
    assert!(telemetry.recent_errors(5).is_empty());
    assert_eq!(telemetry.health_status(), HealthStatus::Green);
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn test_diagnostics_endpoint_e2e() -> Result<(), anyhow::Error> {
    let collector = test_collector();
    collector.record_error(error_report("token fetch failed"));
    collector.record_network_request(request_report(TOKEN_URL, 200));

    let server = TestTelemetryServer::spawn(collector.clone()).await?;

    let body: serde_json::Value = reqwest::get(format!("{}/diagnostics", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(body["health"]["status"], "AMBER");
    assert_eq!(body["recent_errors"][0]["kind"], "uncaught");
    assert_eq!(body["recent_errors"][0]["message"], "token fetch failed");
    assert_eq!(
        body["comms_requests"][0]["sanitized_url"],
        "https://functions.example.test/generateLiveKitToken"
    );

    let health: serde_json::Value =
        reqwest::get(format!("{}/diagnostics/health", server.url()))
            .await?
            .json()
            .await?;
    assert_eq!(health["status"], "AMBER");
    assert_eq!(health["recent_error_count"], 1);

    let live = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(live.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_noop_server_serves_green_snapshot() -> Result<(), anyhow::Error> {
    let server = TestTelemetryServer::spawn(Arc::new(NoopCollector)).await?;
    let body: serde_json::Value = reqwest::get(format!("{}/diagnostics", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(body["health"]["status"], "GREEN");
    Ok(())
}
