//! Health transition watcher.
//!
//! Re-classifies whenever a captured error arrives and on a fixed period,
//! so transitions driven only by network failures are also seen. The latest
//! status is published on a `watch` channel and each change is logged.

use crate::collector::CommsTelemetry;
use crate::health::{HealthReport, HealthStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Default re-check period.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Spawn the watcher. The task ends when every status receiver is dropped.
pub fn spawn_health_watcher(
    telemetry: Arc<dyn CommsTelemetry>,
    period: Duration,
) -> (JoinHandle<()>, watch::Receiver<HealthStatus>) {
    let initial = telemetry.health_status();
    let (tx, rx) = watch::channel(initial);
    let handle = tokio::spawn(watch_health(telemetry, period, tx));
    (handle, rx)
}

async fn watch_health(
    telemetry: Arc<dyn CommsTelemetry>,
    period: Duration,
    status_tx: watch::Sender<HealthStatus>,
) {
    let mut errors = telemetry.subscribe_errors();
    let mut errors_open = true;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = status_tx.closed() => return,
            _ = ticker.tick() => {}
            received = errors.recv(), if errors_open => match received {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        target: "comms.telemetry.health",
                        skipped,
                        "Health watcher lagged behind captured errors"
                    );
                }
                // No-op collector: fall back to the periodic check only
                Err(RecvError::Closed) => errors_open = false,
            },
        }

        let report = telemetry.health_report();
        let previous = *status_tx.borrow();
        if report.status != previous {
            log_transition(previous, &report);
            status_tx.send_replace(report.status);
        }
    }
}

fn log_transition(from: HealthStatus, report: &HealthReport) {
    warn!(
        target: "comms.telemetry.health",
        from = from.as_str(),
        to = report.status.as_str(),
        recent_errors = report.recent_error_count,
        network_failures = report.network_failure_count,
        "Comms health changed"
    );
}
