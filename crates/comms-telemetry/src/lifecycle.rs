//! Process-wide collector instance.
//!
//! Prefer passing an `Arc<dyn CommsTelemetry>` from the composition root.
//! Call sites that cannot be reached that way (panic hooks, deeply nested
//! library code) use [`global`], which lazily builds the collector from the
//! environment on first access and returns the same instance thereafter.
//!
//! When telemetry is disabled, or the environment configuration is
//! unusable, the [`NoopCollector`] is substituted. Startup never fails
//! because of the collector.

use crate::collector::{Collector, CommsTelemetry, NoopCollector};
use crate::config::{Config, DEFAULT_BIND_ADDRESS};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

static GLOBAL: OnceLock<Arc<dyn CommsTelemetry>> = OnceLock::new();

/// Collector plus the listen address for a standalone host.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub telemetry: Arc<dyn CommsTelemetry>,
    /// Configured address, or [`DEFAULT_BIND_ADDRESS`] when the
    /// configuration could not be read.
    pub bind_address: String,
}

/// The process-wide collector, built on first access.
///
/// The first call also installs the panic hook, so panics are captured
/// even when nothing else ever calls
/// [`CommsTelemetry::install_error_capture`].
pub fn global() -> Arc<dyn CommsTelemetry> {
    Arc::clone(GLOBAL.get_or_init(|| {
        let vars: HashMap<String, String> = std::env::vars().collect();
        let telemetry = from_vars(&vars);
        if telemetry.install_error_capture() {
            debug!(
                target: "comms.telemetry.lifecycle",
                "Panic hook installed for global collector"
            );
        }
        telemetry
    }))
}

/// Make `telemetry` the process-wide collector.
///
/// Returns `false`, leaving the existing instance in place, if one was
/// already installed or built by [`global`].
pub fn install_global(telemetry: Arc<dyn CommsTelemetry>) -> bool {
    let installed = GLOBAL.set(telemetry).is_ok();
    if !installed {
        warn!(
            target: "comms.telemetry.lifecycle",
            "Global collector already initialized; keeping existing instance"
        );
    }
    installed
}

/// Build a collector from a map of environment variables, falling back to
/// the no-op collector when disabled or misconfigured.
pub fn from_vars(vars: &HashMap<String, String>) -> Arc<dyn CommsTelemetry> {
    bootstrap(vars).telemetry
}

/// Resolve the collector and listen address from environment variables.
///
/// Never fails: unusable configuration yields the no-op collector on the
/// default address.
pub fn bootstrap(vars: &HashMap<String, String>) -> Bootstrap {
    match Config::from_vars(vars) {
        Ok(config) => Bootstrap {
            telemetry: from_config(&config),
            bind_address: config.bind_address,
        },
        Err(e) => {
            warn!(
                target: "comms.telemetry.lifecycle",
                error = %e,
                "Comms telemetry configuration unusable; using no-op collector"
            );
            Bootstrap {
                telemetry: Arc::new(NoopCollector),
                bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            }
        }
    }
}

/// Real collector when enabled, no-op otherwise.
pub fn from_config(config: &Config) -> Arc<dyn CommsTelemetry> {
    if config.enabled {
        Arc::new(Collector::new(config))
    } else {
        info!(
            target: "comms.telemetry.lifecycle",
            "Comms telemetry disabled; using no-op collector"
        );
        Arc::new(NoopCollector)
    }
}
