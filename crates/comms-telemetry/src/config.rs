//! Comms telemetry collector configuration.
//!
//! Configuration is loaded from environment variables with defaults that
//! match the collector's documented behavior. Buffer capacities and health
//! thresholds are tunable so operators can adjust classification without a
//! rebuild.

use crate::health::HealthThresholds;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default error ring-buffer capacity.
pub const DEFAULT_ERROR_CAPACITY: usize = 50;

/// Default network request ring-buffer capacity.
pub const DEFAULT_REQUEST_CAPACITY: usize = 100;

/// Default per-net connection duration capacity.
pub const DEFAULT_CONNECTION_SAMPLE_CAPACITY: usize = 20;

/// Default per-net latency and jitter sample capacity.
pub const DEFAULT_VOICE_SAMPLE_CAPACITY: usize = 50;

/// Default diagnostics server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default deployment environment.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Endpoint fragments that are always recorded: voice-token issuance,
/// room-status query and the comms readiness check.
pub const DEFAULT_CRITICAL_ENDPOINTS: [&str; 3] =
    ["generateLiveKitToken", "getLiveKitRoomStatus", "commsReadiness"];

/// Environments in which verbose request recording defaults to on.
const DEVELOPMENT_ENVIRONMENTS: [&str; 4] = ["development", "dev", "local", "test"];

/// Comms telemetry configuration.
#[derive(Clone)]
pub struct Config {
    /// Whether the real collector is built. When false the no-op collector
    /// is substituted.
    pub enabled: bool,

    /// Deployment environment name (e.g. "development", "production").
    pub environment: String,

    /// Record every outbound request, not only critical endpoints.
    pub verbose_requests: bool,

    /// Maximum number of retained error records.
    pub error_capacity: usize,

    /// Maximum number of retained network request records.
    pub request_capacity: usize,

    /// Maximum connection durations retained per net.
    pub connection_sample_capacity: usize,

    /// Maximum latency and jitter samples retained per net.
    pub voice_sample_capacity: usize,

    /// URL fragments identifying operationally critical endpoints.
    pub critical_endpoints: Vec<String>,

    /// Health classification thresholds.
    pub health: HealthThresholds,

    /// Diagnostics server bind address (default: "0.0.0.0:8090").
    pub bind_address: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("enabled", &self.enabled)
            .field("environment", &self.environment)
            .field("verbose_requests", &self.verbose_requests)
            .field("error_capacity", &self.error_capacity)
            .field("request_capacity", &self.request_capacity)
            .field(
                "connection_sample_capacity",
                &self.connection_sample_capacity,
            )
            .field("voice_sample_capacity", &self.voice_sample_capacity)
            .field("critical_endpoints", &self.critical_endpoints)
            .field("health", &self.health)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            verbose_requests: false,
            error_capacity: DEFAULT_ERROR_CAPACITY,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            connection_sample_capacity: DEFAULT_CONNECTION_SAMPLE_CAPACITY,
            voice_sample_capacity: DEFAULT_VOICE_SAMPLE_CAPACITY,
            critical_endpoints: DEFAULT_CRITICAL_ENDPOINTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            health: HealthThresholds::default(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable or out-of-range
    /// capacities and thresholds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable or out-of-range
    /// capacities and thresholds.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let enabled = match vars.get("COMMS_TELEMETRY_ENABLED") {
            Some(v) => parse_bool("COMMS_TELEMETRY_ENABLED", v)?,
            None => true,
        };

        let environment = vars
            .get("COMMS_TELEMETRY_ENVIRONMENT")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        // Verbose recording follows the environment unless set explicitly
        let verbose_requests = match vars.get("COMMS_TELEMETRY_VERBOSE_REQUESTS") {
            Some(v) => parse_bool("COMMS_TELEMETRY_VERBOSE_REQUESTS", v)?,
            None => is_development(&environment),
        };

        let error_capacity =
            parse_capacity(vars, "COMMS_TELEMETRY_ERROR_CAPACITY", DEFAULT_ERROR_CAPACITY)?;
        let request_capacity = parse_capacity(
            vars,
            "COMMS_TELEMETRY_REQUEST_CAPACITY",
            DEFAULT_REQUEST_CAPACITY,
        )?;
        let connection_sample_capacity = parse_capacity(
            vars,
            "COMMS_TELEMETRY_CONNECTION_SAMPLE_CAPACITY",
            DEFAULT_CONNECTION_SAMPLE_CAPACITY,
        )?;
        let voice_sample_capacity = parse_capacity(
            vars,
            "COMMS_TELEMETRY_VOICE_SAMPLE_CAPACITY",
            DEFAULT_VOICE_SAMPLE_CAPACITY,
        )?;

        let critical_endpoints = match vars.get("COMMS_TELEMETRY_CRITICAL_ENDPOINTS") {
            Some(list) => {
                let endpoints: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if endpoints.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "COMMS_TELEMETRY_CRITICAL_ENDPOINTS must name at least one endpoint"
                            .to_string(),
                    ));
                }
                endpoints
            }
            None => Config::default().critical_endpoints,
        };

        let health = parse_health_thresholds(vars)?;

        let bind_address = vars
            .get("COMMS_TELEMETRY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Config {
            enabled,
            environment,
            verbose_requests,
            error_capacity,
            request_capacity,
            connection_sample_capacity,
            voice_sample_capacity,
            critical_endpoints,
            health,
            bind_address,
        })
    }

    /// Whether the configured environment is development-like.
    #[must_use]
    pub fn is_development(&self) -> bool {
        is_development(&self.environment)
    }
}

fn is_development(environment: &str) -> bool {
    DEVELOPMENT_ENVIRONMENTS.contains(&environment)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_capacity(
    vars: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = vars.get(key) else {
        return Ok(default);
    };
    let value: usize = raw.trim().parse().map_err(|e| {
        ConfigError::InvalidValue(format!("{key} must be a positive integer: {e}"))
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn parse_health_thresholds(
    vars: &HashMap<String, String>,
) -> Result<HealthThresholds, ConfigError> {
    let defaults = HealthThresholds::default();

    let error_window_secs = parse_number(
        vars,
        "COMMS_HEALTH_ERROR_WINDOW_SECONDS",
        defaults.error_window.as_secs(),
    )?;
    let request_window_secs = parse_number(
        vars,
        "COMMS_HEALTH_REQUEST_WINDOW_SECONDS",
        defaults.request_window.as_secs(),
    )?;
    let amber_failure_ratio = parse_number(
        vars,
        "COMMS_HEALTH_FAILURE_RATIO",
        defaults.amber_failure_ratio,
    )?;

    if !(amber_failure_ratio > 0.0 && amber_failure_ratio <= 1.0) {
        return Err(ConfigError::InvalidValue(format!(
            "COMMS_HEALTH_FAILURE_RATIO must be in (0, 1], got {amber_failure_ratio}"
        )));
    }

    Ok(HealthThresholds {
        error_window: Duration::from_secs(error_window_secs),
        request_window: Duration::from_secs(request_window_secs),
        green_max_errors: parse_number(
            vars,
            "COMMS_HEALTH_GREEN_MAX_ERRORS",
            defaults.green_max_errors,
        )?,
        green_max_failures: parse_number(
            vars,
            "COMMS_HEALTH_GREEN_MAX_FAILURES",
            defaults.green_max_failures,
        )?,
        amber_max_errors: parse_number(
            vars,
            "COMMS_HEALTH_AMBER_MAX_ERRORS",
            defaults.amber_max_errors,
        )?,
        amber_min_failures: parse_number(
            vars,
            "COMMS_HEALTH_AMBER_MIN_FAILURES",
            defaults.amber_min_failures,
        )?,
        amber_failure_ratio,
    })
}
