//! Gate configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use geogate_geofence::GeofenceConfig;
use geogate_types::Coordinate;
use geogate_utils::LogFormat;

use crate::GateError;

/// Configuration for a gate controller.
///
/// Can be loaded from a TOML file via [`GateConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every section and field has a
/// default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub geofence: FenceSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// The `[geofence]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FenceSettings {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

/// The `[polling]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Period of the recurring location poll.
    #[serde(default = "default_location_period_secs")]
    pub location_period_secs: u64,

    /// Fire the first location poll on entry instead of one period later.
    #[serde(default)]
    pub poll_immediately: bool,

    /// Upper bound on a single capability call.
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,

    #[serde(default)]
    pub outside_policy: OutsidePolicy,
}

/// What an out-of-range position does to the phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutsidePolicy {
    /// Stay in `AwaitingLocation` and raise an out-of-range event.
    #[default]
    Notify,
    /// Move to `LocationBlocked` until the next poll tick.
    Block,
}

/// The `[logging]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive, e.g. `"info"` or `"debug,geogate_gate=trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_latitude() -> f64 {
    6.673175
}

fn default_longitude() -> f64 {
    -1.565423
}

fn default_radius_km() -> f64 {
    1.0
}

fn default_location_period_secs() -> u64 {
    60
}

fn default_capability_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FenceSettings {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            radius_km: default_radius_km(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            location_period_secs: default_location_period_secs(),
            poll_immediately: false,
            capability_timeout_secs: default_capability_timeout_secs(),
            outside_policy: OutsidePolicy::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

/// Upper bound for the poll period and the capability timeout (one day).
pub const MAX_INTERVAL_SECS: u64 = 86_400;

impl GateConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GateError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GateError> {
        toml::from_str(s).map_err(|e| GateError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GateError> {
        toml::to_string_pretty(self).map_err(|e| GateError::Config(e.to_string()))
    }

    /// Check every setting and build the geofence.
    ///
    /// Any failure here is fatal: no session may start with this config.
    pub fn validate(&self) -> Result<GeofenceConfig, GateError> {
        if !(1..=MAX_INTERVAL_SECS).contains(&self.polling.location_period_secs) {
            return Err(GateError::InvalidConfiguration(format!(
                "location poll period must be between 1 and {MAX_INTERVAL_SECS} seconds, got {}",
                self.polling.location_period_secs
            )));
        }
        if !(1..=MAX_INTERVAL_SECS).contains(&self.polling.capability_timeout_secs) {
            return Err(GateError::InvalidConfiguration(format!(
                "capability timeout must be between 1 and {MAX_INTERVAL_SECS} seconds, got {}",
                self.polling.capability_timeout_secs
            )));
        }
        let center = Coordinate {
            latitude: self.geofence.latitude,
            longitude: self.geofence.longitude,
        };
        GeofenceConfig::new(center, self.geofence.radius_km)
            .map_err(|e| GateError::InvalidConfiguration(e.to_string()))
    }

    pub fn location_period(&self) -> Duration {
        Duration::from_secs(self.polling.location_period_secs)
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.capability_timeout_secs)
    }
}
