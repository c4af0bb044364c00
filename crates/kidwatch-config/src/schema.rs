//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Monitored children
    #[serde(default)]
    pub children: Vec<RawChild>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// How often the enforcement loop re-evaluates every child
    pub tick_interval_seconds: Option<u64>,
}

/// Raw child profile
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawChild {
    /// Unique stable ID
    pub id: String,

    /// Owning parent account
    pub parent_id: String,

    /// Display name
    pub name: String,

    /// Generic daily limit in minutes
    pub daily_limit_minutes: Option<u32>,

    /// Limit for Monday-Friday, overrides the generic limit
    pub weekday_limit_minutes: Option<u32>,

    /// Limit for Saturday-Sunday, overrides the generic limit
    pub weekend_limit_minutes: Option<u32>,

    pub warning_threshold_minutes: Option<u32>,

    #[serde(default)]
    pub bedtime: Option<RawSchedule>,

    #[serde(default)]
    pub school_hours: Option<RawSchedule>,

    #[serde(default)]
    pub homework_hours: Option<RawSchedule>,

    #[serde(default)]
    pub geofences: Vec<RawGeofence>,

    #[serde(default)]
    pub app_rules: Vec<RawAppRule>,
}

/// A daily schedule (HH:MM times, may cross midnight)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSchedule {
    pub start: String,
    pub end: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Raw geofence definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawGeofence {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Radius in meters (default 200)
    pub radius_meters: Option<f64>,

    /// Days of week: "weekdays", "weekends", "all", or list like ["mon", "tue"]
    #[serde(default)]
    pub days: Option<RawDays>,

    /// Start of the active period (HH:MM); unset means all day
    pub start: Option<String>,

    /// End of the active period (HH:MM), inclusive
    pub end: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Days specification
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawDays {
    Preset(String),
    List(Vec<String>),
}

/// Raw per-app rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAppRule {
    pub app: String,

    #[serde(default)]
    pub blocked: bool,

    /// Daily minutes allowed in this app
    pub time_limit_minutes: Option<u32>,

    /// Allowed slots; when present the app is only allowed inside them
    #[serde(default)]
    pub slots: Vec<RawAppSlot>,
}

/// One allowed slot for an app
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAppSlot {
    /// Single day name, e.g. "monday"
    pub day: String,
    pub start: String,
    pub end: String,
}

fn default_true() -> bool {
    true
}
