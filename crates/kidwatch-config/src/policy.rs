//! Validated policy structures

use crate::schema::{RawAppRule, RawChild, RawConfig, RawGeofence, RawSchedule, RawServiceConfig};
use crate::validation::{parse_days, parse_time};
use kidwatch_api::{
    AppRule, AppTimeSlot, ChildProfile, Coordinate, Geofence, GeofenceStatus, ScheduleWindow,
    DEFAULT_DAILY_LIMIT_MINUTES, DEFAULT_GEOFENCE_RADIUS_METERS,
    DEFAULT_WARNING_THRESHOLD_MINUTES,
};
use kidwatch_util::{data_dir_without_env, parse_weekday, ChildId, DaysOfWeek, ParentId, TimeWindow, WallClock};
use std::path::PathBuf;
use std::time::Duration;

/// Default interval of the enforcement loop
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Service configuration
    pub service: ServiceConfig,

    /// Validated children with their rules
    pub children: Vec<ChildConfig>,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            children: raw.children.into_iter().map(ChildConfig::from_raw).collect(),
        }
    }

    /// Get child by ID
    pub fn get_child(&self, id: &ChildId) -> Option<&ChildConfig> {
        self.children.iter().find(|c| &c.profile.id == id)
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            tick_interval: raw
                .tick_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir_without_env(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// A child's profile together with the app rules that apply to them
#[derive(Debug, Clone)]
pub struct ChildConfig {
    pub profile: ChildProfile,
    pub app_rules: Vec<AppRule>,
}

impl ChildConfig {
    fn from_raw(raw: RawChild) -> Self {
        let id = ChildId::new(raw.id);

        let app_rules = raw
            .app_rules
            .into_iter()
            .map(|r| convert_app_rule(r, &id))
            .collect();

        let profile = ChildProfile {
            id,
            parent_id: ParentId::new(raw.parent_id),
            name: raw.name,
            daily_screen_time_limit: raw.daily_limit_minutes.unwrap_or(DEFAULT_DAILY_LIMIT_MINUTES),
            weekday_screen_time_limit: raw.weekday_limit_minutes,
            weekend_screen_time_limit: raw.weekend_limit_minutes,
            bedtime: raw.bedtime.map(convert_schedule).unwrap_or_default(),
            school_hours: raw.school_hours.map(convert_schedule).unwrap_or_default(),
            homework_hours: raw.homework_hours.map(convert_schedule).unwrap_or_default(),
            warning_threshold: raw
                .warning_threshold_minutes
                .unwrap_or(DEFAULT_WARNING_THRESHOLD_MINUTES),
            geofences: raw.geofences.into_iter().map(convert_geofence).collect(),
        };

        Self { profile, app_rules }
    }
}

// Conversion helpers

fn convert_clock(value: &str, fallback: WallClock) -> WallClock {
    parse_time(value).unwrap_or(fallback)
}

fn convert_schedule(raw: RawSchedule) -> ScheduleWindow {
    ScheduleWindow {
        enabled: raw.enabled,
        window: TimeWindow::new(
            convert_clock(&raw.start, WallClock::MIDNIGHT),
            convert_clock(&raw.end, WallClock::MIDNIGHT),
        ),
    }
}

fn convert_geofence(raw: RawGeofence) -> Geofence {
    let active_days = raw
        .days
        .as_ref()
        .and_then(|d| parse_days(d).ok())
        .map(DaysOfWeek::new)
        .unwrap_or(DaysOfWeek::NONE);

    let active_hours = match (raw.start.as_deref(), raw.end.as_deref()) {
        (Some(start), Some(end)) => match (parse_time(start), parse_time(end)) {
            (Ok(start), Ok(end)) => Some(TimeWindow::new(start, end)),
            _ => None,
        },
        _ => None,
    };

    Geofence {
        name: raw.name,
        center: Coordinate::new(raw.latitude, raw.longitude),
        radius_meters: raw.radius_meters.unwrap_or(DEFAULT_GEOFENCE_RADIUS_METERS),
        active_days,
        active_hours,
        last_status: GeofenceStatus::Unknown,
        enabled: raw.enabled,
    }
}

fn convert_app_rule(raw: RawAppRule, child_id: &ChildId) -> AppRule {
    let allowed_slots = raw
        .slots
        .iter()
        .filter_map(|slot| {
            Some(AppTimeSlot {
                day: parse_weekday(&slot.day)?,
                start: parse_time(&slot.start).ok()?,
                end: parse_time(&slot.end).ok()?,
            })
        })
        .collect();

    AppRule {
        child_id: child_id.clone(),
        app_name: raw.app,
        is_blocked: raw.blocked,
        time_limit: raw.time_limit_minutes,
        allowed_slots,
    }
}
