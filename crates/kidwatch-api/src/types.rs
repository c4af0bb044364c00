//! Shared model types for kidwatch

use chrono::{NaiveDate, Weekday};
use kidwatch_util::{ChildId, DaysOfWeek, KidwatchError, KidwatchResult, ParentId, TimeWindow, WallClock};
use serde::{Deserialize, Serialize};

/// Default geofence radius in meters
pub const DEFAULT_GEOFENCE_RADIUS_METERS: f64 = 200.0;

/// Default daily screen time limit in minutes
pub const DEFAULT_DAILY_LIMIT_MINUTES: u32 = 120;

/// Default warning threshold in minutes
pub const DEFAULT_WARNING_THRESHOLD_MINUTES: u32 = 15;

/// App category whitelisted during homework hours
pub const EDUCATIONAL_CATEGORY: &str = "educational";

/// A schedule that can be switched on or off without losing its times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub enabled: bool,
    pub window: TimeWindow,
}

impl ScheduleWindow {
    pub fn enabled(window: TimeWindow) -> Self {
        Self { enabled: true, window }
    }

    /// Whether the schedule is switched on and covers the given time
    pub fn is_active_at(&self, time: WallClock) -> bool {
        self.enabled && self.window.contains(time)
    }
}

impl Default for ScheduleWindow {
    fn default() -> Self {
        Self {
            enabled: false,
            window: TimeWindow::new(WallClock::MIDNIGHT, WallClock::MIDNIGHT),
        }
    }
}

/// Settings for one monitored child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub id: ChildId,
    pub parent_id: ParentId,
    pub name: String,

    /// Generic daily limit in minutes, used when no day-specific limit applies
    pub daily_screen_time_limit: u32,
    pub weekday_screen_time_limit: Option<u32>,
    pub weekend_screen_time_limit: Option<u32>,

    #[serde(default)]
    pub bedtime: ScheduleWindow,
    #[serde(default)]
    pub school_hours: ScheduleWindow,
    #[serde(default)]
    pub homework_hours: ScheduleWindow,

    /// Minutes of remaining screen time at which the child gets warned
    pub warning_threshold: u32,

    #[serde(default)]
    pub geofences: Vec<Geofence>,
}

impl ChildProfile {
    /// A profile with no schedules and the default limits
    pub fn new(id: ChildId, parent_id: ParentId, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            daily_screen_time_limit: DEFAULT_DAILY_LIMIT_MINUTES,
            weekday_screen_time_limit: None,
            weekend_screen_time_limit: None,
            bedtime: ScheduleWindow::default(),
            school_hours: ScheduleWindow::default(),
            homework_hours: ScheduleWindow::default(),
            warning_threshold: DEFAULT_WARNING_THRESHOLD_MINUTES,
            geofences: Vec::new(),
        }
    }

    pub fn geofence(&self, name: &str) -> Option<&Geofence> {
        self.geofences.iter().find(|g| g.name == name)
    }
}

/// Last classification of a device relative to a geofence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceStatus {
    /// No baseline yet, or the zone's schedule is inactive
    #[default]
    Unknown,
    Inside,
    Outside,
}

impl GeofenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceStatus::Unknown => "unknown",
            GeofenceStatus::Inside => "inside",
            GeofenceStatus::Outside => "outside",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(GeofenceStatus::Unknown),
            "inside" => Some(GeofenceStatus::Inside),
            "outside" => Some(GeofenceStatus::Outside),
            _ => None,
        }
    }
}

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject non-finite or out-of-range coordinates
    pub fn validate(&self) -> KidwatchResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(KidwatchError::invalid_input(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(KidwatchError::invalid_input(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// A location report from the child's device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy radius in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl LocationUpdate {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> KidwatchResult<()> {
        self.coordinate().validate()?;
        if let Some(accuracy) = self.accuracy
            && (!accuracy.is_finite() || accuracy < 0.0)
        {
            return Err(KidwatchError::invalid_input(format!(
                "accuracy {} must be a non-negative number of meters",
                accuracy
            )));
        }
        Ok(())
    }
}

/// A named circular zone with an optional active schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub name: String,
    pub center: Coordinate,
    pub radius_meters: f64,
    /// Empty means every day
    #[serde(default)]
    pub active_days: DaysOfWeek,
    /// None means all day
    #[serde(default)]
    pub active_hours: Option<TimeWindow>,
    #[serde(default)]
    pub last_status: GeofenceStatus,
    pub enabled: bool,
}

impl Geofence {
    pub fn new(name: impl Into<String>, center: Coordinate) -> Self {
        Self {
            name: name.into(),
            center,
            radius_meters: DEFAULT_GEOFENCE_RADIUS_METERS,
            active_days: DaysOfWeek::NONE,
            active_hours: None,
            last_status: GeofenceStatus::Unknown,
            enabled: true,
        }
    }
}

/// Per-app usage for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub name: String,
    pub minutes: u32,
    #[serde(default)]
    pub category: Option<String>,
}

/// Usage accumulated by a child during one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub child_id: ChildId,
    pub day: NaiveDate,
    /// Minutes accumulated across all apps
    pub total_time: u32,
    /// Parent override locking the device for the rest of the day
    pub is_paused: bool,
    #[serde(default)]
    pub apps: Vec<AppUsage>,
}

impl UsageSnapshot {
    pub fn empty(child_id: ChildId, day: NaiveDate) -> Self {
        Self {
            child_id,
            day,
            total_time: 0,
            is_paused: false,
            apps: Vec::new(),
        }
    }

    /// Minutes spent in the named app today
    pub fn app_minutes(&self, app_name: &str) -> u32 {
        self.apps
            .iter()
            .filter(|a| a.name == app_name)
            .map(|a| a.minutes)
            .sum()
    }

    /// Merge a usage entry into the snapshot
    pub fn record(&mut self, usage: AppUsage) {
        self.total_time = self.total_time.saturating_add(usage.minutes);
        match self.apps.iter_mut().find(|a| a.name == usage.name) {
            Some(existing) => {
                existing.minutes = existing.minutes.saturating_add(usage.minutes);
                if usage.category.is_some() {
                    existing.category = usage.category;
                }
            }
            None => self.apps.push(usage),
        }
    }
}

/// An allowed usage slot for an app on one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTimeSlot {
    pub day: Weekday,
    pub start: WallClock,
    pub end: WallClock,
}

impl AppTimeSlot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

/// Parent-defined rule for one app on one child's device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRule {
    pub child_id: ChildId,
    pub app_name: String,
    pub is_blocked: bool,
    /// Daily minutes allowed in this app
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub allowed_slots: Vec<AppTimeSlot>,
}

impl AppRule {
    pub fn allow(child_id: ChildId, app_name: impl Into<String>) -> Self {
        Self {
            child_id,
            app_name: app_name.into(),
            is_blocked: false,
            time_limit: None,
            allowed_slots: Vec::new(),
        }
    }

    pub fn block(child_id: ChildId, app_name: impl Into<String>) -> Self {
        Self {
            is_blocked: true,
            ..Self::allow(child_id, app_name)
        }
    }

    /// The slot configured for the given weekday, if any
    pub fn slot_for(&self, day: Weekday) -> Option<&AppTimeSlot> {
        self.allowed_slots.iter().find(|s| s.day == day)
    }
}
