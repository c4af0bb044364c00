//! Time utilities for kidwatch
//!
//! All schedule arithmetic works on wall-clock minutes since midnight.
//! "HH:MM" strings are parsed once, at the configuration/serde boundary,
//! and never compared as strings.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `KIDWATCH_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for trying out bedtime, school-hour and geofence schedules.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 22:30:00`)
//!
//! Example:
//! ```bash
//! KIDWATCH_MOCK_TIME="2025-12-25 22:30:00" kidwatchd status alex
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "KIDWATCH_MOCK_TIME";

/// Minutes in a day
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Wall-clock time of day, stored as minutes since midnight.
///
/// Serializes as an "HH:MM" string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallClock(u16);

impl WallClock {
    pub const MIDNIGHT: WallClock = WallClock(0);

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    /// Wall-clock time of the given local datetime, truncated to the minute
    pub fn of(dt: &DateTime<Local>) -> Self {
        Self((dt.hour() * 60 + dt.minute()) as u16)
    }

    pub fn hour(&self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.0 % 60) as u8
    }

    pub fn as_minutes(&self) -> u16 {
        self.0
    }
}

impl FromStr for WallClock {
    type Err = String;

    /// Parse HH:MM
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| "Expected HH:MM format".to_string())?;

        let hour: u8 = hour.trim().parse().map_err(|_| "Invalid hour".to_string())?;
        let minute: u8 = minute
            .trim()
            .parse()
            .map_err(|_| "Invalid minute".to_string())?;

        if hour >= 24 {
            return Err("Hour must be 0-23".into());
        }
        if minute >= 60 {
            return Err("Minute must be 0-59".into());
        }

        Ok(Self(hour as u16 * 60 + minute as u16))
    }
}

impl TryFrom<String> for WallClock {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WallClock> for String {
    fn from(clock: WallClock) -> Self {
        clock.to_string()
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Days of the week mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const MONDAY: u8 = 1 << 0;
    pub const TUESDAY: u8 = 1 << 1;
    pub const WEDNESDAY: u8 = 1 << 2;
    pub const THURSDAY: u8 = 1 << 3;
    pub const FRIDAY: u8 = 1 << 4;
    pub const SATURDAY: u8 = 1 << 5;
    pub const SUNDAY: u8 = 1 << 6;

    pub const WEEKDAYS: DaysOfWeek = DaysOfWeek(
        Self::MONDAY | Self::TUESDAY | Self::WEDNESDAY | Self::THURSDAY | Self::FRIDAY,
    );
    pub const WEEKENDS: DaysOfWeek = DaysOfWeek(Self::SATURDAY | Self::SUNDAY);
    pub const ALL_DAYS: DaysOfWeek = DaysOfWeek(0x7F);
    pub const NONE: DaysOfWeek = DaysOfWeek(0);

    pub fn new(mask: u8) -> Self {
        Self(mask & 0x7F)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    fn bit(weekday: Weekday) -> u8 {
        1 << weekday.num_days_from_monday()
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.0 & Self::bit(weekday)) != 0
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= Self::bit(weekday);
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for DaysOfWeek {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl FromIterator<Weekday> for DaysOfWeek {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut days = DaysOfWeek::NONE;
        for weekday in iter {
            days.insert(weekday);
        }
        days
    }
}

/// Parse a day name ("mon", "Monday", ...) into a weekday
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Saturday or Sunday
pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// A daily time-of-day window.
///
/// A window whose end is earlier than its start wraps past midnight
/// (e.g. 22:00 - 06:00). The wrapped branch includes its end minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: WallClock,
    pub end: WallClock,
}

impl TimeWindow {
    pub fn new(start: WallClock, end: WallClock) -> Self {
        Self { start, end }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Schedule membership: `[start, end)` for same-day windows,
    /// `time >= start || time <= end` for windows crossing midnight.
    pub fn contains(&self, time: WallClock) -> bool {
        if self.wraps_midnight() {
            time >= self.start || time <= self.end
        } else {
            time >= self.start && time < self.end
        }
    }

    /// Inclusive membership: `[start, end]`, wrapping past midnight when
    /// `end < start`.
    pub fn contains_inclusive(&self, time: WallClock) -> bool {
        if self.wraps_midnight() {
            time >= self.start || time <= self.end
        } else {
            time >= self.start && time <= self.end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Helper to format a minute count in human-readable form
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;

    match (hours, rest) {
        (0, 1) => "1 minute".to_string(),
        (0, m) => format!("{} minutes", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn clock(s: &str) -> WallClock {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_wall_clock() {
        assert_eq!(clock("14:30"), WallClock::new(14, 30).unwrap());
        assert_eq!(clock("00:00").as_minutes(), 0);
        assert_eq!(clock("23:59").as_minutes(), 23 * 60 + 59);
        assert_eq!(clock("7:05").as_minutes(), 7 * 60 + 5);

        assert!("24:00".parse::<WallClock>().is_err());
        assert!("12:60".parse::<WallClock>().is_err());
        assert!("invalid".parse::<WallClock>().is_err());
        assert!("12".parse::<WallClock>().is_err());
    }

    #[test]
    fn test_wall_clock_ordering() {
        assert!(clock("08:00") < clock("12:00"));
        assert!(clock("12:00") < clock("18:30"));
        assert!(clock("09:59") < clock("10:00"));
    }

    #[test]
    fn test_wall_clock_display_and_serde() {
        let c = WallClock::new(7, 5).unwrap();
        assert_eq!(c.to_string(), "07:05");

        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"07:05\"");
        let parsed: WallClock = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);

        assert!(serde_json::from_str::<WallClock>("\"25:00\"").is_err());
    }

    #[test]
    fn test_wall_clock_of_datetime() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(WallClock::of(&dt), clock("14:30"));
    }

    #[test]
    fn test_days_of_week() {
        let weekdays = DaysOfWeek::WEEKDAYS;
        assert!(weekdays.contains(Weekday::Mon));
        assert!(weekdays.contains(Weekday::Fri));
        assert!(!weekdays.contains(Weekday::Sat));
        assert!(!weekdays.contains(Weekday::Sun));

        let weekends = DaysOfWeek::WEEKENDS;
        assert!(!weekends.contains(Weekday::Mon));
        assert!(weekends.contains(Weekday::Sat));
        assert!(weekends.contains(Weekday::Sun));

        let custom: DaysOfWeek = [Weekday::Mon, Weekday::Wed].into_iter().collect();
        assert_eq!(custom.bits(), 0b101);
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("funday"), None);
    }

    #[test]
    fn test_same_day_window_is_half_open() {
        let window = TimeWindow::new(clock("08:00"), clock("15:00"));

        assert!(window.contains(clock("08:00")));
        assert!(window.contains(clock("14:59")));
        assert!(!window.contains(clock("15:00")));
        assert!(!window.contains(clock("07:59")));
        assert!(window.contains_inclusive(clock("15:00")));
    }

    #[test]
    fn test_overnight_window() {
        let window = TimeWindow::new(clock("22:00"), clock("06:00"));
        assert!(window.wraps_midnight());

        assert!(window.contains(clock("23:30")));
        assert!(window.contains(clock("05:00")));
        assert!(window.contains(clock("00:00")));
        assert!(!window.contains(clock("12:00")));
        assert!(!window.contains(clock("21:59")));
    }

    #[test]
    fn test_is_weekend() {
        // 2025-12-27 is a Saturday, 2025-12-29 a Monday
        let saturday = Local.with_ymd_and_hms(2025, 12, 27, 12, 0, 0).unwrap();
        let monday = Local.with_ymd_and_hms(2025, 12, 29, 12, 0, 0).unwrap();
        assert!(is_weekend(saturday.weekday()));
        assert!(!is_weekend(monday.weekday()));
        assert!(is_weekend(Weekday::Sun));
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(1), "1 minute");
        assert_eq!(format_minutes(10), "10 minutes");
        assert_eq!(format_minutes(60), "1h");
        assert_eq!(format_minutes(95), "1h 35m");
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_parse_mock_time_format() {
        let valid_formats = ["2025-12-25 14:30:00", "2025-01-01 00:00:00"];
        for format_str in &valid_formats {
            assert!(NaiveDateTime::parse_from_str(format_str, "%Y-%m-%d %H:%M:%S").is_ok());
        }

        let invalid_formats = ["2025-12-25", "14:30:00", "2025-12-25T14:30:00", ""];
        for format_str in &invalid_formats {
            assert!(NaiveDateTime::parse_from_str(format_str, "%Y-%m-%d %H:%M:%S").is_err());
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // The OnceLock makes the env var untestable in-process; just make sure it doesn't panic.
        let _ = is_mock_time_active();
    }
}
