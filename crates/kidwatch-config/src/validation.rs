//! Configuration validation
//!
//! Malformed times and out-of-range coordinates are rejected here so the
//! evaluators only ever see well-formed input.

use crate::schema::{RawAppRule, RawChild, RawConfig, RawDays, RawGeofence, RawSchedule};
use kidwatch_util::{parse_weekday, WallClock};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Child '{child_id}': {message}")]
    ChildError { child_id: String, message: String },

    #[error("Duplicate child ID: {0}")]
    DuplicateChildId(String),

    #[error("Child '{child_id}': duplicate geofence name '{name}'")]
    DuplicateGeofence { child_id: String, name: String },

    #[error("Child '{child_id}': duplicate rule for app '{app}'")]
    DuplicateAppRule { child_id: String, app: String },

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Invalid day specification: {0}")]
    InvalidDaySpec(String),

    #[error("Child '{child_id}', geofence '{zone}': {message}")]
    GeofenceError {
        child_id: String,
        zone: String,
        message: String,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.service.tick_interval_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "tick_interval_seconds must be greater than 0".into(),
        ));
    }

    // Check for duplicate child IDs
    let mut seen_ids = HashSet::new();
    for child in &config.children {
        if !seen_ids.insert(&child.id) {
            errors.push(ValidationError::DuplicateChildId(child.id.clone()));
        }
    }

    for child in &config.children {
        errors.extend(validate_child(child));
    }

    errors
}

fn validate_child(child: &RawChild) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if child.id.trim().is_empty() {
        errors.push(ValidationError::ChildError {
            child_id: child.id.clone(),
            message: "id cannot be empty".into(),
        });
    }
    if child.parent_id.trim().is_empty() {
        errors.push(ValidationError::ChildError {
            child_id: child.id.clone(),
            message: "parent_id cannot be empty".into(),
        });
    }

    for schedule in [&child.bedtime, &child.school_hours, &child.homework_hours]
        .into_iter()
        .flatten()
    {
        errors.extend(validate_schedule(schedule));
    }

    let mut zone_names = HashSet::new();
    for zone in &child.geofences {
        if !zone_names.insert(zone.name.as_str()) {
            errors.push(ValidationError::DuplicateGeofence {
                child_id: child.id.clone(),
                name: zone.name.clone(),
            });
        }
        errors.extend(validate_geofence(zone, &child.id));
    }

    let mut apps = HashSet::new();
    for rule in &child.app_rules {
        if !apps.insert(rule.app.as_str()) {
            errors.push(ValidationError::DuplicateAppRule {
                child_id: child.id.clone(),
                app: rule.app.clone(),
            });
        }
        errors.extend(validate_app_rule(rule, &child.id));
    }

    errors
}

fn validate_schedule(schedule: &RawSchedule) -> Vec<ValidationError> {
    [&schedule.start, &schedule.end]
        .into_iter()
        .filter_map(|value| {
            parse_time(value)
                .err()
                .map(|message| ValidationError::InvalidTimeFormat {
                    value: value.clone(),
                    message,
                })
        })
        .collect()
}

fn validate_geofence(zone: &RawGeofence, child_id: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let zone_error = |message: String| ValidationError::GeofenceError {
        child_id: child_id.to_string(),
        zone: zone.name.clone(),
        message,
    };

    if zone.name.trim().is_empty() {
        errors.push(zone_error("name cannot be empty".into()));
    }

    if !zone.latitude.is_finite() || !(-90.0..=90.0).contains(&zone.latitude) {
        errors.push(zone_error(format!(
            "latitude {} is outside [-90, 90]",
            zone.latitude
        )));
    }
    if !zone.longitude.is_finite() || !(-180.0..=180.0).contains(&zone.longitude) {
        errors.push(zone_error(format!(
            "longitude {} is outside [-180, 180]",
            zone.longitude
        )));
    }

    if let Some(radius) = zone.radius_meters
        && (!radius.is_finite() || radius <= 0.0)
    {
        errors.push(zone_error(format!("radius {} must be positive", radius)));
    }

    if let Some(days) = &zone.days
        && let Err(e) = parse_days(days)
    {
        errors.push(ValidationError::InvalidDaySpec(e));
    }

    match (&zone.start, &zone.end) {
        (Some(start), Some(end)) => {
            for value in [start, end] {
                if let Err(message) = parse_time(value) {
                    errors.push(ValidationError::InvalidTimeFormat {
                        value: value.clone(),
                        message,
                    });
                }
            }
        }
        (None, None) => {}
        _ => errors.push(zone_error("start and end must be set together".into())),
    }

    errors
}

fn validate_app_rule(rule: &RawAppRule, child_id: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if rule.app.trim().is_empty() {
        errors.push(ValidationError::ChildError {
            child_id: child_id.to_string(),
            message: "app rule name cannot be empty".into(),
        });
    }

    let mut slot_days = HashSet::new();
    for slot in &rule.slots {
        match parse_weekday(&slot.day) {
            Some(day) => {
                if !slot_days.insert(day) {
                    errors.push(ValidationError::ChildError {
                        child_id: child_id.to_string(),
                        message: format!("app '{}' has more than one slot on {}", rule.app, day),
                    });
                }
            }
            None => errors.push(ValidationError::InvalidDaySpec(format!(
                "Unknown day: {}",
                slot.day
            ))),
        }

        let mut times = Vec::with_capacity(2);
        for value in [&slot.start, &slot.end] {
            match parse_time(value) {
                Ok(time) => times.push(time),
                Err(message) => errors.push(ValidationError::InvalidTimeFormat {
                    value: value.clone(),
                    message,
                }),
            }
        }

        // Slots do not wrap midnight
        if let [start, end] = times[..]
            && end <= start
        {
            errors.push(ValidationError::ChildError {
                child_id: child_id.to_string(),
                message: format!(
                    "app '{}' slot on {} must end after it starts ({}-{})",
                    rule.app, slot.day, slot.start, slot.end
                ),
            });
        }
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<WallClock, String> {
    s.parse()
}

/// Parse days specification
pub fn parse_days(days: &RawDays) -> Result<u8, String> {
    match days {
        RawDays::Preset(preset) => match preset.to_lowercase().as_str() {
            "all" | "every" | "daily" => Ok(0x7F),
            "weekdays" => Ok(0x1F), // Mon-Fri
            "weekends" => Ok(0x60), // Sat-Sun
            other => Err(format!("Unknown day preset: {}", other)),
        },
        RawDays::List(list) => {
            let mut mask = 0u8;
            for day in list {
                let weekday =
                    parse_weekday(day).ok_or_else(|| format!("Unknown day: {}", day))?;
                mask |= 1 << weekday.num_days_from_monday();
            }
            Ok(mask)
        }
    }
}
