//! Integration tests for kidwatchd
//!
//! These tests drive the configured engine end to end: TOML config in,
//! SQLite state on disk, statuses and notifications out.

use chrono::{DateTime, Local, TimeZone};
use kidwatch_api::{AppUsage, LocationUpdate, LockReason, NotificationPayload, TransitionDirection};
use kidwatch_config::{load_config, parse_config, Policy};
use kidwatch_core::{CoreEvent, MonitorEngine};
use kidwatch_store::{AuditEventType, SqliteStore, Store};
use kidwatch_util::{ChildId, DATABASE_FILENAME};
use std::io::Write;
use std::sync::Arc;

const CONFIG: &str = r#"
config_version = 1

[[children]]
id = "alex"
parent_id = "parent-1"
name = "Alex"
daily_limit_minutes = 120
weekend_limit_minutes = 180
warning_threshold_minutes = 10
bedtime = { start = "21:30", end = "07:00" }
school_hours = { start = "08:00", end = "15:00" }
homework_hours = { start = "16:00", end = "18:00" }

[[children.geofences]]
name = "School"
latitude = 40.7128
longitude = -74.0060
radius_meters = 200
days = "weekdays"
start = "07:30"
end = "16:00"

[[children.app_rules]]
app = "Minecraft"
time_limit_minutes = 60
slots = [{ day = "monday", start = "16:00", end = "20:00" }]

[[children.app_rules]]
app = "TikTok"
blocked = true
"#;

fn alex() -> ChildId {
    ChildId::new("alex")
}

/// 2025-12-29 is a Monday
fn monday_at(h: u32, m: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 12, 29, h, m, 0).unwrap()
}

fn at(lat: f64, lon: f64) -> LocationUpdate {
    LocationUpdate {
        latitude: lat,
        longitude: lon,
        accuracy: Some(15.0),
    }
}

fn make_engine(policy: Policy) -> MonitorEngine {
    MonitorEngine::new(policy, Arc::new(SqliteStore::in_memory().unwrap()))
}

#[test]
fn test_config_file_to_status() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let policy = load_config(file.path()).unwrap();
    let engine = make_engine(policy);

    let during_school = engine.device_status(&alex(), monday_at(10, 0));
    assert_eq!(during_school.lock_reason, Some(LockReason::SchoolHours));

    let after_school = engine.device_status(&alex(), monday_at(15, 30));
    assert!(!after_school.is_locked);
    assert_eq!(after_school.blocked_apps, vec!["Minecraft", "TikTok"]);

    let homework = engine.device_status(&alex(), monday_at(17, 0));
    assert!(homework.is_homework_hours);
    assert_eq!(homework.allowed_apps, vec!["educational", "Minecraft"]);
    assert_eq!(homework.blocked_apps, vec!["TikTok"]);

    let night = engine.device_status(&alex(), monday_at(22, 0));
    assert_eq!(night.lock_reason, Some(LockReason::Bedtime));
}

#[test]
fn test_school_day() {
    let engine = make_engine(parse_config(CONFIG).unwrap());
    let school = at(40.7128, -74.0060);
    let away = at(40.7300, -74.0060);

    // Arrival is the baseline; leaving fires once
    assert!(engine.report_location(&alex(), &school, monday_at(7, 45)).unwrap().is_empty());
    assert!(engine.report_location(&alex(), &school, monday_at(12, 0)).unwrap().is_empty());
    let events = engine.report_location(&alex(), &away, monday_at(15, 5)).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].zone_name, "School");
    assert_eq!(events[0].direction, TransitionDirection::Left);

    // After hours the zone goes dormant
    assert!(engine.report_location(&alex(), &school, monday_at(17, 0)).unwrap().is_empty());

    // Screen time after school
    engine
        .record_usage(
            &alex(),
            AppUsage {
                name: "Minecraft".into(),
                minutes: 60,
                category: Some("games".into()),
            },
            monday_at(17, 0),
        )
        .unwrap();
    let status = engine.device_status(&alex(), monday_at(18, 30));
    assert_eq!(status.remaining_time, 60);
    assert!(status.blocked_apps.contains(&"Minecraft".to_string()));

    engine
        .record_usage(
            &alex(),
            AppUsage {
                name: "YouTube".into(),
                minutes: 52,
                category: None,
            },
            monday_at(19, 0),
        )
        .unwrap();
    let status = engine.device_status(&alex(), monday_at(19, 1));
    assert!(status.should_warn);
    assert_eq!(status.remaining_time, 8);

    let notifications = engine.notifications(&alex(), 10).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message("Alex"), "Alex left School");
}

#[test]
fn test_enforcement_loop_events() {
    let engine = make_engine(parse_config(CONFIG).unwrap());

    assert!(engine.tick(monday_at(15, 30)).is_empty());

    engine.set_paused(&alex(), true, monday_at(15, 31)).unwrap();
    assert_eq!(
        engine.tick(monday_at(15, 32)),
        vec![CoreEvent::DeviceLocked {
            child_id: alex(),
            reason: LockReason::ParentPaused,
        }]
    );

    engine.set_paused(&alex(), false, monday_at(15, 40)).unwrap();
    assert_eq!(
        engine.tick(monday_at(15, 41)),
        vec![CoreEvent::DeviceUnlocked { child_id: alex() }]
    );

    let payloads: Vec<_> = engine
        .notifications(&alex(), 10)
        .unwrap()
        .into_iter()
        .map(|n| n.payload)
        .collect();
    assert_eq!(
        payloads,
        vec![
            NotificationPayload::DeviceUnlocked,
            NotificationPayload::DeviceLocked {
                reason: LockReason::ParentPaused
            },
        ]
    );
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join(DATABASE_FILENAME);
    let school = at(40.7128, -74.0060);
    let away = at(40.7300, -74.0060);

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let engine = MonitorEngine::new(parse_config(CONFIG).unwrap(), store);
        engine.report_location(&alex(), &school, monday_at(8, 0)).unwrap();
        engine.set_paused(&alex(), true, monday_at(9, 0)).unwrap();
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let engine = MonitorEngine::new(parse_config(CONFIG).unwrap(), store.clone());

    // Zone status and pause flag came back from disk
    let events = engine.report_location(&alex(), &away, monday_at(15, 10)).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        engine.device_status(&alex(), monday_at(15, 30)).lock_reason,
        Some(LockReason::ParentPaused)
    );

    let audits = store.get_recent_audits(50).unwrap();
    assert!(audits.iter().any(|a| matches!(
        a.event,
        AuditEventType::GeofenceTransition {
            direction: TransitionDirection::Left,
            ..
        }
    )));
    assert!(store.is_healthy());
}

#[test]
fn test_policy_reload_applies_new_limits() {
    let engine = make_engine(parse_config(CONFIG).unwrap());
    engine
        .record_usage(
            &alex(),
            AppUsage {
                name: "YouTube".into(),
                minutes: 100,
                category: None,
            },
            monday_at(15, 30),
        )
        .unwrap();
    assert!(!engine.device_status(&alex(), monday_at(15, 31)).is_locked);

    let stricter = CONFIG.replace("daily_limit_minutes = 120", "daily_limit_minutes = 90");
    engine.reload_policy(parse_config(&stricter).unwrap()).unwrap();

    let status = engine.device_status(&alex(), monday_at(15, 32));
    assert_eq!(status.current_limit, 90);
    assert_eq!(status.lock_reason, Some(LockReason::ScreenTimeExceeded));
}

#[test]
fn test_example_config_is_valid() {
    let policy = parse_config(include_str!("../../../config.example.toml")).unwrap();
    assert_eq!(policy.children.len(), 2);
    assert!(policy.get_child(&ChildId::new("sam")).is_some());
}
