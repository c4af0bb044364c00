//! Device enforcement evaluator

use chrono::{DateTime, Datelike, Local, Weekday};
use kidwatch_api::{
    AppRule, ChildProfile, DeviceStatus, LockReason, UsageSnapshot, EDUCATIONAL_CATEGORY,
};
use kidwatch_util::{format_minutes, is_weekend, WallClock};

use crate::resolve_daily_limit;

/// Decide whether the child's device is locked right now and which apps it may use.
///
/// Checks run in strict priority order and the first lock wins: bedtime,
/// school hours (Monday to Friday), daily screen time, then the parent
/// pause. Homework hours never lock; they whitelist the educational
/// category. A missing usage snapshot counts as zero minutes used.
pub fn evaluate(
    profile: &ChildProfile,
    usage: Option<&UsageSnapshot>,
    app_rules: &[AppRule],
    now: DateTime<Local>,
) -> DeviceStatus {
    let clock = WallClock::of(&now);
    let weekday = now.weekday();
    let current_limit = resolve_daily_limit(profile, now.date_naive());
    let used = usage.map(|u| u.total_time).unwrap_or(0);

    let mut status = DeviceStatus {
        remaining_time: current_limit.saturating_sub(used),
        current_limit,
        is_weekend: is_weekend(weekday),
        ..DeviceStatus::default()
    };

    if profile.bedtime.is_active_at(clock) {
        status.lock(LockReason::Bedtime);
        return status;
    }

    if profile.school_hours.is_active_at(clock) && !is_weekend(weekday) {
        status.lock(LockReason::SchoolHours);
        return status;
    }

    if profile.homework_hours.is_active_at(clock) {
        status.is_homework_hours = true;
        status.allowed_apps.push(EDUCATIONAL_CATEGORY.to_string());
    }

    if status.remaining_time == 0 {
        status.lock(LockReason::ScreenTimeExceeded);
        status.allowed_apps.clear();
        return status;
    }

    if status.remaining_time <= profile.warning_threshold {
        status.should_warn = true;
        status.warning_message = Some(format!(
            "{} of screen time left today",
            format_minutes(status.remaining_time)
        ));
    }

    for rule in app_rules.iter().filter(|r| r.child_id == profile.id) {
        if is_app_allowed(rule, usage, weekday, clock) {
            status.allowed_apps.push(rule.app_name.clone());
        } else {
            status.blocked_apps.push(rule.app_name.clone());
        }
    }

    if usage.is_some_and(|u| u.is_paused) {
        status.lock(LockReason::ParentPaused);
    }

    status
}

fn is_app_allowed(
    rule: &AppRule,
    usage: Option<&UsageSnapshot>,
    weekday: Weekday,
    clock: WallClock,
) -> bool {
    if rule.is_blocked {
        return false;
    }

    if let Some(limit) = rule.time_limit {
        let used = usage.map(|u| u.app_minutes(&rule.app_name)).unwrap_or(0);
        if used >= limit {
            return false;
        }
    }

    if rule.allowed_slots.is_empty() {
        return true;
    }

    // Slots are same-day ranges; a day without a slot is blocked
    match rule.slot_for(weekday) {
        Some(slot) => slot.start <= clock && clock < slot.end,
        None => false,
    }
}
