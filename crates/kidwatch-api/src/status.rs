//! Device status returned to the child's device

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a device is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    Bedtime,
    SchoolHours,
    ScreenTimeExceeded,
    ParentPaused,
    /// The child's settings could not be loaded; the device fails closed
    Error,
}

impl LockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockReason::Bedtime => "bedtime",
            LockReason::SchoolHours => "school_hours",
            LockReason::ScreenTimeExceeded => "screen_time_exceeded",
            LockReason::ParentPaused => "parent_paused",
            LockReason::Error => "error",
        }
    }
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LockReason::Bedtime => "It's bedtime",
            LockReason::SchoolHours => "It's school time",
            LockReason::ScreenTimeExceeded => "Daily screen time is used up",
            LockReason::ParentPaused => "Paused by a parent",
            LockReason::Error => "Settings unavailable",
        };
        f.write_str(text)
    }
}

/// Enforcement decision for a child's device at one moment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub is_locked: bool,
    pub lock_reason: Option<LockReason>,
    /// Minutes of screen time left today
    pub remaining_time: u32,
    pub should_warn: bool,
    pub warning_message: Option<String>,
    pub allowed_apps: Vec<String>,
    pub blocked_apps: Vec<String>,
    /// Daily limit in effect today, in minutes
    pub current_limit: u32,
    pub is_homework_hours: bool,
    pub is_weekend: bool,
}

impl DeviceStatus {
    /// Locked status used whenever the inputs needed for a decision are missing
    pub fn fail_closed() -> Self {
        Self {
            is_locked: true,
            lock_reason: Some(LockReason::Error),
            ..Self::default()
        }
    }

    pub fn lock(&mut self, reason: LockReason) {
        self.is_locked = true;
        self.lock_reason = Some(reason);
    }
}
