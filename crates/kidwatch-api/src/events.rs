//! Geofence transitions and parent-facing notifications

use chrono::{DateTime, Local};
use kidwatch_util::{ChildId, NotificationId, ParentId};
use serde::{Deserialize, Serialize};

use crate::{GeofenceStatus, LockReason, API_VERSION};

/// Direction of a geofence boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDirection {
    Entered,
    Left,
}

impl TransitionDirection {
    /// Direction implied by the new status after a change
    pub fn from_status(status: GeofenceStatus) -> Self {
        if status == GeofenceStatus::Inside {
            TransitionDirection::Entered
        } else {
            TransitionDirection::Left
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionDirection::Entered => "entered",
            TransitionDirection::Left => "left",
        }
    }
}

/// A one-time event fired when a zone's inside/outside classification changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub zone_name: String,
    pub direction: TransitionDirection,
    pub timestamp: DateTime<Local>,
}

/// Notification envelope, stored for the parent who owns the child
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub api_version: u32,
    pub id: NotificationId,
    pub child_id: ChildId,
    pub parent_id: ParentId,
    pub timestamp: DateTime<Local>,
    pub payload: NotificationPayload,
}

impl Notification {
    pub fn new(
        child_id: ChildId,
        parent_id: ParentId,
        timestamp: DateTime<Local>,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            api_version: API_VERSION,
            id: NotificationId::new(),
            child_id,
            parent_id,
            timestamp,
            payload,
        }
    }

    /// Human-readable text, given the child's display name
    pub fn message(&self, child_name: &str) -> String {
        match &self.payload {
            NotificationPayload::GeofenceTransition { zone_name, direction } => {
                format!("{} {} {}", child_name, direction.as_str(), zone_name)
            }
            NotificationPayload::DeviceLocked { reason } => {
                format!("{}'s device was locked: {}", child_name, reason)
            }
            NotificationPayload::DeviceUnlocked => {
                format!("{}'s device was unlocked", child_name)
            }
            NotificationPayload::ScreenTimeWarning { message, .. } => {
                format!("{}: {}", child_name, message)
            }
        }
    }
}

/// What a notification is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Boundary crossing; never carries raw coordinates
    GeofenceTransition {
        zone_name: String,
        direction: TransitionDirection,
    },

    DeviceLocked {
        reason: LockReason,
    },

    DeviceUnlocked,

    ScreenTimeWarning {
        remaining_minutes: u32,
        message: String,
    },
}

impl From<&TransitionEvent> for NotificationPayload {
    fn from(event: &TransitionEvent) -> Self {
        NotificationPayload::GeofenceTransition {
            zone_name: event.zone_name.clone(),
            direction: event.direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notification_serialization() {
        let notification = Notification::new(
            ChildId::new("alex"),
            ParentId::new("parent-1"),
            Local.with_ymd_and_hms(2025, 12, 29, 15, 5, 0).unwrap(),
            NotificationPayload::GeofenceTransition {
                zone_name: "School".into(),
                direction: TransitionDirection::Left,
            },
        );

        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("geofence_transition"));
        assert!(json.contains("\"left\""));

        let parsed: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert_eq!(parsed.payload, notification.payload);
    }

    #[test]
    fn notification_message_names_the_zone() {
        let notification = Notification::new(
            ChildId::new("alex"),
            ParentId::new("parent-1"),
            Local.with_ymd_and_hms(2025, 12, 29, 8, 0, 0).unwrap(),
            NotificationPayload::GeofenceTransition {
                zone_name: "School".into(),
                direction: TransitionDirection::Entered,
            },
        );

        assert_eq!(notification.message("Alex"), "Alex entered School");
    }

    #[test]
    fn direction_from_status() {
        assert_eq!(
            TransitionDirection::from_status(GeofenceStatus::Inside),
            TransitionDirection::Entered
        );
        assert_eq!(
            TransitionDirection::from_status(GeofenceStatus::Outside),
            TransitionDirection::Left
        );
    }
}
