//! Audit event types

use chrono::{DateTime, Local};
use kidwatch_api::{LockReason, TransitionDirection};
use kidwatch_util::ChildId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Policy loaded/reloaded
    PolicyLoaded { child_count: usize },

    /// Device became locked, or the lock reason changed
    DeviceLocked { child_id: ChildId, reason: LockReason },

    /// Device became unlocked
    DeviceUnlocked { child_id: ChildId },

    /// Geofence boundary crossed
    GeofenceTransition {
        child_id: ChildId,
        zone_name: String,
        direction: TransitionDirection,
    },

    /// App usage recorded
    UsageRecorded {
        child_id: ChildId,
        app: String,
        minutes: u32,
    },

    /// Parent pause set or cleared
    PauseChanged { child_id: ChildId, paused: bool },

    /// Location report rejected before evaluation
    LocationRejected { child_id: ChildId, reason: String },

    /// Concurrent zone-state write detected; evaluation retried
    ZoneStateConflict { child_id: ChildId, attempt: u32 },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(event, kidwatch_util::now())
    }

    /// Event stamped with an explicit time
    pub fn at(event: AuditEventType, timestamp: DateTime<Local>) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
