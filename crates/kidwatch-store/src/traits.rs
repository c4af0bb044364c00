//! Store trait definitions

use chrono::NaiveDate;
use kidwatch_api::{AppUsage, GeofenceStatus, Notification, UsageSnapshot};
use kidwatch_util::ChildId;
use std::collections::BTreeMap;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Daily usage

    /// Get the usage snapshot for a child on a specific day, if one exists
    fn get_usage(&self, child_id: &ChildId, day: NaiveDate) -> StoreResult<Option<UsageSnapshot>>;

    /// Add app usage for a child on a specific day, creating the snapshot
    /// on first use, and return the updated snapshot
    fn add_usage(
        &self,
        child_id: &ChildId,
        day: NaiveDate,
        usage: &AppUsage,
    ) -> StoreResult<UsageSnapshot>;

    /// Set or clear the parent pause for a child on a specific day
    fn set_paused(&self, child_id: &ChildId, day: NaiveDate, paused: bool) -> StoreResult<()>;

    // Geofence state

    /// Load the stored status of every zone of a child
    fn load_zone_states(&self, child_id: &ChildId) -> StoreResult<ZoneStates>;

    /// Replace the stored zone statuses if the stored version still equals
    /// `expected_version`. Returns the new version, or
    /// `StoreError::VersionConflict` if another writer got there first.
    fn save_zone_states(
        &self,
        child_id: &ChildId,
        expected_version: u64,
        statuses: &BTreeMap<String, GeofenceStatus>,
    ) -> StoreResult<u64>;

    // Notifications

    /// Persist a parent-facing notification
    fn append_notification(&self, notification: &Notification) -> StoreResult<()>;

    /// Get notifications for a child, newest first
    fn get_notifications(&self, child_id: &ChildId, limit: usize) -> StoreResult<Vec<Notification>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Versioned zone statuses for one child
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneStates {
    /// 0 means nothing has been written yet
    pub version: u64,
    pub statuses: BTreeMap<String, GeofenceStatus>,
}

impl ZoneStates {
    /// Stored status of a zone; zones never written are `Unknown`
    pub fn status_of(&self, zone_name: &str) -> GeofenceStatus {
        self.statuses.get(zone_name).copied().unwrap_or_default()
    }
}
