//! Monitor engine: feeds the evaluators from the store and persists their results

use chrono::{DateTime, Local, NaiveDate};
use kidwatch_api::{
    AppUsage, DeviceStatus, Geofence, LocationUpdate, LockReason, Notification,
    NotificationPayload, TransitionEvent, UsageSnapshot,
};
use kidwatch_config::{ChildConfig, Policy};
use kidwatch_store::{AuditEvent, AuditEventType, Store, StoreError};
use kidwatch_util::{ChildId, KidwatchError, KidwatchResult, MINUTES_PER_DAY};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::{detect_transitions, evaluate, CoreEvent};

/// Read-evaluate-write attempts for one location report before giving up
pub const MAX_ZONE_WRITE_ATTEMPTS: u32 = 3;

/// What the last tick saw for one child
#[derive(Debug, Default)]
struct TickState {
    lock: Option<LockReason>,
    warned_on: Option<NaiveDate>,
}

/// The monitor engine
///
/// Every method takes `&self`; share it between tasks and threads with an `Arc`.
pub struct MonitorEngine {
    policy: RwLock<Policy>,
    store: Arc<dyn Store>,
    child_locks: Mutex<HashMap<ChildId, Arc<Mutex<()>>>>,
    tick_states: Mutex<HashMap<ChildId, TickState>>,
}

impl MonitorEngine {
    /// Create a new monitor engine
    pub fn new(policy: Policy, store: Arc<dyn Store>) -> Self {
        let child_count = policy.children.len();
        info!(child_count, "Monitor engine initialized");

        let _ = store.append_audit(AuditEvent::new(AuditEventType::PolicyLoaded { child_count }));

        Self {
            policy: RwLock::new(policy),
            store,
            child_locks: Mutex::new(HashMap::new()),
            tick_states: Mutex::new(HashMap::new()),
        }
    }

    /// Get the store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Replace the policy
    pub fn reload_policy(&self, policy: Policy) -> KidwatchResult<CoreEvent> {
        let child_count = policy.children.len();
        lock_recover(&self.tick_states).retain(|id, _| policy.get_child(id).is_some());
        lock_recover(&self.child_locks).retain(|id, _| policy.get_child(id).is_some());
        *self
            .policy
            .write()
            .map_err(|_| KidwatchError::internal("policy lock poisoned"))? = policy;

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::PolicyLoaded { child_count }));
        info!(child_count, "Policy reloaded");

        Ok(CoreEvent::PolicyReloaded { child_count })
    }

    /// IDs of every configured child, in configuration order
    pub fn child_ids(&self) -> Vec<ChildId> {
        match self.policy.read() {
            Ok(policy) => policy.children.iter().map(|c| c.profile.id.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Display name of a configured child
    pub fn child_name(&self, child_id: &ChildId) -> Option<String> {
        self.child(child_id).ok().map(|c| c.profile.name)
    }

    fn child(&self, child_id: &ChildId) -> KidwatchResult<ChildConfig> {
        let policy = self
            .policy
            .read()
            .map_err(|_| KidwatchError::internal("policy lock poisoned"))?;
        policy
            .get_child(child_id)
            .cloned()
            .ok_or_else(|| KidwatchError::ChildNotFound(child_id.clone()))
    }

    fn child_lock(&self, child_id: &ChildId) -> KidwatchResult<Arc<Mutex<()>>> {
        let mut locks = self
            .child_locks
            .lock()
            .map_err(|_| KidwatchError::internal("child lock table poisoned"))?;
        Ok(locks.entry(child_id.clone()).or_default().clone())
    }

    /// Enforcement decision for a child's device.
    ///
    /// Never fails: an unknown child or an unreadable usage snapshot yields
    /// a locked status with reason `error`.
    pub fn device_status(&self, child_id: &ChildId, now: DateTime<Local>) -> DeviceStatus {
        let child = match self.child(child_id) {
            Ok(child) => child,
            Err(e) => {
                warn!(child_id = %child_id, error = %e, "No profile; failing closed");
                return DeviceStatus::fail_closed();
            }
        };

        let usage = match self.store.get_usage(child_id, now.date_naive()) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(child_id = %child_id, error = %e, "Usage unavailable; failing closed");
                return DeviceStatus::fail_closed();
            }
        };

        evaluate(&child.profile, usage.as_ref(), &child.app_rules, now)
    }

    /// Run geofence detection for a location report and persist the result.
    ///
    /// Returns the transitions that fired. Each one is also stored as a
    /// notification for the child's parent.
    pub fn report_location(
        &self,
        child_id: &ChildId,
        update: &LocationUpdate,
        now: DateTime<Local>,
    ) -> KidwatchResult<Vec<TransitionEvent>> {
        if let Err(e) = update.validate() {
            let _ = self.store.append_audit(AuditEvent::at(
                AuditEventType::LocationRejected {
                    child_id: child_id.clone(),
                    reason: e.to_string(),
                },
                now,
            ));
            return Err(e);
        }

        let child = self.child(child_id)?;
        if child.profile.geofences.is_empty() {
            return Ok(Vec::new());
        }

        let lock = self.child_lock(child_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| KidwatchError::internal("child lock poisoned"))?;

        for attempt in 1..=MAX_ZONE_WRITE_ATTEMPTS {
            let stored = self.store.load_zone_states(child_id)?;
            let zones: Vec<Geofence> = child
                .profile
                .geofences
                .iter()
                .map(|zone| Geofence {
                    last_status: stored.status_of(&zone.name),
                    ..zone.clone()
                })
                .collect();

            let outcome = detect_transitions(&zones, update.coordinate(), now);
            let statuses: BTreeMap<_, _> = outcome
                .updated_zones
                .iter()
                .map(|zone| (zone.name.clone(), zone.last_status))
                .collect();

            if statuses == stored.statuses {
                debug!(child_id = %child_id, "Zone states unchanged");
                return Ok(outcome.events);
            }

            match self.store.save_zone_states(child_id, stored.version, &statuses) {
                Ok(_) => {
                    self.publish_transitions(&child, &outcome.events);
                    return Ok(outcome.events);
                }
                Err(StoreError::VersionConflict { expected, found, .. }) => {
                    warn!(
                        child_id = %child_id,
                        attempt,
                        expected,
                        found,
                        "Zone state written concurrently; re-evaluating"
                    );
                    let _ = self.store.append_audit(AuditEvent::at(
                        AuditEventType::ZoneStateConflict {
                            child_id: child_id.clone(),
                            attempt,
                        },
                        now,
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(KidwatchError::conflict(format!(
            "zone state for '{}' kept changing after {} attempts",
            child_id, MAX_ZONE_WRITE_ATTEMPTS
        )))
    }

    fn publish_transitions(&self, child: &ChildConfig, events: &[TransitionEvent]) {
        let profile = &child.profile;
        for event in events {
            info!(
                child_id = %profile.id,
                zone = %event.zone_name,
                direction = event.direction.as_str(),
                "Geofence transition"
            );

            let _ = self.store.append_audit(AuditEvent::at(
                AuditEventType::GeofenceTransition {
                    child_id: profile.id.clone(),
                    zone_name: event.zone_name.clone(),
                    direction: event.direction,
                },
                event.timestamp,
            ));

            self.notify(child, event.timestamp, NotificationPayload::from(event));
        }
    }

    fn notify(&self, child: &ChildConfig, timestamp: DateTime<Local>, payload: NotificationPayload) {
        let notification = Notification::new(
            child.profile.id.clone(),
            child.profile.parent_id.clone(),
            timestamp,
            payload,
        );
        if let Err(e) = self.store.append_notification(&notification) {
            warn!(child_id = %child.profile.id, error = %e, "Failed to store notification");
        }
    }

    /// Add app usage to today's snapshot and return the updated snapshot
    pub fn record_usage(
        &self,
        child_id: &ChildId,
        usage: AppUsage,
        now: DateTime<Local>,
    ) -> KidwatchResult<UsageSnapshot> {
        self.child(child_id)?;
        if usage.name.trim().is_empty() {
            return Err(KidwatchError::invalid_input("app name must not be empty"));
        }
        if usage.minutes > u32::from(MINUTES_PER_DAY) {
            return Err(KidwatchError::invalid_input(format!(
                "{} minutes is more than a day",
                usage.minutes
            )));
        }

        let snapshot = self.store.add_usage(child_id, now.date_naive(), &usage)?;

        let _ = self.store.append_audit(AuditEvent::at(
            AuditEventType::UsageRecorded {
                child_id: child_id.clone(),
                app: usage.name.clone(),
                minutes: usage.minutes,
            },
            now,
        ));
        debug!(
            child_id = %child_id,
            app = %usage.name,
            minutes = usage.minutes,
            total = snapshot.total_time,
            "Usage recorded"
        );

        Ok(snapshot)
    }

    /// Set or clear the parent pause for today
    pub fn set_paused(
        &self,
        child_id: &ChildId,
        paused: bool,
        now: DateTime<Local>,
    ) -> KidwatchResult<()> {
        self.child(child_id)?;
        self.store.set_paused(child_id, now.date_naive(), paused)?;

        let _ = self.store.append_audit(AuditEvent::at(
            AuditEventType::PauseChanged {
                child_id: child_id.clone(),
                paused,
            },
            now,
        ));
        info!(child_id = %child_id, paused, "Parent pause changed");

        Ok(())
    }

    /// Stored notifications for a child, newest first
    pub fn notifications(&self, child_id: &ChildId, limit: usize) -> KidwatchResult<Vec<Notification>> {
        self.child(child_id)?;
        Ok(self.store.get_notifications(child_id, limit)?)
    }

    /// Re-evaluate every child and report what changed since the last tick.
    ///
    /// The first tick for a child records a baseline without events.
    /// Warnings fire at most once per child per day.
    pub fn tick(&self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let children: Vec<ChildConfig> = match self.policy.read() {
            Ok(policy) => policy.children.clone(),
            Err(_) => {
                warn!("Policy lock poisoned; skipping tick");
                return Vec::new();
            }
        };

        let today = now.date_naive();
        let mut events = Vec::new();
        let mut states = lock_recover(&self.tick_states);

        for child in &children {
            let child_id = &child.profile.id;
            let status = self.device_status(child_id, now);
            let current = status.lock_reason.filter(|_| status.is_locked);

            match states.get_mut(child_id) {
                None => {
                    debug!(child_id = %child_id, locked = status.is_locked, "Baseline lock state");
                    states.insert(
                        child_id.clone(),
                        TickState {
                            lock: current,
                            warned_on: None,
                        },
                    );
                }
                Some(state) if state.lock != current => {
                    state.lock = current;
                    events.push(self.publish_lock_change(child, current, now));
                }
                Some(_) => {}
            }

            if status.should_warn
                && !status.is_locked
                && let Some(state) = states.get_mut(child_id)
                && state.warned_on != Some(today)
            {
                state.warned_on = Some(today);
                let message = status.warning_message.clone().unwrap_or_default();
                info!(
                    child_id = %child_id,
                    remaining_minutes = status.remaining_time,
                    "Screen time warning"
                );
                self.notify(
                    child,
                    now,
                    NotificationPayload::ScreenTimeWarning {
                        remaining_minutes: status.remaining_time,
                        message: message.clone(),
                    },
                );
                events.push(CoreEvent::ScreenTimeWarning {
                    child_id: child_id.clone(),
                    remaining_minutes: status.remaining_time,
                    message,
                });
            }
        }

        events
    }

    fn publish_lock_change(
        &self,
        child: &ChildConfig,
        lock: Option<LockReason>,
        now: DateTime<Local>,
    ) -> CoreEvent {
        let child_id = child.profile.id.clone();
        match lock {
            Some(reason) => {
                info!(child_id = %child_id, reason = reason.as_str(), "Device locked");
                let _ = self.store.append_audit(AuditEvent::at(
                    AuditEventType::DeviceLocked {
                        child_id: child_id.clone(),
                        reason,
                    },
                    now,
                ));
                self.notify(child, now, NotificationPayload::DeviceLocked { reason });
                CoreEvent::DeviceLocked { child_id, reason }
            }
            None => {
                info!(child_id = %child_id, "Device unlocked");
                let _ = self.store.append_audit(AuditEvent::at(
                    AuditEventType::DeviceUnlocked {
                        child_id: child_id.clone(),
                    },
                    now,
                ));
                self.notify(child, now, NotificationPayload::DeviceUnlocked);
                CoreEvent::DeviceUnlocked { child_id }
            }
        }
    }
}

/// Tick bookkeeping stays usable after a panic elsewhere
fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
