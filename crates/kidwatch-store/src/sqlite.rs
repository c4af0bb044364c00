//! SQLite-based store implementation

use chrono::{DateTime, Local, NaiveDate};
use kidwatch_api::{AppUsage, GeofenceStatus, Notification, UsageSnapshot};
use kidwatch_util::ChildId;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult, ZoneStates};

/// How long a connection waits on a database locked by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- One usage snapshot per child per day
            CREATE TABLE IF NOT EXISTS usage_days (
                child_id TEXT NOT NULL,
                day TEXT NOT NULL,
                total_minutes INTEGER NOT NULL DEFAULT 0,
                is_paused INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (child_id, day)
            );

            -- Per-app usage within a snapshot
            CREATE TABLE IF NOT EXISTS app_usage (
                child_id TEXT NOT NULL,
                day TEXT NOT NULL,
                app TEXT NOT NULL,
                minutes INTEGER NOT NULL DEFAULT 0,
                category TEXT,
                PRIMARY KEY (child_id, day, app)
            );

            -- Geofence status, guarded by a per-child version
            CREATE TABLE IF NOT EXISTS zone_state_versions (
                child_id TEXT PRIMARY KEY,
                version INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS zone_states (
                child_id TEXT NOT NULL,
                zone_name TEXT NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (child_id, zone_name)
            );

            -- Parent-facing notifications
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                notification_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_usage_day ON usage_days(day);
            CREATE INDEX IF NOT EXISTS idx_notifications_child ON notifications(child_id);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn read_usage(
    conn: &Connection,
    child_id: &ChildId,
    day: NaiveDate,
) -> StoreResult<Option<UsageSnapshot>> {
    let day_str = day_key(day);

    let row: Option<(i64, bool)> = conn
        .query_row(
            "SELECT total_minutes, is_paused FROM usage_days WHERE child_id = ?1 AND day = ?2",
            params![child_id.as_str(), day_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((total_minutes, is_paused)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT app, minutes, category FROM app_usage
         WHERE child_id = ?1 AND day = ?2 ORDER BY rowid",
    )?;
    let apps = stmt
        .query_map(params![child_id.as_str(), day_str], |row| {
            let minutes: i64 = row.get(1)?;
            Ok(AppUsage {
                name: row.get(0)?,
                minutes: u32::try_from(minutes.max(0)).unwrap_or(u32::MAX),
                category: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(UsageSnapshot {
        child_id: child_id.clone(),
        day,
        total_time: u32::try_from(total_minutes.max(0)).unwrap_or(u32::MAX),
        is_paused,
        apps,
    }))
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| kidwatch_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn get_usage(&self, child_id: &ChildId, day: NaiveDate) -> StoreResult<Option<UsageSnapshot>> {
        let conn = self.conn()?;
        read_usage(&conn, child_id, day)
    }

    fn add_usage(
        &self,
        child_id: &ChildId,
        day: NaiveDate,
        usage: &AppUsage,
    ) -> StoreResult<UsageSnapshot> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let day_str = day_key(day);
        let minutes = i64::from(usage.minutes);

        tx.execute(
            r#"
            INSERT INTO usage_days (child_id, day, total_minutes, is_paused)
            VALUES (?1, ?2, ?3, 0)
            ON CONFLICT(child_id, day)
            DO UPDATE SET total_minutes = total_minutes + excluded.total_minutes
            "#,
            params![child_id.as_str(), day_str, minutes],
        )?;

        tx.execute(
            r#"
            INSERT INTO app_usage (child_id, day, app, minutes, category)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(child_id, day, app)
            DO UPDATE SET minutes = minutes + excluded.minutes,
                          category = COALESCE(excluded.category, category)
            "#,
            params![child_id.as_str(), day_str, usage.name, minutes, usage.category],
        )?;

        let snapshot = read_usage(&tx, child_id, day)?
            .ok_or_else(|| StoreError::NotFound(format!("usage for {} on {}", child_id, day_str)))?;
        tx.commit()?;

        debug!(
            child_id = %child_id,
            day = %day_str,
            app = %usage.name,
            added_minutes = usage.minutes,
            "Usage added"
        );
        Ok(snapshot)
    }

    fn set_paused(&self, child_id: &ChildId, day: NaiveDate, paused: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let day_str = day_key(day);

        conn.execute(
            r#"
            INSERT INTO usage_days (child_id, day, total_minutes, is_paused)
            VALUES (?1, ?2, 0, ?3)
            ON CONFLICT(child_id, day)
            DO UPDATE SET is_paused = excluded.is_paused
            "#,
            params![child_id.as_str(), day_str, paused],
        )?;

        debug!(child_id = %child_id, day = %day_str, paused, "Pause flag set");
        Ok(())
    }

    fn load_zone_states(&self, child_id: &ChildId) -> StoreResult<ZoneStates> {
        let conn = self.conn()?;

        let version: Option<i64> = conn
            .query_row(
                "SELECT version FROM zone_state_versions WHERE child_id = ?1",
                [child_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let mut stmt =
            conn.prepare("SELECT zone_name, status FROM zone_states WHERE child_id = ?1")?;
        let rows = stmt.query_map([child_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut statuses = BTreeMap::new();
        for row in rows {
            let (zone_name, status) = row?;
            match GeofenceStatus::parse(&status) {
                Some(status) => {
                    statuses.insert(zone_name, status);
                }
                None => {
                    warn!(child_id = %child_id, zone = %zone_name, status = %status, "Ignoring unrecognized zone status");
                }
            }
        }

        Ok(ZoneStates {
            version: version.unwrap_or(0).max(0) as u64,
            statuses,
        })
    }

    fn save_zone_states(
        &self,
        child_id: &ChildId,
        expected_version: u64,
        statuses: &BTreeMap<String, GeofenceStatus>,
    ) -> StoreResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found = tx
            .query_row(
                "SELECT version FROM zone_state_versions WHERE child_id = ?1",
                [child_id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .unwrap_or(0)
            .max(0) as u64;

        if found != expected_version {
            return Err(StoreError::VersionConflict {
                child_id: child_id.to_string(),
                expected: expected_version,
                found,
            });
        }

        tx.execute("DELETE FROM zone_states WHERE child_id = ?1", [child_id.as_str()])?;
        for (zone_name, status) in statuses {
            tx.execute(
                "INSERT INTO zone_states (child_id, zone_name, status) VALUES (?1, ?2, ?3)",
                params![child_id.as_str(), zone_name, status.as_str()],
            )?;
        }

        let new_version = found + 1;
        tx.execute(
            r#"
            INSERT INTO zone_state_versions (child_id, version)
            VALUES (?1, ?2)
            ON CONFLICT(child_id)
            DO UPDATE SET version = excluded.version
            "#,
            params![child_id.as_str(), new_version as i64],
        )?;
        tx.commit()?;

        debug!(child_id = %child_id, version = new_version, zones = statuses.len(), "Zone states saved");
        Ok(new_version)
    }

    fn append_notification(&self, notification: &Notification) -> StoreResult<()> {
        let conn = self.conn()?;
        let json = serde_json::to_string(notification)?;

        conn.execute(
            "INSERT INTO notifications (id, child_id, timestamp, notification_json) VALUES (?1, ?2, ?3, ?4)",
            params![
                notification.id.to_string(),
                notification.child_id.as_str(),
                notification.timestamp.to_rfc3339(),
                json
            ],
        )?;

        debug!(notification_id = %notification.id, child_id = %notification.child_id, "Notification stored");
        Ok(())
    }

    fn get_notifications(&self, child_id: &ChildId, limit: usize) -> StoreResult<Vec<Notification>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT notification_json FROM notifications WHERE child_id = ?1 ORDER BY rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![child_id.as_str(), limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(serde_json::from_str(&row?)?);
        }
        Ok(notifications)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
