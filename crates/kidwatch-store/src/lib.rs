//! Persistence layer for kidwatch
//!
//! Provides:
//! - Audit log (append-only)
//! - Daily usage snapshots (per child/day) and the parent pause flag
//! - Geofence status per child, guarded by an optimistic version
//! - Parent-facing notification records

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Zone state for '{child_id}' changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        child_id: String,
        expected: u64,
        found: u64,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for kidwatch_util::KidwatchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { .. } => kidwatch_util::KidwatchError::conflict(e.to_string()),
            other => kidwatch_util::KidwatchError::store(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
