//! Shared utilities for kidwatch
//!
//! This crate provides:
//! - ID types (ChildId, ParentId, NotificationId)
//! - Wall-clock time utilities (minutes-since-midnight clocks, day masks, windows)
//! - Error types
//! - Default paths for the config file and data directory

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
