//! Shared schema for kidwatch
//!
//! Every caller (config loader, store, evaluators, service) imports its
//! models from here:
//! - Child profiles, geofences, app rules and daily usage snapshots
//! - Device status returned to the child's device
//! - Geofence transition events and parent-facing notifications
//! - Versioning

mod events;
mod status;
mod types;

pub use events::*;
pub use status::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
