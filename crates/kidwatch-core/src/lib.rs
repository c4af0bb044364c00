//! Core evaluation engine for kidwatch
//!
//! This crate is the heart of kidwatch, containing:
//! - Device enforcement (lock decision, remaining screen time, app classification)
//! - Geofence transition detection (entered / left events, one per crossing)
//! - Daily limit resolution (day-specific limits over the generic one)
//! - The monitor engine that feeds both evaluators from the store and
//!   persists their results

mod enforcement;
mod engine;
mod events;
mod geofence;
mod limits;

pub use enforcement::*;
pub use engine::*;
pub use events::*;
pub use geofence::*;
pub use limits::*;
