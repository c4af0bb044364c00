//! Core events emitted by the engine

use kidwatch_api::LockReason;
use kidwatch_util::ChildId;

/// Events emitted by the monitor engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Device became locked, or is locked for a different reason than before
    DeviceLocked {
        child_id: ChildId,
        reason: LockReason,
    },

    /// Device was locked on the previous tick and no longer is
    DeviceUnlocked {
        child_id: ChildId,
    },

    /// Remaining screen time dropped to the warning threshold
    ScreenTimeWarning {
        child_id: ChildId,
        remaining_minutes: u32,
        message: String,
    },

    /// Policy was reloaded
    PolicyReloaded {
        child_count: usize,
    },
}
