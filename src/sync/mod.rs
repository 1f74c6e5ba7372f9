//! Mechanical synchronisation.
//!
//! ```text
//!   AwaitingFirstSetup ─┐
//!                       ▼
//!   ┌──────────────▶ PreSync ──(position unknown)──▶ SensorSearch ──┐
//!   │                   │                                │          │
//!   │                   └──(position known)──▶ FastSync  │ fault    │
//!   │                                             │      ▼          │
//!   │                                             │  HaltedFault    │
//!   │                                             ▼                 │
//!   │                         SettingHours ◀───────────────────────┘
//!   │                              │
//!   │                         SettingMinutes
//!   │                              │
//!   │                         SteadyState ◀──▶ SilentWait
//!   │                              │               │
//!   └──── new time / drift ────────┴── silent end ─┘
//! ```

pub mod clock;
pub mod engine;

pub use engine::{MechanicalSyncEngine, ResyncReason};

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncPhase {
    AwaitingFirstSetup = 0,
    PreSync = 1,
    SensorSearch = 2,
    FastSync = 3,
    SettingHours = 4,
    SettingMinutes = 5,
    SteadyState = 6,
    SilentWait = 7,
    HaltedFault = 8,
}

impl SyncPhase {
    pub const fn name(self) -> &'static str {
        match self {
            Self::AwaitingFirstSetup => "AWAITING_FIRST_SETUP",
            Self::PreSync => "PRE_SYNC",
            Self::SensorSearch => "SENSOR_SEARCH",
            Self::FastSync => "FAST_SYNC",
            Self::SettingHours => "SETTING_HOURS",
            Self::SettingMinutes => "SETTING_MINUTES",
            Self::SteadyState => "STEADY_STATE",
            Self::SilentWait => "SILENT_WAIT",
            Self::HaltedFault => "HALTED_FAULT",
        }
    }
}
