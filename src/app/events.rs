//! Notification codes exchanged between the units.
//!
//! On the wire (the [`NotificationBus`](crate::bus::NotificationBus)
//! mailboxes) every notification is a bare `u32`; the ranges below are
//! what the frontend dispatches on.
//!
//! | Range | Meaning                                   | Sender  |
//! |-------|-------------------------------------------|---------|
//! | 10    | new time committed (engine-directed)      | UI      |
//! | 101–103 | short press, button index + 101         | buttons |
//! | 104–106 | long press, button index + 104          | buttons |
//! | 201–206 | sync progress, in order                 | engine  |
//! | 307–309 | errors                                  | engine  |
//! | 999   | force first-time setup                    | engine  |

/// Physical buttons, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ButtonId {
    Set = 0,
    Inc = 1,
    Dec = 2,
}

impl ButtonId {
    pub const ALL: [Self; 3] = [Self::Set, Self::Inc, Self::Dec];

    pub const fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Self::Set),
            1 => Some(Self::Inc),
            2 => Some(Self::Dec),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// A classified press. Exactly one is produced per physical press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub kind: PressKind,
}

impl ButtonEvent {
    pub const fn short(button: ButtonId) -> Self {
        Self {
            button,
            kind: PressKind::Short,
        }
    }

    pub const fn long(button: ButtonId) -> Self {
        Self {
            button,
            kind: PressKind::Long,
        }
    }
}

/// Synchronisation progress, in the order a full sync emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyncProgress {
    Start = 201,
    SearchHour = 202,
    SearchDay = 203,
    SetHours = 204,
    SetMinutes = 205,
    End = 206,
}

/// Engine-raised errors. The sensor faults are fatal; the resync warning
/// is display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyncAlert {
    MissingHourSensor = 307,
    MissingDaySensor = 308,
    TooManyResyncs = 309,
}

impl SyncAlert {
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::TooManyResyncs)
    }
}

impl From<crate::error::SyncFault> for SyncAlert {
    fn from(fault: crate::error::SyncFault) -> Self {
        match fault {
            crate::error::SyncFault::MissingHourSensor => Self::MissingHourSensor,
            crate::error::SyncFault::MissingDaySensor => Self::MissingDaySensor,
        }
    }
}

/// Every notification any unit sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The user committed a fresh authoritative time; resync.
    NewTimeCommitted,
    Button(ButtonEvent),
    Sync(SyncProgress),
    Alert(SyncAlert),
    /// The time source has never been set; run first-time setup.
    ForceSetup,
}

const NEW_TIME_CODE: u32 = 10;
const SHORT_BASE: u32 = 101;
const LONG_BASE: u32 = 104;
const FORCE_SETUP_CODE: u32 = 999;

impl Notification {
    pub const fn code(self) -> u32 {
        match self {
            Self::NewTimeCommitted => NEW_TIME_CODE,
            Self::Button(ev) => match ev.kind {
                PressKind::Short => SHORT_BASE + ev.button as u32,
                PressKind::Long => LONG_BASE + ev.button as u32,
            },
            Self::Sync(p) => p as u32,
            Self::Alert(a) => a as u32,
            Self::ForceSetup => FORCE_SETUP_CODE,
        }
    }

    /// Decode a raw code; unknown codes yield `None` and are ignored by
    /// every consumer.
    pub const fn from_code(code: u32) -> Option<Self> {
        let n = match code {
            NEW_TIME_CODE => Self::NewTimeCommitted,
            101..=103 => match ButtonId::from_index((code - SHORT_BASE) as usize) {
                Some(b) => Self::Button(ButtonEvent::short(b)),
                None => return None,
            },
            104..=106 => match ButtonId::from_index((code - LONG_BASE) as usize) {
                Some(b) => Self::Button(ButtonEvent::long(b)),
                None => return None,
            },
            201 => Self::Sync(SyncProgress::Start),
            202 => Self::Sync(SyncProgress::SearchHour),
            203 => Self::Sync(SyncProgress::SearchDay),
            204 => Self::Sync(SyncProgress::SetHours),
            205 => Self::Sync(SyncProgress::SetMinutes),
            206 => Self::Sync(SyncProgress::End),
            307 => Self::Alert(SyncAlert::MissingHourSensor),
            308 => Self::Alert(SyncAlert::MissingDaySensor),
            309 => Self::Alert(SyncAlert::TooManyResyncs),
            FORCE_SETUP_CODE => Self::ForceSetup,
            _ => return None,
        };
        Some(n)
    }
}
