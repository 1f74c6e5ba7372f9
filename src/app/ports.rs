//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ engine / processors (domain)
//! ```
//!
//! Driven adapters (backup registers, flash, time source, mechanism,
//! button panel, delays, config storage) implement these traits. The
//! domain consumes them via generics, so the synchronisation logic never
//! touches hardware directly and runs unchanged against the simulation
//! backends in tests.
//!
//! The async ports are only ever awaited from a single-threaded
//! `LocalExecutor`, so their futures carry no `Send` bound.

#![allow(async_fn_in_trait)]

use crate::config::ClockConfig;
use crate::error::ArchiveError;
use crate::storage::registers::{Calibration, RegisterSlot, TickParity};
use crate::time::{CalendarDate, TimeOfDay};

// ───────────────────────────────────────────────────────────────
// Battery-backed registers (driven adapter: domain ↔ always-on domain)
// ───────────────────────────────────────────────────────────────

/// Raw access to the always-on register file.
///
/// Values are opaque words here; typing and sanitising happen in
/// [`PersistentRegisterStore`](crate::storage::registers::PersistentRegisterStore).
/// A register file that lost backup power reads back as all zeroes.
pub trait BackupRegisterPort {
    fn read(&self, slot: RegisterSlot) -> u32;
    fn write(&mut self, slot: RegisterSlot, value: u32);
}

// ───────────────────────────────────────────────────────────────
// Durable settings block (driven adapter: domain ↔ flash / NVS)
// ───────────────────────────────────────────────────────────────

/// One erasable two-word block on a battery-independent medium.
///
/// `erase` followed by `program` is not atomic: an interruption between
/// the two leaves an erased block, which reads back as
/// [`FlashBlockPort::ERASED`] and fails marker validation.
pub trait FlashBlockPort {
    /// Contents of an erased block.
    const ERASED: [u32; 2] = [u32::MAX; 2];

    fn erase(&mut self) -> Result<(), ArchiveError>;
    fn program(&mut self, words: [u32; 2]) -> Result<(), ArchiveError>;
    fn read(&self) -> [u32; 2];
}

// ───────────────────────────────────────────────────────────────
// Authoritative time source (driven adapter: domain ↔ RTC)
// ───────────────────────────────────────────────────────────────

/// Low-level real-time clock access.
///
/// Reading the time latches the shadow registers; they stay frozen until
/// the date is read. Callers go through
/// [`TimeSource`](crate::sync::clock::TimeSource), which always performs
/// the pair.
pub trait RtcPort {
    /// `false` until a time has been written since backup power was lost.
    fn is_initialized(&self) -> bool;
    fn read_time(&mut self) -> TimeOfDay;
    fn read_date(&mut self) -> CalendarDate;
    fn write_time(&mut self, time: TimeOfDay);
    fn write_date(&mut self, date: CalendarDate);
    /// Program the smooth-calibration unit.
    fn apply_calibration(&mut self, calibration: Calibration);
}

// ───────────────────────────────────────────────────────────────
// Delay / monotonic time (driven adapter: domain → scheduler)
// ───────────────────────────────────────────────────────────────

/// Non-busy wait. Every unit yields through this whenever it has no work.
pub trait DelayPort {
    async fn delay_ms(&mut self, ms: u32);
}

impl<T: DelayPort> DelayPort for &mut T {
    async fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms).await;
    }
}

/// Free-running millisecond counter; wraps at `u32::MAX`.
pub trait MonotonicPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Mechanism (driven adapter: domain → coil, servo, sensors)
// ───────────────────────────────────────────────────────────────

/// Pulse length selector for a minute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Bulk moves during synchronisation.
    Fast,
    /// Single steady-state steps; may be held longer.
    Slow,
}

/// Everything the synchronisation engine needs from the flap mechanism.
///
/// All actuation methods return once the step is mechanically complete,
/// including any rest time.
pub trait MechanismPort {
    /// Drive one minute step on the coil phase selected by `phase`.
    async fn pulse_minute(&mut self, phase: TickParity, pace: Pace);

    /// Power the hour servo and bring it to the release position.
    async fn prepare_hour_actuator(&mut self);

    /// One engage/release cycle of the hour servo. Requires a prior
    /// [`prepare_hour_actuator`](Self::prepare_hour_actuator).
    async fn advance_hour(&mut self);

    /// Park the hour servo and remove its drive signal.
    async fn park_hour_actuator(&mut self);

    /// Whether the servo is powered and sitting at release.
    fn hour_actuator_ready(&self) -> bool;

    /// Hour-crossing sensor level (asserted at `XX:00`).
    fn hour_sensor(&mut self) -> bool;

    /// Day-rollover sensor level (asserted while the hour drum shows 23).
    fn day_sensor(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Button panel (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Number of physical buttons on the panel.
pub const BUTTON_COUNT: usize = 3;

/// Samples the panel. `true` means pressed; active-low decoding happens
/// in the adapter.
pub trait ButtonPanelPort {
    fn sample(&mut self) -> [bool; BUTTON_COUNT];
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the clock configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Load configuration, or [`ClockConfig::default()`] if none is stored.
    fn load(&self) -> Result<ClockConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ClockConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage. Keys are namespaced per subsystem and a
/// single `write` is atomic.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Port error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is outside its allowed range.
    ValidationFailed(&'static str),
    /// The stored blob could not be decoded.
    Corrupted,
    /// The backing store failed.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "stored config corrupted"),
            Self::IoError => write!(f, "config I/O error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::IoError => write!(f, "storage I/O error"),
        }
    }
}
