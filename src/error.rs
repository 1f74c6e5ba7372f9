//! Unified error types for the Cifra firmware.
//!
//! A single `Error` enum that every subsystem converts into. All variants
//! are `Copy` so they travel through the engine and the frontend without
//! allocation.
//!
//! Most storage-tier problems never reach this module: invalid register
//! contents and invalid archive records are sanitised to factory defaults
//! at read time. What remains are the fatal mechanism faults and the
//! failures of the durable medium itself.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The mechanism could not be located; the engine is halted.
    Sync(SyncFault),
    /// The settings archive could not be written.
    Archive(ArchiveError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Archive(e) => write!(f, "archive: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Mechanism faults
// ---------------------------------------------------------------------------

/// Fatal faults raised by the sensor search.
///
/// Both mean the engine can no longer trust position feedback, so it stops
/// actuating until the device is power cycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFault {
    /// No rising edge on the hour sensor within the minute-pulse bound.
    MissingHourSensor,
    /// No falling edge on the day sensor within the hour-pulse bound.
    MissingDaySensor,
}

impl fmt::Display for SyncFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHourSensor => write!(f, "hour sensor not found"),
            Self::MissingDaySensor => write!(f, "day sensor not found"),
        }
    }
}

impl From<SyncFault> for Error {
    fn from(e: SyncFault) -> Self {
        Self::Sync(e)
    }
}

// ---------------------------------------------------------------------------
// Archive errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveError {
    /// The settings block could not be erased.
    EraseFailed,
    /// The settings block was erased but programming failed; the block
    /// now reads back as invalid and restores to defaults.
    ProgramFailed,
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EraseFailed => write!(f, "erase failed"),
            Self::ProgramFailed => write!(f, "program failed"),
        }
    }
}

impl From<ArchiveError> for Error {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
