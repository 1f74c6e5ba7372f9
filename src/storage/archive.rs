//! Durable settings archive.
//!
//! Backs up the silent window and calibration to a medium that survives
//! removal of the backup battery. One two-word block, not a log:
//!
//! ```text
//!   word0 = silent start [7:0] | silent end [15:8] | calibration raw [31:16]
//!   word1 = SETTINGS_MAGIC
//! ```
//!
//! `write()` erases the block then programs both words. Power loss between
//! the two steps leaves an erased block whose marker no longer matches, so
//! the next `restore()` falls back to factory defaults. That window is
//! accepted for a write that only happens on user edits.

use log::{info, warn};

use crate::app::ports::{BackupRegisterPort, FlashBlockPort};
use crate::config::SETTINGS_MAGIC;
use crate::error::ArchiveError;
use crate::storage::registers::{Calibration, PersistentRegisterStore, SilentWindow};

/// The archived subset of settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsRecord {
    pub silent_window: SilentWindow,
    pub calibration: Calibration,
}

impl SettingsRecord {
    pub const FACTORY: Self = Self {
        silent_window: SilentWindow::DEFAULT,
        calibration: Calibration::NONE,
    };

    pub const fn pack(&self) -> [u32; 2] {
        [
            self.silent_window.pack() | self.calibration.to_raw() << 16,
            SETTINGS_MAGIC,
        ]
    }

    /// Decode a block. A wrong marker or out-of-range hours reject the
    /// whole record; nothing from a rejected block is ever used.
    ///
    /// This is stricter than restoring field by field: a block whose
    /// marker matches but whose silent-window hours are out of range also
    /// loses its calibration, and the caller falls back to factory
    /// defaults for both.
    pub fn unpack(words: [u32; 2]) -> Option<Self> {
        if words[1] != SETTINGS_MAGIC {
            return None;
        }
        let silent_window = SilentWindow::unpack_strict(words[0] & 0xFFFF)?;
        let calibration = Calibration::from_raw((words[0] >> 16) & 0x3FF)?;
        Some(Self {
            silent_window,
            calibration,
        })
    }
}

/// Outcome of [`SettingsArchive::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// The archived record was valid and has been copied into the registers.
    Archived(SettingsRecord),
    /// The block was absent or invalid; factory defaults were applied.
    Defaults,
}

pub struct SettingsArchive<F> {
    flash: F,
}

impl<F: FlashBlockPort> SettingsArchive<F> {
    pub const fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Archive the current register settings.
    ///
    /// Synchronous: the units share one cooperative executor, so nothing
    /// else makes progress until the erase/program pair completes. The
    /// flash calls themselves run with interrupts enabled.
    pub fn write<B: BackupRegisterPort>(
        &mut self,
        registers: &PersistentRegisterStore<B>,
    ) -> Result<(), ArchiveError> {
        let record = SettingsRecord {
            silent_window: registers.silent_window(),
            calibration: registers.calibration(),
        };
        let words = record.pack();
        self.flash.erase()?;
        self.flash.program(words)?;
        info!(
            "Archive: saved silent {:02}-{:02}, calibration {:?}",
            record.silent_window.start_hour(),
            record.silent_window.end_hour(),
            record.calibration
        );
        Ok(())
    }

    /// Copy the archived settings back into the registers, or apply factory
    /// defaults if the block is absent or invalid. Touches nothing else.
    pub fn restore<B: BackupRegisterPort>(&self, registers: &PersistentRegisterStore<B>) -> Restored {
        let (record, outcome) = match SettingsRecord::unpack(self.flash.read()) {
            Some(record) => (record, Restored::Archived(record)),
            None => {
                warn!("Archive: no valid settings block, using factory defaults");
                (SettingsRecord::FACTORY, Restored::Defaults)
            }
        };
        registers.set_silent_window(record.silent_window);
        registers.set_calibration(record.calibration);
        outcome
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }
}
