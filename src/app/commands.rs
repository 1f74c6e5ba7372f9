//! Commands produced by the UI frontend.
//!
//! These are the only ways the user changes the clock: a fresh
//! authoritative time, a new silent window, or a new crystal calibration.
//! [`SettingsService`] carries them out against the shared state.

use log::{info, warn};

use crate::app::events::Notification;
use crate::app::ports::{BackupRegisterPort, FlashBlockPort, RtcPort};
use crate::bus::{NotificationBus, Recipient};
use crate::error::ArchiveError;
use crate::storage::archive::SettingsArchive;
use crate::storage::registers::{Calibration, PersistentRegisterStore, SilentWindow};
use crate::sync::clock::TimeSource;
use crate::time::TimeOfDay;

/// Actions the frontend can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendCommand {
    /// Install a new authoritative time and resynchronise the drums.
    CommitTime(TimeOfDay),
    /// Store a new silent window (registers and archive).
    SetSilentWindow(SilentWindow),
    /// Store and apply a new calibration (registers, time source, archive).
    SetCalibration(Calibration),
}

/// What applying a command set in motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Settings stored; nothing else follows.
    Stored,
    /// The engine was told to resync; a sync sequence follows.
    SyncRequested,
}

/// Executes [`FrontendCommand`]s. Owns the archive, which only user edits
/// ever write.
pub struct SettingsService<'a, B, F, R> {
    registers: &'a PersistentRegisterStore<B>,
    archive: SettingsArchive<F>,
    clock: &'a TimeSource<R>,
    bus: &'a NotificationBus,
}

impl<'a, B, F, R> SettingsService<'a, B, F, R>
where
    B: BackupRegisterPort,
    F: FlashBlockPort,
    R: RtcPort,
{
    pub fn new(
        registers: &'a PersistentRegisterStore<B>,
        archive: SettingsArchive<F>,
        clock: &'a TimeSource<R>,
        bus: &'a NotificationBus,
    ) -> Self {
        Self {
            registers,
            archive,
            clock,
            bus,
        }
    }

    pub fn apply(&mut self, command: FrontendCommand) -> Result<CommandOutcome, ArchiveError> {
        match command {
            FrontendCommand::CommitTime(time) => {
                self.clock.commit(time);
                self.bus.send(Recipient::Engine, Notification::NewTimeCommitted);
                info!("Settings: time set to {}", time.render());
                Ok(CommandOutcome::SyncRequested)
            }
            FrontendCommand::SetSilentWindow(window) => {
                self.registers.set_silent_window(window);
                self.persist()?;
                Ok(CommandOutcome::Stored)
            }
            FrontendCommand::SetCalibration(calibration) => {
                self.registers.set_calibration(calibration);
                self.clock.apply_calibration(calibration);
                self.persist()?;
                Ok(CommandOutcome::Stored)
            }
        }
    }

    /// The register copy is already live, so a failed archive write only
    /// costs the battery-loss backup.
    fn persist(&mut self) -> Result<(), ArchiveError> {
        self.archive.write(self.registers).inspect_err(|e| {
            warn!("Settings: archive write failed: {}", e);
        })
    }

    pub fn archive(&self) -> &SettingsArchive<F> {
        &self.archive
    }

    pub fn registers(&self) -> &PersistentRegisterStore<B> {
        self.registers
    }

    pub fn clock(&self) -> &TimeSource<R> {
        self.clock
    }
}
