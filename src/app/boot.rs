//! Boot-time recovery of persistent state.
//!
//! Runs once, before any unit starts. If the time source reports it was
//! never initialised, the backup battery was lost and with it the register
//! file; the archived settings are restored first. Either way the stored
//! calibration is then pushed to the time source, whose calibration unit
//! does not retain it across a reset.
//!
//! The mechanical position is left as found. A register file that lost
//! power already reads `(0,0)` and the engine will search; a surviving
//! position takes the fast path.

use log::info;

use crate::app::ports::{BackupRegisterPort, FlashBlockPort, RtcPort};
use crate::storage::archive::{Restored, SettingsArchive};
use crate::storage::registers::PersistentRegisterStore;
use crate::sync::clock::TimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// The engine will start by asking the user for the time.
    pub first_setup_required: bool,
    /// `Some` if the archive was consulted.
    pub restored: Option<Restored>,
}

pub fn boot<B, F, R>(
    registers: &PersistentRegisterStore<B>,
    archive: &SettingsArchive<F>,
    clock: &TimeSource<R>,
) -> BootReport
where
    B: BackupRegisterPort,
    F: FlashBlockPort,
    R: RtcPort,
{
    let first_setup_required = !clock.is_initialized();
    let restored = if first_setup_required {
        let outcome = archive.restore(registers);
        info!("Boot: backup power was lost, settings {:?}", outcome);
        Some(outcome)
    } else {
        None
    };

    let calibration = registers.calibration();
    clock.apply_calibration(calibration);

    let window = registers.silent_window();
    info!(
        "Boot: position {:02}:{:02}, silent {:02}-{:02}, calibration {:?}",
        registers.hours(),
        registers.minutes(),
        window.start_hour(),
        window.end_hour(),
        calibration
    );

    BootReport {
        first_setup_required,
        restored,
    }
}
