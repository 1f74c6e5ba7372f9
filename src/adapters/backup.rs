//! Always-on register file adapter.
//!
//! - **`target_os = "espidf"`**: five words in RTC slow memory
//!   (`.rtc_noinit`), which survives resets and deep sleep as long as the
//!   RTC domain stays powered. A sixth word holds a validity marker;
//!   memory found without it came up from a power loss and is cleared to
//!   zero, the documented lost-backup state.
//! - **`not(target_os = "espidf")`**: a plain array.

use core::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::app::ports::BackupRegisterPort;
use crate::storage::registers::RegisterSlot;

static TAKEN: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "espidf")]
const VALID_MARKER: u32 = 0x5AFE_C1F5;

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc_noinit")]
static mut RTC_WORDS: [u32; RegisterSlot::COUNT + 1] = [0; RegisterSlot::COUNT + 1];

/// Handle to the register file. At most one exists per boot.
pub struct RtcBackupRegisters {
    #[cfg(not(target_os = "espidf"))]
    words: [u32; RegisterSlot::COUNT],
}

impl RtcBackupRegisters {
    /// Claim the register file. Returns `None` on a second call.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self::claim())
    }

    #[cfg(target_os = "espidf")]
    fn claim() -> Self {
        let marker_slot = RegisterSlot::COUNT;
        // SAFETY: `TAKEN` guarantees this is the only handle; all access
        // goes through raw pointers with volatile operations.
        unsafe {
            let words = &raw mut RTC_WORDS;
            let marker = core::ptr::read_volatile((*words).as_ptr().add(marker_slot));
            if marker != VALID_MARKER {
                info!("Backup registers: RTC domain lost power, clearing");
                for i in 0..RegisterSlot::COUNT {
                    core::ptr::write_volatile((*words).as_mut_ptr().add(i), 0);
                }
                core::ptr::write_volatile((*words).as_mut_ptr().add(marker_slot), VALID_MARKER);
            }
        }
        Self {}
    }

    #[cfg(not(target_os = "espidf"))]
    fn claim() -> Self {
        info!("Backup registers: simulation backend");
        Self::detached()
    }

    /// A standalone register file, independent of the process-wide claim.
    #[cfg(not(target_os = "espidf"))]
    pub fn detached() -> Self {
        Self {
            words: [0; RegisterSlot::COUNT],
        }
    }

    /// Simulate loss of backup power.
    #[cfg(not(target_os = "espidf"))]
    pub fn lose_power(&mut self) {
        self.words = [0; RegisterSlot::COUNT];
    }
}

impl BackupRegisterPort for RtcBackupRegisters {
    #[cfg(target_os = "espidf")]
    fn read(&self, slot: RegisterSlot) -> u32 {
        // SAFETY: see `claim`; `slot.index()` is below `COUNT`.
        unsafe {
            let words = &raw const RTC_WORDS;
            core::ptr::read_volatile((*words).as_ptr().add(slot.index()))
        }
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, slot: RegisterSlot, value: u32) {
        // SAFETY: see `claim`; `slot.index()` is below `COUNT`.
        unsafe {
            let words = &raw mut RTC_WORDS;
            core::ptr::write_volatile((*words).as_mut_ptr().add(slot.index()), value);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&self, slot: RegisterSlot) -> u32 {
        self.words[slot.index()]
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, slot: RegisterSlot, value: u32) {
        self.words[slot.index()] = value;
    }
}
