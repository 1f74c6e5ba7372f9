//! Fuzz target: settings archive restore
//!
//! Stores an arbitrary blob under the archive key, restores it into a
//! fresh register file and verifies:
//! - No panics for any blob length or content
//! - Restored settings are always in range
//! - Anything other than an 8-byte blob with the marker yields defaults
//!
//! cargo fuzz run fuzz_settings_block

#![no_main]

use cifra::adapters::backup::RtcBackupRegisters;
use cifra::adapters::nvs::{NvsAdapter, NvsSettingsBlock, SETTINGS_KEY, SETTINGS_NAMESPACE};
use cifra::app::ports::StoragePort;
use cifra::config::SETTINGS_MAGIC;
use cifra::storage::archive::{Restored, SettingsArchive};
use cifra::storage::registers::{Calibration, PersistentRegisterStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut nvs) = NvsAdapter::new() else {
        return;
    };
    if nvs.write(SETTINGS_NAMESPACE, SETTINGS_KEY, data).is_err() {
        return;
    }

    let registers = PersistentRegisterStore::new(RtcBackupRegisters::detached());
    let archive = SettingsArchive::new(NvsSettingsBlock::new(nvs));
    let restored = archive.restore(&registers);

    let window = registers.silent_window();
    assert!(window.start_hour() < 24 && window.end_hour() < 24);
    assert!(registers.calibration().magnitude() <= Calibration::MAX_MAGNITUDE);
    assert!(registers.position().is_zero(), "restore must not touch position");

    let marked = data.len() == 8 && data[4..] == SETTINGS_MAGIC.to_le_bytes();
    if !marked {
        assert_eq!(restored, Restored::Defaults);
    }
});
