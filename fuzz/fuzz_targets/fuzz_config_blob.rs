//! Fuzz target: stored `ClockConfig` blob
//!
//! Decodes arbitrary bytes the way the NVS adapter does and verifies:
//! - No panics on truncated or garbage postcard input
//! - A blob that decodes and validates re-encodes to an equal config
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use cifra::config::ClockConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = postcard::from_bytes::<ClockConfig>(data) else {
        return;
    };
    if config.validate().is_err() {
        return;
    }

    let bytes = postcard::to_allocvec(&config).expect("valid config must encode");
    let again: ClockConfig = postcard::from_bytes(&bytes).expect("encoded config must decode");
    assert_eq!(again, config);
});
