//! Fuzz target: `ButtonInputProcessor::scan`
//!
//! Each input byte is one scan: the low three bits are the button levels,
//! the high bits stretch the gap to the next scan. Verifies:
//! - No panics for any level sequence, including counter wrap
//! - Every event names the button that was held when the scan started
//! - A press never reports twice (long, then short on release)
//!
//! cargo fuzz run fuzz_button_scan

#![no_main]

use cifra::app::events::PressKind;
use cifra::config::ButtonTiming;
use cifra::drivers::button::ButtonInputProcessor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let timing = ButtonTiming::default();
    let mut processor = ButtonInputProcessor::new(timing);
    let mut now = u32::MAX - 2_000;
    let mut long_reported = None;

    for &byte in data {
        let levels = [byte & 1 != 0, byte & 2 != 0, byte & 4 != 0];
        let held_before = processor.held();

        if let Some(event) = processor.scan(levels, now) {
            match event.kind {
                PressKind::Long => {
                    assert_eq!(processor.held(), Some(event.button));
                    assert_ne!(long_reported, Some(event.button), "long press reported twice");
                    long_reported = Some(event.button);
                }
                PressKind::Short => {
                    assert_eq!(held_before, Some(event.button));
                    assert_ne!(long_reported, Some(event.button), "short after long");
                }
            }
        }
        if processor.held().is_none() {
            long_reported = None;
        }

        now = now.wrapping_add(timing.scan_period_ms * (1 + u32::from(byte >> 3)));
    }
});
