//! Drum position sensors.
//!
//! Two hall sensors watch magnets on the drums and drive their outputs
//! high while the magnet is in front of them:
//!
//! - **hour sensor** — asserted while the minute drum shows `:00`; its
//!   rising edge marks an hour boundary.
//! - **day sensor** — asserted while the hour drum shows `23`; its falling
//!   edge marks absolute `00:00`.

use embedded_hal::digital::InputPin;
use log::warn;

pub struct FlapSensors<H, D> {
    hour: H,
    day: D,
}

impl<H: InputPin, D: InputPin> FlapSensors<H, D> {
    pub fn new(hour: H, day: D) -> Self {
        Self { hour, day }
    }

    /// A failed read counts as not asserted, so a broken input shows up
    /// as a missing sensor instead of a phantom edge.
    pub fn hour_asserted(&mut self) -> bool {
        self.hour.is_high().unwrap_or_else(|_| {
            warn!("Sensors: hour sensor read failed");
            false
        })
    }

    pub fn day_asserted(&mut self) -> bool {
        self.day.is_high().unwrap_or_else(|_| {
            warn!("Sensors: day sensor read failed");
            false
        })
    }
}
