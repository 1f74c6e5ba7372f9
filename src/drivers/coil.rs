//! Minute drum coil driver.
//!
//! The minute flap is advanced by an electromagnet with two windings
//! (TICK and TOCK) that must alternate; energising the same winding twice
//! in a row does not move the drum. Each winding is switched by an
//! active-low output: low energises, high releases.
//!
//! The driver is a dumb actuator. Which winding to use next is decided by
//! the caller from the persisted [`TickParity`].

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::{DelayPort, Pace};
use crate::config::CoilTiming;
use crate::storage::registers::TickParity;

pub struct MinuteCoil<TICK, TOCK> {
    tick: TICK,
    tock: TOCK,
    timing: CoilTiming,
    pulses: u32,
}

impl<TICK: OutputPin, TOCK: OutputPin> MinuteCoil<TICK, TOCK> {
    /// Takes both outputs and releases the windings.
    pub fn new(tick: TICK, tock: TOCK, timing: CoilTiming) -> Self {
        let mut coil = Self {
            tick,
            tock,
            timing,
            pulses: 0,
        };
        coil.release_all();
        coil
    }

    /// Energise one winding for the excite time, release it and rest.
    pub async fn pulse<D: DelayPort>(&mut self, phase: TickParity, pace: Pace, delay: &mut D) {
        let hold_ms = match pace {
            Pace::Fast => self.timing.excite_ms,
            Pace::Slow => self.timing.excite_ms + self.timing.slow_extra_ms,
        };

        self.drive(phase, true);
        delay.delay_ms(hold_ms).await;
        self.drive(phase, false);
        delay.delay_ms(self.timing.rest_ms).await;

        self.pulses = self.pulses.wrapping_add(1);
        debug!("Coil: {:?} pulse #{} ({} ms)", phase, self.pulses, hold_ms);
    }

    /// Minute pulses issued since power-up.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }

    fn drive(&mut self, phase: TickParity, energise: bool) {
        let failed = match (phase, energise) {
            (TickParity::Tick, true) => self.tick.set_low().is_err(),
            (TickParity::Tick, false) => self.tick.set_high().is_err(),
            (TickParity::Tock, true) => self.tock.set_low().is_err(),
            (TickParity::Tock, false) => self.tock.set_high().is_err(),
        };
        if failed {
            warn!("Coil: GPIO write failed on {:?}", phase);
        }
    }

    fn release_all(&mut self) {
        self.drive(TickParity::Tick, false);
        self.drive(TickParity::Tock, false);
    }
}
