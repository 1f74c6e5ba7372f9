//! Hour drum servo driver.
//!
//! A hobby servo pushes the hour flap over. It is only powered while a
//! sync needs it; in between the arm is parked clear of the drum and the
//! PWM output is switched off.
//!
//! ```text
//!   Off ──prepare──▶ Released ──advance──▶ (engage → release) ──▶ Released
//!                        │
//!                        └──park──▶ Off
//! ```

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::app::ports::DelayPort;
use crate::config::ServoTiming;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoState {
    /// No drive signal; arm parked or unknown.
    Off,
    /// Powered and holding the neutral release position.
    Released,
}

pub struct HourServo<P> {
    pwm: P,
    timing: ServoTiming,
    state: ServoState,
}

impl<P: SetDutyCycle> HourServo<P> {
    pub fn new(pwm: P, timing: ServoTiming) -> Self {
        let mut servo = Self {
            pwm,
            timing,
            state: ServoState::Off,
        };
        servo.output_off();
        servo
    }

    pub fn state(&self) -> ServoState {
        self.state
    }

    /// Power up and move to release.
    pub async fn prepare<D: DelayPort>(&mut self, delay: &mut D) {
        self.output_off();
        delay.delay_ms(self.timing.power_up_ms).await;
        self.set_pulse_us(self.timing.release_us);
        delay.delay_ms(self.timing.settle_ms).await;
        self.state = ServoState::Released;
        info!("Servo: powered, at release");
    }

    /// One engage/release stroke: advances the hour drum by one flap.
    pub async fn advance<D: DelayPort>(&mut self, delay: &mut D) {
        if self.state != ServoState::Released {
            warn!("Servo: advance requested while off, preparing first");
            self.prepare(delay).await;
        }
        self.set_pulse_us(self.timing.engage_us);
        delay.delay_ms(self.timing.step_ms).await;
        self.set_pulse_us(self.timing.release_us);
        delay.delay_ms(self.timing.step_ms).await;
        debug!("Servo: hour stroke");
    }

    /// Park the arm, then cut the drive signal.
    pub async fn park<D: DelayPort>(&mut self, delay: &mut D) {
        self.set_pulse_us(self.timing.park_us);
        delay.delay_ms(self.timing.park_ms).await;
        self.output_off();
        delay.delay_ms(self.timing.park_ms).await;
        self.state = ServoState::Off;
        info!("Servo: parked, output off");
    }

    fn set_pulse_us(&mut self, width_us: u16) {
        if self
            .pwm
            .set_duty_cycle_fraction(width_us, self.timing.period_us)
            .is_err()
        {
            warn!("Servo: PWM write failed ({} us)", width_us);
        }
    }

    fn output_off(&mut self) {
        if self.pwm.set_duty_cycle_fully_off().is_err() {
            warn!("Servo: PWM disable failed");
        }
    }
}
