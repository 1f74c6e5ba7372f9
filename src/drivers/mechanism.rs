//! The complete flap mechanism: coil, servo and sensors behind
//! [`MechanismPort`].

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::{DelayPort, MechanismPort, Pace};
use crate::drivers::coil::MinuteCoil;
use crate::drivers::sensors::FlapSensors;
use crate::drivers::servo::{HourServo, ServoState};
use crate::storage::registers::TickParity;

pub struct FlapMechanism<TICK, TOCK, PWM, HS, DS, D> {
    coil: MinuteCoil<TICK, TOCK>,
    servo: HourServo<PWM>,
    sensors: FlapSensors<HS, DS>,
    delay: D,
}

impl<TICK, TOCK, PWM, HS, DS, D> FlapMechanism<TICK, TOCK, PWM, HS, DS, D>
where
    TICK: OutputPin,
    TOCK: OutputPin,
    PWM: SetDutyCycle,
    HS: InputPin,
    DS: InputPin,
    D: DelayPort,
{
    pub fn new(
        coil: MinuteCoil<TICK, TOCK>,
        servo: HourServo<PWM>,
        sensors: FlapSensors<HS, DS>,
        delay: D,
    ) -> Self {
        Self {
            coil,
            servo,
            sensors,
            delay,
        }
    }

    pub fn coil(&self) -> &MinuteCoil<TICK, TOCK> {
        &self.coil
    }

    pub fn servo(&self) -> &HourServo<PWM> {
        &self.servo
    }
}

impl<TICK, TOCK, PWM, HS, DS, D> MechanismPort for FlapMechanism<TICK, TOCK, PWM, HS, DS, D>
where
    TICK: OutputPin,
    TOCK: OutputPin,
    PWM: SetDutyCycle,
    HS: InputPin,
    DS: InputPin,
    D: DelayPort,
{
    async fn pulse_minute(&mut self, phase: TickParity, pace: Pace) {
        self.coil.pulse(phase, pace, &mut self.delay).await;
    }

    async fn prepare_hour_actuator(&mut self) {
        self.servo.prepare(&mut self.delay).await;
    }

    async fn advance_hour(&mut self) {
        self.servo.advance(&mut self.delay).await;
    }

    async fn park_hour_actuator(&mut self) {
        self.servo.park(&mut self.delay).await;
    }

    fn hour_actuator_ready(&self) -> bool {
        self.servo.state() == ServoState::Released
    }

    fn hour_sensor(&mut self) -> bool {
        self.sensors.hour_asserted()
    }

    fn day_sensor(&mut self) -> bool {
        self.sensors.day_asserted()
    }
}
