//! Simulated hardware for integration tests.
//!
//! A virtual millisecond clock drives everything: [`SimDelay`] advances it
//! instead of sleeping and yields once so concurrent futures interleave,
//! and [`SimRtc`] derives wall time from it. [`SimMechanism`] models the
//! drums physically (the hour sensor sits at minute 0, the day sensor at
//! hour 23) so the engine's bookkeeping can be checked against what the
//! flaps actually show.
//!
//! Notifications to the frontend collapse in a single slot, so the
//! [`Recorder`] drains that slot whenever simulated time passes or the
//! mechanism is touched.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use cifra::adapters::backup::RtcBackupRegisters;
use cifra::app::ports::{
    BUTTON_COUNT, ButtonPanelPort, DelayPort, FlashBlockPort, MechanismPort, MonotonicPort, Pace,
    RtcPort,
};
use cifra::bus::{NotificationBus, Recipient, ScanGate};
use cifra::config::{ClockConfig, SyncTiming};
use cifra::error::ArchiveError;
use cifra::storage::registers::{
    Calibration, MechanicalPosition, PersistentRegisterStore, TickParity,
};
use cifra::sync::MechanicalSyncEngine;
use cifra::sync::clock::TimeSource;
use cifra::time::{CalendarDate, TimeOfDay};

// ── Virtual time ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

impl VirtualClock {
    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get() + u64::from(ms));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.0.get()
    }
}

impl MonotonicPort for VirtualClock {
    fn now_ms(&self) -> u32 {
        self.0.get() as u32
    }
}

// ── Notification recorder ─────────────────────────────────────

#[derive(Clone)]
pub struct Recorder<'a> {
    bus: &'a NotificationBus,
    seen: Rc<RefCell<Vec<u32>>>,
}

impl<'a> Recorder<'a> {
    pub fn new(bus: &'a NotificationBus) -> Self {
        Self {
            bus,
            seen: Rc::default(),
        }
    }

    pub fn drain(&self) {
        if let Some(code) = self.bus.mailbox(Recipient::Frontend).try_receive() {
            self.seen.borrow_mut().push(code);
        }
    }

    /// Everything observed so far, including a still-pending code.
    pub fn codes(&self) -> Vec<u32> {
        self.drain();
        self.seen.borrow().clone()
    }
}

// ── Delay ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SimDelay<'a> {
    clock: VirtualClock,
    recorder: Option<Recorder<'a>>,
    pub calls: Rc<RefCell<Vec<u32>>>,
}

impl<'a> SimDelay<'a> {
    pub fn new(clock: VirtualClock, recorder: Option<Recorder<'a>>) -> Self {
        Self {
            clock,
            recorder,
            calls: Rc::default(),
        }
    }
}

impl DelayPort for SimDelay<'_> {
    async fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(ms);
        self.calls.borrow_mut().push(ms);
        if let Some(r) = &self.recorder {
            r.drain();
        }
        futures_lite::future::yield_now().await;
    }
}

// ── Time source ───────────────────────────────────────────────

pub struct SimRtc {
    clock: VirtualClock,
    /// Seconds of day at virtual time zero.
    base_secs: u32,
    initialized: bool,
    latched: Option<TimeOfDay>,
    date: CalendarDate,
    pub calibration: Option<Calibration>,
    pub writes: u32,
}

impl SimRtc {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            base_secs: 0,
            initialized: false,
            latched: None,
            date: CalendarDate {
                year: 0,
                month: 1,
                day: 1,
            },
            calibration: None,
            writes: 0,
        }
    }

    /// Move the wall clock without marking a user commit.
    pub fn set(&mut self, time: TimeOfDay) {
        let elapsed = (self.clock.elapsed_ms() / 1000) as u32 % 86_400;
        self.base_secs = (time.seconds_of_day() + 86_400 - elapsed) % 86_400;
        self.initialized = true;
        self.latched = None;
    }

    pub fn date(&self) -> CalendarDate {
        self.date
    }

    fn current(&self) -> TimeOfDay {
        let elapsed = (self.clock.elapsed_ms() / 1000) as u32;
        TimeOfDay::from_seconds_of_day(self.base_secs + elapsed)
    }
}

impl RtcPort for SimRtc {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn read_time(&mut self) -> TimeOfDay {
        let now = self.current();
        *self.latched.get_or_insert(now)
    }

    fn read_date(&mut self) -> CalendarDate {
        self.latched = None;
        self.date
    }

    fn write_time(&mut self, time: TimeOfDay) {
        self.set(time);
        self.writes += 1;
    }

    fn write_date(&mut self, date: CalendarDate) {
        self.date = date;
        self.writes += 1;
    }

    fn apply_calibration(&mut self, calibration: Calibration) {
        self.calibration = Some(calibration);
    }
}

// ── Flash block ───────────────────────────────────────────────

pub struct SimFlash {
    pub words: [u32; 2],
    pub erases: u32,
    pub programs: u32,
    pub fail_erase: bool,
    pub fail_program: bool,
}

impl SimFlash {
    pub fn erased() -> Self {
        Self::holding(Self::ERASED)
    }

    pub fn holding(words: [u32; 2]) -> Self {
        Self {
            words,
            erases: 0,
            programs: 0,
            fail_erase: false,
            fail_program: false,
        }
    }
}

impl FlashBlockPort for SimFlash {
    fn erase(&mut self) -> Result<(), ArchiveError> {
        if self.fail_erase {
            return Err(ArchiveError::EraseFailed);
        }
        self.erases += 1;
        self.words = Self::ERASED;
        Ok(())
    }

    fn program(&mut self, words: [u32; 2]) -> Result<(), ArchiveError> {
        if self.fail_program {
            return Err(ArchiveError::ProgramFailed);
        }
        self.programs += 1;
        // NOR semantics: programming only clears bits.
        self.words = [self.words[0] & words[0], self.words[1] & words[1]];
        Ok(())
    }

    fn read(&self) -> [u32; 2] {
        self.words
    }
}

// ── Mechanism ─────────────────────────────────────────────────

pub struct SimMechanism<'a> {
    /// What the drums physically show.
    pub shown: MechanicalPosition,
    pub pulses: Vec<(TickParity, Pace)>,
    pub strokes: u32,
    pub prepares: u32,
    pub parks: u32,
    pub servo_ready: bool,
    pub hour_sensor_fitted: bool,
    pub day_sensor_fitted: bool,
    pub hour_sensor_reads: u32,
    pub day_sensor_reads: u32,
    /// Minute pulses that will be lost before the drum moves again.
    pub slip_next: u32,
    recorder: Option<Recorder<'a>>,
}

impl<'a> SimMechanism<'a> {
    pub fn showing(hours: u8, minutes: u8) -> Self {
        Self {
            shown: MechanicalPosition::new(hours, minutes).expect("valid position"),
            pulses: Vec::new(),
            strokes: 0,
            prepares: 0,
            parks: 0,
            servo_ready: false,
            hour_sensor_fitted: true,
            day_sensor_fitted: true,
            hour_sensor_reads: 0,
            day_sensor_reads: 0,
            slip_next: 0,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Recorder<'a>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn observe(&self) {
        if let Some(r) = &self.recorder {
            r.drain();
        }
    }
}

impl MechanismPort for SimMechanism<'_> {
    async fn pulse_minute(&mut self, phase: TickParity, pace: Pace) {
        self.observe();
        self.pulses.push((phase, pace));
        if self.slip_next > 0 {
            self.slip_next -= 1;
        } else {
            self.shown = self.shown.after_minute();
        }
    }

    async fn prepare_hour_actuator(&mut self) {
        self.observe();
        self.prepares += 1;
        self.servo_ready = true;
    }

    async fn advance_hour(&mut self) {
        self.observe();
        assert!(self.servo_ready, "hour stroke with the servo unpowered");
        self.strokes += 1;
        let next = (self.shown.hours() + 1) % 24;
        self.shown = MechanicalPosition::new(next, self.shown.minutes()).expect("valid position");
    }

    async fn park_hour_actuator(&mut self) {
        self.observe();
        self.parks += 1;
        self.servo_ready = false;
    }

    fn hour_actuator_ready(&self) -> bool {
        self.observe();
        self.servo_ready
    }

    fn hour_sensor(&mut self) -> bool {
        self.observe();
        self.hour_sensor_reads += 1;
        self.hour_sensor_fitted && self.shown.minutes() == 0
    }

    fn day_sensor(&mut self) -> bool {
        self.observe();
        self.day_sensor_reads += 1;
        self.day_sensor_fitted && self.shown.hours() == 23
    }
}

// ── Button panel ──────────────────────────────────────────────

/// Presses scripted against virtual time: `(button, from_ms, to_ms)`.
pub struct SimPanel {
    clock: VirtualClock,
    presses: Vec<(usize, u32, u32)>,
}

impl SimPanel {
    pub fn new(clock: VirtualClock, presses: Vec<(usize, u32, u32)>) -> Self {
        Self { clock, presses }
    }
}

impl ButtonPanelPort for SimPanel {
    fn sample(&mut self) -> [bool; BUTTON_COUNT] {
        let now = self.clock.now_ms();
        let mut levels = [false; BUTTON_COUNT];
        for &(button, from, to) in &self.presses {
            if (from..to).contains(&now) {
                levels[button] = true;
            }
        }
        levels
    }
}

// ── embedded-hal doubles ──────────────────────────────────────

/// Output pin recording every level written; `true` = high.
#[derive(Clone, Default)]
pub struct MockOutputPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl MockOutputPin {
    pub fn is_high(&self) -> bool {
        self.levels.borrow().last().copied().unwrap_or(false)
    }
}

impl embedded_hal::digital::ErrorType for MockOutputPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockOutputPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Input pin with a settable level.
#[derive(Clone, Default)]
pub struct MockInputPin {
    pub high: Rc<Cell<bool>>,
}

impl embedded_hal::digital::ErrorType for MockInputPin {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for MockInputPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high.get())
    }
}

/// PWM channel whose full scale is 20 000, so a pulse width in µs over a
/// 20 ms period lands as the same number.
#[derive(Clone, Default)]
pub struct MockPwm {
    pub duties: Rc<RefCell<Vec<u16>>>,
}

impl MockPwm {
    pub const MAX: u16 = 20_000;

    pub fn last(&self) -> Option<u16> {
        self.duties.borrow().last().copied()
    }
}

impl embedded_hal::pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl embedded_hal::pwm::SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        Self::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duties.borrow_mut().push(duty);
        Ok(())
    }
}

// ── Engine fixture ────────────────────────────────────────────

pub type SimEngine<'a> =
    MechanicalSyncEngine<'a, SimMechanism<'a>, RtcBackupRegisters, SimRtc, SimDelay<'a>>;

/// Shared state every unit borrows.
pub struct Fixture {
    pub bus: NotificationBus,
    pub gate: ScanGate,
    pub registers: PersistentRegisterStore<RtcBackupRegisters>,
    pub clock: TimeSource<SimRtc>,
    pub time: VirtualClock,
    pub timing: SyncTiming,
}

impl Fixture {
    /// Time source never set: the first-setup state after battery loss.
    pub fn unset() -> Self {
        let time = VirtualClock::default();
        Self {
            bus: NotificationBus::new(),
            gate: ScanGate::new(),
            registers: PersistentRegisterStore::new(RtcBackupRegisters::detached()),
            clock: TimeSource::new(SimRtc::new(time.clone())),
            time,
            timing: ClockConfig::default().sync_timing(),
        }
    }

    /// Time source running and reading `hours:minutes:00`.
    pub fn at(hours: u8, minutes: u8) -> Self {
        let fx = Self::unset();
        fx.set_time(hours, minutes);
        fx
    }

    pub fn set_time(&self, hours: u8, minutes: u8) {
        let t = TimeOfDay::hm(hours, minutes).expect("valid time");
        self.clock.with_rtc(|rtc| rtc.set(t));
    }

    pub fn with_position(self, hours: u8, minutes: u8) -> Self {
        self.registers
            .set_position(MechanicalPosition::new(hours, minutes).expect("valid position"));
        self
    }

    pub fn recorder(&self) -> Recorder<'_> {
        Recorder::new(&self.bus)
    }

    pub fn delay<'a>(&'a self, recorder: &Recorder<'a>) -> SimDelay<'a> {
        SimDelay::new(self.time.clone(), Some(recorder.clone()))
    }

    pub fn engine<'a>(&'a self, mechanism: SimMechanism<'a>, recorder: &Recorder<'a>) -> SimEngine<'a> {
        MechanicalSyncEngine::new(
            mechanism.with_recorder(recorder.clone()),
            &self.registers,
            &self.clock,
            &self.bus,
            &self.gate,
            self.delay(recorder),
            self.timing,
        )
    }

    /// Engine that leaves the frontend mailbox to a real consumer.
    pub fn quiet_engine<'a>(&'a self, mechanism: SimMechanism<'a>) -> SimEngine<'a> {
        MechanicalSyncEngine::new(
            mechanism,
            &self.registers,
            &self.clock,
            &self.bus,
            &self.gate,
            SimDelay::new(self.time.clone(), None),
            self.timing,
        )
    }
}
