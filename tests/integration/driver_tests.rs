//! Coil, servo, sensors and button panel against embedded-hal doubles.

use futures_lite::future::{block_on, or, yield_now};

use cifra::app::events::{ButtonEvent, ButtonId, Notification};
use cifra::app::ports::{ButtonPanelPort, MechanismPort, MonotonicPort, Pace};
use cifra::bus::{NotificationBus, Recipient, ScanGate, ScanHold};
use cifra::config::{ClockConfig, CoilTiming, ServoTiming};
use cifra::drivers::button::{ButtonPanel, run_button_scanner};
use cifra::drivers::coil::MinuteCoil;
use cifra::drivers::mechanism::FlapMechanism;
use cifra::drivers::sensors::FlapSensors;
use cifra::drivers::servo::{HourServo, ServoState};
use cifra::storage::registers::TickParity;

use crate::mock_hw::{MockInputPin, MockOutputPin, MockPwm, SimDelay, SimPanel, VirtualClock};

fn delay() -> SimDelay<'static> {
    SimDelay::new(VirtualClock::default(), None)
}

// ── Minute coil ───────────────────────────────────────────────

#[test]
fn coil_drives_windings_active_low() {
    let (tick, tock) = (MockOutputPin::default(), MockOutputPin::default());
    let timing = CoilTiming {
        slow_extra_ms: 50,
        ..ClockConfig::default().coil_timing()
    };
    let mut coil = MinuteCoil::new(tick.clone(), tock.clone(), timing);
    let mut d = delay();
    assert!(tick.is_high() && tock.is_high(), "both windings released at start");

    block_on(coil.pulse(TickParity::Tick, Pace::Fast, &mut d));
    assert_eq!(*tick.levels.borrow(), vec![true, false, true]);
    assert_eq!(*tock.levels.borrow(), vec![true]);

    block_on(coil.pulse(TickParity::Tock, Pace::Slow, &mut d));
    assert_eq!(*tock.levels.borrow(), vec![true, false, true]);

    assert_eq!(*d.calls.borrow(), vec![200, 200, 250, 200]);
    assert_eq!(coil.pulse_count(), 2);
}

// ── Hour servo ────────────────────────────────────────────────

#[test]
fn servo_prepare_advance_park_sequence() {
    let pwm = MockPwm::default();
    let mut servo = HourServo::new(pwm.clone(), ClockConfig::default().servo_timing());
    let mut d = delay();
    assert_eq!(pwm.last(), Some(0));
    assert_eq!(servo.state(), ServoState::Off);

    block_on(servo.prepare(&mut d));
    assert_eq!(servo.state(), ServoState::Released);
    assert_eq!(pwm.last(), Some(1480));

    block_on(servo.advance(&mut d));
    assert_eq!(*pwm.duties.borrow(), vec![0, 0, 1480, 1620, 1480]);

    block_on(servo.park(&mut d));
    assert_eq!(servo.state(), ServoState::Off);
    assert_eq!(*pwm.duties.borrow(), vec![0, 0, 1480, 1620, 1480, 1220, 0]);
    assert_eq!(*d.calls.borrow(), vec![200, 500, 300, 300, 500, 500]);
}

#[test]
fn servo_park_waits_use_park_time() {
    let timing = ServoTiming {
        settle_ms: 400,
        park_ms: 700,
        ..ClockConfig::default().servo_timing()
    };
    let mut servo = HourServo::new(MockPwm::default(), timing);
    let mut d = delay();

    block_on(servo.prepare(&mut d));
    block_on(servo.park(&mut d));

    assert_eq!(*d.calls.borrow(), vec![200, 400, 700, 700]);
}

#[test]
fn servo_advance_while_off_prepares_first() {
    let pwm = MockPwm::default();
    let mut servo = HourServo::new(pwm.clone(), ClockConfig::default().servo_timing());

    block_on(servo.advance(&mut delay()));

    assert_eq!(servo.state(), ServoState::Released);
    assert_eq!(*pwm.duties.borrow(), vec![0, 0, 1480, 1620, 1480]);
}

// ── Composed mechanism ────────────────────────────────────────

#[test]
fn mechanism_routes_to_parts() {
    let (tick, tock) = (MockOutputPin::default(), MockOutputPin::default());
    let (hour, day) = (MockInputPin::default(), MockInputPin::default());
    let cfg = ClockConfig::default();
    let mut mech = FlapMechanism::new(
        MinuteCoil::new(tick.clone(), tock.clone(), cfg.coil_timing()),
        HourServo::new(MockPwm::default(), cfg.servo_timing()),
        FlapSensors::new(hour.clone(), day.clone()),
        delay(),
    );

    block_on(mech.pulse_minute(TickParity::Tock, Pace::Fast));
    assert_eq!(mech.coil().pulse_count(), 1);
    assert_eq!(*tock.levels.borrow(), vec![true, false, true]);

    assert!(!mech.hour_actuator_ready());
    block_on(mech.prepare_hour_actuator());
    assert!(mech.hour_actuator_ready());
    block_on(mech.advance_hour());
    block_on(mech.park_hour_actuator());
    assert!(!mech.hour_actuator_ready());

    assert!(!mech.hour_sensor() && !mech.day_sensor());
    hour.high.set(true);
    assert!(mech.hour_sensor());
    day.high.set(true);
    assert!(mech.day_sensor());
}

// ── Button panel ──────────────────────────────────────────────

#[test]
fn panel_decodes_active_low_inputs() {
    let pins = [
        MockInputPin::default(),
        MockInputPin::default(),
        MockInputPin::default(),
    ];
    for p in &pins {
        p.high.set(true);
    }
    let mut panel = ButtonPanel::new(pins.clone());
    assert_eq!(panel.sample(), [false, false, false]);

    pins[ButtonId::Dec.index()].high.set(false);
    assert_eq!(panel.sample(), [false, false, true]);
}

#[test]
fn scanner_posts_events_and_waits_for_frontend() {
    let bus = NotificationBus::new();
    let gate = ScanGate::new();
    let time = VirtualClock::default();
    let panel = SimPanel::new(
        time.clone(),
        vec![
            (ButtonId::Set.index(), 100, 400),
            (ButtonId::Inc.index(), 1_000, 2_500),
        ],
    );

    let script = async {
        let mut seen = Vec::new();
        while time.elapsed_ms() < 4_000 {
            if let Some(code) = bus.mailbox(Recipient::Frontend).try_receive() {
                assert!(gate.is_held_by(ScanHold::Event), "scanner must hold until resumed");
                seen.push((time.now_ms(), code));
                gate.resume(ScanHold::Event);
            }
            yield_now().await;
        }
        seen
    };
    let scanner = async {
        run_button_scanner(
            panel,
            &time,
            SimDelay::new(time.clone(), None),
            ClockConfig::default().button_timing(),
            &bus,
            &gate,
        )
        .await;
        Vec::new()
    };
    let seen = block_on(or(script, scanner));

    let codes: Vec<u32> = seen.iter().map(|&(_, c)| c).collect();
    assert_eq!(
        codes,
        vec![
            Notification::Button(ButtonEvent::short(ButtonId::Set)).code(),
            Notification::Button(ButtonEvent::long(ButtonId::Inc)).code(),
        ]
    );
    // Release debounced ~25 ms after 400; long press ~1 s after the
    // debounced press at ~1025.
    assert!((420..=435).contains(&seen[0].0), "short at {}", seen[0].0);
    assert!((2_020..=2_035).contains(&seen[1].0), "long at {}", seen[1].0);
}

#[test]
fn engine_suspension_stops_scanning() {
    let bus = NotificationBus::new();
    let gate = ScanGate::new();
    let time = VirtualClock::default();
    let panel = SimPanel::new(time.clone(), vec![(ButtonId::Set.index(), 0, 300)]);
    gate.suspend(ScanHold::Sync);

    let script = async {
        for _ in 0..200 {
            yield_now().await;
        }
        bus.mailbox(Recipient::Frontend).is_pending()
    };
    let scanner = async {
        run_button_scanner(
            panel,
            &time,
            SimDelay::new(time.clone(), None),
            ClockConfig::default().button_timing(),
            &bus,
            &gate,
        )
        .await;
        true
    };

    assert!(!block_on(or(script, scanner)), "no event while suspended");
    assert_eq!(time.elapsed_ms(), 0, "scanner never sampled");
}
