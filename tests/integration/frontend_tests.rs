//! Frontend command path, scan-gate handshake, and whole-system runs on
//! the executor.

use futures_lite::future::{block_on, yield_now};

use cifra::adapters::backup::RtcBackupRegisters;
use cifra::adapters::log_sink::LogFrontend;
use cifra::app::commands::{CommandOutcome, FrontendCommand, SettingsService};
use cifra::app::events::{ButtonEvent, ButtonId, Notification, PressKind, SyncAlert, SyncProgress};
use cifra::app::frontend::{Frontend, FrontendHandler};
use cifra::app::ports::FlashBlockPort;
use cifra::bus::{Recipient, ScanHold};
use cifra::config::ClockConfig;
use cifra::drivers::button::run_button_scanner;
use cifra::error::ArchiveError;
use cifra::storage::archive::{SettingsArchive, SettingsRecord};
use cifra::storage::registers::{Calibration, CalibrationSign, MechanicalPosition, SilentWindow};
use cifra::sync::SyncPhase;
use cifra::time::{CalendarDate, TimeOfDay};

use crate::mock_hw::{Fixture, SimDelay, SimFlash, SimMechanism, SimPanel, SimRtc};

fn at(h: u8, m: u8) -> TimeOfDay {
    TimeOfDay::hm(h, m).unwrap()
}

fn settings(fx: &Fixture, flash: SimFlash) -> SettingsService<'_, RtcBackupRegisters, SimFlash, SimRtc> {
    SettingsService::new(&fx.registers, SettingsArchive::new(flash), &fx.clock, &fx.bus)
}

/// Handler that records everything and answers from a script.
#[derive(Default)]
struct ScriptedUi {
    setup_time: Option<TimeOfDay>,
    commit_on_long_set: bool,
    buttons: Vec<ButtonEvent>,
    progress: Vec<SyncProgress>,
    alerts: Vec<SyncAlert>,
    idle: Vec<TimeOfDay>,
}

impl FrontendHandler for ScriptedUi {
    fn on_button(&mut self, event: ButtonEvent, now: TimeOfDay) -> Option<FrontendCommand> {
        self.buttons.push(event);
        let long_set = event == ButtonEvent::long(ButtonId::Set);
        (self.commit_on_long_set && long_set).then_some(FrontendCommand::CommitTime(now))
    }

    fn on_force_setup(&mut self) -> Option<FrontendCommand> {
        self.setup_time.map(FrontendCommand::CommitTime)
    }

    fn on_sync_progress(&mut self, step: SyncProgress) {
        self.progress.push(step);
    }

    fn on_alert(&mut self, alert: SyncAlert) {
        self.alerts.push(alert);
    }

    fn on_idle(&mut self, now: TimeOfDay) {
        self.idle.push(now);
    }
}

// ── SettingsService ───────────────────────────────────────────

#[test]
fn commit_time_sets_clock_and_wakes_engine() {
    let fx = Fixture::unset();
    let mut service = settings(&fx, SimFlash::erased());

    let outcome = service.apply(FrontendCommand::CommitTime(at(7, 45)));

    assert_eq!(outcome, Ok(CommandOutcome::SyncRequested));
    assert!(fx.clock.is_initialized());
    assert_eq!(fx.clock.now(), at(7, 45));
    assert_eq!(fx.clock.with_rtc(|r| r.date()), CalendarDate::COMMIT);
    assert_eq!(
        fx.bus.mailbox(Recipient::Engine).try_receive(),
        Some(Notification::NewTimeCommitted.code())
    );
    assert_eq!(service.archive().flash().erases, 0, "time is never archived");
}

#[test]
fn silent_window_goes_to_registers_and_archive() {
    let fx = Fixture::at(12, 0);
    let mut service = settings(&fx, SimFlash::erased());
    let window = SilentWindow::new(23, 7).unwrap();

    assert_eq!(
        service.apply(FrontendCommand::SetSilentWindow(window)),
        Ok(CommandOutcome::Stored)
    );

    assert_eq!(fx.registers.silent_window(), window);
    let stored = SettingsRecord::unpack(service.archive().flash().read()).unwrap();
    assert_eq!(stored.silent_window, window);
    assert_eq!(stored.calibration, Calibration::NONE);
    assert!(!fx.bus.mailbox(Recipient::Engine).is_pending());
}

#[test]
fn calibration_reaches_time_source_and_archive() {
    let fx = Fixture::at(12, 0);
    let mut service = settings(&fx, SimFlash::erased());
    let cal = Calibration::new(CalibrationSign::Fast, 300).unwrap();

    service.apply(FrontendCommand::SetCalibration(cal)).unwrap();

    assert_eq!(fx.registers.calibration(), cal);
    assert_eq!(fx.clock.with_rtc(|r| r.calibration), Some(cal));
    let stored = SettingsRecord::unpack(service.archive().flash().read()).unwrap();
    assert_eq!(stored.calibration, cal);
}

#[test]
fn failed_archive_write_keeps_live_setting() {
    let fx = Fixture::at(12, 0);
    let mut flash = SimFlash::erased();
    flash.fail_program = true;
    let mut service = settings(&fx, flash);
    let window = SilentWindow::new(1, 5).unwrap();

    let result = service.apply(FrontendCommand::SetSilentWindow(window));

    assert_eq!(result, Err(ArchiveError::ProgramFailed));
    assert_eq!(fx.registers.silent_window(), window);
    assert_eq!(SettingsRecord::unpack(service.archive().flash().read()), None);
}

// ── Frontend dispatch ─────────────────────────────────────────

#[test]
fn handled_button_event_reopens_gate() {
    let fx = Fixture::at(12, 0);
    let mut frontend = Frontend::new(
        ScriptedUi::default(),
        settings(&fx, SimFlash::erased()),
        &fx.bus,
        &fx.gate,
    );
    fx.gate.suspend(ScanHold::Event);

    frontend.dispatch(Notification::Button(ButtonEvent::short(ButtonId::Inc)));

    assert!(!fx.gate.is_suspended());
    assert_eq!(frontend.handler().buttons, vec![ButtonEvent::short(ButtonId::Inc)]);
}

#[test]
fn committing_a_time_leaves_gate_to_the_engine() {
    let fx = Fixture::at(12, 0);
    let mut frontend = Frontend::new(
        LogFrontend::new(),
        settings(&fx, SimFlash::erased()),
        &fx.bus,
        &fx.gate,
    );
    fx.gate.suspend(ScanHold::Event);

    frontend.dispatch(Notification::Button(ButtonEvent::long(ButtonId::Set)));

    assert!(fx.gate.is_suspended());
    assert_eq!(
        fx.bus.mailbox(Recipient::Engine).try_receive(),
        Some(Notification::NewTimeCommitted.code())
    );
}

#[test]
fn sync_end_and_fatal_alerts_reopen_gate() {
    let fx = Fixture::at(12, 0);
    let mut frontend = Frontend::new(
        ScriptedUi::default(),
        settings(&fx, SimFlash::erased()),
        &fx.bus,
        &fx.gate,
    );

    fx.gate.suspend(ScanHold::Sync);
    frontend.dispatch(Notification::Sync(SyncProgress::SetHours));
    frontend.dispatch(Notification::Alert(SyncAlert::TooManyResyncs));
    assert!(fx.gate.is_suspended(), "mid-sync codes keep the panel off");

    frontend.dispatch(Notification::Sync(SyncProgress::End));
    assert!(!fx.gate.is_suspended());

    fx.gate.suspend(ScanHold::Sync);
    fx.gate.suspend(ScanHold::Event);
    frontend.dispatch(Notification::Alert(SyncAlert::MissingDaySensor));
    assert!(!fx.gate.is_suspended());

    let ui = frontend.handler();
    assert_eq!(ui.progress, vec![SyncProgress::SetHours, SyncProgress::End]);
    assert_eq!(
        ui.alerts,
        vec![SyncAlert::TooManyResyncs, SyncAlert::MissingDaySensor]
    );
}

#[test]
fn button_handled_during_sync_keeps_engine_hold() {
    let fx = Fixture::at(12, 0).with_position(12, 0);
    let mut engine = fx.quiet_engine(SimMechanism::showing(12, 0));
    let mut frontend = Frontend::new(
        ScriptedUi::default(),
        settings(&fx, SimFlash::erased()),
        &fx.bus,
        &fx.gate,
    );

    // The scanner has just emitted an event and holds itself...
    fx.gate.suspend(ScanHold::Event);
    fx.bus.send(
        Recipient::Frontend,
        Notification::Button(ButtonEvent::short(ButtonId::Inc)),
    );
    // ...when the engine starts a sync.
    block_on(engine.prepare());
    let queued = fx.bus.mailbox(Recipient::Frontend).try_receive();
    let event = queued.and_then(Notification::from_code).unwrap();
    frontend.dispatch(event);

    assert!(fx.gate.is_suspended(), "panel stays off until the sync ends");
    assert!(fx.gate.is_held_by(ScanHold::Sync));
    assert!(!fx.gate.is_held_by(ScanHold::Event));

    block_on(engine.synchronize()).unwrap();
    let end = fx.bus.mailbox(Recipient::Frontend).try_receive();
    frontend.dispatch(end.and_then(Notification::from_code).unwrap());
    assert!(!fx.gate.is_suspended());
}

#[test]
fn idle_refresh_reads_time_source() {
    let fx = Fixture::at(18, 30);
    let mut frontend = Frontend::new(
        ScriptedUi::default(),
        settings(&fx, SimFlash::erased()),
        &fx.bus,
        &fx.gate,
    );
    let mut delay = SimDelay::new(fx.time.clone(), None);

    block_on(frontend.poll_once(&mut delay, 20));
    fx.bus.send_code(Recipient::Frontend, 555);
    block_on(frontend.poll_once(&mut delay, 20));

    let ui = frontend.handler();
    assert_eq!(ui.idle.len(), 1, "unknown code is neither idle nor dispatched");
    assert_eq!((ui.idle[0].hours(), ui.idle[0].minutes()), (18, 30));
    assert!(ui.buttons.is_empty() && ui.progress.is_empty());
}

// ── Whole system ──────────────────────────────────────────────

const VIRTUAL_BUDGET_MS: u64 = 600_000;

#[test]
fn first_setup_through_to_steady_state() {
    let fx = Fixture::unset();
    let mut engine = fx.quiet_engine(SimMechanism::showing(10, 37));
    let ui = ScriptedUi {
        setup_time: Some(at(14, 25)),
        ..ScriptedUi::default()
    };
    let mut frontend = Frontend::new(ui, settings(&fx, SimFlash::erased()), &fx.bus, &fx.gate);
    let target = MechanicalPosition::new(14, 25).unwrap();

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(engine.run()).detach();
    executor
        .spawn(frontend.run(SimDelay::new(fx.time.clone(), None), 20))
        .detach();
    block_on(executor.run(async {
        while fx.registers.position() != target || fx.gate.is_suspended() {
            assert!(fx.time.elapsed_ms() < VIRTUAL_BUDGET_MS, "sync never finished");
            yield_now().await;
        }
    }));
    drop(executor);

    assert_eq!(engine.phase(), SyncPhase::SteadyState);
    assert_eq!(engine.mechanism().shown, target);
    let ui = frontend.handler();
    assert_eq!(ui.progress.first(), Some(&SyncProgress::Start));
    assert_eq!(ui.progress.last(), Some(&SyncProgress::End));
    assert!(ui.alerts.is_empty());
}

#[test]
fn long_press_set_recommits_time_and_resyncs() {
    let fx = Fixture::at(10, 0).with_position(10, 0);
    let mut engine = fx.quiet_engine(SimMechanism::showing(10, 0));
    let ui = ScriptedUi {
        commit_on_long_set: true,
        ..ScriptedUi::default()
    };
    let mut frontend = Frontend::new(ui, settings(&fx, SimFlash::erased()), &fx.bus, &fx.gate);
    let panel = SimPanel::new(fx.time.clone(), vec![(ButtonId::Set.index(), 5_000, 7_000)]);
    let cfg = ClockConfig::default();

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(engine.run()).detach();
    executor
        .spawn(frontend.run(SimDelay::new(fx.time.clone(), None), cfg.frontend_refresh_ms))
        .detach();
    executor
        .spawn(run_button_scanner(
            panel,
            &fx.time,
            SimDelay::new(fx.time.clone(), None),
            cfg.button_timing(),
            &fx.bus,
            &fx.gate,
        ))
        .detach();
    block_on(executor.run(async {
        loop {
            let committed = fx.clock.with_rtc(|r| r.writes) >= 2;
            if committed && !fx.gate.is_suspended() && fx.time.elapsed_ms() > 8_000 {
                break;
            }
            assert!(fx.time.elapsed_ms() < VIRTUAL_BUDGET_MS, "no resync after long press");
            yield_now().await;
        }
    }));
    drop(executor);

    let ui = frontend.handler();
    assert_eq!(ui.buttons.len(), 1, "release after a long press is silent");
    assert_eq!(ui.buttons[0].kind, PressKind::Long);
    assert!(ui.progress.contains(&SyncProgress::End));
    assert_eq!(engine.phase(), SyncPhase::SteadyState);
    assert_eq!(engine.resync_count(), 0);
}
