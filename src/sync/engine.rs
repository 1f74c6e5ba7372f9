//! The mechanical synchronisation engine.
//!
//! Keeps the flap drums in step with the authoritative time source. The
//! engine is one long-running async unit built from three stages:
//!
//! 1. [`prepare`](MechanicalSyncEngine::prepare): first-time setup, silent
//!    window gating, taking the button panel away from the user.
//! 2. [`synchronize`](MechanicalSyncEngine::synchronize): locate the
//!    drums (sensor search or fast sync), then drive hours and minutes to
//!    the current time.
//! 3. [`poll_once`](MechanicalSyncEngine::poll_once), repeated: one
//!    steady-state tick, which may request a resync.
//!
//! Hardware sequences are never cancelled half way. The only exits are
//! success or the fixed pulse bounds of the sensor search.
//!
//! Progress and faults reach the user solely through frontend
//! notifications; the log output is a developer side channel.

use log::{error, info, warn};

use crate::app::events::{Notification, SyncAlert, SyncProgress};
use crate::app::ports::{BackupRegisterPort, DelayPort, MechanismPort, Pace, RtcPort};
use crate::bus::{NotificationBus, Received, Recipient, ScanGate, ScanHold};
use crate::config::{HOUR_SEARCH_LIMIT, MINUTE_SEARCH_LIMIT, RESYNC_WARN_THRESHOLD, SyncTiming};
use crate::error::SyncFault;
use crate::storage::registers::{MechanicalPosition, PersistentRegisterStore};
use crate::sync::SyncPhase;
use crate::sync::clock::TimeSource;

/// Why steady state was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// The user committed a new authoritative time.
    NewTime,
    /// A silent window just ended; the drums are behind.
    SilentWindowEnded,
    /// The hour sensor fired away from `:00`; position was reset.
    Drift,
}

pub struct MechanicalSyncEngine<'a, M, B, R, D> {
    mechanism: M,
    registers: &'a PersistentRegisterStore<B>,
    clock: &'a TimeSource<R>,
    bus: &'a NotificationBus,
    buttons: &'a ScanGate,
    delay: D,
    timing: SyncTiming,
    phase: SyncPhase,
    resync_count: u8,
    first_setup_pending: bool,
}

impl<'a, M, B, R, D> MechanicalSyncEngine<'a, M, B, R, D>
where
    M: MechanismPort,
    B: BackupRegisterPort,
    R: RtcPort,
    D: DelayPort,
{
    /// The engine starts in `AwaitingFirstSetup` if the time source has
    /// never been set, otherwise in `PreSync`.
    pub fn new(
        mechanism: M,
        registers: &'a PersistentRegisterStore<B>,
        clock: &'a TimeSource<R>,
        bus: &'a NotificationBus,
        buttons: &'a ScanGate,
        delay: D,
        timing: SyncTiming,
    ) -> Self {
        let first_setup_pending = !clock.is_initialized();
        Self {
            mechanism,
            registers,
            clock,
            bus,
            buttons,
            delay,
            timing,
            phase: if first_setup_pending {
                SyncPhase::AwaitingFirstSetup
            } else {
                SyncPhase::PreSync
            },
            resync_count: 0,
            first_setup_pending,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Drift-triggered resyncs since the user last supplied a time.
    ///
    /// Once this reaches `RESYNC_WARN_THRESHOLD`, every following sync
    /// opens with a `TooManyResyncs` alert, not just the third. Only a
    /// user-committed time brings it back to zero.
    pub fn resync_count(&self) -> u8 {
        self.resync_count
    }

    pub fn mechanism(&self) -> &M {
        &self.mechanism
    }

    pub fn mechanism_mut(&mut self) -> &mut M {
        &mut self.mechanism
    }

    // ── Top level ─────────────────────────────────────────────

    /// Run forever. After a fatal fault the engine stays in `HaltedFault`
    /// and never actuates again.
    pub async fn run(&mut self) {
        loop {
            match self.run_until_resync().await {
                Ok(reason) => info!("SYNC: resync requested ({:?})", reason),
                Err(fault) => {
                    error!("SYNC: halted, {}", fault);
                    core::future::pending::<()>().await;
                }
            }
        }
    }

    /// One full cycle: prepare, synchronise, then tick until something
    /// asks for a resync.
    pub async fn run_until_resync(&mut self) -> Result<ResyncReason, SyncFault> {
        self.prepare().await;
        self.synchronize().await?;
        loop {
            if let Some(reason) = self.poll_once().await {
                return Ok(reason);
            }
        }
    }

    // ── Stage 1: preparation ──────────────────────────────────

    /// First-time setup (once), silent-window wait, then suspend the
    /// button unit for the duration of the sync.
    pub async fn prepare(&mut self) {
        if self.first_setup_pending {
            self.await_first_setup().await;
        }

        self.enter(SyncPhase::PreSync);
        while self.registers.silent_window().contains(self.clock.now()) {
            self.delay.delay_ms(self.timing.silent_recheck_ms).await;
        }

        self.buttons.suspend(ScanHold::Sync);
        self.delay.delay_ms(self.timing.pre_sync_settle_ms).await;
    }

    async fn await_first_setup(&mut self) {
        self.enter(SyncPhase::AwaitingFirstSetup);
        self.notify(Notification::ForceSetup);
        let mailbox = self.bus.mailbox(Recipient::Engine);
        loop {
            let code = mailbox.receive_forever().await;
            if Notification::from_code(code) == Some(Notification::NewTimeCommitted) {
                break;
            }
        }
        self.first_setup_pending = false;
        self.resync_count = 0;
        info!("SYNC: first-time setup complete");
    }

    // ── Stage 2: synchronisation ──────────────────────────────

    /// Bring the drums to the current time.
    ///
    /// A stored position of exactly `(0,0)` is unknown and triggers the
    /// sensor search; anything else is trusted and only advanced to the
    /// next hour boundary.
    pub async fn synchronize(&mut self) -> Result<(), SyncFault> {
        if self.resync_count >= RESYNC_WARN_THRESHOLD {
            warn!("SYNC: {} consecutive drift resyncs", self.resync_count);
            self.notify(Notification::Alert(SyncAlert::TooManyResyncs));
            self.delay.delay_ms(self.timing.display_hold_ms).await;
        }
        self.notify(Notification::Sync(SyncProgress::Start));
        self.delay.delay_ms(self.timing.display_hold_ms).await;

        if self.registers.position().is_zero() {
            if let Err(fault) = self.sensor_search().await {
                self.halt(fault).await;
                return Err(fault);
            }
        } else {
            self.fast_sync().await;
        }

        let target = self.clock.now();
        self.set_hours(target.hours()).await;
        self.set_minutes(target.minutes()).await;

        self.notify(Notification::Sync(SyncProgress::End));
        self.enter(SyncPhase::SteadyState);
        Ok(())
    }

    /// Locate absolute `00:00` from the sensors.
    async fn sensor_search(&mut self) -> Result<(), SyncFault> {
        self.enter(SyncPhase::SensorSearch);

        // Phase A: minute pulses until the hour sensor rises.
        self.notify(Notification::Sync(SyncProgress::SearchHour));
        let mut found = false;
        for _ in 0..MINUTE_SEARCH_LIMIT {
            let before = self.mechanism.hour_sensor();
            self.advance_minute(Pace::Fast).await;
            if !before && self.mechanism.hour_sensor() {
                found = true;
                break;
            }
        }
        if !found {
            return Err(SyncFault::MissingHourSensor);
        }

        // Phase B: hour strokes until the day sensor falls.
        self.notify(Notification::Sync(SyncProgress::SearchDay));
        self.mechanism.prepare_hour_actuator().await;
        for _ in 0..HOUR_SEARCH_LIMIT {
            let before = self.mechanism.day_sensor();
            self.advance_hour().await;
            if before && !self.mechanism.day_sensor() {
                self.registers.reset_position();
                info!("SYNC: drums at 00:00");
                return Ok(());
            }
        }
        Err(SyncFault::MissingDaySensor)
    }

    /// Advance minutes from the stored position to the next hour boundary.
    async fn fast_sync(&mut self) {
        self.enter(SyncPhase::FastSync);
        let minutes = self.registers.minutes();
        if minutes == 0 {
            return;
        }
        self.notify(Notification::Sync(SyncProgress::SearchHour));
        for _ in minutes..60 {
            self.advance_minute(Pace::Fast).await;
        }
    }

    /// Stroke the hour drum forward until it shows `target`, wrapping
    /// through midnight when the target is behind.
    async fn set_hours(&mut self, target: u8) {
        self.enter(SyncPhase::SettingHours);
        self.notify(Notification::Sync(SyncProgress::SetHours));

        if self.registers.hours() != target {
            if !self.mechanism.hour_actuator_ready() {
                self.mechanism.prepare_hour_actuator().await;
            }
            for _ in 0..24 {
                if self.registers.hours() == target {
                    break;
                }
                self.advance_hour().await;
            }
        }
        if self.mechanism.hour_actuator_ready() {
            self.mechanism.park_hour_actuator().await;
        }
    }

    async fn set_minutes(&mut self, target: u8) {
        self.enter(SyncPhase::SettingMinutes);
        self.notify(Notification::Sync(SyncProgress::SetMinutes));
        for _ in 0..60 {
            if self.registers.minutes() == target {
                break;
            }
            self.advance_minute(Pace::Fast).await;
        }
    }

    async fn halt(&mut self, fault: SyncFault) {
        if self.mechanism.hour_actuator_ready() {
            self.mechanism.park_hour_actuator().await;
        }
        self.notify(Notification::Alert(fault.into()));
        self.enter(SyncPhase::HaltedFault);
    }

    // ── Stage 3: steady state ─────────────────────────────────

    /// One steady-state tick: wait up to the poll interval for a
    /// notification, then step the minute drum if it lags the time source.
    ///
    /// Returns `Some` when the engine must go back through a full sync.
    pub async fn poll_once(&mut self) -> Option<ResyncReason> {
        let received = self
            .bus
            .mailbox(Recipient::Engine)
            .receive(self.timing.poll_ms, &mut self.delay)
            .await;
        match received {
            Received::Code(code) => {
                if Notification::from_code(code) == Some(Notification::NewTimeCommitted) {
                    self.resync_count = 0;
                    return Some(self.leave_steady_state(ResyncReason::NewTime));
                }
                return None;
            }
            Received::TimedOut => {}
        }

        let now = self.clock.now();
        if self.registers.silent_window().contains(now) {
            self.enter(SyncPhase::SilentWait);
            return None;
        }
        if self.phase == SyncPhase::SilentWait {
            return Some(self.leave_steady_state(ResyncReason::SilentWindowEnded));
        }

        if now.minutes() == self.registers.minutes() {
            return None;
        }

        let before = self.mechanism.hour_sensor();
        let position = self.advance_minute(Pace::Slow).await;
        if !before && self.mechanism.hour_sensor() && position.minutes() != 0 {
            warn!(
                "SYNC: drift, hour sensor edge at stored {:02}:{:02}",
                position.hours(),
                position.minutes()
            );
            self.registers.reset_position();
            self.resync_count = self.resync_count.saturating_add(1);
            return Some(self.leave_steady_state(ResyncReason::Drift));
        }
        None
    }

    fn leave_steady_state(&mut self, reason: ResyncReason) -> ResyncReason {
        self.enter(SyncPhase::PreSync);
        reason
    }

    // ── Actuation primitives ──────────────────────────────────

    /// One minute step on the coil phase recorded in the registers. Counting
    /// the step also flips the recorded phase.
    async fn advance_minute(&mut self, pace: Pace) -> MechanicalPosition {
        let parity = self.registers.tick_parity();
        self.mechanism.pulse_minute(parity, pace).await;
        self.registers.increment_minute()
    }

    async fn advance_hour(&mut self) -> MechanicalPosition {
        self.mechanism.advance_hour().await;
        self.registers.increment_hour()
    }

    // ── Helpers ───────────────────────────────────────────────

    fn notify(&self, notification: Notification) {
        self.bus.send(Recipient::Frontend, notification);
    }

    fn enter(&mut self, next: SyncPhase) {
        if next != self.phase {
            info!("SYNC transition: {} -> {}", self.phase.name(), next.name());
            self.phase = next;
        }
    }
}
