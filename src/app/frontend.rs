//! The UI side of the notification protocol.
//!
//! Rendering and menu flows belong to whatever implements
//! [`FrontendHandler`]. This module owns the parts of the protocol every
//! frontend must honour:
//!
//! - decode frontend mailbox codes by range and dispatch them;
//! - execute the returned [`FrontendCommand`]s;
//! - close the button flow-control handshake by reopening the
//!   [`ScanGate`] once an event has been dealt with.
//!
//! ```text
//!   mailbox ──▶ Frontend::dispatch ──▶ FrontendHandler
//!                     │                      │ Option<FrontendCommand>
//!                     ▼                      ▼
//!            ScanGate::resume(hold)   SettingsService::apply
//! ```

use log::{debug, warn};

use crate::app::commands::{CommandOutcome, FrontendCommand, SettingsService};
use crate::app::events::{ButtonEvent, Notification, SyncAlert, SyncProgress};
use crate::app::ports::{BackupRegisterPort, DelayPort, FlashBlockPort, RtcPort};
use crate::bus::{NotificationBus, Received, Recipient, ScanGate, ScanHold};
use crate::time::TimeOfDay;

/// Presentation and menu logic supplied by the display UI.
pub trait FrontendHandler {
    /// A classified button press. `now` is the current time-source reading.
    fn on_button(&mut self, event: ButtonEvent, now: TimeOfDay) -> Option<FrontendCommand>;

    /// The time source was never set; first-time setup should begin.
    fn on_force_setup(&mut self) -> Option<FrontendCommand> {
        None
    }

    fn on_sync_progress(&mut self, _step: SyncProgress) {}

    fn on_alert(&mut self, _alert: SyncAlert) {}

    /// No notification within the refresh interval.
    fn on_idle(&mut self, _now: TimeOfDay) {}
}

pub struct Frontend<'a, H, B, F, R> {
    handler: H,
    settings: SettingsService<'a, B, F, R>,
    bus: &'a NotificationBus,
    buttons: &'a ScanGate,
}

impl<'a, H, B, F, R> Frontend<'a, H, B, F, R>
where
    H: FrontendHandler,
    B: BackupRegisterPort,
    F: FlashBlockPort,
    R: RtcPort,
{
    pub fn new(
        handler: H,
        settings: SettingsService<'a, B, F, R>,
        bus: &'a NotificationBus,
        buttons: &'a ScanGate,
    ) -> Self {
        Self {
            handler,
            settings,
            bus,
            buttons,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn settings(&self) -> &SettingsService<'a, B, F, R> {
        &self.settings
    }

    /// The frontend unit: poll the mailbox every `refresh_ms` forever.
    pub async fn run<D: DelayPort>(&mut self, mut delay: D, refresh_ms: u32) {
        loop {
            self.poll_once(&mut delay, refresh_ms).await;
        }
    }

    /// Wait up to `refresh_ms` for one notification and handle it.
    pub async fn poll_once<D: DelayPort>(&mut self, delay: &mut D, refresh_ms: u32) {
        let received = self
            .bus
            .mailbox(Recipient::Frontend)
            .receive(refresh_ms, delay)
            .await;
        match received {
            Received::Code(code) => match Notification::from_code(code) {
                Some(n) => self.dispatch(n),
                None => debug!("Frontend: ignoring code {}", code),
            },
            Received::TimedOut => self.handler.on_idle(self.settings.clock().now()),
        }
    }

    /// Handle one decoded notification.
    pub fn dispatch(&mut self, notification: Notification) {
        match notification {
            Notification::ForceSetup => {
                let command = self.handler.on_force_setup();
                self.execute(command);
                self.buttons.resume_all();
            }
            Notification::Button(event) => {
                let now = self.settings.clock().now();
                let command = self.handler.on_button(event, now);
                // A committed time starts a sync; the event hold stays until
                // that sync ends. Otherwise only this event's hold is lifted,
                // never the engine's.
                if self.execute(command) != Some(CommandOutcome::SyncRequested) {
                    self.buttons.resume(ScanHold::Event);
                }
            }
            Notification::Sync(step) => {
                self.handler.on_sync_progress(step);
                // The sync's End may have overwritten a queued button event,
                // so every hold goes.
                if step == SyncProgress::End {
                    self.buttons.resume_all();
                }
            }
            Notification::Alert(alert) => {
                self.handler.on_alert(alert);
                // A halted engine no longer needs the panel. The resync
                // warning arrives mid-sync, when it must stay suspended.
                if alert.is_fatal() {
                    self.buttons.resume_all();
                }
            }
            Notification::NewTimeCommitted => {
                debug!("Frontend: engine-directed code on frontend mailbox");
            }
        }
    }

    fn execute(&mut self, command: Option<FrontendCommand>) -> Option<CommandOutcome> {
        let command = command?;
        match self.settings.apply(command) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Frontend: {:?} not archived: {}", command, e);
                Some(CommandOutcome::Stored)
            }
        }
    }
}
