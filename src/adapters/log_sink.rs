//! Log-based frontend handler.
//!
//! Implements [`FrontendHandler`] by writing every notification to the
//! ESP-IDF logger (UART / USB-CDC in production). A display driver with
//! time-editing menus would implement the same trait.
//!
//! The only command it issues: a long press on SET commits the current
//! time-source reading as the authoritative time.

use log::{info, warn};

use crate::app::commands::FrontendCommand;
use crate::app::events::{ButtonEvent, ButtonId, PressKind, SyncAlert, SyncProgress};
use crate::app::frontend::FrontendHandler;
use crate::time::TimeOfDay;

/// Handler that logs every notification to the serial console.
#[derive(Debug, Default)]
pub struct LogFrontend {
    shown: Option<TimeOfDay>,
    last_alert: Option<SyncAlert>,
}

impl LogFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reading last rendered by `on_idle`.
    pub fn shown(&self) -> Option<TimeOfDay> {
        self.shown
    }

    pub fn last_alert(&self) -> Option<SyncAlert> {
        self.last_alert
    }
}

impl FrontendHandler for LogFrontend {
    fn on_button(&mut self, event: ButtonEvent, now: TimeOfDay) -> Option<FrontendCommand> {
        info!("BUTTON | {:?} {:?} at {}", event.button, event.kind, now.render());
        match (event.button, event.kind) {
            (ButtonId::Set, PressKind::Long) => Some(FrontendCommand::CommitTime(now)),
            _ => None,
        }
    }

    fn on_force_setup(&mut self) -> Option<FrontendCommand> {
        info!("SETUP | time source not set, long-press SET to commit");
        None
    }

    fn on_sync_progress(&mut self, step: SyncProgress) {
        info!("SYNC  | {:?}", step);
    }

    fn on_alert(&mut self, alert: SyncAlert) {
        warn!("ALERT | {:?} (code {})", alert, alert as u32);
        self.last_alert = Some(alert);
    }

    fn on_idle(&mut self, now: TimeOfDay) {
        let minute = TimeOfDay::hm(now.hours(), now.minutes());
        if self.shown != minute {
            info!("TIME  | {}", now.render());
            self.shown = minute;
        }
    }
}
