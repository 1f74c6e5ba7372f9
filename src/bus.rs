//! Inter-unit signalling: latest-value mailboxes and the scan gate.
//!
//! ```text
//!  ┌──────────┐  button codes         ┌──────────┐
//!  │ Buttons  │──────────────────────▶│          │
//!  └──────────┘                       │ Frontend │
//!       ▲  resume (ScanGate)          │ mailbox  │──▶ UI
//!       └─────────────────────────────│          │
//!  ┌──────────┐  progress / errors    │          │
//!  │  Engine  │──────────────────────▶└──────────┘
//!  │          │◀── Engine mailbox ◀── "new time committed" (UI)
//!  └──────────┘
//! ```
//!
//! A [`Mailbox`] holds at most one pending code. `send` never blocks and
//! replaces whatever was still unread, so a burst collapses to its last
//! value. Losing intermediate notifications is expected: every consumer
//! only acts on the latest state.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::app::events::Notification;
use crate::app::ports::DelayPort;

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The UI collaborator.
    Frontend,
    /// The mechanical synchronisation engine.
    Engine,
}

/// Whether a send replaced an unread notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Fresh,
    Overwrote,
}

/// Result of a bounded wait on a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Code(u32),
    TimedOut,
}

impl Received {
    /// The decoded notification, if one arrived and its code is known.
    pub fn notification(self) -> Option<Notification> {
        match self {
            Self::Code(code) => Notification::from_code(code),
            Self::TimedOut => None,
        }
    }
}

// ── Mailbox ───────────────────────────────────────────────────

/// Single-slot, overwrite-on-send mailbox.
pub struct Mailbox {
    slot: Signal<CriticalSectionRawMutex, u32>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub const fn new() -> Self {
        Self { slot: Signal::new() }
    }

    pub fn send(&self, code: u32) -> Delivery {
        let delivery = if self.slot.signaled() {
            Delivery::Overwrote
        } else {
            Delivery::Fresh
        };
        self.slot.signal(code);
        delivery
    }

    /// Take the pending code without waiting.
    pub fn try_receive(&self) -> Option<u32> {
        self.slot.try_take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }

    /// Wait indefinitely for the next code.
    pub async fn receive_forever(&self) -> u32 {
        self.slot.wait().await
    }

    /// Wait for the next code or until `timeout_ms` elapses on `delay`.
    /// A code already pending wins over an elapsed timeout.
    pub async fn receive<D: DelayPort>(&self, timeout_ms: u32, delay: &mut D) -> Received {
        futures_lite::future::or(async { Received::Code(self.slot.wait().await) }, async {
            delay.delay_ms(timeout_ms).await;
            Received::TimedOut
        })
        .await
    }
}

// ── Bus ───────────────────────────────────────────────────────

/// One mailbox per recipient. Lives in a `static` on target and is shared
/// by reference between the units.
pub struct NotificationBus {
    frontend: Mailbox,
    engine: Mailbox,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub const fn new() -> Self {
        Self {
            frontend: Mailbox::new(),
            engine: Mailbox::new(),
        }
    }

    pub fn mailbox(&self, to: Recipient) -> &Mailbox {
        match to {
            Recipient::Frontend => &self.frontend,
            Recipient::Engine => &self.engine,
        }
    }

    pub fn send(&self, to: Recipient, notification: Notification) -> Delivery {
        self.send_code(to, notification.code())
    }

    pub fn send_code(&self, to: Recipient, code: u32) -> Delivery {
        let delivery = self.mailbox(to).send(code);
        if delivery == Delivery::Overwrote {
            log::debug!("Bus: {:?} mailbox overwritten by {}", to, code);
        }
        delivery
    }
}

// ── Scan gate ─────────────────────────────────────────────────

/// Who is keeping the button unit suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanHold {
    /// An emitted button event the frontend has not dealt with yet.
    Event = 1 << 0,
    /// A synchronisation run by the engine.
    Sync = 1 << 1,
}

/// Suspend/resume handshake for the button unit.
///
/// Each owner has its own hold. The button unit places [`ScanHold::Event`]
/// behind every event it emits and the frontend lifts it once it has
/// reacted, so at most one button event is ever unprocessed. The engine
/// places [`ScanHold::Sync`] for the length of a sync. Scanning continues
/// only when no hold remains, so lifting one hold never undoes the other.
pub struct ScanGate {
    holds: AtomicU8,
    resumed: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanGate {
    pub const fn new() -> Self {
        Self {
            holds: AtomicU8::new(0),
            resumed: Signal::new(),
        }
    }

    pub fn suspend(&self, hold: ScanHold) {
        self.resumed.reset();
        self.holds.fetch_or(hold as u8, Ordering::AcqRel);
    }

    /// Lift one hold. The gate opens only if no other hold remains.
    pub fn resume(&self, hold: ScanHold) {
        self.holds.fetch_and(!(hold as u8), Ordering::AcqRel);
        self.resumed.signal(());
    }

    /// Lift every hold.
    pub fn resume_all(&self) {
        self.holds.store(0, Ordering::Release);
        self.resumed.signal(());
    }

    pub fn is_suspended(&self) -> bool {
        self.holds.load(Ordering::Acquire) != 0
    }

    pub fn is_held_by(&self, hold: ScanHold) -> bool {
        self.holds.load(Ordering::Acquire) & hold as u8 != 0
    }

    /// Returns immediately while open; otherwise waits until every hold is
    /// lifted. Reports whether the caller was held.
    pub async fn pass(&self) -> bool {
        let mut held = false;
        while self.is_suspended() {
            held = true;
            self.resumed.wait().await;
        }
        held
    }
}
