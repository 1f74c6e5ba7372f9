//! Debounced three-button panel with short and long press detection.
//!
//! ## Hardware
//!
//! SET, INC and DEC are active-low momentary switches with pull-ups, one
//! GPIO each. The panel is polled, not interrupt driven: a scan runs
//! every `scan_period_ms` on a fixed-deadline [`Ticker`].
//!
//! ## Per-button state machine
//!
//! 1. A raw level different from the confirmed level, with no debounce in
//!    progress, starts the debounce timer.
//! 2. Once more than `debounce_ms` has passed, a level still different
//!    from the confirmed one is committed.
//! 3. Commit-to-pressed makes the button *held* unless another button is
//!    already pressed (only one button is active at a time).
//! 4. A held button reaching `long_press_ms` fires a long press.
//! 5. Commit-to-released of the held button fires a short press unless
//!    the long press already fired.
//!
//! After every event the scanner closes the [`ScanGate`] and waits for the
//! frontend to reopen it.

use embedded_hal::digital::InputPin;
use log::{debug, info, warn};

use crate::app::events::{ButtonEvent, ButtonId, Notification};
use crate::app::ports::{BUTTON_COUNT, ButtonPanelPort, DelayPort, MonotonicPort};
use crate::bus::{NotificationBus, Recipient, ScanGate, ScanHold};
use crate::config::ButtonTiming;
use crate::time::{Ticker, ticks_elapsed};

/// Debounce bookkeeping for one input.
#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    raw_pressed: bool,
    confirmed_pressed: bool,
    debouncing: bool,
    debounce_since_ms: u32,
}

/// The single button currently allowed to produce events.
#[derive(Debug, Clone, Copy)]
struct Held {
    button: ButtonId,
    since_ms: u32,
    long_fired: bool,
}

pub struct ButtonInputProcessor {
    timing: ButtonTiming,
    buttons: [ButtonState; BUTTON_COUNT],
    held: Option<Held>,
}

impl ButtonInputProcessor {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            buttons: [ButtonState::default(); BUTTON_COUNT],
            held: None,
        }
    }

    /// Button currently held, if any.
    pub fn held(&self) -> Option<ButtonId> {
        self.held.map(|h| h.button)
    }

    /// Run one scan. `pressed[i]` is the decoded level of button `i` and
    /// `now_ms` the free-running millisecond counter.
    ///
    /// At most one event is produced per scan.
    pub fn scan(&mut self, pressed: [bool; BUTTON_COUNT], now_ms: u32) -> Option<ButtonEvent> {
        let mut event = None;

        for (i, &level) in pressed.iter().enumerate() {
            let Some(id) = ButtonId::from_index(i) else {
                continue;
            };
            let state = &mut self.buttons[i];
            state.raw_pressed = level;

            if state.raw_pressed != state.confirmed_pressed && !state.debouncing {
                state.debouncing = true;
                state.debounce_since_ms = now_ms;
                continue;
            }
            if !state.debouncing
                || ticks_elapsed(now_ms, state.debounce_since_ms) <= self.timing.debounce_ms as i32
            {
                continue;
            }
            state.debouncing = false;
            if state.raw_pressed == state.confirmed_pressed {
                // Bounced back within the window.
                continue;
            }

            if state.raw_pressed {
                let others_pressed = self
                    .buttons
                    .iter()
                    .enumerate()
                    .any(|(j, b)| j != i && b.confirmed_pressed);
                if others_pressed {
                    debug!("Button {:?}: ignored, another button is active", id);
                    continue;
                }
                self.buttons[i].confirmed_pressed = true;
                self.held = Some(Held {
                    button: id,
                    since_ms: now_ms,
                    long_fired: false,
                });
            } else {
                state.confirmed_pressed = false;
                if let Some(held) = self.held.filter(|h| h.button == id) {
                    self.held = None;
                    if !held.long_fired {
                        event = Some(ButtonEvent::short(id));
                    }
                }
            }
        }

        if let Some(held) = self.held.as_mut() {
            if !held.long_fired
                && ticks_elapsed(now_ms, held.since_ms) >= self.timing.long_press_ms as i32
            {
                held.long_fired = true;
                event = Some(ButtonEvent::long(held.button));
            }
        }

        event
    }
}

// ── Panel adapter ─────────────────────────────────────────────

/// Three active-low inputs.
pub struct ButtonPanel<P> {
    pins: [P; BUTTON_COUNT],
}

impl<P: InputPin> ButtonPanel<P> {
    pub fn new(pins: [P; BUTTON_COUNT]) -> Self {
        Self { pins }
    }
}

impl<P: InputPin> ButtonPanelPort for ButtonPanel<P> {
    fn sample(&mut self) -> [bool; BUTTON_COUNT] {
        let mut levels = [false; BUTTON_COUNT];
        for (level, pin) in levels.iter_mut().zip(self.pins.iter_mut()) {
            // A failed read counts as released rather than as a phantom press.
            *level = pin.is_low().unwrap_or_else(|_| {
                warn!("Button: GPIO read failed");
                false
            });
        }
        levels
    }
}

// ── Scanner unit ──────────────────────────────────────────────

/// The button unit: scan forever on a fixed-deadline schedule.
///
/// Each event goes to the frontend mailbox, after which the unit places an
/// event hold on `gate` and waits until no hold remains. A sync hold placed
/// by the engine takes effect before the next sample.
pub async fn run_button_scanner<P, C, D>(
    mut panel: P,
    clock: &C,
    mut delay: D,
    timing: ButtonTiming,
    bus: &NotificationBus,
    gate: &ScanGate,
) where
    P: ButtonPanelPort,
    C: MonotonicPort,
    D: DelayPort,
{
    let mut processor = ButtonInputProcessor::new(timing);
    let mut ticker = Ticker::new(clock.now_ms(), timing.scan_period_ms);
    info!(
        "Button scanner started ({} ms scan, {} ms long press)",
        timing.scan_period_ms, timing.long_press_ms
    );

    loop {
        if gate.pass().await {
            ticker.reset(clock.now_ms());
        }

        if let Some(event) = processor.scan(panel.sample(), clock.now_ms()) {
            debug!("Button event {:?}", event);
            gate.suspend(ScanHold::Event);
            bus.send(Recipient::Frontend, Notification::Button(event));
            gate.pass().await;
            ticker.reset(clock.now_ms());
        }

        delay.delay_ms(ticker.next_wait(clock.now_ms())).await;
    }
}
