//! Authoritative time source shared by the engine and the frontend.
//!
//! The RTC backend talks to the platform clock (libc time calls on
//! target), so it is guarded by a no-op mutex rather than an
//! interrupt-masking critical section. The units share one cooperative
//! executor and every method here is synchronous, so no other unit can
//! run between the two halves of a read or a commit.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::NoopMutex;

use crate::app::ports::RtcPort;
use crate::storage::registers::Calibration;
use crate::time::{CalendarDate, TimeOfDay};

/// Wraps an [`RtcPort`] so every read is a time-then-date pair and every
/// write is one uninterrupted time/date update.
pub struct TimeSource<R> {
    rtc: NoopMutex<RefCell<R>>,
}

impl<R: RtcPort> TimeSource<R> {
    pub const fn new(rtc: R) -> Self {
        Self {
            rtc: NoopMutex::new(RefCell::new(rtc)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.rtc.lock(|rtc| rtc.borrow().is_initialized())
    }

    /// Current time of day. The date read unlocks the shadow registers for
    /// the next reading and is discarded.
    pub fn now(&self) -> TimeOfDay {
        self.with_rtc(|rtc| {
            let time = rtc.read_time();
            let _ = rtc.read_date();
            time
        })
    }

    /// Install a user-supplied time. No other unit can observe a
    /// half-written time/date pair.
    pub fn commit(&self, time: TimeOfDay) {
        self.with_rtc(|rtc| {
            rtc.write_time(time);
            rtc.write_date(CalendarDate::COMMIT);
        });
    }

    pub fn apply_calibration(&self, calibration: Calibration) {
        self.with_rtc(|rtc| rtc.apply_calibration(calibration));
    }

    pub fn with_rtc<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        self.rtc.lock(|rtc| f(&mut rtc.borrow_mut()))
    }
}
