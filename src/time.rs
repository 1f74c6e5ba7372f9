//! Time-of-day values and wrap-safe tick arithmetic.
//!
//! Two clocks meet in this firmware: the authoritative wall clock
//! ([`TimeOfDay`], read through the time source) and a free-running
//! millisecond counter used for scheduling. The counter is a `u32` and
//! wraps after ~49 days, so every comparison goes through
//! [`ticks_elapsed`] instead of plain subtraction.

use core::fmt::Write as _;

use heapless::String;

/// Hour/minute/second reading from the authoritative time source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Returns `None` unless `hours < 24`, `minutes < 60` and `seconds < 60`.
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Option<Self> {
        if hours < 24 && minutes < 60 && seconds < 60 {
            Some(Self {
                hours,
                minutes,
                seconds,
            })
        } else {
            None
        }
    }

    /// Build from hour and minute, seconds zero.
    pub const fn hm(hours: u8, minutes: u8) -> Option<Self> {
        Self::new(hours, minutes, 0)
    }

    /// Time of day for a count of seconds since midnight (taken modulo a day).
    pub const fn from_seconds_of_day(secs: u32) -> Self {
        let secs = secs % 86_400;
        Self {
            hours: (secs / 3600) as u8,
            minutes: ((secs / 60) % 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }

    pub const fn hours(&self) -> u8 {
        self.hours
    }

    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    pub const fn seconds(&self) -> u8 {
        self.seconds
    }

    pub const fn seconds_of_day(&self) -> u32 {
        self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }

    /// `HH:MM` for a five-character display row.
    pub fn render(&self) -> String<5> {
        let mut s = String::new();
        // Two two-digit fields and a colon always fit in five bytes.
        let _ = write!(s, "{:02}:{:02}", self.hours, self.minutes);
        s
    }
}

/// Calendar date as held by the time source (year counted from 2000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    /// Date written alongside every user-committed time. Only the time of
    /// day matters to the mechanism; the date register is written to keep
    /// the time source's shadow registers consistent.
    pub const COMMIT: Self = Self {
        year: 21,
        month: 1,
        day: 1,
    };
}

// ── Tick arithmetic ───────────────────────────────────────────

/// Signed distance `now - since` on a wrapping millisecond counter.
///
/// Correct as long as the two instants are less than half the counter
/// range (~24.8 days) apart; a negative result means `since` lies in the
/// future.
pub const fn ticks_elapsed(now: u32, since: u32) -> i32 {
    now.wrapping_sub(since) as i32
}

/// Fixed-period schedule: each deadline is the previous deadline plus the
/// period, so time spent doing work between wakeups never accumulates.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    deadline: u32,
    period: u32,
}

impl Ticker {
    pub const fn new(now: u32, period: u32) -> Self {
        Self {
            deadline: now.wrapping_add(period),
            period,
        }
    }

    /// Milliseconds to wait until the current deadline, then advance it by
    /// one period. A deadline already in the past yields 0.
    pub fn next_wait(&mut self, now: u32) -> u32 {
        let remaining = ticks_elapsed(self.deadline, now);
        self.deadline = self.deadline.wrapping_add(self.period);
        if remaining > 0 { remaining as u32 } else { 0 }
    }

    /// Restart the schedule from `now`, e.g. after the unit was suspended.
    pub fn reset(&mut self, now: u32) {
        self.deadline = now.wrapping_add(self.period);
    }
}
