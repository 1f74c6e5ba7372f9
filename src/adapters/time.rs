//! Monotonic time and async delay adapters.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side runs.
//!
//! [`ReactorDelay`] suspends the calling unit on an `async-io-mini`
//! timer so the other units keep running on the same executor.

use core::time::Duration;

use crate::app::ports::{DelayPort, MonotonicPort};

/// Milliseconds since boot, wrapping at `u32::MAX`.
pub struct UptimeClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl MonotonicPort for UptimeClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap; consumers compare with `ticks_elapsed`.
        (self.uptime_us() / 1_000) as u32
    }
}

/// Timer-backed [`DelayPort`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReactorDelay;

impl DelayPort for ReactorDelay {
    async fn delay_ms(&mut self, ms: u32) {
        async_io_mini::Timer::after(Duration::from_millis(u64::from(ms))).await;
    }
}
