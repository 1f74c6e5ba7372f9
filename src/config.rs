//! Clock configuration parameters
//!
//! All tunable timing for the Cifra mechanism, the button panel and the
//! frontend. Values can be overridden through the NVS-backed
//! [`ConfigPort`](crate::app::ports::ConfigPort); anything missing or
//! corrupt falls back to [`ClockConfig::default`].
//!
//! Mechanism bounds (search limits, the settings marker) are not
//! configurable: they follow from the physical drum layout.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Minute pulses allowed while looking for the hour-sensor rising edge.
/// One full drum revolution plus margin.
pub const MINUTE_SEARCH_LIMIT: u8 = 62;

/// Hour pulses allowed while looking for the day-sensor falling edge.
pub const HOUR_SEARCH_LIMIT: u8 = 25;

/// Consecutive drift resyncs after which the frontend is warned.
pub const RESYNC_WARN_THRESHOLD: u8 = 3;

/// Validity marker stored beside the archived settings.
pub const SETTINGS_MAGIC: u32 = 0xC1F5_A001;

/// Core clock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    // --- Buttons ---
    /// Scan period of the button panel (milliseconds)
    pub button_scan_period_ms: u32,
    /// A level change must be stable for longer than this to commit
    pub debounce_ms: u32,
    /// Hold time that turns a press into a long press
    pub long_press_ms: u32,

    // --- Minute coil ---
    /// Time a coil phase is energised per minute step
    pub coil_excite_ms: u32,
    /// Rest after each step before the next may start
    pub coil_rest_ms: u32,
    /// Added to the excite time for slow (steady-state) steps
    pub coil_slow_extra_ms: u32,

    // --- Hour servo ---
    /// PWM frame period (microseconds)
    pub servo_period_us: u16,
    /// Pulse width that parks the arm clear of the drum
    pub servo_park_us: u16,
    /// Pulse width of the neutral release position
    pub servo_release_us: u16,
    /// Pulse width that pushes the hour flap over
    pub servo_engage_us: u16,
    /// Wait after powering the servo before the first move
    pub servo_power_up_ms: u32,
    /// Settle time after reaching release on power-up
    pub servo_settle_ms: u32,
    /// Wait after moving to park, and again after cutting the drive
    pub servo_park_ms: u32,
    /// Dwell in engage, and again in release, per hour step
    pub servo_step_ms: u32,

    // --- Synchronisation ---
    /// Steady-state poll interval
    pub sync_poll_ms: u32,
    /// Re-check interval while waiting for a silent window to end
    pub silent_recheck_ms: u32,
    /// Settle delay after taking the button panel away from the user
    pub pre_sync_settle_ms: u32,
    /// Time a sync message is left on screen before actuation starts
    pub display_hold_ms: u32,

    // --- Frontend ---
    /// Frontend mailbox poll interval
    pub frontend_refresh_ms: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            // Buttons
            button_scan_period_ms: 5,
            debounce_ms: 20,
            long_press_ms: 1000,

            // Minute coil
            coil_excite_ms: 200,
            coil_rest_ms: 200,
            coil_slow_extra_ms: 0,

            // Hour servo (20 ms frame, ~1.2–1.6 ms pulses)
            servo_period_us: 20_000,
            servo_park_us: 1220,
            servo_release_us: 1480,
            servo_engage_us: 1620,
            servo_power_up_ms: 200,
            servo_settle_ms: 500,
            servo_park_ms: 500,
            servo_step_ms: 300,

            // Synchronisation
            sync_poll_ms: 100,
            silent_recheck_ms: 60_000, // 1/min
            pre_sync_settle_ms: 200,
            display_hold_ms: 1000,

            // Frontend
            frontend_refresh_ms: 20,
        }
    }
}

impl ClockConfig {
    /// Range-check every field. Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.button_scan_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "button_scan_period_ms must be 1–50",
            ));
        }
        if self.debounce_ms < self.button_scan_period_ms || self.debounce_ms > 200 {
            return Err(ConfigError::ValidationFailed(
                "debounce_ms must be between the scan period and 200",
            ));
        }
        if self.long_press_ms <= self.debounce_ms || self.long_press_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "long_press_ms must exceed debounce_ms and be at most 10000",
            ));
        }
        if !(20..=2000).contains(&self.coil_excite_ms) || self.coil_rest_ms > 2000 {
            return Err(ConfigError::ValidationFailed(
                "coil_excite_ms must be 20–2000, coil_rest_ms at most 2000",
            ));
        }
        if self.coil_slow_extra_ms > 2000 {
            return Err(ConfigError::ValidationFailed(
                "coil_slow_extra_ms must be at most 2000",
            ));
        }
        let widths = [self.servo_park_us, self.servo_release_us, self.servo_engage_us];
        if self.servo_period_us < 5000 || widths.iter().any(|w| *w >= self.servo_period_us) {
            return Err(ConfigError::ValidationFailed(
                "servo pulse widths must be shorter than a period of at least 5000 us",
            ));
        }
        if self.servo_power_up_ms > 2000 {
            return Err(ConfigError::ValidationFailed(
                "servo_power_up_ms must be at most 2000",
            ));
        }
        if !(50..=5000).contains(&self.servo_settle_ms)
            || !(50..=5000).contains(&self.servo_park_ms)
        {
            return Err(ConfigError::ValidationFailed(
                "servo_settle_ms and servo_park_ms must be 50–5000",
            ));
        }
        if !(50..=2000).contains(&self.servo_step_ms) {
            return Err(ConfigError::ValidationFailed("servo_step_ms must be 50–2000"));
        }
        if !(10..=1000).contains(&self.sync_poll_ms) {
            return Err(ConfigError::ValidationFailed("sync_poll_ms must be 10–1000"));
        }
        if !(1000..=600_000).contains(&self.silent_recheck_ms) {
            return Err(ConfigError::ValidationFailed(
                "silent_recheck_ms must be 1000–600000",
            ));
        }
        if self.pre_sync_settle_ms > 5000 {
            return Err(ConfigError::ValidationFailed(
                "pre_sync_settle_ms must be at most 5000",
            ));
        }
        if self.display_hold_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "display_hold_ms must be at most 10000",
            ));
        }
        if !(5..=1000).contains(&self.frontend_refresh_ms) {
            return Err(ConfigError::ValidationFailed(
                "frontend_refresh_ms must be 5–1000",
            ));
        }
        Ok(())
    }

    pub fn button_timing(&self) -> ButtonTiming {
        ButtonTiming {
            scan_period_ms: self.button_scan_period_ms,
            debounce_ms: self.debounce_ms,
            long_press_ms: self.long_press_ms,
        }
    }

    pub fn coil_timing(&self) -> CoilTiming {
        CoilTiming {
            excite_ms: self.coil_excite_ms,
            rest_ms: self.coil_rest_ms,
            slow_extra_ms: self.coil_slow_extra_ms,
        }
    }

    pub fn servo_timing(&self) -> ServoTiming {
        ServoTiming {
            period_us: self.servo_period_us,
            park_us: self.servo_park_us,
            release_us: self.servo_release_us,
            engage_us: self.servo_engage_us,
            power_up_ms: self.servo_power_up_ms,
            settle_ms: self.servo_settle_ms,
            park_ms: self.servo_park_ms,
            step_ms: self.servo_step_ms,
        }
    }

    pub fn sync_timing(&self) -> SyncTiming {
        SyncTiming {
            poll_ms: self.sync_poll_ms,
            silent_recheck_ms: self.silent_recheck_ms,
            pre_sync_settle_ms: self.pre_sync_settle_ms,
            display_hold_ms: self.display_hold_ms,
        }
    }
}

// ── Per-unit timing slices ────────────────────────────────────

/// Timing handed to the button processor and its scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub scan_period_ms: u32,
    pub debounce_ms: u32,
    pub long_press_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoilTiming {
    pub excite_ms: u32,
    pub rest_ms: u32,
    pub slow_extra_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoTiming {
    pub period_us: u16,
    pub park_us: u16,
    pub release_us: u16,
    pub engage_us: u16,
    pub power_up_ms: u32,
    pub settle_ms: u32,
    pub park_ms: u32,
    pub step_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    pub poll_ms: u32,
    pub silent_recheck_ms: u32,
    pub pre_sync_settle_ms: u32,
    pub display_hold_ms: u32,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        ClockConfig::default().button_timing()
    }
}

impl Default for CoilTiming {
    fn default() -> Self {
        ClockConfig::default().coil_timing()
    }
}

impl Default for ServoTiming {
    fn default() -> Self {
        ClockConfig::default().servo_timing()
    }
}

impl Default for SyncTiming {
    fn default() -> Self {
        ClockConfig::default().sync_timing()
    }
}
