//! Authoritative time source adapter.
//!
//! - **`target_os = "espidf"`**: the system wall clock
//!   (`gettimeofday`/`settimeofday`), kept in UTC. The time is considered
//!   set once it lies after 2020-01-01. The chip has no user-facing
//!   smooth-calibration unit; the setting is recorded and logged.
//! - **`not(target_os = "espidf")`**: a wall clock running off
//!   `std::time::Instant` from a settable base.
//!
//! Both backends model the shadow-register latch: `read_time` captures a
//! reading and `read_date` returns the date of that same reading, then
//! releases the latch. An unpaired `read_time` keeps returning the frozen
//! value.

use log::info;

use crate::app::ports::RtcPort;
use crate::storage::registers::Calibration;
use crate::time::{CalendarDate, TimeOfDay};

/// Unix seconds at 2020-01-01T00:00:00Z.
const EPOCH_2020: i64 = 1_577_836_800;

const SECS_PER_DAY: i64 = 86_400;

pub struct SystemRtc {
    /// Unix seconds of the latched reading, if any.
    latched: Option<i64>,
    calibration: Calibration,
    #[cfg(not(target_os = "espidf"))]
    base_secs: i64,
    #[cfg(not(target_os = "espidf"))]
    base_instant: std::time::Instant,
}

impl Default for SystemRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRtc {
    pub fn new() -> Self {
        Self {
            latched: None,
            calibration: Calibration::NONE,
            #[cfg(not(target_os = "espidf"))]
            base_secs: 0,
            #[cfg(not(target_os = "espidf"))]
            base_instant: std::time::Instant::now(),
        }
    }

    /// Last calibration handed to the clock.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    #[cfg(target_os = "espidf")]
    fn unix_now(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: valid out-pointer, null timezone.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_now(&self) -> i64 {
        self.base_secs + self.base_instant.elapsed().as_secs() as i64
    }

    #[cfg(target_os = "espidf")]
    fn set_unix(&mut self, secs: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: secs as _,
            tv_usec: 0,
        };
        // SAFETY: valid in-pointer, null timezone.
        if unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) } != 0 {
            log::warn!("RTC: settimeofday failed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_unix(&mut self, secs: i64) {
        self.base_secs = secs;
        self.base_instant = std::time::Instant::now();
    }

    /// Day number of the current date, or of the commit date if the clock
    /// was never set.
    fn current_day(&self) -> i64 {
        let now = self.unix_now();
        if now < EPOCH_2020 {
            let d = CalendarDate::COMMIT;
            days_from_civil(2000 + i64::from(d.year), d.month.into(), d.day.into())
        } else {
            now.div_euclid(SECS_PER_DAY)
        }
    }

    fn reading(&mut self) -> i64 {
        match self.latched {
            Some(secs) => secs,
            None => {
                let secs = self.unix_now();
                self.latched = Some(secs);
                secs
            }
        }
    }
}

impl RtcPort for SystemRtc {
    fn is_initialized(&self) -> bool {
        self.unix_now() >= EPOCH_2020
    }

    fn read_time(&mut self) -> TimeOfDay {
        let secs = self.reading();
        TimeOfDay::from_seconds_of_day(secs.rem_euclid(SECS_PER_DAY) as u32)
    }

    fn read_date(&mut self) -> CalendarDate {
        let secs = self.latched.take().unwrap_or_else(|| self.unix_now());
        let (y, m, d) = civil_from_days(secs.div_euclid(SECS_PER_DAY));
        CalendarDate {
            year: (y - 2000).clamp(0, 255) as u8,
            month: m as u8,
            day: d as u8,
        }
    }

    fn write_time(&mut self, time: TimeOfDay) {
        let day = self.current_day();
        self.latched = None;
        self.set_unix(day * SECS_PER_DAY + i64::from(time.seconds_of_day()));
    }

    fn write_date(&mut self, date: CalendarDate) {
        let secs_of_day = self.unix_now().rem_euclid(SECS_PER_DAY);
        let day = days_from_civil(2000 + i64::from(date.year), date.month.into(), date.day.into());
        self.latched = None;
        self.set_unix(day * SECS_PER_DAY + secs_of_day);
    }

    fn apply_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
        info!(
            "RTC: calibration {:?} {} pulses",
            calibration.sign(),
            calibration.magnitude()
        );
    }
}

// ── Civil calendar ────────────────────────────────────────────

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}
