//! Battery-backed register store.
//!
//! Five always-on slots hold everything the clock must remember across a
//! mains outage:
//!
//! | Slot | Content                                             |
//! |------|-----------------------------------------------------|
//! | 0    | mechanical hours (0–23, else read as 0)             |
//! | 1    | mechanical minutes (0–59, else read as 0)           |
//! | 2    | bit 0: tick parity                                  |
//! | 3    | bits 0–7 silent start hour, bits 8–15 silent end    |
//! | 4    | bit 9 calibration sign, bits 0–8 magnitude          |
//!
//! Raw words never leave this module. Getters sanitise out-of-range
//! contents to defaults without writing anything back; the mechanism has
//! no way to report a corrupt register, so silent recovery is the only
//! policy.
//!
//! Position is mutated only through [`PersistentRegisterStore::increment_minute`],
//! [`PersistentRegisterStore::increment_hour`] and
//! [`PersistentRegisterStore::reset_position`], so the rollover rules cannot
//! be bypassed.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::app::ports::BackupRegisterPort;
use crate::time::TimeOfDay;

/// Register file slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegisterSlot {
    MechHours = 0,
    MechMinutes = 1,
    Flags = 2,
    SilentWindow = 3,
    Calibration = 4,
}

impl RegisterSlot {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::MechHours,
        Self::MechMinutes,
        Self::Flags,
        Self::SilentWindow,
        Self::Calibration,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

// ── Value types ───────────────────────────────────────────────

/// Which coil phase drives the next minute step. Flips once per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickParity {
    #[default]
    Tick,
    Tock,
}

impl TickParity {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Tick => Self::Tock,
            Self::Tock => Self::Tick,
        }
    }

    const fn from_bit(raw: u32) -> Self {
        if raw & 1 == 0 { Self::Tick } else { Self::Tock }
    }

    const fn bit(self) -> u32 {
        match self {
            Self::Tick => 0,
            Self::Tock => 1,
        }
    }
}

/// The hour/minute the flap drums are believed to show.
///
/// `(0, 0)` doubles as "unknown": a register file that lost backup power
/// reads back as zero, and a sensor search ends by resetting to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MechanicalPosition {
    hours: u8,
    minutes: u8,
}

impl MechanicalPosition {
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
    };

    pub const fn new(hours: u8, minutes: u8) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self { hours, minutes })
        } else {
            None
        }
    }

    pub const fn hours(&self) -> u8 {
        self.hours
    }

    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    pub const fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0
    }

    /// Position after one minute step; 59 carries into the hour, 23:59 wraps to 00:00.
    pub const fn after_minute(self) -> Self {
        if self.minutes >= 59 {
            Self {
                hours: (self.hours + 1) % 24,
                minutes: 0,
            }
        } else {
            Self {
                hours: self.hours,
                minutes: self.minutes + 1,
            }
        }
    }

    /// Position after one hour step. Hour actuation only happens from an
    /// hour boundary, so minutes always land on 0.
    pub const fn after_hour(self) -> Self {
        Self {
            hours: (self.hours + 1) % 24,
            minutes: 0,
        }
    }
}

/// Daily window in which the mechanism is not actuated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentWindow {
    start_hour: u8,
    end_hour: u8,
}

impl Default for SilentWindow {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl SilentWindow {
    pub const DEFAULT_START: u8 = 22;
    pub const DEFAULT_END: u8 = 9;

    pub const DEFAULT: Self = Self {
        start_hour: Self::DEFAULT_START,
        end_hour: Self::DEFAULT_END,
    };

    pub const fn new(start_hour: u8, end_hour: u8) -> Option<Self> {
        if start_hour < 24 && end_hour < 24 {
            Some(Self {
                start_hour,
                end_hour,
            })
        } else {
            None
        }
    }

    pub const fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub const fn end_hour(&self) -> u8 {
        self.end_hour
    }

    /// Whether `time` falls inside the window.
    ///
    /// Silence starts one minute after the start hour (`start:00` itself is
    /// still audible) and ends at `end:00`. A start later than the end wraps
    /// through midnight. Equal start and end hours never silence anything.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        let h = time.hours();
        let past_start = h > self.start_hour || (h == self.start_hour && time.minutes() > 0);
        if self.start_hour > self.end_hour {
            past_start || h < self.end_hour
        } else {
            past_start && h < self.end_hour
        }
    }

    pub(crate) const fn pack(self) -> u32 {
        self.start_hour as u32 | (self.end_hour as u32) << 8
    }

    /// Decode a packed word, falling back to the default per field.
    pub(crate) const fn unpack_sanitized(raw: u32) -> Self {
        let start = (raw & 0xFF) as u8;
        let end = ((raw >> 8) & 0xFF) as u8;
        Self {
            start_hour: if start < 24 { start } else { Self::DEFAULT_START },
            end_hour: if end < 24 { end } else { Self::DEFAULT_END },
        }
    }

    /// Decode a packed word; `None` if either field is out of range.
    pub(crate) const fn unpack_strict(raw: u32) -> Option<Self> {
        Self::new((raw & 0xFF) as u8, ((raw >> 8) & 0xFF) as u8)
    }
}

/// Direction of the time source's smooth calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationSign {
    /// Remove pulses: the time source runs slower.
    #[default]
    Slow,
    /// Insert pulses: the time source runs faster.
    Fast,
}

/// Smooth-calibration setting for the time source crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calibration {
    sign: CalibrationSign,
    magnitude: u16,
}

impl Calibration {
    pub const MAX_MAGNITUDE: u16 = 511;

    /// Factory default: no correction.
    pub const NONE: Self = Self {
        sign: CalibrationSign::Slow,
        magnitude: 0,
    };

    const SIGN_BIT: u32 = 1 << 9;
    const RAW_MASK: u32 = 0x3FF;

    pub const fn new(sign: CalibrationSign, magnitude: u16) -> Option<Self> {
        if magnitude <= Self::MAX_MAGNITUDE {
            Some(Self { sign, magnitude })
        } else {
            None
        }
    }

    pub const fn sign(&self) -> CalibrationSign {
        self.sign
    }

    pub const fn magnitude(&self) -> u16 {
        self.magnitude
    }

    /// 10-bit register form: bit 9 sign, bits 0–8 magnitude.
    pub const fn to_raw(self) -> u32 {
        let sign = match self.sign {
            CalibrationSign::Slow => 0,
            CalibrationSign::Fast => Self::SIGN_BIT,
        };
        sign | self.magnitude as u32
    }

    /// Decode a 10-bit value; anything wider is treated as absent.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw > Self::RAW_MASK {
            return None;
        }
        let sign = if raw & Self::SIGN_BIT != 0 {
            CalibrationSign::Fast
        } else {
            CalibrationSign::Slow
        };
        Some(Self {
            sign,
            magnitude: (raw & 0x1FF) as u16,
        })
    }
}

// ── Store ─────────────────────────────────────────────────────

/// Typed accessors over a [`BackupRegisterPort`].
///
/// Shared by reference between the engine (position, parity) and the
/// frontend (silent window, calibration). Each access runs in its own
/// short critical section; read-modify-write operations hold one section
/// across the whole update.
pub struct PersistentRegisterStore<B> {
    regs: Mutex<RefCell<B>>,
}

impl<B: BackupRegisterPort> PersistentRegisterStore<B> {
    pub const fn new(regs: B) -> Self {
        Self {
            regs: Mutex::new(RefCell::new(regs)),
        }
    }

    fn read(&self, slot: RegisterSlot) -> u32 {
        critical_section::with(|cs| self.regs.borrow_ref(cs).read(slot))
    }

    fn write(&self, slot: RegisterSlot, value: u32) {
        critical_section::with(|cs| self.regs.borrow_ref_mut(cs).write(slot, value));
    }

    // ── Mechanical position ──

    pub fn hours(&self) -> u8 {
        let raw = self.read(RegisterSlot::MechHours);
        if raw < 24 { raw as u8 } else { 0 }
    }

    pub fn minutes(&self) -> u8 {
        let raw = self.read(RegisterSlot::MechMinutes);
        if raw < 60 { raw as u8 } else { 0 }
    }

    pub fn position(&self) -> MechanicalPosition {
        MechanicalPosition {
            hours: self.hours(),
            minutes: self.minutes(),
        }
    }

    pub fn set_position(&self, position: MechanicalPosition) {
        critical_section::with(|cs| {
            let mut regs = self.regs.borrow_ref_mut(cs);
            regs.write(RegisterSlot::MechHours, position.hours as u32);
            regs.write(RegisterSlot::MechMinutes, position.minutes as u32);
        });
    }

    /// One minute step with carry. The tick parity flips with every step,
    /// so the next pulse goes to the other coil. Returns the new position.
    pub fn increment_minute(&self) -> MechanicalPosition {
        critical_section::with(|_| {
            let next = self.position().after_minute();
            self.set_position(next);
            self.set_tick_parity(self.tick_parity().flipped());
            next
        })
    }

    /// One hour step; minutes reset to 0. Returns the new position.
    pub fn increment_hour(&self) -> MechanicalPosition {
        critical_section::with(|_| {
            let next = self.position().after_hour();
            self.set_position(next);
            next
        })
    }

    /// Mark the position unknown. Idempotent.
    pub fn reset_position(&self) {
        self.set_position(MechanicalPosition::ZERO);
    }

    // ── Tick parity ──

    pub fn tick_parity(&self) -> TickParity {
        TickParity::from_bit(self.read(RegisterSlot::Flags))
    }

    pub fn set_tick_parity(&self, parity: TickParity) {
        critical_section::with(|cs| {
            let mut regs = self.regs.borrow_ref_mut(cs);
            let flags = regs.read(RegisterSlot::Flags);
            regs.write(RegisterSlot::Flags, (flags & !1) | parity.bit());
        });
    }

    // ── Settings ──

    pub fn silent_window(&self) -> SilentWindow {
        SilentWindow::unpack_sanitized(self.read(RegisterSlot::SilentWindow))
    }

    pub fn set_silent_window(&self, window: SilentWindow) {
        self.write(RegisterSlot::SilentWindow, window.pack());
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::from_raw(self.read(RegisterSlot::Calibration)).unwrap_or(Calibration::NONE)
    }

    pub fn set_calibration(&self, calibration: Calibration) {
        self.write(RegisterSlot::Calibration, calibration.to_raw());
    }

    /// Run `f` against the raw register file, e.g. to inject corruption in tests.
    pub fn with_registers<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        critical_section::with(|cs| f(&mut self.regs.borrow_ref_mut(cs)))
    }
}
