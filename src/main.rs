//! Cifra Firmware — Main Entry Point
//!
//! Hexagonal architecture with three cooperative async units.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RtcBackupRegisters  NvsAdapter     SystemRtc   LogFrontend    │
//! │  (BackupRegister)    (Config+Flash) (RtcPort)   (Frontend)     │
//! │  UptimeClock / ReactorDelay         PinDriver / LedcDriver     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  MechanicalSyncEngine · ButtonInputProcessor · Frontend │   │
//! │  │           NotificationBus · ScanGate                    │   │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  edge_executor::LocalExecutor driven by the async-io reactor   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pin map (ESP32-S3):
//!
//! | Signal        | GPIO | Direction            |
//! |---------------|------|----------------------|
//! | coil TICK     | 4    | output, active low   |
//! | coil TOCK     | 5    | output, active low   |
//! | hour servo    | 6    | LEDC PWM, 50 Hz      |
//! | hour sensor   | 7    | input, high = `:00`  |
//! | day sensor    | 15   | input, high = hour 23|
//! | button SET    | 10   | input, active low    |
//! | button INC    | 11   | input, active low    |
//! | button DEC    | 12   | input, active low    |
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::gpio::{IOPin, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;

use cifra::adapters::backup::RtcBackupRegisters;
use cifra::adapters::log_sink::LogFrontend;
use cifra::adapters::nvs::{NvsAdapter, NvsSettingsBlock};
use cifra::adapters::rtc::SystemRtc;
use cifra::adapters::time::{ReactorDelay, UptimeClock};
use cifra::app::boot::boot;
use cifra::app::commands::SettingsService;
use cifra::app::frontend::Frontend;
use cifra::app::ports::ConfigPort;
use cifra::bus::{NotificationBus, ScanGate};
use cifra::config::ClockConfig;
use cifra::drivers::button::{ButtonPanel, run_button_scanner};
use cifra::drivers::coil::MinuteCoil;
use cifra::drivers::mechanism::FlapMechanism;
use cifra::drivers::sensors::FlapSensors;
use cifra::drivers::servo::HourServo;
use cifra::storage::archive::SettingsArchive;
use cifra::storage::registers::PersistentRegisterStore;
use cifra::sync::MechanicalSyncEngine;
use cifra::sync::clock::TimeSource;

static BUS: NotificationBus = NotificationBus::new();
static BUTTONS: ScanGate = ScanGate::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Cifra v{}                           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            ClockConfig::default()
        }
    };

    // ── 3. Persistent state + boot recovery ───────────────────
    let registers = PersistentRegisterStore::new(
        RtcBackupRegisters::take().ok_or_else(|| anyhow!("backup registers already taken"))?,
    );
    let clock = TimeSource::new(SystemRtc::new());
    let archive = SettingsArchive::new(NvsSettingsBlock::new(nvs));
    let report = boot(&registers, &archive, &clock);
    info!("Boot: {:?}", report);

    // ── 4. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;

    let coil = MinuteCoil::new(
        PinDriver::output(p.pins.gpio4)?,
        PinDriver::output(p.pins.gpio5)?,
        config.coil_timing(),
    );

    let servo_timer = LedcTimerDriver::new(
        p.ledc.timer0,
        &TimerConfig::default()
            .frequency(50.Hz().into())
            .resolution(Resolution::Bits14),
    )?;
    let servo = HourServo::new(
        LedcDriver::new(p.ledc.channel0, &servo_timer, p.pins.gpio6)?,
        config.servo_timing(),
    );

    let sensors = FlapSensors::new(
        PinDriver::input(p.pins.gpio7)?,
        PinDriver::input(p.pins.gpio15)?,
    );

    let mut set = PinDriver::input(p.pins.gpio10.downgrade())?;
    let mut inc = PinDriver::input(p.pins.gpio11.downgrade())?;
    let mut dec = PinDriver::input(p.pins.gpio12.downgrade())?;
    for pin in [&mut set, &mut inc, &mut dec] {
        pin.set_pull(Pull::Up)?;
    }
    let panel = ButtonPanel::new([set, inc, dec]);

    // ── 5. Units ──────────────────────────────────────────────
    let uptime = UptimeClock::new();
    let mechanism = FlapMechanism::new(coil, servo, sensors, ReactorDelay);
    let mut engine = MechanicalSyncEngine::new(
        mechanism,
        &registers,
        &clock,
        &BUS,
        &BUTTONS,
        ReactorDelay,
        config.sync_timing(),
    );
    let mut frontend = Frontend::new(
        LogFrontend::new(),
        SettingsService::new(&registers, archive, &clock, &BUS),
        &BUS,
        &BUTTONS,
    );

    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor.spawn(engine.run()).detach();
    executor
        .spawn(run_button_scanner(
            panel,
            &uptime,
            ReactorDelay,
            config.button_timing(),
            &BUS,
            &BUTTONS,
        ))
        .detach();
    executor
        .spawn(frontend.run(ReactorDelay, config.frontend_refresh_ms))
        .detach();

    info!("Units started: engine, buttons, frontend");

    // The reactor drives the timers while the executor polls the units.
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(())
}
