//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                   |
//! |-------------|---------------------|-------------------------------|
//! | `backup`    | BackupRegisterPort  | RTC slow memory / array       |
//! | `log_sink`  | FrontendHandler     | Serial log output             |
//! | `nvs`       | ConfigPort          | NVS / in-memory store         |
//! |             | StoragePort         |                               |
//! |             | FlashBlockPort      | settings archive blob         |
//! | `rtc`       | RtcPort             | system wall clock             |
//! | `time`      | MonotonicPort       | ESP32 high-resolution timer   |
//! |             | DelayPort           | async-io-mini timer reactor   |
//!
//! GPIO and PWM reach the drivers directly through `embedded-hal`
//! traits, so no adapter sits between them.

pub mod backup;
pub mod log_sink;
pub mod nvs;
pub mod rtc;
pub mod time;
