//! Cifra split-flap clock firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//!   ButtonInputProcessor ──▶ NotificationBus ──▶ UI frontend
//!                                  ▲                  │ "new time committed"
//!                                  │                  ▼
//!   PersistentRegisterStore ◀── MechanicalSyncEngine ──▶ coil / servo / sensors
//!   SettingsArchive (rare, on user edits)
//! ```

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod storage;
pub mod sync;
pub mod time;

// The ESP-IDF backends are guarded by cfg attributes inside; the host
// build gets the simulation backends.
pub mod adapters;
pub mod drivers;
