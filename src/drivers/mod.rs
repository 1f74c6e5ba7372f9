//! Mechanism drivers and the button panel.
//!
//! Every driver is generic over `embedded-hal` 1.0 traits: the ESP-IDF
//! HAL drivers plug in on target, test doubles on the host.

pub mod button;
pub mod coil;
pub mod mechanism;
pub mod sensors;
pub mod servo;
