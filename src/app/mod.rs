//! Application core — the protocol between the units, zero I/O.
//!
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real
//! peripherals. The frontend side of the notification protocol and the
//! commands it produces live here; the engine lives in
//! [`sync`](crate::sync).

pub mod boot;
pub mod commands;
pub mod events;
pub mod frontend;
pub mod ports;
