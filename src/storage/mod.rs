//! Persistent state, in two tiers.
//!
//! - [`registers`] — battery-backed slots, read and written continuously
//!   by the engine.
//! - [`archive`] — a flash-like block holding the user settings, written on
//!   edits and read back only after the backup battery was lost.

pub mod archive;
pub mod registers;
