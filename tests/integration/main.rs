//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against simulated hardware. All tests run on the host (x86_64) with no
//! real hardware required; simulated delays complete at once and advance
//! a shared virtual clock.

mod driver_tests;
mod frontend_tests;
mod mock_hw;
