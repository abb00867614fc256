//! RangeSentry firmware library.
//!
//! Exposes the task set, drivers, and synchronization primitives for
//! integration testing and external inspection.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module;
//! host builds run the same task loops against simulated pins.

#![deny(unused_must_use)]

pub mod config;
pub mod drivers;
pub mod error;
pub mod net;
pub mod pins;
pub mod sync;
pub mod tasks;
pub mod time;
