//! Sensor node firmware library.
//!
//! Exposes the runtime (scheduler, fail-safe, sensor state machines and
//! boot sequence) for integration testing on the host.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod node;
pub mod pins;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod sensors;
