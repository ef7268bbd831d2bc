//! Indicator, run-gate and fail-safe drivers.

pub mod led_patterns;
pub mod run_gate;
pub mod status_led;
pub mod watchdog;
