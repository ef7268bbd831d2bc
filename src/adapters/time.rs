//! System clock adapter.
//!
//! Implements [`Clock`] (and through it `DelayNs`) for the scheduler, the
//! contact settle delay and the fail-safe blink timing.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for the monotonic
//!   time base; millisecond waits go through `FreeRtos::delay_ms` so the
//!   idle task (and the task watchdog) keep running, sub-millisecond waits
//!   busy-wait with `Ets::delay_us`.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `std::thread::sleep`, for running the node on a host.

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

/// Milliseconds since boot, callable without a clock handle (the PIR
/// interrupt handler uses it).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
}

#[cfg(target_os = "espidf")]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        uptime_ms()
    }
}

#[cfg(not(target_os = "espidf"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(target_os = "espidf")]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
