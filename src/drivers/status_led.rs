//! Single-pin status indicator.
//!
//! Callers think in terms of "lit" / "unlit"; the board decides whether
//! lit means a high or a low output.  The polarity flag is fixed at
//! construction (it follows the board revision) and XORed on every access,
//! so `lit()` always returns what was last passed to `set()`.
//!
//! Write failures are logged and otherwise ignored: the indicator is
//! cosmetic, and the fail-safe relies on it when nothing else works.

use embedded_hal::digital::OutputPin;

pub struct StatusIndicator<P> {
    pin: P,
    /// Last level driven onto the pin (`true` = high).
    level: bool,
    active_low: bool,
}

impl<P: OutputPin> StatusIndicator<P> {
    /// Wrap `pin` and drive it to the unlit level.
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            level: active_low,
            active_low,
        };
        led.drive(active_low);
        led
    }

    pub fn set(&mut self, lit: bool) {
        self.drive(lit ^ self.active_low);
    }

    pub fn lit(&self) -> bool {
        self.level ^ self.active_low
    }

    pub fn toggle(&mut self) {
        self.set(!self.lit());
    }

    /// Physical level currently driven onto the pin.
    pub fn level(&self) -> bool {
        self.level
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, high: bool) {
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if res.is_err() {
            log::warn!("StatusIndicator: pin write failed");
        }
        self.level = high;
    }
}
