//! Run-gate input.
//!
//! A jumper (or switch) to ground on the gate pin, with the internal
//! pull-up enabled.  Open = high = the application may run.  Pulling it low
//! stops the scheduler at the next gate check and is the only graceful way
//! out of the main loop; it also keeps the node out of the loop at boot so
//! the board can be reflashed without fighting a running application.

use embedded_hal::digital::InputPin;

use crate::error::SensorError;

pub struct RunGate<P> {
    pin: P,
}

impl<P: InputPin> RunGate<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// `true` while the application is allowed to run.
    pub fn enabled(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::GpioReadFailed)
    }
}
