//! Magnetic contact (reed switch) with settle-and-reread debouncing.
//!
//! The switch is wired against a pull-up: high = open, low = closed.
//! A level that differs from the last accepted one is only trusted if a
//! second read, taken after the settle delay, agrees with it.  Anything
//! else is contact bounce and is dropped without touching the state.
//!
//! The settle delay blocks the caller.  On the cooperative scheduler that
//! delays every other job by the same amount, which is fine at 100 ms.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{debug, info};

use crate::app::reports::ContactLevel;
use crate::error::SensorError;

pub struct ContactSensor<P> {
    pin: P,
    last: ContactLevel,
    settle_ms: u32,
}

impl<P: InputPin> ContactSensor<P> {
    /// Seed the accepted level from a first read.
    pub fn new(mut pin: P, settle_ms: u32) -> Result<Self, SensorError> {
        let last = read_level(&mut pin)?;
        info!("Contact: initial level {}", last.as_str());
        Ok(Self { pin, last, settle_ms })
    }

    pub fn level(&self) -> ContactLevel {
        self.last
    }

    /// Poll once.  Returns the new level when a change is confirmed.
    pub fn poll<D: DelayNs + ?Sized>(
        &mut self,
        delay: &mut D,
    ) -> Result<Option<ContactLevel>, SensorError> {
        let first = read_level(&mut self.pin)?;
        if first == self.last {
            return Ok(None);
        }

        delay.delay_ms(self.settle_ms);
        let second = read_level(&mut self.pin)?;
        if second == self.last {
            debug!("Contact: bounce to {} discarded", first.as_str());
            return Ok(None);
        }

        self.last = second;
        Ok(Some(second))
    }
}

fn read_level<P: InputPin>(pin: &mut P) -> Result<ContactLevel, SensorError> {
    pin.is_high()
        .map(ContactLevel::from_input_high)
        .map_err(|_| SensorError::GpioReadFailed)
}
