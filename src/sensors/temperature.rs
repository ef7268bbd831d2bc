//! TMP36 analog temperature sensor.
//!
//! 10 mV/°C with a 500 mV offset at 0 °C, read through the external ADC.

use crate::app::ports::{AnalogPort, DataRate, Gain};
use crate::error::SensorError;

const OFFSET_MV: f32 = 500.0;
const MV_PER_DEG: f32 = 10.0;

/// Convert a raw ADC sample taken at `gain` to degrees Celsius.
pub fn tmp36_celsius(raw: i16, gain: Gain) -> f32 {
    let mv = raw as f32 * gain.nanovolts_per_lsb() as f32 / 1_000_000.0;
    (mv - OFFSET_MV) / MV_PER_DEG
}

pub struct TemperatureSensor {
    channel: u8,
    gain: Gain,
    rate: DataRate,
}

impl TemperatureSensor {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            gain: Gain::Fsr6v144,
            rate: DataRate::Sps8,
        }
    }

    pub fn read(&self, adc: &mut dyn AnalogPort) -> Result<f32, SensorError> {
        let raw = adc.read(self.channel, self.gain, self.rate)?;
        Ok(tmp36_celsius(raw, self.gain))
    }
}
