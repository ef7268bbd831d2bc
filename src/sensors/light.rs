//! LDR light classification with a hysteresis band around a pivot channel.
//!
//! The pivot is a second ADC channel (a fixed divider on the same supply),
//! so supply drift moves both readings together.  The margin is a dead
//! zone either side of the pivot: inside it the previous class is kept, so
//! a reading that hovers around the pivot cannot chatter.

use log::info;

use crate::app::ports::{AnalogPort, DataRate, Gain};
use crate::app::reports::LightLevel;
use crate::error::SensorError;

/// Classify `sensor` against `pivot ± margin`, keeping `previous` inside the band.
pub fn classify(sensor: i16, pivot: i16, margin: i16, previous: LightLevel) -> LightLevel {
    let (sensor, pivot, margin) = (sensor as i32, pivot as i32, margin as i32);
    if sensor > pivot + margin {
        LightLevel::Lit
    } else if sensor < pivot - margin {
        LightLevel::Dark
    } else {
        previous
    }
}

/// Which channels to sample and how.
#[derive(Debug, Clone, Copy)]
pub struct LightChannels {
    pub sensor: u8,
    pub pivot: u8,
    pub margin: i16,
    pub gain: Gain,
    pub rate: DataRate,
}

pub struct LightSensor {
    channels: LightChannels,
    last: LightLevel,
}

impl LightSensor {
    /// Seed the class from a first reading.  Readings inside the band at
    /// boot count as dark.
    pub fn new(channels: LightChannels, adc: &mut dyn AnalogPort) -> Result<Self, SensorError> {
        let mut sensor = Self {
            channels,
            last: LightLevel::Dark,
        };
        sensor.last = sensor.sample(adc)?;
        info!("Light: initial class {}", sensor.last.as_str());
        Ok(sensor)
    }

    pub fn level(&self) -> LightLevel {
        self.last
    }

    /// Poll once.  Returns the new class when it changes.
    pub fn poll(&mut self, adc: &mut dyn AnalogPort) -> Result<Option<LightLevel>, SensorError> {
        let class = self.sample(adc)?;
        if class == self.last {
            return Ok(None);
        }
        self.last = class;
        Ok(Some(class))
    }

    fn sample(&self, adc: &mut dyn AnalogPort) -> Result<LightLevel, SensorError> {
        let c = &self.channels;
        let sensor = adc.read(c.sensor, c.gain, c.rate)?;
        let pivot = adc.read(c.pivot, c.gain, c.rate)?;
        Ok(classify(sensor, pivot, c.margin, self.last))
    }
}
