//! ADS1115 16-bit 4-channel ADC over I2C.
//!
//! Single-shot, single-ended conversions only: write the config register
//! with the OS bit set, wait one conversion time, poll OS until the device
//! reports idle, then read the conversion register.
//!
//! Config register layout (MSB first):
//!
//! ```text
//!  15  14..12  11..9  8     7..5  4     3     2     1..0
//!  OS  MUX     PGA    MODE  DR    CMODE CPOL  CLAT  CQUE
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::app::ports::{AnalogPort, DataRate, Gain};
use crate::error::SensorError;

/// ADDR pin tied to GND.
pub const DEFAULT_ADDRESS: u8 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS: u16 = 1 << 15;
/// Single-ended MUX codes start at 0b100 (AIN0 vs GND).
const MUX_SINGLE_ENDED: u16 = 0b100;
const MODE_SINGLE_SHOT: u16 = 1 << 8;
const COMPARATOR_OFF: u16 = 0b11;

const CHANNELS: u8 = 4;
/// Extra 1 ms polls allowed after the nominal conversion time.
const READY_POLLS: u32 = 10;

/// Config word that starts one conversion on `channel`.
pub fn config_word(channel: u8, gain: Gain, rate: DataRate) -> u16 {
    OS | (MUX_SINGLE_ENDED | channel as u16) << 12
        | (gain as u16) << 9
        | MODE_SINGLE_SHOT
        | (rate as u16) << 5
        | COMPARATOR_OFF
}

pub struct Ads1115<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Ads1115<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// Read the config register to check the device answers.
    pub fn probe(&mut self) -> Result<u16, SensorError> {
        let config = self.read_register(REG_CONFIG)?;
        info!("ADS1115: found at 0x{:02x} (config 0x{:04x})", self.address, config);
        Ok(config)
    }

    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    fn write_register(&mut self, reg: u8, value: u16) -> Result<(), SensorError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg, hi, lo])
            .map_err(|_| SensorError::AdcReadFailed)
    }

    fn read_register(&mut self, reg: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|_| SensorError::AdcReadFailed)?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<I: I2c, D: DelayNs> AnalogPort for Ads1115<I, D> {
    fn read(&mut self, channel: u8, gain: Gain, rate: DataRate) -> Result<i16, SensorError> {
        if channel >= CHANNELS {
            return Err(SensorError::InvalidChannel);
        }
        self.write_register(REG_CONFIG, config_word(channel, gain, rate))?;
        self.delay.delay_ms(rate.conversion_ms());

        let mut polls = 0;
        while self.read_register(REG_CONFIG)? & OS == 0 {
            if polls == READY_POLLS {
                warn!("ADS1115: channel {} conversion timed out", channel);
                return Err(SensorError::Timeout);
            }
            polls += 1;
            self.delay.delay_ms(1);
        }

        let raw = self.read_register(REG_CONVERSION)? as i16;
        debug!("ADS1115: ch{} = {}", channel, raw);
        Ok(raw)
    }
}
