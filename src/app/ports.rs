//! Port traits: the boundary between the node runtime and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Scheduler / sensor state machines
//! ```
//!
//! Digital pins come straight from `embedded-hal` (`InputPin`,
//! `OutputPin`, `DelayNs`).  Everything `embedded-hal` does not
//! cover (monotonic time, analog conversion, the MQTT client and the
//! hardware reset) is described here so the runtime never touches ESP-IDF
//! directly.

use embedded_hal::delay::DelayNs;

use crate::error::{CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source that can also suspend the caller.
///
/// Every voluntary suspension in the firmware (waiting for the next due job,
/// the contact settle delay, the fail-safe blink timing) goes through the
/// same clock, so a simulated clock in tests advances virtual time instead
/// of sleeping.
pub trait Clock: DelayNs {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: ADC → domain)
// ───────────────────────────────────────────────────────────────

/// Programmable-gain amplifier setting (full-scale range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// ±6.144 V
    #[default]
    Fsr6v144,
    /// ±4.096 V
    Fsr4v096,
    /// ±2.048 V
    Fsr2v048,
    /// ±1.024 V
    Fsr1v024,
    /// ±0.512 V
    Fsr0v512,
    /// ±0.256 V
    Fsr0v256,
}

impl Gain {
    /// Nanovolts represented by one LSB at this range.
    pub const fn nanovolts_per_lsb(self) -> u32 {
        match self {
            Self::Fsr6v144 => 187_500,
            Self::Fsr4v096 => 125_000,
            Self::Fsr2v048 => 62_500,
            Self::Fsr1v024 => 31_250,
            Self::Fsr0v512 => 15_625,
            Self::Fsr0v256 => 7_812,
        }
    }
}

/// Conversion data rate in samples per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataRate {
    #[default]
    Sps8,
    Sps16,
    Sps32,
    Sps64,
    Sps128,
    Sps250,
    Sps475,
    Sps860,
}

impl DataRate {
    /// Upper bound of a single-shot conversion, rounded up to whole ms.
    pub const fn conversion_ms(self) -> u32 {
        match self {
            Self::Sps8 => 126,
            Self::Sps16 => 63,
            Self::Sps32 => 32,
            Self::Sps64 => 16,
            Self::Sps128 => 8,
            Self::Sps250 => 5,
            Self::Sps475 => 3,
            Self::Sps860 => 2,
        }
    }
}

/// Single-ended analog input.
pub trait AnalogPort {
    /// Run one conversion on `channel` and return the signed raw sample.
    fn read(&mut self, channel: u8, gain: Gain, rate: DataRate) -> Result<i16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Publish port (driven adapter: domain → MQTT broker)
// ───────────────────────────────────────────────────────────────

/// Everything the publisher needs to open a broker session.
#[derive(Debug, Clone, Copy)]
pub struct BrokerSession<'a> {
    pub client_id: &'a str,
    pub url: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    /// Topic the broker publishes on our behalf if the session drops.
    pub will_topic: &'a str,
    pub will_payload: &'a str,
}

/// Message publishing client.
///
/// `connect` distinguishes a refused session ([`CommsError::ConnectRefused`])
/// from an unreachable broker or rejected credentials
/// ([`CommsError::BrokerUnreachable`]); boot maps them to different
/// fail-safe codes.
pub trait PublishPort {
    fn connect(&mut self, session: &BrokerSession<'_>) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Reset port
// ───────────────────────────────────────────────────────────────

/// Hardware reset.  Never returns: the process ends here.
pub trait ResetPort {
    fn reset(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
