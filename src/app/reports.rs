//! Reports the node publishes, and how each one maps onto a topic and payload.
//!
//! Downstream consumers match on the categorical payloads literally, so the
//! strings here are part of the wire contract.

use core::fmt::Write;

use crate::app::ports::PublishPort;
use crate::error::{CommsError, Result};

/// Capacity of a fully-qualified topic.
pub const TOPIC_CAP: usize = 96;

/// Motion presence as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    None,
    Motion,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Motion => "MOTION",
        }
    }
}

/// Magnetic contact position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactLevel {
    Closed,
    Open,
}

impl ContactLevel {
    /// The contact is wired against a pull-up: a high input means open.
    pub fn from_input_high(high: bool) -> Self {
        if high { Self::Open } else { Self::Closed }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
        }
    }
}

/// Light classification relative to the pivot channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightLevel {
    Dark,
    Lit,
}

impl LightLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "DARK",
            Self::Lit => "LIT",
        }
    }
}

/// One message bound for the broker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    /// Degrees Celsius.
    Temperature(f32),
    Motion(Presence),
    Contact(ContactLevel),
    Light(LightLevel),
}

impl Report {
    /// Topic suffix appended to the node's topic prefix.
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            Self::Temperature(_) => "temp",
            Self::Motion(_) => "motion",
            Self::Contact(_) => "contact",
            Self::Light(_) => "light",
        }
    }

    /// Render the payload.  Temperatures carry two decimals.
    pub fn payload(&self) -> heapless::String<16> {
        let mut out = heapless::String::new();
        let _ = match self {
            Self::Temperature(c) => write!(out, "{:.2}", c),
            Self::Motion(p) => out.write_str(p.as_str()),
            Self::Contact(c) => out.write_str(c.as_str()),
            Self::Light(l) => out.write_str(l.as_str()),
        };
        out
    }
}

/// Join `prefix` and `suffix` with a `/`.
pub fn topic(prefix: &str, suffix: &str) -> core::result::Result<heapless::String<TOPIC_CAP>, CommsError> {
    let mut t = heapless::String::new();
    write!(t, "{}/{}", prefix, suffix).map_err(|_| CommsError::TopicTooLong)?;
    Ok(t)
}

/// Publish `report` under `prefix`.
pub fn publish(publisher: &mut dyn PublishPort, prefix: &str, report: &Report) -> Result<()> {
    let t = topic(prefix, report.topic_suffix())?;
    let payload = report.payload();
    log::info!("REPORT | {} = {}", t, payload);
    publisher.publish(&t, &payload)?;
    Ok(())
}
