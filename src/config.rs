//! Node configuration parameters
//!
//! All tunable parameters for both node variants.  Values can be supplied
//! as JSON at provisioning time; anything missing falls back to the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::node::NodeKind;

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Identity ---
    /// Which sensor set this board carries.
    pub kind: NodeKind,
    /// MQTT client id; also used in the connect/disconnect topics.
    pub client_id: heapless::String<32>,
    /// Prefix for every sensor topic (e.g. `home/ground/hall`).
    pub topic_prefix: heapless::String<64>,

    // --- Broker ---
    pub broker_url: heapless::String<64>,
    pub broker_user: Option<heapless::String<32>>,
    pub broker_password: Option<heapless::String<64>>,

    // --- Network ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,

    // --- Indicator ---
    /// `true` when the status LED lights on a low output level.
    pub indicator_active_low: bool,

    // --- Job periods (seconds) ---
    pub temperature_interval_secs: u32,
    pub heartbeat_interval_secs: u32,
    /// How long the heartbeat holds the indicator lit (milliseconds).
    pub heartbeat_blink_ms: u32,
    pub run_gate_interval_secs: u32,
    pub motion_alert_interval_secs: u32,
    pub motion_refresh_interval_secs: u32,
    pub contact_interval_secs: u32,
    pub light_interval_secs: u32,

    // --- Motion ---
    /// Retrigger window: motion stays reported this long after the last edge.
    pub motion_retrigger_secs: u32,

    // --- Contact ---
    /// Settle delay between the two debounce reads (milliseconds).
    pub contact_settle_ms: u32,

    // --- Light ---
    pub light_sensor_channel: u8,
    pub light_pivot_channel: u8,
    /// Half-width of the hysteresis band in raw ADC counts.
    pub light_margin: i16,

    // --- Temperature ---
    pub temperature_channel: u8,

    // --- Fail-safe ---
    /// How long the fail-safe blinks its code before resetting (seconds).
    pub failsafe_grace_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Identity
            kind: NodeKind::Motion,
            client_id: str_or_empty("sensornode"),
            topic_prefix: str_or_empty("home/ground/sensornode"),

            // Broker
            broker_url: str_or_empty("mqtt://192.168.1.210:1883"),
            broker_user: None,
            broker_password: None,

            // Network
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),

            indicator_active_low: crate::pins::STATUS_LED_ACTIVE_LOW,

            // Job periods
            temperature_interval_secs: 3600, // hourly
            heartbeat_interval_secs: 10,
            heartbeat_blink_ms: 200,
            run_gate_interval_secs: 10,
            motion_alert_interval_secs: 10,
            motion_refresh_interval_secs: 300, // 5 min
            contact_interval_secs: 2,
            light_interval_secs: 5,

            // Motion
            motion_retrigger_secs: 900, // 15 min

            // Contact
            contact_settle_ms: 100,

            // Light
            light_sensor_channel: 1,
            light_pivot_channel: 2,
            light_margin: 200,

            // Temperature
            temperature_channel: 0,

            // Fail-safe
            failsafe_grace_secs: 3600, // 1 h
        }
    }
}

fn str_or_empty<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

impl NodeConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log::warn!("Config: JSON rejected ({})", e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::ValidationFailed("client_id must not be empty"));
        }
        let periods = [
            self.temperature_interval_secs,
            self.heartbeat_interval_secs,
            self.run_gate_interval_secs,
            self.motion_alert_interval_secs,
            self.motion_refresh_interval_secs,
            self.contact_interval_secs,
            self.light_interval_secs,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::ValidationFailed("job periods must be > 0"));
        }
        if self.motion_retrigger_secs == 0 {
            return Err(ConfigError::ValidationFailed("motion_retrigger_secs must be > 0"));
        }
        if self.light_margin <= 0 {
            return Err(ConfigError::ValidationFailed("light_margin must be > 0"));
        }
        if self.light_sensor_channel == self.light_pivot_channel {
            return Err(ConfigError::ValidationFailed(
                "light sensor and pivot must use different channels",
            ));
        }
        if self.failsafe_grace_secs == 0 {
            return Err(ConfigError::ValidationFailed("failsafe_grace_secs must be > 0"));
        }
        Ok(())
    }

    pub fn broker_user(&self) -> Option<&str> {
        self.broker_user.as_ref().map(|s| s.as_str())
    }

    pub fn broker_password(&self) -> Option<&str> {
        self.broker_password.as_ref().map(|s| s.as_str())
    }
}
