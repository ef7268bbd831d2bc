//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements     | Connects to               |
//! |-------------|----------------|---------------------------|
//! | `ads1115`   | AnalogPort     | ADS1115 ADC over I2C      |
//! | `device_id` |                | eFuse factory MAC         |
//! | `mqtt`      | PublishPort    | ESP-IDF MQTT client       |
//! | `reset`     | ResetPort      | `esp_restart`             |
//! | `time`      | Clock          | ESP32 system timer        |
//! | `wifi`      |                | ESP-IDF WiFi STA          |

pub mod ads1115;
pub mod device_id;
pub mod mqtt;
pub mod reset;
pub mod time;
pub mod wifi;
