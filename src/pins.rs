//! GPIO / peripheral pin assignments for the sensor node board.
//!
//! Single source of truth: `main.rs` takes every pin from here.  Both node
//! variants use the same board; the motion and contact inputs share a pin
//! because a board carries one or the other.

// ---------------------------------------------------------------------------
// Status indicator
// ---------------------------------------------------------------------------

/// Discrete LED, lit on a high level.
pub const STATUS_LED_GPIO: i32 = 13;
pub const STATUS_LED_ACTIVE_LOW: bool = false;

// ---------------------------------------------------------------------------
// Run-gate
// ---------------------------------------------------------------------------

/// Jumper to GND with the internal pull-up enabled.  HIGH = run.
pub const RUN_GATE_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Digital sensors
// ---------------------------------------------------------------------------

/// PIR output (motion node).  Rising edge = detection.
pub const PIR_GPIO: i32 = 27;
/// Reed contact (contact node), pull-up.  HIGH = open.
pub const CONTACT_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// I2C bus (ADS1115)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 23;
pub const I2C_SCL_GPIO: i32 = 22;
pub const I2C_BAUDRATE_HZ: u32 = 100_000;
