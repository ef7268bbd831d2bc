//! Application layer: port traits and the reports the node publishes.

pub mod ports;
pub mod reports;
