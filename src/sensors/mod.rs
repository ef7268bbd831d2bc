//! Sensor state machines.
//!
//! Each one consumes raw samples (and, for motion, time) and decides
//! whether something is worth reporting.  None of them publishes; the jobs
//! in [`crate::node::jobs`] turn their output into [`Report`](crate::app::reports::Report)s.

pub mod contact;
pub mod light;
pub mod motion;
pub mod temperature;
