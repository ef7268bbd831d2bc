//! PIR motion state machine.
//!
//! Three inputs drive it:
//!
//! - the rising-edge interrupt from the PIR output ([`MotionSensor::on_rising_edge`]),
//! - a fast alert job that reports the first detection with low latency,
//! - a slow refresh job that re-asserts ongoing motion and clears a stale
//!   report once the retrigger window passes without new edges.
//!
//! The edge handler runs in interrupt context while a job may be in the
//! middle of a transition.  All state lives in one small `Copy` record
//! behind a [`critical_section::Mutex`]; every access is a load / modify /
//! store with interrupts masked, so the handler never observes a
//! half-applied job transition and vice versa.

use core::cell::Cell;

use critical_section::Mutex;
use log::{debug, info};

use crate::app::reports::Presence;

/// Snapshot of the motion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionState {
    /// Time of the most recent rising edge.
    pub last_trigger_ms: Option<u64>,
    pub last_reported: Presence,
    pub last_report_ms: u64,
    /// Set by the edge handler, cleared only by the alert job.
    pub pending_alert: bool,
}

impl MotionState {
    pub const fn new() -> Self {
        Self {
            last_trigger_ms: None,
            last_reported: Presence::None,
            last_report_ms: 0,
            pending_alert: false,
        }
    }

    /// Record an edge.  Only escalate when the last report was idle;
    /// repeated edges while already reporting motion stay on the slow path.
    pub fn on_rising_edge(&mut self, now_ms: u64) {
        self.last_trigger_ms = Some(now_ms);
        self.pending_alert = self.last_reported == Presence::None;
    }

    /// Fast path: report the first detection.
    pub fn alert(&mut self, now_ms: u64) -> Option<Presence> {
        if !self.pending_alert {
            return None;
        }
        self.pending_alert = false;
        self.last_reported = Presence::Motion;
        self.last_report_ms = now_ms;
        Some(Presence::Motion)
    }

    /// Slow path: re-announce or decay, at most once per `window_ms`.
    pub fn refresh(&mut self, now_ms: u64, window_ms: u64) -> Option<Presence> {
        if now_ms.saturating_sub(self.last_report_ms) < window_ms {
            return None;
        }
        let recent = self
            .last_trigger_ms
            .is_some_and(|t| now_ms.saturating_sub(t) < window_ms);
        let candidate = if recent { Presence::Motion } else { Presence::None };

        if candidate == Presence::None && self.last_reported == Presence::None {
            return None;
        }
        self.last_reported = candidate;
        self.last_report_ms = now_ms;
        Some(candidate)
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-shareable motion sensor.
///
/// `const`-constructible so it can live in a `static` that the GPIO
/// interrupt handler reaches without capturing anything.
pub struct MotionSensor {
    state: Mutex<Cell<MotionState>>,
    window_ms: u64,
}

impl MotionSensor {
    pub const fn new(retrigger_secs: u32) -> Self {
        Self {
            state: Mutex::new(Cell::new(MotionState::new())),
            window_ms: retrigger_secs as u64 * 1000,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Rising-edge handler.  Safe to call from interrupt context.
    pub fn on_rising_edge(&self, now_ms: u64) {
        self.update(|s| s.on_rising_edge(now_ms));
    }

    /// Alert job body.  Returns the presence to publish, if any.
    pub fn alert(&self, now_ms: u64) -> Option<Presence> {
        let out = self.update(|s| s.alert(now_ms));
        if out.is_some() {
            info!("Motion: first detection at {}ms", now_ms);
        }
        out
    }

    /// Refresh job body.  Returns the presence to publish, if any.
    pub fn refresh(&self, now_ms: u64) -> Option<Presence> {
        let window = self.window_ms;
        let out = self.update(|s| s.refresh(now_ms, window));
        debug!("Motion: refresh at {}ms -> {:?}", now_ms, out);
        out
    }

    pub fn snapshot(&self) -> MotionState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    fn update<R>(&self, f: impl FnOnce(&mut MotionState) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut s = cell.get();
            let out = f(&mut s);
            cell.set(s);
            out
        })
    }
}
