//! Cooperative periodic-job scheduler.
//!
//! One logical thread runs every registered job at its own cadence.  Jobs
//! never overlap; a job that blocks (the contact settle delay, the
//! heartbeat blink) pushes everything else back by the same amount.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Scheduler::run                        │
//! │                                                              │
//! │   ┌────────────┐   earliest due    ┌──────────────────────┐  │
//! │   │ job table  │ ────────────────▶ │ sleep until due      │  │
//! │   │ + run-gate │                   └──────────┬───────────┘  │
//! │   └────────────┘                              ▼              │
//! │         ▲                     ┌──────────────────────────┐   │
//! │         │                     │ gate: closed → Ok(())    │   │
//! │         │                     │ job:  lit → action → off │   │
//! │         │                     │       Err → JobFailure   │   │
//! │         │                     └────────────┬─────────────┘   │
//! │         └────────── reschedule (fixed rate) ┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rescheduling is fixed-rate: the next due time is the previous due time
//! plus the period, not "now plus the period", so a job's cadence does not
//! drift with the execution time of the jobs around it.  If a job falls so
//! far behind that whole periods have already passed, the missed
//! invocations are skipped rather than replayed back to back.

use core::fmt;

use embedded_hal::digital::{InputPin, OutputPin};
use log::{info, warn};

use crate::app::ports::Clock;
use crate::drivers::run_gate::RunGate;
use crate::drivers::status_led::StatusIndicator;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════
//  Job types
// ═══════════════════════════════════════════════════════════════

/// Maximum number of registered jobs (stack-allocated table).
pub const MAX_JOBS: usize = 8;

/// Label reported when reading the run-gate itself fails.
pub const RUN_GATE_LABEL: &str = "run-gate";

/// What a job sees while it runs.
pub struct JobContext<'c> {
    /// Time the job was dispatched.
    pub now_ms: u64,
    /// The scheduler's clock, for jobs that need to wait internally.
    pub clock: &'c mut dyn Clock,
}

/// A job body.  Captures its own sensor state by reference or by move.
pub type Action<'a> = Box<dyn FnMut(&mut JobContext<'_>) -> Result<()> + 'a>;

struct Job<'a> {
    label: &'static str,
    period_ms: u64,
    next_due_ms: u64,
    action: Action<'a>,
}

/// A job returned an error; the loop stopped at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobFailure {
    pub label: &'static str,
    pub error: Error,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job '{}' failed: {}", self.label, self.error)
    }
}

enum Next {
    Gate,
    Job(usize),
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<'a> {
    jobs: heapless::Vec<Job<'a>, MAX_JOBS>,
    gate_period_ms: u64,
}

impl<'a> Scheduler<'a> {
    /// `gate_period_ms` is how often the run-gate is checked.
    pub fn new(gate_period_ms: u64) -> Self {
        Self {
            jobs: heapless::Vec::new(),
            gate_period_ms: gate_period_ms.max(1),
        }
    }

    /// Register a job.  Returns its slot index, or `None` if the table is
    /// full or the period is zero.
    pub fn register<F>(&mut self, label: &'static str, period_ms: u64, action: F) -> Option<usize>
    where
        F: FnMut(&mut JobContext<'_>) -> Result<()> + 'a,
    {
        if period_ms == 0 {
            warn!("Scheduler: '{}' rejected, zero period", label);
            return None;
        }
        let slot = self.jobs.len();
        let job = Job {
            label,
            period_ms,
            next_due_ms: 0,
            action: Box::new(action),
        };
        if self.jobs.push(job).is_err() {
            warn!("Scheduler: '{}' rejected, table full", label);
            return None;
        }
        info!("Scheduler: registered '{}' every {}ms at slot {}", label, period_ms, slot);
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drive every job until the run-gate closes or a job fails.
    ///
    /// Every job and the gate check are first due at the moment `run` is
    /// called.  When several are due at the same instant the gate check
    /// goes first, then jobs in registration order.
    pub fn run<L: OutputPin, G: InputPin>(
        &mut self,
        clock: &mut dyn Clock,
        led: &mut StatusIndicator<L>,
        gate: &mut RunGate<G>,
    ) -> core::result::Result<(), JobFailure> {
        let start = clock.now_ms();
        for job in self.jobs.iter_mut() {
            job.next_due_ms = start;
        }
        let mut gate_due_ms = start;
        info!("Scheduler: running {} jobs", self.jobs.len());

        loop {
            let (next, due_ms) = self.next_due(gate_due_ms);

            let now = clock.now_ms();
            if now < due_ms {
                let wait = (due_ms - now).min(u32::MAX as u64) as u32;
                clock.delay_ms(wait);
                continue;
            }

            match next {
                Next::Gate => {
                    match gate.enabled() {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("Scheduler: run-gate closed, stopping");
                            return Ok(());
                        }
                        Err(e) => {
                            return Err(JobFailure {
                                label: RUN_GATE_LABEL,
                                error: e.into(),
                            });
                        }
                    }
                    gate_due_ms = reschedule(RUN_GATE_LABEL, gate_due_ms, self.gate_period_ms, clock.now_ms());
                }
                Next::Job(i) => {
                    let job = &mut self.jobs[i];
                    led.set(true);
                    let mut ctx = JobContext { now_ms: now, clock: &mut *clock };
                    if let Err(error) = (job.action)(&mut ctx) {
                        return Err(JobFailure { label: job.label, error });
                    }
                    led.set(false);
                    job.next_due_ms = reschedule(job.label, job.next_due_ms, job.period_ms, clock.now_ms());
                }
            }
        }
    }

    /// Pick the earliest due entry.  `min_by_key` keeps the first of equal
    /// keys, so ties resolve in registration order; the gate wins ties.
    fn next_due(&self, gate_due_ms: u64) -> (Next, u64) {
        match self.jobs.iter().enumerate().min_by_key(|(_, j)| j.next_due_ms) {
            Some((i, job)) if job.next_due_ms < gate_due_ms => (Next::Job(i), job.next_due_ms),
            _ => (Next::Gate, gate_due_ms),
        }
    }
}

/// Next due time after `due_ms`, skipping periods that have already passed.
fn reschedule(label: &str, due_ms: u64, period_ms: u64, now_ms: u64) -> u64 {
    let next = due_ms + period_ms;
    if next >= now_ms {
        return next;
    }
    let missed = (now_ms - next).div_ceil(period_ms);
    warn!("Scheduler: '{}' overran, skipping {} period(s)", label, missed);
    next + missed * period_ms
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
