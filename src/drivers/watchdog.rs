//! Fail-safe watchdog.
//!
//! Entered whenever the node cannot continue: a boot stage failed, or a job
//! failed while the scheduler was running.  The watchdog blinks the
//! [`DiagnosticPattern`] for the failure code on the status indicator until
//! the grace period has elapsed, then resets the board.  The grace period
//! gives an operator time to read the code and power-cycle or fix the
//! configuration before the node retries on its own.
//!
//! It depends only on the indicator pin, the clock and the reset line, so
//! it still works when the network, the ADC and the scheduler are gone.

use core::fmt;

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::{Clock, ResetPort};
use crate::drivers::led_patterns::DiagnosticPattern;
use crate::drivers::status_led::StatusIndicator;

/// Blink codes, one per failure stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FatalCode {
    /// Broker refused the session.
    Connect = 1,
    /// Broker unreachable, or URL/credentials wrong.
    Broker = 2,
    /// ADC / bus driver bring-up failed.
    Driver = 3,
    /// A sensor could not be initialised or seeded.
    SensorInit = 4,
    /// The connect announcement could not be published.
    Announce = 5,
    /// A job failed while the scheduler was running.
    Runtime = 6,
}

impl FatalCode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<FatalCode> for u8 {
    fn from(c: FatalCode) -> Self {
        c.code()
    }
}

impl fmt::Display for FatalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Connect => "broker connect",
            Self::Broker => "broker config",
            Self::Driver => "driver bring-up",
            Self::SensorInit => "sensor init",
            Self::Announce => "announce",
            Self::Runtime => "scheduler",
        };
        write!(f, "{} (code {})", stage, self.code())
    }
}

pub struct Watchdog {
    grace_ms: u64,
}

impl Watchdog {
    pub fn new(grace_secs: u32) -> Self {
        Self {
            grace_ms: grace_secs as u64 * 1000,
        }
    }

    pub fn grace_ms(&self) -> u64 {
        self.grace_ms
    }

    /// Blink `code` until the grace period has elapsed.  Returns the number
    /// of full pattern cycles shown.
    ///
    /// A cycle that starts inside the grace period always runs to the end,
    /// so the last code shown is never truncated.
    pub fn signal<P: OutputPin>(
        &self,
        code: u8,
        led: &mut StatusIndicator<P>,
        clock: &mut dyn Clock,
    ) -> u32 {
        let start = clock.now_ms();
        let mut cycles = 0;
        while clock.now_ms().saturating_sub(start) < self.grace_ms {
            for step in DiagnosticPattern::new(code) {
                led.set(step.lit);
                clock.delay_ms(step.hold_ms);
            }
            cycles += 1;
        }
        led.set(false);
        cycles
    }

    /// Signal `code`, then reset the board.  Never returns.
    pub fn raise_fatal<P: OutputPin>(
        &self,
        code: u8,
        led: &mut StatusIndicator<P>,
        clock: &mut dyn Clock,
        reset: &mut dyn ResetPort,
    ) -> ! {
        error!(
            "Watchdog: fatal code {}, blinking for {}s then resetting",
            code,
            self.grace_ms / 1000
        );
        let cycles = self.signal(code, led, clock);
        error!("Watchdog: grace period over after {} cycles, resetting", cycles);
        reset.reset()
    }
}
