//! Diagnostic blink pattern shown by the fail-safe.
//!
//! One cycle of the pattern:
//!
//! | Phase        | Steps          | Hold   | Meaning                      |
//! |--------------|----------------|--------|------------------------------|
//! | Rapid flash  | 20 toggles     | 100 ms | "alive, but in error"        |
//! | Gap          | 1 (unlit)      | 1 s    |                              |
//! | Code         | `code` pulses  | 500 ms on / 500 ms off | failure code |
//! | Gap          | 1 (unlit)      | 1 s    |                              |
//!
//! An operator counts the slow pulses to learn which stage failed.

pub const RAPID_TOGGLES: u32 = 20;
pub const RAPID_HOLD_MS: u32 = 100;
pub const GAP_MS: u32 = 1000;
pub const CODE_HOLD_MS: u32 = 500;

/// Indicator state to apply, and how long to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkStep {
    pub lit: bool,
    pub hold_ms: u32,
}

/// Iterator over one cycle of the diagnostic pattern for `code`.
#[derive(Debug, Clone)]
pub struct DiagnosticPattern {
    code: u8,
    index: u32,
}

impl DiagnosticPattern {
    pub fn new(code: u8) -> Self {
        Self { code, index: 0 }
    }

    fn step_count(&self) -> u32 {
        RAPID_TOGGLES + 1 + 2 * self.code as u32 + 1
    }

    /// Total duration of one cycle.
    pub fn cycle_ms(code: u8) -> u64 {
        Self::new(code).map(|s| s.hold_ms as u64).sum()
    }
}

impl Iterator for DiagnosticPattern {
    type Item = BlinkStep;

    fn next(&mut self) -> Option<BlinkStep> {
        let i = self.index;
        if i >= self.step_count() {
            return None;
        }
        self.index += 1;

        let code_start = RAPID_TOGGLES + 1;
        let code_end = code_start + 2 * self.code as u32;
        let step = if i < RAPID_TOGGLES {
            BlinkStep { lit: i % 2 == 0, hold_ms: RAPID_HOLD_MS }
        } else if i < code_start || i >= code_end {
            BlinkStep { lit: false, hold_ms: GAP_MS }
        } else {
            BlinkStep { lit: (i - code_start) % 2 == 0, hold_ms: CODE_HOLD_MS }
        };
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.step_count().saturating_sub(self.index) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for DiagnosticPattern {}
