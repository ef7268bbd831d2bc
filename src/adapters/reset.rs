//! Hardware reset adapter.

use crate::app::ports::ResetPort;

pub struct SystemReset;

#[cfg(target_os = "espidf")]
impl ResetPort for SystemReset {
    fn reset(&mut self) -> ! {
        log::warn!("Reset: restarting");
        esp_idf_svc::hal::reset::restart()
    }
}

/// Simulation: there is no board to reset, so end the process with a
/// non-zero status and let the supervisor restart it.
#[cfg(not(target_os = "espidf"))]
impl ResetPort for SystemReset {
    fn reset(&mut self) -> ! {
        log::warn!("Reset(sim): exiting process");
        std::process::exit(70)
    }
}
