//! Wall-clock timing of step phases.

use crate::core::Phase;
use std::time::Instant;

/// Measures one step phase.
#[derive(Debug)]
pub struct StepTimer {
    start: Instant,
    step: String,
    phase: Phase,
}

impl StepTimer {
    /// Starts timing `phase` of `step`.
    #[must_use]
    pub fn start(step: impl Into<String>, phase: Phase) -> Self {
        Self {
            start: Instant::now(),
            step: step.into(),
            phase,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        crate::utils::elapsed_ms(self.start)
    }

    /// Returns the step name.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Returns the timed phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_timer() {
        let timer = StepTimer::start("copy-package", Phase::Process);
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(timer.step(), "copy-package");
        assert_eq!(timer.phase(), Phase::Process);
        assert!(timer.finish() >= 5.0);
    }
}
