//! What a finished run hands back to its caller.

use super::PipelineState;
use crate::context::ExecutionContext;
use crate::core::{Phase, PipelineResult, StepStatus};
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// A failed step phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Step position in the pipeline.
    pub index: usize,
    /// Step name.
    pub step: String,
    /// Phase that failed.
    pub phase: Phase,
    /// Reported status.
    pub status: StepStatus,
    /// Failure message from the step or the caught panic.
    pub message: Option<String>,
    /// When the failure was recorded.
    pub timestamp: Timestamp,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(index: usize, step: impl Into<String>, phase: Phase, status: StepStatus) -> Self {
        Self {
            index,
            step: step.into(),
            phase,
            status,
            message: None,
            timestamp: now_utc(),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// Returns true for failures of the forward pass.
    #[must_use]
    pub fn is_forward(&self) -> bool {
        matches!(self.phase, Phase::Precheck | Phase::Process)
    }

    /// Message to show users: the step's own message or the status name.
    #[must_use]
    pub fn display_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{} failed: {}", self.step, self.status))
    }
}

/// The outcome of [`Pipeline::run`](super::Pipeline::run).
#[derive(Debug)]
pub struct RunReport {
    /// Aggregate result.
    pub result: PipelineResult,
    /// Index of the step whose precheck or process failed.
    pub failed_step: Option<usize>,
    /// Every failed phase, in the order they happened.
    pub failures: Vec<FailureRecord>,
    /// Every state the engine went through, ending in `Done`.
    pub transitions: Vec<PipelineState>,
    /// The context as the steps left it.
    pub context: ExecutionContext,
}

impl RunReport {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Process exit code for the result.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.result.exit_code()
    }

    /// The forward failure that stopped the run, if any.
    #[must_use]
    pub fn forward_failure(&self) -> Option<&FailureRecord> {
        self.failures.iter().find(|f| f.is_forward())
    }

    /// Failures of the given phase.
    #[must_use]
    pub fn failures_in(&self, phase: Phase) -> Vec<&FailureRecord> {
        self.failures.iter().filter(|f| f.phase == phase).collect()
    }

    /// Message for user-facing reporting.
    ///
    /// A forward failure takes precedence over undo and clean failures.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.forward_failure()
            .or_else(|| self.failures.first())
            .map(FailureRecord::display_message)
    }

    /// Returns the context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Consumes the report, returning the context.
    #[must_use]
    pub fn into_context(self) -> ExecutionContext {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(result: PipelineResult, failures: Vec<FailureRecord>) -> RunReport {
        RunReport {
            result,
            failed_step: failures.iter().find(|f| f.is_forward()).map(|f| f.index),
            failures,
            transitions: vec![PipelineState::Done(result)],
            context: ExecutionContext::new(),
        }
    }

    #[test]
    fn test_forward_failure_takes_precedence() {
        let report = report(
            PipelineResult::UndoError,
            vec![
                FailureRecord::new(2, "register", Phase::Process, StepStatus::RegistrationError)
                    .with_message(Some("db locked".to_string())),
                FailureRecord::new(1, "copy", Phase::Undo, StepStatus::IoError),
            ],
        );

        assert_eq!(report.failed_step, Some(2));
        assert_eq!(report.forward_failure().unwrap().step, "register");
        assert_eq!(report.failures_in(Phase::Undo).len(), 1);
        assert_eq!(report.error_message().as_deref(), Some("db locked"));
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_clean_failure_message() {
        let report = report(
            PipelineResult::CleanupError,
            vec![FailureRecord::new(0, "copy", Phase::Clean, StepStatus::IoError)],
        );
        assert!(report.forward_failure().is_none());
        assert_eq!(report.error_message().as_deref(), Some("copy failed: io_error"));
    }

    #[test]
    fn test_ok_report() {
        let report = report(PipelineResult::Ok, Vec::new());
        assert!(report.is_ok());
        assert!(report.error_message().is_none());
        assert!(report.into_context().records().is_empty());
    }
}
