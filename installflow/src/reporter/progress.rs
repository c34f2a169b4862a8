//! The `NotSent -> Started -> Finished` progress reporter.

use super::{NoOpProgressSink, ProgressSink};
use crate::core::{PipelineResult, ProgressEvent, StepStatus};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Where the reporter is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReporterState {
    /// Nothing sent yet.
    #[default]
    NotSent,
    /// `Started` was sent.
    Started,
    /// `Finished` was sent; nothing else will be.
    Finished,
}

/// Computes the progress percentage after `completed` of `total` steps.
///
/// An empty pipeline is complete by definition.
#[must_use]
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = completed.min(total) * 100 / total;
    u8::try_from(percent).unwrap_or(100)
}

/// Best-effort side channel notified of run start, progress, errors and end.
///
/// Each transition happens at most once. Out-of-order calls are rejected
/// by returning `false`, never by panicking. A failing sink is logged and
/// also yields `false`, but the state still advances.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    state: ReporterState,
    last_percent: Option<u8>,
    error_sent: bool,
    enabled: bool,
}

impl ProgressReporter {
    /// Creates a reporter delivering to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            state: ReporterState::NotSent,
            last_percent: None,
            error_sent: false,
            enabled: true,
        }
    }

    /// Creates a reporter that discards everything, for offline mode.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(Arc::new(NoOpProgressSink))
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ReporterState {
        self.state
    }

    /// Returns false for a reporter built with [`ProgressReporter::disabled`].
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true once an error was sent.
    #[must_use]
    pub fn error_sent(&self) -> bool {
        self.error_sent
    }

    /// Sends `Started`. Only valid in `NotSent`.
    pub fn send_started(&mut self, pkg_type: &str, pkg_id: &str) -> bool {
        if self.state != ReporterState::NotSent {
            trace!(state = ?self.state, "Ignoring duplicate started signal");
            return false;
        }
        self.state = ReporterState::Started;
        self.deliver(&ProgressEvent::started(pkg_type, pkg_id))
    }

    /// Sends a percentage. Only valid in `Started`; a lower percentage
    /// than the last one sent is rejected.
    pub fn send_progress(&mut self, percent: u8, pkg_type: &str, pkg_id: &str) -> bool {
        if self.state != ReporterState::Started {
            trace!(state = ?self.state, percent, "Ignoring progress outside started state");
            return false;
        }
        let percent = percent.min(100);
        if self.last_percent.is_some_and(|last| percent < last) {
            trace!(percent, last = ?self.last_percent, "Ignoring decreasing progress");
            return false;
        }
        self.last_percent = Some(percent);
        self.deliver(&ProgressEvent::progress(percent, pkg_type, pkg_id))
    }

    /// Sends the failure reason. Only valid in `Started`, at most once.
    pub fn send_error(
        &mut self,
        status: StepStatus,
        message: &str,
        pkg_type: &str,
        pkg_id: &str,
    ) -> bool {
        if self.state != ReporterState::Started || self.error_sent {
            trace!(state = ?self.state, status = %status, "Ignoring error signal");
            return false;
        }
        self.error_sent = true;
        self.deliver(&ProgressEvent::error(status, message, pkg_type, pkg_id))
    }

    /// Sends `Finished`. Only valid in `Started`.
    pub fn send_finished(&mut self, result: PipelineResult, pkg_type: &str, pkg_id: &str) -> bool {
        if self.state != ReporterState::Started {
            trace!(state = ?self.state, result = %result, "Ignoring finished signal");
            return false;
        }
        self.state = ReporterState::Finished;
        self.deliver(&ProgressEvent::finished(result, pkg_type, pkg_id))
    }

    fn deliver(&self, event: &ProgressEvent) -> bool {
        match self.sink.emit(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(kind = %event.kind, error = %e, "Progress sink failed");
                false
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &self.state)
            .field("last_percent", &self.last_percent)
            .field("error_sent", &self.error_sent)
            .field("enabled", &self.enabled)
            .finish()
    }
}
