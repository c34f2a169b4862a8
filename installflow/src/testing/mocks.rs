//! Mock steps and sinks for testing pipelines.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::core::{Phase, ProgressEvent, StepStatus};
use crate::errors::SinkError;
use crate::reporter::ProgressSink;
use crate::steps::Step;

/// Shared, ordered log of step phase calls.
///
/// Entries have the form `"<step>:<phase>"`, e.g. `"copy:undo"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn push(&self, step: &str, phase: Phase) {
        self.calls.lock().push(format!("{step}:{phase}"));
    }

    /// Returns all calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns the names of the steps that ran `phase`, in order.
    #[must_use]
    pub fn steps_in(&self, phase: Phase) -> Vec<String> {
        let suffix = format!(":{phase}");
        self.calls
            .lock()
            .iter()
            .filter_map(|call| call.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    /// Counts calls of one phase of one step.
    #[must_use]
    pub fn count(&self, step: &str, phase: Phase) -> usize {
        let entry = format!("{step}:{phase}");
        self.calls.lock().iter().filter(|call| **call == entry).count()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// A step that logs every phase call and returns configurable statuses.
#[derive(Debug)]
pub struct RecordingStep {
    name: String,
    log: CallLog,
    outcomes: HashMap<Phase, StepStatus>,
}

impl RecordingStep {
    /// Creates a step that succeeds in every phase.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            outcomes: HashMap::new(),
        }
    }

    /// Makes `phase` return `status`.
    #[must_use]
    pub fn failing(mut self, phase: Phase, status: StepStatus) -> Self {
        self.outcomes.insert(phase, status);
        self
    }

    fn respond(&self, phase: Phase) -> StepStatus {
        self.log.push(&self.name, phase);
        self.outcomes.get(&phase).copied().unwrap_or_default()
    }
}

impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precheck(&self, _ctx: &ExecutionContext) -> StepStatus {
        self.respond(Phase::Precheck)
    }

    fn process(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.respond(Phase::Process)
    }

    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.respond(Phase::Clean)
    }

    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.respond(Phase::Undo)
    }

    fn failure_message(&self) -> Option<String> {
        if self.outcomes.values().any(StepStatus::is_failure) {
            Some(format!("{} failed on purpose", self.name))
        } else {
            None
        }
    }
}

/// A step that fails in one phase and succeeds in all others.
#[derive(Debug, Clone)]
pub struct FailingStep {
    name: String,
    phase: Phase,
    status: StepStatus,
    message: Option<String>,
}

impl FailingStep {
    /// Creates a step failing with [`StepStatus::Error`] in `phase`.
    #[must_use]
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
            status: StepStatus::Error,
            message: None,
        }
    }

    /// Sets the failure status.
    #[must_use]
    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn outcome(&self, phase: Phase) -> StepStatus {
        if phase == self.phase {
            self.status
        } else {
            StepStatus::Ok
        }
    }
}

impl Step for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precheck(&self, _ctx: &ExecutionContext) -> StepStatus {
        self.outcome(Phase::Precheck)
    }

    fn process(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Process)
    }

    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Clean)
    }

    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Undo)
    }

    fn failure_message(&self) -> Option<String> {
        self.message.clone()
    }
}

/// A step that panics in one phase.
#[derive(Debug, Clone)]
pub struct PanickingStep {
    name: String,
    phase: Phase,
}

impl PanickingStep {
    /// Creates a step panicking in `phase`.
    #[must_use]
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
        }
    }

    fn outcome(&self, phase: Phase) -> StepStatus {
        if phase == self.phase {
            panic!("{} blew up in {}", self.name, phase);
        }
        StepStatus::Ok
    }
}

impl Step for PanickingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precheck(&self, _ctx: &ExecutionContext) -> StepStatus {
        self.outcome(Phase::Precheck)
    }

    fn process(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Process)
    }

    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Clean)
    }

    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.outcome(Phase::Undo)
    }
}

/// Creates a directory in `process` and removes it in `undo`.
#[derive(Debug)]
pub struct MakeDirStep {
    name: String,
    path: PathBuf,
    created: bool,
    log: Option<CallLog>,
}

impl MakeDirStep {
    /// Creates the step.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            created: false,
            log: None,
        }
    }

    /// Logs phase calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    fn note(&self, phase: Phase) {
        if let Some(log) = &self.log {
            log.push(&self.name, phase);
        }
    }
}

impl Step for MakeDirStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Process);
        if self.path.is_dir() {
            return StepStatus::Ok;
        }
        match fs::create_dir(&self.path) {
            Ok(()) => {
                self.created = true;
                ctx.track_written(&self.path);
                StepStatus::Ok
            }
            Err(_) => StepStatus::CreateDirError,
        }
    }

    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Clean);
        StepStatus::Ok
    }

    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Undo);
        if !std::mem::take(&mut self.created) {
            return StepStatus::Ok;
        }
        match fs::remove_dir(&self.path) {
            Ok(()) => StepStatus::Ok,
            Err(e) => StepStatus::from_io(&e),
        }
    }
}

/// Writes a file in `process` and removes it in `undo`.
#[derive(Debug)]
pub struct TouchFileStep {
    name: String,
    path: PathBuf,
    contents: Vec<u8>,
    created: bool,
    log: Option<CallLog>,
}

impl TouchFileStep {
    /// Creates the step.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            contents: Vec::new(),
            created: false,
            log: None,
        }
    }

    /// Sets the file contents.
    #[must_use]
    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = contents.into();
        self
    }

    /// Logs phase calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    fn note(&self, phase: Phase) {
        if let Some(log) = &self.log {
            log.push(&self.name, phase);
        }
    }
}

impl Step for TouchFileStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precheck(&self, _ctx: &ExecutionContext) -> StepStatus {
        self.note(Phase::Precheck);
        StepStatus::Ok
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Process);
        if self.path.exists() {
            return StepStatus::OperationNotAllowed;
        }
        match fs::write(&self.path, &self.contents) {
            Ok(()) => {
                self.created = true;
                ctx.track_written(&self.path);
                StepStatus::Ok
            }
            Err(e) => StepStatus::from_io(&e),
        }
    }

    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Clean);
        StepStatus::Ok
    }

    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        self.note(Phase::Undo);
        if !std::mem::take(&mut self.created) {
            return StepStatus::Ok;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => StepStatus::Ok,
            Err(e) => StepStatus::from_io(&e),
        }
    }
}

/// A progress sink that rejects every event.
#[derive(Debug, Default)]
pub struct FailingProgressSink {
    attempts: Mutex<usize>,
}

impl FailingProgressSink {
    /// Creates a new failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many events were offered.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl ProgressSink for FailingProgressSink {
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        *self.attempts.lock() += 1;
        Err(SinkError::new(format!("cannot deliver {}", event.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_log() {
        let log = CallLog::new();
        log.push("a", Phase::Process);
        log.push("b", Phase::Process);
        log.push("a", Phase::Undo);

        assert_eq!(log.calls(), vec!["a:process", "b:process", "a:undo"]);
        assert_eq!(log.steps_in(Phase::Process), vec!["a", "b"]);
        assert_eq!(log.count("a", Phase::Undo), 1);

        log.clear();
        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_recording_step() {
        let log = CallLog::new();
        let mut ctx = ExecutionContext::new();
        let mut step = RecordingStep::new("copy", &log).failing(Phase::Clean, StepStatus::IoError);

        assert_eq!(step.precheck(&ctx), StepStatus::Ok);
        assert_eq!(step.process(&mut ctx), StepStatus::Ok);
        assert_eq!(step.clean(&mut ctx), StepStatus::IoError);
        assert_eq!(log.calls(), vec!["copy:precheck", "copy:process", "copy:clean"]);
        assert!(step.failure_message().is_some());
    }

    #[test]
    fn test_failing_step() {
        let mut ctx = ExecutionContext::new();
        let mut step = FailingStep::new("sig", Phase::Process)
            .with_status(StepStatus::SignatureError)
            .with_message("bad signature");

        assert_eq!(step.precheck(&ctx), StepStatus::Ok);
        assert_eq!(step.process(&mut ctx), StepStatus::SignatureError);
        assert_eq!(step.undo(&mut ctx), StepStatus::Ok);
        assert_eq!(step.failure_message().as_deref(), Some("bad signature"));
    }

    #[test]
    #[should_panic(expected = "boom blew up in undo")]
    fn test_panicking_step() {
        let mut ctx = ExecutionContext::new();
        let mut step = PanickingStep::new("boom", Phase::Undo);
        assert_eq!(step.process(&mut ctx), StepStatus::Ok);
        let _ = step.undo(&mut ctx);
    }

    #[test]
    fn test_file_steps_undo() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("x");
        let file = dir.join("f");
        let mut ctx = ExecutionContext::new();

        let mut make = MakeDirStep::new("mkdir", &dir);
        let mut touch = TouchFileStep::new("touch", &file).with_contents("hello");

        assert_eq!(make.process(&mut ctx), StepStatus::Ok);
        assert_eq!(touch.process(&mut ctx), StepStatus::Ok);
        assert_eq!(fs::read(&file).unwrap(), b"hello");
        assert_eq!(ctx.written_paths().len(), 2);

        assert_eq!(touch.undo(&mut ctx), StepStatus::Ok);
        assert_eq!(make.undo(&mut ctx), StepStatus::Ok);
        assert!(!dir.exists());

        // A second undo has nothing left to do.
        assert_eq!(touch.undo(&mut ctx), StepStatus::Ok);
        assert_eq!(make.undo(&mut ctx), StepStatus::Ok);
    }

    #[test]
    fn test_failing_sink() {
        let sink = FailingProgressSink::new();
        assert!(sink.emit(&ProgressEvent::started("tpk", "a")).is_err());
        assert_eq!(sink.attempts(), 1);
    }
}
