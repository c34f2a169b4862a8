//! The step pipeline engine.

use super::fence::fenced;
use super::{FailureRecord, PipelineState, RunReport};
use crate::context::{ExecutionContext, StepRecord};
use crate::core::{Phase, PipelineResult, StepStatus};
use crate::observability::StepTimer;
use crate::reporter::{progress_percent, ProgressReporter, ReporterState};
use crate::steps::Step;
use crate::utils::fs::sync_paths;
use tracing::{debug, error, field, info, info_span, warn};

/// An ordered list of steps bound to one [`ExecutionContext`].
///
/// Steps run strictly one after another in insertion order. If a precheck
/// or process fails, every step from the failing one back to the first is
/// undone; undo failures are recorded but never stop the unwind. If all
/// steps succeed, they are cleaned in order and the first clean failure
/// stops the cleanup.
///
/// # Example
///
/// ```
/// use installflow::prelude::*;
///
/// let pipeline = Pipeline::new(ExecutionContext::new())
///     .with_step(NoOpStep::new("unzip"))
///     .with_step(NoOpStep::new("copy"));
///
/// let report = pipeline.run();
/// assert_eq!(report.result, PipelineResult::Ok);
/// ```
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    steps: Vec<Box<dyn Step>>,
    context: ExecutionContext,
    reporter: ProgressReporter,
    sync_on_finish: bool,
}

impl Pipeline {
    /// Creates an empty pipeline owning `context`.
    ///
    /// Progress reporting is disabled until a reporter is set.
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            name: "pipeline".to_string(),
            steps: Vec::new(),
            context,
            reporter: ProgressReporter::disabled(),
            sync_on_finish: true,
        }
    }

    /// Sets the pipeline name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Enables or disables flushing written paths at the end of the run.
    #[must_use]
    pub fn with_sync_on_finish(mut self, sync: bool) -> Self {
        self.sync_on_finish = sync;
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends a boxed step.
    pub fn add_step(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Returns the context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns the context mutably, for setup before the run.
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Runs the pipeline to completion.
    ///
    /// Never panics because of a step: panics in any phase are caught and
    /// reported as [`StepStatus::Error`].
    #[must_use = "the report carries the pipeline result"]
    pub fn run(self) -> RunReport {
        let Self {
            name,
            mut steps,
            context,
            reporter,
            sync_on_finish,
        } = self;

        let span = info_span!(
            "pipeline",
            name = %name,
            run_id = %context.run_id().run_id,
            steps = steps.len(),
            request = field::Empty,
            pkgid = field::Empty,
        );
        let _enter = span.enter();

        let mut run = Run {
            ctx: context,
            reporter,
            state: PipelineState::Running(0),
            transitions: vec![PipelineState::Running(0)],
            failures: Vec::new(),
        };

        let result = match run.forward(&mut steps) {
            Forward::Failed(failed) => run.roll_back(&mut steps, failed),
            Forward::Completed(done) => run.clean_up(&mut steps[..done]),
        };

        if let Some(request) = run.ctx.request_type() {
            span.record("request", field::display(request));
        }
        span.record("pkgid", run.ctx.pkgid());

        if sync_on_finish {
            let failed_syncs = sync_paths(run.ctx.written_paths());
            debug!(paths = run.ctx.written_paths().len(), failed = failed_syncs, "Flushed written paths");
        }
        run.finish(result);

        let failed_step = run.failures.iter().find(|f| f.is_forward()).map(|f| f.index);
        RunReport {
            result,
            failed_step,
            failures: run.failures,
            transitions: run.transitions,
            context: run.ctx,
        }
    }
}

/// How the forward pass ended.
enum Forward {
    /// The first `n` steps processed and need cleaning.
    Completed(usize),
    /// The step at this index failed.
    Failed(usize),
}

/// Mutable state of one run.
struct Run {
    ctx: ExecutionContext,
    reporter: ProgressReporter,
    state: PipelineState,
    transitions: Vec<PipelineState>,
    failures: Vec<FailureRecord>,
}

impl Run {
    fn transition(&mut self, state: PipelineState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Pipeline state change");
            self.state = state;
            self.transitions.push(state);
        }
    }

    /// Runs precheck and process of every step.
    ///
    /// A process returning [`StepStatus::RecoveryDone`] ends the pass early
    /// as a success; later steps never run.
    fn forward(&mut self, steps: &mut [Box<dyn Step>]) -> Forward {
        let total = steps.len();
        self.try_send_started();

        for (index, step) in steps.iter_mut().enumerate() {
            self.transition(PipelineState::Running(index));

            let (mut status, mut message) = self.call(index, step.as_mut(), Phase::Precheck);
            let mut phase = Phase::Precheck;
            if status.is_ok() {
                (status, message) = self.call(index, step.as_mut(), Phase::Process);
                phase = Phase::Process;
            }

            if phase == Phase::Process && status == StepStatus::RecoveryDone {
                info!(step = step.name(), index, "Recovery finished, skipping remaining steps");
                self.try_send_started();
                let (pkg_type, pkgid) = (self.ctx.pkg_type().to_string(), self.ctx.pkgid().to_string());
                self.reporter.send_progress(100, &pkg_type, &pkgid);
                return Forward::Completed(index + 1);
            }

            if status.is_failure() {
                let failure = FailureRecord::new(index, step.name(), phase, status)
                    .with_message(message);
                error!(
                    step = step.name(),
                    index,
                    phase = %phase,
                    status = %status,
                    message = failure.message.as_deref().unwrap_or(""),
                    "Step failed, rolling back"
                );
                self.send_error(&failure);
                self.failures.push(failure);
                return Forward::Failed(index);
            }

            self.try_send_started();
            let percent = progress_percent(index + 1, total);
            let (pkg_type, pkgid) = (self.ctx.pkg_type().to_string(), self.ctx.pkgid().to_string());
            self.reporter.send_progress(percent, &pkg_type, &pkgid);
        }

        self.transition(PipelineState::Running(total));
        Forward::Completed(total)
    }

    /// Undoes steps `failed..=0`, never stopping early.
    fn roll_back(&mut self, steps: &mut [Box<dyn Step>], failed: usize) -> PipelineResult {
        let mut result = PipelineResult::Error;

        for index in (0..=failed).rev() {
            self.transition(PipelineState::RollingBack(index));
            let step = steps[index].as_mut();
            let (status, message) = self.call(index, step, Phase::Undo);
            if status.is_failure() {
                error!(step = step.name(), index, status = %status, "Undo failed, continuing rollback");
                self.failures
                    .push(FailureRecord::new(index, step.name(), Phase::Undo, status).with_message(message));
                result = PipelineResult::UndoError;
            }
        }

        result
    }

    /// Cleans steps in order, stopping at the first failure.
    fn clean_up(&mut self, steps: &mut [Box<dyn Step>]) -> PipelineResult {
        for (index, step) in steps.iter_mut().enumerate() {
            self.transition(PipelineState::CleaningUp(index));
            let (status, message) = self.call(index, step.as_mut(), Phase::Clean);
            if status.is_failure() {
                warn!(step = step.name(), index, status = %status, "Clean failed, stopping cleanup");
                self.failures
                    .push(FailureRecord::new(index, step.name(), Phase::Clean, status).with_message(message));
                return PipelineResult::CleanupError;
            }
        }
        PipelineResult::Ok
    }

    /// Calls one phase of one step behind a panic fence and records it.
    fn call(&mut self, index: usize, step: &mut dyn Step, phase: Phase) -> (StepStatus, Option<String>) {
        let name = step.name().to_string();
        let timer = StepTimer::start(name.clone(), phase);
        debug!(step = %name, index, phase = %phase, "Step phase started");

        let ctx = &mut self.ctx;
        let outcome = fenced(|| match phase {
            Phase::Precheck => step.precheck(ctx),
            Phase::Process => step.process(ctx),
            Phase::Clean => step.clean(ctx),
            Phase::Undo => step.undo(ctx),
        });

        let (status, message) = match outcome {
            Ok(status) if status.is_ok() => (status, None),
            Ok(status) => (status, fenced(|| step.failure_message()).ok().flatten()),
            Err(panic) => {
                error!(step = %name, index, phase = %phase, panic = %panic, "Step panicked");
                (StepStatus::Error, Some(format!("{name} panicked: {panic}")))
            }
        };

        let duration_ms = timer.finish();
        debug!(step = %name, index, phase = %phase, status = %status, duration_ms, "Step phase finished");
        self.ctx.record(StepRecord {
            index,
            step: name,
            phase,
            status,
            duration_ms,
            message: message.clone(),
        });

        (status, message)
    }

    fn try_send_started(&mut self) {
        if self.reporter.state() == ReporterState::NotSent && !self.ctx.pkgid().is_empty() {
            self.send_started();
        }
    }

    fn send_started(&mut self) {
        let (pkg_type, pkgid) = (self.ctx.pkg_type().to_string(), self.ctx.pkgid().to_string());
        self.reporter.send_started(&pkg_type, &pkgid);
    }

    fn send_error(&mut self, failure: &FailureRecord) {
        if self.reporter.state() == ReporterState::NotSent {
            self.send_started();
        }
        let (pkg_type, pkgid) = (self.ctx.pkg_type().to_string(), self.ctx.pkgid().to_string());
        self.reporter
            .send_error(failure.status, &failure.display_message(), &pkg_type, &pkgid);
    }

    fn finish(&mut self, result: PipelineResult) {
        if self.reporter.state() == ReporterState::NotSent {
            self.send_started();
        }
        let (pkg_type, pkgid) = (self.ctx.pkg_type().to_string(), self.ctx.pkgid().to_string());
        self.reporter.send_finished(result, &pkg_type, &pkgid);
        self.transition(PipelineState::Done(result));

        if result.is_ok() {
            info!(result = %result, "Pipeline finished");
        } else {
            warn!(result = %result, failures = self.failures.len(), "Pipeline finished");
        }
    }
}
