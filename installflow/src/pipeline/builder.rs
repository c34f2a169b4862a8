//! Pipeline builder with validation.

use super::Pipeline;
use crate::config::InstallerConfig;
use crate::context::ExecutionContext;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::reporter::ProgressReporter;
use crate::steps::Step;
use std::collections::HashSet;

/// Builder for validated pipelines.
///
/// Unlike [`Pipeline::new`], `build` rejects empty pipelines and duplicate
/// step names. Step order is taken as given; the builder never checks
/// whether the sequence makes sense.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    name: String,
    steps: Vec<Box<dyn Step>>,
    context: Option<ExecutionContext>,
    reporter: Option<ProgressReporter>,
    config: Option<InstallerConfig>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends a boxed step.
    #[must_use]
    pub fn boxed_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the context the pipeline will own.
    #[must_use]
    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Applies an installer configuration at build time.
    #[must_use]
    pub fn config(mut self, config: InstallerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns the number of steps added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no steps or two steps share a
    /// name.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.steps.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no steps")
                .with_error_info(
                    ContractErrorInfo::new("PIPELINE-EMPTY", "Cannot build an empty pipeline")
                        .with_fix_hint("Add at least one step to the pipeline before building."),
                ));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(PipelineValidationError::new(format!(
                    "Step '{}' is added more than once",
                    step.name()
                ))
                .with_steps(vec![step.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-DUPLICATE-STEP",
                        format!("Duplicate step name '{}'", step.name()),
                    )
                    .with_fix_hint("Give every step in a pipeline a distinct name."),
                ));
            }
        }

        let mut context = self.context.unwrap_or_default();
        let mut reporter = self.reporter.unwrap_or_else(ProgressReporter::disabled);
        let mut sync_on_finish = true;

        if let Some(config) = &self.config {
            config.apply_to(&mut context);
            sync_on_finish = config.sync_on_finish;
            if !config.progress_enabled() {
                reporter = ProgressReporter::disabled();
            }
        }

        let mut pipeline = Pipeline::new(context)
            .with_name(self.name)
            .with_reporter(reporter)
            .with_sync_on_finish(sync_on_finish);
        for step in self.steps {
            pipeline.add_step(step);
        }
        Ok(pipeline)
    }
}
