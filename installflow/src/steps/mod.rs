//! Step trait and implementations.
//!
//! Steps are the units of installer work. Each one exposes four phases:
//! `precheck` (side-effect free validation), `process` (the work), and
//! exactly one of `undo` (after a failure) or `clean` (after full success).

mod configure;
mod filesystem;
mod registry;

pub use configure::StepConfigure;
pub use filesystem::{StepCopyPackage, StepCreateDirectory, StepRemovePackageFiles};
pub use registry::{StepFactory, StepRegistry};

use crate::context::ExecutionContext;
use crate::core::StepStatus;
use crate::errors::ContextError;
use parking_lot::Mutex;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

/// Trait for installer steps.
///
/// Every phase reports a [`StepStatus`]; there is no other error channel.
/// Panics are caught by the pipeline and treated as [`StepStatus::Error`].
pub trait Step: Send + Debug {
    /// Returns the name of the step, used in logs and records.
    fn name(&self) -> &str;

    /// Validates the context fields this step needs.
    ///
    /// Gets a shared reference, so it cannot mutate the context. It must not
    /// touch the filesystem either.
    fn precheck(&self, _ctx: &ExecutionContext) -> StepStatus {
        StepStatus::Ok
    }

    /// Performs the step's work. Only called when `precheck` returned `Ok`.
    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus;

    /// Removes transient artifacts after the whole pipeline succeeded.
    ///
    /// Must return `Ok` when `process` had no effect.
    fn clean(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        StepStatus::Ok
    }

    /// Reverts the effects of `process` after this or a later step failed.
    ///
    /// May be called after a partial or skipped `process`; must return `Ok`
    /// when there is nothing to revert.
    fn undo(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        StepStatus::Ok
    }

    /// Human readable reason for the last failure, if the step has one.
    fn failure_message(&self) -> Option<String> {
        None
    }
}

/// A failure with an explicit status, for use in [`FnStep`] closures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StepError {
    /// Status reported for the phase.
    pub status: StepStatus,
    /// Failure message.
    pub message: String,
}

impl StepError {
    /// Creates a new step error.
    #[must_use]
    pub fn new(status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Maps an `anyhow` error to the status a closure-based step reports.
///
/// [`StepError`] keeps its status, context and I/O errors use their own
/// mapping, anything else is a generic [`StepStatus::Error`].
#[must_use]
pub fn status_of(err: &anyhow::Error) -> StepStatus {
    if let Some(step_err) = err.downcast_ref::<StepError>() {
        step_err.status
    } else if let Some(ctx_err) = err.downcast_ref::<ContextError>() {
        StepStatus::from(ctx_err.clone())
    } else if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
        StepStatus::from_io(io_err)
    } else {
        StepStatus::Error
    }
}

type PrecheckFn = Box<dyn Fn(&ExecutionContext) -> anyhow::Result<()> + Send>;
type PhaseFn = Box<dyn FnMut(&mut ExecutionContext) -> anyhow::Result<()> + Send>;

/// A closure-based step.
///
/// `process` is required; `precheck`, `undo` and `clean` default to no-ops.
pub struct FnStep {
    name: String,
    precheck: Option<PrecheckFn>,
    process: PhaseFn,
    undo: Option<PhaseFn>,
    clean: Option<PhaseFn>,
    last_error: Mutex<Option<String>>,
}

impl FnStep {
    /// Creates a new function-based step.
    pub fn new<F>(name: impl Into<String>, process: F) -> Self
    where
        F: FnMut(&mut ExecutionContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            precheck: None,
            process: Box::new(process),
            undo: None,
            clean: None,
            last_error: Mutex::new(None),
        }
    }

    /// Sets the precheck closure.
    #[must_use]
    pub fn with_precheck<F>(mut self, precheck: F) -> Self
    where
        F: Fn(&ExecutionContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.precheck = Some(Box::new(precheck));
        self
    }

    /// Sets the undo closure.
    #[must_use]
    pub fn with_undo<F>(mut self, undo: F) -> Self
    where
        F: FnMut(&mut ExecutionContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.undo = Some(Box::new(undo));
        self
    }

    /// Sets the clean closure.
    #[must_use]
    pub fn with_clean<F>(mut self, clean: F) -> Self
    where
        F: FnMut(&mut ExecutionContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.clean = Some(Box::new(clean));
        self
    }

    fn settle(&self, result: anyhow::Result<()>) -> StepStatus {
        match result {
            Ok(()) => StepStatus::Ok,
            Err(err) => {
                let status = status_of(&err);
                let message = format!("{err:#}");
                debug!(step = %self.name, status = %status, error = %message, "Step closure failed");
                *self.last_error.lock() = Some(message);
                status
            }
        }
    }
}

impl Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("has_undo", &self.undo.is_some())
            .field("has_clean", &self.clean.is_some())
            .finish()
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precheck(&self, ctx: &ExecutionContext) -> StepStatus {
        match &self.precheck {
            Some(precheck) => self.settle(precheck(ctx)),
            None => StepStatus::Ok,
        }
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let result = (self.process)(ctx);
        self.settle(result)
    }

    fn clean(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let result = match self.clean.as_mut() {
            Some(clean) => clean(ctx),
            None => return StepStatus::Ok,
        };
        self.settle(result)
    }

    fn undo(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let result = match self.undo.as_mut() {
            Some(undo) => undo(ctx),
            None => return StepStatus::Ok,
        };
        self.settle(result)
    }

    fn failure_message(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

/// A step that does nothing in every phase.
#[derive(Debug, Clone)]
pub struct NoOpStep {
    name: String,
}

impl NoOpStep {
    /// Creates a new no-op step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Step for NoOpStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, _ctx: &mut ExecutionContext) -> StepStatus {
        StepStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context as _};

    #[test]
    fn test_noop_step_every_phase_ok() {
        let mut step = NoOpStep::new("noop");
        let mut ctx = ExecutionContext::new();

        assert_eq!(step.name(), "noop");
        assert_eq!(step.precheck(&ctx), StepStatus::Ok);
        assert_eq!(step.process(&mut ctx), StepStatus::Ok);
        assert_eq!(step.undo(&mut ctx), StepStatus::Ok);
        assert_eq!(step.clean(&mut ctx), StepStatus::Ok);
        assert!(step.failure_message().is_none());
    }

    #[test]
    fn test_fn_step_mutates_context() {
        let mut step = FnStep::new("set-uid", |ctx| {
            ctx.set_uid(5001);
            Ok(())
        });
        let mut ctx = ExecutionContext::new();

        assert_eq!(step.process(&mut ctx), StepStatus::Ok);
        assert_eq!(ctx.uid(), 5001);
    }

    #[test]
    fn test_fn_step_error_mapping() {
        let mut ctx = ExecutionContext::new();

        let mut generic = FnStep::new("generic", |_| Err(anyhow!("boom")));
        assert_eq!(generic.process(&mut ctx), StepStatus::Error);
        assert_eq!(generic.failure_message().as_deref(), Some("boom"));

        let mut explicit = FnStep::new("explicit", |_| {
            Err(StepError::new(StepStatus::SignatureError, "bad signature").into())
        });
        assert_eq!(explicit.process(&mut ctx), StepStatus::SignatureError);

        let mut context = FnStep::new("context", |ctx| {
            ctx.require_pkgid()?;
            Ok(())
        });
        assert_eq!(context.process(&mut ctx), StepStatus::InvalidValue);

        let mut io = FnStep::new("io", |_| {
            std::fs::read("/definitely/not/here").context("reading manifest")?;
            Ok(())
        });
        assert_eq!(io.process(&mut ctx), StepStatus::IoError);
        assert!(io.failure_message().unwrap().starts_with("reading manifest"));
    }

    #[test]
    fn test_fn_step_precheck_and_undo() {
        let ctx_ro = ExecutionContext::new();
        let step = FnStep::new("needs-pkgid", |_| Ok(())).with_precheck(|ctx| {
            ctx.require_pkgid()?;
            Ok(())
        });
        assert_eq!(step.precheck(&ctx_ro), StepStatus::InvalidValue);
        assert_eq!(step.failure_message().as_deref(), Some("Package id is empty"));

        let mut ctx = ExecutionContext::new();
        let mut step = FnStep::new("with-undo", |ctx| {
            ctx.set_uid(1);
            Ok(())
        })
        .with_undo(|ctx| {
            ctx.set_uid(0);
            Ok(())
        })
        .with_clean(|_| Err(anyhow!("clean failed")));

        step.process(&mut ctx);
        assert_eq!(step.undo(&mut ctx), StepStatus::Ok);
        assert_eq!(ctx.uid(), 0);
        assert_eq!(step.clean(&mut ctx), StepStatus::Error);
    }

    #[test]
    fn test_status_of_io_error() {
        let err = anyhow::Error::new(std::io::Error::from_raw_os_error(28));
        assert_eq!(status_of(&err), StepStatus::OutOfSpace);
    }
}
