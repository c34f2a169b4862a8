//! # Installflow
//!
//! A step pipeline engine for package installers.
//!
//! An installation request (install, update, uninstall, reinstall, delta,
//! mount, recovery) is executed as an ordered list of steps sharing one
//! mutable [`ExecutionContext`](context::ExecutionContext). Each step has
//! four phases:
//!
//! - **precheck**: read-only validation before any side effect
//! - **process**: the forward action
//! - **undo**: reverse a step that started processing
//! - **clean**: discard backups once the whole run succeeded
//!
//! When a step fails, every step from the failing one back to the first is
//! undone, best effort. Progress is reported to a pluggable sink in the
//! order started, progress, error, finished.
//!
//! ## Quick Start
//!
//! ```rust
//! use installflow::prelude::*;
//!
//! let ctx = ExecutionContext::new();
//! let pipeline = PipelineBuilder::new("install")
//!     .context(ctx)
//!     .step(NoOpStep::new("unzip"))
//!     .step(NoOpStep::new("parse-manifest"))
//!     .build()
//!     .unwrap();
//!
//! let report = pipeline.run();
//! assert!(report.is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod reporter;
pub mod steps;
pub mod tasks;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::InstallerConfig;
    pub use crate::context::{
        CertificateInfo, ExecutionContext, InstallRequest, InstallationMode, Manifest,
        PrivilegeLevel, RequestType, StepRecord,
    };
    pub use crate::core::{
        ErrorClass, Phase, PipelineResult, ProgressEvent, ProgressEventKind, StepStatus,
    };
    pub use crate::errors::{
        ContextError, ContractErrorInfo, InstallflowError, PipelineValidationError, SinkError,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineState, RunReport};
    pub use crate::reporter::{
        CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressReporter,
        ProgressSink,
    };
    pub use crate::steps::{FnStep, NoOpStep, Step, StepConfigure, StepError, StepRegistry};
    pub use crate::tasks::build_pipeline;
}
