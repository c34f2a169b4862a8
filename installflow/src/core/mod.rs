//! Core domain types shared by every other module.
//!
//! - Step status, error classes and lifecycle phases
//! - The aggregate pipeline result
//! - Progress events

mod event;
mod status;

pub use event::{ProgressEvent, ProgressEventKind};
pub use status::{ErrorClass, Phase, PipelineResult, StepStatus};
