//! Pipeline building and execution.
//!
//! This module provides:
//! - The sequential step engine with rollback and cleanup
//! - Its explicit state machine
//! - A builder with validation
//! - Run reports and failure records

mod builder;
mod engine;
mod fence;
#[cfg(test)]
mod pipeline_tests;
mod report;
mod state;

pub use builder::PipelineBuilder;
pub use engine::Pipeline;
pub use report::{FailureRecord, RunReport};
pub use state::PipelineState;
