//! Testing utilities for installer pipelines.
//!
//! This module provides:
//! - Mock steps that log, fail or panic on demand
//! - Steps with real filesystem effects and exact inverse undo
//! - Context and reporter fixtures
//! - Assertions over call logs, results, paths and progress events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_calls, assert_monotonic_progress, assert_path_absent, assert_path_exists,
    assert_result, assert_single_finish,
};
pub use fixtures::{collecting_reporter, TestContext};
pub use mocks::{
    CallLog, FailingProgressSink, FailingStep, MakeDirStep, PanickingStep, RecordingStep,
    TouchFileStep,
};
