//! States of the pipeline engine.

use crate::core::PipelineResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the pipeline state machine.
///
/// A run starts in `Running(0)` and always ends in `Done`. The index in
/// `RollingBack` and `CleaningUp` is the step whose undo or clean is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PipelineState {
    /// Forward pass, about to run step `i`.
    Running(usize),
    /// Undoing step `i` after a failure.
    RollingBack(usize),
    /// Cleaning step `i` after full success.
    CleaningUp(usize),
    /// Finished with a result.
    Done(PipelineResult),
}

impl PipelineState {
    /// Returns true for `Done`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Returns the step index the state refers to, if any.
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Running(i) | Self::RollingBack(i) | Self::CleaningUp(i) => Some(*i),
            Self::Done(_) => None,
        }
    }

    /// Returns the result of a terminal state.
    #[must_use]
    pub fn result(&self) -> Option<PipelineResult> {
        match self {
            Self::Done(result) => Some(*result),
            _ => None,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Running(0)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running(i) => write!(f, "running({i})"),
            Self::RollingBack(i) => write!(f, "rolling_back({i})"),
            Self::CleaningUp(i) => write!(f, "cleaning_up({i})"),
            Self::Done(result) => write!(f, "done({result})"),
        }
    }
}
