//! Accumulated per-step results.

use crate::core::{Phase, StepStatus};
use serde::{Deserialize, Serialize};

/// The outcome of one phase of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step position in the pipeline.
    pub index: usize,
    /// Step name.
    pub step: String,
    /// Phase that ran.
    pub phase: Phase,
    /// Resulting status.
    pub status: StepStatus,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Failure message, if the step reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only log of [`StepRecord`]s for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRecords {
    records: Vec<StepRecord>,
}

impl StepRecords {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// Returns all records in execution order.
    #[must_use]
    pub fn all(&self) -> &[StepRecord] {
        &self.records
    }

    /// Returns the records of one phase, in execution order.
    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> Vec<&StepRecord> {
        self.records.iter().filter(|r| r.phase == phase).collect()
    }

    /// Returns the records of one step, in execution order.
    #[must_use]
    pub fn for_step(&self, step: &str) -> Vec<&StepRecord> {
        self.records.iter().filter(|r| r.step == step).collect()
    }

    /// Returns the first failing record, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.status.is_failure())
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, step: &str, phase: Phase, status: StepStatus) -> StepRecord {
        StepRecord {
            index,
            step: step.to_string(),
            phase,
            status,
            duration_ms: 0.0,
            message: None,
        }
    }

    #[test]
    fn test_records_filtering() {
        let mut records = StepRecords::new();
        records.push(record(0, "unzip", Phase::Precheck, StepStatus::Ok));
        records.push(record(0, "unzip", Phase::Process, StepStatus::Ok));
        records.push(record(1, "copy", Phase::Process, StepStatus::IoError));
        records.push(record(1, "copy", Phase::Undo, StepStatus::Ok));
        records.push(record(0, "unzip", Phase::Undo, StepStatus::Ok));

        assert_eq!(records.len(), 5);
        assert_eq!(records.for_phase(Phase::Undo).len(), 2);
        assert_eq!(records.for_step("unzip").len(), 3);

        let failure = records.first_failure().unwrap();
        assert_eq!(failure.step, "copy");
        assert_eq!(failure.status, StepStatus::IoError);
    }

    #[test]
    fn test_records_empty() {
        let records = StepRecords::new();
        assert!(records.is_empty());
        assert!(records.first_failure().is_none());
    }
}
