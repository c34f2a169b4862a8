//! Assertions for pipeline tests.

use std::path::Path;

use super::CallLog;
use crate::core::{PipelineResult, ProgressEventKind};
use crate::pipeline::RunReport;
use crate::reporter::CollectingProgressSink;

/// Asserts the call log matches `expected` exactly.
///
/// # Panics
///
/// Panics if the logged calls differ.
pub fn assert_calls(log: &CallLog, expected: &[&str]) {
    let calls = log.calls();
    assert_eq!(calls, expected, "step calls differ");
}

/// Asserts the run ended with `expected`.
///
/// # Panics
///
/// Panics with the recorded failures if the result differs.
pub fn assert_result(report: &RunReport, expected: PipelineResult) {
    assert_eq!(
        report.result, expected,
        "unexpected pipeline result, failures: {:?}",
        report.failures
    );
}

/// Asserts nothing exists at `path`.
///
/// # Panics
///
/// Panics if `path` exists.
pub fn assert_path_absent(path: impl AsRef<Path>) {
    let path = path.as_ref();
    assert!(!path.exists(), "expected {} to be absent", path.display());
}

/// Asserts something exists at `path`.
///
/// # Panics
///
/// Panics if `path` does not exist.
pub fn assert_path_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    assert!(path.exists(), "expected {} to exist", path.display());
}

/// Asserts exactly one `Started` followed later by exactly one `Finished`,
/// with `Finished` last.
///
/// # Panics
///
/// Panics if the sequence is malformed.
pub fn assert_single_finish(sink: &CollectingProgressSink) {
    let kinds = sink.kinds();
    let started = kinds.iter().filter(|k| **k == ProgressEventKind::Started).count();
    let finished = kinds.iter().filter(|k| **k == ProgressEventKind::Finished).count();

    assert_eq!(started, 1, "expected one started event in {kinds:?}");
    assert_eq!(finished, 1, "expected one finished event in {kinds:?}");
    assert_eq!(kinds.first(), Some(&ProgressEventKind::Started), "started must come first");
    assert_eq!(kinds.last(), Some(&ProgressEventKind::Finished), "finished must come last");
}

/// Asserts the progress percentages never decrease and end at 100.
///
/// # Panics
///
/// Panics if the sequence is empty, decreases, or stops short of 100.
pub fn assert_monotonic_progress(sink: &CollectingProgressSink) {
    let percentages = sink.percentages();
    assert!(!percentages.is_empty(), "no progress was reported");
    assert!(
        percentages.windows(2).all(|w| w[0] <= w[1]),
        "progress decreased: {percentages:?}"
    );
    assert_eq!(percentages.last(), Some(&100), "progress must end at 100");
}
