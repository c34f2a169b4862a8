//! Engine tests across steps, reporter and context.

use super::{Pipeline, PipelineState};
use crate::context::ExecutionContext;
use crate::core::{Phase, PipelineResult, ProgressEvent, ProgressEventKind, StepStatus};
use crate::reporter::{CollectingProgressSink, MockProgressSink, ProgressReporter};
use crate::errors::SinkError;
use crate::steps::{FnStep, NoOpStep};
use crate::testing::{CallLog, FailingStep, PanickingStep, RecordingStep};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn context() -> ExecutionContext {
    let mut ctx = ExecutionContext::new().with_pkg_type("tpk");
    ctx.set_pkgid("org.example.app").unwrap();
    ctx
}

fn recording(log: &CallLog, names: &[&str]) -> Pipeline {
    names.iter().fold(Pipeline::new(context()), |pipeline, name| {
        pipeline.with_step(RecordingStep::new(*name, log))
    })
}

#[test]
fn test_success_runs_process_then_clean_in_order() {
    let log = CallLog::new();
    let report = recording(&log, &["a", "b", "c"]).run();

    assert_eq!(report.result, PipelineResult::Ok);
    assert_eq!(
        log.calls(),
        vec![
            "a:precheck", "a:process", "b:precheck", "b:process", "c:precheck", "c:process",
            "a:clean", "b:clean", "c:clean",
        ]
    );
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Running(0),
            PipelineState::Running(1),
            PipelineState::Running(2),
            PipelineState::Running(3),
            PipelineState::CleaningUp(0),
            PipelineState::CleaningUp(1),
            PipelineState::CleaningUp(2),
            PipelineState::Done(PipelineResult::Ok),
        ]
    );
    assert!(report.failures.is_empty());
    assert_eq!(report.failed_step, None);
}

#[test]
fn test_precheck_failure_skips_process_and_undoes_failing_step() {
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_step(RecordingStep::new("a", &log))
        .with_step(RecordingStep::new("b", &log).failing(Phase::Precheck, StepStatus::ManifestNotFound))
        .with_step(RecordingStep::new("c", &log))
        .run();

    assert_eq!(report.result, PipelineResult::Error);
    assert_eq!(
        log.calls(),
        vec!["a:precheck", "a:process", "b:precheck", "b:undo", "a:undo"]
    );
    assert_eq!(report.failed_step, Some(1));
    let failure = report.forward_failure().unwrap();
    assert_eq!(failure.phase, Phase::Precheck);
    assert_eq!(failure.status, StepStatus::ManifestNotFound);
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Running(0),
            PipelineState::Running(1),
            PipelineState::RollingBack(1),
            PipelineState::RollingBack(0),
            PipelineState::Done(PipelineResult::Error),
        ]
    );
}

#[test]
fn test_undo_failure_does_not_stop_rollback() {
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_step(RecordingStep::new("a", &log))
        .with_step(RecordingStep::new("b", &log).failing(Phase::Undo, StepStatus::IoError))
        .with_step(RecordingStep::new("c", &log).failing(Phase::Process, StepStatus::Error))
        .run();

    assert_eq!(report.result, PipelineResult::UndoError);
    assert_eq!(log.steps_in(Phase::Undo), vec!["c", "b", "a"]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures_in(Phase::Undo)[0].step, "b");
    assert_eq!(report.forward_failure().unwrap().step, "c");
}

#[test]
fn test_clean_failure_stops_cleanup() {
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_step(RecordingStep::new("a", &log))
        .with_step(RecordingStep::new("b", &log).failing(Phase::Clean, StepStatus::IoError))
        .with_step(RecordingStep::new("c", &log))
        .run();

    assert_eq!(report.result, PipelineResult::CleanupError);
    assert_eq!(log.steps_in(Phase::Clean), vec!["a", "b"]);
    assert!(log.steps_in(Phase::Undo).is_empty());
    assert_eq!(report.failed_step, None);
}

#[test]
fn test_panics_are_fenced_in_every_phase() {
    for phase in [Phase::Precheck, Phase::Process] {
        let log = CallLog::new();
        let report = Pipeline::new(context())
            .with_step(RecordingStep::new("a", &log))
            .with_step(PanickingStep::new("boom", phase))
            .run();

        assert_eq!(report.result, PipelineResult::Error);
        let failure = report.forward_failure().unwrap();
        assert_eq!(failure.status, StepStatus::Error);
        assert!(failure.message.as_deref().unwrap().contains("boom panicked"));
        assert_eq!(log.steps_in(Phase::Undo), vec!["a"]);
    }

    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_step(RecordingStep::new("a", &log))
        .with_step(PanickingStep::new("boom", Phase::Undo))
        .with_step(FailingStep::new("fail", Phase::Process))
        .run();
    assert_eq!(report.result, PipelineResult::UndoError);
    assert_eq!(log.steps_in(Phase::Undo), vec!["a"]);

    let report = Pipeline::new(context())
        .with_step(PanickingStep::new("boom", Phase::Clean))
        .run();
    assert_eq!(report.result, PipelineResult::CleanupError);
}

#[test]
fn test_step_records_accumulate_on_context() {
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_step(RecordingStep::new("a", &log))
        .with_step(FailingStep::new("b", Phase::Process).with_message("disk on fire"))
        .run();

    let records = report.context().records();
    assert_eq!(records.len(), 6);
    let failure = records.first_failure().unwrap();
    assert_eq!(failure.step, "b");
    assert_eq!(failure.message.as_deref(), Some("disk on fire"));
    assert_eq!(records.for_phase(Phase::Undo).len(), 2);
}

#[test]
fn test_context_flows_between_steps() {
    let report = Pipeline::new(ExecutionContext::new())
        .with_step(FnStep::new("writer", |ctx| {
            ctx.set_pkgid("org.example.app")?;
            Ok(())
        }))
        .with_step(FnStep::new("reader", |ctx| {
            let pkgid = ctx.require_pkgid()?.to_string();
            ctx.set_pkg_path(format!("/opt/{pkgid}"));
            Ok(())
        }))
        .run();

    assert!(report.is_ok());
    assert_eq!(report.context().pkg_path().to_str(), Some("/opt/org.example.app"));
}

#[test]
fn test_empty_pipeline_succeeds() {
    let sink = Arc::new(CollectingProgressSink::new());
    let report = Pipeline::new(ExecutionContext::new())
        .with_reporter(ProgressReporter::new(sink.clone()))
        .run();

    assert_eq!(report.result, PipelineResult::Ok);
    assert_eq!(
        report.transitions,
        vec![PipelineState::Running(0), PipelineState::Done(PipelineResult::Ok)]
    );
    assert_eq!(sink.kinds(), vec![ProgressEventKind::Started, ProgressEventKind::Finished]);
}

#[test]
fn test_recovery_done_stops_forward_pass_without_undo() {
    let sink = Arc::new(CollectingProgressSink::new());
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_reporter(ProgressReporter::new(sink.clone()))
        .with_step(RecordingStep::new("a", &log))
        .with_step(RecordingStep::new("recover", &log).failing(Phase::Process, StepStatus::RecoveryDone))
        .with_step(RecordingStep::new("c", &log))
        .run();

    assert_eq!(report.result, PipelineResult::Ok);
    assert_eq!(
        log.calls(),
        vec!["a:precheck", "a:process", "recover:precheck", "recover:process", "a:clean", "recover:clean"]
    );
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Running(0),
            PipelineState::Running(1),
            PipelineState::CleaningUp(0),
            PipelineState::CleaningUp(1),
            PipelineState::Done(PipelineResult::Ok),
        ]
    );
    assert!(report.failures.is_empty());
    assert_eq!(sink.percentages(), vec![33, 100]);
    assert!(!sink.kinds().contains(&ProgressEventKind::Error));
}

#[test]
fn test_reporter_cadence_on_success() {
    let sink = Arc::new(CollectingProgressSink::new());
    let log = CallLog::new();
    let report = recording(&log, &["a", "b", "c", "d"])
        .with_reporter(ProgressReporter::new(sink.clone()))
        .run();

    assert!(report.is_ok());
    assert_eq!(
        sink.kinds(),
        vec![
            ProgressEventKind::Started,
            ProgressEventKind::Progress,
            ProgressEventKind::Progress,
            ProgressEventKind::Progress,
            ProgressEventKind::Progress,
            ProgressEventKind::Finished,
        ]
    );
    assert_eq!(sink.percentages(), vec![25, 50, 75, 100]);
    assert!(sink.events().iter().all(|e| e.pkg_id == "org.example.app" && e.pkg_type == "tpk"));
}

#[test]
fn test_started_waits_for_pkgid() {
    let sink = Arc::new(CollectingProgressSink::new());
    let report = Pipeline::new(ExecutionContext::new())
        .with_reporter(ProgressReporter::new(sink.clone()))
        .with_step(NoOpStep::new("unzip"))
        .with_step(FnStep::new("parse-manifest", |ctx| {
            ctx.set_pkgid("org.example.late")?;
            Ok(())
        }))
        .with_step(NoOpStep::new("copy"))
        .run();

    assert!(report.is_ok());
    let events = sink.events();
    assert_eq!(events[0].kind, ProgressEventKind::Started);
    assert_eq!(events[0].pkg_id, "org.example.late");
    // Progress for the first step was dropped because nothing had started.
    assert_eq!(sink.percentages(), vec![66, 100]);
}

#[test]
fn test_error_signal_precedes_finished() {
    let sink = Arc::new(CollectingProgressSink::new());
    let log = CallLog::new();
    let report = Pipeline::new(ExecutionContext::new())
        .with_reporter(ProgressReporter::new(sink.clone()))
        .with_step(RecordingStep::new("a", &log))
        .with_step(
            FailingStep::new("check-signature", Phase::Process)
                .with_status(StepStatus::SignatureError)
                .with_message("untrusted author"),
        )
        .run();

    assert_eq!(report.result, PipelineResult::Error);
    assert_eq!(
        sink.kinds(),
        vec![ProgressEventKind::Started, ProgressEventKind::Error, ProgressEventKind::Finished]
    );
    let error = &sink.events()[1];
    assert_eq!(error.status, Some(StepStatus::SignatureError));
    assert_eq!(error.message.as_deref(), Some("untrusted author"));
    assert_eq!(sink.events()[2].result, Some(PipelineResult::Error));
}

#[test]
fn test_undo_error_reports_forward_failure() {
    let sink = Arc::new(CollectingProgressSink::new());
    let log = CallLog::new();
    let report = Pipeline::new(context())
        .with_reporter(ProgressReporter::new(sink.clone()))
        .with_step(RecordingStep::new("a", &log).failing(Phase::Undo, StepStatus::IoError))
        .with_step(FailingStep::new("b", Phase::Process).with_status(StepStatus::RegistrationError))
        .run();

    assert_eq!(report.result, PipelineResult::UndoError);
    let error = sink
        .events()
        .into_iter()
        .find(|e| e.kind == ProgressEventKind::Error)
        .unwrap();
    assert_eq!(error.status, Some(StepStatus::RegistrationError));
    assert_eq!(sink.events().last().unwrap().result, Some(PipelineResult::UndoError));
}

#[test]
fn test_failing_sink_does_not_change_result() {
    let mut sink = MockProgressSink::new();
    sink.expect_emit()
        .returning(|event: &ProgressEvent| Err(SinkError::new(format!("{} dropped", event.kind))));

    let log = CallLog::new();
    let report = recording(&log, &["a", "b"])
        .with_reporter(ProgressReporter::new(Arc::new(sink)))
        .run();

    assert_eq!(report.result, PipelineResult::Ok);
    assert_eq!(log.steps_in(Phase::Clean), vec!["a", "b"]);
}

#[test]
fn test_finished_emitted_once_for_every_outcome() {
    let outcomes = [
        (None, PipelineResult::Ok),
        (Some((Phase::Process, StepStatus::Error)), PipelineResult::Error),
        (Some((Phase::Clean, StepStatus::IoError)), PipelineResult::CleanupError),
    ];

    for (failure, expected) in outcomes {
        let mut sink = MockProgressSink::new();
        sink.expect_emit()
            .withf(|e: &ProgressEvent| e.kind == ProgressEventKind::Finished)
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_emit()
            .withf(|e: &ProgressEvent| e.kind == ProgressEventKind::Started)
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_emit()
            .withf(|e: &ProgressEvent| {
                !matches!(e.kind, ProgressEventKind::Started | ProgressEventKind::Finished)
            })
            .returning(|_| Ok(()));

        let log = CallLog::new();
        let mut step = RecordingStep::new("only", &log);
        if let Some((phase, status)) = failure {
            step = step.failing(phase, status);
        }
        let report = Pipeline::new(context())
            .with_reporter(ProgressReporter::new(Arc::new(sink)))
            .with_step(step)
            .run();
        assert_eq!(report.result, expected);
    }
}
