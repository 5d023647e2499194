//! Lifecycle tracing events.

use curvature_core::{
    emit_run_failed, emit_run_finished, emit_run_started, emit_stage_finished,
    emit_stage_started, RunSpan, Stage,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_run_started_logs_run_id() {
    emit_run_started("run-123", "abc");
    assert!(logs_contain("run.started"));
    assert!(logs_contain("run-123"));
}

#[traced_test]
#[test]
fn test_stage_events() {
    emit_stage_started("run-1", Stage::Ricci);
    emit_stage_finished("run-1", Stage::Ricci, 12, 16);
    assert!(logs_contain("stage.finished"));
    assert!(logs_contain("components=16"));
}

#[traced_test]
#[test]
fn test_run_finished_and_failed() {
    emit_run_finished("run-2", "completed", 50, 120);
    emit_run_failed("run-3", "degenerate_metric", &"4x4 metric is not invertible");
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("run.failed"));
}

#[traced_test]
#[test]
fn test_run_span_enter_creates_span() {
    let span = RunSpan::enter("span-run");
    emit_stage_started("span-run", Stage::Input);
    drop(span);
    assert!(logs_contain("curvature.run"));
}
