//! Structured lifecycle events for curvature runs.
//!
//! - `RunSpan`: RAII guard tagging everything inside a run with its id
//! - `emit_*`: one function per lifecycle event
//!
//! Events are emitted at `info!` level except `run.failed`, which is a
//! warning. Filter with `RUST_LOG`.

use tracing::{info, warn};

use crate::stage::Stage;

/// Enters a run-scoped span for as long as the guard lives.
///
/// ```ignore
/// let _span = RunSpan::enter("5f0c...");
/// // every event below carries run_id = "5f0c..."
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("curvature.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started, keyed by the digest of its input.
pub fn emit_run_started(run_id: &str, input_digest: &str) {
    info!(event = "run.started", run_id = %run_id, input_digest = %input_digest);
}

pub fn emit_stage_started(run_id: &str, stage: Stage) {
    info!(event = "stage.started", run_id = %run_id, stage = %stage);
}

/// Emit event: stage finished with its component count.
pub fn emit_stage_finished(run_id: &str, stage: Stage, duration_ms: u64, components: usize) {
    info!(
        event = "stage.finished",
        run_id = %run_id,
        stage = %stage,
        duration_ms = duration_ms,
        components = components,
    );
}

/// Emit event: run reached a terminal state.
pub fn emit_run_finished(run_id: &str, state: &str, duration_ms: u64, records: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        state = %state,
        duration_ms = duration_ms,
        records = records,
    );
}

/// Emit event: run failed (warning level).
pub fn emit_run_failed(run_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.failed", run_id = %run_id, kind = %kind, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _span = RunSpan::enter("test-run-id");
        emit_stage_started("test-run-id", Stage::Christoffel);
    }
}
