//! Run lifecycle and terminal results.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use curvature_core::{CurvatureError, DerivedEntities, ErrorKind, Stage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a run.
///
/// `Idle → Running → Completed | Cancelled | Failed`. Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable description of why a run did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<usize>,
}

impl From<&CurvatureError> for RunError {
    fn from(err: &CurvatureError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            stage: err.stage(),
            indices: err.indices().map(<[usize]>::to_vec).unwrap_or_default(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Terminal outcome of one run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub state: RunState,
    /// Present only when `state` is [`RunState::Completed`].
    pub entities: Option<Arc<DerivedEntities>>,
    pub error: Option<RunError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of output records emitted, terminal diagnostic included.
    pub records: usize,
    pub records_digest: String,
    pub input_digest: String,
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            state: self.state,
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms: self.duration_ms(),
            records: self.records,
            records_digest: self.records_digest.clone(),
            input_digest: self.input_digest.clone(),
        }
    }
}

/// [`RunResult`] without the computed entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub records: usize,
    pub records_digest: String,
    pub input_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert_eq!(
            serde_json::to_string(&RunState::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_run_error_from_degenerate_metric() {
        let err = CurvatureError::DegenerateMetric { size: 2 };
        let run_error = RunError::from(&err);
        assert_eq!(run_error.kind, ErrorKind::DegenerateMetric);
        assert_eq!(run_error.stage, Some(Stage::Inverse));
        assert!(run_error.indices.is_empty());
        assert!(run_error.to_string().starts_with("degenerate metric: "));
    }
}
