//! Messages carried from the worker to the foreground.

use curvature_core::{OutputRecord, Stage};
use serde::{Deserialize, Serialize};

use crate::state::RunResult;

/// Advisory progress: a percentage in `0..=100`, never decreasing within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub enum PipelineMessage {
    Progress(ProgressEvent),
    Record(OutputRecord),
    /// Always the last message of a run.
    Terminal(Box<RunResult>),
}

impl PipelineMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineMessage::Terminal(_))
    }

    pub fn as_record(&self) -> Option<&OutputRecord> {
        match self {
            PipelineMessage::Record(record) => Some(record),
            _ => None,
        }
    }
}
