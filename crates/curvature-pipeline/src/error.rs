//! Controller-level errors. Failures inside a run are reported through
//! [`crate::RunResult`], never through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a calculation is already running")]
    AlreadyRunning,

    #[error("worker task failed: {0}")]
    Worker(String),
}
