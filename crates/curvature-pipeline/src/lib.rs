//! Curvature Pipeline - background execution of curvature runs
//!
//! A [`PipelineController`] accepts one run at a time, executes the staged
//! computation on a blocking worker and streams [`PipelineMessage`]s over a
//! bounded channel. The foreground side holds a [`RunHandle`]: it drains
//! messages, requests cancellation and collects the terminal [`RunResult`].

pub mod cancel;
pub mod config;
pub mod controller;
pub mod emitter;
pub mod error;
pub mod message;
pub mod progress;
pub mod runner;
pub mod state;

pub use cancel::{CancelHandle, CancelToken};
pub use config::PipelineConfig;
pub use controller::{PipelineController, RunHandle};
pub use error::PipelineError;
pub use message::{PipelineMessage, ProgressEvent};
pub use runner::RunInput;
pub use state::{RunError, RunResult, RunState};
