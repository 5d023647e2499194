//! Foreground entry point: submit runs and consume their messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use curvature_core::{MetricLoader, SourceMetricLoader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cancel::CancelHandle;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::message::PipelineMessage;
use crate::runner::{self, Job, RunInput};
use crate::state::{RunResult, RunState};

/// Accepts at most one run at a time.
pub struct PipelineController {
    loader: Arc<dyn MetricLoader>,
    config: PipelineConfig,
    busy: Arc<AtomicBool>,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_loader(config, Arc::new(SourceMetricLoader))
    }

    pub fn with_loader(config: PipelineConfig, loader: Arc<dyn MetricLoader>) -> Self {
        Self {
            loader,
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// True while a worker holds the run slot.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run on a blocking worker thread.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`PipelineError::AlreadyRunning`] while another run holds the slot;
    /// the slot is released when the worker exits.
    pub fn submit(&self, input: RunInput) -> Result<RunHandle, PipelineError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submission rejected, run in progress");
            return Err(PipelineError::AlreadyRunning);
        }

        let run_id = Uuid::new_v4();
        let cancel = CancelHandle::new();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let job = Job {
            run_id,
            input,
            loader: Arc::clone(&self.loader),
            config: self.config.clone(),
            cancel: cancel.token(),
        };
        let slot = SlotGuard(Arc::clone(&self.busy));
        info!(run_id = %run_id, "run submitted");

        let join = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            runner::execute(job, tx)
        });

        Ok(RunHandle {
            run_id,
            state: RunState::Idle,
            cancel,
            messages: rx,
            join,
        })
    }
}

/// Releases the run slot when the worker closure ends, panics included.
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Foreground view of one submitted run.
pub struct RunHandle {
    run_id: Uuid,
    state: RunState,
    cancel: CancelHandle,
    messages: mpsc::Receiver<PipelineMessage>,
    join: JoinHandle<RunResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// State as observed from the messages received so far.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Request cancellation. The worker stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Next message, or `None` once the worker has hung up.
    pub async fn next_message(&mut self) -> Option<PipelineMessage> {
        let message = self.messages.recv().await?;
        self.state = match &message {
            PipelineMessage::Terminal(result) => result.state,
            _ => RunState::Running,
        };
        Some(message)
    }

    /// Drain remaining messages and return the terminal result once the
    /// worker has released its slot.
    pub async fn wait(self) -> Result<RunResult, PipelineError> {
        self.collect().await.map(|(_, result)| result)
    }

    /// Like [`RunHandle::wait`] but keeps every undrained message.
    pub async fn collect(mut self) -> Result<(Vec<PipelineMessage>, RunResult), PipelineError> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message().await {
            messages.push(message);
        }
        let result = self
            .join
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;
        Ok((messages, result))
    }
}
