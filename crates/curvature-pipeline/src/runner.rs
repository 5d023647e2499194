//! The worker side of a run.
//!
//! [`execute`] drives every stage in order, streams records as each stage
//! finishes and always ends with exactly one closing diagnostic followed by
//! the terminal message. A failure before the metric is accepted emits the
//! closing diagnostic only.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use curvature_core::output::{
    input_digest, matrix_records, rank1_records, rank2_records, rank3_records, scalar_records,
};
use curvature_core::{
    emit_run_failed, emit_run_finished, emit_run_started, emit_stage_finished,
    emit_stage_started, CoordinateFrame, CurvatureError, DerivedEntities,
    EngineError, MetricLoader, MetricPreset, OutputRecord, ParameterSet, Renderer, RunSpan,
    Stage, StageContext, StageDriver, StageOutput, TensorEngine, TensorKind, METRICS,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::emitter::Emitter;
use crate::message::PipelineMessage;
use crate::progress;
use crate::state::{RunError, RunResult, RunState};

/// The three text inputs of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    /// Comma-separated coordinate names, in index order.
    pub coords: String,
    /// Comma-separated parameter names. May be empty.
    pub params: String,
    /// Metric-definition source text.
    pub metric_source: String,
}

impl RunInput {
    pub fn new(
        coords: impl Into<String>,
        params: impl Into<String>,
        metric_source: impl Into<String>,
    ) -> Self {
        Self {
            coords: coords.into(),
            params: params.into(),
            metric_source: metric_source.into(),
        }
    }

    pub fn from_preset(preset: MetricPreset) -> Self {
        Self::new(preset.coords(), preset.params(), preset.source())
    }

    /// SHA-256 over the three fields.
    pub fn digest(&self) -> String {
        input_digest(&self.coords, &self.params, &self.metric_source)
    }
}

pub(crate) struct Job {
    pub(crate) run_id: Uuid,
    pub(crate) input: RunInput,
    pub(crate) loader: Arc<dyn MetricLoader>,
    pub(crate) config: PipelineConfig,
    pub(crate) cancel: CancelToken,
}

/// Run `job` to a terminal state. Blocks; call from a blocking thread.
pub(crate) fn execute(job: Job, tx: mpsc::Sender<PipelineMessage>) -> RunResult {
    let run_id = job.run_id.to_string();
    let _span = RunSpan::enter(&run_id);
    let started_at = Utc::now();
    let clock = Instant::now();
    let input_digest = job.input.digest();
    emit_run_started(&run_id, &input_digest);

    let mut worker = Worker {
        run_id: &run_id,
        link: tx.clone(),
        emitter: Emitter::new(tx),
        cancel: job.cancel,
        renderer: job.config.render.renderer(),
        emit_christoffel: job.config.emit_christoffel,
    };
    let outcome = worker.run(&job.input, job.loader.as_ref());
    let mut emitter = worker.emitter;

    let (state, entities, error) = match outcome {
        Ok(entities) => {
            emitter.record(OutputRecord::diagnostic("calculation finished"));
            emitter.progress(Stage::Divergence, 100);
            METRICS.inc_completed();
            (RunState::Completed, Some(Arc::new(entities)), None)
        }
        Err(err) => {
            let closing = match &err {
                CurvatureError::Cancelled { stage } => {
                    METRICS.inc_cancelled();
                    format!("calculation cancelled: {stage}")
                }
                other => {
                    METRICS.inc_failed();
                    emit_run_failed(&run_id, other.kind().label(), other);
                    format!("{}: {}", other.kind(), other)
                }
            };
            emitter.record(OutputRecord::diagnostic(closing));
            let state = if err.is_cancelled() {
                RunState::Cancelled
            } else {
                RunState::Failed
            };
            (state, None, Some(RunError::from(&err)))
        }
    };

    let duration_ms = clock.elapsed().as_millis() as u64;
    emit_run_finished(&run_id, state.as_str(), duration_ms, emitter.log().len());
    METRICS.flush();

    let result = RunResult {
        run_id: job.run_id,
        state,
        entities,
        error,
        started_at,
        finished_at: Utc::now(),
        records: emitter.log().len(),
        records_digest: emitter.log().digest(),
        input_digest,
    };
    emitter.finish(result.clone());
    result
}

struct Worker<'a> {
    run_id: &'a str,
    /// Probed for a dropped receiver, which cancels the run.
    link: mpsc::Sender<PipelineMessage>,
    emitter: Emitter,
    cancel: CancelToken,
    renderer: Box<dyn Renderer>,
    emit_christoffel: bool,
}

impl Worker<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.link.is_closed()
    }

    fn checkpoint(&self, stage: Stage) -> Result<(), CurvatureError> {
        if self.cancelled() {
            return Err(CurvatureError::Cancelled { stage });
        }
        Ok(())
    }

    fn run(
        &mut self,
        input: &RunInput,
        loader: &dyn MetricLoader,
    ) -> Result<DerivedEntities, CurvatureError> {
        self.checkpoint(Stage::Input)?;
        let frame = CoordinateFrame::parse(&input.coords)?;
        let params = ParameterSet::parse(&input.params, &frame)?;
        self.emitter.progress(Stage::Input, progress::band(Stage::Input).1);

        self.checkpoint(Stage::Metric)?;
        let metric = loader.load(&frame, &params, &input.metric_source)?;
        let engine = TensorEngine::new(frame);
        engine.check_shape(&metric)?;
        self.emitter.progress(Stage::Metric, progress::band(Stage::Metric).1);

        self.emitter
            .record(OutputRecord::diagnostic(format!("coordinates: {}", engine.frame())));
        self.emitter
            .record(OutputRecord::diagnostic(format!("parameters: {params}")));
        let records = matrix_records(TensorKind::Metric, &metric, self.renderer.as_ref());
        self.emitter.records(records);

        engine.compute_with(params, metric, self)
    }
}

impl StageDriver for Worker<'_> {
    /// Runs one engine stage with cancellation and progress wired in.
    fn run_stage<T>(
        &mut self,
        engine: &TensorEngine,
        stage: Stage,
        body: impl FnOnce(&TensorEngine, &mut StageContext<'_>) -> Result<T, EngineError>,
    ) -> Result<T, CurvatureError> {
        emit_stage_started(self.run_id, stage);
        let clock = Instant::now();

        let cancel = self.cancel.clone();
        let link = self.link.clone();
        let probe = move || cancel.is_cancelled() || link.is_closed();
        let mut components = 0usize;
        let emitter = &mut self.emitter;
        let mut observer = |s: Stage, done: usize, total: usize| {
            components = done;
            emitter.progress(s, progress::percent(s, done, total));
        };
        let mut ctx = StageContext::unobserved()
            .with_cancel(&probe)
            .with_observer(&mut observer);
        let value = body(engine, &mut ctx)?;

        self.emitter.progress(stage, progress::band(stage).1);
        emit_stage_finished(
            self.run_id,
            stage,
            clock.elapsed().as_millis() as u64,
            components,
        );
        Ok(value)
    }

    fn finished(&mut self, output: StageOutput<'_>) {
        let renderer = self.renderer.as_ref();
        let records = match output {
            StageOutput::InverseMetric(m) => matrix_records(TensorKind::InverseMetric, m, renderer),
            StageOutput::Christoffel(_) if !self.emit_christoffel => return,
            StageOutput::Christoffel(t) => rank3_records(TensorKind::Christoffel, t, renderer),
            StageOutput::Ricci(t) => rank2_records(TensorKind::Ricci, t, renderer),
            StageOutput::RicciScalar(e) => scalar_records(TensorKind::RicciScalar, e, renderer),
            StageOutput::Einstein(t) => rank2_records(TensorKind::Einstein, t, renderer),
            StageOutput::MixedEinstein(t) => rank2_records(TensorKind::MixedEinstein, t, renderer),
            StageOutput::Divergence(t) => rank1_records(TensorKind::Divergence, t, renderer),
        };
        self.emitter.records(records);
    }
}
