//! Curvature Core - tensor calculus for general relativity
//!
//! Turns a metric tensor on an n-dimensional coordinate manifold into the
//! chain of derived objects: inverse metric, Christoffel symbols, Ricci
//! tensor and scalar, Einstein tensor (covariant and mixed) and the
//! covariant divergence of the Einstein tensor.
//!
//! - [`frame`]: coordinate and parameter declarations
//! - [`metric_source`]: sandboxed metric-definition language and presets
//! - [`index_algebra`]: the index formulas, generic over [`Symbolic`]
//! - [`engine`]: staged computation with per-component cancellation
//! - [`output`]: ordered output records and renderers

pub mod engine;
pub mod entities;
pub mod error;
pub mod frame;
pub mod index_algebra;
pub mod metric_source;
pub mod metrics;
pub mod obs;
pub mod output;
pub mod stage;
pub mod telemetry;

pub use engine::{StageContext, StageDriver, StageOutput, TensorEngine};
pub use entities::DerivedEntities;
pub use error::{CurvatureError, EngineError, ErrorKind, InputError, Result};
pub use frame::{CoordinateFrame, ParameterSet};
pub use index_algebra::{Rank1, Rank2, Rank3, Symbolic};
pub use metric_source::{
    MetricDefinitionError, MetricLoader, MetricPreset, MetricSourceError, SourceMetricLoader,
};
pub use metrics::METRICS;
pub use obs::{
    emit_run_failed, emit_run_finished, emit_run_started, emit_stage_finished,
    emit_stage_started, RunSpan,
};
pub use output::{
    LatexRenderer, OutputLog, OutputRecord, PlainRenderer, RenderStyle, Renderer, TensorKind,
};
pub use stage::Stage;
pub use telemetry::init_tracing;
