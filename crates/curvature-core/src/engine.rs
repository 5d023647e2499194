//! Staged tensor-calculus engine.
//!
//! One operation per derived entity. Each takes the entities it depends on
//! and a [`StageContext`], which is consulted before every component so a
//! cancellation request is honoured within one component's worth of work.
//!
//! Simplification policy per stage:
//! - inverse metric: full simplification of every entry
//! - Christoffel symbols: normalisation only (hot path)
//! - Ricci tensor, divergence: full simplification per component
//! - scalar, Einstein, mixed Einstein: full simplification

use curvature_algebra::{AlgebraError, Expr, Matrix, Symbol};
use tracing::debug;

use crate::entities::DerivedEntities;
use crate::error::{CurvatureError, EngineError};
use crate::frame::{CoordinateFrame, ParameterSet};
use crate::index_algebra::{self, Rank1, Rank2, Rank3};
use crate::metrics::METRICS;
use crate::stage::Stage;

type EngineResult<T> = Result<T, EngineError>;

/// Cancellation probe plus per-component progress observer.
#[derive(Default)]
pub struct StageContext<'a> {
    cancel: Option<&'a dyn Fn() -> bool>,
    observer: Option<&'a mut dyn FnMut(Stage, usize, usize)>,
}

impl<'a> StageContext<'a> {
    /// A context that never cancels and reports nothing.
    pub fn unobserved() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, probe: &'a dyn Fn() -> bool) -> Self {
        self.cancel = Some(probe);
        self
    }

    /// `observer(stage, done, total)` runs after every finished component.
    pub fn with_observer(mut self, observer: &'a mut dyn FnMut(Stage, usize, usize)) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|probe| probe())
    }

    /// Fails with [`EngineError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self, stage: Stage) -> EngineResult<()> {
        if self.is_cancelled() {
            debug!(stage = %stage, "cancellation observed");
            return Err(EngineError::Cancelled { stage });
        }
        Ok(())
    }

    fn component_done(&mut self, stage: Stage, done: usize, total: usize) {
        METRICS.inc_components();
        if let Some(observer) = self.observer.as_deref_mut() {
            observer(stage, done, total);
        }
    }
}

fn computation(stage: Stage, indices: Vec<usize>) -> impl FnOnce(AlgebraError) -> EngineError {
    move |source| EngineError::Computation {
        stage,
        indices,
        source,
    }
}

/// Computes derived tensors for one coordinate frame.
#[derive(Debug, Clone)]
pub struct TensorEngine {
    frame: CoordinateFrame,
}

impl TensorEngine {
    pub fn new(frame: CoordinateFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    pub fn dim(&self) -> usize {
        self.frame.dim()
    }

    fn coords(&self) -> &[Symbol] {
        self.frame.symbols()
    }

    /// Rejects a metric whose shape is not `(n, n)`.
    pub fn check_shape(&self, g: &Matrix) -> Result<(), CurvatureError> {
        let n = self.dim();
        if g.shape() != (n, n) {
            return Err(CurvatureError::ShapeMismatch {
                rows: g.rows(),
                cols: g.cols(),
                expected: n,
            });
        }
        Ok(())
    }

    pub fn invert_metric(&self, g: &Matrix, ctx: &mut StageContext<'_>) -> EngineResult<Matrix> {
        let stage = Stage::Inverse;
        ctx.checkpoint(stage)?;
        let inverse = g.inverse().map_err(|err| match err {
            AlgebraError::SingularMatrix { size } => EngineError::DegenerateMetric { size },
            other => computation(stage, Vec::new())(other),
        })?;
        let n = self.dim();
        let total = n * n;
        let mut entries = Vec::with_capacity(total);
        for i in 0..n {
            for j in 0..n {
                ctx.checkpoint(stage)?;
                entries.push(inverse.get(i, j).simplify());
                ctx.component_done(stage, entries.len(), total);
            }
        }
        Ok(Matrix::from_fn(n, n, |i, j| entries[i * n + j].clone()))
    }

    pub fn christoffel(
        &self,
        g: &Matrix,
        g_inv: &Matrix,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Rank3<Expr>> {
        let stage = Stage::Christoffel;
        ctx.checkpoint(stage)?;
        let n = self.dim();
        let g_inv = Rank2::from_matrix(g_inv);
        let dg = index_algebra::metric_derivatives(&Rank2::from_matrix(g), self.coords())
            .map_err(computation(stage, Vec::new()))?;

        let total = n * n * n;
        let mut data = Vec::with_capacity(total);
        for rho in 0..n {
            for mu in 0..n {
                for nu in 0..n {
                    ctx.checkpoint(stage)?;
                    data.push(index_algebra::christoffel_component(&g_inv, &dg, rho, mu, nu));
                    ctx.component_done(stage, data.len(), total);
                }
            }
        }
        Ok(Rank3::from_vec(n, data))
    }

    pub fn ricci(&self, gamma: &Rank3<Expr>, ctx: &mut StageContext<'_>) -> EngineResult<Rank2<Expr>> {
        let stage = Stage::Ricci;
        ctx.checkpoint(stage)?;
        let n = self.dim();
        let total = n * n;
        let mut data = Vec::with_capacity(total);
        for mu in 0..n {
            for nu in 0..n {
                ctx.checkpoint(stage)?;
                let component = index_algebra::ricci_component(gamma, self.coords(), mu, nu)
                    .map_err(computation(stage, vec![mu, nu]))?;
                data.push(component.simplify());
                ctx.component_done(stage, data.len(), total);
            }
        }
        Ok(Rank2::from_vec(n, data))
    }

    pub fn ricci_scalar(
        &self,
        g_inv: &Matrix,
        ricci: &Rank2<Expr>,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Expr> {
        let stage = Stage::RicciScalar;
        ctx.checkpoint(stage)?;
        let scalar = index_algebra::ricci_scalar(&Rank2::from_matrix(g_inv), ricci).simplify();
        ctx.component_done(stage, 1, 1);
        Ok(scalar)
    }

    pub fn einstein(
        &self,
        ricci: &Rank2<Expr>,
        scalar: &Expr,
        g: &Matrix,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Rank2<Expr>> {
        let stage = Stage::Einstein;
        let g = Rank2::from_matrix(g);
        self.rank2_stage(stage, ctx, |mu, nu| {
            index_algebra::einstein_component(ricci, scalar, &g, mu, nu)
        })
    }

    pub fn mixed_einstein(
        &self,
        g_inv: &Matrix,
        einstein: &Rank2<Expr>,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Rank2<Expr>> {
        let stage = Stage::MixedEinstein;
        let g_inv = Rank2::from_matrix(g_inv);
        self.rank2_stage(stage, ctx, |mu, nu| {
            index_algebra::mixed_component(&g_inv, einstein, mu, nu)
        })
    }

    /// Covariant divergence with the mixed Einstein tensor in the `G` slots.
    pub fn divergence(
        &self,
        gamma: &Rank3<Expr>,
        mixed: &Rank2<Expr>,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Rank1<Expr>> {
        let stage = Stage::Divergence;
        ctx.checkpoint(stage)?;
        let n = self.dim();
        let mut data = Vec::with_capacity(n);
        for mu in 0..n {
            ctx.checkpoint(stage)?;
            let component = index_algebra::divergence_component(gamma, mixed, self.coords(), mu)
                .map_err(computation(stage, vec![mu]))?;
            data.push(component.simplify());
            ctx.component_done(stage, data.len(), n);
        }
        Ok(Rank1::from_vec(data))
    }

    fn rank2_stage(
        &self,
        stage: Stage,
        ctx: &mut StageContext<'_>,
        component: impl Fn(usize, usize) -> Expr,
    ) -> EngineResult<Rank2<Expr>> {
        ctx.checkpoint(stage)?;
        let n = self.dim();
        let total = n * n;
        let mut data = Vec::with_capacity(total);
        for mu in 0..n {
            for nu in 0..n {
                ctx.checkpoint(stage)?;
                data.push(component(mu, nu).simplify());
                ctx.component_done(stage, data.len(), total);
            }
        }
        Ok(Rank2::from_vec(n, data))
    }

    /// Runs every stage in dependency order without streaming.
    pub fn compute(
        &self,
        params: ParameterSet,
        metric: Matrix,
        ctx: &mut StageContext<'_>,
    ) -> Result<DerivedEntities, CurvatureError> {
        self.check_shape(&metric)?;
        self.compute_with(params, metric, ctx)
    }

    /// Runs every stage in dependency order, letting `driver` wrap each
    /// stage and observe each finished entity. The metric shape must
    /// already have been checked.
    pub fn compute_with(
        &self,
        params: ParameterSet,
        metric: Matrix,
        driver: &mut impl StageDriver,
    ) -> Result<DerivedEntities, CurvatureError> {
        let inverse_metric =
            driver.run_stage(self, Stage::Inverse, |e, ctx| e.invert_metric(&metric, ctx))?;
        driver.finished(StageOutput::InverseMetric(&inverse_metric));

        let christoffel = driver.run_stage(self, Stage::Christoffel, |e, ctx| {
            e.christoffel(&metric, &inverse_metric, ctx)
        })?;
        driver.finished(StageOutput::Christoffel(&christoffel));

        let ricci = driver.run_stage(self, Stage::Ricci, |e, ctx| e.ricci(&christoffel, ctx))?;
        driver.finished(StageOutput::Ricci(&ricci));

        let ricci_scalar = driver.run_stage(self, Stage::RicciScalar, |e, ctx| {
            e.ricci_scalar(&inverse_metric, &ricci, ctx)
        })?;
        driver.finished(StageOutput::RicciScalar(&ricci_scalar));

        let einstein = driver.run_stage(self, Stage::Einstein, |e, ctx| {
            e.einstein(&ricci, &ricci_scalar, &metric, ctx)
        })?;
        driver.finished(StageOutput::Einstein(&einstein));

        let mixed_einstein = driver.run_stage(self, Stage::MixedEinstein, |e, ctx| {
            e.mixed_einstein(&inverse_metric, &einstein, ctx)
        })?;
        driver.finished(StageOutput::MixedEinstein(&mixed_einstein));

        let divergence = driver.run_stage(self, Stage::Divergence, |e, ctx| {
            e.divergence(&christoffel, &mixed_einstein, ctx)
        })?;
        driver.finished(StageOutput::Divergence(&divergence));

        Ok(DerivedEntities {
            frame: self.frame.clone(),
            params,
            metric,
            inverse_metric,
            christoffel,
            ricci,
            ricci_scalar,
            einstein,
            mixed_einstein,
            divergence,
        })
    }
}

/// An entity handed to [`StageDriver::finished`] right after its stage.
#[derive(Debug, Clone, Copy)]
pub enum StageOutput<'a> {
    InverseMetric(&'a Matrix),
    Christoffel(&'a Rank3<Expr>),
    Ricci(&'a Rank2<Expr>),
    RicciScalar(&'a Expr),
    Einstein(&'a Rank2<Expr>),
    MixedEinstein(&'a Rank2<Expr>),
    Divergence(&'a Rank1<Expr>),
}

/// Hooks around the stages of [`TensorEngine::compute_with`].
pub trait StageDriver {
    /// Runs `body` for `stage` with a context supplied by the driver.
    fn run_stage<T>(
        &mut self,
        engine: &TensorEngine,
        stage: Stage,
        body: impl FnOnce(&TensorEngine, &mut StageContext<'_>) -> Result<T, EngineError>,
    ) -> Result<T, CurvatureError>;

    fn finished(&mut self, _output: StageOutput<'_>) {}
}

/// A bare context drives every stage with itself.
impl StageDriver for StageContext<'_> {
    fn run_stage<T>(
        &mut self,
        engine: &TensorEngine,
        _stage: Stage,
        body: impl FnOnce(&TensorEngine, &mut StageContext<'_>) -> Result<T, EngineError>,
    ) -> Result<T, CurvatureError> {
        body(engine, self).map_err(CurvatureError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn engine(coords: &str) -> TensorEngine {
        TensorEngine::new(CoordinateFrame::parse(coords).unwrap())
    }

    #[test]
    fn test_shape_mismatch() {
        let err = engine("x, y, z").check_shape(&Matrix::identity(2)).unwrap_err();
        assert_eq!(
            err,
            CurvatureError::ShapeMismatch {
                rows: 2,
                cols: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn test_degenerate_metric() {
        let e = engine("x, y");
        let g = Matrix::diag(vec![Expr::one(), Expr::zero()]);
        let err = e
            .invert_metric(&g, &mut StageContext::unobserved())
            .unwrap_err();
        assert_eq!(err, EngineError::DegenerateMetric { size: 2 });
    }

    #[test]
    fn test_one_dimensional_metric_is_flat() {
        let e = engine("x");
        let x = Expr::symbol(&Symbol::new("x"));
        let g = Matrix::diag(vec![x.mul(&x).add(&Expr::one())]);
        let out = e
            .compute(ParameterSet::empty(), g, &mut StageContext::unobserved())
            .unwrap();
        assert_eq!(out.christoffel.dim(), 1);
        assert!(!out.christoffel.get(0, 0, 0).is_zero());
        assert!(out.ricci.get(0, 0).is_zero());
        assert!(out.ricci_scalar.is_zero());
        assert!(out.divergence.get(0).is_zero());
    }

    #[test]
    fn test_cancellation_is_checked_per_component() {
        let e = engine("x, y");
        let g = Matrix::identity(2);
        let cancelled = Cell::new(false);
        let christoffel_done = Cell::new(0);
        let probe = || cancelled.get();
        let mut observer = |stage: Stage, done: usize, _total: usize| {
            if stage == Stage::Christoffel {
                christoffel_done.set(done);
                if done == 2 {
                    cancelled.set(true);
                }
            }
        };
        let mut ctx = StageContext::unobserved()
            .with_cancel(&probe)
            .with_observer(&mut observer);
        let inverse = e.invert_metric(&g, &mut ctx).unwrap();
        let err = e.christoffel(&g, &inverse, &mut ctx).unwrap_err();
        drop(ctx);
        assert_eq!(
            err,
            EngineError::Cancelled {
                stage: Stage::Christoffel
            }
        );
        assert_eq!(christoffel_done.get(), 2);
    }

    #[test]
    fn test_observer_sees_every_component() {
        let e = engine("x, y");
        let g = Matrix::identity(2);
        let mut seen = Vec::new();
        let mut observer = |stage: Stage, done: usize, total: usize| seen.push((stage, done, total));
        let mut ctx = StageContext::unobserved().with_observer(&mut observer);
        let inverse = e.invert_metric(&g, &mut ctx).unwrap();
        e.christoffel(&g, &inverse, &mut ctx).unwrap();
        drop(ctx);
        assert_eq!(seen.len(), 4 + 8);
        assert_eq!(seen[11], (Stage::Christoffel, 8, 8));
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<Stage>,
        finished: Vec<&'static str>,
    }

    impl StageDriver for Recorder {
        fn run_stage<T>(
            &mut self,
            engine: &TensorEngine,
            stage: Stage,
            body: impl FnOnce(&TensorEngine, &mut StageContext<'_>) -> Result<T, EngineError>,
        ) -> Result<T, CurvatureError> {
            self.started.push(stage);
            Ok(body(engine, &mut StageContext::unobserved())?)
        }

        fn finished(&mut self, output: StageOutput<'_>) {
            self.finished.push(match output {
                StageOutput::InverseMetric(_) => "inverse",
                StageOutput::Christoffel(_) => "christoffel",
                StageOutput::Ricci(_) => "ricci",
                StageOutput::RicciScalar(_) => "scalar",
                StageOutput::Einstein(_) => "einstein",
                StageOutput::MixedEinstein(_) => "mixed",
                StageOutput::Divergence(_) => "divergence",
            });
        }
    }

    #[test]
    fn test_driver_sees_stages_in_dependency_order() {
        let e = engine("x, y");
        let mut recorder = Recorder::default();
        let out = e
            .compute_with(ParameterSet::empty(), Matrix::identity(2), &mut recorder)
            .unwrap();
        assert_eq!(
            recorder.started,
            vec![
                Stage::Inverse,
                Stage::Christoffel,
                Stage::Ricci,
                Stage::RicciScalar,
                Stage::Einstein,
                Stage::MixedEinstein,
                Stage::Divergence,
            ]
        );
        assert_eq!(
            recorder.finished,
            vec!["inverse", "christoffel", "ricci", "scalar", "einstein", "mixed", "divergence"]
        );
        let direct = e
            .compute(ParameterSet::empty(), Matrix::identity(2), &mut StageContext::unobserved())
            .unwrap();
        assert_eq!(out, direct);
    }
}
