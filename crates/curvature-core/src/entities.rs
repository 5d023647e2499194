//! The derived objects of one completed run.

use curvature_algebra::{Expr, Matrix};

use crate::frame::{CoordinateFrame, ParameterSet};
use crate::index_algebra::{Rank1, Rank2, Rank3};

/// Everything a run derives from its metric, in dependency order.
///
/// Only built once every stage has finished; partial results of a
/// cancelled or failed run are never assembled into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedEntities {
    pub frame: CoordinateFrame,
    pub params: ParameterSet,
    pub metric: Matrix,
    pub inverse_metric: Matrix,
    pub christoffel: Rank3<Expr>,
    pub ricci: Rank2<Expr>,
    pub ricci_scalar: Expr,
    pub einstein: Rank2<Expr>,
    pub mixed_einstein: Rank2<Expr>,
    pub divergence: Rank1<Expr>,
}

impl DerivedEntities {
    pub fn dim(&self) -> usize {
        self.frame.dim()
    }
}
