//! Stage-to-percentage mapping.

use curvature_core::Stage;

/// Percentage band `[start, end]` covered by a stage.
pub fn band(stage: Stage) -> (u8, u8) {
    match stage {
        Stage::Input => (0, 1),
        Stage::Metric => (1, 5),
        Stage::Inverse => (5, 20),
        Stage::Christoffel => (30, 45),
        Stage::Ricci => (45, 60),
        Stage::RicciScalar => (60, 70),
        Stage::Einstein => (70, 80),
        Stage::MixedEinstein => (80, 90),
        Stage::Divergence => (90, 100),
    }
}

/// Percentage after `done` of `total` components of `stage`.
pub fn percent(stage: Stage, done: usize, total: usize) -> u8 {
    let (start, end) = band(stage);
    if total == 0 {
        return end;
    }
    let span = usize::from(end - start);
    let offset = span * done.min(total) / total;
    start + offset as u8
}
