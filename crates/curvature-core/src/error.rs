//! Error taxonomy for a curvature run.

use std::fmt;

use curvature_algebra::AlgebraError;
use serde::{Deserialize, Serialize};

use crate::metric_source::MetricDefinitionError;
use crate::stage::Stage;

/// Malformed coordinate or parameter declarations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("at least one coordinate must be declared")]
    NoCoordinates,

    #[error("empty {role} name in list")]
    EmptyName { role: &'static str },

    #[error("invalid {role} name: {name:?}")]
    InvalidName { role: &'static str, name: String },

    #[error("{name} is a reserved name")]
    ReservedName { name: String },

    #[error("duplicate {role} name: {name}")]
    Duplicate { role: &'static str, name: String },

    #[error("parameter {name} is already declared as a coordinate")]
    Collision { name: String },
}

/// Faults raised inside an engine stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("{size}x{size} metric is not invertible")]
    DegenerateMetric { size: usize },

    #[error("{stage} component {indices:?}: {source}")]
    Computation {
        stage: Stage,
        indices: Vec<usize>,
        #[source]
        source: AlgebraError,
    },
}

/// Every way a run can end other than successfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurvatureError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    MetricDefinition(#[from] MetricDefinitionError),

    #[error("metric has shape {rows}x{cols}, expected {expected}x{expected}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("{size}x{size} metric is not invertible")]
    DegenerateMetric { size: usize },

    #[error("cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("{stage} component {indices:?}: {source}")]
    InternalComputation {
        stage: Stage,
        indices: Vec<usize>,
        #[source]
        source: AlgebraError,
    },
}

impl From<EngineError> for CurvatureError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled { stage } => CurvatureError::Cancelled { stage },
            EngineError::DegenerateMetric { size } => CurvatureError::DegenerateMetric { size },
            EngineError::Computation {
                stage,
                indices,
                source,
            } => CurvatureError::InternalComputation {
                stage,
                indices,
                source,
            },
        }
    }
}

impl CurvatureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CurvatureError::Input(_) => ErrorKind::Input,
            CurvatureError::MetricDefinition(_) => ErrorKind::MetricDefinition,
            CurvatureError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            CurvatureError::DegenerateMetric { .. } => ErrorKind::DegenerateMetric,
            CurvatureError::Cancelled { .. } => ErrorKind::Cancelled,
            CurvatureError::InternalComputation { .. } => ErrorKind::InternalComputation,
        }
    }

    /// Stage the fault was raised in, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CurvatureError::Input(_) => Some(Stage::Input),
            CurvatureError::MetricDefinition(_) | CurvatureError::ShapeMismatch { .. } => {
                Some(Stage::Metric)
            }
            CurvatureError::DegenerateMetric { .. } => Some(Stage::Inverse),
            CurvatureError::Cancelled { stage } => Some(*stage),
            CurvatureError::InternalComputation { stage, .. } => Some(*stage),
        }
    }

    pub fn indices(&self) -> Option<&[usize]> {
        match self {
            CurvatureError::InternalComputation { indices, .. } => Some(indices),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CurvatureError::Cancelled { .. })
    }
}

/// Serializable classification of a [`CurvatureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    MetricDefinition,
    ShapeMismatch,
    DegenerateMetric,
    Cancelled,
    InternalComputation,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Input => "input error",
            ErrorKind::MetricDefinition => "metric definition error",
            ErrorKind::ShapeMismatch => "shape mismatch",
            ErrorKind::DegenerateMetric => "degenerate metric",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InternalComputation => "internal computation error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result type for curvature operations.
pub type Result<T> = std::result::Result<T, CurvatureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::Duplicate {
            role: "coordinate",
            name: "t".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate coordinate name: t");
    }

    #[test]
    fn test_engine_error_converts_with_stage_and_indices() {
        let err: CurvatureError = EngineError::Computation {
            stage: Stage::Ricci,
            indices: vec![1, 2],
            source: AlgebraError::DivisionByZero,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InternalComputation);
        assert_eq!(err.stage(), Some(Stage::Ricci));
        assert_eq!(err.indices(), Some(&[1, 2][..]));
        assert_eq!(err.to_string(), "ricci component [1, 2]: division by zero");
    }

    #[test]
    fn test_cancellation_is_classified_separately() {
        let err: CurvatureError = EngineError::Cancelled {
            stage: Stage::Christoffel,
        }
        .into();
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_error_kind_serde() {
        let json = serde_json::to_string(&ErrorKind::ShapeMismatch).unwrap();
        assert_eq!(json, "\"shape_mismatch\"");
        assert_eq!(ErrorKind::DegenerateMetric.to_string(), "degenerate metric");
    }
}
