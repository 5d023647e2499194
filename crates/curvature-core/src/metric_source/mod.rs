//! Sandboxed metric-definition language.
//!
//! A source is a sequence of bindings evaluated top to bottom:
//!
//! ```text
//! # Schwarzschild
//! f = 1 - 2*M/r
//! metric = diag(-f, 1/f, r^2, r^2*sin(theta)^2)
//! ```
//!
//! Only whitelisted functions (`sin cos tan exp log ln diff diag matrix`)
//! and functions declared with `func name(args)` can be called. Identifiers
//! resolve to earlier bindings, then coordinates, then parameters, then
//! `pi`. The binding named `metric` is the result; everything else is a
//! local helper.

mod eval;
mod lexer;
mod parser;
mod presets;

use curvature_algebra::{AlgebraError, Matrix};

use crate::frame::{CoordinateFrame, ParameterSet};

pub use eval::evaluate;
pub use presets::MetricPreset;

/// Name of the binding that holds the resulting matrix.
pub const RESULT_BINDING: &str = "metric";

/// Position-tagged syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Why a metric source failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricSourceError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("line {line}: unknown identifier {name}")]
    UnknownIdentifier { name: String, line: usize },

    #[error("line {line}: unknown function {name}")]
    UnknownFunction { name: String, line: usize },

    #[error("line {line}: {function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
        line: usize,
    },

    #[error("line {line}: {message}")]
    TypeMismatch { message: String, line: usize },

    #[error("line {line}: exponents must be integer constants of magnitude at most {max}")]
    UnsupportedPower { line: usize, max: i64 },

    #[error("invalid number literal {text:?}")]
    InvalidNumber { text: String },

    #[error("no `metric` binding found")]
    MissingResult,

    #[error("`metric` must be a matrix, found a {found}")]
    NotAMatrix { found: &'static str },

    #[error("matrix row {row} has {found} entries, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {name} is reserved and cannot be rebound")]
    ReservedName { name: String, line: usize },

    #[error("line {line}: {source}")]
    Algebra {
        line: usize,
        #[source]
        source: AlgebraError,
    },
}

/// A metric source that failed to resolve, with the offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid metric definition: {cause}")]
pub struct MetricDefinitionError {
    pub source_text: String,
    #[source]
    pub cause: MetricSourceError,
}

/// Resolves a metric source into a matrix of expressions.
///
/// The caller validates the shape against the coordinate frame.
pub trait MetricLoader: Send + Sync {
    fn load(
        &self,
        frame: &CoordinateFrame,
        params: &ParameterSet,
        source: &str,
    ) -> Result<Matrix, MetricDefinitionError>;
}

/// Loader backed by the built-in evaluator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceMetricLoader;

impl MetricLoader for SourceMetricLoader {
    fn load(
        &self,
        frame: &CoordinateFrame,
        params: &ParameterSet,
        source: &str,
    ) -> Result<Matrix, MetricDefinitionError> {
        evaluate(frame, params, source).map_err(|cause| MetricDefinitionError {
            source_text: source.to_string(),
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_keeps_source_text() {
        let frame = CoordinateFrame::parse("x").unwrap();
        let err = SourceMetricLoader
            .load(&frame, &ParameterSet::empty(), "g = [[1]]")
            .unwrap_err();
        assert_eq!(err.source_text, "g = [[1]]");
        assert_eq!(err.cause, MetricSourceError::MissingResult);
        assert_eq!(
            err.to_string(),
            "invalid metric definition: no `metric` binding found"
        );
    }
}
