//! Error types for the algebra kernel.

/// Errors produced by symbolic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlgebraError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("{function} is undefined at {argument}")]
    Domain { function: String, argument: String },

    #[error("matrix of size {size} is singular")]
    SingularMatrix { size: usize },

    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("ragged rows: row {row} has {found} entries, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Result type for algebra operations.
pub type AlgebraResult<T> = std::result::Result<T, AlgebraError>;
