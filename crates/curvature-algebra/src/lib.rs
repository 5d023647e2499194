//! Curvature Algebra - exact symbolic kernel
//!
//! Provides the symbolic substrate the tensor pipeline is built on:
//! - Rational functions over exact rational coefficients
//! - `sin`, `cos`, `exp`, `log` and undefined applied functions
//! - Partial differentiation with respect to a symbol
//! - Canonical normalisation with exact zero testing
//! - Dense matrices with exact inversion
//! - Plain-text and LaTeX rendering

pub mod atom;
pub mod display;
pub mod error;
pub mod expr;
pub mod latex;
pub mod matrix;
pub mod monomial;
pub mod poly;
pub mod symbol;

pub use atom::{Applied, Atom, Func};
pub use error::{AlgebraError, AlgebraResult};
pub use expr::Expr;
pub use matrix::Matrix;
pub use monomial::Monomial;
pub use poly::Poly;
pub use symbol::Symbol;

/// Exact coefficient type used throughout the kernel.
pub type Rational = num_rational::BigRational;
