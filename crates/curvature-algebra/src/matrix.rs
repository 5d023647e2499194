//! Dense matrices of symbolic expressions.

use crate::error::{AlgebraError, AlgebraResult};
use crate::expr::Expr;

/// Row-major `rows x cols` matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Expr::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = Expr::one();
        }
        m
    }

    pub fn diag(entries: Vec<Expr>) -> Self {
        let n = entries.len();
        let mut m = Self::zeros(n, n);
        for (i, e) in entries.into_iter().enumerate() {
            m.data[i * n + i] = e;
        }
        m
    }

    /// Builds a matrix from rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> AlgebraResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != cols {
                return Err(AlgebraError::RaggedRows {
                    row,
                    expected: cols,
                    found: entries.len(),
                });
            }
            data.extend(entries);
        }
        Ok(Self {
            rows: n_rows,
            cols,
            data,
        })
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Expr) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> &Expr {
        &self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: Expr) {
        self.data[i * self.cols + j] = value;
    }

    pub fn entries(&self) -> &[Expr] {
        &self.data
    }

    pub fn map(&self, f: impl Fn(&Expr) -> Expr) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.cols, self.rows, |i, j| self.get(j, i).clone())
    }

    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        (0..self.rows).all(|i| (i + 1..self.cols).all(|j| self.get(i, j).equivalent(self.get(j, i))))
    }

    pub fn mul(&self, other: &Matrix) -> AlgebraResult<Matrix> {
        if self.cols != other.rows {
            return Err(AlgebraError::DimensionMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Matrix::from_fn(self.rows, other.cols, |i, j| {
            (0..self.cols).fold(Expr::zero(), |acc, k| {
                acc.add(&self.get(i, k).mul(other.get(k, j)))
            })
        }))
    }

    /// Exact inverse by Gauss-Jordan elimination.
    ///
    /// Pivots are chosen as the first entry that normalises to non-zero, so
    /// singularity detection is exact for the supported function class.
    pub fn inverse(&self) -> AlgebraResult<Matrix> {
        if !self.is_square() {
            return Err(AlgebraError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut left: Vec<Vec<Expr>> = (0..n)
            .map(|i| (0..n).map(|j| self.get(i, j).clone()).collect())
            .collect();
        let mut right: Vec<Vec<Expr>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { Expr::one() } else { Expr::zero() })
                    .collect()
            })
            .collect();

        for col in 0..n {
            let pivot_row = (col..n)
                .find(|&r| !left[r][col].is_zero())
                .ok_or(AlgebraError::SingularMatrix { size: n })?;
            left.swap(col, pivot_row);
            right.swap(col, pivot_row);

            let pivot_inv = left[col][col].inv()?;
            for j in 0..n {
                left[col][j] = left[col][j].mul(&pivot_inv);
                right[col][j] = right[col][j].mul(&pivot_inv);
            }

            for row in 0..n {
                if row == col || left[row][col].is_zero() {
                    continue;
                }
                let factor = left[row][col].clone();
                for j in 0..n {
                    let l = left[row][j].sub(&factor.mul(&left[col][j]));
                    let r = right[row][j].sub(&factor.mul(&right[col][j]));
                    left[row][j] = l;
                    right[row][j] = r;
                }
            }
        }

        Matrix::from_rows(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    fn var(name: &str) -> Expr {
        Expr::symbol(&Symbol::new(name))
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![Expr::one()], vec![Expr::one(), Expr::zero()]]);
        assert!(matches!(err, Err(AlgebraError::RaggedRows { row: 1, .. })));
    }

    #[test]
    fn test_inverse_of_general_2x2() {
        let m = Matrix::from_rows(vec![
            vec![var("a"), var("b")],
            vec![var("c"), var("d")],
        ])
        .unwrap();
        let inv = m.inverse().expect("invertible");
        let product = m.mul(&inv).unwrap();
        let identity = Matrix::identity(2);
        for i in 0..2 {
            for j in 0..2 {
                assert!(product.get(i, j).equivalent(identity.get(i, j)));
            }
        }
    }

    #[test]
    fn test_singular_matrix() {
        let x = var("x");
        let m = Matrix::from_rows(vec![
            vec![x.clone(), x.scale(&crate::Rational::from_integer(2.into()))],
            vec![Expr::one(), Expr::integer(2)],
        ])
        .unwrap();
        assert_eq!(m.inverse(), Err(AlgebraError::SingularMatrix { size: 2 }));
    }

    #[test]
    fn test_non_square_inverse() {
        assert!(matches!(
            Matrix::zeros(2, 3).inverse(),
            Err(AlgebraError::NotSquare { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn test_symmetry_check() {
        let m = Matrix::from_rows(vec![
            vec![Expr::one(), var("a")],
            vec![var("a"), Expr::zero()],
        ])
        .unwrap();
        assert!(m.is_symmetric());
        assert!(m.transpose().is_symmetric());
        assert!(!Matrix::zeros(2, 3).is_symmetric());
    }
}
