use ndarray::{s, Array1, Array2};
use thiserror::Error;

/// Intercept and per-feature coefficients of a least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsSolution {
    /// `beta[0]`.
    pub intercept: f64,
    /// `beta[1..]`, in design-matrix column order.
    pub coefficients: Vec<f64>,
}

/// Closed-form least squares via the normal equation
/// `beta = (X'^T X')^-1 X'^T y`, where `X'` is `X` with a leading bias column.
#[derive(Debug, Clone, Copy)]
pub struct NormalEquationSolver {
    pivot_epsilon: f64,
}

impl Default for NormalEquationSolver {
    fn default() -> Self {
        Self::new(1e-10)
    }
}

impl NormalEquationSolver {
    /// Solver rejecting pivots smaller than `pivot_epsilon` in magnitude.
    #[must_use]
    pub const fn new(pivot_epsilon: f64) -> Self {
        Self { pivot_epsilon }
    }

    /// Fits `y ~ X`.
    pub fn solve(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<OlsSolution, SolverError> {
        let (rows, cols) = x.dim();
        if rows != y.len() {
            return Err(SolverError::DimensionMismatch {
                rows,
                targets: y.len(),
            });
        }

        let mut design = Array2::<f64>::ones((rows, cols + 1));
        design.slice_mut(s![.., 1..]).assign(x);
        let gram = design.t().dot(&design);
        let moment = design.t().dot(y);

        let inverse = self.invert(&gram)?;
        let beta = inverse.dot(&moment);
        if beta.iter().any(|value| !value.is_finite()) {
            return Err(SolverError::NonFinite);
        }
        Ok(OlsSolution {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    /// Inverts a square matrix by Gauss-Jordan elimination with partial
    /// pivoting on the augmented matrix `[A | I]`.
    pub fn invert(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, SolverError> {
        let (size, cols) = matrix.dim();
        if size != cols {
            return Err(SolverError::NotSquare { rows: size, cols });
        }
        let width = 2 * size;
        let mut aug = Array2::<f64>::zeros((size, width));
        aug.slice_mut(s![.., ..size]).assign(matrix);
        for idx in 0..size {
            aug[[idx, size + idx]] = 1.0;
        }

        for col in 0..size {
            let mut pivot_row = col;
            let mut max_val = aug[[col, col]].abs();
            for row in (col + 1)..size {
                let candidate = aug[[row, col]].abs();
                if candidate > max_val {
                    max_val = candidate;
                    pivot_row = row;
                }
            }

            let pivot = aug[[pivot_row, col]];
            if !pivot.is_finite() || pivot.abs() < self.pivot_epsilon {
                return Err(SolverError::Singular { column: col, pivot });
            }

            if pivot_row != col {
                for j in 0..width {
                    aug.swap([col, j], [pivot_row, j]);
                }
            }

            for j in 0..width {
                aug[[col, j]] /= pivot;
            }

            for row in 0..size {
                if row == col {
                    continue;
                }
                let factor = aug[[row, col]];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..width {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }

        Ok(aug.slice(s![.., size..]).to_owned())
    }
}

/// Failures of the linear solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Pivot vanished: collinear features or too few distinct rows.
    #[error("matrix is singular or nearly singular (pivot {pivot:e} in column {column})")]
    Singular {
        /// Column being eliminated.
        column: usize,
        /// Largest remaining pivot candidate.
        pivot: f64,
    },
    /// Non-square input to `invert`.
    #[error("cannot invert a {rows}x{cols} matrix")]
    NotSquare {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },
    /// Design rows and target length differ.
    #[error("design matrix has {rows} rows but {targets} target values")]
    DimensionMismatch {
        /// Design rows.
        rows: usize,
        /// Target values.
        targets: usize,
    },
    /// Coefficients overflowed.
    #[error("solution contains non-finite coefficients")]
    NonFinite,
}
