//! Dense LU factorization with partial pivoting
//!
//! Direct solver for the small dense systems that appear when projecting
//! boundary data onto a function space (mixed mass matrices). Iterative
//! methods are overkill there; a pivoted LU is exact and cheap at those
//! sizes.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors from LU factorization.
#[derive(Debug, Error)]
pub enum LuError {
    /// Matrix is singular to working precision
    #[error("matrix is singular at column {column} (pivot {pivot:.3e})")]
    Singular {
        /// Column at which elimination broke down
        column: usize,
        /// Magnitude of the rejected pivot
        pivot: f64,
    },
    /// Matrix is not square
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NotSquare {
        /// Row count of the offending matrix
        rows: usize,
        /// Column count of the offending matrix
        cols: usize,
    },
}

/// LU factorization of a dense matrix, P·A = L·U.
#[derive(Debug, Clone)]
pub struct DenseLu {
    lu: Array2<f64>,
    perm: Vec<usize>,
}

impl DenseLu {
    /// Factor a square matrix. Fails on singular input.
    pub fn factor(a: &Array2<f64>) -> Result<Self, LuError> {
        if a.nrows() != a.ncols() {
            return Err(LuError::NotSquare {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = a.nrows();
        let mut lu = a.clone();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // Partial pivoting: largest magnitude in column k
            let mut p = k;
            let mut max = lu[[k, k]].abs();
            for i in (k + 1)..n {
                if lu[[i, k]].abs() > max {
                    max = lu[[i, k]].abs();
                    p = i;
                }
            }
            if max < 1e-14 {
                return Err(LuError::Singular { column: k, pivot: max });
            }
            if p != k {
                for j in 0..n {
                    let tmp = lu[[k, j]];
                    lu[[k, j]] = lu[[p, j]];
                    lu[[p, j]] = tmp;
                }
                perm.swap(k, p);
            }

            let pivot = lu[[k, k]];
            for i in (k + 1)..n {
                let factor = lu[[i, k]] / pivot;
                lu[[i, k]] = factor;
                for j in (k + 1)..n {
                    lu[[i, j]] -= factor * lu[[k, j]];
                }
            }
        }

        Ok(Self { lu, perm })
    }

    /// Solve A x = b using the stored factorization.
    pub fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.lu.nrows();
        assert_eq!(b.len(), n, "right-hand side length mismatch");

        // Forward substitution with unit lower triangle, applying P
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let mut sum = b[self.perm[i]];
            for j in 0..i {
                sum -= self.lu[[i, j]] * y[j];
            }
            y[i] = sum;
        }

        // Back substitution
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum / self.lu[[i, i]];
        }
        x
    }
}

/// Convenience wrapper: factor and solve in one call.
pub fn lu_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
    Ok(DenseLu::factor(a)?.solve(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_solve_3x3() {
        let a = array![[2.0, 1.0, 1.0], [4.0, -6.0, 0.0], [-2.0, 7.0, 2.0]];
        let b = array![5.0, -2.0, 9.0];
        let x = lu_solve(&a, &b).unwrap();
        let r = a.dot(&x) - &b;
        for v in r.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_requires_pivoting() {
        // Zero on the first diagonal entry forces a row swap
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 3.0];
        let x = lu_solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 3.0);
        assert_relative_eq!(x[1], 2.0);
    }

    #[test]
    fn test_singular_reported() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            DenseLu::factor(&a),
            Err(LuError::Singular { column: 1, .. })
        ));
    }

    #[test]
    fn test_not_square() {
        let a = Array2::zeros((2, 3));
        assert!(matches!(
            DenseLu::factor(&a),
            Err(LuError::NotSquare { rows: 2, cols: 3 })
        ));
    }
}
