//! Core traits for linear algebra operations
//!
//! Defines the two seams the solver routines are written against:
//! [`LinearOperator`] for anything that can perform matrix-vector products
//! and [`Preconditioner`] for approximate inverses.

use ndarray::{Array1, Array2};

/// Trait for linear operators (matrices) that can perform matrix-vector
/// products.
///
/// This abstraction lets the iterative solvers work with dense matrices,
/// sparse matrices, and composite block matrices interchangeably.
pub trait LinearOperator: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

impl LinearOperator for Array2<f64> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.dot(x)
    }
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner M approximates A⁻¹ so that M·A is better conditioned
/// than A alone.
pub trait Preconditioner: Send + Sync {
    /// Apply the preconditioner: y = M * r
    fn apply(&self, r: &Array1<f64>) -> Array1<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_dense_operator() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(a.num_rows(), 2);
        assert!(a.is_square());

        let y = LinearOperator::apply(&a, &array![1.0, 1.0]);
        assert_relative_eq!(y[0], 3.0);
        assert_relative_eq!(y[1], 7.0);
    }
}
