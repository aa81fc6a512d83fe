//! Preconditioners for iterative solvers
//!
//! The boundary element block systems are solved unpreconditioned by
//! default; Jacobi scaling is available as a cheap option when the dense
//! diagonal is accessible.

use crate::traits::Preconditioner;
use ndarray::{Array1, Array2};

/// Identity preconditioner (no preconditioning).
#[derive(Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        r.clone()
    }
}

/// Jacobi (diagonal scaling) preconditioner: M = diag(A)⁻¹.
#[derive(Clone, Debug)]
pub struct JacobiPreconditioner {
    inv_diag: Array1<f64>,
}

impl JacobiPreconditioner {
    /// Build from a dense matrix. Zero diagonal entries are left unscaled.
    pub fn from_dense(a: &Array2<f64>) -> Self {
        let n = a.nrows().min(a.ncols());
        let mut inv_diag = Array1::ones(n);
        for i in 0..n {
            let d = a[[i, i]];
            if d.abs() > 1e-14 {
                inv_diag[i] = 1.0 / d;
            }
        }
        Self { inv_diag }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        assert_eq!(r.len(), self.inv_diag.len(), "dimension mismatch");
        r * &self.inv_diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_jacobi_scales_by_diagonal() {
        let a = array![[2.0, 1.0], [1.0, 4.0]];
        let m = JacobiPreconditioner::from_dense(&a);
        let y = m.apply(&array![2.0, 4.0]);
        assert_relative_eq!(y[0], 1.0);
        assert_relative_eq!(y[1], 1.0);
    }

    #[test]
    fn test_identity_passthrough() {
        let m = IdentityPreconditioner;
        let r = array![1.0, -2.0];
        assert_eq!(m.apply(&r), r);
    }
}
