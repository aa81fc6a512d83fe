//! GMRES (Generalized Minimal Residual) solver
//!
//! Restarted GMRES after Saad & Schultz (1986), specialized to real
//! arithmetic. The discretized boundary integral systems are dense,
//! non-symmetric, and indefinite, which rules out CG; GMRES minimizes the
//! residual over a Krylov subspace and converges monotonically.
//!
//! Non-convergence is not an error: the best available iterate is returned
//! together with `converged = false`, and the caller decides disposition.

use crate::traits::{LinearOperator, Preconditioner};
use ndarray::{Array1, Array2};

/// GMRES solver configuration.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Maximum number of outer iterations (restart cycles)
    pub max_iterations: usize,
    /// Restart parameter (Krylov subspace dimension per cycle)
    pub restart: usize,
    /// Relative tolerance for convergence
    pub tolerance: f64,
    /// Log progress every N inner iterations (0 = silent)
    pub print_interval: usize,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            restart: 150,
            tolerance: 1e-6,
            print_interval: 0,
        }
    }
}

/// GMRES solver result.
#[derive(Debug)]
pub struct GmresSolution {
    /// Solution vector (best available iterate)
    pub x: Array1<f64>,
    /// Total number of matrix-vector products
    pub iterations: usize,
    /// Number of restarts performed
    pub restarts: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether convergence was achieved
    pub converged: bool,
}

/// Solve A x = b using restarted GMRES.
pub fn gmres<A: LinearOperator>(operator: &A, b: &Array1<f64>, config: &GmresConfig) -> GmresSolution {
    gmres_preconditioned(operator, &crate::preconditioners::IdentityPreconditioner, b, config)
}

/// Solve A x = b using left-preconditioned restarted GMRES: M⁻¹A x = M⁻¹b.
pub fn gmres_preconditioned<A, P>(
    operator: &A,
    precond: &P,
    b: &Array1<f64>,
    config: &GmresConfig,
) -> GmresSolution
where
    A: LinearOperator,
    P: Preconditioner,
{
    let n = b.len();
    assert_eq!(operator.num_rows(), n, "operator/rhs dimension mismatch");
    assert!(operator.is_square(), "GMRES requires a square operator");
    let m = config.restart.max(1);

    let mut x: Array1<f64> = Array1::zeros(n);

    let pb = precond.apply(b);
    let b_norm = norm(&pb);
    if b_norm < 1e-15 {
        return GmresSolution {
            x,
            iterations: 0,
            restarts: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut total_iterations = 0;
    let mut restarts = 0;

    for _outer in 0..config.max_iterations {
        // Preconditioned residual r = M⁻¹(b - Ax)
        let ax = operator.apply(&x);
        let r = precond.apply(&(b - &ax));
        let beta = norm(&r);

        let rel_residual = beta / b_norm;
        if rel_residual < config.tolerance {
            return GmresSolution {
                x,
                iterations: total_iterations,
                restarts,
                residual: rel_residual,
                converged: true,
            };
        }

        // Krylov basis
        let mut v: Vec<Array1<f64>> = Vec::with_capacity(m + 1);
        v.push(&r / beta);

        // Upper Hessenberg matrix and Givens rotation state
        let mut h: Array2<f64> = Array2::zeros((m + 1, m));
        let mut cs: Vec<f64> = Vec::with_capacity(m);
        let mut sn: Vec<f64> = Vec::with_capacity(m);
        let mut g: Array1<f64> = Array1::zeros(m + 1);
        g[0] = beta;

        let mut breakdown = false;

        // Arnoldi process with modified Gram-Schmidt
        for j in 0..m {
            total_iterations += 1;

            let av = operator.apply(&v[j]);
            let mut w = precond.apply(&av);

            for i in 0..=j {
                let h_ij = v[i].dot(&w);
                h[[i, j]] = h_ij;
                w = &w - &(&v[i] * h_ij);
            }

            let w_norm = norm(&w);
            h[[j + 1, j]] = w_norm;
            if w_norm < 1e-14 {
                // Happy breakdown: exact solution lies in the current subspace
                breakdown = true;
            } else {
                v.push(&w / w_norm);
            }

            // Apply accumulated Givens rotations to the new column
            for i in 0..j {
                let tmp = cs[i] * h[[i, j]] + sn[i] * h[[i + 1, j]];
                h[[i + 1, j]] = -sn[i] * h[[i, j]] + cs[i] * h[[i + 1, j]];
                h[[i, j]] = tmp;
            }

            let (c, s) = givens_rotation(h[[j, j]], h[[j + 1, j]]);
            cs.push(c);
            sn.push(s);
            h[[j, j]] = c * h[[j, j]] + s * h[[j + 1, j]];
            h[[j + 1, j]] = 0.0;

            let tmp = c * g[j] + s * g[j + 1];
            g[j + 1] = -s * g[j] + c * g[j + 1];
            g[j] = tmp;

            let rel_residual = g[j + 1].abs() / b_norm;

            if config.print_interval > 0 && total_iterations % config.print_interval == 0 {
                log::info!(
                    "GMRES iteration {} (restart {}): relative residual = {:.6e}",
                    total_iterations,
                    restarts,
                    rel_residual
                );
            }

            if rel_residual < config.tolerance || breakdown {
                let y = solve_upper_triangular(&h, &g, j + 1);
                for (i, &yi) in y.iter().enumerate() {
                    x = &x + &(&v[i] * yi);
                }
                // A singular operator also breaks the Arnoldi recurrence:
                // the subspace saturates with the residual still large, and
                // the Givens estimate is stale. Recompute from the iterate
                // and let the tolerance decide the status.
                let rel_residual = if breakdown {
                    let ax = operator.apply(&x);
                    norm(&precond.apply(&(b - &ax))) / b_norm
                } else {
                    rel_residual
                };
                return GmresSolution {
                    x,
                    iterations: total_iterations,
                    restarts,
                    residual: rel_residual,
                    converged: rel_residual < config.tolerance,
                };
            }
        }

        // Restart: fold the current correction into x
        let y = solve_upper_triangular(&h, &g, m);
        for (i, &yi) in y.iter().enumerate() {
            x = &x + &(&v[i] * yi);
        }
        restarts += 1;
    }

    // Iteration budget exhausted; report the best iterate
    let ax = operator.apply(&x);
    let r = precond.apply(&(b - &ax));
    let rel_residual = norm(&r) / b_norm;

    GmresSolution {
        x,
        iterations: total_iterations,
        restarts,
        residual: rel_residual,
        converged: false,
    }
}

#[inline]
fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Compute Givens rotation coefficients (c, s) eliminating b against a.
#[inline]
fn givens_rotation(a: f64, b: f64) -> (f64, f64) {
    if b.abs() < 1e-300 {
        return (1.0, 0.0);
    }
    let r = a.hypot(b);
    (a / r, b / r)
}

/// Solve the leading k×k upper triangular system H y = g.
fn solve_upper_triangular(h: &Array2<f64>, g: &Array1<f64>, k: usize) -> Vec<f64> {
    let mut y = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[[i, j]] * y[j];
        }
        if h[[i, i]].abs() > 1e-300 {
            y[i] = sum / h[[i, i]];
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioners::JacobiPreconditioner;
    use crate::sparse::CsrMatrix;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_gmres_simple() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let config = GmresConfig {
            tolerance: 1e-10,
            ..Default::default()
        };

        let solution = gmres(&a, &b, &config);
        assert!(solution.converged, "GMRES should converge");

        let ax = a.dot(&solution.x);
        let err = norm(&(&ax - &b));
        assert_relative_eq!(err, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_gmres_identity_converges_immediately() {
        let id = CsrMatrix::identity(5);
        let b = Array1::from_iter((1..=5).map(|i| i as f64));
        let solution = gmres(&id, &b, &GmresConfig::default());

        assert!(solution.converged);
        assert!(solution.iterations <= 2);
        assert_relative_eq!(norm(&(&solution.x - &b)), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_gmres_nonsymmetric() {
        let a = array![[2.0, -1.0, 0.0], [1.0, 3.0, -1.0], [0.0, 1.0, 4.0]];
        let b = array![1.0, 0.0, 2.0];
        let solution = gmres(&a, &b, &GmresConfig::default());

        assert!(solution.converged);
        let err = norm(&(&a.dot(&solution.x) - &b));
        assert!(err < 1e-6);
    }

    #[test]
    fn test_gmres_preconditioned() {
        // Badly scaled diagonal: Jacobi fixes conditioning
        let a = array![[1000.0, 1.0], [1.0, 2.0]];
        let b = array![1.0, 1.0];
        let precond = JacobiPreconditioner::from_dense(&a);
        let solution = gmres_preconditioned(&a, &precond, &b, &GmresConfig::default());

        assert!(solution.converged);
        let err = norm(&(&a.dot(&solution.x) - &b));
        assert!(err < 1e-6);
    }

    #[test]
    fn test_gmres_singular_system_reports_not_converged() {
        // Rank-deficient matrix with b outside its range: the Arnoldi
        // recurrence breaks down, and the status must not claim convergence.
        let a = array![[1000.0, 1.0], [1.0, 0.001]];
        let b = array![1.0, 1.0];
        let precond = JacobiPreconditioner::from_dense(&a);
        let solution = gmres_preconditioned(&a, &precond, &b, &GmresConfig::default());

        assert!(!solution.converged);
        assert!(solution.residual >= GmresConfig::default().tolerance);
    }

    #[test]
    fn test_gmres_budget_exhaustion_reports_best_iterate() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let config = GmresConfig {
            max_iterations: 1,
            restart: 1,
            tolerance: 1e-16,
            print_interval: 0,
        };

        let solution = gmres(&a, &b, &config);
        assert!(!solution.converged);
        assert_eq!(solution.x.len(), 2);
        assert!(solution.residual.is_finite());
    }
}
