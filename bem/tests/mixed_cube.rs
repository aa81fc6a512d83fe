//! End-to-end mixed boundary value problem on the unit cube.

use approx::assert_relative_eq;
use laplace_bem::mesh::generators::generate_cube_mesh;
use laplace_bem::{MixedConfig, MixedProblem, SegmentSet};
use std::sync::Arc;

fn problem(
    g_d: f64,
    g_n: f64,
    subdivisions: usize,
) -> MixedProblem {
    let mesh = Arc::new(generate_cube_mesh(subdivisions).unwrap());
    MixedProblem::new(
        mesh,
        SegmentSet::new([1, 3]),
        SegmentSet::new([2, 4, 5, 6]),
        Box::new(move |_| g_d),
        Box::new(move |_| g_n),
    )
    .unwrap()
}

/// The constant field u ≡ 1 solves the Laplace equation with Cauchy data
/// (u, ∂u/∂n) = (1, 0). Feeding that data in must reproduce the constant
/// on the solved Neumann segment and a near-zero Neumann trace.
#[test]
fn manufactured_constant_solution_round_trips() {
    let problem = problem(1.0, 0.0, 2);
    let solution = problem.solve(&MixedConfig::default()).unwrap();

    assert!(solution.status.converged);
    assert!(solution.status.residual < 1e-6);

    // Dirichlet trace: the given data on Γ_D is exact, the solved values
    // on Γ_N carry discretization error only.
    for c in solution.dirichlet.coefficients().iter() {
        assert_relative_eq!(*c, 1.0, epsilon = 0.1);
    }
    // Neumann trace of a constant field vanishes.
    for c in solution.neumann.coefficients().iter() {
        assert!(c.abs() < 0.2, "Neumann coefficient {} too large", c);
    }
}

#[test]
fn cube_scenario_converges_with_bounded_fields() {
    let problem = problem(1.0, 1.0, 2);
    let solution = problem.solve(&MixedConfig::default()).unwrap();

    assert!(solution.status.converged);

    // Given data survives recombination exactly: the Dirichlet field is 1
    // at every dof whose support element lies on Γ_D.
    let dirichlet_space = solution.dirichlet.space();
    let mesh = dirichlet_space.mesh();
    let gamma_d = SegmentSet::new([1, 3]);
    for &e in &mesh.elements_in(&gamma_d) {
        let v = solution.dirichlet.evaluate(e, 1.0 / 3.0, 1.0 / 3.0);
        assert_relative_eq!(v, 1.0, epsilon = 1e-8);
    }
    // Solved values stay bounded
    for c in solution.dirichlet.coefficients().iter() {
        assert!(c.is_finite() && c.abs() < 10.0);
    }
    for c in solution.neumann.coefficients().iter() {
        assert!(c.is_finite() && c.abs() < 50.0);
    }
}

#[test]
fn jacobi_preconditioning_reaches_the_same_solution() {
    let p = problem(1.0, 0.0, 1);
    let plain = p.solve(&MixedConfig::default()).unwrap();
    let jacobi = p
        .solve(&MixedConfig {
            preconditioner: laplace_bem::PreconditionerKind::Jacobi,
            ..MixedConfig::default()
        })
        .unwrap();

    assert!(plain.status.converged && jacobi.status.converged);
    for (a, b) in plain
        .dirichlet
        .coefficients()
        .iter()
        .zip(jacobi.dirichlet.coefficients().iter())
    {
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }
}
