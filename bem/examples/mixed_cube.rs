//! Mixed Dirichlet/Neumann Laplace problem on the unit cube.
//!
//! Dirichlet data on faces 1 and 3, Neumann data on the rest; solves the
//! 2×2 block system, reports the solve status, and evaluates the interior
//! potential at a few points through the representation formula.
//!
//! Run with: cargo run --example mixed_cube

use laplace_bem::mesh::generators::generate_cube_mesh;
use laplace_bem::{potential, MixedConfig, MixedProblem, SegmentSet};
use laplace_solvers::GmresConfig;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mesh = Arc::new(generate_cube_mesh(3)?);
    println!(
        "cube surface: {} vertices, {} elements",
        mesh.num_vertices(),
        mesh.num_elements()
    );

    let problem = MixedProblem::new(
        mesh,
        SegmentSet::new([1, 3]),
        SegmentSet::new([2, 4, 5, 6]),
        Box::new(|_| 1.0),
        Box::new(|_| 0.0),
    )?;

    let config = MixedConfig {
        solver: GmresConfig {
            tolerance: 1e-8,
            print_interval: 25,
            ..GmresConfig::default()
        },
        ..MixedConfig::default()
    };
    let solution = problem.solve(&config)?;

    println!(
        "solve: converged = {}, iterations = {}, residual = {:.3e}",
        solution.status.converged, solution.status.iterations, solution.status.residual
    );
    println!(
        "global traces: {} Dirichlet dofs, {} Neumann dofs",
        solution.dirichlet.space().dof_count(),
        solution.neumann.space().dof_count()
    );

    // With g_D = 1 and g_N = 0 the interior solution is the constant 1.
    let points = [[0.5, 0.5, 0.5], [0.25, 0.5, 0.75], [0.7, 0.2, 0.4]];
    let values = potential::evaluate_interior(&points, &solution.dirichlet, &solution.neumann, 6)?;
    for (p, v) in points.iter().zip(values.iter()) {
        println!("u({:.2}, {:.2}, {:.2}) = {:.6}", p[0], p[1], p[2], v);
    }

    Ok(())
}
