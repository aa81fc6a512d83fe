//! Galerkin assembly of Laplace boundary integral operators
//!
//! Dense assembly of the singular kernels (single layer, double layer,
//! adjoint double layer, hypersingular) and sparse assembly of the
//! identity (mass) kernel. Element pairs are classified by proximity:
//! pairs sharing a vertex take a Duffy-transformed singular path, the
//! rest take regular triangle rules whose order depends on the centroid
//! distance relative to the element diameters.
//!
//! The hypersingular kernel is assembled in its regularized form,
//! ⟨Wu, v⟩ = ∬ G(x,y) curl_Γ u(y) · curl_Γ v(x), so every kernel shares
//! the same 1/r singularity and the same quadrature machinery.
//!
//! Singular pairs are integrated in both orderings with half weights, so
//! operators with symmetric kernels come out symmetric to roundoff when
//! trial and test spaces coincide.

use crate::basis::{self, MAX_BASIS};
use crate::error::BemError;
use crate::mesh::{cross3, dot3, norm3, sub3, Mesh};
use crate::quadrature::{duffy_points, triangle_rule, TrianglePoint};
use crate::space::FunctionSpace;
use laplace_solvers::CsrMatrix;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 1/(4π)
const INV_4PI: f64 = 0.079_577_471_545_947_67;

/// Singular kernel selector for dense assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    /// G(x,y) = 1/(4π|x−y|)
    SingleLayer,
    /// ∂G/∂n(y) = (x−y)·n(y) / (4π|x−y|³)
    DoubleLayer,
    /// ∂G/∂n(x) = (y−x)·n(x) / (4π|x−y|³)
    AdjointDoubleLayer,
    /// Regularized hypersingular form with surface curls
    Hypersingular,
}

/// Quadrature configuration for operator assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Triangle rule degree for well-separated element pairs
    pub quadrature_order_far: usize,
    /// Triangle rule degree for close but non-touching pairs
    pub quadrature_order_medium: usize,
    /// Outer triangle rule degree for vertex-sharing pairs
    pub quadrature_order_near: usize,
    /// 1D Gauss order of the Duffy rule on the inner (singular) element
    pub singular_gauss_order: usize,
    /// Pairs with centroid distance below this multiple of the larger
    /// element diameter use the medium rule
    pub medium_distance_ratio: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            quadrature_order_far: 3,
            quadrature_order_medium: 4,
            quadrature_order_near: 6,
            singular_gauss_order: 4,
            medium_distance_ratio: 4.0,
        }
    }
}

/// Assemble the dense Galerkin matrix of a singular kernel.
///
/// Rows follow the test space, columns the trial space. Both spaces must
/// live on the same mesh instance.
pub fn assemble_dense(
    kernel: KernelType,
    trial: &FunctionSpace,
    test: &FunctionSpace,
    config: &AssemblyConfig,
) -> Result<Array2<f64>, BemError> {
    if !trial.same_mesh(test) {
        return Err(BemError::Operator(
            "trial and test spaces are built on different meshes".into(),
        ));
    }
    let mesh = test.mesh().as_ref();

    let blocks: Vec<Vec<(usize, usize, f64)>> = test
        .support()
        .par_iter()
        .map(|ts| {
            let mut triplets = Vec::new();
            for tr in trial.support() {
                let mut local = [[0.0; MAX_BASIS]; MAX_BASIS];
                pair_integral(kernel, mesh, test, trial, ts.element, tr.element, config, &mut local);
                for (i, row) in local.iter().enumerate() {
                    let Some(gi) = ts.dofs[i] else { continue };
                    for (j, &v) in row.iter().enumerate() {
                        let Some(gj) = tr.dofs[j] else { continue };
                        if v != 0.0 {
                            triplets.push((gi, gj, v));
                        }
                    }
                }
            }
            triplets
        })
        .collect();

    let mut matrix = Array2::zeros((test.dof_count(), trial.dof_count()));
    for block in blocks {
        for (r, c, v) in block {
            matrix[[r, c]] += v;
        }
    }
    Ok(matrix)
}

/// Assemble the sparse identity (mass) matrix ⟨u, v⟩ between two spaces
/// on the same mesh.
///
/// Non-zero only for dof pairs whose supports overlap, hence the CSR
/// result.
pub fn assemble_identity(
    trial: &FunctionSpace,
    test: &FunctionSpace,
) -> Result<CsrMatrix, BemError> {
    if !trial.same_mesh(test) {
        return Err(BemError::Operator(
            "trial and test spaces are built on different meshes".into(),
        ));
    }
    let mesh = test.mesh().as_ref();
    let rule = triangle_rule(test.order() + trial.order() + 1);

    let mut triplets = Vec::new();
    for ts in test.support() {
        let Some(tr) = trial.support_for(ts.element) else {
            continue;
        };
        let area = mesh.area(ts.element);
        // Physical measure: area fraction weight times element area.
        for &(xi, eta, w) in rule {
            let vt = basis::shape_values(test.order(), xi, eta);
            let vu = basis::shape_values(trial.order(), xi, eta);
            for (i, &gi) in ts.dofs.iter().enumerate() {
                let Some(gi) = gi else { continue };
                for (j, &gj) in tr.dofs.iter().enumerate() {
                    let Some(gj) = gj else { continue };
                    triplets.push((gi, gj, w * area * vt[i] * vu[j]));
                }
            }
        }
    }
    Ok(CsrMatrix::from_triplets(
        test.dof_count(),
        trial.dof_count(),
        &triplets,
        1e-14,
    ))
}

/// Accumulate the pair integral over (test element, trial element) into
/// `local[test basis][trial basis]`.
#[allow(clippy::too_many_arguments)]
fn pair_integral(
    kernel: KernelType,
    mesh: &Mesh,
    test: &FunctionSpace,
    trial: &FunctionSpace,
    te: usize,
    tr: usize,
    config: &AssemblyConfig,
    local: &mut [[f64; MAX_BASIS]; MAX_BASIS],
) {
    if shares_vertex(mesh, te, tr) {
        // Both orderings with half weights keep symmetric kernels exactly
        // symmetric for matching spaces.
        singular_ordering(kernel, mesh, test, trial, te, tr, false, config, local);
        singular_ordering(kernel, mesh, test, trial, te, tr, true, config, local);
    } else {
        let d = norm3(sub3(mesh.centroid(te), mesh.centroid(tr)));
        let scale = mesh.diameter(te).max(mesh.diameter(tr));
        let degree = if d < config.medium_distance_ratio * scale {
            config.quadrature_order_medium
        } else {
            config.quadrature_order_far
        };
        let rule = triangle_rule(degree);
        regular_pair(kernel, mesh, test, trial, te, tr, rule, rule, local);
    }
}

fn shares_vertex(mesh: &Mesh, a: usize, b: usize) -> bool {
    let ta = mesh.triangle(a);
    let tb = mesh.triangle(b);
    ta.iter().any(|v| tb.contains(v))
}

/// Tensor-product quadrature over a regular (non-touching) pair.
#[allow(clippy::too_many_arguments)]
fn regular_pair(
    kernel: KernelType,
    mesh: &Mesh,
    test: &FunctionSpace,
    trial: &FunctionSpace,
    te: usize,
    tr: usize,
    outer_rule: &[TrianglePoint],
    inner_rule: &[TrianglePoint],
    local: &mut [[f64; MAX_BASIS]; MAX_BASIS],
) {
    let jac = mesh.area(te) * mesh.area(tr);
    for &(xi_t, eta_t, w_t) in outer_rule {
        let x = mesh.point_at(te, xi_t, eta_t);
        let test_vals = basis_factors(kernel, mesh, test.order(), te, xi_t, eta_t);
        for &(xi_u, eta_u, w_u) in inner_rule {
            let y = mesh.point_at(tr, xi_u, eta_u);
            let trial_vals = basis_factors(kernel, mesh, trial.order(), tr, xi_u, eta_u);
            let k = kernel_value(kernel, mesh, te, tr, x, y);
            let w = w_t * w_u * jac * k;
            accumulate(kernel, &test_vals, &trial_vals, w, local);
        }
    }
}

/// One ordering of the symmetrized singular-pair quadrature.
///
/// The outer element takes a regular near rule; the inner element takes a
/// Duffy rule whose apex is the outer point pulled back into the inner
/// reference triangle, so the inner point density concentrates where the
/// kernel blows up.
#[allow(clippy::too_many_arguments)]
fn singular_ordering(
    kernel: KernelType,
    mesh: &Mesh,
    test: &FunctionSpace,
    trial: &FunctionSpace,
    te: usize,
    tr: usize,
    swapped: bool,
    config: &AssemblyConfig,
    local: &mut [[f64; MAX_BASIS]; MAX_BASIS],
) {
    let (outer, inner) = if swapped { (tr, te) } else { (te, tr) };
    let jac = 0.5 * mesh.area(outer) * mesh.area(inner);
    let outer_rule = triangle_rule(config.quadrature_order_near);

    for &(xi_o, eta_o, w_o) in outer_rule {
        let p_outer = mesh.point_at(outer, xi_o, eta_o);
        let apex = clamp_to_reference(mesh.global_to_reference(inner, p_outer));

        for (xi_i, eta_i, w_i) in duffy_points(apex, config.singular_gauss_order) {
            let p_inner = mesh.point_at(inner, xi_i, eta_i);
            // Test quantities always live on the test element, trial
            // quantities on the trial element, whichever side is outer.
            let (x, y, test_xi, test_eta, trial_xi, trial_eta) = if swapped {
                (p_inner, p_outer, xi_i, eta_i, xi_o, eta_o)
            } else {
                (p_outer, p_inner, xi_o, eta_o, xi_i, eta_i)
            };
            let test_vals = basis_factors(kernel, mesh, test.order(), te, test_xi, test_eta);
            let trial_vals = basis_factors(kernel, mesh, trial.order(), tr, trial_xi, trial_eta);
            let k = kernel_value(kernel, mesh, te, tr, x, y);
            let w = w_o * w_i * jac * k;
            accumulate(kernel, &test_vals, &trial_vals, w, local);
        }
    }
}

fn clamp_to_reference((xi, eta): (f64, f64)) -> (f64, f64) {
    let xi = xi.max(0.0);
    let eta = eta.max(0.0);
    let s = xi + eta;
    if s > 1.0 {
        (xi / s, eta / s)
    } else {
        (xi, eta)
    }
}

/// Per-basis factor at a quadrature point: shape values for the weakly
/// singular kernels, surface curls for the hypersingular form.
#[derive(Clone, Copy)]
enum BasisFactor {
    Values([f64; MAX_BASIS]),
    Curls([[f64; 3]; MAX_BASIS]),
}

fn basis_factors(
    kernel: KernelType,
    mesh: &Mesh,
    order: usize,
    e: usize,
    xi: f64,
    eta: f64,
) -> BasisFactor {
    match kernel {
        KernelType::Hypersingular => BasisFactor::Curls(surface_curls(mesh, order, e, xi, eta)),
        _ => BasisFactor::Values(basis::shape_values(order, xi, eta)),
    }
}

/// Surface curl curl_Γ φ = n × ∇_Γ φ of every basis function on element
/// `e` at reference point (ξ,η).
fn surface_curls(mesh: &Mesh, order: usize, e: usize, xi: f64, eta: f64) -> [[f64; 3]; MAX_BASIS] {
    let gt = mesh.grad_transform(e);
    let n = mesh.normal(e);
    let grads = basis::shape_gradients(order, xi, eta);
    let mut out = [[0.0; 3]; MAX_BASIS];
    for (i, g) in grads.iter().enumerate() {
        let surf = [
            gt[0][0] * g[0] + gt[1][0] * g[1],
            gt[0][1] * g[0] + gt[1][1] * g[1],
            gt[0][2] * g[0] + gt[1][2] * g[1],
        ];
        out[i] = cross3(n, surf);
    }
    out
}

/// Scalar kernel value at (x, y); the hypersingular form uses the plain
/// Green function, its normals live in the basis factors.
fn kernel_value(
    kernel: KernelType,
    mesh: &Mesh,
    te: usize,
    tr: usize,
    x: [f64; 3],
    y: [f64; 3],
) -> f64 {
    let d = sub3(x, y);
    let r = norm3(d);
    match kernel {
        KernelType::SingleLayer | KernelType::Hypersingular => INV_4PI / r,
        KernelType::DoubleLayer => INV_4PI * dot3(d, mesh.normal(tr)) / (r * r * r),
        KernelType::AdjointDoubleLayer => -INV_4PI * dot3(d, mesh.normal(te)) / (r * r * r),
    }
}

fn accumulate(
    kernel: KernelType,
    test_vals: &BasisFactor,
    trial_vals: &BasisFactor,
    w: f64,
    local: &mut [[f64; MAX_BASIS]; MAX_BASIS],
) {
    match (kernel, test_vals, trial_vals) {
        (KernelType::Hypersingular, BasisFactor::Curls(ct), BasisFactor::Curls(cu)) => {
            for i in 0..MAX_BASIS {
                for j in 0..MAX_BASIS {
                    local[i][j] += w * dot3(ct[i], cu[j]);
                }
            }
        }
        (_, BasisFactor::Values(vt), BasisFactor::Values(vu)) => {
            for i in 0..MAX_BASIS {
                if vt[i] == 0.0 {
                    continue;
                }
                for j in 0..MAX_BASIS {
                    local[i][j] += w * vt[i] * vu[j];
                }
            }
        }
        _ => unreachable!("kernel and basis factors always agree"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::generate_cube_mesh;
    use crate::mesh::SegmentSet;
    use crate::space::SpaceConfig;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::sync::Arc;

    fn cube_space(order: usize, continuity: &str) -> (Arc<crate::mesh::Mesh>, FunctionSpace) {
        let mesh = Arc::new(generate_cube_mesh(2).unwrap());
        let all = SegmentSet::new(1..=6);
        let config = match continuity {
            "c" => SpaceConfig::continuous(order, all),
            _ => SpaceConfig::discontinuous(order, all),
        };
        let space = FunctionSpace::new(mesh.clone(), config).unwrap();
        (mesh, space)
    }

    #[test]
    fn test_mass_matrix_row_sums_give_surface_area() {
        // ⟨1, φ_i⟩ summed over all i integrates 1 over the cube surface
        let (_, space) = cube_space(1, "c");
        let mass = assemble_identity(&space, &space).unwrap().to_dense();
        let total: f64 = mass.iter().sum();
        assert_relative_eq!(total, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_single_layer_is_symmetric_and_positive() {
        let (_, space) = cube_space(0, "d");
        let v = assemble_dense(
            KernelType::SingleLayer,
            &space,
            &space,
            &AssemblyConfig::default(),
        )
        .unwrap();
        let n = space.dof_count();
        for i in 0..n {
            assert!(v[[i, i]] > 0.0);
            for j in 0..n {
                assert_relative_eq!(v[[i, j]], v[[j, i]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_hypersingular_is_symmetric_with_constant_kernel() {
        let (_, space) = cube_space(1, "c");
        let w = assemble_dense(
            KernelType::Hypersingular,
            &space,
            &space,
            &AssemblyConfig::default(),
        )
        .unwrap();
        let n = space.dof_count();
        for i in 0..n {
            for j in 0..n {
                assert_relative_eq!(w[[i, j]], w[[j, i]], epsilon = 1e-10);
            }
        }
        // Constants are in the kernel of the hypersingular operator
        let ones = Array1::from_elem(n, 1.0);
        let wy = w.dot(&ones);
        for i in 0..n {
            assert_relative_eq!(wy[i], 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_double_layer_constant_identity() {
        // On a closed surface, K applied to the constant one satisfies
        // K·1 = −½·1 in the Galerkin sense: ⟨K1, φ⟩ = −½⟨1, φ⟩.
        let (_, space) = cube_space(1, "c");
        let config = AssemblyConfig {
            quadrature_order_near: 6,
            singular_gauss_order: 6,
            ..AssemblyConfig::default()
        };
        let k = assemble_dense(KernelType::DoubleLayer, &space, &space, &config).unwrap();
        let mass = assemble_identity(&space, &space).unwrap().to_dense();

        let n = space.dof_count();
        let ones = Array1::from_elem(n, 1.0);
        let lhs = k.dot(&ones);
        let rhs = mass.dot(&ones) * (-0.5);
        for i in 0..n {
            assert_relative_eq!(lhs[i], rhs[i], epsilon = 5e-3);
        }
    }

    #[test]
    fn test_adjoint_double_layer_is_transpose_for_matching_spaces() {
        // For equal trial/test spaces K' is the transpose of K up to
        // quadrature error.
        let (_, space) = cube_space(0, "d");
        let config = AssemblyConfig::default();
        let k = assemble_dense(KernelType::DoubleLayer, &space, &space, &config).unwrap();
        let kp = assemble_dense(KernelType::AdjointDoubleLayer, &space, &space, &config).unwrap();
        let n = space.dof_count();
        for i in 0..n {
            for j in 0..n {
                assert_relative_eq!(kp[[i, j]], k[[j, i]], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_mismatched_meshes_rejected() {
        let (_, a) = cube_space(0, "d");
        let (_, b) = cube_space(0, "d");
        let err =
            assemble_dense(KernelType::SingleLayer, &a, &b, &AssemblyConfig::default())
                .unwrap_err();
        assert!(matches!(err, BemError::Operator(_)));
    }
}
