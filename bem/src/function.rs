//! Grid functions: discrete functions living in a function space
//!
//! A grid function pairs a space with a coefficient vector. Analytic data
//! enters through projection: continuous spaces solve a mixed mass-matrix
//! system against a dual space (dense LU, the systems are small),
//! discontinuous spaces interpolate at the dof reference points.
//! Embedding scatters coefficients into a space with a superset of dof
//! keys, which is how segment-restricted solutions recombine into global
//! fields.

use crate::basis;
use crate::error::BemError;
use crate::quadrature::triangle_rule;
use crate::space::FunctionSpace;
use laplace_solvers::DenseLu;
use ndarray::Array1;
use std::sync::Arc;

/// A discrete function: coefficients over a function space.
#[derive(Debug, Clone)]
pub struct GridFunction {
    space: Arc<FunctionSpace>,
    coefficients: Array1<f64>,
}

impl GridFunction {
    /// Wrap an existing coefficient vector.
    pub fn from_coefficients(
        space: Arc<FunctionSpace>,
        coefficients: Array1<f64>,
    ) -> Result<Self, BemError> {
        if coefficients.len() != space.dof_count() {
            return Err(BemError::Projection(format!(
                "{} coefficients for a space with {} dofs",
                coefficients.len(),
                space.dof_count()
            )));
        }
        Ok(Self {
            space,
            coefficients,
        })
    }

    /// Project an analytic function onto `space`.
    ///
    /// Continuous spaces use the variational projection ⟨u, ψ⟩ = ⟨f, ψ⟩
    /// against the basis of `dual`, requiring matching dof counts.
    /// Discontinuous spaces interpolate `f` at the dof reference points and
    /// ignore `dual`.
    pub fn project<F>(
        space: Arc<FunctionSpace>,
        dual: &FunctionSpace,
        f: F,
    ) -> Result<Self, BemError>
    where
        F: Fn([f64; 3]) -> f64,
    {
        let coefficients = match space.continuity() {
            crate::basis::Continuity::Discontinuous => {
                let mut c = Array1::zeros(space.dof_count());
                for i in 0..space.dof_count() {
                    let (e, xi, eta) = space.dof_point(i);
                    c[i] = f(space.mesh().point_at(e, xi, eta));
                }
                c
            }
            crate::basis::Continuity::Continuous => {
                if !space.same_mesh(dual) {
                    return Err(BemError::Projection(
                        "projection space and dual space live on different meshes".into(),
                    ));
                }
                if dual.dof_count() != space.dof_count() {
                    return Err(BemError::Projection(format!(
                        "dual space has {} dofs, projection space {}",
                        dual.dof_count(),
                        space.dof_count()
                    )));
                }

                let mass = crate::assembly::assemble_identity(&space, dual)?.to_dense();
                let rhs = dual_rhs(dual, &f);
                let lu = DenseLu::factor(&mass).map_err(|e| {
                    BemError::Projection(format!("projection mass matrix: {}", e))
                })?;
                lu.solve(&rhs)
            }
        };
        Ok(Self {
            space,
            coefficients,
        })
    }

    /// The space this function lives in.
    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Coefficient vector.
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Evaluate at reference point (ξ,η) on an element.
    ///
    /// Zero outside the basis support of the space.
    pub fn evaluate(&self, element: usize, xi: f64, eta: f64) -> f64 {
        let Some(support) = self.space.support_for(element) else {
            return 0.0;
        };
        let values = basis::shape_values(self.space.order(), xi, eta);
        support
            .dofs
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|gi| self.coefficients[gi] * values[i]))
            .sum()
    }

    /// Embed into a space whose dof keys are a superset of this space's.
    ///
    /// Each coefficient is scattered to the target dof with the same
    /// mesh-level key; target dofs not present here stay zero.
    pub fn embed(&self, target: Arc<FunctionSpace>) -> Result<GridFunction, BemError> {
        if !self.space.same_mesh(&target) {
            return Err(BemError::Projection(
                "embedding target lives on a different mesh".into(),
            ));
        }
        let mut coefficients = Array1::zeros(target.dof_count());
        for i in 0..self.space.dof_count() {
            let key = self.space.dof_key(i);
            let Some(j) = target.index_of(key) else {
                return Err(BemError::Projection(format!(
                    "dof {:?} has no counterpart in the embedding target",
                    key
                )));
            };
            coefficients[j] = self.coefficients[i];
        }
        Ok(GridFunction {
            space: target,
            coefficients,
        })
    }
}

/// ⟨f, ψ_i⟩ over the dual space's support.
fn dual_rhs<F>(dual: &FunctionSpace, f: &F) -> Array1<f64>
where
    F: Fn([f64; 3]) -> f64,
{
    let mesh = dual.mesh();
    let rule = triangle_rule(dual.order() + 2);
    let mut rhs = Array1::zeros(dual.dof_count());
    for support in dual.support() {
        let area = mesh.area(support.element);
        for &(xi, eta, w) in rule {
            let fx = f(mesh.point_at(support.element, xi, eta));
            let values = basis::shape_values(dual.order(), xi, eta);
            for (i, d) in support.dofs.iter().enumerate() {
                if let Some(gi) = d {
                    rhs[*gi] += w * area * fx * values[i];
                }
            }
        }
    }
    rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::generate_cube_mesh;
    use crate::mesh::{Mesh, SegmentSet};
    use crate::space::{FunctionSpace, SpaceConfig};
    use approx::assert_relative_eq;

    fn mesh() -> Arc<Mesh> {
        Arc::new(generate_cube_mesh(2).unwrap())
    }

    #[test]
    fn test_continuous_projection_reproduces_linear_function() {
        // x + 2y - z is in the P1 space, so projection is exact
        let mesh = mesh();
        let space = Arc::new(
            FunctionSpace::new(mesh, SpaceConfig::continuous(1, SegmentSet::new(1..=6)))
                .unwrap(),
        );
        let f = |p: [f64; 3]| p[0] + 2.0 * p[1] - p[2];
        let gf = GridFunction::project(space.clone(), &space, f).unwrap();

        for e in 0..space.mesh().num_elements() {
            for &(xi, eta) in &[(0.25, 0.25), (0.1, 0.6)] {
                let p = space.mesh().point_at(e, xi, eta);
                assert_relative_eq!(gf.evaluate(e, xi, eta), f(p), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_discontinuous_projection_interpolates() {
        let mesh = mesh();
        let space = Arc::new(
            FunctionSpace::new(
                mesh,
                SpaceConfig::discontinuous(1, SegmentSet::new(1..=6)),
            )
            .unwrap(),
        );
        let f = |p: [f64; 3]| 3.0 * p[2];
        // Dual is unused for discontinuous spaces
        let gf = GridFunction::project(space.clone(), &space, f).unwrap();
        for i in 0..space.dof_count() {
            let (e, xi, eta) = space.dof_point(i);
            let p = space.mesh().point_at(e, xi, eta);
            assert_relative_eq!(gf.coefficients()[i], f(p), epsilon = 1e-14);
        }
    }

    #[test]
    fn test_embedding_scatters_by_dof_key() {
        let mesh = mesh();
        let face = Arc::new(
            FunctionSpace::new(
                mesh.clone(),
                SpaceConfig::continuous(1, SegmentSet::new([1])),
            )
            .unwrap(),
        );
        let global = Arc::new(
            FunctionSpace::new(mesh, SpaceConfig::continuous(1, SegmentSet::new(1..=6)))
                .unwrap(),
        );

        let coeffs = Array1::from_iter((0..face.dof_count()).map(|i| i as f64 + 1.0));
        let gf = GridFunction::from_coefficients(face.clone(), coeffs).unwrap();
        let embedded = gf.embed(global.clone()).unwrap();

        let nonzero = embedded
            .coefficients()
            .iter()
            .filter(|&&c| c != 0.0)
            .count();
        assert_eq!(nonzero, face.dof_count());
        for i in 0..face.dof_count() {
            let j = global.index_of(face.dof_key(i)).unwrap();
            assert_relative_eq!(embedded.coefficients()[j], i as f64 + 1.0);
        }
    }

    #[test]
    fn test_embedding_into_disjoint_space_fails() {
        let mesh = mesh();
        let face1 = Arc::new(
            FunctionSpace::new(
                mesh.clone(),
                SpaceConfig::continuous(1, SegmentSet::new([1])),
            )
            .unwrap(),
        );
        let face2 = Arc::new(
            FunctionSpace::new(mesh, SpaceConfig::continuous(1, SegmentSet::new([2])))
                .unwrap(),
        );
        let gf = GridFunction::from_coefficients(
            face1.clone(),
            Array1::ones(face1.dof_count()),
        )
        .unwrap();
        assert!(gf.embed(face2).is_err());
    }

    #[test]
    fn test_coefficient_length_checked() {
        let mesh = mesh();
        let space = Arc::new(
            FunctionSpace::new(mesh, SpaceConfig::continuous(1, SegmentSet::new(1..=6)))
                .unwrap(),
        );
        assert!(GridFunction::from_coefficients(space, Array1::zeros(3)).is_err());
    }
}
