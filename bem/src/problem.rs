//! Mixed Dirichlet/Neumann problem driver
//!
//! Orchestrates the full pipeline for the interior Laplace problem with
//! Dirichlet data g_D on one part of the surface and Neumann data g_N on
//! the complement: seven function spaces, the 2×2 block system
//!
//! ```text
//! [ V_DD   -K_DN ] [t]   [ (½I + K)_DD g_D − V_DN g_N  ]
//! [ K'_ND   W_NN ] [u] = [ −W_ND g_D + (½I − K')_NN g_N ]
//! ```
//!
//! solved with restarted GMRES, and recombination of the known data with
//! the solved traces into global Dirichlet and Neumann fields. Subscripts
//! name the segment sets the trial/test spaces are restricted to.

use crate::assembly::AssemblyConfig;
use crate::block::BlockOperator;
use crate::error::BemError;
use crate::function::GridFunction;
use crate::mesh::{Mesh, SegmentSet};
use crate::operators::BoundaryOperator;
use crate::space::{FunctionSpace, SpaceConfig};
use laplace_solvers::{
    gmres, gmres_preconditioned, GmresConfig, JacobiPreconditioner, LinearOperator,
};
use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Boundary data: a scalar function of a surface point.
pub type BoundaryData = Box<dyn Fn([f64; 3]) -> f64 + Send + Sync>;

/// Preconditioning choice for the block solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreconditionerKind {
    /// Unpreconditioned GMRES
    #[default]
    None,
    /// Diagonal (Jacobi) scaling of the block matrix
    Jacobi,
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct MixedConfig {
    /// Polynomial order of the Neumann-trace (discontinuous) spaces
    pub order_neumann: usize,
    /// Polynomial order of the Dirichlet-trace (continuous) spaces
    pub order_dirichlet: usize,
    /// Quadrature configuration for all operator assembly
    pub assembly: AssemblyConfig,
    /// GMRES configuration for the block solve
    pub solver: GmresConfig,
    /// Preconditioning choice
    pub preconditioner: PreconditionerKind,
}

impl Default for MixedConfig {
    fn default() -> Self {
        Self {
            order_neumann: 1,
            order_dirichlet: 2,
            assembly: AssemblyConfig::default(),
            solver: GmresConfig::default(),
            preconditioner: PreconditionerKind::None,
        }
    }
}

/// Outcome of the linear solve stage.
#[derive(Debug, Clone, Copy)]
pub struct SolveStatus {
    /// Whether GMRES reached the requested tolerance
    pub converged: bool,
    /// Matrix-vector products spent
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
}

/// Solution of the mixed problem: global trace fields plus solve status.
#[derive(Debug)]
pub struct MixedSolution {
    /// Dirichlet trace over the whole surface (given data on Γ_D, solved
    /// values on Γ_N)
    pub dirichlet: GridFunction,
    /// Neumann trace over the whole surface (solved values on Γ_D, given
    /// data on Γ_N)
    pub neumann: GridFunction,
    /// Solve status; inspect `converged` before trusting the fields
    pub status: SolveStatus,
}

/// The seven function spaces of the mixed formulation.
struct SpaceSet {
    global_dirichlet: Arc<FunctionSpace>,
    global_neumann: Arc<FunctionSpace>,
    /// DP on Γ_D, closed: the unknown Neumann trace t
    neumann_on_dirichlet: Arc<FunctionSpace>,
    /// DP on Γ_N, open with support-based inclusion: carries g_N
    neumann_on_neumann: Arc<FunctionSpace>,
    /// P on Γ_D, closed: carries g_D
    dirichlet_on_dirichlet: Arc<FunctionSpace>,
    /// P on Γ_N, open: the unknown Dirichlet trace u
    dirichlet_on_neumann: Arc<FunctionSpace>,
    /// P on Γ_D, closed, support truncated at the interface: projection dual
    dual_dirichlet: Arc<FunctionSpace>,
}

/// A mixed Dirichlet/Neumann boundary value problem on a segmented mesh.
pub struct MixedProblem {
    mesh: Arc<Mesh>,
    dirichlet_segments: SegmentSet,
    neumann_segments: SegmentSet,
    dirichlet_data: BoundaryData,
    neumann_data: BoundaryData,
}

// The boundary-data closures have no useful representation.
impl fmt::Debug for MixedProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixedProblem")
            .field("dirichlet_segments", &self.dirichlet_segments)
            .field("neumann_segments", &self.neumann_segments)
            .finish_non_exhaustive()
    }
}

impl MixedProblem {
    /// Define a problem from segment sets and boundary data.
    ///
    /// The two segment sets must be disjoint, non-empty, and together cover
    /// every segment of the mesh.
    pub fn new(
        mesh: Arc<Mesh>,
        dirichlet_segments: SegmentSet,
        neumann_segments: SegmentSet,
        dirichlet_data: BoundaryData,
        neumann_data: BoundaryData,
    ) -> Result<Self, BemError> {
        mesh.validate_segments(&dirichlet_segments)?;
        mesh.validate_segments(&neumann_segments)?;
        if dirichlet_segments.is_empty() || neumann_segments.is_empty() {
            return Err(BemError::Segments(
                "both the Dirichlet and the Neumann segment set must be non-empty".into(),
            ));
        }
        if !dirichlet_segments.is_disjoint_from(&neumann_segments) {
            return Err(BemError::Segments(
                "Dirichlet and Neumann segment sets overlap".into(),
            ));
        }
        for &id in mesh.segment_ids() {
            if !dirichlet_segments.contains(id) && !neumann_segments.contains(id) {
                return Err(BemError::Segments(format!(
                    "segment {} is assigned to neither boundary condition",
                    id
                )));
            }
        }
        Ok(Self {
            mesh,
            dirichlet_segments,
            neumann_segments,
            dirichlet_data,
            neumann_data,
        })
    }

    /// Assemble, solve, and recombine.
    pub fn solve(&self, config: &MixedConfig) -> Result<MixedSolution, BemError> {
        let spaces = self.build_spaces(config)?;
        log::info!(
            "mixed problem: {} + {} unknowns ({} Dirichlet / {} Neumann segments)",
            spaces.neumann_on_dirichlet.dof_count(),
            spaces.dirichlet_on_neumann.dof_count(),
            self.dirichlet_segments.len(),
            self.neumann_segments.len()
        );

        // Known data as grid functions on the restricted spaces
        let g_d = GridFunction::project(
            spaces.dirichlet_on_dirichlet.clone(),
            &spaces.dual_dirichlet,
            &self.dirichlet_data,
        )?;
        let g_n = GridFunction::project(
            spaces.neumann_on_neumann.clone(),
            &spaces.neumann_on_neumann,
            &self.neumann_data,
        )?;

        let system = self.build_system(&spaces, config)?;
        let rhs = self.build_rhs(&spaces, config, &g_d, &g_n)?;
        log::debug!("block system assembled: {} unknowns", system.num_rows());

        let solution = match config.preconditioner {
            PreconditionerKind::None => gmres(&system, &rhs, &config.solver),
            PreconditionerKind::Jacobi => {
                let precond = JacobiPreconditioner::from_dense(&system.to_dense());
                gmres_preconditioned(&system, &precond, &rhs, &config.solver)
            }
        };
        let status = SolveStatus {
            converged: solution.converged,
            iterations: solution.iterations,
            residual: solution.residual,
        };
        if status.converged {
            log::info!(
                "GMRES converged in {} iterations (residual {:.3e})",
                status.iterations,
                status.residual
            );
        } else {
            log::warn!(
                "GMRES did not converge: residual {:.3e} after {} iterations",
                status.residual,
                status.iterations
            );
        }

        // Split the solution vector into the two unknown traces
        let nt = spaces.neumann_on_dirichlet.dof_count();
        let t = GridFunction::from_coefficients(
            spaces.neumann_on_dirichlet.clone(),
            solution.x.slice(s![..nt]).to_owned(),
        )?;
        let u = GridFunction::from_coefficients(
            spaces.dirichlet_on_neumann.clone(),
            solution.x.slice(s![nt..]).to_owned(),
        )?;

        // Recombine: known and solved pieces scatter into disjoint halves
        // of the global dof sets.
        let dirichlet_coeffs = g_d.embed(spaces.global_dirichlet.clone())?.coefficients()
            + u.embed(spaces.global_dirichlet.clone())?.coefficients();
        let neumann_coeffs = t.embed(spaces.global_neumann.clone())?.coefficients()
            + g_n.embed(spaces.global_neumann.clone())?.coefficients();

        Ok(MixedSolution {
            dirichlet: GridFunction::from_coefficients(
                spaces.global_dirichlet,
                dirichlet_coeffs,
            )?,
            neumann: GridFunction::from_coefficients(spaces.global_neumann, neumann_coeffs)?,
            status,
        })
    }

    fn build_spaces(&self, config: &MixedConfig) -> Result<SpaceSet, BemError> {
        let all = SegmentSet::new(self.mesh.segment_ids().iter().copied());
        let d = self.dirichlet_segments.clone();
        let n = self.neumann_segments.clone();
        let (on, od) = (config.order_neumann, config.order_dirichlet);

        let build = |cfg: SpaceConfig| -> Result<Arc<FunctionSpace>, BemError> {
            Ok(Arc::new(FunctionSpace::new(self.mesh.clone(), cfg)?))
        };

        Ok(SpaceSet {
            global_neumann: build(SpaceConfig::discontinuous(on, all.clone()))?,
            global_dirichlet: build(SpaceConfig::continuous(od, all))?,
            neumann_on_dirichlet: build(SpaceConfig::discontinuous(on, d.clone()))?,
            neumann_on_neumann: build(
                SpaceConfig::discontinuous(on, n.clone())
                    .with_closed(false)
                    .with_reference_point_on_segment(false),
            )?,
            dirichlet_on_dirichlet: build(SpaceConfig::continuous(od, d.clone()))?,
            dirichlet_on_neumann: build(SpaceConfig::continuous(od, n).with_closed(false))?,
            dual_dirichlet: build(
                SpaceConfig::continuous(od, d).with_strictly_on_segment(true),
            )?,
        })
    }

    fn build_system(
        &self,
        spaces: &SpaceSet,
        config: &MixedConfig,
    ) -> Result<crate::block::BlockMatrix, BemError> {
        // Row 0 is tested against the Neumann space on Γ_D, row 1 against
        // the Dirichlet space on Γ_N; together with the trial spaces
        // [t on Γ_D, u on Γ_N] this makes the block system square.
        let nd = &spaces.neumann_on_dirichlet;
        let dn = &spaces.dirichlet_on_neumann;

        let slp_dd = BoundaryOperator::single_layer(
            nd.clone(),
            spaces.dirichlet_on_dirichlet.clone(),
            nd.clone(),
            config.assembly.clone(),
        )?;
        let dlp_dn = BoundaryOperator::double_layer(
            dn.clone(),
            spaces.dirichlet_on_dirichlet.clone(),
            nd.clone(),
            config.assembly.clone(),
        )?
        .scaled(-1.0);
        let adlp_nd = BoundaryOperator::adjoint_double_layer(
            nd.clone(),
            spaces.neumann_on_neumann.clone(),
            dn.clone(),
            config.assembly.clone(),
        )?;
        let hyp_nn = BoundaryOperator::hypersingular(
            dn.clone(),
            spaces.neumann_on_neumann.clone(),
            dn.clone(),
            config.assembly.clone(),
        )?;

        let mut grid = BlockOperator::new(2, 2);
        grid.set_block(0, 0, Arc::new(slp_dd))?;
        grid.set_block(0, 1, Arc::new(dlp_dn))?;
        grid.set_block(1, 0, Arc::new(adlp_nd))?;
        grid.set_block(1, 1, Arc::new(hyp_nn))?;
        grid.weak_form()
    }

    fn build_rhs(
        &self,
        spaces: &SpaceSet,
        config: &MixedConfig,
        g_d: &GridFunction,
        g_n: &GridFunction,
    ) -> Result<Array1<f64>, BemError> {
        let dd = &spaces.dirichlet_on_dirichlet;
        let nn = &spaces.neumann_on_neumann;
        let nd = &spaces.neumann_on_dirichlet;
        let dn = &spaces.dirichlet_on_neumann;

        // First block row, tested against the Neumann space on Γ_D:
        // (½I + K)_DD g_D − V_DN g_N
        let id_dd = BoundaryOperator::identity(dd.clone(), dd.clone(), nd.clone())?;
        let dlp_dd = BoundaryOperator::double_layer(
            dd.clone(),
            dd.clone(),
            nd.clone(),
            config.assembly.clone(),
        )?;
        let slp_dn = BoundaryOperator::single_layer(
            nn.clone(),
            dd.clone(),
            nd.clone(),
            config.assembly.clone(),
        )?;
        let rhs0 = id_dd.weak_form()?.matvec(g_d.coefficients()) * 0.5
            + dlp_dd.weak_form()?.matvec(g_d.coefficients())
            - slp_dn.weak_form()?.matvec(g_n.coefficients());

        // Second block row, tested against the Dirichlet space on Γ_N:
        // −W_ND g_D + (½I − K')_NN g_N
        let hyp_nd = BoundaryOperator::hypersingular(
            dd.clone(),
            nn.clone(),
            dn.clone(),
            config.assembly.clone(),
        )?;
        let id_nn = BoundaryOperator::identity(nn.clone(), nn.clone(), dn.clone())?;
        let adlp_nn = BoundaryOperator::adjoint_double_layer(
            nn.clone(),
            nn.clone(),
            dn.clone(),
            config.assembly.clone(),
        )?;
        let rhs1 = id_nn.weak_form()?.matvec(g_n.coefficients()) * 0.5
            - adlp_nn.weak_form()?.matvec(g_n.coefficients())
            - hyp_nd.weak_form()?.matvec(g_d.coefficients());

        let mut rhs = Array1::zeros(rhs0.len() + rhs1.len());
        rhs.slice_mut(s![..rhs0.len()]).assign(&rhs0);
        rhs.slice_mut(s![rhs0.len()..]).assign(&rhs1);
        Ok(rhs)
    }
}
