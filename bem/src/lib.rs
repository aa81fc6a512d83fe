//! # Galerkin boundary element solver for the Laplace equation
//!
//! Solves interior Laplace boundary value problems with mixed boundary
//! conditions: Dirichlet data on one set of surface segments, Neumann data
//! on the complement. The formulation follows the symmetric first-kind
//! approach, coupling the single-layer, double-layer, adjoint double-layer,
//! and hypersingular operators in a 2×2 block system over
//! segment-restricted function spaces.
//!
//! Pipeline:
//!
//! 1. [`mesh::Mesh`]: closed triangulated surface with per-element segment
//!    labels, topology and flat-element geometry derived at construction.
//! 2. [`space::FunctionSpace`]: flag-driven dof selection restricted to a
//!    [`mesh::SegmentSet`], so dofs at the Dirichlet/Neumann interface land
//!    on exactly one side.
//! 3. [`operators::BoundaryOperator`] / [`block::BlockOperator`]: lazy,
//!    cached Galerkin weak forms and the coupled block system.
//! 4. [`problem::MixedProblem`]: end-to-end driver that projects data,
//!    solves with GMRES, and recombines into global trace fields.
//! 5. [`potential::evaluate_interior`]: off-surface evaluation through the
//!    representation formula.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembly;
pub mod basis;
pub mod block;
pub mod error;
pub mod function;
pub mod mesh;
pub mod operators;
pub mod potential;
pub mod problem;
pub mod quadrature;
pub mod space;

pub use assembly::{AssemblyConfig, KernelType};
pub use basis::Continuity;
pub use block::{BlockMatrix, BlockOperator};
pub use error::BemError;
pub use function::GridFunction;
pub use mesh::{Mesh, SegmentSet};
pub use operators::{BoundaryOperator, DiscreteOperator};
pub use problem::{MixedConfig, MixedProblem, MixedSolution, PreconditionerKind, SolveStatus};
pub use space::{DofKey, FunctionSpace, SpaceConfig};
