//! # Linear solvers for boundary element systems
//!
//! Real-valued linear algebra support for the Laplace BEM workspace:
//!
//! - [`LinearOperator`]: matrix-free operator abstraction shared by dense,
//!   sparse, and block matrices
//! - [`CsrMatrix`]: compressed sparse row storage for mass matrices
//! - [`DenseLu`]: LU factorization with partial pivoting for small dense
//!   systems (projection mass matrices)
//! - [`gmres`]: restarted GMRES for the non-symmetric block systems that
//!   Galerkin boundary element discretizations produce

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gmres;
pub mod lu;
pub mod preconditioners;
pub mod sparse;
pub mod traits;

pub use gmres::{gmres, gmres_preconditioned, GmresConfig, GmresSolution};
pub use lu::{DenseLu, LuError};
pub use preconditioners::{IdentityPreconditioner, JacobiPreconditioner};
pub use sparse::CsrMatrix;
pub use traits::{LinearOperator, Preconditioner};
