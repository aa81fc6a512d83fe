//! Error types for the BEM core
//!
//! Configuration problems (bad segment selections, incompatible spaces,
//! ill-shaped block systems) are fatal and detected eagerly at construction
//! time. Numerical non-convergence of the iterative solver is deliberately
//! not an error; it is reported through the solve status instead.

use thiserror::Error;

/// Errors raised by mesh construction, space building, and assembly.
#[derive(Debug, Error)]
pub enum BemError {
    /// Mesh connectivity or geometry is invalid
    #[error("invalid mesh: {0}")]
    Mesh(String),

    /// A segment set references unknown segment identifiers or conflicts
    /// with another segment set
    #[error("invalid segment selection: {0}")]
    Segments(String),

    /// A function space configuration produced no usable dof layout
    #[error("invalid space configuration: {0}")]
    Space(String),

    /// Operator construction with incompatible spaces
    #[error("operator configuration: {0}")]
    Operator(String),

    /// Block system rows/columns with inconsistent dimensions
    #[error("block system shape: {0}")]
    BlockShape(String),

    /// Projection of boundary data onto a space failed
    #[error("projection failed: {0}")]
    Projection(String),
}
