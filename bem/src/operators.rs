//! Boundary integral operators and their discrete weak forms
//!
//! A [`BoundaryOperator`] pairs a kernel with a trial space (domain), a
//! range space, and a dual-to-range (test) space. The range space is
//! bookkeeping for the operator calculus; the discrete weak form is the
//! Galerkin matrix of test × trial dof pairings. Weak forms are assembled
//! lazily and cached per operator instance, so driver code can refer to
//! the same operator in the system and in the right-hand side without
//! paying for assembly twice.

use crate::assembly::{assemble_dense, assemble_identity, AssemblyConfig, KernelType};
use crate::error::BemError;
use crate::space::FunctionSpace;
use laplace_solvers::{CsrMatrix, LinearOperator};
use ndarray::{Array1, Array2};
use std::sync::{Arc, OnceLock};

/// Discrete weak form of a boundary operator.
///
/// Layer potentials are dense; identity (mass) operators are sparse.
#[derive(Debug, Clone)]
pub enum DiscreteOperator {
    /// Dense Galerkin matrix
    Dense(Array2<f64>),
    /// Sparse mass matrix
    Sparse(CsrMatrix),
}

impl DiscreteOperator {
    /// Shape as (rows, cols) = (test dofs, trial dofs).
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(m) => (m.nrows(), m.ncols()),
            Self::Sparse(m) => (m.num_rows, m.num_cols),
        }
    }

    /// Densify (copies the sparse case).
    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => m.to_dense(),
        }
    }

    /// Matrix-vector product.
    pub fn matvec(&self, x: &Array1<f64>) -> Array1<f64> {
        match self {
            Self::Dense(m) => m.dot(x),
            Self::Sparse(m) => m.matvec(x),
        }
    }
}

impl LinearOperator for DiscreteOperator {
    fn num_rows(&self) -> usize {
        self.shape().0
    }

    fn num_cols(&self) -> usize {
        self.shape().1
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matvec(x)
    }
}

/// Kernel of a boundary operator, including the non-singular identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorKind {
    Kernel(KernelType),
    Identity,
}

/// A Galerkin boundary operator between function spaces on one mesh.
#[derive(Debug)]
pub struct BoundaryOperator {
    kind: OperatorKind,
    trial: Arc<FunctionSpace>,
    range: Arc<FunctionSpace>,
    test: Arc<FunctionSpace>,
    coefficient: f64,
    config: AssemblyConfig,
    cache: OnceLock<DiscreteOperator>,
}

impl BoundaryOperator {
    fn build(
        kind: OperatorKind,
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
        config: AssemblyConfig,
    ) -> Result<Self, BemError> {
        if !trial.same_mesh(&test) || !trial.same_mesh(&range) {
            return Err(BemError::Operator(
                "operator spaces must share one mesh instance".into(),
            ));
        }
        Ok(Self {
            kind,
            trial,
            range,
            test,
            coefficient: 1.0,
            config,
            cache: OnceLock::new(),
        })
    }

    /// Single-layer operator V.
    pub fn single_layer(
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
        config: AssemblyConfig,
    ) -> Result<Self, BemError> {
        Self::build(OperatorKind::Kernel(KernelType::SingleLayer), trial, range, test, config)
    }

    /// Double-layer operator K.
    pub fn double_layer(
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
        config: AssemblyConfig,
    ) -> Result<Self, BemError> {
        Self::build(OperatorKind::Kernel(KernelType::DoubleLayer), trial, range, test, config)
    }

    /// Adjoint double-layer operator K'.
    pub fn adjoint_double_layer(
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
        config: AssemblyConfig,
    ) -> Result<Self, BemError> {
        Self::build(
            OperatorKind::Kernel(KernelType::AdjointDoubleLayer),
            trial,
            range,
            test,
            config,
        )
    }

    /// Hypersingular operator W (regularized assembly).
    pub fn hypersingular(
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
        config: AssemblyConfig,
    ) -> Result<Self, BemError> {
        Self::build(OperatorKind::Kernel(KernelType::Hypersingular), trial, range, test, config)
    }

    /// Identity (mass) operator.
    pub fn identity(
        trial: Arc<FunctionSpace>,
        range: Arc<FunctionSpace>,
        test: Arc<FunctionSpace>,
    ) -> Result<Self, BemError> {
        Self::build(
            OperatorKind::Identity,
            trial,
            range,
            test,
            AssemblyConfig::default(),
        )
    }

    /// Scale the operator by a constant; applied to the weak form.
    ///
    /// Resets the cached weak form of `self` (the scaled copy assembles on
    /// first use).
    pub fn scaled(mut self, factor: f64) -> Self {
        self.coefficient *= factor;
        self.cache = OnceLock::new();
        self
    }

    /// Trial space (operator domain).
    pub fn domain(&self) -> &Arc<FunctionSpace> {
        &self.trial
    }

    /// Range space.
    pub fn range(&self) -> &Arc<FunctionSpace> {
        &self.range
    }

    /// Test space (dual to range).
    pub fn dual_to_range(&self) -> &Arc<FunctionSpace> {
        &self.test
    }

    /// Assemble (once) and return the discrete weak form.
    pub fn weak_form(&self) -> Result<&DiscreteOperator, BemError> {
        if let Some(op) = self.cache.get() {
            return Ok(op);
        }
        let assembled = match self.kind {
            OperatorKind::Kernel(kernel) => {
                log::debug!(
                    "assembling {:?} weak form ({}x{})",
                    kernel,
                    self.test.dof_count(),
                    self.trial.dof_count()
                );
                let mut m = assemble_dense(kernel, &self.trial, &self.test, &self.config)?;
                if self.coefficient != 1.0 {
                    m.mapv_inplace(|v| v * self.coefficient);
                }
                DiscreteOperator::Dense(m)
            }
            OperatorKind::Identity => {
                let mut m = assemble_identity(&self.trial, &self.test)?;
                if self.coefficient != 1.0 {
                    for v in &mut m.values {
                        *v *= self.coefficient;
                    }
                }
                DiscreteOperator::Sparse(m)
            }
        };
        Ok(self.cache.get_or_init(|| assembled))
    }
}
