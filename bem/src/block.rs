//! Block operator grids for coupled boundary integral systems
//!
//! The mixed formulation couples two unknowns through a 2×2 grid of
//! boundary operators. [`BlockOperator`] holds an R×C grid with optional
//! entries; its weak form validates that every row agrees on the test dof
//! count and every column on the trial dof count, then produces a
//! [`BlockMatrix`] that applies blockwise without ever concatenating into
//! one dense array unless asked to.

use crate::error::BemError;
use crate::operators::{BoundaryOperator, DiscreteOperator};
use laplace_solvers::LinearOperator;
use ndarray::{s, Array1, Array2};
use std::sync::Arc;

/// An R×C grid of optional boundary operators.
pub struct BlockOperator {
    rows: usize,
    cols: usize,
    blocks: Vec<Option<Arc<BoundaryOperator>>>,
}

impl BlockOperator {
    /// Create an empty grid with the given number of block rows/columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            blocks: vec![None; rows * cols],
        }
    }

    /// Place an operator at grid position (r, c).
    pub fn set_block(
        &mut self,
        r: usize,
        c: usize,
        op: Arc<BoundaryOperator>,
    ) -> Result<(), BemError> {
        if r >= self.rows || c >= self.cols {
            return Err(BemError::BlockShape(format!(
                "block position ({}, {}) outside {}x{} grid",
                r, c, self.rows, self.cols
            )));
        }
        self.blocks[r * self.cols + c] = Some(op);
        Ok(())
    }

    /// Operator at grid position (r, c), if set.
    pub fn block(&self, r: usize, c: usize) -> Option<&Arc<BoundaryOperator>> {
        self.blocks[r * self.cols + c].as_ref()
    }

    /// Assemble all blocks and validate the grid shape.
    ///
    /// Every block in row r must share its test dof count, every block in
    /// column c its trial dof count, and no row or column may be entirely
    /// empty (its dimension would be undefined).
    pub fn weak_form(&self) -> Result<BlockMatrix, BemError> {
        let mut row_dims = vec![None; self.rows];
        let mut col_dims = vec![None; self.cols];
        let mut discrete: Vec<Option<DiscreteOperator>> = vec![None; self.rows * self.cols];

        for r in 0..self.rows {
            for c in 0..self.cols {
                let Some(op) = &self.blocks[r * self.cols + c] else {
                    continue;
                };
                let wf = op.weak_form()?;
                let (nr, nc) = wf.shape();
                match row_dims[r] {
                    None => row_dims[r] = Some(nr),
                    Some(expected) if expected != nr => {
                        return Err(BemError::BlockShape(format!(
                            "block ({}, {}) has {} rows, row {} expects {}",
                            r, c, nr, r, expected
                        )));
                    }
                    Some(_) => {}
                }
                match col_dims[c] {
                    None => col_dims[c] = Some(nc),
                    Some(expected) if expected != nc => {
                        return Err(BemError::BlockShape(format!(
                            "block ({}, {}) has {} columns, column {} expects {}",
                            r, c, nc, c, expected
                        )));
                    }
                    Some(_) => {}
                }
                discrete[r * self.cols + c] = Some(wf.clone());
            }
        }

        let row_dims: Vec<usize> = row_dims
            .into_iter()
            .enumerate()
            .map(|(r, d)| {
                d.ok_or_else(|| BemError::BlockShape(format!("block row {} is empty", r)))
            })
            .collect::<Result<_, _>>()?;
        let col_dims: Vec<usize> = col_dims
            .into_iter()
            .enumerate()
            .map(|(c, d)| {
                d.ok_or_else(|| BemError::BlockShape(format!("block column {} is empty", c)))
            })
            .collect::<Result<_, _>>()?;

        Ok(BlockMatrix::new(row_dims, col_dims, discrete))
    }
}

/// Assembled block system: discrete blocks plus offset bookkeeping.
#[derive(Debug, Clone)]
pub struct BlockMatrix {
    row_dims: Vec<usize>,
    col_dims: Vec<usize>,
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
    blocks: Vec<Option<DiscreteOperator>>,
}

impl BlockMatrix {
    fn new(row_dims: Vec<usize>, col_dims: Vec<usize>, blocks: Vec<Option<DiscreteOperator>>) -> Self {
        let offsets = |dims: &[usize]| {
            let mut out = Vec::with_capacity(dims.len() + 1);
            out.push(0);
            for &d in dims {
                out.push(out.last().copied().unwrap_or(0) + d);
            }
            out
        };
        let row_offsets = offsets(&row_dims);
        let col_offsets = offsets(&col_dims);
        Self {
            row_dims,
            col_dims,
            row_offsets,
            col_offsets,
            blocks,
        }
    }

    /// Row dimension of block row `r`.
    pub fn row_dim(&self, r: usize) -> usize {
        self.row_dims[r]
    }

    /// Column dimension of block column `c`.
    pub fn col_dim(&self, c: usize) -> usize {
        self.col_dims[c]
    }

    /// Concatenate into one dense matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.num_rows(), self.num_cols()));
        let cols = self.col_dims.len();
        for r in 0..self.row_dims.len() {
            for c in 0..cols {
                if let Some(block) = &self.blocks[r * cols + c] {
                    let dense = block.to_dense();
                    out.slice_mut(s![
                        self.row_offsets[r]..self.row_offsets[r + 1],
                        self.col_offsets[c]..self.col_offsets[c + 1]
                    ])
                    .assign(&dense);
                }
            }
        }
        out
    }
}

impl LinearOperator for BlockMatrix {
    fn num_rows(&self) -> usize {
        *self.row_offsets.last().unwrap_or(&0)
    }

    fn num_cols(&self) -> usize {
        *self.col_offsets.last().unwrap_or(&0)
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut y = Array1::zeros(self.num_rows());
        let cols = self.col_dims.len();
        for r in 0..self.row_dims.len() {
            for c in 0..cols {
                if let Some(block) = &self.blocks[r * cols + c] {
                    let xc = x.slice(s![self.col_offsets[c]..self.col_offsets[c + 1]]);
                    let yb = block.matvec(&xc.to_owned());
                    let mut yr = y.slice_mut(s![self.row_offsets[r]..self.row_offsets[r + 1]]);
                    yr += &yb;
                }
            }
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::AssemblyConfig;
    use crate::mesh::generators::generate_cube_mesh;
    use crate::mesh::{Mesh, SegmentSet};
    use crate::space::{FunctionSpace, SpaceConfig};
    use approx::assert_relative_eq;

    fn mesh() -> Arc<Mesh> {
        Arc::new(generate_cube_mesh(1).unwrap())
    }

    fn space(mesh: &Arc<Mesh>, order: usize) -> Arc<FunctionSpace> {
        Arc::new(
            FunctionSpace::new(
                mesh.clone(),
                SpaceConfig::continuous(order, SegmentSet::new(1..=6)),
            )
            .unwrap(),
        )
    }

    fn identity_op(s: &Arc<FunctionSpace>) -> Arc<BoundaryOperator> {
        Arc::new(BoundaryOperator::identity(s.clone(), s.clone(), s.clone()).unwrap())
    }

    #[test]
    fn test_block_apply_matches_dense() {
        let mesh = mesh();
        let p1 = space(&mesh, 1);
        let p2 = space(&mesh, 2);

        let mut grid = BlockOperator::new(2, 2);
        grid.set_block(0, 0, identity_op(&p1)).unwrap();
        grid.set_block(
            1,
            1,
            Arc::new(
                BoundaryOperator::single_layer(
                    p2.clone(),
                    p2.clone(),
                    p2.clone(),
                    AssemblyConfig::default(),
                )
                .unwrap(),
            ),
        )
        .unwrap();

        let block = grid.weak_form().unwrap();
        assert_eq!(block.num_rows(), p1.dof_count() + p2.dof_count());

        let dense = block.to_dense();
        let x = Array1::from_iter((0..block.num_cols()).map(|i| (i as f64 * 0.37).sin()));
        let ya = block.apply(&x);
        let yb = dense.dot(&x);
        for (a, b) in ya.iter().zip(yb.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_row_dimension_mismatch_rejected() {
        let mesh = mesh();
        let p1 = space(&mesh, 1);
        let p2 = space(&mesh, 2);

        // Row 0 mixes a p1-test block with a p2-test block
        let mut grid = BlockOperator::new(1, 2);
        grid.set_block(0, 0, identity_op(&p1)).unwrap();
        grid.set_block(0, 1, identity_op(&p2)).unwrap();

        let err = grid.weak_form().unwrap_err();
        assert!(matches!(err, BemError::BlockShape(_)));
        assert!(err.to_string().contains("(0, 1)"));
    }

    #[test]
    fn test_empty_row_rejected() {
        let mesh = mesh();
        let p1 = space(&mesh, 1);
        let mut grid = BlockOperator::new(2, 1);
        grid.set_block(0, 0, identity_op(&p1)).unwrap();
        let err = grid.weak_form().unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_out_of_bounds_position_rejected() {
        let mesh = mesh();
        let p1 = space(&mesh, 1);
        let mut grid = BlockOperator::new(2, 2);
        assert!(grid.set_block(2, 0, identity_op(&p1)).is_err());
    }
}
