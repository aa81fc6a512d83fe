//! Compressed Sparse Row (CSR) matrix format
//!
//! CSR format stores:
//! - `values`: non-zero entries in row-major order
//! - `col_indices`: column index for each value
//! - `row_ptrs`: index into values/col_indices where each row starts
//!
//! Used for the mass (identity-kernel) matrices of the BEM assembly, which
//! are non-zero only for dof pairs with overlapping support.

use crate::traits::LinearOperator;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Compressed Sparse Row matrix over `f64`.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows
    pub num_rows: usize,
    /// Number of columns
    pub num_cols: usize,
    /// Non-zero values in row-major order
    pub values: Vec<f64>,
    /// Column indices for each value
    pub col_indices: Vec<usize>,
    /// Row pointers; `row_ptrs[num_rows]` equals the number of non-zeros
    pub row_ptrs: Vec<usize>,
}

impl CsrMatrix {
    /// Create an empty matrix with the given shape.
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; num_rows + 1],
        }
    }

    /// Build a matrix from (row, col, value) triplets.
    ///
    /// Duplicate entries are summed, which matches the accumulation
    /// pattern of finite/boundary element assembly. Entries with magnitude
    /// below `drop_tol` after accumulation are dropped.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, f64)],
        drop_tol: f64,
    ) -> Self {
        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); num_rows];
        for &(r, c, v) in triplets {
            assert!(r < num_rows && c < num_cols, "triplet out of bounds");
            *rows[r].entry(c).or_insert(0.0) += v;
        }

        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);
        for row in &rows {
            for (&c, &v) in row {
                if v.abs() > drop_tol {
                    values.push(v);
                    col_indices.push(c);
                }
            }
            row_ptrs.push(values.len());
        }

        Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Identity matrix of size n.
    pub fn identity(n: usize) -> Self {
        Self {
            num_rows: n,
            num_cols: n,
            values: vec![1.0; n],
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
        }
    }

    /// Number of stored non-zeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Matrix-vector product y = A x.
    pub fn matvec(&self, x: &Array1<f64>) -> Array1<f64> {
        assert_eq!(x.len(), self.num_cols, "dimension mismatch in matvec");
        let mut y = Array1::zeros(self.num_rows);
        for r in 0..self.num_rows {
            let mut sum = 0.0;
            for k in self.row_ptrs[r]..self.row_ptrs[r + 1] {
                sum += self.values[k] * x[self.col_indices[k]];
            }
            y[r] = sum;
        }
        y
    }

    /// Convert to a dense matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.num_rows, self.num_cols));
        for r in 0..self.num_rows {
            for k in self.row_ptrs[r]..self.row_ptrs[r + 1] {
                dense[[r, self.col_indices[k]]] = self.values[k];
            }
        }
        dense
    }
}

impl LinearOperator for CsrMatrix {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matvec(x)
    }
}
