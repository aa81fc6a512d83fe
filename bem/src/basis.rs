//! Lagrange basis functions on the reference triangle
//!
//! Supports polynomial orders 0 to 2 on the reference triangle with
//! vertices (0,0), (1,0), (0,1). Order 2 dofs are ordered vertices first,
//! then edge midpoints (0-1), (1-2), (2-0), matching the local edge
//! numbering of the mesh. The same shape functions serve both continuous
//! spaces (dofs shared across elements) and discontinuous spaces (dofs
//! private to each element).

use serde::{Deserialize, Serialize};

/// Inter-element continuity of a function space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuity {
    /// One private dof set per element, no sharing
    Discontinuous,
    /// Dofs shared across elements at matching vertices and edges
    Continuous,
}

/// Maximum number of basis functions per element (order 2).
pub const MAX_BASIS: usize = 6;

/// Number of basis functions on a triangle for the given order.
///
/// Panics on orders above 2; space construction rejects those first.
pub fn num_basis(order: usize) -> usize {
    match order {
        0 => 1,
        1 => 3,
        2 => 6,
        _ => panic!("unsupported polynomial order {}", order),
    }
}

/// Evaluate all basis functions at reference coordinates (ξ,η).
///
/// Entries past `num_basis(order)` are zero.
pub fn shape_values(order: usize, xi: f64, eta: f64) -> [f64; MAX_BASIS] {
    let mut out = [0.0; MAX_BASIS];
    match order {
        0 => out[0] = 1.0,
        1 => {
            out[0] = 1.0 - xi - eta;
            out[1] = xi;
            out[2] = eta;
        }
        2 => {
            let l0 = 1.0 - xi - eta;
            let l1 = xi;
            let l2 = eta;
            out[0] = l0 * (2.0 * l0 - 1.0);
            out[1] = l1 * (2.0 * l1 - 1.0);
            out[2] = l2 * (2.0 * l2 - 1.0);
            out[3] = 4.0 * l0 * l1;
            out[4] = 4.0 * l1 * l2;
            out[5] = 4.0 * l2 * l0;
        }
        _ => panic!("unsupported polynomial order {}", order),
    }
    out
}

/// Evaluate all basis function gradients (∂/∂ξ, ∂/∂η) at (ξ,η).
pub fn shape_gradients(order: usize, xi: f64, eta: f64) -> [[f64; 2]; MAX_BASIS] {
    let mut out = [[0.0; 2]; MAX_BASIS];
    match order {
        0 => {}
        1 => {
            out[0] = [-1.0, -1.0];
            out[1] = [1.0, 0.0];
            out[2] = [0.0, 1.0];
        }
        2 => {
            let l0 = 1.0 - xi - eta;
            let l1 = xi;
            let l2 = eta;
            out[0] = [1.0 - 4.0 * l0, 1.0 - 4.0 * l0];
            out[1] = [4.0 * l1 - 1.0, 0.0];
            out[2] = [0.0, 4.0 * l2 - 1.0];
            out[3] = [4.0 * (l0 - l1), -4.0 * l1];
            out[4] = [4.0 * l2, 4.0 * l1];
            out[5] = [-4.0 * l2, 4.0 * (l0 - l2)];
        }
        _ => panic!("unsupported polynomial order {}", order),
    }
    out
}

/// Reference points defining each dof: the point where the corresponding
/// nodal basis function equals one.
pub fn reference_points(order: usize) -> &'static [[f64; 2]] {
    const P0: [[f64; 2]; 1] = [[1.0 / 3.0, 1.0 / 3.0]];
    const P1: [[f64; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    const P2: [[f64; 2]; 6] = [
        [0.0, 0.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [0.5, 0.0],
        [0.5, 0.5],
        [0.0, 0.5],
    ];
    match order {
        0 => &P0,
        1 => &P1,
        2 => &P2,
        _ => panic!("unsupported polynomial order {}", order),
    }
}
