//! Mesh generators for analytical test geometries
//!
//! Provides the unit-cube surface used by the mixed boundary value
//! scenario: six faces, one segment identifier per face, so Dirichlet and
//! Neumann segment sets can be formed from face subsets.

use super::Mesh;
use crate::error::BemError;
use ndarray::Array2;
use std::collections::HashMap;

/// Face descriptors: lattice origin, u axis, v axis, segment id.
/// Axes are ordered so that u×v is the outward normal of each face.
const CUBE_FACES: [([usize; 3], [usize; 3], [usize; 3], usize); 6] = [
    ([0, 0, 0], [0, 1, 0], [1, 0, 0], 1), // z = 0
    ([0, 0, 1], [1, 0, 0], [0, 1, 0], 2), // z = 1
    ([0, 0, 0], [0, 0, 1], [0, 1, 0], 3), // x = 0
    ([1, 0, 0], [0, 1, 0], [0, 0, 1], 4), // x = 1
    ([0, 0, 0], [1, 0, 0], [0, 0, 1], 5), // y = 0
    ([0, 1, 0], [0, 0, 1], [1, 0, 0], 6), // y = 1
];

/// Generate the surface mesh of the unit cube [0,1]³ with `n` subdivisions
/// per edge.
///
/// Each face is an n×n grid of quads split into two triangles, labeled with
/// segment ids 1..=6 in the order bottom (z=0), top (z=1), x=0, x=1, y=0,
/// y=1. Vertices on face boundaries are shared, so the surface is closed.
///
/// # Example
/// ```
/// use laplace_bem::mesh::generators::generate_cube_mesh;
/// let mesh = generate_cube_mesh(2).unwrap();
/// assert_eq!(mesh.num_elements(), 48);
/// ```
pub fn generate_cube_mesh(n: usize) -> Result<Mesh, BemError> {
    if n == 0 {
        return Err(BemError::Mesh(
            "cube subdivision count must be at least 1".into(),
        ));
    }

    // Deduplicate shared vertices through exact integer lattice keys.
    let mut vertex_ids: HashMap<[usize; 3], usize> = HashMap::new();
    let mut coords: Vec<[f64; 3]> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::new();
    let mut segments: Vec<usize> = Vec::new();

    let h = 1.0 / n as f64;

    for &(origin, u, v, segment) in &CUBE_FACES {
        let lattice = |i: usize, j: usize| -> [usize; 3] {
            [
                origin[0] * n + i * u[0] + j * v[0],
                origin[1] * n + i * u[1] + j * v[1],
                origin[2] * n + i * u[2] + j * v[2],
            ]
        };
        let mut id_of = |key: [usize; 3], coords: &mut Vec<[f64; 3]>| -> usize {
            *vertex_ids.entry(key).or_insert_with(|| {
                coords.push([key[0] as f64 * h, key[1] as f64 * h, key[2] as f64 * h]);
                coords.len() - 1
            })
        };

        for i in 0..n {
            for j in 0..n {
                let p00 = id_of(lattice(i, j), &mut coords);
                let p10 = id_of(lattice(i + 1, j), &mut coords);
                let p11 = id_of(lattice(i + 1, j + 1), &mut coords);
                let p01 = id_of(lattice(i, j + 1), &mut coords);

                triangles.push([p00, p10, p11]);
                triangles.push([p00, p11, p01]);
                segments.push(segment);
                segments.push(segment);
            }
        }
    }

    let nv = coords.len();
    let mut vertices = Array2::zeros((nv, 3));
    for (i, c) in coords.iter().enumerate() {
        for k in 0..3 {
            vertices[[i, k]] = c[k];
        }
    }

    Mesh::new(vertices, triangles, segments)
}
