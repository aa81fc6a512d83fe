//! Surface mesh, segment model, and flat-element geometry
//!
//! The mesh is a closed triangulated surface. Every element carries exactly
//! one segment identifier; segment identifiers partition the surface into
//! disjoint user-defined subsets. The mesh is immutable after construction
//! and shared between function spaces via `Arc`, so derived topology
//! (edge numbering, adjacency) is computed once here.

pub mod generators;

use crate::error::BemError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A set of segment identifiers selecting a sub-domain of the surface.
///
/// Stored sorted and deduplicated so that equal selections compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSet(Vec<usize>);

impl SegmentSet {
    /// Create a segment set from any collection of segment ids.
    pub fn new(ids: impl IntoIterator<Item = usize>) -> Self {
        let mut v: Vec<usize> = ids.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }

    /// Whether the set contains the given segment id.
    pub fn contains(&self, id: usize) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Iterate over the segment ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Number of segment ids in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this set shares no segment id with `other`.
    pub fn is_disjoint_from(&self, other: &SegmentSet) -> bool {
        self.0.iter().all(|id| !other.contains(*id))
    }
}

impl From<&[usize]> for SegmentSet {
    fn from(ids: &[usize]) -> Self {
        Self::new(ids.iter().copied())
    }
}

/// Closed triangulated surface mesh with per-element segment labels.
#[derive(Debug)]
pub struct Mesh {
    vertices: Array2<f64>,
    triangles: Vec<[usize; 3]>,
    segments: Vec<usize>,
    segment_ids: BTreeSet<usize>,

    // Topology, derived once
    edges: Vec<[usize; 2]>,
    element_edges: Vec<[usize; 3]>,
    edge_elements: Vec<Vec<usize>>,
    vertex_elements: Vec<Vec<usize>>,

    // Flat-element geometry, derived once
    areas: Vec<f64>,
    normals: Vec<[f64; 3]>,
    centroids: Vec<[f64; 3]>,
    diameters: Vec<f64>,
    tangents: Vec<[[f64; 3]; 2]>,
    grad_transform: Vec<[[f64; 3]; 2]>,
    metric_inv: Vec<[[f64; 2]; 2]>,
}

impl Mesh {
    /// Build a mesh from vertex coordinates (nv×3), triangle connectivity,
    /// and per-element segment labels.
    ///
    /// Fails if the connectivity is out of bounds, an element is degenerate,
    /// or the surface is not closed (an edge bordered by other than exactly
    /// two elements).
    pub fn new(
        vertices: Array2<f64>,
        triangles: Vec<[usize; 3]>,
        segments: Vec<usize>,
    ) -> Result<Self, BemError> {
        if vertices.ncols() != 3 {
            return Err(BemError::Mesh(format!(
                "vertex array must have 3 columns, got {}",
                vertices.ncols()
            )));
        }
        if triangles.len() != segments.len() {
            return Err(BemError::Mesh(format!(
                "{} elements but {} segment labels",
                triangles.len(),
                segments.len()
            )));
        }
        let nv = vertices.nrows();
        for (e, tri) in triangles.iter().enumerate() {
            for &v in tri {
                if v >= nv {
                    return Err(BemError::Mesh(format!(
                        "element {} references vertex {} (mesh has {})",
                        e, v, nv
                    )));
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(BemError::Mesh(format!("element {} repeats a vertex", e)));
            }
        }

        // Edge numbering: local edge i of a triangle connects vertex i to
        // vertex (i+1) % 3, matching the P2 basis ordering.
        let mut edge_index: HashMap<[usize; 2], usize> = HashMap::new();
        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut element_edges: Vec<[usize; 3]> = Vec::with_capacity(triangles.len());
        let mut edge_elements: Vec<Vec<usize>> = Vec::new();
        let mut vertex_elements: Vec<Vec<usize>> = vec![Vec::new(); nv];

        for (e, tri) in triangles.iter().enumerate() {
            let mut ids = [0usize; 3];
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                let key = if a < b { [a, b] } else { [b, a] };
                let id = *edge_index.entry(key).or_insert_with(|| {
                    edges.push(key);
                    edge_elements.push(Vec::new());
                    edges.len() - 1
                });
                ids[i] = id;
                edge_elements[id].push(e);
            }
            element_edges.push(ids);
            for &v in tri {
                vertex_elements[v].push(e);
            }
        }

        for (id, els) in edge_elements.iter().enumerate() {
            if els.len() != 2 {
                return Err(BemError::Mesh(format!(
                    "surface is not closed: edge {} ({:?}) borders {} element(s)",
                    id,
                    edges[id],
                    els.len()
                )));
            }
        }

        // Per-element flat geometry
        let ne = triangles.len();
        let mut areas = Vec::with_capacity(ne);
        let mut normals = Vec::with_capacity(ne);
        let mut centroids = Vec::with_capacity(ne);
        let mut diameters = Vec::with_capacity(ne);
        let mut tangents = Vec::with_capacity(ne);
        let mut grad_transform = Vec::with_capacity(ne);
        let mut metric_inv = Vec::with_capacity(ne);

        for (e, tri) in triangles.iter().enumerate() {
            let p0 = row3(&vertices, tri[0]);
            let p1 = row3(&vertices, tri[1]);
            let p2 = row3(&vertices, tri[2]);
            let a = sub3(p1, p0);
            let b = sub3(p2, p0);
            let cr = cross3(a, b);
            let double_area = norm3(cr);
            if double_area < 1e-14 {
                return Err(BemError::Mesh(format!("element {} is degenerate", e)));
            }
            areas.push(0.5 * double_area);
            normals.push(scale3(cr, 1.0 / double_area));
            centroids.push([
                (p0[0] + p1[0] + p2[0]) / 3.0,
                (p0[1] + p1[1] + p2[1]) / 3.0,
                (p0[2] + p1[2] + p2[2]) / 3.0,
            ]);
            let c = sub3(p2, p1);
            diameters.push(norm3(a).max(norm3(b)).max(norm3(c)));
            tangents.push([a, b]);

            // First fundamental form and its inverse, for surface gradients
            // and for mapping global points back to reference coordinates.
            let g00 = dot3(a, a);
            let g01 = dot3(a, b);
            let g11 = dot3(b, b);
            let det = g00 * g11 - g01 * g01;
            let inv = [[g11 / det, -g01 / det], [-g01 / det, g00 / det]];
            metric_inv.push(inv);
            grad_transform.push([
                add3(scale3(a, inv[0][0]), scale3(b, inv[1][0])),
                add3(scale3(a, inv[0][1]), scale3(b, inv[1][1])),
            ]);
        }

        let segment_ids: BTreeSet<usize> = segments.iter().copied().collect();

        Ok(Self {
            vertices,
            triangles,
            segments,
            segment_ids,
            edges,
            element_edges,
            edge_elements,
            vertex_elements,
            areas,
            normals,
            centroids,
            diameters,
            tangents,
            grad_transform,
            metric_inv,
        })
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    /// Number of elements.
    pub fn num_elements(&self) -> usize {
        self.triangles.len()
    }

    /// Number of (undirected) edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Vertex coordinate array (nv×3).
    pub fn vertices(&self) -> &Array2<f64> {
        &self.vertices
    }

    /// Connectivity of element `e`.
    pub fn triangle(&self, e: usize) -> [usize; 3] {
        self.triangles[e]
    }

    /// Segment label of element `e`.
    pub fn segment(&self, e: usize) -> usize {
        self.segments[e]
    }

    /// All segment identifiers present in the mesh.
    pub fn segment_ids(&self) -> &BTreeSet<usize> {
        &self.segment_ids
    }

    /// Global edge ids of element `e`, in local edge order.
    pub fn element_edges(&self, e: usize) -> [usize; 3] {
        self.element_edges[e]
    }

    /// Elements adjacent to edge `edge` (exactly two for a closed surface).
    pub fn edge_elements(&self, edge: usize) -> &[usize] {
        &self.edge_elements[edge]
    }

    /// Elements incident to vertex `v`.
    pub fn vertex_elements(&self, v: usize) -> &[usize] {
        &self.vertex_elements[v]
    }

    /// Area of element `e`.
    pub fn area(&self, e: usize) -> f64 {
        self.areas[e]
    }

    /// Unit outward normal of element `e`.
    pub fn normal(&self, e: usize) -> [f64; 3] {
        self.normals[e]
    }

    /// Centroid of element `e`.
    pub fn centroid(&self, e: usize) -> [f64; 3] {
        self.centroids[e]
    }

    /// Longest edge length of element `e`.
    pub fn diameter(&self, e: usize) -> f64 {
        self.diameters[e]
    }

    /// Surface-gradient transform of element `e`: the physical gradient of
    /// a reference function φ(ξ,η) is `gt[0]·∂φ/∂ξ + gt[1]·∂φ/∂η`.
    pub fn grad_transform(&self, e: usize) -> [[f64; 3]; 2] {
        self.grad_transform[e]
    }

    /// Map reference coordinates (ξ,η) on element `e` to a global point.
    pub fn point_at(&self, e: usize, xi: f64, eta: f64) -> [f64; 3] {
        let p0 = row3(&self.vertices, self.triangles[e][0]);
        let [a, b] = self.tangents[e];
        [
            p0[0] + xi * a[0] + eta * b[0],
            p0[1] + xi * a[1] + eta * b[1],
            p0[2] + xi * a[2] + eta * b[2],
        ]
    }

    /// Project a global point onto element `e` and return its reference
    /// coordinates (ξ,η). The point is not clamped to the triangle.
    pub fn global_to_reference(&self, e: usize, p: [f64; 3]) -> (f64, f64) {
        let p0 = row3(&self.vertices, self.triangles[e][0]);
        let [a, b] = self.tangents[e];
        let d = sub3(p, p0);
        let rhs = [dot3(a, d), dot3(b, d)];
        let inv = self.metric_inv[e];
        (
            inv[0][0] * rhs[0] + inv[0][1] * rhs[1],
            inv[1][0] * rhs[0] + inv[1][1] * rhs[1],
        )
    }

    /// Check that every id of `set` exists in the mesh.
    pub fn validate_segments(&self, set: &SegmentSet) -> Result<(), BemError> {
        for id in set.iter() {
            if !self.segment_ids.contains(&id) {
                return Err(BemError::Segments(format!(
                    "segment {} does not exist in the mesh (known: {:?})",
                    id, self.segment_ids
                )));
            }
        }
        Ok(())
    }

    /// Ids of all elements whose segment label belongs to `set`, ascending.
    pub fn elements_in(&self, set: &SegmentSet) -> Vec<usize> {
        (0..self.num_elements())
            .filter(|&e| set.contains(self.segments[e]))
            .collect()
    }

    /// Edges shared between an element inside `set` and an element outside
    /// it. Empty when the set covers the whole surface.
    pub fn boundary_edges(&self, set: &SegmentSet) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for (id, els) in self.edge_elements.iter().enumerate() {
            let inside = els.iter().filter(|&&e| set.contains(self.segments[e])).count();
            if inside > 0 && inside < els.len() {
                out.insert(id);
            }
        }
        out
    }
}

// Small fixed-size vector helpers for the hot geometry paths.

#[inline]
pub(crate) fn row3(a: &Array2<f64>, i: usize) -> [f64; 3] {
    [a[[i, 0]], a[[i, 1]], a[[i, 2]]]
}

#[inline]
pub(crate) fn sub3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn add3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub(crate) fn scale3(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub(crate) fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm3(a: [f64; 3]) -> f64 {
    dot3(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Regular tetrahedron: the smallest closed triangulated surface.
    fn tetrahedron() -> Mesh {
        let vertices = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        // Outward-oriented faces
        let triangles = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];
        let segments = vec![1, 2, 3, 4];
        Mesh::new(vertices, triangles, segments).unwrap()
    }

    #[test]
    fn test_tetrahedron_topology() {
        let mesh = tetrahedron();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_elements(), 4);
        assert_eq!(mesh.num_edges(), 6);
        for edge in 0..mesh.num_edges() {
            assert_eq!(mesh.edge_elements(edge).len(), 2);
        }
    }

    #[test]
    fn test_open_surface_rejected() {
        let vertices = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let err = Mesh::new(vertices, vec![[0, 1, 2]], vec![1]).unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn test_geometry() {
        let mesh = tetrahedron();
        // Face 0 lies in the z = 0 plane with downward normal
        assert_relative_eq!(mesh.area(0), 0.5);
        let n = mesh.normal(0);
        assert_relative_eq!(n[2], -1.0, epsilon = 1e-14);

        let p = mesh.point_at(0, 1.0 / 3.0, 1.0 / 3.0);
        let c = mesh.centroid(0);
        for i in 0..3 {
            assert_relative_eq!(p[i], c[i], epsilon = 1e-14);
        }
        let (xi, eta) = mesh.global_to_reference(0, c);
        assert_relative_eq!(xi, 1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(eta, 1.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_segment_model() {
        let mesh = tetrahedron();
        let set = SegmentSet::new([1, 2]);
        assert_eq!(mesh.elements_in(&set), vec![0, 1]);

        // Faces {1,2} share one edge with each other; the interface with
        // {3,4} consists of the remaining four outer edges.
        let boundary = mesh.boundary_edges(&set);
        assert_eq!(boundary.len(), 4);

        let all = SegmentSet::new([1, 2, 3, 4]);
        assert!(mesh.boundary_edges(&all).is_empty());
    }

    #[test]
    fn test_unknown_segment_rejected() {
        let mesh = tetrahedron();
        assert!(mesh.validate_segments(&SegmentSet::new([7])).is_err());
    }

    #[test]
    fn test_segment_set_ops() {
        let a = SegmentSet::new([3, 1, 3]);
        assert_eq!(a.len(), 2);
        assert!(a.contains(1));
        assert!(a.is_disjoint_from(&SegmentSet::new([2, 4])));
        assert!(!a.is_disjoint_from(&SegmentSet::new([3])));
    }
}
