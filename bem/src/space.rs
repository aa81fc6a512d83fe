//! Segment-restricted discrete function spaces
//!
//! The central abstraction of the solver. A function space is determined by
//! a polynomial order, a continuity choice, the segment set it is
//! restricted to, and four boundary-inclusion flags. Dofs straddling the
//! interface between complementary segment sets must land on exactly one
//! side, with no double counting and no gaps; the flags control that
//! assignment.
//!
//! Construction runs an explicit classification step (every candidate dof
//! is `Interior` or `Boundary` relative to the domain) followed by a
//! declarative inclusion rule, so the combinatorics stay auditable:
//!
//! | `closed` | `reference_point_on_segment` | boundary dofs |
//! |---|---|---|
//! | true  | –     | included |
//! | false | true  | excluded |
//! | false | false | included when the (clipped) support lies inside |
//!
//! Interior dofs are always included.

use crate::basis::{self, Continuity, MAX_BASIS};
use crate::error::BemError;
use crate::mesh::{Mesh, SegmentSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Mesh-level identity of a degree of freedom.
///
/// Spaces built on the same mesh share these identities, which is what
/// makes coefficient vectors from segment-restricted spaces embeddable
/// into full-surface spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DofKey {
    /// Dof shared at a mesh vertex (continuous spaces)
    Vertex(usize),
    /// Dof shared at an edge midpoint (continuous order 2)
    Edge(usize),
    /// Dof private to one element (discontinuous spaces)
    Element {
        /// Owning element
        element: usize,
        /// Local basis index within the element
        local: usize,
    },
}

/// Location of a candidate dof relative to the restricted domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DofLocation {
    Interior,
    Boundary,
}

/// Configuration of a function space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Polynomial order (0 to 2)
    pub order: usize,
    /// Inter-element continuity
    pub continuity: Continuity,
    /// Segment set the space is restricted to
    pub domain: SegmentSet,
    /// Include dofs located exactly on the domain boundary
    pub closed: bool,
    /// Clip basis support to elements inside the domain
    pub element_on_segment: bool,
    /// When `closed` is false: require the dof reference point strictly
    /// inside the domain. When false instead, dofs whose reference point
    /// sits on the excluded boundary are kept as long as their (clipped)
    /// support lies inside the domain.
    pub reference_point_on_segment: bool,
    /// For continuous spaces: truncate basis support at the segment edge
    /// instead of letting boundary basis functions extend into adjacent
    /// exterior elements
    pub strictly_on_segment: bool,
}

impl SpaceConfig {
    /// Continuous space of the given order over a segment set, with the
    /// default flags (closed, untruncated support).
    pub fn continuous(order: usize, domain: SegmentSet) -> Self {
        Self {
            order,
            continuity: Continuity::Continuous,
            domain,
            closed: true,
            element_on_segment: false,
            reference_point_on_segment: true,
            strictly_on_segment: false,
        }
    }

    /// Discontinuous space of the given order over a segment set. Support
    /// is always element-local for discontinuous bases.
    pub fn discontinuous(order: usize, domain: SegmentSet) -> Self {
        Self {
            order,
            continuity: Continuity::Discontinuous,
            domain,
            closed: true,
            element_on_segment: true,
            reference_point_on_segment: true,
            strictly_on_segment: false,
        }
    }

    /// Set the `closed` flag.
    pub fn with_closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Set the `element_on_segment` flag.
    pub fn with_element_on_segment(mut self, flag: bool) -> Self {
        self.element_on_segment = flag;
        self
    }

    /// Set the `reference_point_on_segment` flag.
    pub fn with_reference_point_on_segment(mut self, flag: bool) -> Self {
        self.reference_point_on_segment = flag;
        self
    }

    /// Set the `strictly_on_segment` flag.
    pub fn with_strictly_on_segment(mut self, flag: bool) -> Self {
        self.strictly_on_segment = flag;
        self
    }
}

/// One element of a space's support with its local-to-global dof table.
///
/// `dofs[local]` is `None` when the corresponding basis function was
/// excluded or truncated by the space configuration.
#[derive(Debug, Clone)]
pub struct SupportElement {
    /// Mesh element id
    pub element: usize,
    /// Local basis index → space dof index
    pub dofs: [Option<usize>; MAX_BASIS],
}

/// A discrete function space restricted to a segment set.
///
/// Immutable once built; cheap to share. Holds only dof metadata and a
/// reference to the mesh, never mesh data itself.
#[derive(Debug)]
pub struct FunctionSpace {
    mesh: Arc<Mesh>,
    config: SpaceConfig,
    dof_keys: Vec<DofKey>,
    key_to_index: HashMap<DofKey, usize>,
    dof_points: Vec<(usize, f64, f64)>,
    support: Vec<SupportElement>,
    support_index: HashMap<usize, usize>,
}

impl FunctionSpace {
    /// Build a function space on `mesh` according to `config`.
    ///
    /// Fails on unknown segment ids, unsupported orders, empty domains,
    /// and flag combinations that leave the space without any dof.
    pub fn new(mesh: Arc<Mesh>, config: SpaceConfig) -> Result<Self, BemError> {
        if config.order > 2 {
            return Err(BemError::Space(format!(
                "polynomial order {} not supported (max 2)",
                config.order
            )));
        }
        if config.continuity == Continuity::Continuous && config.order == 0 {
            return Err(BemError::Space(
                "continuous spaces require order >= 1".into(),
            ));
        }
        mesh.validate_segments(&config.domain)?;

        let domain_elements = mesh.elements_in(&config.domain);
        if domain_elements.is_empty() {
            return Err(BemError::Space(format!(
                "domain {:?} selects no elements",
                config.domain
            )));
        }
        let mut in_domain = vec![false; mesh.num_elements()];
        for &e in &domain_elements {
            in_domain[e] = true;
        }
        let boundary_edges = mesh.boundary_edges(&config.domain);

        let vertex_location = |v: usize| -> DofLocation {
            if mesh.vertex_elements(v).iter().all(|&e| in_domain[e]) {
                DofLocation::Interior
            } else {
                DofLocation::Boundary
            }
        };
        let edge_location = |id: usize| -> DofLocation {
            if boundary_edges.contains(&id) {
                DofLocation::Boundary
            } else {
                DofLocation::Interior
            }
        };

        let nb = basis::num_basis(config.order);
        let ref_points = basis::reference_points(config.order);

        let mut dof_keys: Vec<DofKey> = Vec::new();
        let mut key_to_index: HashMap<DofKey, usize> = HashMap::new();
        let mut dof_points: Vec<(usize, f64, f64)> = Vec::new();
        let mut tables: HashMap<usize, [Option<usize>; MAX_BASIS]> = HashMap::new();

        // Pass 1: enumerate and classify candidate dofs on domain elements.
        for &e in &domain_elements {
            let tri = mesh.triangle(e);
            let edges = mesh.element_edges(e);
            let mut table = [None; MAX_BASIS];

            for local in 0..nb {
                let key = dof_key(config.continuity, config.order, e, local, &tri, &edges);
                if let Some(&idx) = key_to_index.get(&key) {
                    table[local] = Some(idx);
                    continue;
                }

                // Classify the dof's reference point relative to the domain
                // boundary. Element-interior points are always interior.
                let location = match key {
                    DofKey::Vertex(v) => vertex_location(v),
                    DofKey::Edge(id) => edge_location(id),
                    DofKey::Element { .. } => match (config.order, local) {
                        (0, _) => DofLocation::Interior,
                        (_, l) if l < 3 => vertex_location(tri[l]),
                        (_, l) => edge_location(edges[l - 3]),
                    },
                };

                // Whether the (possibly clipped) basis support stays inside
                // the domain; discontinuous supports are element-local and
                // clipping flags force the same for continuous bases.
                let support_inside = match config.continuity {
                    Continuity::Discontinuous => true,
                    Continuity::Continuous => {
                        config.element_on_segment
                            || config.strictly_on_segment
                            || location == DofLocation::Interior
                    }
                };

                let include = match location {
                    DofLocation::Interior => true,
                    DofLocation::Boundary => {
                        if config.closed {
                            true
                        } else if !config.reference_point_on_segment {
                            support_inside
                        } else {
                            false
                        }
                    }
                };

                if include {
                    let idx = dof_keys.len();
                    dof_keys.push(key);
                    key_to_index.insert(key, idx);
                    dof_points.push((e, ref_points[local][0], ref_points[local][1]));
                    table[local] = Some(idx);
                }
            }
            tables.insert(e, table);
        }

        if dof_keys.is_empty() {
            return Err(BemError::Space(format!(
                "space has no dofs on domain {:?} (closed={}, element_on_segment={}, \
                 reference_point_on_segment={}, strictly_on_segment={})",
                config.domain,
                config.closed,
                config.element_on_segment,
                config.reference_point_on_segment,
                config.strictly_on_segment
            )));
        }

        // Pass 2: continuous spaces with untruncated support keep basis
        // functions of included boundary dofs alive on adjacent exterior
        // elements. Required for the trace-space semantics of closed
        // segment spaces.
        if config.continuity == Continuity::Continuous
            && !config.element_on_segment
            && !config.strictly_on_segment
        {
            let exterior: Vec<usize> = dof_keys
                .iter()
                .flat_map(|key| match *key {
                    DofKey::Vertex(v) => mesh.vertex_elements(v).to_vec(),
                    DofKey::Edge(id) => mesh.edge_elements(id).to_vec(),
                    DofKey::Element { .. } => Vec::new(),
                })
                .filter(|&e| !in_domain[e])
                .collect();

            for e in exterior {
                if tables.contains_key(&e) {
                    continue;
                }
                let tri = mesh.triangle(e);
                let edges = mesh.element_edges(e);
                let mut table = [None; MAX_BASIS];
                for local in 0..nb {
                    let key = dof_key(config.continuity, config.order, e, local, &tri, &edges);
                    table[local] = key_to_index.get(&key).copied();
                }
                if table.iter().any(|d| d.is_some()) {
                    tables.insert(e, table);
                }
            }
        }

        let mut support: Vec<SupportElement> = tables
            .into_iter()
            .map(|(element, dofs)| SupportElement { element, dofs })
            .collect();
        support.sort_by_key(|s| s.element);
        let support_index = support
            .iter()
            .enumerate()
            .map(|(i, s)| (s.element, i))
            .collect();

        Ok(Self {
            mesh,
            config,
            dof_keys,
            key_to_index,
            dof_points,
            support,
            support_index,
        })
    }

    /// Number of degrees of freedom.
    pub fn dof_count(&self) -> usize {
        self.dof_keys.len()
    }

    /// Mesh-level identity of dof `i`.
    pub fn dof_key(&self, i: usize) -> DofKey {
        self.dof_keys[i]
    }

    /// Index of the dof with the given mesh-level identity, if present.
    pub fn index_of(&self, key: DofKey) -> Option<usize> {
        self.key_to_index.get(&key).copied()
    }

    /// A representative (element, ξ, η) location for dof `i`: the element
    /// that introduced the dof and the basis reference point there.
    pub fn dof_point(&self, i: usize) -> (usize, f64, f64) {
        self.dof_points[i]
    }

    /// Elements carrying basis support, with local-to-global dof tables,
    /// sorted by element id.
    pub fn support(&self) -> &[SupportElement] {
        &self.support
    }

    /// Support entry for a specific mesh element, if the space has basis
    /// support there.
    pub fn support_for(&self, element: usize) -> Option<&SupportElement> {
        self.support_index.get(&element).map(|&i| &self.support[i])
    }

    /// The mesh this space is built on.
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// The configuration this space was built from.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Polynomial order of the basis.
    pub fn order(&self) -> usize {
        self.config.order
    }

    /// Continuity of the basis.
    pub fn continuity(&self) -> Continuity {
        self.config.continuity
    }

    /// Whether two spaces reference the same mesh instance.
    pub fn same_mesh(&self, other: &FunctionSpace) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh)
    }
}

/// Mesh-level dof identity for local basis index `local` on element `e`.
fn dof_key(
    continuity: Continuity,
    order: usize,
    e: usize,
    local: usize,
    tri: &[usize; 3],
    edges: &[usize; 3],
) -> DofKey {
    match continuity {
        Continuity::Discontinuous => DofKey::Element { element: e, local },
        Continuity::Continuous => {
            if order == 1 || local < 3 {
                DofKey::Vertex(tri[local])
            } else {
                DofKey::Edge(edges[local - 3])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::generate_cube_mesh;

    fn cube(n: usize) -> Arc<Mesh> {
        Arc::new(generate_cube_mesh(n).unwrap())
    }

    fn all_segments() -> SegmentSet {
        SegmentSet::new(1..=6)
    }

    #[test]
    fn test_global_space_dof_counts() {
        let mesh = cube(1);
        // P1: one dof per vertex
        let p1 = FunctionSpace::new(mesh.clone(), SpaceConfig::continuous(1, all_segments()))
            .unwrap();
        assert_eq!(p1.dof_count(), 8);

        // P2: vertices + edge midpoints
        let p2 = FunctionSpace::new(mesh.clone(), SpaceConfig::continuous(2, all_segments()))
            .unwrap();
        assert_eq!(p2.dof_count(), 26);

        // DP0 / DP1: per-element dofs
        let dp0 = FunctionSpace::new(mesh.clone(), SpaceConfig::discontinuous(0, all_segments()))
            .unwrap();
        assert_eq!(dp0.dof_count(), 12);
        let dp1 =
            FunctionSpace::new(mesh, SpaceConfig::discontinuous(1, all_segments())).unwrap();
        assert_eq!(dp1.dof_count(), 36);
    }

    #[test]
    fn test_segment_space_closed_vs_open() {
        let mesh = cube(1);
        let face = SegmentSet::new([1]);

        // Face 1 of the unit cube: 2 triangles, 4 vertices, 5 edges.
        // Closed P2 space owns all of them.
        let closed =
            FunctionSpace::new(mesh.clone(), SpaceConfig::continuous(2, face.clone())).unwrap();
        assert_eq!(closed.dof_count(), 9);

        // Open space keeps only the diagonal edge midpoint; every vertex
        // and outer edge lies on the face boundary.
        let open = FunctionSpace::new(
            mesh,
            SpaceConfig::continuous(2, face).with_closed(false),
        )
        .unwrap();
        assert_eq!(open.dof_count(), 1);
        assert!(open.dof_count() < closed.dof_count());
    }

    #[test]
    fn test_discontinuous_boundary_flags() {
        let mesh = cube(1);
        let face = SegmentSet::new([1]);

        // DP1 closed: three private dofs per element
        let closed =
            FunctionSpace::new(mesh.clone(), SpaceConfig::discontinuous(1, face.clone()))
                .unwrap();
        assert_eq!(closed.dof_count(), 6);

        // Open with the reference-point requirement dropped: supports are
        // element-local and inside, so all dofs survive
        let open_support = FunctionSpace::new(
            mesh.clone(),
            SpaceConfig::discontinuous(1, face.clone())
                .with_closed(false)
                .with_reference_point_on_segment(false),
        )
        .unwrap();
        assert_eq!(open_support.dof_count(), 6);

        // Open with the requirement kept: every DP1 reference point of this
        // face sits on its boundary, leaving no dofs
        let err = FunctionSpace::new(
            mesh,
            SpaceConfig::discontinuous(1, face).with_closed(false),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no dofs"));
    }

    #[test]
    fn test_support_extension_and_truncation() {
        let mesh = cube(1);
        let face = SegmentSet::new([1]);

        // Closed, untruncated: boundary basis functions extend into the
        // adjacent side-face elements
        let extended =
            FunctionSpace::new(mesh.clone(), SpaceConfig::continuous(2, face.clone())).unwrap();
        assert_eq!(extended.support().len(), 10);

        // Truncated at the segment edge: support stays on the face
        let truncated = FunctionSpace::new(
            mesh,
            SpaceConfig::continuous(2, face).with_strictly_on_segment(true),
        )
        .unwrap();
        assert_eq!(truncated.support().len(), 2);
        // Same dof layout either way
        assert_eq!(truncated.dof_count(), extended.dof_count());
        for i in 0..truncated.dof_count() {
            assert_eq!(truncated.dof_key(i), extended.dof_key(i));
        }
    }

    #[test]
    fn test_unknown_segment_is_config_error() {
        let mesh = cube(1);
        let err = FunctionSpace::new(mesh, SpaceConfig::continuous(1, SegmentSet::new([9])))
            .unwrap_err();
        assert!(matches!(err, BemError::Segments(_)));
    }

    #[test]
    fn test_continuous_order_zero_rejected() {
        let mesh = cube(1);
        assert!(FunctionSpace::new(mesh, SpaceConfig::continuous(0, all_segments())).is_err());
    }

    #[test]
    fn test_dof_indices_stable_and_unique() {
        let mesh = cube(2);
        let space = FunctionSpace::new(
            mesh,
            SpaceConfig::continuous(2, SegmentSet::new([1, 3])),
        )
        .unwrap();

        let mut seen = std::collections::HashSet::new();
        for i in 0..space.dof_count() {
            assert!(seen.insert(space.dof_key(i)), "duplicate dof key");
            assert_eq!(space.index_of(space.dof_key(i)), Some(i));
        }
    }
}
