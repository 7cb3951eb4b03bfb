#![warn(missing_docs)]

//! Triangle mesh types and STL loading for the stepcast pipeline.
//!
//! The mesh enters the pipeline as a facet soup ([`TriangleMesh`]):
//! independent triangles with no shared vertices, the way STL stores
//! them. Stages that need connectivity derive a welded, indexed view
//! ([`MeshTopology`]) on demand.

pub mod adjacency;
mod error;
pub mod stl;

pub use adjacency::MeshAdjacency;
pub use error::LoadError;
pub use stl::load_stl;

use std::collections::HashMap;

use stepcast_math::{Point3, Vec3, VertexKey, DEFAULT_WELD_EPSILON};

/// A single triangle facet with three corner positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// Corner positions in winding order.
    pub vertices: [Point3; 3],
}

impl Facet {
    /// Create a facet from three corners.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unnormalized facet normal `(b - a) × (c - a)`.
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Facet area.
    pub fn area(&self) -> f64 {
        self.normal().norm() * 0.5
    }

    /// Reverse the winding order (flips the normal).
    pub fn flip(&mut self) {
        self.vertices.swap(1, 2);
    }
}

/// A facet-soup triangle mesh, as read from an STL file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// The facets, in file order.
    pub facets: Vec<Facet>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of facets.
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// Whether the mesh has no facets.
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Build the welded, indexed view of this mesh.
    ///
    /// Vertices within `weld_epsilon` of each other collapse to one
    /// index. Triangles that collapse onto fewer than three distinct
    /// indices are dropped from the indexed view.
    pub fn topology(&self, weld_epsilon: f64) -> MeshTopology {
        let mut positions: Vec<Point3> = Vec::new();
        let mut index_of: HashMap<VertexKey, u32> = HashMap::new();
        let mut triangles: Vec<[u32; 3]> = Vec::with_capacity(self.facets.len());

        for facet in &self.facets {
            let mut tri = [0u32; 3];
            for (slot, p) in facet.vertices.iter().enumerate() {
                let key = VertexKey::from_point(p, weld_epsilon);
                let idx = *index_of.entry(key).or_insert_with(|| {
                    positions.push(*p);
                    (positions.len() - 1) as u32
                });
                tri[slot] = idx;
            }
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[2] != tri[0] {
                triangles.push(tri);
            }
        }

        MeshTopology {
            positions,
            triangles,
        }
    }

    /// Welded view at the default weld epsilon.
    pub fn default_topology(&self) -> MeshTopology {
        self.topology(DEFAULT_WELD_EPSILON)
    }
}

/// Indexed triangle mesh: welded vertex positions plus index triplets.
#[derive(Debug, Clone, Default)]
pub struct MeshTopology {
    /// Welded vertex positions.
    pub positions: Vec<Point3>,
    /// Triangles as vertex index triplets, winding preserved.
    pub triangles: Vec<[u32; 3]>,
}

impl MeshTopology {
    /// Number of welded vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Build adjacency over this topology's triangles.
    pub fn adjacency(&self) -> MeshAdjacency {
        MeshAdjacency::build(&self.triangles)
    }
}
