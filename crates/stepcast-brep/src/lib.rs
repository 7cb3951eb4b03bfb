#![warn(missing_docs)]

//! Mesh-to-B-rep reconstruction for the stepcast pipeline.
//!
//! [`shape_from_mesh`] sews a welded triangle mesh into a [`Shape`]:
//! one planar face per facet, twinned half-edges where facets share an
//! edge, coplanar patches merged into larger faces when the shell is
//! closed. [`remove_splitter`] re-merges coplanar faces of an invalid
//! shape, and [`classify`] decides whether the shape bounds a solid or
//! stays an open shell.

pub mod merge;
pub mod sew;
pub mod solid;

pub use merge::remove_splitter;
pub use sew::{shape_from_mesh, ReconstructionError};
pub use solid::{classify, Classification, ClassifiedShape, Solid, SolidError};

use stepcast_geom::GeometryStore;
use stepcast_topo::{ShellId, Topology};

/// A boundary representation shape: topology, surface geometry, and
/// the shell tying the faces together.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Half-edge topology.
    pub topology: Topology,
    /// Surfaces referenced by the faces.
    pub geometry: GeometryStore,
    /// The single shell over all faces.
    pub shell: ShellId,
    /// Tolerance the shape was sewn at.
    pub tolerance: f64,
}

impl Shape {
    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.topology.faces.len()
    }

    /// Number of edges: twinned pairs plus unpaired boundary half-edges.
    pub fn edge_count(&self) -> usize {
        let unpaired = self
            .topology
            .half_edges
            .values()
            .filter(|he| he.twin.is_none())
            .count();
        self.topology.edges.len() + unpaired
    }

    /// Whether every half-edge has a twin, i.e. the shell is watertight.
    pub fn is_closed(&self) -> bool {
        self.topology.half_edges.values().all(|he| he.twin.is_some())
    }

    /// Structural validity: every face has a well-formed boundary loop
    /// of at least three half-edges whose vertices lie on the face
    /// plane within tolerance.
    pub fn is_valid(&self) -> bool {
        if self.topology.faces.is_empty() {
            return false;
        }
        for (face_id, face) in &self.topology.faces {
            let plane = self.geometry.surface(face.surface_index);
            if !plane.normal_dir.iter().all(|c| c.is_finite()) {
                return false;
            }
            for loop_id in self.topology.face_loops(face_id) {
                let hes: Vec<_> = self.topology.loop_half_edges(loop_id).collect();
                if hes.len() < 3 {
                    return false;
                }
                for &he in &hes {
                    let half_edge = &self.topology.half_edges[he];
                    // Cycle integrity
                    if half_edge.loop_id != Some(loop_id) {
                        return false;
                    }
                    let Some(next) = half_edge.next else {
                        return false;
                    };
                    if self.topology.half_edges[next].prev != Some(he) {
                        return false;
                    }
                    // Planarity
                    let p = self.topology.vertices[half_edge.origin].point;
                    if plane.signed_distance(&p).abs() > self.tolerance {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use stepcast_math::Point3;
    use stepcast_mesh::{Facet, TriangleMesh};

    fn facet(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Facet {
        Facet::new(
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        )
    }

    /// Unit cube as 12 consistently wound facets, normals outward.
    pub fn unit_cube() -> TriangleMesh {
        let v = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let tris: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        TriangleMesh {
            facets: tris
                .iter()
                .map(|&[a, b, c]| facet(v[a], v[b], v[c]))
                .collect(),
        }
    }

    /// The cube missing one of its twelve facets: an open shell.
    pub fn cube_missing_facet() -> TriangleMesh {
        let mut mesh = unit_cube();
        mesh.facets.pop();
        mesh
    }
}
