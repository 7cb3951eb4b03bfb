//! Sewing a welded triangle mesh into a B-rep shape.
//!
//! Each usable facet becomes a planar face with a triangular boundary
//! loop. Vertices are merged at the sew tolerance, then half-edges
//! traversing the same vertex pair in opposite directions are twinned
//! into shared edges. When the resulting shell is watertight the
//! coplanar triangle patches are merged into larger faces.

use std::collections::HashMap;

use stepcast_geom::{GeometryStore, Plane};
use stepcast_math::VertexKey;
use stepcast_mesh::MeshTopology;
use stepcast_topo::{HalfEdgeId, Orientation, ShellType, Topology, VertexId};
use thiserror::Error;
use tracing::debug;

use crate::merge::merge_coplanar_faces;
use crate::Shape;

/// Errors raised while rebuilding a shape from mesh topology.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    /// The mesh has no triangles to sew.
    #[error("cannot build a shape from an empty mesh")]
    EmptyMesh,

    /// Every triangle collapsed or was degenerate at the sew tolerance.
    #[error("no usable facets at tolerance {tolerance}")]
    NoUsableFacets {
        /// The tolerance the sew ran at.
        tolerance: f64,
    },
}

/// Sew `mesh` into a [`Shape`] at the given tolerance.
///
/// # Errors
///
/// Fails when the mesh is empty or no facet survives welding at the
/// tolerance.
pub fn shape_from_mesh(mesh: &MeshTopology, tolerance: f64) -> Result<Shape, ReconstructionError> {
    if mesh.triangles.is_empty() {
        return Err(ReconstructionError::EmptyMesh);
    }

    let mut topo = Topology::new();
    let mut geom = GeometryStore::new();

    // Weld mesh vertices at the sew tolerance
    let mut key_to_vertex: HashMap<VertexKey, VertexId> = HashMap::new();
    let vertex_ids: Vec<VertexId> = mesh
        .positions
        .iter()
        .map(|p| {
            let key = VertexKey::from_point(p, tolerance);
            *key_to_vertex
                .entry(key)
                .or_insert_with(|| topo.add_vertex(*p))
        })
        .collect();

    let mut skipped = 0usize;
    for tri in &mesh.triangles {
        let vids = [
            vertex_ids[tri[0] as usize],
            vertex_ids[tri[1] as usize],
            vertex_ids[tri[2] as usize],
        ];
        if vids[0] == vids[1] || vids[1] == vids[2] || vids[2] == vids[0] {
            skipped += 1;
            continue;
        }

        let [a, b, c] = vids.map(|v| topo.vertices[v].point);
        let Some(plane) = Plane::new(a, b - a, c - a) else {
            skipped += 1;
            continue;
        };

        let surface_index = geom.add_surface(plane);
        let hes: Vec<HalfEdgeId> = vids.iter().map(|&v| topo.add_half_edge(v)).collect();
        let loop_id = topo.add_loop(&hes);
        topo.add_face(loop_id, surface_index, Orientation::Forward);
    }

    if topo.faces.is_empty() {
        return Err(ReconstructionError::NoUsableFacets { tolerance });
    }
    if skipped > 0 {
        debug!(skipped, "skipped degenerate facets while sewing");
    }

    pair_half_edges(&mut topo);

    let faces: Vec<_> = topo.faces.keys().collect();
    let shell = topo.add_shell(faces, ShellType::Outer);

    let shape = Shape {
        topology: topo,
        geometry: geom,
        shell,
        tolerance,
    };

    // Coplanar merging only applies to watertight shells; an open
    // shell keeps its triangular faces so boundary loops stay simple.
    if shape.is_closed() {
        Ok(merge_coplanar_faces(&shape))
    } else {
        Ok(shape)
    }
}

/// Twin half-edges traversing the same vertex pair in opposite
/// directions. Vertices are already canonical, so matching by ID is
/// exact.
pub(crate) fn pair_half_edges(topo: &mut Topology) {
    let mut candidates: HashMap<(VertexId, VertexId), HalfEdgeId> = HashMap::new();
    let he_ids: Vec<_> = topo.half_edges.keys().collect();

    for he_id in he_ids {
        if topo.half_edges[he_id].twin.is_some() {
            continue;
        }
        let origin = topo.half_edges[he_id].origin;
        let dest = topo.half_edge_dest(he_id);

        if let Some(&twin) = candidates.get(&(dest, origin)) {
            if topo.half_edges[twin].twin.is_none() {
                topo.add_edge(he_id, twin);
                candidates.remove(&(dest, origin));
                continue;
            }
        }
        candidates.insert((origin, dest), he_id);
    }
}
