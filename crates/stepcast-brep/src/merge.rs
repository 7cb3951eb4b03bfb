//! Coplanar face merging.
//!
//! Adjacent faces lying on the same plane are collapsed into one face
//! whose boundary is the outline of the whole patch. The shape builder
//! uses this to turn triangulated flat regions into clean polygonal
//! faces; [`remove_splitter`] reuses it to erase redundant edges that
//! split otherwise contiguous faces.

use std::collections::{HashMap, HashSet, VecDeque};

use stepcast_geom::GeometryStore;
use stepcast_math::Point3;
use stepcast_topo::{FaceId, Orientation, ShellType, Topology, VertexId};
use tracing::{debug, warn};

use crate::sew::pair_half_edges;
use crate::Shape;

/// Remove edges that needlessly split coplanar faces.
///
/// Merges every group of adjacent coplanar faces, dropping any
/// boundary loop that degenerates below three vertices.
pub fn remove_splitter(shape: &Shape) -> Shape {
    let merged = merge_coplanar_faces(shape);
    debug!(
        faces_before = shape.face_count(),
        faces_after = merged.face_count(),
        "removed splitter edges"
    );
    merged
}

/// Merge adjacent coplanar faces into single faces with outline loops.
///
/// The result is a freshly built shape: grouped faces are replaced by
/// one face per group, half-edges are re-twinned globally, and a new
/// shell spans all faces.
pub fn merge_coplanar_faces(shape: &Shape) -> Shape {
    let groups = coplanar_groups(shape);

    let mut topo = Topology::new();
    let mut geom = GeometryStore::new();
    let mut vertex_map: HashMap<VertexId, VertexId> = HashMap::new();

    for group in &groups {
        let representative = group[0];
        let plane = shape
            .geometry
            .surface(shape.topology.faces[representative].surface_index)
            .clone();

        let loops = outline_loops(shape, group);
        if loops.is_empty() {
            warn!("coplanar group produced no boundary loops, dropping it");
            continue;
        }

        // Largest projected loop is the face outline, the rest are holes
        let (outer_idx, _) = loops
            .iter()
            .enumerate()
            .map(|(i, l)| (i, projected_area(shape, &plane, l).abs()))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));

        let surface_index = geom.add_surface(plane);
        let outer = build_loop(shape, &loops[outer_idx], &mut topo, &mut vertex_map);
        let face = topo.add_face(outer, surface_index, Orientation::Forward);

        for (i, l) in loops.iter().enumerate() {
            if i != outer_idx {
                let inner = build_loop(shape, l, &mut topo, &mut vertex_map);
                topo.add_inner_loop(face, inner);
            }
        }
    }

    pair_half_edges(&mut topo);

    let faces: Vec<_> = topo.faces.keys().collect();
    let shell = topo.add_shell(faces, ShellType::Outer);

    Shape {
        topology: topo,
        geometry: geom,
        shell,
        tolerance: shape.tolerance,
    }
}

/// Partition faces into groups connected across twins and coplanar
/// within the shape tolerance.
fn coplanar_groups(shape: &Shape) -> Vec<Vec<FaceId>> {
    let topo = &shape.topology;
    let mut visited: HashSet<FaceId> = HashSet::new();
    let mut groups = Vec::new();

    for seed in topo.faces.keys() {
        if visited.contains(&seed) {
            continue;
        }
        visited.insert(seed);
        let seed_plane = shape.geometry.surface(topo.faces[seed].surface_index);

        let mut group = vec![seed];
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            for loop_id in topo.face_loops(current) {
                for he in topo.loop_half_edges(loop_id) {
                    let Some(twin) = topo.half_edges[he].twin else {
                        continue;
                    };
                    let Some(twin_loop) = topo.half_edges[twin].loop_id else {
                        continue;
                    };
                    let Some(neighbor) = topo.loops[twin_loop].face else {
                        continue;
                    };
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    let neighbor_plane =
                        shape.geometry.surface(topo.faces[neighbor].surface_index);
                    if seed_plane.is_coplanar_with(neighbor_plane, shape.tolerance) {
                        visited.insert(neighbor);
                        group.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        groups.push(group);
    }

    groups
}

/// Trace the outline of a face group: directed edges not shared with
/// another face of the same group, chained into closed vertex loops.
/// Loops that fail to close or fall below three vertices are dropped.
fn outline_loops(shape: &Shape, group: &[FaceId]) -> Vec<Vec<VertexId>> {
    let topo = &shape.topology;
    let members: HashSet<FaceId> = group.iter().copied().collect();

    // Directed boundary edges of the group
    let mut next_of: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
    let mut edge_count = 0usize;
    for &face in group {
        for loop_id in topo.face_loops(face) {
            for he in topo.loop_half_edges(loop_id) {
                let interior = topo.half_edges[he]
                    .twin
                    .and_then(|twin| topo.half_edges[twin].loop_id)
                    .and_then(|l| topo.loops[l].face)
                    .is_some_and(|f| members.contains(&f));
                if !interior {
                    let origin = topo.half_edges[he].origin;
                    let dest = topo.half_edge_dest(he);
                    next_of.entry(origin).or_default().push(dest);
                    edge_count += 1;
                }
            }
        }
    }

    let mut loops = Vec::new();
    let mut used = 0usize;

    while used < edge_count {
        // Pick any vertex that still has an unused outgoing edge
        let Some((&start, _)) = next_of.iter().find(|(_, dests)| !dests.is_empty()) else {
            break;
        };

        let mut chain = vec![start];
        let mut current = start;
        let closed = loop {
            let Some(dests) = next_of.get_mut(&current) else {
                break false;
            };
            let Some(dest) = dests.pop() else {
                break false;
            };
            used += 1;
            if dest == start {
                break true;
            }
            chain.push(dest);
            current = dest;
        };

        if closed && chain.len() >= 3 {
            loops.push(chain);
        } else if !closed {
            warn!(len = chain.len(), "dropping unclosed outline chain");
        }
    }

    loops
}

/// Projected signed area of a vertex loop on `plane` (shoelace).
fn projected_area(shape: &Shape, plane: &stepcast_geom::Plane, vertices: &[VertexId]) -> f64 {
    let uv: Vec<_> = vertices
        .iter()
        .map(|&v| plane.project(&shape.topology.vertices[v].point))
        .collect();
    let n = uv.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = uv[i];
        let b = uv[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

/// Copy a vertex loop into the target topology, reusing already-copied
/// vertices.
fn build_loop(
    shape: &Shape,
    vertices: &[VertexId],
    topo: &mut Topology,
    vertex_map: &mut HashMap<VertexId, VertexId>,
) -> stepcast_topo::LoopId {
    let hes: Vec<_> = vertices
        .iter()
        .map(|&old| {
            let point: Point3 = shape.topology.vertices[old].point;
            let new = *vertex_map
                .entry(old)
                .or_insert_with(|| topo.add_vertex(point));
            topo.add_half_edge(new)
        })
        .collect();
    topo.add_loop(&hes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sew::shape_from_mesh;
    use crate::test_meshes::unit_cube;
    use stepcast_math::{Point3, DEFAULT_SEW_TOLERANCE};
    use stepcast_mesh::{Facet, TriangleMesh};

    fn flat_square() -> Shape {
        // Two coplanar triangles forming a unit square, open shell so
        // sewing leaves them unmerged
        let mesh = TriangleMesh {
            facets: vec![
                Facet::new(
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(1.0, 1.0, 0.0),
                ),
                Facet::new(
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 1.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ),
            ],
        }
        .default_topology();
        shape_from_mesh(&mesh, DEFAULT_SEW_TOLERANCE).unwrap()
    }

    #[test]
    fn test_splitter_removal_merges_square() {
        let shape = flat_square();
        assert_eq!(shape.face_count(), 2);

        let merged = remove_splitter(&shape);
        assert_eq!(merged.face_count(), 1);
        assert_eq!(merged.edge_count(), 4);
        assert!(merged.is_valid());
    }

    #[test]
    fn test_cube_merges_to_six_quads() {
        let mesh = unit_cube().default_topology();
        // shape_from_mesh already merges closed shells
        let shape = shape_from_mesh(&mesh, DEFAULT_SEW_TOLERANCE).unwrap();
        assert_eq!(shape.face_count(), 6);
        assert_eq!(shape.edge_count(), 12);

        // A second merge pass changes nothing
        let again = remove_splitter(&shape);
        assert_eq!(again.face_count(), 6);
        assert_eq!(again.edge_count(), 12);
    }

    #[test]
    fn test_merge_preserves_closure() {
        let mesh = unit_cube().default_topology();
        let shape = shape_from_mesh(&mesh, DEFAULT_SEW_TOLERANCE).unwrap();
        assert!(shape.is_closed());
        assert!(remove_splitter(&shape).is_closed());
    }
}
