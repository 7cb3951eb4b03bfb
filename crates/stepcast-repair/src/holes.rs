//! Hole detection and filling.
//!
//! A hole is a closed loop of boundary edges (edges with exactly one
//! adjacent triangle) in the welded view of the mesh. Holes small
//! enough are closed by ear-clipping triangulation; larger ones are
//! left open with a warning.

use std::collections::{HashMap, HashSet};

use stepcast_math::{Point3, Vec3};
use stepcast_mesh::{Facet, MeshTopology, TriangleMesh};
use tracing::{debug, warn};

use crate::{RepairParams, StepError};

/// A closed loop of boundary edges.
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Ordered welded vertex indices around the loop.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop.
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Detect all closed boundary loops in the welded view of a mesh.
pub fn detect_boundary_loops(topo: &MeshTopology) -> Vec<BoundaryLoop> {
    let adjacency = topo.adjacency();
    let boundary_edges: Vec<(u32, u32)> = adjacency.boundary_edges().collect();
    if boundary_edges.is_empty() {
        return Vec::new();
    }

    debug!(count = boundary_edges.len(), "found boundary edges");

    let mut edge_neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in &boundary_edges {
        edge_neighbors.entry(a).or_default().push(b);
        edge_neighbors.entry(b).or_default().push(a);
    }

    let mut visited: HashSet<u32> = HashSet::new();
    let mut loops = Vec::new();

    for &(start, _) in &boundary_edges {
        if visited.contains(&start) {
            continue;
        }

        let mut loop_vertices = Vec::new();
        let mut current = start;
        let mut prev: Option<u32> = None;

        loop {
            visited.insert(current);
            loop_vertices.push(current);

            let neighbors = edge_neighbors
                .get(&current)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let next = neighbors
                .iter()
                .find(|&&n| Some(n) != prev && !visited.contains(&n))
                .or_else(|| {
                    // Allow closing the loop back to the start
                    neighbors
                        .iter()
                        .find(|&&n| n == start && loop_vertices.len() > 2)
                });

            match next {
                Some(&n) if n == start => break,
                Some(&n) => {
                    prev = Some(current);
                    current = n;
                }
                None => {
                    warn!(start, "boundary loop is not closed");
                    break;
                }
            }
        }

        if loop_vertices.len() >= 3 {
            loops.push(BoundaryLoop {
                vertices: loop_vertices,
            });
        }
    }

    loops
}

/// Fill all holes small enough to triangulate, appending new facets.
///
/// Returns the number of holes filled. A loop that resists
/// triangulation fails the step.
pub(crate) fn fill_holes(
    mesh: &mut TriangleMesh,
    params: &RepairParams,
) -> Result<usize, StepError> {
    let topo = mesh.topology(params.weld_epsilon);
    let loops = detect_boundary_loops(&topo);
    if loops.is_empty() {
        return Ok(0);
    }

    let (fillable, skipped): (Vec<_>, Vec<_>) = loops
        .into_iter()
        .partition(|l| l.edge_count() <= params.max_hole_edges);

    for hole in &skipped {
        warn!(
            edges = hole.edge_count(),
            max = params.max_hole_edges,
            "leaving large hole open"
        );
    }

    let mut filled = 0;
    for hole in &fillable {
        let triangles = triangulate_loop(&topo.positions, hole);
        if triangles.is_empty() {
            return Err(StepError::HoleFillFailed {
                edges: hole.edge_count(),
            });
        }
        for [a, b, c] in triangles {
            mesh.facets.push(Facet::new(
                topo.positions[a as usize],
                topo.positions[b as usize],
                topo.positions[c as usize],
            ));
        }
        filled += 1;
    }

    Ok(filled)
}

/// Triangulate a boundary loop by ear clipping, falling back to a fan
/// when no ear can be found.
fn triangulate_loop(positions: &[Point3], boundary: &BoundaryLoop) -> Vec<[u32; 3]> {
    let n = boundary.vertices.len();
    if n < 3 {
        return Vec::new();
    }

    let loop_positions: Vec<Point3> = boundary
        .vertices
        .iter()
        .map(|&idx| positions[idx as usize])
        .collect();

    let centroid = Point3::from(
        loop_positions
            .iter()
            .fold(Vec3::zeros(), |acc, p| acc + p.coords)
            / n as f64,
    );
    let hole_normal = loop_normal(&loop_positions, &centroid);

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::new();

    while remaining.len() > 3 {
        let mut found_ear = false;

        for i in 0..remaining.len() {
            let prev = remaining[(i + remaining.len() - 1) % remaining.len()];
            let curr = remaining[i];
            let next = remaining[(i + 1) % remaining.len()];

            if is_ear(&loop_positions, &remaining, prev, curr, next, &hole_normal) {
                triangles.push([
                    boundary.vertices[prev],
                    boundary.vertices[curr],
                    boundary.vertices[next],
                ]);
                remaining.remove(i);
                found_ear = true;
                break;
            }
        }

        if !found_ear {
            warn!(
                remaining = remaining.len(),
                "ear clipping stuck, falling back to fan triangulation"
            );
            break;
        }
    }

    if remaining.len() == 3 {
        triangles.push([
            boundary.vertices[remaining[0]],
            boundary.vertices[remaining[1]],
            boundary.vertices[remaining[2]],
        ]);
    } else if remaining.len() > 3 {
        let center = remaining[0];
        for i in 1..remaining.len() - 1 {
            triangles.push([
                boundary.vertices[center],
                boundary.vertices[remaining[i]],
                boundary.vertices[remaining[i + 1]],
            ]);
        }
    }

    debug!(
        edges = n,
        triangles = triangles.len(),
        "triangulated boundary loop"
    );

    triangles
}

/// Average normal of a boundary loop, fanned around its centroid.
fn loop_normal(positions: &[Point3], centroid: &Point3) -> Vec3 {
    let mut normal = Vec3::zeros();
    let n = positions.len();
    for i in 0..n {
        let v0 = positions[i] - centroid;
        let v1 = positions[(i + 1) % n] - centroid;
        normal += v0.cross(&v1);
    }
    let len = normal.norm();
    if len > f64::EPSILON {
        normal / len
    } else {
        Vec3::z()
    }
}

/// Whether the vertex at `curr` forms a clippable ear.
fn is_ear(
    positions: &[Point3],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    hole_normal: &Vec3,
) -> bool {
    let p_prev = positions[prev];
    let p_curr = positions[curr];
    let p_next = positions[next];

    let tri_normal = (p_curr - p_prev).cross(&(p_next - p_prev));
    if tri_normal.norm() < f64::EPSILON {
        return false;
    }

    // Convexity: the ear must face the same way as the loop
    if tri_normal.dot(hole_normal) < 0.0 {
        return false;
    }

    for &idx in remaining {
        if idx == prev || idx == curr || idx == next {
            continue;
        }
        if point_in_triangle(&positions[idx], &p_prev, &p_curr, &p_next, hole_normal) {
            return false;
        }
    }

    true
}

/// Point-in-triangle test, projected onto the plane of `normal`.
fn point_in_triangle(p: &Point3, v0: &Point3, v1: &Point3, v2: &Point3, normal: &Vec3) -> bool {
    // Drop the axis most aligned with the normal
    let abs = Vec3::new(normal.x.abs(), normal.y.abs(), normal.z.abs());

    let (p2, a2, b2, c2) = if abs.z >= abs.x && abs.z >= abs.y {
        ((p.x, p.y), (v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y))
    } else if abs.y >= abs.x {
        ((p.x, p.z), (v0.x, v0.z), (v1.x, v1.z), (v2.x, v2.z))
    } else {
        ((p.y, p.z), (v0.y, v0.z), (v1.y, v1.z), (v2.y, v2.z))
    };

    let sign = |p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)| -> f64 {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };

    let d1 = sign(p2, a2, b2);
    let d2 = sign(p2, b2, c2);
    let d3 = sign(p2, c2, a2);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{open_cube, unit_cube};

    #[test]
    fn test_closed_mesh_has_no_loops() {
        let topo = unit_cube().default_topology();
        assert!(detect_boundary_loops(&topo).is_empty());
    }

    #[test]
    fn test_open_cube_has_square_loop() {
        let topo = open_cube().default_topology();
        let loops = detect_boundary_loops(&topo);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].edge_count(), 4);
    }

    #[test]
    fn test_square_loop_fills_with_two_triangles() {
        let mut mesh = open_cube();
        let before = mesh.facet_count();
        let filled = fill_holes(&mut mesh, &RepairParams::default()).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(mesh.facet_count(), before + 2);
    }
}
