//! Triangle adjacency over a welded mesh topology.
//!
//! Provides edge-to-triangle lookups, boundary edge enumeration, and
//! the manifold / watertight predicates the repair and classification
//! stages rely on.

use std::collections::HashMap;

/// Adjacency information over indexed triangles.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps undirected edge (v0, v1), v0 < v1, to adjacent triangle indices.
    edge_to_triangles: HashMap<(u32, u32), Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency from triangle index triplets.
    pub fn build(triangles: &[[u32; 3]]) -> Self {
        let mut edge_to_triangles: HashMap<(u32, u32), Vec<usize>> = HashMap::new();

        for (tri_idx, tri) in triangles.iter().enumerate() {
            let edges = [
                normalize_edge(tri[0], tri[1]),
                normalize_edge(tri[1], tri[2]),
                normalize_edge(tri[2], tri[0]),
            ];
            for edge in edges {
                edge_to_triangles.entry(edge).or_default().push(tri_idx);
            }
        }

        Self { edge_to_triangles }
    }

    /// Triangles adjacent to an edge, or `None` if the edge is absent.
    pub fn triangles_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_triangles
            .get(&normalize_edge(v0, v1))
            .map(Vec::as_slice)
    }

    /// Iterate over boundary edges (edges with exactly one adjacent triangle).
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_triangles
            .iter()
            .filter(|(_, tris)| tris.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Number of boundary edges.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_triangles
            .values()
            .filter(|tris| tris.len() == 1)
            .count()
    }

    /// Whether every edge has at most two adjacent triangles.
    pub fn is_manifold(&self) -> bool {
        self.edge_to_triangles.values().all(|tris| tris.len() <= 2)
    }

    /// Whether every edge has at least two adjacent triangles.
    pub fn is_watertight(&self) -> bool {
        self.edge_to_triangles.values().all(|tris| tris.len() >= 2)
    }

    /// Total number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_to_triangles.len()
    }
}

/// Normalize edge direction so v0 < v1.
#[inline]
fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
