//! Duplicate and degenerate facet removal.

use std::collections::HashSet;

use stepcast_math::VertexKey;
use stepcast_mesh::TriangleMesh;
use tracing::debug;

/// Remove facets that cover the same three welded vertices as an
/// earlier facet, regardless of winding. Returns the number removed.
pub(crate) fn remove_duplicate_facets(mesh: &mut TriangleMesh, weld_epsilon: f64) -> usize {
    let before = mesh.facets.len();
    let mut seen: HashSet<[VertexKey; 3]> = HashSet::with_capacity(before);

    mesh.facets.retain(|facet| {
        let mut key = [
            VertexKey::from_point(&facet.vertices[0], weld_epsilon),
            VertexKey::from_point(&facet.vertices[1], weld_epsilon),
            VertexKey::from_point(&facet.vertices[2], weld_epsilon),
        ];
        key.sort_unstable();
        seen.insert(key)
    });

    let removed = before - mesh.facets.len();
    if removed > 0 {
        debug!(removed, "removed duplicate facets");
    }
    removed
}

/// Remove facets with area at or below `area_threshold`. Returns the
/// number removed.
pub(crate) fn remove_degenerate_facets(mesh: &mut TriangleMesh, area_threshold: f64) -> usize {
    let before = mesh.facets.len();
    mesh.facets.retain(|facet| facet.area() > area_threshold);

    let removed = before - mesh.facets.len();
    if removed > 0 {
        debug!(removed, "removed degenerate facets");
    }
    removed
}
