//! Facet winding harmonization.
//!
//! Propagates a consistent winding across edge-connected facets, then
//! flips the whole mesh if it is closed and wound inside-out (negative
//! signed volume).

use std::collections::{HashMap, VecDeque};

use stepcast_math::VertexKey;
use stepcast_mesh::TriangleMesh;
use tracing::debug;

/// Make facet winding consistent across shared edges. Returns the
/// number of facets flipped.
pub(crate) fn harmonize_normals(mesh: &mut TriangleMesh, weld_epsilon: f64) -> usize {
    // Welded index triple per facet, kept parallel to mesh.facets.
    // Collapsed facets get no triple and are left alone.
    let mut index_of: HashMap<VertexKey, u32> = HashMap::new();
    let mut next_index = 0u32;
    let mut tris: Vec<Option<[u32; 3]>> = Vec::with_capacity(mesh.facets.len());

    for facet in &mesh.facets {
        let mut t = [0u32; 3];
        for (slot, p) in facet.vertices.iter().enumerate() {
            let key = VertexKey::from_point(p, weld_epsilon);
            let idx = *index_of.entry(key).or_insert_with(|| {
                let idx = next_index;
                next_index += 1;
                idx
            });
            t[slot] = idx;
        }
        tris.push(if t[0] != t[1] && t[1] != t[2] && t[2] != t[0] {
            Some(t)
        } else {
            None
        });
    }

    let mut edge_to_facets: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (facet_idx, tri) in tris.iter().enumerate() {
        if let Some(t) = tri {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                edge_to_facets.entry(key).or_default().push(facet_idx);
            }
        }
    }

    // BFS over edge-connected facets, flipping neighbors that traverse
    // a shared edge in the same direction as the visited facet.
    let mut visited = vec![false; mesh.facets.len()];
    let mut flipped = 0;

    for seed in 0..mesh.facets.len() {
        if visited[seed] || tris[seed].is_none() {
            continue;
        }
        visited[seed] = true;
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            let t = match tris[current] {
                Some(t) => t,
                None => continue,
            };
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                let Some(neighbors) = edge_to_facets.get(&key) else {
                    continue;
                };
                // Orientation only propagates across manifold edges
                if neighbors.len() != 2 {
                    continue;
                }
                for &n in neighbors {
                    if n == current || visited[n] {
                        continue;
                    }
                    if let Some(nt) = tris[n] {
                        let same_direction = [(nt[0], nt[1]), (nt[1], nt[2]), (nt[2], nt[0])]
                            .contains(&(a, b));
                        if same_direction {
                            tris[n] = Some([nt[0], nt[2], nt[1]]);
                            mesh.facets[n].flip();
                            flipped += 1;
                        }
                    }
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    // A closed mesh wound inside-out gets flipped wholesale
    let watertight = edge_to_facets.values().all(|facets| facets.len() >= 2);
    if watertight && !mesh.facets.is_empty() && signed_volume(mesh) < 0.0 {
        for facet in &mut mesh.facets {
            facet.flip();
        }
        flipped += mesh.facets.len();
        debug!("flipped inside-out mesh");
    }

    if flipped > 0 {
        debug!(flipped, "harmonized facet winding");
    }
    flipped
}

/// Signed volume via the divergence theorem over facet tetrahedra.
pub(crate) fn signed_volume(mesh: &TriangleMesh) -> f64 {
    mesh.facets
        .iter()
        .map(|f| {
            let [a, b, c] = &f.vertices;
            a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
        })
        .sum()
}
