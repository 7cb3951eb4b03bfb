#![warn(missing_docs)]

//! Best-effort mesh repair for the stepcast pipeline.
//!
//! Repair never fails the conversion. Callers first ask whether a mesh
//! supports repair at all ([`repair_capability`]); if it does,
//! [`repair_mesh`] runs a fixed sequence of steps and reports what it
//! did in a [`RepairOutcome`]. A step that cannot complete aborts the
//! remaining steps with a warning, leaving the effects of earlier
//! steps in place.
//!
//! Step order: fill holes, remove duplicate facets, remove degenerate
//! facets, harmonize facet winding.

mod holes;
mod steps;
mod winding;

pub use holes::{detect_boundary_loops, BoundaryLoop};

use stepcast_mesh::TriangleMesh;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration for the repair pass.
///
/// Thresholds are in mesh coordinate units.
#[derive(Debug, Clone)]
pub struct RepairParams {
    /// Distance below which vertices are welded when deriving connectivity.
    pub weld_epsilon: f64,
    /// Holes with more boundary edges than this are left open.
    pub max_hole_edges: usize,
    /// Facets with area at or below this are removed as degenerate.
    pub degenerate_area_threshold: f64,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: stepcast_math::DEFAULT_WELD_EPSILON,
            max_hole_edges: 100,
            degenerate_area_threshold: 1e-12,
        }
    }
}

/// Whether a mesh can be repaired at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairCapability {
    /// The mesh supports the repair pass.
    Available,
    /// Repair does not apply to this mesh; the reason is reportable.
    Unavailable {
        /// Why repair is unavailable.
        reason: String,
    },
}

/// Query whether `mesh` supports the repair pass.
///
/// An empty mesh has nothing to derive connectivity from, so repair is
/// unavailable for it.
pub fn repair_capability(mesh: &TriangleMesh) -> RepairCapability {
    if mesh.is_empty() {
        RepairCapability::Unavailable {
            reason: "mesh has no facets".to_string(),
        }
    } else {
        RepairCapability::Available
    }
}

/// Counts of what the repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Boundary loops closed with new facets.
    pub holes_filled: usize,
    /// Duplicate facets removed.
    pub duplicates_removed: usize,
    /// Degenerate (near-zero area) facets removed.
    pub degenerates_removed: usize,
    /// Facets whose winding was flipped for consistency.
    pub facets_reoriented: usize,
}

impl RepairSummary {
    /// Whether the pass changed the mesh at all.
    pub fn had_changes(&self) -> bool {
        self.holes_filled > 0
            || self.duplicates_removed > 0
            || self.degenerates_removed > 0
            || self.facets_reoriented > 0
    }
}

/// Result of the repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// All steps ran; the summary counts what changed.
    Completed(RepairSummary),
    /// Repair was skipped, or aborted partway through.
    Skipped {
        /// Why the pass did not complete.
        reason: String,
    },
}

/// A repair step that could not complete.
#[derive(Debug, Error)]
pub(crate) enum StepError {
    /// A boundary loop resisted triangulation.
    #[error("failed to triangulate hole with {edges} boundary edges")]
    HoleFillFailed {
        /// Edge count of the offending loop.
        edges: usize,
    },
}

/// Run the repair pass over `mesh` in place.
///
/// Checks [`repair_capability`] first; an unavailable mesh is returned
/// untouched with a [`RepairOutcome::Skipped`]. A mid-pass step
/// failure also yields `Skipped`, but the effects of the steps that
/// already ran remain in the mesh.
pub fn repair_mesh(mesh: &mut TriangleMesh, params: &RepairParams) -> RepairOutcome {
    if let RepairCapability::Unavailable { reason } = repair_capability(mesh) {
        warn!(%reason, "mesh repair skipped");
        return RepairOutcome::Skipped { reason };
    }

    let mut summary = RepairSummary::default();

    match holes::fill_holes(mesh, params) {
        Ok(filled) => summary.holes_filled = filled,
        Err(e) => {
            let reason = e.to_string();
            warn!(%reason, "mesh repair aborted");
            return RepairOutcome::Skipped { reason };
        }
    }

    summary.duplicates_removed = steps::remove_duplicate_facets(mesh, params.weld_epsilon);
    summary.degenerates_removed =
        steps::remove_degenerate_facets(mesh, params.degenerate_area_threshold);
    summary.facets_reoriented = winding::harmonize_normals(mesh, params.weld_epsilon);

    if summary.had_changes() {
        info!(
            holes_filled = summary.holes_filled,
            duplicates_removed = summary.duplicates_removed,
            degenerates_removed = summary.degenerates_removed,
            facets_reoriented = summary.facets_reoriented,
            "mesh repair completed"
        );
    }

    RepairOutcome::Completed(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcast_math::Point3;
    use stepcast_mesh::Facet;

    fn facet(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Facet {
        Facet::new(
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        )
    }

    /// Unit cube as 12 consistently wound facets, normals outward.
    pub(crate) fn unit_cube() -> TriangleMesh {
        let p = |x: f64, y: f64, z: f64| [x, y, z];
        let v = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ];
        let tris: [[usize; 3]; 12] = [
            // bottom (z=0, normal -z)
            [0, 2, 1],
            [0, 3, 2],
            // top (z=1, normal +z)
            [4, 5, 6],
            [4, 6, 7],
            // front (y=0, normal -y)
            [0, 1, 5],
            [0, 5, 4],
            // right (x=1, normal +x)
            [1, 2, 6],
            [1, 6, 5],
            // back (y=1, normal +y)
            [2, 3, 7],
            [2, 7, 6],
            // left (x=0, normal -x)
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

    /// The cube with its two top facets removed (a 4-edge square hole).
    pub(crate) fn open_cube() -> TriangleMesh {
        let mut mesh = unit_cube();
        mesh.facets.remove(3);
        mesh.facets.remove(2);
        mesh
    }

    #[test]
    fn test_capability_empty_mesh() {
        let mesh = TriangleMesh::new();
        assert!(matches!(
            repair_capability(&mesh),
            RepairCapability::Unavailable { .. }
        ));
    }

    #[test]
    fn test_skipped_mesh_is_untouched() {
        let mut mesh = TriangleMesh::new();
        let before = mesh.clone();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        assert!(matches!(outcome, RepairOutcome::Skipped { .. }));
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_closed_cube_needs_no_repair() {
        let mut mesh = unit_cube();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        match outcome {
            RepairOutcome::Completed(summary) => assert!(!summary.had_changes()),
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        assert_eq!(mesh.facet_count(), 12);
    }

    #[test]
    fn test_open_cube_hole_is_filled() {
        let mut mesh = open_cube();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        match outcome {
            RepairOutcome::Completed(summary) => assert_eq!(summary.holes_filled, 1),
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        let adj = mesh.default_topology().adjacency();
        assert!(adj.is_watertight());
    }

    #[test]
    fn test_hole_above_size_limit_left_open() {
        let mut mesh = open_cube();
        let params = RepairParams {
            max_hole_edges: 3,
            ..Default::default()
        };
        let outcome = repair_mesh(&mut mesh, &params);
        match outcome {
            RepairOutcome::Completed(summary) => assert_eq!(summary.holes_filled, 0),
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        assert!(!mesh.default_topology().adjacency().is_watertight());
    }

    #[test]
    fn test_duplicate_facet_removed() {
        let mut mesh = unit_cube();
        mesh.facets.push(mesh.facets[0].clone());
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        match outcome {
            RepairOutcome::Completed(summary) => {
                assert_eq!(summary.duplicates_removed, 1);
            }
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        assert_eq!(mesh.facet_count(), 12);
    }

    #[test]
    fn test_degenerate_facet_removed() {
        let mut mesh = unit_cube();
        mesh.facets.push(facet(
            [5.0, 5.0, 5.0],
            [6.0, 5.0, 5.0],
            [5.5, 5.0, 5.0],
        ));
        // The sliver's own edges form a boundary loop; keep hole filling
        // out of the way so only the degenerate step touches it.
        let params = RepairParams {
            max_hole_edges: 0,
            ..Default::default()
        };
        let outcome = repair_mesh(&mut mesh, &params);
        match outcome {
            RepairOutcome::Completed(summary) => {
                assert_eq!(summary.degenerates_removed, 1);
            }
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        assert_eq!(mesh.facet_count(), 12);
    }

    #[test]
    fn test_flipped_facet_reoriented() {
        let mut mesh = unit_cube();
        mesh.facets[7].flip();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        match outcome {
            RepairOutcome::Completed(summary) => {
                assert_eq!(summary.facets_reoriented, 1);
            }
            RepairOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
    }
}
