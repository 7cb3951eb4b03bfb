//! Solid classification.
//!
//! A closed shape is promoted to a solid only when its boundary
//! actually encloses a volume: manifold edges, consistent outward
//! orientation, and a non-vanishing enclosed volume. Each rejection is
//! a typed [`SolidError`], and a rejected (or open) shape stays a
//! shell.

use std::collections::HashMap;

use stepcast_topo::{Orientation, VertexId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::Shape;

/// Volumes at or below this are treated as degenerate.
const MIN_SOLID_VOLUME: f64 = 1e-12;

/// Why a closed shape could not be promoted to a solid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolidError {
    /// The shape has unpaired half-edges.
    #[error("shape is not closed: {open_edges} open edges")]
    NotClosed {
        /// Number of half-edges without a twin.
        open_edges: usize,
    },

    /// Some vertex pair is traversed by more than one half-edge in the
    /// same direction.
    #[error("shape has a non-manifold edge")]
    NonManifoldEdge,

    /// The boundary encloses negative volume (faces point inward).
    #[error("face orientations are inconsistent (negative enclosed volume)")]
    InconsistentOrientation,

    /// The enclosed volume vanishes.
    #[error("enclosed volume is degenerate")]
    DegenerateVolume,
}

/// A shape verified to bound a volume.
#[derive(Debug, Clone)]
pub struct Solid {
    /// The underlying closed shape.
    pub shape: Shape,
    /// The enclosed volume.
    pub volume: f64,
}

impl Solid {
    /// Promote `shape` to a solid, or hand it back with the rejection.
    pub fn try_from_shape(shape: Shape) -> Result<Solid, (Shape, SolidError)> {
        if let Err(e) = check_solid(&shape) {
            return Err((shape, e));
        }
        let volume = enclosed_volume(&shape);
        Ok(Solid { shape, volume })
    }
}

/// What the pipeline ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The shape bounds a volume.
    Solid,
    /// The shape is an open or rejected surface shell.
    Shell,
}

impl Classification {
    /// STEP-style name of the shape kind.
    pub fn shape_type(&self) -> &'static str {
        match self {
            Classification::Solid => "Solid",
            Classification::Shell => "Shell",
        }
    }
}

/// A shape together with its solid-or-shell verdict.
#[derive(Debug, Clone)]
pub struct ClassifiedShape {
    /// The classified shape.
    pub shape: Shape,
    /// Solid or shell.
    pub classification: Classification,
    /// The rejection, when a closed shape failed solid construction.
    pub solid_error: Option<SolidError>,
}

/// Decide whether `shape` is a solid or a shell.
///
/// An open shape is a shell outright. A closed shape gets one solid
/// construction attempt; on rejection it is demoted to a shell with
/// the typed error preserved for reporting.
pub fn classify(shape: Shape) -> ClassifiedShape {
    match Solid::try_from_shape(shape) {
        Ok(solid) => {
            debug!(volume = solid.volume, "shape classified as solid");
            ClassifiedShape {
                shape: solid.shape,
                classification: Classification::Solid,
                solid_error: None,
            }
        }
        Err((shape, error)) => {
            warn!(%error, "shape kept as shell");
            ClassifiedShape {
                shape,
                classification: Classification::Shell,
                solid_error: Some(error),
            }
        }
    }
}

/// All conditions a solid boundary must satisfy.
fn check_solid(shape: &Shape) -> Result<(), SolidError> {
    let topo = &shape.topology;

    let open_edges = topo
        .half_edges
        .values()
        .filter(|he| he.twin.is_none())
        .count();
    if open_edges > 0 {
        return Err(SolidError::NotClosed { open_edges });
    }

    // Each directed vertex pair may be traversed once
    let mut directed: HashMap<(VertexId, VertexId), usize> = HashMap::new();
    for he_id in topo.half_edges.keys() {
        let origin = topo.half_edges[he_id].origin;
        let dest = topo.half_edge_dest(he_id);
        *directed.entry((origin, dest)).or_insert(0) += 1;
    }
    if directed.values().any(|&count| count > 1) {
        return Err(SolidError::NonManifoldEdge);
    }

    let volume = enclosed_volume(shape);
    if volume < -MIN_SOLID_VOLUME {
        return Err(SolidError::InconsistentOrientation);
    }
    if volume.abs() <= MIN_SOLID_VOLUME {
        return Err(SolidError::DegenerateVolume);
    }

    Ok(())
}

/// Signed enclosed volume via fan triangulation of every face loop.
pub(crate) fn enclosed_volume(shape: &Shape) -> f64 {
    let topo = &shape.topology;
    let mut volume = 0.0;

    for (face_id, face) in &topo.faces {
        let sign = match face.orientation {
            Orientation::Forward => 1.0,
            Orientation::Reversed => -1.0,
        };
        for loop_id in topo.face_loops(face_id) {
            let points: Vec<_> = topo
                .loop_half_edges(loop_id)
                .map(|he| topo.vertices[topo.half_edges[he].origin].point)
                .collect();
            for i in 1..points.len().saturating_sub(1) {
                let a = points[0].coords;
                let b = points[i].coords;
                let c = points[i + 1].coords;
                volume += sign * a.dot(&b.cross(&c)) / 6.0;
            }
        }
    }

    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sew::shape_from_mesh;
    use crate::test_meshes::{cube_missing_facet, unit_cube};
    use stepcast_math::DEFAULT_SEW_TOLERANCE;

    fn cube_shape() -> Shape {
        shape_from_mesh(&unit_cube().default_topology(), DEFAULT_SEW_TOLERANCE).unwrap()
    }

    #[test]
    fn test_cube_is_solid() {
        let classified = classify(cube_shape());
        assert_eq!(classified.classification, Classification::Solid);
        assert!(classified.solid_error.is_none());
    }

    #[test]
    fn test_cube_volume() {
        let solid = Solid::try_from_shape(cube_shape()).map_err(|(_, e)| e).unwrap();
        assert!((solid.volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_shell_stays_shell() {
        let shape = shape_from_mesh(
            &cube_missing_facet().default_topology(),
            DEFAULT_SEW_TOLERANCE,
        )
        .unwrap();

        let classified = classify(shape);
        assert_eq!(classified.classification, Classification::Shell);
        assert!(matches!(
            classified.solid_error,
            Some(SolidError::NotClosed { open_edges: 3 })
        ));
    }

    #[test]
    fn test_shape_type_names() {
        assert_eq!(Classification::Solid.shape_type(), "Solid");
        assert_eq!(Classification::Shell.shape_type(), "Shell");
    }
}
