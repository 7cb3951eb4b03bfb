#![warn(missing_docs)]

//! Math types for the stepcast mesh-to-B-rep pipeline.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! 3D geometry, plus the tolerance constants shared across the
//! pipeline stages.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// Distance tolerance used when sewing mesh facets into B-rep faces.
///
/// Chosen empirically: tighter values reject more meshes as invalid,
/// looser values degrade surface fidelity.
pub const DEFAULT_SEW_TOLERANCE: f64 = 0.01;

/// Distance threshold below which mesh vertices are considered coincident.
pub const DEFAULT_WELD_EPSILON: f64 = 1e-6;

/// Quantized vertex position key for hash-based deduplication.
///
/// Coordinates are snapped to a grid of `tolerance` resolution so that
/// positions within tolerance of each other map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexKey {
    x: i64,
    y: i64,
    z: i64,
}

impl VertexKey {
    /// Build a key for `p` at the given grid resolution.
    pub fn from_point(p: &Point3, tolerance: f64) -> Self {
        let scale = if tolerance > 0.0 {
            1.0 / tolerance
        } else {
            1.0e6
        };
        Self {
            x: (p.x * scale).round() as i64,
            y: (p.y * scale).round() as i64,
            z: (p.z * scale).round() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_key_merges_within_tolerance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-4, 2.0, 3.0);
        assert_eq!(
            VertexKey::from_point(&a, 0.01),
            VertexKey::from_point(&b, 0.01)
        );
        assert_ne!(
            VertexKey::from_point(&a, 1e-6),
            VertexKey::from_point(&b, 1e-6)
        );
    }
}
