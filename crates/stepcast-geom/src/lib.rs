#![warn(missing_docs)]

//! Surface geometry for the stepcast pipeline.
//!
//! Shapes rebuilt from triangle meshes only carry planar patches, so
//! the geometry layer is a single analytic type: [`Plane`]. Faces in
//! the topology store reference planes by index into a
//! [`GeometryStore`].

use stepcast_math::{Dir3, Point2, Point3, Vec3};

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
    /// Unit normal (x_dir × y_dir).
    pub normal_dir: Dir3,
}

impl Plane {
    /// Create a plane from origin and two direction vectors.
    /// The vectors do not need to be normalized or orthogonal; the
    /// y direction is re-orthogonalized against x.
    ///
    /// Returns `None` when the directions are parallel or degenerate.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Option<Self> {
        let n = x_dir.cross(&y_dir);
        let normal_dir = Dir3::try_new(n, 1e-12)?;
        let x = Dir3::try_new(x_dir, 1e-12)?;
        let y = Dir3::new_normalize(normal_dir.as_ref().cross(x.as_ref()));
        Some(Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir,
        })
    }

    /// Create a plane from origin and normal. X/Y directions are chosen arbitrarily.
    ///
    /// Returns `None` when the normal is degenerate.
    pub fn from_normal(origin: Point3, normal: Vec3) -> Option<Self> {
        let n = Dir3::try_new(normal, 1e-12)?;
        // Pick an arbitrary perpendicular vector
        let arbitrary = if n.as_ref().x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let x = Dir3::new_normalize(arbitrary.cross(n.as_ref()));
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Some(Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir: n,
        })
    }

    /// Evaluate the plane at parameter `(u, v)` to get a 3D point.
    pub fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    /// Project a 3D point onto this plane's (u, v) parameter space.
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }

    /// Whether `other` describes the same plane within `tolerance`:
    /// parallel normals and coincident carrier planes.
    pub fn is_coplanar_with(&self, other: &Plane, tolerance: f64) -> bool {
        let dot = self.normal_dir.dot(other.normal_dir.as_ref());
        // A cos deviation of ~1e-6 keeps numerically noisy facet normals
        // of the same flat region together without merging true creases.
        if dot < 1.0 - 1e-6 {
            return false;
        }
        self.signed_distance(&other.origin).abs() <= tolerance
    }
}

/// Append-only store of the surfaces referenced by topology faces.
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    surfaces: Vec<Plane>,
}

impl GeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface, returning its index.
    pub fn add_surface(&mut self, plane: Plane) -> usize {
        self.surfaces.push(plane);
        self.surfaces.len() - 1
    }

    /// Look up a surface by index.
    pub fn surface(&self, index: usize) -> &Plane {
        &self.surfaces[index]
    }

    /// Number of stored surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_project_and_evaluate_roundtrip() {
        let plane = Plane::new(Point3::new(1.0, 2.0, 3.0), Vec3::x(), Vec3::y())
            .expect("frame is non-degenerate");
        let p = Point3::new(4.0, 7.0, 3.0);
        let uv = plane.project(&p);
        let back = plane.evaluate(uv);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-12);
    }

    #[test]
    fn test_signed_distance() {
        let plane = Plane::from_normal(Point3::origin(), Vec3::z())
            .expect("normal is non-degenerate");
        assert_relative_eq!(
            plane.signed_distance(&Point3::new(5.0, -3.0, 2.5)),
            2.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_frame_rejected() {
        assert!(Plane::new(Point3::origin(), Vec3::x(), Vec3::x()).is_none());
        assert!(Plane::from_normal(Point3::origin(), Vec3::zeros()).is_none());
    }

    #[test]
    fn test_coplanarity() {
        let a = Plane::from_normal(Point3::origin(), Vec3::z()).expect("valid normal");
        let b = Plane::from_normal(Point3::new(10.0, -4.0, 0.001), Vec3::z())
            .expect("valid normal");
        let c = Plane::from_normal(Point3::origin(), Vec3::x()).expect("valid normal");
        assert!(a.is_coplanar_with(&b, 0.01));
        assert!(!a.is_coplanar_with(&b, 1e-6));
        assert!(!a.is_coplanar_with(&c, 0.01));
    }
}
