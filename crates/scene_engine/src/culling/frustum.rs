//! View frustum and its planes
//!
//! Planes are extracted from a combined view-projection matrix with the
//! Gribb/Hartmann method. Normals point into the frustum, so a point is
//! inside when its signed distance to all six planes is non-negative.

use crate::bounds::{BBox, BSphere};
use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the kept half-space
    pub normal: Vec3,
    /// Distance term of `normal · p + distance = 0`
    pub distance: f32,
}

impl Plane {
    /// Plane from the coefficients of `ax + by + cz + d = 0`, normalized
    pub fn from_coefficients(c: Vec4) -> Self {
        let length = c.xyz().norm();
        if length < f32::EPSILON {
            return Self {
                normal: Vec3::y(),
                distance: 0.0,
            };
        }
        Self {
            normal: c.xyz() / length,
            distance: c.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    /// A frustum that contains everything
    fn default() -> Self {
        let open = Plane {
            normal: Vec3::y(),
            distance: f32::INFINITY,
        };
        Self { planes: [open; 6] }
    }
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    pub fn from_projection(m: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0), // left
                Plane::from_coefficients(r3 - r0), // right
                Plane::from_coefficients(r3 + r1), // bottom
                Plane::from_coefficients(r3 - r1), // top
                Plane::from_coefficients(r3 + r2), // near
                Plane::from_coefficients(r3 - r2), // far
            ],
        }
    }

    /// Whether a sphere touches the frustum. Infinite spheres always do.
    pub fn intersects_sphere(&self, sphere: &BSphere) -> bool {
        if sphere.is_infinite() {
            return true;
        }
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(&sphere.center) >= -sphere.radius)
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_box(&self, bbox: &BBox) -> bool {
        if bbox.is_infinite() {
            return true;
        }
        for plane in &self.planes {
            // corner furthest along the plane normal
            let p = Vec3::new(
                if plane.normal.x > 0.0 { bbox.max.x } else { bbox.min.x },
                if plane.normal.y > 0.0 { bbox.max.y } else { bbox.min.y },
                if plane.normal.z > 0.0 { bbox.max.z } else { bbox.min.z },
            );
            if plane.distance_to_point(&p) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Whether a point lies inside all six planes
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::make_perspective;

    // 90 degree symmetric frustum looking down -Z from the origin
    fn frustum() -> Frustum {
        Frustum::from_projection(&make_perspective(-0.1, 0.1, 0.1, -0.1, 0.1, 100.0))
    }

    #[test]
    fn test_contains_point() {
        let f = frustum();
        assert!(f.contains_point(&Vec3::new(0.0, 0.0, -1.0)));
        assert!(!f.contains_point(&Vec3::new(0.0, 0.0, 1.0)));
        assert!(!f.contains_point(&Vec3::new(0.0, 0.0, -200.0)));
        assert!(!f.contains_point(&Vec3::new(5.0, 0.0, -1.0)));
    }

    #[test]
    fn test_sphere_outside_every_plane() {
        let f = frustum();
        assert!(f.intersects_sphere(&BSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)));
        // straddling the left plane still intersects
        assert!(f.intersects_sphere(&BSphere::new(Vec3::new(-10.5, 0.0, -10.0), 1.0)));
        assert!(!f.intersects_sphere(&BSphere::new(Vec3::new(0.0, 0.0, 50.0), 1.0)));
    }

    #[test]
    fn test_box_test() {
        let f = frustum();
        let inside = BBox::from_center_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::repeat(1.0));
        let behind = BBox::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::repeat(1.0));

        assert!(f.intersects_box(&inside));
        assert!(!f.intersects_box(&behind));
    }

    #[test]
    fn test_infinite_volumes_always_intersect() {
        let f = frustum();
        assert!(f.intersects_box(&BBox::infinite()));
        assert!(f.intersects_sphere(&BSphere::infinite()));
    }

    #[test]
    fn test_default_frustum_keeps_everything() {
        let f = Frustum::default();
        assert!(f.intersects_sphere(&BSphere::new(Vec3::new(1e6, 0.0, 0.0), 0.0)));
    }
}
