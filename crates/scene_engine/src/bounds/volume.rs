//! Bounding volume types

use crate::foundation::math::{self, Mat4, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BBox {
    /// Create a box from its corners
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box covering all of space. Never culled, never rejects a ray.
    pub fn infinite() -> Self {
        Self {
            min: Vec3::repeat(f32::NEG_INFINITY),
            max: Vec3::repeat(f32::INFINITY),
        }
    }

    /// Inverted box, the identity for [`BBox::expand_by_point`]
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Box centered at a point with the given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Any side unbounded
    pub fn is_infinite(&self) -> bool {
        self.min.iter().any(|v| v.is_infinite()) || self.max.iter().any(|v| v.is_infinite())
    }

    /// No point has been added
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Grow to include a point
    pub fn expand_by_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Transform by a matrix and re-fit around the eight transformed corners.
    /// Infinite and empty boxes are returned unchanged.
    #[must_use]
    pub fn apply_matrix(&self, m: &Mat4) -> Self {
        if self.is_infinite() || self.is_empty() {
            return *self;
        }
        let mut out = Self::empty();
        for corner in &self.corners() {
            out.expand_by_point(&math::transform_point(m, corner));
        }
        out
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BSphere {
    /// Center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl BSphere {
    /// Create a sphere
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere covering all of space
    pub fn infinite() -> Self {
        Self {
            center: Vec3::zeros(),
            radius: f32::INFINITY,
        }
    }

    /// Unbounded radius
    pub fn is_infinite(&self) -> bool {
        self.radius.is_infinite()
    }

    /// Check if this sphere contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Transform the center and scale the radius by the largest axis scale.
    /// Infinite spheres are returned unchanged.
    #[must_use]
    pub fn apply_matrix(&self, m: &Mat4) -> Self {
        if self.is_infinite() {
            return *self;
        }
        Self {
            center: math::transform_point(m, &self.center),
            radius: self.radius * math::max_scale_on_axis(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_expand_and_center() {
        let mut bbox = BBox::empty();
        assert!(bbox.is_empty());

        bbox.expand_by_point(&Vec3::new(-1.0, 0.0, 2.0));
        bbox.expand_by_point(&Vec3::new(3.0, 4.0, 0.0));

        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(3.0, 4.0, 2.0));
        assert_relative_eq!(bbox.center(), Vec3::new(1.0, 2.0, 1.0));
        assert!(bbox.contains_point(&Vec3::new(3.0, 0.0, 1.0)));
        assert!(!bbox.contains_point(&Vec3::new(3.0, 0.0, 2.5)));
    }

    #[test]
    fn test_box_apply_matrix_refits_rotated_corners() {
        let bbox = BBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let rotation = Mat4::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4);
        let m = Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)) * rotation;

        let out = bbox.apply_matrix(&m);
        let r = std::f32::consts::SQRT_2;

        assert_relative_eq!(out.min, Vec3::new(5.0 - r, -r, -1.0), epsilon = 1e-5);
        assert_relative_eq!(out.max, Vec3::new(5.0 + r, r, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_infinite_volumes_survive_transforms() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));

        assert!(BBox::infinite().apply_matrix(&m).is_infinite());
        assert!(BSphere::infinite().apply_matrix(&m).is_infinite());
    }

    #[test]
    fn test_sphere_apply_matrix_uses_largest_scale() {
        let sphere = BSphere::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let m = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 3.0, 2.0));

        let out = sphere.apply_matrix(&m);
        assert_relative_eq!(out.center, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(out.radius, 6.0);
        assert!(out.contains_point(&Vec3::new(1.0, 6.0, 0.0)));
        assert!(!out.contains_point(&Vec3::new(1.0, 6.0, 0.5)));
    }
}
