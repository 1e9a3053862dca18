//! Ray primitive and its intersection tests

use crate::bounds::{BBox, BSphere};
use crate::foundation::math::{self, Mat4, Vec3};

const EPSILON: f32 = 1e-6;

/// A ray in 3D space, defined by an origin point and a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::zeros(),
            direction: -Vec3::z(),
        }
    }
}

impl Ray {
    /// Creates a new ray; the direction is normalized
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(EPSILON).unwrap_or_else(|| -Vec3::z()),
        }
    }

    /// Point at parameter `t`
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform origin as a point and direction as a vector, renormalizing
    #[must_use]
    pub fn apply_matrix(&self, m: &Mat4) -> Self {
        Self::new(math::transform_point(m, &self.origin), math::transform_direction(m, &self.direction))
    }

    /// Squared distance from a point to the closest point of the ray
    pub fn distance_sq_to_point(&self, point: &Vec3) -> f32 {
        let t = (point - self.origin).dot(&self.direction).max(0.0);
        (self.at(t) - point).norm_squared()
    }

    /// Whether the ray passes through a sphere. Infinite spheres always pass.
    pub fn intersects_sphere(&self, sphere: &BSphere) -> bool {
        sphere.is_infinite() || self.distance_sq_to_point(&sphere.center) <= sphere.radius * sphere.radius
    }

    /// Slab test; returns the entry distance, or 0 when starting inside.
    pub fn intersect_box(&self, bbox: &BBox) -> Option<f32> {
        let inv_dir = self.direction.map(|d| if d == 0.0 { f32::INFINITY } else { 1.0 / d });

        let t1 = (bbox.min - self.origin).component_mul(&inv_dir);
        let t2 = (bbox.max - self.origin).component_mul(&inv_dir);

        let tmin = t1.inf(&t2).max();
        let tmax = t1.sup(&t2).min();

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// Whether the ray passes through a box. Infinite boxes always pass.
    pub fn intersects_box(&self, bbox: &BBox) -> bool {
        bbox.is_infinite() || self.intersect_box(bbox).is_some()
    }

    /// Möller-Trumbore ray/triangle test.
    ///
    /// With `backface_culling` only counter-clockwise (front) faces are hit.
    /// Returns the hit point.
    pub fn intersect_triangle(&self, a: &Vec3, b: &Vec3, c: &Vec3, backface_culling: bool) -> Option<Vec3> {
        let edge1 = b - a;
        let edge2 = c - a;

        let h = self.direction.cross(&edge2);
        let det = edge1.dot(&h);

        if backface_culling {
            if det < EPSILON {
                return None;
            }
        } else if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;

        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = inv_det * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(&q);
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }

    /// Closest approach between the ray and segment `v0..v1`.
    ///
    /// Returns the squared distance, the point on the ray and the point on
    /// the segment.
    pub fn distance_sq_to_segment(&self, v0: &Vec3, v1: &Vec3) -> (f32, Vec3, Vec3) {
        let d2 = v1 - v0;
        let r = self.origin - v0;
        let e = d2.norm_squared();
        let c = self.direction.dot(&r);

        let (t, s) = if e <= EPSILON {
            ((-c).max(0.0), 0.0)
        } else {
            let b = self.direction.dot(&d2);
            let f = d2.dot(&r);
            let denom = e - b * b;

            let t = if denom > EPSILON { ((b * f - c * e) / denom).max(0.0) } else { 0.0 };
            let s = (b * t + f) / e;
            if s < 0.0 {
                ((-c).max(0.0), 0.0)
            } else if s > 1.0 {
                ((b - c).max(0.0), 1.0)
            } else {
                (t, s)
            }
        };

        let on_ray = self.at(t);
        let on_segment = v0 + d2 * s;
        ((on_ray - on_segment).norm_squared(), on_ray, on_segment)
    }
}
