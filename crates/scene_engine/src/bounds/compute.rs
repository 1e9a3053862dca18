//! Bounding volume computation from position buffers
//!
//! Everything here is pure and uncached; memoization belongs to the caller.

use super::volume::{BBox, BSphere};
use crate::foundation::math::Vec3;
use crate::scene::Geometry;

/// Iterate the positions of a flat buffer as points.
/// Components beyond the third are ignored; missing ones read as zero.
fn points(values: &[f32], item_size: usize) -> impl Iterator<Item = Vec3> + Clone + '_ {
    values.chunks_exact(item_size.max(1)).map(|chunk| {
        Vec3::new(
            chunk.first().copied().unwrap_or(0.0),
            chunk.get(1).copied().unwrap_or(0.0),
            chunk.get(2).copied().unwrap_or(0.0),
        )
    })
}

fn position_points(geometry: &Geometry) -> Option<(&[f32], usize)> {
    let attribute = geometry.position()?;
    let values = geometry.position_values()?;
    Some((values, attribute.item_size()))
}

/// Axis-aligned box around every position.
///
/// Returns [`BBox::infinite`] when the geometry has no usable positions.
pub fn compute_bbox(geometry: &Geometry) -> BBox {
    let Some((values, item_size)) = position_points(geometry) else {
        return BBox::infinite();
    };

    let mut bbox = BBox::empty();
    for p in points(values, item_size) {
        bbox.expand_by_point(&p);
    }

    if bbox.is_empty() {
        BBox::infinite()
    } else {
        bbox
    }
}

/// Approximate minimal enclosing sphere (Ritter).
///
/// Returns [`BSphere::infinite`] when the geometry has no usable positions.
pub fn compute_bsphere(geometry: &Geometry) -> BSphere {
    let Some((values, item_size)) = position_points(geometry) else {
        return BSphere::infinite();
    };
    ritter_sphere(points(values, item_size)).unwrap_or_else(BSphere::infinite)
}

fn ritter_sphere<I>(points: I) -> Option<BSphere>
where
    I: Iterator<Item = Vec3> + Clone,
{
    // Pass 1: extreme points per axis, widest pair seeds the sphere
    let mut iter = points.clone();
    let first = iter.next()?;
    let mut min_pts = [first; 3];
    let mut max_pts = [first; 3];

    for p in iter {
        for axis in 0..3 {
            if p[axis] < min_pts[axis][axis] {
                min_pts[axis] = p;
            }
            if p[axis] > max_pts[axis][axis] {
                max_pts[axis] = p;
            }
        }
    }

    let mut seed = 0;
    let mut widest = 0.0;
    for axis in 0..3 {
        let d = (max_pts[axis] - min_pts[axis]).norm_squared();
        if d > widest {
            widest = d;
            seed = axis;
        }
    }

    let mut center = (min_pts[seed] + max_pts[seed]) * 0.5;
    let mut radius = widest.sqrt() * 0.5;

    // Pass 2: pull the sphere toward every outlier
    for p in points {
        let offset = p - center;
        let dist_sq = offset.norm_squared();
        if dist_sq > radius * radius {
            let dist = dist_sq.sqrt();
            let new_radius = (radius + dist) * 0.5;
            center += offset * ((new_radius - radius) / dist);
            radius = new_radius;
        }
    }

    Some(BSphere::new(center, radius))
}

/// Box enclosing a sphere
pub fn bbox_from_bsphere(sphere: &BSphere) -> BBox {
    if sphere.is_infinite() {
        return BBox::infinite();
    }
    BBox::from_center_extents(sphere.center, Vec3::repeat(sphere.radius))
}

/// Sphere enclosing a box, centered on it with the half diagonal as radius
pub fn bsphere_from_bbox(bbox: &BBox) -> BSphere {
    if bbox.is_infinite() || bbox.is_empty() {
        return BSphere::infinite();
    }
    BSphere::new(bbox.center(), bbox.size().norm() * 0.5)
}

/// Local bounds of a geometry, honoring user-supplied volumes.
///
/// A geometry carrying both volumes keeps them; one carrying a single volume
/// gets the other derived from it; otherwise both come from the positions.
pub fn geometry_bounds(geometry: &Geometry) -> (BBox, BSphere) {
    match (geometry.bounding_box, geometry.bounding_sphere) {
        (Some(bbox), Some(sphere)) => (bbox, sphere),
        (Some(bbox), None) => (bbox, bsphere_from_bbox(&bbox)),
        (None, Some(sphere)) => (bbox_from_bsphere(&sphere), sphere),
        (None, None) => (compute_bbox(geometry), compute_bsphere(geometry)),
    }
}

/// Fill in whichever local volumes the geometry lacks.
/// Returns `true` if anything was written.
pub fn complete_bounds(geometry: &mut Geometry) -> bool {
    if geometry.bounding_box.is_some() && geometry.bounding_sphere.is_some() {
        return false;
    }
    let (bbox, sphere) = geometry_bounds(geometry);
    geometry.bounding_box = Some(bbox);
    geometry.bounding_sphere = Some(sphere);
    true
}
