//! Bounding volumes and the functions that compute them

pub mod compute;
pub mod volume;

pub use compute::{
    bbox_from_bsphere, bsphere_from_bbox, complete_bounds, compute_bbox, compute_bsphere,
    geometry_bounds,
};
pub use volume::{BBox, BSphere};
