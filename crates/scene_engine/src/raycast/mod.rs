//! Ray picking

pub mod ray;
pub mod raycaster;

pub use ray::Ray;
pub use raycaster::{Intersection, RaycastInfo, RaycastStats, Raycaster};
