//! Frustum culling primitives

pub mod camera;
pub mod frustum;

pub use camera::{CameraParams, ViewOffset};
pub use frustum::{Frustum, Plane};
