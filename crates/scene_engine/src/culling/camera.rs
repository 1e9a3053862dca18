//! Camera parameters handed to the per-frame update

use nalgebra::{Isometry3, Translation3};

use super::frustum::Frustum;
use crate::foundation::math::{self, utils, Euler, Mat4, Vec3};

/// Sub-rectangle of a larger virtual viewport, for tiled or partial rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOffset {
    /// Width of the sub-view
    pub width: f32,
    /// Height of the sub-view
    pub height: f32,
    /// Horizontal offset of the sub-view
    pub offset_x: f32,
    /// Vertical offset of the sub-view
    pub offset_y: f32,
    /// Width of the full view
    pub full_width: f32,
    /// Height of the full view
    pub full_height: f32,
}

/// Perspective camera description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    /// World-space position
    pub position: Vec3,
    /// World-space orientation
    pub rotation: Euler,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Width over height
    pub aspect: f32,
    /// Optional asymmetric sub-view
    pub view_offset: Option<ViewOffset>,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Euler::default(),
            near: 0.1,
            far: 1000.0,
            fov: 50.0,
            aspect: 1.0,
            view_offset: None,
        }
    }
}

impl CameraParams {
    /// Camera looking down -Z from `position`
    pub fn new(position: Vec3, fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            fov,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    /// Builder: set the orientation
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Euler) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: restrict rendering to a sub-view
    #[must_use]
    pub const fn with_view_offset(mut self, view_offset: ViewOffset) -> Self {
        self.view_offset = Some(view_offset);
        self
    }

    fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation.to_quaternion())
    }

    /// Camera world matrix (unit scale)
    pub fn world_matrix(&self) -> Mat4 {
        self.isometry().to_homogeneous()
    }

    /// Inverse of the camera world matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.isometry().inverse().to_homogeneous()
    }

    /// Perspective projection, honoring the view offset
    pub fn projection_matrix(&self) -> Mat4 {
        let near = self.near;
        let mut top = near * (utils::deg_to_rad(self.fov) * 0.5).tan();
        let mut height = 2.0 * top;
        let mut width = self.aspect * height;
        let mut left = -0.5 * width;

        if let Some(view) = &self.view_offset {
            left += view.offset_x * width / view.full_width;
            top -= view.offset_y * height / view.full_height;
            width *= view.width / view.full_width;
            height *= view.height / view.full_height;
        }

        math::make_perspective(left, left + width, top, top - height, near, self.far)
    }

    /// Culling frustum in world space
    pub fn frustum(&self) -> Frustum {
        Frustum::from_projection(&(self.projection_matrix() * self.view_matrix()))
    }
}
