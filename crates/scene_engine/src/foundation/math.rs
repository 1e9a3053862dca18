//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph: nalgebra
//! aliases, Euler rotations with an explicit axis order, TRS composition and
//! the off-center perspective projection used to build culling frustums.

use std::fmt;
use std::str::FromStr;

use crate::error::SceneError;

pub use nalgebra::{Matrix4, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Order in which Euler angles are applied.
///
/// `Xyz` means the rotation matrix is `Rx * Ry * Rz`, matching the
/// convention of most web-facing scene descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EulerOrder {
    /// X, then Y, then Z
    #[default]
    Xyz,
    /// Y, then Z, then X
    Yzx,
    /// Z, then X, then Y
    Zxy,
    /// X, then Z, then Y
    Xzy,
    /// Y, then X, then Z
    Yxz,
    /// Z, then Y, then X
    Zyx,
}

impl EulerOrder {
    /// Axis sequence of this order as unit-axis indices (0 = X, 1 = Y, 2 = Z)
    pub const fn axes(self) -> [usize; 3] {
        match self {
            Self::Xyz => [0, 1, 2],
            Self::Yzx => [1, 2, 0],
            Self::Zxy => [2, 0, 1],
            Self::Xzy => [0, 2, 1],
            Self::Yxz => [1, 0, 2],
            Self::Zyx => [2, 1, 0],
        }
    }

    /// Upper-case name, e.g. `"XYZ"`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xyz => "XYZ",
            Self::Yzx => "YZX",
            Self::Zxy => "ZXY",
            Self::Xzy => "XZY",
            Self::Yxz => "YXZ",
            Self::Zyx => "ZYX",
        }
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EulerOrder {
    type Err = SceneError;

    /// Parses an order name case-insensitively (`"xyz"` and `"XYZ"` are equal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "XYZ" => Ok(Self::Xyz),
            "YZX" => Ok(Self::Yzx),
            "ZXY" => Ok(Self::Zxy),
            "XZY" => Ok(Self::Xzy),
            "YXZ" => Ok(Self::Yxz),
            "ZYX" => Ok(Self::Zyx),
            other => Err(SceneError::SchemaNotValid(format!(
                "unknown euler order `{other}`"
            ))),
        }
    }
}

/// Euler rotation in radians with an explicit application order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Euler {
    /// Rotation around X
    pub x: f32,
    /// Rotation around Y
    pub y: f32,
    /// Rotation around Z
    pub z: f32,
    /// Axis order
    pub order: EulerOrder,
}

impl Euler {
    /// Create an Euler rotation
    pub const fn new(x: f32, y: f32, z: f32, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Convert to a unit quaternion.
    ///
    /// The per-axis rotations are multiplied in the listed order, so `Xyz`
    /// yields `qx * qy * qz`.
    pub fn to_quaternion(&self) -> Quat {
        let angles = [self.x, self.y, self.z];
        let axes = [Vec3::x_axis(), Vec3::y_axis(), Vec3::z_axis()];

        self.order
            .axes()
            .iter()
            .fold(Quat::identity(), |acc, &axis| {
                acc * Quat::from_axis_angle(&axes[axis], angles[axis])
            })
    }
}

/// Compose a matrix from translation, rotation and scale (`T * R * S`).
pub fn compose(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
    Mat4::new_translation(position)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(scale)
}

/// Off-center perspective projection with an OpenGL-style `[-1, 1]` depth range.
///
/// `left`/`right`/`top`/`bottom` are the extents of the near plane in view space.
pub fn make_perspective(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4 {
    let x = 2.0 * near / (right - left);
    let y = 2.0 * near / (top - bottom);

    let a = (right + left) / (right - left);
    let b = (top + bottom) / (top - bottom);
    let c = -(far + near) / (far - near);
    let d = -2.0 * far * near / (far - near);

    #[rustfmt::skip]
    let m = Mat4::new(
        x,   0.0, a,    0.0,
        0.0, y,   b,    0.0,
        0.0, 0.0, c,    d,
        0.0, 0.0, -1.0, 0.0,
    );
    m
}

/// Largest scale factor applied by the matrix along any of its basis axes
pub fn max_scale_on_axis(m: &Mat4) -> f32 {
    let sx = m.fixed_view::<3, 1>(0, 0).norm_squared();
    let sy = m.fixed_view::<3, 1>(0, 1).norm_squared();
    let sz = m.fixed_view::<3, 1>(0, 2).norm_squared();
    sx.max(sy).max(sz).sqrt()
}

/// Average scale factor of the matrix's basis axes
pub fn average_scale(m: &Mat4) -> f32 {
    let sx = m.fixed_view::<3, 1>(0, 0).norm();
    let sy = m.fixed_view::<3, 1>(0, 1).norm();
    let sz = m.fixed_view::<3, 1>(0, 2).norm();
    (sx + sy + sz) / 3.0
}

/// Transform a point by a homogeneous matrix, including the perspective divide
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    let v = m * Vec4::new(p.x, p.y, p.z, 1.0);
    if v.w.abs() > f32::EPSILON {
        v.xyz() / v.w
    } else {
        v.xyz()
    }
}

/// Transform a direction by the upper 3x3 part of a matrix (no translation)
pub fn transform_direction(m: &Mat4, d: &Vec3) -> Vec3 {
    m.fixed_view::<3, 3>(0, 0) * d
}

/// Column-major array form of a matrix
pub fn to_array(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Build a matrix from a column-major array
pub fn from_array(values: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}

/// Math constants
pub mod constants {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}
