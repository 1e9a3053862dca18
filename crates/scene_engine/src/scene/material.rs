//! Material data read by the visibility and picking passes
//!
//! Shading is a backend concern; only visibility, facing and the sprite
//! layout parameters matter here.

use crate::foundation::math::Vec2;

/// Which triangle faces are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Counter-clockwise faces only
    #[default]
    Front,
    /// Clockwise faces only
    Back,
    /// Both faces
    Double,
}

/// Billboard layout parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteParams {
    /// Quad size, in world units (or screen-proportional units without attenuation)
    pub size: Vec2,
    /// Pivot of the quad in uv space; `(0.5, 0.5)` is the quad center
    pub center: Vec2,
    /// Rotation of the quad in the view plane, radians
    pub rotation: f32,
    /// Shrink with distance like regular geometry
    pub size_attenuation: bool,
    /// Read per-instance sizes from the `size` attribute instead of `size`
    pub use_attr_size: bool,
}

impl Default for SpriteParams {
    fn default() -> Self {
        Self {
            size: Vec2::new(1.0, 1.0),
            center: Vec2::new(0.5, 0.5),
            rotation: 0.0,
            size_attenuation: true,
            use_attr_size: false,
        }
    }
}

/// Material family
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Point cloud material
    Point,
    /// Unlit material
    Unlit,
    /// Physically based material
    Pbr,
    /// Camera-facing billboard material
    Sprite(SpriteParams),
}

/// Material attached to a renderable node
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material family
    pub kind: MaterialKind,
    /// Hidden materials are neither culled nor picked
    pub visible: bool,
    /// Rendered faces
    pub side: Side,
    /// Vertex positions are rewritten on the GPU; CPU picking would be wrong
    pub vertex_modified: bool,
}

impl Material {
    /// Create a visible, front-sided material
    pub const fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            visible: true,
            side: Side::Front,
            vertex_modified: false,
        }
    }

    /// Unlit material shortcut
    pub const fn unlit() -> Self {
        Self::new(MaterialKind::Unlit)
    }

    /// Sprite material shortcut
    pub const fn sprite(params: SpriteParams) -> Self {
        Self::new(MaterialKind::Sprite(params))
    }

    /// Builder: set rendered faces
    #[must_use]
    pub const fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Sprite parameters, if this is a sprite material
    pub const fn sprite_params(&self) -> Option<&SpriteParams> {
        match &self.kind {
            MaterialKind::Sprite(params) => Some(params),
            _ => None,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::unlit()
    }
}
