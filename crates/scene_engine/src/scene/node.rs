//! Scene nodes and their versioned transforms

use super::geometry::Geometry;
use super::graph::NodeKey;
use super::material::Material;
use crate::foundation::math::{self, Euler, Mat4, Quat, Vec3};

/// Transform version that disables every cache for the transform
pub const UNCACHED_VERSION: i64 = -1;

/// Translation / rotation / scale fields.
///
/// Fields are optional because nodes may arrive from a loose scene
/// description; resolving a matrix from an incomplete set is an error.
/// When both `quaternion` and `rotation` are present the quaternion wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trs {
    /// Translation
    pub position: Option<Vec3>,
    /// Euler rotation, used when `quaternion` is absent
    pub rotation: Option<Euler>,
    /// Quaternion rotation
    pub quaternion: Option<Quat>,
    /// Scale
    pub scale: Option<Vec3>,
}

impl Trs {
    /// Fully specified identity TRS
    pub fn identity() -> Self {
        Self {
            position: Some(Vec3::zeros()),
            rotation: Some(Euler::default()),
            quaternion: None,
            scale: Some(Vec3::new(1.0, 1.0, 1.0)),
        }
    }
}

/// Local transform payload: either an explicit matrix or TRS fields
#[derive(Debug, Clone, PartialEq)]
pub enum TransformData {
    /// Explicit local matrix
    Matrix(Mat4),
    /// Matrix composed from translation, rotation and scale
    Trs(Trs),
}

/// A node's local transform plus its cache version.
///
/// Every setter bumps `version`; a version of [`UNCACHED_VERSION`] means the
/// transform is recomputed on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    data: TransformData,
    version: i64,
    world_matrix: Option<Mat4>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity TRS transform at version 0
    pub fn identity() -> Self {
        Self::from_data(TransformData::Trs(Trs::identity()))
    }

    /// Transform from arbitrary data at version 0
    pub const fn from_data(data: TransformData) -> Self {
        Self {
            data,
            version: 0,
            world_matrix: None,
        }
    }

    /// TRS transform with a quaternion rotation
    pub const fn from_trs(position: Vec3, quaternion: Quat, scale: Vec3) -> Self {
        Self::from_data(TransformData::Trs(Trs {
            position: Some(position),
            rotation: None,
            quaternion: Some(quaternion),
            scale: Some(scale),
        }))
    }

    /// TRS transform with only a translation
    pub fn from_position(position: Vec3) -> Self {
        Self::from_trs(position, Quat::identity(), Vec3::new(1.0, 1.0, 1.0))
    }

    /// Explicit-matrix transform
    pub const fn from_matrix(matrix: Mat4) -> Self {
        Self::from_data(TransformData::Matrix(matrix))
    }

    /// Builder: disable caching for this transform
    #[must_use]
    pub const fn uncached(mut self) -> Self {
        self.version = UNCACHED_VERSION;
        self
    }

    /// Current payload
    pub const fn data(&self) -> &TransformData {
        &self.data
    }

    /// Current version
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Whether caching is disabled
    pub const fn is_uncached(&self) -> bool {
        self.version == UNCACHED_VERSION
    }

    /// Override the version directly
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Mark the transform changed without touching its data
    pub fn mark_dirty(&mut self) {
        if self.version != UNCACHED_VERSION {
            self.version += 1;
        }
    }

    /// Replace the whole payload
    pub fn set_data(&mut self, data: TransformData) {
        self.data = data;
        self.mark_dirty();
    }

    /// Switch to (or update) an explicit matrix
    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.set_data(TransformData::Matrix(matrix));
    }

    /// Set the translation, converting a matrix transform to TRS if needed
    pub fn set_position(&mut self, position: Vec3) {
        self.update_trs(|trs| trs.position = Some(position));
    }

    /// Set the Euler rotation and clear any quaternion so the Euler applies
    pub fn set_rotation(&mut self, rotation: Euler) {
        self.update_trs(|trs| {
            trs.rotation = Some(rotation);
            trs.quaternion = None;
        });
    }

    /// Set the quaternion rotation
    pub fn set_quaternion(&mut self, quaternion: Quat) {
        self.update_trs(|trs| trs.quaternion = Some(quaternion));
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.update_trs(|trs| trs.scale = Some(scale));
    }

    /// TRS fields, if this is a TRS transform
    pub const fn trs(&self) -> Option<&Trs> {
        match &self.data {
            TransformData::Trs(trs) => Some(trs),
            TransformData::Matrix(_) => None,
        }
    }

    // a matrix transform restarts from identity TRS
    fn update_trs(&mut self, f: impl FnOnce(&mut Trs)) {
        let mut trs = match &self.data {
            TransformData::Trs(trs) => trs.clone(),
            TransformData::Matrix(_) => Trs::identity(),
        };
        f(&mut trs);
        self.set_data(TransformData::Trs(trs));
    }

    /// Resolved world matrix, written by the refiner or bulk resolver
    pub const fn world_matrix(&self) -> Option<&Mat4> {
        self.world_matrix.as_ref()
    }

    /// Resolved world matrix as a column-major array
    pub fn to_array(&self) -> Option<[f32; 16]> {
        self.world_matrix.as_ref().map(math::to_array)
    }

    pub(crate) fn set_world_matrix(&mut self, matrix: Mat4) {
        self.world_matrix = Some(matrix);
    }
}

/// Per-node metadata slot written by the visibility pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderState {
    /// Outside the camera frustum on the last culling pass
    pub frustum_culled: bool,
}

/// A scene graph element
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name
    pub name: String,
    /// Hidden nodes are skipped by culling and picking
    pub visible: bool,
    /// Local transform
    pub transform: Transform,
    /// Geometry of renderable nodes
    pub geometry: Option<Geometry>,
    /// Material of renderable nodes
    pub material: Option<Material>,
    /// Per-node culling switch; `false` keeps the node always drawn
    pub frustum_culling: bool,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) render_state: RenderState,
}

impl Node {
    /// Create a container node with an identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            transform: Transform::identity(),
            geometry: None,
            material: None,
            frustum_culling: true,
            parent: None,
            children: Vec::new(),
            render_state: RenderState::default(),
        }
    }

    /// Create a renderable node
    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        let mut node = Self::new(name);
        node.geometry = Some(geometry);
        node.material = Some(material);
        node
    }

    /// Builder: set the local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Parent key, if attached
    pub const fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child keys (membership matters, order does not)
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Has both geometry and material
    pub const fn is_renderable(&self) -> bool {
        self.geometry.is_some() && self.material.is_some()
    }

    /// Metadata written by the visibility pass
    pub const fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Outside the frustum on the last culling pass
    pub const fn is_frustum_culled(&self) -> bool {
        self.render_state.frustum_culled
    }
}
