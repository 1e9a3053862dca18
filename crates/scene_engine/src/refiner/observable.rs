//! Last-seen snapshots of live nodes
//!
//! A snapshot is only ever written after the refiner has confirmed a change,
//! so it always describes a previous state of its node and never runs ahead
//! of it.

use std::collections::HashSet;

use crate::bounds::{BBox, BSphere};
use crate::foundation::math::Mat4;
use crate::scene::{Node, NodeKey, TransformData};

/// Shadow copy of the parts of a node the refiner dirty-checks
#[derive(Debug, Clone)]
pub struct ObservableNode {
    /// Local transform payload when last synced
    pub transform: Option<TransformData>,
    /// Transform version when last synced
    pub version: i64,
    /// Parent when last synced
    pub parent: Option<NodeKey>,
    /// Resolved world matrix when last synced
    pub world_matrix: Mat4,
    /// Geometry-local bounding box when last synced
    pub geom_bbox: Option<BBox>,
    /// Geometry-local bounding sphere when last synced
    pub geom_bsphere: Option<BSphere>,
    /// World-space box used by the frustum test
    pub mesh_bbox: BBox,
    /// World-space sphere used by the frustum test
    pub mesh_bsphere: BSphere,
    /// Children this snapshot has already seen
    pub children: HashSet<NodeKey>,
}

impl Default for ObservableNode {
    fn default() -> Self {
        Self {
            transform: None,
            version: 0,
            parent: None,
            world_matrix: Mat4::identity(),
            geom_bbox: None,
            geom_bsphere: None,
            mesh_bbox: BBox::infinite(),
            mesh_bsphere: BSphere::infinite(),
            children: HashSet::new(),
        }
    }
}

impl ObservableNode {
    /// Snapshot the current state of a node whose world matrix is resolved
    pub fn from_node(node: &Node) -> Self {
        let mut snapshot = Self::default();
        snapshot.sync_transform(node);
        snapshot.sync_bounds(node);
        snapshot
    }

    /// Whether the node's transform or parent moved since the last sync
    pub fn transform_changed(&self, node: &Node) -> bool {
        self.transform.as_ref() != Some(node.transform.data())
            || self.version != node.transform.version()
            || self.parent != node.parent()
            || node.transform.world_matrix().is_none()
    }

    /// Whether the geometry's local volumes differ from the memoized ones
    pub fn bounds_changed(&self, node: &Node) -> bool {
        let (bbox, bsphere) = node
            .geometry
            .as_ref()
            .map_or((None, None), |g| (g.bounding_box, g.bounding_sphere));
        self.geom_bbox != bbox || self.geom_bsphere != bsphere
    }

    /// Copy the node's transform, parent and world matrix
    pub fn sync_transform(&mut self, node: &Node) {
        self.transform = Some(node.transform.data().clone());
        self.version = node.transform.version();
        self.parent = node.parent();
        if let Some(world) = node.transform.world_matrix() {
            self.world_matrix = *world;
        }
    }

    /// Memoize the geometry's local volumes and rebuild the world-space ones
    pub fn sync_bounds(&mut self, node: &Node) {
        let Some(geometry) = &node.geometry else {
            self.geom_bbox = None;
            self.geom_bsphere = None;
            self.mesh_bbox = BBox::infinite();
            self.mesh_bsphere = BSphere::infinite();
            return;
        };

        self.geom_bbox = geometry.bounding_box;
        self.geom_bsphere = geometry.bounding_sphere;
        self.mesh_bbox = geometry
            .bounding_box
            .map_or_else(BBox::infinite, |b| b.apply_matrix(&self.world_matrix));
        self.mesh_bsphere = geometry
            .bounding_sphere
            .map_or_else(BSphere::infinite, |s| s.apply_matrix(&self.world_matrix));
    }
}
