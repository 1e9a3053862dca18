//! Per-frame visibility refinement
//!
//! One [`VisibilityRefiner::update`] call per frame walks the scene with an
//! explicit stack, keeps bounds complete, refreshes world matrices only where
//! the snapshot comparison says something moved, and frustum-culls renderable
//! nodes. Work is proportional to the changed subtrees, not the whole graph.

use std::collections::HashSet;

use slotmap::SecondaryMap;

use super::observable::ObservableNode;
use crate::bounds;
use crate::config::{RefinerConfig, ResolverConfig};
use crate::culling::{CameraParams, Frustum};
use crate::error::{Result, SceneError};
use crate::scene::{DrawMode, Node, NodeKey, SceneGraph};
use crate::transform::TransformResolver;

/// Diagnostics of the last update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefinerInfo {
    /// Renderable nodes found outside the frustum this frame
    pub culled_count: usize,
    /// Nodes visited this frame
    pub visited_count: usize,
}

/// Dirty flags carried down one branch of the traversal.
/// Each child receives its own copy.
#[derive(Debug, Clone, Copy, Default)]
struct UpdateOptions {
    world_matrix_needs_update: bool,
}

#[derive(Debug, Clone, Copy)]
struct UpdateTask {
    key: NodeKey,
    options: UpdateOptions,
    depth: usize,
}

/// Keeps world matrices, bounds and cull flags of a scene current
#[derive(Debug)]
pub struct VisibilityRefiner {
    config: RefinerConfig,
    resolver: TransformResolver,
    snapshots: SecondaryMap<NodeKey, ObservableNode>,
    frustum: Frustum,
    info: RefinerInfo,
    queue: Vec<UpdateTask>,
}

impl Default for VisibilityRefiner {
    fn default() -> Self {
        Self::new(RefinerConfig::default(), ResolverConfig::default())
    }
}

impl VisibilityRefiner {
    /// Create a refiner with its own transform resolver
    pub fn new(config: RefinerConfig, resolver_config: ResolverConfig) -> Self {
        Self::with_resolver(config, TransformResolver::new(resolver_config))
    }

    /// Create a refiner around an existing resolver
    pub fn with_resolver(config: RefinerConfig, resolver: TransformResolver) -> Self {
        Self {
            config,
            resolver,
            snapshots: SecondaryMap::new(),
            frustum: Frustum::default(),
            info: RefinerInfo::default(),
            queue: Vec::new(),
        }
    }

    /// Active configuration
    pub const fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Replace the configuration; takes effect on the next update
    pub fn set_config(&mut self, config: RefinerConfig) {
        self.config = config;
    }

    /// Diagnostics of the last update
    pub const fn info(&self) -> RefinerInfo {
        self.info
    }

    /// Frustum built by the last update
    pub const fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// The resolver owning the matrix caches
    pub const fn resolver(&self) -> &TransformResolver {
        &self.resolver
    }

    /// Snapshot of a node, once it has been visited
    pub fn snapshot(&self, key: NodeKey) -> Option<&ObservableNode> {
        self.snapshots.get(key)
    }

    /// Drop snapshots and matrix caches of destroyed nodes
    pub fn forget(&mut self, keys: &[NodeKey]) {
        for &key in keys {
            self.snapshots.remove(key);
        }
        self.resolver.evict(keys);
    }

    /// Refine the subtree under `root` for one frame.
    ///
    /// # Errors
    /// A [`SceneError::SchemaNotValid`] from transform resolution aborts the
    /// frame. [`SceneError::NodeNotFound`] if `root` is not in the graph.
    pub fn update(&mut self, graph: &mut SceneGraph, root: NodeKey, camera: &CameraParams) -> Result<()> {
        if !graph.contains(root) {
            return Err(SceneError::NodeNotFound);
        }

        self.info = RefinerInfo::default();
        self.frustum = if self.config.frustum_culling {
            camera.frustum()
        } else {
            Frustum::default()
        };

        if !self.snapshots.contains_key(root) {
            self.observe(graph, root)?;
        }

        let mut queue = std::mem::take(&mut self.queue);
        queue.clear();
        queue.push(UpdateTask {
            key: root,
            options: UpdateOptions::default(),
            depth: 0,
        });

        let mut truncated = false;
        let result = loop {
            let Some(task) = queue.pop() else {
                break Ok(());
            };
            match self.visit(graph, task, &mut queue) {
                Ok(skipped) => truncated |= skipped,
                Err(e) => break Err(e),
            }
        };
        queue.clear();
        self.queue = queue;

        if truncated {
            log::warn!(
                "Scene deeper than {} levels, deeper subtrees were not refined",
                self.config.max_traversal_depth
            );
        }
        log::trace!(
            "Refined {} nodes, {} culled",
            self.info.visited_count,
            self.info.culled_count
        );
        result
    }

    /// Process one node. Returns whether its children were cut off by the
    /// depth cap.
    fn visit(&mut self, graph: &mut SceneGraph, task: UpdateTask, queue: &mut Vec<UpdateTask>) -> Result<bool> {
        let UpdateTask { key, mut options, depth } = task;
        if !self.snapshots.contains_key(key) {
            self.observe(graph, key)?;
        }
        self.info.visited_count += 1;

        let node = graph.get_mut(key).ok_or(SceneError::NodeNotFound)?;
        complete_node_bounds(node);

        // dirty check
        let changed = self
            .snapshots
            .get(key)
            .map_or(true, |snapshot| snapshot.transform_changed(node));
        if self.config.update_world_matrix && changed {
            options.world_matrix_needs_update = true;
        }

        if options.world_matrix_needs_update {
            let world = self.resolver.get_world_matrix(graph, key)?;
            let node = graph.get_mut(key).ok_or(SceneError::NodeNotFound)?;
            node.transform.set_world_matrix(world);

            if let Some(snapshot) = self.snapshots.get_mut(key) {
                snapshot.sync_transform(node);
                if self.config.frustum_culling {
                    snapshot.sync_bounds(node);
                }
            }
        }

        let node = graph.get_mut(key).ok_or(SceneError::NodeNotFound)?;
        let Some(snapshot) = self.snapshots.get_mut(key) else {
            return Err(SceneError::NodeNotFound);
        };

        if self.config.frustum_culling && snapshot.bounds_changed(node) {
            snapshot.sync_bounds(node);
        }

        // frustum test
        let renderable = node.visible
            && node.geometry.is_some()
            && node.material.as_ref().is_some_and(|m| m.visible);
        if self.config.frustum_culling && renderable {
            let is_sprite = node.geometry.as_ref().is_some_and(|g| g.mode == DrawMode::Sprite);
            if !node.frustum_culling {
                node.render_state.frustum_culled = false;
            } else if !is_sprite {
                let mut culled = !self.frustum.intersects_sphere(&snapshot.mesh_bsphere);
                if !culled {
                    culled = !self.frustum.intersects_box(&snapshot.mesh_bbox);
                }
                node.render_state.frustum_culled = culled;
                if culled {
                    self.info.culled_count += 1;
                }
            }
        }
        if !self.config.frustum_culling && node.render_state.frustum_culled {
            node.render_state.frustum_culled = false;
        }

        if depth + 1 >= self.config.max_traversal_depth {
            return Ok(!node.children.is_empty());
        }

        // structural reconciliation
        let children = node.children.clone();
        let current: HashSet<NodeKey> = children.iter().copied().collect();
        snapshot.children.retain(|child| current.contains(child));
        let added: Vec<NodeKey> = children
            .iter()
            .copied()
            .filter(|child| snapshot.children.insert(*child))
            .collect();
        for child in added {
            if !self.snapshots.contains_key(child) {
                self.observe(graph, child)?;
            }
        }

        queue.extend(children.into_iter().map(|child| UpdateTask {
            key: child,
            options,
            depth: depth + 1,
        }));
        Ok(false)
    }

    /// First sight of a node: resolve its world matrix, complete its bounds
    /// and take the initial snapshot.
    fn observe(&mut self, graph: &mut SceneGraph, key: NodeKey) -> Result<()> {
        let world = self.resolver.get_world_matrix(graph, key)?;
        let node = graph.get_mut(key).ok_or(SceneError::NodeNotFound)?;
        node.transform.set_world_matrix(world);
        complete_node_bounds(node);
        self.snapshots.insert(key, ObservableNode::from_node(node));
        Ok(())
    }
}

fn complete_node_bounds(node: &mut Node) {
    let Some(geometry) = node.geometry.as_mut() else {
        return;
    };
    if geometry.bounding_box.is_some() && geometry.bounding_sphere.is_some() {
        return;
    }
    if geometry.position_values().is_none() {
        log::warn!("Mesh '{}' has no usable positions, bounds default to infinite", node.name);
    }
    bounds::complete_bounds(geometry);
}
