//! Hierarchical transform resolution with dirty-checked caching
//!
//! Two cache tables live side by side, both keyed by [`NodeKey`]:
//!
//! - the local cache holds `{version, matrix}` and is valid while the
//!   transform's version is unchanged;
//! - the world cache additionally records which parent (by stable id) and
//!   which version of that parent's world entry the matrix was built from.
//!
//! A world entry is therefore invalidated by a local edit, by any ancestor
//! edit (the parent's world version moves) and by reparenting (the parent id
//! no longer matches), without walking the whole tree every frame.

use slotmap::SecondaryMap;

use crate::config::ResolverConfig;
use crate::error::{Result, SceneError};
use crate::foundation::math::{self, Mat4};
use crate::scene::{NodeKey, SceneGraph, Transform, TransformData};

/// Largest id that is still exactly representable as an `f64`
pub const MAX_NODE_ID: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy)]
struct LocalEntry {
    version: i64,
    matrix: Mat4,
}

#[derive(Debug, Clone, Copy)]
struct WorldEntry {
    version: u64,
    parent_version: Option<u64>,
    parent_id: Option<u64>,
    local_version: i64,
    matrix: Mat4,
}

/// Resolves local and world matrices for nodes of one [`SceneGraph`].
///
/// One resolver serves one graph; its cache rows are keyed by node handle
/// and must be evicted when the graph destroys nodes.
#[derive(Debug)]
pub struct TransformResolver {
    local_cache: SecondaryMap<NodeKey, LocalEntry>,
    world_cache: SecondaryMap<NodeKey, WorldEntry>,
    ids: SecondaryMap<NodeKey, u64>,
    next_id: u64,
    config: ResolverConfig,
}

impl Default for TransformResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl TransformResolver {
    /// Create an empty resolver
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            local_cache: SecondaryMap::new(),
            world_cache: SecondaryMap::new(),
            ids: SecondaryMap::new(),
            next_id: 0,
            config,
        }
    }

    /// Active configuration
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Stable per-node integer, assigned on first request.
    ///
    /// # Errors
    /// [`SceneError::IdExhausted`] once more than 2^53 - 1 ids were handed out.
    pub fn get_id(&mut self, key: NodeKey) -> Result<u64> {
        if let Some(&id) = self.ids.get(key) {
            return Ok(id);
        }
        if self.next_id > MAX_NODE_ID {
            return Err(SceneError::IdExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(key, id);
        Ok(id)
    }

    /// Local matrix of a node.
    ///
    /// Transforms at version -1 are recomputed on every call; everything else
    /// is served from the local cache while the version matches.
    ///
    /// # Errors
    /// [`SceneError::SchemaNotValid`] when TRS fields are missing,
    /// [`SceneError::NodeNotFound`] for stale keys.
    pub fn get_local_matrix(&mut self, graph: &SceneGraph, key: NodeKey) -> Result<Mat4> {
        let transform = &graph.get(key).ok_or(SceneError::NodeNotFound)?.transform;

        if transform.is_uncached() {
            return local_matrix(transform);
        }

        if let Some(entry) = self.local_cache.get(key) {
            if entry.version == transform.version() {
                return Ok(entry.matrix);
            }
        }

        let matrix = local_matrix(transform)?;
        self.local_cache.insert(
            key,
            LocalEntry {
                version: transform.version(),
                matrix,
            },
        );
        Ok(matrix)
    }

    /// World matrix of a node, refreshing every stale entry on its ancestor path.
    ///
    /// The path is walked root first. As soon as one node is found dirty, all
    /// nodes below it on the path are recomputed without further checks.
    /// Paths longer than the configured depth are truncated to the nodes
    /// nearest the queried one (with a warning); the topmost kept node is
    /// then treated as a root.
    ///
    /// # Errors
    /// Propagates [`SceneError::SchemaNotValid`] from local matrix resolution.
    pub fn get_world_matrix(&mut self, graph: &SceneGraph, key: NodeKey) -> Result<Mat4> {
        let path = self.ancestor_path(graph, key)?;

        let mut dirty = false;
        let mut parent = None;
        for &node in &path {
            if !dirty {
                dirty = !self.is_world_current(graph, node, parent)?;
            }
            if dirty {
                self.refresh_world(graph, node, parent)?;
            }
            parent = Some(node);
        }

        self.world_cache
            .get(key)
            .map(|entry| entry.matrix)
            .ok_or(SceneError::NodeNotFound)
    }

    /// Resolve every world matrix of the subtree under `root` and write each
    /// one back into its node's transform.
    ///
    /// Nodes are visited pre-order, so only a shallow node plus parent check
    /// is needed below the subtree root.
    pub fn update_matrix(&mut self, graph: &mut SceneGraph, root: NodeKey) -> Result<()> {
        let order: Vec<NodeKey> = graph
            .traverse_pre_order(root)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        self.update_matrix_flat(graph, &order)
    }

    /// Resolve world matrices for a parent-before-child ordered list
    /// (pre-order or breadth-first) and write them back into the nodes.
    pub fn update_matrix_flat(&mut self, graph: &mut SceneGraph, nodes: &[NodeKey]) -> Result<()> {
        for &key in nodes {
            let parent = graph.parent(key);
            let matrix = match parent {
                // parent never resolved: fall back to the full path walk
                Some(p) if !self.world_cache.contains_key(p) => self.get_world_matrix(graph, key)?,
                _ => {
                    if !self.is_world_current(graph, key, parent)? {
                        self.refresh_world(graph, key, parent)?;
                    }
                    self.world_cache
                        .get(key)
                        .map(|entry| entry.matrix)
                        .ok_or(SceneError::NodeNotFound)?
                }
            };

            if let Some(node) = graph.get_mut(key) {
                node.transform.set_world_matrix(matrix);
            }
        }
        Ok(())
    }

    /// Cached world matrix, without any validation or recomputation
    pub fn cached_world_matrix(&self, key: NodeKey) -> Option<&Mat4> {
        self.world_cache.get(key).map(|entry| &entry.matrix)
    }

    /// Version counter of a node's world cache entry
    pub fn world_version(&self, key: NodeKey) -> Option<u64> {
        self.world_cache.get(key).map(|entry| entry.version)
    }

    /// Drop every row belonging to the given (destroyed) nodes
    pub fn evict(&mut self, keys: &[NodeKey]) {
        for &key in keys {
            self.local_cache.remove(key);
            self.world_cache.remove(key);
            self.ids.remove(key);
        }
    }

    /// Forget all cached state
    pub fn clear(&mut self) {
        self.local_cache.clear();
        self.world_cache.clear();
        self.ids.clear();
    }

    fn ancestor_path(&self, graph: &SceneGraph, key: NodeKey) -> Result<Vec<NodeKey>> {
        if !graph.contains(key) {
            return Err(SceneError::NodeNotFound);
        }

        let mut path = vec![key];
        let mut current = graph.parent(key);
        while let Some(parent) = current {
            if path.len() >= self.config.max_depth {
                log::warn!(
                    "Ancestor path exceeds max depth {}, resolving truncated path",
                    self.config.max_depth
                );
                break;
            }
            path.push(parent);
            current = graph.parent(parent);
        }

        path.reverse();
        Ok(path)
    }

    fn is_world_current(&mut self, graph: &SceneGraph, key: NodeKey, parent: Option<NodeKey>) -> Result<bool> {
        let transform = &graph.get(key).ok_or(SceneError::NodeNotFound)?.transform;
        if transform.is_uncached() {
            return Ok(false);
        }

        let Some(entry) = self.world_cache.get(key).copied() else {
            return Ok(false);
        };
        if entry.local_version != transform.version() {
            return Ok(false);
        }

        match parent {
            None => Ok(entry.parent_id.is_none()),
            Some(parent) => {
                let parent_id = self.get_id(parent)?;
                let parent_version = self.world_version(parent);
                Ok(entry.parent_id == Some(parent_id) && entry.parent_version == parent_version)
            }
        }
    }

    fn refresh_world(&mut self, graph: &SceneGraph, key: NodeKey, parent: Option<NodeKey>) -> Result<()> {
        let local = self.get_local_matrix(graph, key)?;
        let local_version = graph.get(key).ok_or(SceneError::NodeNotFound)?.transform.version();

        let (matrix, parent_id, parent_version) = match parent {
            Some(parent) => {
                let parent_entry = self
                    .world_cache
                    .get(parent)
                    .copied()
                    .ok_or(SceneError::NodeNotFound)?;
                let parent_id = self.get_id(parent)?;
                (parent_entry.matrix * local, Some(parent_id), Some(parent_entry.version))
            }
            None => (local, None, None),
        };

        let version = self.world_version(key).map_or(0, |v| v.wrapping_add(1));
        self.world_cache.insert(
            key,
            WorldEntry {
                version,
                parent_version,
                parent_id,
                local_version,
                matrix,
            },
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_next_id(&mut self, next: u64) {
        self.next_id = next;
    }
}

/// Compose the local matrix of a transform without touching any cache.
///
/// # Errors
/// [`SceneError::SchemaNotValid`] if a TRS transform lacks position, scale
/// or both rotation forms.
pub fn local_matrix(transform: &Transform) -> Result<Mat4> {
    match transform.data() {
        TransformData::Matrix(matrix) => Ok(*matrix),
        TransformData::Trs(trs) => {
            let position = trs.position.ok_or_else(|| {
                SceneError::SchemaNotValid("transform.position is required".to_string())
            })?;
            let scale = trs.scale.ok_or_else(|| {
                SceneError::SchemaNotValid("transform.scale is required".to_string())
            })?;
            let rotation = match (trs.quaternion, trs.rotation) {
                (Some(quaternion), _) => quaternion,
                (None, Some(euler)) => euler.to_quaternion(),
                (None, None) => {
                    return Err(SceneError::SchemaNotValid(
                        "transform.quaternion and transform.rotation are both missing".to_string(),
                    ))
                }
            };
            Ok(math::compose(&position, &rotation, &scale))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Euler, EulerOrder, Quat, Vec3};
    use crate::scene::{Node, Trs};
    use approx::assert_relative_eq;

    fn translated(name: &str, x: f32) -> Node {
        Node::new(name).with_transform(Transform::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_missing_trs_fields_are_schema_errors() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();

        let no_scale = graph.insert(Node::new("a").with_transform(Transform::from_data(TransformData::Trs(Trs {
            position: Some(Vec3::zeros()),
            rotation: Some(Euler::default()),
            ..Trs::default()
        }))));
        let no_rotation = graph.insert(Node::new("b").with_transform(Transform::from_data(TransformData::Trs(Trs {
            position: Some(Vec3::zeros()),
            scale: Some(Vec3::new(1.0, 1.0, 1.0)),
            ..Trs::default()
        }))));

        assert!(matches!(resolver.get_local_matrix(&graph, no_scale), Err(SceneError::SchemaNotValid(_))));
        assert!(matches!(resolver.get_world_matrix(&graph, no_rotation), Err(SceneError::SchemaNotValid(_))));
    }

    #[test]
    fn test_quaternion_wins_over_euler() {
        let trs = Trs {
            position: Some(Vec3::zeros()),
            rotation: Some(Euler::new(1.0, 0.0, 0.0, EulerOrder::Xyz)),
            quaternion: Some(Quat::identity()),
            scale: Some(Vec3::new(1.0, 1.0, 1.0)),
        };
        let m = local_matrix(&Transform::from_data(TransformData::Trs(trs))).unwrap();
        assert_relative_eq!(m, Mat4::identity());
    }

    #[test]
    fn test_local_cache_follows_version() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let a = graph.insert(translated("a", 1.0));

        let first = resolver.get_local_matrix(&graph, a).unwrap();
        // edit the data without bumping the version: the cached matrix is served
        graph.get_mut(a).unwrap().transform.set_data(TransformData::Matrix(Mat4::identity()));
        graph.get_mut(a).unwrap().transform.set_version(0);
        assert_eq!(resolver.get_local_matrix(&graph, a).unwrap(), first);

        graph.get_mut(a).unwrap().transform.mark_dirty();
        assert_eq!(resolver.get_local_matrix(&graph, a).unwrap(), Mat4::identity());
    }

    #[test]
    fn test_uncached_transform_is_always_recomputed() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let a = graph.insert(Node::new("a").with_transform(Transform::from_position(Vec3::zeros()).uncached()));

        resolver.get_local_matrix(&graph, a).unwrap();
        graph.get_mut(a).unwrap().transform.set_position(Vec3::new(2.0, 0.0, 0.0));

        let m = resolver.get_local_matrix(&graph, a).unwrap();
        assert_relative_eq!(m[(0, 3)], 2.0);
    }

    #[test]
    fn test_world_is_parent_times_local() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let root = graph.insert(Node::new("root").with_transform(Transform::from_trs(
            Vec3::new(0.0, 5.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.5),
            Vec3::new(2.0, 2.0, 2.0),
        )));
        let child = graph.insert_child(root, translated("child", 3.0)).unwrap();

        let parent_world = resolver.get_world_matrix(&graph, root).unwrap();
        let local = resolver.get_local_matrix(&graph, child).unwrap();
        let world = resolver.get_world_matrix(&graph, child).unwrap();

        assert_relative_eq!(world, parent_world * local, epsilon = 1e-6);
    }

    #[test]
    fn test_ids_are_stable_and_bounded() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let a = graph.insert(Node::new("a"));
        let b = graph.insert(Node::new("b"));

        let id_a = resolver.get_id(a).unwrap();
        assert_eq!(resolver.get_id(a).unwrap(), id_a);

        resolver.set_next_id(MAX_NODE_ID + 1);
        assert_eq!(resolver.get_id(b), Err(SceneError::IdExhausted));
        assert_eq!(resolver.get_id(a).unwrap(), id_a);
    }

    #[test]
    fn test_update_matrix_writes_back() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let root = graph.insert(translated("root", 1.0));
        let child = graph.insert_child(root, translated("child", 2.0)).unwrap();
        let leaf = graph.insert_child(child, translated("leaf", 4.0)).unwrap();

        resolver.update_matrix(&mut graph, root).unwrap();

        let world = graph.get(leaf).unwrap().transform.world_matrix().copied().unwrap();
        assert_relative_eq!(world[(0, 3)], 7.0);
    }

    #[test]
    fn test_update_matrix_flat_on_subtree_without_resolved_parent() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let root = graph.insert(translated("root", 1.0));
        let child = graph.insert_child(root, translated("child", 2.0)).unwrap();
        let leaf = graph.insert_child(child, translated("leaf", 4.0)).unwrap();

        let flat = graph.flatten_bfs(child);
        resolver.update_matrix_flat(&mut graph, &flat).unwrap();

        let world = graph.get(leaf).unwrap().transform.world_matrix().copied().unwrap();
        assert_relative_eq!(world[(0, 3)], 7.0);
    }

    #[test]
    fn test_evict_drops_rows() {
        let mut graph = SceneGraph::new();
        let mut resolver = TransformResolver::default();
        let a = graph.insert(Node::new("a"));
        resolver.get_world_matrix(&graph, a).unwrap();

        let removed = graph.destroy(a).unwrap();
        resolver.evict(&removed);

        assert!(resolver.cached_world_matrix(a).is_none());
    }
}
