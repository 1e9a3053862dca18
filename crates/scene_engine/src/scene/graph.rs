//! Node arena
//!
//! The graph owns every node. Parents are plain keys into the same arena, so
//! there are no strong reference cycles, and engine caches keyed by
//! [`NodeKey`] stay valid exactly as long as the node they describe.

use std::collections::VecDeque;

use slotmap::SlotMap;

use super::node::Node;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{Result, SceneError};

slotmap::new_key_type! {
    /// Generational handle to a node in a [`SceneGraph`]
    pub struct NodeKey;
}

/// Arena of scene nodes
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    max_depth: usize,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty graph with the default traversal depth cap
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Create an empty graph with a custom traversal depth cap
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            max_depth,
        }
    }

    /// Depth cap used by the traversal helpers
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Insert a detached node. Any parent/children it carries are cleared.
    pub fn insert(&mut self, mut node: Node) -> NodeKey {
        node.parent = None;
        node.children.clear();
        self.nodes.insert(node)
    }

    /// Insert a node directly under `parent`
    pub fn insert_child(&mut self, parent: NodeKey, node: Node) -> Result<NodeKey> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound);
        }
        let key = self.insert(node);
        self.add_child(parent, key)?;
        Ok(key)
    }

    /// Attach `child` under `parent`, detaching it from its previous parent first
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return Err(SceneError::NodeNotFound);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CycleDetected);
        }

        self.detach(child)?;

        if let Some(node) = self.nodes.get_mut(parent) {
            if !node.children.contains(&child) {
                node.children.push(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Remove `child` from `parent`. Returns whether it was attached there.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<bool> {
        let parent_node = self.nodes.get_mut(parent).ok_or(SceneError::NodeNotFound)?;
        let before = parent_node.children.len();
        parent_node.children.retain(|&k| k != child);
        let removed = parent_node.children.len() != before;

        if removed {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
        }
        Ok(removed)
    }

    /// Detach a node from its parent, making it a root
    pub fn detach(&mut self, key: NodeKey) -> Result<()> {
        let parent = self.nodes.get(key).ok_or(SceneError::NodeNotFound)?.parent;
        if let Some(parent) = parent {
            self.remove_child(parent, key)?;
        }
        Ok(())
    }

    /// Remove a node and its whole subtree. Returns every removed key so
    /// owners of per-node caches can evict their rows.
    pub fn destroy(&mut self, key: NodeKey) -> Result<Vec<NodeKey>> {
        self.detach(key)?;

        let mut removed = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed.push(current);
            }
        }

        log::debug!("Destroyed {} nodes", removed.len());
        Ok(removed)
    }

    /// Node lookup
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Mutable node lookup
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Parent of a node
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|node| node.parent)
    }

    /// Children of a node (empty for unknown keys)
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |node| node.children.as_slice())
    }

    /// Whether the key refers to a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every live node in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Whether `ancestor` is `key` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        let mut steps = 0;
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.parent(k);
        }
        false
    }

    /// Pre-order keys of the subtree rooted at `root`, with their depth.
    ///
    /// Subtrees deeper than the depth cap are skipped with a warning.
    pub fn traverse_pre_order(&self, root: NodeKey) -> Vec<(NodeKey, usize)> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }

        let mut stack = vec![(root, 0_usize)];
        let mut truncated = false;
        while let Some((key, depth)) = stack.pop() {
            out.push((key, depth));
            let children = self.children(key);
            if depth + 1 >= self.max_depth {
                truncated |= !children.is_empty();
                continue;
            }
            // reversed so the first child is visited first
            stack.extend(children.iter().rev().map(|&child| (child, depth + 1)));
        }

        if truncated {
            log::warn!("Traversal depth exceeded {}, deeper nodes skipped", self.max_depth);
        }
        out
    }

    /// Breadth-first list of the subtree rooted at `root`
    pub fn flatten_bfs(&self, root: NodeKey) -> Vec<NodeKey> {
        self.levels(root).into_iter().flatten().collect()
    }

    /// Nodes of the subtree rooted at `root` grouped by depth
    pub fn levels(&self, root: NodeKey) -> Vec<Vec<NodeKey>> {
        let mut levels: Vec<Vec<NodeKey>> = Vec::new();
        if !self.contains(root) {
            return levels;
        }

        let mut queue = VecDeque::from([(root, 0_usize)]);
        let mut truncated = false;
        while let Some((key, depth)) = queue.pop_front() {
            if levels.len() <= depth {
                levels.push(Vec::new());
            }
            levels[depth].push(key);

            let children = self.children(key);
            if depth + 1 >= self.max_depth {
                truncated |= !children.is_empty();
                continue;
            }
            queue.extend(children.iter().map(|&child| (child, depth + 1)));
        }

        if truncated {
            log::warn!("Traversal depth exceeded {}, deeper nodes skipped", self.max_depth);
        }
        levels
    }
}
