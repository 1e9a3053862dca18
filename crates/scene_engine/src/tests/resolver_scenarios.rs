//! Transform resolution across whole hierarchies

use super::fixtures::{box_node, chain, mixed_tree, translation};
use crate::config::{ResolverConfig, DEFAULT_MAX_DEPTH};
use crate::foundation::math::Vec3;
use crate::scene::{Node, SceneGraph, Transform};
use crate::transform::{local_matrix, TransformResolver};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_repeated_queries_are_idempotent() {
        let mut graph = SceneGraph::new();
        let (_, keys) = mixed_tree(&mut graph);
        let mut resolver = TransformResolver::default();

        let first: Vec<_> = keys.iter().map(|&k| resolver.get_world_matrix(&graph, k).unwrap()).collect();
        let versions: Vec<_> = keys.iter().map(|&k| resolver.world_version(k)).collect();

        for _ in 0..3 {
            for (i, &key) in keys.iter().enumerate() {
                assert_eq!(resolver.get_world_matrix(&graph, key).unwrap(), first[i]);
                assert_eq!(resolver.world_version(key), versions[i]);
            }
        }
    }

    #[test]
    fn test_world_is_parent_world_times_local() {
        let mut graph = SceneGraph::new();
        let (_, keys) = mixed_tree(&mut graph);
        let mut resolver = TransformResolver::default();

        for &key in &keys {
            let world = resolver.get_world_matrix(&graph, key).unwrap();
            let local = local_matrix(&graph.get(key).unwrap().transform).unwrap();
            let expected = match graph.parent(key) {
                Some(parent) => resolver.get_world_matrix(&graph, parent).unwrap() * local,
                None => local,
            };
            assert_relative_eq!(world, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_root_change_recomputes_every_descendant() {
        let mut graph = SceneGraph::new();
        let (root, keys) = mixed_tree(&mut graph);
        let mut resolver = TransformResolver::default();
        resolver.update_matrix(&mut graph, root).unwrap();
        let before: Vec<_> = keys.iter().map(|&k| resolver.world_version(k).unwrap()).collect();

        graph.get_mut(root).unwrap().transform.mark_dirty();
        for &key in &keys {
            resolver.get_world_matrix(&graph, key).unwrap();
        }

        for (i, &key) in keys.iter().enumerate() {
            assert_eq!(resolver.world_version(key), Some(before[i] + 1));
        }
    }

    #[test]
    fn test_moved_root_moves_written_back_matrices() {
        let mut graph = SceneGraph::new();
        let (root, keys) = mixed_tree(&mut graph);
        let mut resolver = TransformResolver::default();
        resolver.update_matrix(&mut graph, root).unwrap();
        let bolt = keys[4];
        let before = translation(graph.get(bolt).unwrap().transform.world_matrix().unwrap());

        graph.get_mut(root).unwrap().transform.set_position(Vec3::new(11.0, 2.0, 3.0));
        resolver.update_matrix(&mut graph, root).unwrap();

        let after = translation(graph.get(bolt).unwrap().transform.world_matrix().unwrap());
        assert_relative_eq!(after - before, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_reparenting_forces_recompute() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let left = graph
            .insert_child(root, Node::new("left").with_transform(Transform::from_position(Vec3::new(-3.0, 0.0, 0.0))))
            .unwrap();
        let right = graph
            .insert_child(root, Node::new("right").with_transform(Transform::from_position(Vec3::new(3.0, 0.0, 0.0))))
            .unwrap();
        let leaf = graph.insert_child(left, box_node("leaf", Vec3::new(0.0, 1.0, 0.0))).unwrap();

        let mut resolver = TransformResolver::default();
        let before = resolver.get_world_matrix(&graph, leaf).unwrap();
        assert_relative_eq!(translation(&before), Vec3::new(-3.0, 1.0, 0.0));

        graph.add_child(right, leaf).unwrap();
        let after = resolver.get_world_matrix(&graph, leaf).unwrap();

        assert_relative_eq!(translation(&after), Vec3::new(3.0, 1.0, 0.0));
        assert_eq!(resolver.world_version(leaf), Some(1));
    }

    #[test]
    fn test_independent_reparent_below_dirty_ancestor_is_caught() {
        // root -> a -> b -> c and root -> d -> e
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let a = graph
            .insert_child(root, Node::new("a").with_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0))))
            .unwrap();
        let b = graph
            .insert_child(a, Node::new("b").with_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0))))
            .unwrap();
        let c = graph.insert_child(b, box_node("c", Vec3::new(0.0, 0.0, 1.0))).unwrap();
        let d = graph
            .insert_child(root, Node::new("d").with_transform(Transform::from_position(Vec3::new(0.0, -5.0, 0.0))))
            .unwrap();
        let e = graph.insert_child(d, box_node("e", Vec3::new(0.0, 0.0, 2.0))).unwrap();

        let mut resolver = TransformResolver::default();
        resolver.update_matrix(&mut graph, root).unwrap();
        let e_version = resolver.world_version(e).unwrap();

        // dirty ancestor and an unrelated reparent in the same frame
        graph.get_mut(a).unwrap().transform.set_position(Vec3::new(2.0, 0.0, 0.0));
        graph.add_child(b, e).unwrap();

        // resolving c walks root, a (dirty), b, c and refreshes them unchecked
        let c_world = resolver.get_world_matrix(&graph, c).unwrap();
        assert_relative_eq!(translation(&c_world), Vec3::new(2.0, 1.0, 1.0));

        // a and b are current again, so e is judged on its own parent id
        let e_world = resolver.get_world_matrix(&graph, e).unwrap();
        assert_relative_eq!(translation(&e_world), Vec3::new(2.0, 1.0, 2.0));
        assert_eq!(resolver.world_version(e), Some(e_version + 1));

        // same answer when e is the root of a bulk update
        graph.get_mut(e).unwrap().transform.set_position(Vec3::new(0.0, 0.0, 3.0));
        resolver.update_matrix(&mut graph, e).unwrap();
        let written = graph.get(e).unwrap().transform.world_matrix().copied().unwrap();
        assert_relative_eq!(translation(&written), Vec3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_flat_update_matches_path_walk() {
        let mut graph = SceneGraph::new();
        let (root, keys) = mixed_tree(&mut graph);
        let order = graph.flatten_bfs(root);

        let mut flat = TransformResolver::default();
        flat.update_matrix_flat(&mut graph, &order).unwrap();

        let mut walked = TransformResolver::default();
        for &key in &keys {
            let expected = walked.get_world_matrix(&graph, key).unwrap();
            let written = graph.get(key).unwrap().transform.world_matrix().copied().unwrap();
            assert_relative_eq!(written, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_chain_deeper_than_cap_resolves_truncated_path() {
        let mut graph = SceneGraph::new();
        let (_, tail) = chain(&mut graph, DEFAULT_MAX_DEPTH + 52);
        let mut resolver = TransformResolver::new(ResolverConfig::default());

        let world = resolver.get_world_matrix(&graph, tail).unwrap();

        assert_relative_eq!(translation(&world), Vec3::new(DEFAULT_MAX_DEPTH as f32, 0.0, 0.0));
    }

    #[test]
    fn test_chain_within_cap_resolves_fully() {
        let mut graph = SceneGraph::new();
        let (root, tail) = chain(&mut graph, 300);
        let mut resolver = TransformResolver::default();
        resolver.update_matrix(&mut graph, root).unwrap();

        let written = graph.get(tail).unwrap().transform.world_matrix().copied().unwrap();
        assert_relative_eq!(translation(&written), Vec3::new(300.0, 0.0, 0.0));
    }

    #[test]
    fn test_uncached_ancestor_refreshes_descendants_every_call() {
        let mut graph = SceneGraph::new();
        let rig = Transform::from_position(Vec3::new(1.0, 0.0, 0.0)).uncached();
        let root = graph.insert(Node::new("rig").with_transform(rig));
        let arm = graph
            .insert_child(root, Node::new("arm").with_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0))))
            .unwrap();
        let hand = graph.insert_child(arm, box_node("hand", Vec3::new(0.0, 0.0, 3.0))).unwrap();

        let mut resolver = TransformResolver::default();
        for expected in 0..3 {
            let world = resolver.get_world_matrix(&graph, hand).unwrap();
            assert_relative_eq!(translation(&world), Vec3::new(1.0, 2.0, 3.0));
            assert_eq!(resolver.world_version(hand), Some(expected));
        }

        // the setter keeps the version at -1, so only recomputation sees the move
        graph.get_mut(root).unwrap().transform.set_position(Vec3::new(-4.0, 0.0, 0.0));
        assert!(graph.get(root).unwrap().transform.is_uncached());
        let world = resolver.get_world_matrix(&graph, hand).unwrap();
        assert_relative_eq!(translation(&world), Vec3::new(-4.0, 2.0, 3.0));
    }

    #[test]
    fn test_detached_node_resolves_to_its_local_matrix() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root").with_transform(Transform::from_position(Vec3::new(5.0, 5.0, 5.0))));
        let leaf = graph.insert_child(root, box_node("leaf", Vec3::new(1.0, 0.0, 0.0))).unwrap();

        let mut resolver = TransformResolver::default();
        let attached = resolver.get_world_matrix(&graph, leaf).unwrap();
        assert_relative_eq!(translation(&attached), Vec3::new(6.0, 5.0, 5.0));
        let version = resolver.world_version(leaf).unwrap();

        graph.detach(leaf).unwrap();
        let world = resolver.get_world_matrix(&graph, leaf).unwrap();
        let local = local_matrix(&graph.get(leaf).unwrap().transform).unwrap();

        assert_relative_eq!(world, local, epsilon = 1e-6);
        assert_eq!(resolver.world_version(leaf), Some(version + 1));
    }
}
