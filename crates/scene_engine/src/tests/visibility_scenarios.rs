//! Frame-by-frame refinement of a small scene

use super::fixtures::{box_node, chain, translation, unit_box};
use crate::bounds::{compute_bbox, compute_bsphere};
use crate::config::{RefinerConfig, ResolverConfig, DEFAULT_MAX_DEPTH};
use crate::culling::CameraParams;
use crate::foundation::math::Vec3;
use crate::refiner::VisibilityRefiner;
use crate::scene::{DrawMode, Geometry, Material, Node, SceneGraph, SpriteParams, Transform};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> CameraParams {
        CameraParams::new(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn test_empty_geometry_has_infinite_bounds() {
        let geometry = Geometry::new(DrawMode::Triangles, Vec::new());

        assert!(compute_bbox(&geometry).is_infinite());
        assert!(compute_bsphere(&geometry).is_infinite());
        assert!(compute_bbox(&Geometry::empty(DrawMode::Lines)).is_infinite());
    }

    #[test]
    fn test_empty_mesh_is_never_culled() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let empty = graph
            .insert_child(root, Node::mesh("empty", Geometry::new(DrawMode::Triangles, Vec::new()), Material::unlit()))
            .unwrap();

        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();

        assert!(!graph.get(empty).unwrap().is_frustum_culled());
    }

    #[test]
    fn test_mesh_leaving_the_frustum_adds_one_culled() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        graph.insert_child(root, box_node("a", Vec3::new(-1.0, 0.0, 0.0))).unwrap();
        graph.insert_child(root, box_node("b", Vec3::new(1.0, 0.0, 0.0))).unwrap();
        let roamer = graph.insert_child(root, box_node("roamer", Vec3::zeros())).unwrap();

        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();
        let baseline = refiner.info().culled_count;
        assert_eq!(baseline, 0);

        graph.get_mut(roamer).unwrap().transform.set_position(Vec3::new(500.0, 0.0, 0.0));
        refiner.update(&mut graph, root, &camera()).unwrap();

        let sphere = refiner.snapshot(roamer).unwrap().mesh_bsphere;
        assert!(!refiner.frustum().intersects_sphere(&sphere));
        assert!(graph.get(roamer).unwrap().is_frustum_culled());
        assert_eq!(refiner.info().culled_count, baseline + 1);

        // and back again
        graph.get_mut(roamer).unwrap().transform.set_position(Vec3::zeros());
        refiner.update(&mut graph, root, &camera()).unwrap();
        assert!(!graph.get(roamer).unwrap().is_frustum_culled());
        assert_eq!(refiner.info().culled_count, 0);
    }

    #[test]
    fn test_moving_the_camera_culls_without_dirtying_transforms() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(box_node("box", Vec3::zeros()));
        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();
        let version = refiner.resolver().world_version(root);

        let looking_away = CameraParams::new(Vec3::new(0.0, 0.0, -10.0), 60.0, 1.0, 0.1, 100.0);
        refiner.update(&mut graph, root, &looking_away).unwrap();

        assert!(graph.get(root).unwrap().is_frustum_culled());
        assert_eq!(refiner.resolver().world_version(root), version);
    }

    #[test]
    fn test_parent_move_carries_children_out_of_view() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let group = graph.insert_child(root, Node::new("group")).unwrap();
        let children: Vec<_> = (0..4)
            .map(|i| graph.insert_child(group, box_node("child", Vec3::new(i as f32, 0.0, 0.0))).unwrap())
            .collect();

        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();
        assert_eq!(refiner.info().culled_count, 0);

        graph.get_mut(group).unwrap().transform.set_position(Vec3::new(0.0, 0.0, 50.0));
        refiner.update(&mut graph, root, &camera()).unwrap();

        assert_eq!(refiner.info().culled_count, children.len());
        for &child in &children {
            let world = graph.get(child).unwrap().transform.world_matrix().copied().unwrap();
            assert_relative_eq!(translation(&world).z, 50.0);
        }
    }

    #[test]
    fn test_nodes_added_between_frames_are_picked_up() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();

        let late = graph.insert_child(root, box_node("late", Vec3::new(0.0, 2.0, 0.0))).unwrap();
        refiner.update(&mut graph, root, &camera()).unwrap();

        assert_eq!(refiner.info().visited_count, 2);
        let world = graph.get(late).unwrap().transform.world_matrix().copied().unwrap();
        assert_relative_eq!(translation(&world), Vec3::new(0.0, 2.0, 0.0));
        assert!(graph.get(late).unwrap().geometry.as_ref().unwrap().bounding_sphere.is_some());
    }

    #[test]
    fn test_sprites_are_left_to_the_raycaster() {
        let mut graph = SceneGraph::new();
        let sprite = Node::mesh(
            "sprite",
            Geometry::new(DrawMode::Sprite, unit_box().position_values().unwrap().to_vec()),
            Material::sprite(SpriteParams::default()),
        );
        let root = graph.insert(sprite.with_transform(Transform::from_position(Vec3::new(0.0, 0.0, 50.0))));

        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();

        assert!(!graph.get(root).unwrap().is_frustum_culled());
        assert_eq!(refiner.info().culled_count, 0);
    }

    #[test]
    fn test_chain_deeper_than_cap_is_truncated() {
        let mut graph = SceneGraph::new();
        let (root, _) = chain(&mut graph, DEFAULT_MAX_DEPTH + 10);

        let mut refiner = VisibilityRefiner::new(RefinerConfig::default(), ResolverConfig::default());
        refiner.update(&mut graph, root, &camera()).unwrap();

        assert_eq!(refiner.info().visited_count, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_wide_fan_out_is_reconciled() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::new("root"));
        let mut keys = Vec::new();
        for i in 0..2000 {
            let x = (i % 40) as f32 - 20.0;
            let y = (i / 40) as f32 - 25.0;
            keys.push(graph.insert_child(root, box_node("fan", Vec3::new(x, y, -30.0))).unwrap());
        }

        let mut refiner = VisibilityRefiner::default();
        refiner.update(&mut graph, root, &camera()).unwrap();
        refiner.update(&mut graph, root, &camera()).unwrap();
        assert_eq!(refiner.info().visited_count, 2001);
        assert_eq!(refiner.snapshot(root).unwrap().children.len(), 2000);

        for &key in keys.iter().step_by(2) {
            let removed = graph.destroy(key).unwrap();
            refiner.forget(&removed);
        }
        let late: Vec<_> = (0..10)
            .map(|i| graph.insert_child(root, box_node("late", Vec3::new(i as f32, 0.0, -30.0))).unwrap())
            .collect();
        refiner.update(&mut graph, root, &camera()).unwrap();

        let tracked = &refiner.snapshot(root).unwrap().children;
        assert_eq!(tracked.len(), 1010);
        assert!(graph.children(root).iter().all(|child| tracked.contains(child)));
        assert!(!tracked.contains(&keys[0]));
        assert!(tracked.contains(&keys[1]));
        assert!(late.iter().all(|key| refiner.snapshot(*key).is_some()));
        assert_eq!(refiner.info().visited_count, 1011);
    }
}
