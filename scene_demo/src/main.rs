//! Scene Engine Demo
//!
//! Builds a random scene and runs a headless frame loop over it:
//! - Groups of boxes spinning around their own centers
//! - Line rings and sprite clouds mixed in
//! - Camera orbiting the origin, picking whatever is under the screen center
//! - One group destroyed halfway through to exercise cache eviction
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use rand::Rng;
use scene_engine::config::{Config, SceneConfig};
use scene_engine::culling::CameraParams;
use scene_engine::foundation::logging;
use scene_engine::foundation::math::{Euler, EulerOrder, Vec2, Vec3};
use scene_engine::raycast::Raycaster;
use scene_engine::refiner::VisibilityRefiner;
use scene_engine::scene::geometry::CORNER;
use scene_engine::scene::{
    Attribute, DrawMode, Geometry, Material, Node, NodeKey, SceneGraph, SpriteParams, Transform,
};
use scene_engine::SceneError;
use scene_engine::transform::TransformResolver;
use std::f32::consts::PI;
use std::time::Instant;

// Scene layout
const NUM_GROUPS: usize = 12;
const BOXES_PER_GROUP: usize = 20;
const SCENE_EXTENT: f32 = 60.0;
const NUM_SPRITES: usize = 64;

// Frame loop
const NUM_FRAMES: usize = 240;
const FRAME_TIME: f32 = 1.0 / 60.0;
const ORBIT_RADIUS: f32 = 90.0;
const ORBIT_SPEED: f32 = 0.4;
const REPORT_EVERY: usize = 30;

struct Spinner {
    key: NodeKey,
    speed: f32,
    angle: f32,
}

struct DemoScene {
    graph: SceneGraph,
    root: NodeKey,
    spinners: Vec<Spinner>,
}

fn box_geometry() -> Geometry {
    let mut positions = Vec::with_capacity(24);
    for i in 0..8 {
        for bit in [1, 2, 4] {
            positions.push(if i & bit == 0 { -0.5 } else { 0.5 });
        }
    }
    let indices = vec![
        4, 5, 7, 4, 7, 6, 0, 2, 3, 0, 3, 1, 1, 3, 7, 1, 7, 5, 0, 4, 6, 0, 6, 2, 2, 6, 7, 2, 7, 3, 0, 1, 5, 0, 5, 4,
    ];
    Geometry::new(DrawMode::Triangles, positions).with_indices(indices)
}

fn ring_geometry(radius: f32, segments: usize) -> Geometry {
    let mut positions = Vec::with_capacity(segments * 6);
    for i in 0..segments {
        for j in [i, (i + 1) % segments] {
            let theta = j as f32 / segments as f32 * 2.0 * PI;
            positions.extend_from_slice(&[radius * theta.cos(), 0.0, radius * theta.sin()]);
        }
    }
    Geometry::new(DrawMode::Lines, positions)
}

fn sprite_geometry(rng: &mut impl Rng, count: usize) -> Geometry {
    let mut positions = Vec::with_capacity(count * 12);
    let mut corners = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let center = [
            rng.gen_range(-SCENE_EXTENT..SCENE_EXTENT),
            rng.gen_range(10.0..30.0),
            rng.gen_range(-SCENE_EXTENT..SCENE_EXTENT),
        ];
        for corner in 0..4 {
            positions.extend_from_slice(&center);
            corners.push(corner as f32);
        }
    }
    Geometry::new(DrawMode::Sprite, positions)
        .with_attribute(CORNER, Attribute::new(corners, 1))
}

fn random_position(rng: &mut impl Rng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent / 4.0..extent / 4.0),
        rng.gen_range(-extent..extent),
    )
}

fn build_scene(rng: &mut impl Rng, max_depth: usize) -> Result<DemoScene, SceneError> {
    let mut graph = SceneGraph::with_max_depth(max_depth);
    let root = graph.insert(Node::new("root"));
    let mut spinners = Vec::new();

    for g in 0..NUM_GROUPS {
        let center = random_position(rng, SCENE_EXTENT);
        let group = graph.insert_child(root, Node::new(format!("group{g}")).with_transform(Transform::from_position(center)))?;
        spinners.push(Spinner {
            key: group,
            speed: rng.gen_range(-1.0..1.0),
            angle: 0.0,
        });

        for b in 0..BOXES_PER_GROUP {
            let mut transform = Transform::from_position(random_position(rng, 8.0));
            transform.set_scale(Vec3::repeat(rng.gen_range(0.5..2.0)));
            let node = Node::mesh(format!("group{g}/box{b}"), box_geometry(), Material::unlit()).with_transform(transform);
            graph.insert_child(group, node)?;
        }

        let ring = Node::mesh(format!("group{g}/ring"), ring_geometry(10.0, 32), Material::unlit());
        graph.insert_child(group, ring)?;
    }

    let sprites = Node::mesh("sprites", sprite_geometry(rng, NUM_SPRITES), Material::sprite(SpriteParams::default()));
    graph.insert_child(root, sprites)?;

    log::info!("Built scene with {} nodes", graph.len());
    Ok(DemoScene { graph, root, spinners })
}

fn orbit_camera(time: f32) -> CameraParams {
    let angle = time * ORBIT_SPEED;
    let position = Vec3::new(ORBIT_RADIUS * angle.sin(), 15.0, ORBIT_RADIUS * angle.cos());
    CameraParams::new(position, 60.0, 16.0 / 9.0, 0.1, 500.0)
        .with_rotation(Euler::new(-0.15, angle, 0.0, EulerOrder::Yxz))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default_filter("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {path}");
            SceneConfig::load_from_file(&path)?
        }
        None => SceneConfig::default(),
    };
    log::debug!("{config:?}");

    let mut rng = rand::thread_rng();
    let mut scene = build_scene(&mut rng, config.refiner.max_traversal_depth)?;

    let mut refiner = VisibilityRefiner::with_resolver(config.refiner, TransformResolver::new(config.resolver));
    let mut raycaster = Raycaster::new(&config.raycast);

    let start = Instant::now();
    for frame in 0..NUM_FRAMES {
        let time = frame as f32 * FRAME_TIME;

        for spinner in &mut scene.spinners {
            spinner.angle += spinner.speed * FRAME_TIME;
            if let Some(node) = scene.graph.get_mut(spinner.key) {
                node.transform.set_rotation(Euler::new(0.0, spinner.angle, 0.0, EulerOrder::Xyz));
            }
        }

        if frame == NUM_FRAMES / 2 {
            if let Some(spinner) = scene.spinners.pop() {
                let removed = scene.graph.destroy(spinner.key)?;
                refiner.forget(&removed);
                log::info!("Destroyed a group of {} nodes", removed.len());
            }
        }

        let camera = orbit_camera(time);
        refiner.update(&mut scene.graph, scene.root, &camera)?;

        raycaster.set_from_camera(Vec2::zeros(), &camera)?;
        let picked = raycaster.intersect_scene(&scene.graph, scene.root, &camera, false);

        if frame % REPORT_EVERY == 0 {
            let info = refiner.info();
            let target = picked
                .closest()
                .and_then(|hit| hit.node)
                .and_then(|key| scene.graph.get(key))
                .map_or("nothing", |node| node.name.as_str());
            log::info!(
                "frame {frame}: visited {}, culled {}, center pick: {target}",
                info.visited_count,
                info.culled_count
            );
        }
    }

    let stats = raycaster.stats();
    log::info!(
        "{NUM_FRAMES} frames in {:.2?}; raycast tested {} primitives, {} meshes rejected by bounds",
        start.elapsed(),
        stats.primitives_tested,
        stats.bounds_rejections
    );
    Ok(())
}
