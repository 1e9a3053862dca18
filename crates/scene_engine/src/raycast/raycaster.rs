//! Ray queries against resolved meshes
//!
//! The raycaster never resolves transforms itself: a mesh's world matrix must
//! have been written by the refiner or the bulk resolver before it is picked.
//! Every query transforms the ray into mesh-local space, rejects against the
//! local bounding sphere and box, and only then walks the primitives.

use super::ray::Ray;
use crate::bounds::{self, BBox, BSphere};
use crate::config::RaycastConfig;
use crate::culling::CameraParams;
use crate::error::{Result, SceneError};
use crate::foundation::math::{self, Euler, Mat4, Vec2, Vec3, Vec4};
use crate::scene::geometry::{CORNER, SIZE};
use crate::scene::{DrawMode, Geometry, Node, NodeKey, SceneGraph, Side};

/// One ray hit
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Hit point in world space
    pub point: Vec3,
    /// Hit point in the mesh's local space
    pub point_local: Vec3,
    /// World-space distance from the ray origin
    pub distance: f32,
    /// Triangle, segment or sprite index within the mesh
    pub index: usize,
    /// Vertices of the hit triangle (local space for meshes, world space for sprites)
    pub triangle: Option<[Vec3; 3]>,
    /// Node that was hit, filled in by scene-wide queries
    pub node: Option<NodeKey>,
}

/// Result of a ray query
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastInfo {
    /// Anything was hit
    pub hit: bool,
    /// The mesh can be picked on the CPU at all
    pub hittable: bool,
    /// Hits, nearest first when all were requested
    pub intersections: Vec<Intersection>,
}

impl Default for RaycastInfo {
    fn default() -> Self {
        Self {
            hit: false,
            hittable: true,
            intersections: Vec::new(),
        }
    }
}

impl RaycastInfo {
    fn not_hittable() -> Self {
        Self {
            hittable: false,
            ..Self::default()
        }
    }

    fn push(&mut self, intersection: Intersection) {
        self.hit = true;
        self.intersections.push(intersection);
    }

    fn sort(&mut self) {
        self.intersections.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    /// Nearest hit
    pub fn closest(&self) -> Option<&Intersection> {
        self.intersections
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Counters for observing how much work queries did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RaycastStats {
    /// Triangles, segments or sprite triangles tested
    pub primitives_tested: usize,
    /// Meshes skipped by the bounding sphere/box test
    pub bounds_rejections: usize,
}

/// Corner offsets of a billboard quad, indexed by the `corner` attribute
const SPRITE_CORNERS: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];

/// Ray with an acceptance window
#[derive(Debug, Clone)]
pub struct Raycaster {
    /// World-space ray
    pub ray: Ray,
    /// Hits closer than this are ignored
    pub near: f32,
    /// Hits farther than this are ignored
    pub far: f32,
    /// Picking distance used for line meshes by [`Raycaster::raycast`]
    pub line_threshold: f32,
    stats: RaycastStats,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self::new(&RaycastConfig::default())
    }
}

impl Raycaster {
    /// Create a raycaster with the configured window
    pub fn new(config: &RaycastConfig) -> Self {
        Self {
            ray: Ray::default(),
            near: config.near,
            far: config.far,
            line_threshold: config.line_threshold,
            stats: RaycastStats::default(),
        }
    }

    /// Point the ray
    pub fn set(&mut self, origin: Vec3, direction: Vec3) -> &mut Self {
        self.ray = Ray::new(origin, direction);
        self
    }

    /// Change the acceptance window
    pub fn set_window(&mut self, near: f32, far: f32) -> &mut Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Aim the ray from the camera through normalized device coordinates
    /// (`-1..1` on both axes, `+y` up).
    ///
    /// # Errors
    /// [`SceneError::SchemaNotValid`] if the camera projection is degenerate.
    pub fn set_from_camera(&mut self, ndc: Vec2, camera: &CameraParams) -> Result<&mut Self> {
        let inverse_projection = camera.projection_matrix().try_inverse().ok_or_else(|| {
            SceneError::SchemaNotValid("camera projection is not invertible".to_string())
        })?;
        let view_point = math::transform_point(&inverse_projection, &Vec3::new(ndc.x, ndc.y, 0.5));
        let target = math::transform_point(&camera.world_matrix(), &view_point);

        Ok(self.set(camera.position, target - camera.position))
    }

    /// Work counters accumulated since the last reset
    pub const fn stats(&self) -> RaycastStats {
        self.stats
    }

    /// Zero the work counters
    pub fn reset_stats(&mut self) {
        self.stats = RaycastStats::default();
    }

    fn accepts(&self, distance: f32) -> bool {
        distance > self.near && distance < self.far
    }

    /// Pick a renderable node, choosing the routine by draw mode.
    ///
    /// Front-sided materials cull back faces; `Back` and `Double` test both.
    /// Nodes whose vertices are displaced on the GPU report `hittable = false`.
    ///
    /// # Errors
    /// [`SceneError::SchemaNotValid`] for point meshes, plus whatever the
    /// mode-specific routine returns.
    pub fn raycast(&mut self, node: &Node, camera: &CameraParams, all: bool) -> Result<RaycastInfo> {
        let (Some(geometry), Some(material)) = (&node.geometry, &node.material) else {
            return Ok(RaycastInfo::not_hittable());
        };
        if material.vertex_modified {
            return Ok(RaycastInfo::not_hittable());
        }

        match geometry.mode {
            DrawMode::Triangles => self.intersect_triangle_mesh(node, material.side == Side::Front, all),
            DrawMode::Lines => self.intersect_line_mesh(node, self.line_threshold, all),
            DrawMode::Sprite => self.intersect_sprite_mesh(node, &camera.position, &camera.rotation, true, all),
            DrawMode::Points => Err(SceneError::SchemaNotValid(format!(
                "raycasting is not supported for geometry.mode {}",
                geometry.mode
            ))),
        }
    }

    /// Pick every visible renderable node under `root`.
    ///
    /// Nodes that fail (unresolved matrix, unsupported mode) are logged and
    /// skipped. With `all == false` only the nearest hit is kept; every mesh
    /// is still queried for all of its hits, since a mesh's first hit in
    /// buffer order need not be its nearest.
    pub fn intersect_scene(
        &mut self,
        graph: &SceneGraph,
        root: NodeKey,
        camera: &CameraParams,
        all: bool,
    ) -> RaycastInfo {
        let mut result = RaycastInfo::default();

        for (key, _) in graph.traverse_pre_order(root) {
            let Some(node) = graph.get(key) else { continue };
            let visible = node.visible && node.material.as_ref().is_some_and(|m| m.visible);
            if !visible || !node.is_renderable() {
                continue;
            }

            match self.raycast(node, camera, true) {
                Ok(info) => {
                    for mut intersection in info.intersections {
                        intersection.node = Some(key);
                        result.push(intersection);
                    }
                }
                Err(e) => log::warn!("Raycast skipped node '{}': {}", node.name, e),
            }
        }

        result.sort();
        if !all {
            result.intersections.truncate(1);
        }
        result
    }

    /// Pick a triangle mesh.
    ///
    /// # Errors
    /// [`SceneError::WorldMatrixUnresolved`] if the node's world matrix has
    /// not been resolved, [`SceneError::SchemaNotValid`] without geometry.
    pub fn intersect_triangle_mesh(&mut self, node: &Node, backface_culling: bool, all: bool) -> Result<RaycastInfo> {
        let (world, geometry) = resolved_mesh(node)?;
        let mut result = RaycastInfo::default();

        let Some(local_ray) = self.local_ray(&world) else {
            return Ok(result);
        };

        let (bbox, bsphere) = bounds::geometry_bounds(geometry);
        if !self.passes_bounds(&local_ray, &bsphere, &bbox) {
            return Ok(result);
        }

        let Some(vertices) = VertexSource::new(geometry, &node.name) else {
            return Ok(result);
        };

        for index in 0..vertices.primitive_count(3) {
            let Some([a, b, c]) = vertices.primitive::<3>(index) else {
                continue;
            };
            self.stats.primitives_tested += 1;

            let Some(point_local) = local_ray.intersect_triangle(&a, &b, &c, backface_culling) else {
                continue;
            };
            let point = math::transform_point(&world, &point_local);
            let distance = (point - self.ray.origin).norm();
            if !self.accepts(distance) {
                continue;
            }

            result.push(Intersection {
                point,
                point_local,
                distance,
                index,
                triangle: Some([a, b, c]),
                node: None,
            });
            if !all {
                return Ok(result);
            }
        }

        result.sort();
        Ok(result)
    }

    /// Pick a line mesh: a segment is hit when the ray passes within
    /// `threshold` (world units) of it.
    ///
    /// # Errors
    /// Same as [`Raycaster::intersect_triangle_mesh`].
    pub fn intersect_line_mesh(&mut self, node: &Node, threshold: f32, all: bool) -> Result<RaycastInfo> {
        let (world, geometry) = resolved_mesh(node)?;
        let mut result = RaycastInfo::default();

        let Some(local_ray) = self.local_ray(&world) else {
            return Ok(result);
        };

        let scale = math::average_scale(&world);
        let local_threshold = if scale > f32::EPSILON { threshold / scale } else { threshold };
        let threshold_sq = local_threshold * local_threshold;

        let (bbox, bsphere) = bounds::geometry_bounds(geometry);
        let bsphere = BSphere::new(bsphere.center, bsphere.radius + local_threshold);
        let bbox = if bbox.is_infinite() {
            bbox
        } else {
            BBox::new(bbox.min.add_scalar(-local_threshold), bbox.max.add_scalar(local_threshold))
        };
        if !self.passes_bounds(&local_ray, &bsphere, &bbox) {
            return Ok(result);
        }

        let Some(vertices) = VertexSource::new(geometry, &node.name) else {
            return Ok(result);
        };

        for index in 0..vertices.primitive_count(2) {
            let Some([v0, v1]) = vertices.primitive::<2>(index) else {
                continue;
            };
            self.stats.primitives_tested += 1;

            let (dist_sq, on_ray, _) = local_ray.distance_sq_to_segment(&v0, &v1);
            if dist_sq > threshold_sq {
                continue;
            }
            let point = math::transform_point(&world, &on_ray);
            let distance = (point - self.ray.origin).norm();
            if !self.accepts(distance) {
                continue;
            }

            result.push(Intersection {
                point,
                point_local: on_ray,
                distance,
                index,
                triangle: None,
                node: None,
            });
            if !all {
                return Ok(result);
            }
        }

        result.sort();
        Ok(result)
    }

    /// Pick a billboard mesh.
    ///
    /// Every four vertices share one center position and carry corners
    /// `0..=3` in the `corner` attribute. Each quad is rebuilt in view space
    /// the way the sprite vertex stage places it, taken back to world space,
    /// and tested as two double-sided triangles.
    ///
    /// # Errors
    /// Same as [`Raycaster::intersect_triangle_mesh`]. A missing `corner`
    /// attribute is logged and yields an empty result.
    pub fn intersect_sprite_mesh(
        &mut self,
        node: &Node,
        camera_position: &Vec3,
        camera_rotation: &Euler,
        is_perspective: bool,
        all: bool,
    ) -> Result<RaycastInfo> {
        let (world, geometry) = resolved_mesh(node)?;
        let mut result = RaycastInfo::default();

        let Some(corners) = geometry.attribute(CORNER).and_then(|attr| attr.values()) else {
            log::error!("Sprite mesh '{}' has no corner attribute, raycast skipped", node.name);
            return Ok(result);
        };
        let Some(positions) = geometry.position_values() else {
            log::warn!("Sprite mesh '{}' has no usable positions, raycast skipped", node.name);
            return Ok(result);
        };
        let item_size = geometry.position().map_or(3, |attr| attr.item_size());

        let params = node
            .material
            .as_ref()
            .and_then(|m| m.sprite_params().copied())
            .unwrap_or_default();
        let sizes = if params.use_attr_size {
            geometry.attribute(SIZE)
        } else {
            None
        };

        let camera_world = math::compose(camera_position, &camera_rotation.to_quaternion(), &Vec3::new(1.0, 1.0, 1.0));
        let Some(view) = camera_world.try_inverse() else {
            return Ok(result);
        };
        let model_view = view * world;
        let Some(world_inverse) = world.try_inverse() else {
            return Ok(result);
        };

        let offset = Vec2::new(0.5, 0.5) - params.center;
        let (sin, cos) = params.rotation.sin_cos();

        let vertex_count = positions.len() / item_size;
        for sprite in 0..vertex_count / 4 {
            let first = sprite * 4;
            let Some(center) = read_vec3(positions, item_size, first) else {
                continue;
            };
            let mv = model_view * Vec4::new(center.x, center.y, center.z, 1.0);

            let mut scale = sizes
                .and_then(|attr| attr.item(first))
                .map_or(params.size, |s| Vec2::new(s[0], s.get(1).copied().unwrap_or(s[0])));
            if !params.size_attenuation && is_perspective {
                scale *= -mv.z;
            }

            let mut quad = [Vec3::zeros(); 4];
            for vertex in first..first + 4 {
                let corner = corners.get(vertex).map_or(0, |&c| c.round().clamp(0.0, 3.0) as usize);
                let [cx, cy] = SPRITE_CORNERS[corner];
                let aligned = (Vec2::new(cx, cy) + offset).component_mul(&scale);
                let rotated = Vec2::new(cos * aligned.x - sin * aligned.y, sin * aligned.x + cos * aligned.y);
                let view_pos = Vec3::new(mv.x + rotated.x, mv.y + rotated.y, mv.z);
                quad[corner] = math::transform_point(&camera_world, &view_pos);
            }

            for (half, [i0, i1, i2]) in [[0, 1, 2], [0, 2, 3]].into_iter().enumerate() {
                let (a, b, c) = (quad[i0], quad[i1], quad[i2]);
                self.stats.primitives_tested += 1;

                let Some(point) = self.ray.intersect_triangle(&a, &b, &c, false) else {
                    continue;
                };
                let distance = (point - self.ray.origin).norm();
                if !self.accepts(distance) {
                    continue;
                }

                result.push(Intersection {
                    point,
                    point_local: math::transform_point(&world_inverse, &point),
                    distance,
                    index: sprite * 2 + half,
                    triangle: Some([a, b, c]),
                    node: None,
                });
                if !all {
                    return Ok(result);
                }
            }
        }

        result.sort();
        Ok(result)
    }

    fn local_ray(&self, world: &Mat4) -> Option<Ray> {
        let Some(inverse) = world.try_inverse() else {
            log::warn!("World matrix is not invertible, raycast skipped");
            return None;
        };
        Some(self.ray.apply_matrix(&inverse))
    }

    fn passes_bounds(&mut self, local_ray: &Ray, bsphere: &BSphere, bbox: &BBox) -> bool {
        if local_ray.intersects_sphere(bsphere) && local_ray.intersects_box(bbox) {
            true
        } else {
            self.stats.bounds_rejections += 1;
            false
        }
    }
}

fn resolved_mesh(node: &Node) -> Result<(Mat4, &Geometry)> {
    let world = *node
        .transform
        .world_matrix()
        .ok_or(SceneError::WorldMatrixUnresolved)?;
    let geometry = node
        .geometry
        .as_ref()
        .ok_or_else(|| SceneError::SchemaNotValid("geometry is required for raycasting".to_string()))?;
    Ok((world, geometry))
}

fn read_vec3(values: &[f32], item_size: usize, index: usize) -> Option<Vec3> {
    let start = index.checked_mul(item_size)?;
    let item = values.get(start..start + item_size.min(3))?;
    Some(Vec3::new(
        item.first().copied().unwrap_or(0.0),
        item.get(1).copied().unwrap_or(0.0),
        item.get(2).copied().unwrap_or(0.0),
    ))
}

/// Indexed or flat access to the primitives of a geometry
struct VertexSource<'a> {
    positions: &'a [f32],
    item_size: usize,
    indices: Option<&'a [u32]>,
}

impl<'a> VertexSource<'a> {
    fn new(geometry: &'a Geometry, name: &str) -> Option<Self> {
        let Some(positions) = geometry.position_values() else {
            log::warn!("Mesh '{name}' has no usable positions, raycast skipped");
            return None;
        };
        let indices = match &geometry.indices {
            Some(buffer) => {
                let Some(values) = buffer.values() else {
                    log::warn!("Mesh '{name}' has disposed indices, raycast skipped");
                    return None;
                };
                Some(values)
            }
            None => None,
        };
        Some(Self {
            positions,
            item_size: geometry.position().map_or(3, |attr| attr.item_size()),
            indices,
        })
    }

    fn primitive_count(&self, arity: usize) -> usize {
        match self.indices {
            Some(indices) => indices.len() / arity,
            None => self.positions.len() / self.item_size / arity,
        }
    }

    fn primitive<const N: usize>(&self, index: usize) -> Option<[Vec3; N]> {
        let mut out = [Vec3::zeros(); N];
        for (slot, vertex) in out.iter_mut().enumerate() {
            let i = index * N + slot;
            let v = match self.indices {
                Some(indices) => *indices.get(i)? as usize,
                None => i,
            };
            *vertex = read_vec3(self.positions, self.item_size, v)?;
        }
        Some(out)
    }
}
