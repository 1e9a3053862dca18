//! # Scene Engine
//!
//! Scene graph bookkeeping for real-time renderers: hierarchical transform
//! resolution with versioned caches, per-frame visibility refinement with
//! frustum culling, and CPU ray picking.
//!
//! ## Features
//!
//! - **Arena scene graph**: nodes addressed by stable keys, cycle-checked reparenting
//! - **Cached transforms**: world matrices recomputed only along dirty paths
//! - **Frustum culling**: sphere then box tests against the camera frustum
//! - **Raycasting**: triangle, line and camera-facing sprite meshes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut graph = SceneGraph::new();
//!     let root = graph.insert(Node::new("root"));
//!
//!     let mut refiner = VisibilityRefiner::default();
//!     let camera = CameraParams::new(Vec3::new(0.0, 0.0, 10.0), 60.0, 16.0 / 9.0, 0.1, 1000.0);
//!     refiner.update(&mut graph, root, &camera)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod bounds;
pub mod config;
pub mod culling;
pub mod error;
pub mod foundation;
pub mod raycast;
pub mod refiner;
pub mod scene;
pub mod transform;

#[cfg(test)]
mod tests;

pub use error::{Result, SceneError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        bounds::{BBox, BSphere},
        config::{Config, RaycastConfig, RefinerConfig, ResolverConfig, SceneConfig},
        culling::{CameraParams, Frustum},
        error::{Result, SceneError},
        foundation::math::{Euler, EulerOrder, Mat4, Quat, Vec2, Vec3},
        raycast::{Intersection, RaycastInfo, Raycaster},
        refiner::VisibilityRefiner,
        scene::{DrawMode, Geometry, Material, Node, NodeKey, SceneGraph, Side, Transform},
        transform::TransformResolver,
    };
}
