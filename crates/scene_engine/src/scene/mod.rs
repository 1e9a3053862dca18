//! Scene data model
//!
//! Nodes live in a [`SceneGraph`] arena and are addressed by [`NodeKey`].
//! Renderable nodes carry a [`Geometry`] and a [`Material`]; everything else
//! is a plain container with a transform.

pub mod geometry;
pub mod graph;
pub mod material;
pub mod node;

pub use geometry::{Attribute, DrawMode, Geometry, IndexBuffer};
pub use graph::{NodeKey, SceneGraph};
pub use material::{Material, MaterialKind, Side, SpriteParams};
pub use node::{Node, RenderState, Transform, TransformData, Trs, UNCACHED_VERSION};
