//! Transform resolution

pub mod resolver;

pub use resolver::{local_matrix, TransformResolver, MAX_NODE_ID};
