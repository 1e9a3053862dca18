//! Error types for scene graph operations

use thiserror::Error;

/// Errors raised by the scene graph, transform resolver and raycaster.
///
/// `SchemaNotValid` is the fatal class: it means a node was handed to the
/// engine before it was normalized and the caller must fix its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Node data does not satisfy what the operation needs
    #[error("schema not valid: {0}")]
    SchemaNotValid(String),

    /// Key does not refer to a live node
    #[error("node not found in scene graph")]
    NodeNotFound,

    /// Attaching the child would make it its own ancestor
    #[error("attaching node would create a cycle")]
    CycleDetected,

    /// The identity table ran out of exactly representable ids
    #[error("node id exceeds 2^53 - 1")]
    IdExhausted,

    /// A raycast was requested before the mesh's world matrix was resolved
    #[error("world matrix is needed to perform a raycast")]
    WorldMatrixUnresolved,
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
