//! Configuration system
//!
//! Every knob of the per-frame pipeline lives here so applications can ship
//! it as a TOML or RON file next to their scene.

pub use serde::{Deserialize, Serialize};

use std::path::Path;

/// Default depth cap for ancestor walks and tree traversals
pub const DEFAULT_MAX_DEPTH: usize = 2048;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Per-frame refiner switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Test renderable nodes against the camera frustum
    pub frustum_culling: bool,
    /// Dirty-check transforms and refresh world matrices
    pub update_world_matrix: bool,
    /// Deepest level the traversal descends to before skipping a subtree
    pub max_traversal_depth: usize,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            frustum_culling: true,
            update_world_matrix: true,
            max_traversal_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Transform resolver limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Longest ancestor path walked when resolving a world matrix
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Raycaster acceptance window and picking tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaycastConfig {
    /// Hits closer than this are ignored
    pub near: f32,
    /// Hits farther than this are ignored
    pub far: f32,
    /// World-space picking distance for line meshes
    pub line_threshold: f32,
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f32::INFINITY,
            line_threshold: 1.0,
        }
    }
}

/// Top-level configuration for a scene pipeline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Refiner settings
    pub refiner: RefinerConfig,
    /// Resolver settings
    pub resolver: ResolverConfig,
    /// Raycast settings
    pub raycast: RaycastConfig,
}

impl Config for SceneConfig {}
