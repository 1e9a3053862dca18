//! Geometry and vertex attribute data
//!
//! The engine only reads geometry: positions for bounds and raycasts, the
//! draw mode to pick an intersection routine, and any precomputed volumes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::bounds::{BBox, BSphere};
use crate::error::SceneError;

/// Name of the position attribute
pub const POSITION: &str = "position";

/// Name of the per-vertex billboard corner attribute (values 0..=3)
pub const CORNER: &str = "corner";

/// Name of the optional per-vertex billboard size attribute (2 components)
pub const SIZE: &str = "size";

/// Primitive topology of a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Every three vertices (or indices) form a triangle
    #[default]
    Triangles,
    /// Every two vertices (or indices) form a segment
    Lines,
    /// Every vertex is a point
    Points,
    /// Every four vertices form a camera-facing quad
    Sprite,
}

impl DrawMode {
    /// Upper-case name, e.g. `"TRIANGLES"`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Triangles => "TRIANGLES",
            Self::Lines => "LINES",
            Self::Points => "POINTS",
            Self::Sprite => "SPRITE",
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawMode {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRIANGLES" => Ok(Self::Triangles),
            "LINES" => Ok(Self::Lines),
            "POINTS" => Ok(Self::Points),
            "SPRITE" => Ok(Self::Sprite),
            other => Err(SceneError::SchemaNotValid(format!(
                "unsupported geometry.mode `{other}`"
            ))),
        }
    }
}

/// A flat vertex attribute buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    array: Vec<f32>,
    item_size: usize,
    version: i64,
    disposed: bool,
}

impl Attribute {
    /// Create an attribute from flat values
    pub fn new(array: Vec<f32>, item_size: usize) -> Self {
        Self {
            array,
            item_size: item_size.max(1),
            version: 0,
            disposed: false,
        }
    }

    /// Components per vertex
    pub const fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of vertices
    pub fn count(&self) -> usize {
        if self.disposed {
            0
        } else {
            self.array.len() / self.item_size
        }
    }

    /// Data version, bumped by [`Attribute::set_array`]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Values, or `None` once the buffer has been released
    pub fn values(&self) -> Option<&[f32]> {
        if self.disposed {
            None
        } else {
            Some(&self.array)
        }
    }

    /// Replace the data and mark it changed
    pub fn set_array(&mut self, array: Vec<f32>) {
        self.array = array;
        self.disposed = false;
        if self.version != -1 {
            self.version += 1;
        }
    }

    /// Release the data. The attribute stays in place but reads as disposed.
    pub fn dispose(&mut self) {
        self.array = Vec::new();
        self.disposed = true;
    }

    /// Whether the data has been released
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Components of vertex `index`, if in range
    pub fn item(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.item_size)?;
        self.values()?.get(start..start + self.item_size)
    }
}

/// Triangle/segment index buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    array: Vec<u32>,
    disposed: bool,
}

impl IndexBuffer {
    /// Create an index buffer
    pub const fn new(array: Vec<u32>) -> Self {
        Self {
            array,
            disposed: false,
        }
    }

    /// Indices, or `None` once released
    pub fn values(&self) -> Option<&[u32]> {
        if self.disposed {
            None
        } else {
            Some(&self.array)
        }
    }

    /// Release the data
    pub fn dispose(&mut self) {
        self.array = Vec::new();
        self.disposed = true;
    }
}

/// Renderable geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Primitive topology
    pub mode: DrawMode,
    /// Named vertex attributes
    pub attributes: HashMap<String, Attribute>,
    /// Optional index buffer
    pub indices: Option<IndexBuffer>,
    /// Local-space box, precomputed or filled in by the refiner
    pub bounding_box: Option<BBox>,
    /// Local-space sphere, precomputed or filled in by the refiner
    pub bounding_sphere: Option<BSphere>,
}

impl Geometry {
    /// Create a geometry with the given mode and flat `xyz` positions
    pub fn new(mode: DrawMode, positions: Vec<f32>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(POSITION.to_string(), Attribute::new(positions, 3));
        Self {
            mode,
            attributes,
            indices: None,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Geometry with no attributes at all
    pub fn empty(mode: DrawMode) -> Self {
        Self {
            mode,
            attributes: HashMap::new(),
            indices: None,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Builder: attach an index buffer
    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(IndexBuffer::new(indices));
        self
    }

    /// Builder: attach a named attribute
    #[must_use]
    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Builder: supply a custom bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bbox: BBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Builder: supply a custom bounding sphere
    #[must_use]
    pub const fn with_bounding_sphere(mut self, sphere: BSphere) -> Self {
        self.bounding_sphere = Some(sphere);
        self
    }

    /// The position attribute, if present
    pub fn position(&self) -> Option<&Attribute> {
        self.attributes.get(POSITION)
    }

    /// Usable position values: present, not disposed and non-empty
    pub fn position_values(&self) -> Option<&[f32]> {
        self.position()
            .and_then(Attribute::values)
            .filter(|values| !values.is_empty())
    }

    /// Named attribute lookup
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Drop the cached volumes so the next refine recomputes them
    pub fn invalidate_bounds(&mut self) {
        self.bounding_box = None;
        self.bounding_sphere = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_mode_parse() {
        assert_eq!("SPRITE".parse::<DrawMode>().unwrap(), DrawMode::Sprite);
        assert!(matches!(
            "TRIANGLE_FAN".parse::<DrawMode>(),
            Err(SceneError::SchemaNotValid(_))
        ));
    }

    #[test]
    fn test_disposed_attribute_reads_as_missing() {
        let mut geom = Geometry::new(DrawMode::Triangles, vec![0.0; 9]);
        assert_eq!(geom.position().unwrap().count(), 3);

        geom.attributes.get_mut(POSITION).unwrap().dispose();
        assert!(geom.position().unwrap().is_disposed());
        assert!(geom.position_values().is_none());
        assert_eq!(geom.position().unwrap().count(), 0);
    }

    #[test]
    fn test_attribute_item_lookup() {
        let attr = Attribute::new(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(attr.item(1), Some(&[3.0, 4.0][..]));
        assert_eq!(attr.item(2), None);
    }

    #[test]
    fn test_set_array_bumps_version() {
        let mut attr = Attribute::new(vec![0.0; 3], 3);
        attr.set_array(vec![1.0; 3]);
        assert_eq!(attr.version(), 1);
    }
}
