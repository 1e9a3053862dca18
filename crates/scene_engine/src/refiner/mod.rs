//! Per-frame scene refinement: dirty checking, bounds upkeep and culling

pub mod observable;
pub mod visibility;

pub use observable::ObservableNode;
pub use visibility::{RefinerInfo, VisibilityRefiner};
