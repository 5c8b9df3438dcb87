//! Spatial index: a dynamic KD-tree over world-space bounding boxes.
//!
//! The tree refines itself lazily while it is traversed, which suits a
//! culler that walks it front to back once per frame.

mod spatial_index_config;
mod kd_tree;
mod kd_tree_debug;

pub use spatial_index_config::SpatialIndexConfig;
pub use kd_tree::{SpatialIndex, KdNodeKey, KdChildKey, TIMESTAMP_RESET};
pub use kd_tree_debug::KdTreeStatistics;
