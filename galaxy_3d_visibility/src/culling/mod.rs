//! Culling module — the dynamic visibility culler and what it consumes.
//!
//! Scene objects are seen through the `VisibilityObject` trait. The culler
//! keeps them in a `SpatialIndex` and decides, once per frame, which of
//! them may be visible from a `Camera`.

mod visibility_object;
mod occluder_mesh;
mod write_queue;
mod history;
mod culler_config;
mod dynamic_visibility_culler;

pub use visibility_object::{VisibilityObject, CullerHints, world_box};
pub use occluder_mesh::{OccluderMesh, Outline, MeshPolygon};
pub use write_queue::{WriteQueue, WriteQueueEntry};
pub use history::VisibilityReason;
pub use culler_config::{CullerConfig, CoverageMode};
pub use dynamic_visibility_culler::{DynamicVisibilityCuller, VisObjectKey, CullStatistics};
