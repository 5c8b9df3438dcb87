/// Scene-side view of an object registered with the culler.
///
/// The culler never owns scene data beyond what this trait exposes. It
/// polls the two version counters every frame and recomputes the world box
/// only when one of them changed.

use glam::Mat4;
use crate::geometry::AABB;
use super::occluder_mesh::OccluderMesh;

bitflags::bitflags! {
    /// Per-object culling hints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CullerHints: u32 {
        /// Never reported visible (and never used as occluder)
        const INVISIBLE     = 0b0000_0001;
        /// Insert polygon by polygon and queue by nearest depth
        const GOOD_OCCLUDER = 0b0000_0010;
        /// Never used as occluder
        const BAD_OCCLUDER  = 0b0000_0100;
    }
}

/// Object tested by the `DynamicVisibilityCuller`.
pub trait VisibilityObject {
    /// Object-space bounding box.
    fn object_box(&self) -> AABB;

    /// Changes whenever the shape (and so `object_box`) changes.
    fn shape_version(&self) -> u32;

    /// Object → world transform.
    fn world_transform(&self) -> Mat4;

    /// Changes whenever `world_transform` changes.
    fn movable_version(&self) -> u32;

    /// Simplified geometry used to write the object into the coverage
    /// buffer. Objects without one never occlude anything.
    fn occluder(&self) -> Option<&OccluderMesh> {
        None
    }

    fn hints(&self) -> CullerHints {
        CullerHints::empty()
    }
}

/// World-space box of an object: its object box through its world transform.
pub fn world_box<O: VisibilityObject + ?Sized>(object: &O) -> AABB {
    object.object_box().transformed(&object.world_transform())
}
