/// Frame-coherence bookkeeping for objects and tree nodes.
///
/// Something found visible stays visible for a few "history frames"
/// without being tested again. The history frame counter advances faster
/// when the camera moves, and the keep-visible distances are jittered so
/// that re-tests of many objects do not all land on the same frame.

use glam::Vec3;

/// Why an object or node ended up (in)visible in the last pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityReason {
    /// Not reached by the last traversal
    #[default]
    Untested,
    /// Outside the view frustum or the screen
    InvisibleFrustum,
    /// Hidden by the coverage buffer
    InvisibleCoverage,
    /// Marked invisible by its hints
    InvisibleHint,
    /// Passed every test
    Visible,
    /// The camera is inside its box
    VisibleInside,
    /// Still within its keep-visible window
    VisibleHistory,
    /// Its tracked visible point is still visible
    VisiblePoint,
}

impl VisibilityReason {
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            VisibilityReason::Visible
                | VisibilityReason::VisibleInside
                | VisibilityReason::VisibleHistory
                | VisibilityReason::VisiblePoint
        )
    }
}

/// Per-object history
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ObjectHistory {
    /// Visible without testing while the history frame is <= this
    pub vis_cnt: u32,
    /// Write-queue tests skipped while the history frame is < this
    pub no_writequeue_vis_cnt: u32,
    /// Not used as occluder while the history frame is < this
    pub no_occluder_vis_cnt: u32,
    /// World-space point last seen visible
    pub visible_point: Option<Vec3>,
    pub reason: VisibilityReason,
}

impl ObjectHistory {
    /// Drop what depended on the old position of a moved object.
    pub fn forget_position(&mut self) {
        self.visible_point = None;
        self.no_writequeue_vis_cnt = 0;
    }
}

/// Per-node history
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeHistory {
    pub vis_cnt: u32,
    /// Frustum planes still to test below the node when it was last visible
    pub frustum_mask: u32,
    pub reason: VisibilityReason,
}

impl Default for NodeHistory {
    fn default() -> Self {
        Self {
            vis_cnt: 0,
            frustum_mask: crate::camera::ALL_PLANES_MASK,
            reason: VisibilityReason::Untested,
        }
    }
}

/// Multiply-with-carry generator for history jitter.
///
/// Only the low 16 bits are well distributed, which is all the jitter uses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FastRand {
    seed: u32,
}

impl Default for FastRand {
    fn default() -> Self {
        Self { seed: 362_436_069 }
    }
}

impl FastRand {
    pub fn next(&mut self) -> u32 {
        self.seed = 30903u32
            .wrapping_mul(self.seed & 0xffff)
            .wrapping_add(self.seed >> 16);
        self.seed
    }

    /// Keep-visible distance after a positive test
    pub fn dist_history(&mut self) -> u32 {
        9 + (self.next() & 0x7)
    }

    /// Write-queue holdoff after a full positive test
    pub fn dist_no_write_queue(&mut self) -> u32 {
        15 + (self.next() & 0x7)
    }

    /// Occluder holdoff after an insertion that changed nothing
    pub fn dist_no_occluder(&mut self) -> u32 {
        8 + (self.next() & 0x7)
    }
}

/// History frames added for a camera move of squared length `sq_dist`
/// (on top of the one added every frame).
pub(crate) fn camera_move_increment(sq_dist: f32) -> u32 {
    let mut increment = 0;
    if sq_dist > 0.005 {
        increment += 2;
        if sq_dist > 0.1 {
            increment += 2;
            if sq_dist > 0.5 {
                increment += 5;
            }
        }
    }
    increment
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
