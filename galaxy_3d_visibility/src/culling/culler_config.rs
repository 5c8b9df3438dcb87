/// Culler configuration: screen size, spatial index tuning and feature switches.

use crate::error::Result;
use crate::spatial::SpatialIndexConfig;
use crate::engine_bail;

/// How visible occluders are written into the coverage buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageMode {
    /// No coverage buffer: frustum and history culling only
    None,
    /// Front-facing polygons one by one
    Polygon,
    /// Silhouette outline for closed meshes, polygons otherwise
    Outline,
}

/// Culler configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullerConfig {
    /// Coverage buffer width in pixels
    pub screen_width: i32,
    /// Coverage buffer height in pixels
    pub screen_height: i32,
    pub spatial: SpatialIndexConfig,
    /// Test nodes and objects against the view frustum
    pub frustum_culling: bool,
    pub coverage_mode: CoverageMode,
    /// Keep recently visible nodes and objects visible for a few frames
    pub history_culling: bool,
    /// Test objects individually (off: every object of a visible node is visible)
    pub object_tests: bool,
    /// Defer occluder insertion until an object test needs it
    pub write_queue: bool,
    /// Remember a visible point per object and test it first
    pub visible_point_tracking: bool,
    /// Cover everything outside the camera clip polygon
    pub insert_inverted_clipper: bool,
    /// Skip occluders for a while after they changed nothing
    pub ignore_bad_occluders: bool,
    /// Clip occluder polygons crossing the near plane instead of skipping them
    pub clamp_occluders: bool,
}

impl Default for CullerConfig {
    fn default() -> Self {
        Self {
            screen_width: 640,
            screen_height: 480,
            spatial: SpatialIndexConfig::default(),
            frustum_culling: true,
            coverage_mode: CoverageMode::Outline,
            history_culling: true,
            object_tests: true,
            write_queue: true,
            visible_point_tracking: true,
            insert_inverted_clipper: true,
            ignore_bad_occluders: true,
            clamp_occluders: false,
        }
    }
}

impl CullerConfig {
    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.screen_width, self.screen_height);
        if w <= 0 || h <= 0 || w > crate::coverage::MAX_DIMENSION || h > crate::coverage::MAX_DIMENSION {
            engine_bail!(
                "galaxy3d::DynaVis",
                InvalidConfig,
                "screen size {}x{} is outside 1..={}",
                w, h, crate::coverage::MAX_DIMENSION
            );
        }
        self.spatial.validate()
    }
}

#[cfg(test)]
#[path = "culler_config_tests.rs"]
mod tests;
