/// Tuning knobs of the dynamic KD-tree.

use crate::error::Result;
use crate::engine_bail;

/// Spatial index configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialIndexConfig {
    /// Candidate split locations sampled per axis when a node holds 3+ objects
    pub split_samples: usize,
    /// Minimum gap between two objects for a two-object split
    pub two_object_gap: f32,
    /// Moves between two flattens of the node an object is re-added to
    pub flatten_interval: u32,
}

impl Default for SpatialIndexConfig {
    fn default() -> Self {
        Self {
            split_samples: 10,
            two_object_gap: 0.01,
            flatten_interval: 50,
        }
    }
}

impl SpatialIndexConfig {
    /// Reject values the tree cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.split_samples == 0 {
            engine_bail!("galaxy3d::KdTree", InvalidConfig, "split_samples must be at least 1");
        }
        if !self.two_object_gap.is_finite() || self.two_object_gap < 0.0 {
            engine_bail!(
                "galaxy3d::KdTree",
                InvalidConfig,
                "two_object_gap must be finite and non-negative (got {})",
                self.two_object_gap
            );
        }
        if self.flatten_interval == 0 {
            engine_bail!("galaxy3d::KdTree", InvalidConfig, "flatten_interval must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "spatial_index_config_tests.rs"]
mod tests;
