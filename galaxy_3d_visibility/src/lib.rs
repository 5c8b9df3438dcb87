/*!
# Galaxy 3D Visibility

Dynamic occlusion culling core for the Galaxy 3D engine.

The culler keeps scene objects in a lazily refined KD-tree and walks it
front to back from the camera once per frame. Visible objects with an
occluder mesh are written into a software coverage buffer, and anything
whose screen box is fully covered by nearer occluders is culled.

## Architecture

- **TileBits / Rasterizer**: bit-column tiles and the scanline rasterizer
  feeding them
- **CoverageBuffer**: flat one-bit-per-pixel buffer with a coarse depth grid
- **TiledCoverageBuffer**: the same buffer split in 32x64 tiles with lazy
  line operations
- **SpatialIndex**: dynamic KD-tree over world-space boxes
- **DynamicVisibilityCuller**: the per-frame visibility pass

Everything is reachable through the `galaxy3d` namespace module.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod geometry;
pub mod camera;
pub mod coverage;
pub mod spatial;
pub mod culling;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade (global logger)
    pub use crate::engine::Engine;

    // Main entry point
    pub use crate::culling::DynamicVisibilityCuller;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Bounding volumes
    pub mod geometry {
        pub use crate::geometry::*;
    }

    // Camera, projection and frustum
    pub mod camera {
        pub use crate::camera::*;
    }

    // Coverage buffers and rasterizer
    pub mod coverage {
        pub use crate::coverage::*;
    }

    // KD-tree spatial index
    pub mod spatial {
        pub use crate::spatial::*;
    }

    // Visibility culler
    pub mod culling {
        pub use crate::culling::*;
    }
}

// Re-export math library at crate root
pub use glam;
