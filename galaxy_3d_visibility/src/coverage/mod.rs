//! Screen-space occlusion buffers.
//!
//! Both buffers store one coverage bit per pixel plus one maximum depth per
//! 8x8 pixel block. A pixel hides an object of depth `d` when it is covered
//! and the occluder stored for its block is nearer than `d`.

mod tile_bits;
mod rasterizer;
mod depth_grid;
mod coverage_buffer;
mod coverage_tile;
mod tiled_coverage_buffer;

pub use tile_bits::{TileBits, Bits32, Bits64, KEEP_MASKS};
pub use rasterizer::{EdgeWalk, EdgeColumn, rasterize_polygon, rasterize_outline};
pub use depth_grid::DepthGrid;
pub use coverage_buffer::CoverageBuffer;
pub use coverage_tile::{CoverageTile, CoverageStatus, LineOp};
pub use tiled_coverage_buffer::TiledCoverageBuffer;

use glam::{Vec2, Vec3};
use smallvec::SmallVec;
use crate::camera::Projection;
use crate::geometry::ScreenBox;

/// Tile width in pixels (one `Bits64` word per tile column)
pub const TILE_WIDTH: i32 = 32;
/// Tile height in pixels (bits of a `Bits64` word)
pub const TILE_HEIGHT: i32 = 64;
/// Pixels per side of a depth block
pub const DEPTH_BLOCK: i32 = 8;

/// Camera-space depth at or below which outline vertices are rejected.
pub const OUTLINE_NEAR_Z: f32 = 0.2;

/// Largest accepted buffer dimension on either axis
pub const MAX_DIMENSION: i32 = 16384;

/// Coverage plus coarse depth, queried while traversing front to back.
pub trait OcclusionBuffer {
    /// (Re)allocate for a `width` x `height` screen. Leaves the buffer empty.
    fn setup(&mut self, width: i32, height: i32) -> crate::error::Result<()>;

    fn width(&self) -> i32;

    fn height(&self) -> i32;

    /// Clear coverage and depth. Called once per frame.
    fn initialize(&mut self);

    /// Insert a convex occluder whose farthest point is at `max_depth`.
    ///
    /// With `negative` set, everything except the polygon is inserted.
    /// Returns true if any pixel became covered.
    fn insert_polygon(&mut self, vertices: &[Vec2], max_depth: f32, negative: bool) -> bool;

    /// Insert a closed silhouette outline.
    ///
    /// `vertices` are in the source space of `projection`; only the vertices
    /// flagged in `used_vertices` take part in the bounding box and depth.
    /// Returns false without change when a used vertex is too close to the
    /// camera.
    fn insert_outline(
        &mut self,
        projection: &Projection,
        vertices: &[Vec3],
        used_vertices: &[bool],
        edges: &[[u32; 2]],
    ) -> bool;

    /// True if some pixel of the polygon is uncovered or covered by an
    /// occluder not nearer than `min_depth`.
    fn test_polygon(&mut self, vertices: &[Vec2], min_depth: f32) -> bool;

    /// Same predicate over a screen rectangle (inclusive after rounding).
    fn test_rectangle(&self, rect: &ScreenBox, min_depth: f32) -> bool;

    /// Same predicate for one pixel.
    fn test_point(&self, point: Vec2, min_depth: f32) -> bool;

    /// True once every on-screen pixel is covered.
    fn is_full(&self) -> bool;

    /// Coverage bit of an on-screen pixel (false off screen).
    fn is_covered(&self, x: i32, y: i32) -> bool;

    /// Stored depth of the block holding an on-screen pixel (0 off screen).
    fn depth_at(&self, x: i32, y: i32) -> f32;

    /// One character per 8x8 block, top row first:
    /// `#` full, `*` mostly, `x` partly, `.` a few pixels, ` ` none.
    fn debug_dump(&self) -> String {
        let (width, height) = (self.width(), self.height());
        let mut out = String::new();
        for by in (0..height).step_by(DEPTH_BLOCK as usize) {
            for bx in (0..width).step_by(DEPTH_BLOCK as usize) {
                let mut count = 0;
                for y in by..by + DEPTH_BLOCK {
                    for x in bx..bx + DEPTH_BLOCK {
                        if x >= width || y >= height || self.is_covered(x, y) {
                            count += 1;
                        }
                    }
                }
                out.push(match count {
                    64 => '#',
                    55..=63 => '*',
                    0 => ' ',
                    1..=9 => '.',
                    _ => 'x',
                });
            }
            out.push('\n');
        }
        out
    }

    /// Report every on-screen pixel with its coverage bit.
    fn debug_dump_pixels(&self, plot: &mut dyn FnMut(i32, i32, bool)) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                plot(x, y, self.is_covered(x, y));
            }
        }
    }
}

/// Projected outline vertices plus the outline's farthest depth.
pub(crate) struct ProjectedOutline {
    pub points: SmallVec<[Vec2; 64]>,
    pub max_depth: f32,
}

/// Project the outline vertices used by an outline insertion.
///
/// Unused vertices are projected as well (edges may still refer to them)
/// unless they are behind the camera, in which case they map to the origin.
pub(crate) fn project_outline(
    projection: &Projection,
    vertices: &[Vec3],
    used_vertices: &[bool],
) -> Option<ProjectedOutline> {
    let mut points = SmallVec::with_capacity(vertices.len());
    let mut max_depth = f32::NEG_INFINITY;
    for (i, v) in vertices.iter().enumerate() {
        let camera = projection.to_camera(*v);
        let used = used_vertices.get(i).copied().unwrap_or(false);
        if used {
            if camera.z <= OUTLINE_NEAR_Z {
                return None;
            }
            max_depth = max_depth.max(camera.z);
        }
        if camera.z > 0.0 {
            points.push(projection.perspective(camera));
        } else {
            points.push(Vec2::ZERO);
        }
    }
    if max_depth == f32::NEG_INFINITY {
        return None;
    }
    Some(ProjectedOutline { points, max_depth })
}

/// Validate buffer dimensions for `setup`.
pub(crate) fn check_dimensions(source: &str, width: i32, height: i32) -> crate::error::Result<()> {
    if width <= 0 || height <= 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        crate::engine_bail!(
            source,
            InvalidDimensions,
            "{}x{} is outside 1..={} on some axis",
            width, height, MAX_DIMENSION
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
