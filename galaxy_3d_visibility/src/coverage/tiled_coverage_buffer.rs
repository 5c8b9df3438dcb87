//! Tiled coverage buffer.
//!
//! The screen is cut into 32x64 tiles. Polygon edges are queued on the
//! tiles they cross, then every touched tile row is flushed left to right,
//! threading the XOR carry from tile to tile. Tiles that become entirely
//! covered only answer depth questions from then on.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;
use crate::camera::Projection;
use crate::error::Result;
use crate::geometry::{round_to_pixel, ScreenBox, ScreenRect};
use super::{
    check_dimensions, project_outline, rasterize_outline, rasterize_polygon,
    Bits64, CoverageStatus, CoverageTile, EdgeColumn, EdgeWalk, OcclusionBuffer, TileBits,
    TILE_HEIGHT, TILE_WIDTH,
};

const TILE_X_SHIFT: i32 = 5;
const TILE_Y_SHIFT: i32 = 6;

/// Consecutive rows of one edge that toggle inside the same tile
#[derive(Debug, Clone, Copy)]
struct EdgeRun {
    tile_x: i32,
    tile_y: i32,
    clamped: bool,
    y_first: i32,
    y_last: i32,
    first_col: i32,
    last_col: i32,
}

#[derive(Debug, Clone, Default)]
pub struct TiledCoverageBuffer {
    width: i32,
    height: i32,
    tile_cols: i32,
    tile_rows: i32,
    tiles: Vec<CoverageTile>,
    /// Per tile row: leftmost tile with queued operations
    dirty_left: Vec<i32>,
    /// Per tile row: rightmost tile with queued operations
    dirty_right: Vec<i32>,
}

impl TiledCoverageBuffer {
    /// Empty buffer; call `setup` before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer set up for `width` x `height` and cleared.
    pub fn with_size(width: i32, height: i32) -> Result<Self> {
        let mut buffer = Self::new();
        buffer.setup(width, height)?;
        Ok(buffer)
    }

    pub fn tile_cols(&self) -> i32 {
        self.tile_cols
    }

    pub fn tile_rows(&self) -> i32 {
        self.tile_rows
    }

    /// Tile at tile coordinates
    pub fn tile(&self, tile_x: i32, tile_y: i32) -> &CoverageTile {
        &self.tiles[self.tile_index(tile_x, tile_y)]
    }

    #[inline]
    fn tile_index(&self, tile_x: i32, tile_y: i32) -> usize {
        (tile_y * self.tile_cols + tile_x) as usize
    }

    #[inline]
    fn tile_at_pixel(&self, x: i32, y: i32) -> &CoverageTile {
        self.tile(x >> TILE_X_SHIFT, y >> TILE_Y_SHIFT)
    }

    fn reset_dirty(&mut self, tile_y: i32) {
        self.dirty_left[tile_y as usize] = self.tile_cols;
        self.dirty_right[tile_y as usize] = -1;
    }

    fn mark_dirty(&mut self, tile_x: i32, tile_y: i32) {
        let row = tile_y as usize;
        self.dirty_left[row] = self.dirty_left[row].min(tile_x);
        self.dirty_right[row] = self.dirty_right[row].max(tile_x);
    }

    /// Split an edge into per-tile line operations.
    fn queue_edge(&mut self, edge: &EdgeWalk) {
        let mut runs: SmallVec<[EdgeRun; 8]> = SmallVec::new();
        edge.for_each_row(self.width, |y, column| {
            let clamped = column == EdgeColumn::ClampedLeft;
            let col = column.column();
            let tile_x = col >> TILE_X_SHIFT;
            let tile_y = y >> TILE_Y_SHIFT;
            if let Some(run) = runs.last_mut() {
                if run.tile_x == tile_x && run.tile_y == tile_y && run.clamped == clamped && run.y_last + 1 == y {
                    run.y_last = y;
                    run.last_col = col;
                    return;
                }
            }
            runs.push(EdgeRun {
                tile_x,
                tile_y,
                clamped,
                y_first: y,
                y_last: y,
                first_col: col,
                last_col: col,
            });
        });

        for run in &runs {
            let y1 = (run.y_first & (TILE_HEIGHT - 1)) as u32;
            let y2 = (run.y_last & (TILE_HEIGHT - 1)) as u32;
            let index = self.tile_index(run.tile_x, run.tile_y);
            let tile = &mut self.tiles[index];
            if run.first_col == run.last_col {
                let x = (run.first_col & (TILE_WIDTH - 1)) as u32;
                if y1 == 0 && y2 == (TILE_HEIGHT - 1) as u32 {
                    tile.push_full_vline(x);
                } else {
                    tile.push_vline(x, y1, y2);
                }
            } else {
                let origin = ((run.tile_x * TILE_WIDTH) as i64) << 16;
                let x = edge.x_at(run.y_first) - origin;
                tile.push_line(x as i32, edge.dx as i32, y1, y2);
            }
            self.mark_dirty(run.tile_x, run.tile_y);
        }
    }

    fn queue_edges(&mut self, edges: &[EdgeWalk]) {
        for edge in edges {
            self.queue_edge(edge);
        }
    }

    /// Tile rows overlapping a rasterized bounding box
    fn tile_row_range(&self, bbox: &ScreenRect) -> (i32, i32) {
        (
            (bbox.min_y >> TILE_Y_SHIFT).max(0),
            (bbox.max_y >> TILE_Y_SHIFT).min(self.tile_rows - 1),
        )
    }

    /// Flush the queued operations of the given tile rows.
    fn flush_rows(&mut self, first_row: i32, last_row: i32, max_depth: f32, negative: bool) -> bool {
        let (first_row, last_row) = if negative { (0, self.tile_rows - 1) } else { (first_row, last_row) };
        let mut modified = false;
        for tile_y in first_row..=last_row {
            let (left, right) = if negative {
                (0, self.tile_cols - 1)
            } else {
                (self.dirty_left[tile_y as usize], self.dirty_right[tile_y as usize])
            };
            if left > right {
                continue;
            }
            let mut carry = if negative { Bits64::full() } else { Bits64::empty() };
            let mut tile_x = left;
            // Toggles right of the screen are dropped, so the carry may
            // still be set after the last dirty tile.
            while tile_x < self.tile_cols && (tile_x <= right || !carry.is_empty()) {
                let index = self.tile_index(tile_x, tile_y);
                modified |= self.tiles[index].flush(&mut carry, max_depth);
                tile_x += 1;
            }
            self.reset_dirty(tile_y);
        }
        modified
    }

    /// Run a non-mutating flush over the queued rows, then drop the queue.
    fn test_rows(&mut self, first_row: i32, last_row: i32, min_depth: f32) -> bool {
        let mut visible = false;
        'rows: for tile_y in first_row..=last_row {
            let left = self.dirty_left[tile_y as usize];
            let right = self.dirty_right[tile_y as usize];
            let mut carry = Bits64::empty();
            let mut tile_x = left;
            while tile_x < self.tile_cols && (tile_x <= right || !carry.is_empty()) {
                if self.tile(tile_x, tile_y).test_flush(&mut carry, min_depth) {
                    visible = true;
                    break 'rows;
                }
                tile_x += 1;
            }
        }

        for tile_y in first_row..=last_row {
            let left = self.dirty_left[tile_y as usize];
            let right = self.dirty_right[tile_y as usize];
            for tile_x in left..=right {
                let index = self.tile_index(tile_x, tile_y);
                self.tiles[index].clear_operations();
            }
            self.reset_dirty(tile_y);
        }
        visible
    }

    fn queue_polygon(&mut self, vertices: &[Vec2]) -> Option<ScreenRect> {
        let mut edges: SmallVec<[EdgeWalk; 16]> = SmallVec::new();
        let bbox = rasterize_polygon(vertices, self.width, self.height, |e| edges.push(e))?;
        self.queue_edges(&edges);
        Some(bbox)
    }

    /// Coverage of a screen rectangle, ignoring depth.
    ///
    /// Rectangles entirely off screen are reported `Empty`.
    pub fn status_no_depth(&self, rect: &ScreenBox) -> CoverageStatus {
        let Some(bbox) = rect.to_rect().clamped(self.width, self.height) else {
            return CoverageStatus::Empty;
        };
        let mut status: Option<CoverageStatus> = None;
        for tile_y in (bbox.min_y >> TILE_Y_SHIFT)..=(bbox.max_y >> TILE_Y_SHIFT) {
            let y1 = (bbox.min_y - tile_y * TILE_HEIGHT).max(0);
            let y2 = (bbox.max_y - tile_y * TILE_HEIGHT).min(TILE_HEIGHT - 1);
            for tile_x in (bbox.min_x >> TILE_X_SHIFT)..=(bbox.max_x >> TILE_X_SHIFT) {
                let x1 = (bbox.min_x - tile_x * TILE_WIDTH).max(0);
                let x2 = (bbox.max_x - tile_x * TILE_WIDTH).min(TILE_WIDTH - 1);
                let tile_status = self.tile(tile_x, tile_y).status_no_depth(x1, y1, x2, y2);
                let combined = match status {
                    None => tile_status,
                    Some(s) => s.combine(tile_status),
                };
                if combined == CoverageStatus::Partial {
                    return combined;
                }
                status = Some(combined);
            }
        }
        status.unwrap_or(CoverageStatus::Empty)
    }
}

impl OcclusionBuffer for TiledCoverageBuffer {
    fn setup(&mut self, width: i32, height: i32) -> Result<()> {
        check_dimensions("galaxy3d::TiledCoverageBuffer", width, height)?;

        self.width = width;
        self.height = height;
        self.tile_cols = (width + TILE_WIDTH - 1) / TILE_WIDTH;
        self.tile_rows = (height + TILE_HEIGHT - 1) / TILE_HEIGHT;

        self.tiles = Vec::with_capacity((self.tile_cols * self.tile_rows) as usize);
        for tile_y in 0..self.tile_rows {
            for tile_x in 0..self.tile_cols {
                self.tiles.push(CoverageTile::new(
                    width - tile_x * TILE_WIDTH,
                    height - tile_y * TILE_HEIGHT,
                ));
            }
        }
        self.dirty_left = vec![self.tile_cols; self.tile_rows as usize];
        self.dirty_right = vec![-1; self.tile_rows as usize];

        crate::engine_debug!(
            "galaxy3d::TiledCoverageBuffer",
            "Setup {}x{} ({}x{} tiles)",
            width, height, self.tile_cols, self.tile_rows
        );

        self.initialize();
        Ok(())
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn initialize(&mut self) {
        for tile in &mut self.tiles {
            tile.mark_pending_clear();
            tile.clear_operations();
        }
        for tile_y in 0..self.tile_rows {
            self.reset_dirty(tile_y);
        }
    }

    fn insert_polygon(&mut self, vertices: &[Vec2], max_depth: f32, negative: bool) -> bool {
        let Some(bbox) = self.queue_polygon(vertices) else {
            return false;
        };
        let (first_row, last_row) = self.tile_row_range(&bbox);
        self.flush_rows(first_row, last_row, max_depth, negative)
    }

    fn insert_outline(
        &mut self,
        projection: &Projection,
        vertices: &[Vec3],
        used_vertices: &[bool],
        edges: &[[u32; 2]],
    ) -> bool {
        let Some(outline) = project_outline(projection, vertices, used_vertices) else {
            return false;
        };
        let mut walks: SmallVec<[EdgeWalk; 16]> = SmallVec::new();
        let Some(bbox) = rasterize_outline(
            &outline.points,
            used_vertices,
            edges,
            self.width,
            self.height,
            |e| walks.push(e),
        ) else {
            return false;
        };
        self.queue_edges(&walks);
        let (first_row, last_row) = self.tile_row_range(&bbox);
        self.flush_rows(first_row, last_row, outline.max_depth, false)
    }

    fn test_polygon(&mut self, vertices: &[Vec2], min_depth: f32) -> bool {
        let Some(bbox) = self.queue_polygon(vertices) else {
            return false;
        };
        let (first_row, last_row) = self.tile_row_range(&bbox);
        self.test_rows(first_row, last_row, min_depth)
    }

    fn test_rectangle(&self, rect: &ScreenBox, min_depth: f32) -> bool {
        let Some(bbox) = rect.to_rect().clamped(self.width, self.height) else {
            return false;
        };
        for tile_y in (bbox.min_y >> TILE_Y_SHIFT)..=(bbox.max_y >> TILE_Y_SHIFT) {
            let y1 = (bbox.min_y - tile_y * TILE_HEIGHT).max(0);
            let y2 = (bbox.max_y - tile_y * TILE_HEIGHT).min(TILE_HEIGHT - 1);
            for tile_x in (bbox.min_x >> TILE_X_SHIFT)..=(bbox.max_x >> TILE_X_SHIFT) {
                let x1 = (bbox.min_x - tile_x * TILE_WIDTH).max(0);
                let x2 = (bbox.max_x - tile_x * TILE_WIDTH).min(TILE_WIDTH - 1);
                if self.tile(tile_x, tile_y).test_rect(x1, y1, x2, y2, min_depth) {
                    return true;
                }
            }
        }
        false
    }

    fn test_point(&self, point: Vec2, min_depth: f32) -> bool {
        let x = round_to_pixel(point.x);
        let y = round_to_pixel(point.y);
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.tile_at_pixel(x, y)
            .test_point(x & (TILE_WIDTH - 1), y & (TILE_HEIGHT - 1), min_depth)
    }

    fn is_full(&self) -> bool {
        self.tiles.iter().all(|t| t.is_full())
    }

    fn is_covered(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.tile_at_pixel(x, y).is_covered(x & (TILE_WIDTH - 1), y & (TILE_HEIGHT - 1))
    }

    fn depth_at(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0.0;
        }
        self.tile_at_pixel(x, y).depth_at(x & (TILE_WIDTH - 1), y & (TILE_HEIGHT - 1))
    }
}

#[cfg(test)]
#[path = "tiled_coverage_buffer_tests.rs"]
mod tests;
