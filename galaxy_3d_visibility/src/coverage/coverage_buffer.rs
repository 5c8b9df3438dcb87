//! Flat coverage buffer.
//!
//! The screen is split in horizontal bands of 32 rows. Each band stores one
//! `Bits32` word per pixel column (bit `k` is row `band * 32 + k`). Bands
//! are `width_po2` words apart so a word index is `(band << w_shift) + col`.
//!
//! Polygons are first drawn as XOR edge toggles into a scratch buffer. The
//! running XOR sweep over a band is then done on the fly while merging into
//! the screen words, and the scratch words are cleared again.
//!
//! The depth grid has one 8x8 block per `width_po2 / 8` columns and 4 block
//! rows per band. Blocks right of the screen are never written.

use glam::{Vec2, Vec3};
use crate::camera::Projection;
use crate::error::Result;
use crate::geometry::{round_to_pixel, ScreenBox, ScreenRect};
use super::{
    check_dimensions, project_outline, rasterize_outline, rasterize_polygon,
    Bits32, DepthGrid, EdgeWalk, OcclusionBuffer, TileBits, KEEP_MASKS,
};

const BAND_HEIGHT: i32 = 32;
const BAND_SHIFT: i32 = 5;

/// Full-screen coverage bitmap plus a coarse 8x8 block depth grid
#[derive(Debug, Clone, Default)]
pub struct CoverageBuffer {
    width: i32,
    height: i32,
    width_po2: i32,
    w_shift: u32,
    num_bands: i32,
    /// Edge toggles of the polygon being processed. Zero between calls.
    scratch: Vec<Bits32>,
    /// Accumulated coverage
    screen: Vec<Bits32>,
    /// Per band: number of columns not yet fully covered
    part_cols: Vec<i32>,
    depth: DepthGrid,
}

/// Column and band range touched by a rasterized polygon
#[derive(Debug, Clone, Copy)]
struct SweepRange {
    first_band: i32,
    last_band: i32,
    first_col: i32,
    last_col: i32,
}

impl CoverageBuffer {
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

    /// Power-of-two row pitch of the word arrays
    pub fn width_po2(&self) -> i32 {
        self.width_po2
    }

    /// Number of 32-row bands
    pub fn num_bands(&self) -> i32 {
        self.num_bands
    }

    /// Columns of `band` that still have an uncovered pixel
    pub fn partial_columns(&self, band: i32) -> i32 {
        self.part_cols[band as usize]
    }

    #[inline]
    fn word_index(&self, band: i32, col: i32) -> usize {
        ((band << self.w_shift) + col) as usize
    }

    /// Bits of the last band that lie below the screen
    fn off_screen_mask(&self) -> Bits32 {
        let rows_in_last = self.height - (self.num_bands - 1) * BAND_HEIGHT;
        Bits32(KEEP_MASKS[rows_in_last as usize])
    }

    /// Toggle the pixels of every edge walk in the scratch buffer.
    fn draw_edges(&mut self, edges: &[EdgeWalk]) {
        let width = self.width;
        let w_shift = self.w_shift;
        let scratch = &mut self.scratch;
        for edge in edges {
            edge.for_each_row(width, |y, column| {
                let index = (((y >> BAND_SHIFT) << w_shift) + column.column()) as usize;
                scratch[index].xor_bit((y & (BAND_HEIGHT - 1)) as u32);
            });
        }
    }

    fn draw_polygon(&mut self, vertices: &[Vec2]) -> Option<ScreenRect> {
        let mut edges: Vec<EdgeWalk> = Vec::with_capacity(vertices.len());
        let bbox = rasterize_polygon(vertices, self.width, self.height, |e| edges.push(e))?;
        self.draw_edges(&edges);
        Some(bbox)
    }

    fn sweep_range(&self, bbox: &ScreenRect) -> SweepRange {
        SweepRange {
            first_band: (bbox.min_y >> BAND_SHIFT).max(0),
            last_band: (bbox.max_y >> BAND_SHIFT).min(self.num_bands - 1),
            first_col: (bbox.min_x - 1).max(0),
            last_col: bbox.max_x.min(self.width - 1),
        }
    }

    fn clear_scratch(&mut self, range: &SweepRange) {
        for band in range.first_band..=range.last_band {
            let start = self.word_index(band, range.first_col);
            let end = self.word_index(band, range.last_col);
            self.scratch[start..=end].fill(Bits32::empty());
        }
    }

    /// True if any byte group of `rows` in column `col` of `band` has a
    /// stored depth of at least `min_depth`.
    #[inline]
    fn depth_visible(&self, band: i32, col: i32, rows: Bits32, min_depth: f32) -> bool {
        let block_x = (col >> 3) as usize;
        (0..4).any(|g| {
            rows.check_byte(g) && min_depth <= self.depth.get(block_x, (band * 4) as usize + g as usize)
        })
    }

    fn merge(&mut self, range: &SweepRange, max_depth: f32, negative: bool) -> bool {
        let init = if negative { Bits32::full() } else { Bits32::empty() };
        let (first_band, last_band, first_col, last_col) = if negative {
            (0, self.num_bands - 1, 0, self.width - 1)
        } else {
            (range.first_band, range.last_band, range.first_col, range.last_col)
        };

        let mut modified = false;
        for band in first_band..=last_band {
            let mut part_cols = self.part_cols[band as usize];
            if part_cols == 0 {
                continue;
            }
            let mut run = init;
            for col in first_col..=last_col {
                let index = self.word_index(band, col);
                run ^= self.scratch[index];
                let mut covered = self.screen[index];
                let mut new_bits = run;
                new_bits.and_inverted(covered);
                if new_bits.is_empty() {
                    continue;
                }
                modified = true;
                covered |= run;
                self.screen[index] = covered;
                if covered.is_full() {
                    part_cols -= 1;
                }
                let block_x = (col >> 3) as usize;
                for g in 0..4 {
                    if new_bits.check_byte(g) {
                        self.depth.raise(block_x, (band * 4 + g as i32) as usize, max_depth);
                    }
                }
            }
            self.part_cols[band as usize] = part_cols;
        }
        modified
    }

    fn sweep_test(&self, range: &SweepRange, min_depth: f32) -> bool {
        for band in range.first_band..=range.last_band {
            let band_full = self.part_cols[band as usize] == 0;
            let mut run = Bits32::empty();
            for col in range.first_col..=range.last_col {
                let index = self.word_index(band, col);
                run ^= self.scratch[index];
                if !band_full {
                    let mut uncovered = run;
                    uncovered.and_inverted(self.screen[index]);
                    if !uncovered.is_empty() {
                        return true;
                    }
                }
                if self.depth_visible(band, col, run, min_depth) {
                    return true;
                }
            }
        }
        false
    }
}

impl OcclusionBuffer for CoverageBuffer {
    fn setup(&mut self, width: i32, height: i32) -> Result<()> {
        check_dimensions("galaxy3d::CoverageBuffer", width, height)?;

        self.width = width;
        self.height = height;
        self.num_bands = (height + BAND_HEIGHT - 1) / BAND_HEIGHT;
        self.width_po2 = (width as u32).next_power_of_two() as i32;
        self.w_shift = self.width_po2.trailing_zeros();

        let words = (self.width_po2 * self.num_bands) as usize;
        self.scratch = vec![Bits32::empty(); words];
        self.screen = vec![Bits32::empty(); words];
        self.part_cols = vec![width; self.num_bands as usize];
        self.depth = DepthGrid::new(self.width_po2, self.num_bands * BAND_HEIGHT);

        crate::engine_debug!(
            "galaxy3d::CoverageBuffer",
            "Setup {}x{} ({} bands, pitch {})",
            width, height, self.num_bands, self.width_po2
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
        self.screen.fill(Bits32::empty());
        if self.num_bands > 0 {
            let last = self.num_bands - 1;
            let below = self.off_screen_mask();
            for col in 0..self.width {
                let index = self.word_index(last, col);
                self.screen[index] = below;
            }
        }
        self.part_cols.fill(self.width);
        self.depth.clear();
    }

    fn insert_polygon(&mut self, vertices: &[Vec2], max_depth: f32, negative: bool) -> bool {
        let Some(bbox) = self.draw_polygon(vertices) else {
            return false;
        };
        let range = self.sweep_range(&bbox);
        let modified = self.merge(&range, max_depth, negative);
        self.clear_scratch(&range);
        modified
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
        let mut walks = Vec::with_capacity(edges.len());
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
        self.draw_edges(&walks);
        let range = self.sweep_range(&bbox);
        let modified = self.merge(&range, outline.max_depth, false);
        self.clear_scratch(&range);
        modified
    }

    fn test_polygon(&mut self, vertices: &[Vec2], min_depth: f32) -> bool {
        let Some(bbox) = self.draw_polygon(vertices) else {
            return false;
        };
        let range = self.sweep_range(&bbox);
        let visible = self.sweep_test(&range, min_depth);
        self.clear_scratch(&range);
        visible
    }

    fn test_rectangle(&self, rect: &ScreenBox, min_depth: f32) -> bool {
        let bbox = rect.to_rect();
        let Some(bbox) = bbox.clamped(self.width, self.height) else {
            return false;
        };
        let first_band = bbox.min_y >> BAND_SHIFT;
        let last_band = bbox.max_y >> BAND_SHIFT;

        for band in first_band..=last_band {
            let mut rows = Bits32::full();
            if band == first_band {
                rows &= Bits32(KEEP_MASKS[(bbox.min_y & 31) as usize]);
            }
            if band == last_band {
                rows.and_inverted(Bits32(KEEP_MASKS[((bbox.max_y & 31) + 1) as usize]));
            }
            let band_full = self.part_cols[band as usize] == 0;
            for col in bbox.min_x..=bbox.max_x {
                if !band_full {
                    let mut uncovered = rows;
                    uncovered.and_inverted(self.screen[self.word_index(band, col)]);
                    if !uncovered.is_empty() {
                        return true;
                    }
                }
                if self.depth_visible(band, col, rows, min_depth) {
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
        let band = y >> BAND_SHIFT;
        let mut row = Bits32::empty();
        row.xor_bit((y & 31) as u32);
        if self.part_cols[band as usize] != 0 && !self.is_covered(x, y) {
            return true;
        }
        self.depth_visible(band, x, row, min_depth)
    }

    fn is_full(&self) -> bool {
        self.part_cols.iter().all(|&c| c == 0)
    }

    fn is_covered(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.screen[self.word_index(y >> BAND_SHIFT, x)].test_bit((y & 31) as u32)
    }

    fn depth_at(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0.0;
        }
        self.depth.at_pixel(x, y)
    }
}

#[cfg(test)]
#[path = "coverage_buffer_tests.rs"]
mod tests;
