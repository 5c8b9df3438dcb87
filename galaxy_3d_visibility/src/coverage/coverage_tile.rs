//! One 32x64 tile of the tiled coverage buffer.
//!
//! A tile keeps one `Bits64` word per pixel column and one depth per 8x8
//! block (`depth[k * 4 + g]` is byte group `k` of column group `g`). Edge
//! toggles are queued as line operations and only rendered when the tile is
//! flushed with the carry coming from the tile on its left.

use super::{Bits64, TileBits, DEPTH_BLOCK, TILE_HEIGHT, TILE_WIDTH};

const COLS: usize = TILE_WIDTH as usize;
const BLOCKS: usize = (TILE_WIDTH / DEPTH_BLOCK * TILE_HEIGHT / DEPTH_BLOCK) as usize;
const COLUMN_GROUPS: u32 = (TILE_WIDTH / DEPTH_BLOCK) as u32;

/// Queued edge toggles, in tile-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// Toggle row `y` at column `x >> 16` for `y` in `y1..=y2`, stepping x
    /// by `dx` (16.16 fixed point) per row
    Line { x: i32, dx: i32, y1: u32, y2: u32 },
    /// Toggle rows `y1..=y2` of one column
    VLine { x: u32, y1: u32, y2: u32 },
    /// Toggle every row of one column
    FullVLine { x: u32 },
}

impl LineOp {
    /// Rows toggled by the operation
    fn rows(&self) -> Bits64 {
        match *self {
            LineOp::Line { y1, y2, .. } | LineOp::VLine { y1, y2, .. } => Bits64::range_mask(y1, y2),
            LineOp::FullVLine { .. } => Bits64::full(),
        }
    }
}

/// Coverage of a screen area, ignoring depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageStatus {
    /// No pixel covered
    Empty,
    /// Some pixels covered
    Partial,
    /// Every pixel covered
    Full,
}

impl CoverageStatus {
    /// Status of the union of two areas
    pub fn combine(self, other: CoverageStatus) -> CoverageStatus {
        if self == other {
            self
        } else {
            CoverageStatus::Partial
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoverageTile {
    coverage: [Bits64; COLS],
    depth: [f32; BLOCKS],
    /// Every pixel covered (on-screen or pre-marked)
    tile_full: bool,
    /// Cleared lazily: contents are stale until the next flush
    pending_clear: bool,
    depth_min: f32,
    depth_max: f32,
    /// Column words right after a clear (off-screen pixels set)
    blank: [Bits64; COLS],
    /// Bit `k * 4 + g` set when block `(g, k)` has an on-screen pixel
    on_screen_blocks: u32,
    operations: Vec<LineOp>,
}

impl Default for CoverageTile {
    fn default() -> Self {
        Self::new(TILE_WIDTH, TILE_HEIGHT)
    }
}

impl CoverageTile {
    /// Tile whose first `cols` columns and `rows` rows are on screen.
    pub fn new(cols: i32, rows: i32) -> Self {
        let cols = cols.clamp(1, TILE_WIDTH) as usize;
        let rows = rows.clamp(1, TILE_HEIGHT) as u32;

        let below = Bits64::end_mask(rows);
        let mut blank = [Bits64::full(); COLS];
        for word in blank.iter_mut().take(cols) {
            *word = below;
        }

        let mut on_screen_blocks = 0;
        for k in 0..(TILE_HEIGHT / DEPTH_BLOCK) as u32 {
            for g in 0..COLUMN_GROUPS {
                if k * 8 < rows && (g * 8) < cols as u32 {
                    on_screen_blocks |= 1 << (k * 4 + g);
                }
            }
        }

        let mut tile = Self {
            coverage: blank,
            depth: [0.0; BLOCKS],
            tile_full: false,
            pending_clear: false,
            depth_min: 0.0,
            depth_max: 0.0,
            blank,
            on_screen_blocks,
            operations: Vec::new(),
        };
        tile.make_empty();
        tile
    }

    fn make_empty(&mut self) {
        self.coverage = self.blank;
        self.depth = [0.0; BLOCKS];
        self.tile_full = self.blank.iter().all(|w| w.is_full());
        self.pending_clear = false;
        self.depth_min = 0.0;
        self.depth_max = 0.0;
    }

    /// Forget the contents; the actual clear happens on the next flush.
    pub fn mark_pending_clear(&mut self) {
        self.pending_clear = true;
    }

    pub fn is_pending_clear(&self) -> bool {
        self.pending_clear
    }

    /// True if every pixel of the tile is covered.
    pub fn is_full(&self) -> bool {
        !self.pending_clear && self.tile_full
    }

    pub fn operations(&self) -> &[LineOp] {
        &self.operations
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    pub fn push_line(&mut self, x: i32, dx: i32, y1: u32, y2: u32) {
        debug_assert!(y1 <= y2 && y2 < TILE_HEIGHT as u32);
        debug_assert!(x >= 0 && (x >> 16) < TILE_WIDTH);
        debug_assert!(((x as i64 + dx as i64 * (y2 - y1) as i64) >> 16) < TILE_WIDTH as i64);
        self.operations.push(LineOp::Line { x, dx, y1, y2 });
    }

    pub fn push_vline(&mut self, x: u32, y1: u32, y2: u32) {
        debug_assert!(x < TILE_WIDTH as u32 && y1 <= y2 && y2 < TILE_HEIGHT as u32);
        self.operations.push(LineOp::VLine { x, y1, y2 });
    }

    pub fn push_full_vline(&mut self, x: u32) {
        debug_assert!(x < TILE_WIDTH as u32);
        self.operations.push(LineOp::FullVLine { x });
    }

    /// Smallest block depth over the on-screen blocks
    pub fn min_depth(&self) -> f32 {
        self.depth_min
    }

    /// Largest block depth over the on-screen blocks
    pub fn max_depth(&self) -> f32 {
        self.depth_max
    }

    /// Coverage word of a local column
    pub fn coverage(&self, col: i32) -> Bits64 {
        if self.pending_clear {
            self.blank[col as usize]
        } else {
            self.coverage[col as usize]
        }
    }

    #[inline]
    fn block_depth(&self, index: usize) -> f32 {
        if self.pending_clear {
            0.0
        } else {
            self.depth[index]
        }
    }

    /// Render the queued operations as per-column toggles.
    fn render_operations(&self) -> [Bits64; COLS] {
        let mut cache = [Bits64::empty(); COLS];
        for op in &self.operations {
            match *op {
                LineOp::FullVLine { x } => cache[x as usize].invert(),
                LineOp::VLine { x, y1, y2 } => cache[x as usize] ^= Bits64::range_mask(y1, y2),
                LineOp::Line { x, dx, y1, y2 } => {
                    let mut x = x;
                    for y in y1..=y2 {
                        cache[(x >> 16) as usize].xor_bit(y);
                        x += dx;
                    }
                }
            }
        }
        cache
    }

    /// Apply the queued operations to the carry without touching pixels.
    fn fold_operations(&self, carry: &mut Bits64) {
        for op in &self.operations {
            *carry ^= op.rows();
        }
    }

    fn refresh_depth_range(&mut self) {
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        for (i, d) in self.depth.iter().enumerate() {
            if self.on_screen_blocks & (1 << i) != 0 {
                min = min.min(*d);
                max = max.max(*d);
            }
        }
        self.depth_min = if min.is_finite() { min } else { 0.0 };
        self.depth_max = max;
    }

    /// Render the queued operations, run the carry across the tile and merge
    /// the result into the coverage.
    ///
    /// On return `carry` is the value for the next tile on the right and the
    /// operation queue is empty. Returns true if a pixel became covered.
    pub fn flush(&mut self, carry: &mut Bits64, max_depth: f32) -> bool {
        if self.pending_clear {
            self.make_empty();
        }

        if self.tile_full {
            return self.flush_for_full(carry, max_depth);
        }

        let mut modified = self.render_operations();
        self.operations.clear();

        let mut full = true;
        let mut any = false;
        for (cov, m) in self.coverage.iter_mut().zip(modified.iter_mut()) {
            *carry ^= *m;
            *m = *carry;
            m.and_inverted(*cov);
            *cov |= *carry;
            full &= cov.is_full();
            any |= !m.is_empty();
        }
        self.tile_full = full;
        if !any {
            return false;
        }

        for g in 0..COLUMN_GROUPS as usize {
            let mut mods = Bits64::empty();
            for m in &modified[g * 8..g * 8 + 8] {
                mods |= *m;
            }
            for k in 0..Bits64::byte_groups() {
                if mods.check_byte(k) {
                    let d = &mut self.depth[k as usize * 4 + g];
                    if max_depth > *d {
                        *d = max_depth;
                    }
                }
            }
        }
        self.refresh_depth_range();
        true
    }

    /// Flush into a full tile. Coverage cannot grow, but a nearer occluder
    /// lowers the depth of every 8x8 block it covers completely.
    fn flush_for_full(&mut self, carry: &mut Bits64, max_depth: f32) -> bool {
        if max_depth >= self.depth_max {
            self.fold_operations(carry);
            self.operations.clear();
            return false;
        }

        let toggles = self.render_operations();
        self.operations.clear();

        let mut modified = false;
        for g in 0..COLUMN_GROUPS as usize {
            let mut full_cover = Bits64::full();
            for col in g * 8..g * 8 + 8 {
                *carry ^= toggles[col];
                // Off-screen rows never receive coverage
                full_cover &= *carry | self.blank[col];
            }
            let missing = !full_cover;
            for k in 0..Bits64::byte_groups() {
                let index = k as usize * 4 + g;
                if self.on_screen_blocks & (1 << index) == 0 || missing.check_byte(k) {
                    continue;
                }
                if max_depth < self.depth[index] {
                    self.depth[index] = max_depth;
                    modified = true;
                }
            }
        }
        if modified {
            self.refresh_depth_range();
        }
        modified
    }

    /// Same traversal as `flush` without modifying the tile.
    ///
    /// Returns true as soon as a pixel inside the polygon is uncovered or
    /// covered by a block at least `min_depth` deep. The carry is only
    /// complete for the next tile when false is returned.
    pub fn test_flush(&self, carry: &mut Bits64, min_depth: f32) -> bool {
        let full = self.is_full();
        if full && min_depth > self.depth_max {
            self.fold_operations(carry);
            return false;
        }

        let cache = self.render_operations();
        for (col, toggles) in cache.iter().enumerate() {
            *carry ^= *toggles;
            if carry.is_empty() {
                continue;
            }
            if !full {
                let mut uncovered = *carry;
                uncovered.and_inverted(self.coverage(col as i32));
                if !uncovered.is_empty() {
                    return true;
                }
            }
            let g = col / 8;
            for k in 0..Bits64::byte_groups() {
                if carry.check_byte(k) && min_depth <= self.block_depth(k as usize * 4 + g) {
                    return true;
                }
            }
        }
        false
    }

    /// Depth-only test of a full tile against the whole tile.
    pub fn test_full_rect(&self, min_depth: f32) -> bool {
        if !self.is_full() {
            return true;
        }
        if min_depth > self.depth_max {
            return false;
        }
        if min_depth <= self.depth_min {
            return true;
        }
        (0..BLOCKS).any(|i| self.on_screen_blocks & (1 << i) != 0 && min_depth <= self.depth[i])
    }

    /// Visibility of the local rectangle `[x1, x2] x [y1, y2]`.
    pub fn test_rect(&self, x1: i32, y1: i32, x2: i32, y2: i32, min_depth: f32) -> bool {
        if self.pending_clear {
            return true;
        }
        if self.tile_full {
            if min_depth > self.depth_max {
                return false;
            }
            if min_depth <= self.depth_min {
                return true;
            }
        } else {
            let rows = Bits64::range_mask(y1 as u32, y2 as u32);
            for col in x1..=x2 {
                let mut uncovered = rows;
                uncovered.and_inverted(self.coverage[col as usize]);
                if !uncovered.is_empty() {
                    return true;
                }
            }
        }
        for k in (y1 / DEPTH_BLOCK)..=(y2 / DEPTH_BLOCK) {
            for g in (x1 / DEPTH_BLOCK)..=(x2 / DEPTH_BLOCK) {
                if min_depth <= self.depth[(k * 4 + g) as usize] {
                    return true;
                }
            }
        }
        false
    }

    /// Visibility of one local pixel. Depth is checked first.
    pub fn test_point(&self, x: i32, y: i32, min_depth: f32) -> bool {
        if self.pending_clear {
            return true;
        }
        let d = self.depth[((y / DEPTH_BLOCK) * 4 + x / DEPTH_BLOCK) as usize];
        if min_depth <= d {
            return true;
        }
        if self.tile_full {
            return false;
        }
        !self.coverage[x as usize].test_bit(y as u32)
    }

    pub fn is_covered(&self, x: i32, y: i32) -> bool {
        self.coverage(x).test_bit(y as u32)
    }

    pub fn depth_at(&self, x: i32, y: i32) -> f32 {
        self.block_depth(((y / DEPTH_BLOCK) * 4 + x / DEPTH_BLOCK) as usize)
    }

    /// Coverage of the local rectangle `[x1, x2] x [y1, y2]`, ignoring depth.
    pub fn status_no_depth(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> CoverageStatus {
        if self.is_full() {
            return CoverageStatus::Full;
        }
        let rows = Bits64::range_mask(y1 as u32, y2 as u32);
        let mut any_full = false;
        let mut any_empty = false;
        for col in x1..=x2 {
            let covered = self.coverage(col) & rows;
            if covered == rows {
                any_full = true;
            } else if covered.is_empty() {
                any_empty = true;
            } else {
                return CoverageStatus::Partial;
            }
        }
        match (any_full, any_empty) {
            (true, false) => CoverageStatus::Full,
            (false, _) => CoverageStatus::Empty,
            (true, true) => CoverageStatus::Partial,
        }
    }
}

#[cfg(test)]
#[path = "coverage_tile_tests.rs"]
mod tests;
