//! Coarse depth grid of the flat coverage buffer: one maximum depth per
//! 8x8 pixel block.

use super::DEPTH_BLOCK;

#[derive(Debug, Clone, Default)]
pub struct DepthGrid {
    stride: usize,
    rows: usize,
    depth: Vec<f32>,
}

impl DepthGrid {
    /// Grid covering `width` x `height` pixels (both rounded up to blocks).
    pub fn new(width: i32, height: i32) -> Self {
        let stride = (width.max(0) as usize).div_ceil(DEPTH_BLOCK as usize);
        let rows = (height.max(0) as usize).div_ceil(DEPTH_BLOCK as usize);
        Self {
            stride,
            rows,
            depth: vec![0.0; stride * rows],
        }
    }

    pub fn clear(&mut self) {
        self.depth.fill(0.0);
    }

    /// Blocks per row
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of block rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, block_x: usize, block_y: usize) -> usize {
        debug_assert!(block_x < self.stride && block_y < self.rows);
        block_y * self.stride + block_x
    }

    /// Depth of the block at block coordinates
    #[inline]
    pub fn get(&self, block_x: usize, block_y: usize) -> f32 {
        self.depth[self.index(block_x, block_y)]
    }

    /// Depth of the block holding pixel `(x, y)`
    #[inline]
    pub fn at_pixel(&self, x: i32, y: i32) -> f32 {
        self.get((x / DEPTH_BLOCK) as usize, (y / DEPTH_BLOCK) as usize)
    }

    /// Keep the larger of the stored depth and `depth`.
    #[inline]
    pub fn raise(&mut self, block_x: usize, block_y: usize, depth: f32) {
        let i = self.index(block_x, block_y);
        if depth > self.depth[i] {
            self.depth[i] = depth;
        }
    }
}
