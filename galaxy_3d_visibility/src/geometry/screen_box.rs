//! Screen-space boxes.
//!
//! `ScreenBox` is the float bounding rectangle of projected geometry.
//! `ScreenRect` is its integer, inclusive pixel counterpart used by the
//! coverage buffers.

use glam::Vec2;

/// Round a screen coordinate to the nearest pixel.
#[inline]
pub fn round_to_pixel(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

/// Float screen-space bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for ScreenBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ScreenBox {
    pub const EMPTY: ScreenBox = ScreenBox {
        min: Vec2::splat(f32::INFINITY),
        max: Vec2::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Vec2]) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.add_point(*p);
        }
        b
    }

    pub fn add_point(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Zero width or zero height (or empty)
    pub fn is_degenerate(&self) -> bool {
        !(self.max.x > self.min.x && self.max.y > self.min.y)
    }

    pub fn intersects(&self, other: &ScreenBox) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Pixel rectangle with both corners rounded to the nearest pixel.
    pub fn to_rect(&self) -> ScreenRect {
        ScreenRect {
            min_x: round_to_pixel(self.min.x),
            min_y: round_to_pixel(self.min.y),
            max_x: round_to_pixel(self.max.x),
            max_y: round_to_pixel(self.max.y),
        }
    }
}

/// Inclusive integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ScreenRect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// True if the rectangle lies completely outside `[0,width) x [0,height)`
    pub fn is_off_screen(&self, width: i32, height: i32) -> bool {
        self.max_x < 0 || self.max_y < 0 || self.min_x >= width || self.min_y >= height
            || self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Clamp to the screen. `None` when nothing remains on screen.
    pub fn clamped(&self, width: i32, height: i32) -> Option<ScreenRect> {
        if self.is_off_screen(width, height) {
            return None;
        }
        Some(ScreenRect {
            min_x: self.min_x.max(0),
            min_y: self.min_y.max(0),
            max_x: self.max_x.min(width - 1),
            max_y: self.max_y.min(height - 1),
        })
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

#[cfg(test)]
#[path = "screen_box_tests.rs"]
mod tests;
