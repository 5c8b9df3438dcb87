//! Scanline polygon rasterizer shared by both coverage buffers.
//!
//! A polygon is turned into boundary lines. Every boundary line toggles one
//! pixel per scanline, and a left-to-right running XOR over a row then
//! yields the filled span `[left, right)` of that row. Both buffers consume
//! the same `EdgeWalk` values, so they rasterize identically.
//!
//! Rows covered by an edge from `y1` to `y2` are `y1..y2`, extended to
//! `y1..=y2` for the edges that end on the bottom-most row of the polygon.
//! Columns left of the screen clamp to column 0. Columns right of the
//! screen are dropped: their toggles would only pair up beyond the last
//! column, where nothing is ever read.

use glam::Vec2;
use smallvec::SmallVec;
use crate::geometry::{round_to_pixel, ScreenRect};

/// One boundary line, clipped to the screen rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWalk {
    /// 16.16 fixed-point x on row `y_first`
    pub x: i64,
    /// 16.16 fixed-point x step per row
    pub dx: i64,
    /// First row (>= 0)
    pub y_first: i32,
    /// Last row, inclusive (< height)
    pub y_last: i32,
}

/// Column toggled by an edge on one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeColumn {
    /// Edge is left of the screen; toggles column 0
    ClampedLeft,
    /// Edge toggles this on-screen column
    Column(i32),
}

impl EdgeColumn {
    #[inline]
    pub fn column(self) -> i32 {
        match self {
            EdgeColumn::ClampedLeft => 0,
            EdgeColumn::Column(c) => c,
        }
    }
}

impl EdgeWalk {
    /// Edge from `(x1, y1)` to `(x2, y2)` with `y1 < y2`.
    ///
    /// `include_last` adds row `y2`. `half_step` offsets x by half a step,
    /// which the right-hand chain of a polygon uses. Returns `None` when no
    /// row of the edge is on screen.
    pub fn new(
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        include_last: bool,
        half_step: bool,
        height: i32,
    ) -> Option<EdgeWalk> {
        debug_assert!(y1 < y2);
        let last = if include_last { y2 } else { y2 - 1 };
        if last < 0 || y1 >= height {
            return None;
        }

        let dx = ((x2 as i64 - x1 as i64) << 16) / (y2 as i64 - y1 as i64 + 1);
        let mut x = (x1 as i64) << 16;
        if half_step {
            x += dx >> 1;
        }
        let first = y1.max(0);
        x += dx * (first - y1) as i64;

        Some(EdgeWalk {
            x,
            dx,
            y_first: first,
            y_last: last.min(height - 1),
        })
    }

    /// True when the edge does not move horizontally
    pub fn is_vertical(&self) -> bool {
        self.dx == 0
    }

    /// Fixed-point x on row `y`
    #[inline]
    pub fn x_at(&self, y: i32) -> i64 {
        self.x + self.dx * (y - self.y_first) as i64
    }

    /// Call `toggle(y, column)` for every row that toggles an on-screen
    /// column, top to bottom.
    pub fn for_each_row(&self, width: i32, mut toggle: impl FnMut(i32, EdgeColumn)) {
        let mut x = self.x;
        for y in self.y_first..=self.y_last {
            if x < 0 {
                toggle(y, EdgeColumn::ClampedLeft);
            } else {
                let column = (x >> 16) as i32;
                if column < width {
                    toggle(y, EdgeColumn::Column(column));
                } else if self.dx >= 0 {
                    break;
                }
            }
            x += self.dx;
        }
    }
}

/// Integer vertex list with its bounding box
struct IntPolygon {
    xs: SmallVec<[i32; 32]>,
    ys: SmallVec<[i32; 32]>,
    top: usize,
    bottom: usize,
    bbox: ScreenRect,
}

impl IntPolygon {
    fn from_vertices(vertices: &[Vec2]) -> IntPolygon {
        let mut xs = SmallVec::with_capacity(vertices.len());
        let mut ys = SmallVec::with_capacity(vertices.len());
        let mut top = 0;
        let mut bottom = 0;
        let mut bbox = ScreenRect::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for (i, v) in vertices.iter().enumerate() {
            let x = round_to_pixel(v.x);
            let y = round_to_pixel(v.y);
            bbox.min_x = bbox.min_x.min(x);
            bbox.max_x = bbox.max_x.max(x);
            if y < bbox.min_y {
                bbox.min_y = y;
                top = i;
            }
            if y > bbox.max_y {
                bbox.max_y = y;
                bottom = i;
            }
            xs.push(x);
            ys.push(y);
        }
        IntPolygon { xs, ys, top, bottom, bbox }
    }
}

/// True if a polygon with this bounding box cannot touch the screen.
///
/// A polygon whose right-most vertex is at x <= 0 fills nothing: both of
/// its boundaries toggle column 0.
pub fn is_off_screen(bbox: &ScreenRect, width: i32, height: i32) -> bool {
    bbox.max_x <= 0 || bbox.max_y < 0 || bbox.min_x >= width || bbox.min_y >= height
}

/// Rasterize a convex polygon into edge walks.
///
/// The vertex order may be clockwise or counter-clockwise. Returns the
/// unclamped integer bounding box, or `None` (and emits nothing) when the
/// polygon has fewer than 3 vertices or is off screen.
pub fn rasterize_polygon(
    vertices: &[Vec2],
    width: i32,
    height: i32,
    mut emit: impl FnMut(EdgeWalk),
) -> Option<ScreenRect> {
    if vertices.len() < 3 {
        return None;
    }
    let poly = IntPolygon::from_vertices(vertices);
    if is_off_screen(&poly.bbox, width, height) {
        return None;
    }

    let n = poly.xs.len();
    let (xs, ys) = (&poly.xs, &poly.ys);
    let top = poly.top;

    // The chain whose first edge has the larger slope is the right chain.
    let next = (top + 1) % n;
    let prev = (top + n - 1) % n;
    let slope = |j: usize| ((xs[j] as i64 - xs[top] as i64) << 16) / (ys[j] as i64 - ys[top] as i64 + 1);
    let right_forward = slope(next) > slope(prev);

    for (forward, half_step) in [(right_forward, true), (!right_forward, false)] {
        let mut i = top;
        while i != poly.bottom {
            let j = if forward { (i + 1) % n } else { (i + n - 1) % n };
            if ys[i] < ys[j] {
                let include_last = ys[j] == poly.bbox.max_y;
                if let Some(edge) = EdgeWalk::new(xs[i], ys[i], xs[j], ys[j], include_last, half_step, height) {
                    emit(edge);
                }
            }
            i = j;
        }
    }

    Some(poly.bbox)
}

/// Rasterize a closed outline (a set of edges between used vertices).
///
/// `used` marks the vertices taking part in the outline; the bounding box is
/// computed over them only. Edges with an out-of-range vertex are ignored.
pub fn rasterize_outline(
    points: &[Vec2],
    used: &[bool],
    edges: &[[u32; 2]],
    width: i32,
    height: i32,
    mut emit: impl FnMut(EdgeWalk),
) -> Option<ScreenRect> {
    let mut xs: SmallVec<[i32; 64]> = SmallVec::with_capacity(points.len());
    let mut ys: SmallVec<[i32; 64]> = SmallVec::with_capacity(points.len());
    let mut bbox = ScreenRect::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    let mut any = false;
    for (i, p) in points.iter().enumerate() {
        let x = round_to_pixel(p.x);
        let y = round_to_pixel(p.y);
        if used.get(i).copied().unwrap_or(false) {
            any = true;
            bbox.min_x = bbox.min_x.min(x);
            bbox.max_x = bbox.max_x.max(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_y = bbox.max_y.max(y);
        }
        xs.push(x);
        ys.push(y);
    }
    if !any || is_off_screen(&bbox, width, height) {
        return None;
    }

    for &[a, b] in edges {
        let (a, b) = (a as usize, b as usize);
        if a >= points.len() || b >= points.len() || ys[a] == ys[b] {
            continue;
        }
        let (top, bot) = if ys[a] < ys[b] { (a, b) } else { (b, a) };
        let include_last = ys[bot] == bbox.max_y;
        if let Some(edge) = EdgeWalk::new(xs[top], ys[top], xs[bot], ys[bot], include_last, false, height) {
            emit(edge);
        }
    }

    Some(bbox)
}

#[cfg(test)]
#[path = "rasterizer_tests.rs"]
mod tests;
