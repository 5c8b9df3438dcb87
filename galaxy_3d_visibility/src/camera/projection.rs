//! Perspective projection of points and boxes to screen space.
//!
//! Failing to project is never an error: callers treat `None` as
//! "potentially visible".

use glam::{Mat4, Vec2, Vec3};
use crate::geometry::{AABB, ScreenBox};

/// Camera-space depth below which a box is not projected.
pub const NEAR_Z: f32 = 0.1;

/// Screen rectangle and camera-space depth range of a projected box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedBox {
    /// Bounding rectangle of the 8 projected corners
    pub screen: ScreenBox,
    /// Nearest camera-space z of the corners
    pub min_depth: f32,
    /// Farthest camera-space z of the corners
    pub max_depth: f32,
}

/// Source space → camera space transform plus perspective scalars
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    transform: Mat4,
    fov: f32,
    shift: Vec2,
}

impl Projection {
    pub fn new(transform: Mat4, fov: f32, shift_x: f32, shift_y: f32) -> Self {
        Self { transform, fov, shift: Vec2::new(shift_x, shift_y) }
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn shift(&self) -> Vec2 {
        self.shift
    }

    #[inline]
    pub fn to_camera(&self, p: Vec3) -> Vec3 {
        self.transform.transform_point3(p)
    }

    /// Project a camera-space point. `v.z` must be positive.
    #[inline]
    pub fn perspective(&self, v: Vec3) -> Vec2 {
        let iz = self.fov / v.z;
        Vec2::new(v.x * iz + self.shift.x, v.y * iz + self.shift.y)
    }

    /// Project the 8 corners of `aabb` (in source space).
    ///
    /// Returns `None` when a corner is at or behind `NEAR_Z` or when the
    /// projected rectangle has zero width or height.
    pub fn project_box(&self, aabb: &AABB) -> Option<ProjectedBox> {
        if aabb.is_empty() {
            return None;
        }
        let mut camera_corners = [Vec3::ZERO; 8];
        let mut min_depth = f32::INFINITY;
        let mut max_depth = f32::NEG_INFINITY;
        for (i, corner) in camera_corners.iter_mut().enumerate() {
            *corner = self.to_camera(aabb.corner(i));
            min_depth = min_depth.min(corner.z);
            max_depth = max_depth.max(corner.z);
        }
        if min_depth <= NEAR_Z {
            return None;
        }

        let mut screen = ScreenBox::EMPTY;
        for corner in &camera_corners {
            screen.add_point(self.perspective(*corner));
        }
        if screen.is_degenerate() || !screen.min.is_finite() || !screen.max.is_finite() {
            return None;
        }
        Some(ProjectedBox { screen, min_depth, max_depth })
    }
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
