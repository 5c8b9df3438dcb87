/// Camera — low-level passive data container.
///
/// Camera space has +Z forward. A camera-space point projects to
/// `screen = xy / z * fov + shift`, and screen y is the buffer row. The caller
/// computes the view matrix (e.g. with `Mat4::look_at_lh`) and the
/// projection scalars.

use glam::{Mat4, Vec2, Vec3};
use super::projection::Projection;

/// Low-level camera. Stores, computes nothing beyond derived getters.
#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    fov: f32,
    shift_x: f32,
    shift_y: f32,
    clip_polygon: Option<Vec<Vec2>>,
}

impl Camera {
    /// Create a camera from a world → camera matrix and projection scalars.
    pub fn new(view: Mat4, fov: f32, shift_x: f32, shift_y: f32) -> Self {
        Self {
            view_matrix: view,
            fov,
            shift_x,
            shift_y,
            clip_polygon: None,
        }
    }

    /// Camera centered on a `width x height` screen with a vertical field of
    /// view of `fov_y` radians.
    pub fn for_screen(view: Mat4, width: u32, height: u32, fov_y: f32) -> Self {
        let fov = (height as f32 * 0.5) / (fov_y * 0.5).tan();
        Self::new(view, fov, width as f32 * 0.5, height as f32 * 0.5)
    }

    // ===== GETTERS =====

    /// World → camera matrix.
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection scale (pixels per unit at z = 1).
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn shift_x(&self) -> f32 {
        self.shift_x
    }

    pub fn shift_y(&self) -> f32 {
        self.shift_y
    }

    /// Screen-space clip polygon (portal outline), if any.
    pub fn clip_polygon(&self) -> Option<&[Vec2]> {
        self.clip_polygon.as_deref()
    }

    /// World-space camera position.
    pub fn position(&self) -> Vec3 {
        self.view_matrix.inverse().w_axis.truncate()
    }

    /// Projection for world-space geometry.
    pub fn projection(&self) -> Projection {
        Projection::new(self.view_matrix, self.fov, self.shift_x, self.shift_y)
    }

    /// Projection for geometry expressed in an object's local space.
    pub fn object_projection(&self, world_transform: &Mat4) -> Projection {
        Projection::new(self.view_matrix * *world_transform, self.fov, self.shift_x, self.shift_y)
    }

    // ===== SETTERS — store, compute nothing =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    pub fn set_shift(&mut self, shift_x: f32, shift_y: f32) {
        self.shift_x = shift_x;
        self.shift_y = shift_y;
    }

    /// Set the screen-space clip polygon. `None` means the whole screen.
    pub fn set_clip_polygon(&mut self, polygon: Option<Vec<Vec2>>) {
        self.clip_polygon = polygon;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
