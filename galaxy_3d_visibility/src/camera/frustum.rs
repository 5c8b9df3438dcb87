/// Frustum — six clipping planes for visibility culling.
///
/// Each plane is a Vec4 (A, B, C, D):
/// - (A, B, C) is the inward-pointing normal
/// - A point P is inside if dot(plane, P_homogeneous) >= 0 for all planes
///
/// `from_camera()` builds the planes from the screen edges of a `Camera`,
/// `from_view_projection()` from a clip-space matrix.

use glam::{Mat4, Vec3, Vec4};
use crate::geometry::AABB;
use super::camera::Camera;

/// Result of a 3-way frustum/AABB classification.
///
/// - `Outside` → skip the entire subtree
/// - `Inside` → no further frustum tests needed below
/// - `Partial` → test children against the remaining planes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// AABB is entirely outside the frustum
    Outside,
    /// AABB is entirely inside the frustum
    Inside,
    /// AABB partially overlaps the frustum
    Partial,
}

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Plane mask with every plane still to be tested
pub const ALL_PLANES_MASK: u32 = 0b11_1111;

/// Six frustum planes for culling.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        let mut planes = [
            // Left:   row3 + row0
            Vec4::new(m[0][3] + m[0][0], m[1][3] + m[1][0], m[2][3] + m[2][0], m[3][3] + m[3][0]),
            // Right:  row3 - row0
            Vec4::new(m[0][3] - m[0][0], m[1][3] - m[1][0], m[2][3] - m[2][0], m[3][3] - m[3][0]),
            // Bottom: row3 + row1
            Vec4::new(m[0][3] + m[0][1], m[1][3] + m[1][1], m[2][3] + m[2][1], m[3][3] + m[3][1]),
            // Top:    row3 - row1
            Vec4::new(m[0][3] - m[0][1], m[1][3] - m[1][1], m[2][3] - m[2][1], m[3][3] - m[3][1]),
            // Near:   row3 + row2
            Vec4::new(m[0][3] + m[0][2], m[1][3] + m[1][2], m[2][3] + m[2][2], m[3][3] + m[3][2]),
            // Far:    row3 - row2
            Vec4::new(m[0][3] - m[0][2], m[1][3] - m[1][2], m[2][3] - m[2][2], m[3][3] - m[3][2]),
        ];
        normalize_planes(&mut planes);

        Self { planes }
    }

    /// World-space planes through the camera and the four screen edges.
    ///
    /// Screen x in `[0, width]`, screen y in `[0, height]` and z >= 0.
    /// There is no far limit: the far plane accepts everything.
    pub fn from_camera(camera: &Camera, width: u32, height: u32) -> Self {
        let fov = camera.fov();
        let sx = camera.shift_x();
        let sy = camera.shift_y();
        let w = width as f32;
        let h = height as f32;

        // Camera space: screen_x >= 0  <=>  fov*x + sx*z >= 0  (z > 0)
        let camera_planes = [
            Vec4::new(fov, 0.0, sx, 0.0),
            Vec4::new(-fov, 0.0, w - sx, 0.0),
            Vec4::new(0.0, fov, sy, 0.0),
            Vec4::new(0.0, -fov, h - sy, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        ];

        let to_world = camera.view_matrix().transpose();
        let mut planes = camera_planes.map(|p| to_world * p);
        normalize_planes(&mut planes);

        Self { planes }
    }

    /// Test if an AABB intersects this frustum.
    ///
    /// Uses the "positive vertex" test. May return false positives
    /// (conservative), never false negatives.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| plane_distance(plane, p_vertex(plane, aabb)) >= 0.0)
    }

    /// Classify an AABB against the frustum (3-way test).
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        self.classify_aabb_masked(aabb, ALL_PLANES_MASK).0
    }

    /// Classify an AABB against the planes selected by `mask`.
    ///
    /// Bit `i` of `mask` selects plane `i`. The returned mask drops every
    /// plane the box is completely inside of, so children of the box only
    /// need to test the remaining planes.
    pub fn classify_aabb_masked(&self, aabb: &AABB, mask: u32) -> (FrustumTest, u32) {
        let mut remaining = mask;

        for (i, plane) in self.planes.iter().enumerate() {
            let bit = 1u32 << i;
            if mask & bit == 0 {
                continue;
            }

            // If the p-vertex is outside → entire AABB is outside
            if plane_distance(plane, p_vertex(plane, aabb)) < 0.0 {
                return (FrustumTest::Outside, mask);
            }

            // n-vertex inside → whole box inside this plane
            if plane_distance(plane, n_vertex(plane, aabb)) >= 0.0 {
                remaining &= !bit;
            }
        }

        if remaining == 0 {
            (FrustumTest::Inside, 0)
        } else {
            (FrustumTest::Partial, remaining)
        }
    }

    /// True if the point is on the inner side of every plane.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|plane| plane_distance(plane, p) >= 0.0)
    }
}

// ===== PLANE HELPERS =====

fn normalize_planes(planes: &mut [Vec4; 6]) {
    for plane in planes.iter_mut() {
        let normal_len = plane.truncate().length();
        if normal_len > 0.0 {
            *plane /= normal_len;
        }
    }
}

#[inline]
fn plane_distance(plane: &Vec4, p: Vec3) -> f32 {
    plane.truncate().dot(p) + plane.w
}

/// Corner most in the direction of the plane normal
#[inline]
fn p_vertex(plane: &Vec4, aabb: &AABB) -> Vec3 {
    Vec3::new(
        if plane.x >= 0.0 { aabb.max.x } else { aabb.min.x },
        if plane.y >= 0.0 { aabb.max.y } else { aabb.min.y },
        if plane.z >= 0.0 { aabb.max.z } else { aabb.min.z },
    )
}

/// Corner least in the direction of the plane normal
#[inline]
fn n_vertex(plane: &Vec4, aabb: &AABB) -> Vec3 {
    Vec3::new(
        if plane.x >= 0.0 { aabb.min.x } else { aabb.max.x },
        if plane.y >= 0.0 { aabb.min.y } else { aabb.max.y },
        if plane.z >= 0.0 { aabb.min.z } else { aabb.max.z },
    )
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
