//! Camera module — view parameters, perspective projection and frustum.
//!
//! Passive data containers: the caller owns and drives the camera, the
//! culler only reads it once per frame.

mod camera;
mod frustum;
mod projection;

pub use camera::Camera;
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
    ALL_PLANES_MASK,
};
pub use projection::{Projection, ProjectedBox, NEAR_Z};
