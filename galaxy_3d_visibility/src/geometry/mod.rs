//! Geometry module — bounding volumes shared by the spatial index,
//! the projection code and the coverage buffers.

mod aabb;
mod screen_box;

pub use aabb::{AABB, Axis};
pub use screen_box::{ScreenBox, ScreenRect, round_to_pixel};
