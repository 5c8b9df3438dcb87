//! Integration tests for the coverage buffers
//!
//! Every scenario runs against both buffer layouts through the
//! `OcclusionBuffer` trait.
//!
//! Run with: cargo test --test coverage_integration_tests

use galaxy_3d_visibility::galaxy3d::camera::Projection;
use galaxy_3d_visibility::galaxy3d::coverage::{CoverageBuffer, OcclusionBuffer, TiledCoverageBuffer};
use galaxy_3d_visibility::galaxy3d::geometry::{AABB, ScreenBox};
use galaxy_3d_visibility::glam::{Mat4, Vec2, Vec3};

// ============================================================================
// HELPERS
// ============================================================================

fn quad(x: f32, y: f32, w: f32, h: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(x, y),
        Vec2::new(x + w, y),
        Vec2::new(x + w, y + h),
        Vec2::new(x, y + h),
    ]
}

fn both(width: i32, height: i32) -> (CoverageBuffer, TiledCoverageBuffer) {
    (
        CoverageBuffer::with_size(width, height).unwrap(),
        TiledCoverageBuffer::with_size(width, height).unwrap(),
    )
}

// ============================================================================
// SCENARIOS
// ============================================================================

fn frame_reuse<B: OcclusionBuffer>(buffer: &mut B) {
    assert!(buffer.insert_polygon(&quad(0.0, 0.0, 320.0, 240.0), 5.0, false));
    assert!(!buffer.test_point(Vec2::new(100.0, 100.0), 10.0));

    buffer.initialize();
    assert!(buffer.test_point(Vec2::new(100.0, 100.0), 10.0));
    assert!(!buffer.is_covered(100, 100));
    assert_eq!(buffer.depth_at(100, 100), 0.0);
}

fn projected_box_behind_box<B: OcclusionBuffer>(buffer: &mut B) {
    let projection = Projection::new(Mat4::IDENTITY, 240.0, 320.0, 240.0);

    let near = AABB::new(Vec3::new(-2.0, -2.0, 5.0), Vec3::new(2.0, 2.0, 6.0));
    let far = AABB::new(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0));
    let aside = AABB::new(Vec3::new(8.0, -1.0, 20.0), Vec3::new(10.0, 1.0, 22.0));

    let occluder = projection.project_box(&near).unwrap();
    let (min, max) = (occluder.screen.min, occluder.screen.max);
    assert!(buffer.insert_polygon(&quad(min.x, min.y, max.x - min.x, max.y - min.y), occluder.max_depth, false));

    let hidden = projection.project_box(&far).unwrap();
    assert!(!buffer.test_rectangle(&hidden.screen, hidden.min_depth));
    let visible = projection.project_box(&aside).unwrap();
    assert!(buffer.test_rectangle(&visible.screen, visible.min_depth));
}

fn portal<B: OcclusionBuffer>(buffer: &mut B) {
    assert!(buffer.insert_polygon(&quad(200.0, 150.0, 240.0, 180.0), 0.01, true));
    assert!(buffer.is_covered(10, 10));
    assert!(!buffer.is_covered(320, 240));

    let outside = ScreenBox::new(Vec2::new(10.0, 10.0), Vec2::new(100.0, 100.0));
    let inside = ScreenBox::new(Vec2::new(250.0, 200.0), Vec2::new(300.0, 250.0));
    assert!(!buffer.test_rectangle(&outside, 1.0));
    assert!(buffer.test_rectangle(&inside, 1.0));
    assert!(!buffer.is_full());

    assert!(buffer.insert_polygon(&quad(0.0, 0.0, 640.0, 480.0), 3.0, false));
    assert!(buffer.is_full());
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_integration_frame_reuse() {
    let (mut flat, mut tiled) = both(640, 480);
    frame_reuse(&mut flat);
    frame_reuse(&mut tiled);
}

#[test]
fn test_integration_projected_occluder() {
    let (mut flat, mut tiled) = both(640, 480);
    projected_box_behind_box(&mut flat);
    projected_box_behind_box(&mut tiled);
}

#[test]
fn test_integration_portal() {
    let (mut flat, mut tiled) = both(640, 480);
    portal(&mut flat);
    portal(&mut tiled);
    assert_eq!(flat.debug_dump(), tiled.debug_dump());
}
