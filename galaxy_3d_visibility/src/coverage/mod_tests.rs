use glam::{Mat4, Vec3};
use super::*;

// ============================================================================
// OUTLINE PROJECTION
// ============================================================================

#[test]
fn test_project_outline_depth_and_points() {
    let projection = Projection::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)), 100.0, 50.0, 50.0);
    let vertices = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 5.0), Vec3::new(0.0, -3.0, -10.0)];
    let outline = project_outline(&projection, &vertices, &[true, true, false]).unwrap();
    assert_eq!(outline.max_depth, 10.0);
    assert_eq!(outline.points[0], Vec2::new(50.0, 50.0));
    assert_eq!(outline.points[1], Vec2::new(60.0, 50.0));
    // Unused and behind the camera
    assert_eq!(outline.points[2], Vec2::ZERO);
}

#[test]
fn test_project_outline_rejects_near_used_vertex() {
    let projection = Projection::new(Mat4::IDENTITY, 100.0, 0.0, 0.0);
    let vertices = [Vec3::new(0.0, 0.0, 0.15), Vec3::new(1.0, 0.0, 5.0)];
    assert!(project_outline(&projection, &vertices, &[true, true]).is_none());
    // The same vertex is fine when unused
    assert!(project_outline(&projection, &vertices, &[false, true]).is_some());
    assert!(project_outline(&projection, &vertices, &[false, false]).is_none());
}

// ============================================================================
// DIMENSIONS
// ============================================================================

#[test]
fn test_check_dimensions() {
    assert!(check_dimensions("test", 1, 1).is_ok());
    assert!(check_dimensions("test", MAX_DIMENSION, MAX_DIMENSION).is_ok());
    assert!(check_dimensions("test", 0, 10).is_err());
    assert!(check_dimensions("test", 10, MAX_DIMENSION + 1).is_err());
}
