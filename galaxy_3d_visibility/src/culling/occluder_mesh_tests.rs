use glam::Vec3;
use super::*;
use crate::error::Error;

fn unit_cube() -> OccluderMesh {
    OccluderMesh::from_box(&AABB::new(Vec3::ZERO, Vec3::ONE))
}

fn tetrahedron() -> OccluderMesh {
    OccluderMesh::new(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
        vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
    )
    .unwrap()
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_box_mesh_is_closed_with_outward_planes() {
    let cube = unit_cube();
    assert!(cube.is_closed());
    assert_eq!(cube.vertices().len(), 8);
    assert_eq!(cube.polygon_count(), 6);

    let center = Vec3::splat(0.5);
    for i in 0..6 {
        assert!(!cube.is_front_facing(i, center), "face {} faces inward", i);
        assert!((cube.plane(i).truncate().length() - 1.0).abs() < 1e-6);
    }
    assert_eq!(cube.plane(0).truncate(), Vec3::NEG_X);
    assert_eq!(cube.plane(5).truncate(), Vec3::Z);
}

#[test]
fn test_tetrahedron_is_closed() {
    let mesh = tetrahedron();
    assert!(mesh.is_closed());
    assert!(mesh.is_front_facing(3, Vec3::splat(1.0)));
    assert!(!mesh.is_front_facing(3, Vec3::splat(0.1)));
}

#[test]
fn test_single_quad_is_open() {
    let mesh = OccluderMesh::new(
        vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        vec![vec![0, 1, 2, 3]],
    )
    .unwrap();
    assert!(!mesh.is_closed());
    assert_eq!(mesh.polygon(0), &[0, 1, 2, 3]);
    assert!(mesh.is_front_facing(0, Vec3::new(0.5, 0.5, 1.0)));
    assert!(mesh.outline(Vec3::new(0.5, 0.5, 1.0)).is_empty());
}

#[test]
fn test_rejects_short_polygon() {
    let result = OccluderMesh::new(vec![Vec3::ZERO, Vec3::X], vec![vec![0, 1]]);
    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
}

#[test]
fn test_rejects_bad_index() {
    let result = OccluderMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 7]]);
    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
}

#[test]
fn test_rejects_degenerate_polygon() {
    let collinear = vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
    let result = OccluderMesh::new(collinear, vec![vec![0, 1, 2]]);
    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
}

#[test]
fn test_rejects_concave_polygon() {
    // Arrow head: the third vertex pokes inward
    let vertices = vec![
        Vec3::ZERO,
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(1.0, 0.5, 0.0),
        Vec3::new(1.0, 2.0, 0.0),
    ];
    let result = OccluderMesh::new(vertices, vec![vec![0, 1, 2, 3]]);
    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
}

// ============================================================================
// OUTLINE
// ============================================================================

#[test]
fn test_outline_facing_one_face() {
    let cube = unit_cube();
    let outline = cube.outline(Vec3::new(0.5, 0.5, 10.0));

    assert_eq!(outline.edges.len(), 4);
    let used: Vec<usize> = (0..8).filter(|&i| outline.used_vertices[i]).collect();
    assert_eq!(used, vec![4, 5, 6, 7]);
}

#[test]
fn test_outline_from_corner_is_hexagon() {
    let cube = unit_cube();
    let outline = cube.outline(Vec3::splat(10.0));

    assert_eq!(outline.edges.len(), 6);
    assert!(!outline.used_vertices[0]);
    assert!(!outline.used_vertices[7]);
    assert_eq!(outline.used_vertices.iter().filter(|&&u| u).count(), 6);
}

#[test]
fn test_outline_from_inside_is_empty() {
    let cube = unit_cube();
    assert!(cube.outline(Vec3::splat(0.5)).is_empty());
}

#[test]
fn test_outline_edges_form_closed_loop() {
    let cube = unit_cube();
    let outline = cube.outline(Vec3::new(3.0, 0.5, 4.0));

    // Every used vertex is the end of exactly two silhouette edges
    for (v, &used) in outline.used_vertices.iter().enumerate() {
        let degree = outline.edges.iter().filter(|e| e[0] as usize == v || e[1] as usize == v).count();
        assert_eq!(degree, if used { 2 } else { 0 });
    }
}
