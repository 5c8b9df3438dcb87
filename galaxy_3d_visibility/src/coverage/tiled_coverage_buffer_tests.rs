use glam::{Mat4, Vec2, Vec3};
use super::*;
use crate::coverage::CoverageBuffer;

fn quad(x: f32, y: f32, w: f32, h: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(x, y),
        Vec2::new(x + w, y),
        Vec2::new(x + w, y + h),
        Vec2::new(x, y + h),
    ]
}

fn tiled(width: i32, height: i32) -> TiledCoverageBuffer {
    TiledCoverageBuffer::with_size(width, height).unwrap()
}

struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let unit = (self.0 >> 40) as f32 / (1u64 << 24) as f32;
        lo + unit * (hi - lo)
    }

    fn polygon(&mut self, width: f32, height: f32) -> Vec<Vec2> {
        // Convex by construction: points on an ellipse, in angle order
        let center = Vec2::new(self.next_f32(-20.0, width + 20.0), self.next_f32(-20.0, height + 20.0));
        let radius = Vec2::new(self.next_f32(2.0, width * 0.6), self.next_f32(2.0, height * 0.6));
        let count = 3 + (self.next_f32(0.0, 4.0) as usize);
        let start = self.next_f32(0.0, std::f32::consts::TAU);
        (0..count)
            .map(|i| {
                let a = start + i as f32 * std::f32::consts::TAU / count as f32;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect()
    }
}

fn assert_same_coverage(flat: &CoverageBuffer, tiled: &TiledCoverageBuffer) {
    for y in 0..flat.height() {
        for x in 0..flat.width() {
            assert_eq!(flat.is_covered(x, y), tiled.is_covered(x, y), "coverage at ({x}, {y})");
            assert_eq!(flat.depth_at(x, y), tiled.depth_at(x, y), "depth at ({x}, {y})");
        }
    }
    assert_eq!(flat.is_full(), tiled.is_full());
}

// ============================================================================
// SETUP
// ============================================================================

#[test]
fn test_setup_tile_grid() {
    let b = tiled(640, 480);
    assert_eq!(b.tile_cols(), 20);
    assert_eq!(b.tile_rows(), 8);
    assert!(b.tile(0, 0).is_pending_clear());

    let b = tiled(100, 65);
    assert_eq!(b.tile_cols(), 4);
    assert_eq!(b.tile_rows(), 2);
}

#[test]
fn test_setup_rejects_bad_dimensions() {
    let mut b = TiledCoverageBuffer::new();
    assert!(b.setup(-5, 10).is_err());
    assert!(b.setup(10, 0).is_err());
}

// ============================================================================
// INSERTION
// ============================================================================

#[test]
fn test_quad_boundaries_across_tiles() {
    let mut b = tiled(200, 200);
    // Crosses the tile column boundary at 32/64/96 and tile row boundary at 64
    assert!(b.insert_polygon(&quad(20.0, 50.0, 90.0, 30.0), 5.0, false));
    for y in 40..90 {
        for x in 10..120 {
            let expected = (20..110).contains(&x) && (50..=80).contains(&y);
            assert_eq!(b.is_covered(x, y), expected, "pixel ({x}, {y})");
        }
    }
    assert!(b.tiles.iter().all(|t| t.operations().is_empty()));
}

#[test]
fn test_carry_runs_past_dropped_right_edge() {
    let mut b = tiled(200, 100);
    assert!(b.insert_polygon(&quad(10.0, 10.0, 1000.0, 20.0), 1.0, false));
    assert!(b.is_covered(10, 15));
    assert!(b.is_covered(199, 15));
    assert!(!b.is_covered(9, 15));
}

#[test]
fn test_negative_insertion() {
    let mut b = tiled(256, 256);
    assert!(b.insert_polygon(&quad(64.0, 64.0, 64.0, 64.0), 0.01, true));
    assert!(b.is_covered(10, 10));
    assert!(b.is_covered(255, 255));
    assert!(!b.is_covered(80, 80));
    assert!(!b.test_point(Vec2::new(10.0, 10.0), 5.0));
    assert!(b.test_point(Vec2::new(80.0, 80.0), 5.0));

    assert!(b.insert_polygon(&quad(64.0, 64.0, 64.0, 64.0), 1.0, false));
    assert!(b.is_full());
}

#[test]
fn test_full_screen_quad() {
    let mut b = tiled(640, 480);
    assert!(b.insert_polygon(&quad(0.0, 0.0, 640.0, 480.0), 50.0, false));
    assert!(b.is_full());
    assert!(!b.insert_polygon(&quad(10.0, 10.0, 100.0, 100.0), 60.0, false));

    let tri = [Vec2::new(10.0, 10.0), Vec2::new(600.0, 20.0), Vec2::new(300.0, 470.0)];
    assert!(!b.test_polygon(&tri, 60.0));
    assert!(b.test_polygon(&tri, 50.0));
    assert!(!b.test_rectangle(&ScreenBox::new(Vec2::ZERO, Vec2::new(639.0, 479.0)), 51.0));
    assert!(!b.test_point(Vec2::new(5.0, 5.0), 51.0));
}

#[test]
fn test_nearer_occluder_over_full_screen_lowers_depth() {
    let mut b = tiled(640, 480);
    assert!(b.insert_polygon(&quad(0.0, 0.0, 640.0, 480.0), 100.0, false));
    assert!(b.is_full());
    assert!(!b.test_rectangle(&ScreenBox::new(Vec2::ZERO, Vec2::new(639.0, 479.0)), 101.0));

    assert!(b.insert_polygon(&quad(0.0, 0.0, 640.0, 480.0), 10.0, false));
    assert_eq!(b.depth_at(320, 240), 10.0);
    assert!(!b.test_rectangle(&ScreenBox::new(Vec2::new(100.0, 100.0), Vec2::new(200.0, 200.0)), 50.0));
    assert!(!b.test_point(Vec2::new(320.0, 240.0), 50.0));
    assert!(b.test_point(Vec2::new(320.0, 240.0), 5.0));

    // A farther occluder changes nothing
    assert!(!b.insert_polygon(&quad(0.0, 0.0, 640.0, 480.0), 60.0, false));
    assert_eq!(b.depth_at(320, 240), 10.0);
}

#[test]
fn test_initialize_is_lazy() {
    let mut b = tiled(128, 128);
    b.insert_polygon(&quad(0.0, 0.0, 128.0, 128.0), 2.0, false);
    assert!(b.is_full());

    b.initialize();
    assert!(!b.is_full());
    assert!(b.tiles.iter().all(|t| t.is_pending_clear()));
    assert!(!b.is_covered(5, 5));
    assert!(b.test_point(Vec2::new(5.0, 5.0), 100.0));

    assert!(b.insert_polygon(&quad(0.0, 0.0, 10.0, 10.0), 1.0, false));
    assert!(b.is_covered(5, 5));
    assert!(!b.is_covered(50, 5));
    assert!(b.tile(3, 1).is_pending_clear());
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_two_occluder_scenario() {
    let mut b = tiled(640, 480);
    b.insert_polygon(&quad(160.0, 120.0, 160.0, 120.0), 10.0, false);
    b.insert_polygon(&quad(240.0, 180.0, 140.0, 120.0), 20.0, false);

    let tri = [Vec2::new(170.0, 170.0), Vec2::new(180.0, 170.0), Vec2::new(180.0, 180.0)];
    assert!(b.test_polygon(&tri, 9.0));
    assert!(!b.test_polygon(&tri, 11.0));

    let rect = ScreenBox::new(Vec2::new(170.0, 170.0), Vec2::new(180.0, 180.0));
    assert!(b.test_rectangle(&rect, 9.0));
    assert!(!b.test_rectangle(&rect, 11.0));
}

#[test]
fn test_polygon_test_clears_queued_operations() {
    let mut b = tiled(200, 200);
    assert!(b.test_polygon(&quad(10.0, 10.0, 150.0, 150.0), 1.0));
    assert!(b.tiles.iter().all(|t| t.operations().is_empty()));
    assert!(b.dirty_left.iter().all(|&l| l == b.tile_cols()));
    assert!(!b.is_covered(50, 50));
}

#[test]
fn test_status_no_depth() {
    let mut b = tiled(256, 256);
    b.insert_polygon(&quad(0.0, 0.0, 100.0, 256.0), 1.0, false);
    let rect = |x1: f32, y1: f32, x2: f32, y2: f32| ScreenBox::new(Vec2::new(x1, y1), Vec2::new(x2, y2));
    assert_eq!(b.status_no_depth(&rect(0.0, 0.0, 99.0, 200.0)), CoverageStatus::Full);
    assert_eq!(b.status_no_depth(&rect(100.0, 0.0, 255.0, 255.0)), CoverageStatus::Empty);
    assert_eq!(b.status_no_depth(&rect(50.0, 50.0, 150.0, 60.0)), CoverageStatus::Partial);
    assert_eq!(b.status_no_depth(&rect(300.0, 0.0, 400.0, 10.0)), CoverageStatus::Empty);
}

#[test]
fn test_insert_outline() {
    let projection = Projection::new(Mat4::IDENTITY, 100.0, 0.0, 0.0);
    let vertices = [
        Vec3::new(0.0, 0.0, 10.0),
        Vec3::new(5.0, 0.0, 10.0),
        Vec3::new(5.0, 5.0, 10.0),
        Vec3::new(0.0, 5.0, 10.0),
        // Not part of the outline
        Vec3::new(2.0, 2.0, -4.0),
    ];
    let edges = [[0, 1], [1, 2], [2, 3], [3, 0]];
    let used = [true, true, true, true, false];
    let mut b = tiled(128, 128);
    assert!(b.insert_outline(&projection, &vertices, &used, &edges));
    assert!(b.is_covered(0, 0));
    assert!(b.is_covered(49, 50));
    assert!(!b.is_covered(50, 20));
    assert_eq!(b.depth_at(10, 10), 10.0);
}

// ============================================================================
// EQUIVALENCE WITH THE FLAT BUFFER
// ============================================================================

#[test]
fn test_matches_flat_buffer() {
    for (width, height, seed) in [(200, 150, 1u64), (64, 64, 2), (333, 97, 3)] {
        let mut rng = Lcg(seed);
        let mut flat = CoverageBuffer::with_size(width, height).unwrap();
        let mut tiles = tiled(width, height);
        let (w, h) = (width as f32, height as f32);

        // Near to far, so full tiles never get a nearer depth to lower
        let mut depths: Vec<f32> = (0..12).map(|_| rng.next_f32(1.0, 100.0)).collect();
        depths.sort_by(f32::total_cmp);

        for (i, depth) in depths.into_iter().enumerate() {
            let poly = rng.polygon(w, h);
            let negative = i == 5;
            assert_eq!(
                flat.insert_polygon(&poly, depth, negative),
                tiles.insert_polygon(&poly, depth, negative),
                "insert {i}: {poly:?}"
            );
            assert_same_coverage(&flat, &tiles);
        }

        for i in 0..100 {
            let poly = rng.polygon(w, h);
            let depth = rng.next_f32(1.0, 100.0);
            assert_eq!(
                flat.test_polygon(&poly, depth),
                tiles.test_polygon(&poly, depth),
                "test polygon {i}: {poly:?} at {depth}"
            );

            let a = Vec2::new(rng.next_f32(-10.0, w + 10.0), rng.next_f32(-10.0, h + 10.0));
            let b = a + Vec2::new(rng.next_f32(0.0, 60.0), rng.next_f32(0.0, 60.0));
            let rect = ScreenBox::new(a, b);
            assert_eq!(
                flat.test_rectangle(&rect, depth),
                tiles.test_rectangle(&rect, depth),
                "test rectangle {i}: {rect:?} at {depth}"
            );
            assert_eq!(flat.test_point(a, depth), tiles.test_point(a, depth), "test point {i}");
        }
    }
}
