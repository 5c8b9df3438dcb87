use glam::Vec3;
use rustc_hash::FxHashSet;
use super::*;

fn unit_box(x: f32, y: f32, z: f32) -> AABB {
    AABB::new(Vec3::new(x, y, z), Vec3::new(x + 1.0, y + 1.0, z + 1.0))
}

fn span_x(min: f32, max: f32) -> AABB {
    AABB::new(Vec3::new(min, 0.0, 0.0), Vec3::new(max, 1.0, 1.0))
}

fn tree() -> SpatialIndex<u32> {
    SpatialIndex::new(SpatialIndexConfig::default()).unwrap()
}

/// Deterministic generator for randomized trees
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let unit = (self.0 >> 40) as f32 / (1u64 << 24) as f32;
        lo + unit * (hi - lo)
    }

    fn next_box(&mut self, extent: f32) -> AABB {
        let min = Vec3::new(
            self.next_f32(-extent, extent),
            self.next_f32(-extent, extent),
            self.next_f32(-extent, extent),
        );
        let size = Vec3::new(self.next_f32(0.1, 4.0), self.next_f32(0.1, 4.0), self.next_f32(0.1, 4.0));
        AABB::new(min, min + size)
    }
}

/// Every object reachable from the root, visiting all nodes.
fn reachable_objects(tree: &mut SpatialIndex<u32>) -> FxHashSet<KdChildKey> {
    let mut found = FxHashSet::default();
    tree.traverse_random((), |tree, node, ()| {
        found.extend(tree.node_objects(node).iter().copied());
        Some(())
    });
    found
}

// ============================================================================
// CONSTRUCTION / INSERTION
// ============================================================================

#[test]
fn test_new_tree_is_single_empty_root() {
    let tree = tree();
    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 1);
    assert!(tree.node_bbox(tree.root()).unwrap().is_empty());
    assert!(tree.node_children(tree.root()).is_none());
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_new_rejects_bad_config() {
    let config = SpatialIndexConfig { split_samples: 0, ..Default::default() };
    assert!(SpatialIndex::<u32>::new(config).is_err());
}

#[test]
fn test_add_object_is_pending_at_root() {
    let mut tree = tree();
    let a = tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    let b = tree.add_object(unit_box(5.0, 0.0, 0.0), 2);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.node_objects(tree.root()), &[a, b]);
    assert_eq!(tree.object_leaves(a), &[tree.root()]);
    assert_eq!(tree.object(b), Some(&2));

    let root_box = tree.node_bbox(tree.root()).unwrap();
    assert_eq!(root_box.min, Vec3::ZERO);
    assert_eq!(root_box.max, Vec3::new(6.0, 1.0, 1.0));
    assert!(tree.node_children(tree.root()).is_none());
}

// ============================================================================
// SPLIT SEARCH
// ============================================================================

#[test]
fn test_two_objects_split_in_the_gap() {
    let tree = tree();
    let boxes = [span_x(0.0, 1.0), span_x(9.0, 10.0)];
    let (quality, location) = tree.find_best_split_location(&boxes, Axis::X);
    assert_eq!(quality, 1.0);
    assert_eq!(location, 5.0);

    // Reversed order gives the same split
    let boxes = [span_x(9.0, 10.0), span_x(0.0, 1.0)];
    assert_eq!(tree.find_best_split_location(&boxes, Axis::X), (1.0, 5.0));
}

#[test]
fn test_two_objects_without_gap_do_not_split() {
    let tree = tree();
    let touching = [span_x(0.0, 1.0), span_x(1.005, 2.0)];
    assert!(tree.find_best_split_location(&touching, Axis::X).0 < 0.0);

    let overlapping = [span_x(0.0, 1.0), span_x(0.5, 2.0)];
    assert!(tree.find_best_split_location(&overlapping, Axis::X).0 < 0.0);
}

#[test]
fn test_sampled_split_prefers_balanced_uncut() {
    let tree = tree();
    let boxes = [span_x(0.0, 1.0), span_x(2.0, 3.0), span_x(4.0, 5.0), span_x(6.0, 7.0)];
    let (quality, location) = tree.find_best_split_location(&boxes, Axis::X);
    assert_eq!(quality, 1.0);
    assert!(location > 3.0 && location < 4.0);
}

#[test]
fn test_sampled_split_coincident_objects() {
    let tree = tree();
    let boxes = [unit_box(0.0, 0.0, 0.0); 3];
    for axis in Axis::ALL {
        assert!(tree.find_best_split_location(&boxes, axis).0 < 0.0);
    }
}

#[test]
fn test_sampled_split_needs_both_sides() {
    let tree = tree();
    // One huge object spans the whole range: every sample cuts it, and no
    // sample leaves objects on both sides without cutting the big one.
    let boxes = [span_x(0.0, 100.0), span_x(0.0, 1.0), span_x(1.0, 2.0)];
    let (quality, _) = tree.find_best_split_location(&boxes, Axis::X);
    assert!(quality < 0.0);
}

// ============================================================================
// DISTRIBUTE
// ============================================================================

#[test]
fn test_distribute_two_separated_objects() {
    let mut tree = tree();
    let a = tree.add_object(span_x(0.0, 1.0), 1);
    let b = tree.add_object(span_x(9.0, 10.0), 2);
    let root = tree.root();

    tree.distribute(root);

    let [child1, child2] = tree.node_children(root).unwrap();
    assert_eq!(tree.node_split(root), Some((Axis::X, 5.0)));
    assert!(tree.node_objects(root).is_empty());
    assert_eq!(tree.node_objects(child1), &[a]);
    assert_eq!(tree.node_objects(child2), &[b]);
    assert_eq!(tree.object_leaves(a), &[child1]);
    assert_eq!(tree.node_parent(child1), Some(root));
    assert_eq!(tree.node_bbox(child2).unwrap(), span_x(9.0, 10.0));
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_distribute_picks_y_when_x_overlaps() {
    let mut tree = tree();
    tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    tree.add_object(unit_box(0.0, 5.0, 0.0), 2);
    let root = tree.root();

    tree.distribute(root);

    let (axis, location) = tree.node_split(root).unwrap();
    assert_eq!(axis, Axis::Y);
    assert_eq!(location, 3.0);
}

#[test]
fn test_distribute_single_object_stays_leaf() {
    let mut tree = tree();
    tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    tree.distribute(tree.root());
    assert!(tree.node_children(tree.root()).is_none());
    assert_eq!(tree.node_objects(tree.root()).len(), 1);
    assert!(!tree.is_distribute_disallowed(tree.root()));
}

#[test]
fn test_distribute_coincident_objects_disallowed() {
    let mut tree = tree();
    tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    tree.add_object(unit_box(0.0, 0.0, 0.0), 2);
    let root = tree.root();

    tree.distribute(root);
    assert!(tree.node_children(root).is_none());
    assert!(tree.is_distribute_disallowed(root));

    // New data may make a split possible again
    tree.add_object(unit_box(20.0, 0.0, 0.0), 3);
    assert!(!tree.is_distribute_disallowed(root));
    tree.distribute(root);
    assert!(tree.node_children(root).is_some());
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_straddling_object_goes_to_both_children() {
    let mut tree = tree();
    tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    let root = tree.root();
    tree.distribute(root);

    let straddler = tree.add_object(span_x(4.0, 6.0), 3);
    assert_eq!(tree.node_objects(root), &[straddler]);

    tree.distribute(root);

    let [child1, child2] = tree.node_children(root).unwrap();
    assert!(tree.node_objects(root).is_empty());
    let leaves = tree.object_leaves(straddler);
    assert_eq!(leaves.len(), 2);
    assert!(leaves.contains(&child1) && leaves.contains(&child2));
    assert_eq!(tree.node_bbox(child1).unwrap(), span_x(0.0, 6.0));
    assert_eq!(tree.node_bbox(child2).unwrap(), span_x(4.0, 10.0));
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_internal_node_pushes_down_single_pending_object() {
    let mut tree = tree();
    tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    let root = tree.root();
    tree.distribute(root);

    let late = tree.add_object(span_x(8.0, 8.5), 3);
    tree.distribute(root);

    let [_, child2] = tree.node_children(root).unwrap();
    assert!(tree.node_objects(root).is_empty());
    assert_eq!(tree.object_leaves(late), &[child2]);
}

#[test]
fn test_full_distribute_settles_every_leaf() {
    let mut tree = tree();
    let mut rng = Lcg(7);
    for i in 0..200 {
        tree.add_object(rng.next_box(100.0), i);
    }

    tree.full_distribute(tree.root());

    assert!(tree.debug_check_tree().is_ok());
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        match tree.node_children(node) {
            Some(children) => {
                assert!(tree.node_objects(node).is_empty());
                stack.extend(children);
            }
            None => {
                assert!(tree.node_objects(node).len() <= 1 || tree.is_distribute_disallowed(node));
            }
        }
    }
    assert_eq!(reachable_objects(&mut tree).len(), 200);
}

// ============================================================================
// REMOVE / MOVE
// ============================================================================

#[test]
fn test_remove_object_unlinks_from_all_nodes() {
    let mut tree = tree();
    tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    tree.distribute(tree.root());
    let straddler = tree.add_object(span_x(4.0, 6.0), 3);
    tree.distribute(tree.root());

    assert_eq!(tree.remove_object(straddler), Some(3));
    assert_eq!(tree.len(), 2);
    assert!(tree.object(straddler).is_none());
    assert!(!reachable_objects(&mut tree).contains(&straddler));
    assert!(tree.debug_check_tree().is_ok());

    assert_eq!(tree.remove_object(straddler), None);
}

#[test]
fn test_move_within_leaf_is_fast_path() {
    let mut tree = tree();
    let a = tree.add_object(span_x(0.0, 2.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    tree.distribute(tree.root());
    let leaves_before = tree.object_leaves(a).to_vec();

    assert!(tree.move_object(a, span_x(0.5, 1.5)));

    assert_eq!(tree.object_leaves(a), leaves_before.as_slice());
    assert_eq!(tree.object_bbox(a), Some(span_x(0.5, 1.5)));
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_move_outside_reseats_at_ancestor() {
    let mut tree = tree();
    let a = tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    let root = tree.root();
    tree.distribute(root);

    assert!(tree.move_object(a, span_x(8.0, 9.5)));

    // Only the root contains the new box
    assert_eq!(tree.object_leaves(a), &[root]);
    assert!(tree.node_objects(root).contains(&a));
    assert!(tree.debug_check_tree().is_ok());

    tree.distribute(root);
    assert!(tree.node_objects(root).is_empty());
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_move_outside_world_grows_root() {
    let mut tree = tree();
    let a = tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    tree.distribute(tree.root());

    assert!(tree.move_object(a, span_x(50.0, 51.0)));

    let root_box = tree.node_bbox(tree.root()).unwrap();
    assert!(root_box.contains(&span_x(50.0, 51.0)));
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_move_stale_key() {
    let mut tree = tree();
    let a = tree.add_object(span_x(0.0, 1.0), 1);
    tree.remove_object(a);
    assert!(!tree.move_object(a, span_x(2.0, 3.0)));
}

#[test]
fn test_move_flattens_every_interval() {
    let config = SpatialIndexConfig { flatten_interval: 1, ..Default::default() };
    let mut tree: SpatialIndex<u32> = SpatialIndex::new(config).unwrap();
    for i in 0..8 {
        tree.add_object(span_x(i as f32 * 3.0, i as f32 * 3.0 + 1.0), i);
    }
    let mover = tree.add_object(span_x(0.0, 1.0), 99);
    tree.full_distribute(tree.root());
    assert!(tree.node_count() > 1);

    // Leaving every node box forces a re-add at the root, which gets flattened
    tree.move_object(mover, span_x(100.0, 101.0));

    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.node_objects(tree.root()).len(), 9);
    assert!(tree.debug_check_tree().is_ok());
}

// ============================================================================
// FLATTEN
// ============================================================================

#[test]
fn test_flatten_all_collapses_to_root() {
    let mut tree = tree();
    let mut rng = Lcg(11);
    for i in 0..60 {
        tree.add_object(rng.next_box(30.0), i);
    }
    tree.full_distribute(tree.root());
    assert!(tree.node_count() > 1);

    tree.flatten_all();

    let root = tree.root();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.node_objects(root).len(), 60);
    for &key in tree.node_objects(root) {
        assert_eq!(tree.object_leaves(key), &[root]);
    }
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_flatten_inner_node_keeps_siblings() {
    let mut tree = tree();
    let mut rng = Lcg(5);
    for i in 0..40 {
        tree.add_object(rng.next_box(30.0), i);
    }
    tree.full_distribute(tree.root());
    let [child1, child2] = tree.node_children(tree.root()).unwrap();

    tree.flatten(child1);

    assert!(tree.node_children(child1).is_none());
    assert!(tree.contains_node(child2));
    assert_eq!(reachable_objects(&mut tree).len(), 40);
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_flatten_leaf_is_noop() {
    let mut tree = tree();
    tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    tree.flatten(tree.root());
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.len(), 1);
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

#[test]
fn test_mark_visited_once_per_traversal() {
    let mut tree = tree();
    let a = tree.add_object(unit_box(0.0, 0.0, 0.0), 1);

    let stamp = tree.new_traversal();
    assert!(tree.mark_visited(a, stamp));
    assert!(!tree.mark_visited(a, stamp));

    let next = tree.new_traversal();
    assert_eq!(next, stamp + 1);
    assert!(tree.mark_visited(a, next));
}

#[test]
fn test_timestamp_wraps_and_resets_objects() {
    let mut tree = tree();
    let a = tree.add_object(unit_box(0.0, 0.0, 0.0), 1);
    assert!(tree.mark_visited(a, 1));

    tree.global_timestamp = TIMESTAMP_RESET;
    let stamp = tree.new_traversal();

    assert_eq!(stamp, 1);
    assert_eq!(tree.current_timestamp(), 1);
    assert!(tree.mark_visited(a, stamp));
}

// ============================================================================
// TRAVERSAL
// ============================================================================

fn split_tree() -> (SpatialIndex<u32>, KdNodeKey, KdNodeKey) {
    let mut tree = tree();
    tree.add_object(span_x(0.0, 1.0), 1);
    tree.add_object(span_x(9.0, 10.0), 2);
    tree.distribute(tree.root());
    let [child1, child2] = tree.node_children(tree.root()).unwrap();
    (tree, child1, child2)
}

#[test]
fn test_front_to_back_near_child_first() {
    let (mut tree, child1, child2) = split_tree();
    let root = tree.root();

    let mut order = Vec::new();
    tree.front_to_back(Vec3::new(0.0, 0.0, 0.0), (), |_, node, ()| {
        order.push(node);
        Some(())
    });
    assert_eq!(order, vec![root, child1, child2]);

    order.clear();
    tree.front_to_back(Vec3::new(10.0, 0.0, 0.0), (), |_, node, ()| {
        order.push(node);
        Some(())
    });
    assert_eq!(order, vec![root, child2, child1]);
}

#[test]
fn test_front_to_back_prunes_and_propagates_state() {
    let (mut tree, _, _) = split_tree();

    let mut visited = 0;
    tree.front_to_back(Vec3::ZERO, (), |_, _, ()| {
        visited += 1;
        None
    });
    assert_eq!(visited, 1);

    let mut depths = Vec::new();
    tree.front_to_back(Vec3::ZERO, 0u32, |_, _, depth| {
        depths.push(depth);
        Some(depth + 1)
    });
    assert_eq!(depths, vec![0, 1, 1]);
}

#[test]
fn test_front_to_back_visits_lazily_created_children() {
    let mut tree = tree();
    for i in 0..16 {
        tree.add_object(unit_box(i as f32 * 2.0, 0.0, 0.0), i);
    }

    let mut seen = FxHashSet::default();
    let stamp = tree.new_traversal();
    tree.front_to_back(Vec3::ZERO, (), |tree, node, ()| {
        tree.distribute(node);
        for key in tree.node_objects(node).to_vec() {
            if tree.mark_visited(key, stamp) {
                seen.insert(key);
            }
        }
        Some(())
    });

    assert_eq!(seen.len(), 16);
    assert!(tree.node_count() > 1);
    assert!(tree.debug_check_tree().is_ok());
}

#[test]
fn test_traverse_random_first_child_first() {
    let (mut tree, child1, child2) = split_tree();
    let root = tree.root();
    let mut order = Vec::new();
    tree.traverse_random((), |_, node, ()| {
        order.push(node);
        Some(())
    });
    assert_eq!(order, vec![root, child1, child2]);
}

// ============================================================================
// RANDOMIZED MAINTENANCE
// ============================================================================

#[test]
fn test_random_moves_keep_tree_consistent() {
    let config = SpatialIndexConfig { flatten_interval: 7, ..Default::default() };
    let mut tree: SpatialIndex<u32> = SpatialIndex::new(config).unwrap();
    let mut rng = Lcg(1234);
    let mut keys: Vec<KdChildKey> = (0..120).map(|i| tree.add_object(rng.next_box(50.0), i)).collect();

    for round in 0..20 {
        tree.full_distribute(tree.root());
        for (i, key) in keys.iter().enumerate() {
            if (i + round) % 3 == 0 {
                assert!(tree.move_object(*key, rng.next_box(60.0)));
            }
        }
        if round % 4 == 0 {
            let key = keys.swap_remove(round % keys.len());
            assert!(tree.remove_object(key).is_some());
        }
        assert!(tree.debug_check_tree().is_ok(), "round {}", round);
    }

    let reachable = reachable_objects(&mut tree);
    assert_eq!(reachable.len(), keys.len());
    for key in &keys {
        assert!(reachable.contains(key));
    }
}
