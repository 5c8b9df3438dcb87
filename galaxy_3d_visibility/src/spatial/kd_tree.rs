/// SpatialIndex — dynamic KD-tree over world-space bounding boxes.
///
/// Insertion is delayed: new objects are appended to the root's pending list
/// and only pushed down when a traversal calls `distribute` on a node it
/// visits. Tree refinement is therefore spread over the frames that
/// actually look at a region.
///
/// An object whose box straddles a split plane is stored in both children.
/// Each object keeps the list of nodes that reference it (`leaves`) so it
/// can be unlinked without searching the tree.
///
/// Node boxes are the union of the boxes of every object stored in the
/// subtree (grown on insertion, recomputed on flatten, never shrunk on
/// removal). A child box is therefore always contained in its parent box.

use glam::Vec3;
use slotmap::{new_key_type, SlotMap};
use smallvec::{smallvec, SmallVec};
use crate::error::Result;
use crate::geometry::{Axis, AABB};
use crate::engine_debug;
use super::spatial_index_config::SpatialIndexConfig;

// ===== SLOT MAP KEYS =====

new_key_type! {
    /// Stable key for a node of the KD-tree.
    ///
    /// Invalidated when the node is discarded by a flatten.
    pub struct KdNodeKey;

    /// Stable key for an object stored in the KD-tree.
    ///
    /// Valid until `remove_object` is called with it.
    pub struct KdChildKey;
}

/// Timestamp above which all object timestamps are reset
pub const TIMESTAMP_RESET: u32 = 4_000_000_000;

/// Margin used when classifying objects against a candidate split
const SPLIT_MARGIN: f32 = 0.0001;

/// Slack on the min side when routing objects into the first child
const ROUTE_EPSILON: f32 = 0.000001;

// ===== NODE / CHILD =====

/// A node of the KD-tree: a pending leaf, or an internal node with two children.
pub(super) struct KdNode {
    pub(super) parent: Option<KdNodeKey>,
    pub(super) children: Option<[KdNodeKey; 2]>,
    pub(super) split_axis: Axis,
    pub(super) split_location: f32,
    /// Union of the boxes of every object in this subtree
    pub(super) bbox: AABB,
    /// Objects stored here (pending distribution for internal nodes)
    pub(super) objects: Vec<KdChildKey>,
    /// Set when no split axis separates the objects
    pub(super) disallow_distribute: bool,
}

impl KdNode {
    fn leaf(parent: Option<KdNodeKey>) -> Self {
        Self {
            parent,
            children: None,
            split_axis: Axis::X,
            split_location: 0.0,
            bbox: AABB::EMPTY,
            objects: Vec::new(),
            disallow_distribute: false,
        }
    }
}

/// An object stored in the tree.
pub(super) struct KdChild<T> {
    pub(super) payload: T,
    pub(super) bbox: AABB,
    /// Nodes whose object list contains this object
    pub(super) leaves: SmallVec<[KdNodeKey; 2]>,
    /// Last traversal that visited this object
    pub(super) timestamp: u32,
}

// ===== SPATIAL INDEX =====

/// Dynamic KD-tree carrying a user payload per object.
pub struct SpatialIndex<T> {
    pub(super) config: SpatialIndexConfig,
    pub(super) nodes: SlotMap<KdNodeKey, KdNode>,
    pub(super) children: SlotMap<KdChildKey, KdChild<T>>,
    pub(super) root: KdNodeKey,
    global_timestamp: u32,
    move_counter: u32,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::build(SpatialIndexConfig::default())
    }
}

impl<T> SpatialIndex<T> {
    /// Create an empty tree (a single pending root node).
    pub fn new(config: SpatialIndexConfig) -> Result<Self> {
        config.validate()?;
        engine_debug!(
            "galaxy3d::KdTree",
            "Created KD-tree (split samples {}, flatten every {} moves)",
            config.split_samples, config.flatten_interval
        );
        Ok(Self::build(config))
    }

    fn build(config: SpatialIndexConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(KdNode::leaf(None));
        Self {
            config,
            nodes,
            children: SlotMap::with_key(),
            root,
            global_timestamp: 0,
            move_counter: 0,
        }
    }

    pub fn config(&self) -> &SpatialIndexConfig {
        &self.config
    }

    // ===== ACCESSORS =====

    pub fn root(&self) -> KdNodeKey {
        self.root
    }

    /// Number of objects in the tree
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of live nodes (internal and leaves)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, node: KdNodeKey) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node_bbox(&self, node: KdNodeKey) -> Option<AABB> {
        self.nodes.get(node).map(|n| n.bbox)
    }

    pub fn node_parent(&self, node: KdNodeKey) -> Option<KdNodeKey> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn node_children(&self, node: KdNodeKey) -> Option<[KdNodeKey; 2]> {
        self.nodes.get(node).and_then(|n| n.children)
    }

    /// Split plane of an internal node
    pub fn node_split(&self, node: KdNodeKey) -> Option<(Axis, f32)> {
        self.nodes
            .get(node)
            .filter(|n| n.children.is_some())
            .map(|n| (n.split_axis, n.split_location))
    }

    /// Objects stored directly in a node (empty for stale keys)
    pub fn node_objects(&self, node: KdNodeKey) -> &[KdChildKey] {
        self.nodes.get(node).map_or(&[], |n| n.objects.as_slice())
    }

    pub fn is_distribute_disallowed(&self, node: KdNodeKey) -> bool {
        self.nodes.get(node).is_some_and(|n| n.disallow_distribute)
    }

    pub fn object(&self, key: KdChildKey) -> Option<&T> {
        self.children.get(key).map(|c| &c.payload)
    }

    pub fn object_mut(&mut self, key: KdChildKey) -> Option<&mut T> {
        self.children.get_mut(key).map(|c| &mut c.payload)
    }

    pub fn object_bbox(&self, key: KdChildKey) -> Option<AABB> {
        self.children.get(key).map(|c| c.bbox)
    }

    /// Nodes currently listing the object
    pub fn object_leaves(&self, key: KdChildKey) -> &[KdNodeKey] {
        self.children.get(key).map_or(&[], |c| c.leaves.as_slice())
    }

    // ===== INSERT / REMOVE / MOVE =====

    /// Add an object. It waits in the root's pending list until distributed.
    pub fn add_object(&mut self, bbox: AABB, payload: T) -> KdChildKey {
        let key = self.children.insert(KdChild {
            payload,
            bbox,
            leaves: SmallVec::new(),
            timestamp: 0,
        });
        self.link(self.root, key);
        key
    }

    /// Remove an object and return its payload (None for a stale key).
    pub fn remove_object(&mut self, key: KdChildKey) -> Option<T> {
        if !self.children.contains_key(key) {
            return None;
        }
        self.unlink(key);
        self.children.remove(key).map(|c| c.payload)
    }

    /// Update the box of an object and re-seat it in the tree.
    ///
    /// If the object sits in a single node that still contains the new box,
    /// nothing moves. Otherwise the object is unlinked and re-added to the
    /// nearest ancestor containing the new box (the root if none does).
    /// Every `flatten_interval` moves that ancestor is flattened first.
    ///
    /// Returns false for a stale key.
    pub fn move_object(&mut self, key: KdChildKey, bbox: AABB) -> bool {
        let Some(child) = self.children.get_mut(key) else {
            return false;
        };
        child.bbox = bbox;

        if let [leaf] = child.leaves.as_slice() {
            if self.nodes.get(*leaf).is_some_and(|n| n.bbox.contains(&bbox)) {
                return true;
            }
        }

        let mut target = child.leaves.first().copied().unwrap_or(self.root);
        while let Some(node) = self.nodes.get(target) {
            if node.bbox.contains(&bbox) {
                break;
            }
            match node.parent {
                Some(parent) => target = parent,
                None => break,
            }
        }

        self.unlink(key);

        self.move_counter += 1;
        if self.move_counter >= self.config.flatten_interval {
            self.move_counter = 0;
            self.flatten(target);
        }

        self.link(target, key);
        true
    }

    /// Append an object to a node's list and grow the node box.
    fn link(&mut self, node: KdNodeKey, key: KdChildKey) {
        let Some(child) = self.children.get_mut(key) else {
            return;
        };
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.objects.push(key);
        n.bbox.union_with(&child.bbox);
        n.disallow_distribute = false;
        child.leaves.push(node);
    }

    /// Remove an object from every node that lists it.
    fn unlink(&mut self, key: KdChildKey) {
        let Some(child) = self.children.get_mut(key) else {
            return;
        };
        for leaf in child.leaves.drain(..) {
            if let Some(node) = self.nodes.get_mut(leaf) {
                if let Some(pos) = node.objects.iter().position(|&k| k == key) {
                    node.objects.swap_remove(pos);
                }
            }
        }
    }

    // ===== DISTRIBUTION =====

    /// Push the pending objects of one node down to its children.
    ///
    /// A pending leaf with two or more objects is split first. When no axis
    /// separates its objects the leaf is marked and left alone until new
    /// objects arrive. Leaves with a single object stay leaves.
    pub fn distribute(&mut self, node: KdNodeKey) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if n.objects.is_empty() || n.disallow_distribute {
            return;
        }

        if n.children.is_none() {
            if n.objects.len() == 1 {
                return;
            }
            match self.find_split(node) {
                Some((axis, location)) => {
                    let child1 = self.nodes.insert(KdNode::leaf(Some(node)));
                    let child2 = self.nodes.insert(KdNode::leaf(Some(node)));
                    if let Some(n) = self.nodes.get_mut(node) {
                        n.children = Some([child1, child2]);
                        n.split_axis = axis;
                        n.split_location = location;
                    }
                }
                None => {
                    if let Some(n) = self.nodes.get_mut(node) {
                        n.disallow_distribute = true;
                    }
                    return;
                }
            }
        }

        self.push_down(node);
    }

    /// Distribute a node and, recursively, all nodes below it.
    pub fn full_distribute(&mut self, node: KdNodeKey) {
        let mut stack: SmallVec<[KdNodeKey; 32]> = smallvec![node];
        while let Some(key) = stack.pop() {
            self.distribute(key);
            if let Some(children) = self.node_children(key) {
                stack.extend(children);
            }
        }
    }

    /// Route every pending object of an internal node into its children.
    fn push_down(&mut self, node: KdNodeKey) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        let Some([child1, child2]) = n.children else {
            return;
        };
        let axis = n.split_axis;
        let split = n.split_location;
        let pending = std::mem::take(&mut n.objects);

        for key in pending {
            let Some(child) = self.children.get_mut(key) else {
                continue;
            };
            if let Some(pos) = child.leaves.iter().position(|&l| l == node) {
                child.leaves.swap_remove(pos);
            }
            let to_first = child.bbox.min_on(axis) - ROUTE_EPSILON <= split;
            let to_second = child.bbox.max_on(axis) >= split;

            if to_first || !to_second {
                self.link(child1, key);
            }
            if to_second {
                self.link(child2, key);
            }
        }
    }

    /// Best split over the three axes, X first on ties.
    fn find_split(&self, node: KdNodeKey) -> Option<(Axis, f32)> {
        let n = self.nodes.get(node)?;
        let boxes: SmallVec<[AABB; 16]> = n
            .objects
            .iter()
            .filter_map(|&k| self.children.get(k).map(|c| c.bbox))
            .collect();

        let mut best: Option<(Axis, f32, f32)> = None;
        for axis in Axis::ALL {
            let (quality, location) = self.find_best_split_location(&boxes, axis);
            if quality < 0.0 {
                continue;
            }
            if best.map_or(true, |(_, q, _)| quality > q) {
                best = Some((axis, quality, location));
            }
        }
        best.map(|(axis, _, location)| (axis, location))
    }

    /// Quality and location of the best split on one axis.
    ///
    /// Quality is negative when no location puts objects on both sides.
    /// Two objects split only across a gap wider than `two_object_gap`,
    /// at the middle of that gap. More objects are tested at
    /// `split_samples` evenly spaced locations, scored by
    /// `(1 - cut / n) * (1 - |left - right| / n)`.
    pub(super) fn find_best_split_location(&self, boxes: &[AABB], axis: Axis) -> (f32, f32) {
        if boxes.len() < 2 {
            return (-1.0, 0.0);
        }

        if let [a, b] = boxes {
            let gap = self.config.two_object_gap;
            if a.max_on(axis) + gap < b.min_on(axis) {
                return (1.0, (a.max_on(axis) + b.min_on(axis)) * 0.5);
            }
            if b.max_on(axis) + gap < a.min_on(axis) {
                return (1.0, (b.max_on(axis) + a.min_on(axis)) * 0.5);
            }
            return (-1.0, 0.0);
        }

        let min = boxes.iter().map(|b| b.min_on(axis)).fold(f32::INFINITY, f32::min);
        let max = boxes.iter().map(|b| b.max_on(axis)).fold(f32::NEG_INFINITY, f32::max);
        if !(max - min).is_finite() || (max - min).abs() < SPLIT_MARGIN {
            return (-1.0, 0.0);
        }

        let count = boxes.len() as f32;
        let samples = self.config.split_samples;
        let step = (max - min) / (samples + 1) as f32;
        let mut best = (-1.0, 0.0);

        for i in 0..samples {
            let location = min + (i + 1) as f32 * step;
            let mut left = 0usize;
            let mut right = 0usize;
            let mut cut = 0usize;
            for b in boxes {
                if b.max_on(axis) < location - SPLIT_MARGIN {
                    left += 1;
                } else if b.min_on(axis) > location + SPLIT_MARGIN {
                    right += 1;
                } else {
                    cut += 1;
                }
            }
            if left == 0 || right == 0 {
                continue;
            }
            let imbalance = (left as f32 - right as f32).abs() / count;
            let quality = (1.0 - cut as f32 / count) * (1.0 - imbalance);
            if quality > best.0 {
                best = (quality, location);
            }
        }
        best
    }

    // ===== FLATTEN =====

    /// Collapse the subtree below `node` back into a single pending leaf.
    ///
    /// The node keeps every object of its subtree (once each) and its box
    /// becomes the union of those objects.
    pub fn flatten(&mut self, node: KdNodeKey) {
        let Some(children) = self.node_children(node) else {
            return;
        };

        let mut stack: SmallVec<[KdNodeKey; 32]> = SmallVec::from_slice(&children);
        let mut collected: Vec<KdChildKey> = Vec::new();
        let mut removed = 0usize;
        while let Some(key) = stack.pop() {
            if let Some(discarded) = self.nodes.remove(key) {
                removed += 1;
                if let Some(grandchildren) = discarded.children {
                    stack.extend(grandchildren);
                }
                collected.extend(discarded.objects);
            }
        }

        let mut absorbed: Vec<KdChildKey> = Vec::new();
        for key in collected {
            let Some(child) = self.children.get_mut(key) else {
                continue;
            };
            let nodes = &self.nodes;
            child.leaves.retain(|leaf| nodes.contains_key(*leaf));
            if !child.leaves.contains(&node) {
                child.leaves.push(node);
                absorbed.push(key);
            }
        }

        let objects = &self.children;
        let Some(target) = self.nodes.get_mut(node) else {
            return;
        };
        target.objects.extend(absorbed);
        target.children = None;
        target.disallow_distribute = false;
        target.bbox = target
            .objects
            .iter()
            .filter_map(|&k| objects.get(k))
            .fold(AABB::EMPTY, |acc, child| acc.union(&child.bbox));

        engine_debug!(
            "galaxy3d::KdTree",
            "Flattened node: {} nodes discarded, {} objects re-absorbed",
            removed, target.objects.len()
        );
    }

    /// Flatten the whole tree into the root.
    pub fn flatten_all(&mut self) {
        self.flatten(self.root);
    }

    // ===== TRAVERSAL =====

    /// Start a traversal and return its timestamp.
    ///
    /// Object timestamps are reset when the counter reaches `TIMESTAMP_RESET`.
    pub fn new_traversal(&mut self) -> u32 {
        if self.global_timestamp >= TIMESTAMP_RESET {
            for (_, child) in self.children.iter_mut() {
                child.timestamp = 0;
            }
            self.global_timestamp = 0;
            engine_debug!("galaxy3d::KdTree", "Traversal timestamps reset");
        }
        self.global_timestamp += 1;
        self.global_timestamp
    }

    pub fn current_timestamp(&self) -> u32 {
        self.global_timestamp
    }

    /// Tag an object with a traversal timestamp.
    ///
    /// Returns true the first time the object is seen in this traversal.
    pub fn mark_visited(&mut self, key: KdChildKey, timestamp: u32) -> bool {
        match self.children.get_mut(key) {
            Some(child) if child.timestamp != timestamp => {
                child.timestamp = timestamp;
                true
            }
            _ => false,
        }
    }

    /// Depth-first traversal, the child on the side of `position` first.
    ///
    /// `visit` receives the tree, the node and the state propagated from
    /// its parent. Returning `None` prunes the subtree; returning
    /// `Some(state)` descends with that state. The callback may distribute
    /// the node it visits; children created that way are traversed.
    pub fn front_to_back<S, F>(&mut self, position: Vec3, state: S, mut visit: F)
    where
        S: Copy,
        F: FnMut(&mut Self, KdNodeKey, S) -> Option<S>,
    {
        let mut stack: SmallVec<[(KdNodeKey, S); 64]> = smallvec![(self.root, state)];
        while let Some((key, state)) = stack.pop() {
            if !self.nodes.contains_key(key) {
                continue;
            }
            let Some(next) = visit(self, key, state) else {
                continue;
            };
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if let Some([child1, child2]) = node.children {
                let (near, far) = if position[node.split_axis.index()] <= node.split_location {
                    (child1, child2)
                } else {
                    (child2, child1)
                };
                stack.push((far, next));
                stack.push((near, next));
            }
        }
    }

    /// Depth-first traversal without ordering (first child first).
    pub fn traverse_random<S, F>(&mut self, state: S, mut visit: F)
    where
        S: Copy,
        F: FnMut(&mut Self, KdNodeKey, S) -> Option<S>,
    {
        let mut stack: SmallVec<[(KdNodeKey, S); 64]> = smallvec![(self.root, state)];
        while let Some((key, state)) = stack.pop() {
            if !self.nodes.contains_key(key) {
                continue;
            }
            let Some(next) = visit(self, key, state) else {
                continue;
            };
            if let Some([child1, child2]) = self.node_children(key) {
                stack.push((child2, next));
                stack.push((child1, next));
            }
        }
    }
}

#[cfg(test)]
#[path = "kd_tree_tests.rs"]
mod tests;
