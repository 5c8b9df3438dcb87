/// Diagnostics for the KD-tree: self check, statistics and text dump.

use std::fmt::Write;
use crate::error::Result;
use crate::geometry::{Axis, AABB};
use crate::engine_bail;
use super::kd_tree::{KdNodeKey, SpatialIndex};

/// Shape of a KD-tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdTreeStatistics {
    /// Object references over all nodes (straddling objects count once per node)
    pub objects: usize,
    /// Internal nodes
    pub nodes: usize,
    pub leaves: usize,
    /// Depth of the deepest node (root = 0)
    pub max_depth: usize,
    /// Average over internal nodes of `1 - |left - right| / (left + right)`,
    /// counting object references per subtree. 1.0 for a tree without splits.
    pub balance_quality: f32,
}

impl<T> SpatialIndex<T> {
    /// Verify the structural invariants of the tree.
    ///
    /// - every node is reachable from the root and knows its parent
    /// - every child box is contained in its parent's box
    /// - every object listed in a node lies in the node's box and lists
    ///   that node among its leaves, and the reverse
    pub fn debug_check_tree(&self) -> Result<()> {
        let mut reached = 0usize;
        let mut stack = vec![self.root];

        if self.nodes.get(self.root).and_then(|n| n.parent).is_some() {
            engine_bail!("galaxy3d::KdTree", TreeInconsistency, "root has a parent");
        }

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                engine_bail!("galaxy3d::KdTree", TreeInconsistency, "dangling node {:?}", key);
            };
            reached += 1;

            for (i, &object) in node.objects.iter().enumerate() {
                let Some(child) = self.children.get(object) else {
                    engine_bail!("galaxy3d::KdTree", TreeInconsistency, "node {:?} lists a removed object", key);
                };
                if node.objects[..i].contains(&object) {
                    engine_bail!("galaxy3d::KdTree", TreeInconsistency, "node {:?} lists {:?} twice", key, object);
                }
                if !child.leaves.contains(&key) {
                    engine_bail!(
                        "galaxy3d::KdTree",
                        TreeInconsistency,
                        "object {:?} does not reference node {:?}",
                        object, key
                    );
                }
                if !node.bbox.contains(&child.bbox) {
                    engine_bail!(
                        "galaxy3d::KdTree",
                        TreeInconsistency,
                        "object {:?} lies outside node {:?}",
                        object, key
                    );
                }
            }

            if let Some(children) = node.children {
                for child_key in children {
                    let Some(child_node) = self.nodes.get(child_key) else {
                        engine_bail!("galaxy3d::KdTree", TreeInconsistency, "node {:?} has a dangling child", key);
                    };
                    if child_node.parent != Some(key) {
                        engine_bail!(
                            "galaxy3d::KdTree",
                            TreeInconsistency,
                            "node {:?} does not point back to its parent {:?}",
                            child_key, key
                        );
                    }
                    if !node.bbox.contains(&child_node.bbox) {
                        engine_bail!(
                            "galaxy3d::KdTree",
                            TreeInconsistency,
                            "box of node {:?} exceeds its parent {:?}",
                            child_key, key
                        );
                    }
                    stack.push(child_key);
                }
            }
        }

        if reached != self.nodes.len() {
            engine_bail!(
                "galaxy3d::KdTree",
                TreeInconsistency,
                "{} nodes reachable from the root, {} allocated",
                reached, self.nodes.len()
            );
        }

        for (object, child) in self.children.iter() {
            for (i, leaf) in child.leaves.iter().enumerate() {
                if child.leaves[..i].contains(leaf) {
                    engine_bail!("galaxy3d::KdTree", TreeInconsistency, "object {:?} references {:?} twice", object, leaf);
                }
                let listed = self.nodes.get(*leaf).is_some_and(|n| n.objects.contains(&object));
                if !listed {
                    engine_bail!(
                        "galaxy3d::KdTree",
                        TreeInconsistency,
                        "object {:?} references node {:?} which does not list it",
                        object, leaf
                    );
                }
            }
        }

        Ok(())
    }

    /// Count nodes, leaves, depth and balance.
    pub fn statistics(&self) -> KdTreeStatistics {
        let mut stats = KdTreeStatistics {
            objects: 0,
            nodes: 0,
            leaves: 0,
            max_depth: 0,
            balance_quality: 0.0,
        };
        let mut balance_sum = 0.0f32;
        self.collect_statistics(self.root, 0, &mut stats, &mut balance_sum);
        stats.balance_quality = if stats.nodes == 0 {
            1.0
        } else {
            balance_sum / stats.nodes as f32
        };
        stats
    }

    /// Returns the number of object references in the subtree.
    fn collect_statistics(
        &self,
        key: KdNodeKey,
        depth: usize,
        stats: &mut KdTreeStatistics,
        balance_sum: &mut f32,
    ) -> usize {
        let Some(node) = self.nodes.get(key) else {
            return 0;
        };
        stats.max_depth = stats.max_depth.max(depth);
        stats.objects += node.objects.len();

        match node.children {
            Some([child1, child2]) => {
                stats.nodes += 1;
                let left = self.collect_statistics(child1, depth + 1, stats, balance_sum);
                let right = self.collect_statistics(child2, depth + 1, stats, balance_sum);
                let total = left + right;
                *balance_sum += if total == 0 {
                    1.0
                } else {
                    1.0 - (left as f32 - right as f32).abs() / total as f32
                };
                node.objects.len() + total
            }
            None => {
                stats.leaves += 1;
                node.objects.len()
            }
        }
    }

    /// Indented text dump of the tree, two spaces per level.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, key: KdNodeKey, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{}+ node bbox={} disallow={}",
            indent,
            format_box(&node.bbox),
            node.disallow_distribute
        );
        match node.children {
            Some([child1, child2]) => {
                let _ = writeln!(
                    out,
                    "{}  axis={} loc={:.3} pending={}",
                    indent,
                    axis_name(node.split_axis),
                    node.split_location,
                    node.objects.len()
                );
                self.dump_node(child1, depth + 1, out);
                self.dump_node(child2, depth + 1, out);
            }
            None => {
                let _ = writeln!(out, "{}  {} objects", indent, node.objects.len());
            }
        }
    }
}

fn axis_name(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "x",
        Axis::Y => "y",
        Axis::Z => "z",
    }
}

fn format_box(bbox: &AABB) -> String {
    if bbox.is_empty() {
        return "empty".to_string();
    }
    format!(
        "({:.2},{:.2},{:.2})-({:.2},{:.2},{:.2})",
        bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z
    )
}

#[cfg(test)]
#[path = "kd_tree_debug_tests.rs"]
mod tests;
