/// WriteQueue — occluders waiting to be written into the coverage buffer.
///
/// Visible occluders are not inserted right away. They are queued with
/// their screen box and a depth, sorted nearest first, and only written
/// when an object test needs them: when an occluder nearer than the object
/// overlaps the object's screen box.

use glam::Vec2;
use crate::geometry::ScreenBox;

/// A queued occluder
#[derive(Debug, Clone)]
pub struct WriteQueueEntry<T> {
    pub screen: ScreenBox,
    pub depth: f32,
    pub value: T,
}

/// Depth-sorted queue of deferred occluders.
#[derive(Debug, Clone)]
pub struct WriteQueue<T> {
    entries: Vec<WriteQueueEntry<T>>,
}

impl<T> Default for WriteQueue<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> WriteQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the queue. Called once per frame.
    pub fn initialize(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, nearest first.
    pub fn entries(&self) -> &[WriteQueueEntry<T>] {
        &self.entries
    }

    /// Queue an occluder. Entries of equal depth keep insertion order.
    pub fn append(&mut self, screen: ScreenBox, depth: f32, value: T) {
        let at = self.entries.partition_point(|e| e.depth <= depth);
        self.entries.insert(at, WriteQueueEntry { screen, depth, value });
    }

    /// Remove and return the nearest occluder not farther than `min_depth`
    /// whose box overlaps `screen`.
    pub fn fetch(&mut self, screen: &ScreenBox, min_depth: f32) -> Option<(T, f32)> {
        let index = self
            .entries
            .iter()
            .take_while(|e| e.depth <= min_depth)
            .position(|e| e.screen.intersects(screen))?;
        let entry = self.entries.remove(index);
        Some((entry.value, entry.depth))
    }

    /// True if a queued occluder nearer than `depth` covers `point`.
    pub fn is_point_affected(&self, point: Vec2, depth: f32) -> bool {
        self.entries
            .iter()
            .take_while(|e| e.depth < depth)
            .any(|e| e.screen.contains_point(point))
    }

    /// True if `fetch` would return something for this box and depth.
    pub fn has_relevant(&self, screen: &ScreenBox, min_depth: f32) -> bool {
        self.entries
            .iter()
            .take_while(|e| e.depth <= min_depth)
            .any(|e| e.screen.intersects(screen))
    }
}

#[cfg(test)]
#[path = "write_queue_tests.rs"]
mod tests;
