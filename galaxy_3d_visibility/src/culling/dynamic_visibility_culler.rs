/// DynamicVisibilityCuller — frame-coherent occlusion culling.
///
/// Every frame the culler walks its KD-tree front to back from the camera.
/// A node whose box is outside the frustum or hidden in the coverage
/// buffer prunes its whole subtree. Objects of the visible nodes are tested
/// individually, and the visible ones are written into the coverage buffer
/// (right away, or through the write queue when a later test needs them)
/// so that they hide what comes behind.
///
/// Culling only ever errs on the visible side: anything that cannot be
/// projected (behind or at the near plane, degenerate on screen) is
/// reported visible.

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use crate::camera::{Camera, Frustum, FrustumTest, ProjectedBox, Projection, ALL_PLANES_MASK, NEAR_Z};
use crate::coverage::{OcclusionBuffer, TiledCoverageBuffer, OUTLINE_NEAR_Z};
use crate::error::Result;
use crate::geometry::{AABB, ScreenBox};
use crate::spatial::{KdChildKey, KdNodeKey, SpatialIndex};
use crate::{engine_bail, engine_debug, engine_trace};
use super::culler_config::{CoverageMode, CullerConfig};
use super::history::{camera_move_increment, FastRand, NodeHistory, ObjectHistory, VisibilityReason};
use super::occluder_mesh::OccluderMesh;
use super::visibility_object::{world_box, CullerHints, VisibilityObject};
use super::write_queue::WriteQueue;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for an object registered with a culler.
    pub struct VisObjectKey;
}

/// Depth of the polygon covering everything outside the camera clip polygon
const INVERTED_CLIPPER_DEPTH: f32 = 0.01;

/// History frames between two retries of every bad occluder
const BAD_OCCLUDER_SWEEP: u32 = 50;

// ===== STATISTICS =====

/// Counters of one `vis_test` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStatistics {
    pub objects_tested: u32,
    pub objects_visible: u32,
    pub objects_culled_frustum: u32,
    pub objects_culled_coverage: u32,
    pub nodes_visible: u32,
    pub nodes_culled_frustum: u32,
    pub nodes_culled_coverage: u32,
    /// Occluders that changed the coverage buffer
    pub occluders_inserted: u32,
    /// Occluders appended to the write queue
    pub occluders_queued: u32,
}

// ===== INTERNAL STATE =====

struct ObjectEntry<O> {
    object: O,
    child: KdChildKey,
    world_box: AABB,
    shape_version: u32,
    movable_version: u32,
    hints: CullerHints,
    history: ObjectHistory,
    last_visible_pass: u32,
}

/// State carried from frame to frame, used by the traversal
struct FrameState<B> {
    buffer: B,
    write_queue: WriteQueue<VisObjectKey>,
    rng: FastRand,
    history_frame: u32,
    pass: u32,
    bad_occluder_sweep: u32,
    retry_bad_occluders: bool,
    camera_position: Option<Vec3>,
}

// ===== CULLER =====

/// Occlusion culler over a set of registered objects.
pub struct DynamicVisibilityCuller<O, B = TiledCoverageBuffer> {
    config: CullerConfig,
    tree: SpatialIndex<VisObjectKey>,
    objects: SlotMap<VisObjectKey, ObjectEntry<O>>,
    node_history: FxHashMap<KdNodeKey, NodeHistory>,
    frame: FrameState<B>,
    last_statistics: CullStatistics,
}

impl<O, B> DynamicVisibilityCuller<O, B>
where
    O: VisibilityObject,
    B: OcclusionBuffer + Default,
{
    /// Create a culler with a default-constructed coverage buffer.
    pub fn new(config: CullerConfig) -> Result<Self> {
        Self::with_buffer(config, B::default())
    }
}

impl<O, B> DynamicVisibilityCuller<O, B>
where
    O: VisibilityObject,
    B: OcclusionBuffer,
{
    /// Create a culler around an existing buffer, resized to the configured screen.
    pub fn with_buffer(config: CullerConfig, mut buffer: B) -> Result<Self> {
        config.validate()?;
        buffer.setup(config.screen_width, config.screen_height)?;
        let tree = SpatialIndex::new(config.spatial)?;

        engine_debug!(
            "galaxy3d::DynaVis",
            "Culler ready for {}x{} ({:?} coverage)",
            config.screen_width, config.screen_height, config.coverage_mode
        );

        Ok(Self {
            config,
            tree,
            objects: SlotMap::with_key(),
            node_history: FxHashMap::default(),
            frame: FrameState {
                buffer,
                write_queue: WriteQueue::new(),
                rng: FastRand::default(),
                history_frame: 0,
                pass: 0,
                bad_occluder_sweep: 0,
                retry_bad_occluders: false,
                camera_position: None,
            },
            last_statistics: CullStatistics::default(),
        })
    }

    /// Change the screen resolution.
    pub fn setup(&mut self, width: i32, height: i32) -> Result<()> {
        self.frame.buffer.setup(width, height)?;
        self.config.screen_width = width;
        self.config.screen_height = height;
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &CullerConfig {
        &self.config
    }

    /// Feature switches can change between frames; the screen size goes
    /// through `setup`.
    pub fn config_mut(&mut self) -> &mut CullerConfig {
        &mut self.config
    }

    pub fn buffer(&self) -> &B {
        &self.frame.buffer
    }

    pub fn tree(&self) -> &SpatialIndex<VisObjectKey> {
        &self.tree
    }

    /// Occluders still queued at the end of the last pass
    pub fn write_queue(&self) -> &WriteQueue<VisObjectKey> {
        &self.frame.write_queue
    }

    /// Counters of the last `vis_test`
    pub fn statistics(&self) -> CullStatistics {
        self.last_statistics
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, key: VisObjectKey) -> Option<&O> {
        self.objects.get(key).map(|e| &e.object)
    }

    /// Mutable access. Bump the object's version counters after moving or
    /// reshaping it so the next pass picks the change up.
    pub fn object_mut(&mut self, key: VisObjectKey) -> Option<&mut O> {
        self.objects.get_mut(key).map(|e| &mut e.object)
    }

    // ===== REGISTRATION =====

    /// Register an object. It starts invisible until the next `vis_test`.
    pub fn register(&mut self, object: O) -> VisObjectKey {
        let bbox = world_box(&object);
        let tree = &mut self.tree;
        self.objects.insert_with_key(|key| ObjectEntry {
            child: tree.add_object(bbox, key),
            world_box: bbox,
            shape_version: object.shape_version(),
            movable_version: object.movable_version(),
            hints: object.hints(),
            history: ObjectHistory::default(),
            last_visible_pass: 0,
            object,
        })
    }

    /// Unregister an object and hand it back.
    pub fn unregister(&mut self, key: VisObjectKey) -> Option<O> {
        let entry = self.objects.remove(key)?;
        self.tree.remove_object(entry.child);
        Some(entry.object)
    }

    /// Re-read an object's versions and world box right away instead of at
    /// the next pass.
    pub fn update_object(&mut self, key: VisObjectKey) -> Result<()> {
        let Some(entry) = self.objects.get_mut(key) else {
            engine_bail!("galaxy3d::DynaVis", InvalidObject, "unknown visibility object {:?}", key);
        };
        entry.hints = entry.object.hints();
        entry.shape_version = entry.object.shape_version();
        entry.movable_version = entry.object.movable_version();
        let bbox = world_box(&entry.object);
        if bbox != entry.world_box {
            entry.world_box = bbox;
            entry.history.forget_position();
            self.tree.move_object(entry.child, bbox);
        }
        Ok(())
    }

    // ===== RESULTS =====

    /// True if the object was found potentially visible by the last pass.
    pub fn is_visible(&self, key: VisObjectKey) -> bool {
        self.frame.pass != 0
            && self.objects.get(key).is_some_and(|e| e.last_visible_pass == self.frame.pass)
    }

    /// Objects found potentially visible by the last pass.
    pub fn visible_objects(&self) -> impl Iterator<Item = VisObjectKey> + '_ {
        let pass = self.frame.pass;
        self.objects
            .iter()
            .filter(move |(_, e)| pass != 0 && e.last_visible_pass == pass)
            .map(|(key, _)| key)
    }

    /// Why the object ended up (in)visible in the last pass.
    pub fn visibility_reason(&self, key: VisObjectKey) -> Option<VisibilityReason> {
        self.objects.get(key).map(|e| e.history.reason)
    }

    // ===== VISIBILITY PASS =====

    /// Run one visibility pass for `camera`.
    pub fn vis_test(&mut self, camera: &Camera) -> CullStatistics {
        self.update_objects();
        for entry in self.objects.values_mut() {
            entry.history.reason = VisibilityReason::Untested;
        }

        let frame = &mut self.frame;
        frame.pass = frame.pass.wrapping_add(1).max(1);

        let position = camera.position();
        let moved = frame.camera_position.map_or(0.0, |old| old.distance_squared(position));
        frame.camera_position = Some(position);
        frame.history_frame += 1 + camera_move_increment(moved);

        frame.retry_bad_occluders = frame.bad_occluder_sweep <= frame.history_frame;
        if frame.retry_bad_occluders {
            frame.bad_occluder_sweep = frame.history_frame + BAD_OCCLUDER_SWEEP;
        }

        frame.buffer.initialize();
        frame.write_queue.initialize();

        if self.node_history.len() > self.tree.node_count() {
            let tree = &self.tree;
            self.node_history.retain(|node, _| tree.contains_node(*node));
        }

        if self.config.insert_inverted_clipper && self.config.coverage_mode != CoverageMode::None {
            if let Some(clip) = camera.clip_polygon().filter(|p| p.len() >= 3) {
                frame.buffer.insert_polygon(clip, INVERTED_CLIPPER_DEPTH, true);
            }
        }

        let stamp = self.tree.new_traversal();
        let pass = frame.pass;
        let mut vis = VisTest {
            config: &self.config,
            objects: &mut self.objects,
            node_history: &mut self.node_history,
            frame,
            camera,
            projection: camera.projection(),
            frustum: Frustum::from_camera(
                camera,
                self.config.screen_width as u32,
                self.config.screen_height as u32,
            ),
            position,
            stamp,
            stats: CullStatistics::default(),
        };
        let mask = if self.config.frustum_culling { ALL_PLANES_MASK } else { 0 };
        self.tree.front_to_back(position, mask, |tree, node, mask| vis.visit_node(tree, node, mask));
        let stats = vis.stats;

        engine_trace!(
            "galaxy3d::DynaVis",
            "Pass {}: {}/{} objects visible, {} nodes visible, {} occluders inserted",
            pass, stats.objects_visible, self.objects.len(), stats.nodes_visible, stats.occluders_inserted
        );
        self.last_statistics = stats;
        stats
    }

    /// Pick up shape and transform changes of every object.
    fn update_objects(&mut self) {
        for entry in self.objects.values_mut() {
            entry.hints = entry.object.hints();
            let shape = entry.object.shape_version();
            let movable = entry.object.movable_version();
            if shape != entry.shape_version || movable != entry.movable_version {
                entry.shape_version = shape;
                entry.movable_version = movable;
                entry.world_box = world_box(&entry.object);
                entry.history.forget_position();
                self.tree.move_object(entry.child, entry.world_box);
            }
        }
    }

    // ===== SPATIAL QUERIES =====

    /// Append every object whose world box intersects `bbox`.
    pub fn query_box(&mut self, bbox: &AABB, results: &mut Vec<VisObjectKey>) {
        self.query(|b| b.intersects(bbox), results);
    }

    /// Append every object whose world box intersects the sphere.
    pub fn query_sphere(&mut self, center: Vec3, radius: f32, results: &mut Vec<VisObjectKey>) {
        self.query(|b| b.intersects_sphere(center, radius), results);
    }

    /// Append every object whose world box intersects the frustum.
    pub fn query_frustum(&mut self, frustum: &Frustum, results: &mut Vec<VisObjectKey>) {
        self.query(|b| frustum.intersects_aabb(b), results);
    }

    fn query<F: Fn(&AABB) -> bool>(&mut self, test: F, results: &mut Vec<VisObjectKey>) {
        self.update_objects();
        let stamp = self.tree.new_traversal();
        self.tree.traverse_random((), |tree, node, ()| {
            if !tree.node_bbox(node).is_some_and(|b| !b.is_empty() && test(&b)) {
                return None;
            }
            tree.distribute(node);
            let children: SmallVec<[KdChildKey; 16]> = tree.node_objects(node).iter().copied().collect();
            for child in children {
                if !tree.mark_visited(child, stamp) {
                    continue;
                }
                let hit = tree.object_bbox(child).is_some_and(|b| !b.is_empty() && test(&b));
                if let (true, Some(&key)) = (hit, tree.object(child)) {
                    results.push(key);
                }
            }
            Some(())
        });
    }
}

// ===== TRAVERSAL =====

/// Borrowed culler state for one front-to-back traversal
struct VisTest<'a, O, B> {
    config: &'a CullerConfig,
    objects: &'a mut SlotMap<VisObjectKey, ObjectEntry<O>>,
    node_history: &'a mut FxHashMap<KdNodeKey, NodeHistory>,
    frame: &'a mut FrameState<B>,
    camera: &'a Camera,
    projection: Projection,
    frustum: Frustum,
    position: Vec3,
    stamp: u32,
    stats: CullStatistics,
}

impl<'a, O, B> VisTest<'a, O, B>
where
    O: VisibilityObject,
    B: OcclusionBuffer,
{
    /// Test a node, then every object it holds that this pass has not seen.
    fn visit_node(
        &mut self,
        tree: &mut SpatialIndex<VisObjectKey>,
        node: KdNodeKey,
        mask: u32,
    ) -> Option<u32> {
        let mask = self.test_node(tree, node, mask)?;
        tree.distribute(node);

        let children: SmallVec<[KdChildKey; 16]> = tree.node_objects(node).iter().copied().collect();
        for child in children {
            if !tree.mark_visited(child, self.stamp) {
                continue;
            }
            if let Some(&key) = tree.object(child) {
                self.test_object(key, mask);
            }
        }
        Some(mask)
    }

    /// Returns the frustum mask for the children, or None to prune.
    fn test_node(&mut self, tree: &SpatialIndex<VisObjectKey>, node: KdNodeKey, mask: u32) -> Option<u32> {
        let bbox = tree.node_bbox(node)?;
        if bbox.is_empty() {
            return None;
        }

        let history_frame = self.frame.history_frame;
        let history = self.node_history.entry(node).or_default();

        if self.config.history_culling && history.vis_cnt >= history_frame {
            history.reason = VisibilityReason::VisibleHistory;
            self.stats.nodes_visible += 1;
            return Some(mask & history.frustum_mask);
        }

        if bbox.contains_point(self.position) {
            history.reason = VisibilityReason::VisibleInside;
            history.vis_cnt = history_frame + self.frame.rng.dist_history();
            history.frustum_mask = mask;
            self.stats.nodes_visible += 1;
            return Some(mask);
        }

        let mut mask = mask;
        if self.config.frustum_culling {
            let (test, remaining) = self.frustum.classify_aabb_masked(&bbox, mask);
            if test == FrustumTest::Outside {
                history.reason = VisibilityReason::InvisibleFrustum;
                self.stats.nodes_culled_frustum += 1;
                return None;
            }
            mask = remaining;
        }

        if self.config.coverage_mode != CoverageMode::None {
            if let Some(projected) = self.projection.project_box(&bbox) {
                if !self.frame.buffer.test_rectangle(&projected.screen, projected.min_depth) {
                    history.reason = VisibilityReason::InvisibleCoverage;
                    self.stats.nodes_culled_coverage += 1;
                    return None;
                }
            }
        }

        history.reason = VisibilityReason::Visible;
        history.vis_cnt = history_frame + self.frame.rng.dist_history();
        history.frustum_mask = mask;
        self.stats.nodes_visible += 1;
        Some(mask)
    }

    fn test_object(&mut self, key: VisObjectKey, mask: u32) {
        let pass = self.frame.pass;
        let (bbox, hints, mut history) = match self.objects.get(key) {
            Some(entry) if entry.last_visible_pass != pass => (entry.world_box, entry.hints, entry.history),
            _ => return,
        };
        self.stats.objects_tested += 1;

        let projected = self.projection.project_box(&bbox);
        let reason = self.classify_object(&bbox, hints, &mut history, mask, projected.as_ref());
        history.reason = reason;

        let visible = reason.is_visible();
        match reason {
            _ if visible => self.stats.objects_visible += 1,
            VisibilityReason::InvisibleFrustum => self.stats.objects_culled_frustum += 1,
            VisibilityReason::InvisibleCoverage => self.stats.objects_culled_coverage += 1,
            _ => {}
        }

        if let Some(entry) = self.objects.get_mut(key) {
            entry.history = history;
            if visible {
                entry.last_visible_pass = pass;
            }
        }

        if visible {
            self.offer_occluder(key, hints, projected.as_ref());
        }
    }

    /// Decide the visibility of one object, updating its history.
    fn classify_object(
        &mut self,
        bbox: &AABB,
        hints: CullerHints,
        history: &mut ObjectHistory,
        mask: u32,
        projected: Option<&ProjectedBox>,
    ) -> VisibilityReason {
        if hints.contains(CullerHints::INVISIBLE) {
            return VisibilityReason::InvisibleHint;
        }
        let history_frame = self.frame.history_frame;
        if !self.config.object_tests {
            history.vis_cnt = history_frame + self.frame.rng.dist_history();
            return VisibilityReason::Visible;
        }

        if self.config.frustum_culling
            && self.frustum.classify_aabb_masked(bbox, mask).0 == FrustumTest::Outside
        {
            return VisibilityReason::InvisibleFrustum;
        }

        let mut known = None;
        if self.config.history_culling && history.vis_cnt >= history_frame {
            known = Some(VisibilityReason::VisibleHistory);
        } else if bbox.contains_point(self.position) {
            history.vis_cnt = history_frame + self.frame.rng.dist_history();
            history.no_writequeue_vis_cnt = 0;
            known = Some(VisibilityReason::VisibleInside);
        }

        if let Some(projected) = projected {
            if self.is_off_screen(&projected.screen) {
                return VisibilityReason::InvisibleFrustum;
            }
        }
        if let Some(reason) = known {
            return reason;
        }

        // Fail open when the box cannot be projected
        let (Some(projected), true) = (projected, self.config.coverage_mode != CoverageMode::None) else {
            history.vis_cnt = history_frame + self.frame.rng.dist_history();
            return VisibilityReason::Visible;
        };

        if self.config.visible_point_tracking {
            if let Some((point, depth)) = self.project_point(history.visible_point) {
                if self.frame.buffer.test_point(point, depth) {
                    if self.config.write_queue && self.frame.write_queue.is_point_affected(point, depth) {
                        // A queued occluder may hide the point
                        history.no_writequeue_vis_cnt = 0;
                    } else {
                        history.vis_cnt = history_frame + self.frame.rng.dist_history();
                        history.no_writequeue_vis_cnt = 0;
                        return VisibilityReason::VisiblePoint;
                    }
                }
            }
        }

        let screen = &projected.screen;
        let min_depth = projected.min_depth;
        let mut visible = self.frame.buffer.test_rectangle(screen, min_depth);

        if visible
            && self.config.write_queue
            && history.no_writequeue_vis_cnt <= history_frame
            && self.frame.write_queue.has_relevant(screen, min_depth)
        {
            while let Some((occluder, _)) = self.frame.write_queue.fetch(screen, min_depth) {
                self.insert_occluder(occluder);
                if !self.frame.buffer.test_rectangle(screen, min_depth) {
                    visible = false;
                    break;
                }
            }
        }

        if !visible {
            history.no_writequeue_vis_cnt = 0;
            return VisibilityReason::InvisibleCoverage;
        }

        if self.config.visible_point_tracking {
            history.visible_point = self.find_visible_point(bbox);
        }
        history.vis_cnt = history_frame + self.frame.rng.dist_history();
        history.no_writequeue_vis_cnt = history.vis_cnt + self.frame.rng.dist_no_write_queue();
        VisibilityReason::Visible
    }

    fn is_off_screen(&self, screen: &ScreenBox) -> bool {
        screen.max.x <= 0.0
            || screen.max.y <= 0.0
            || screen.min.x >= self.config.screen_width as f32
            || screen.min.y >= self.config.screen_height as f32
    }

    /// Screen position and depth of a world point in front of the camera.
    fn project_point(&self, point: Option<Vec3>) -> Option<(Vec2, f32)> {
        let camera = self.projection.to_camera(point?);
        (camera.z >= NEAR_Z).then(|| (self.projection.perspective(camera), camera.z))
    }

    /// First visible corner of the box, then its center.
    fn find_visible_point(&self, bbox: &AABB) -> Option<Vec3> {
        (0..9)
            .map(|i| if i < 8 { bbox.corner(i) } else { bbox.center() })
            .find(|&point| {
                self.project_point(Some(point))
                    .is_some_and(|(screen, depth)| self.frame.buffer.test_point(screen, depth))
            })
    }

    // ===== OCCLUDERS =====

    /// Queue or insert a visible object as occluder.
    fn offer_occluder(&mut self, key: VisObjectKey, hints: CullerHints, projected: Option<&ProjectedBox>) {
        if self.config.coverage_mode == CoverageMode::None || hints.contains(CullerHints::BAD_OCCLUDER) {
            return;
        }
        let history_frame = self.frame.history_frame;
        let Some(entry) = self.objects.get_mut(key) else {
            return;
        };
        if entry.object.occluder().is_none() {
            return;
        }
        if self.frame.retry_bad_occluders {
            entry.history.no_occluder_vis_cnt = history_frame.saturating_sub(1);
        }
        if self.config.ignore_bad_occluders && entry.history.no_occluder_vis_cnt > history_frame {
            return;
        }

        if self.config.write_queue {
            if let Some(projected) = projected {
                let depth = if hints.contains(CullerHints::GOOD_OCCLUDER) {
                    projected.min_depth
                } else {
                    projected.max_depth
                };
                self.frame.write_queue.append(projected.screen, depth, key);
                self.stats.occluders_queued += 1;
                return;
            }
        }
        self.insert_occluder(key);
    }

    /// Write an object's occluder mesh into the coverage buffer.
    ///
    /// An occluder that changes nothing is left out for a few frames.
    fn insert_occluder(&mut self, key: VisObjectKey) -> bool {
        let Some(entry) = self.objects.get(key) else {
            return false;
        };
        let Some(mesh) = entry.object.occluder() else {
            return false;
        };
        let projection = self.camera.object_projection(&entry.object.world_transform());
        let eye = projection.transform().inverse().transform_point3(Vec3::ZERO);

        let use_outline = self.config.coverage_mode == CoverageMode::Outline
            && mesh.is_closed()
            && !entry.hints.contains(CullerHints::GOOD_OCCLUDER);
        let modified = if use_outline {
            let outline = mesh.outline(eye);
            !outline.is_empty()
                && self.frame.buffer.insert_outline(
                    &projection,
                    mesh.vertices(),
                    &outline.used_vertices,
                    &outline.edges,
                )
        } else {
            insert_mesh_polygons(&mut self.frame.buffer, mesh, &projection, eye, self.config.clamp_occluders)
        };

        if modified {
            self.stats.occluders_inserted += 1;
        } else if let Some(entry) = self.objects.get_mut(key) {
            entry.history.no_occluder_vis_cnt = self.frame.history_frame + self.frame.rng.dist_no_occluder();
        }
        modified
    }
}

/// Insert the polygons of `mesh` facing `eye` (object space).
///
/// Polygons with a vertex at camera depth `OUTLINE_NEAR_Z` or closer are
/// skipped, or with `clamp` clipped against the `NEAR_Z` plane.
fn insert_mesh_polygons<B: OcclusionBuffer>(
    buffer: &mut B,
    mesh: &OccluderMesh,
    projection: &Projection,
    eye: Vec3,
    clamp: bool,
) -> bool {
    let mut modified = false;
    for (index, polygon) in mesh.polygons().enumerate() {
        if !mesh.is_front_facing(index, eye) {
            continue;
        }
        let mut camera: SmallVec<[Vec3; 8]> = polygon
            .iter()
            .map(|&v| projection.to_camera(mesh.vertices()[v as usize]))
            .collect();

        if camera.iter().any(|c| c.z <= OUTLINE_NEAR_Z) {
            if !clamp || !camera.iter().any(|c| c.z > NEAR_Z) {
                continue;
            }
            camera = clip_near(&camera, NEAR_Z);
            if camera.len() < 3 {
                continue;
            }
        }

        let max_depth = camera.iter().map(|c| c.z).fold(f32::NEG_INFINITY, f32::max);
        let points: SmallVec<[Vec2; 8]> = camera.iter().map(|c| projection.perspective(*c)).collect();
        modified |= buffer.insert_polygon(&points, max_depth, false);
    }
    modified
}

/// Part of a camera-space polygon at or beyond depth `near`.
fn clip_near(points: &[Vec3], near: f32) -> SmallVec<[Vec3; 8]> {
    let mut clipped = SmallVec::new();
    for (i, &a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let a_in = a.z >= near;
        if a_in {
            clipped.push(a);
        }
        if a_in != (b.z >= near) {
            let t = (near - a.z) / (b.z - a.z);
            clipped.push(a + (b - a) * t);
        }
    }
    clipped
}

#[cfg(test)]
#[path = "dynamic_visibility_culler_tests.rs"]
mod tests;
