// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diffing a recorded frame against the previous one.
//!
//! Reconciliation runs in three passes so that a handle is always either
//! pooled or attached:
//!
//! 1. **Walk**: in recording order, resolve each item's identity in the
//!    layer or clip pool. Retained surfaces are repainted only when dirty; new
//!    identities take a parked surface from the scene or create one. The walk
//!    also records the ordered children of the root and of every clip view.
//! 2. **Reorder**: call `set_children` for each container whose child list
//!    differs from the last committed one.
//! 3. **Evict**: detach and release every pooled handle whose identity was
//!    not recorded this frame.
//!
//! External layers go through the same walk and reorder but are never
//! allocated or released; eviction only detaches them.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use super::{Pending, PictureRecorder};
use crate::backend::{Container, HierarchyMutator, Node, NodeOf, RootId, Scene, SurfaceSource};
use crate::item::DrawingType;
#[cfg(feature = "trace-rich")]
use crate::trace::SurfaceChange;
use crate::trace::{FrameBeginEvent, ReconcileSummary, SurfaceChangeKind, Tracer};

/// A container in the committed hierarchy, keyed by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum Parent {
    Root,
    Clip(u64),
}

/// A child in the committed hierarchy, keyed by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum Slot {
    Surface(u64),
    Clip(u64),
    /// An external layer's identity and the key it was drawn with.
    Layer { item: u64, layer: u64 },
}

/// What one call to [`PictureRecorder::finish_recording`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Per-recorder frame counter, starting at 1.
    pub frame_index: u64,
    /// Whether the frame matched the previous one and was skipped.
    pub fast_path: bool,
    /// Whether every item was treated as new.
    pub first_render: bool,
    /// Surfaces newly created through the backend.
    pub created: u32,
    /// Surfaces taken from the reuse cache.
    pub reused: u32,
    /// Retained surfaces repainted in place.
    pub repainted: u32,
    /// Retained surfaces left untouched.
    pub retained: u32,
    /// Surfaces and clip views evicted from the pools.
    pub evicted: u32,
    /// Items left invisible because no native handle could be allocated.
    pub failed: u32,
    /// `set_children` calls issued.
    pub reorders: u32,
}

impl ReconcileReport {
    /// Converts the report into its trace event.
    #[must_use]
    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            frame_index: self.frame_index,
            fast_path: self.fast_path,
            created: self.created,
            reused: self.reused,
            repainted: self.repainted,
            retained: self.retained,
            evicted: self.evicted,
            failed: self.failed,
            reorders: self.reorders,
        }
    }

    /// Returns whether the backend was asked to do anything.
    #[must_use]
    pub fn touched_backend(&self) -> bool {
        self.created + self.reused + self.repainted + self.evicted + self.reorders > 0
    }
}

/// Per-surface change log, collected only when a rich trace sink listens.
struct ChangeLog {
    #[cfg(feature = "trace-rich")]
    changes: Option<Vec<SurfaceChange>>,
}

impl ChangeLog {
    fn new(tracer: &Tracer<'_>) -> Self {
        #[cfg(feature = "trace-rich")]
        {
            Self {
                changes: tracer.is_active().then(Vec::new),
            }
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = tracer;
            Self {}
        }
    }

    #[inline]
    fn note(&mut self, item_hash: u64, drawing_type: DrawingType, kind: SurfaceChangeKind) {
        #[cfg(feature = "trace-rich")]
        if let Some(changes) = &mut self.changes {
            changes.push(SurfaceChange {
                item_hash,
                drawing_type,
                kind,
            });
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (item_hash, drawing_type, kind);
        }
    }

    fn emit(self, tracer: &mut Tracer<'_>, frame_index: u64) {
        #[cfg(feature = "trace-rich")]
        if let Some(changes) = self.changes {
            tracer.surface_changes(frame_index, &changes);
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (tracer, frame_index);
        }
    }
}

impl<B: HierarchyMutator, const N: usize> PictureRecorder<B, N> {
    /// Reconciles the recorded frame onto the native tree under `root`.
    ///
    /// Afterwards the recorded items become the committed baseline for the
    /// next frame.
    pub fn finish_recording(&mut self, root: RootId, scene: &mut Scene<B>) -> ReconcileReport {
        self.finish_recording_traced(root, scene, &mut Tracer::none())
    }

    /// Like [`finish_recording`](Self::finish_recording), reporting to
    /// `tracer`.
    pub fn finish_recording_traced(
        &mut self,
        root: RootId,
        scene: &mut Scene<B>,
        tracer: &mut Tracer<'_>,
    ) -> ReconcileReport {
        debug_assert_eq!(
            self.current_items.len(),
            self.pending.len(),
            "every recorded item carries a payload"
        );
        if self.root.is_some_and(|r| r != root) {
            self.release_all(scene);
            self.is_first_render = true;
        }

        self.frame_index += 1;
        let mut report = ReconcileReport {
            frame_index: self.frame_index,
            first_render: self.is_first_render,
            ..ReconcileReport::default()
        };
        tracer.frame_begin(&FrameBeginEvent {
            frame_index: self.frame_index,
            root,
            item_count: u32::try_from(self.current_items.len()).unwrap_or(u32::MAX),
            first_render: self.is_first_render,
        });

        let mut log = ChangeLog::new(tracer);
        if !self.is_first_render
            && !self.needs_retry
            && self.current_draw_hash == self.finish_draw_hash
        {
            report.fast_path = true;
            report.retained = u32::try_from(self.layer_pool.len()).unwrap_or(u32::MAX);
        } else {
            let containers = self.walk(scene, &mut report, &mut log);
            self.reorder(root, containers, scene, &mut report);
            self.evict(scene, &mut report, &mut log);
        }

        self.root = Some(root);
        self.is_first_render = false;
        self.needs_retry = report.failed > 0;
        self.finish_draw_hash = self.current_draw_hash;
        self.sequence.retire_unallocated();
        core::mem::swap(&mut self.current_items, &mut self.final_items);
        self.current_items.clear();
        self.pending.clear();

        tracer.reconcile(&report.summary());
        log.emit(tracer, report.frame_index);
        report
    }

    /// Resolves every item to a native handle and collects each container's
    /// ordered children.
    fn walk(
        &mut self,
        scene: &mut Scene<B>,
        report: &mut ReconcileReport,
        log: &mut ChangeLog,
    ) -> Vec<(Parent, Vec<Slot>)> {
        let Self {
            current_items,
            pending,
            layer_pool,
            clip_pool,
            layers,
            sequence,
            is_first_render,
            ..
        } = self;
        let force = *is_first_render;

        let mut containers: Vec<(Parent, Vec<Slot>)> = vec![(Parent::Root, Vec::new())];
        // Open containers, innermost last. `None` marks a clip scope whose
        // view could not be created; nothing inside it is attached.
        let mut open: Vec<Option<usize>> = vec![Some(0)];

        for (item, pending) in current_items.iter_mut().zip(pending.drain(..)) {
            let parent = open.last().copied().flatten();
            let key = item.item_hash;
            match pending {
                Pending::Draw {
                    ordinal,
                    state,
                    command,
                } => {
                    match layer_pool.get_mut(key) {
                        Some(surface) => {
                            if item.is_dirty || force {
                                scene.backend_mut().paint(surface, item, &state, &command);
                                report.repainted += 1;
                                log.note(key, item.drawing_type, SurfaceChangeKind::Repainted);
                            } else {
                                report.retained += 1;
                            }
                        }
                        None => match scene.acquire_surface(item.drawing_type) {
                            Some((mut surface, source)) => {
                                item.is_dirty = true;
                                scene.backend_mut().paint(&mut surface, item, &state, &command);
                                let kind = match source {
                                    SurfaceSource::Reused => {
                                        report.reused += 1;
                                        SurfaceChangeKind::Reused
                                    }
                                    SurfaceSource::Created => {
                                        report.created += 1;
                                        SurfaceChangeKind::Created
                                    }
                                };
                                log.note(key, item.drawing_type, kind);
                                let _ = layer_pool.insert(key, item.drawing_type, surface);
                            }
                            None => {
                                sequence.invalidate(item.drawing_type, ordinal);
                                report.failed += 1;
                                log.note(key, item.drawing_type, SurfaceChangeKind::Failed);
                                continue;
                            }
                        },
                    }
                    if let Some(i) = parent {
                        containers[i].1.push(Slot::Surface(key));
                    }
                }
                Pending::Clip {
                    ordinal,
                    state,
                    shape,
                } => {
                    match clip_pool.get_mut(key) {
                        Some(view) => {
                            if item.is_dirty || force {
                                scene.backend_mut().update_clip(view, item, &state, &shape);
                            }
                        }
                        None => match scene.backend_mut().create_clip_view() {
                            Some(mut view) => {
                                item.is_dirty = true;
                                scene.backend_mut().update_clip(&mut view, item, &state, &shape);
                                let _ = clip_pool.insert(key, DrawingType::Clip, view);
                            }
                            None => {
                                sequence.invalidate(DrawingType::Clip, ordinal);
                                report.failed += 1;
                                log.note(key, DrawingType::Clip, SurfaceChangeKind::Failed);
                                open.push(None);
                                continue;
                            }
                        },
                    }
                    if let Some(i) = parent {
                        containers[i].1.push(Slot::Clip(key));
                    }
                    containers.push((Parent::Clip(key), Vec::new()));
                    open.push(Some(containers.len() - 1));
                }
                Pending::Layer { layer } => {
                    let layer_key = item.content_hash;
                    if let Some((old_key, old)) = layers.insert(key, (layer_key, layer)) {
                        if old_key != layer_key {
                            scene.backend_mut().detach(Node::Layer(&old));
                        }
                    }
                    if let Some(i) = parent {
                        containers[i].1.push(Slot::Layer {
                            item: key,
                            layer: layer_key,
                        });
                    }
                }
                Pending::Marker => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
            }
        }
        containers
    }

    /// Applies child lists that differ from the committed ones.
    fn reorder(
        &mut self,
        root: RootId,
        containers: Vec<(Parent, Vec<Slot>)>,
        scene: &mut Scene<B>,
        report: &mut ReconcileReport,
    ) {
        let mut next = HashMap::with_capacity(containers.len());
        for (parent, slots) in containers {
            let unchanged = match self.baseline.get(&parent) {
                Some(old) => *old == slots,
                None => slots.is_empty(),
            };
            if !unchanged {
                let container = match parent {
                    Parent::Root => Container::Root(root),
                    Parent::Clip(key) => match self.clip_pool.get(key) {
                        Some(view) => Container::Clip(view),
                        None => continue,
                    },
                };
                let nodes: Vec<NodeOf<'_, B>> = slots
                    .iter()
                    .filter_map(|slot| match *slot {
                        Slot::Surface(key) => self.layer_pool.get(key).map(Node::Surface),
                        Slot::Clip(key) => self.clip_pool.get(key).map(Node::Clip),
                        Slot::Layer { item, .. } => {
                            self.layers.get(&item).map(|(_, layer)| Node::Layer(layer))
                        }
                    })
                    .collect();
                scene.backend_mut().set_children(container, &nodes);
                report.reorders += 1;
            }
            next.insert(parent, slots);
        }
        self.baseline = next;
    }

    /// Releases pooled handles whose identity was not recorded this frame.
    fn evict(&mut self, scene: &mut Scene<B>, report: &mut ReconcileReport, log: &mut ChangeLog) {
        let live: HashSet<u64> = self.current_items.iter().map(|i| i.item_hash).collect();

        for (key, entry) in self.layer_pool.evict_unless(|k| live.contains(&k)) {
            scene.backend_mut().detach(Node::Surface(&entry.handle));
            log.note(key, entry.drawing_type, SurfaceChangeKind::Evicted);
            scene.release_surface(entry.drawing_type, entry.handle);
            report.evicted += 1;
        }
        for (key, entry) in self.clip_pool.evict_unless(|k| live.contains(&k)) {
            let backend = scene.backend_mut();
            backend.detach(Node::Clip(&entry.handle));
            backend.destroy_clip_view(entry.handle);
            log.note(key, DrawingType::Clip, SurfaceChangeKind::Evicted);
            report.evicted += 1;
        }
        let stale: Vec<u64> = self
            .layers
            .keys()
            .copied()
            .filter(|k| !live.contains(k))
            .collect();
        for key in stale {
            if let Some((_, layer)) = self.layers.remove(&key) {
                scene.backend_mut().detach(Node::Layer(&layer));
            }
        }
    }

    /// Detaches every pooled handle, parking surfaces and destroying clip
    /// views, and forgets the committed hierarchy.
    pub(super) fn release_all(&mut self, scene: &mut Scene<B>) {
        for (_, entry) in self.layer_pool.drain() {
            scene.backend_mut().detach(Node::Surface(&entry.handle));
            scene.release_surface(entry.drawing_type, entry.handle);
        }
        for (_, entry) in self.clip_pool.drain() {
            let backend = scene.backend_mut();
            backend.detach(Node::Clip(&entry.handle));
            backend.destroy_clip_view(entry.handle);
        }
        for (_, (_, layer)) in self.layers.drain() {
            scene.backend_mut().detach(Node::Layer(&layer));
        }
        self.baseline.clear();
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::backend::memory::{MemoryBackend, MemoryContainer, MemoryLayer, MemoryNode};
    use crate::clip::ClipShape;
    use crate::pool::DEFAULT_REUSE_CAPACITY;

    type Recorder = PictureRecorder<MemoryBackend>;

    const ROOT: RootId = RootId(1);

    fn rect(x: f64) -> kurbo::Rect {
        kurbo::Rect::new(x, 0.0, x + 10.0, 10.0)
    }

    fn clip_rect() -> ClipShape {
        ClipShape::Rect(kurbo::Rect::new(0.0, 0.0, 50.0, 50.0))
    }

    fn scene() -> Scene<MemoryBackend> {
        Scene::new(MemoryBackend::new())
    }

    /// save; clip; draw a; restore; draw b
    fn clipped_pair(rec: &mut Recorder, a: u64, b: u64) {
        rec.save();
        let shape = clip_rect();
        let _ = rec.clip(shape.content_hash(), shape);
        let _ = rec.draw(DrawingType::Rect, a, rect(0.0));
        rec.restore();
        let _ = rec.draw(DrawingType::Path, b, rect(20.0));
    }

    fn surface_of(rec: &Recorder, index: usize) -> u64 {
        rec.committed_items()[index].item_hash
    }

    fn memory_surface(rec: &Recorder, index: usize) -> MemoryNode {
        let id = rec
            .layer_pool
            .get(surface_of(rec, index))
            .map(|s| s.id)
            .unwrap();
        MemoryNode::Surface(id)
    }

    fn memory_clip(rec: &Recorder, index: usize) -> u32 {
        rec.clip_pool.get(surface_of(rec, index)).map(|c| c.id).unwrap()
    }

    #[test]
    fn first_frame_builds_the_tree() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(report.first_render);
        assert_eq!(report.created, 2);
        assert_eq!(rec.layer_count(), 2);
        assert_eq!(rec.clip_count(), 1);
        assert!(!rec.is_first_render());

        // Items: Clip, Rect, Pop, Path.
        let clip = memory_clip(&rec, 0);
        let a = memory_surface(&rec, 1);
        let b = memory_surface(&rec, 3);
        let backend = scene.backend();
        assert_eq!(
            backend.children_of(MemoryContainer::Root(ROOT)),
            [MemoryNode::Clip(clip), b]
        );
        assert_eq!(backend.children_of(MemoryContainer::Clip(clip)), [a]);
        assert_eq!(backend.paint_order(ROOT), [MemoryNode::Clip(clip), a, b]);
    }

    #[test]
    fn identical_frame_does_no_native_work() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        for _ in 0..2 {
            rec.start_recording(ROOT);
            clipped_pair(&mut rec, 1, 2);
            let _ = rec.finish_recording(ROOT, &mut scene);
        }
        let _ = scene.backend_mut().take_stats();

        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(report.fast_path);
        assert!(!report.touched_backend());
        assert!(scene.backend().stats().is_idle());
        assert!(rec.committed_items().iter().all(|i| !i.is_dirty));
    }

    #[test]
    fn content_change_repaints_one_surface() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let _ = rec.finish_recording(ROOT, &mut scene);
        let _ = scene.backend_mut().take_stats();

        rec.start_recording(ROOT);
        rec.save();
        let shape = clip_rect();
        let clip = rec.clip(shape.content_hash(), shape);
        let a = rec.draw(DrawingType::Rect, 1, rect(0.0));
        rec.restore();
        let b = rec.draw(DrawingType::Path, 99, rect(20.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(!clip.is_dirty);
        assert!(!a.is_dirty);
        assert!(b.is_dirty);
        assert_eq!(report.repainted, 1);
        assert_eq!(report.retained, 1);
        let stats = scene.backend().stats();
        assert_eq!(stats.paints, 1);
        assert_eq!(stats.surfaces_created, 0);
        assert_eq!(stats.reorders, 0);
        assert_eq!(stats.clip_updates, 0);
    }

    #[test]
    fn moved_command_is_repainted() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        rec.translate(5.0, 0.0);
        let r = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(r.is_dirty);
        assert_eq!(report.repainted, 1);
        let pooled = rec.layer_pool.get(r.item_hash).unwrap();
        assert_eq!(pooled.bounds, Some(kurbo::Rect::new(5.0, 0.0, 15.0, 10.0)));
    }

    #[test]
    fn type_change_evicts_and_allocates() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let rect_item = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let path_item = rec.draw(DrawingType::Path, 2, rect(20.0));
        let _ = rec.finish_recording(ROOT, &mut scene);
        let _ = scene.backend_mut().take_stats();

        rec.start_recording(ROOT);
        let oval_item = rec.draw(DrawingType::Oval, 1, rect(0.0));
        let path_again = rec.draw(DrawingType::Path, 2, rect(20.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert_ne!(oval_item.item_hash, rect_item.item_hash);
        assert_eq!(path_again.item_hash, path_item.item_hash);
        assert_eq!(report.created, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.evicted, 1);
        assert_eq!(report.reorders, 1);
        assert_eq!(rec.layer_count(), 2);
        assert_eq!(scene.reuse_cache().len_of(DrawingType::Rect), 1);
        let stats = scene.backend().stats();
        assert_eq!(stats.surfaces_created, 1);
        assert_eq!(stats.surfaces_destroyed, 0);
        assert_eq!(stats.paints, 1);
        assert_eq!(stats.detaches, 1);
    }

    #[test]
    fn reorder_without_repaint() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.draw(DrawingType::Path, 2, rect(20.0));
        let _ = rec.finish_recording(ROOT, &mut scene);
        let rect_node = memory_surface(&rec, 0);
        let path_node = memory_surface(&rec, 1);
        let _ = scene.backend_mut().take_stats();

        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Path, 2, rect(20.0));
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(!report.fast_path);
        assert_eq!(report.retained, 2);
        let stats = scene.backend().stats();
        assert_eq!(stats.paints, 0);
        assert_eq!(stats.reorders, 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)),
            [path_node, rect_node]
        );
    }

    #[test]
    fn nested_clips_nest_views() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        rec.save();
        let _ = rec.clip(1, clip_rect());
        rec.save();
        let _ = rec.clip(2, clip_rect());
        let _ = rec.draw(DrawingType::Rect, 3, rect(0.0));
        rec.restore();
        let _ = rec.draw(DrawingType::Rect, 4, rect(0.0));
        rec.restore();
        let _ = rec.draw(DrawingType::Rect, 5, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        // Items: Clip, Clip, Rect, Pop, Rect, Pop, Rect.
        let outer = memory_clip(&rec, 0);
        let inner = memory_clip(&rec, 1);
        let deep = memory_surface(&rec, 2);
        let middle = memory_surface(&rec, 4);
        let top = memory_surface(&rec, 6);
        let backend = scene.backend();
        assert_eq!(
            backend.children_of(MemoryContainer::Root(ROOT)),
            [MemoryNode::Clip(outer), top]
        );
        assert_eq!(
            backend.children_of(MemoryContainer::Clip(outer)),
            [MemoryNode::Clip(inner), middle]
        );
        assert_eq!(backend.children_of(MemoryContainer::Clip(inner)), [deep]);
        assert_eq!(rec.committed_items()[1].clip_index, 1);
    }

    #[test]
    fn unbalanced_restores_are_harmless() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        rec.restore();
        rec.restore();
        let _ = rec.draw(DrawingType::Circle, 1, rect(0.0));
        rec.restore();
        let report = rec.finish_recording(ROOT, &mut scene);

        assert_eq!(report.created, 1);
        assert_eq!(rec.committed_items().len(), 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)).len(),
            1
        );
    }

    #[test]
    fn pool_conservation_across_frames() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        for count in [3_u64, 5, 1, 4, 0, 2] {
            rec.start_recording(ROOT);
            for i in 0..count {
                let _ = rec.draw(DrawingType::Rect, i, rect(0.0));
            }
            let _ = rec.finish_recording(ROOT, &mut scene);

            let backend = scene.backend();
            assert_eq!(
                backend.live_surfaces() as usize,
                rec.layer_count() + scene.reuse_cache().len()
            );
            assert_eq!(rec.layer_count() as u64, count);
            assert_eq!(
                backend.children_of(MemoryContainer::Root(ROOT)).len() as u64,
                count
            );
        }
        // Five surfaces ever existed; the peak frame needed all of them.
        assert_eq!(scene.backend().stats().surfaces_created, 5);
    }

    #[test]
    fn prepare_for_reuse_parks_surfaces_for_another_root() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        for i in 0..3 {
            let _ = rec.draw(DrawingType::Rect, i, rect(0.0));
        }
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.prepare_for_reuse(&mut scene);
        assert!(rec.is_first_render());
        assert_eq!(rec.layer_count(), 0);
        assert!(rec.committed_items().is_empty());
        assert_eq!(scene.reuse_cache().len_of(DrawingType::Rect), 3);
        assert!(
            scene
                .backend()
                .children_of(MemoryContainer::Root(ROOT))
                .is_empty()
        );

        let other = RootId(2);
        let _ = scene.backend_mut().take_stats();
        rec.start_recording(other);
        for i in 0..3 {
            let r = rec.draw(DrawingType::Rect, i, rect(0.0));
            assert!(r.is_dirty);
        }
        let report = rec.finish_recording(other, &mut scene);

        assert!(report.first_render);
        assert_eq!(report.reused, 3);
        assert_eq!(report.created, 0);
        assert_eq!(scene.backend().stats().paints, 3);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(other)).len(),
            3
        );
    }

    #[test]
    fn root_change_rebinds_everything() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let _ = rec.finish_recording(ROOT, &mut scene);

        let other = RootId(7);
        rec.start_recording(other);
        clipped_pair(&mut rec, 1, 2);
        let report = rec.finish_recording(other, &mut scene);

        assert!(report.first_render);
        assert!(!report.fast_path);
        assert_eq!(report.reused, 2);
        assert_eq!(report.created, 0);
        assert_eq!(rec.root(), Some(other));
        let backend = scene.backend();
        assert!(backend.children_of(MemoryContainer::Root(ROOT)).is_empty());
        assert_eq!(backend.paint_order(other).len(), 3);
        assert_eq!(backend.live_clips(), 1);
    }

    #[test]
    fn failed_allocation_is_retried_next_frame() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        let record = |rec: &mut Recorder| {
            let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
            let _ = rec.draw(DrawingType::Rect, 2, rect(20.0));
        };

        scene.backend_mut().fail_next_allocations(1);
        rec.start_recording(ROOT);
        record(&mut rec);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert_eq!(rec.layer_count(), 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)).len(),
            1
        );

        rec.start_recording(ROOT);
        record(&mut rec);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert!(!report.fast_path);
        assert_eq!(report.failed, 0);
        assert_eq!(report.created, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)).len(),
            2
        );

        rec.start_recording(ROOT);
        record(&mut rec);
        assert!(rec.finish_recording(ROOT, &mut scene).fast_path);
    }

    #[test]
    fn failed_clip_hides_its_contents() {
        let mut scene = scene();
        let mut rec = Recorder::new();

        scene.backend_mut().fail_next_allocations(1);
        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.failed, 1);
        assert_eq!(rec.clip_count(), 0);
        let b = memory_surface(&rec, 3);
        assert_eq!(scene.backend().paint_order(ROOT), [b]);

        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.failed, 0);
        assert_eq!(report.created, 0);
        let clip = memory_clip(&rec, 0);
        let a = memory_surface(&rec, 1);
        assert_eq!(
            scene.backend().paint_order(ROOT),
            [MemoryNode::Clip(clip), a, b]
        );
    }

    #[test]
    fn zero_capacity_cache_destroys_evicted_surfaces() {
        let mut scene = Scene::with_reuse_capacity(MemoryBackend::new(), 0);
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Image, 1, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.evicted, 1);
        assert_eq!(scene.backend().live_surfaces(), 0);
        assert!(scene.reuse_cache().is_empty());
    }

    #[test]
    fn teardown_destroys_every_handle() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        clipped_pair(&mut rec, 1, 2);
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.teardown(&mut scene);
        let backend = scene.backend();
        assert_eq!(backend.live_surfaces(), 0);
        assert_eq!(backend.live_clips(), 0);
        assert!(backend.paint_order(ROOT).is_empty());
        assert_eq!(scene.reuse_cache().capacity(), DEFAULT_REUSE_CAPACITY);
    }

    #[test]
    fn overflow_ordinals_keep_identity() {
        let mut scene = scene();
        let mut rec: PictureRecorder<MemoryBackend, 2> = PictureRecorder::new();
        let record = |rec: &mut PictureRecorder<MemoryBackend, 2>, last: u64| -> Vec<bool> {
            let mut dirty = Vec::new();
            for i in 0..4 {
                let hash = if i == 3 { last } else { i };
                dirty.push(rec.draw(DrawingType::Line, hash, rect(0.0)).is_dirty);
            }
            dirty
        };

        rec.start_recording(ROOT);
        assert_eq!(record(&mut rec, 3), [true; 4]);
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        assert_eq!(record(&mut rec, 3), [false; 4]);
        assert!(rec.finish_recording(ROOT, &mut scene).fast_path);

        rec.start_recording(ROOT);
        assert_eq!(record(&mut rec, 30), [false, false, false, true]);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.repainted, 1);
        assert_eq!(report.retained, 3);
    }

    #[test]
    fn command_returning_after_empty_frame_is_dirty() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let first = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        let report = rec.finish_recording(ROOT, &mut scene);
        assert_eq!(report.evicted, 1);

        rec.start_recording(ROOT);
        let back = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert_eq!(back.item_hash, first.item_hash);
        assert!(back.is_dirty);
        assert!(!report.fast_path);
        assert_eq!(report.reused, 1);
        assert_eq!(rec.committed_items().iter().filter(|i| i.is_dirty).count(), 1);
    }

    #[test]
    fn shrinking_frame_forgets_trailing_ordinals() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.draw(DrawingType::Rect, 2, rect(20.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        let kept = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);
        assert!(!kept.is_dirty);

        rec.start_recording(ROOT);
        let kept = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let regrown = rec.draw(DrawingType::Rect, 2, rect(20.0));
        let _ = rec.finish_recording(ROOT, &mut scene);
        assert!(!kept.is_dirty);
        assert!(regrown.is_dirty);
    }

    #[test]
    fn moving_a_command_under_a_clip_is_dirty() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        let top = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        rec.save();
        let _ = rec.clip(9, clip_rect());
        let clipped = rec.draw(DrawingType::Rect, 1, rect(0.0));
        rec.restore();
        let report = rec.finish_recording(ROOT, &mut scene);

        assert_ne!(clipped.item_hash, top.item_hash);
        assert!(clipped.is_dirty);
        assert_eq!(report.evicted, 1);
        assert_eq!(report.created, 1);
        let clip = memory_clip(&rec, 0);
        let surface = memory_surface(&rec, 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Clip(clip)),
            [surface]
        );
    }

    #[test]
    fn save_inside_clip_stays_clipped() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        rec.start_recording(ROOT);
        rec.save();
        let _ = rec.clip(1, clip_rect());
        rec.save();
        let inner = rec.draw(DrawingType::Rect, 2, rect(0.0));
        rec.restore();
        rec.restore();
        let _ = rec.finish_recording(ROOT, &mut scene);

        // Items: Clip, Rect, Pop.
        assert_eq!(rec.committed_items()[1].item_hash, inner.item_hash);
        assert_eq!(rec.committed_items()[1].clip_index, 1);
        let clip = memory_clip(&rec, 0);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Clip(clip)),
            [memory_surface(&rec, 1)]
        );
    }

    #[test]
    fn external_layer_is_placed_but_never_owned() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        let layer = scene.backend_mut().external_layer();
        let layer_id = layer.id;
        let _ = scene.backend_mut().take_stats();

        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let embedded = rec.draw_layer(40, layer);
        let _ = rec.draw(DrawingType::Rect, 2, rect(20.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(embedded.is_dirty);
        assert_eq!(report.created, 2);
        assert_eq!(rec.layer_count(), 2);
        assert_eq!(rec.external_layer_count(), 1);
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)),
            [
                memory_surface(&rec, 0),
                MemoryNode::Layer(layer_id),
                memory_surface(&rec, 2)
            ]
        );
        assert_eq!(scene.backend().stats().surfaces_created, 2);

        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.draw_layer(40, MemoryLayer { id: layer_id });
        let _ = rec.draw(DrawingType::Rect, 2, rect(20.0));
        assert!(rec.finish_recording(ROOT, &mut scene).fast_path);

        rec.start_recording(ROOT);
        let _ = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let _ = rec.draw(DrawingType::Rect, 2, rect(20.0));
        let report = rec.finish_recording(ROOT, &mut scene);

        assert_eq!(report.evicted, 0);
        assert_eq!(rec.external_layer_count(), 0);
        assert_eq!(
            scene.backend().parent_of(MemoryNode::Layer(layer_id)),
            None
        );
        assert_eq!(
            scene.backend().children_of(MemoryContainer::Root(ROOT)).len(),
            2
        );
        let stats = scene.backend().stats();
        assert_eq!(stats.surfaces_created, 2);
        assert_eq!(stats.surfaces_destroyed, 0);
        assert_eq!(scene.backend().live_surfaces(), 2);
        assert!(scene.reuse_cache().is_empty());
    }

    #[test]
    fn swapped_external_layer_replaces_the_old_one() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        let first = scene.backend_mut().external_layer();
        let first_id = first.id;
        let second = scene.backend_mut().external_layer();
        let second_id = second.id;

        rec.start_recording(ROOT);
        let _ = rec.draw_layer(1, first);
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.start_recording(ROOT);
        let swapped = rec.draw_layer(2, second);
        let report = rec.finish_recording(ROOT, &mut scene);

        assert!(swapped.is_dirty);
        assert_eq!(report.reorders, 1);
        assert_eq!(rec.external_layer_count(), 1);
        let backend = scene.backend();
        assert_eq!(backend.parent_of(MemoryNode::Layer(first_id)), None);
        assert_eq!(
            backend.children_of(MemoryContainer::Root(ROOT)),
            [MemoryNode::Layer(second_id)]
        );
        assert_eq!(backend.live_surfaces(), 0);
    }

    #[test]
    fn teardown_detaches_external_layers() {
        let mut scene = scene();
        let mut rec = Recorder::new();
        let layer = scene.backend_mut().external_layer();
        let layer_id = layer.id;
        rec.start_recording(ROOT);
        let _ = rec.draw_layer(5, layer);
        let _ = rec.finish_recording(ROOT, &mut scene);

        rec.teardown(&mut scene);
        assert_eq!(rec.external_layer_count(), 0);
        assert_eq!(
            scene.backend().parent_of(MemoryNode::Layer(layer_id)),
            None
        );
        assert_eq!(scene.backend().stats().surfaces_destroyed, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_sees_every_frame() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Sink {
            begins: Vec<FrameBeginEvent>,
            summaries: Vec<ReconcileSummary>,
        }
        impl TraceSink for Sink {
            fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
                self.begins.push(*e);
            }
            fn on_reconcile(&mut self, s: &ReconcileSummary) {
                self.summaries.push(*s);
            }
        }

        let mut scene = scene();
        let mut rec = Recorder::new();
        let mut sink = Sink::default();
        let mut reports = Vec::new();
        for _ in 0..2 {
            rec.start_recording(ROOT);
            clipped_pair(&mut rec, 1, 2);
            let mut tracer = Tracer::new(&mut sink);
            reports.push(rec.finish_recording_traced(ROOT, &mut scene, &mut tracer));
        }

        assert_eq!(sink.begins.len(), 2);
        assert!(sink.begins[0].first_render);
        assert_eq!(sink.begins[1].item_count, 4);
        let expected: Vec<_> = reports.iter().map(ReconcileReport::summary).collect();
        assert_eq!(sink.summaries, expected);
        assert!(sink.summaries[1].fast_path);
    }

    #[cfg(feature = "trace-rich")]
    #[test]
    fn rich_tracer_lists_surface_changes() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Sink {
            changes: Vec<SurfaceChange>,
        }
        impl TraceSink for Sink {
            fn on_surface_changes(&mut self, _frame_index: u64, changes: &[SurfaceChange]) {
                self.changes.extend_from_slice(changes);
            }
        }

        let mut scene = scene();
        let mut rec = Recorder::new();
        let mut sink = Sink::default();
        rec.start_recording(ROOT);
        let r = rec.draw(DrawingType::Rect, 1, rect(0.0));
        let mut tracer = Tracer::new(&mut sink);
        let _ = rec.finish_recording_traced(ROOT, &mut scene, &mut tracer);
        drop(tracer);

        assert_eq!(
            sink.changes,
            [SurfaceChange {
                item_hash: r.item_hash,
                drawing_type: DrawingType::Rect,
                kind: SurfaceChangeKind::Created,
            }]
        );
    }
}
