// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory backend.
//!
//! [`MemoryBackend`] keeps the native hierarchy as plain maps and counts every
//! operation the recorder asks of it. It backs the recorder's tests and is
//! handy for headless runs where only the resulting tree matters.

use alloc::vec::Vec;

use hashbrown::HashMap;

use super::{Container, HierarchyMutator, Node, NodeOf, RootId, SurfaceBackend};
use crate::clip::ClipShape;
use crate::item::{DrawingItem, DrawingType};
use crate::state::SaveState;

/// A surface owned by a [`MemoryBackend`].
#[derive(Debug, PartialEq)]
pub struct MemorySurface {
    /// Backend-unique id.
    pub id: u32,
    /// Type the surface was created for.
    pub drawing_type: DrawingType,
    /// Content hash of the last paint.
    pub content_hash: u64,
    /// Root-space bounds of the last paint.
    pub bounds: Option<kurbo::Rect>,
    /// Number of times the surface was painted.
    pub paint_count: u32,
}

/// A clip view owned by a [`MemoryBackend`].
#[derive(Debug, PartialEq)]
pub struct MemoryClip {
    /// Backend-unique id (shared id space with surfaces).
    pub id: u32,
    /// Root-space clip bounds of the last update.
    pub bounds: Option<kurbo::Rect>,
}

/// A layer owned by the caller and only placed by the recorder.
///
/// Mint one with [`MemoryBackend::external_layer`].
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryLayer {
    /// Backend-unique id (shared id space with surfaces).
    pub id: u32,
}

/// A node in the in-memory hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryNode {
    /// Surface by id.
    Surface(u32),
    /// Clip view by id.
    Clip(u32),
    /// External layer by id.
    Layer(u32),
}

/// A container in the in-memory hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryContainer {
    /// A recorder root.
    Root(RootId),
    /// Clip view by id.
    Clip(u32),
}

/// Operation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Surfaces created.
    pub surfaces_created: u32,
    /// Surfaces destroyed.
    pub surfaces_destroyed: u32,
    /// Clip views created.
    pub clips_created: u32,
    /// Clip views destroyed.
    pub clips_destroyed: u32,
    /// Surface paints.
    pub paints: u32,
    /// Clip shape updates.
    pub clip_updates: u32,
    /// `set_children` calls.
    pub reorders: u32,
    /// `detach` calls.
    pub detaches: u32,
}

impl MemoryStats {
    /// Returns `true` if no native mutation of any kind was recorded.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// A [`SurfaceBackend`] and [`HierarchyMutator`] that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    next_id: u32,
    stats: MemoryStats,
    lifetime: MemoryStats,
    children: HashMap<MemoryContainer, Vec<MemoryNode>>,
    parents: HashMap<MemoryNode, MemoryContainer>,
    failures_pending: u32,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counters accumulated since the last reset.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// Returns the counters and zeroes them.
    pub fn take_stats(&mut self) -> MemoryStats {
        core::mem::take(&mut self.stats)
    }

    /// Returns a new external layer. It is not counted as a surface and
    /// never fails.
    pub fn external_layer(&mut self) -> MemoryLayer {
        let id = self.next_id;
        self.next_id += 1;
        MemoryLayer { id }
    }

    /// Makes the next `count` surface or clip allocations fail.
    pub fn fail_next_allocations(&mut self, count: u32) {
        self.failures_pending = count;
    }

    /// Surfaces created and not yet destroyed, over the backend's lifetime.
    #[must_use]
    pub fn live_surfaces(&self) -> u32 {
        self.lifetime.surfaces_created - self.lifetime.surfaces_destroyed
    }

    /// Clip views created and not yet destroyed, over the backend's lifetime.
    #[must_use]
    pub fn live_clips(&self) -> u32 {
        self.lifetime.clips_created - self.lifetime.clips_destroyed
    }

    /// Returns the ordered children of `container`.
    #[must_use]
    pub fn children_of(&self, container: MemoryContainer) -> &[MemoryNode] {
        self.children.get(&container).map_or(&[], Vec::as_slice)
    }

    /// Returns the container currently holding `node`.
    #[must_use]
    pub fn parent_of(&self, node: MemoryNode) -> Option<MemoryContainer> {
        self.parents.get(&node).copied()
    }

    /// Returns every node under `root` in depth-first paint order.
    #[must_use]
    pub fn paint_order(&self, root: RootId) -> Vec<MemoryNode> {
        let mut out = Vec::new();
        self.collect(MemoryContainer::Root(root), &mut out);
        out
    }

    fn collect(&self, container: MemoryContainer, out: &mut Vec<MemoryNode>) {
        for &node in self.children_of(container) {
            out.push(node);
            if let MemoryNode::Clip(id) = node {
                self.collect(MemoryContainer::Clip(id), out);
            }
        }
    }

    fn allocate_id(&mut self) -> Option<u32> {
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }

    fn unlink(&mut self, node: MemoryNode) {
        if let Some(parent) = self.parents.remove(&node) {
            if let Some(list) = self.children.get_mut(&parent) {
                list.retain(|&n| n != node);
            }
        }
    }

    fn bump(&mut self, f: impl Fn(&mut MemoryStats)) {
        f(&mut self.stats);
        f(&mut self.lifetime);
    }
}

fn node_key(node: NodeOf<'_, MemoryBackend>) -> MemoryNode {
    match node {
        Node::Surface(s) => MemoryNode::Surface(s.id),
        Node::Clip(c) => MemoryNode::Clip(c.id),
        Node::Layer(l) => MemoryNode::Layer(l.id),
    }
}

impl SurfaceBackend for MemoryBackend {
    type Surface = MemorySurface;
    type ClipView = MemoryClip;
    type Command = kurbo::Rect;
    type ClipShape = ClipShape;

    fn create_surface(&mut self, drawing_type: DrawingType) -> Option<MemorySurface> {
        let id = self.allocate_id()?;
        self.bump(|s| s.surfaces_created += 1);
        Some(MemorySurface {
            id,
            drawing_type,
            content_hash: 0,
            bounds: None,
            paint_count: 0,
        })
    }

    fn paint(
        &mut self,
        surface: &mut MemorySurface,
        item: &DrawingItem,
        state: &SaveState,
        command: &kurbo::Rect,
    ) {
        debug_assert_eq!(
            surface.drawing_type, item.drawing_type,
            "surface painted with a command of another type"
        );
        surface.content_hash = item.content_hash;
        surface.bounds = Some(state.matrix().to_affine().transform_rect_bbox(*command));
        surface.paint_count += 1;
        self.bump(|s| s.paints += 1);
    }

    fn destroy_surface(&mut self, surface: MemorySurface) {
        self.unlink(MemoryNode::Surface(surface.id));
        self.bump(|s| s.surfaces_destroyed += 1);
    }

    fn create_clip_view(&mut self) -> Option<MemoryClip> {
        let id = self.allocate_id()?;
        self.bump(|s| s.clips_created += 1);
        Some(MemoryClip { id, bounds: None })
    }

    fn update_clip(
        &mut self,
        view: &mut MemoryClip,
        _item: &DrawingItem,
        state: &SaveState,
        shape: &ClipShape,
    ) {
        view.bounds = Some(state.matrix().to_affine().transform_rect_bbox(shape.bounds()));
        self.bump(|s| s.clip_updates += 1);
    }

    fn destroy_clip_view(&mut self, view: MemoryClip) {
        self.unlink(MemoryNode::Clip(view.id));
        if let Some(orphans) = self.children.remove(&MemoryContainer::Clip(view.id)) {
            for node in orphans {
                self.parents.remove(&node);
            }
        }
        self.bump(|s| s.clips_destroyed += 1);
    }
}

impl HierarchyMutator for MemoryBackend {
    type Layer = MemoryLayer;

    fn set_children(&mut self, container: Container<'_, MemoryClip>, children: &[NodeOf<'_, Self>]) {
        let container = match container {
            Container::Root(root) => MemoryContainer::Root(root),
            Container::Clip(c) => MemoryContainer::Clip(c.id),
        };
        let nodes: Vec<MemoryNode> = children.iter().map(|&n| node_key(n)).collect();

        for &node in &nodes {
            if self.parents.get(&node) != Some(&container) {
                self.unlink(node);
                self.parents.insert(node, container);
            }
        }
        if let Some(old) = self.children.insert(container, nodes) {
            for node in old {
                if self.parents.get(&node) == Some(&container)
                    && !self.children[&container].contains(&node)
                {
                    self.parents.remove(&node);
                }
            }
        }
        self.bump(|s| s.reorders += 1);
    }

    fn detach(&mut self, node: NodeOf<'_, Self>) {
        self.unlink(node_key(node));
        self.bump(|s| s.detaches += 1);
    }
}
