// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root recording and reconciliation.
//!
//! A [`PictureRecorder`] is bound to one native root. Every frame the
//! framework replays its drawing commands into it between
//! [`start_recording`](PictureRecorder::start_recording) and
//! [`finish_recording`](PictureRecorder::finish_recording):
//!
//! - **Recording** assigns each command an identity from the
//!   [`SequenceTable`] (type, per-type ordinal, clip index) and a dirty bit
//!   from comparing its content against the same slot last frame. The save
//!   stack tracks transforms and clip nesting; closing a clip scope appends a
//!   [`DrawingType::Pop`] marker. Externally owned layers are recorded with
//!   [`draw_layer`](PictureRecorder::draw_layer) and only ever placed.
//! - **Reconciliation** (see [`ReconcileReport`]) walks the recorded items,
//!   paints new and dirty surfaces, reorders containers whose child list
//!   changed, and evicts surfaces whose identity disappeared.
//!
//! A frame whose folded draw hash equals the previous one does no native work
//! at all.

mod reconcile;

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::backend::{HierarchyMutator, Node, RootId, Scene};
use crate::hash::{INITIAL_HASH, hash_merge, hash_merge3};
use crate::item::{DrawingItem, DrawingType};
use crate::pool::{ClipPool, LayerPool};
use crate::sequence::{DEFAULT_FAST_SLOTS, SequenceTable};
use crate::state::{SaveKind, SaveStack, SaveState};

pub use reconcile::ReconcileReport;
use reconcile::{Parent, Slot};

/// What [`PictureRecorder::draw`] and [`PictureRecorder::clip`] recorded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawResult {
    /// Whether the command must be repainted.
    pub is_dirty: bool,
    /// Identity assigned to the command.
    pub item_hash: u64,
    /// Kind of command recorded.
    pub drawing_type: DrawingType,
    /// Save scope the command was recorded in.
    pub save_state: SaveState,
}

/// Native payload of one recorded item, consumed by reconciliation.
enum Pending<B: HierarchyMutator> {
    Draw {
        ordinal: u64,
        state: SaveState,
        command: B::Command,
    },
    Clip {
        ordinal: u64,
        state: SaveState,
        shape: B::ClipShape,
    },
    Layer {
        layer: B::Layer,
    },
    Marker,
}

/// Records drawing commands for one root and reconciles them onto native
/// surfaces.
///
/// `N` is the per-type fast-path capacity of the sequence table; ordinals at
/// or beyond it spill into a map.
pub struct PictureRecorder<B: HierarchyMutator, const N: usize = DEFAULT_FAST_SLOTS> {
    current_items: Vec<DrawingItem>,
    final_items: Vec<DrawingItem>,
    pending: Vec<Pending<B>>,
    layer_pool: LayerPool<B::Surface>,
    clip_pool: ClipPool<B::ClipView>,
    /// Embedded external layers by identity, with the key they were drawn
    /// with.
    layers: HashMap<u64, (u64, B::Layer)>,
    sequence: SequenceTable<N>,
    stack: SaveStack,
    finish_draw_hash: u64,
    current_draw_hash: u64,
    is_first_render: bool,
    needs_retry: bool,
    root: Option<RootId>,
    baseline: HashMap<Parent, Vec<Slot>>,
    frame_index: u64,
}

impl<B: HierarchyMutator, const N: usize> core::fmt::Debug for PictureRecorder<B, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PictureRecorder")
            .field("root", &self.root)
            .field("frame_index", &self.frame_index)
            .field("items", &self.current_items.len())
            .field("committed", &self.final_items.len())
            .field("layers", &self.layer_pool.len())
            .field("clips", &self.clip_pool.len())
            .field("external_layers", &self.layers.len())
            .field("first_render", &self.is_first_render)
            .finish_non_exhaustive()
    }
}

impl<B: HierarchyMutator, const N: usize> Default for PictureRecorder<B, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: HierarchyMutator, const N: usize> PictureRecorder<B, N> {
    /// Creates an unbound recorder. Its first frame is a first render.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_items: Vec::new(),
            final_items: Vec::new(),
            pending: Vec::new(),
            layer_pool: LayerPool::new(),
            clip_pool: ClipPool::new(),
            layers: HashMap::new(),
            sequence: SequenceTable::new(),
            stack: SaveStack::new(),
            finish_draw_hash: 0,
            current_draw_hash: INITIAL_HASH,
            is_first_render: true,
            needs_retry: false,
            root: None,
            baseline: HashMap::new(),
            frame_index: 0,
        }
    }

    /// Begins a frame drawn under `root`.
    ///
    /// Anything recorded since the last finish is discarded. If `root` is not
    /// the root of the previous frame, the whole sequence table is reset and
    /// the frame becomes a first render. Discarding a partly recorded frame
    /// also resets the table, since it already overwrote committed slots;
    /// every command of the new frame then reports dirty.
    pub fn start_recording(&mut self, root: RootId) {
        let abandoned = !self.current_items.is_empty();
        self.current_items.clear();
        self.pending.clear();
        if self.root.is_some_and(|r| r != root) {
            self.sequence.reset();
            self.is_first_render = true;
        } else if abandoned {
            self.sequence.reset();
        } else {
            self.sequence.reset_indices();
        }
        self.stack.reset();
        self.current_draw_hash = INITIAL_HASH;
    }

    /// Opens a save scope.
    pub fn save(&mut self) {
        self.stack.push(SaveKind::Save);
    }

    /// Closes the innermost save scope and every clip scope opened in it.
    ///
    /// Appends one [`DrawingType::Pop`] marker per clip scope closed. Extra
    /// calls with no open scope are ignored.
    pub fn restore(&mut self) {
        let outcome = self.stack.restore();
        for _ in 0..outcome.popped_clips {
            let state = *self.stack.top();
            let _ = self.record(DrawingType::Pop, 0, 0, state);
            self.pending.push(Pending::Marker);
        }
    }

    /// Translates the active scope.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.stack.translate(dx, dy);
    }

    /// Scales the active scope.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.stack.scale(sx, sy);
    }

    /// Rotates the active scope by `degrees` around its origin.
    pub fn rotate(&mut self, degrees: f64) {
        self.stack.rotate(degrees);
    }

    /// Records a drawing command.
    ///
    /// `content_hash` must cover every argument that affects the command's
    /// pixels; `command` is handed to the backend if the surface needs
    /// painting. `drawing_type` must own a surface: external layers go
    /// through [`draw_layer`](Self::draw_layer).
    pub fn draw(
        &mut self,
        drawing_type: DrawingType,
        content_hash: u64,
        command: B::Command,
    ) -> DrawResult {
        debug_assert!(
            drawing_type.owns_surface(),
            "{drawing_type:?} owns no surface; use clip, restore or draw_layer"
        );
        let state = *self.stack.top();
        let (result, ordinal) = self.record(drawing_type, content_hash, state.clip_count, state);
        self.pending.push(Pending::Draw {
            ordinal,
            state,
            command,
        });
        result
    }

    /// Records a clip and opens a clip scope that lasts until the enclosing
    /// [`restore`](Self::restore).
    pub fn clip(&mut self, content_hash: u64, shape: B::ClipShape) -> DrawResult {
        let clip_index = self.stack.push_clip();
        let state = *self.stack.top();
        let (result, ordinal) = self.record(DrawingType::Clip, content_hash, clip_index, state);
        self.pending.push(Pending::Clip {
            ordinal,
            state,
            shape,
        });
        result
    }

    /// Embeds an externally owned layer at this point of the frame.
    ///
    /// `layer_key` identifies the layer; drawing a different key at the same
    /// position swaps the embedded layer. The recorder attaches, orders, and
    /// detaches `layer`, but never paints, parks, or destroys it.
    pub fn draw_layer(&mut self, layer_key: u64, layer: B::Layer) -> DrawResult {
        let state = *self.stack.top();
        let (result, _) = self.record(DrawingType::DrawLayer, layer_key, state.clip_count, state);
        self.pending.push(Pending::Layer { layer });
        result
    }

    fn record(
        &mut self,
        drawing_type: DrawingType,
        content_hash: u64,
        clip_index: u32,
        state: SaveState,
    ) -> (DrawResult, u64) {
        let keyed = if drawing_type == DrawingType::Pop {
            content_hash
        } else {
            hash_merge(content_hash, state.placement_hash())
        };
        let id = self.sequence.alloc(drawing_type, clip_index, keyed);
        let item_hash = id.item_hash;
        self.current_items.push(DrawingItem {
            item_hash,
            content_hash,
            drawing_type,
            clip_index,
            is_dirty: id.is_dirty,
        });
        self.current_draw_hash = hash_merge3(self.current_draw_hash, item_hash, keyed);
        let result = DrawResult {
            is_dirty: id.is_dirty,
            item_hash,
            drawing_type,
            save_state: state,
        };
        (result, id.item_index)
    }

    /// Items recorded since [`start_recording`](Self::start_recording).
    #[must_use]
    pub fn items(&self) -> &[DrawingItem] {
        &self.current_items
    }

    /// Items of the last finished frame.
    #[must_use]
    pub fn committed_items(&self) -> &[DrawingItem] {
        &self.final_items
    }

    /// Number of pooled surfaces.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layer_pool.len()
    }

    /// Number of pooled clip views.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clip_pool.len()
    }

    /// Number of embedded external layers.
    #[must_use]
    pub fn external_layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Depth of the save stack, including its guard entry.
    #[must_use]
    pub fn save_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Whether the next finished frame will treat every item as new.
    #[must_use]
    pub fn is_first_render(&self) -> bool {
        self.is_first_render
    }

    /// Root of the last finished frame.
    #[must_use]
    pub fn root(&self) -> Option<RootId> {
        self.root
    }

    /// Releases every pooled handle and forgets all history.
    ///
    /// Surfaces go to the scene's reuse cache (or are destroyed when it is
    /// full); clip views are destroyed; external layers are detached. The
    /// recorder can then be bound to any root.
    pub fn prepare_for_reuse(&mut self, scene: &mut Scene<B>) {
        self.release_all(scene);
        self.clear_history();
    }

    /// Destroys every pooled handle without parking any of them.
    ///
    /// External layers are only detached.
    pub fn teardown(&mut self, scene: &mut Scene<B>) {
        let backend = scene.backend_mut();
        for (_, entry) in self.layer_pool.drain() {
            backend.detach(Node::Surface(&entry.handle));
            backend.destroy_surface(entry.handle);
        }
        for (_, entry) in self.clip_pool.drain() {
            backend.detach(Node::Clip(&entry.handle));
            backend.destroy_clip_view(entry.handle);
        }
        for (_, (_, layer)) in self.layers.drain() {
            backend.detach(Node::Layer(&layer));
        }
        self.clear_history();
    }

    fn clear_history(&mut self) {
        self.current_items.clear();
        self.final_items.clear();
        self.pending.clear();
        self.sequence.reset();
        self.stack.reset();
        self.baseline.clear();
        self.finish_draw_hash = 0;
        self.current_draw_hash = INITIAL_HASH;
        self.is_first_render = true;
        self.needs_retry = false;
        self.root = None;
    }
}
