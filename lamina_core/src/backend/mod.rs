// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! The recorder never talks to a platform API directly. A platform supplies
//! two capabilities:
//!
//! - **Surface factory**: [`SurfaceBackend`] creates, paints, and destroys
//!   paintable surfaces (one per drawing type) and clip views. Painting is
//!   dispatched on [`DrawingType`], not on a surface subclass.
//! - **Hierarchy mutator**: [`HierarchyMutator`] orders the children of the
//!   root and of each clip view, and detaches nodes that left the tree. It
//!   also names the externally owned layers a frame may embed; the recorder
//!   places those but never creates, parks, or destroys them.
//!
//! [`Scene`] owns a backend together with the [`ReuseCache`] shared by every
//! recorder drawing into it. Its lifetime bounds the lifetime of all parked
//! surfaces; nothing here is process-global.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_frame(recorder: &mut PictureRecorder<MyBackend>, scene: &mut Scene<MyBackend>) {
//!     recorder.start_recording(root);
//!     recorder.save();
//!     recorder.translate(16.0, 16.0);
//!     recorder.clip(clip.content_hash(), clip);
//!     recorder.draw(DrawingType::Rect, paint.content_hash(), rect_command);
//!     recorder.restore();
//!     let report = recorder.finish_recording(root, scene);
//! }
//! ```

pub mod memory;

use core::fmt;

use crate::item::{DrawingItem, DrawingType};
use crate::pool::{DEFAULT_REUSE_CAPACITY, ReuseCache};
use crate::state::SaveState;

/// Identifies the native root a recorder draws under.
///
/// Backends assign these; core only compares them to detect rebinding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RootId(pub u64);

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.0)
    }
}

/// A node that can hold children in the native hierarchy.
#[derive(Debug)]
pub enum Container<'a, C> {
    /// The recorder's root surface.
    Root(RootId),
    /// A clip view opened by a clip command.
    Clip(&'a C),
}

/// A child in the native hierarchy.
#[derive(Debug)]
pub enum Node<'a, S, C, L> {
    /// A paintable surface.
    Surface(&'a S),
    /// A clip view.
    Clip(&'a C),
    /// An externally owned layer.
    Layer(&'a L),
}

impl<S, C, L> Clone for Node<'_, S, C, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, C, L> Copy for Node<'_, S, C, L> {}

/// A [`Node`] of backend `B`.
pub type NodeOf<'a, B> = Node<
    'a,
    <B as SurfaceBackend>::Surface,
    <B as SurfaceBackend>::ClipView,
    <B as HierarchyMutator>::Layer,
>;

/// Creates, paints, and destroys native surfaces and clip views.
pub trait SurfaceBackend {
    /// A paintable native surface.
    type Surface;
    /// A native container that clips its children.
    type ClipView;
    /// Arguments needed to paint one command.
    type Command;
    /// Arguments needed to configure one clip view.
    type ClipShape;

    /// Creates a surface for `drawing_type`, or `None` if the platform could
    /// not provide one this frame.
    fn create_surface(&mut self, drawing_type: DrawingType) -> Option<Self::Surface>;

    /// Paints `command` into `surface`, replacing its previous contents.
    fn paint(
        &mut self,
        surface: &mut Self::Surface,
        item: &DrawingItem,
        state: &SaveState,
        command: &Self::Command,
    );

    /// Destroys a surface. It is already detached.
    fn destroy_surface(&mut self, surface: Self::Surface);

    /// Creates a clip view, or `None` if the platform could not provide one.
    fn create_clip_view(&mut self) -> Option<Self::ClipView>;

    /// Applies `shape` to `view`.
    fn update_clip(
        &mut self,
        view: &mut Self::ClipView,
        item: &DrawingItem,
        state: &SaveState,
        shape: &Self::ClipShape,
    );

    /// Destroys a clip view. It is already detached.
    fn destroy_clip_view(&mut self, view: Self::ClipView);
}

/// Attaches, orders, and detaches native children.
pub trait HierarchyMutator: SurfaceBackend {
    /// A native layer owned outside the recorder, embedded with
    /// [`PictureRecorder::draw_layer`](crate::recorder::PictureRecorder::draw_layer).
    type Layer;

    /// Makes `children` the exact, ordered child list of `container`.
    ///
    /// Children already attached elsewhere move; implementations should
    /// reorder in place rather than detach and reattach nodes that stay.
    fn set_children(
        &mut self,
        container: Container<'_, Self::ClipView>,
        children: &[NodeOf<'_, Self>],
    );

    /// Removes `node` from whatever container holds it.
    fn detach(&mut self, node: NodeOf<'_, Self>);
}

/// Where [`Scene::acquire_surface`] got a surface from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceSource {
    /// Taken from the reuse cache.
    Reused,
    /// Freshly created by the backend.
    Created,
}

/// A backend plus the reuse cache shared by the recorders drawing into it.
pub struct Scene<B: SurfaceBackend> {
    backend: B,
    reuse: ReuseCache<B::Surface>,
}

impl<B: SurfaceBackend + fmt::Debug> fmt::Debug for Scene<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("backend", &self.backend)
            .field("parked", &self.reuse.len())
            .finish()
    }
}

impl<B: SurfaceBackend> Scene<B> {
    /// Creates a scene with the default reuse capacity.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_reuse_capacity(backend, DEFAULT_REUSE_CAPACITY)
    }

    /// Creates a scene parking at most `capacity` surfaces per drawing type.
    #[must_use]
    pub fn with_reuse_capacity(backend: B, capacity: usize) -> Self {
        Self {
            backend,
            reuse: ReuseCache::new(capacity),
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Returns the reuse cache.
    #[must_use]
    pub fn reuse_cache(&self) -> &ReuseCache<B::Surface> {
        &self.reuse
    }

    /// Takes a parked surface of `drawing_type`, or creates one.
    pub fn acquire_surface(
        &mut self,
        drawing_type: DrawingType,
    ) -> Option<(B::Surface, SurfaceSource)> {
        if let Some(surface) = self.reuse.dequeue(drawing_type) {
            return Some((surface, SurfaceSource::Reused));
        }
        self.backend
            .create_surface(drawing_type)
            .map(|s| (s, SurfaceSource::Created))
    }

    /// Parks a detached surface, destroying it if the cache is full.
    pub fn release_surface(&mut self, drawing_type: DrawingType, surface: B::Surface) {
        if let Err(surface) = self.reuse.enqueue(drawing_type, surface) {
            self.backend.destroy_surface(surface);
        }
    }

    /// Destroys every parked surface. Call under memory pressure.
    pub fn trim(&mut self) {
        let Self { backend, reuse } = self;
        for (_, surface) in reuse.drain() {
            backend.destroy_surface(surface);
        }
    }

    /// Trims the cache and returns the backend.
    #[must_use]
    pub fn into_backend(mut self) -> B {
        self.trim();
        self.backend
    }
}
