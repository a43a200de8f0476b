// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for frame reconciliation.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! recorder calls while finishing a frame. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates per-surface [`SurfaceChange`] events
//!   and the corresponding `TraceSink` method.

use crate::backend::RootId;
#[cfg(feature = "trace-rich")]
use crate::item::DrawingType;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened to one surface during reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceChangeKind {
    /// A new native surface was created.
    Created,
    /// A parked surface was taken from the reuse cache.
    Reused,
    /// A retained surface was repainted in place.
    Repainted,
    /// A surface left the frame and was parked or destroyed.
    Evicted,
    /// No surface could be allocated; the item is invisible this frame.
    Failed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when `finish_recording` starts reconciling a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic per-recorder frame counter.
    pub frame_index: u64,
    /// Root the frame is drawn under.
    pub root: RootId,
    /// Number of recorded items, markers included.
    pub item_count: u32,
    /// Whether every item is treated as new.
    pub first_render: bool,
}

/// Emitted when reconciliation of a frame is complete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Monotonic per-recorder frame counter.
    pub frame_index: u64,
    /// Whether the frame hash matched and native work was skipped.
    pub fast_path: bool,
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
    /// Items that could not get a native handle.
    pub failed: u32,
    /// `set_children` calls issued.
    pub reorders: u32,
}

/// A per-frame surface change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceChange {
    /// Identity of the item that owns the surface.
    pub item_hash: u64,
    /// Drawing type of the item.
    pub drawing_type: DrawingType,
    /// What happened.
    pub kind: SurfaceChangeKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the recorder.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called before a frame is reconciled.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called after a frame is reconciled.
    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        _ = s;
    }

    /// Called with per-frame surface changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_surface_changes(&mut self, frame_index: u64, changes: &[SurfaceChange]) {
        _ = (frame_index, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns whether events reach a sink.
    ///
    /// Callers use this to skip building event payloads nobody will see.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ReconcileSummary`].
    #[inline]
    pub fn reconcile(&mut self, s: &ReconcileSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_reconcile(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits surface changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn surface_changes(&mut self, frame_index: u64, changes: &[SurfaceChange]) {
        if let Some(s) = &mut self.sink {
            s.on_surface_changes(frame_index, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
