// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-diffing reconciliation of drawing commands onto native layers.
//!
//! `lamina_core` sits between a retained declarative scene graph that re-emits
//! its drawing commands every frame and a platform that renders through a
//! persistent tree of native surfaces. Each frame it gives every command a
//! stable identity, detects unchanged content through hashes, and touches only
//! the native surfaces whose content, placement, or order actually changed. It
//! is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   framework draw calls
//!       │  save / restore / translate / scale / rotate
//!       │  draw(type, content_hash, command) / clip(content_hash, shape)
//!       │  draw_layer(layer_key, layer)
//!       ▼
//!   PictureRecorder ──► SequenceTable (identity + dirty bit)
//!       │               SaveStack     (transform, clip nesting)
//!       ▼
//!   finish_recording ──► walk: LayerPool / ClipPool ◄──► Scene (ReuseCache)
//!                            │
//!                            ▼
//!                     HierarchyMutator::set_children / detach
//! ```
//!
//! **[`recorder`]**: [`PictureRecorder`](recorder::PictureRecorder), the
//! per-root orchestrator. Records one frame, then diffs it against the
//! previous one and reconciles the native tree.
//!
//! **[`sequence`]**: Per-type ordinal allocation. The k-th command of a type
//! keeps its identity across frames; its stored content hash yields the dirty
//! bit.
//!
//! **[`state`]**: Save stack with a permanent guard entry, modelling clips as
//! implicit nested scopes.
//!
//! **[`item`]**: [`DrawingType`](item::DrawingType) and the per-command
//! [`DrawingItem`](item::DrawingItem) record.
//!
//! **[`pool`]**: Identity-keyed handle pools and the per-type
//! [`ReuseCache`](pool::ReuseCache).
//!
//! **[`backend`]**: The [`SurfaceBackend`](backend::SurfaceBackend) and
//! [`HierarchyMutator`](backend::HierarchyMutator) traits that platforms
//! implement, the [`Scene`](backend::Scene) owning a backend and its reuse
//! cache, and an in-memory backend for tests and headless use.
//!
//! **[`hash`]** / **[`paint`]** / **[`clip`]**: Content hashing for command
//! arguments, paint attributes, and clip shapes.
//!
//! **[`transform`]**: 3D affine transform carried by save scopes.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! reconcile instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-surface
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod clip;
pub mod hash;
pub mod item;
pub mod paint;
pub mod pool;
pub mod recorder;
pub mod sequence;
pub mod state;
pub mod trace;
pub mod transform;
