// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Save scopes and their accumulated transform and clip state.
//!
//! A clip does not map onto a native save/restore pair: it opens a nested
//! container (a clip view) that stays open until the enclosing `restore`. The
//! stack therefore models every clip as an implicit nested save of kind
//! [`SaveKind::Clip`]. A single `restore` unwinds all clip entries above the
//! nearest explicit save and then the save itself.
//!
//! The bottom entry is a [`SaveKind::SafeGuard`] that is never popped, so the
//! stack is never empty and surplus `restore` calls are harmless.

use alloc::vec::Vec;

use crate::hash::ContentHasher;
use crate::transform::Transform3d;

/// Why a [`SaveState`] was pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SaveKind {
    /// Bottom-of-stack sentinel.
    SafeGuard,
    /// Explicit `save()`.
    Save,
    /// Implicit scope opened by `clip()`.
    Clip,
}

/// One entry of the save stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaveState {
    /// Transform accumulated from scale and rotate calls.
    pub transform: Transform3d,
    /// Pending X translation in `transform`'s local frame.
    pub translate_x: f64,
    /// Pending Y translation in `transform`'s local frame.
    pub translate_y: f64,
    /// Clips in effect in this scope, counted across nested saves.
    pub clip_count: u32,
    /// Why this entry exists.
    pub make_type: SaveKind,
}

impl SaveState {
    /// The sentinel state at the bottom of every stack.
    pub const GUARD: Self = Self {
        transform: Transform3d::IDENTITY,
        translate_x: 0.0,
        translate_y: 0.0,
        clip_count: 0,
        make_type: SaveKind::SafeGuard,
    };

    /// Returns the full transform, with the pending translation applied.
    #[must_use]
    pub fn matrix(&self) -> Transform3d {
        if self.translate_x == 0.0 && self.translate_y == 0.0 {
            self.transform
        } else {
            self.transform
                .pre_translate(self.translate_x, self.translate_y)
        }
    }

    /// Hashes where a command drawn in this state lands.
    ///
    /// Two states with equal placement hashes map local coordinates
    /// identically, so a command's pixels depend only on its content hash.
    #[must_use]
    pub fn placement_hash(&self) -> u64 {
        let m = self.matrix();
        let mut hasher = ContentHasher::new();
        for i in 0..4 {
            for v in m.col(i) {
                hasher = hasher.u64(v.to_bits());
            }
        }
        hasher.finish()
    }

    /// Folds the pending translation into `transform`.
    fn flatten(&mut self) {
        self.transform = self.matrix();
        self.translate_x = 0.0;
        self.translate_y = 0.0;
    }
}

impl Default for SaveState {
    fn default() -> Self {
        Self::GUARD
    }
}

/// What a call to [`SaveStack::restore`] unwound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Clip scopes closed by this restore.
    pub popped_clips: u32,
    /// Whether an explicit save entry was popped.
    pub popped_save: bool,
}

/// Stack of nested save scopes with a permanent guard entry.
#[derive(Clone, Debug)]
pub struct SaveStack {
    states: Vec<SaveState>,
}

impl Default for SaveStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveStack {
    /// Creates a stack holding only the guard.
    #[must_use]
    pub fn new() -> Self {
        let mut states = Vec::with_capacity(8);
        states.push(SaveState::GUARD);
        Self { states }
    }

    /// Drops every scope and reinstates a fresh guard.
    pub fn reset(&mut self) {
        self.states.clear();
        self.states.push(SaveState::GUARD);
    }

    /// Returns the active scope.
    #[must_use]
    pub fn top(&self) -> &SaveState {
        self.states.last().unwrap_or(&SaveState::GUARD)
    }

    /// Returns the active scope mutably.
    pub fn top_mut(&mut self) -> &mut SaveState {
        if self.states.is_empty() {
            self.states.push(SaveState::GUARD);
        }
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Number of entries, including the guard.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.states.len()
    }

    /// Pushes a copy of the active scope tagged with `kind`.
    ///
    /// The copy keeps the clip count, so commands under a save nested in a
    /// clip still carry a nonzero clip index.
    pub fn push(&mut self, kind: SaveKind) {
        let mut state = *self.top();
        state.make_type = kind;
        self.states.push(state);
    }

    /// Opens a clip scope and returns its clip index (1-based, counting the
    /// clips still in effect).
    pub fn push_clip(&mut self) -> u32 {
        let top = self.top_mut();
        top.clip_count += 1;
        let index = top.clip_count;
        self.push(SaveKind::Clip);
        index
    }

    /// Closes the innermost scope if it is a clip. Returns whether it was.
    pub fn pop_clip(&mut self) -> bool {
        if self.states.len() > 1 && self.top().make_type == SaveKind::Clip {
            self.states.pop();
            true
        } else {
            false
        }
    }

    /// Unwinds clip scopes down to and including the nearest explicit save.
    ///
    /// With nothing but the guard left, this does nothing.
    pub fn restore(&mut self) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        while self.pop_clip() {
            outcome.popped_clips += 1;
        }
        if self.states.len() > 1 && self.top().make_type == SaveKind::Save {
            self.states.pop();
            outcome.popped_save = true;
        }
        outcome
    }

    /// Translates the active scope.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        let top = self.top_mut();
        top.translate_x += dx;
        top.translate_y += dy;
    }

    /// Scales the active scope.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        let top = self.top_mut();
        top.flatten();
        top.transform = top.transform.pre_scale(sx, sy);
    }

    /// Rotates the active scope around its origin.
    pub fn rotate(&mut self, degrees: f64) {
        let top = self.top_mut();
        top.flatten();
        top.transform = top.transform.pre_rotate_degrees(degrees);
    }
}
