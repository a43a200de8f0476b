// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-type positional identity allocation.
//!
//! Commands are re-emitted from scratch every frame, so they carry no identity
//! of their own. The sequence table gives "the k-th command of type T since
//! the last reset" a slot and derives the command's identity from the slot and
//! its clip index. Each slot remembers the identity and content hash it held
//! in the previous frame; a command is clean only when both match.
//!
//! Slots a frame never reached are retired when the frame is committed, so a
//! command that disappears for a frame comes back dirty.
//!
//! Each type keeps a fixed-size array for the first `N` ordinals and spills
//! into a map beyond that. The array covers the overwhelmingly common case of
//! a handful of commands per type per recorder.

use hashbrown::HashMap;

use crate::hash::hash_merge3;
use crate::item::DrawingType;

/// Default fast-path capacity per drawing type.
pub const DEFAULT_FAST_SLOTS: usize = 30;

/// Result of [`SequenceTable::alloc`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceId {
    /// Zero-based ordinal of this command among commands of the same type.
    pub item_index: u64,
    /// Identity of the command: type, ordinal, and clip index.
    pub item_hash: u64,
    /// Whether the slot held another identity or other content in the
    /// previous frame (always `true` for a never-seen ordinal).
    pub is_dirty: bool,
}

/// What a slot held when it was last allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stored {
    item_hash: u64,
    content_hash: u64,
}

#[derive(Debug)]
struct TypeSlots<const N: usize> {
    next_index: u64,
    fast: [Option<Stored>; N],
    overflow: HashMap<u64, Stored>,
}

impl<const N: usize> TypeSlots<N> {
    fn new() -> Self {
        Self {
            next_index: 0,
            fast: [None; N],
            overflow: HashMap::new(),
        }
    }

    fn swap(&mut self, ordinal: u64, stored: Stored) -> Option<Stored> {
        match usize::try_from(ordinal) {
            Ok(i) if i < N => self.fast[i].replace(stored),
            _ => self.overflow.insert(ordinal, stored),
        }
    }

    fn forget(&mut self, ordinal: u64) {
        match usize::try_from(ordinal) {
            Ok(i) if i < N => self.fast[i] = None,
            _ => {
                self.overflow.remove(&ordinal);
            }
        }
    }

    fn retire_from(&mut self, first: u64) {
        let start = usize::try_from(first).map_or(N, |i| i.min(N));
        for slot in &mut self.fast[start..] {
            *slot = None;
        }
        self.overflow.retain(|&ordinal, _| ordinal < first);
    }

    fn clear(&mut self) {
        self.next_index = 0;
        self.fast = [None; N];
        self.overflow.clear();
    }
}

/// Two-tier ordinal → (identity, content hash) store, one per [`DrawingType`].
#[derive(Debug)]
pub struct SequenceTable<const N: usize = DEFAULT_FAST_SLOTS> {
    types: [TypeSlots<N>; DrawingType::COUNT],
}

impl<const N: usize> Default for SequenceTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SequenceTable<N> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: core::array::from_fn(|_| TypeSlots::new()),
        }
    }

    /// Allocates the next ordinal for `drawing_type`, derives the identity
    /// for `clip_index`, and records `content_hash` against the slot.
    pub fn alloc(
        &mut self,
        drawing_type: DrawingType,
        clip_index: u32,
        content_hash: u64,
    ) -> SequenceId {
        let slots = &mut self.types[drawing_type.index()];
        let item_index = slots.next_index;
        slots.next_index += 1;
        let stored = Stored {
            item_hash: hash_merge3(drawing_type.tag(), item_index, u64::from(clip_index)),
            content_hash,
        };
        let previous = slots.swap(item_index, stored);
        SequenceId {
            item_index,
            item_hash: stored.item_hash,
            is_dirty: previous != Some(stored),
        }
    }

    /// Forgets the stored hash at one ordinal so the next frame reports it
    /// dirty.
    pub fn invalidate(&mut self, drawing_type: DrawingType, item_index: u64) {
        self.types[drawing_type.index()].forget(item_index);
    }

    /// Returns how many ordinals of `drawing_type` were allocated since the
    /// last reset.
    #[must_use]
    pub fn allocated(&self, drawing_type: DrawingType) -> u64 {
        self.types[drawing_type.index()].next_index
    }

    /// Forgets every slot at or beyond the current count of its type.
    ///
    /// Called when a frame is committed; a slot the frame did not reach has
    /// lost its surface.
    pub fn retire_unallocated(&mut self) {
        for slots in &mut self.types {
            let first = slots.next_index;
            slots.retire_from(first);
        }
    }

    /// Restarts ordinal counting while keeping stored hashes.
    ///
    /// Called at the start of every frame.
    pub fn reset_indices(&mut self) {
        for slots in &mut self.types {
            slots.next_index = 0;
        }
    }

    /// Clears ordinals and stored hashes; every slot becomes dirty.
    pub fn reset(&mut self) {
        for slots in &mut self.types {
            slots.clear();
        }
    }
}
