// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-keyed handle pools and the cross-recorder reuse cache.
//!
//! A recorder keeps two [`Pool`]s: one mapping draw identities to native
//! surfaces and one mapping clip identities to clip views. Entries survive
//! from frame to frame for as long as their identity keeps being recorded.
//!
//! [`ReuseCache`] is the second tier. Surfaces evicted by one recorder are
//! parked there, bucketed by [`DrawingType`], so another recorder (or the same
//! one, later) can pick them up instead of asking the platform for a new one.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::item::DrawingType;

/// A pooled handle and the drawing type it was created for.
#[derive(Debug)]
pub struct PoolEntry<H> {
    /// The native handle.
    pub handle: H,
    /// Drawing type the handle was created for.
    pub drawing_type: DrawingType,
}

/// Identity-keyed map of native handles owned by one recorder.
#[derive(Debug)]
pub struct Pool<H> {
    entries: HashMap<u64, PoolEntry<H>>,
}

/// Pool of paintable surfaces keyed by item identity.
pub type LayerPool<S> = Pool<S>;

/// Pool of clip views keyed by clip identity.
pub type ClipPool<C> = Pool<C>;

impl<H> Default for Pool<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Pool<H> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Number of pooled handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether `key` has a pooled handle.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Returns the handle for `key`.
    #[must_use]
    pub fn get(&self, key: u64) -> Option<&H> {
        self.entries.get(&key).map(|e| &e.handle)
    }

    /// Returns the handle for `key` mutably.
    pub fn get_mut(&mut self, key: u64) -> Option<&mut H> {
        self.entries.get_mut(&key).map(|e| &mut e.handle)
    }

    /// Pools `handle` under `key`, returning any handle it displaced.
    pub fn insert(&mut self, key: u64, drawing_type: DrawingType, handle: H) -> Option<PoolEntry<H>> {
        self.entries.insert(
            key,
            PoolEntry {
                handle,
                drawing_type,
            },
        )
    }

    /// Removes and returns the entry for `key`.
    pub fn remove(&mut self, key: u64) -> Option<PoolEntry<H>> {
        self.entries.remove(&key)
    }

    /// Iterates over pooled identity keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    /// Removes every entry whose key fails `keep`, returning them.
    pub fn evict_unless(&mut self, mut keep: impl FnMut(u64) -> bool) -> Vec<(u64, PoolEntry<H>)> {
        let stale: Vec<u64> = self.entries.keys().copied().filter(|&k| !keep(k)).collect();
        stale
            .into_iter()
            .filter_map(|k| self.entries.remove(&k).map(|e| (k, e)))
            .collect()
    }

    /// Removes every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (u64, PoolEntry<H>)> + '_ {
        self.entries.drain()
    }
}

/// Default number of parked surfaces per drawing type in a [`ReuseCache`].
pub const DEFAULT_REUSE_CAPACITY: usize = 16;

/// Bounded, per-type queue of detached surfaces awaiting reuse.
#[derive(Debug)]
pub struct ReuseCache<S> {
    buckets: [VecDeque<S>; DrawingType::COUNT],
    capacity: usize,
}

impl<S> Default for ReuseCache<S> {
    fn default() -> Self {
        Self::new(DEFAULT_REUSE_CAPACITY)
    }
}

impl<S> ReuseCache<S> {
    /// Creates a cache holding at most `capacity` surfaces per drawing type.
    ///
    /// A capacity of 0 disables reuse; every enqueue is refused.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buckets: core::array::from_fn(|_| VecDeque::new()),
            capacity,
        }
    }

    /// Per-type capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of parked surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    /// Returns `true` if nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(VecDeque::is_empty)
    }

    /// Number of parked surfaces of one type.
    #[must_use]
    pub fn len_of(&self, drawing_type: DrawingType) -> usize {
        self.buckets[drawing_type.index()].len()
    }

    /// Parks `surface` for later reuse.
    ///
    /// # Errors
    ///
    /// Returns the surface back when the bucket for `drawing_type` is full;
    /// the caller is then responsible for destroying it.
    pub fn enqueue(&mut self, drawing_type: DrawingType, surface: S) -> Result<(), S> {
        let bucket = &mut self.buckets[drawing_type.index()];
        if bucket.len() >= self.capacity {
            return Err(surface);
        }
        bucket.push_back(surface);
        Ok(())
    }

    /// Takes the oldest parked surface of `drawing_type`, if any.
    pub fn dequeue(&mut self, drawing_type: DrawingType) -> Option<S> {
        self.buckets[drawing_type.index()].pop_front()
    }

    /// Removes every parked surface, for destruction by the caller.
    pub fn drain(&mut self) -> impl Iterator<Item = (DrawingType, S)> + '_ {
        DrawingType::ALL
            .iter()
            .zip(self.buckets.iter_mut())
            .flat_map(|(&t, bucket)| bucket.drain(..).map(move |s| (t, s)))
    }
}
