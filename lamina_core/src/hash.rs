// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic content and identity hashing.
//!
//! Two families of functions live here:
//!
//! - **Content hashing**: [`hash_floats`] (and its fixed-arity helpers) feeds
//!   primitive arguments through xxHash64 with seed 0. Equal content hashes are
//!   the only signal the recorder uses to skip a repaint, so every function is
//!   pure and stable across calls and processes.
//! - **Merging**: [`hash_merge`] and [`hash_merge3`] fold already-hashed or
//!   small integer values with FNV-1a. They are order sensitive and are used
//!   both to compose paint attributes and to build identity keys from a
//!   drawing type and an ordinal.
//!
//! [`ContentHasher`] strings these together for argument sets that mix floats,
//! colors, and flags.

use core::hash::Hasher as _;

use twox_hash::XxHash64;

/// Seed of the running frame hash and of every FNV-1a fold.
pub const INITIAL_HASH: u64 = 0x811c_9dc5;

const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hashes a sequence of floats with xxHash64 (seed 0).
///
/// Floats are hashed by their little-endian bit patterns, so `0.0` and `-0.0`
/// hash differently.
#[must_use]
pub fn hash_floats(values: &[f32]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for v in values {
        hasher.write(&v.to_le_bytes());
    }
    hasher.finish()
}

/// Hashes four floats, typically a rectangle or a line segment.
#[inline]
#[must_use]
pub fn hash4_floats(a: f32, b: f32, c: f32, d: f32) -> u64 {
    hash_floats(&[a, b, c, d])
}

/// Hashes six floats, typically a rectangle plus a corner radius pair.
#[inline]
#[must_use]
pub fn hash6_floats(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> u64 {
    hash_floats(&[a, b, c, d, e, f])
}

/// Hashes eight floats, typically a source and destination rectangle.
#[inline]
#[must_use]
pub fn hash8_floats(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32, g: f32, h: f32) -> u64 {
    hash_floats(&[a, b, c, d, e, f, g, h])
}

/// Hashes a packed color value.
#[inline]
#[must_use]
pub fn hash_color(color: u64) -> u64 {
    fnv_fold(INITIAL_HASH, color)
}

/// Combines two values into one hash. `hash_merge(a, b) != hash_merge(b, a)`
/// in general.
#[inline]
#[must_use]
pub const fn hash_merge(a: u64, b: u64) -> u64 {
    fnv_fold(fnv_fold(INITIAL_HASH, a), b)
}

/// Combines three values into one hash, in order.
#[inline]
#[must_use]
pub const fn hash_merge3(a: u64, b: u64, c: u64) -> u64 {
    fnv_fold(fnv_fold(fnv_fold(INITIAL_HASH, a), b), c)
}

/// Folds the little-endian bytes of `value` into `hash` with FNV-1a.
#[inline]
const fn fnv_fold(mut hash: u64, value: u64) -> u64 {
    let bytes = value.to_le_bytes();
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Incremental builder for content hashes over mixed argument sets.
///
/// ```
/// use lamina_core::hash::ContentHasher;
///
/// let a = ContentHasher::new().floats(&[0.0, 0.0, 10.0, 10.0]).color(0xff00_00ff).finish();
/// let b = ContentHasher::new().floats(&[0.0, 0.0, 10.0, 10.0]).color(0xff00_00ff).finish();
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    state: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    /// Starts a new hash at [`INITIAL_HASH`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: INITIAL_HASH,
        }
    }

    /// Folds in a raw 64-bit value.
    #[must_use]
    pub const fn u64(self, value: u64) -> Self {
        Self {
            state: fnv_fold(self.state, value),
        }
    }

    /// Folds in a single float.
    #[must_use]
    pub const fn float(self, value: f32) -> Self {
        self.u64(value.to_bits() as u64)
    }

    /// Folds in a float slice as one xxHash64 digest.
    #[must_use]
    pub fn floats(self, values: &[f32]) -> Self {
        self.u64(hash_floats(values))
    }

    /// Folds in a packed color.
    #[must_use]
    pub fn color(self, color: u64) -> Self {
        self.u64(hash_color(color))
    }

    /// Folds in a flag.
    #[must_use]
    pub const fn bool(self, value: bool) -> Self {
        self.u64(value as u64)
    }

    /// Returns the accumulated hash.
    #[must_use]
    pub const fn finish(self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_floats_matches_oneshot_over_packed_bytes() {
        let values = [1.0_f32, 2.5, -3.0, 100.0];
        let mut packed = [0_u8; 16];
        for (chunk, v) in packed.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        assert_eq!(hash_floats(&values), XxHash64::oneshot(0, &packed));
    }

    #[test]
    fn fixed_arity_helpers_agree_with_slices() {
        assert_eq!(
            hash4_floats(1.0, 2.0, 3.0, 4.0),
            hash_floats(&[1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(
            hash8_floats(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0),
            hash_floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
        );
    }

    #[test]
    fn float_order_matters() {
        assert_ne!(
            hash4_floats(1.0, 2.0, 3.0, 4.0),
            hash4_floats(2.0, 1.0, 3.0, 4.0)
        );
    }

    #[test]
    fn merge_is_order_sensitive() {
        assert_ne!(hash_merge(1, 2), hash_merge(2, 1));
        assert_ne!(hash_merge3(1, 2, 3), hash_merge3(3, 2, 1));
        assert_eq!(hash_merge3(7, 8, 9), hash_merge3(7, 8, 9));
    }

    #[test]
    fn builder_distinguishes_flags() {
        let base = ContentHasher::new().float(1.0);
        assert_ne!(base.bool(true).finish(), base.bool(false).finish());
    }
}
