// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip shape types for clip scopes.

use crate::hash::{ContentHasher, hash4_floats};

/// A shape used to clip every command recorded inside its scope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipShape {
    /// An axis-aligned rectangle.
    Rect(kurbo::Rect),
    /// A rectangle with rounded corners.
    RoundedRect(kurbo::RoundedRect),
}

impl ClipShape {
    /// Returns the bounding rectangle of the shape.
    #[must_use]
    pub fn bounds(&self) -> kurbo::Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(r) => r.rect(),
        }
    }

    /// Hashes the shape's geometry for use as a clip content hash.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "content hashes are computed at the f32 precision the framework emits"
    )]
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        match self {
            Self::Rect(r) => hash4_floats(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32),
            Self::RoundedRect(r) => {
                let rect = r.rect();
                let radii = r.radii();
                ContentHasher::new()
                    .floats(&[rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32])
                    .floats(&[
                        radii.top_left as f32,
                        radii.top_right as f32,
                        radii.bottom_right as f32,
                        radii.bottom_left as f32,
                    ])
                    .finish()
            }
        }
    }
}
