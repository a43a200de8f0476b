// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded drawing commands.

use core::fmt;

/// The kind of a recorded command.
///
/// Every non-structural kind is backed by its own native surface. Shader
/// variants are distinct kinds so that a gradient-filled primitive never
/// shares a surface with a solid-filled one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DrawingType {
    /// Axis-aligned or rounded rectangle.
    Rect,
    /// Rectangle filled with a shader.
    ShaderRect,
    /// Line segment.
    Line,
    /// Line segment stroked with a shader.
    ShaderLine,
    /// Oval inscribed in a rectangle.
    Oval,
    /// Oval filled with a shader.
    ShaderOval,
    /// Circle.
    Circle,
    /// Circle filled with a shader.
    ShaderCircle,
    /// Arc or pie slice.
    Arc,
    /// Arc filled with a shader.
    ShaderArc,
    /// Arbitrary path.
    Path,
    /// Path filled with a shader.
    ShaderPath,
    /// Image drawn at its natural size.
    Image,
    /// Image drawn through a shader.
    ShaderImage,
    /// Sub-rectangle of an image scaled into a destination rectangle.
    ImageRect,
    /// Image decoded from raw pixel data (text bitmaps, for example).
    ImageData,
    /// Point list.
    Points,
    /// Point list drawn with a shader.
    ShaderPoints,
    /// Flat float array of points.
    RawPoints,
    /// Flat float array of points drawn with a shader.
    ShaderRawPoints,
    /// Flat float array of triangle vertices.
    RawVertices,
    /// Triangle vertices drawn with a shader.
    ShaderRawVertices,
    /// An externally owned layer embedded as-is; owns no surface.
    DrawLayer,
    /// Structural: explicit save.
    Save,
    /// Structural: explicit restore.
    Restore,
    /// Structural: clip scope opener; owns a clip view.
    Clip,
    /// Structural: clip scope closer.
    Pop,
}

impl DrawingType {
    /// Number of drawing types; sizes per-type tables.
    pub const COUNT: usize = Self::Pop as usize + 1;

    /// Every drawing type, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Rect,
        Self::ShaderRect,
        Self::Line,
        Self::ShaderLine,
        Self::Oval,
        Self::ShaderOval,
        Self::Circle,
        Self::ShaderCircle,
        Self::Arc,
        Self::ShaderArc,
        Self::Path,
        Self::ShaderPath,
        Self::Image,
        Self::ShaderImage,
        Self::ImageRect,
        Self::ImageData,
        Self::Points,
        Self::ShaderPoints,
        Self::RawPoints,
        Self::ShaderRawPoints,
        Self::RawVertices,
        Self::ShaderRawVertices,
        Self::DrawLayer,
        Self::Save,
        Self::Restore,
        Self::Clip,
        Self::Pop,
    ];

    /// Returns the type with dense index `index`.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Returns the dense index of this type, in `0..COUNT`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the tag folded into identity keys.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u64 {
        self as u64
    }

    /// Returns `true` for save, restore, clip, and pop markers.
    #[inline]
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Save | Self::Restore | Self::Clip | Self::Pop)
    }

    /// Returns `true` if items of this type are painted into a surface.
    ///
    /// External layers are placed but never painted.
    #[inline]
    #[must_use]
    pub const fn owns_surface(self) -> bool {
        !self.is_structural() && !matches!(self, Self::DrawLayer)
    }

    /// Returns `true` for the shader-filled variants.
    #[must_use]
    pub const fn is_shader(self) -> bool {
        matches!(
            self,
            Self::ShaderRect
                | Self::ShaderLine
                | Self::ShaderOval
                | Self::ShaderCircle
                | Self::ShaderArc
                | Self::ShaderPath
                | Self::ShaderImage
                | Self::ShaderPoints
                | Self::ShaderRawPoints
                | Self::ShaderRawVertices
        )
    }

    /// Maps a plain primitive to its shader variant.
    ///
    /// Types without a shader variant are returned unchanged.
    #[must_use]
    pub const fn with_shader(self) -> Self {
        match self {
            Self::Rect => Self::ShaderRect,
            Self::Line => Self::ShaderLine,
            Self::Oval => Self::ShaderOval,
            Self::Circle => Self::ShaderCircle,
            Self::Arc => Self::ShaderArc,
            Self::Path => Self::ShaderPath,
            Self::Image => Self::ShaderImage,
            Self::Points => Self::ShaderPoints,
            Self::RawPoints => Self::ShaderRawPoints,
            Self::RawVertices => Self::ShaderRawVertices,
            other => other,
        }
    }
}

/// One recorded command in a frame's sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawingItem {
    /// Positional identity, stable across frames for the same command slot.
    pub item_hash: u64,
    /// Hash of the command's paint and geometry arguments.
    pub content_hash: u64,
    /// Kind of command.
    pub drawing_type: DrawingType,
    /// Clip nesting index of the command; 0 outside any clip.
    pub clip_index: u32,
    /// Whether the content differs from the same slot in the previous frame.
    pub is_dirty: bool,
}

impl fmt::Debug for DrawingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DrawingItem({:?} #{:016x} content={:016x} clip={}{})",
            self.drawing_type,
            self.item_hash,
            self.content_hash,
            self.clip_index,
            if self.is_dirty { " dirty" } else { "" },
        )
    }
}
