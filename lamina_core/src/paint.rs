// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint attributes and their content hash.
//!
//! The declarative framework hands every primitive a paint. Two paints that
//! hash equal must render identically, so every attribute that affects the
//! output is folded into [`Paint::content_hash`].

use alloc::vec::Vec;

use crate::hash::ContentHasher;
use crate::item::DrawingType;

/// How a primitive's geometry is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintStyle {
    /// Fill the interior.
    #[default]
    Fill,
    /// Stroke the outline.
    Stroke,
}

/// Stroke end cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeCap {
    /// Flat, ending at the endpoint.
    #[default]
    Butt,
    /// Semicircle past the endpoint.
    Round,
    /// Half-square past the endpoint.
    Square,
}

/// Stroke corner join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeJoin {
    /// Sharp corner, limited by the miter limit.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Cut-off corner.
    Bevel,
}

/// Porter-Duff and separable blend modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "standard blend mode names")]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Modulate,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Multiply,
}

/// Gradient shaders.
#[derive(Clone, Debug, PartialEq)]
pub enum Shader {
    /// Linear gradient between two points.
    Linear {
        /// Start point.
        from: kurbo::Point,
        /// End point.
        to: kurbo::Point,
        /// Packed colors.
        colors: Vec<u64>,
        /// Color stops in `0.0..=1.0`; empty means evenly spaced.
        stops: Vec<f32>,
    },
    /// Radial gradient around a center.
    Radial {
        /// Center.
        center: kurbo::Point,
        /// Radius.
        radius: f64,
        /// Packed colors.
        colors: Vec<u64>,
        /// Color stops in `0.0..=1.0`; empty means evenly spaced.
        stops: Vec<f32>,
    },
}

impl Shader {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "geometry is hashed at f32 precision"
    )]
    fn hash_into(&self, hasher: ContentHasher) -> ContentHasher {
        let (kind, geometry, colors, stops) = match self {
            Self::Linear {
                from,
                to,
                colors,
                stops,
            } => (
                1,
                [from.x as f32, from.y as f32, to.x as f32, to.y as f32],
                colors,
                stops,
            ),
            Self::Radial {
                center,
                radius,
                colors,
                stops,
            } => (
                2,
                [center.x as f32, center.y as f32, *radius as f32, 0.0],
                colors,
                stops,
            ),
        };
        let mut hasher = hasher.u64(kind).floats(&geometry).floats(stops);
        for &c in colors {
            hasher = hasher.color(c);
        }
        hasher
    }
}

/// Paint attributes of one primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    /// Packed color (framework color value).
    pub color: u64,
    /// Alpha multiplier in `0.0..=1.0`.
    pub alpha: f32,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Fill or stroke.
    pub style: PaintStyle,
    /// Stroke width; ignored when filling.
    pub stroke_width: f32,
    /// Stroke cap.
    pub stroke_cap: StrokeCap,
    /// Stroke join.
    pub stroke_join: StrokeJoin,
    /// Miter limit for [`StrokeJoin::Miter`].
    pub stroke_miter: f32,
    /// Whether edges are anti-aliased.
    pub anti_alias: bool,
    /// Optional gradient replacing `color`.
    pub shader: Option<Shader>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: 0xff00_0000_0000_0000,
            alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
            style: PaintStyle::Fill,
            stroke_width: 0.0,
            stroke_cap: StrokeCap::Butt,
            stroke_join: StrokeJoin::Miter,
            stroke_miter: 4.0,
            anti_alias: true,
            shader: None,
        }
    }
}

impl Paint {
    /// Hashes every attribute that affects rendering.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let hasher = ContentHasher::new()
            .color(self.color)
            .float(self.alpha)
            .u64(self.blend_mode as u64)
            .u64(self.style as u64)
            .bool(self.anti_alias);
        let hasher = match self.style {
            PaintStyle::Fill => hasher,
            PaintStyle::Stroke => hasher
                .float(self.stroke_width)
                .u64(self.stroke_cap as u64)
                .u64(self.stroke_join as u64)
                .float(self.stroke_miter),
        };
        match &self.shader {
            Some(shader) => shader.hash_into(hasher).finish(),
            None => hasher.finish(),
        }
    }

    /// Picks the drawing type for a primitive of kind `base` painted with
    /// this paint.
    #[must_use]
    pub fn drawing_type(&self, base: DrawingType) -> DrawingType {
        if self.shader.is_some() {
            base.with_shader()
        } else {
            base
        }
    }
}
