// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform carried by save scopes.
//!
//! Drawing commands are recorded in the coordinate space of the innermost
//! save scope. Scopes compose translate, scale, and rotate calls into a
//! [`Transform3d`], which is what a native layer ultimately receives (for
//! example as a `CATransform3D`).

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by Core Animation's `CATransform3D`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        #[cfg(feature = "std")]
        let (s, c) = radians.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Converts a 2-D [`kurbo::Affine`] into a transform in the Z = 0 plane.
    #[must_use]
    pub fn from_affine(affine: kurbo::Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self::from_cols(
            [a, b, 0.0, 0.0],
            [c, d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [e, f, 0.0, 1.0],
        )
    }

    /// Projects this transform onto the XY plane as a [`kurbo::Affine`].
    ///
    /// Z and perspective terms are dropped.
    #[must_use]
    pub fn to_affine(self) -> kurbo::Affine {
        let c = &self.cols;
        kurbo::Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1]])
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the XY translation component.
    #[inline]
    #[must_use]
    pub const fn translation(self) -> (f64, f64) {
        (self.cols[3][0], self.cols[3][1])
    }

    /// Applies a translation in this transform's local frame (`self * T`).
    #[must_use]
    pub fn pre_translate(self, dx: f64, dy: f64) -> Self {
        self * Self::from_translation(dx, dy, 0.0)
    }

    /// Applies a scale in this transform's local frame (`self * S`).
    #[must_use]
    pub fn pre_scale(self, sx: f64, sy: f64) -> Self {
        self * Self::from_scale(sx, sy, 1.0)
    }

    /// Applies a Z rotation, in degrees, in this transform's local frame.
    #[must_use]
    pub fn pre_rotate_degrees(self, degrees: f64) -> Self {
        self * Self::from_rotation_z(degrees.to_radians())
    }

    /// Maps a point in the Z = 0 plane through this transform.
    #[must_use]
    pub fn map_point(self, p: kurbo::Point) -> kurbo::Point {
        self.to_affine() * p
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}
