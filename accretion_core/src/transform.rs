// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform used for layer, sublayer, and animation
//! matrices.
//!
//! Composition follows the column-vector convention: `a * b` maps a point
//! through `b` first, then `a`. The `pre_*` / `post_*` helpers mirror the
//! two sides of that product so layer-local transform chains read in the
//! order they are built.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Point;

use crate::geometry::{Point3, Quad};

/// Determinants with a magnitude below this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-8;

/// Coordinate used in place of a point projected behind the viewer.
///
/// Large enough to read as "infinitely far", small enough not to overflow
/// fixed-point consumers downstream.
const PROJECTION_CLAMP: f64 = 1_562_500.0;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* `[x, y, z, w]`; column 3 holds the
/// translation. This matches the layout native compositors expect for
/// their 3-D layer transforms.
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

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Creates a 2-D affine transform from the six CSS `matrix()` terms.
    #[inline]
    #[must_use]
    pub const fn from_affine(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            cols: [
                [a, b, 0.0, 0.0],
                [c, d, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [e, f, 0.0, 1.0],
            ],
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

    /// Creates a rotation around the X axis (radians).
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Y axis (radians).
    #[must_use]
    pub fn from_rotation_y(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `radians` around the axis `(x, y, z)`.
    ///
    /// A zero-length axis yields the identity.
    #[must_use]
    pub fn from_axis_angle(x: f64, y: f64, z: f64, radians: f64) -> Self {
        let len = (x * x + y * y + z * z).sqrt();
        if len == 0.0 || !len.is_finite() {
            return Self::IDENTITY;
        }
        let (x, y, z) = (x / len, y / len, z / len);
        let (s, c) = sin_cos(radians);
        let t = 1.0 - c;
        Self {
            cols: [
                [t * x * x + c, t * x * y + s * z, t * x * z - s * y, 0.0],
                [t * x * y - s * z, t * y * y + c, t * y * z + s * x, 0.0],
                [t * x * z + s * y, t * y * z - s * x, t * z * z + c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a skew transform from two angles in radians.
    #[must_use]
    pub fn from_skew(ax: f64, ay: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][1] = ay.tan();
        m.cols[1][0] = ax.tan();
        m
    }

    /// Creates a perspective projection with the given viewing distance.
    ///
    /// A distance of zero is treated as "no perspective".
    #[must_use]
    pub fn from_perspective(distance: f64) -> Self {
        let mut m = Self::IDENTITY;
        if distance != 0.0 {
            m.cols[2][3] = -1.0 / distance;
        }
        m
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

    /// Returns `true` if this is exactly the identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Is every element of this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Returns `self * translate(x, y, z)`: the translation is applied to
    /// points before this transform.
    #[must_use]
    pub fn pre_translate(self, x: f64, y: f64, z: f64) -> Self {
        self * Self::from_translation(x, y, z)
    }

    /// Returns `translate(x, y, z) * self`: the translation is applied to
    /// points after this transform.
    #[must_use]
    pub fn post_translate(self, x: f64, y: f64, z: f64) -> Self {
        Self::from_translation(x, y, z) * self
    }

    /// The determinant of the full 4×4 matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let (cof, _) = self.cofactors();
        let m = &self.cols;
        m[0][0] * cof[0][0] + m[1][0] * cof[1][0] + m[2][0] * cof[2][0] + m[3][0] * cof[3][0]
    }

    /// Returns `true` if the matrix can be inverted without loss.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        if self.is_identity_or_translation() {
            return true;
        }
        self.determinant().abs() >= SINGULAR_EPSILON
    }

    /// Returns the inverse, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if self.is_identity_or_translation() {
            let t = self.cols[3];
            return Some(Self::from_translation(-t[0], -t[1], -t[2]));
        }
        let (cof, det) = self.cofactors();
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }
        // The inverse is the transposed cofactor matrix over the determinant.
        let mut out = [[0.0_f64; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = cof[r][c] / det;
            }
        }
        Some(Self { cols: out })
    }

    /// Maps a 3-D point, performing the homogeneous divide.
    #[must_use]
    pub fn map_point3(&self, p: Point3) -> Point3 {
        let m = &self.cols;
        let x = m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0];
        let y = m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1];
        let z = m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2];
        let w = m[0][3] * p.x + m[1][3] * p.y + m[2][3] * p.z + m[3][3];
        if w != 1.0 && w != 0.0 {
            Point3::new(x / w, y / w, z / w)
        } else {
            Point3::new(x, y, z)
        }
    }

    /// Projects a point in the z = 0 plane of the source space through this
    /// transform back onto the z = 0 plane of the destination.
    ///
    /// Returns the projected point and whether it had to be clamped because
    /// it landed behind the viewer.
    #[must_use]
    pub fn project_point(&self, p: Point) -> (Point, bool) {
        let m = &self.cols;
        if m[2][2] == 0.0 {
            return (Point::ZERO, false);
        }
        let (x, y) = (p.x, p.y);
        let z = -(m[0][2] * x + m[1][2] * y + m[3][2]) / m[2][2];
        let mut out_x = x * m[0][0] + y * m[1][0] + z * m[2][0] + m[3][0];
        let mut out_y = x * m[0][1] + y * m[1][1] + z * m[2][1] + m[3][1];
        let w = x * m[0][3] + y * m[1][3] + z * m[2][3] + m[3][3];
        if w <= 0.0 {
            out_x = PROJECTION_CLAMP.copysign(out_x);
            out_y = PROJECTION_CLAMP.copysign(out_y);
            return (Point::new(out_x, out_y), true);
        }
        if w != 1.0 {
            out_x /= w;
            out_y /= w;
        }
        (Point::new(out_x, out_y), false)
    }

    /// Projects all four corners of `quad`; see [`project_point`](Self::project_point).
    #[must_use]
    pub fn project_quad(&self, quad: &Quad) -> (Quad, bool) {
        let mut clamped = false;
        let mut points = quad.points;
        for p in &mut points {
            let (mapped, c) = self.project_point(*p);
            *p = mapped;
            clamped |= c;
        }
        (Quad { points }, clamped)
    }

    fn is_identity_or_translation(&self) -> bool {
        let m = &self.cols;
        m[0] == [1.0, 0.0, 0.0, 0.0]
            && m[1] == [0.0, 1.0, 0.0, 0.0]
            && m[2] == [0.0, 0.0, 1.0, 0.0]
            && m[3][3] == 1.0
    }

    /// Returns the cofactor matrix (indexed `[col][row]`) and the determinant.
    fn cofactors(&self) -> ([[f64; 4]; 4], f64) {
        let m = &self.cols;
        let mut cof = [[0.0_f64; 4]; 4];
        for (c, cof_col) in cof.iter_mut().enumerate() {
            for (r, v) in cof_col.iter_mut().enumerate() {
                let minor = minor3(m, c, r);
                *v = if (c + r) % 2 == 0 { minor } else { -minor };
            }
        }
        let det =
            m[0][0] * cof[0][0] + m[1][0] * cof[1][0] + m[2][0] * cof[2][0] + m[3][0] * cof[3][0];
        (cof, det)
    }
}

/// Determinant of the 3×3 matrix left after removing column `skip_c` and
/// row `skip_r`.
fn minor3(m: &[[f64; 4]; 4], skip_c: usize, skip_r: usize) -> f64 {
    let mut sub = [[0.0_f64; 3]; 3];
    let mut ci = 0;
    for (c, col) in m.iter().enumerate() {
        if c == skip_c {
            continue;
        }
        let mut ri = 0;
        for (r, v) in col.iter().enumerate() {
            if r == skip_r {
                continue;
            }
            sub[ci][ri] = *v;
            ri += 1;
        }
        ci += 1;
    }
    sub[0][0] * (sub[1][1] * sub[2][2] - sub[2][1] * sub[1][2])
        - sub[1][0] * (sub[0][1] * sub[2][2] - sub[2][1] * sub[0][2])
        + sub[2][0] * (sub[0][1] * sub[1][2] - sub[1][1] * sub[0][2])
}

#[inline]
fn sin_cos(radians: f64) -> (f64, f64) {
    #[cfg(feature = "std")]
    {
        radians.sin_cos()
    }
    #[cfg(not(feature = "std"))]
    {
        (radians.sin(), radians.cos())
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

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &Transform3d, b: &Transform3d) -> bool {
        a.cols
            .iter()
            .flatten()
            .zip(b.cols.iter().flatten())
            .all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn translation_composition() {
        let c = Transform3d::from_translation(1.0, 0.0, 0.0)
            * Transform3d::from_translation(0.0, 2.0, 0.0);
        assert_eq!(c.col(3), [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn pre_and_post_translate_order() {
        let s = Transform3d::from_scale(2.0, 2.0, 1.0);
        // Translating before scaling doubles the offset.
        assert_eq!(s.pre_translate(3.0, 0.0, 0.0).col(3), [6.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.post_translate(3.0, 0.0, 0.0).col(3), [3.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform3d::from_translation(5.0, -2.0, 1.0)
            * Transform3d::from_rotation_z(0.7)
            * Transform3d::from_scale(2.0, 3.0, 1.0);
        let inv = t.inverse().expect("transform should be invertible");
        assert!(approx(&(t * inv), &Transform3d::IDENTITY), "t * t^-1 should be identity");
        assert!(approx(&(inv * t), &Transform3d::IDENTITY), "t^-1 * t should be identity");
    }

    #[test]
    fn zero_scale_is_singular() {
        let t = Transform3d::from_scale(0.0, 1.0, 1.0);
        assert!(!t.is_invertible());
        assert!(t.inverse().is_none());
        assert_eq!(t.determinant(), 0.0);
    }

    #[test]
    fn translation_inverse_is_negated() {
        let t = Transform3d::from_translation(4.0, 5.0, 6.0);
        assert_eq!(
            t.inverse(),
            Some(Transform3d::from_translation(-4.0, -5.0, -6.0))
        );
    }

    #[test]
    fn rotation_z_ninety_degrees() {
        let r = Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2);
        let p = r.map_point3(Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-9 && (p.y - 1.0).abs() < 1e-9, "got {p:?}");
    }

    #[test]
    fn axis_angle_matches_principal_axes() {
        let a = 0.4;
        assert!(approx(
            &Transform3d::from_axis_angle(0.0, 0.0, 1.0, a),
            &Transform3d::from_rotation_z(a)
        ));
        assert!(approx(
            &Transform3d::from_axis_angle(1.0, 0.0, 0.0, a),
            &Transform3d::from_rotation_x(a)
        ));
        assert!(approx(
            &Transform3d::from_axis_angle(0.0, 2.0, 0.0, a),
            &Transform3d::from_rotation_y(a)
        ));
        assert!(Transform3d::from_axis_angle(0.0, 0.0, 0.0, a).is_identity());
    }

    #[test]
    fn project_point_through_affine() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0);
        let (p, clamped) = t.project_point(Point::new(1.0, 2.0));
        assert_eq!(p, Point::new(11.0, 22.0));
        assert!(!clamped);
    }

    #[test]
    fn project_point_behind_viewer_is_clamped() {
        let mut t = Transform3d::IDENTITY;
        t.cols[3][3] = -1.0;
        let (p, clamped) = t.project_point(Point::new(1.0, -1.0));
        assert!(clamped);
        assert_eq!(p, Point::new(PROJECTION_CLAMP, -PROJECTION_CLAMP));
    }

    #[test]
    fn infinity_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[0][3] = f64::INFINITY;
        assert!(!t.is_finite());
        assert!(Transform3d::IDENTITY.is_finite());
    }
}
