// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolved transform function lists.

use alloc::vec::Vec;

use kurbo::Size;

use crate::geometry::Point3;
use crate::transform::Transform3d;

use super::PlatformValue;

/// A length that may be relative to the layer box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    /// Absolute pixels.
    Px(f64),
    /// Percentage of the reference dimension.
    Percent(f64),
}

impl Length {
    /// Resolves against `reference` pixels.
    #[must_use]
    pub fn resolve(self, reference: f64) -> f64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(p) => p / 100.0 * reference,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

/// One transform function. Angles are in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformOperation {
    /// `scaleX()`.
    ScaleX(f64),
    /// `scaleY()`.
    ScaleY(f64),
    /// `scaleZ()`.
    ScaleZ(f64),
    /// `scale()`.
    Scale(f64, f64),
    /// `scale3d()`.
    Scale3d(f64, f64, f64),
    /// `translateX()`.
    TranslateX(Length),
    /// `translateY()`.
    TranslateY(Length),
    /// `translateZ()`.
    TranslateZ(Length),
    /// `translate()`.
    Translate(Length, Length),
    /// `translate3d()`.
    Translate3d(Length, Length, Length),
    /// `rotateX()`.
    RotateX(f64),
    /// `rotateY()`.
    RotateY(f64),
    /// `rotateZ()`.
    RotateZ(f64),
    /// `rotate()`.
    Rotate(f64),
    /// `rotate3d()`.
    Rotate3d {
        /// Axis x.
        x: f64,
        /// Axis y.
        y: f64,
        /// Axis z.
        z: f64,
        /// Angle in degrees.
        angle: f64,
    },
    /// `skewX()`.
    SkewX(f64),
    /// `skewY()`.
    SkewY(f64),
    /// `skew()`.
    Skew(f64, f64),
    /// `matrix()` or `matrix3d()`.
    Matrix(Transform3d),
    /// `perspective()`.
    Perspective(f64),
}

/// The function name of a [`TransformOperation`], without arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "variants mirror TransformOperation")]
pub enum TransformOperationKind {
    ScaleX,
    ScaleY,
    ScaleZ,
    Scale,
    Scale3d,
    TranslateX,
    TranslateY,
    TranslateZ,
    Translate,
    Translate3d,
    RotateX,
    RotateY,
    RotateZ,
    Rotate,
    Rotate3d,
    SkewX,
    SkewY,
    Skew,
    Matrix,
    Perspective,
}

/// The transform component a native value represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "names are the native component names")]
pub enum ValueFunction {
    RotateX,
    RotateY,
    RotateZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    Scale,
    TranslateX,
    TranslateY,
    TranslateZ,
    Translate,
}

impl TransformOperationKind {
    /// Value function that interpolates this component natively.
    #[must_use]
    pub const fn value_function(self) -> Option<ValueFunction> {
        Some(match self {
            Self::RotateX => ValueFunction::RotateX,
            Self::RotateY => ValueFunction::RotateY,
            Self::Rotate | Self::RotateZ => ValueFunction::RotateZ,
            Self::ScaleX => ValueFunction::ScaleX,
            Self::ScaleY => ValueFunction::ScaleY,
            Self::ScaleZ => ValueFunction::ScaleZ,
            Self::Scale | Self::Scale3d => ValueFunction::Scale,
            Self::TranslateX => ValueFunction::TranslateX,
            Self::TranslateY => ValueFunction::TranslateY,
            Self::TranslateZ => ValueFunction::TranslateZ,
            Self::Translate | Self::Translate3d => ValueFunction::Translate,
            _ => return None,
        })
    }

    /// Returns `true` for rotations.
    #[must_use]
    pub const fn is_rotation(self) -> bool {
        matches!(
            self,
            Self::RotateX | Self::RotateY | Self::RotateZ | Self::Rotate | Self::Rotate3d
        )
    }

    /// Component value of `op` (or of the identity when `op` is absent), in
    /// the representation the native value function for this kind expects.
    ///
    /// Kinds without a value function produce a matrix.
    #[must_use]
    pub fn component_value(self, op: Option<&TransformOperation>, size: Size) -> PlatformValue {
        use TransformOperation as Op;
        let number = |v: f64| PlatformValue::Number(v);
        match self {
            Self::RotateX | Self::RotateY | Self::RotateZ | Self::Rotate => {
                number(op.and_then(TransformOperation::angle).unwrap_or(0.0).to_radians())
            }
            Self::ScaleX => number(match op {
                Some(Op::ScaleX(x)) => *x,
                _ => 1.0,
            }),
            Self::ScaleY => number(match op {
                Some(Op::ScaleY(y)) => *y,
                _ => 1.0,
            }),
            Self::ScaleZ => number(match op {
                Some(Op::ScaleZ(z)) => *z,
                _ => 1.0,
            }),
            Self::TranslateX => number(match op {
                Some(Op::TranslateX(x)) => x.resolve(size.width),
                _ => 0.0,
            }),
            Self::TranslateY => number(match op {
                Some(Op::TranslateY(y)) => y.resolve(size.height),
                _ => 0.0,
            }),
            Self::TranslateZ => number(match op {
                Some(Op::TranslateZ(z)) => z.resolve(0.0),
                _ => 0.0,
            }),
            Self::Scale | Self::Scale3d => PlatformValue::Point3(match op {
                Some(Op::Scale(x, y)) => Point3::new(*x, *y, 1.0),
                Some(Op::Scale3d(x, y, z)) => Point3::new(*x, *y, *z),
                _ => Point3::new(1.0, 1.0, 1.0),
            }),
            Self::Translate | Self::Translate3d => PlatformValue::Point3(match op {
                Some(Op::Translate(x, y)) => {
                    Point3::new(x.resolve(size.width), y.resolve(size.height), 0.0)
                }
                Some(Op::Translate3d(x, y, z)) => Point3::new(
                    x.resolve(size.width),
                    y.resolve(size.height),
                    z.resolve(0.0),
                ),
                _ => Point3::ZERO,
            }),
            _ => PlatformValue::Matrix(op.map_or(Transform3d::IDENTITY, |op| op.apply(size))),
        }
    }
}

impl TransformOperation {
    /// The function name.
    #[must_use]
    pub const fn kind(&self) -> TransformOperationKind {
        use TransformOperationKind as K;
        match self {
            Self::ScaleX(_) => K::ScaleX,
            Self::ScaleY(_) => K::ScaleY,
            Self::ScaleZ(_) => K::ScaleZ,
            Self::Scale(..) => K::Scale,
            Self::Scale3d(..) => K::Scale3d,
            Self::TranslateX(_) => K::TranslateX,
            Self::TranslateY(_) => K::TranslateY,
            Self::TranslateZ(_) => K::TranslateZ,
            Self::Translate(..) => K::Translate,
            Self::Translate3d(..) => K::Translate3d,
            Self::RotateX(_) => K::RotateX,
            Self::RotateY(_) => K::RotateY,
            Self::RotateZ(_) => K::RotateZ,
            Self::Rotate(_) => K::Rotate,
            Self::Rotate3d { .. } => K::Rotate3d,
            Self::SkewX(_) => K::SkewX,
            Self::SkewY(_) => K::SkewY,
            Self::Skew(..) => K::Skew,
            Self::Matrix(_) => K::Matrix,
            Self::Perspective(_) => K::Perspective,
        }
    }

    /// Rotation angle in degrees, for rotations.
    #[must_use]
    pub const fn angle(&self) -> Option<f64> {
        match self {
            Self::RotateX(a) | Self::RotateY(a) | Self::RotateZ(a) | Self::Rotate(a) => Some(*a),
            Self::Rotate3d { angle, .. } => Some(*angle),
            _ => None,
        }
    }

    /// The matrix of this function for a layer box of `size`.
    #[must_use]
    pub fn apply(&self, size: Size) -> Transform3d {
        let (w, h) = (size.width, size.height);
        match *self {
            Self::ScaleX(x) => Transform3d::from_scale(x, 1.0, 1.0),
            Self::ScaleY(y) => Transform3d::from_scale(1.0, y, 1.0),
            Self::ScaleZ(z) => Transform3d::from_scale(1.0, 1.0, z),
            Self::Scale(x, y) => Transform3d::from_scale(x, y, 1.0),
            Self::Scale3d(x, y, z) => Transform3d::from_scale(x, y, z),
            Self::TranslateX(x) => Transform3d::from_translation(x.resolve(w), 0.0, 0.0),
            Self::TranslateY(y) => Transform3d::from_translation(0.0, y.resolve(h), 0.0),
            Self::TranslateZ(z) => Transform3d::from_translation(0.0, 0.0, z.resolve(0.0)),
            Self::Translate(x, y) => Transform3d::from_translation(x.resolve(w), y.resolve(h), 0.0),
            Self::Translate3d(x, y, z) => {
                Transform3d::from_translation(x.resolve(w), y.resolve(h), z.resolve(0.0))
            }
            Self::RotateX(a) => Transform3d::from_rotation_x(a.to_radians()),
            Self::RotateY(a) => Transform3d::from_rotation_y(a.to_radians()),
            Self::RotateZ(a) | Self::Rotate(a) => Transform3d::from_rotation_z(a.to_radians()),
            Self::Rotate3d { x, y, z, angle } => {
                Transform3d::from_axis_angle(x, y, z, angle.to_radians())
            }
            Self::SkewX(a) => Transform3d::from_skew(a.to_radians(), 0.0),
            Self::SkewY(a) => Transform3d::from_skew(0.0, a.to_radians()),
            Self::Skew(ax, ay) => Transform3d::from_skew(ax.to_radians(), ay.to_radians()),
            Self::Matrix(m) => m,
            Self::Perspective(d) => Transform3d::from_perspective(d),
        }
    }
}

/// An ordered transform function list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformOperations(pub Vec<TransformOperation>);

impl TransformOperations {
    /// Wraps `ops`.
    #[must_use]
    pub const fn new(ops: Vec<TransformOperation>) -> Self {
        Self(ops)
    }

    /// Number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for `none`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Function at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TransformOperation> {
        self.0.get(index)
    }

    /// Returns `true` if both lists name the same functions in the same order.
    #[must_use]
    pub fn operations_match(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.kind() == b.kind())
    }

    /// Product of every function, first function outermost.
    #[must_use]
    pub fn apply(&self, size: Size) -> Transform3d {
        self.0
            .iter()
            .fold(Transform3d::IDENTITY, |m, op| m * op.apply(size))
    }
}
