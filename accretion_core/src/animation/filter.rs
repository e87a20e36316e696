// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter chains and their native sub-properties.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Vec2;

use super::PlatformValue;
use crate::geometry::Color;

/// One filter function. Amounts are unit fractions; angles are degrees.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOperation {
    /// `grayscale()`.
    Grayscale(f64),
    /// `sepia()`.
    Sepia(f64),
    /// `saturate()`.
    Saturate(f64),
    /// `hue-rotate()`.
    HueRotate(f64),
    /// `invert()`.
    Invert(f64),
    /// `opacity()`.
    Opacity(f64),
    /// `brightness()`.
    Brightness(f64),
    /// `contrast()`.
    Contrast(f64),
    /// `blur()`, standard deviation in pixels.
    Blur(f64),
    /// `drop-shadow()`.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Blur standard deviation.
        std_deviation: f64,
        /// Shadow colour.
        color: Color,
    },
    /// A reference to an SVG filter. Never composited.
    Reference(String),
}

/// The function name of a [`FilterOperation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "variants mirror FilterOperation")]
pub enum FilterOperationKind {
    Grayscale,
    Sepia,
    Saturate,
    HueRotate,
    Invert,
    Opacity,
    Brightness,
    Contrast,
    Blur,
    DropShadow,
    Reference,
}

impl FilterOperation {
    /// The function name.
    #[must_use]
    pub const fn kind(&self) -> FilterOperationKind {
        use FilterOperationKind as K;
        match self {
            Self::Grayscale(_) => K::Grayscale,
            Self::Sepia(_) => K::Sepia,
            Self::Saturate(_) => K::Saturate,
            Self::HueRotate(_) => K::HueRotate,
            Self::Invert(_) => K::Invert,
            Self::Opacity(_) => K::Opacity,
            Self::Brightness(_) => K::Brightness,
            Self::Contrast(_) => K::Contrast,
            Self::Blur(_) => K::Blur,
            Self::DropShadow { .. } => K::DropShadow,
            Self::Reference(_) => K::Reference,
        }
    }

    fn amount(&self) -> f64 {
        match self {
            Self::Grayscale(a)
            | Self::Sepia(a)
            | Self::Saturate(a)
            | Self::HueRotate(a)
            | Self::Invert(a)
            | Self::Opacity(a)
            | Self::Brightness(a)
            | Self::Contrast(a)
            | Self::Blur(a) => *a,
            Self::DropShadow { .. } | Self::Reference(_) => 0.0,
        }
    }
}

impl FilterOperationKind {
    /// Amount at which the filter leaves its input unchanged.
    #[must_use]
    pub const fn passthrough_amount(self) -> f64 {
        match self {
            Self::Saturate | Self::Opacity | Self::Brightness | Self::Contrast => 1.0,
            _ => 0.0,
        }
    }

    /// Number of native sub-properties animated for this filter.
    #[must_use]
    pub const fn animated_property_count(self) -> usize {
        match self {
            Self::Grayscale
            | Self::Sepia
            | Self::Saturate
            | Self::HueRotate
            | Self::Opacity
            | Self::Blur => 1,
            Self::Brightness => 3,
            Self::Invert | Self::Contrast => 4,
            Self::DropShadow | Self::Reference => 0,
        }
    }

    /// Native name of sub-property `index`.
    #[must_use]
    pub const fn animated_property_name(self, index: usize) -> &'static str {
        const RGB_BIAS: [&str; 4] = [
            "inputRVector",
            "inputGVector",
            "inputBVector",
            "inputBiasVector",
        ];
        match self {
            Self::Grayscale | Self::Sepia => "inputIntensity",
            Self::Saturate => "inputSaturation",
            Self::HueRotate => "inputAngle",
            Self::Opacity => "inputAVector",
            Self::Blur => "inputRadius",
            Self::Invert | Self::Brightness | Self::Contrast if index < 4 => RGB_BIAS[index],
            _ => "",
        }
    }

    /// Value of sub-property `index` for `op`, or for the passthrough filter
    /// of this kind when `op` is absent.
    #[must_use]
    pub fn animated_property_value(self, op: Option<&FilterOperation>, index: usize) -> PlatformValue {
        let a = op.map_or(self.passthrough_amount(), FilterOperation::amount);
        let channel = |v: f64| {
            let mut vector = [0.0; 4];
            if index < 3 {
                vector[index] = v;
            }
            PlatformValue::Vector(vector)
        };
        match self {
            Self::HueRotate => PlatformValue::Number(a.to_radians()),
            Self::Opacity => PlatformValue::Vector([0.0, 0.0, 0.0, a]),
            Self::Invert if index == 3 => PlatformValue::Vector([a, a, a, 0.0]),
            Self::Invert => channel(1.0 - 2.0 * a),
            Self::Brightness => channel(a),
            Self::Contrast if index == 3 => {
                let intercept = -0.5 * a + 0.5;
                PlatformValue::Vector([intercept, intercept, intercept, 0.0])
            }
            Self::Contrast => channel(a),
            _ => PlatformValue::Number(a),
        }
    }
}

/// An ordered filter chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOperations(pub Vec<FilterOperation>);

impl FilterOperations {
    /// Wraps `ops`.
    #[must_use]
    pub const fn new(ops: Vec<FilterOperation>) -> Self {
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
    pub fn get(&self, index: usize) -> Option<&FilterOperation> {
        self.0.get(index)
    }

    /// Returns `true` if both chains name the same functions in the same order.
    #[must_use]
    pub fn operations_match(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.kind() == b.kind())
    }
}

/// Returns `true` if a native compositor can render `filters` itself.
///
/// Empty chains and SVG references are rejected. A drop shadow is only
/// accepted as the last function.
#[must_use]
pub fn filters_can_be_composited(filters: &FilterOperations) -> bool {
    if filters.is_empty() {
        return false;
    }
    let last = filters.len() - 1;
    filters.0.iter().enumerate().all(|(i, op)| match op.kind() {
        FilterOperationKind::Reference => false,
        FilterOperationKind::DropShadow => i == last,
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn shadow() -> FilterOperation {
        FilterOperation::DropShadow {
            offset: Vec2::new(2.0, 2.0),
            std_deviation: 3.0,
            color: Color::rgb(0, 0, 0),
        }
    }

    #[test]
    fn composite_rules() {
        assert!(!filters_can_be_composited(&FilterOperations::default()));
        assert!(filters_can_be_composited(&FilterOperations::new(vec![
            FilterOperation::Blur(2.0),
            shadow(),
        ])));
        assert!(!filters_can_be_composited(&FilterOperations::new(vec![
            shadow(),
            FilterOperation::Blur(2.0),
        ])));
        assert!(!filters_can_be_composited(&FilterOperations::new(vec![
            FilterOperation::Reference("#f".into()),
        ])));
    }

    #[test]
    fn invert_vectors() {
        let op = FilterOperation::Invert(0.25);
        let k = op.kind();
        assert_eq!(k.animated_property_count(), 4);
        assert_eq!(k.animated_property_name(1), "inputGVector");
        assert_eq!(
            k.animated_property_value(Some(&op), 1),
            PlatformValue::Vector([0.0, 0.5, 0.0, 0.0])
        );
        assert_eq!(
            k.animated_property_value(Some(&op), 3),
            PlatformValue::Vector([0.25, 0.25, 0.25, 0.0])
        );
    }

    #[test]
    fn missing_operation_is_passthrough() {
        let k = FilterOperationKind::Contrast;
        assert_eq!(
            k.animated_property_value(None, 3),
            PlatformValue::Vector([0.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(
            k.animated_property_value(None, 0),
            PlatformValue::Vector([1.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(
            FilterOperationKind::Saturate.animated_property_value(None, 0),
            PlatformValue::Number(1.0)
        );
    }
}
