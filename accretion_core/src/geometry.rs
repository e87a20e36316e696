// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers: 3-D points, colours, quads, transform-state propagation,
//! and pixel alignment.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Size, Vec2};

use crate::transform::Transform3d;

/// Size expansion applied to pixel-aligned bounds so that backing-store sizes
/// computed with integer truncation still cover the aligned area.
const ALIGNMENT_EPSILON: f64 = 1e-5;

/// A point in 3-D space, also used for anchor points (`z` is in pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// The default layer anchor: the centre of the layer in the z = 0 plane.
    pub const CENTER: Self = Self::new(0.5, 0.5, 0.0);

    /// Creates a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drops the `z` component.
    #[inline]
    #[must_use]
    pub const fn to_point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An 8-bit-per-channel RGBA colour (not premultiplied).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 0 is fully transparent.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Creates a colour from four channels.
    #[inline]
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque colour.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Returns `true` if the colour contributes anything when drawn.
    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        self.a != 0
    }
}

/// Four points, usually the corners of a transformed rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub points: [Point; 4],
}

impl Quad {
    /// The quad covering `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            points: [
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ],
        }
    }

    /// The smallest axis-aligned rectangle containing all four points.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        let [first, rest @ ..] = self.points;
        let mut r = Rect::from_points(first, first);
        for p in rest {
            r = r.union_pt(p);
        }
        r
    }
}

/// Whether [`TransformState::apply_transform`] flattens into the plane or keeps
/// accumulating a 3-D transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformAccumulation {
    /// Keep the transform so descendants in the same 3-D context compose with it.
    Accumulate,
    /// Project the quad into the local plane and drop the accumulated transform.
    Flatten,
}

/// Propagates a clip quad from a root into successively nested layer spaces.
///
/// The state maps *inverse*: each applied layer transform maps from the layer
/// into its container, and the tracked quad is carried from the container into
/// the layer.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformState {
    quad: Quad,
    accumulated: Option<Transform3d>,
}

impl TransformState {
    /// Starts from a clip rectangle in root coordinates.
    #[must_use]
    pub fn new(clip: Rect) -> Self {
        Self {
            quad: Quad::from_rect(clip),
            accumulated: None,
        }
    }

    /// Applies a container-from-layer transform.
    ///
    /// Returns `true` if flattening had to clamp points that projected behind
    /// the viewer.
    pub fn apply_transform(
        &mut self,
        transform: &Transform3d,
        accumulation: TransformAccumulation,
    ) -> bool {
        if let Some(acc) = &mut self.accumulated {
            *acc = *acc * *transform;
        } else if accumulation == TransformAccumulation::Accumulate {
            self.accumulated = Some(*transform);
        }
        if accumulation == TransformAccumulation::Accumulate {
            return false;
        }
        let final_transform = self.accumulated.take().unwrap_or(*transform);
        let inverse = final_transform.inverse().unwrap_or_default();
        let (quad, clamped) = inverse.project_quad(&self.quad);
        self.quad = quad;
        clamped
    }

    /// The tracked quad in the current layer's space, and whether mapping it
    /// clamped any point.
    #[must_use]
    pub fn mapped_quad(&self) -> (Quad, bool) {
        match &self.accumulated {
            None => (self.quad, false),
            Some(acc) => acc.inverse().unwrap_or_default().project_quad(&self.quad),
        }
    }

    /// Replaces the tracked quad with `rect` in the current space.
    pub fn set_quad(&mut self, rect: Rect) {
        self.quad = Quad::from_rect(rect);
        self.accumulated = None;
    }
}

/// Returns `true` if `rect` has no area.
#[inline]
#[must_use]
pub fn rect_is_empty(rect: &Rect) -> bool {
    rect.width() <= 0.0 || rect.height() <= 0.0
}

/// Returns `true` if `outer` fully contains `inner`.
#[inline]
#[must_use]
pub fn rect_contains_rect(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Intersects two rectangles, collapsing a non-overlapping result to
/// [`Rect::ZERO`].
#[must_use]
pub fn intersect_or_zero(a: &Rect, b: &Rect) -> Rect {
    let r = a.intersect(*b);
    if rect_is_empty(&r) { Rect::ZERO } else { r }
}

/// Position, size, and anchor of a layer after snapping its backing to device
/// pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelAlignment {
    /// Adjusted layer position in the parent's coordinates.
    pub position: Point,
    /// Adjusted bounds size.
    pub size: Size,
    /// Anchor point compensating for the rounding.
    pub anchor: Point3,
    /// How far the aligned bounds origin moved from the unaligned one.
    pub offset: Vec2,
}

impl PixelAlignment {
    /// The identity alignment: geometry is used exactly as given.
    #[must_use]
    pub const fn unaligned(position: Point, size: Size, anchor: Point3) -> Self {
        Self {
            position,
            size,
            anchor,
            offset: Vec2::ZERO,
        }
    }
}

/// Snaps a layer's bounds to whole pixels in scaled (screen) space.
///
/// `base_position` is the layer's position relative to the nearest ancestor
/// that applies the page scale.
#[must_use]
pub fn compute_pixel_alignment(
    position: Point,
    size: Size,
    anchor: Point3,
    page_scale: f64,
    base_position: Point,
) -> PixelAlignment {
    let base_bounds = Rect::from_origin_size(base_position, size);
    let aligned = base_bounds.scale_from_origin(page_scale).expand();
    let aligned = aligned.scale_from_origin(1.0 / page_scale);
    let aligned_size = Size::new(
        aligned.width() + ALIGNMENT_EPSILON,
        aligned.height() + ALIGNMENT_EPSILON,
    );

    let offset = base_bounds.origin() - aligned.origin();
    let mut anchor_x = anchor.x;
    let mut anchor_y = anchor.y;
    if aligned_size.width != 0.0 {
        anchor_x = (base_bounds.width() * anchor_x + offset.x) / aligned_size.width;
    }
    if aligned_size.height != 0.0 {
        anchor_y = (base_bounds.height() * anchor_y + offset.y) / aligned_size.height;
    }

    PixelAlignment {
        position: position - offset,
        size: aligned_size,
        anchor: Point3::new(anchor_x, anchor_y, anchor.z * page_scale),
        offset,
    }
}

/// Returns `true` if `v` has no fractional part.
#[inline]
#[must_use]
pub fn is_integral(v: f64) -> bool {
    v.floor() == v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn pixel_alignment_snaps_scaled_bounds() {
        let pos = Point::new(10.3, 5.7);
        let size = Size::new(100.0, 100.0);
        let a = compute_pixel_alignment(pos, size, Point3::CENTER, 1.5, pos);

        assert!(close(a.position.x, 10.0), "x = {}", a.position.x);
        assert!(close(a.position.y, 5.333_33), "y = {}", a.position.y);
        assert!(close(a.offset.x, 0.3), "offset.x = {}", a.offset.x);
        assert!(close(a.offset.y, 0.366_67), "offset.y = {}", a.offset.y);

        // Aligned edges are whole pixels once scaled back up.
        let x0 = a.position.x * 1.5;
        let x1 = (a.position.x + a.size.width - ALIGNMENT_EPSILON) * 1.5;
        assert!(close(x0, x0.round()) && close(x1, x1.round()), "{x0} .. {x1}");

        // The anchor compensates so the layer's anchor lands where it did.
        let native_x = a.position.x + a.anchor.x * a.size.width;
        let native_y = a.position.y + a.anchor.y * a.size.height;
        assert!(close(native_x, 60.3), "native x = {native_x}");
        assert!(close(native_y, 55.7), "native y = {native_y}");

        // Undoing the offset reproduces the unscaled placement.
        assert!(close(a.position.x + a.offset.x, 10.3));
        assert!(close(a.position.y + a.offset.y, 5.7));
    }

    #[test]
    fn flatten_translation_moves_quad() {
        let mut state = TransformState::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let clamped = state.apply_transform(
            &Transform3d::from_translation(10.0, 20.0, 0.0),
            TransformAccumulation::Flatten,
        );
        assert!(!clamped);
        let (quad, _) = state.mapped_quad();
        assert_eq!(quad.bounding_box(), Rect::new(-10.0, -20.0, 90.0, 80.0));
    }

    #[test]
    fn accumulate_defers_projection() {
        let mut state = TransformState::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let t = Transform3d::from_scale(2.0, 2.0, 1.0);
        state.apply_transform(&t, TransformAccumulation::Accumulate);
        let (quad, clamped) = state.mapped_quad();
        assert!(!clamped);
        assert_eq!(quad.bounding_box(), Rect::new(0.0, 0.0, 50.0, 50.0));

        // A following flatten uses the combined transform.
        state.apply_transform(&t, TransformAccumulation::Flatten);
        let (quad, _) = state.mapped_quad();
        assert_eq!(quad.bounding_box(), Rect::new(0.0, 0.0, 25.0, 25.0));
    }

    #[test]
    fn set_quad_resets_accumulation() {
        let mut state = TransformState::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        state.apply_transform(
            &Transform3d::from_scale(2.0, 2.0, 1.0),
            TransformAccumulation::Accumulate,
        );
        state.set_quad(Rect::new(1.0, 1.0, 2.0, 2.0));
        assert_eq!(
            state.mapped_quad().0.bounding_box(),
            Rect::new(1.0, 1.0, 2.0, 2.0)
        );
    }

    #[test]
    fn disjoint_intersection_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(intersect_or_zero(&a, &b), Rect::ZERO);
        assert!(rect_contains_rect(&a, &Rect::new(1.0, 1.0, 9.0, 9.0)));
        assert!(!rect_contains_rect(&a, &b));
    }
}
