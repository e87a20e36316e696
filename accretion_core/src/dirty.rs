// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer change categories and the commit order that consumes them.
//!
//! Every mutator on [`LayerTree`](crate::layer::LayerTree) records what it
//! touched by OR-ing one or more [`ChangeFlags`] into the layer's pending set.
//! Nothing is sent to the compositor until a flush, where the flags are
//! consumed in the fixed order of [`BEFORE_CHILDREN_STEPS`].
//!
//! # Ordering
//!
//! The table order encodes real dependencies:
//!
//! - the structural layer must exist (or be gone) before geometry, transform,
//!   and opacity are applied, since those land on whichever native layer
//!   currently represents the layer to its parent;
//! - contents (image, media, canvas, colour) must be in place before the
//!   sublayer list is rebuilt;
//! - contents scale must be updated before dirty rectangles are repainted,
//!   because a scale change invalidates the backing store.
//!
//! [`ChangeFlags::CHILDREN`] is handled last and is cleared immediately
//! afterwards, since committing children can raise it again for the
//! after-children phase.

use bitflags::bitflags;

bitflags! {
    /// Categories of uncommitted change on one layer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChangeFlags: u32 {
        /// Child list (or the native layers that represent children) changed.
        const CHILDREN = 1 << 0;
        /// Position, size, anchor, or bounds origin changed.
        const GEOMETRY = 1 << 1;
        /// Layer transform changed.
        const TRANSFORM = 1 << 2;
        /// Sublayer transform changed.
        const CHILDREN_TRANSFORM = 1 << 3;
        /// 3-D preservation toggled.
        const PRESERVES_3D = 1 << 4;
        /// Clipping to bounds toggled.
        const MASKS_TO_BOUNDS = 1 << 5;
        /// Drawing (or tiling permission) toggled.
        const DRAWS_CONTENT = 1 << 6;
        /// Background colour changed.
        const BACKGROUND_COLOR = 1 << 7;
        /// Opacity changed.
        const OPACITY = 1 << 8;
        /// Filter list changed.
        const FILTERS = 1 << 9;
        /// Backface visibility toggled.
        const BACKFACE_VISIBILITY = 1 << 10;
        /// Contents opacity hint toggled.
        const CONTENTS_OPAQUE = 1 << 11;
        /// Contents visibility toggled.
        const CONTENTS_VISIBILITY = 1 << 12;
        /// Image contents changed.
        const CONTENTS_IMAGE = 1 << 13;
        /// Media contents layer changed.
        const CONTENTS_MEDIA = 1 << 14;
        /// Canvas contents layer changed.
        const CONTENTS_CANVAS = 1 << 15;
        /// Solid-colour contents changed.
        const CONTENTS_COLOR = 1 << 16;
        /// Contents rectangle changed.
        const CONTENTS_RECT = 1 << 17;
        /// Device or page scale changed.
        const CONTENTS_SCALE = 1 << 18;
        /// Contents layer needs redisplay.
        const CONTENTS_NEEDS_DISPLAY = 1 << 19;
        /// Mask layer changed.
        const MASK_LAYER = 1 << 20;
        /// Replica relationship or replicated subtree changed.
        const REPLICATED_LAYER = 1 << 21;
        /// Animations were added, paused, or removed.
        const ANIMATION = 1 << 22;
        /// Dirty rectangles were queued.
        const DIRTY_RECTS = 1 << 23;
        /// Accelerated drawing toggled.
        const ACCELERATES_DRAWING = 1 << 24;
        /// Debug border or repaint counter toggled.
        const DEBUG_INDICATORS = 1 << 25;
        /// Layer name changed.
        const NAME = 1 << 26;
        /// Computed visible rectangle changed.
        const VISIBLE_RECT = 1 << 27;
        /// The tiled backing created new tiles; the flush must not be deferred.
        const TILES_ADDED = 1 << 28;
    }
}

impl ChangeFlags {
    /// Flags that re-derive every property expressed on the structural layer.
    pub const STRUCTURAL_LAYER_DEPENDENTS: Self = Self::NAME
        .union(Self::GEOMETRY)
        .union(Self::TRANSFORM)
        .union(Self::CHILDREN_TRANSFORM)
        .union(Self::CHILDREN)
        .union(Self::BACKFACE_VISIBILITY)
        .union(Self::FILTERS)
        .union(Self::OPACITY);

    /// Flags that depend on the device or page scale.
    pub const SCALE_SENSITIVE: Self = Self::GEOMETRY.union(Self::CONTENTS_SCALE);

    /// Flags raised on a backing swap, excluding [`VISIBLE_RECT`](Self::VISIBLE_RECT).
    pub const BACKING_SWAP: Self = Self::CHILDREN
        .union(Self::GEOMETRY)
        .union(Self::TRANSFORM)
        .union(Self::CHILDREN_TRANSFORM)
        .union(Self::MASKS_TO_BOUNDS)
        .union(Self::CONTENTS_OPAQUE)
        .union(Self::BACKFACE_VISIBILITY)
        .union(Self::BACKGROUND_COLOR)
        .union(Self::CONTENTS_SCALE)
        .union(Self::ACCELERATES_DRAWING)
        .union(Self::FILTERS)
        .union(Self::OPACITY)
        .union(Self::DEBUG_INDICATORS);
}

/// One update applied to a layer during the before-children commit phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitStep {
    /// Create, replace, or remove the structural layer.
    StructuralLayer,
    /// Position, bounds, and anchor.
    Geometry,
    /// Drawing toggled: request display or drop contents.
    DrawsContent,
    /// Native layer names.
    Name,
    /// Image contents layer.
    ContentsImage,
    /// Media contents layer.
    ContentsMedia,
    /// Canvas contents layer.
    ContentsCanvas,
    /// Solid-colour contents layer.
    ContentsColor,
    /// Background colour.
    BackgroundColor,
    /// Layer transform.
    Transform,
    /// Sublayer transform.
    ChildrenTransform,
    /// Masks-to-bounds.
    MasksToBounds,
    /// Contents visibility.
    ContentsVisibility,
    /// Opaque hint.
    ContentsOpaque,
    /// Double-sidedness.
    BackfaceVisibility,
    /// Opacity.
    Opacity,
    /// Filters.
    Filters,
    /// Pending animation actions and new animations.
    Animations,
    /// Contents scale.
    ContentsScale,
    /// Tiled-backing visible rect.
    VisibleRect,
    /// Queued dirty rectangles.
    DirtyRects,
    /// Contents rectangle.
    ContentsRect,
    /// Mask layer.
    MaskLayer,
    /// Contents layer redisplay.
    ContentsNeedsDisplay,
    /// Accelerated drawing.
    AcceleratesDrawing,
    /// Debug border and repaint counter.
    DebugIndicators,
    /// Sublayer list rebuild.
    Children,
}

/// The before-children commit steps, in application order, with the flags
/// that trigger each.
pub const BEFORE_CHILDREN_STEPS: &[(ChangeFlags, CommitStep)] = &[
    (
        ChangeFlags::PRESERVES_3D.union(ChangeFlags::REPLICATED_LAYER),
        CommitStep::StructuralLayer,
    ),
    (ChangeFlags::GEOMETRY, CommitStep::Geometry),
    (ChangeFlags::DRAWS_CONTENT, CommitStep::DrawsContent),
    (ChangeFlags::NAME, CommitStep::Name),
    (ChangeFlags::CONTENTS_IMAGE, CommitStep::ContentsImage),
    (ChangeFlags::CONTENTS_MEDIA, CommitStep::ContentsMedia),
    (ChangeFlags::CONTENTS_CANVAS, CommitStep::ContentsCanvas),
    (ChangeFlags::CONTENTS_COLOR, CommitStep::ContentsColor),
    (ChangeFlags::BACKGROUND_COLOR, CommitStep::BackgroundColor),
    (ChangeFlags::TRANSFORM, CommitStep::Transform),
    (ChangeFlags::CHILDREN_TRANSFORM, CommitStep::ChildrenTransform),
    (ChangeFlags::MASKS_TO_BOUNDS, CommitStep::MasksToBounds),
    (ChangeFlags::CONTENTS_VISIBILITY, CommitStep::ContentsVisibility),
    (ChangeFlags::CONTENTS_OPAQUE, CommitStep::ContentsOpaque),
    (ChangeFlags::BACKFACE_VISIBILITY, CommitStep::BackfaceVisibility),
    (ChangeFlags::OPACITY, CommitStep::Opacity),
    (ChangeFlags::FILTERS, CommitStep::Filters),
    (ChangeFlags::ANIMATION, CommitStep::Animations),
    (ChangeFlags::CONTENTS_SCALE, CommitStep::ContentsScale),
    (ChangeFlags::VISIBLE_RECT, CommitStep::VisibleRect),
    (ChangeFlags::DIRTY_RECTS, CommitStep::DirtyRects),
    (ChangeFlags::CONTENTS_RECT, CommitStep::ContentsRect),
    (ChangeFlags::MASK_LAYER, CommitStep::MaskLayer),
    (ChangeFlags::CONTENTS_NEEDS_DISPLAY, CommitStep::ContentsNeedsDisplay),
    (ChangeFlags::ACCELERATES_DRAWING, CommitStep::AcceleratesDrawing),
    (ChangeFlags::DEBUG_INDICATORS, CommitStep::DebugIndicators),
    (ChangeFlags::CHILDREN, CommitStep::Children),
];
