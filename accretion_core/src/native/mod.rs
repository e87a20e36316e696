// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The native compositor contract.
//!
//! The commit engine never touches platform objects directly. It drives a
//! [`Compositor`], which owns native layers addressed by [`NativeLayerId`]
//! handles: creation and cloning, sublayer lists, property setters, keyed
//! animations, and (for tiled layers) a [`TiledBacking`].
//!
//! Implementations are expected to batch like a declarative compositor does:
//! setters record state and the platform applies it on its own schedule.
//! [`HeadlessCompositor`] is a complete in-memory implementation.

mod headless;

use core::fmt;

use kurbo::{Point, Rect, Size};

use crate::animation::{FilterOperations, PlatformAnimation, filters_can_be_composited};
use crate::geometry::{Color, Point3};
use crate::layer::LayerId;
use crate::transform::Transform3d;

pub use headless::{HeadlessCompositor, HeadlessLayer, HeadlessTiledBacking, StartedAnimation};

/// A handle to a native layer owned by a [`Compositor`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeLayerId(pub u64);

impl fmt::Debug for NativeLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeLayerId({})", self.0)
    }
}

/// An opaque reference to decoded image contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

/// The flavour of a native layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeLayerKind {
    /// A plain container layer without its own backing store.
    Layer,
    /// A layer with a single backing store painted by the engine.
    WebLayer,
    /// A 3-D transform group (children share one 3-D rendering context).
    TransformLayer,
    /// A layer whose contents are split into independently managed tiles.
    TiledBackingLayer,
    /// The dedicated tiled layer backing a whole page.
    PageTiledBackingLayer,
}

impl NativeLayerKind {
    /// Returns `true` for kinds that carry a [`TiledBacking`].
    #[inline]
    #[must_use]
    pub const fn uses_tiled_backing(self) -> bool {
        matches!(self, Self::TiledBackingLayer | Self::PageTiledBackingLayer)
    }
}

/// Tile counts along each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileGridExtent {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
}

/// Tile management for a tiled native layer.
pub trait TiledBacking {
    /// Rectangle the tiles currently cover for visibility purposes.
    fn visible_rect(&self) -> Rect;

    /// Updates the rectangle tiles should cover.
    fn set_visible_rect(&mut self, rect: Rect);

    /// The area for which tiles are kept, in layer coordinates.
    fn tile_coverage_rect(&self) -> Rect;

    /// Size of one tile.
    fn tile_size(&self) -> Size;

    /// Number of tiles currently allocated along each axis.
    fn tile_grid_extent(&self) -> TileGridExtent;

    /// Bytes retained by tile backing stores.
    fn retained_tile_backing_store_memory(&self) -> f64;

    /// Returns `true` if moving to `rect` would add or drop tiles.
    fn tiles_would_change_for_visible_rect(&self, rect: Rect) -> bool;
}

/// The native compositor the commit engine drives.
///
/// All setters are plain property writes; no method is expected to trigger
/// synchronous rendering.
pub trait Compositor {
    // -- Lifecycle --

    /// Creates a native layer of `kind`, owned by `owner`.
    fn create_layer(&mut self, kind: NativeLayerKind, owner: Option<LayerId>) -> NativeLayerId;

    /// Creates a copy of `source` carrying its static properties: position,
    /// bounds, anchor, transform, sublayer transform, contents,
    /// masks-to-bounds, double-sidedness, opacity hint, background colour,
    /// and contents scale. Sublayers and animations are not copied.
    fn clone_layer(&mut self, source: NativeLayerId, owner: Option<LayerId>) -> NativeLayerId;

    /// Drops the owner's reference to `layer`.
    ///
    /// The layer is not unparented; it goes away once its superlayer stops
    /// listing it.
    fn release_layer(&mut self, layer: NativeLayerId);

    /// Kind the layer was created with.
    fn layer_kind(&self, layer: NativeLayerId) -> NativeLayerKind;

    /// The logical layer that owns `layer`, if any.
    fn owner(&self, layer: NativeLayerId) -> Option<LayerId>;

    // -- Topology --

    /// Parent of `layer`.
    fn superlayer(&self, layer: NativeLayerId) -> Option<NativeLayerId>;

    /// Children of `layer`, back to front.
    fn sublayers(&self, layer: NativeLayerId) -> &[NativeLayerId];

    /// Replaces the sublayer list. Entries are removed from their previous
    /// superlayers first.
    fn set_sublayers(&mut self, layer: NativeLayerId, sublayers: &[NativeLayerId]);

    /// Inserts `sublayer` at `index` (clamped to the list length).
    fn insert_sublayer(&mut self, layer: NativeLayerId, sublayer: NativeLayerId, index: usize);

    /// Appends `sublayer` on top.
    fn append_sublayer(&mut self, layer: NativeLayerId, sublayer: NativeLayerId);

    /// Detaches `layer` from its superlayer, if any.
    fn remove_from_superlayer(&mut self, layer: NativeLayerId);

    /// Puts `new` in the slot `old` occupies under `layer`.
    fn replace_sublayer(&mut self, layer: NativeLayerId, old: NativeLayerId, new: NativeLayerId);

    /// Moves all of `source`'s sublayers to `layer`, keeping their order.
    fn adopt_sublayers(&mut self, layer: NativeLayerId, source: NativeLayerId);

    /// Detaches every sublayer of `layer`.
    fn remove_all_sublayers(&mut self, layer: NativeLayerId);

    /// Sublayers the platform layer manages itself (for example tile
    /// containers). They are kept below engine-managed sublayers.
    fn custom_sublayers(&self, layer: NativeLayerId) -> &[NativeLayerId] {
        _ = layer;
        &[]
    }

    // -- Properties --

    /// Sets the position of the anchor point in the superlayer.
    fn set_position(&mut self, layer: NativeLayerId, position: Point);

    /// Sets the bounds rectangle.
    fn set_bounds(&mut self, layer: NativeLayerId, bounds: Rect);

    /// Sets the anchor point (unit coordinates, `z` in pixels).
    fn set_anchor_point(&mut self, layer: NativeLayerId, anchor: Point3);

    /// Sets the layer transform.
    fn set_transform(&mut self, layer: NativeLayerId, transform: &Transform3d);

    /// Current layer transform.
    fn transform(&self, layer: NativeLayerId) -> Transform3d;

    /// Sets the transform applied to sublayers.
    fn set_sublayer_transform(&mut self, layer: NativeLayerId, transform: &Transform3d);

    /// Sets the opacity.
    fn set_opacity(&mut self, layer: NativeLayerId, opacity: f32);

    /// Current opacity.
    fn opacity(&self, layer: NativeLayerId) -> f32;

    /// Sets whether the layer clips its sublayers.
    fn set_masks_to_bounds(&mut self, layer: NativeLayerId, masks: bool);

    /// Sets whether the back face is rendered.
    fn set_double_sided(&mut self, layer: NativeLayerId, double_sided: bool);

    /// Sets the opacity hint for the backing store.
    fn set_opaque(&mut self, layer: NativeLayerId, opaque: bool);

    /// Sets the background colour.
    fn set_background_color(&mut self, layer: NativeLayerId, color: Color);

    /// Sets the backing-store scale.
    fn set_contents_scale(&mut self, layer: NativeLayerId, scale: f64);

    /// Current backing-store scale.
    fn contents_scale(&self, layer: NativeLayerId) -> f64;

    /// Sets (or clears) image contents.
    fn set_contents(&mut self, layer: NativeLayerId, contents: Option<ImageId>);

    /// Current image contents.
    fn contents(&self, layer: NativeLayerId) -> Option<ImageId>;

    /// Sets (or clears) the mask layer.
    fn set_mask(&mut self, layer: NativeLayerId, mask: Option<NativeLayerId>);

    /// Sets the debug border. A width of zero hides it.
    fn set_border(&mut self, layer: NativeLayerId, color: Color, width: f64);

    /// Marks `rect` (or the whole layer) as needing redisplay.
    fn set_needs_display(&mut self, layer: NativeLayerId, rect: Option<Rect>);

    /// Sets the diagnostic name.
    fn set_name(&mut self, layer: NativeLayerId, name: &str);

    /// Sets the filter chain.
    fn set_filters(&mut self, layer: NativeLayerId, filters: &FilterOperations);

    /// Sets whether drawing happens on the GPU.
    fn set_accelerates_drawing(&mut self, layer: NativeLayerId, accelerates: bool);

    /// Returns `true` if the compositor can render `filters` itself.
    fn filters_can_be_composited(&self, filters: &FilterOperations) -> bool {
        filters_can_be_composited(filters)
    }

    // -- Animations --

    /// Adds `animation` under `key`, replacing any animation with that key.
    fn add_animation(&mut self, layer: NativeLayerId, key: &str, animation: &PlatformAnimation);

    /// Removes the animation under `key`, if any.
    fn remove_animation(&mut self, layer: NativeLayerId, key: &str);

    /// The animation under `key`.
    fn animation(&self, layer: NativeLayerId, key: &str) -> Option<&PlatformAnimation>;

    /// Sets the layer's local time speed (0 freezes its animations).
    fn set_speed(&mut self, layer: NativeLayerId, speed: f32);

    /// Sets the layer's local time offset.
    fn set_time_offset(&mut self, layer: NativeLayerId, offset: f64);

    /// Host clock, in seconds.
    fn current_time(&self) -> f64;

    /// Compositor media clock, in seconds.
    fn current_media_time(&self) -> f64;

    /// Converts a host time to the compositor's media clock.
    fn to_media_time(&self, time: f64) -> f64 {
        time - self.current_time() + self.current_media_time()
    }

    // -- Tiling --

    /// The tiled backing of `layer`, if its kind has one.
    fn tiled_backing(&self, layer: NativeLayerId) -> Option<&dyn TiledBacking>;

    /// Mutable access to the tiled backing of `layer`.
    fn tiled_backing_mut(&mut self, layer: NativeLayerId) -> Option<&mut dyn TiledBacking>;
}

/// Callbacks a native layer makes into its owner.
///
/// Hosts forward platform notifications through this trait;
/// [`LayerTree`](crate::layer::LayerTree) implements it by looking up the
/// owning logical layer.
pub trait NativeLayerClient {
    /// A declarative animation on `layer` began at `start_time` (media clock).
    fn animation_started(&mut self, layer: NativeLayerId, start_time: f64);

    /// `layer` needs `clip` painted.
    fn paint_contents(&mut self, layer: NativeLayerId, clip: Rect);

    /// `layer`'s tiled backing created tiles covering `dirty_rects`.
    fn did_create_tiles(&mut self, layer: NativeLayerId, dirty_rects: &[Rect]);

    /// Whether `layer` should display a debug border.
    fn shows_debug_borders(&self, layer: NativeLayerId) -> bool;

    /// Whether `layer` should display a repaint counter.
    fn shows_repaint_counter(&self, layer: NativeLayerId) -> bool;

    /// Whether `layer` paints content at all.
    fn draws_content(&self, layer: NativeLayerId) -> bool;

    /// Whether `layer`'s backing store is known to be opaque.
    fn contents_opaque(&self, layer: NativeLayerId) -> bool;
}
