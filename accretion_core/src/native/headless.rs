// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory compositor for tests and headless hosts.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::mem;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Size};

use super::{Compositor, ImageId, NativeLayerId, NativeLayerKind, TileGridExtent, TiledBacking};
use crate::animation::{FilterOperations, PlatformAnimation};
use crate::geometry::{Color, Point3, intersect_or_zero, rect_is_empty};
use crate::layer::LayerId;
use crate::transform::Transform3d;

/// Edge length of a headless tile, in pixels.
const TILE_EDGE: f64 = 512.0;

/// Full state of one native layer in a [`HeadlessCompositor`].
#[derive(Clone, Debug)]
pub struct HeadlessLayer {
    /// Kind the layer was created with.
    pub kind: NativeLayerKind,
    /// Owning logical layer.
    pub owner: Option<LayerId>,
    /// Whether the owner released its reference.
    pub released: bool,
    /// Parent layer.
    pub superlayer: Option<NativeLayerId>,
    /// Children, back to front.
    pub sublayers: Vec<NativeLayerId>,
    /// Anchor position in the superlayer.
    pub position: Point,
    /// Bounds rectangle.
    pub bounds: Rect,
    /// Anchor point.
    pub anchor_point: Point3,
    /// Layer transform.
    pub transform: Transform3d,
    /// Sublayer transform.
    pub sublayer_transform: Transform3d,
    /// Opacity.
    pub opacity: f32,
    /// Clip to bounds.
    pub masks_to_bounds: bool,
    /// Render back face.
    pub double_sided: bool,
    /// Opacity hint.
    pub opaque: bool,
    /// Background colour.
    pub background_color: Color,
    /// Backing-store scale.
    pub contents_scale: f64,
    /// Image contents.
    pub contents: Option<ImageId>,
    /// Mask layer.
    pub mask: Option<NativeLayerId>,
    /// Debug border colour.
    pub border_color: Color,
    /// Debug border width.
    pub border_width: f64,
    /// Display requests since the last [`HeadlessCompositor::take_display_requests`].
    pub needs_display: Vec<Option<Rect>>,
    /// Diagnostic name.
    pub name: String,
    /// Filter chain.
    pub filters: FilterOperations,
    /// GPU drawing.
    pub accelerates_drawing: bool,
    /// Keyed animations in insertion order.
    pub animations: Vec<(String, PlatformAnimation)>,
    /// Local time speed.
    pub speed: f32,
    /// Local time offset.
    pub time_offset: f64,
    /// Tile state for tiled kinds.
    pub tiled: Option<HeadlessTiledBacking>,
}

impl HeadlessLayer {
    fn new(kind: NativeLayerKind, owner: Option<LayerId>) -> Self {
        Self {
            kind,
            owner,
            released: false,
            superlayer: None,
            sublayers: Vec::new(),
            position: Point::ZERO,
            bounds: Rect::ZERO,
            anchor_point: Point3::CENTER,
            transform: Transform3d::IDENTITY,
            sublayer_transform: Transform3d::IDENTITY,
            opacity: 1.0,
            masks_to_bounds: false,
            double_sided: true,
            opaque: false,
            background_color: Color::TRANSPARENT,
            contents_scale: 1.0,
            contents: None,
            mask: None,
            border_color: Color::TRANSPARENT,
            border_width: 0.0,
            needs_display: Vec::new(),
            name: String::new(),
            filters: FilterOperations::default(),
            accelerates_drawing: false,
            animations: Vec::new(),
            speed: 1.0,
            time_offset: 0.0,
            tiled: kind
                .uses_tiled_backing()
                .then(|| HeadlessTiledBacking::new(Size::new(TILE_EDGE, TILE_EDGE))),
        }
    }

    /// Returns the animation under `key`.
    #[must_use]
    pub fn animation(&self, key: &str) -> Option<&PlatformAnimation> {
        self.animations
            .iter()
            .find_map(|(k, a)| (k == key).then_some(a))
    }
}

/// A tile grid with a fixed tile size, snapped to whole tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessTiledBacking {
    visible_rect: Rect,
    bounds: Rect,
    coverage: Rect,
    tile_size: Size,
}

impl HeadlessTiledBacking {
    /// Creates an empty backing with `tile_size` tiles.
    #[must_use]
    pub fn new(tile_size: Size) -> Self {
        Self {
            visible_rect: Rect::ZERO,
            bounds: Rect::ZERO,
            coverage: Rect::ZERO,
            tile_size,
        }
    }

    fn coverage_for(&self, rect: Rect) -> Rect {
        let r = intersect_or_zero(&rect, &self.bounds);
        if rect_is_empty(&r) {
            return Rect::ZERO;
        }
        let (tw, th) = (self.tile_size.width, self.tile_size.height);
        Rect::new(
            (r.x0 / tw).floor() * tw,
            (r.y0 / th).floor() * th,
            (r.x1 / tw).ceil() * tw,
            (r.y1 / th).ceil() * th,
        )
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.coverage = self.coverage_for(self.visible_rect);
    }
}

impl TiledBacking for HeadlessTiledBacking {
    fn visible_rect(&self) -> Rect {
        self.visible_rect
    }

    fn set_visible_rect(&mut self, rect: Rect) {
        self.visible_rect = rect;
        self.coverage = self.coverage_for(rect);
    }

    fn tile_coverage_rect(&self) -> Rect {
        self.coverage
    }

    fn tile_size(&self) -> Size {
        self.tile_size
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "coverage is a whole number of tiles"
    )]
    fn tile_grid_extent(&self) -> TileGridExtent {
        TileGridExtent {
            columns: (self.coverage.width() / self.tile_size.width).round() as u32,
            rows: (self.coverage.height() / self.tile_size.height).round() as u32,
        }
    }

    fn retained_tile_backing_store_memory(&self) -> f64 {
        let extent = self.tile_grid_extent();
        f64::from(extent.columns)
            * f64::from(extent.rows)
            * self.tile_size.width
            * self.tile_size.height
            * 4.0
    }

    fn tiles_would_change_for_visible_rect(&self, rect: Rect) -> bool {
        self.coverage_for(rect) != self.coverage
    }
}

/// An animation the compositor began running.
#[derive(Clone, Debug, PartialEq)]
pub struct StartedAnimation {
    /// Layer carrying the animation.
    pub layer: NativeLayerId,
    /// Animation key.
    pub key: String,
    /// Media time at which it started.
    pub start_time: f64,
}

/// An in-memory [`Compositor`].
///
/// Layers live in an arena indexed by [`NativeLayerId`] and are never freed,
/// so released layers stay inspectable.
#[derive(Debug, Default)]
pub struct HeadlessCompositor {
    layers: Vec<HeadlessLayer>,
    started: Vec<(NativeLayerId, String)>,
    host_time: f64,
    media_time: f64,
}

impl HeadlessCompositor {
    /// Creates an empty compositor with both clocks at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full state of `layer`.
    ///
    /// # Panics
    ///
    /// Panics if `layer` was not created by this compositor.
    #[must_use]
    pub fn layer(&self, layer: NativeLayerId) -> &HeadlessLayer {
        let idx = usize::try_from(layer.0).unwrap_or(usize::MAX);
        assert!(idx < self.layers.len(), "unknown {layer:?}");
        &self.layers[idx]
    }

    fn layer_mut(&mut self, layer: NativeLayerId) -> &mut HeadlessLayer {
        let idx = usize::try_from(layer.0).unwrap_or(usize::MAX);
        assert!(idx < self.layers.len(), "unknown {layer:?}");
        &mut self.layers[idx]
    }

    /// Number of layers ever created or cloned.
    #[must_use]
    pub fn layers_created(&self) -> usize {
        self.layers.len()
    }

    /// Number of layers created with `kind`.
    #[must_use]
    pub fn layers_created_of_kind(&self, kind: NativeLayerKind) -> usize {
        self.layers.iter().filter(|l| l.kind == kind).count()
    }

    /// Number of layers whose owner has not released them.
    #[must_use]
    pub fn live_layer_count(&self) -> usize {
        self.layers.iter().filter(|l| !l.released).count()
    }

    /// Sets the host and media clocks.
    pub fn set_clock(&mut self, host_time: f64, media_time: f64) {
        self.host_time = host_time;
        self.media_time = media_time;
    }

    /// Drains display requests from every layer.
    pub fn take_display_requests(&mut self) -> Vec<(NativeLayerId, Option<Rect>)> {
        let mut out = Vec::new();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let id = NativeLayerId(i as u64);
            out.extend(mem::take(&mut layer.needs_display).into_iter().map(|r| (id, r)));
        }
        out
    }

    /// Marks every not-yet-started animation on a live layer as started at the
    /// current media time and reports them.
    pub fn start_pending_animations(&mut self) -> Vec<StartedAnimation> {
        let mut out = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.released && layer.superlayer.is_none() {
                continue;
            }
            let id = NativeLayerId(i as u64);
            for (key, _) in &layer.animations {
                if self.started.iter().any(|(l, k)| *l == id && k == key) {
                    continue;
                }
                out.push(StartedAnimation {
                    layer: id,
                    key: key.clone(),
                    start_time: self.media_time,
                });
            }
        }
        self.started
            .extend(out.iter().map(|s| (s.layer, s.key.clone())));
        out
    }

    fn detach(&mut self, layer: NativeLayerId) {
        if let Some(parent) = self.layer_mut(layer).superlayer.take() {
            self.layer_mut(parent).sublayers.retain(|s| *s != layer);
        }
    }
}

impl Compositor for HeadlessCompositor {
    fn create_layer(&mut self, kind: NativeLayerKind, owner: Option<LayerId>) -> NativeLayerId {
        let id = NativeLayerId(self.layers.len() as u64);
        self.layers.push(HeadlessLayer::new(kind, owner));
        id
    }

    fn clone_layer(&mut self, source: NativeLayerId, owner: Option<LayerId>) -> NativeLayerId {
        let src = self.layer(source);
        let kind = if src.kind == NativeLayerKind::TransformLayer {
            NativeLayerKind::TransformLayer
        } else {
            NativeLayerKind::Layer
        };
        let mut copy = HeadlessLayer::new(kind, owner);
        copy.position = src.position;
        copy.bounds = src.bounds;
        copy.anchor_point = src.anchor_point;
        copy.transform = src.transform;
        copy.sublayer_transform = src.sublayer_transform;
        copy.contents = src.contents;
        copy.masks_to_bounds = src.masks_to_bounds;
        copy.double_sided = src.double_sided;
        copy.opaque = src.opaque;
        copy.background_color = src.background_color;
        copy.contents_scale = src.contents_scale;
        copy.filters = src.filters.clone();
        let id = NativeLayerId(self.layers.len() as u64);
        self.layers.push(copy);
        id
    }

    fn release_layer(&mut self, layer: NativeLayerId) {
        let l = self.layer_mut(layer);
        l.released = true;
        l.owner = None;
    }

    fn layer_kind(&self, layer: NativeLayerId) -> NativeLayerKind {
        self.layer(layer).kind
    }

    fn owner(&self, layer: NativeLayerId) -> Option<LayerId> {
        self.layer(layer).owner
    }

    fn superlayer(&self, layer: NativeLayerId) -> Option<NativeLayerId> {
        self.layer(layer).superlayer
    }

    fn sublayers(&self, layer: NativeLayerId) -> &[NativeLayerId] {
        &self.layer(layer).sublayers
    }

    fn set_sublayers(&mut self, layer: NativeLayerId, sublayers: &[NativeLayerId]) {
        let old = mem::take(&mut self.layer_mut(layer).sublayers);
        for s in old {
            self.layer_mut(s).superlayer = None;
        }
        for &s in sublayers {
            self.detach(s);
            self.layer_mut(s).superlayer = Some(layer);
        }
        self.layer_mut(layer).sublayers = sublayers.to_vec();
    }

    fn insert_sublayer(&mut self, layer: NativeLayerId, sublayer: NativeLayerId, index: usize) {
        self.detach(sublayer);
        let subs = &mut self.layer_mut(layer).sublayers;
        let index = index.min(subs.len());
        subs.insert(index, sublayer);
        self.layer_mut(sublayer).superlayer = Some(layer);
    }

    fn append_sublayer(&mut self, layer: NativeLayerId, sublayer: NativeLayerId) {
        self.detach(sublayer);
        self.layer_mut(layer).sublayers.push(sublayer);
        self.layer_mut(sublayer).superlayer = Some(layer);
    }

    fn remove_from_superlayer(&mut self, layer: NativeLayerId) {
        self.detach(layer);
    }

    fn replace_sublayer(&mut self, layer: NativeLayerId, old: NativeLayerId, new: NativeLayerId) {
        if old == new {
            return;
        }
        self.detach(new);
        let subs = &mut self.layer_mut(layer).sublayers;
        let Some(slot) = subs.iter().position(|s| *s == old) else {
            return;
        };
        subs[slot] = new;
        self.layer_mut(old).superlayer = None;
        self.layer_mut(new).superlayer = Some(layer);
    }

    fn adopt_sublayers(&mut self, layer: NativeLayerId, source: NativeLayerId) {
        let moved = mem::take(&mut self.layer_mut(source).sublayers);
        for &s in &moved {
            self.layer_mut(s).superlayer = None;
        }
        self.set_sublayers(layer, &moved);
    }

    fn remove_all_sublayers(&mut self, layer: NativeLayerId) {
        self.set_sublayers(layer, &[]);
    }

    fn set_position(&mut self, layer: NativeLayerId, position: Point) {
        self.layer_mut(layer).position = position;
    }

    fn set_bounds(&mut self, layer: NativeLayerId, bounds: Rect) {
        let l = self.layer_mut(layer);
        l.bounds = bounds;
        if let Some(tiled) = &mut l.tiled {
            tiled.set_bounds(Rect::from_origin_size(Point::ZERO, bounds.size()));
        }
    }

    fn set_anchor_point(&mut self, layer: NativeLayerId, anchor: Point3) {
        self.layer_mut(layer).anchor_point = anchor;
    }

    fn set_transform(&mut self, layer: NativeLayerId, transform: &Transform3d) {
        self.layer_mut(layer).transform = *transform;
    }

    fn transform(&self, layer: NativeLayerId) -> Transform3d {
        self.layer(layer).transform
    }

    fn set_sublayer_transform(&mut self, layer: NativeLayerId, transform: &Transform3d) {
        self.layer_mut(layer).sublayer_transform = *transform;
    }

    fn set_opacity(&mut self, layer: NativeLayerId, opacity: f32) {
        self.layer_mut(layer).opacity = opacity;
    }

    fn opacity(&self, layer: NativeLayerId) -> f32 {
        self.layer(layer).opacity
    }

    fn set_masks_to_bounds(&mut self, layer: NativeLayerId, masks: bool) {
        self.layer_mut(layer).masks_to_bounds = masks;
    }

    fn set_double_sided(&mut self, layer: NativeLayerId, double_sided: bool) {
        self.layer_mut(layer).double_sided = double_sided;
    }

    fn set_opaque(&mut self, layer: NativeLayerId, opaque: bool) {
        self.layer_mut(layer).opaque = opaque;
    }

    fn set_background_color(&mut self, layer: NativeLayerId, color: Color) {
        self.layer_mut(layer).background_color = color;
    }

    fn set_contents_scale(&mut self, layer: NativeLayerId, scale: f64) {
        self.layer_mut(layer).contents_scale = scale;
    }

    fn contents_scale(&self, layer: NativeLayerId) -> f64 {
        self.layer(layer).contents_scale
    }

    fn set_contents(&mut self, layer: NativeLayerId, contents: Option<ImageId>) {
        self.layer_mut(layer).contents = contents;
    }

    fn contents(&self, layer: NativeLayerId) -> Option<ImageId> {
        self.layer(layer).contents
    }

    fn set_mask(&mut self, layer: NativeLayerId, mask: Option<NativeLayerId>) {
        self.layer_mut(layer).mask = mask;
    }

    fn set_border(&mut self, layer: NativeLayerId, color: Color, width: f64) {
        let l = self.layer_mut(layer);
        l.border_color = color;
        l.border_width = width;
    }

    fn set_needs_display(&mut self, layer: NativeLayerId, rect: Option<Rect>) {
        self.layer_mut(layer).needs_display.push(rect);
    }

    fn set_name(&mut self, layer: NativeLayerId, name: &str) {
        self.layer_mut(layer).name = name.to_string();
    }

    fn set_filters(&mut self, layer: NativeLayerId, filters: &FilterOperations) {
        self.layer_mut(layer).filters = filters.clone();
    }

    fn set_accelerates_drawing(&mut self, layer: NativeLayerId, accelerates: bool) {
        self.layer_mut(layer).accelerates_drawing = accelerates;
    }

    fn add_animation(&mut self, layer: NativeLayerId, key: &str, animation: &PlatformAnimation) {
        let anims = &mut self.layer_mut(layer).animations;
        if let Some(slot) = anims.iter_mut().find(|(k, _)| k == key) {
            slot.1 = animation.clone();
        } else {
            anims.push((key.to_string(), animation.clone()));
        }
    }

    fn remove_animation(&mut self, layer: NativeLayerId, key: &str) {
        self.layer_mut(layer).animations.retain(|(k, _)| k != key);
        self.started.retain(|(l, k)| !(*l == layer && k == key));
    }

    fn animation(&self, layer: NativeLayerId, key: &str) -> Option<&PlatformAnimation> {
        self.layer(layer).animation(key)
    }

    fn set_speed(&mut self, layer: NativeLayerId, speed: f32) {
        self.layer_mut(layer).speed = speed;
    }

    fn set_time_offset(&mut self, layer: NativeLayerId, offset: f64) {
        self.layer_mut(layer).time_offset = offset;
    }

    fn current_time(&self) -> f64 {
        self.host_time
    }

    fn current_media_time(&self) -> f64 {
        self.media_time
    }

    fn tiled_backing(&self, layer: NativeLayerId) -> Option<&dyn TiledBacking> {
        self.layer(layer)
            .tiled
            .as_ref()
            .map(|t| t as &dyn TiledBacking)
    }

    fn tiled_backing_mut(&mut self, layer: NativeLayerId) -> Option<&mut dyn TiledBacking> {
        self.layer_mut(layer)
            .tiled
            .as_mut()
            .map(|t| t as &mut dyn TiledBacking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_sublayers_reparents() {
        let mut c = HeadlessCompositor::new();
        let a = c.create_layer(NativeLayerKind::Layer, None);
        let b = c.create_layer(NativeLayerKind::Layer, None);
        let x = c.create_layer(NativeLayerKind::Layer, None);
        c.append_sublayer(a, x);
        c.set_sublayers(b, &[x]);
        assert!(c.sublayers(a).is_empty());
        assert_eq!(c.sublayers(b), &[x]);
        assert_eq!(c.superlayer(x), Some(b));
    }

    #[test]
    fn replace_and_adopt_keep_order() {
        let mut c = HeadlessCompositor::new();
        let parent = c.create_layer(NativeLayerKind::Layer, None);
        let old = c.create_layer(NativeLayerKind::WebLayer, None);
        let new = c.create_layer(NativeLayerKind::TiledBackingLayer, None);
        let k1 = c.create_layer(NativeLayerKind::Layer, None);
        let k2 = c.create_layer(NativeLayerKind::Layer, None);
        c.set_sublayers(old, &[k1, k2]);
        c.append_sublayer(parent, old);

        c.adopt_sublayers(new, old);
        c.replace_sublayer(parent, old, new);

        assert_eq!(c.sublayers(new), &[k1, k2]);
        assert!(c.sublayers(old).is_empty());
        assert_eq!(c.sublayers(parent), &[new]);
        assert_eq!(c.superlayer(old), None);
    }

    #[test]
    fn clone_copies_static_properties_only() {
        let mut c = HeadlessCompositor::new();
        let src = c.create_layer(NativeLayerKind::TiledBackingLayer, None);
        let child = c.create_layer(NativeLayerKind::Layer, None);
        c.append_sublayer(src, child);
        c.set_position(src, Point::new(3.0, 4.0));
        c.set_opacity(src, 0.5);
        c.set_background_color(src, Color::rgb(1, 2, 3));
        c.add_animation(src, "a", &PlatformAnimation::basic("opacity"));

        let copy = c.clone_layer(src, None);
        let l = c.layer(copy);
        assert_eq!(l.kind, NativeLayerKind::Layer);
        assert_eq!(l.position, Point::new(3.0, 4.0));
        assert_eq!(l.background_color, Color::rgb(1, 2, 3));
        assert_eq!(l.opacity, 1.0);
        assert!(l.sublayers.is_empty());
        assert!(l.animations.is_empty());
    }

    #[test]
    fn tiled_backing_snaps_to_tiles() {
        let mut c = HeadlessCompositor::new();
        let t = c.create_layer(NativeLayerKind::TiledBackingLayer, None);
        c.set_bounds(t, Rect::new(0.0, 0.0, 3000.0, 1000.0));
        let backing = c.tiled_backing_mut(t).expect("tiled layer has a backing");
        backing.set_visible_rect(Rect::new(100.0, 100.0, 600.0, 200.0));
        assert_eq!(backing.tile_coverage_rect(), Rect::new(0.0, 0.0, 1024.0, 512.0));
        assert_eq!(
            backing.tile_grid_extent(),
            TileGridExtent {
                columns: 2,
                rows: 1
            }
        );
        assert!(!backing.tiles_would_change_for_visible_rect(Rect::new(0.0, 0.0, 900.0, 400.0)));
        assert!(backing.tiles_would_change_for_visible_rect(Rect::new(0.0, 0.0, 1100.0, 400.0)));
        assert_eq!(
            backing.retained_tile_backing_store_memory(),
            2.0 * 512.0 * 512.0 * 4.0
        );
    }

    #[test]
    fn started_animations_reported_once() {
        let mut c = HeadlessCompositor::new();
        let l = c.create_layer(NativeLayerKind::Layer, None);
        c.set_clock(10.0, 2.5);
        c.add_animation(l, "fade", &PlatformAnimation::basic("opacity"));
        let started = c.start_pending_animations();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].start_time, 2.5);
        assert!(c.start_pending_animations().is_empty());
        assert_eq!(c.to_media_time(11.0), 3.5);
    }
}
