// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer storage, topology, and the mutator surface.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};

use super::clone::{CloneId, CloneMaps};
use super::{LayerClient, LayerId};
use crate::animation::{
    AnimatedProperty, AnimationFallback, AnimationProcessingAction, FilterOperations,
    LayerPropertyAnimation,
};
use crate::config::CommitConfig;
use crate::dirty::ChangeFlags;
use crate::geometry::{Color, Point3, intersect_or_zero, rect_contains_rect, rect_is_empty};
use crate::native::{Compositor, ImageId, NativeLayerClient, NativeLayerId, NativeLayerKind};
use crate::transform::Transform3d;

/// What the contents layer of a logical layer is showing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentsLayerPurpose {
    /// No contents layer.
    #[default]
    None,
    /// A decoded image, attached at the next commit.
    Image,
    /// A media layer supplied by the host.
    Media,
    /// A canvas layer supplied by the host.
    Canvas,
    /// A solid colour.
    BackgroundColor,
}

impl ContentsLayerPurpose {
    /// Returns `true` if the tree creates and releases the contents layer
    /// itself, rather than borrowing one from the host.
    #[must_use]
    pub const fn owns_layer(self) -> bool {
        matches!(self, Self::Image | Self::BackgroundColor)
    }
}

/// The native layer currently showing a layer's contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ContentsLayer {
    pub(crate) layer: NativeLayerId,
    pub(crate) purpose: ContentsLayerPurpose,
}

/// An animation that could not be handed to the compositor, reported through
/// the tracer at the next flush.
#[derive(Clone, Debug)]
pub(crate) struct PendingFallback {
    pub(crate) layer: LayerId,
    pub(crate) name: String,
    pub(crate) reason: AnimationFallback,
}

/// Everything the tree knows about one logical layer.
#[derive(Clone, Debug)]
pub(crate) struct LayerData {
    // -- Topology --
    pub(crate) parent: Option<LayerId>,
    pub(crate) children: Vec<LayerId>,
    pub(crate) mask_layer: Option<LayerId>,
    pub(crate) replica_layer: Option<LayerId>,
    pub(crate) replicated_layer: Option<LayerId>,

    // -- Properties (set by callers) --
    pub(crate) name: String,
    pub(crate) position: Point,
    pub(crate) anchor_point: Point3,
    pub(crate) size: Size,
    pub(crate) bounds_origin: Point,
    pub(crate) transform: Transform3d,
    pub(crate) children_transform: Transform3d,
    pub(crate) opacity: f32,
    pub(crate) background_color: Color,
    pub(crate) contents_rect: Rect,
    pub(crate) filters: FilterOperations,
    pub(crate) replicated_layer_position: Point,
    pub(crate) masks_to_bounds: bool,
    pub(crate) draws_content: bool,
    pub(crate) contents_visible: bool,
    pub(crate) preserves_3d: bool,
    pub(crate) backface_visibility: bool,
    pub(crate) contents_opaque: bool,
    pub(crate) accelerates_drawing: bool,
    pub(crate) allow_tiled_layer: bool,
    pub(crate) maintains_pixel_alignment: bool,
    pub(crate) applies_page_scale: bool,
    pub(crate) show_debug_border: bool,
    pub(crate) show_repaint_counter: bool,

    // -- Contents --
    pub(crate) contents_purpose: ContentsLayerPurpose,
    pub(crate) contents_image: Option<ImageId>,
    pub(crate) pending_image: Option<ImageId>,
    pub(crate) contents_color: Option<Color>,

    // -- Native layers --
    pub(crate) native: NativeLayerId,
    pub(crate) structural: Option<NativeLayerId>,
    pub(crate) contents: Option<ContentsLayer>,
    pub(crate) clones: CloneMaps,
    pub(crate) using_tiled_backing: bool,
    pub(crate) page_tiled: bool,

    // -- Commit state --
    pub(crate) uncommitted: ChangeFlags,
    pub(crate) dirty_rects: Vec<Rect>,
    pub(crate) visible_rect: Rect,
    pub(crate) size_at_last_visible_rect_update: Size,
    pub(crate) sublayers_pruned: bool,

    // -- Animations --
    pub(crate) uncommitted_animations: Vec<LayerPropertyAnimation>,
    pub(crate) animations_to_process: Vec<(String, AnimationProcessingAction)>,
    pub(crate) running_animations: HashMap<String, Vec<LayerPropertyAnimation>>,
}

impl LayerData {
    fn new(native: NativeLayerId, page_tiled: bool) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            mask_layer: None,
            replica_layer: None,
            replicated_layer: None,
            name: String::new(),
            position: Point::ZERO,
            anchor_point: Point3::CENTER,
            size: Size::ZERO,
            bounds_origin: Point::ZERO,
            transform: Transform3d::IDENTITY,
            children_transform: Transform3d::IDENTITY,
            opacity: 1.0,
            background_color: Color::TRANSPARENT,
            contents_rect: Rect::ZERO,
            filters: FilterOperations::default(),
            replicated_layer_position: Point::ZERO,
            masks_to_bounds: false,
            draws_content: false,
            contents_visible: true,
            preserves_3d: false,
            backface_visibility: true,
            contents_opaque: false,
            accelerates_drawing: false,
            allow_tiled_layer: true,
            maintains_pixel_alignment: false,
            applies_page_scale: false,
            show_debug_border: false,
            show_repaint_counter: false,
            contents_purpose: ContentsLayerPurpose::None,
            contents_image: None,
            pending_image: None,
            contents_color: None,
            native,
            structural: None,
            contents: None,
            clones: CloneMaps::default(),
            using_tiled_backing: false,
            page_tiled,
            uncommitted: ChangeFlags::empty(),
            dirty_rects: Vec::new(),
            visible_rect: Rect::ZERO,
            size_at_last_visible_rect_update: Size::ZERO,
            sublayers_pruned: false,
            uncommitted_animations: Vec::new(),
            animations_to_process: Vec::new(),
            running_animations: HashMap::new(),
        }
    }

    /// The native layer that represents this layer to its parent.
    pub(crate) fn primary_layer(&self) -> NativeLayerId {
        self.structural.unwrap_or(self.native)
    }

    /// Clones of [`primary_layer`](Self::primary_layer).
    pub(crate) fn primary_clones(&self) -> &HashMap<CloneId, NativeLayerId> {
        if self.structural.is_some() {
            &self.clones.structural
        } else {
            &self.clones.primary
        }
    }

    /// Native layer that carries animations of `property`.
    pub(crate) fn animated_layer(&self, property: AnimatedProperty) -> Option<NativeLayerId> {
        match property {
            AnimatedProperty::BackgroundColor => self.contents.map(|c| c.layer),
            _ => Some(self.primary_layer()),
        }
    }

    /// Clones of [`animated_layer`](Self::animated_layer).
    pub(crate) fn animated_clones(
        &self,
        property: AnimatedProperty,
    ) -> &HashMap<CloneId, NativeLayerId> {
        match property {
            AnimatedProperty::BackgroundColor => &self.clones.contents,
            _ => self.primary_clones(),
        }
    }

    pub(crate) fn contents_layer(&self) -> Option<NativeLayerId> {
        self.contents.map(|c| c.layer)
    }

    /// Whether the contents layer is part of the sublayer list.
    pub(crate) fn has_visible_contents_layer(&self) -> bool {
        self.contents.is_some() && self.contents_visible
    }
}

/// A tree of logical compositing layers backed by a native [`Compositor`].
///
/// Layers are addressed by [`LayerId`] handles. Destroyed layers are recycled
/// via a free list, and generation counters prevent stale handle access.
///
/// Mutators never touch the compositor directly (apart from creating a
/// solid-colour contents layer); they record [`ChangeFlags`] and ask the
/// [`LayerClient`] for a flush. See
/// [`flush_compositing_state`](Self::flush_compositing_state).
#[derive(Debug)]
pub struct LayerTree<C, L> {
    // -- Allocation --
    pub(crate) slots: Vec<Option<LayerData>>,
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,

    // -- Collaborators --
    pub(crate) compositor: C,
    pub(crate) client: L,
    pub(crate) config: CommitConfig,

    // -- Diagnostics --
    pub(crate) fallbacks: Vec<PendingFallback>,
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new(compositor: C, client: L, config: CommitConfig) -> Self {
        Self {
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            compositor,
            client,
            config,
            fallbacks: Vec::new(),
        }
    }

    /// The native compositor.
    #[must_use]
    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    /// Mutable access to the native compositor.
    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    /// The host client.
    #[must_use]
    pub fn client(&self) -> &L {
        &self.client
    }

    /// Mutable access to the host client.
    pub fn client_mut(&mut self) -> &mut L {
        &mut self.client
    }

    /// Commit limits in effect.
    #[must_use]
    pub fn config(&self) -> &CommitConfig {
        &self.config
    }

    // -- Allocation API --

    /// Creates a new layer backed by a plain native layer.
    ///
    /// The layer starts detached with a centred anchor, full opacity, and
    /// identity transforms. A flush is requested straight away so the initial
    /// contents scale reaches the compositor.
    pub fn create_layer(&mut self) -> LayerId {
        self.create_layer_of_kind(NativeLayerKind::WebLayer, false)
    }

    /// Creates a layer whose backing is a page-level tiled layer.
    ///
    /// Such a layer never swaps its backing, whatever its size.
    pub fn create_layer_with_page_tiles(&mut self) -> LayerId {
        self.create_layer_of_kind(NativeLayerKind::PageTiledBackingLayer, true)
    }

    fn create_layer_of_kind(&mut self, kind: NativeLayerKind, page_tiled: bool) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            assert!(idx != u32::MAX, "layer tree is full");
            self.slots.push(None);
            self.generation.push(0);
            idx
        };
        let id = LayerId {
            idx,
            generation: self.generation[idx as usize],
        };
        let native = self.compositor.create_layer(kind, Some(id));
        self.slots[idx as usize] = Some(LayerData::new(native, page_tiled));
        self.note_change(id, ChangeFlags::CONTENTS_SCALE);
        id
    }

    /// Destroys a layer and releases its native layers.
    ///
    /// The layer is detached from its parent, its children become roots, and
    /// mask and replica relationships pointing at it are cleared. Native
    /// layers are released without being unparented; the compositor drops
    /// them once nothing references them.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        self.remove_from_parent(id);
        for child in core::mem::take(&mut self.layer_mut(id).children) {
            self.layer_mut(child).parent = None;
        }
        if let Some(replica) = self.layer(id).replica_layer {
            self.set_replicated_layer(replica, None);
        }
        if let Some(replicated) = self.layer(id).replicated_layer {
            self.set_replicated_by_layer(replicated, None);
        }
        let masked_by: Vec<LayerId> = self
            .live_ids()
            .filter(|other| self.layer(*other).mask_layer == Some(id))
            .collect();
        for other in masked_by {
            self.set_mask_layer(other, None);
        }

        let idx = id.idx as usize;
        if let Some(mut data) = self.slots[idx].take() {
            self.compositor.release_layer(data.native);
            if let Some(shim) = data.structural {
                self.compositor.release_layer(shim);
            }
            if let Some(contents) = data.contents
                && contents.purpose.owns_layer()
            {
                self.compositor.release_layer(contents.layer);
            }
            for clone in data.clones.drain_all() {
                self.compositor.release_layer(clone);
            }
        }
        self.generation[idx] = self.generation[idx].wrapping_add(1);
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    /// Number of live layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if the tree holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology API --

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child == parent`.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        let index = self.layer(parent).children.len();
        self.add_child_at_index(parent, child, index);
    }

    /// Inserts `child` at `index` (clamped to the child count).
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child == parent`.
    pub fn add_child_at_index(&mut self, parent: LayerId, child: LayerId, index: usize) {
        self.validate(child);
        assert!(parent != child, "a layer cannot be its own child");
        self.remove_from_parent(child);
        let children = &mut self.layer_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.layer_mut(child).parent = Some(parent);
        self.note_sublayers_changed(parent);
    }

    /// Inserts `child` immediately before `sibling`, or appends it if
    /// `sibling` is not a child of `parent`.
    pub fn add_child_below(&mut self, parent: LayerId, child: LayerId, sibling: LayerId) {
        self.validate(child);
        assert!(parent != child, "a layer cannot be its own child");
        self.remove_from_parent(child);
        let children = &self.layer(parent).children;
        let index = children
            .iter()
            .position(|c| *c == sibling)
            .unwrap_or(children.len());
        self.add_child_at_index(parent, child, index);
    }

    /// Inserts `child` immediately after `sibling`, or appends it if
    /// `sibling` is not a child of `parent`.
    pub fn add_child_above(&mut self, parent: LayerId, child: LayerId, sibling: LayerId) {
        self.validate(child);
        assert!(parent != child, "a layer cannot be its own child");
        self.remove_from_parent(child);
        let children = &self.layer(parent).children;
        let index = children
            .iter()
            .position(|c| *c == sibling)
            .map_or(children.len(), |i| i + 1);
        self.add_child_at_index(parent, child, index);
    }

    /// Replaces `old` with `new` in `parent`'s children.
    ///
    /// Returns `false` (and changes nothing) if `old` is not a child of
    /// `parent`.
    pub fn replace_child(&mut self, parent: LayerId, old: LayerId, new: LayerId) -> bool {
        self.validate(new);
        if old == new {
            return self.layer(old).parent == Some(parent);
        }
        if !self.layer(parent).children.contains(&old) {
            return false;
        }
        self.remove_from_parent(new);
        let children = &mut self.layer_mut(parent).children;
        let Some(slot) = children.iter().position(|c| *c == old) else {
            return false;
        };
        children[slot] = new;
        self.layer_mut(old).parent = None;
        self.layer_mut(new).parent = Some(parent);
        self.note_sublayers_changed(parent);
        true
    }

    /// Replaces all of `parent`'s children.
    ///
    /// Returns `false` if the list is unchanged.
    pub fn set_children(&mut self, parent: LayerId, children: &[LayerId]) -> bool {
        if self.layer(parent).children.as_slice() == children {
            return false;
        }
        for old in core::mem::take(&mut self.layer_mut(parent).children) {
            self.layer_mut(old).parent = None;
        }
        for &child in children {
            self.validate(child);
            assert!(parent != child, "a layer cannot be its own child");
            self.remove_from_parent(child);
            self.layer_mut(parent).children.push(child);
            self.layer_mut(child).parent = Some(parent);
        }
        self.note_sublayers_changed(parent);
        true
    }

    /// Detaches `layer` from its parent. Does nothing for a root.
    pub fn remove_from_parent(&mut self, layer: LayerId) {
        let Some(parent) = self.layer(layer).parent else {
            return;
        };
        self.note_sublayers_changed(parent);
        self.layer_mut(parent).children.retain(|c| *c != layer);
        self.layer_mut(layer).parent = None;
    }

    /// Uses `mask`'s content as the alpha mask of `layer`.
    pub fn set_mask_layer(&mut self, layer: LayerId, mask: Option<LayerId>) {
        if let Some(m) = mask {
            self.validate(m);
        }
        if self.layer(layer).mask_layer == mask {
            return;
        }
        self.layer_mut(layer).mask_layer = mask;
        self.note_change(layer, ChangeFlags::MASK_LAYER);
        self.propagate_layer_change_to_replicas(layer);
        if let Some(replicated) = self.layer(layer).replicated_layer {
            self.propagate_layer_change_to_replicas(replicated);
        }
    }

    /// Makes `replica` draw a reflection of `layer`'s subtree, replacing any
    /// previous replica.
    pub fn set_replicated_by_layer(&mut self, layer: LayerId, replica: Option<LayerId>) {
        if let Some(r) = replica {
            self.validate(r);
            assert!(r != layer, "a layer cannot replicate itself");
        }
        if self.layer(layer).replica_layer == replica {
            return;
        }
        if let Some(old) = self.layer(layer).replica_layer {
            self.set_replicated_layer(old, None);
        }
        if let Some(r) = replica {
            if let Some(previous) = self.layer(r).replicated_layer {
                self.layer_mut(previous).replica_layer = None;
                self.note_sublayers_changed(previous);
                self.note_change(previous, ChangeFlags::REPLICATED_LAYER);
            }
            self.set_replicated_layer(r, Some(layer));
        }
        self.layer_mut(layer).replica_layer = replica;
        self.note_sublayers_changed(layer);
        self.note_change(layer, ChangeFlags::REPLICATED_LAYER);
    }

    fn set_replicated_layer(&mut self, replica: LayerId, layer: Option<LayerId>) {
        if self.layer(replica).replicated_layer == layer {
            return;
        }
        self.layer_mut(replica).replicated_layer = layer;
        self.note_change(replica, ChangeFlags::REPLICATED_LAYER);
    }

    /// Where a replica places the reflection of the layer it replicates,
    /// in the replicated layer's parent coordinates.
    pub fn set_replicated_layer_position(&mut self, replica: LayerId, position: Point) {
        if self.layer(replica).replicated_layer_position == position {
            return;
        }
        self.layer_mut(replica).replicated_layer_position = position;
        if let Some(replicated) = self.layer(replica).replicated_layer {
            self.note_change(replicated, ChangeFlags::GEOMETRY);
        }
        self.note_change(replica, ChangeFlags::REPLICATED_LAYER);
    }

    // -- Property API --

    /// Sets the anchor-relative position in parent coordinates.
    pub fn set_position(&mut self, layer: LayerId, position: Point) {
        self.assign(layer, position, |l| &mut l.position, ChangeFlags::GEOMETRY);
    }

    /// Sets the anchor point, as fractions of the size (`z` in pixels).
    pub fn set_anchor_point(&mut self, layer: LayerId, anchor: Point3) {
        self.assign(layer, anchor, |l| &mut l.anchor_point, ChangeFlags::GEOMETRY);
    }

    /// Sets the layer size.
    pub fn set_size(&mut self, layer: LayerId, size: Size) {
        self.assign(layer, size, |l| &mut l.size, ChangeFlags::GEOMETRY);
    }

    /// Sets the origin of the layer's bounds (its scroll offset).
    pub fn set_bounds_origin(&mut self, layer: LayerId, origin: Point) {
        self.assign(layer, origin, |l| &mut l.bounds_origin, ChangeFlags::GEOMETRY);
    }

    /// Sets the layer transform, applied about the anchor point.
    pub fn set_transform(&mut self, layer: LayerId, transform: Transform3d) {
        self.assign(layer, transform, |l| &mut l.transform, ChangeFlags::TRANSFORM);
    }

    /// Sets the transform applied to children, about this layer's anchor.
    pub fn set_children_transform(&mut self, layer: LayerId, transform: Transform3d) {
        self.assign(
            layer,
            transform,
            |l| &mut l.children_transform,
            ChangeFlags::CHILDREN_TRANSFORM,
        );
    }

    /// Keeps children in this layer's 3-D rendering context.
    pub fn set_preserves_3d(&mut self, layer: LayerId, preserves: bool) {
        self.assign(layer, preserves, |l| &mut l.preserves_3d, ChangeFlags::PRESERVES_3D);
    }

    /// Clips sublayers and contents to the bounds.
    pub fn set_masks_to_bounds(&mut self, layer: LayerId, masks: bool) {
        self.assign(
            layer,
            masks,
            |l| &mut l.masks_to_bounds,
            ChangeFlags::MASKS_TO_BOUNDS | ChangeFlags::DEBUG_INDICATORS,
        );
    }

    /// Gives the layer a backing store the client paints into.
    pub fn set_draws_content(&mut self, layer: LayerId, draws: bool) {
        self.assign(
            layer,
            draws,
            |l| &mut l.draws_content,
            ChangeFlags::DRAWS_CONTENT | ChangeFlags::DEBUG_INDICATORS,
        );
    }

    /// Permits a tiled backing when the layer grows past the pixel limit.
    pub fn set_allow_tiled_layer(&mut self, layer: LayerId, allow: bool) {
        self.assign(layer, allow, |l| &mut l.allow_tiled_layer, ChangeFlags::GEOMETRY);
    }

    /// Shows or hides the layer's own contents (children are unaffected).
    pub fn set_contents_visible(&mut self, layer: LayerId, visible: bool) {
        if self.assign(
            layer,
            visible,
            |l| &mut l.contents_visible,
            ChangeFlags::CONTENTS_VISIBILITY,
        ) && self.layer(layer).contents.is_some()
        {
            self.note_sublayers_changed(layer);
        }
    }

    /// Sets the background colour.
    pub fn set_background_color(&mut self, layer: LayerId, color: Color) {
        self.assign(
            layer,
            color,
            |l| &mut l.background_color,
            ChangeFlags::BACKGROUND_COLOR,
        );
    }

    /// Sets opacity, clamped to `0..=1`.
    pub fn set_opacity(&mut self, layer: LayerId, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        self.assign(layer, opacity, |l| &mut l.opacity, ChangeFlags::OPACITY);
    }

    /// Sets the filter chain.
    ///
    /// Returns whether the compositor can render `filters`. A chain it cannot
    /// render is not applied; any previously applied chain is cleared so the
    /// host can paint the filters itself.
    pub fn set_filters(&mut self, layer: LayerId, filters: FilterOperations) -> bool {
        let can_composite = self.compositor.filters_can_be_composited(&filters);
        if self.layer(layer).filters == filters {
            return can_composite;
        }
        debug_assert!(
            filters.is_empty() || !self.layer(layer).preserves_3d,
            "filters flatten, so they cannot be combined with preserves-3d"
        );
        if can_composite {
            self.layer_mut(layer).filters = filters;
            self.note_change(layer, ChangeFlags::FILTERS);
        } else if !self.layer(layer).filters.is_empty() {
            self.layer_mut(layer).filters = FilterOperations::default();
            self.note_change(layer, ChangeFlags::FILTERS);
        }
        can_composite
    }

    /// Draws the back face when the layer is turned away.
    pub fn set_backface_visibility(&mut self, layer: LayerId, visible: bool) {
        self.assign(
            layer,
            visible,
            |l| &mut l.backface_visibility,
            ChangeFlags::BACKFACE_VISIBILITY,
        );
    }

    /// Promises the compositor that painted contents cover the bounds.
    pub fn set_contents_opaque(&mut self, layer: LayerId, opaque: bool) {
        self.assign(layer, opaque, |l| &mut l.contents_opaque, ChangeFlags::CONTENTS_OPAQUE);
    }

    /// Requests GPU-accelerated painting of the backing store.
    pub fn set_accelerates_drawing(&mut self, layer: LayerId, accelerates: bool) {
        self.assign(
            layer,
            accelerates,
            |l| &mut l.accelerates_drawing,
            ChangeFlags::ACCELERATES_DRAWING,
        );
    }

    /// Where the contents layer sits within the layer.
    pub fn set_contents_rect(&mut self, layer: LayerId, rect: Rect) {
        self.assign(layer, rect, |l| &mut l.contents_rect, ChangeFlags::CONTENTS_RECT);
    }

    /// Sets the debug name shown on native layers.
    pub fn set_name(&mut self, layer: LayerId, name: &str) {
        if self.layer(layer).name == name {
            return;
        }
        self.layer_mut(layer).name = name.into();
        self.note_change(layer, ChangeFlags::NAME);
    }

    /// Snaps the backing store to device pixels under fractional page scale.
    pub fn set_maintains_pixel_alignment(&mut self, layer: LayerId, maintains: bool) {
        self.assign(
            layer,
            maintains,
            |l| &mut l.maintains_pixel_alignment,
            ChangeFlags::SCALE_SENSITIVE,
        );
    }

    /// Marks `layer` as the one that applies the page scale to its subtree.
    ///
    /// Pixel alignment of descendants is computed relative to this layer.
    pub fn set_applies_page_scale(&mut self, layer: LayerId, applies: bool) {
        self.assign(
            layer,
            applies,
            |l| &mut l.applies_page_scale,
            ChangeFlags::SCALE_SENSITIVE,
        );
    }

    /// Draws a coloured border describing the layer's backing.
    pub fn set_show_debug_border(&mut self, layer: LayerId, show: bool) {
        self.assign(
            layer,
            show,
            |l| &mut l.show_debug_border,
            ChangeFlags::DEBUG_INDICATORS,
        );
    }

    /// Shows a repaint counter over the layer.
    pub fn set_show_repaint_counter(&mut self, layer: LayerId, show: bool) {
        self.assign(
            layer,
            show,
            |l| &mut l.show_repaint_counter,
            ChangeFlags::DEBUG_INDICATORS,
        );
    }

    /// The device or page scale changed; geometry and contents scale of
    /// `layer` must be recomputed.
    pub fn device_or_page_scale_factor_changed(&mut self, layer: LayerId) {
        self.note_change(layer, ChangeFlags::SCALE_SENSITIVE);
    }

    /// [`device_or_page_scale_factor_changed`](Self::device_or_page_scale_factor_changed)
    /// for `layer`, its mask, its replica, and all descendants.
    pub fn note_device_or_page_scale_factor_changed_including_descendants(
        &mut self,
        layer: LayerId,
    ) {
        let mut stack = alloc::vec![layer];
        while let Some(id) = stack.pop() {
            self.device_or_page_scale_factor_changed(id);
            let l = self.layer(id);
            stack.extend(l.mask_layer);
            stack.extend(l.replica_layer);
            stack.extend(l.children.iter().copied());
        }
    }

    // -- Display API --

    /// Invalidates the whole backing store.
    pub fn set_needs_display(&mut self, layer: LayerId) {
        let size = self.layer(layer).size;
        self.set_needs_display_in_rect(layer, Rect::from_origin_size(Point::ZERO, size));
    }

    /// Invalidates `rect` (in layer coordinates) of the backing store.
    ///
    /// Ignored for layers that do not draw. Rects are clipped to the bounds;
    /// a rect already covered by a queued one is dropped, and once the queue
    /// is full further rects are merged into the first.
    pub fn set_needs_display_in_rect(&mut self, layer: LayerId, rect: Rect) {
        let max = self.config.max_dirty_rects;
        let l = self.layer_mut(layer);
        if !l.draws_content {
            return;
        }
        let bounds = Rect::from_origin_size(Point::ZERO, l.size);
        let rect = intersect_or_zero(&rect, &bounds);
        if rect_is_empty(&rect) {
            return;
        }
        if l.dirty_rects.iter().any(|d| rect_contains_rect(d, &rect)) {
            return;
        }
        if l.dirty_rects.len() < max {
            l.dirty_rects.push(rect);
        } else if let Some(first) = l.dirty_rects.first_mut() {
            *first = first.union(rect);
        }
        self.note_change(layer, ChangeFlags::DIRTY_RECTS);
    }

    /// Asks the contents layer to redisplay (e.g. a new media frame).
    pub fn set_contents_needs_display(&mut self, layer: LayerId) {
        self.note_change(layer, ChangeFlags::CONTENTS_NEEDS_DISPLAY);
    }

    // -- Contents API --

    /// Shows `image` as the layer's contents, or clears image contents.
    ///
    /// The contents layer is created at the next commit.
    pub fn set_contents_to_image(&mut self, layer: LayerId, image: Option<ImageId>) {
        let l = self.layer_mut(layer);
        if let Some(image) = image {
            if l.contents_image == Some(image) {
                return;
            }
            l.contents_image = Some(image);
            l.pending_image = Some(image);
            l.contents_purpose = ContentsLayerPurpose::Image;
            let current = l.contents;
            match current {
                None => self.note_sublayers_changed(layer),
                Some(c) if c.purpose != ContentsLayerPurpose::Image => {
                    self.replace_contents_layer(layer, None);
                    self.note_sublayers_changed(layer);
                }
                Some(_) => {}
            }
        } else {
            l.contents_image = None;
            l.pending_image = None;
            if l.contents_purpose == ContentsLayerPurpose::Image {
                l.contents_purpose = ContentsLayerPurpose::None;
            }
            if l.contents.is_some() {
                self.note_sublayers_changed(layer);
            }
        }
        self.note_change(layer, ChangeFlags::CONTENTS_IMAGE);
    }

    /// Fills the contents with a solid colour, or removes colour contents.
    pub fn set_contents_to_solid_color(&mut self, layer: LayerId, color: Option<Color>) {
        if self.layer(layer).contents_color == color {
            return;
        }
        self.layer_mut(layer).contents_color = color;
        if color.is_some() {
            let native = self
                .compositor
                .create_layer(NativeLayerKind::Layer, Some(layer));
            self.replace_contents_layer(
                layer,
                Some(ContentsLayer {
                    layer: native,
                    purpose: ContentsLayerPurpose::BackgroundColor,
                }),
            );
            self.layer_mut(layer).contents_purpose = ContentsLayerPurpose::BackgroundColor;
        } else {
            if self
                .layer(layer)
                .contents
                .is_some_and(|c| c.purpose == ContentsLayerPurpose::BackgroundColor)
            {
                self.replace_contents_layer(layer, None);
            }
            if self.layer(layer).contents_purpose == ContentsLayerPurpose::BackgroundColor {
                self.layer_mut(layer).contents_purpose = ContentsLayerPurpose::None;
            }
        }
        self.note_sublayers_changed(layer);
        self.note_change(layer, ChangeFlags::CONTENTS_COLOR);
    }

    /// Hosts a media layer owned by the caller as the contents.
    pub fn set_contents_to_media(&mut self, layer: LayerId, media: Option<NativeLayerId>) {
        self.set_external_contents(
            layer,
            media,
            ContentsLayerPurpose::Media,
            ChangeFlags::CONTENTS_MEDIA,
        );
    }

    /// Hosts a canvas layer owned by the caller as the contents.
    pub fn set_contents_to_canvas(&mut self, layer: LayerId, canvas: Option<NativeLayerId>) {
        self.set_external_contents(
            layer,
            canvas,
            ContentsLayerPurpose::Canvas,
            ChangeFlags::CONTENTS_CANVAS,
        );
    }

    fn set_external_contents(
        &mut self,
        layer: LayerId,
        native: Option<NativeLayerId>,
        purpose: ContentsLayerPurpose,
        flag: ChangeFlags,
    ) {
        if self.layer(layer).contents_layer() == native {
            return;
        }
        self.replace_contents_layer(
            layer,
            native.map(|layer| ContentsLayer { layer, purpose }),
        );
        self.layer_mut(layer).contents_purpose = if native.is_some() {
            purpose
        } else {
            ContentsLayerPurpose::None
        };
        self.note_sublayers_changed(layer);
        self.note_change(layer, flag);
    }

    /// Swaps the contents layer, releasing an owned predecessor and its
    /// clones.
    pub(crate) fn replace_contents_layer(&mut self, layer: LayerId, new: Option<ContentsLayer>) {
        let (data, compositor) = self.split(layer);
        if let Some(old) = data.contents.take()
            && old.purpose.owns_layer()
            && Some(old.layer) != new.map(|c| c.layer)
        {
            compositor.remove_from_superlayer(old.layer);
            compositor.release_layer(old.layer);
        }
        for (_, clone) in data.clones.contents.drain() {
            compositor.release_layer(clone);
        }
        data.contents = new;
    }

    // -- Query API --

    /// Returns the parent, or `None` for a root.
    #[must_use]
    pub fn parent(&self, layer: LayerId) -> Option<LayerId> {
        self.layer(layer).parent
    }

    /// Returns the children in paint order.
    #[must_use]
    pub fn children(&self, layer: LayerId) -> &[LayerId] {
        &self.layer(layer).children
    }

    /// Returns the mask layer.
    #[must_use]
    pub fn mask_layer(&self, layer: LayerId) -> Option<LayerId> {
        self.layer(layer).mask_layer
    }

    /// Returns the layer drawing `layer`'s reflection.
    #[must_use]
    pub fn replica_layer(&self, layer: LayerId) -> Option<LayerId> {
        self.layer(layer).replica_layer
    }

    /// Returns the layer that `replica` reflects.
    #[must_use]
    pub fn replicated_layer(&self, replica: LayerId) -> Option<LayerId> {
        self.layer(replica).replicated_layer
    }

    /// Returns the debug name.
    #[must_use]
    pub fn name(&self, layer: LayerId) -> &str {
        &self.layer(layer).name
    }

    /// Returns the position.
    #[must_use]
    pub fn position(&self, layer: LayerId) -> Point {
        self.layer(layer).position
    }

    /// Returns the anchor point.
    #[must_use]
    pub fn anchor_point(&self, layer: LayerId) -> Point3 {
        self.layer(layer).anchor_point
    }

    /// Returns the size.
    #[must_use]
    pub fn size(&self, layer: LayerId) -> Size {
        self.layer(layer).size
    }

    /// Returns the bounds origin.
    #[must_use]
    pub fn bounds_origin(&self, layer: LayerId) -> Point {
        self.layer(layer).bounds_origin
    }

    /// Returns the layer transform.
    #[must_use]
    pub fn transform(&self, layer: LayerId) -> Transform3d {
        self.layer(layer).transform
    }

    /// Returns the children transform.
    #[must_use]
    pub fn children_transform(&self, layer: LayerId) -> Transform3d {
        self.layer(layer).children_transform
    }

    /// Returns the opacity.
    #[must_use]
    pub fn opacity(&self, layer: LayerId) -> f32 {
        self.layer(layer).opacity
    }

    /// Returns the applied filter chain.
    #[must_use]
    pub fn filters(&self, layer: LayerId) -> &FilterOperations {
        &self.layer(layer).filters
    }

    /// Returns whether the layer preserves 3-D.
    #[must_use]
    pub fn preserves_3d(&self, layer: LayerId) -> bool {
        self.layer(layer).preserves_3d
    }

    /// Returns whether the layer clips to its bounds.
    #[must_use]
    pub fn masks_to_bounds(&self, layer: LayerId) -> bool {
        self.layer(layer).masks_to_bounds
    }

    /// Returns whether the layer has a backing store.
    #[must_use]
    pub fn draws_content(&self, layer: LayerId) -> bool {
        self.layer(layer).draws_content
    }

    /// Returns whether the layer's contents are shown.
    #[must_use]
    pub fn contents_visible(&self, layer: LayerId) -> bool {
        self.layer(layer).contents_visible
    }

    /// Returns what the contents layer is showing.
    #[must_use]
    pub fn contents_layer_purpose(&self, layer: LayerId) -> ContentsLayerPurpose {
        self.layer(layer).contents_purpose
    }

    /// Changes recorded since the last commit.
    #[must_use]
    pub fn uncommitted_changes(&self, layer: LayerId) -> ChangeFlags {
        self.layer(layer).uncommitted
    }

    /// Dirty rectangles queued for the next commit.
    #[must_use]
    pub fn dirty_rects(&self, layer: LayerId) -> &[Rect] {
        &self.layer(layer).dirty_rects
    }

    /// The visible rect computed by the last full flush, in layer
    /// coordinates.
    #[must_use]
    pub fn visible_rect(&self, layer: LayerId) -> Rect {
        self.layer(layer).visible_rect
    }

    /// The native layer created for `layer` (its backing).
    #[must_use]
    pub fn native_layer(&self, layer: LayerId) -> NativeLayerId {
        self.layer(layer).native
    }

    /// The native layer that represents `layer` to its parent: the
    /// structural layer if present, otherwise the backing.
    #[doc(alias = "layer_for_superlayer")]
    #[must_use]
    pub fn primary_native_layer(&self, layer: LayerId) -> NativeLayerId {
        self.layer(layer).primary_layer()
    }

    /// The structural layer, if one is interposed.
    #[must_use]
    pub fn structural_native_layer(&self, layer: LayerId) -> Option<NativeLayerId> {
        self.layer(layer).structural
    }

    /// The contents layer, if any.
    #[must_use]
    pub fn contents_native_layer(&self, layer: LayerId) -> Option<NativeLayerId> {
        self.layer(layer).contents_layer()
    }

    /// Returns whether the backing is currently tiled.
    #[must_use]
    pub fn uses_tiled_backing(&self, layer: LayerId) -> bool {
        self.layer(layer).using_tiled_backing
    }

    /// Number of native clones made of `layer` for reflections.
    #[must_use]
    pub fn clone_count(&self, layer: LayerId) -> usize {
        self.layer(layer).clones.len()
    }

    /// Returns whether the children's native layers are currently detached
    /// because `layer` sits beyond the depth limit.
    #[must_use]
    pub fn sublayers_pruned(&self, layer: LayerId) -> bool {
        self.layer(layer).sublayers_pruned
    }

    // -- Change notification --

    /// Records `flags` on `layer` and requests a flush when the layer goes
    /// from clean to dirty, or when its ability to defer the flush changes.
    pub(crate) fn note_change(&mut self, layer: LayerId, flags: ChangeFlags) {
        let l = self.layer_mut(layer);
        let had_changes = !l.uncommitted.is_empty();
        let could_throttle = !l.uncommitted.contains(ChangeFlags::TILES_ADDED);
        l.uncommitted |= flags;
        let can_throttle = !l.uncommitted.contains(ChangeFlags::TILES_ADDED);
        if !had_changes || could_throttle != can_throttle {
            self.client.notify_flush_required(layer);
        }
    }

    pub(crate) fn note_sublayers_changed(&mut self, layer: LayerId) {
        self.note_change(layer, ChangeFlags::CHILDREN);
        self.propagate_layer_change_to_replicas(layer);
    }

    /// Marks every replica whose reflection includes `layer` for re-cloning.
    pub(crate) fn propagate_layer_change_to_replicas(&mut self, layer: LayerId) {
        let mut current = Some(layer);
        while let Some(id) = current {
            let l = self.layer(id);
            if l.clones.primary.is_empty() {
                break;
            }
            let (replica, parent) = (l.replica_layer, l.parent);
            if let Some(replica) = replica {
                self.note_change(replica, ChangeFlags::REPLICATED_LAYER);
            }
            current = parent;
        }
    }

    /// Stores `value` in the field chosen by `field` and records `flags`.
    ///
    /// Returns `false` (recording nothing) if the value is unchanged.
    fn assign<T: PartialEq>(
        &mut self,
        layer: LayerId,
        value: T,
        field: impl FnOnce(&mut LayerData) -> &mut T,
        flags: ChangeFlags,
    ) -> bool {
        let slot = field(self.layer_mut(layer));
        if *slot == value {
            return false;
        }
        *slot = value;
        self.note_change(layer, flags);
        true
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            self.is_alive(id),
            "stale LayerId: {id:?} (current gen: {})",
            self.generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }

    pub(crate) fn layer(&self, id: LayerId) -> &LayerData {
        match self.slots.get(id.idx as usize) {
            Some(Some(data)) if self.generation[id.idx as usize] == id.generation => data,
            _ => panic!("stale LayerId: {id:?}"),
        }
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> &mut LayerData {
        match self.slots.get_mut(id.idx as usize) {
            Some(Some(data)) if self.generation[id.idx as usize] == id.generation => data,
            _ => panic!("stale LayerId: {id:?}"),
        }
    }

    /// Borrows a layer and the compositor together.
    pub(crate) fn split(&mut self, id: LayerId) -> (&mut LayerData, &mut C) {
        let data = match self.slots.get_mut(id.idx as usize) {
            Some(Some(data)) if self.generation[id.idx as usize] == id.generation => data,
            _ => panic!("stale LayerId: {id:?}"),
        };
        (data, &mut self.compositor)
    }

    /// Handles of all live layers.
    pub(crate) fn live_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let idx = u32::try_from(i).ok()?;
            slot.as_ref().map(|_| LayerId {
                idx,
                generation: self.generation[i],
            })
        })
    }

    /// The live logical layer that created `native`, if any.
    pub(crate) fn owner_of(&self, native: NativeLayerId) -> Option<LayerId> {
        self.compositor
            .owner(native)
            .filter(|id| self.is_alive(*id))
    }
}

// ---------------------------------------------------------------------------
// Native callbacks
// ---------------------------------------------------------------------------

impl<C: Compositor, L: LayerClient> NativeLayerClient for LayerTree<C, L> {
    fn animation_started(&mut self, layer: NativeLayerId, start_time: f64) {
        if let Some(owner) = self.owner_of(layer) {
            self.client.notify_animation_started(owner, start_time);
        }
    }

    fn paint_contents(&mut self, layer: NativeLayerId, clip: Rect) {
        if let Some(owner) = self.owner_of(layer) {
            self.client.paint_contents(owner, clip);
        }
    }

    fn did_create_tiles(&mut self, layer: NativeLayerId, dirty_rects: &[Rect]) {
        let Some(owner) = self.owner_of(layer) else {
            return;
        };
        for rect in dirty_rects {
            self.set_needs_display_in_rect(owner, *rect);
        }
        self.note_tiles_added(owner);
    }

    fn shows_debug_borders(&self, layer: NativeLayerId) -> bool {
        self.owner_of(layer)
            .is_some_and(|o| self.layer(o).show_debug_border)
    }

    fn shows_repaint_counter(&self, layer: NativeLayerId) -> bool {
        self.owner_of(layer).is_some_and(|o| {
            let l = self.layer(o);
            l.show_repaint_counter && !l.page_tiled
        })
    }

    fn draws_content(&self, layer: NativeLayerId) -> bool {
        self.owner_of(layer)
            .is_some_and(|o| self.layer(o).draws_content)
    }

    fn contents_opaque(&self, layer: NativeLayerId) -> bool {
        self.owner_of(layer)
            .is_some_and(|o| self.layer(o).contents_opaque)
    }
}
