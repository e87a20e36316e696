// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiled backings.
//!
//! A drawing layer larger than [`CommitConfig::max_pixel_dimension`] in
//! either scaled dimension swaps its plain backing for a tiled one. The swap
//! keeps the native layer's position in the tree, its sublayers, and its
//! running animations; every property is then re-applied from scratch.
//!
//! Tiled backings only render tiles near their *visible rect*. While a layer
//! moves, the visible rect is stretched in the direction of travel so tiles
//! are ready before they scroll into view.
//!
//! [`CommitConfig::max_pixel_dimension`]: crate::config::CommitConfig::max_pixel_dimension

use kurbo::{Rect, Size};

use crate::dirty::ChangeFlags;
use crate::geometry::rect_is_empty;
use crate::native::{Compositor, NativeLayerKind, TiledBacking};
use crate::trace::{BackingSwapEvent, Tracer};

use super::animations::AnimationTransfer;
use super::{LayerClient, LayerId, LayerTree};

/// Smallest contents scale handed to the compositor.
const MIN_CONTENTS_SCALE: f64 = 0.01;
/// Largest contents scale handed to the compositor.
const MAX_CONTENTS_SCALE: f64 = 10.0;

/// Extends `new_visible` in the direction the visible rect moved since
/// `old_visible`, by twice the distance moved.
///
/// An edge is only pushed outwards as far as `existing_tile_rect` (the tiled
/// backing's current visible rect) already reaches; coverage the backing has
/// is kept rather than thrown away. If the layer was resized, or there is no
/// previous visible rect, `new_visible` is returned unchanged.
#[must_use]
pub fn adjust_tiled_layer_visible_rect(
    existing_tile_rect: Rect,
    old_visible: Rect,
    new_visible: Rect,
    old_size: Size,
    new_size: Size,
) -> Rect {
    if rect_is_empty(&old_visible) || old_size != new_size {
        return new_visible;
    }

    let mut out = new_visible;

    let left_delta = 2.0 * (new_visible.x0 - old_visible.x0);
    if left_delta < 0.0 {
        out.x0 = (new_visible.x0 + left_delta).min(existing_tile_rect.x0);
    }
    let right_delta = 2.0 * (new_visible.x1 - old_visible.x1);
    if right_delta > 0.0 {
        out.x1 = (new_visible.x1 + right_delta).max(existing_tile_rect.x1);
    }

    let top_delta = 2.0 * (new_visible.y0 - old_visible.y0);
    if top_delta < 0.0 {
        out.y0 = (new_visible.y0 + top_delta).min(existing_tile_rect.y0);
    }
    let bottom_delta = 2.0 * (new_visible.y1 - old_visible.y1);
    if bottom_delta > 0.0 {
        out.y1 = (new_visible.y1 + bottom_delta).max(existing_tile_rect.y1);
    }

    out
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    /// Whether `layer` needs a tiled backing at `page_scale`.
    pub(crate) fn requires_tiled_layer(&self, layer: LayerId, page_scale: f64) -> bool {
        let l = self.layer(layer);
        if !l.draws_content || !l.allow_tiled_layer || l.page_tiled {
            return false;
        }
        let max = self.config.max_pixel_dimension;
        l.size.width * page_scale > max || l.size.height * page_scale > max
    }

    /// Replaces the backing with a tiled one (`use_tiled == true`) or a plain
    /// one.
    pub(crate) fn swap_from_or_to_tiled_layer(
        &mut self,
        layer: LayerId,
        use_tiled: bool,
        tracer: &mut Tracer<'_>,
    ) {
        let (data, compositor) = self.split(layer);
        debug_assert!(!data.page_tiled, "page tiled layers never swap");
        let kind = if use_tiled {
            NativeLayerKind::TiledBackingLayer
        } else {
            NativeLayerKind::WebLayer
        };
        let old = data.native;
        let new = compositor.create_layer(kind, Some(layer));
        compositor.adopt_sublayers(new, old);
        if let Some(superlayer) = compositor.superlayer(old) {
            compositor.replace_sublayer(superlayer, old, new);
        }
        compositor.set_name(new, &data.name);
        data.native = new;
        data.using_tiled_backing = use_tiled;
        data.uncommitted |= ChangeFlags::BACKING_SWAP;
        if use_tiled {
            data.uncommitted |= ChangeFlags::VISIBLE_RECT;
        }

        self.move_or_copy_animations(layer, AnimationTransfer::Move, old, new);
        self.compositor.release_layer(old);
        self.set_needs_display(layer);
        self.client.tiled_backing_usage_changed(layer, use_tiled);
        tracer.backing_swap(&BackingSwapEvent {
            layer,
            tiled: use_tiled,
        });
    }

    /// Pushes the visible rect to the tiled backing, stretched along the
    /// direction of movement.
    pub(crate) fn update_visible_rect(&mut self, layer: LayerId, old_visible: Rect) {
        let (data, compositor) = self.split(layer);
        let kind = compositor.layer_kind(data.native);
        if !kind.uses_tiled_backing() {
            return;
        }
        let mut tile_area = data.visible_rect;
        if kind == NativeLayerKind::TiledBackingLayer {
            let existing = compositor
                .tiled_backing(data.native)
                .map_or(Rect::ZERO, |t| t.visible_rect());
            tile_area = adjust_tiled_layer_visible_rect(
                existing,
                old_visible,
                data.visible_rect,
                data.size_at_last_visible_rect_update,
                data.size,
            );
        }
        if let Some(tiles) = compositor.tiled_backing_mut(data.native) {
            tiles.set_visible_rect(tile_area);
        }
        data.size_at_last_visible_rect_update = data.size;
    }

    /// Applies the combined page and device scale to the backing.
    pub(crate) fn update_contents_scale(&mut self, layer: LayerId, page_scale: f64) {
        let scale = (page_scale * self.client.device_scale_factor())
            .clamp(MIN_CONTENTS_SCALE, MAX_CONTENTS_SCALE);
        let (data, compositor) = self.split(layer);
        compositor.set_contents_scale(data.native, scale);
        if data.draws_content {
            compositor.set_needs_display(data.native, None);
        }
    }

    /// The tiled backing behind `layer`, if its backing is tiled.
    #[must_use]
    pub fn tiled_backing(&self, layer: LayerId) -> Option<&dyn TiledBacking> {
        self.compositor.tiled_backing(self.layer(layer).native)
    }

    /// Bytes of backing store `layer` is expected to use.
    ///
    /// Tiled backings report their retained tiles; plain backings are
    /// estimated at four bytes per device pixel.
    #[must_use]
    pub fn backing_store_memory_estimate(&self, layer: LayerId) -> f64 {
        let l = self.layer(layer);
        if !l.draws_content {
            return 0.0;
        }
        if let Some(tiles) = self.compositor.tiled_backing(l.native) {
            return tiles.retained_tile_backing_store_memory();
        }
        let scale = self.compositor.contents_scale(l.native);
        4.0 * l.size.width * scale * l.size.height * scale
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::animation::{Animation, Keyframe, KeyframeValueList};
    use crate::config::CommitConfig;
    use crate::geometry::Color;
    use crate::layer::{ClientEvent, RecordingClient};
    use crate::native::HeadlessCompositor;

    type Tree = LayerTree<HeadlessCompositor, RecordingClient>;

    fn tree() -> Tree {
        LayerTree::new(
            HeadlessCompositor::new(),
            RecordingClient::new(),
            CommitConfig::modern(),
        )
    }

    fn flush(tree: &mut Tree, root: LayerId) {
        tree.flush_compositing_state(root, Rect::new(0.0, 0.0, 800.0, 600.0), &mut Tracer::none());
    }

    #[test]
    fn expansion_follows_movement() {
        let old = Rect::new(0.0, 0.0, 100.0, 100.0);
        let new = Rect::new(20.0, 0.0, 120.0, 100.0);
        let size = Size::new(1000.0, 1000.0);
        assert_eq!(
            adjust_tiled_layer_visible_rect(old, old, new, size, size),
            Rect::new(20.0, 0.0, 160.0, 100.0)
        );
    }

    #[test]
    fn expansion_keeps_existing_coverage() {
        let old = Rect::new(100.0, 100.0, 200.0, 200.0);
        let new = Rect::new(90.0, 100.0, 190.0, 200.0);
        let existing = Rect::new(0.0, 0.0, 300.0, 300.0);
        let size = Size::new(1000.0, 1000.0);
        assert_eq!(
            adjust_tiled_layer_visible_rect(existing, old, new, size, size),
            Rect::new(0.0, 100.0, 190.0, 200.0)
        );
    }

    #[test]
    fn no_expansion_after_resize_or_without_history() {
        let old = Rect::new(0.0, 0.0, 100.0, 100.0);
        let new = Rect::new(50.0, 0.0, 150.0, 100.0);
        let a = Size::new(1000.0, 1000.0);
        let b = Size::new(1000.0, 900.0);
        assert_eq!(adjust_tiled_layer_visible_rect(old, old, new, a, b), new);
        assert_eq!(adjust_tiled_layer_visible_rect(old, Rect::ZERO, new, a, a), new);
    }

    #[test]
    fn tiling_threshold() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_draws_content(id, true);
        tree.set_size(id, Size::new(2000.0, 100.0));
        assert!(!tree.requires_tiled_layer(id, 1.0), "limit is exclusive");
        assert!(tree.requires_tiled_layer(id, 1.5), "scaled size counts");
        tree.set_allow_tiled_layer(id, false);
        assert!(!tree.requires_tiled_layer(id, 1.5));

        let page = tree.create_layer_with_page_tiles();
        tree.set_draws_content(page, true);
        tree.set_size(page, Size::new(5000.0, 5000.0));
        assert!(!tree.requires_tiled_layer(page, 1.0), "page tiles never swap");
    }

    #[test]
    fn swap_preserves_tree_position_and_state() {
        let mut tree = tree();
        let root = tree.create_layer();
        let big = tree.create_layer();
        let kid = tree.create_layer();
        tree.add_child(root, big);
        tree.add_child(big, kid);
        tree.set_draws_content(big, true);
        tree.set_size(big, Size::new(100.0, 100.0));
        tree.set_background_color(big, Color::rgb(0, 0, 255));
        let values =
            KeyframeValueList::Opacity(alloc::vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]);
        assert!(tree.add_animation(
            big,
            &values,
            Size::new(100.0, 100.0),
            Some(&Animation::new(1.0)),
            "fade",
            0.0,
        ));
        flush(&mut tree, root);
        let plain = tree.native_layer(big);
        assert!(!tree.uses_tiled_backing(big));

        tree.set_size(big, Size::new(3000.0, 100.0));
        flush(&mut tree, root);
        let tiled = tree.native_layer(big);
        assert_ne!(plain, tiled);
        assert!(tree.uses_tiled_backing(big));

        let c = tree.compositor();
        assert!(c.layer(plain).released);
        assert_eq!(c.layer(tiled).kind, NativeLayerKind::TiledBackingLayer);
        assert_eq!(c.layer(tiled).superlayer, Some(tree.native_layer(root)));
        assert_eq!(c.layer(tiled).sublayers, [tree.native_layer(kid)]);
        assert_eq!(c.layer(tiled).background_color, Color::rgb(0, 0, 255));
        assert_eq!(c.layer(tiled).animations.len(), 1);
        assert!(c.layer(plain).animations.is_empty());
        assert!(
            tree.client()
                .events
                .contains(&ClientEvent::TiledBackingUsageChanged(big, true))
        );

        let tiles = c.tiled_backing(tiled).expect("tiled backing");
        assert!(!rect_is_empty(&tiles.visible_rect()));
    }

    #[test]
    fn swap_back_when_shrunk() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_draws_content(id, true);
        tree.set_size(id, Size::new(4000.0, 100.0));
        flush(&mut tree, id);
        assert!(tree.uses_tiled_backing(id));
        tree.set_size(id, Size::new(400.0, 100.0));
        flush(&mut tree, id);
        assert!(!tree.uses_tiled_backing(id));
        let native = tree.native_layer(id);
        assert_eq!(tree.compositor().layer(native).kind, NativeLayerKind::WebLayer);
        assert_eq!(tree.compositor().layer(native).position, Point::new(200.0, 50.0));
    }

    #[test]
    fn contents_scale_is_clamped() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.client_mut().device_scale = 40.0;
        flush(&mut tree, id);
        let native = tree.native_layer(id);
        assert_eq!(tree.compositor().layer(native).contents_scale, 10.0);
    }

    #[test]
    fn memory_estimate() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_size(id, Size::new(10.0, 20.0));
        assert_eq!(tree.backing_store_memory_estimate(id), 0.0);
        tree.set_draws_content(id, true);
        tree.client_mut().device_scale = 2.0;
        flush(&mut tree, id);
        assert_eq!(tree.backing_store_memory_estimate(id), 4.0 * 20.0 * 40.0);
    }
}
