// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-step property updates applied during the before-children phase.
//!
//! Each [`CommitStep`] maps to one handler here. Handlers push the layer's
//! logical state to its native layers and to every replica clone of them.
//! Clones at the root of a reflection are positioned by the replica itself,
//! so geometry, transform, opacity, and filter updates leave them alone
//! while the layer has a replica.

use alloc::format;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::dirty::{ChangeFlags, CommitStep};
use crate::geometry::{Color, PixelAlignment, Point3, compute_pixel_alignment, is_integral};
use crate::native::{Compositor, NativeLayerId, NativeLayerKind};
use crate::trace::Tracer;
use crate::transform::Transform3d;

use super::clone::CloneId;
use super::tree::{ContentsLayer, ContentsLayerPurpose};
use super::{LayerClient, LayerId, LayerTree, StructuralLayerPurpose};

/// Border drawn around contents layers when debug borders are on.
const CONTENTS_LAYER_BORDER: (Color, f64) = (Color::rgba(0, 0, 128, 180), 1.0);

/// Iterates `clones`, leaving out reflection roots when `skip_roots` is set.
fn clones_except_roots(
    clones: &HashMap<CloneId, NativeLayerId>,
    skip_roots: bool,
) -> impl Iterator<Item = NativeLayerId> + '_ {
    clones
        .iter()
        .filter(move |(id, _)| !(skip_roots && id.is_replica_root()))
        .map(|(_, layer)| *layer)
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    /// Runs the handler for `step`.
    pub(crate) fn apply_step(
        &mut self,
        layer: LayerId,
        step: CommitStep,
        page_scale: f64,
        base_position: Point,
        old_visible_rect: Rect,
        tracer: &mut Tracer<'_>,
    ) {
        match step {
            CommitStep::StructuralLayer => {
                let purpose = self.structural_layer_purpose(layer);
                self.ensure_structural_layer(layer, purpose, tracer);
            }
            CommitStep::Geometry => self.update_geometry(layer, page_scale, base_position),
            CommitStep::DrawsContent => self.update_draws_content(layer),
            CommitStep::Name => self.update_names(layer),
            CommitStep::ContentsImage => self.update_contents_image(layer),
            CommitStep::ContentsMedia => self.update_external_contents(layer, false),
            CommitStep::ContentsCanvas => self.update_external_contents(layer, true),
            CommitStep::ContentsColor => self.update_contents_color(layer),
            CommitStep::BackgroundColor => {
                let (data, compositor) = self.split(layer);
                compositor.set_background_color(data.native, data.background_color);
            }
            CommitStep::Transform => self.update_transform(layer),
            CommitStep::ChildrenTransform => self.update_children_transform(layer),
            CommitStep::MasksToBounds => self.update_masks_to_bounds(layer),
            CommitStep::ContentsVisibility => self.update_contents_visibility(layer),
            CommitStep::ContentsOpaque => self.update_contents_opaque(layer),
            CommitStep::BackfaceVisibility => self.update_backface_visibility(layer),
            CommitStep::Opacity => self.update_opacity(layer),
            CommitStep::Filters => self.update_filters(layer),
            CommitStep::Animations => self.update_animations(layer),
            CommitStep::ContentsScale => self.update_contents_scale(layer, page_scale),
            CommitStep::VisibleRect => self.update_visible_rect(layer, old_visible_rect),
            CommitStep::DirtyRects => self.repaint_dirty_rects(layer),
            CommitStep::ContentsRect => self.update_contents_rect(layer),
            CommitStep::MaskLayer => self.update_mask_layer(layer),
            CommitStep::ContentsNeedsDisplay => {
                let (data, compositor) = self.split(layer);
                if let Some(contents) = data.contents_layer() {
                    compositor.set_needs_display(contents, None);
                }
            }
            CommitStep::AcceleratesDrawing => {
                let (data, compositor) = self.split(layer);
                compositor.set_accelerates_drawing(data.native, data.accelerates_drawing);
            }
            CommitStep::DebugIndicators => self.update_debug_indicators(layer),
            CommitStep::Children => {
                self.update_sublayer_list(layer, false);
                // Children may raise it again for the after-children phase.
                self.layer_mut(layer).uncommitted.remove(ChangeFlags::CHILDREN);
            }
        }
    }

    // -- Geometry --

    fn update_geometry(&mut self, layer: LayerId, page_scale: f64, base_position: Point) {
        let l = self.layer(layer);
        let aligned = if l.maintains_pixel_alignment
            && !is_integral(page_scale)
            && l.draws_content
            && !l.masks_to_bounds
        {
            compute_pixel_alignment(l.position, l.size, l.anchor_point, page_scale, base_position)
        } else {
            PixelAlignment::unaligned(l.position, l.size, l.anchor_point)
        };

        let bounds = Rect::from_origin_size(l.bounds_origin - aligned.offset, aligned.size);
        let mut anchor = aligned.anchor;
        let mut position = Point::new(
            aligned.position.x + anchor.x * aligned.size.width,
            aligned.position.y + anchor.y * aligned.size.height,
        );
        let skip_roots = l.replica_layer.is_some();
        let clone_root_position = self.position_for_clone_root(layer);
        let (data, compositor) = self.split(layer);

        if let Some(shim) = data.structural {
            let shim_position = Point::new(
                data.position.x + data.anchor_point.x * data.size.width,
                data.position.y + data.anchor_point.y * data.size.height,
            );
            let shim_bounds = Rect::from_origin_size(data.bounds_origin, data.size);
            compositor.set_position(shim, shim_position);
            compositor.set_bounds(shim, shim_bounds);
            compositor.set_anchor_point(shim, data.anchor_point);
            for (id, clone) in &data.clones.structural {
                let p = if skip_roots && id.is_replica_root() {
                    clone_root_position
                } else {
                    shim_position
                };
                compositor.set_position(*clone, p);
                compositor.set_bounds(*clone, shim_bounds);
                compositor.set_anchor_point(*clone, data.anchor_point);
            }

            // The backing sits centred in the structural layer.
            anchor = Point3::CENTER;
            position = Point::new(
                0.5 * aligned.size.width - aligned.offset.x,
                0.5 * aligned.size.height - aligned.offset.y,
            );
        }

        compositor.set_position(data.native, position);
        compositor.set_bounds(data.native, bounds);
        compositor.set_anchor_point(data.native, anchor);
        let root_special = data.structural.is_none() && skip_roots;
        for (id, clone) in &data.clones.primary {
            let p = if root_special && id.is_replica_root() {
                clone_root_position
            } else {
                position
            };
            compositor.set_position(*clone, p);
            compositor.set_bounds(*clone, bounds);
            compositor.set_anchor_point(*clone, anchor);
        }
    }

    fn update_transform(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_transform(data.primary_layer(), &data.transform);
        let has_replica = data.replica_layer.is_some();
        for (id, clone) in data.primary_clones() {
            let t = if has_replica && id.is_replica_root() {
                Transform3d::IDENTITY
            } else {
                data.transform
            };
            compositor.set_transform(*clone, &t);
        }
    }

    fn update_children_transform(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_sublayer_transform(data.primary_layer(), &data.children_transform);
        for clone in data.primary_clones().values() {
            compositor.set_sublayer_transform(*clone, &data.children_transform);
        }
    }

    // -- Backing properties --

    fn update_draws_content(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        if data.draws_content {
            compositor.set_needs_display(data.native, None);
        } else {
            compositor.set_contents(data.native, None);
            for clone in data.clones.primary.values() {
                compositor.set_contents(*clone, None);
            }
        }
    }

    fn update_names(&mut self, layer: LayerId) {
        let purpose = self.structural_layer_purpose(layer);
        let (data, compositor) = self.split(layer);
        if let Some(shim) = data.structural {
            let name = match purpose {
                StructuralLayerPurpose::Preserve3D => format!("Transform layer {}", data.name),
                StructuralLayerPurpose::ReplicaFlattening => {
                    format!("Replica flattening layer {}", data.name)
                }
                StructuralLayerPurpose::None => data.name.clone(),
            };
            compositor.set_name(shim, &name);
        }
        compositor.set_name(data.native, &data.name);
    }

    fn update_masks_to_bounds(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_masks_to_bounds(data.native, data.masks_to_bounds);
        for clone in data.clones.primary.values() {
            compositor.set_masks_to_bounds(*clone, data.masks_to_bounds);
        }
    }

    fn update_contents_visibility(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        if data.contents_visible {
            if data.draws_content {
                compositor.set_needs_display(data.native, None);
            }
        } else {
            compositor.set_contents(data.native, None);
            for clone in data.clones.primary.values() {
                compositor.set_contents(*clone, None);
            }
        }
    }

    fn update_contents_opaque(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_opaque(data.native, data.contents_opaque);
        for clone in data.clones.primary.values() {
            compositor.set_opaque(*clone, data.contents_opaque);
        }
    }

    fn update_backface_visibility(&mut self, layer: LayerId) {
        let flattening =
            self.structural_layer_purpose(layer) == StructuralLayerPurpose::ReplicaFlattening;
        let (data, compositor) = self.split(layer);
        let double_sided = data.backface_visibility;
        if flattening && let Some(shim) = data.structural {
            compositor.set_double_sided(shim, double_sided);
            for clone in data.clones.structural.values() {
                compositor.set_double_sided(*clone, double_sided);
            }
        }
        compositor.set_double_sided(data.native, double_sided);
        for clone in data.clones.primary.values() {
            compositor.set_double_sided(*clone, double_sided);
        }
    }

    fn update_opacity(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_opacity(data.primary_layer(), data.opacity);
        for clone in clones_except_roots(data.primary_clones(), data.replica_layer.is_some()) {
            compositor.set_opacity(clone, data.opacity);
        }
    }

    fn update_filters(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        compositor.set_filters(data.native, &data.filters);
        for clone in clones_except_roots(&data.clones.primary, data.replica_layer.is_some()) {
            compositor.set_filters(clone, &data.filters);
        }
    }

    fn repaint_dirty_rects(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        for rect in data.dirty_rects.drain(..) {
            compositor.set_needs_display(data.native, Some(rect));
        }
    }

    fn update_mask_layer(&mut self, layer: LayerId) {
        let mask = self.layer(layer).mask_layer;
        let mask_primary = mask.map(|m| self.layer(m).primary_layer());
        let mask_clones: HashMap<CloneId, NativeLayerId> = mask
            .map(|m| self.layer(m).primary_clones().clone())
            .unwrap_or_default();
        let (data, compositor) = self.split(layer);
        compositor.set_mask(data.native, mask_primary);
        for (id, clone) in &data.clones.primary {
            compositor.set_mask(*clone, mask_clones.get(id).copied());
        }
    }

    // -- Contents --

    fn update_contents_image(&mut self, layer: LayerId) {
        let show_border = self.layer(layer).show_debug_border;
        if let Some(image) = self.layer(layer).pending_image {
            if self.layer(layer).contents.is_none() {
                let native = self
                    .compositor
                    .create_layer(NativeLayerKind::Layer, Some(layer));
                self.replace_contents_layer(
                    layer,
                    Some(ContentsLayer {
                        layer: native,
                        purpose: ContentsLayerPurpose::Image,
                    }),
                );
            }
            let (data, compositor) = self.split(layer);
            let Some(contents) = data.contents_layer() else {
                return;
            };
            setup_contents_layer(compositor, contents, show_border);
            compositor.set_contents(contents, Some(image));
            data.pending_image = None;
            for clone in data.clones.contents.values() {
                compositor.set_contents(*clone, Some(image));
            }
            self.update_contents_rect(layer);
        } else if self
            .layer(layer)
            .contents
            .is_some_and(|c| c.purpose == ContentsLayerPurpose::Image)
        {
            self.replace_contents_layer(layer, None);
        }
    }

    fn update_external_contents(&mut self, layer: LayerId, canvas: bool) {
        let show_border = self.layer(layer).show_debug_border;
        let (data, compositor) = self.split(layer);
        let Some(contents) = data.contents_layer() else {
            return;
        };
        setup_contents_layer(compositor, contents, show_border);
        if canvas {
            compositor.set_needs_display(contents, None);
        }
        self.update_contents_rect(layer);
    }

    fn update_contents_color(&mut self, layer: LayerId) {
        let show_border = self.layer(layer).show_debug_border;
        let (data, compositor) = self.split(layer);
        let Some(ContentsLayer {
            layer: contents,
            purpose: ContentsLayerPurpose::BackgroundColor,
        }) = data.contents
        else {
            return;
        };
        setup_contents_layer(compositor, contents, show_border);
        let color = data.contents_color.unwrap_or(Color::TRANSPARENT);
        compositor.set_background_color(contents, color);
        for clone in data.clones.contents.values() {
            compositor.set_background_color(*clone, color);
        }
        self.update_contents_rect(layer);
    }

    fn update_contents_rect(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        let Some(contents) = data.contents_layer() else {
            return;
        };
        let rect = data.contents_rect;
        let position = Point::new(rect.x0, rect.y0);
        let bounds = Rect::from_origin_size(Point::ZERO, rect.size());
        let targets = core::iter::once(contents).chain(data.clones.contents.values().copied());
        for target in targets {
            compositor.set_position(target, position);
            compositor.set_bounds(target, bounds);
        }
    }

    // -- Debug indicators --

    /// Colour and width of the debug border `layer` would show.
    ///
    /// The colour encodes the kind of backing: blue for page tiles, orange
    /// for other tiled backings, green for plain backing stores, cyan for
    /// clipping containers, and yellow for everything else.
    #[must_use]
    pub fn debug_border_info(&self, layer: LayerId) -> (Color, f64) {
        let l = self.layer(layer);
        let kind = self.compositor.layer_kind(l.native);
        if kind == NativeLayerKind::PageTiledBackingLayer {
            (Color::rgba(0, 0, 128, 128), 0.5)
        } else if l.draws_content && l.using_tiled_backing {
            (Color::rgba(255, 128, 0, 128), 2.0)
        } else if l.draws_content {
            (Color::rgba(0, 128, 32, 128), 2.0)
        } else if l.masks_to_bounds {
            (Color::rgba(128, 255, 255, 48), 20.0)
        } else {
            (Color::rgba(255, 255, 0, 192), 2.0)
        }
    }

    fn update_debug_indicators(&mut self, layer: LayerId) {
        let (color, width) = if self.layer(layer).show_debug_border {
            self.debug_border_info(layer)
        } else {
            (Color::TRANSPARENT, 0.0)
        };
        let native = self.layer(layer).native;
        self.compositor.set_border(native, color, width);
    }

    // -- Sublayers --

    /// Rebuilds the native sublayer lists of `layer`, or detaches every
    /// sublayer of the backing when `pruned` is set.
    pub(crate) fn update_sublayer_list(&mut self, layer: LayerId, pruned: bool) {
        let l = self.layer(layer);
        let native = l.native;
        let structural = l.structural;
        if pruned {
            self.compositor.set_sublayers(native, &[]);
            self.layer_mut(layer).sublayers_pruned = true;
            return;
        }

        let mut primary_children: Vec<NativeLayerId> =
            self.compositor.custom_sublayers(native).to_vec();
        let mut structural_children = Vec::new();
        if structural.is_some() {
            if let Some(replica) = l.replica_layer {
                structural_children.push(self.layer(replica).primary_layer());
            }
            structural_children.push(native);
        }
        if l.has_visible_contents_layer()
            && let Some(contents) = l.contents_layer()
        {
            primary_children.push(contents);
        }
        let children = l
            .children
            .iter()
            .map(|child| self.layer(*child).primary_layer());
        if structural.is_some() {
            structural_children.extend(children);
        } else {
            primary_children.extend(children);
        }

        if let Some(shim) = structural {
            self.compositor.set_sublayers(shim, &structural_children);
        }
        self.compositor.set_sublayers(native, &primary_children);
        self.layer_mut(layer).sublayers_pruned = false;
    }
}

/// Prepares a contents layer: clipped, anchored at its top-left corner.
fn setup_contents_layer<C: Compositor>(compositor: &mut C, layer: NativeLayerId, show_border: bool) {
    compositor.set_masks_to_bounds(layer, true);
    compositor.set_anchor_point(layer, Point3::ZERO);
    if show_border {
        let (color, width) = CONTENTS_LAYER_BORDER;
        compositor.set_border(layer, color, width);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::config::CommitConfig;
    use crate::layer::RecordingClient;
    use crate::native::{HeadlessCompositor, ImageId};

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
    fn geometry_offsets_position_by_anchor() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_position(id, Point::new(10.0, 20.0));
        tree.set_size(id, Size::new(100.0, 40.0));
        tree.set_bounds_origin(id, Point::new(5.0, 0.0));
        tree.set_anchor_point(id, Point3::new(0.0, 1.0, 0.0));
        flush(&mut tree, id);

        let native = tree.compositor().layer(tree.native_layer(id));
        assert_eq!(native.position, Point::new(10.0, 60.0));
        assert_eq!(native.bounds, Rect::new(5.0, 0.0, 105.0, 40.0));
        assert_eq!(native.anchor_point, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn fractional_page_scale_aligns_drawing_layers() {
        let mut tree = tree();
        let root = tree.create_layer();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_applies_page_scale(root, true);
        tree.client_mut().page_scale = 1.5;
        tree.set_position(child, Point::new(10.3, 5.7));
        tree.set_size(child, Size::new(100.0, 100.0));
        tree.set_draws_content(child, true);
        tree.set_maintains_pixel_alignment(child, true);
        flush(&mut tree, root);

        let expected = compute_pixel_alignment(
            Point::new(10.3, 5.7),
            Size::new(100.0, 100.0),
            Point3::CENTER,
            1.5,
            Point::new(10.3, 5.7),
        );
        let native = tree.compositor().layer(tree.native_layer(child));
        // Bounds are stored as a rect, so the size picks up rounding error.
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        let anchor = native.anchor_point;
        assert!(
            close(anchor.x, expected.anchor.x) && close(anchor.y, expected.anchor.y),
            "anchor {anchor:?} vs {:?}",
            expected.anchor
        );
        let size = native.bounds.size();
        assert!(
            close(size.width, expected.size.width) && close(size.height, expected.size.height),
            "size {size:?} vs {:?}",
            expected.size
        );
        let screen_width = size.width * 1.5;
        assert!(
            (screen_width - screen_width.round()).abs() < 1e-4,
            "aligned width {screen_width} is integral in screen space"
        );
        assert_ne!(expected.offset, kurbo::Vec2::ZERO, "alignment moved the bounds");

        tree.set_masks_to_bounds(child, true);
        tree.set_position(child, Point::new(10.3, 5.8));
        flush(&mut tree, root);
        let native = tree.compositor().layer(tree.native_layer(child));
        assert_eq!(native.bounds, Rect::new(0.0, 0.0, 100.0, 100.0), "clipping layers skip alignment");
    }

    #[test]
    fn image_contents_layer_is_created_at_commit() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_size(id, Size::new(50.0, 50.0));
        tree.set_contents_rect(id, Rect::new(5.0, 5.0, 45.0, 25.0));
        tree.set_contents_to_image(id, Some(ImageId(3)));
        flush(&mut tree, id);

        let contents = tree.contents_native_layer(id).expect("image layer");
        let c = tree.compositor();
        let l = c.layer(contents);
        assert_eq!(l.contents, Some(ImageId(3)));
        assert!(l.masks_to_bounds);
        assert_eq!(l.anchor_point, Point3::ZERO);
        assert_eq!(l.position, Point::new(5.0, 5.0));
        assert_eq!(l.bounds, Rect::new(0.0, 0.0, 40.0, 20.0));
        assert_eq!(c.layer(tree.native_layer(id)).sublayers, [contents]);

        tree.set_contents_to_image(id, None);
        flush(&mut tree, id);
        assert_eq!(tree.contents_native_layer(id), None);
        assert!(tree.compositor().layer(contents).released);
        assert!(tree.compositor().layer(tree.native_layer(id)).sublayers.is_empty());
    }

    #[test]
    fn hidden_contents_leave_the_sublayer_list() {
        let mut tree = tree();
        let id = tree.create_layer();
        let child = tree.create_layer();
        tree.add_child(id, child);
        tree.set_contents_to_solid_color(id, Some(Color::rgb(9, 9, 9)));
        flush(&mut tree, id);
        let contents = tree.contents_native_layer(id).expect("colour layer");
        let native = tree.native_layer(id);
        assert_eq!(
            tree.compositor().layer(native).sublayers,
            [contents, tree.native_layer(child)],
            "contents sit beneath children"
        );
        assert_eq!(
            tree.compositor().layer(contents).background_color,
            Color::rgb(9, 9, 9)
        );

        tree.set_contents_visible(id, false);
        flush(&mut tree, id);
        assert_eq!(
            tree.compositor().layer(native).sublayers,
            [tree.native_layer(child)]
        );
    }

    #[test]
    fn dirty_rects_reach_the_compositor_once() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_size(id, Size::new(100.0, 100.0));
        tree.set_draws_content(id, true);
        flush(&mut tree, id);
        tree.compositor_mut().take_display_requests();

        tree.set_needs_display_in_rect(id, Rect::new(0.0, 0.0, 10.0, 10.0));
        flush(&mut tree, id);
        let native = tree.native_layer(id);
        assert_eq!(
            tree.compositor_mut().take_display_requests(),
            [(native, Some(Rect::new(0.0, 0.0, 10.0, 10.0)))]
        );
        assert!(tree.dirty_rects(id).is_empty());
        flush(&mut tree, id);
        assert!(tree.compositor_mut().take_display_requests().is_empty());
    }

    #[test]
    fn debug_border_encodes_backing_kind() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_show_debug_border(id, true);
        flush(&mut tree, id);
        let native = tree.native_layer(id);
        assert_eq!(
            tree.compositor().layer(native).border_color,
            Color::rgba(255, 255, 0, 192)
        );

        tree.set_draws_content(id, true);
        flush(&mut tree, id);
        let l = tree.compositor().layer(native);
        assert_eq!(l.border_color, Color::rgba(0, 128, 32, 128));
        assert_eq!(l.border_width, 2.0);

        tree.set_show_debug_border(id, false);
        flush(&mut tree, id);
        assert_eq!(tree.compositor().layer(native).border_width, 0.0);

        let page = tree.create_layer_with_page_tiles();
        assert_eq!(tree.debug_border_info(page), (Color::rgba(0, 0, 128, 128), 0.5));
    }

    #[test]
    fn mask_uses_the_mask_layers_primary() {
        let mut tree = tree();
        let id = tree.create_layer();
        let mask = tree.create_layer();
        tree.set_mask_layer(id, Some(mask));
        flush(&mut tree, id);
        let native = tree.native_layer(id);
        assert_eq!(
            tree.compositor().layer(native).mask,
            Some(tree.primary_native_layer(mask))
        );
        tree.set_mask_layer(id, None);
        flush(&mut tree, id);
        assert_eq!(tree.compositor().layer(native).mask, None);
    }

    #[test]
    fn names_describe_structural_layers() {
        let mut tree = tree();
        let id = tree.create_layer();
        tree.set_name(id, "box");
        tree.set_preserves_3d(id, true);
        flush(&mut tree, id);
        let shim = tree.structural_native_layer(id).expect("shim");
        let c = tree.compositor();
        assert_eq!(c.layer(shim).name, "Transform layer box");
        assert_eq!(c.layer(tree.native_layer(id)).name, "box");
    }
}
