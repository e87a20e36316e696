// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit walk.
//!
//! A flush visits the tree depth-first. Each layer computes its visible rect
//! against the clip carried down from the root, then runs two phases:
//!
//! - **before children**: the ordered [`BEFORE_CHILDREN_STEPS`] table, plus a
//!   backing swap if the layer's tiling requirement changed;
//! - **after children**: the sublayer list (which may depend on structural
//!   layers created by children) and replica clones.
//!
//! The mask is committed alongside its owner; the replica is walked after the
//! children, like one more child.

use kurbo::{Point, Rect};

use crate::dirty::{BEFORE_CHILDREN_STEPS, ChangeFlags};
use crate::geometry::{Point3, TransformAccumulation, TransformState, intersect_or_zero};
use crate::native::{Compositor, NativeLayerKind};
use crate::trace::{
    AnimationFallbackEvent, DepthCapEvent, FlushBeginEvent, FlushEndEvent, LayerCommitEvent,
    Tracer,
};
use crate::transform::Transform3d;

use super::tiling::adjust_tiled_layer_visible_rect;
use super::{LayerClient, LayerId, LayerTree};

/// State threaded down the commit walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct CommitState {
    /// Native tree depth so far, counting structural layers.
    tree_depth: usize,
    /// Some ancestor runs a transform animation.
    ancestor_has_transform_animation: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct FlushStats {
    visited: u32,
    committed: u32,
}

/// Everything a layer inherits from the part of the walk above it.
#[derive(Clone, Copy, Debug)]
struct Inherited {
    page_scale: f64,
    base_position: Point,
    affected_by_page_scale: bool,
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    // -- Entry points --

    /// Commits every pending change in the subtree under `root`.
    ///
    /// `clip` is the visible area in `root`'s coordinate space; it decides
    /// each layer's visible rect and therefore which tiles get rendered.
    /// Animation fallbacks queued since the last flush are reported through
    /// `tracer` first.
    pub fn flush_compositing_state(&mut self, root: LayerId, clip: Rect, tracer: &mut Tracer<'_>) {
        self.validate(root);
        for fallback in core::mem::take(&mut self.fallbacks) {
            tracer.animation_fallback(&AnimationFallbackEvent {
                layer: fallback.layer,
                name: &fallback.name,
                reason: fallback.reason,
            });
        }
        tracer.flush_begin(&FlushBeginEvent {
            root,
            clip: Some(clip),
        });

        let mut stats = FlushStats::default();
        let inherited = Inherited {
            page_scale: 1.0,
            base_position: Point::ZERO,
            affected_by_page_scale: false,
        };
        self.recursive_commit(
            root,
            &CommitState::default(),
            &TransformState::new(clip),
            inherited,
            &mut stats,
            tracer,
        );

        tracer.flush_end(&FlushEndEvent {
            root,
            layers_visited: stats.visited,
            layers_committed: stats.committed,
        });
    }

    /// Commits `layer`'s own pending changes without visiting any other
    /// layer.
    ///
    /// The visible rect is not recomputed, and the page scale and pixel
    /// alignment base are derived by walking up to the nearest ancestor that
    /// applies page scale.
    pub fn flush_compositing_state_for_this_layer_only(
        &mut self,
        layer: LayerId,
        tracer: &mut Tracer<'_>,
    ) {
        self.validate(layer);
        tracer.flush_begin(&FlushBeginEvent { root: layer, clip: None });

        let had_changes = !self.layer(layer).uncommitted.is_empty();
        let (base_position, page_scale) = self.compute_position_relative_to_base(layer);
        let old_visible = self.layer(layer).visible_rect;
        let mut stats = FlushStats {
            visited: 1,
            committed: 0,
        };
        let mut state = CommitState::default();
        self.commit_layer_changes_before_sublayers(
            layer,
            &mut state,
            page_scale,
            base_position,
            old_visible,
            &mut stats,
            tracer,
        );
        self.commit_layer_changes_after_sublayers(layer, &state, tracer);
        if had_changes {
            self.client.did_commit_changes_for_layer(layer);
        }

        tracer.flush_end(&FlushEndEvent {
            root: layer,
            layers_visited: stats.visited,
            layers_committed: stats.committed,
        });
    }

    /// Would flushing with `clip` change the tiles any tiled backing under
    /// `root` renders?
    ///
    /// Read-only; uses committed transforms rather than animated ones.
    #[must_use]
    pub fn visible_rect_change_requires_flush(&self, root: LayerId, clip: Rect) -> bool {
        self.validate(root);
        self.recursive_visible_rect_change_requires_flush(root, &TransformState::new(clip))
    }

    // -- Flush scheduling --

    /// Can the host defer `layer`'s flush?
    ///
    /// Not while freshly created tiles are waiting to be painted.
    #[must_use]
    pub fn can_throttle_layer_flush(&self, layer: LayerId) -> bool {
        !self.layer(layer).uncommitted.contains(ChangeFlags::TILES_ADDED)
    }

    /// Records that `layer`'s tiled backing created tiles which still need
    /// painting.
    pub fn note_tiles_added(&mut self, layer: LayerId) {
        self.note_change(layer, ChangeFlags::TILES_ADDED);
    }

    // -- Walk --

    fn recursive_commit(
        &mut self,
        layer: LayerId,
        commit_state: &CommitState,
        transform_state: &TransformState,
        mut inherited: Inherited,
        stats: &mut FlushStats,
        tracer: &mut Tracer<'_>,
    ) {
        stats.visited += 1;

        let mut local_state = transform_state.clone();
        let visible = self.compute_visible_rect(layer, &mut local_state, true);
        let l = self.layer_mut(layer);
        let old_visible = l.visible_rect;
        if visible != old_visible {
            l.uncommitted |= ChangeFlags::VISIBLE_RECT;
            l.visible_rect = visible;
        }
        let had_changes = !l.uncommitted.is_empty();
        let (applies_page_scale, position) = (l.applies_page_scale, l.position);

        if applies_page_scale {
            inherited.page_scale = self.client.page_scale_factor();
            inherited.affected_by_page_scale = true;
        }
        // Pixel alignment is relative to the nearest page-scaled ancestor.
        if inherited.affected_by_page_scale {
            inherited.base_position += position.to_vec2();
        }

        let mut child_state = *commit_state;
        self.commit_layer_changes_before_sublayers(
            layer,
            &mut child_state,
            inherited.page_scale,
            inherited.base_position,
            old_visible,
            stats,
            tracer,
        );

        let mut affected_by_transform_animation = commit_state.ancestor_has_transform_animation;
        if self.is_running_transform_animation(layer) {
            child_state.ancestor_has_transform_animation = true;
            affected_by_transform_animation = true;
        }

        let l = self.layer(layer);
        let (mask, replica) = (l.mask_layer, l.replica_layer);
        let children = l.children.clone();

        let mut mask_state = child_state;
        if let Some(mask) = mask {
            let mask_old_visible = self.layer(mask).visible_rect;
            self.commit_layer_changes_before_sublayers(
                mask,
                &mut mask_state,
                inherited.page_scale,
                inherited.base_position,
                mask_old_visible,
                stats,
                tracer,
            );
        }

        for child in children {
            self.recursive_commit(child, &child_state, &local_state, inherited, stats, tracer);
        }
        if let Some(replica) = replica {
            self.recursive_commit(replica, &child_state, &local_state, inherited, stats, tracer);
        }

        if let Some(mask) = mask {
            self.commit_layer_changes_after_sublayers(mask, &mask_state, tracer);
        }
        self.commit_layer_changes_after_sublayers(layer, &child_state, tracer);

        let native = self.layer(layer).native;
        if affected_by_transform_animation
            && self.compositor.layer_kind(native) == NativeLayerKind::TiledBackingLayer
        {
            self.client.notify_flush_before_display_refresh(layer);
        }
        if had_changes {
            self.client.did_commit_changes_for_layer(layer);
        }
    }

    fn commit_layer_changes_before_sublayers(
        &mut self,
        layer: LayerId,
        commit_state: &mut CommitState,
        page_scale: f64,
        base_position: Point,
        old_visible: Rect,
        stats: &mut FlushStats,
        tracer: &mut Tracer<'_>,
    ) {
        let max_depth = self.config.max_layer_tree_depth;
        let l = self.layer_mut(layer);
        let had_structural = l.structural.is_some();
        commit_state.tree_depth += 1;
        if had_structural {
            commit_state.tree_depth += 1;
        }
        let depth = commit_state.tree_depth;

        if l.uncommitted.is_empty() {
            // A layer pruned on an earlier flush may be shallow enough now.
            if depth > max_depth || l.sublayers_pruned {
                l.uncommitted |= ChangeFlags::CHILDREN;
            }
            return;
        }

        stats.committed += 1;
        tracer.layer_commit(&LayerCommitEvent {
            layer,
            changes: l.uncommitted,
            depth,
        });

        let needs_tiled = self.requires_tiled_layer(layer, page_scale);
        if needs_tiled != self.layer(layer).using_tiled_backing {
            self.swap_from_or_to_tiled_layer(layer, needs_tiled, tracer);
        }

        // Flags are re-read per step: earlier steps may raise later ones.
        for &(flags, step) in BEFORE_CHILDREN_STEPS {
            if self.layer(layer).uncommitted.intersects(flags) {
                self.apply_step(layer, step, page_scale, base_position, old_visible, tracer);
            }
        }

        // A structural layer created or removed above counts from this commit.
        match (had_structural, self.layer(layer).structural.is_some()) {
            (false, true) => commit_state.tree_depth += 1,
            (true, false) => commit_state.tree_depth -= 1,
            _ => {}
        }
        if commit_state.tree_depth > max_depth {
            self.layer_mut(layer).uncommitted |= ChangeFlags::CHILDREN;
        }
    }

    fn commit_layer_changes_after_sublayers(
        &mut self,
        layer: LayerId,
        commit_state: &CommitState,
        tracer: &mut Tracer<'_>,
    ) {
        let changes = self.layer(layer).uncommitted;
        if changes.is_empty() {
            return;
        }

        if changes.contains(ChangeFlags::CHILDREN) {
            let pruned = commit_state.tree_depth > self.config.max_layer_tree_depth;
            if pruned {
                tracer.depth_cap(&DepthCapEvent {
                    layer,
                    depth: commit_state.tree_depth,
                });
            }
            self.update_sublayer_list(layer, pruned);
        }
        if changes.contains(ChangeFlags::REPLICATED_LAYER) {
            self.update_replicated_layers(layer);
        }

        self.layer_mut(layer).uncommitted = ChangeFlags::empty();
    }

    // -- Geometry --

    /// Maps the clip in `state` into `layer`'s space and returns the part of
    /// the layer's bounds it covers.
    ///
    /// On return `state` is positioned for `layer`'s children: a layer that
    /// masks to bounds also narrows the clip to its own visible rect.
    pub(crate) fn compute_visible_rect(
        &self,
        layer: LayerId,
        state: &mut TransformState,
        respect_animating_transforms: bool,
    ) -> Rect {
        let l = self.layer(layer);
        let parent = l.parent.map(|p| self.layer(p));
        let preserve_3d = l.preserves_3d || parent.is_some_and(|p| p.preserves_3d);
        let accumulation = if preserve_3d {
            TransformAccumulation::Accumulate
        } else {
            TransformAccumulation::Flatten
        };

        let position = self.client.custom_position(layer).unwrap_or(l.position);
        let mut layer_transform = Transform3d::from_translation(position.x, position.y, 0.0);

        let current = respect_animating_transforms
            .then(|| self.client.current_transform(layer))
            .flatten()
            .unwrap_or(l.transform);
        if !current.is_identity() {
            let anchor = anchor_offset(l.anchor_point, l.size.width, l.size.height);
            layer_transform = layer_transform.pre_translate(anchor.x, anchor.y, anchor.z) * current;
            layer_transform = layer_transform.pre_translate(-anchor.x, -anchor.y, -anchor.z);
        }

        if let Some(parent) = parent
            && !parent.children_transform.is_identity()
        {
            let anchor = anchor_offset(parent.anchor_point, parent.size.width, parent.size.height);
            layer_transform = parent.children_transform
                * layer_transform.post_translate(-anchor.x, -anchor.y, -anchor.z);
            layer_transform = layer_transform.post_translate(anchor.x, anchor.y, anchor.z);
        }

        let apply_clamped = state.apply_transform(&layer_transform, accumulation);
        let (quad, map_clamped) = state.mapped_quad();
        let clip_for_children = quad.bounding_box() + l.bounds_origin.to_vec2();

        let mut clip_for_self = Rect::from_origin_size(l.bounds_origin, l.size);
        // A clamped projection is unreliable; keep the whole layer.
        if !apply_clamped && !map_clamped {
            clip_for_self = intersect_or_zero(&clip_for_self, &clip_for_children);
        }

        if l.masks_to_bounds {
            debug_assert!(
                accumulation == TransformAccumulation::Flatten,
                "a layer that masks to bounds cannot share a 3-D context"
            );
            state.set_quad(clip_for_self);
        }

        clip_for_self
    }

    fn recursive_visible_rect_change_requires_flush(
        &self,
        layer: LayerId,
        state: &TransformState,
    ) -> bool {
        let mut local_state = state.clone();
        let mut new_visible = self.compute_visible_rect(layer, &mut local_state, false);

        let l = self.layer(layer);
        if self.compositor.layer_kind(l.native) == NativeLayerKind::TiledBackingLayer {
            let existing = self
                .compositor
                .tiled_backing(l.native)
                .map_or(Rect::ZERO, |t| t.visible_rect());
            new_visible = adjust_tiled_layer_visible_rect(
                existing,
                l.visible_rect,
                new_visible,
                l.size_at_last_visible_rect_update,
                l.size,
            );
        }

        if new_visible != l.visible_rect
            && self
                .compositor
                .tiled_backing(l.native)
                .is_some_and(|t| t.tiles_would_change_for_visible_rect(new_visible))
        {
            return true;
        }

        l.mask_layer
            .iter()
            .chain(&l.children)
            .chain(&l.replica_layer)
            .any(|&next| self.recursive_visible_rect_change_requires_flush(next, &local_state))
    }

    /// Offset of `layer` from its nearest page-scaled ancestor, and that
    /// ancestor's page scale.
    ///
    /// Falls back to the origin at unit scale when no ancestor applies page
    /// scale.
    fn compute_position_relative_to_base(&self, layer: LayerId) -> (Point, f64) {
        let mut offset = Point::ZERO;
        let mut current = Some(layer);
        while let Some(id) = current {
            let l = self.layer(id);
            if l.applies_page_scale {
                return (offset, self.client.page_scale_factor());
            }
            offset += l.position.to_vec2();
            current = l.parent;
        }
        (Point::ZERO, 1.0)
    }
}

fn anchor_offset(anchor: Point3, width: f64, height: f64) -> Point3 {
    Point3::new(anchor.x * width, anchor.y * height, anchor.z)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::animation::{
        Animation, Keyframe, KeyframeValueList, TransformOperation, TransformOperations,
    };
    use crate::config::CommitConfig;
    use crate::layer::{ClientEvent, RecordingClient};
    use crate::native::HeadlessCompositor;

    type Tree = LayerTree<HeadlessCompositor, RecordingClient>;

    const CLIP: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

    fn tree_with(config: CommitConfig) -> Tree {
        LayerTree::new(HeadlessCompositor::new(), RecordingClient::new(), config)
    }

    fn tree() -> Tree {
        tree_with(CommitConfig::modern())
    }

    fn flush(tree: &mut Tree, root: LayerId) {
        tree.flush_compositing_state(root, CLIP, &mut Tracer::none());
    }

    fn layer_at(tree: &mut Tree, parent: LayerId, position: Point, size: Size) -> LayerId {
        let id = tree.create_layer();
        tree.add_child(parent, id);
        tree.set_position(id, position);
        tree.set_size(id, size);
        id
    }

    fn commits(events: &[ClientEvent]) -> Vec<LayerId> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::DidCommit(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn flush_clears_changes_and_reports_commits() {
        let mut tree = tree();
        let root = tree.create_layer();
        let a = layer_at(&mut tree, root, Point::ZERO, Size::new(10.0, 10.0));
        let b = layer_at(&mut tree, a, Point::ZERO, Size::new(10.0, 10.0));
        flush(&mut tree, root);

        for id in [root, a, b] {
            assert!(tree.uncommitted_changes(id).is_empty());
        }
        let events = tree.client_mut().take_events();
        assert_eq!(commits(&events), vec![b, a, root], "children report first");

        flush(&mut tree, root);
        assert!(commits(&tree.client_mut().take_events()).is_empty());

        tree.set_opacity(b, 0.5);
        flush(&mut tree, root);
        assert_eq!(commits(&tree.client_mut().take_events()), vec![b]);
    }

    #[test]
    fn visible_rect_is_clipped_to_the_viewport() {
        let mut tree = tree();
        let root = tree.create_layer();
        tree.set_size(root, Size::new(800.0, 600.0));
        let inside = layer_at(&mut tree, root, Point::new(100.0, 100.0), Size::new(200.0, 200.0));
        let edge = layer_at(&mut tree, root, Point::new(700.0, 500.0), Size::new(200.0, 200.0));
        let outside = layer_at(&mut tree, root, Point::new(900.0, 0.0), Size::new(50.0, 50.0));
        flush(&mut tree, root);

        assert_eq!(tree.visible_rect(inside), Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(tree.visible_rect(edge), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(tree.visible_rect(outside), Rect::ZERO);
    }

    #[test]
    fn visible_rect_follows_transform_about_anchor() {
        let mut tree = tree();
        let root = tree.create_layer();
        let scaled = layer_at(&mut tree, root, Point::ZERO, Size::new(100.0, 100.0));
        tree.set_transform(scaled, Transform3d::from_scale(2.0, 2.0, 1.0));
        flush(&mut tree, root);
        // The viewport maps back to (25, 25)..(425, 325) around the centre.
        assert_eq!(tree.visible_rect(scaled), Rect::new(25.0, 25.0, 100.0, 100.0));
    }

    #[test]
    fn masks_to_bounds_narrows_descendants() {
        let mut tree = tree();
        let root = tree.create_layer();
        let clip = layer_at(&mut tree, root, Point::new(10.0, 10.0), Size::new(50.0, 50.0));
        tree.set_masks_to_bounds(clip, true);
        let child = layer_at(&mut tree, clip, Point::new(-20.0, 0.0), Size::new(100.0, 100.0));
        flush(&mut tree, root);
        assert_eq!(tree.visible_rect(child), Rect::new(20.0, 0.0, 70.0, 50.0));
    }

    #[test]
    fn animated_transform_is_used_when_committing() {
        let mut tree = tree();
        let root = tree.create_layer();
        let moving = layer_at(&mut tree, root, Point::ZERO, Size::new(100.0, 100.0));
        tree.client_mut()
            .current_transforms
            .push((moving, Transform3d::from_translation(750.0, 0.0, 0.0)));
        flush(&mut tree, root);
        assert_eq!(tree.visible_rect(moving), Rect::new(0.0, 0.0, 50.0, 100.0));
    }

    #[test]
    fn depth_cap_prunes_and_reattaches() {
        let mut tree = tree_with(CommitConfig {
            max_layer_tree_depth: 3,
            ..CommitConfig::modern()
        });
        let chain: Vec<LayerId> = (0..5).map(|_| tree.create_layer()).collect();
        for pair in chain.windows(2) {
            tree.add_child(pair[0], pair[1]);
        }
        flush(&mut tree, chain[0]);

        // chain[3] sits at depth 4.
        assert!(tree.sublayers_pruned(chain[3]));
        assert!(!tree.sublayers_pruned(chain[2]));
        let c = tree.compositor();
        assert!(c.layer(tree.native_layer(chain[3])).sublayers.is_empty());
        assert_eq!(c.layer(tree.native_layer(chain[4])).superlayer, None);

        // Lift chain[2] one level; chain[3] is now at depth 3.
        tree.add_child(chain[0], chain[2]);
        flush(&mut tree, chain[0]);
        assert!(!tree.sublayers_pruned(chain[3]));
        assert_eq!(
            tree.compositor().layer(tree.native_layer(chain[4])).superlayer,
            Some(tree.native_layer(chain[3]))
        );
    }

    #[test]
    fn default_cap_detaches_runaway_chains() {
        let mut tree = tree();
        let depth = tree.config().max_layer_tree_depth;
        let chain: Vec<LayerId> = (0..depth + 5).map(|_| tree.create_layer()).collect();
        for pair in chain.windows(2) {
            tree.add_child(pair[0], pair[1]);
        }
        flush(&mut tree, chain[0]);

        let c = tree.compositor();
        let attached = |id: LayerId| c.layer(tree.native_layer(id)).superlayer.is_some();
        assert!(attached(chain[depth]), "the first layer past the cap keeps its place");
        assert!(tree.sublayers_pruned(chain[depth]));
        assert!(!attached(chain[depth + 1]), "its sublayers are pruned");
        assert!(chain.iter().all(|&id| tree.uncommitted_changes(id).is_empty()));
    }

    #[test]
    fn structural_layers_count_towards_depth() {
        let mut tree = tree_with(CommitConfig {
            max_layer_tree_depth: 3,
            ..CommitConfig::modern()
        });
        let root = tree.create_layer();
        let mid = layer_at(&mut tree, root, Point::ZERO, Size::new(10.0, 10.0));
        let leaf = layer_at(&mut tree, mid, Point::ZERO, Size::new(10.0, 10.0));
        let below = layer_at(&mut tree, leaf, Point::ZERO, Size::new(10.0, 10.0));
        flush(&mut tree, root);
        assert!(!tree.sublayers_pruned(leaf));

        tree.set_preserves_3d(mid, true);
        flush(&mut tree, root);
        assert!(tree.sublayers_pruned(leaf));
        assert_eq!(
            tree.compositor().layer(tree.native_layer(below)).superlayer,
            None
        );
    }

    #[test]
    fn tiled_layer_reports_pending_visible_rect_changes() {
        let mut tree = tree();
        let root = tree.create_layer();
        let big = layer_at(&mut tree, root, Point::ZERO, Size::new(3000.0, 3000.0));
        tree.set_draws_content(big, true);
        flush(&mut tree, root);
        assert!(tree.uses_tiled_backing(big));
        assert!(!tree.visible_rect_change_requires_flush(root, CLIP));

        // Scrolling by less than a tile keeps the same tiles.
        let nudged = CLIP + kurbo::Vec2::new(10.0, 0.0);
        assert!(!tree.visible_rect_change_requires_flush(root, nudged));

        let scrolled = CLIP + kurbo::Vec2::new(1500.0, 0.0);
        assert!(tree.visible_rect_change_requires_flush(root, scrolled));
    }

    #[test]
    fn single_layer_flush_leaves_others_pending() {
        let mut tree = tree();
        let root = tree.create_layer();
        let a = layer_at(&mut tree, root, Point::new(5.0, 5.0), Size::new(10.0, 10.0));
        let b = layer_at(&mut tree, root, Point::ZERO, Size::new(10.0, 10.0));
        tree.client_mut().take_events();

        tree.flush_compositing_state_for_this_layer_only(a, &mut Tracer::none());
        assert!(tree.uncommitted_changes(a).is_empty());
        assert!(!tree.uncommitted_changes(b).is_empty());
        assert!(!tree.uncommitted_changes(root).is_empty());
        assert_eq!(commits(&tree.client_mut().take_events()), vec![a]);
        assert_eq!(
            tree.compositor().layer(tree.native_layer(a)).position,
            Point::new(10.0, 10.0)
        );
    }

    #[test]
    fn position_relative_to_page_scaled_ancestor() {
        let mut tree = tree();
        tree.client_mut().page_scale = 2.0;
        let root = tree.create_layer();
        let scaled = layer_at(&mut tree, root, Point::new(100.0, 0.0), Size::new(10.0, 10.0));
        tree.set_applies_page_scale(scaled, true);
        let mid = layer_at(&mut tree, scaled, Point::new(3.0, 4.0), Size::new(10.0, 10.0));
        let leaf = layer_at(&mut tree, mid, Point::new(1.0, 1.0), Size::new(10.0, 10.0));

        assert_eq!(
            tree.compute_position_relative_to_base(leaf),
            (Point::new(4.0, 5.0), 2.0)
        );
        assert_eq!(
            tree.compute_position_relative_to_base(root),
            (Point::ZERO, 1.0)
        );
    }

    #[test]
    fn tiled_layer_under_transform_animation_requests_refresh_aligned_flush() {
        let mut tree = tree();
        let root = tree.create_layer();
        let spinning = layer_at(&mut tree, root, Point::ZERO, Size::new(100.0, 100.0));
        let big = layer_at(&mut tree, spinning, Point::ZERO, Size::new(3000.0, 100.0));
        tree.set_draws_content(big, true);
        let values = KeyframeValueList::Transform(vec![
            Keyframe::new(0.0, TransformOperations::new(vec![TransformOperation::Scale(1.0, 1.0)])),
            Keyframe::new(1.0, TransformOperations::new(vec![TransformOperation::Scale(2.0, 2.0)])),
        ]);
        assert!(tree.add_animation(
            spinning,
            &values,
            Size::new(100.0, 100.0),
            Some(&Animation::new(1.0)),
            "grow",
            0.0,
        ));
        flush(&mut tree, root);

        let events = tree.client_mut().take_events();
        assert!(events.contains(&ClientEvent::FlushBeforeDisplayRefresh(big)));
        assert!(!events.contains(&ClientEvent::FlushBeforeDisplayRefresh(spinning)));
    }

    #[test]
    fn throttling_tracks_tiles_added() {
        let mut tree = tree();
        let id = tree.create_layer();
        let root = tree.create_layer();
        tree.add_child(root, id);
        flush(&mut tree, root);
        tree.client_mut().take_events();
        assert!(tree.can_throttle_layer_flush(id));

        tree.note_tiles_added(id);
        assert!(!tree.can_throttle_layer_flush(id));
        assert_eq!(tree.client().flush_requests(id), 1);
        flush(&mut tree, root);
        assert!(tree.can_throttle_layer_flush(id));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn flush_reports_fallbacks_and_counts() {
        use crate::animation::AnimationFallback;
        use crate::trace::CommitTraceSink;

        #[derive(Default)]
        struct Sink {
            fallbacks: Vec<AnimationFallback>,
            ends: Vec<(u32, u32)>,
            caps: u32,
        }

        impl CommitTraceSink for Sink {
            fn on_animation_fallback(&mut self, e: &AnimationFallbackEvent<'_>) {
                self.fallbacks.push(e.reason);
            }

            fn on_flush_end(&mut self, e: &FlushEndEvent) {
                self.ends.push((e.layers_visited, e.layers_committed));
            }

            fn on_depth_cap(&mut self, _: &DepthCapEvent) {
                self.caps += 1;
            }
        }

        let mut tree = tree();
        let root = tree.create_layer();
        let child = layer_at(&mut tree, root, Point::ZERO, Size::new(10.0, 10.0));
        let values = KeyframeValueList::Opacity(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]);
        assert!(!tree.add_animation(
            child,
            &values,
            Size::new(10.0, 10.0),
            Some(&Animation::new(0.0)),
            "instant",
            0.0,
        ));

        let mut sink = Sink::default();
        tree.flush_compositing_state(root, CLIP, &mut Tracer::new(&mut sink));
        tree.flush_compositing_state(root, CLIP, &mut Tracer::new(&mut sink));
        assert_eq!(sink.fallbacks, vec![AnimationFallback::ZeroDuration]);
        assert_eq!(sink.ends, vec![(2, 2), (2, 0)]);
        assert_eq!(sink.caps, 0);
    }
}
