// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reflections.
//!
//! A replica layer draws a copy of the subtree rooted at the layer it
//! replicates. The copy is built from native clones fetched through
//! [`LayerTree::fetch_clone_layers`], cached per [`CloneId`] so repeated
//! commits only rewire existing clones.
//!
//! Replicas may themselves contain replicas. Every nested reflection
//! doubles the clone count, so the walk stops once
//! [`CommitConfig::max_replica_depth`] replica branches are on the stack.
//!
//! [`CommitConfig::max_replica_depth`]: crate::config::CommitConfig::max_replica_depth

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::Point;

use crate::geometry::Color;
use crate::native::{Compositor, NativeLayerId};
use crate::transform::Transform3d;

use super::animations::AnimationTransfer;
use super::clone::{BranchType, CloneId, CloneLevel, CloneMaps, ReplicaState};
use super::tree::LayerData;
use super::{LayerClient, LayerId, LayerTree};

/// Border drawn on clones when debug borders are on.
const CLONE_BORDER: (Color, f64) = (Color::rgba(255, 122, 251, 255), 2.0);

/// Which of a layer's native layers a clone copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CloneSlot {
    Backing,
    Structural,
    Contents,
}

impl CloneSlot {
    fn source(self, data: &LayerData) -> Option<NativeLayerId> {
        match self {
            Self::Backing => Some(data.native),
            Self::Structural => data.structural,
            Self::Contents => data.contents_layer(),
        }
    }

    fn map(self, maps: &mut CloneMaps) -> &mut HashMap<CloneId, NativeLayerId> {
        match self {
            Self::Backing => &mut maps.primary,
            Self::Structural => &mut maps.structural,
            Self::Contents => &mut maps.contents,
        }
    }
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    /// Where the root clone of `layer`'s reflection sits: the replica's
    /// declared position, offset by `layer`'s anchor.
    pub(crate) fn position_for_clone_root(&self, layer: LayerId) -> Point {
        let l = self.layer(layer);
        let Some(replica) = l.replica_layer else {
            return Point::ZERO;
        };
        let p = self.layer(replica).replicated_layer_position;
        Point::new(
            p.x + l.anchor_point.x * l.size.width,
            p.y + l.anchor_point.y * l.size.height,
        )
    }

    /// Rebuilds the reflection drawn by `replica` and parents it beneath
    /// the replica's own content.
    pub(crate) fn update_replicated_layers(&mut self, replica: LayerId) {
        let mut state = ReplicaState::new(BranchType::Replica);
        let Some(root) = self.replicated_layer_root(replica, &mut state) else {
            return;
        };
        let target = self.layer(replica).primary_layer();
        self.compositor.insert_sublayer(target, root, 0);
    }

    /// Clones the subtree `replica` reflects, with the root clone moved to
    /// the reflection position and its transform cleared.
    ///
    /// Returns `None` when `replica` reflects nothing or the nesting limit is
    /// reached.
    fn replicated_layer_root(
        &mut self,
        replica: LayerId,
        state: &mut ReplicaState,
    ) -> Option<NativeLayerId> {
        let replicated = self.layer(replica).replicated_layer?;
        if state.replica_depth() >= self.config.max_replica_depth {
            return None;
        }
        let root = self.fetch_clone_layers(replicated, replica, state, CloneLevel::Root)?;
        let position = self.position_for_clone_root(replicated);
        self.compositor.set_position(root, position);
        self.compositor.set_transform(root, &Transform3d::IDENTITY);
        Some(root)
    }

    /// Returns the clone of `layer`'s subtree for the branch path in
    /// `state`, creating missing clones and rewiring their sublayers.
    ///
    /// `replica_root` is the replica whose reflection is being built; a
    /// nested replica of any other layer is cloned as well, beneath the
    /// clone it reflects. The same path always yields the same native layer.
    pub fn fetch_clone_layers(
        &mut self,
        layer: LayerId,
        replica_root: LayerId,
        state: &mut ReplicaState,
        level: CloneLevel,
    ) -> Option<NativeLayerId> {
        let clone_id = state.clone_id();
        let primary = self.find_or_make_clone(layer, &clone_id, CloneSlot::Backing, level)?;
        let structural = self.find_or_make_clone(layer, &clone_id, CloneSlot::Structural, level);
        let contents = self.find_or_make_clone(layer, &clone_id, CloneSlot::Contents, level);

        if let Some(mask) = self.layer(layer).mask_layer {
            let mask_clone =
                self.fetch_clone_layers(mask, replica_root, state, CloneLevel::Intermediate);
            self.compositor.set_mask(primary, mask_clone);
        }

        if self.layer(layer).replicated_layer.is_some() {
            // A replica inside the reflected subtree: clone what it reflects.
            let root = self.replicated_layer_root(layer, state)?;
            let target = structural.unwrap_or(primary);
            self.compositor.insert_sublayer(target, root, 0);
            return Some(target);
        }

        let l = self.layer(layer);
        let children = l.children.clone();
        let nested_replica = l.replica_layer.filter(|r| *r != replica_root);

        let mut replica_clone = None;
        if let Some(nested) = nested_replica {
            state.set_branch_type(BranchType::Replica);
            replica_clone = self.fetch_clone_layers(nested, replica_root, state, CloneLevel::Root);
            state.set_branch_type(BranchType::Child);
        }

        let mut sublayers = Vec::new();
        if replica_clone.is_some() || structural.is_some() || contents.is_some() || !children.is_empty()
        {
            if structural.is_some() {
                // Reflections render behind the layer itself.
                sublayers.extend(replica_clone);
                sublayers.push(primary);
            } else if let Some(contents) = contents {
                sublayers.push(contents);
            }

            state.push(BranchType::Child);
            for child in children {
                if let Some(clone) =
                    self.fetch_clone_layers(child, replica_root, state, CloneLevel::Intermediate)
                {
                    sublayers.push(clone);
                }
            }
            state.pop();

            for sublayer in &sublayers {
                self.compositor.remove_from_superlayer(*sublayer);
            }
        }

        if let Some(shim) = structural {
            self.compositor.set_sublayers(shim, &sublayers);
            if let Some(contents) = contents {
                // Contents hang off the backing clone, inside the shim.
                self.compositor.remove_all_sublayers(primary);
                self.compositor.append_sublayer(primary, contents);
            }
            Some(shim)
        } else {
            self.compositor.set_sublayers(primary, &sublayers);
            Some(primary)
        }
    }

    fn find_or_make_clone(
        &mut self,
        layer: LayerId,
        clone_id: &CloneId,
        slot: CloneSlot,
        level: CloneLevel,
    ) -> Option<NativeLayerId> {
        let (data, _) = self.split(layer);
        let source = slot.source(data)?;
        if let Some(existing) = slot.map(&mut data.clones).get(clone_id) {
            return Some(*existing);
        }
        let clone = self.clone_layer(layer, source, level);
        slot.map(&mut self.layer_mut(layer).clones)
            .insert(clone_id.clone(), clone);
        Some(clone)
    }

    fn clone_layer(
        &mut self,
        layer: LayerId,
        source: NativeLayerId,
        level: CloneLevel,
    ) -> NativeLayerId {
        let clone = self.compositor.clone_layer(source, Some(layer));
        if level == CloneLevel::Intermediate {
            let opacity = self.compositor.opacity(source);
            self.compositor.set_opacity(clone, opacity);
            self.move_or_copy_animations(layer, AnimationTransfer::Copy, source, clone);
        }
        if self.layer(layer).show_debug_border {
            let (color, width) = CLONE_BORDER;
            self.compositor.set_border(clone, color, width);
        }
        clone
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};

    use super::*;
    use crate::config::CommitConfig;
    use crate::layer::RecordingClient;
    use crate::native::HeadlessCompositor;
    use crate::trace::Tracer;

    type Tree = LayerTree<HeadlessCompositor, RecordingClient>;

    fn tree_with(config: CommitConfig) -> Tree {
        LayerTree::new(HeadlessCompositor::new(), RecordingClient::new(), config)
    }

    fn flush(tree: &mut Tree, root: LayerId) {
        tree.flush_compositing_state(root, Rect::new(0.0, 0.0, 800.0, 600.0), &mut Tracer::none());
    }

    /// `root` holding `a` (with child `b`), reflected by `r`.
    fn reflected_tree() -> (Tree, [LayerId; 4]) {
        let mut tree = tree_with(CommitConfig::modern());
        let root = tree.create_layer();
        let a = tree.create_layer();
        let b = tree.create_layer();
        let r = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(a, b);
        tree.set_position(a, Point::new(10.0, 10.0));
        tree.set_size(a, Size::new(100.0, 50.0));
        tree.set_position(b, Point::new(5.0, 5.0));
        tree.set_size(b, Size::new(20.0, 20.0));
        tree.set_replicated_by_layer(a, Some(r));
        tree.set_replicated_layer_position(r, Point::new(0.0, 60.0));
        flush(&mut tree, root);
        (tree, [root, a, b, r])
    }

    fn only_clone(map: &HashMap<CloneId, NativeLayerId>) -> NativeLayerId {
        assert_eq!(map.len(), 1, "expected exactly one clone");
        *map.values().next().expect("one clone")
    }

    #[test]
    fn reflection_is_parented_under_the_replica() {
        let (tree, [_, a, b, r]) = reflected_tree();
        let c = tree.compositor();
        let a_shim = only_clone(&tree.layer(a).clones.structural);
        let a_backing = only_clone(&tree.layer(a).clones.primary);
        let b_clone = only_clone(&tree.layer(b).clones.primary);

        let replica_native = tree.primary_native_layer(r);
        assert_eq!(c.layer(replica_native).sublayers.first(), Some(&a_shim));
        assert_eq!(c.layer(a_shim).position, Point::new(50.0, 85.0));
        assert!(c.layer(a_shim).transform.is_identity());
        assert_eq!(c.layer(a_shim).sublayers, [a_backing, b_clone]);
        assert_eq!(
            c.layer(b_clone).position,
            c.layer(tree.native_layer(b)).position,
            "clones copy committed geometry"
        );
    }

    #[test]
    fn property_changes_reach_clones() {
        let (mut tree, [root, _, b, _]) = reflected_tree();
        tree.set_position(b, Point::new(30.0, 5.0));
        tree.set_opacity(b, 0.25);
        flush(&mut tree, root);
        let b_clone = only_clone(&tree.layer(b).clones.primary);
        let c = tree.compositor();
        assert_eq!(c.layer(b_clone).position, Point::new(40.0, 15.0));
        assert_eq!(c.layer(b_clone).opacity, 0.25);
    }

    #[test]
    fn topology_changes_reuse_clones() {
        let (mut tree, [root, a, b, r]) = reflected_tree();
        let b_clone = only_clone(&tree.layer(b).clones.primary);
        let d = tree.create_layer();
        tree.add_child(a, d);
        assert!(
            tree.uncommitted_changes(r)
                .contains(crate::dirty::ChangeFlags::REPLICATED_LAYER),
            "children of a reflected layer re-clone the reflection"
        );
        flush(&mut tree, root);
        assert_eq!(only_clone(&tree.layer(b).clones.primary), b_clone);
        assert_eq!(tree.clone_count(d), 1);
        let a_shim = only_clone(&tree.layer(a).clones.structural);
        assert_eq!(tree.compositor().layer(a_shim).sublayers.len(), 3);
    }

    #[test]
    fn equal_paths_fetch_the_same_clone() {
        let (mut tree, [_, _, b, r]) = reflected_tree();
        let mut first = ReplicaState::new(BranchType::Replica);
        first.push(BranchType::Child);
        let mut second = first.clone();
        let x = tree.fetch_clone_layers(b, r, &mut first, CloneLevel::Intermediate);
        let y = tree.fetch_clone_layers(b, r, &mut second, CloneLevel::Intermediate);
        assert!(x.is_some());
        assert_eq!(x, y, "same path, same clone");

        let mut other = ReplicaState::new(BranchType::Child);
        other.push(BranchType::Child);
        let z = tree.fetch_clone_layers(b, r, &mut other, CloneLevel::Intermediate);
        assert_ne!(x, z, "different paths never share a clone");
        assert_eq!(tree.clone_count(b), 2);
    }

    #[test]
    fn intermediate_clones_copy_opacity() {
        let (mut tree, [root, _, b, _]) = reflected_tree();
        tree.set_opacity(b, 0.5);
        flush(&mut tree, root);
        let mut state = ReplicaState::new(BranchType::Child);
        let root_clone = tree
            .fetch_clone_layers(b, root, &mut state, CloneLevel::Intermediate)
            .expect("clone");
        assert_eq!(tree.compositor().layer(root_clone).opacity, 0.5);
    }

    #[test]
    fn nested_reflections_stop_at_the_depth_limit() {
        let config = CommitConfig {
            max_replica_depth: 2,
            ..CommitConfig::modern()
        };
        let mut tree = tree_with(config);
        let root = tree.create_layer();
        let mut chain = Vec::new();
        let mut parent = root;
        for _ in 0..12 {
            let layer = tree.create_layer();
            let replica = tree.create_layer();
            tree.add_child(parent, layer);
            tree.set_replicated_by_layer(layer, Some(replica));
            chain.push(layer);
            parent = layer;
        }
        flush(&mut tree, root);

        for layer in &chain {
            for id in tree.layer(*layer).clones.primary.keys() {
                let replica_branches = (0..id.len())
                    .filter(|i| id.branch(*i) == Some(BranchType::Replica))
                    .count();
                assert!(replica_branches < 2, "{id:?} nests too deep");
            }
        }
        assert!(tree.clone_count(chain[11]) > 0, "reflections are still built");

        // At most one reflection per replicated ancestor, each with a backing
        // and a flattening clone.
        let counts: Vec<usize> = chain.iter().map(|l| tree.clone_count(*l)).collect();
        for (layer, count) in chain.iter().zip(&counts) {
            assert!(*count <= 2 * chain.len(), "{layer:?} holds {count} clones");
        }
        flush(&mut tree, root);
        let again: Vec<usize> = chain.iter().map(|l| tree.clone_count(*l)).collect();
        assert_eq!(again, counts, "a second flush reuses the clones");
    }

    #[test]
    fn clone_root_position_without_replica_is_origin() {
        let mut tree = tree_with(CommitConfig::modern());
        let a = tree.create_layer();
        tree.set_size(a, Size::new(10.0, 10.0));
        assert_eq!(tree.position_for_clone_root(a), Point::ZERO);
    }
}
