// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The logical layer tree and its commit engine.
//!
//! A *layer* is a node in the host's compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]): a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: an ordered child list, an optional mask layer, and an optional
//!   replica layer that draws a reflection of the layer's subtree.
//! - **Properties** set by the host through [`LayerTree`] mutators: geometry,
//!   transforms, opacity, contents, filters, and debugging aids.
//! - **Native layers** owned on the layer's behalf: the backing, an optional
//!   structural layer ([`StructuralLayerPurpose`]), an optional contents layer
//!   ([`ContentsLayerPurpose`]), and clones used by replicas.
//!
//! # Dirty tracking
//!
//! Mutators never touch the compositor. They compare against the stored
//! value and, on change, OR a [`ChangeFlags`](crate::dirty::ChangeFlags) bit
//! into the layer's pending set. The first bit a clean layer receives asks
//! the [`LayerClient`] to schedule a flush.
//!
//! # Commit
//!
//! [`LayerTree::flush_compositing_state`] walks the tree once, depth-first:
//!
//! - visible rects are computed against the clip carried down from the root;
//! - pending changes are applied in a fixed order before the children;
//! - sublayer lists and replica clones are rebuilt after the children.
//!
//! Trees deeper than [`CommitConfig::max_layer_tree_depth`] have their
//! deepest native sublayers pruned until the tree gets shallower again.
//!
//! [`CommitConfig::max_layer_tree_depth`]: crate::config::CommitConfig::max_layer_tree_depth

mod animations;
mod client;
mod clone;
mod commit;
mod id;
mod replica;
mod structural;
mod tiling;
mod tree;
mod update;

pub use client::{ClientEvent, LayerClient, RecordingClient};
pub use clone::{BranchType, CloneId, CloneLevel, ReplicaState};
pub use id::LayerId;
pub use structural::StructuralLayerPurpose;
pub use tiling::adjust_tiled_layer_visible_rect;
pub use tree::{ContentsLayerPurpose, LayerTree};
