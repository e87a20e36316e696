// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural layers.
//!
//! Some configurations need a second native layer above a layer's backing:
//!
//! - **Preserve3D**: a transform-only layer lets children share the layer's
//!   3-D rendering context while the backing itself stays flat.
//! - **`ReplicaFlattening`**: a plain layer groups the backing with the
//!   replica's reflection so both flatten together.
//!
//! While a structural layer exists it represents the logical layer to its
//! parent. Geometry, transform, opacity, and animations move up to it, and
//! the backing is reset to sit centred inside it.

use crate::dirty::ChangeFlags;
use crate::geometry::Point3;
use crate::native::{Compositor, NativeLayerKind};
use crate::trace::{StructuralChange, StructuralLayerEvent, Tracer};
use crate::transform::Transform3d;

use super::animations::AnimationTransfer;
use super::{LayerClient, LayerId, LayerTree};

/// Why a layer has a structural layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StructuralLayerPurpose {
    /// No structural layer.
    #[default]
    None,
    /// A transform layer for a 3-D rendering context.
    Preserve3D,
    /// A flattening layer grouping the backing with its reflection.
    ReplicaFlattening,
}

impl StructuralLayerPurpose {
    /// Native kind required for this purpose, or `None` for
    /// [`StructuralLayerPurpose::None`].
    #[must_use]
    pub const fn native_kind(self) -> Option<NativeLayerKind> {
        match self {
            Self::None => None,
            Self::Preserve3D => Some(NativeLayerKind::TransformLayer),
            Self::ReplicaFlattening => Some(NativeLayerKind::Layer),
        }
    }
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    /// The structural layer `layer` currently needs.
    #[must_use]
    pub fn structural_layer_purpose(&self, layer: LayerId) -> StructuralLayerPurpose {
        let l = self.layer(layer);
        if l.preserves_3d {
            StructuralLayerPurpose::Preserve3D
        } else if l.replica_layer.is_some() {
            StructuralLayerPurpose::ReplicaFlattening
        } else {
            StructuralLayerPurpose::None
        }
    }

    /// Creates, retypes, or removes the structural layer to match `purpose`.
    pub(crate) fn ensure_structural_layer(
        &mut self,
        layer: LayerId,
        purpose: StructuralLayerPurpose,
        tracer: &mut Tracer<'_>,
    ) {
        let Some(kind) = purpose.native_kind() else {
            self.remove_structural_layer(layer, tracer);
            return;
        };

        let (data, compositor) = self.split(layer);
        let existing = data.structural;
        if existing.is_some_and(|shim| compositor.layer_kind(shim) == kind) {
            return;
        }

        let shim = compositor.create_layer(kind, Some(layer));
        let native = data.native;
        if let Some(old) = existing {
            if let Some(superlayer) = compositor.superlayer(old) {
                compositor.replace_sublayer(superlayer, old, shim);
            }
        } else if let Some(superlayer) = compositor.superlayer(native) {
            compositor.replace_sublayer(superlayer, native, shim);
        }
        compositor.append_sublayer(shim, native);
        for (_, clone) in data.clones.structural.drain() {
            compositor.release_layer(clone);
        }
        data.structural = Some(shim);
        data.uncommitted |= ChangeFlags::STRUCTURAL_LAYER_DEPENDENTS;

        // The backing now sits centred inside the structural layer.
        let center = data.size.to_vec2() * 0.5;
        let backings = core::iter::once(native).chain(data.clones.primary.values().copied());
        for backing in backings {
            compositor.set_position(backing, center.to_point());
            compositor.set_anchor_point(backing, Point3::CENTER);
            compositor.set_transform(backing, &Transform3d::IDENTITY);
            compositor.set_opacity(backing, 1.0);
        }

        if let Some(parent) = self.layer(layer).parent {
            self.note_sublayers_changed(parent);
        }
        self.propagate_layer_change_to_replicas(layer);
        match existing {
            Some(old) => {
                self.move_or_copy_animations(layer, AnimationTransfer::Move, old, shim);
                self.compositor.release_layer(old);
            }
            None => self.move_or_copy_animations(layer, AnimationTransfer::Move, native, shim),
        }
        tracer.structural_layer(&StructuralLayerEvent {
            layer,
            purpose,
            change: StructuralChange::Created,
        });
    }

    fn remove_structural_layer(&mut self, layer: LayerId, tracer: &mut Tracer<'_>) {
        let (data, compositor) = self.split(layer);
        let Some(shim) = data.structural.take() else {
            return;
        };
        let native = data.native;
        compositor.remove_from_superlayer(native);
        let superlayer = compositor.superlayer(shim);
        debug_assert!(
            superlayer.is_some() || data.parent.is_none(),
            "an attached structural layer must have a superlayer"
        );
        if let Some(superlayer) = superlayer {
            compositor.replace_sublayer(superlayer, shim, native);
        }
        for (_, clone) in data.clones.structural.drain() {
            compositor.release_layer(clone);
        }
        data.uncommitted |= ChangeFlags::STRUCTURAL_LAYER_DEPENDENTS;

        self.move_or_copy_animations(layer, AnimationTransfer::Move, shim, native);
        self.compositor.release_layer(shim);
        self.propagate_layer_change_to_replicas(layer);
        tracer.structural_layer(&StructuralLayerEvent {
            layer,
            purpose: StructuralLayerPurpose::None,
            change: StructuralChange::Removed,
        });
    }
}
