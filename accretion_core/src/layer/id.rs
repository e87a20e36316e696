// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logical layer handles.

use core::fmt;

/// Names a logical layer owned by a [`LayerTree`](super::LayerTree).
///
/// This is the host's handle, not a compositor object: the native layers
/// behind it (backing, structural layer, contents layer, clones) come and go
/// across commits while the `LayerId` stays the same. Destroying the layer
/// bumps the slot's generation, so a handle kept past
/// [`destroy_layer`](super::LayerTree::destroy_layer) no longer resolves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl LayerId {
    /// Slot the layer lives in. Slots are reused after destruction.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// How many layers occupied this slot before this one.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer#{}.{}", self.idx, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn debug_names_slot_and_generation() {
        let id = LayerId {
            idx: 7,
            generation: 2,
        };
        assert_eq!(format!("{id:?}"), "Layer#7.2");
    }
}
