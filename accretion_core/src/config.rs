// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit-engine limits and per-platform animation quirks.

/// How the native animation engine deviates from the ideal declarative model.
///
/// Each field describes one capability of the compositor; the synthesizer
/// consults them instead of branching on platform identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlatformAnimationQuirks {
    /// The engine applies multiple keyed animations on one layer in reverse
    /// insertion order, so component animations must be emitted last-first.
    pub reverses_multi_animation_order: bool,
    /// Animations can be tagged with a value function (per-component
    /// interpolation of a transform).
    pub supports_value_function: bool,
    /// Filter animations can run on the compositor.
    pub supports_accelerated_filter_animations: bool,
    /// Reverse and alternate-reverse directions are honoured.
    pub supports_reverse_direction: bool,
}

impl PlatformAnimationQuirks {
    /// A fully capable engine with in-order animation application.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            reverses_multi_animation_order: false,
            supports_value_function: true,
            supports_accelerated_filter_animations: true,
            supports_reverse_direction: true,
        }
    }
}

impl Default for PlatformAnimationQuirks {
    fn default() -> Self {
        Self::modern()
    }
}

/// Limits applied during commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommitConfig {
    /// Tree depth (counting structural layers) beyond which sublayers are not
    /// attached.
    pub max_layer_tree_depth: usize,
    /// Width or height in device pixels above which a drawing layer switches
    /// to a tiled backing.
    pub max_pixel_dimension: f64,
    /// Maximum number of nested reflections that are cloned.
    pub max_replica_depth: usize,
    /// Dirty rectangles kept per layer before further ones are merged.
    pub max_dirty_rects: usize,
    /// Capabilities of the native animation engine.
    pub quirks: PlatformAnimationQuirks,
}

impl CommitConfig {
    /// Defaults for a current compositor.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            max_layer_tree_depth: 250,
            max_pixel_dimension: 2000.0,
            max_replica_depth: 16,
            max_dirty_rects: 32,
            quirks: PlatformAnimationQuirks::modern(),
        }
    }

    /// Defaults for older macOS releases that apply additive animations in
    /// reverse order.
    #[must_use]
    pub const fn legacy_mac() -> Self {
        let mut config = Self::modern();
        config.quirks.reverses_multi_animation_order = true;
        config
    }

    /// Defaults for the Windows port of the compositor.
    #[must_use]
    pub const fn windows() -> Self {
        Self {
            quirks: PlatformAnimationQuirks {
                reverses_multi_animation_order: true,
                supports_value_function: false,
                supports_accelerated_filter_animations: false,
                supports_reverse_direction: false,
            },
            ..Self::modern()
        }
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self::modern()
    }
}
