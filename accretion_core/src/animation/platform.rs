// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native animation descriptors.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{TimingFunction, ValueFunction};
use crate::geometry::{Color, Point3};
use crate::transform::Transform3d;

/// Two-endpoint or multi-keyframe animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformAnimationKind {
    /// `from` → `to`.
    Basic,
    /// `key_times` / `values`.
    Keyframe,
}

/// Native fill mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlatformFillMode {
    /// Removed outside the active interval.
    #[default]
    NoFill,
    /// Holds the end value.
    Forwards,
    /// Applies the start value during the delay.
    Backwards,
    /// Both.
    Both,
}

/// A value a native animation interpolates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlatformValue {
    /// A scalar.
    Number(f64),
    /// A 3-D point (scale or translation triple).
    Point3(Point3),
    /// A full matrix.
    Matrix(Transform3d),
    /// A colour.
    Color(Color),
    /// A four-component filter vector.
    Vector([f64; 4]),
}

/// A declarative animation as the compositor receives it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformAnimation {
    /// Basic or keyframe.
    pub kind: PlatformAnimationKind,
    /// Animated native property.
    pub key_path: String,
    /// Start value of a basic animation.
    pub from: Option<PlatformValue>,
    /// End value of a basic animation.
    pub to: Option<PlatformValue>,
    /// Easing of a basic animation.
    pub timing_function: Option<TimingFunction>,
    /// Key times of a keyframe animation.
    pub key_times: Vec<f64>,
    /// Values of a keyframe animation.
    pub values: Vec<PlatformValue>,
    /// Per-segment easing of a keyframe animation.
    pub timing_functions: Vec<TimingFunction>,
    /// Whether the easing curves must be mirrored for reverse playback.
    pub reverse_timing_functions: bool,
    /// Length of one iteration, in seconds.
    pub duration: f64,
    /// Number of repeats.
    pub repeat_count: f32,
    /// Play backwards after each forward pass.
    pub autoreverses: bool,
    /// Whether the engine drops the animation when it ends.
    pub removed_on_completion: bool,
    /// Compose with the underlying value.
    pub additive: bool,
    /// Fill mode.
    pub fill_mode: PlatformFillMode,
    /// Transform component the values represent.
    pub value_function: Option<ValueFunction>,
    /// Media time to start at; `0` means "when committed".
    pub begin_time: f64,
    /// Local speed.
    pub speed: f32,
    /// Local time offset.
    pub time_offset: f64,
}

impl PlatformAnimation {
    fn new(kind: PlatformAnimationKind, key_path: &str) -> Self {
        Self {
            kind,
            key_path: key_path.to_string(),
            from: None,
            to: None,
            timing_function: None,
            key_times: Vec::new(),
            values: Vec::new(),
            timing_functions: Vec::new(),
            reverse_timing_functions: false,
            duration: 0.0,
            repeat_count: 1.0,
            autoreverses: false,
            removed_on_completion: true,
            additive: false,
            fill_mode: PlatformFillMode::NoFill,
            value_function: None,
            begin_time: 0.0,
            speed: 1.0,
            time_offset: 0.0,
        }
    }

    /// A two-endpoint animation of `key_path`.
    #[must_use]
    pub fn basic(key_path: &str) -> Self {
        Self::new(PlatformAnimationKind::Basic, key_path)
    }

    /// A multi-keyframe animation of `key_path`.
    #[must_use]
    pub fn keyframe(key_path: &str) -> Self {
        Self::new(PlatformAnimationKind::Keyframe, key_path)
    }
}
