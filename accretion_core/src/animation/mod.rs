// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyframe animations and their translation into native animations.
//!
//! The host hands the engine resolved keyframe lists ([`KeyframeValueList`])
//! plus timing metadata ([`Animation`]). [`synthesize`] turns them into one or
//! more [`PlatformAnimation`]s, or reports an [`AnimationFallback`] when the
//! compositor cannot run the animation faithfully and the host has to animate
//! it in software.
//!
//! ```text
//!   KeyframeValueList ──┐
//!   Animation ──────────┼──▶ synthesize ──▶ Vec<LayerPropertyAnimation>
//!   PlatformAnimationQuirks ┘           └──▶ AnimationFallback
//! ```

mod filter;
mod platform;
mod synth;
mod transform_ops;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::geometry::Color;

pub use filter::{
    FilterOperation, FilterOperationKind, FilterOperations, filters_can_be_composited,
};
pub use platform::{PlatformAnimation, PlatformAnimationKind, PlatformFillMode, PlatformValue};
pub use synth::synthesize;
pub use transform_ops::{
    Length, TransformOperation, TransformOperationKind, TransformOperations, ValueFunction,
};

/// Native duration substituted for zero, which some engines read as "default".
pub const ALMOST_ZERO_DURATION: f64 = 1e-3;

/// A property the compositor can animate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimatedProperty {
    /// The layer transform.
    Transform,
    /// Layer opacity.
    Opacity,
    /// Background colour.
    BackgroundColor,
    /// The filter chain.
    Filter,
}

impl AnimatedProperty {
    /// Stable numeric id used in animation identifiers.
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::Transform => 1,
            Self::Opacity => 2,
            Self::BackgroundColor => 3,
            Self::Filter => 4,
        }
    }

    /// Native key path.
    #[must_use]
    pub const fn key_path(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Opacity => "opacity",
            Self::BackgroundColor => "backgroundColor",
            Self::Filter => "filters",
        }
    }

    /// Every animatable property, in the order animations are migrated.
    pub const ALL: [Self; 4] = [
        Self::Transform,
        Self::Opacity,
        Self::BackgroundColor,
        Self::Filter,
    ];
}

/// Easing between two keyframes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimingFunction {
    /// Constant speed.
    Linear,
    /// A cubic Bézier through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
    CubicBezier {
        /// First control point x.
        x1: f64,
        /// First control point y.
        y1: f64,
        /// Second control point x.
        x2: f64,
        /// Second control point y.
        y2: f64,
    },
    /// A staircase with `count` steps. Native engines cannot run these.
    Steps {
        /// Number of steps.
        count: u32,
        /// Jump at the start of each interval rather than the end.
        at_start: bool,
    },
}

impl TimingFunction {
    /// The default `ease` curve.
    pub const EASE: Self = Self::CubicBezier {
        x1: 0.25,
        y1: 0.1,
        x2: 0.25,
        y2: 1.0,
    };

    /// Returns `true` for step functions.
    #[must_use]
    pub const fn is_steps(&self) -> bool {
        matches!(self, Self::Steps { .. })
    }
}

/// Playback direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationDirection {
    /// Start to end on every iteration.
    #[default]
    Normal,
    /// End to start on every iteration.
    Reverse,
    /// Forwards, then backwards.
    Alternate,
    /// Backwards, then forwards.
    AlternateReverse,
}

impl AnimationDirection {
    /// Returns `true` if the first iteration plays start to end.
    #[must_use]
    pub const fn is_forwards(self) -> bool {
        matches!(self, Self::Normal | Self::Alternate)
    }

    /// Returns `true` if iterations alternate direction.
    #[must_use]
    pub const fn alternates(self) -> bool {
        matches!(self, Self::Alternate | Self::AlternateReverse)
    }
}

/// Which end values apply outside the active interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Neither.
    #[default]
    None,
    /// Hold the final value.
    Forwards,
    /// Apply the initial value during the delay.
    Backwards,
    /// Both.
    Both,
}

/// How many times an animation plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IterationCount {
    /// A finite, possibly fractional, count.
    Finite(f64),
    /// Forever.
    Infinite,
}

impl Default for IterationCount {
    fn default() -> Self {
        Self::Finite(1.0)
    }
}

/// Timing metadata for one animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Animation {
    /// Length of one iteration, in seconds.
    pub duration: f64,
    /// Delay before the first iteration, in seconds.
    pub delay: f64,
    /// Number of iterations.
    pub iteration_count: IterationCount,
    /// Playback direction.
    pub direction: AnimationDirection,
    /// Fill behaviour.
    pub fill_mode: FillMode,
    /// Global easing; keyframe easing takes precedence.
    pub timing_function: Option<TimingFunction>,
}

impl Animation {
    /// A forwards, single-iteration animation of `duration` seconds.
    #[must_use]
    pub const fn new(duration: f64) -> Self {
        Self {
            duration,
            delay: 0.0,
            iteration_count: IterationCount::Finite(1.0),
            direction: AnimationDirection::Normal,
            fill_mode: FillMode::None,
            timing_function: None,
        }
    }

    /// Returns `true` if the animation would have no visible effect.
    #[must_use]
    pub fn is_empty_or_zero_duration(&self) -> bool {
        self.duration == 0.0 && self.delay <= 0.0
    }
}

/// One keyframe: a value at a normalized time.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe<T> {
    /// Position in `[0, 1]`.
    pub key_time: f64,
    /// Value at that time.
    pub value: T,
    /// Easing for the segment that follows.
    pub timing_function: Option<TimingFunction>,
}

impl<T> Keyframe<T> {
    /// A keyframe without its own easing.
    pub const fn new(key_time: f64, value: T) -> Self {
        Self {
            key_time,
            value,
            timing_function: None,
        }
    }
}

/// Keyframes of a single property, in key-time order.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyframeValueList {
    /// Opacity keyframes.
    Opacity(Vec<Keyframe<f32>>),
    /// Background-colour keyframes.
    BackgroundColor(Vec<Keyframe<Color>>),
    /// Transform keyframes.
    Transform(Vec<Keyframe<TransformOperations>>),
    /// Filter keyframes.
    Filter(Vec<Keyframe<FilterOperations>>),
}

impl KeyframeValueList {
    /// The animated property.
    #[must_use]
    pub const fn property(&self) -> AnimatedProperty {
        match self {
            Self::Opacity(_) => AnimatedProperty::Opacity,
            Self::BackgroundColor(_) => AnimatedProperty::BackgroundColor,
            Self::Transform(_) => AnimatedProperty::Transform,
            Self::Filter(_) => AnimatedProperty::Filter,
        }
    }

    /// Number of keyframes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Opacity(v) => v.len(),
            Self::BackgroundColor(v) => v.len(),
            Self::Transform(v) => v.len(),
            Self::Filter(v) => v.len(),
        }
    }

    /// Returns `true` if there are no keyframes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit timing function of keyframe `i`.
    fn timing_function_at(&self, i: usize) -> Option<TimingFunction> {
        match self {
            Self::Opacity(v) => v[i].timing_function,
            Self::BackgroundColor(v) => v[i].timing_function,
            Self::Transform(v) => v[i].timing_function,
            Self::Filter(v) => v[i].timing_function,
        }
    }

    /// Key time of keyframe `i`.
    fn key_time_at(&self, i: usize) -> f64 {
        match self {
            Self::Opacity(v) => v[i].key_time,
            Self::BackgroundColor(v) => v[i].key_time,
            Self::Transform(v) => v[i].key_time,
            Self::Filter(v) => v[i].key_time,
        }
    }
}

/// A native animation waiting to be attached, or attached and running.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPropertyAnimation {
    /// The native descriptor.
    pub animation: PlatformAnimation,
    /// Name the host added the animation under.
    pub name: String,
    /// Animated property.
    pub property: AnimatedProperty,
    /// Transform or filter function index.
    pub index: usize,
    /// Filter sub-property index.
    pub sub_index: usize,
    /// Seconds already elapsed when the animation was added.
    pub time_offset: f64,
}

impl LayerPropertyAnimation {
    /// Key under which the animation is stored on native layers.
    #[must_use]
    pub fn identifier(&self) -> String {
        animation_identifier(&self.name, self.property, self.index, self.sub_index)
    }
}

/// Builds the native animation key `{name}_{property}_{index}_{sub_index}`.
#[must_use]
pub fn animation_identifier(
    name: &str,
    property: AnimatedProperty,
    index: usize,
    sub_index: usize,
) -> String {
    format!("{name}_{}_{index}_{sub_index}", property.id())
}

/// Deferred work on a running animation, applied at the next commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationProcessingAction {
    /// Freeze at `time_offset` seconds.
    Pause {
        /// Playback position to freeze at.
        time_offset: f64,
    },
    /// Detach from the compositor.
    Remove,
}

/// Why an animation cannot run on the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimationFallback {
    /// No timing metadata was supplied.
    MissingTiming,
    /// Zero duration and no delay.
    ZeroDuration,
    /// Fewer than two keyframes.
    TooFewKeyframes,
    /// A `steps()` timing function is involved.
    SteppedTiming,
    /// Reverse playback is not supported by the compositor.
    UnsupportedDirection,
    /// Per-component transform animation requires value functions.
    NeedsValueFunction,
    /// A keyframe transform is not invertible.
    SingularMatrix,
    /// Keyframe filter lists differ in shape.
    MismatchedOperations,
    /// Drop shadows cannot be animated natively.
    DropShadow,
    /// Filter animations are not accelerated on this compositor.
    FiltersUnsupported,
    /// The filter chain cannot be composited at all.
    FilterNotComposited,
}

impl fmt::Display for AnimationFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingTiming => "no animation timing",
            Self::ZeroDuration => "zero duration",
            Self::TooFewKeyframes => "fewer than two keyframes",
            Self::SteppedTiming => "steps() timing function",
            Self::UnsupportedDirection => "reverse direction unsupported",
            Self::NeedsValueFunction => "transform needs value functions",
            Self::SingularMatrix => "non-invertible keyframe matrix",
            Self::MismatchedOperations => "keyframe filter lists do not match",
            Self::DropShadow => "drop-shadow filter",
            Self::FiltersUnsupported => "filter animations unsupported",
            Self::FilterNotComposited => "filters cannot be composited",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn identifier_format() {
        assert_eq!(
            animation_identifier("spin", AnimatedProperty::Transform, 2, 0),
            "spin_1_2_0"
        );
        assert_eq!(
            animation_identifier("blur", AnimatedProperty::Filter, 0, 3),
            "blur_4_0_3"
        );
    }

    #[test]
    fn zero_duration_needs_no_delay() {
        let mut a = Animation::new(0.0);
        assert!(a.is_empty_or_zero_duration());
        a.delay = 0.5;
        assert!(!a.is_empty_or_zero_duration());
    }

    #[test]
    fn direction_predicates() {
        assert!(AnimationDirection::Alternate.is_forwards());
        assert!(!AnimationDirection::AlternateReverse.is_forwards());
        assert!(AnimationDirection::AlternateReverse.alternates());
        assert!(!AnimationDirection::Reverse.alternates());
    }

    #[test]
    fn fallback_display() {
        assert_eq!(
            AnimationFallback::SingularMatrix.to_string(),
            "non-invertible keyframe matrix"
        );
    }
}
