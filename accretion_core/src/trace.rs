// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the commit engine.
//!
//! [`CommitTraceSink`] has one method per event; all default to no-ops, so a
//! sink only implements what it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn CommitTraceSink`. With the `trace`
//! feature **off**, every `Tracer` method compiles to nothing. With it **on**,
//! each method performs a single `Option` branch before dispatching.

use kurbo::Rect;

use crate::animation::AnimationFallback;
use crate::dirty::ChangeFlags;
use crate::layer::{LayerId, StructuralLayerPurpose};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a flush starts.
#[derive(Clone, Copy, Debug)]
pub struct FlushBeginEvent {
    /// Layer the flush starts at.
    pub root: LayerId,
    /// Root clip rectangle; `None` for a self-only flush.
    pub clip: Option<Rect>,
}

/// Emitted when a flush finishes.
#[derive(Clone, Copy, Debug)]
pub struct FlushEndEvent {
    /// Layer the flush started at.
    pub root: LayerId,
    /// Layers whose commit phases ran.
    pub layers_visited: u32,
    /// Layers that had pending changes.
    pub layers_committed: u32,
}

/// Emitted for every layer that had pending changes, before they are applied.
#[derive(Clone, Copy, Debug)]
pub struct LayerCommitEvent {
    /// The layer being committed.
    pub layer: LayerId,
    /// Pending changes at the start of the before-children phase.
    pub changes: ChangeFlags,
    /// Tree depth including structural layers.
    pub depth: usize,
}

/// Emitted when a layer switches between a plain and a tiled backing.
#[derive(Clone, Copy, Debug)]
pub struct BackingSwapEvent {
    /// The layer whose backing changed.
    pub layer: LayerId,
    /// Whether the new backing is tiled.
    pub tiled: bool,
}

/// Whether a structural layer appeared or went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructuralChange {
    /// A structural layer was created (possibly replacing one of another type).
    Created,
    /// The structural layer was removed.
    Removed,
}

/// Emitted when a structural layer is created or removed.
#[derive(Clone, Copy, Debug)]
pub struct StructuralLayerEvent {
    /// The owning layer.
    pub layer: LayerId,
    /// Purpose of the structural layer after the change.
    pub purpose: StructuralLayerPurpose,
    /// What happened.
    pub change: StructuralChange,
}

/// Emitted when an animation cannot run on the compositor.
#[derive(Clone, Copy, Debug)]
pub struct AnimationFallbackEvent<'a> {
    /// The layer the animation was added to.
    pub layer: LayerId,
    /// Animation name.
    pub name: &'a str,
    /// Why the compositor cannot run it.
    pub reason: AnimationFallback,
}

/// Emitted when a layer's sublayers are pruned for exceeding the depth cap.
#[derive(Clone, Copy, Debug)]
pub struct DepthCapEvent {
    /// The layer whose sublayers were detached.
    pub layer: LayerId,
    /// Depth at which the cap was hit.
    pub depth: usize,
}

// ---------------------------------------------------------------------------
// CommitTraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the commit engine.
///
/// All methods have default no-op implementations.
pub trait CommitTraceSink {
    /// Called when a flush starts.
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        _ = e;
    }

    /// Called when a flush finishes.
    fn on_flush_end(&mut self, e: &FlushEndEvent) {
        _ = e;
    }

    /// Called when a layer with pending changes is committed.
    fn on_layer_commit(&mut self, e: &LayerCommitEvent) {
        _ = e;
    }

    /// Called when a layer swaps its backing.
    fn on_backing_swap(&mut self, e: &BackingSwapEvent) {
        _ = e;
    }

    /// Called when a structural layer is created or removed.
    fn on_structural_layer(&mut self, e: &StructuralLayerEvent) {
        _ = e;
    }

    /// Called when an animation falls back to software.
    fn on_animation_fallback(&mut self, e: &AnimationFallbackEvent<'_>) {
        _ = e;
    }

    /// Called when sublayers are pruned by the depth cap.
    fn on_depth_cap(&mut self, e: &DepthCapEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`CommitTraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl CommitTraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`CommitTraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn CommitTraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn CommitTraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Dispatches to the sink when tracing is compiled in.
macro_rules! dispatch {
    ($self:ident, $method:ident, $e:expr) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn CommitTraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FlushBeginEvent`].
    #[inline]
    pub fn flush_begin(&mut self, e: &FlushBeginEvent) {
        dispatch!(self, on_flush_begin, e);
    }

    /// Emits a [`FlushEndEvent`].
    #[inline]
    pub fn flush_end(&mut self, e: &FlushEndEvent) {
        dispatch!(self, on_flush_end, e);
    }

    /// Emits a [`LayerCommitEvent`].
    #[inline]
    pub fn layer_commit(&mut self, e: &LayerCommitEvent) {
        dispatch!(self, on_layer_commit, e);
    }

    /// Emits a [`BackingSwapEvent`].
    #[inline]
    pub fn backing_swap(&mut self, e: &BackingSwapEvent) {
        dispatch!(self, on_backing_swap, e);
    }

    /// Emits a [`StructuralLayerEvent`].
    #[inline]
    pub fn structural_layer(&mut self, e: &StructuralLayerEvent) {
        dispatch!(self, on_structural_layer, e);
    }

    /// Emits an [`AnimationFallbackEvent`].
    #[inline]
    pub fn animation_fallback(&mut self, e: &AnimationFallbackEvent<'_>) {
        dispatch!(self, on_animation_fallback, e);
    }

    /// Emits a [`DepthCapEvent`].
    #[inline]
    pub fn depth_cap(&mut self, e: &DepthCapEvent) {
        dispatch!(self, on_depth_cap, e);
    }
}
