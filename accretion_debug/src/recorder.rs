// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording and replay.
//!
//! [`RecorderSink`] implements [`CommitTraceSink`] and keeps every event as an
//! owned [`RecordedEvent`]. Recordings can be inspected directly, summarized
//! per flush with [`RecorderSink::flushes`], or replayed into another sink.

use accretion_core::trace::{
    AnimationFallbackEvent, BackingSwapEvent, CommitTraceSink, DepthCapEvent, FlushBeginEvent,
    FlushEndEvent, LayerCommitEvent, StructuralLayerEvent,
};
use accretion_core::{animation::AnimationFallback, layer::LayerId};

// ---------------------------------------------------------------------------
// Recorded events
// ---------------------------------------------------------------------------

/// An owned copy of one trace event.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FlushBeginEvent`].
    FlushBegin(FlushBeginEvent),
    /// A [`FlushEndEvent`].
    FlushEnd(FlushEndEvent),
    /// A [`LayerCommitEvent`].
    LayerCommit(LayerCommitEvent),
    /// A [`BackingSwapEvent`].
    BackingSwap(BackingSwapEvent),
    /// A [`StructuralLayerEvent`].
    StructuralLayer(StructuralLayerEvent),
    /// An [`AnimationFallbackEvent`] with its name copied out.
    AnimationFallback {
        /// The layer the animation was added to.
        layer: LayerId,
        /// Animation name.
        name: String,
        /// Why the compositor cannot run it.
        reason: AnimationFallback,
    },
    /// A [`DepthCapEvent`].
    DepthCap(DepthCapEvent),
}

/// Totals for one flush, from its begin and end events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Layers whose commit phases ran.
    pub layers_visited: u32,
    /// Layers that had pending changes.
    pub layers_committed: u32,
    /// Backing swaps during the flush.
    pub backing_swaps: u32,
    /// Structural layers created or removed during the flush.
    pub structural_changes: u32,
    /// Layers whose sublayers were pruned by the depth cap.
    pub depth_caps: u32,
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`CommitTraceSink`] that stores every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// One summary per completed flush.
    ///
    /// Events outside a begin/end pair are not counted.
    #[must_use]
    pub fn flushes(&self) -> Vec<FlushSummary> {
        let mut out = Vec::new();
        let mut current: Option<FlushSummary> = None;
        for event in &self.events {
            match event {
                RecordedEvent::FlushBegin(_) => current = Some(FlushSummary::default()),
                RecordedEvent::FlushEnd(e) => {
                    if let Some(mut summary) = current.take() {
                        summary.layers_visited = e.layers_visited;
                        summary.layers_committed = e.layers_committed;
                        out.push(summary);
                    }
                }
                RecordedEvent::BackingSwap(_) => {
                    if let Some(s) = &mut current {
                        s.backing_swaps += 1;
                    }
                }
                RecordedEvent::StructuralLayer(_) => {
                    if let Some(s) = &mut current {
                        s.structural_changes += 1;
                    }
                }
                RecordedEvent::DepthCap(_) => {
                    if let Some(s) = &mut current {
                        s.depth_caps += 1;
                    }
                }
                RecordedEvent::LayerCommit(_) | RecordedEvent::AnimationFallback { .. } => {}
            }
        }
        out
    }

    /// Feeds every recorded event, in order, to `sink`.
    pub fn replay(&self, sink: &mut dyn CommitTraceSink) {
        for event in &self.events {
            match event {
                RecordedEvent::FlushBegin(e) => sink.on_flush_begin(e),
                RecordedEvent::FlushEnd(e) => sink.on_flush_end(e),
                RecordedEvent::LayerCommit(e) => sink.on_layer_commit(e),
                RecordedEvent::BackingSwap(e) => sink.on_backing_swap(e),
                RecordedEvent::StructuralLayer(e) => sink.on_structural_layer(e),
                RecordedEvent::AnimationFallback {
                    layer,
                    name,
                    reason,
                } => sink.on_animation_fallback(&AnimationFallbackEvent {
                    layer: *layer,
                    name,
                    reason: *reason,
                }),
                RecordedEvent::DepthCap(e) => sink.on_depth_cap(e),
            }
        }
    }
}

impl CommitTraceSink for RecorderSink {
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        self.events.push(RecordedEvent::FlushBegin(*e));
    }

    fn on_flush_end(&mut self, e: &FlushEndEvent) {
        self.events.push(RecordedEvent::FlushEnd(*e));
    }

    fn on_layer_commit(&mut self, e: &LayerCommitEvent) {
        self.events.push(RecordedEvent::LayerCommit(*e));
    }

    fn on_backing_swap(&mut self, e: &BackingSwapEvent) {
        self.events.push(RecordedEvent::BackingSwap(*e));
    }

    fn on_structural_layer(&mut self, e: &StructuralLayerEvent) {
        self.events.push(RecordedEvent::StructuralLayer(*e));
    }

    fn on_animation_fallback(&mut self, e: &AnimationFallbackEvent<'_>) {
        self.events.push(RecordedEvent::AnimationFallback {
            layer: e.layer,
            name: e.name.to_owned(),
            reason: e.reason,
        });
    }

    fn on_depth_cap(&mut self, e: &DepthCapEvent) {
        self.events.push(RecordedEvent::DepthCap(*e));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
