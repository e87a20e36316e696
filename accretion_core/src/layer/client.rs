// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host side of the layer tree.

use alloc::vec::Vec;

use kurbo::{Point, Rect};

use super::LayerId;
use crate::transform::Transform3d;

/// Callbacks from the layer tree into its host.
///
/// One client serves a whole [`LayerTree`](super::LayerTree); every method
/// receives the logical layer it concerns. All methods have defaults so a host
/// only implements what it needs.
pub trait LayerClient {
    /// `layer` gained pending changes (or its flush can no longer be
    /// deferred); the host should schedule a flush.
    fn notify_flush_required(&mut self, layer: LayerId) {
        _ = layer;
    }

    /// `layer`'s own pending changes were committed.
    fn did_commit_changes_for_layer(&mut self, layer: LayerId) {
        _ = layer;
    }

    /// A native animation on `layer` began at `start_time` (media clock).
    fn notify_animation_started(&mut self, layer: LayerId, start_time: f64) {
        _ = (layer, start_time);
    }

    /// `layer` switched to (`tiled == true`) or from a tiled backing.
    fn tiled_backing_usage_changed(&mut self, layer: LayerId, tiled: bool) {
        _ = (layer, tiled);
    }

    /// `layer` is tiled and under a running transform animation; the next
    /// flush should be aligned with display refresh.
    fn notify_flush_before_display_refresh(&mut self, layer: LayerId) {
        _ = layer;
    }

    /// Position to use for `layer` when computing visible rects, overriding
    /// its committed position.
    fn custom_position(&self, layer: LayerId) -> Option<Point> {
        _ = layer;
        None
    }

    /// The transform `layer` currently shows, including animation.
    ///
    /// Only consulted by the commit walk; flush-need queries use the
    /// committed transform.
    fn current_transform(&self, layer: LayerId) -> Option<Transform3d> {
        _ = layer;
        None
    }

    /// Page scale applied by layers that
    /// [apply page scale](super::LayerTree::set_applies_page_scale).
    fn page_scale_factor(&self) -> f64 {
        1.0
    }

    /// Device pixel ratio.
    fn device_scale_factor(&self) -> f64 {
        1.0
    }

    /// Paint `clip` of `layer`'s contents into its backing store.
    fn paint_contents(&mut self, layer: LayerId, clip: Rect) {
        _ = (layer, clip);
    }
}

/// One recorded [`LayerClient`] callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClientEvent {
    /// [`LayerClient::notify_flush_required`].
    FlushRequired(LayerId),
    /// [`LayerClient::did_commit_changes_for_layer`].
    DidCommit(LayerId),
    /// [`LayerClient::notify_animation_started`].
    AnimationStarted(LayerId, f64),
    /// [`LayerClient::tiled_backing_usage_changed`].
    TiledBackingUsageChanged(LayerId, bool),
    /// [`LayerClient::notify_flush_before_display_refresh`].
    FlushBeforeDisplayRefresh(LayerId),
    /// [`LayerClient::paint_contents`].
    PaintContents(LayerId, Rect),
}

/// A [`LayerClient`] that records every callback and reports fixed scales.
#[derive(Clone, Debug)]
pub struct RecordingClient {
    /// Callbacks in arrival order.
    pub events: Vec<ClientEvent>,
    /// Returned from [`LayerClient::page_scale_factor`].
    pub page_scale: f64,
    /// Returned from [`LayerClient::device_scale_factor`].
    pub device_scale: f64,
    /// Per-layer transform overrides for [`LayerClient::current_transform`].
    pub current_transforms: Vec<(LayerId, Transform3d)>,
    /// Per-layer overrides for [`LayerClient::custom_position`].
    pub custom_positions: Vec<(LayerId, Point)>,
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingClient {
    /// Creates a client with unit scales and no recorded events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            page_scale: 1.0,
            device_scale: 1.0,
            current_transforms: Vec::new(),
            custom_positions: Vec::new(),
        }
    }

    /// Removes and returns all recorded events.
    pub fn take_events(&mut self) -> Vec<ClientEvent> {
        core::mem::take(&mut self.events)
    }

    /// Number of flush requests recorded for `layer`.
    #[must_use]
    pub fn flush_requests(&self, layer: LayerId) -> usize {
        self.events
            .iter()
            .filter(|e| **e == ClientEvent::FlushRequired(layer))
            .count()
    }

    /// Number of commit notifications recorded for `layer`.
    #[must_use]
    pub fn commits(&self, layer: LayerId) -> usize {
        self.events
            .iter()
            .filter(|e| **e == ClientEvent::DidCommit(layer))
            .count()
    }
}

impl LayerClient for RecordingClient {
    fn notify_flush_required(&mut self, layer: LayerId) {
        self.events.push(ClientEvent::FlushRequired(layer));
    }

    fn did_commit_changes_for_layer(&mut self, layer: LayerId) {
        self.events.push(ClientEvent::DidCommit(layer));
    }

    fn notify_animation_started(&mut self, layer: LayerId, start_time: f64) {
        self.events
            .push(ClientEvent::AnimationStarted(layer, start_time));
    }

    fn tiled_backing_usage_changed(&mut self, layer: LayerId, tiled: bool) {
        self.events
            .push(ClientEvent::TiledBackingUsageChanged(layer, tiled));
    }

    fn notify_flush_before_display_refresh(&mut self, layer: LayerId) {
        self.events
            .push(ClientEvent::FlushBeforeDisplayRefresh(layer));
    }

    fn custom_position(&self, layer: LayerId) -> Option<Point> {
        self.custom_positions
            .iter()
            .find_map(|(l, p)| (*l == layer).then_some(*p))
    }

    fn current_transform(&self, layer: LayerId) -> Option<Transform3d> {
        self.current_transforms
            .iter()
            .find_map(|(l, t)| (*l == layer).then_some(*t))
    }

    fn page_scale_factor(&self) -> f64 {
        self.page_scale
    }

    fn device_scale_factor(&self) -> f64 {
        self.device_scale
    }

    fn paint_contents(&mut self, layer: LayerId, clip: Rect) {
        self.events.push(ClientEvent::PaintContents(layer, clip));
    }
}
