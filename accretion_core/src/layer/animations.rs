// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation bookkeeping and its commit step.
//!
//! Animations go through three stages:
//!
//! 1. [`add_animation`](LayerTree::add_animation) synthesizes native
//!    descriptors and queues them as *uncommitted*.
//! 2. Pause and remove requests on *running* animations are queued by name.
//! 3. At commit, queued actions are applied first, then uncommitted
//!    animations are attached and become running.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Size;

use crate::animation::{
    AnimatedProperty, Animation, AnimationFallback, AnimationProcessingAction, KeyframeValueList,
    LayerPropertyAnimation, animation_identifier, synthesize,
};
use crate::dirty::ChangeFlags;
use crate::native::{Compositor, NativeLayerId};

use super::tree::PendingFallback;
use super::{LayerClient, LayerId, LayerTree};

/// How [`LayerTree::move_or_copy_animations`] transfers animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AnimationTransfer {
    /// Detach from the source.
    Move,
    /// Leave the source untouched.
    Copy,
}

impl<C: Compositor, L: LayerClient> LayerTree<C, L> {
    // -- Animation API --

    /// Starts animating `layer` with `values`.
    ///
    /// Returns `false` if the compositor cannot run the animation; the
    /// reason is reported through the tracer at the next flush and the host
    /// should animate in software instead.
    pub fn add_animation(
        &mut self,
        layer: LayerId,
        values: &KeyframeValueList,
        box_size: Size,
        animation: Option<&Animation>,
        name: &str,
        time_offset: f64,
    ) -> bool {
        match self.try_add_animation(layer, values, box_size, animation, name, time_offset) {
            Ok(()) => true,
            Err(reason) => {
                self.fallbacks.push(PendingFallback {
                    layer,
                    name: name.into(),
                    reason,
                });
                false
            }
        }
    }

    /// Like [`add_animation`](Self::add_animation), returning the fallback
    /// reason instead of queueing it for the tracer.
    pub fn try_add_animation(
        &mut self,
        layer: LayerId,
        values: &KeyframeValueList,
        box_size: Size,
        animation: Option<&Animation>,
        name: &str,
        time_offset: f64,
    ) -> Result<(), AnimationFallback> {
        debug_assert!(!name.is_empty(), "animations need a name");
        self.validate(layer);
        let synthesized = synthesize(
            values,
            box_size,
            animation,
            name,
            time_offset,
            &self.config.quirks,
        )?;
        self.layer_mut(layer)
            .uncommitted_animations
            .extend(synthesized);
        self.note_change(layer, ChangeFlags::ANIMATION);
        Ok(())
    }

    /// Freezes the running animation `name` at `time_offset` seconds.
    ///
    /// Ignored unless the animation is running. A pending removal takes
    /// precedence, and a second pause before the commit keeps the first
    /// offset.
    pub fn pause_animation(&mut self, layer: LayerId, name: &str, time_offset: f64) {
        let l = self.layer_mut(layer);
        if !l.running_animations.contains_key(name) {
            return;
        }
        if !l.animations_to_process.iter().any(|(n, _)| n == name) {
            l.animations_to_process
                .push((name.into(), AnimationProcessingAction::Pause { time_offset }));
        }
        self.note_change(layer, ChangeFlags::ANIMATION);
    }

    /// Detaches the running animation `name` at the next commit.
    ///
    /// Ignored unless the animation is running.
    pub fn remove_animation(&mut self, layer: LayerId, name: &str) {
        let l = self.layer_mut(layer);
        if !l.running_animations.contains_key(name) {
            return;
        }
        match l.animations_to_process.iter_mut().find(|(n, _)| n == name) {
            Some((_, action)) => *action = AnimationProcessingAction::Remove,
            None => l
                .animations_to_process
                .push((name.into(), AnimationProcessingAction::Remove)),
        }
        self.note_change(layer, ChangeFlags::ANIMATION);
    }

    /// Freezes every animation on `layer` and its clones at `time` (host
    /// clock; `None` means now).
    pub fn suspend_animations(&mut self, layer: LayerId, time: Option<f64>) {
        let (data, compositor) = self.split(layer);
        let now = time.unwrap_or_else(|| compositor.current_time());
        let t = compositor.to_media_time(now);
        let targets = core::iter::once(data.primary_layer())
            .chain(data.primary_clones().values().copied());
        for target in targets {
            compositor.set_speed(target, 0.0);
            compositor.set_time_offset(target, t);
        }
    }

    /// Undoes [`suspend_animations`](Self::suspend_animations).
    pub fn resume_animations(&mut self, layer: LayerId) {
        let (data, compositor) = self.split(layer);
        let targets = core::iter::once(data.primary_layer())
            .chain(data.primary_clones().values().copied());
        for target in targets {
            compositor.set_speed(target, 1.0);
            compositor.set_time_offset(target, 0.0);
        }
    }

    /// Returns whether `name` is attached to the compositor on `layer`.
    #[must_use]
    pub fn is_animation_running(&self, layer: LayerId, name: &str) -> bool {
        self.layer(layer).running_animations.contains_key(name)
    }

    /// Returns whether any running animation on `layer` animates its
    /// transform.
    #[must_use]
    pub fn is_running_transform_animation(&self, layer: LayerId) -> bool {
        self.layer(layer)
            .running_animations
            .values()
            .flatten()
            .any(|a| a.property == AnimatedProperty::Transform)
    }

    // -- Commit --

    /// Applies queued pause and remove actions, then attaches uncommitted
    /// animations.
    pub(crate) fn update_animations(&mut self, layer: LayerId) {
        let actions = core::mem::take(&mut self.layer_mut(layer).animations_to_process);
        for (name, action) in actions {
            let Some(running) = self.layer(layer).running_animations.get(&name).cloned() else {
                continue;
            };
            for anim in &running {
                match action {
                    AnimationProcessingAction::Remove => {
                        self.remove_animation_from_layer(
                            layer,
                            anim.property,
                            &name,
                            anim.index,
                            anim.sub_index,
                        );
                    }
                    AnimationProcessingAction::Pause { time_offset } => {
                        self.pause_animation_on_layer(
                            layer,
                            anim.property,
                            &name,
                            anim.index,
                            anim.sub_index,
                            time_offset,
                        );
                    }
                }
            }
            if action == AnimationProcessingAction::Remove {
                self.layer_mut(layer).running_animations.remove(&name);
            }
        }

        let uncommitted = core::mem::take(&mut self.layer_mut(layer).uncommitted_animations);
        for anim in uncommitted {
            self.set_animation_on_layer(layer, &anim);
            self.layer_mut(layer)
                .running_animations
                .entry(anim.name.clone())
                .or_default()
                .push(anim);
        }
    }

    fn set_animation_on_layer(&mut self, layer: LayerId, anim: &LayerPropertyAnimation) {
        let (data, compositor) = self.split(layer);
        let Some(target) = data.animated_layer(anim.property) else {
            return;
        };
        let mut native = anim.animation.clone();
        if anim.time_offset != 0.0 {
            native.begin_time = compositor.current_media_time() - anim.time_offset;
        }
        let key = anim.identifier();
        compositor.remove_animation(target, &key);
        compositor.add_animation(target, &key, &native);

        let skip_roots = data.replica_layer.is_some();
        for (clone_id, clone) in data.animated_clones(anim.property) {
            if skip_roots && clone_id.is_replica_root() {
                continue;
            }
            compositor.remove_animation(*clone, &key);
            compositor.add_animation(*clone, &key, &native);
        }
    }

    fn remove_animation_from_layer(
        &mut self,
        layer: LayerId,
        property: AnimatedProperty,
        name: &str,
        index: usize,
        sub_index: usize,
    ) -> bool {
        let (data, compositor) = self.split(layer);
        let Some(target) = data.animated_layer(property) else {
            return false;
        };
        let key = animation_identifier(name, property, index, sub_index);
        if compositor.animation(target, &key).is_none() {
            return false;
        }
        compositor.remove_animation(target, &key);

        // Nudge the structural layer's transform so the compositor redraws
        // the final, unanimated value.
        if let Some(shim) = data.structural {
            let mut transform = compositor.transform(shim);
            transform.cols[3][0] += 1.0;
            compositor.set_transform(shim, &transform);
            transform.cols[3][0] -= 1.0;
            compositor.set_transform(shim, &transform);
        }

        let skip_roots = data.replica_layer.is_some();
        for (clone_id, clone) in data.animated_clones(property) {
            if skip_roots && clone_id.is_replica_root() {
                continue;
            }
            compositor.remove_animation(*clone, &key);
        }
        true
    }

    fn pause_animation_on_layer(
        &mut self,
        layer: LayerId,
        property: AnimatedProperty,
        name: &str,
        index: usize,
        sub_index: usize,
        time_offset: f64,
    ) {
        let (data, compositor) = self.split(layer);
        let Some(target) = data.animated_layer(property) else {
            return;
        };
        let key = animation_identifier(name, property, index, sub_index);
        let Some(current) = compositor.animation(target, &key) else {
            return;
        };
        let mut paused = current.clone();
        paused.speed = 0.0;
        paused.time_offset = time_offset;
        compositor.add_animation(target, &key, &paused);

        let skip_roots = data.replica_layer.is_some();
        for (clone_id, clone) in data.animated_clones(property) {
            if skip_roots && clone_id.is_replica_root() {
                continue;
            }
            compositor.add_animation(*clone, &key, &paused);
        }
    }

    /// Transfers every running animation of `layer` from `from` to `to`.
    pub(crate) fn move_or_copy_animations(
        &mut self,
        layer: LayerId,
        transfer: AnimationTransfer,
        from: NativeLayerId,
        to: NativeLayerId,
    ) {
        let keys: Vec<String> = self
            .layer(layer)
            .running_animations
            .values()
            .flatten()
            .map(LayerPropertyAnimation::identifier)
            .collect();
        for key in keys {
            let Some(anim) = self.compositor.animation(from, &key).cloned() else {
                continue;
            };
            if transfer == AnimationTransfer::Move {
                self.compositor.remove_animation(from, &key);
            }
            self.compositor.add_animation(to, &key, &anim);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::animation::Keyframe;
    use crate::config::CommitConfig;
    use crate::layer::RecordingClient;
    use crate::native::HeadlessCompositor;
    use crate::trace::Tracer;

    type Tree = LayerTree<HeadlessCompositor, RecordingClient>;

    fn tree() -> Tree {
        LayerTree::new(
            HeadlessCompositor::new(),
            RecordingClient::new(),
            CommitConfig::modern(),
        )
    }

    fn flush(tree: &mut Tree, root: LayerId) {
        tree.flush_compositing_state(root, Rect::new(0.0, 0.0, 800.0, 600.0), &mut Tracer::none());
    }

    fn fade() -> KeyframeValueList {
        KeyframeValueList::Opacity(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)])
    }

    fn add_fade(tree: &mut Tree, layer: LayerId, name: &str) -> bool {
        tree.add_animation(
            layer,
            &fade(),
            Size::new(10.0, 10.0),
            Some(&Animation::new(1.0)),
            name,
            0.0,
        )
    }

    #[test]
    fn added_animation_runs_after_commit() {
        let mut tree = tree();
        let id = tree.create_layer();
        assert!(add_fade(&mut tree, id, "fade"));
        assert!(!tree.is_animation_running(id, "fade"), "not until committed");
        flush(&mut tree, id);
        assert!(tree.is_animation_running(id, "fade"));
        let native = tree.native_layer(id);
        let key = animation_identifier("fade", AnimatedProperty::Opacity, 0, 0);
        assert!(tree.compositor().layer(native).animation(&key).is_some());
    }

    #[test]
    fn fallback_is_reported_and_not_queued() {
        let mut tree = tree();
        let id = tree.create_layer();
        let single = KeyframeValueList::Opacity(vec![Keyframe::new(0.0, 1.0)]);
        assert_eq!(
            tree.try_add_animation(id, &single, Size::ZERO, Some(&Animation::new(1.0)), "a", 0.0),
            Err(AnimationFallback::TooFewKeyframes)
        );
        assert!(!tree.add_animation(id, &single, Size::ZERO, None, "b", 0.0));
        assert_eq!(tree.fallbacks.len(), 1);
        assert!(tree.layer(id).uncommitted_animations.is_empty());
    }

    #[test]
    fn pause_then_remove_keeps_remove() {
        let mut tree = tree();
        let id = tree.create_layer();
        add_fade(&mut tree, id, "fade");
        flush(&mut tree, id);

        tree.remove_animation(id, "fade");
        tree.pause_animation(id, "fade", 0.5);
        assert_eq!(
            tree.layer(id).animations_to_process,
            vec![("fade".into(), AnimationProcessingAction::Remove)]
        );
        flush(&mut tree, id);
        assert!(!tree.is_animation_running(id, "fade"));
        let native = tree.native_layer(id);
        assert!(tree.compositor().layer(native).animations.is_empty());
    }

    #[test]
    fn pause_freezes_native_animation() {
        let mut tree = tree();
        let id = tree.create_layer();
        add_fade(&mut tree, id, "fade");
        flush(&mut tree, id);

        tree.pause_animation(id, "fade", 0.25);
        tree.pause_animation(id, "fade", 0.5);
        flush(&mut tree, id);
        let native = tree.native_layer(id);
        let key = animation_identifier("fade", AnimatedProperty::Opacity, 0, 0);
        let anim = tree
            .compositor()
            .layer(native)
            .animation(&key)
            .expect("still attached");
        assert_eq!(anim.speed, 0.0);
        assert_eq!(anim.time_offset, 0.25, "first pending pause offset is kept");
        assert!(tree.is_animation_running(id, "fade"));
    }

    #[test]
    fn requests_for_unknown_animations_are_ignored() {
        let mut tree = tree();
        let id = tree.create_layer();
        flush(&mut tree, id);
        tree.pause_animation(id, "nope", 1.0);
        tree.remove_animation(id, "nope");
        assert!(tree.uncommitted_changes(id).is_empty());
    }

    #[test]
    fn time_offset_backdates_begin_time() {
        let mut tree = tree();
        tree.compositor_mut().set_clock(10.0, 100.0);
        let id = tree.create_layer();
        assert!(tree.add_animation(
            id,
            &fade(),
            Size::new(10.0, 10.0),
            Some(&Animation::new(4.0)),
            "fade",
            1.5,
        ));
        flush(&mut tree, id);
        let key = animation_identifier("fade", AnimatedProperty::Opacity, 0, 0);
        let native = tree.native_layer(id);
        let anim = tree
            .compositor()
            .layer(native)
            .animation(&key)
            .expect("attached");
        assert_eq!(anim.begin_time, 98.5);
    }

    #[test]
    fn suspend_and_resume() {
        let mut tree = tree();
        tree.compositor_mut().set_clock(3.0, 3.0);
        let id = tree.create_layer();
        tree.suspend_animations(id, None);
        let native = tree.native_layer(id);
        assert_eq!(tree.compositor().layer(native).speed, 0.0);
        assert_eq!(tree.compositor().layer(native).time_offset, 3.0);
        tree.resume_animations(id);
        assert_eq!(tree.compositor().layer(native).speed, 1.0);
        assert_eq!(tree.compositor().layer(native).time_offset, 0.0);
    }

    #[test]
    fn started_animations_reach_the_client() {
        use crate::layer::ClientEvent;
        use crate::native::NativeLayerClient;

        let mut tree = tree();
        tree.compositor_mut().set_clock(0.0, 7.0);
        let id = tree.create_layer();
        add_fade(&mut tree, id, "fade");
        flush(&mut tree, id);
        let started = tree.compositor_mut().start_pending_animations();
        assert_eq!(started.len(), 1);
        for s in started {
            tree.animation_started(s.layer, s.start_time);
        }
        assert!(tree.client().events.contains(&ClientEvent::AnimationStarted(id, 7.0)));
    }
}
