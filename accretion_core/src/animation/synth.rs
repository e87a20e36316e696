// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyframe lists to native animations.

use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use kurbo::Size;

use super::{
    ALMOST_ZERO_DURATION, AnimatedProperty, Animation, AnimationFallback, FillMode,
    FilterOperationKind, FilterOperations, IterationCount, Keyframe, KeyframeValueList,
    LayerPropertyAnimation, PlatformAnimation, PlatformFillMode, PlatformValue, TimingFunction,
    TransformOperations, filters_can_be_composited,
};
use crate::config::PlatformAnimationQuirks;

/// Translates `values` into native animations.
///
/// On success every returned animation is ready to be queued; on failure
/// nothing is, and the reason tells the host why it must animate in software.
pub fn synthesize(
    values: &KeyframeValueList,
    box_size: Size,
    animation: Option<&Animation>,
    name: &str,
    time_offset: f64,
    quirks: &PlatformAnimationQuirks,
) -> Result<Vec<LayerPropertyAnimation>, AnimationFallback> {
    let animation = animation.ok_or(AnimationFallback::MissingTiming)?;
    if animation.is_empty_or_zero_duration() {
        return Err(AnimationFallback::ZeroDuration);
    }
    if values.len() < 2 {
        return Err(AnimationFallback::TooFewKeyframes);
    }
    if has_steps_timing_function(values, animation) {
        return Err(AnimationFallback::SteppedTiming);
    }
    if !animation.direction.is_forwards() && !quirks.supports_reverse_direction {
        return Err(AnimationFallback::UnsupportedDirection);
    }

    let builder = Builder {
        values,
        animation,
        name,
        time_offset,
    };
    match values {
        KeyframeValueList::Transform(frames) => builder.transform(frames, box_size, quirks),
        KeyframeValueList::Filter(frames) => {
            if !quirks.supports_accelerated_filter_animations {
                return Err(AnimationFallback::FiltersUnsupported);
            }
            builder.filter(frames)
        }
        KeyframeValueList::Opacity(frames) => {
            let anim = builder.emit(AnimatedProperty::Opacity.key_path(), false, |i| {
                Ok(PlatformValue::Number(f64::from(frames[i].value)))
            })?;
            Ok(alloc::vec![builder.wrap(anim, 0, 0)])
        }
        KeyframeValueList::BackgroundColor(frames) => {
            let anim = builder.emit(AnimatedProperty::BackgroundColor.key_path(), false, |i| {
                Ok(PlatformValue::Color(frames[i].value))
            })?;
            Ok(alloc::vec![builder.wrap(anim, 0, 0)])
        }
    }
}

fn has_steps_timing_function(values: &KeyframeValueList, animation: &Animation) -> bool {
    animation.timing_function.is_some_and(|t| t.is_steps())
        || (0..values.len()).any(|i| values.timing_function_at(i).is_some_and(|t| t.is_steps()))
}

/// Index of the reference list (the first non-empty one) and whether any
/// rotation moves by half a turn or more between keyframes.
///
/// Returns `None` when every list is empty or two non-empty lists differ in
/// shape; such keyframes can only be animated as whole matrices.
fn validate_transform_operations(
    frames: &[Keyframe<TransformOperations>],
) -> (Option<usize>, bool) {
    if frames.len() < 2 {
        return (None, false);
    }
    let Some(first) = frames.iter().position(|f| !f.value.is_empty()) else {
        return (None, false);
    };
    let reference = &frames[first].value;
    let rest = &frames[first + 1..];
    if rest
        .iter()
        .any(|f| !f.value.is_empty() && !reference.operations_match(&f.value))
    {
        return (None, false);
    }

    let mut max_rotation = -1.0_f64;
    for (j, op) in reference.0.iter().enumerate() {
        let Some(mut last) = op.angle() else {
            continue;
        };
        if max_rotation < 0.0 {
            max_rotation = last.abs();
        }
        for f in rest {
            let angle = f.value.get(j).and_then(|op| op.angle()).unwrap_or(0.0);
            max_rotation = max_rotation.max((angle - last).abs());
            last = angle;
        }
    }
    (Some(first), max_rotation >= 180.0)
}

/// Index of the reference filter chain, or `None` if the chains disagree.
fn validate_filter_operations(frames: &[Keyframe<FilterOperations>]) -> Option<usize> {
    if frames.len() < 2 {
        return None;
    }
    let first = frames.iter().position(|f| !f.value.is_empty())?;
    let reference = &frames[first].value;
    frames[first + 1..]
        .iter()
        .all(|f| f.value.is_empty() || reference.operations_match(&f.value))
        .then_some(first)
}

struct Builder<'a> {
    values: &'a KeyframeValueList,
    animation: &'a Animation,
    name: &'a str,
    time_offset: f64,
}

impl Builder<'_> {
    fn transform(
        &self,
        frames: &[Keyframe<TransformOperations>],
        box_size: Size,
        quirks: &PlatformAnimationQuirks,
    ) -> Result<Vec<LayerPropertyAnimation>, AnimationFallback> {
        let (list_index, big_rotation) = validate_transform_operations(frames);
        let operations = list_index.map(|i| &frames[i].value);
        if (big_rotation || operations.is_some_and(|ops| ops.len() > 1))
            && !quirks.supports_value_function
        {
            return Err(AnimationFallback::NeedsValueFunction);
        }

        let components = match operations {
            Some(ops) if quirks.supports_value_function => Some(ops),
            _ => None,
        };
        let count = components.map_or(1, TransformOperations::len);
        let mut order: Vec<usize> = (0..count).collect();
        if quirks.reverses_multi_animation_order {
            order.reverse();
        }

        let key_path = AnimatedProperty::Transform.key_path();
        let mut out = Vec::with_capacity(count);
        for index in order {
            let additive = index > 0;
            let anim = match components.and_then(|ops| ops.get(index)) {
                None => self.emit(key_path, additive, |i| {
                    let m = frames[i].value.apply(box_size);
                    if m.is_invertible() {
                        Ok(PlatformValue::Matrix(m))
                    } else {
                        Err(AnimationFallback::SingularMatrix)
                    }
                })?,
                Some(op) => {
                    let kind = op.kind();
                    let mut anim = self.emit(key_path, additive, |i| {
                        Ok(kind.component_value(frames[i].value.get(index), box_size))
                    })?;
                    anim.value_function = kind.value_function();
                    anim
                }
            };
            out.push(self.wrap(anim, index, 0));
        }
        Ok(out)
    }

    fn filter(
        &self,
        frames: &[Keyframe<FilterOperations>],
    ) -> Result<Vec<LayerPropertyAnimation>, AnimationFallback> {
        let first =
            validate_filter_operations(frames).ok_or(AnimationFallback::MismatchedOperations)?;
        let operations = &frames[first].value;
        if !filters_can_be_composited(operations) {
            return Err(AnimationFallback::FilterNotComposited);
        }
        if operations
            .0
            .iter()
            .any(|op| op.kind() == FilterOperationKind::DropShadow)
        {
            return Err(AnimationFallback::DropShadow);
        }

        let mut out = Vec::new();
        for (index, op) in operations.0.iter().enumerate() {
            let kind = op.kind();
            for sub in 0..kind.animated_property_count() {
                let key_path = format!(
                    "filters.filter_{index}.{}",
                    kind.animated_property_name(sub)
                );
                let anim = self.emit(&key_path, false, |i| {
                    Ok(kind.animated_property_value(frames[i].value.get(index), sub))
                })?;
                out.push(self.wrap(anim, index, sub));
            }
        }
        Ok(out)
    }

    fn timing_function_for(&self, index: usize) -> TimingFunction {
        self.values
            .timing_function_at(index)
            .or(self.animation.timing_function)
            .unwrap_or(TimingFunction::EASE)
    }

    /// Builds a basic animation for two keyframes, a keyframe animation
    /// otherwise. Reverse playback swaps endpoints or mirrors key times.
    fn emit(
        &self,
        key_path: &str,
        additive: bool,
        mut value_at: impl FnMut(usize) -> Result<PlatformValue, AnimationFallback>,
    ) -> Result<PlatformAnimation, AnimationFallback> {
        let n = self.values.len();
        let forwards = self.animation.direction.is_forwards();

        let mut anim = if n > 2 {
            let mut anim = PlatformAnimation::keyframe(key_path);
            for i in 0..n {
                let index = if forwards { i } else { n - i - 1 };
                let t = self.values.key_time_at(index);
                anim.key_times.push(if forwards { t } else { 1.0 - t });
                anim.values.push(value_at(index)?);
                if i < n - 1 {
                    // The easing of a segment lives on the keyframe that starts it.
                    let from = if forwards { index } else { index - 1 };
                    anim.timing_functions.push(self.timing_function_for(from));
                }
            }
            anim
        } else {
            let mut anim = PlatformAnimation::basic(key_path);
            anim.from = Some(value_at(usize::from(!forwards))?);
            anim.to = Some(value_at(usize::from(forwards))?);
            anim.timing_function = Some(self.timing_function_for(0));
            anim
        };
        anim.reverse_timing_functions = !forwards;
        self.setup(&mut anim, additive);
        Ok(anim)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "native repeat counts are single precision"
    )]
    fn setup(&self, anim: &mut PlatformAnimation, additive: bool) {
        let a = self.animation;
        anim.duration = if a.duration <= 0.0 {
            ALMOST_ZERO_DURATION
        } else {
            a.duration
        };
        anim.repeat_count = match a.iteration_count {
            IterationCount::Infinite => f32::MAX,
            IterationCount::Finite(n) if a.direction.alternates() => (n / 2.0) as f32,
            IterationCount::Finite(n) => n as f32,
        };
        anim.autoreverses = a.direction.alternates();
        anim.removed_on_completion = false;
        anim.additive = additive;
        anim.fill_mode = match a.fill_mode {
            FillMode::None | FillMode::Forwards => PlatformFillMode::Forwards,
            FillMode::Backwards | FillMode::Both => PlatformFillMode::Both,
        };
    }

    fn wrap(&self, animation: PlatformAnimation, index: usize, sub_index: usize) -> LayerPropertyAnimation {
        LayerPropertyAnimation {
            animation,
            name: self.name.to_string(),
            property: self.values.property(),
            index,
            sub_index,
            time_offset: self.time_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{
        AnimationDirection, FilterOperation, Length, PlatformAnimationKind, TransformOperation,
        ValueFunction,
    };
    use crate::config::CommitConfig;
    use alloc::vec;

    const BOX: Size = Size::new(100.0, 50.0);

    fn quirks() -> PlatformAnimationQuirks {
        CommitConfig::modern().quirks
    }

    fn opacity(values: &[f32]) -> KeyframeValueList {
        let last = (values.len() - 1) as f64;
        KeyframeValueList::Opacity(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Keyframe::new(i as f64 / last, *v))
                .collect(),
        )
    }

    fn transforms(lists: Vec<Vec<TransformOperation>>) -> KeyframeValueList {
        let last = (lists.len() - 1) as f64;
        KeyframeValueList::Transform(
            lists
                .into_iter()
                .enumerate()
                .map(|(i, ops)| Keyframe::new(i as f64 / last, TransformOperations::new(ops)))
                .collect(),
        )
    }

    fn run(values: &KeyframeValueList, anim: &Animation) -> Result<Vec<LayerPropertyAnimation>, AnimationFallback> {
        synthesize(values, BOX, Some(anim), "a", 0.0, &quirks())
    }

    #[test]
    fn opacity_endpoints_follow_direction() {
        let values = opacity(&[0.2, 0.8]);
        let from = PlatformValue::Number(f64::from(0.2_f32));
        let to = PlatformValue::Number(f64::from(0.8_f32));

        let out = run(&values, &Animation::new(1.0)).expect("opacity animates natively");
        assert_eq!(out.len(), 1);
        let a = &out[0].animation;
        assert_eq!(a.key_path, "opacity");
        assert_eq!((a.from, a.to), (Some(from), Some(to)));
        assert!(!a.reverse_timing_functions);

        let mut reverse = Animation::new(1.0);
        reverse.direction = AnimationDirection::Reverse;
        let out = run(&values, &reverse).expect("reverse is supported");
        let a = &out[0].animation;
        assert_eq!((a.from, a.to), (Some(to), Some(from)));
        assert!(a.reverse_timing_functions, "reversal must be signalled");
    }

    #[test]
    fn keyframes_reverse_mirrors_key_times() {
        let mut values = opacity(&[0.0, 0.5, 1.0]);
        if let KeyframeValueList::Opacity(frames) = &mut values {
            frames[1].key_time = 0.25;
            frames[0].timing_function = Some(TimingFunction::Linear);
        }
        let mut anim = Animation::new(2.0);
        anim.direction = AnimationDirection::AlternateReverse;
        let out = run(&values, &anim).expect("keyframe opacity animates");
        let a = &out[0].animation;
        assert_eq!(a.kind, PlatformAnimationKind::Keyframe);
        assert_eq!(a.key_times, vec![0.0, 0.75, 1.0]);
        assert_eq!(a.values[0], PlatformValue::Number(1.0));
        assert_eq!(a.timing_functions.len(), 2);
        // Reversed: segment 0 runs 1.0 -> 0.5, eased by keyframe 1; segment 1 by keyframe 0.
        assert_eq!(a.timing_functions[0], TimingFunction::EASE);
        assert_eq!(a.timing_functions[1], TimingFunction::Linear);
        assert!(a.autoreverses);
    }

    #[test]
    fn early_rejections() {
        let values = opacity(&[0.0, 1.0]);
        let q = quirks();
        assert_eq!(
            synthesize(&values, BOX, None, "a", 0.0, &q),
            Err(AnimationFallback::MissingTiming)
        );
        assert_eq!(
            run(&values, &Animation::new(0.0)),
            Err(AnimationFallback::ZeroDuration)
        );
        assert_eq!(
            run(&opacity(&[1.0]), &Animation::new(1.0)),
            Err(AnimationFallback::TooFewKeyframes)
        );
        let mut stepped = Animation::new(1.0);
        stepped.timing_function = Some(TimingFunction::Steps {
            count: 4,
            at_start: false,
        });
        assert_eq!(run(&values, &stepped), Err(AnimationFallback::SteppedTiming));
    }

    #[test]
    fn singular_matrix_falls_back() {
        let values = transforms(vec![
            vec![TransformOperation::Scale(1.0, 1.0), TransformOperation::SkewX(10.0)],
            vec![TransformOperation::Rotate(10.0)],
        ]);
        assert_eq!(
            run(
                &transforms(vec![
                    vec![TransformOperation::Scale(1.0, 1.0)],
                    vec![TransformOperation::Scale(0.0, 0.0)],
                ]),
                &Animation::new(1.0)
            )
            .map(|v| v.len()),
            Ok(1),
            "component animations do not need invertible matrices"
        );
        let singular = transforms(vec![
            vec![TransformOperation::Translate(Length::Px(1.0), Length::Px(0.0))],
            vec![TransformOperation::Matrix(crate::transform::Transform3d::from_scale(
                0.0, 0.0, 1.0,
            ))],
        ]);
        assert_eq!(
            run(&singular, &Animation::new(1.0)),
            Err(AnimationFallback::SingularMatrix)
        );
        // Mismatched but invertible lists become one matrix animation.
        let out = run(&values, &Animation::new(1.0)).expect("matrix animation");
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].animation.from, Some(PlatformValue::Matrix(_))));
        assert_eq!(out[0].animation.value_function, None);
    }

    #[test]
    fn components_follow_platform_order() {
        let values = transforms(vec![
            vec![
                TransformOperation::Translate(Length::Px(0.0), Length::Px(0.0)),
                TransformOperation::Rotate(0.0),
            ],
            vec![
                TransformOperation::Translate(Length::Percent(10.0), Length::Px(5.0)),
                TransformOperation::Rotate(90.0),
            ],
        ]);
        let anim = Animation::new(1.0);

        let out = run(&values, &anim).expect("component animations");
        let order: Vec<_> = out.iter().map(|a| (a.index, a.animation.additive)).collect();
        assert_eq!(order, vec![(0, false), (1, true)]);
        assert_eq!(out[0].animation.value_function, Some(ValueFunction::Translate));
        assert_eq!(out[1].animation.value_function, Some(ValueFunction::RotateZ));
        assert_eq!(out[0].identifier(), "a_1_0_0");

        let legacy = CommitConfig::legacy_mac().quirks;
        let out = synthesize(&values, BOX, Some(&anim), "a", 0.0, &legacy).expect("reversed");
        let order: Vec<_> = out.iter().map(|a| a.index).collect();
        assert_eq!(order, vec![1, 0]);

        let windows = CommitConfig::windows().quirks;
        assert_eq!(
            synthesize(&values, BOX, Some(&anim), "a", 0.0, &windows),
            Err(AnimationFallback::NeedsValueFunction)
        );
    }

    #[test]
    fn big_rotation_needs_value_function() {
        let values = transforms(vec![
            vec![TransformOperation::Rotate(0.0)],
            vec![TransformOperation::Rotate(270.0)],
        ]);
        let mut windows = CommitConfig::windows().quirks;
        windows.supports_reverse_direction = true;
        assert_eq!(
            synthesize(&values, BOX, Some(&Animation::new(1.0)), "a", 0.0, &windows),
            Err(AnimationFallback::NeedsValueFunction)
        );
        let small = transforms(vec![
            vec![TransformOperation::Rotate(0.0)],
            vec![TransformOperation::Rotate(90.0)],
        ]);
        let out = synthesize(&small, BOX, Some(&Animation::new(1.0)), "a", 0.0, &windows)
            .expect("one small rotation animates as a matrix");
        assert!(matches!(out[0].animation.to, Some(PlatformValue::Matrix(_))));
    }

    #[test]
    fn filters_expand_to_sub_properties() {
        let values = KeyframeValueList::Filter(vec![
            Keyframe::new(0.0, FilterOperations::default()),
            Keyframe::new(
                1.0,
                FilterOperations::new(vec![
                    FilterOperation::Blur(4.0),
                    FilterOperation::Invert(1.0),
                ]),
            ),
        ]);
        let out = run(&values, &Animation::new(1.0)).expect("filters animate");
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].animation.key_path, "filters.filter_0.inputRadius");
        assert_eq!(out[0].animation.from, Some(PlatformValue::Number(0.0)));
        assert_eq!(out[4].animation.key_path, "filters.filter_1.inputBiasVector");
        assert_eq!(out[4].sub_index, 3);
        assert_eq!(out[4].identifier(), "a_4_1_3");

        assert_eq!(
            synthesize(
                &values,
                BOX,
                Some(&Animation::new(1.0)),
                "a",
                0.0,
                &CommitConfig::windows().quirks
            ),
            Err(AnimationFallback::FiltersUnsupported)
        );
    }

    #[test]
    fn drop_shadow_never_animates() {
        let shadow = FilterOperation::DropShadow {
            offset: kurbo::Vec2::new(1.0, 1.0),
            std_deviation: 2.0,
            color: crate::geometry::Color::rgb(0, 0, 0),
        };
        let values = KeyframeValueList::Filter(vec![
            Keyframe::new(0.0, FilterOperations::new(vec![shadow.clone()])),
            Keyframe::new(1.0, FilterOperations::new(vec![shadow])),
        ]);
        assert_eq!(
            run(&values, &Animation::new(1.0)),
            Err(AnimationFallback::DropShadow)
        );
    }

    #[test]
    fn setup_parameters() {
        let values = opacity(&[0.0, 1.0]);
        let mut anim = Animation::new(0.0);
        anim.delay = 1.0;
        anim.iteration_count = IterationCount::Finite(4.0);
        anim.direction = AnimationDirection::Alternate;
        anim.fill_mode = FillMode::Backwards;
        let out = run(&values, &anim).expect("delayed zero-length animation runs");
        let a = &out[0].animation;
        assert_eq!(a.duration, ALMOST_ZERO_DURATION);
        assert_eq!(a.repeat_count, 2.0);
        assert!(a.autoreverses);
        assert!(!a.removed_on_completion);
        assert_eq!(a.fill_mode, PlatformFillMode::Both);

        anim.iteration_count = IterationCount::Infinite;
        let out = run(&values, &anim).expect("infinite animation runs");
        assert_eq!(out[0].animation.repeat_count, f32::MAX);
    }
}
