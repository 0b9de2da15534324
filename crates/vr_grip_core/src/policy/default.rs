use bevy_math::Vec3;
use bevy_transform::components::Transform;
use vr_grip_math::{OneEuroConfig, TransformExt, find_between, rotate_about_pivot};

use crate::{GripPolicyBehavior, GripRecord, LerpState, PolicyContext, TransformOverride};

/// The built-in resolution: the relative pose, aimed and scaled by a second
/// hand when one is attached.
///
/// The manager runs this itself whenever no active policy overrides the
/// transform, so targets only list it to pin its position in the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultPolicy;

impl GripPolicyBehavior for DefaultPolicy {
    fn name(&self) -> &str {
        "default"
    }

    fn transform_override(&self) -> TransformOverride {
        TransformOverride::Overrides
    }

    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        *world = grip.base_world_transform(&cx.pivot);
        let secondary_transform = grip.relative_transform.then(&cx.pivot);
        let smoothing = grip.advanced.secondary.smoothing;
        apply_secondary(
            cx,
            grip,
            world,
            cx.pivot.translation,
            &secondary_transform,
            smoothing,
        );
        true
    }
}

/// Where the second hand is this tick, and where it was on the object.
///
/// Both vectors are relative to the point the object is aimed from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecondaryFrame {
    /// The second hand now.
    pub front: Vec3,
    /// The second hand's attach point on the object, blended toward `front`
    /// while a blend is in flight.
    pub front_orig: Vec3,
    /// Blend state and factor for this tick.
    pub lerp: Option<(LerpState, f32)>,
}

/// Measures the second hand, blended by the grip's current secondary factor.
///
/// `secondary_transform` is the pose the attach point is expressed against and
/// `base_point` the world point the object is aimed from. Returns `None` when
/// no second hand shapes the pose.
pub fn secondary_frame(
    cx: &PolicyContext<'_>,
    grip: &mut GripRecord,
    base_point: Vec3,
    secondary_transform: &Transform,
    smoothing: Option<OneEuroConfig>,
) -> Option<SecondaryFrame> {
    if !grip.secondary.influences_pose() {
        return None;
    }

    let state = grip.secondary.lerp_state;
    let factor = grip.secondary.lerp_factor();

    let orig = secondary_transform.transform_point(grip.secondary.relative_transform.translation)
        - base_point;

    let front = match cx.target.secondary_location {
        Some(location) if state != LerpState::EndLerp && grip.secondary.has_attachment() => {
            let front = grip
                .secondary
                .smooth(smoothing, location - base_point, cx.delta_time);
            grip.secondary.last_relative_location = front;
            front
        }
        _ => grip.secondary.last_relative_location,
    };

    let lerp = factor.map(|factor| (state, factor));
    let front_orig = match lerp {
        Some((LerpState::StartLerp, factor)) => front.lerp(orig, factor),
        Some((LerpState::EndLerp, factor)) => front.lerp(orig, 1.0 - factor),
        _ => orig,
    };

    Some(SecondaryFrame {
        front,
        front_orig,
        lerp,
    })
}

/// Applies the second hand's aim and scale to `world` about `pivot_point`.
///
/// Returns true if a second hand shaped the pose.
pub fn apply_secondary(
    cx: &PolicyContext<'_>,
    grip: &mut GripRecord,
    world: &mut Transform,
    pivot_point: Vec3,
    secondary_transform: &Transform,
    smoothing: Option<OneEuroConfig>,
) -> bool {
    let secondary_type = cx.target.secondary_grip_type;
    let Some(frame) = secondary_frame(cx, grip, pivot_point, secondary_transform, smoothing) else {
        return false;
    };
    if !secondary_type.rotates() && !secondary_type.scales() {
        return false;
    }

    let mut scaler = Vec3::ONE;
    let ending = matches!(frame.lerp, Some((LerpState::EndLerp, _)));
    if secondary_type.scales() && !ending {
        scaler = secondary_scale(&frame, world.scale, grip);
    }

    grip.secondary
        .set_distance(frame.front_orig.distance(frame.front));

    let rotation = if secondary_type.rotates() {
        find_between(frame.front_orig, frame.front)
    } else {
        bevy_math::Quat::IDENTITY
    };

    *world = rotate_about_pivot(
        world,
        pivot_point,
        &Transform {
            translation: Vec3::ZERO,
            rotation,
            scale: scaler,
        },
    );
    true
}

/// Scale factor from how far the hands moved apart, clamped to the grip's
/// scale limits.
pub fn secondary_scale(frame: &SecondaryFrame, current_scale: Vec3, grip: &GripRecord) -> Vec3 {
    let orig = frame.front_orig.length();
    let scaler = if orig <= f32::EPSILON {
        1.0
    } else {
        frame.front.length() / orig
    };
    let mut scaler = Vec3::splat(scaler);

    if let Some(limits) = grip.advanced.secondary.scale_limits {
        let clamped = (current_scale * scaler).max(limits.min).min(limits.max);
        scaler = Vec3::select(
            current_scale.abs().cmpgt(Vec3::splat(vr_grip_math::SMALL_SCALE)),
            clamped / current_scale,
            scaler,
        );
    }
    scaler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, record_with};
    use crate::{ComponentId, ControllerId, GripCollisionType, ScaleLimits, SecondaryGripType};
    use approx::assert_relative_eq;
    use bevy_math::Quat;
    use core::f32::consts::FRAC_PI_2;

    fn two_handed(location: Vec3, secondary_type: SecondaryGripType) -> (GripRecord, crate::TargetSnapshot) {
        let mut grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        grip.secondary.attachment = Some(ComponentId(7));
        grip.secondary.relative_transform = Transform::from_xyz(1.0, 0.0, 0.0);
        let (mut snapshot, _, _) = context_parts();
        snapshot.secondary_grip_type = secondary_type;
        snapshot.secondary_location = Some(location);
        (grip, snapshot)
    }

    #[test]
    fn second_hand_aims_the_object() {
        let (mut grip, snapshot) = two_handed(Vec3::new(0.0, 1.0, 0.0), SecondaryGripType::Free);
        let (_, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut world = Transform::IDENTITY;
        assert!(DefaultPolicy.world_transform(&mut cx, &mut world, &mut grip));
        let expected = Quat::from_rotation_z(FRAC_PI_2);
        assert!(vr_grip_math::rotations_equal(world.rotation, expected, 1e-4));
        assert_relative_eq!(grip.secondary.distance(), 2.0_f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn scaling_respects_limits() {
        let (mut grip, snapshot) =
            two_handed(Vec3::new(4.0, 0.0, 0.0), SecondaryGripType::FreeWithScalingRetain);
        grip.advanced.secondary.scale_limits = Some(ScaleLimits {
            min: Vec3::splat(0.5),
            max: Vec3::splat(3.0),
        });
        let (_, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut world = Transform::IDENTITY;
        DefaultPolicy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(world.scale.abs_diff_eq(Vec3::splat(3.0), 1e-4));
    }

    #[test]
    fn start_blend_begins_at_one_hand_pose() {
        let (mut grip, snapshot) = two_handed(Vec3::new(0.0, 1.0, 0.0), SecondaryGripType::Free);
        grip.secondary.begin_lerp(LerpState::StartLerp, 1.0);
        let (_, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.5,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut world = Transform::IDENTITY;
        DefaultPolicy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(vr_grip_math::rotations_equal(world.rotation, Quat::IDENTITY, 1e-4));
        // Only the manager moves the blend clock.
        assert_eq!(grip.secondary.lerp_state, LerpState::StartLerp);
        assert_eq!(grip.secondary.lerp_factor(), Some(0.0));
    }

    #[test]
    fn without_second_hand_the_base_pose_is_used() {
        let mut grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        grip.relative_transform = Transform::from_xyz(0.0, 0.0, -1.0);
        let (snapshot, settings, mut events) = context_parts();
        let pivot = Transform::from_xyz(5.0, 0.0, 0.0);
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut world = Transform::IDENTITY;
        DefaultPolicy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(world.translation.abs_diff_eq(Vec3::new(5.0, 0.0, -1.0), 1e-5));
    }
}
