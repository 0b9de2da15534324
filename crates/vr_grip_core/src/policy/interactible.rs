use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use vr_grip_math::{GRIP_EULER, TransformExt, translation_only};

use crate::{GripPolicyBehavior, GripRecord, PolicyContext, ReleaseKind, TransformOverride};

/// Pose an interactible is measured from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InitialPose {
    /// Translation at rest.
    pub translation: Vec3,
    /// Yaw, pitch and roll at rest, in radians.
    pub rotation: Vec3,
}

/// Limits of an [`InteractiblePolicy`].
///
/// Translation limits are `(x, y, z)` offsets and rotation limits are
/// `(yaw, pitch, roll)` offsets in radians, both from the initial pose.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractibleSettings {
    /// Measure limits in the attach parent's space instead of world space.
    pub limits_in_local_space: bool,
    /// Clamp X translation.
    pub limit_x: bool,
    /// Clamp Y translation.
    pub limit_y: bool,
    /// Clamp Z translation.
    pub limit_z: bool,
    /// Clamp yaw.
    pub limit_yaw: bool,
    /// Clamp pitch.
    pub limit_pitch: bool,
    /// Clamp roll.
    pub limit_roll: bool,
    /// Follow the hand's position but keep the rotation it had at grip time.
    pub ignore_hand_rotation: bool,
    /// Rest pose. `None` records the pose at grip time.
    pub initial: Option<InitialPose>,
    /// Lowest translation offset.
    pub min_linear: Vec3,
    /// Highest translation offset.
    pub max_linear: Vec3,
    /// Lowest rotation offset.
    pub min_angular: Vec3,
    /// Highest rotation offset.
    pub max_angular: Vec3,
}

impl InteractibleSettings {
    /// Local space limits with every axis free.
    pub const DEFAULT: Self = Self {
        limits_in_local_space: true,
        limit_x: false,
        limit_y: false,
        limit_z: false,
        limit_yaw: false,
        limit_pitch: false,
        limit_roll: false,
        ignore_hand_rotation: false,
        initial: None,
        min_linear: Vec3::ZERO,
        max_linear: Vec3::ZERO,
        min_angular: Vec3::ZERO,
        max_angular: Vec3::ZERO,
    };
}

impl Default for InteractibleSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Constrains a held object to a range of positions and rotations, for
/// drawers, levers and dials.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractiblePolicy {
    /// Limits.
    pub settings: InteractibleSettings,
    /// Disabled policies leave the pose alone.
    pub active: bool,
    recorded: Option<InitialPose>,
    base_transform: Option<Transform>,
}

impl InteractiblePolicy {
    /// An active policy with the given limits.
    pub const fn new(settings: InteractibleSettings) -> Self {
        Self {
            settings,
            active: true,
            recorded: None,
            base_transform: None,
        }
    }

    /// The rest pose in use: the configured one, or the one recorded at grip
    /// time.
    pub fn initial_pose(&self) -> Option<InitialPose> {
        self.settings.initial.or(self.recorded)
    }

    fn limit_space(&self, cx: &PolicyContext<'_>) -> Option<Transform> {
        self.settings
            .limits_in_local_space
            .then(|| cx.target.parent_transform.unwrap_or(Transform::IDENTITY))
    }

    fn to_limit_space(&self, cx: &PolicyContext<'_>, world: &Transform) -> Transform {
        match self.limit_space(cx) {
            Some(space) => world.relative_to(&space),
            None => *world,
        }
    }

    fn clamp(&self, initial: &InitialPose, pose: &mut Transform) {
        let s = &self.settings;

        let lo = initial.translation + s.min_linear;
        let hi = initial.translation + s.max_linear;
        let t = &mut pose.translation;
        if s.limit_x {
            t.x = t.x.max(lo.x).min(hi.x);
        }
        if s.limit_y {
            t.y = t.y.max(lo.y).min(hi.y);
        }
        if s.limit_z {
            t.z = t.z.max(lo.z).min(hi.z);
        }

        if s.limit_yaw || s.limit_pitch || s.limit_roll {
            let lo = initial.rotation + s.min_angular;
            let hi = initial.rotation + s.max_angular;
            let (mut yaw, mut pitch, mut roll) = pose.rotation.to_euler(GRIP_EULER);
            if s.limit_yaw {
                yaw = yaw.max(lo.x).min(hi.x);
            }
            if s.limit_pitch {
                pitch = pitch.max(lo.y).min(hi.y);
            }
            if s.limit_roll {
                roll = roll.max(lo.z).min(hi.z);
            }
            pose.rotation = Quat::from_euler(GRIP_EULER, yaw, pitch, roll);
        }
    }
}

impl Default for InteractiblePolicy {
    fn default() -> Self {
        Self::new(InteractibleSettings::DEFAULT)
    }
}

impl GripPolicyBehavior for InteractiblePolicy {
    fn name(&self) -> &str {
        "interactible_settings"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn transform_override(&self) -> TransformOverride {
        TransformOverride::Overrides
    }

    fn on_grip(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {
        if self.settings.ignore_hand_rotation && self.base_transform.is_none() {
            // Bake the hand's current rotation into the offset so later hand
            // rotation no longer reaches the object.
            let hand_rotation = Transform::from_rotation(cx.pivot.rotation);
            self.base_transform = Some(grip.relative_transform.then(&hand_rotation));
        }
        if self.settings.initial.is_none() && self.recorded.is_none() {
            let pose = self.to_limit_space(cx, &cx.target.transform);
            let (yaw, pitch, roll) = pose.rotation.to_euler(GRIP_EULER);
            self.recorded = Some(InitialPose {
                translation: pose.translation,
                rotation: Vec3::new(yaw, pitch, roll),
            });
        }
    }

    fn on_grip_release(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord, _kind: ReleaseKind) {
        if cx.target.holders.is_empty() {
            self.base_transform = None;
            self.recorded = None;
        }
    }

    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        *world = match (self.settings.ignore_hand_rotation, self.base_transform) {
            (true, Some(base)) => base
                .then(&grip.addition_transform)
                .then(&translation_only(cx.pivot.translation)),
            _ => grip.base_world_transform(&cx.pivot),
        };

        let Some(initial) = self.initial_pose() else {
            return true;
        };

        let mut pose = self.to_limit_space(cx, world);
        self.clamp(&initial, &mut pose);
        *world = match self.limit_space(cx) {
            Some(space) => pose.then(&space),
            None => pose,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, record_with};
    use crate::{ControllerId, GripCollisionType};
    use approx::assert_relative_eq;
    use core::f32::consts::FRAC_PI_2;

    fn drawer() -> InteractiblePolicy {
        InteractiblePolicy::new(InteractibleSettings {
            limits_in_local_space: false,
            limit_x: true,
            limit_y: true,
            limit_z: true,
            initial: Some(InitialPose::default()),
            min_linear: Vec3::new(0.0, 0.0, -0.5),
            max_linear: Vec3::ZERO,
            ..InteractibleSettings::DEFAULT
        })
    }

    #[test]
    fn drawer_slides_only_along_its_track() {
        let mut policy = drawer();
        let grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::from_xyz(0.3, 0.2, -2.0),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut grip = grip;
        let mut world = Transform::IDENTITY;
        assert!(policy.world_transform(&mut cx, &mut world, &mut grip));
        assert!(world.translation.abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));
    }

    #[test]
    fn yaw_is_clamped_in_parent_space() {
        let mut policy = InteractiblePolicy::new(InteractibleSettings {
            limit_yaw: true,
            initial: Some(InitialPose::default()),
            max_angular: Vec3::new(0.5, 0.0, 0.0),
            ..InteractibleSettings::DEFAULT
        });
        let mut grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (mut snapshot, settings, mut events) = context_parts();
        snapshot.parent_transform = Some(Transform::from_xyz(10.0, 0.0, 0.0));
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::from_xyz(10.0, 0.0, 0.0)
                .with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut world = Transform::IDENTITY;
        policy.world_transform(&mut cx, &mut world, &mut grip);
        let (yaw, _, _) = world.rotation.to_euler(GRIP_EULER);
        assert_relative_eq!(yaw, 0.5, epsilon = 1e-4);
        assert!(world.translation.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn ignoring_hand_rotation_keeps_grip_time_rotation() {
        let mut policy = InteractiblePolicy::new(InteractibleSettings {
            ignore_hand_rotation: true,
            ..InteractibleSettings::DEFAULT
        });
        let mut grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (snapshot, settings, mut events) = context_parts();
        let grip_time = Quat::from_rotation_x(0.3);
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::from_rotation(grip_time),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.on_grip(&mut cx, &grip);
        cx.pivot = Transform::from_xyz(1.0, 0.0, 0.0).with_rotation(Quat::from_rotation_z(1.0));
        let mut world = Transform::IDENTITY;
        policy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(vr_grip_math::rotations_equal(world.rotation, grip_time, 1e-4));
        assert!(world.translation.abs_diff_eq(Vec3::X, 1e-5));

        policy.on_grip_release(&mut cx, &grip, ReleaseKind::Released);
        assert!(policy.base_transform.is_none());
    }
}
