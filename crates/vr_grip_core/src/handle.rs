//! Physics joints backing grips.

use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use vr_grip_math::TransformExt;

use crate::{
    BodyId, ComPlacement, DriveProfileTag, GripCollisionType, GripId, HandleDrive, JointHandles,
};

/// Joint parameters a policy may adjust before the joint is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandleSettings {
    /// Drives applied to the joint.
    pub drive: HandleDrive,
    /// Which profile `drive` came from.
    pub profile: DriveProfileTag,
    /// Rotation of the root bone for skeletal targets, identity otherwise.
    pub root_bone_rotation: Transform,
    /// Anchor offset from the target, local to the target.
    pub com_offset: Transform,
    /// True if the body's center of mass was overridden.
    pub set_com: bool,
    /// Leave the overridden center of mass in place when the joint goes away.
    pub skip_resetting_com: bool,
    /// Local center of mass a policy asked for, applied after the joint settings
    /// are final.
    pub com_override: Option<Vec3>,
}

impl HandleSettings {
    /// Identity anchor with the given drive.
    pub const fn new(drive: HandleDrive) -> Self {
        Self {
            drive,
            profile: DriveProfileTag::GripDefault,
            root_bone_rotation: Transform::IDENTITY,
            com_offset: Transform::IDENTITY,
            set_com: false,
            skip_resetting_com: false,
            com_override: None,
        }
    }

    /// World pose the anchor should take for the resolved grip pose `world`.
    pub fn anchor_target(&self, world: &Transform) -> Transform {
        let mut target = self
            .com_offset
            .then(&self.root_bone_rotation)
            .then(world);
        target.scale = Vec3::ONE;
        target
    }
}

/// One physics joint backing one grip. Never outlives its [`GripRecord`](crate::GripRecord).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsHandleRecord {
    /// The grip this joint backs.
    pub grip: GripId,
    /// The gripped body.
    pub body: BodyId,
    /// Engine handles.
    pub joints: JointHandles,
    /// Parameters the joint was built with.
    pub settings: HandleSettings,
    /// Collision mode the joint was built for.
    pub collision_type: GripCollisionType,
    /// Policy revision the joint was built against.
    pub policy_revision: u32,
}

/// Where to put the anchor and center of mass when a joint is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorPlan {
    /// World pose of the kinematic anchor.
    pub anchor_pose: Transform,
    /// Anchor offset from the target, local to the target.
    pub com_offset: Transform,
    /// New local center of mass, when the placement moves it.
    pub new_com: Option<Transform>,
}

impl AnchorPlan {
    /// Computes the anchor for a grip with `relative` transform on a target at
    /// `target_pose` whose current local center of mass is `local_com`.
    pub fn compute(
        placement: ComPlacement,
        collision_type: GripCollisionType,
        relative: &Transform,
        target_pose: &Transform,
        local_com: &Transform,
        root_bone_rotation: &Transform,
    ) -> Self {
        let mut anchor_pose = Transform {
            scale: Vec3::ONE,
            ..*target_pose
        };
        let mut com_offset = Transform::IDENTITY;
        let mut new_com = None;

        match placement.resolve(collision_type) {
            ComPlacement::SetAndGripAt => {
                let grip_point = relative
                    .then(root_bone_rotation)
                    .inverse()
                    .translation
                    * target_pose.scale;
                let com = Transform {
                    translation: grip_point,
                    ..*local_com
                };
                anchor_pose.translation = target_pose.transform_point_no_scale(grip_point);
                com_offset.translation = grip_point / safe_scale(target_pose.scale);
                new_com = Some(com);
            }
            ComPlacement::GripAtControllerLoc => {
                let controller = relative.inverse().then(target_pose).translation;
                anchor_pose.translation = controller;
                com_offset.translation = target_pose.inverse_transform_point(controller);
            }
            ComPlacement::GripAt => {
                let com = target_pose.transform_point_no_scale(local_com.translation);
                anchor_pose.translation = com;
                com_offset.translation = target_pose.inverse_transform_point(com);
            }
            ComPlacement::AtPivot | ComPlacement::Default => {}
        }

        Self {
            anchor_pose,
            com_offset,
            new_com,
        }
    }

    /// Aligns the anchor with the controller's rotation so a wrist-twist grip
    /// only drives twist.
    pub fn align_twist(&mut self, pivot_rotation: Quat, target_rotation: Quat) {
        let delta = (pivot_rotation.inverse() * target_rotation).inverse();
        self.anchor_pose.rotation = (self.anchor_pose.rotation * delta).normalize();
        self.com_offset.rotation = (self.com_offset.rotation * delta).normalize();
    }
}

fn safe_scale(scale: Vec3) -> Vec3 {
    scale.map(|s| if s.abs() <= vr_grip_math::SMALL_SCALE { 1.0 } else { s })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_grip_at_moves_com_to_hand() {
        // Hand 0.5 along +X of the object.
        let relative = Transform::from_xyz(-0.5, 0.0, 0.0);
        let target = Transform::from_xyz(2.0, 1.0, 0.0);
        let plan = AnchorPlan::compute(
            ComPlacement::SetAndGripAt,
            GripCollisionType::InteractiveCollisionWithPhysics,
            &relative,
            &target,
            &Transform::IDENTITY,
            &Transform::IDENTITY,
        );
        let com = plan.new_com.unwrap();
        assert!(com.translation.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert!(plan.anchor_pose.translation.abs_diff_eq(Vec3::new(2.5, 1.0, 0.0), 1e-5));
        let resolved = plan.com_offset.then(&target);
        assert!(resolved.translation.abs_diff_eq(plan.anchor_pose.translation, 1e-5));
    }

    #[test]
    fn controller_location_leaves_com_alone() {
        let relative = Transform::from_xyz(0.0, -0.25, 0.0);
        let target = Transform::from_xyz(0.0, 0.0, 3.0);
        let plan = AnchorPlan::compute(
            ComPlacement::Default,
            GripCollisionType::ManipulationGrip,
            &relative,
            &target,
            &Transform::IDENTITY,
            &Transform::IDENTITY,
        );
        assert!(plan.new_com.is_none());
        assert!(plan.anchor_pose.translation.abs_diff_eq(Vec3::new(0.0, 0.25, 3.0), 1e-5));
        assert!(plan.com_offset.translation.abs_diff_eq(Vec3::new(0.0, 0.25, 0.0), 1e-5));
    }

    #[test]
    fn anchor_target_follows_offset() {
        let mut settings = HandleSettings::new(HandleDrive::DEFAULT);
        settings.com_offset = Transform::from_xyz(1.0, 0.0, 0.0);
        let world = Transform::from_xyz(0.0, 2.0, 0.0).with_scale(Vec3::splat(3.0));
        let anchor = settings.anchor_target(&world);
        assert!(anchor.translation.abs_diff_eq(Vec3::new(3.0, 2.0, 0.0), 1e-5));
        assert_eq!(anchor.scale, Vec3::ONE);
    }
}
