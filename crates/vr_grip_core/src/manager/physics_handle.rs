use bevy_transform::components::Transform;

use super::ControllerGripManager;
use crate::{
    AnchorPlan, DriveProfileTag, GripCollisionType, GripEnv, GripError, GripPolicy,
    GripRecord, HandleDrive, HandleSettings, InvalidTargetReason, JointRequest, PhysicsEngine,
    PhysicsError, PhysicsHandleRecord, PolicyContext, TargetSnapshot,
};

/// Destroys a joint and gives the body back its own mass properties if the
/// joint moved its center of mass.
pub(super) fn destroy(physics: &mut dyn PhysicsEngine, handle: &PhysicsHandleRecord) {
    physics.destroy_joint(handle.joints);
    if handle.settings.set_com && !handle.settings.skip_resetting_com {
        physics.reset_mass_properties(handle.body);
    }
}

impl ControllerGripManager {
    /// Makes sure `grip` has a joint matching its collision mode and the
    /// target's policy revision. Returns the joint's index.
    ///
    /// Drive changes are applied in place; a categorical collision mode change
    /// rebuilds the joint.
    pub(super) fn sync_physics_handle(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &GripRecord,
        snapshot: &TargetSnapshot,
    ) -> Result<usize, GripError> {
        if let Some(index) = self.handle_index(grip.id) {
            let handle = &self.handles[index];
            if !handle.collision_type.is_categorical_change(grip.collision_type) {
                if handle.policy_revision != snapshot.policy_revision
                    || handle.collision_type != grip.collision_type
                {
                    self.refresh_physics_handle(env, grip, snapshot, index);
                }
                return Ok(index);
            }
            tracing::debug!(
                controller = ?self.controller,
                grip = %grip.id,
                from = ?handle.collision_type,
                to = ?grip.collision_type,
                "rebuilding physics handle"
            );
            self.destroy_physics_handle(env.physics, index);
        }

        let handle = self.create_physics_handle(env, grip, snapshot)?;
        self.handles.push(handle);
        Ok(self.handles.len() - 1)
    }

    fn create_physics_handle(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &GripRecord,
        snapshot: &TargetSnapshot,
    ) -> Result<PhysicsHandleRecord, GripError> {
        let failure = |source| GripError::PhysicsHandleCreationFailure {
            grip: grip.id,
            source,
        };
        let target = env
            .scene
            .target_mut(grip.target)
            .ok_or(GripError::invalid_target(grip.target, InvalidTargetReason::Missing))?;
        let body = target.body().ok_or_else(|| failure(PhysicsError::NoBody))?;
        let physics = grip.advanced.physics.unwrap_or_default();

        let mut settings = HandleSettings::new(HandleDrive::for_grip(grip, &self.settings));
        settings.root_bone_rotation = snapshot.root_bone_rotation;

        let mut cx = PolicyContext::new(
            self.controller,
            self.pivot,
            snapshot,
            &self.settings,
            &mut self.events,
        );
        let policies = target.grip_policies_mut();
        let placement = policies
            .iter()
            .map(GripPolicy::behavior)
            .filter(|policy| policy.is_active())
            .find_map(|policy| policy.com_placement(&cx, grip))
            .unwrap_or(physics.com_placement);

        let local_com = env.physics.com_pose(body).unwrap_or(Transform::IDENTITY);
        let mut plan = AnchorPlan::compute(
            placement,
            grip.collision_type,
            &grip.relative_transform,
            &snapshot.transform,
            &local_com,
            &snapshot.root_bone_rotation,
        );
        if grip.collision_type == GripCollisionType::ManipulationGripWithWristTwist {
            plan.align_twist(self.pivot.rotation, snapshot.transform.rotation);
        }
        settings.com_offset = plan.com_offset;
        let mut anchor = plan.anchor_pose;

        for policy in policies.iter_mut() {
            let policy = policy.behavior_mut();
            if policy.is_active() {
                policy.pre_physics_handle(&mut cx, grip, &mut settings, &mut anchor);
            }
        }
        for policy in policies.iter_mut() {
            let policy = policy.behavior_mut();
            if policy.is_active() {
                policy.post_physics_handle(&mut cx, grip, &mut settings);
            }
        }

        let new_com = match settings.com_override {
            Some(com) => Some(Transform {
                translation: com,
                ..local_com
            }),
            None => plan.new_com,
        };
        if let Some(com) = new_com {
            env.physics.set_com_pose(body, com);
            settings.set_com = true;
        }

        let request = JointRequest {
            body,
            anchor_pose: anchor,
            drive: settings.drive,
        };
        let joints = match env.physics.create_joint(&request) {
            Ok(joints) => joints,
            Err(source) => {
                if settings.set_com {
                    env.physics.reset_mass_properties(body);
                }
                return Err(failure(source));
            }
        };

        if !physics.skip_setting_simulating {
            target.set_simulate_physics(true);
        }
        if physics.turn_off_gravity_during_grip {
            target.set_gravity_enabled(false);
        }

        tracing::debug!(
            controller = ?self.controller,
            grip = %grip.id,
            ?placement,
            profile = ?settings.profile,
            "physics handle created"
        );
        Ok(PhysicsHandleRecord {
            grip: grip.id,
            body,
            joints,
            settings,
            collision_type: grip.collision_type,
            policy_revision: snapshot.policy_revision,
        })
    }

    /// Rederives a joint's drives from the grip and its policies and pushes
    /// them into the engine without rebuilding the joint.
    pub(super) fn refresh_physics_handle(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &GripRecord,
        snapshot: &TargetSnapshot,
        index: usize,
    ) {
        let handle = &mut self.handles[index];
        let mut settings = HandleSettings {
            drive: HandleDrive::for_grip(grip, &self.settings),
            profile: DriveProfileTag::GripDefault,
            com_override: None,
            ..handle.settings
        };

        if let Some(target) = env.scene.target_mut(grip.target) {
            let mut cx = PolicyContext::new(
                self.controller,
                self.pivot,
                snapshot,
                &self.settings,
                &mut self.events,
            );
            for policy in target.grip_policies_mut() {
                let policy = policy.behavior_mut();
                if policy.is_active() {
                    policy.post_physics_handle(&mut cx, grip, &mut settings);
                }
            }
        }

        env.physics
            .update_joint_drive(handle.joints.joint, &settings.drive);
        if let Some(com) = settings.com_override {
            let local_com = env.physics.com_pose(handle.body).unwrap_or(Transform::IDENTITY);
            env.physics.set_com_pose(
                handle.body,
                Transform {
                    translation: com,
                    ..local_com
                },
            );
            settings.set_com = true;
        }

        tracing::trace!(
            controller = ?self.controller,
            grip = %grip.id,
            profile = ?settings.profile,
            "physics handle drives updated"
        );
        handle.settings = settings;
        handle.collision_type = grip.collision_type;
        handle.policy_revision = snapshot.policy_revision;
    }

    pub(super) fn destroy_physics_handle(&mut self, physics: &mut dyn PhysicsEngine, index: usize) {
        let handle = self.handles.swap_remove(index);
        destroy(physics, &handle);
        tracing::debug!(controller = ?self.controller, grip = %handle.grip, "physics handle destroyed");
    }

    /// Destroys joints whose grip no longer exists.
    pub(super) fn destroy_orphaned_handles(&mut self, env: &mut GripEnv<'_>) {
        let mut index = 0;
        while index < self.handles.len() {
            let grip = self.handles[index].grip;
            if self.grip_by_id(grip).is_some() {
                index += 1;
                continue;
            }
            tracing::warn!(controller = ?self.controller, grip = %grip, "destroying orphaned physics handle");
            self.destroy_physics_handle(env.physics, index);
        }
    }
}
