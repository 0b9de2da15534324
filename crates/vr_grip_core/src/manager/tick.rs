use alloc::vec::Vec;

use bevy_math::Vec3;
use bevy_transform::components::Transform;
use vr_grip_math::{PeakFilter, rolling_average};

use super::{ControllerGripManager, DropRequest, has_authority, snapshot};
use crate::{
    DefaultPolicy, GripCollisionType, GripEnv, GripEvent, GripHolder, GripId, GripPolicyBehavior,
    GripRecord, GripScene, LerpState, MoveMode, PolicyContext, ReleaseKind, TargetSnapshot,
    TeleportBehavior, VelocityCalculation, VelocitySettings, any_active, resolve_world_transform,
};

/// Estimates the controller's linear velocity from its pivot over time.
#[derive(Clone, Debug, Default)]
pub struct ControllerVelocity {
    last_location: Option<Vec3>,
    linear: Vec3,
    peak: PeakFilter,
}

impl ControllerVelocity {
    /// Feeds the pivot location at the end of a step of `delta_time` seconds.
    pub fn sample(&mut self, location: Vec3, delta_time: f32, settings: VelocitySettings) {
        if delta_time <= 0.0 {
            return;
        }
        let Some(last) = self.last_location.replace(location) else {
            return;
        };
        let raw = (location - last) / delta_time;
        self.linear = match settings.calculation {
            VelocityCalculation::Default => raw,
            VelocityCalculation::RunningAverage => rolling_average(self.linear, raw, settings.samples),
            VelocityCalculation::SamplePeak => {
                self.peak.push(raw);
                self.peak.peak()
            }
        };
    }

    /// The current estimate.
    pub fn linear(&self) -> Vec3 {
        self.linear
    }

    /// Forgets all samples.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl ControllerGripManager {
    /// Resolves and applies every grip this controller moves.
    ///
    /// Grips whose target vanished, that a policy force-drops, that strayed
    /// past their break distance, or whose joint could not be built without a
    /// kinematic fallback are released at the end of the tick.
    pub fn tick(&mut self, env: &mut GripEnv<'_>, delta_time: f32) {
        self.velocity
            .sample(self.pivot.translation, delta_time, self.settings.velocity);
        self.destroy_orphaned_handles(env);

        let mut grips = core::mem::take(&mut self.grips);
        let mut releases = Vec::new();
        for grip in &mut grips {
            if let Some(kind) = self.tick_grip(env, grip, delta_time) {
                releases.push((grip.id, kind));
            }
        }
        self.grips = grips;

        self.finish_releases(env, releases);
    }

    /// Moves held targets along with a teleporting controller.
    ///
    /// Targets that ask to be dropped are released. The next break check of
    /// every moved grip is skipped.
    pub fn teleport_move_grips(&mut self, env: &mut GripEnv<'_>) {
        let mut grips = core::mem::take(&mut self.grips);
        let mut releases = Vec::new();
        for grip in &mut grips {
            if grip.paused
                || !grip.collision_type.is_driven_by_manager()
                || !has_authority(self.controller, env.authority, grip)
            {
                continue;
            }
            let Some(target) = env.scene.target(grip.target) else {
                continue;
            };
            let controller = self.controller;
            if any_active(target.grip_policies(), |policy| {
                policy.wants_deny_teleport(controller)
            }) {
                continue;
            }
            match target.teleport_behavior() {
                TeleportBehavior::DontTeleport => {}
                TeleportBehavior::DropOnTeleport => releases.push((grip.id, ReleaseKind::Teleported)),
                TeleportBehavior::TeleportAllComponents | TeleportBehavior::OnlyTeleportRootComponent => {
                    let Some(snapshot) = snapshot(&*env.scene, grip) else {
                        continue;
                    };
                    let world = self.resolve(env.scene, grip, &snapshot, 0.0, true);
                    if let Some(target) = env.scene.target_mut(grip.target) {
                        target.set_world_transform(&world, MoveMode::Teleport);
                    }
                    if let Some(handle) = self.physics_handle(grip.id) {
                        env.physics
                            .set_joint_target_pose(handle.joints.joint, handle.settings.anchor_target(&world));
                    }
                    grip.skip_break_check = true;
                    tracing::trace!(controller = ?self.controller, grip = %grip.id, "teleported with controller");
                }
            }
        }
        self.grips = grips;

        self.finish_releases(env, releases);
    }

    fn finish_releases(&mut self, env: &mut GripEnv<'_>, releases: Vec<(GripId, ReleaseKind)>) {
        for (id, kind) in releases {
            let Some(index) = self.grips.iter().position(|grip| grip.id == id) else {
                continue;
            };
            let simulate = match kind {
                ReleaseKind::Broken => Some(true),
                ReleaseKind::HandleFailure => Some(self.grips[index].was_simulating),
                _ => None,
            };
            let request = DropRequest {
                simulate,
                ..DropRequest::DEFAULT
            };
            self.release(env, index, kind, request);
        }
    }

    /// Runs one grip for one tick. Returns why the grip must end, if it must.
    fn tick_grip(&mut self, env: &mut GripEnv<'_>, grip: &mut GripRecord, delta_time: f32) -> Option<ReleaseKind> {
        let Some(mut snapshot) = snapshot(&*env.scene, grip) else {
            tracing::warn!(controller = ?self.controller, grip = %grip.id, target = ?grip.target, "grip target vanished");
            return Some(ReleaseKind::TargetLost);
        };
        if grip.paused {
            return None;
        }
        if !has_authority(self.controller, env.authority, grip) {
            tracing::trace!(controller = ?self.controller, grip = %grip.id, "not authoritative, skipping");
            return None;
        }

        if grip.secondary.has_attachment() && snapshot.secondary_location.is_none() {
            self.clear_stale_secondary(env.scene, grip);
            snapshot = super::snapshot(&*env.scene, grip)?;
        }

        let force_drop = env.scene.target(grip.target).is_some_and(|target| {
            any_active(target.grip_policies(), |policy| policy.wants_force_drop())
        });
        if force_drop {
            return Some(ReleaseKind::ForcedByPolicy);
        }

        // The blend clock belongs to the grip; policies only read its factor.
        let lerp_before = grip.secondary.lerp_state;
        grip.secondary.advance_lerp(delta_time);
        if lerp_before != LerpState::NotLerping && grip.secondary.lerp_factor().is_none() {
            if !grip.secondary.has_attachment() {
                grip.secondary.clear();
            }
            self.events
                .push(GripEvent::SecondaryLerpFinished { grip: grip.id });
        }

        match grip.collision_type {
            GripCollisionType::EventsOnly => return None,
            GripCollisionType::CustomGrip => {
                if let Some(target) = env.scene.target_mut(grip.target) {
                    target.tick_grip(self.controller, grip, delta_time);
                }
                return None;
            }
            _ => {}
        }

        let world = self.resolve(env.scene, grip, &snapshot, delta_time, false);
        if let Some(kind) = self.apply(env, grip, &snapshot, &world) {
            return Some(kind);
        }
        self.check_break_distance(env, grip, &world)
    }

    /// Runs the target's policies, then the global lerp-to-hand, for one grip.
    pub(super) fn resolve(
        &mut self,
        scene: &mut dyn GripScene,
        grip: &mut GripRecord,
        snapshot: &TargetSnapshot,
        delta_time: f32,
        for_teleport: bool,
    ) -> Transform {
        let Some(target) = scene.target_mut(grip.target) else {
            return grip.base_world_transform(&self.pivot);
        };
        let mut cx = PolicyContext {
            controller: self.controller,
            delta_time,
            pivot: self.pivot,
            target: snapshot,
            settings: &self.settings,
            for_teleport,
            events: &mut self.events,
        };
        let resolution =
            resolve_world_transform(target.grip_policies_mut(), &mut DefaultPolicy, &mut cx, grip);
        let mut world = resolution.transform;

        if let Some(index) = self.lerp_to_hand.iter().position(|(id, _)| *id == grip.id) {
            let policy = &mut self.lerp_to_hand[index].1;
            policy.world_transform(&mut cx, &mut world, grip);
            if !policy.is_blending() {
                self.lerp_to_hand.swap_remove(index);
            }
        }
        world
    }

    /// Moves the target to `world` the way its collision mode asks.
    fn apply(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &mut GripRecord,
        snapshot: &TargetSnapshot,
        world: &Transform,
    ) -> Option<ReleaseKind> {
        match grip.collision_type {
            GripCollisionType::InteractiveCollisionWithPhysics
            | GripCollisionType::ManipulationGrip
            | GripCollisionType::ManipulationGripWithWristTwist => {
                self.drive_physics_handle(env, grip, snapshot, world)
            }
            GripCollisionType::InteractiveHybridCollisionWithSweep if grip.colliding => {
                let released = self.drive_physics_handle(env, grip, snapshot, world);
                if released.is_none()
                    && grip.collision_type == GripCollisionType::InteractiveHybridCollisionWithSweep
                    && env
                        .scene
                        .target(grip.target)
                        .is_some_and(|target| !target.sweep_blocked(world))
                {
                    grip.colliding = false;
                }
                released
            }
            GripCollisionType::InteractiveHybridCollisionWithSweep => {
                if let Some(handle) = self.handle_index(grip.id) {
                    self.destroy_physics_handle(env.physics, handle);
                    if let Some(target) = env.scene.target_mut(grip.target) {
                        target.set_simulate_physics(false);
                    }
                }
                move_target(env.scene, grip, world, MoveMode::Sweep);
                None
            }
            GripCollisionType::InteractiveCollisionWithSweep => {
                move_target(env.scene, grip, world, MoveMode::Sweep);
                None
            }
            GripCollisionType::SweepWithPhysics => {
                grip.colliding = env
                    .scene
                    .target(grip.target)
                    .is_some_and(|target| target.sweep_blocked(world));
                if let Some(target) = env.scene.target_mut(grip.target) {
                    target.set_world_transform(world, MoveMode::Teleport);
                }
                None
            }
            GripCollisionType::PhysicsOnly => {
                move_target(env.scene, grip, world, MoveMode::Teleport);
                None
            }
            GripCollisionType::CustomGrip | GripCollisionType::EventsOnly => None,
        }
    }

    /// Points the grip's joint at `world`, building the joint first if needed.
    fn drive_physics_handle(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &mut GripRecord,
        snapshot: &TargetSnapshot,
        world: &Transform,
    ) -> Option<ReleaseKind> {
        match self.sync_physics_handle(env, grip, snapshot) {
            Ok(index) => {
                let handle = &self.handles[index];
                env.physics
                    .set_joint_target_pose(handle.joints.joint, handle.settings.anchor_target(world));
                None
            }
            Err(error) => {
                tracing::warn!(controller = ?self.controller, grip = %grip.id, %error, "physics handle failed");
                self.events.push(GripEvent::PhysicsHandleFailed {
                    grip: grip.id,
                    error,
                });
                match grip.collision_type.kinematic_fallback() {
                    Some(fallback) => {
                        grip.collision_type = fallback;
                        grip.colliding = false;
                        move_target(env.scene, grip, world, MoveMode::Sweep);
                        None
                    }
                    None => Some(ReleaseKind::HandleFailure),
                }
            }
        }
    }

    /// Measures how far the target lags behind where the grip wants it and
    /// breaks the grip past the target's break distance.
    fn check_break_distance(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: &mut GripRecord,
        world: &Transform,
    ) -> Option<ReleaseKind> {
        if core::mem::take(&mut grip.skip_break_check) {
            return None;
        }
        let target = env.scene.target(grip.target)?;
        let separation = self
            .physics_handle(grip.id)
            .and_then(|handle| env.physics.joint_separation(handle.joints.joint));
        grip.distance = match separation {
            Some(separation) => separation.length(),
            None => target.world_transform().translation.distance(world.translation),
        };

        let break_distance = target.grip_break_distance();
        if break_distance <= 0.0 || grip.distance <= break_distance {
            return None;
        }
        let denied = any_active(target.grip_policies(), |policy| policy.wants_deny_auto_drop())
            || self.lerp_to_hand.iter().any(|(id, _)| *id == grip.id);
        if denied {
            return None;
        }

        tracing::debug!(
            controller = ?self.controller,
            grip = %grip.id,
            distance = grip.distance,
            break_distance,
            "grip out of range"
        );
        self.events.push(GripEvent::OutOfRange {
            grip: grip.id,
            distance: grip.distance,
        });
        Some(ReleaseKind::Broken)
    }

    /// Drops a second hand whose tracked component no longer exists. Any blend
    /// is cancelled rather than finished against a stale pose.
    fn clear_stale_secondary(&mut self, scene: &mut dyn GripScene, grip: &mut GripRecord) {
        tracing::warn!(
            controller = ?self.controller,
            grip = %grip.id,
            component = ?grip.secondary.attachment,
            "secondary attachment vanished, clearing it"
        );
        grip.secondary.clear();
        if let Some(target) = scene.target_mut(grip.target) {
            target.set_held(GripHolder::of(self.controller, grip), true);
            target.on_secondary_grip_release(self.controller, grip);
        }
        self.notify_policies(scene, grip, |policy, cx, grip| {
            policy.on_secondary_grip_release(cx, grip);
        });
        self.events.push(GripEvent::SecondaryRemoved { grip: grip.id });
    }
}

fn move_target(scene: &mut dyn GripScene, grip: &mut GripRecord, world: &Transform, mode: MoveMode) {
    if let Some(target) = scene.target_mut(grip.target) {
        grip.colliding = target.set_world_transform(world, mode).blocked;
    }
}
