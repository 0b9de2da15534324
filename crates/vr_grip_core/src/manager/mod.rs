//! The per-controller grip manager.

mod physics_handle;
mod tick;

pub use tick::ControllerVelocity;

use alloc::{string::String, vec::Vec};

use bevy_math::Vec3;
use bevy_transform::components::Transform;
use vr_grip_math::TransformExt;

use crate::{
    ComponentId, ControllerId, GripAuthority, GripCollisionType, GripEnv, GripError, GripEvent,
    GripHolder, GripId, GripIdAllocator, GripLateUpdateSettings, GripLookup, GripMovementReplication,
    GripPolicy, GripPolicyBehavior, GripRecord, GripScene, GripSettings, ImpactOutcome,
    InvalidTargetReason, LerpState, LerpToHandPolicy, MeleeImpact, PhysicsHandleRecord,
    PolicyContext, ReleaseKind, TargetId, TargetSnapshot, any_active, find_policy,
    policy_revision,
};

/// How a new grip places its target against the hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GripOffset {
    /// A world pose. The grip keeps the target at this pose relative to where
    /// the hand is now.
    World(Transform),
    /// A pose already relative to the frame it is held in.
    Relative(Transform),
}

impl GripOffset {
    fn relative_to(self, frame: &Transform) -> Transform {
        match self {
            Self::World(world) => world.relative_to(frame),
            Self::Relative(relative) => relative,
        }
    }
}

/// Arguments of [`ControllerGripManager::grip`].
///
/// Unset options fall back to what the target asks for.
#[derive(Clone, Debug, PartialEq)]
pub struct GripRequest {
    /// What to grip.
    pub target: TargetId,
    /// Where the target sits relative to the hand.
    pub offset: GripOffset,
    /// Extra offset between the relative transform and the pivot.
    pub addition_transform: Transform,
    /// The slot the grip snapped to, for slot grips.
    pub slot_name: Option<String>,
    /// Collision mode.
    pub collision_type: Option<GripCollisionType>,
    /// Late-update suppression.
    pub late_update: Option<GripLateUpdateSettings>,
    /// Who moves the object.
    pub movement_replication: Option<GripMovementReplication>,
    /// Drive stiffness and damping.
    pub stiffness_and_damping: Option<(f32, f32)>,
}

impl GripRequest {
    /// A free grip on `target` with everything else taken from the target.
    pub fn new(target: TargetId, offset: GripOffset) -> Self {
        Self {
            target,
            offset,
            addition_transform: Transform::IDENTITY,
            slot_name: None,
            collision_type: None,
            late_update: None,
            movement_replication: None,
            stiffness_and_damping: None,
        }
    }

    /// Marks the grip as snapped to the named slot.
    pub fn at_slot(mut self, name: impl Into<String>) -> Self {
        self.slot_name = Some(name.into());
        self
    }

    /// Overrides the collision mode.
    pub fn with_collision_type(mut self, collision_type: GripCollisionType) -> Self {
        self.collision_type = Some(collision_type);
        self
    }

    /// Overrides late-update suppression.
    pub fn with_late_update(mut self, late_update: GripLateUpdateSettings) -> Self {
        self.late_update = Some(late_update);
        self
    }

    /// Overrides who moves the object.
    pub fn with_movement_replication(mut self, replication: GripMovementReplication) -> Self {
        self.movement_replication = Some(replication);
        self
    }

    /// Overrides the drive spring.
    pub fn with_stiffness_and_damping(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness_and_damping = Some((stiffness, damping));
        self
    }

    /// Sets the addition transform.
    pub fn with_addition_transform(mut self, addition: Transform) -> Self {
        self.addition_transform = addition;
        self
    }
}

/// Arguments of [`ControllerGripManager::add_secondary_attachment`].
#[derive(Clone, Debug, PartialEq)]
pub struct SecondaryAttachment {
    /// The tracked point acting as the second hand.
    pub component: ComponentId,
    /// Where the second hand holds the target. World offsets are converted
    /// against the target's current pose.
    pub offset: GripOffset,
    /// The secondary slot, for slot grips.
    pub slot_name: Option<String>,
    /// Seconds to blend into the two-hand pose. Zero snaps.
    pub lerp_duration: f32,
}

impl SecondaryAttachment {
    /// A free attachment that snaps into place.
    pub fn new(component: ComponentId, offset: GripOffset) -> Self {
        Self {
            component,
            offset,
            slot_name: None,
            lerp_duration: 0.0,
        }
    }

    /// Marks the attachment as snapped to the named secondary slot.
    pub fn at_slot(mut self, name: impl Into<String>) -> Self {
        self.slot_name = Some(name.into());
        self
    }

    /// Blends into the two-hand pose over `seconds`.
    pub fn with_lerp_duration(mut self, seconds: f32) -> Self {
        self.lerp_duration = seconds;
        self
    }
}

/// Arguments of a drop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropRequest {
    /// Hand the target to free simulation. `None` asks the target.
    pub simulate: Option<bool>,
    /// Linear velocity applied when simulating. `None` uses the controller's.
    pub linear_velocity: Option<Vec3>,
    /// Angular velocity applied when simulating. `None` means zero.
    pub angular_velocity: Option<Vec3>,
}

impl DropRequest {
    /// Let the target decide, throw at the controller's velocity.
    pub const DEFAULT: Self = Self {
        simulate: None,
        linear_velocity: None,
        angular_velocity: None,
    };

    /// Forces simulation on or off.
    pub const fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = Some(simulate);
        self
    }

    /// Throws with the given velocities.
    pub const fn with_velocities(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = Some(linear);
        self.angular_velocity = Some(angular);
        self
    }
}

impl Default for DropRequest {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Owns one hand controller's grips and the physics joints behind them.
///
/// Call [`ControllerGripManager::set_pivot`] with the tracked pose, then
/// [`ControllerGripManager::tick`] once per simulation step. Grip and drop
/// calls made before the tick take effect in it.
#[derive(Debug)]
pub struct ControllerGripManager {
    controller: ControllerId,
    settings: GripSettings,
    pivot: Transform,
    grips: Vec<GripRecord>,
    handles: Vec<PhysicsHandleRecord>,
    ids: GripIdAllocator,
    lerp_to_hand: Vec<(GripId, LerpToHandPolicy)>,
    velocity: ControllerVelocity,
    events: Vec<GripEvent>,
}

impl ControllerGripManager {
    /// A manager for `controller` with no grips.
    pub fn new(controller: ControllerId, settings: GripSettings) -> Self {
        Self {
            controller,
            settings,
            pivot: Transform::IDENTITY,
            grips: Vec::new(),
            handles: Vec::new(),
            ids: GripIdAllocator::default(),
            lerp_to_hand: Vec::new(),
            velocity: ControllerVelocity::default(),
            events: Vec::new(),
        }
    }

    /// The controller this manager drives.
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Shared tunables.
    pub fn settings(&self) -> &GripSettings {
        &self.settings
    }

    /// Mutable access to the tunables. Changes apply from the next tick.
    pub fn settings_mut(&mut self) -> &mut GripSettings {
        &mut self.settings
    }

    /// The controller's pivot pose.
    pub fn pivot(&self) -> Transform {
        self.pivot
    }

    /// Updates the controller's pivot pose from tracking.
    pub fn set_pivot(&mut self, pivot: Transform) {
        self.pivot = pivot;
    }

    /// The controller's estimated velocity.
    pub fn velocity(&self) -> &ControllerVelocity {
        &self.velocity
    }

    /// Takes the events raised since the last call.
    pub fn drain_events(&mut self) -> impl Iterator<Item = GripEvent> + '_ {
        self.events.drain(..)
    }

    /// Grips a target.
    ///
    /// The physics joint, if the collision mode needs one, is created on the
    /// next tick. Fails without side effects if the target refuses.
    pub fn grip(&mut self, env: &mut GripEnv<'_>, request: GripRequest) -> Result<GripId, GripError> {
        let target_id = request.target;
        let controller = self.controller;
        let reject = |reason| {
            tracing::warn!(controller = ?controller, target = ?target_id, ?reason, "grip rejected");
            GripError::invalid_target(target_id, reason)
        };

        let target = env
            .scene
            .target(target_id)
            .ok_or_else(|| reject(InvalidTargetReason::Missing))?;
        if target.deny_gripping(controller) {
            return Err(reject(InvalidTargetReason::DeniesGripping));
        }
        let collision_type = request.collision_type.unwrap_or_else(|| {
            if request.slot_name.is_some() {
                target.slot_grip_type()
            } else {
                target.free_grip_type()
            }
        });
        if collision_type.is_driven_by_manager() && !target.is_movable() {
            return Err(reject(InvalidTargetReason::NotMovable));
        }
        if self.is_object_held(target_id) {
            return Err(reject(InvalidTargetReason::AlreadyHeldByController));
        }
        if !target.allows_multiple_grips()
            && target
                .held_by()
                .iter()
                .any(|holder| holder.pair.controller != controller)
        {
            return Err(reject(InvalidTargetReason::HeldWithoutMultiGrip));
        }

        let movement_replication = request
            .movement_replication
            .unwrap_or_else(|| target.movement_replication())
            .resolve(target.replicates_movement());
        let local = movement_replication == GripMovementReplication::LocalOnlyNotReplicated;
        let mut ids = self.ids.clone();
        let id = ids
            .next(local, |id| self.grip_by_id(id).is_some())
            .ok_or(GripError::GripIdsExhausted)?;
        if !local && !env.authority.is_authoritative_for(controller, id) {
            return Err(GripError::NotAuthoritative(id));
        }

        let (stiffness, damping) = request
            .stiffness_and_damping
            .unwrap_or_else(|| target.grip_stiffness_and_damping());
        let mut record = GripRecord::new(id, target_id, collision_type);
        record.object_type = target.object_type().map(String::from);
        record.relative_transform = request
            .offset
            .relative_to(&request.addition_transform.then(&self.pivot));
        record.addition_transform = request.addition_transform;
        record.is_slot_grip = request.slot_name.is_some();
        record.slot_name = request.slot_name;
        record.late_update = request
            .late_update
            .unwrap_or_else(|| target.late_update_setting());
        record.movement_replication = movement_replication;
        record.stiffness = if stiffness > 0.0 {
            stiffness
        } else {
            self.settings.default_stiffness
        };
        record.damping = if damping > 0.0 {
            damping
        } else {
            self.settings.default_damping
        };
        record.advanced = target.advanced_grip_settings();
        record.was_simulating = target.is_simulating_physics();
        self.ids = ids;

        let skip_simulating = record
            .advanced
            .physics
            .is_some_and(|physics| physics.skip_setting_simulating);
        let mut parent = None;
        if let Some(target) = env.scene.target_mut(target_id) {
            if collision_type.is_driven_by_manager()
                && !collision_type.requires_physics_handle()
                && !skip_simulating
            {
                target.set_simulate_physics(false);
            }
            target.set_held(GripHolder::of(controller, &record), true);
            target.on_grip(controller, &record);
            parent = target.parent();
        }
        if let Some(parent) = parent
            && let Some(parent) = env.scene.target_mut(parent)
        {
            parent.on_child_grip(controller, target_id, &record);
        }

        self.notify_policies(env.scene, &record, |policy, cx, grip| policy.on_grip(cx, grip));
        self.begin_global_lerp(env.scene, &record);

        tracing::debug!(
            controller = ?controller,
            grip = %id,
            target = ?target_id,
            object_type = record.object_type.as_deref(),
            collision = ?collision_type,
            "gripped"
        );
        self.events.push(GripEvent::Gripped {
            grip: id,
            target: target_id,
        });
        self.grips.push(record);
        Ok(id)
    }

    /// Grips a target at its closest primary slot in range of the hand, or
    /// where it is if no slot is in range.
    pub fn grip_by_interface_auto_detect(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
    ) -> Result<GripId, GripError> {
        let found = env
            .scene
            .target(target)
            .ok_or(GripError::invalid_target(target, InvalidTargetReason::Missing))?;
        let request = match found.closest_primary_slot(self.pivot.translation, self.controller) {
            Some(slot) => GripRequest::new(target, GripOffset::Relative(slot.transform.inverse()))
                .at_slot(slot.name),
            None => GripRequest::new(target, GripOffset::World(found.world_transform())),
        };
        self.grip(env, request)
    }

    /// Picks which of `candidates` a grip press should take.
    ///
    /// Skips targets this controller cannot grip right now. The highest
    /// [`grip_priority`](crate::AdvancedGripSettings::grip_priority) wins, then
    /// the target closest to the pivot.
    pub fn best_grip_candidate(
        &self,
        scene: &dyn GripScene,
        candidates: impl IntoIterator<Item = TargetId>,
    ) -> Option<TargetId> {
        let pivot = self.pivot.translation;
        candidates
            .into_iter()
            .filter(|id| !self.is_object_held(*id))
            .filter_map(|id| {
                let target = scene.target(id)?;
                let taken = !target.allows_multiple_grips()
                    && target
                        .held_by()
                        .iter()
                        .any(|holder| holder.pair.controller != self.controller);
                if target.deny_gripping(self.controller) || taken {
                    return None;
                }
                let priority = target.advanced_grip_settings().grip_priority;
                let distance = target.world_transform().translation.distance_squared(pivot);
                Some((id, priority, distance))
            })
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.total_cmp(&a.2)))
            .map(|(id, _, _)| id)
    }

    /// Releases the grip on `target`.
    pub fn drop_object(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
        request: DropRequest,
    ) -> Result<(), GripError> {
        let index = self.index_for_target(target)?;
        self.check_authority(env.authority, index)?;
        self.release(env, index, ReleaseKind::Released, request);
        Ok(())
    }

    /// Releases a grip by id.
    pub fn drop_grip(&mut self, env: &mut GripEnv<'_>, grip: GripId, request: DropRequest) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        self.check_authority(env.authority, index)?;
        self.release(env, index, ReleaseKind::Released, request);
        Ok(())
    }

    /// Releases every grip and destroys every joint, for controller teardown.
    pub fn drop_all_grips(&mut self, env: &mut GripEnv<'_>) {
        while !self.grips.is_empty() {
            let last = self.grips.len() - 1;
            self.release(env, last, ReleaseKind::Teardown, DropRequest::DEFAULT);
        }
        while let Some(handle) = self.handles.pop() {
            tracing::warn!(controller = ?self.controller, grip = %handle.grip, "destroying leftover physics handle");
            physics_handle::destroy(env.physics, &handle);
        }
        self.lerp_to_hand.clear();
    }

    /// Attaches a second hand to the grip on `target`.
    pub fn add_secondary_attachment(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
        attachment: SecondaryAttachment,
    ) -> Result<(), GripError> {
        let index = self.index_for_target(target)?;
        self.check_authority(env.authority, index)?;

        let found = env
            .scene
            .target(target)
            .ok_or(GripError::invalid_target(target, InvalidTargetReason::Missing))?;
        let secondary_type = found.secondary_grip_type();
        if !secondary_type.allows_secondary()
            || (secondary_type.requires_slot() && attachment.slot_name.is_none())
        {
            tracing::warn!(
                controller = ?self.controller,
                target = ?target,
                secondary = ?secondary_type,
                "secondary grip rejected"
            );
            return Err(GripError::SecondaryGripNotAllowed(target));
        }
        let target_world = found.world_transform();
        if env.scene.component_transform(attachment.component).is_none() {
            return Err(GripError::MissingComponent(attachment.component));
        }

        let grip = &mut self.grips[index];
        let duration = if grip.secondary.lerp_state == LerpState::EndLerp {
            0.0
        } else {
            attachment.lerp_duration
        };
        grip.secondary.clear();
        grip.secondary.attachment = Some(attachment.component);
        grip.secondary.relative_transform = attachment.offset.relative_to(&target_world);
        grip.secondary.is_slot_grip = attachment.slot_name.is_some();
        grip.secondary.slot_name = attachment.slot_name;
        grip.secondary.begin_lerp(LerpState::StartLerp, duration);
        let record = grip.clone();

        if let Some(target) = env.scene.target_mut(target) {
            target.set_held(GripHolder::of(self.controller, &record), true);
            target.on_secondary_grip(self.controller, attachment.component, &record);
        }
        self.notify_policies(env.scene, &record, |policy, cx, grip| {
            policy.on_secondary_grip(cx, grip);
        });

        tracing::debug!(controller = ?self.controller, grip = %record.id, "secondary attached");
        self.events.push(GripEvent::SecondaryAdded {
            grip: record.id,
            component: attachment.component,
        });
        Ok(())
    }

    /// Attaches `component` as a second hand at the target's closest secondary
    /// slot in range, or where the component is if no slot is in range.
    pub fn add_secondary_attachment_auto_detect(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
        component: ComponentId,
        lerp_duration: f32,
    ) -> Result<(), GripError> {
        let hand = env
            .scene
            .component_transform(component)
            .ok_or(GripError::MissingComponent(component))?;
        let found = env
            .scene
            .target(target)
            .ok_or(GripError::invalid_target(target, InvalidTargetReason::Missing))?;
        let attachment = match found.closest_secondary_slot(hand.translation, self.controller) {
            Some(slot) => SecondaryAttachment::new(component, GripOffset::Relative(slot.transform))
                .at_slot(slot.name),
            None => SecondaryAttachment::new(component, GripOffset::World(hand)),
        };
        self.add_secondary_attachment(env, target, attachment.with_lerp_duration(lerp_duration))
    }

    /// Detaches the second hand from the grip on `target`, blending back to
    /// the one-hand pose over `lerp_duration` seconds.
    ///
    /// Retaining secondary types keep the two-hand pose instead.
    pub fn remove_secondary_attachment(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
        lerp_duration: f32,
    ) -> Result<(), GripError> {
        let index = self.index_for_target(target)?;
        if !self.grips[index].secondary.has_attachment() {
            return Err(GripError::NoSecondaryAttachment(self.grips[index].id));
        }
        self.check_authority(env.authority, index)?;

        let found = env.scene.target(target);
        let retains = found.is_some_and(|found| found.secondary_grip_type().retains_on_release());
        let target_world = found.map(|found| found.world_transform());

        let pivot = self.pivot;
        let grip = &mut self.grips[index];
        if retains {
            if let Some(world) = target_world {
                grip.relative_transform = world.relative_to(&grip.addition_transform.then(&pivot));
            }
            grip.secondary.clear();
        } else {
            let duration = if grip.secondary.lerp_state == LerpState::StartLerp {
                0.0
            } else {
                lerp_duration
            };
            grip.secondary.detach();
            grip.secondary.begin_lerp(LerpState::EndLerp, duration);
            if grip.secondary.lerp_state == LerpState::NotLerping {
                grip.secondary.clear();
            }
        }
        let record = grip.clone();

        if let Some(target) = env.scene.target_mut(target) {
            target.set_held(GripHolder::of(self.controller, &record), true);
            target.on_secondary_grip_release(self.controller, &record);
        }
        self.notify_policies(env.scene, &record, |policy, cx, grip| {
            policy.on_secondary_grip_release(cx, grip);
        });

        tracing::debug!(controller = ?self.controller, grip = %record.id, retains, "secondary released");
        self.events.push(GripEvent::SecondaryRemoved { grip: record.id });
        Ok(())
    }

    /// Pauses or resumes a grip. Paused grips are not moved.
    pub fn set_grip_paused(&mut self, grip: GripId, paused: bool) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        self.grips[index].paused = paused;
        Ok(())
    }

    /// Replaces a grip's relative transform.
    pub fn set_grip_relative_transform(&mut self, grip: GripId, relative: Transform) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        self.grips[index].relative_transform = relative;
        Ok(())
    }

    /// Replaces a grip's addition transform.
    pub fn set_grip_addition_transform(&mut self, grip: GripId, addition: Transform) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        self.grips[index].addition_transform = addition;
        Ok(())
    }

    /// Switches a grip's collision mode.
    ///
    /// A joint that cannot serve the new mode is destroyed; the next tick builds
    /// a new one if needed.
    pub fn set_grip_collision_type(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: GripId,
        collision_type: GripCollisionType,
    ) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        let previous = core::mem::replace(&mut self.grips[index].collision_type, collision_type);

        if let Some(handle) = self.handle_index(grip) {
            let built_for = self.handles[handle].collision_type;
            if !collision_type.may_use_physics_handle() || built_for.is_categorical_change(collision_type) {
                self.destroy_physics_handle(env.physics, handle);
            }
        }
        if previous.may_use_physics_handle()
            && !collision_type.requires_physics_handle()
            && collision_type.is_driven_by_manager()
            && let Some(target) = env.scene.target_mut(self.grips[index].target)
        {
            target.set_simulate_physics(false);
        }
        tracing::debug!(controller = ?self.controller, grip = %grip, from = ?previous, to = ?collision_type, "collision type changed");
        Ok(())
    }

    /// Replaces a grip's drive spring and pushes it into its joint.
    pub fn set_grip_stiffness_and_damping(
        &mut self,
        env: &mut GripEnv<'_>,
        grip: GripId,
        stiffness: f32,
        damping: f32,
    ) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        self.grips[index].stiffness = stiffness;
        self.grips[index].damping = damping;
        if let Some(handle) = self.handle_index(grip) {
            let record = self.grips[index].clone();
            if let Some(snapshot) = snapshot(&*env.scene, &record) {
                self.refresh_physics_handle(env, &record, &snapshot, handle);
            }
        }
        Ok(())
    }

    /// Throws away a grip's joint and builds a new one now.
    pub fn recreate_grip(&mut self, env: &mut GripEnv<'_>, grip: GripId) -> Result<(), GripError> {
        let index = self.index_of(grip)?;
        if let Some(handle) = self.handle_index(grip) {
            self.destroy_physics_handle(env.physics, handle);
        }
        let record = self.grips[index].clone();
        let uses_handle = record.collision_type.requires_physics_handle()
            || (record.collision_type.may_use_physics_handle() && record.colliding);
        if !uses_handle {
            return Ok(());
        }
        let snapshot = snapshot(&*env.scene, &record).ok_or(GripError::invalid_target(
            record.target,
            InvalidTargetReason::Missing,
        ))?;
        self.sync_physics_handle(env, &record, &snapshot).map(|_| ())
    }

    /// Checks a melee weapon impact against the weapon's lodge components and
    /// raises [`GripEvent::MeleeShouldLodge`] or [`GripEvent::MeleeHit`].
    pub fn report_melee_impact(
        &mut self,
        env: &mut GripEnv<'_>,
        target: TargetId,
        impact: &MeleeImpact,
    ) -> Result<ImpactOutcome, GripError> {
        let index = self.index_for_target(target)?;
        let grip = self.grips[index].id;
        let weapon = env
            .scene
            .target(target)
            .ok_or(GripError::invalid_target(target, InvalidTargetReason::Missing))?
            .world_transform();
        let GripPolicy::Melee(melee) = find_policy(&*env.scene, target, "melee")? else {
            return Err(GripError::PolicyNotFound {
                target,
                name: "melee".into(),
            });
        };

        let outcome = melee.check_impact(&weapon, impact, &self.settings);
        match &outcome {
            ImpactOutcome::ShouldLodge { component, surface } => {
                self.events.push(GripEvent::MeleeShouldLodge {
                    grip,
                    target,
                    component: component.clone(),
                    surface: *surface,
                });
            }
            ImpactOutcome::Hit { component, surface } => {
                self.events.push(GripEvent::MeleeHit {
                    grip,
                    target,
                    component: component.clone(),
                    surface: *surface,
                });
            }
            ImpactOutcome::Invalid => {}
        }
        Ok(outcome)
    }

    /// Every active grip.
    pub fn grips(&self) -> &[GripRecord] {
        &self.grips
    }

    /// Every live physics joint.
    pub fn physics_handles(&self) -> &[PhysicsHandleRecord] {
        &self.handles
    }

    /// The grip with `id`.
    pub fn grip_by_id(&self, id: GripId) -> Option<&GripRecord> {
        self.grips.iter().find(|grip| grip.id == id)
    }

    /// The grip holding `target`.
    pub fn grip_for_target(&self, target: TargetId) -> Option<&GripRecord> {
        self.grips.iter().find(|grip| grip.target == target)
    }

    /// The joint backing grip `id`.
    pub fn physics_handle(&self, id: GripId) -> Option<&PhysicsHandleRecord> {
        self.handles.iter().find(|handle| handle.grip == id)
    }

    /// True if this controller holds `target`.
    pub fn is_object_held(&self, target: TargetId) -> bool {
        self.grip_for_target(target).is_some()
    }

    /// True if this controller holds `actor` or anything attached below it.
    pub fn is_actor_held(&self, scene: &dyn GripScene, actor: TargetId) -> bool {
        self.grips.iter().any(|grip| {
            let mut current = Some(grip.target);
            // Cap the walk in case of a parent cycle.
            for _ in 0..64 {
                match current {
                    Some(id) if id == actor => return true,
                    Some(id) => current = scene.target(id).and_then(|target| target.parent()),
                    None => return false,
                }
            }
            false
        })
    }

    /// Targets this controller holds.
    pub fn held_objects(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.grips.iter().map(|grip| grip.target)
    }

    /// True if this controller moves grip `id` on this peer.
    pub fn has_grip_authority(&self, authority: &dyn GripAuthority, id: GripId) -> bool {
        self.grip_by_id(id)
            .is_some_and(|grip| has_authority(self.controller, authority, grip))
    }

    /// True if render-time late updates may move grip `id` this frame.
    pub fn late_updates_allowed(&self, scene: &dyn GripScene, id: GripId) -> bool {
        let Some(grip) = self.grip_by_id(id) else {
            return false;
        };
        if grip.collision_type.is_manipulation() {
            return false;
        }
        let double_gripping = grip.secondary.has_attachment();
        let allowed = match grip.late_update {
            GripLateUpdateSettings::AlwaysOn => true,
            GripLateUpdateSettings::AlwaysOff => false,
            GripLateUpdateSettings::NotWhenColliding => !grip.colliding,
            GripLateUpdateSettings::NotWhenDoubleGripping => !double_gripping,
            GripLateUpdateSettings::NotWhenCollidingOrDoubleGripping => {
                !grip.colliding && !double_gripping
            }
        };
        allowed
            && !scene.target(grip.target).is_some_and(|target| {
                any_active(target.grip_policies(), |policy| policy.wants_deny_late_update())
            })
    }

    fn index_of(&self, id: GripId) -> Result<usize, GripError> {
        self.grips
            .iter()
            .position(|grip| grip.id == id)
            .ok_or(GripError::InvalidGripId(GripLookup::Id(id)))
    }

    fn index_for_target(&self, target: TargetId) -> Result<usize, GripError> {
        self.grips
            .iter()
            .position(|grip| grip.target == target)
            .ok_or(GripError::InvalidGripId(GripLookup::Target(target)))
    }

    fn handle_index(&self, id: GripId) -> Option<usize> {
        self.handles.iter().position(|handle| handle.grip == id)
    }

    fn check_authority(&self, authority: &dyn GripAuthority, index: usize) -> Result<(), GripError> {
        let grip = &self.grips[index];
        if has_authority(self.controller, authority, grip) {
            Ok(())
        } else {
            Err(GripError::NotAuthoritative(grip.id))
        }
    }

    /// Ends the grip at `index`: tears down its joint, notifies everyone and
    /// optionally hands the target to simulation.
    fn release(&mut self, env: &mut GripEnv<'_>, index: usize, kind: ReleaseKind, request: DropRequest) {
        let record = self.grips.remove(index);
        if let Some(handle) = self.handle_index(record.id) {
            self.destroy_physics_handle(env.physics, handle);
        }
        self.lerp_to_hand.retain(|(id, _)| *id != record.id);

        let mut parent = None;
        if let Some(target) = env.scene.target_mut(record.target) {
            target.set_held(GripHolder::of(self.controller, &record), false);
            parent = target.parent();
        }
        self.notify_policies(env.scene, &record, |policy, cx, grip| {
            policy.on_grip_release(cx, grip, kind);
        });

        let mut simulated = false;
        if let Some(target) = env.scene.target_mut(record.target) {
            target.on_grip_release(self.controller, &record, kind);
            if record
                .advanced
                .physics
                .is_some_and(|physics| physics.turn_off_gravity_during_grip)
            {
                target.set_gravity_enabled(true);
            }
            let simulate = request.simulate.unwrap_or_else(|| target.simulate_on_drop());
            if simulate && target.held_by().is_empty() {
                target.set_simulate_physics(true);
                target.set_velocities(
                    request.linear_velocity.unwrap_or(self.velocity.linear()),
                    request.angular_velocity.unwrap_or(Vec3::ZERO),
                );
                simulated = true;
            }
        }
        if let Some(parent) = parent
            && let Some(parent) = env.scene.target_mut(parent)
        {
            parent.on_child_grip_release(self.controller, record.target, &record, kind);
        }

        tracing::debug!(
            controller = ?self.controller,
            grip = %record.id,
            target = ?record.target,
            ?kind,
            simulated,
            "released"
        );
        self.events.push(GripEvent::Dropped {
            grip: record.id,
            target: record.target,
            kind,
        });
    }

    /// Runs a lifecycle hook on every policy of the grip's target.
    fn notify_policies(
        &mut self,
        scene: &mut dyn GripScene,
        grip: &GripRecord,
        mut hook: impl FnMut(&mut dyn GripPolicyBehavior, &mut PolicyContext<'_>, &GripRecord),
    ) {
        let Some(snapshot) = snapshot(&*scene, grip) else {
            return;
        };
        let Some(target) = scene.target_mut(grip.target) else {
            return;
        };
        let mut cx = PolicyContext::new(
            self.controller,
            self.pivot,
            &snapshot,
            &self.settings,
            &mut self.events,
        );
        for policy in target.grip_policies_mut() {
            hook(policy.behavior_mut(), &mut cx, grip);
        }
    }

    /// Starts the global lerp-to-hand for a new grip when the target does not
    /// bring its own.
    fn begin_global_lerp(&mut self, scene: &mut dyn GripScene, grip: &GripRecord) {
        let global = self.settings.lerp_to_hand;
        if !global.enabled || !grip.collision_type.is_driven_by_manager() {
            return;
        }
        let Some(snapshot) = snapshot(&*scene, grip) else {
            return;
        };
        let declares_own = scene.target(grip.target).is_some_and(|target| {
            target
                .grip_policies()
                .iter()
                .any(|policy| matches!(policy, GripPolicy::LerpToHand(_)))
        });
        if declares_own || (global.skip_if_held && snapshot.holder_count() > 1) {
            return;
        }

        let mut policy = LerpToHandPolicy::new(global.config);
        let mut cx = PolicyContext::new(
            self.controller,
            self.pivot,
            &snapshot,
            &self.settings,
            &mut self.events,
        );
        policy.on_grip(&mut cx, grip);
        if policy.is_blending() {
            self.lerp_to_hand.push((grip.id, policy));
        }
    }
}

fn has_authority(controller: ControllerId, authority: &dyn GripAuthority, grip: &GripRecord) -> bool {
    grip.is_local_only() || authority.is_authoritative_for(controller, grip.id)
}

/// Captures what policies see of the grip's target. `None` once the target is gone.
fn snapshot(scene: &dyn GripScene, grip: &GripRecord) -> Option<TargetSnapshot> {
    let target = scene.target(grip.target)?;
    Some(TargetSnapshot {
        id: grip.target,
        transform: target.world_transform(),
        parent_transform: target.attach_parent_transform(),
        root_bone_rotation: target.root_bone_rotation(),
        secondary_grip_type: target.secondary_grip_type(),
        secondary_location: grip
            .secondary
            .attachment
            .and_then(|component| scene.component_transform(component))
            .map(|transform| transform.translation),
        holders: target.held_by().to_vec(),
        head_transform: scene.head_transform(),
        policy_revision: policy_revision(target.grip_policies()),
    })
}
