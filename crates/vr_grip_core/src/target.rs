//! The capability set grippable entities implement.

use alloc::{string::String, vec::Vec};

use bevy_math::Vec3;
use bevy_transform::components::Transform;
use vr_grip_math::TransformExt;

use crate::{
    AdvancedGripSettings, BodyId, ComponentId, ControllerId, GripCollisionType, GripLateUpdateSettings,
    GripMovementReplication, GripPair, GripPolicy, GripRecord, TargetId,
};

/// How a second hand may influence a held target.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SecondaryGripType {
    /// No second hand.
    #[default]
    None,
    /// Anywhere on the target; aims the target.
    Free,
    /// Only at a secondary slot; aims the target.
    SlotOnly,
    /// Like [`SecondaryGripType::Free`], keeping the aimed pose on release.
    FreeRetain,
    /// Like [`SecondaryGripType::SlotOnly`], keeping the aimed pose on release.
    SlotOnlyRetain,
    /// Aims and scales, keeping the result on release.
    FreeWithScalingRetain,
    /// Aims and scales at a slot, keeping the result on release.
    SlotOnlyWithScalingRetain,
    /// Scales only.
    ScalingOnly,
    /// The target's policies handle the second hand themselves.
    Custom,
}

impl SecondaryGripType {
    /// True if a second hand may attach at all.
    pub const fn allows_secondary(self) -> bool {
        !matches!(self, Self::None)
    }

    /// True if the second hand must snap to a slot.
    pub const fn requires_slot(self) -> bool {
        matches!(
            self,
            Self::SlotOnly | Self::SlotOnlyRetain | Self::SlotOnlyWithScalingRetain
        )
    }

    /// True if the second hand rescales the target.
    pub const fn scales(self) -> bool {
        matches!(
            self,
            Self::FreeWithScalingRetain | Self::SlotOnlyWithScalingRetain | Self::ScalingOnly
        )
    }

    /// True if the second hand rotates the target.
    pub const fn rotates(self) -> bool {
        !matches!(self, Self::ScalingOnly | Self::None | Self::Custom)
    }

    /// True if the two-hand pose is kept when the second hand lets go.
    pub const fn retains_on_release(self) -> bool {
        matches!(
            self,
            Self::FreeRetain
                | Self::SlotOnlyRetain
                | Self::FreeWithScalingRetain
                | Self::SlotOnlyWithScalingRetain
                | Self::ScalingOnly
        )
    }
}

/// What happens to a held target when its holder teleports.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TeleportBehavior {
    /// Teleport the target with everything attached to it.
    TeleportAllComponents,
    /// Teleport only the root.
    OnlyTeleportRootComponent,
    /// Release the target.
    #[default]
    DropOnTeleport,
    /// Leave the target where it is.
    DontTeleport,
}

/// Why a grip ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ReleaseKind {
    /// The holder let go.
    Released,
    /// The target moved further from the hand than its break distance.
    Broken,
    /// A policy demanded the release.
    ForcedByPolicy,
    /// The holder teleported and the target asked to be dropped.
    Teleported,
    /// The grip's physics joint could not be created and the grip had no
    /// kinematic fallback.
    HandleFailure,
    /// The target vanished from the scene.
    TargetLost,
    /// The controller is shutting down.
    Teardown,
}

impl ReleaseKind {
    /// True if the grip broke from distance rather than being released.
    pub const fn is_broken(self) -> bool {
        matches!(self, Self::Broken)
    }
}

/// How a pose change is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMode {
    /// Jump to the pose.
    Teleport,
    /// Move toward the pose and stop at blocking geometry.
    Sweep,
}

/// Result of [`GripTarget::set_world_transform`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// True if a sweep stopped short.
    pub blocked: bool,
}

/// A snap point on a target, local to the target.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripSlot {
    /// Slot name.
    pub name: String,
    /// Pose of the slot relative to the target.
    pub transform: Transform,
}

/// A controller's hold on a target, as the target sees it.
///
/// This is a weak back-reference: it names the controller and grip and keeps a
/// copy of what cross-controller policies need, but owns nothing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripHolder {
    /// Who holds the target.
    pub pair: GripPair,
    /// The grip's relative transform.
    pub relative_transform: Transform,
    /// True if the grip snapped to a slot.
    pub is_slot_grip: bool,
    /// Location of the grip's second hand relative to the target, if attached.
    pub secondary_location: Option<Vec3>,
}

impl GripHolder {
    /// Builds the holder entry for `grip` on `controller`.
    pub fn of(controller: ControllerId, grip: &GripRecord) -> Self {
        Self {
            pair: GripPair::new(controller, grip.id),
            relative_transform: grip.relative_transform,
            is_slot_grip: grip.is_slot_grip,
            secondary_location: grip
                .secondary
                .attachment
                .map(|_| grip.secondary.relative_transform.translation),
        }
    }

    /// Location of the hand in target space.
    pub fn hand_location(&self) -> Vec3 {
        self.relative_transform.inverse_transform_point_no_scale(Vec3::ZERO)
    }
}

fn default_grip_type(body: Option<BodyId>) -> GripCollisionType {
    match body {
        Some(_) => GripCollisionType::ManipulationGrip,
        None => GripCollisionType::InteractiveCollisionWithSweep,
    }
}

/// Implemented by anything a controller can hold.
///
/// Every method has a default, so an implementor only overrides what it
/// supports. Targets keep their holder list and policies; the manager keeps
/// them current.
#[expect(unused_variables, reason = "default implementations ignore their arguments")]
pub trait GripTarget {
    /// The simulated body, if the target has one.
    fn body(&self) -> Option<BodyId> {
        None
    }

    /// Current world pose.
    fn world_transform(&self) -> Transform;

    /// Moves the target.
    fn set_world_transform(&mut self, transform: &Transform, mode: MoveMode) -> MoveOutcome;

    /// True if a sweep from the current pose to `transform` would be blocked.
    fn sweep_blocked(&self, transform: &Transform) -> bool {
        false
    }

    /// World pose of the target's attach parent, if it has one.
    fn attach_parent_transform(&self) -> Option<Transform> {
        None
    }

    /// The entity this target belongs to, for child grip notifications.
    fn parent(&self) -> Option<TargetId> {
        None
    }

    /// Static targets cannot be moved by most collision modes.
    fn is_movable(&self) -> bool {
        true
    }

    /// True if the body is simulating physics.
    fn is_simulating_physics(&self) -> bool {
        false
    }

    /// Turns simulation on or off.
    fn set_simulate_physics(&mut self, simulate: bool) {}

    /// Turns gravity on or off.
    fn set_gravity_enabled(&mut self, enabled: bool) {}

    /// Sets the body's velocities.
    fn set_velocities(&mut self, linear: Vec3, angular: Vec3) {}

    /// Rotation of the root bone for skeletal targets.
    fn root_bone_rotation(&self) -> Transform {
        Transform::IDENTITY
    }

    /// True if the target replicates its own movement.
    fn replicates_movement(&self) -> bool {
        false
    }

    /// True if `controller` may not grip the target.
    fn deny_gripping(&self, controller: ControllerId) -> bool {
        false
    }

    /// Gameplay type of the object.
    fn object_type(&self) -> Option<&str> {
        None
    }

    /// Collision mode for slot grips.
    ///
    /// Targets without a body are swept, since there is nothing to attach a
    /// joint to.
    fn slot_grip_type(&self) -> GripCollisionType {
        default_grip_type(self.body())
    }

    /// Collision mode for free grips. Same default as
    /// [`slot_grip_type`](Self::slot_grip_type).
    fn free_grip_type(&self) -> GripCollisionType {
        default_grip_type(self.body())
    }

    /// True if several controllers may hold the target at once.
    fn allows_multiple_grips(&self) -> bool {
        false
    }

    /// The closest primary slot in range of `location`.
    fn closest_primary_slot(&self, location: Vec3, controller: ControllerId) -> Option<GripSlot> {
        None
    }

    /// The closest secondary slot in range of `location`.
    fn closest_secondary_slot(&self, location: Vec3, controller: ControllerId) -> Option<GripSlot> {
        None
    }

    /// How a second hand influences the target.
    fn secondary_grip_type(&self) -> SecondaryGripType {
        SecondaryGripType::None
    }

    /// True if the target should simulate once released.
    fn simulate_on_drop(&self) -> bool {
        true
    }

    /// Default `(stiffness, damping)` for grips on this target.
    fn grip_stiffness_and_damping(&self) -> (f32, f32) {
        (1500.0, 200.0)
    }

    /// Settings copied into each grip.
    fn advanced_grip_settings(&self) -> AdvancedGripSettings {
        AdvancedGripSettings::default()
    }

    /// Distance at which a grip breaks. Zero disables breaking.
    fn grip_break_distance(&self) -> f32 {
        0.0
    }

    /// Late update setting for grips on this target.
    fn late_update_setting(&self) -> GripLateUpdateSettings {
        GripLateUpdateSettings::AlwaysOff
    }

    /// Replication mode for grips on this target.
    fn movement_replication(&self) -> GripMovementReplication {
        GripMovementReplication::ForceClientSideMovement
    }

    /// What happens on teleport.
    fn teleport_behavior(&self) -> TeleportBehavior {
        TeleportBehavior::DropOnTeleport
    }

    /// Controllers currently holding the target.
    fn held_by(&self) -> &[GripHolder] {
        &[]
    }

    /// Adds, updates or removes a holder entry.
    fn set_held(&mut self, holder: GripHolder, held: bool) {}

    /// Policies deciding how the target is held.
    fn grip_policies(&self) -> &[GripPolicy] {
        &[]
    }

    /// Mutable access to the policies.
    fn grip_policies_mut(&mut self) -> &mut [GripPolicy] {
        &mut []
    }

    /// The target was gripped.
    fn on_grip(&mut self, controller: ControllerId, grip: &GripRecord) {}

    /// The target was released.
    fn on_grip_release(&mut self, controller: ControllerId, grip: &GripRecord, kind: ReleaseKind) {}

    /// A second hand attached.
    fn on_secondary_grip(&mut self, controller: ControllerId, component: ComponentId, grip: &GripRecord) {}

    /// A second hand let go.
    fn on_secondary_grip_release(&mut self, controller: ControllerId, grip: &GripRecord) {}

    /// A child of this target was gripped.
    fn on_child_grip(&mut self, controller: ControllerId, child: TargetId, grip: &GripRecord) {}

    /// A child of this target was released.
    fn on_child_grip_release(
        &mut self,
        controller: ControllerId,
        child: TargetId,
        grip: &GripRecord,
        kind: ReleaseKind,
    ) {
    }

    /// Per-tick update for [`GripCollisionType::CustomGrip`] grips.
    fn tick_grip(&mut self, controller: ControllerId, grip: &GripRecord, delta_time: f32) {}
}

/// A notification a [`Grippable`] received.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GripNotification {
    /// Gripped.
    Gripped(GripPair),
    /// Released.
    Released(GripPair, ReleaseKind),
    /// Second hand attached.
    SecondaryGripped(GripPair, ComponentId),
    /// Second hand let go.
    SecondaryReleased(GripPair),
    /// A child was gripped.
    ChildGripped(GripPair, TargetId),
    /// A child was released.
    ChildReleased(GripPair, TargetId, ReleaseKind),
    /// Custom grip tick.
    Ticked(GripPair, f32),
}

/// Grip preferences of a [`Grippable`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripInterfaceProperties {
    /// Refuse every grip.
    pub deny_gripping: bool,
    /// Gameplay type.
    pub object_type: Option<String>,
    /// Collision mode for slot grips.
    pub slot_grip_type: GripCollisionType,
    /// Collision mode for free grips.
    pub free_grip_type: GripCollisionType,
    /// Allow several controllers at once.
    pub allow_multiple_grips: bool,
    /// Second hand behavior.
    pub secondary_grip_type: SecondaryGripType,
    /// Simulate after release.
    pub simulate_on_drop: bool,
    /// Grip stiffness.
    pub stiffness: f32,
    /// Grip damping.
    pub damping: f32,
    /// Advanced settings.
    pub advanced: AdvancedGripSettings,
    /// Break distance, zero to disable.
    pub break_distance: f32,
    /// Slots snap within this distance.
    pub slot_range: f32,
    /// Late update setting.
    pub late_update: GripLateUpdateSettings,
    /// Replication mode.
    pub movement_replication: GripMovementReplication,
    /// Teleport behavior.
    pub teleport_behavior: TeleportBehavior,
}

impl GripInterfaceProperties {
    /// Defaults for a freely grippable prop.
    pub const DEFAULT: Self = Self {
        deny_gripping: false,
        object_type: None,
        slot_grip_type: GripCollisionType::ManipulationGrip,
        free_grip_type: GripCollisionType::ManipulationGrip,
        allow_multiple_grips: false,
        secondary_grip_type: SecondaryGripType::None,
        simulate_on_drop: true,
        stiffness: 1500.0,
        damping: 200.0,
        advanced: AdvancedGripSettings {
            grip_priority: 1,
            physics: None,
            secondary: crate::SecondaryGripSettings {
                smoothing: None,
                scale_limits: None,
            },
        },
        break_distance: 0.0,
        slot_range: 20.0,
        late_update: GripLateUpdateSettings::AlwaysOff,
        movement_replication: GripMovementReplication::ForceClientSideMovement,
        teleport_behavior: TeleportBehavior::DropOnTeleport,
    };
}

impl Default for GripInterfaceProperties {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A ready-made [`GripTarget`] backed by plain data.
///
/// The owner feeds it collision state (`blocked`) and reads back its pose,
/// simulation flags and the notifications it received.
#[derive(Debug, Default)]
pub struct Grippable {
    /// Grip preferences.
    pub properties: GripInterfaceProperties,
    /// Current world pose.
    pub transform: Transform,
    /// Attach parent pose, if attached.
    pub parent_transform: Option<Transform>,
    /// Owning entity.
    pub parent: Option<TargetId>,
    /// Simulated body.
    pub body: Option<BodyId>,
    /// Static targets refuse most grips.
    pub movable: bool,
    /// Replicates its own movement.
    pub replicates_movement: bool,
    /// True while simulating.
    pub simulating: bool,
    /// True while gravity applies.
    pub gravity: bool,
    /// Last velocities applied.
    pub velocities: (Vec3, Vec3),
    /// Sweeps stop short while set.
    pub blocked: bool,
    /// Primary snap points.
    pub primary_slots: Vec<GripSlot>,
    /// Secondary snap points.
    pub secondary_slots: Vec<GripSlot>,
    /// Hold behaviors.
    pub policies: Vec<GripPolicy>,
    holders: Vec<GripHolder>,
    notifications: Vec<GripNotification>,
}

impl Grippable {
    /// A movable, gravity-affected target at `transform`.
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            movable: true,
            gravity: true,
            ..Default::default()
        }
    }

    /// Replaces the properties.
    pub fn with_properties(mut self, properties: GripInterfaceProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Adds a policy.
    pub fn with_policy(mut self, policy: impl Into<GripPolicy>) -> Self {
        self.policies.push(policy.into());
        self
    }

    /// Attaches a simulated body.
    pub fn with_body(mut self, body: BodyId) -> Self {
        self.body = Some(body);
        self
    }

    /// Takes the notifications received since the last call.
    pub fn drain_notifications(&mut self) -> Vec<GripNotification> {
        core::mem::take(&mut self.notifications)
    }

    fn closest_slot(&self, slots: &[GripSlot], location: Vec3) -> Option<GripSlot> {
        let range_squared = self.properties.slot_range * self.properties.slot_range;
        slots
            .iter()
            .map(|slot| {
                let world = slot.transform.then(&self.transform).translation;
                (slot, world.distance_squared(location))
            })
            .filter(|(_, distance)| *distance <= range_squared)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(slot, _)| slot.clone())
    }
}

impl GripTarget for Grippable {
    fn body(&self) -> Option<BodyId> {
        self.body
    }

    fn world_transform(&self) -> Transform {
        self.transform
    }

    fn set_world_transform(&mut self, transform: &Transform, mode: MoveMode) -> MoveOutcome {
        if mode == MoveMode::Sweep && self.blocked {
            return MoveOutcome { blocked: true };
        }
        self.transform = *transform;
        MoveOutcome::default()
    }

    fn sweep_blocked(&self, _transform: &Transform) -> bool {
        self.blocked
    }

    fn attach_parent_transform(&self) -> Option<Transform> {
        self.parent_transform
    }

    fn parent(&self) -> Option<TargetId> {
        self.parent
    }

    fn is_movable(&self) -> bool {
        self.movable
    }

    fn is_simulating_physics(&self) -> bool {
        self.simulating
    }

    fn set_simulate_physics(&mut self, simulate: bool) {
        self.simulating = simulate;
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity = enabled;
    }

    fn set_velocities(&mut self, linear: Vec3, angular: Vec3) {
        self.velocities = (linear, angular);
    }

    fn replicates_movement(&self) -> bool {
        self.replicates_movement
    }

    fn deny_gripping(&self, _controller: ControllerId) -> bool {
        self.properties.deny_gripping
    }

    fn object_type(&self) -> Option<&str> {
        self.properties.object_type.as_deref()
    }

    fn slot_grip_type(&self) -> GripCollisionType {
        self.properties.slot_grip_type
    }

    fn free_grip_type(&self) -> GripCollisionType {
        self.properties.free_grip_type
    }

    fn allows_multiple_grips(&self) -> bool {
        self.properties.allow_multiple_grips
    }

    fn closest_primary_slot(&self, location: Vec3, _controller: ControllerId) -> Option<GripSlot> {
        self.closest_slot(&self.primary_slots, location)
    }

    fn closest_secondary_slot(&self, location: Vec3, _controller: ControllerId) -> Option<GripSlot> {
        self.closest_slot(&self.secondary_slots, location)
    }

    fn secondary_grip_type(&self) -> SecondaryGripType {
        self.properties.secondary_grip_type
    }

    fn simulate_on_drop(&self) -> bool {
        self.properties.simulate_on_drop
    }

    fn grip_stiffness_and_damping(&self) -> (f32, f32) {
        (self.properties.stiffness, self.properties.damping)
    }

    fn advanced_grip_settings(&self) -> AdvancedGripSettings {
        self.properties.advanced
    }

    fn grip_break_distance(&self) -> f32 {
        self.properties.break_distance
    }

    fn late_update_setting(&self) -> GripLateUpdateSettings {
        self.properties.late_update
    }

    fn movement_replication(&self) -> GripMovementReplication {
        self.properties.movement_replication
    }

    fn teleport_behavior(&self) -> TeleportBehavior {
        self.properties.teleport_behavior
    }

    fn held_by(&self) -> &[GripHolder] {
        &self.holders
    }

    fn set_held(&mut self, holder: GripHolder, held: bool) {
        let existing = self.holders.iter().position(|h| h.pair == holder.pair);
        match (existing, held) {
            (Some(index), true) => self.holders[index] = holder,
            (None, true) => self.holders.push(holder),
            (Some(index), false) => {
                self.holders.remove(index);
            }
            (None, false) => {}
        }
    }

    fn grip_policies(&self) -> &[GripPolicy] {
        &self.policies
    }

    fn grip_policies_mut(&mut self) -> &mut [GripPolicy] {
        &mut self.policies
    }

    fn on_grip(&mut self, controller: ControllerId, grip: &GripRecord) {
        self.notifications
            .push(GripNotification::Gripped(GripPair::new(controller, grip.id)));
    }

    fn on_grip_release(&mut self, controller: ControllerId, grip: &GripRecord, kind: ReleaseKind) {
        self.notifications
            .push(GripNotification::Released(GripPair::new(controller, grip.id), kind));
    }

    fn on_secondary_grip(&mut self, controller: ControllerId, component: ComponentId, grip: &GripRecord) {
        self.notifications.push(GripNotification::SecondaryGripped(
            GripPair::new(controller, grip.id),
            component,
        ));
    }

    fn on_secondary_grip_release(&mut self, controller: ControllerId, grip: &GripRecord) {
        self.notifications
            .push(GripNotification::SecondaryReleased(GripPair::new(controller, grip.id)));
    }

    fn on_child_grip(&mut self, controller: ControllerId, child: TargetId, grip: &GripRecord) {
        self.notifications.push(GripNotification::ChildGripped(
            GripPair::new(controller, grip.id),
            child,
        ));
    }

    fn on_child_grip_release(
        &mut self,
        controller: ControllerId,
        child: TargetId,
        grip: &GripRecord,
        kind: ReleaseKind,
    ) {
        self.notifications.push(GripNotification::ChildReleased(
            GripPair::new(controller, grip.id),
            child,
            kind,
        ));
    }

    fn tick_grip(&mut self, controller: ControllerId, grip: &GripRecord, delta_time: f32) {
        self.notifications
            .push(GripNotification::Ticked(GripPair::new(controller, grip.id), delta_time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GripId;

    fn holder(controller: u32, grip: u8) -> GripHolder {
        GripHolder {
            pair: GripPair::new(ControllerId(controller), GripId::new(grip).unwrap()),
            relative_transform: Transform::IDENTITY,
            is_slot_grip: false,
            secondary_location: None,
        }
    }

    #[test]
    fn set_held_upserts_and_removes() {
        let mut target = Grippable::new(Transform::IDENTITY);
        target.set_held(holder(1, 1), true);
        let mut moved = holder(1, 1);
        moved.is_slot_grip = true;
        target.set_held(moved, true);
        target.set_held(holder(2, 1), true);
        assert_eq!(target.held_by().len(), 2);
        assert!(target.held_by()[0].is_slot_grip);
        target.set_held(holder(1, 1), false);
        assert_eq!(target.held_by().len(), 1);
        assert_eq!(target.held_by()[0].pair.controller, ControllerId(2));
    }

    #[test]
    fn closest_slot_respects_range() {
        let mut target = Grippable::new(Transform::from_xyz(10.0, 0.0, 0.0));
        target.primary_slots = alloc::vec![
            GripSlot {
                name: "grip".into(),
                transform: Transform::from_xyz(1.0, 0.0, 0.0),
            },
            GripSlot {
                name: "stock".into(),
                transform: Transform::from_xyz(-5.0, 0.0, 0.0),
            },
        ];
        let near = target.closest_primary_slot(Vec3::new(11.5, 0.0, 0.0), ControllerId(0));
        assert_eq!(near.map(|s| s.name), Some("grip".into()));
        let far = target.closest_primary_slot(Vec3::new(100.0, 0.0, 0.0), ControllerId(0));
        assert!(far.is_none());
    }

    #[test]
    fn sweep_stops_when_blocked() {
        let mut target = Grippable::new(Transform::IDENTITY);
        target.blocked = true;
        let goal = Transform::from_xyz(0.0, 1.0, 0.0);
        assert!(target.set_world_transform(&goal, MoveMode::Sweep).blocked);
        assert_eq!(target.transform, Transform::IDENTITY);
        assert!(!target.set_world_transform(&goal, MoveMode::Teleport).blocked);
        assert_eq!(target.transform, goal);
    }

    struct Lever {
        body: Option<BodyId>,
    }

    impl GripTarget for Lever {
        fn body(&self) -> Option<BodyId> {
            self.body
        }

        fn world_transform(&self) -> Transform {
            Transform::IDENTITY
        }

        fn set_world_transform(&mut self, _transform: &Transform, _mode: MoveMode) -> MoveOutcome {
            MoveOutcome::default()
        }
    }

    #[test]
    fn bodiless_targets_default_to_sweeping() {
        let lever = Lever { body: None };
        assert_eq!(lever.free_grip_type(), GripCollisionType::InteractiveCollisionWithSweep);
        assert_eq!(lever.slot_grip_type(), GripCollisionType::InteractiveCollisionWithSweep);
        assert!(!lever.free_grip_type().requires_physics_handle());

        let lever = Lever {
            body: Some(BodyId(3)),
        };
        assert_eq!(lever.free_grip_type(), GripCollisionType::ManipulationGrip);
        assert_eq!(lever.slot_grip_type(), GripCollisionType::ManipulationGrip);
    }

    #[test]
    fn secondary_type_capabilities() {
        assert!(!SecondaryGripType::None.allows_secondary());
        assert!(SecondaryGripType::SlotOnlyRetain.requires_slot());
        assert!(SecondaryGripType::ScalingOnly.scales());
        assert!(!SecondaryGripType::ScalingOnly.rotates());
        assert!(SecondaryGripType::FreeRetain.retains_on_release());
        assert!(!SecondaryGripType::Free.retains_on_release());
    }
}
