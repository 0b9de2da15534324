//! Per-grip state owned by a controller.

use alloc::string::String;

use bevy_math::Vec3;
use bevy_transform::components::Transform;
use vr_grip_math::{OneEuroConfig, OneEuroFilter, TransformExt};

use crate::{ComponentId, DriveType, GripId, TargetId};

/// How a held object is moved toward the hand.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum GripCollisionType {
    /// Physics joint; collides with the world and may be pushed off the hand.
    #[default]
    InteractiveCollisionWithPhysics,
    /// Swept kinematic move; stops at blocking geometry.
    InteractiveCollisionWithSweep,
    /// Swept kinematic move that switches to a physics joint while blocked.
    InteractiveHybridCollisionWithSweep,
    /// Swept kinematic move that never attaches a joint.
    SweepWithPhysics,
    /// Teleporting kinematic move with no collision response.
    PhysicsOnly,
    /// Joint that drives position only; rotation is free.
    ManipulationGrip,
    /// Like [`GripCollisionType::ManipulationGrip`], but twist follows the wrist.
    ManipulationGripWithWristTwist,
    /// The target moves itself from [`GripTarget::tick_grip`](crate::GripTarget::tick_grip).
    CustomGrip,
    /// Nothing moves; only lifecycle notifications are sent.
    EventsOnly,
}

impl GripCollisionType {
    /// True if the grip is backed by a physics joint whenever it is active.
    pub const fn requires_physics_handle(self) -> bool {
        matches!(
            self,
            Self::InteractiveCollisionWithPhysics
                | Self::ManipulationGrip
                | Self::ManipulationGripWithWristTwist
        )
    }

    /// True if the grip may use a physics joint at all.
    pub const fn may_use_physics_handle(self) -> bool {
        self.requires_physics_handle() || matches!(self, Self::InteractiveHybridCollisionWithSweep)
    }

    /// True for the manipulation variants.
    pub const fn is_manipulation(self) -> bool {
        matches!(self, Self::ManipulationGrip | Self::ManipulationGripWithWristTwist)
    }

    /// True if the manager moves the target itself.
    pub const fn is_driven_by_manager(self) -> bool {
        !matches!(self, Self::CustomGrip | Self::EventsOnly)
    }

    /// The kinematic mode a grip degrades to when its joint cannot be created.
    pub const fn kinematic_fallback(self) -> Option<Self> {
        match self {
            Self::InteractiveCollisionWithPhysics | Self::InteractiveHybridCollisionWithSweep => {
                Some(Self::InteractiveCollisionWithSweep)
            }
            _ => None,
        }
    }

    /// True if a change from `self` to `other` cannot be applied to an
    /// existing joint and needs a new one.
    pub const fn is_categorical_change(self, other: Self) -> bool {
        !matches!(
            (self, other),
            (Self::ManipulationGrip, Self::ManipulationGrip)
                | (
                    Self::ManipulationGripWithWristTwist,
                    Self::ManipulationGripWithWristTwist
                )
                | (
                    Self::InteractiveCollisionWithPhysics,
                    Self::InteractiveCollisionWithPhysics
                )
                | (
                    Self::InteractiveHybridCollisionWithSweep,
                    Self::InteractiveHybridCollisionWithSweep
                )
                | (
                    Self::InteractiveCollisionWithPhysics,
                    Self::InteractiveHybridCollisionWithSweep
                )
                | (
                    Self::InteractiveHybridCollisionWithSweep,
                    Self::InteractiveCollisionWithPhysics
                )
        )
    }
}

/// When render-time late updates may move the held object.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum GripLateUpdateSettings {
    /// Always.
    AlwaysOn,
    /// Never.
    AlwaysOff,
    /// Not while the object is blocked.
    NotWhenColliding,
    /// Not while a secondary hand is attached.
    NotWhenDoubleGripping,
    /// Not while blocked or double gripping.
    #[default]
    NotWhenCollidingOrDoubleGripping,
}

/// Which peer moves the held object.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum GripMovementReplication {
    /// Keep what the target does; resolved at grip time.
    KeepOriginalMovement,
    /// The authority moves the object.
    ForceServerSideMovement,
    /// The owning client moves the object.
    #[default]
    ForceClientSideMovement,
    /// Local only; never replicated and never gated by authority.
    LocalOnlyNotReplicated,
}

impl GripMovementReplication {
    /// Resolves [`GripMovementReplication::KeepOriginalMovement`] from whether the
    /// target replicates its own movement.
    pub const fn resolve(self, target_replicates_movement: bool) -> Self {
        match self {
            Self::KeepOriginalMovement if target_replicates_movement => Self::ForceServerSideMovement,
            Self::KeepOriginalMovement => Self::ForceClientSideMovement,
            other => other,
        }
    }
}

/// What kind of entity a grip holds.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum GripTargetType {
    /// A whole actor, moved through its root.
    #[default]
    Actor,
    /// A single component.
    Component,
}

/// Progress of the blend into or out of a two-hand pose.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LerpState {
    /// Blending from the one-hand pose into the two-hand pose.
    StartLerp,
    /// Blending from the two-hand pose back to the one-hand pose.
    EndLerp,
    /// No blend in flight.
    #[default]
    NotLerping,
}

/// Where the joint anchors relative to the body's center of mass.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ComPlacement {
    /// Grip at the controller for manipulation grips, otherwise
    /// [`ComPlacement::SetAndGripAt`].
    #[default]
    Default,
    /// Anchor at the body's existing center of mass.
    GripAt,
    /// Anchor at the controller location without moving the center of mass.
    GripAtControllerLoc,
    /// Move the center of mass to the grip location and anchor there.
    SetAndGripAt,
    /// Anchor at the body origin.
    AtPivot,
}

impl ComPlacement {
    /// Resolves [`ComPlacement::Default`] for the given collision mode.
    pub const fn resolve(self, collision_type: GripCollisionType) -> Self {
        match self {
            Self::Default if collision_type.is_manipulation() => Self::GripAtControllerLoc,
            Self::Default => Self::SetAndGripAt,
            other => other,
        }
    }
}

/// Spring constants.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Spring {
    /// Stiffness.
    pub stiffness: f32,
    /// Damping.
    pub damping: f32,
}

/// Per-target physics overrides for the grip joint.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsGripSettings {
    /// Drive type of both drives.
    pub drive_type: DriveType,
    /// Anchor placement.
    pub com_placement: ComPlacement,
    /// Leave the body's simulation flag alone when the joint is created.
    pub skip_setting_simulating: bool,
    /// Disable gravity while held.
    pub turn_off_gravity_during_grip: bool,
    /// Angular spring used instead of the derived one.
    pub custom_angular: Option<Spring>,
    /// Limits linear force to `stiffness * coefficient`.
    pub linear_max_force_coefficient: Option<f32>,
    /// Limits angular force to `stiffness * coefficient`.
    pub angular_max_force_coefficient: Option<f32>,
}

impl PhysicsGripSettings {
    /// Acceleration drives, default anchor placement, no limits.
    pub const DEFAULT: Self = Self {
        drive_type: DriveType::Acceleration,
        com_placement: ComPlacement::Default,
        skip_setting_simulating: false,
        turn_off_gravity_during_grip: false,
        custom_angular: None,
        linear_max_force_coefficient: None,
        angular_max_force_coefficient: None,
    };
}

impl Default for PhysicsGripSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-axis bounds on the world scale a two-hand grip may produce.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleLimits {
    /// Smallest allowed scale.
    pub min: Vec3,
    /// Largest allowed scale.
    pub max: Vec3,
}

impl ScaleLimits {
    /// A tenth to ten times.
    pub const DEFAULT: Self = Self {
        min: Vec3::splat(0.1),
        max: Vec3::splat(10.0),
    };
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-target secondary grip tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SecondaryGripSettings {
    /// Smooth the secondary hand with this filter; `None` disables smoothing.
    pub smoothing: Option<OneEuroConfig>,
    /// Clamp scaling secondary grips to these bounds.
    pub scale_limits: Option<ScaleLimits>,
}

/// Advanced settings a target hands to each grip.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AdvancedGripSettings {
    /// Higher priority grips win when several objects could be gripped.
    pub grip_priority: u8,
    /// Physics overrides, if any.
    pub physics: Option<PhysicsGripSettings>,
    /// Secondary grip tuning.
    pub secondary: SecondaryGripSettings,
}

/// The second hand's influence on a grip.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SecondaryGripInfo {
    /// The tracked component acting as the second hand, while attached.
    pub attachment: Option<ComponentId>,
    /// Offset of the second hand relative to the object when it attached.
    pub relative_transform: Transform,
    /// True if the second hand snapped to a secondary slot.
    pub is_slot_grip: bool,
    /// The secondary slot, for slot grips.
    pub slot_name: Option<String>,
    /// Blend state.
    pub lerp_state: LerpState,
    /// Seconds elapsed in the current blend.
    pub lerp_elapsed: f32,
    /// Length of the current blend in seconds.
    pub lerp_duration: f32,
    /// Pivot-relative location of the second hand on the last resolved tick.
    pub last_relative_location: Vec3,
    distance: f32,
    #[cfg_attr(feature = "serialize", serde(skip))]
    smoothing: Option<OneEuroFilter<Vec3>>,
}

impl SecondaryGripInfo {
    /// No second hand.
    pub const EMPTY: Self = Self {
        attachment: None,
        relative_transform: Transform::IDENTITY,
        is_slot_grip: false,
        slot_name: None,
        lerp_state: LerpState::NotLerping,
        lerp_elapsed: 0.0,
        lerp_duration: 0.0,
        last_relative_location: Vec3::ZERO,
        distance: 0.0,
        smoothing: None,
    };

    /// True while a second hand is attached.
    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }

    /// True while the second hand still shapes the pose, including the release blend.
    pub fn influences_pose(&self) -> bool {
        self.has_attachment() || self.lerp_state == LerpState::EndLerp
    }

    /// How far the second hand has strayed from where it attached, as of the
    /// last resolved tick.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub(crate) fn set_distance(&mut self, distance: f32) {
        self.distance = distance;
    }

    /// Starts a blend of `duration` seconds, or ends any blend if it is not positive.
    pub fn begin_lerp(&mut self, state: LerpState, duration: f32) {
        if duration > 0.0 && state != LerpState::NotLerping {
            self.lerp_state = state;
            self.lerp_duration = duration;
        } else {
            self.lerp_state = LerpState::NotLerping;
            self.lerp_duration = 0.0;
        }
        self.lerp_elapsed = 0.0;
    }

    /// Advances the blend clock by `delta_time` and returns the blend factor for
    /// this tick, or `None` when no blend is in flight.
    ///
    /// The factor never decreases. The tick it reaches `1.0`, the state becomes
    /// [`LerpState::NotLerping`].
    pub(crate) fn advance_lerp(&mut self, delta_time: f32) -> Option<f32> {
        if self.lerp_state == LerpState::NotLerping {
            return None;
        }
        if self.lerp_duration <= 0.0 {
            self.begin_lerp(LerpState::NotLerping, 0.0);
            return Some(1.0);
        }
        self.lerp_elapsed = (self.lerp_elapsed + delta_time.max(0.0)).min(self.lerp_duration);
        let factor = (self.lerp_elapsed / self.lerp_duration).clamp(0.0, 1.0);
        if factor >= 1.0 {
            self.lerp_state = LerpState::NotLerping;
            self.lerp_elapsed = 0.0;
            self.lerp_duration = 0.0;
        }
        Some(factor)
    }

    /// The blend factor the current state would report without advancing.
    pub fn lerp_factor(&self) -> Option<f32> {
        match self.lerp_state {
            LerpState::NotLerping => None,
            _ if self.lerp_duration <= 0.0 => Some(1.0),
            _ => Some((self.lerp_elapsed / self.lerp_duration).clamp(0.0, 1.0)),
        }
    }

    /// Runs the configured smoothing filter over the second hand's location.
    pub(crate) fn smooth(&mut self, config: Option<OneEuroConfig>, location: Vec3, delta_time: f32) -> Vec3 {
        match config {
            Some(config) => self
                .smoothing
                .get_or_insert_with(|| OneEuroFilter::new(config))
                .run(location, delta_time),
            None => location,
        }
    }

    /// Forgets the attachment but keeps what an end blend needs.
    pub(crate) fn detach(&mut self) {
        self.attachment = None;
        self.is_slot_grip = false;
        self.slot_name = None;
        self.smoothing = None;
    }

    /// Clears everything, cancelling any blend.
    pub(crate) fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for SecondaryGripInfo {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One active grip on one controller.
///
/// `id` is the only identity: a target may be released and gripped again before
/// the old record is cleaned up, so records are never looked up by target alone
/// when an id is available.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripRecord {
    /// Unique among this controller's active grips.
    pub id: GripId,
    /// The held target.
    pub target: TargetId,
    /// What kind of entity the target is.
    pub target_type: GripTargetType,
    /// The target's gameplay type at grip time.
    pub object_type: Option<String>,
    /// How the target is moved.
    pub collision_type: GripCollisionType,
    /// Late-update suppression.
    pub late_update: GripLateUpdateSettings,
    /// The target's pose relative to the controller pivot at grip time.
    pub relative_transform: Transform,
    /// Extra offset applied between the relative transform and the pivot.
    pub addition_transform: Transform,
    /// True if the grip snapped to a slot.
    pub is_slot_grip: bool,
    /// Slot or bone the grip snapped to.
    pub slot_name: Option<String>,
    /// Who moves the object, already resolved.
    pub movement_replication: GripMovementReplication,
    /// Linear drive stiffness.
    pub stiffness: f32,
    /// Linear drive damping.
    pub damping: f32,
    /// Settings copied from the target at grip time.
    pub advanced: AdvancedGripSettings,
    /// Paused grips are not resolved.
    pub paused: bool,
    /// True while the target is blocked by geometry.
    pub colliding: bool,
    /// Distance between the resolved and the actual pose on the last check.
    pub distance: f32,
    /// The second hand.
    pub secondary: SecondaryGripInfo,
    /// Whether the target was simulating physics when it was gripped.
    pub was_simulating: bool,
    pub(crate) skip_break_check: bool,
}

impl GripRecord {
    /// A record with default settings for `target`.
    pub fn new(id: GripId, target: TargetId, collision_type: GripCollisionType) -> Self {
        Self {
            id,
            target,
            target_type: GripTargetType::Actor,
            object_type: None,
            collision_type,
            late_update: GripLateUpdateSettings::default(),
            relative_transform: Transform::IDENTITY,
            addition_transform: Transform::IDENTITY,
            is_slot_grip: false,
            slot_name: None,
            movement_replication: GripMovementReplication::default(),
            stiffness: 1500.0,
            damping: 200.0,
            advanced: AdvancedGripSettings::default(),
            paused: false,
            colliding: false,
            distance: 0.0,
            secondary: SecondaryGripInfo::EMPTY,
            was_simulating: false,
            skip_break_check: false,
        }
    }

    /// `relative ∘ addition ∘ pivot`, the pose before any policy runs.
    pub fn base_world_transform(&self, pivot: &Transform) -> Transform {
        self.relative_transform
            .then(&self.addition_transform)
            .then(pivot)
    }

    /// True if the grip is not moved through this controller's authority check.
    pub fn is_local_only(&self) -> bool {
        self.movement_replication == GripMovementReplication::LocalOnlyNotReplicated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lerp_factor_is_monotonic_and_finishes_once() {
        let mut secondary = SecondaryGripInfo::EMPTY;
        secondary.begin_lerp(LerpState::StartLerp, 0.5);
        assert_eq!(secondary.advance_lerp(0.0), Some(0.0));

        let mut last = 0.0;
        let mut finished = 0;
        for _ in 0..20 {
            let before = secondary.lerp_state;
            match secondary.advance_lerp(0.07) {
                Some(factor) => {
                    assert!(factor >= last);
                    last = factor;
                }
                None => assert_eq!(before, LerpState::NotLerping),
            }
            if before != LerpState::NotLerping && secondary.lerp_state == LerpState::NotLerping {
                finished += 1;
            }
        }
        assert_relative_eq!(last, 1.0);
        assert_eq!(finished, 1);
    }

    #[test]
    fn non_positive_duration_does_not_lerp() {
        let mut secondary = SecondaryGripInfo::EMPTY;
        secondary.begin_lerp(LerpState::EndLerp, 0.0);
        assert_eq!(secondary.lerp_state, LerpState::NotLerping);
        assert_eq!(secondary.advance_lerp(0.1), None);
    }

    #[test]
    fn keep_original_movement_follows_target() {
        let keep = GripMovementReplication::KeepOriginalMovement;
        assert_eq!(keep.resolve(true), GripMovementReplication::ForceServerSideMovement);
        assert_eq!(keep.resolve(false), GripMovementReplication::ForceClientSideMovement);
        let local = GripMovementReplication::LocalOnlyNotReplicated;
        assert_eq!(local.resolve(true), local);
    }

    #[test]
    fn categorical_collision_changes() {
        use GripCollisionType::*;
        assert!(!InteractiveCollisionWithPhysics.is_categorical_change(InteractiveHybridCollisionWithSweep));
        assert!(InteractiveCollisionWithPhysics.is_categorical_change(ManipulationGrip));
        assert!(ManipulationGrip.is_categorical_change(ManipulationGripWithWristTwist));
        assert!(!ManipulationGrip.is_categorical_change(ManipulationGrip));
    }

    #[test]
    fn default_com_placement_depends_on_collision() {
        assert_eq!(
            ComPlacement::Default.resolve(GripCollisionType::ManipulationGrip),
            ComPlacement::GripAtControllerLoc
        );
        assert_eq!(
            ComPlacement::Default.resolve(GripCollisionType::InteractiveCollisionWithPhysics),
            ComPlacement::SetAndGripAt
        );
        assert_eq!(
            ComPlacement::AtPivot.resolve(GripCollisionType::ManipulationGrip),
            ComPlacement::AtPivot
        );
    }
}
