//! Per-target hold behaviors.
//!
//! A target declares a list of [`GripPolicy`] values. Each tick the manager
//! asks the active ones where the held object should be: policies that
//! override the transform compute it from scratch, policies that modify it
//! adjust the result in order. When no active policy overrides, the built-in
//! [`DefaultPolicy`] resolution runs first.

mod default;
mod gun_tools;
mod interactible;
mod lerp_to_hand;
mod melee;
mod physics;

pub use default::*;
pub use gun_tools::*;
pub use interactible::*;
pub use lerp_to_hand::*;
pub use melee::*;
pub use physics::*;

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use bevy_math::Vec3;
use bevy_transform::components::Transform;

use crate::{
    ComPlacement, ControllerId, GripError, GripEvent, GripHolder, GripRecord, GripScene, GripSettings,
    HandleSettings, InvalidTargetReason, ReleaseKind, SecondaryGripType, TargetId,
};

/// How a policy's [`GripPolicyBehavior::world_transform`] result is used.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformOverride {
    /// The policy does not touch the transform.
    #[default]
    None,
    /// The policy computes the transform from scratch.
    Overrides,
    /// The policy adjusts the transform computed before it.
    Modifies,
}

/// What a policy sees of the held target, captured before policies run.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSnapshot {
    /// The target.
    pub id: TargetId,
    /// Current world pose.
    pub transform: Transform,
    /// Attach parent pose, if attached.
    pub parent_transform: Option<Transform>,
    /// Root bone rotation for skeletal targets.
    pub root_bone_rotation: Transform,
    /// Second hand behavior.
    pub secondary_grip_type: SecondaryGripType,
    /// World location of this grip's second hand, if attached and alive.
    pub secondary_location: Option<Vec3>,
    /// Every controller holding the target.
    pub holders: Vec<GripHolder>,
    /// Headset pose, if tracked.
    pub head_transform: Option<Transform>,
    /// Combined revision of the target's policies.
    pub policy_revision: u32,
}

impl TargetSnapshot {
    /// A snapshot of a target nobody holds, at `transform`.
    pub fn at(id: TargetId, transform: Transform) -> Self {
        Self {
            id,
            transform,
            parent_transform: None,
            root_bone_rotation: Transform::IDENTITY,
            secondary_grip_type: SecondaryGripType::None,
            secondary_location: None,
            holders: Vec::new(),
            head_transform: None,
            policy_revision: 0,
        }
    }

    /// Number of controllers holding the target.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }
}

/// Arguments shared by every policy hook.
pub struct PolicyContext<'a> {
    /// The controller running the hook.
    pub controller: ControllerId,
    /// Seconds since the last tick.
    pub delta_time: f32,
    /// The controller's pivot pose.
    pub pivot: Transform,
    /// The held target.
    pub target: &'a TargetSnapshot,
    /// Shared tunables.
    pub settings: &'a GripSettings,
    /// True while resolving a teleport.
    pub for_teleport: bool,
    /// Events raised by the hook.
    pub events: &'a mut Vec<GripEvent>,
}

impl<'a> PolicyContext<'a> {
    /// A context for a lifecycle hook: no time passes and no teleport is in flight.
    pub fn new(
        controller: ControllerId,
        pivot: Transform,
        target: &'a TargetSnapshot,
        settings: &'a GripSettings,
        events: &'a mut Vec<GripEvent>,
    ) -> Self {
        Self {
            controller,
            delta_time: 0.0,
            pivot,
            target,
            settings,
            for_teleport: false,
            events,
        }
    }
}

/// The capability set of a hold behavior.
///
/// Lifecycle hooks run whether or not the policy is active, so a policy can
/// switch itself on at grip time. Transform and deny queries only reach active
/// policies.
#[expect(unused_variables, reason = "default implementations ignore their arguments")]
pub trait GripPolicyBehavior: fmt::Debug + Send + Sync {
    /// Name used for lookups.
    fn name(&self) -> &str;

    /// Inactive policies are skipped by transform resolution and deny queries.
    fn is_active(&self) -> bool {
        true
    }

    /// How the transform result is used.
    fn transform_override(&self) -> TransformOverride {
        TransformOverride::None
    }

    /// A controller gripped the target.
    fn on_grip(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {}

    /// A controller released the target. The holder list no longer contains it.
    fn on_grip_release(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord, kind: ReleaseKind) {}

    /// A second hand attached to `grip`.
    fn on_secondary_grip(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {}

    /// A second hand let go of `grip`.
    fn on_secondary_grip_release(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {}

    /// Writes this tick's pose into `world`. Returns false when the pose cannot
    /// be computed, in which case the grip falls back to its base pose.
    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        true
    }

    /// Anchor placement to use instead of the grip's own when its joint is built.
    fn com_placement(&self, cx: &PolicyContext<'_>, grip: &GripRecord) -> Option<ComPlacement> {
        None
    }

    /// Adjusts a physics joint and its anchor before the joint is created.
    fn pre_physics_handle(
        &mut self,
        cx: &mut PolicyContext<'_>,
        grip: &GripRecord,
        handle: &mut HandleSettings,
        anchor: &mut Transform,
    ) {
    }

    /// Adjusts a physics joint's settings after they were derived from the grip.
    fn post_physics_handle(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord, handle: &mut HandleSettings) {}

    /// Bumped whenever joints built earlier need rebuilding.
    fn revision(&self) -> u32 {
        0
    }

    /// True if the grip must not break from distance.
    fn wants_deny_auto_drop(&self) -> bool {
        false
    }

    /// True if the grip must end now.
    fn wants_force_drop(&self) -> bool {
        false
    }

    /// True if render-time late updates must not move the object.
    fn wants_deny_late_update(&self) -> bool {
        false
    }

    /// True if `controller` must not carry the object through a teleport.
    fn wants_deny_teleport(&self, controller: ControllerId) -> bool {
        false
    }
}

/// A hold behavior declared by a target.
#[derive(Debug)]
pub enum GripPolicy {
    /// Relative pose plus two-hand aiming.
    Default(DefaultPolicy),
    /// Clamped translation and rotation.
    InteractibleSettings(InteractiblePolicy),
    /// Blend from the pose at grip time to the hand.
    LerpToHand(LerpToHandPolicy),
    /// Recoil, virtual stock and two-hand aiming for guns.
    GunTools(GunToolsPolicy),
    /// Hand roles, center of mass and impact checks for melee weapons.
    Melee(MeleePolicy),
    /// Drive profile selection by hand count.
    Physics(PhysicsPolicy),
    /// User-supplied behavior.
    Custom(Box<dyn GripPolicyBehavior>),
}

impl GripPolicy {
    /// The behavior behind the variant.
    pub fn behavior(&self) -> &dyn GripPolicyBehavior {
        match self {
            Self::Default(policy) => policy,
            Self::InteractibleSettings(policy) => policy,
            Self::LerpToHand(policy) => policy,
            Self::GunTools(policy) => policy,
            Self::Melee(policy) => policy,
            Self::Physics(policy) => policy,
            Self::Custom(policy) => policy.as_ref(),
        }
    }

    /// Mutable access to the behavior behind the variant.
    pub fn behavior_mut(&mut self) -> &mut dyn GripPolicyBehavior {
        match self {
            Self::Default(policy) => policy,
            Self::InteractibleSettings(policy) => policy,
            Self::LerpToHand(policy) => policy,
            Self::GunTools(policy) => policy,
            Self::Melee(policy) => policy,
            Self::Physics(policy) => policy,
            Self::Custom(policy) => policy.as_mut(),
        }
    }

    /// True for an active policy with the given override kind.
    fn active_with(&self, kind: TransformOverride) -> bool {
        let behavior = self.behavior();
        behavior.is_active() && behavior.transform_override() == kind
    }
}

macro_rules! impl_into_policy {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for GripPolicy {
                fn from(policy: $ty) -> Self {
                    Self::$variant(policy)
                }
            }
        )*
    };
}

impl_into_policy!(
    Default(DefaultPolicy),
    InteractibleSettings(InteractiblePolicy),
    LerpToHand(LerpToHandPolicy),
    GunTools(GunToolsPolicy),
    Melee(MeleePolicy),
    Physics(PhysicsPolicy),
    Custom(Box<dyn GripPolicyBehavior>),
);

/// Combined revision of a policy list, compared against the revision a joint
/// was built with.
pub fn policy_revision(policies: &[GripPolicy]) -> u32 {
    policies
        .iter()
        .fold(0u32, |acc, policy| acc.wrapping_add(policy.behavior().revision()))
}

/// True if any active policy satisfies `query`.
pub fn any_active(policies: &[GripPolicy], query: impl Fn(&dyn GripPolicyBehavior) -> bool) -> bool {
    policies
        .iter()
        .map(GripPolicy::behavior)
        .any(|behavior| behavior.is_active() && query(behavior))
}

/// Finds a target's policy by name.
pub fn find_policy<'a>(
    scene: &'a dyn GripScene,
    target: TargetId,
    name: &str,
) -> Result<&'a GripPolicy, GripError> {
    let policies = scene
        .target(target)
        .ok_or(GripError::invalid_target(target, InvalidTargetReason::Missing))?
        .grip_policies();
    policies
        .iter()
        .find(|policy| policy.behavior().name() == name)
        .ok_or_else(|| GripError::PolicyNotFound {
            target,
            name: name.into(),
        })
}

/// Outcome of resolving one grip for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    /// The pose to apply.
    pub transform: Transform,
    /// The pose before any policy ran.
    pub base: Transform,
    /// False if a policy failed and `transform` fell back to `base`.
    pub valid: bool,
}

/// Runs the transform pipeline for one grip.
///
/// `fallback` resolves the transform when no active policy overrides it.
/// Invalid or non-finite results fall back to the base pose.
pub fn resolve_world_transform(
    policies: &mut [GripPolicy],
    fallback: &mut DefaultPolicy,
    cx: &mut PolicyContext<'_>,
    grip: &mut GripRecord,
) -> Resolution {
    use vr_grip_math::TransformExt;

    let base = grip.base_world_transform(&cx.pivot);
    let mut world = base;
    let mut valid = true;

    if !policies
        .iter()
        .any(|policy| policy.active_with(TransformOverride::Overrides))
    {
        valid = fallback.world_transform(cx, &mut world, grip);
    }

    for policy in policies.iter_mut() {
        if !valid {
            break;
        }
        if policy.active_with(TransformOverride::Overrides)
            || policy.active_with(TransformOverride::Modifies)
        {
            valid = policy.behavior_mut().world_transform(cx, &mut world, grip);
        }
    }

    if !valid || !world.is_valid() {
        if valid {
            tracing::warn!(
                controller = ?cx.controller,
                grip = %grip.id,
                "non-finite grip transform, using base pose"
            );
        }
        return Resolution {
            transform: base,
            base,
            valid: false,
        };
    }

    Resolution {
        transform: world,
        base,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, record_with};
    use crate::GripCollisionType;

    #[derive(Debug)]
    struct Broken;

    impl GripPolicyBehavior for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn transform_override(&self) -> TransformOverride {
            TransformOverride::Modifies
        }

        fn world_transform(
            &mut self,
            _cx: &mut PolicyContext<'_>,
            world: &mut Transform,
            _grip: &mut GripRecord,
        ) -> bool {
            world.translation = Vec3::NAN;
            true
        }
    }

    #[test]
    fn non_finite_results_fall_back_to_base() {
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.1,
            pivot: Transform::from_xyz(1.0, 2.0, 3.0),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let mut policies = [GripPolicy::Custom(Box::new(Broken))];
        let resolution =
            resolve_world_transform(&mut policies, &mut DefaultPolicy, &mut cx, &mut grip);
        assert!(!resolution.valid);
        assert_eq!(resolution.transform, Transform::from_xyz(1.0, 2.0, 3.0));
    }

    #[test]
    fn revision_sums_policies() {
        let mut physics = PhysicsPolicy::default();
        physics.bump_revision();
        let policies = [GripPolicy::from(physics), GripPolicy::from(DefaultPolicy)];
        assert_eq!(policy_revision(&policies), 1);
    }
}
