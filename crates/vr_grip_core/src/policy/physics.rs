use crate::{
    DriveProfile, DriveProfileTag, GripPolicyBehavior, GripRecord, HandleSettings, PolicyContext,
    ReleaseKind,
};

/// Swaps a held body's joint drives between a one-hand and a two-hand profile.
///
/// Leaves the transform alone. Every grip or release bumps the revision, so
/// each holder's joint has its drives refreshed in place with the profile
/// matching the new hand count. The joints themselves are kept.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsPolicy {
    /// Disabled policies keep the grip's own drives.
    pub active: bool,
    /// Drives while one hand holds the target.
    pub single_hand: DriveProfile,
    /// Drives while several hands hold the target.
    pub multi_hand: DriveProfile,
    revision: u32,
}

impl PhysicsPolicy {
    /// An active policy with the given profiles.
    pub const fn new(single_hand: DriveProfile, multi_hand: DriveProfile) -> Self {
        Self {
            active: true,
            single_hand,
            multi_hand,
            revision: 0,
        }
    }

    /// Forces every joint on the target to be rebuilt on the next tick.
    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// The profile for `holders` hands and its tag.
    pub fn profile_for(&self, holders: usize) -> (&DriveProfile, DriveProfileTag) {
        if holders > 1 {
            (&self.multi_hand, DriveProfileTag::MultiHand)
        } else {
            (&self.single_hand, DriveProfileTag::SingleHand)
        }
    }
}

impl Default for PhysicsPolicy {
    fn default() -> Self {
        Self::new(DriveProfile::DEFAULT, DriveProfile::DEFAULT)
    }
}

impl GripPolicyBehavior for PhysicsPolicy {
    fn name(&self) -> &str {
        "physics"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn wants_deny_late_update(&self) -> bool {
        true
    }

    fn on_grip(&mut self, _cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        self.bump_revision();
    }

    fn on_grip_release(&mut self, _cx: &mut PolicyContext<'_>, _grip: &GripRecord, _kind: ReleaseKind) {
        self.bump_revision();
    }

    fn post_physics_handle(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord, handle: &mut HandleSettings) {
        if !self.active {
            return;
        }
        let (profile, tag) = self.profile_for(cx.target.holder_count());
        profile.fill_to(&mut handle.drive);
        handle.profile = tag;
        tracing::trace!(grip = %grip.id, profile = ?tag, "physics policy drive profile");
    }

    fn revision(&self) -> u32 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, holder_at, record_with};
    use crate::{ControllerId, GripCollisionType, HandleDrive};
    use bevy_math::Vec3;
    use bevy_transform::components::Transform;

    fn policy() -> PhysicsPolicy {
        PhysicsPolicy::new(
            DriveProfile {
                linear_stiffness: 800.0,
                ..DriveProfile::DEFAULT
            },
            DriveProfile {
                linear_stiffness: 3000.0,
                angular_damping: 90.0,
                ..DriveProfile::DEFAULT
            },
        )
    }

    #[test]
    fn profile_follows_hand_count() {
        let mut policy = policy();
        let grip = record_with(GripCollisionType::InteractiveCollisionWithPhysics);
        let (mut snapshot, settings, mut events) = context_parts();
        snapshot.holders.push(holder_at(0, 1, Vec3::X));

        let mut handle = HandleSettings::new(HandleDrive::DEFAULT);
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.post_physics_handle(&mut cx, &grip, &mut handle);
        assert_eq!(handle.profile, DriveProfileTag::SingleHand);
        assert_eq!(handle.drive.linear.stiffness, 800.0);

        let (mut snapshot, settings, mut events) = context_parts();
        snapshot.holders.push(holder_at(0, 1, Vec3::X));
        snapshot.holders.push(holder_at(1, 1, Vec3::NEG_X));
        let mut handle = HandleSettings::new(HandleDrive::DEFAULT);
        let mut cx = PolicyContext {
            controller: ControllerId(1),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.post_physics_handle(&mut cx, &grip, &mut handle);
        assert_eq!(handle.profile, DriveProfileTag::MultiHand);
        assert_eq!(handle.drive.linear.stiffness, 3000.0);
        assert_eq!(handle.drive.angular.damping, 90.0);
    }

    #[test]
    fn grip_and_release_bump_revision() {
        let mut policy = policy();
        let grip = record_with(GripCollisionType::InteractiveCollisionWithPhysics);
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.on_grip(&mut cx, &grip);
        policy.on_grip_release(&mut cx, &grip, ReleaseKind::Released);
        assert_eq!(policy.revision(), 2);
        assert!(policy.wants_deny_late_update());
    }
}
