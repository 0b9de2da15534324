//! Drives a pair of hands against a small hand-written world through the
//! public API only.

use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use vr_grip::grip::{
    BodyId, ComponentId, GripHolder, GripRecord, GripSlot, HandleDrive, JointHandle, JointHandles,
    JointRequest, LocalAuthority, MoveMode, MoveOutcome, PhysicsError, PhysicsPolicy,
    ReleaseKind, SecondaryGripType,
};
use vr_grip::prelude::*;

const DOOR: TargetId = TargetId(1);
const CRATE: TargetId = TargetId(2);
const OFF_HAND: ComponentId = ComponentId(10);

/// A door handle that only moves along its hinge axis.
#[derive(Default)]
struct DoorHandle {
    transform: Transform,
    holders: Vec<GripHolder>,
    grips: u32,
    releases: Vec<ReleaseKind>,
}

impl GripTarget for DoorHandle {
    fn world_transform(&self) -> Transform {
        self.transform
    }

    fn set_world_transform(&mut self, transform: &Transform, _mode: MoveMode) -> MoveOutcome {
        self.transform.translation.x = transform.translation.x;
        MoveOutcome::default()
    }

    fn simulate_on_drop(&self) -> bool {
        false
    }

    fn held_by(&self) -> &[GripHolder] {
        &self.holders
    }

    fn set_held(&mut self, holder: GripHolder, held: bool) {
        self.holders.retain(|h| h.pair != holder.pair);
        if held {
            self.holders.push(holder);
        }
    }

    fn on_grip(&mut self, _controller: ControllerId, _grip: &GripRecord) {
        self.grips += 1;
    }

    fn on_grip_release(&mut self, _controller: ControllerId, _grip: &GripRecord, kind: ReleaseKind) {
        self.releases.push(kind);
    }
}

#[derive(Default)]
struct World {
    door: DoorHandle,
    crate_box: Grippable,
    hands: HashMap<ComponentId, Transform>,
}

impl GripScene for World {
    fn target(&self, id: TargetId) -> Option<&dyn GripTarget> {
        match id {
            DOOR => Some(&self.door),
            CRATE => Some(&self.crate_box),
            _ => None,
        }
    }

    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn GripTarget> {
        match id {
            DOOR => Some(&mut self.door),
            CRATE => Some(&mut self.crate_box),
            _ => None,
        }
    }

    fn component_transform(&self, id: ComponentId) -> Option<Transform> {
        self.hands.get(&id).copied()
    }
}

/// Keeps joints in a map and never moves anything.
#[derive(Default)]
struct Joints {
    live: HashMap<JointHandle, (BodyId, HandleDrive)>,
    next: u64,
}

impl PhysicsEngine for Joints {
    fn create_joint(&mut self, request: &JointRequest) -> Result<JointHandles, PhysicsError> {
        self.next += 1;
        let joint = JointHandle(self.next);
        self.live.insert(joint, (request.body, request.drive));
        Ok(JointHandles {
            joint,
            anchor: vr_grip::grip::AnchorHandle(self.next),
        })
    }

    fn update_joint_drive(&mut self, joint: JointHandle, drive: &HandleDrive) {
        if let Some(entry) = self.live.get_mut(&joint) {
            entry.1 = *drive;
        }
    }

    fn set_joint_target_pose(&mut self, _joint: JointHandle, _pose: Transform) {}

    fn destroy_joint(&mut self, handles: JointHandles) {
        self.live.remove(&handles.joint);
    }

    fn com_pose(&self, _body: BodyId) -> Option<Transform> {
        Some(Transform::IDENTITY)
    }

    fn set_com_pose(&mut self, _body: BodyId, _pose: Transform) {}

    fn reset_mass_properties(&mut self, _body: BodyId) {}
}

fn world() -> World {
    let mut crate_box = Grippable::new(Transform::from_xyz(0.0, 1.0, 0.0))
        .with_body(BodyId(2))
        .with_policy(PhysicsPolicy::default());
    crate_box.properties.allow_multiple_grips = true;
    crate_box.properties.free_grip_type = GripCollisionType::InteractiveCollisionWithPhysics;
    crate_box.properties.secondary_grip_type = SecondaryGripType::Free;
    crate_box.primary_slots.push(GripSlot {
        name: "handle".into(),
        transform: Transform::from_xyz(0.0, 0.5, 0.0),
    });
    World {
        crate_box,
        ..Default::default()
    }
}

#[test]
fn custom_target_follows_the_hand_on_its_own_terms() {
    let mut world = world();
    let mut joints = Joints::default();
    let mut hand = ControllerGripManager::new(ControllerId(0), GripSettings::default());

    let grip = hand
        .grip(
            &mut GripEnv::new(&mut world, &mut joints, &LocalAuthority),
            GripRequest::new(DOOR, GripOffset::Relative(Transform::IDENTITY)),
        )
        .unwrap();
    assert_eq!(world.door.grips, 1);
    assert_eq!(world.door.holders.len(), 1);
    assert_eq!(
        hand.grip_by_id(grip).unwrap().collision_type,
        GripCollisionType::InteractiveCollisionWithSweep
    );

    hand.set_pivot(Transform::from_xyz(0.4, 0.3, -0.2));
    hand.tick(&mut GripEnv::new(&mut world, &mut joints, &LocalAuthority), 1.0 / 90.0);
    assert_abs_diff_eq!(world.door.transform.translation.x, 0.4, epsilon = 1e-5);
    assert_abs_diff_eq!(world.door.transform.translation.y, 0.0);
    assert!(joints.live.is_empty());

    hand.drop_grip(
        &mut GripEnv::new(&mut world, &mut joints, &LocalAuthority),
        grip,
        DropRequest::default(),
    )
    .unwrap();
    assert_eq!(world.door.releases, [ReleaseKind::Released]);
    assert!(world.door.holders.is_empty());
    assert!(!hand.is_object_held(DOOR));
}

#[test]
fn two_hands_share_a_physics_prop() {
    let mut world = world();
    let mut joints = Joints::default();
    let mut left = ControllerGripManager::new(ControllerId(0), GripSettings::default());
    let mut right = ControllerGripManager::new(ControllerId(1), GripSettings::default());
    left.set_pivot(Transform::from_xyz(-0.2, 1.0, 0.0));
    right.set_pivot(Transform::from_xyz(0.2, 1.0, 0.0));

    for hand in [&mut left, &mut right] {
        let mut env = GripEnv::new(&mut world, &mut joints, &LocalAuthority);
        hand.grip(&mut env, GripRequest::new(CRATE, GripOffset::World(Transform::from_xyz(0.0, 1.0, 0.0))))
            .unwrap();
        hand.tick(&mut env, 1.0 / 90.0);
    }
    left.tick(&mut GripEnv::new(&mut world, &mut joints, &LocalAuthority), 1.0 / 90.0);

    assert_eq!(joints.live.len(), 2);
    assert_eq!(left.physics_handles().len(), 1);
    assert_eq!(right.physics_handles().len(), 1);
    assert!(world.crate_box.simulating);

    left.drop_all_grips(&mut GripEnv::new(&mut world, &mut joints, &LocalAuthority));
    right.drop_all_grips(&mut GripEnv::new(&mut world, &mut joints, &LocalAuthority));
    assert!(joints.live.is_empty());
    assert!(left.held_objects().next().is_none());
}

#[test]
fn auto_detect_prefers_a_slot_in_range() {
    let mut world = world();
    let mut joints = Joints::default();
    let mut hand = ControllerGripManager::new(ControllerId(0), GripSettings::default());
    hand.set_pivot(Transform::from_xyz(0.0, 1.4, 0.0));

    let grip = hand
        .grip_by_interface_auto_detect(
            &mut GripEnv::new(&mut world, &mut joints, &LocalAuthority),
            CRATE,
        )
        .unwrap();
    let record = hand.grip_by_id(grip).unwrap();
    assert!(record.is_slot_grip);
    assert_abs_diff_eq!(record.relative_transform.translation.y, -0.5, epsilon = 1e-5);
}

#[test]
fn off_hand_attaches_and_detaches() {
    let mut world = world();
    world.hands.insert(OFF_HAND, Transform::from_xyz(0.0, 1.5, 0.0));
    let mut joints = Joints::default();
    let mut hand = ControllerGripManager::new(ControllerId(0), GripSettings::default());
    let mut env = GripEnv::new(&mut world, &mut joints, &LocalAuthority);

    let grip = hand
        .grip(&mut env, GripRequest::new(CRATE, GripOffset::Relative(Transform::IDENTITY)))
        .unwrap();
    hand.add_secondary_attachment(
        &mut env,
        CRATE,
        SecondaryAttachment::new(OFF_HAND, GripOffset::World(Transform::from_xyz(0.0, 1.5, 0.0))),
    )
    .unwrap();
    assert!(hand.grip_by_id(grip).unwrap().secondary.has_attachment());

    hand.remove_secondary_attachment(&mut env, CRATE, 0.0).unwrap();
    assert!(!hand.grip_by_id(grip).unwrap().secondary.has_attachment());
    assert!(hand.remove_secondary_attachment(&mut env, CRATE, 0.0).is_err());
}
