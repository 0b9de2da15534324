//! Fixtures shared by the unit tests.

use alloc::{collections::BTreeMap, vec::Vec};

use bevy_math::Vec3;
use bevy_transform::components::Transform;

use crate::{
    AnchorHandle, BodyId, ComponentId, ControllerId, GripCollisionType, GripEvent, GripHolder,
    GripId, GripPair, GripRecord, GripScene, GripSettings, GripTarget, Grippable, HandleDrive,
    JointHandle, JointHandles, JointRequest, PhysicsEngine, PhysicsError, TargetId, TargetSnapshot,
};

/// An unheld snapshot of target 1 at the origin, default settings and an empty event list.
pub(crate) fn context_parts() -> (TargetSnapshot, GripSettings, Vec<GripEvent>) {
    (
        TargetSnapshot::at(TargetId(1), Transform::IDENTITY),
        GripSettings::DEFAULT,
        Vec::new(),
    )
}

/// Grip 1 on target 1.
pub(crate) fn record_with(collision_type: GripCollisionType) -> GripRecord {
    GripRecord::new(grip_id(1), TargetId(1), collision_type)
}

/// A holder whose hand sits at `hand` in target space.
pub(crate) fn holder_at(controller: u32, grip: u8, hand: Vec3) -> GripHolder {
    GripHolder {
        pair: GripPair::new(ControllerId(controller), grip_id(grip)),
        relative_transform: Transform::from_translation(-hand),
        is_slot_grip: false,
        secondary_location: None,
    }
}

pub(crate) fn grip_id(raw: u8) -> GripId {
    GripId::new(raw).unwrap()
}

#[derive(Debug, Default)]
pub(crate) struct TestScene {
    pub targets: BTreeMap<TargetId, Grippable>,
    pub components: BTreeMap<ComponentId, Transform>,
    pub head: Option<Transform>,
}

impl TestScene {
    pub fn with_target(mut self, id: TargetId, target: Grippable) -> Self {
        self.targets.insert(id, target);
        self
    }

    pub fn get(&mut self, id: TargetId) -> &mut Grippable {
        self.targets.get_mut(&id).unwrap()
    }
}

impl GripScene for TestScene {
    fn target(&self, id: TargetId) -> Option<&dyn GripTarget> {
        self.targets.get(&id).map(|target| target as &dyn GripTarget)
    }

    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn GripTarget> {
        self.targets
            .get_mut(&id)
            .map(|target| target as &mut dyn GripTarget)
    }

    fn component_transform(&self, id: ComponentId) -> Option<Transform> {
        self.components.get(&id).copied()
    }

    fn head_transform(&self) -> Option<Transform> {
        self.head
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestJoint {
    pub body: BodyId,
    pub drive: HandleDrive,
    pub target_pose: Transform,
}

/// A physics engine that records what it was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RecordingPhysics {
    pub joints: BTreeMap<JointHandle, TestJoint>,
    pub com: BTreeMap<BodyId, Transform>,
    pub destroyed: Vec<JointHandles>,
    pub mass_resets: Vec<BodyId>,
    pub fail_with: Option<PhysicsError>,
    pub separation: Option<Vec3>,
    next: u64,
}

impl RecordingPhysics {
    /// An engine that refuses every joint with `error`.
    pub fn failing(error: PhysicsError) -> Self {
        Self {
            fail_with: Some(error),
            ..Default::default()
        }
    }
}

impl PhysicsEngine for RecordingPhysics {
    fn create_joint(&mut self, request: &JointRequest) -> Result<JointHandles, PhysicsError> {
        if let Some(error) = self.fail_with.clone() {
            return Err(error);
        }
        self.next += 1;
        let joint = JointHandle(self.next);
        self.joints.insert(
            joint,
            TestJoint {
                body: request.body,
                drive: request.drive,
                target_pose: request.anchor_pose,
            },
        );
        Ok(JointHandles {
            joint,
            anchor: AnchorHandle(self.next),
        })
    }

    fn update_joint_drive(&mut self, joint: JointHandle, drive: &HandleDrive) {
        if let Some(entry) = self.joints.get_mut(&joint) {
            entry.drive = *drive;
        }
    }

    fn set_joint_target_pose(&mut self, joint: JointHandle, pose: Transform) {
        if let Some(entry) = self.joints.get_mut(&joint) {
            entry.target_pose = pose;
        }
    }

    fn destroy_joint(&mut self, handles: JointHandles) {
        self.joints.remove(&handles.joint);
        self.destroyed.push(handles);
    }

    fn com_pose(&self, body: BodyId) -> Option<Transform> {
        Some(self.com.get(&body).copied().unwrap_or(Transform::IDENTITY))
    }

    fn set_com_pose(&mut self, body: BodyId, pose: Transform) {
        self.com.insert(body, pose);
    }

    fn reset_mass_properties(&mut self, body: BodyId) {
        self.com.remove(&body);
        self.mass_resets.push(body);
    }

    fn joint_separation(&self, _joint: JointHandle) -> Option<Vec3> {
        self.separation
    }
}
