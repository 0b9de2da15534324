//! The physics engine as seen by the grip system.

use alloc::string::String;

use bevy_math::Vec3;
use bevy_transform::components::Transform;
use thiserror::Error;

use crate::{AnchorHandle, BodyId, HandleDrive, JointHandle};

/// An error reported by a [`PhysicsEngine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// The target has no simulated body to attach to.
    #[error("target has no physics body")]
    NoBody,
    /// The engine does not know the body.
    #[error("body {0:?} is not simulated")]
    UnknownBody(BodyId),
    /// The engine refused the joint.
    #[error("joint rejected: {0}")]
    JointRejected(String),
}

/// Everything needed to attach a grip joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointRequest {
    /// The gripped body.
    pub body: BodyId,
    /// World pose of the kinematic anchor. Scale is always one.
    pub anchor_pose: Transform,
    /// Drive settings.
    pub drive: HandleDrive,
}

/// The engine objects behind one grip joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JointHandles {
    /// The spring-damper joint.
    pub joint: JointHandle,
    /// The kinematic body the joint pulls the target toward.
    pub anchor: AnchorHandle,
}

/// Joint and mass operations the grip system needs from a physics engine.
///
/// Poses are world space unless noted. Calls happen on the simulation thread
/// between solver steps.
pub trait PhysicsEngine {
    /// Creates a kinematic anchor at `request.anchor_pose` and a driven joint
    /// from it to `request.body`.
    fn create_joint(&mut self, request: &JointRequest) -> Result<JointHandles, PhysicsError>;

    /// Replaces the drive parameters of an existing joint.
    fn update_joint_drive(&mut self, joint: JointHandle, drive: &HandleDrive);

    /// Moves the anchor the joint pulls toward.
    fn set_joint_target_pose(&mut self, joint: JointHandle, pose: Transform);

    /// Destroys the joint and its anchor.
    fn destroy_joint(&mut self, handles: JointHandles);

    /// Center of mass of `body`, local to the body.
    fn com_pose(&self, body: BodyId) -> Option<Transform>;

    /// Overrides the center of mass of `body`, local to the body.
    fn set_com_pose(&mut self, body: BodyId, pose: Transform);

    /// Recomputes mass and center of mass from the body's shapes.
    fn reset_mass_properties(&mut self, body: BodyId);

    /// Current offset between the anchor and the attached body, if the engine
    /// tracks it.
    fn joint_separation(&self, _joint: JointHandle) -> Option<Vec3> {
        None
    }
}
