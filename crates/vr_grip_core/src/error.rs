use alloc::string::String;
use thiserror::Error;

use crate::{ComponentId, GripId, PhysicsError, TargetId};

/// Why a target refused a grip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidTargetReason {
    /// The scene has no such target.
    Missing,
    /// The target declined this controller.
    DeniesGripping,
    /// The target is static and the collision mode needs to move it.
    NotMovable,
    /// This controller already holds the target.
    AlreadyHeldByController,
    /// Another controller holds the target and it does not allow multiple grips.
    HeldWithoutMultiGrip,
}

/// How a failed operation addressed the grip it could not find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GripLookup {
    /// By grip id.
    Id(GripId),
    /// By held target.
    Target(TargetId),
}

/// An error returned by a [`ControllerGripManager`](crate::ControllerGripManager) operation.
///
/// A failed operation never mutates the manager, so retrying is always safe.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GripError {
    /// The target cannot be gripped.
    #[error("target {target:?} cannot be gripped: {reason:?}")]
    InvalidTarget {
        /// The rejected target.
        target: TargetId,
        /// Why it was rejected.
        reason: InvalidTargetReason,
    },
    /// No active grip matches.
    #[error("no active grip matches {0:?}")]
    InvalidGripId(GripLookup),
    /// The physics engine refused to create the joint backing a grip.
    #[error("physics handle for {grip} could not be created: {source}")]
    PhysicsHandleCreationFailure {
        /// The grip the handle was for.
        grip: GripId,
        /// The engine's error.
        #[source]
        source: PhysicsError,
    },
    /// The target's secondary grip type does not allow this attachment.
    #[error("target {0:?} does not accept this secondary grip")]
    SecondaryGripNotAllowed(TargetId),
    /// The secondary component is not present in the scene.
    #[error("secondary component {0:?} does not exist")]
    MissingComponent(ComponentId),
    /// The grip has no secondary attachment to remove.
    #[error("{0} has no secondary attachment")]
    NoSecondaryAttachment(GripId),
    /// A policy lookup by name found nothing.
    #[error("target {target:?} has no grip policy named {name:?}")]
    PolicyNotFound {
        /// The target that was searched.
        target: TargetId,
        /// The policy name that was requested.
        name: String,
    },
    /// Every id in the controller's range is in use.
    #[error("controller has no free grip ids")]
    GripIdsExhausted,
    /// The authority predicate refused this controller control of the grip.
    #[error("controller is not authoritative for {0}")]
    NotAuthoritative(GripId),
}

impl GripError {
    pub(crate) const fn invalid_target(target: TargetId, reason: InvalidTargetReason) -> Self {
        Self::InvalidTarget { target, reason }
    }
}
