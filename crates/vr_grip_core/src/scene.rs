use bevy_transform::components::Transform;

use crate::{ComponentId, ControllerId, GripId, GripTarget, PhysicsEngine, TargetId};

/// Lookup of targets and tracked components.
pub trait GripScene {
    /// The target, if it still exists.
    fn target(&self, id: TargetId) -> Option<&dyn GripTarget>;

    /// Mutable access to the target, if it still exists.
    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn GripTarget>;

    /// World pose of a component. `None` once the component is destroyed.
    fn component_transform(&self, id: ComponentId) -> Option<Transform>;

    /// World pose of the headset, if tracked.
    fn head_transform(&self) -> Option<Transform> {
        None
    }
}

/// Decides which grips this peer moves.
pub trait GripAuthority {
    /// True if `controller` is authoritative for `grip` on this peer.
    fn is_authoritative_for(&self, controller: ControllerId, grip: GripId) -> bool;
}

/// Authority for single-player and listen-server hosts: everything is local.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalAuthority;

impl GripAuthority for LocalAuthority {
    fn is_authoritative_for(&self, _controller: ControllerId, _grip: GripId) -> bool {
        true
    }
}

impl<F> GripAuthority for F
where
    F: Fn(ControllerId, GripId) -> bool,
{
    fn is_authoritative_for(&self, controller: ControllerId, grip: GripId) -> bool {
        self(controller, grip)
    }
}

/// The collaborators a [`ControllerGripManager`](crate::ControllerGripManager)
/// works against for one call.
pub struct GripEnv<'a> {
    /// Targets and tracked components.
    pub scene: &'a mut dyn GripScene,
    /// The physics engine.
    pub physics: &'a mut dyn PhysicsEngine,
    /// The authority predicate.
    pub authority: &'a dyn GripAuthority,
}

impl<'a> GripEnv<'a> {
    /// Bundles the collaborators.
    pub fn new(
        scene: &'a mut dyn GripScene,
        physics: &'a mut dyn PhysicsEngine,
        authority: &'a dyn GripAuthority,
    ) -> Self {
        Self {
            scene,
            physics,
            authority,
        }
    }
}
