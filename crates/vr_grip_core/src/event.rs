use bevy_transform::components::Transform;

use alloc::string::String;

use crate::{ComponentId, GripError, GripId, HitSurface, ReleaseKind, TargetId};

/// Something that happened to a controller's grips, drained with
/// [`ControllerGripManager::drain_events`](crate::ControllerGripManager::drain_events).
#[derive(Clone, Debug, PartialEq)]
pub enum GripEvent {
    /// A grip started.
    Gripped {
        /// The new grip.
        grip: GripId,
        /// The held target.
        target: TargetId,
    },
    /// A grip ended.
    Dropped {
        /// The ended grip.
        grip: GripId,
        /// The released target.
        target: TargetId,
        /// Why it ended.
        kind: ReleaseKind,
    },
    /// A second hand attached.
    SecondaryAdded {
        /// The grip.
        grip: GripId,
        /// The second hand.
        component: ComponentId,
    },
    /// A second hand let go.
    SecondaryRemoved {
        /// The grip.
        grip: GripId,
    },
    /// A secondary blend reached its end.
    SecondaryLerpFinished {
        /// The grip.
        grip: GripId,
    },
    /// A lerp-to-hand blend started.
    LerpToHandBegin {
        /// The grip.
        grip: GripId,
    },
    /// A lerp-to-hand blend reached the hand.
    LerpToHandFinished {
        /// The grip.
        grip: GripId,
    },
    /// The target strayed beyond its break distance.
    OutOfRange {
        /// The grip.
        grip: GripId,
        /// Measured distance.
        distance: f32,
    },
    /// A gun's virtual stock engaged or disengaged.
    VirtualStockChanged {
        /// The grip.
        grip: GripId,
        /// True while mounted.
        mounted: bool,
        /// The mount pose.
        mount: Transform,
    },
    /// A grip's physics joint could not be created.
    PhysicsHandleFailed {
        /// The grip.
        grip: GripId,
        /// The failure.
        error: GripError,
    },
    /// A melee weapon struck a surface it could lodge into.
    MeleeShouldLodge {
        /// The grip holding the weapon.
        grip: GripId,
        /// The weapon.
        target: TargetId,
        /// The lodge component that made contact.
        component: String,
        /// The surface that was struck.
        surface: HitSurface,
    },
    /// A melee weapon struck a surface without lodging.
    MeleeHit {
        /// The grip holding the weapon.
        grip: GripId,
        /// The weapon.
        target: TargetId,
        /// The lodge component that made contact.
        component: String,
        /// The surface that was struck.
        surface: HitSurface,
    },
}
