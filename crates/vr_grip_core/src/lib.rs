#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod drive;
mod error;
mod event;
mod handle;
mod ids;
mod manager;
mod physics;
mod policy;
mod record;
mod scene;
mod settings;
mod target;

#[cfg(test)]
mod testing;

pub use drive::*;
pub use error::*;
pub use event::*;
pub use handle::*;
pub use ids::*;
pub use manager::*;
pub use physics::*;
pub use policy::*;
pub use record::*;
pub use scene::*;
pub use settings::*;
pub use target::*;

/// The grip prelude.
///
/// This includes the most common types in this crate, re-exported for your convenience.
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        ControllerGripManager, ControllerId, DropRequest, GripCollisionType, GripEnv, GripError,
        GripEvent, GripId, GripOffset, GripPolicy, GripRequest, GripScene, GripSettings,
        GripTarget, Grippable, PhysicsEngine, SecondaryAttachment, TargetId,
    };
}
