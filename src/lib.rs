#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]

/// `use vr_grip::prelude::*;` to import the common grip and math types.
pub mod prelude {
    #[doc(hidden)]
    pub use vr_grip_core::prelude::*;
    #[doc(hidden)]
    pub use vr_grip_math::prelude::*;

    #[doc(hidden)]
    pub use bevy_math::{Quat, Vec3};
    #[doc(hidden)]
    pub use bevy_transform::components::Transform;
}

/// Grip records, policies, the controller grip manager and the capability
/// traits it talks to.
pub mod grip {
    pub use vr_grip_core::*;
}

/// Transform algebra, interpolation and smoothing filters.
pub mod math {
    pub use vr_grip_math::*;
}

pub use bevy_math;
pub use bevy_transform;
