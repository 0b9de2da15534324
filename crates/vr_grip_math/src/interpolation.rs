use core::f32::consts::{PI, TAU};

use bevy_math::{EulerRot, Quat, Vec3};
use bevy_transform::components::Transform;

use crate::TransformExt;

/// Euler order used whenever rotations are handled per axis.
///
/// Yaw about +Y, then pitch about +X, then roll about +Z.
pub const GRIP_EULER: EulerRot = EulerRot::YXZ;

/// How a pose is interpolated between two keys.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LerpMode {
    /// Spherical interpolation of the rotation.
    #[default]
    Slerp,
    /// Per-axis interpolation of yaw, pitch and roll, each along its shortest arc.
    Euler,
    /// Dual quaternion blend, which couples translation to the rotation arc.
    DualQuat,
}

impl LerpMode {
    /// Interpolates from `from` to `to` by `alpha` in `[0, 1]`.
    pub fn interpolate(self, from: &Transform, to: &Transform, alpha: f32) -> Transform {
        let alpha = alpha.clamp(0.0, 1.0);
        match self {
            LerpMode::Slerp => from.blend(to, alpha),
            LerpMode::Euler => Transform {
                translation: from.translation.lerp(to.translation, alpha),
                rotation: lerp_euler(from.rotation, to.rotation, alpha),
                scale: from.scale.lerp(to.scale, alpha),
            },
            LerpMode::DualQuat => {
                let a = DualQuat::from_transform(from);
                let mut b = DualQuat::from_transform(to);
                if a.real.dot(b.real) < 0.0 {
                    b = b.negated();
                }
                let (rotation, translation) = a.weighted_sum(&b, alpha).to_rotation_translation();
                Transform {
                    translation,
                    rotation,
                    scale: from.scale.lerp(to.scale, alpha),
                }
            }
        }
    }
}

/// Wraps an angle in radians into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Interpolates each Euler axis along its shortest arc.
pub fn lerp_euler(from: Quat, to: Quat, alpha: f32) -> Quat {
    let (ay, ax, az) = from.to_euler(GRIP_EULER);
    let (by, bx, bz) = to.to_euler(GRIP_EULER);
    let step = |a: f32, b: f32| a + wrap_angle(b - a) * alpha;
    Quat::from_euler(GRIP_EULER, step(ay, by), step(ax, bx), step(az, bz))
}

/// Minimal unit dual quaternion used for pose blending.
#[derive(Clone, Copy, Debug)]
struct DualQuat {
    real: Quat,
    dual: Quat,
}

impl DualQuat {
    fn from_transform(transform: &Transform) -> Self {
        let real = transform.rotation.normalize();
        let t = transform.translation;
        let dual = Quat::from_xyzw(t.x, t.y, t.z, 0.0) * real * 0.5;
        Self { real, dual }
    }

    fn negated(self) -> Self {
        Self {
            real: -self.real,
            dual: -self.dual,
        }
    }

    fn weighted_sum(&self, other: &Self, alpha: f32) -> Self {
        Self {
            real: self.real * (1.0 - alpha) + other.real * alpha,
            dual: self.dual * (1.0 - alpha) + other.dual * alpha,
        }
    }

    fn to_rotation_translation(self) -> (Quat, Vec3) {
        let length = self.real.length();
        if length <= f32::EPSILON {
            return (Quat::IDENTITY, Vec3::ZERO);
        }
        let real = self.real / length;
        let dual = self.dual / length;
        let translation = (dual * real.conjugate() * 2.0).xyz();
        (real, translation)
    }
}
