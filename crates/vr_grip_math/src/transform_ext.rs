use bevy_math::{EulerRot, Quat, Vec3};
use bevy_transform::components::Transform;

/// Scale components smaller than this are treated as zero when inverting.
pub const SMALL_SCALE: f32 = 1.0e-8;

/// Pose algebra used by the grip pipeline that [`Transform`] does not provide.
///
/// Composition reads left to right: `child.then(&parent)` is the world pose of a
/// child whose local pose is `child`, placed under `parent`. It is equivalent to
/// `parent.mul_transform(child)`.
pub trait TransformExt {
    /// Applies `self` first, then `parent`.
    fn then(&self, parent: &Transform) -> Transform;

    /// Returns the inverse pose.
    ///
    /// Exact for uniform scale. Zero scale components invert to zero.
    fn inverse(&self) -> Transform;

    /// Returns `self` expressed in the space of `other`, so that
    /// `self.relative_to(other).then(other)` equals `self`.
    fn relative_to(&self, other: &Transform) -> Transform;

    /// Maps a world-space point into the local space of this pose.
    fn inverse_transform_point(&self, point: Vec3) -> Vec3;

    /// Maps a local point to world space ignoring scale.
    fn transform_point_no_scale(&self, point: Vec3) -> Vec3;

    /// Maps a world point to local space ignoring scale.
    fn inverse_transform_point_no_scale(&self, point: Vec3) -> Vec3;

    /// True if every component is finite and the rotation has non-zero length.
    fn is_valid(&self) -> bool;

    /// Component-wise comparison within `tolerance`.
    fn abs_diff_eq(&self, other: &Transform, tolerance: f32) -> bool;

    /// Linear blend of translation and scale, spherical blend of rotation.
    ///
    /// `alpha = 0` returns `self`, `alpha = 1` returns `other`.
    fn blend(&self, other: &Transform, alpha: f32) -> Transform;
}

impl TransformExt for Transform {
    #[inline]
    fn then(&self, parent: &Transform) -> Transform {
        parent.mul_transform(*self)
    }

    fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        let scale = safe_reciprocal(self.scale);
        Transform {
            translation: scale * (rotation * -self.translation),
            rotation,
            scale,
        }
    }

    #[inline]
    fn relative_to(&self, other: &Transform) -> Transform {
        other.inverse().mul_transform(*self)
    }

    #[inline]
    fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        safe_reciprocal(self.scale) * (self.rotation.inverse() * (point - self.translation))
    }

    #[inline]
    fn transform_point_no_scale(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    #[inline]
    fn inverse_transform_point_no_scale(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation)
    }

    fn is_valid(&self) -> bool {
        self.translation.is_finite()
            && self.scale.is_finite()
            && self.rotation.is_finite()
            && self.rotation.length_squared() > 0.0
    }

    fn abs_diff_eq(&self, other: &Transform, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && rotations_equal(self.rotation, other.rotation, tolerance)
    }

    fn blend(&self, other: &Transform, alpha: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, alpha),
            rotation: self.rotation.slerp(other.rotation, alpha).normalize(),
            scale: self.scale.lerp(other.scale, alpha),
        }
    }
}

/// Rotations `q` and `-q` describe the same orientation.
pub fn rotations_equal(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.abs_diff_eq(b, tolerance) || a.abs_diff_eq(-b, tolerance)
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Degenerate (near zero length) inputs yield the identity.
pub fn find_between(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}

/// The yaw-only part of `rotation`, about the up (+Y) axis.
pub fn pure_yaw(rotation: Quat) -> Quat {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_rotation_y(yaw)
}

/// A pose made only of a translation.
#[inline]
pub fn translation_only(translation: Vec3) -> Transform {
    Transform::from_translation(translation)
}

/// Rotates and scales `transform` about the world-space `pivot`.
///
/// `transform` is moved into pivot space, `delta` is applied there, and the
/// result is moved back.
pub fn rotate_about_pivot(transform: &Transform, pivot: Vec3, delta: &Transform) -> Transform {
    transform
        .then(&translation_only(-pivot))
        .then(delta)
        .then(&translation_only(pivot))
}

fn safe_reciprocal(scale: Vec3) -> Vec3 {
    let recip = |v: f32| if v.abs() <= SMALL_SCALE { 0.0 } else { 1.0 / v };
    Vec3::new(recip(scale.x), recip(scale.y), recip(scale.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    #[test]
    fn then_matches_parent_multiplication() {
        let child = Transform::from_xyz(1.0, 0.0, 0.0);
        let parent = Transform::from_xyz(0.0, 2.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let world = child.then(&parent);
        assert!(world.translation.abs_diff_eq(Vec3::new(0.0, 2.0, -1.0), 1e-5));
        assert_eq!(world, parent.mul_transform(child));
    }

    #[test]
    fn inverse_undoes_pose() {
        let pose = Transform::from_xyz(3.0, -1.0, 4.0)
            .with_rotation(Quat::from_euler(EulerRot::YXZ, 0.3, -0.7, 1.1))
            .with_scale(Vec3::splat(2.0));
        let identity = pose.then(&pose.inverse());
        assert!(identity.abs_diff_eq(&Transform::IDENTITY, 1e-4));

        let point = Vec3::new(0.5, 0.25, -2.0);
        let back = pose.inverse_transform_point(pose.transform_point(point));
        assert!(back.abs_diff_eq(point, 1e-4));
    }

    #[test]
    fn relative_to_round_trips() {
        let object = Transform::from_xyz(1.0, 1.0, 1.0).with_rotation(Quat::from_rotation_x(0.4));
        let hand = Transform::from_xyz(0.0, 1.5, 0.0).with_rotation(Quat::from_rotation_z(-0.9));
        let relative = object.relative_to(&hand);
        assert!(relative.then(&hand).abs_diff_eq(&object, 1e-5));
    }

    #[test]
    fn find_between_degenerate_is_identity() {
        assert_eq!(find_between(Vec3::ZERO, Vec3::X), Quat::IDENTITY);
        let q = find_between(Vec3::X * 3.0, Vec3::Y * 0.5);
        assert!((q * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn pure_yaw_drops_pitch_and_roll() {
        let rotation = Quat::from_euler(EulerRot::YXZ, 0.8, 0.5, -0.2);
        let yaw = pure_yaw(rotation);
        assert!(rotations_equal(yaw, Quat::from_rotation_y(0.8), 1e-5));
    }

    #[test]
    fn rotate_about_pivot_keeps_pivot_fixed() {
        let pose = Transform::from_xyz(2.0, 0.0, 0.0);
        let delta = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let rotated = rotate_about_pivot(&pose, Vec3::new(1.0, 0.0, 0.0), &delta);
        assert!(rotated.translation.abs_diff_eq(Vec3::new(1.0, 0.0, -1.0), 1e-5));
    }
}
