//! Spring-damper drives for grip joints.
//!

use crate::{GripCollisionType, GripRecord, GripSettings};

/// What the drive spring produces at the joint.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveType {
    /// Drive spring applies force at the joint.
    Force,
    /// Drive spring applies acceleration at the joint, independent of mass.
    #[default]
    Acceleration,
}

/// A force-limited damped spring:
/// output = stiffness * (target - position) + damping * (target velocity - velocity)
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveConfig {
    /// Drive type: force or acceleration.
    pub drive_type: DriveType,

    /// Maximum force the drive may apply. Infinite means not limited. Must be
    /// non-negative.
    pub max_force: f32,

    /// Damping of the drive.
    pub damping: f32,

    /// Stiffness of the drive.
    pub stiffness: f32,
}

impl DriveConfig {
    /// Default drive configuration (no actuation).
    pub const DEFAULT: Self = Self {
        drive_type: DriveType::Acceleration,
        max_force: f32::INFINITY,
        damping: 0.0,
        stiffness: 0.0,
    };

    /// A drive with the given spring constants and no force limit.
    pub const fn spring(stiffness: f32, damping: f32) -> Self {
        Self {
            stiffness,
            damping,
            ..Self::DEFAULT
        }
    }

    /// Returns `self` limited to `stiffness * coefficient`, or unlimited when
    /// `coefficient` is `None`.
    pub fn with_max_force_coefficient(mut self, coefficient: Option<f32>) -> Self {
        self.max_force = match coefficient {
            Some(coefficient) => (self.stiffness * coefficient).max(0.0),
            None => f32::INFINITY,
        };
        self
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which rotational axes the angular drive acts on.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AngularDriveMode {
    /// Rotation is left to the solver; only position is driven.
    Free,
    /// Only twist about the grip's forward axis is driven.
    TwistOnly,
    /// All rotational axes are driven together (slerp drive).
    #[default]
    Full,
}

/// Complete drive set for one grip joint.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct HandleDrive {
    /// Drive applied to each translation axis.
    pub linear: DriveConfig,
    /// Drive applied to rotation, according to `angular_mode`.
    pub angular: DriveConfig,
    /// Which rotational axes `angular` acts on.
    pub angular_mode: AngularDriveMode,
}

impl HandleDrive {
    /// No actuation on any axis.
    pub const DEFAULT: Self = Self {
        linear: DriveConfig::DEFAULT,
        angular: DriveConfig::DEFAULT,
        angular_mode: AngularDriveMode::Full,
    };

    /// Derives the drive for `grip` from its stiffness and damping.
    ///
    /// Angular values come from the grip's advanced physics settings when it
    /// provides custom ones, otherwise from the linear values scaled by the
    /// configured multipliers. Manipulation grips leave rotation free, except the
    /// wrist-twist variant which drives twist only.
    pub fn for_grip(grip: &GripRecord, settings: &GripSettings) -> Self {
        let physics = grip.advanced.physics.as_ref();
        let drive_type = physics.map_or(DriveType::Acceleration, |p| p.drive_type);
        let coefficient = physics.and_then(|p| p.linear_max_force_coefficient);

        let stiffness = grip.stiffness * settings.drive.linear_stiffness_scale;
        let damping = grip.damping * settings.drive.linear_damping_scale;
        let (angular_stiffness, angular_damping) = match physics.and_then(|p| p.custom_angular) {
            Some(custom) => (custom.stiffness, custom.damping),
            None => (
                grip.stiffness * settings.drive.angular_stiffness_multiplier,
                grip.damping * settings.drive.angular_damping_multiplier,
            ),
        };

        let angular_mode = match grip.collision_type {
            GripCollisionType::ManipulationGrip => AngularDriveMode::Free,
            GripCollisionType::ManipulationGripWithWristTwist => AngularDriveMode::TwistOnly,
            _ => AngularDriveMode::Full,
        };

        Self {
            linear: DriveConfig {
                drive_type,
                ..DriveConfig::spring(stiffness, damping)
            }
            .with_max_force_coefficient(coefficient),
            angular: DriveConfig {
                drive_type,
                ..DriveConfig::spring(
                    angular_stiffness * settings.drive.angular_stiffness_scale,
                    angular_damping * settings.drive.angular_damping_scale,
                )
            }
            .with_max_force_coefficient(physics.and_then(|p| p.angular_max_force_coefficient)),
            angular_mode,
        }
    }
}

impl Default for HandleDrive {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Replacement drive values a policy can push into a physics handle.
///
/// Zero entries keep the value derived from the grip.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveProfile {
    /// Linear spring stiffness.
    pub linear_stiffness: f32,
    /// Linear spring damping.
    pub linear_damping: f32,
    /// Angular spring stiffness.
    pub angular_stiffness: f32,
    /// Angular spring damping.
    pub angular_damping: f32,
    /// Limits linear force to `stiffness * coefficient` when set.
    pub linear_max_force_coefficient: Option<f32>,
    /// Limits angular force to `stiffness * coefficient` when set.
    pub angular_max_force_coefficient: Option<f32>,
    /// Overrides the drive type when set.
    pub drive_type: Option<DriveType>,
}

impl DriveProfile {
    /// A profile that changes nothing.
    pub const DEFAULT: Self = Self {
        linear_stiffness: 0.0,
        linear_damping: 0.0,
        angular_stiffness: 0.0,
        angular_damping: 0.0,
        linear_max_force_coefficient: None,
        angular_max_force_coefficient: None,
        drive_type: None,
    };

    /// Writes the non-zero entries of this profile into `drive`.
    pub fn fill_to(&self, drive: &mut HandleDrive) {
        let fill = |config: &mut DriveConfig, stiffness: f32, damping: f32, coefficient: Option<f32>| {
            if stiffness > 0.0 {
                config.stiffness = stiffness;
            }
            if damping > 0.0 {
                config.damping = damping;
            }
            if coefficient.is_some() {
                *config = config.with_max_force_coefficient(coefficient);
            }
        };
        fill(
            &mut drive.linear,
            self.linear_stiffness,
            self.linear_damping,
            self.linear_max_force_coefficient,
        );
        fill(
            &mut drive.angular,
            self.angular_stiffness,
            self.angular_damping,
            self.angular_max_force_coefficient,
        );
        if let Some(drive_type) = self.drive_type {
            drive.linear.drive_type = drive_type;
            drive.angular.drive_type = drive_type;
        }
    }
}

impl Default for DriveProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which drive profile a physics handle was last built with.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveProfileTag {
    /// Values derived from the grip alone.
    #[default]
    GripDefault,
    /// The profile for a single holding hand.
    SingleHand,
    /// The profile used while several hands hold the target.
    MultiHand,
    /// A melee weapon's primary hand.
    PrimaryHand,
    /// A melee weapon's secondary hand.
    SecondaryHand,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record_with;
    use approx::assert_relative_eq;

    #[test]
    fn angular_drive_scales_linear_values() {
        let grip = record_with(GripCollisionType::InteractiveCollisionWithPhysics);
        let drive = HandleDrive::for_grip(&grip, &GripSettings::DEFAULT);
        assert_relative_eq!(drive.linear.stiffness, 1500.0);
        assert_relative_eq!(drive.linear.damping, 200.0);
        assert_relative_eq!(drive.angular.stiffness, 1500.0 * 1.5);
        assert_relative_eq!(drive.angular.damping, 200.0 * 1.4);
        assert_eq!(drive.linear.max_force, f32::INFINITY);
        assert_eq!(drive.angular_mode, AngularDriveMode::Full);
    }

    #[test]
    fn manipulation_grips_leave_rotation_free() {
        let grip = record_with(GripCollisionType::ManipulationGrip);
        let drive = HandleDrive::for_grip(&grip, &GripSettings::DEFAULT);
        assert_eq!(drive.angular_mode, AngularDriveMode::Free);
        let grip = record_with(GripCollisionType::ManipulationGripWithWristTwist);
        let drive = HandleDrive::for_grip(&grip, &GripSettings::DEFAULT);
        assert_eq!(drive.angular_mode, AngularDriveMode::TwistOnly);
    }

    #[test]
    fn profile_only_fills_non_zero_entries() {
        let mut drive = HandleDrive {
            linear: DriveConfig::spring(100.0, 10.0),
            angular: DriveConfig::spring(150.0, 14.0),
            angular_mode: AngularDriveMode::Full,
        };
        let profile = DriveProfile {
            linear_stiffness: 900.0,
            angular_max_force_coefficient: Some(2.0),
            ..DriveProfile::DEFAULT
        };
        profile.fill_to(&mut drive);
        assert_relative_eq!(drive.linear.stiffness, 900.0);
        assert_relative_eq!(drive.linear.damping, 10.0);
        assert_relative_eq!(drive.angular.max_force, 300.0);
    }
}
