use alloc::vec::Vec;

use vr_grip_math::OneEuroConfig;

use crate::policy::{HitSurface, LerpToHandConfig, VirtualStockSettings};

/// Scalers applied to every joint drive.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveSettings {
    /// Multiplies linear stiffness.
    pub linear_stiffness_scale: f32,
    /// Multiplies linear damping.
    pub linear_damping_scale: f32,
    /// Multiplies angular stiffness after it is derived.
    pub angular_stiffness_scale: f32,
    /// Multiplies angular damping after it is derived.
    pub angular_damping_scale: f32,
    /// Angular stiffness is the grip stiffness times this unless the grip
    /// provides its own angular values.
    pub angular_stiffness_multiplier: f32,
    /// Angular damping is the grip damping times this unless the grip provides
    /// its own angular values.
    pub angular_damping_multiplier: f32,
}

impl DriveSettings {
    /// Unscaled drives with the usual angular multipliers.
    pub const DEFAULT: Self = Self {
        linear_stiffness_scale: 1.0,
        linear_damping_scale: 1.0,
        angular_stiffness_scale: 1.0,
        angular_damping_scale: 1.0,
        angular_stiffness_multiplier: 1.5,
        angular_damping_multiplier: 1.4,
    };
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Lerp-to-hand applied to every new grip whose target has no lerp-to-hand policy.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalLerpToHand {
    /// Master switch.
    pub enabled: bool,
    /// Skip the lerp when another controller already holds the target.
    pub skip_if_held: bool,
    /// Blend tuning.
    pub config: LerpToHandConfig,
}

impl GlobalLerpToHand {
    /// Disabled, with a quick blend configured for when it is switched on.
    pub const DEFAULT: Self = Self {
        enabled: false,
        skip_if_held: false,
        config: LerpToHandConfig {
            min_distance: 10.0,
            duration: 0.25,
            min_speed: 100.0,
            max_speed: 500.0,
            ..LerpToHandConfig::DEFAULT
        },
    };
}

impl Default for GlobalLerpToHand {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How controller velocity is estimated for throws.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum VelocityCalculation {
    /// Frame to frame difference.
    #[default]
    Default,
    /// Running average over the configured sample count.
    RunningAverage,
    /// Largest sample of the last frames.
    SamplePeak,
}

/// Controller velocity sampling.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VelocitySettings {
    /// Estimation method.
    pub calculation: VelocityCalculation,
    /// Sample count for [`VelocityCalculation::RunningAverage`].
    pub samples: u32,
}

impl VelocitySettings {
    /// Frame to frame velocity.
    pub const DEFAULT: Self = Self {
        calculation: VelocityCalculation::Default,
        samples: 30,
    };
}

impl Default for VelocitySettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tunables shared by a controller and the policies it runs.
///
/// Injected at [`ControllerGripManager`](crate::ControllerGripManager)
/// construction; there is no global configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripSettings {
    /// Smoothing applied to the secondary hand when a grip enables it.
    pub secondary_smoothing: OneEuroConfig,
    /// Lerp-to-hand for targets that do not declare their own.
    pub lerp_to_hand: GlobalLerpToHand,
    /// Drive scalers.
    pub drive: DriveSettings,
    /// Surfaces melee weapons may stab into, unless a weapon overrides the list.
    pub melee_surfaces: Vec<HitSurface>,
    /// Virtual stock defaults for gun policies that do not override them.
    pub virtual_stock: VirtualStockSettings,
    /// Controller velocity estimation.
    pub velocity: VelocitySettings,
    /// Stiffness used when a grip request does not specify one.
    pub default_stiffness: f32,
    /// Damping used when a grip request does not specify one.
    pub default_damping: f32,
}

impl GripSettings {
    /// Stock tuning.
    pub const DEFAULT: Self = Self {
        secondary_smoothing: OneEuroConfig::TRANSLATION,
        lerp_to_hand: GlobalLerpToHand::DEFAULT,
        drive: DriveSettings::DEFAULT,
        melee_surfaces: Vec::new(),
        virtual_stock: VirtualStockSettings::DEFAULT,
        velocity: VelocitySettings::DEFAULT,
        default_stiffness: 1500.0,
        default_damping: 200.0,
    };
}

impl Default for GripSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}
