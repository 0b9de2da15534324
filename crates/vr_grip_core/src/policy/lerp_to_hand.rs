use bevy_math::curve::{Curve, EaseFunction, EasingCurve};
use bevy_transform::components::Transform;
use vr_grip_math::{LerpMode, TransformExt};

use crate::{
    GripEvent, GripId, GripPolicyBehavior, GripRecord, PolicyContext, ReleaseKind,
    TransformOverride,
};

/// Timing of a lerp-to-hand blend.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LerpToHandConfig {
    /// Grips closer than this snap to the hand without blending. Zero always blends.
    pub min_distance: f32,
    /// Seconds the blend takes before speed limits apply.
    pub duration: f32,
    /// Slowest allowed travel speed. Zero disables the limit.
    pub min_speed: f32,
    /// Fastest allowed travel speed. Zero disables the limit.
    pub max_speed: f32,
    /// How poses are interpolated.
    pub mode: LerpMode,
    /// Easing applied to the blend factor.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub curve: Option<EaseFunction>,
}

impl LerpToHandConfig {
    /// A one second linear slerp.
    pub const DEFAULT: Self = Self {
        min_distance: 0.0,
        duration: 1.0,
        min_speed: 0.0,
        max_speed: 0.0,
        mode: LerpMode::Slerp,
        curve: None,
    };

    /// Blend speed in units of "whole blends per second" for a blend covering
    /// `distance`, after speed limits.
    pub fn blend_speed(&self, distance: f32) -> f32 {
        if self.duration <= 0.0 {
            return f32::INFINITY;
        }
        let travel_speed = distance / self.duration;
        let mut scaler = 1.0;
        if travel_speed > 0.0 {
            if self.min_speed > 0.0 && travel_speed < self.min_speed {
                scaler = self.min_speed / travel_speed;
            } else if self.max_speed > 0.0 && travel_speed > self.max_speed {
                scaler = self.max_speed / travel_speed;
            }
        }
        scaler / self.duration
    }

    fn ease(&self, alpha: f32) -> f32 {
        match self.curve {
            Some(ease) => EasingCurve::new(0.0, 1.0, ease).sample_clamped(alpha),
            None => alpha,
        }
    }
}

impl Default for LerpToHandConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Blend {
    grip: GripId,
    from: Transform,
    elapsed: f32,
    speed: f32,
}

/// Blends a newly gripped object from where it was to the hand.
///
/// The policy switches itself on at grip time and off once the object reaches
/// the hand or the grip ends.
#[derive(Clone, Debug, PartialEq)]
pub struct LerpToHandPolicy {
    /// Timing.
    pub config: LerpToHandConfig,
    blend: Option<Blend>,
}

impl LerpToHandPolicy {
    /// An idle policy with the given timing.
    pub const fn new(config: LerpToHandConfig) -> Self {
        Self {
            config,
            blend: None,
        }
    }

    /// True while a blend is in flight.
    pub fn is_blending(&self) -> bool {
        self.blend.is_some()
    }

    /// The grip being blended, if any.
    pub fn blending_grip(&self) -> Option<GripId> {
        self.blend.map(|blend| blend.grip)
    }
}

impl Default for LerpToHandPolicy {
    fn default() -> Self {
        Self::new(LerpToHandConfig::DEFAULT)
    }
}

impl GripPolicyBehavior for LerpToHandPolicy {
    fn name(&self) -> &str {
        "lerp_to_hand"
    }

    fn is_active(&self) -> bool {
        self.blend.is_some()
    }

    fn transform_override(&self) -> TransformOverride {
        TransformOverride::Modifies
    }

    fn wants_deny_auto_drop(&self) -> bool {
        true
    }

    fn on_grip(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {
        let from = cx.target.transform;
        let to = grip.relative_transform.then(&cx.pivot);
        let distance = from.translation.distance(to.translation);

        if self.config.min_distance > 0.0 && distance < self.config.min_distance {
            cx.events.push(GripEvent::LerpToHandFinished { grip: grip.id });
            return;
        }

        self.blend = Some(Blend {
            grip: grip.id,
            from,
            elapsed: 0.0,
            speed: self.config.blend_speed(distance),
        });
        cx.events.push(GripEvent::LerpToHandBegin { grip: grip.id });
    }

    fn on_grip_release(&mut self, _cx: &mut PolicyContext<'_>, grip: &GripRecord, _kind: ReleaseKind) {
        if self.blending_grip() == Some(grip.id) {
            self.blend = None;
        }
    }

    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        let Some(blend) = self.blend.as_mut() else {
            return true;
        };
        if blend.grip != grip.id {
            return true;
        }

        blend.elapsed += cx.delta_time * blend.speed;
        let alpha = if blend.speed.is_finite() {
            blend.elapsed.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = self.config.ease(alpha);
        *world = self.config.mode.interpolate(&blend.from, world, eased);

        if alpha >= 1.0 {
            tracing::debug!(grip = %grip.id, "lerp to hand finished");
            cx.events.push(GripEvent::LerpToHandFinished { grip: grip.id });
            self.blend = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, record_with};
    use crate::{ControllerId, GripCollisionType};
    use bevy_math::Vec3;

    #[test]
    fn speed_limits_scale_the_blend() {
        let config = LerpToHandConfig {
            duration: 0.25,
            min_speed: 100.0,
            max_speed: 500.0,
            ..LerpToHandConfig::DEFAULT
        };
        // 10 units over 0.25s is 40 u/s, raised to 100 u/s.
        approx::assert_relative_eq!(config.blend_speed(10.0), 10.0, epsilon = 1e-4);
        // 1000 units is 4000 u/s, lowered to 500 u/s.
        approx::assert_relative_eq!(config.blend_speed(1000.0), 0.5, epsilon = 1e-4);
        approx::assert_relative_eq!(config.blend_speed(50.0), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn blends_from_grip_pose_to_hand_and_finishes_once() {
        let mut policy = LerpToHandPolicy::new(LerpToHandConfig {
            duration: 1.0,
            ..LerpToHandConfig::DEFAULT
        });
        let grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (mut snapshot, settings, mut events) = context_parts();
        snapshot.transform = Transform::from_xyz(0.0, 0.0, 4.0);
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.5,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.on_grip(&mut cx, &grip);
        assert!(policy.is_active());

        let mut grip = grip;
        let mut world = Transform::IDENTITY;
        policy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(world.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-4));

        let mut world = Transform::IDENTITY;
        policy.world_transform(&mut cx, &mut world, &mut grip);
        assert!(world.translation.abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!(!policy.is_active());

        assert_eq!(
            events,
            [
                GripEvent::LerpToHandBegin { grip: grip.id },
                GripEvent::LerpToHandFinished { grip: grip.id },
            ]
        );
    }

    #[test]
    fn short_distances_snap() {
        let mut policy = LerpToHandPolicy::new(LerpToHandConfig {
            min_distance: 10.0,
            ..LerpToHandConfig::DEFAULT
        });
        let grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.5,
            pivot: Transform::from_xyz(1.0, 0.0, 0.0),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.on_grip(&mut cx, &grip);
        assert!(!policy.is_active());
        assert_eq!(events, [GripEvent::LerpToHandFinished { grip: grip.id }]);
    }

    #[test]
    fn release_cancels_blend() {
        let mut policy = LerpToHandPolicy::default();
        let grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.1,
            pivot: Transform::from_xyz(3.0, 0.0, 0.0),
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        policy.on_grip(&mut cx, &grip);
        policy.on_grip_release(&mut cx, &grip, ReleaseKind::Released);
        assert!(!policy.is_blending());
    }
}
