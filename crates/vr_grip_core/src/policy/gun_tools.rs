use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use vr_grip_math::{
    GRIP_EULER, OneEuroConfig, OneEuroFilter, TransformExt, find_between, pure_yaw,
    rotate_about_pivot, translation_only,
};

use crate::{
    GripEvent, GripPolicyBehavior, GripRecord, HandleSettings, LerpState, PolicyContext,
    SecondaryFrame, SecondaryGripType, TransformOverride, secondary_scale,
};

/// Shoulder mount tuning for two-handed guns.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualStockSettings {
    /// Only mount while the primary hand is within `snap_distance` of the shoulder.
    pub distance_based_snapping: bool,
    /// Mount range.
    pub snap_distance: f32,
    /// Width of the band inside `snap_distance` over which the mount blends in.
    pub snap_lerp_threshold: f32,
    /// Shoulder offset from the head, in the head's yaw frame.
    pub snap_offset: Vec3,
    /// Keep the mount no higher than the primary hand.
    pub adjust_height_to_primary_hand: bool,
}

impl VirtualStockSettings {
    /// Distance snapping within 35 units, blending over the last 20.
    pub const DEFAULT: Self = Self {
        distance_based_snapping: true,
        snap_distance: 35.0,
        snap_lerp_threshold: 20.0,
        snap_offset: Vec3::ZERO,
        adjust_height_to_primary_hand: true,
    };
}

impl Default for VirtualStockSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Second hand tuning for guns.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GunSecondarySettings {
    /// Enables the constant smoothing and distance influence below.
    pub advanced: bool,
    /// How much of the smoothed hand location to use, from 0 to 1.
    pub grip_scaler: f32,
    /// Smooth every tick rather than only while blending in.
    pub constant_grip_scaler: bool,
    /// Take the smoothing filter from [`GripSettings`](crate::GripSettings).
    pub use_global_smoothing: bool,
    /// Smoothing filter when not using the global one.
    pub smoothing: OneEuroConfig,
    /// Weaken the second hand's aim as it strays from where it attached.
    pub distance_influence: bool,
    /// Distance the second hand may stray with full influence.
    pub influence_dead_zone: f32,
    /// Distance past the dead zone at which influence reaches zero.
    pub influence_distance_to_zero: f32,
}

impl GunSecondarySettings {
    /// Smoothing off, distance influence off.
    pub const DEFAULT: Self = Self {
        advanced: false,
        grip_scaler: 0.0,
        constant_grip_scaler: false,
        use_global_smoothing: true,
        smoothing: OneEuroConfig::DEFAULT,
        distance_influence: false,
        influence_dead_zone: 50.0,
        influence_distance_to_zero: 100.0,
    };
}

impl Default for GunSecondarySettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Kick applied on top of the held pose.
///
/// Rotation limits are `(yaw, pitch, roll)` in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RecoilSettings {
    /// Accept recoil instances.
    pub enabled: bool,
    /// Largest accumulated translation per axis.
    pub max_translation: Vec3,
    /// Largest accumulated rotation per axis.
    pub max_rotation: Vec3,
    /// Largest accumulated scale per axis.
    pub max_scale: Vec3,
    /// How fast accumulated recoil fades, per second.
    pub decay_rate: f32,
    /// How fast the gun follows accumulated recoil, per second.
    pub lerp_rate: f32,
}

impl RecoilSettings {
    /// Recoil disabled.
    pub const DEFAULT: Self = Self {
        enabled: false,
        max_translation: Vec3::ZERO,
        max_rotation: Vec3::ZERO,
        max_scale: Vec3::ONE,
        decay_rate: 20.0,
        lerp_rate: 30.0,
    };
}

impl Default for RecoilSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Recoil, virtual stock and two-hand aiming for guns.
#[derive(Clone, Debug)]
pub struct GunToolsPolicy {
    /// Disabled policies leave the pose alone.
    pub active: bool,
    /// Offset of the aiming pivot from the grip, applied to slot grips.
    pub pivot_offset: Vec3,
    /// Facing of the gun's forward axis relative to the target, if it is not +X.
    pub orientation: Option<Transform>,
    /// Second hand tuning.
    pub secondary: GunSecondarySettings,
    /// Mount to the shoulder while aiming with two hands.
    pub use_virtual_stock: bool,
    /// Copy [`GripSettings::virtual_stock`](crate::GripSettings::virtual_stock) at grip time.
    pub use_global_virtual_stock: bool,
    /// Shoulder mount tuning.
    pub virtual_stock: VirtualStockSettings,
    /// Recoil tuning.
    pub recoil: RecoilSettings,
    stored_root_offset: Quat,
    smoothing: OneEuroFilter<Vec3>,
    mount: Transform,
    mounted: bool,
    stock_lerp: f32,
    release_relative: Transform,
    recoil_storage: Transform,
    recoil_target: Transform,
    recoil_active: bool,
}

impl Default for GunToolsPolicy {
    fn default() -> Self {
        Self {
            active: true,
            pivot_offset: Vec3::ZERO,
            orientation: None,
            secondary: GunSecondarySettings::DEFAULT,
            use_virtual_stock: false,
            use_global_virtual_stock: true,
            virtual_stock: VirtualStockSettings::DEFAULT,
            recoil: RecoilSettings::DEFAULT,
            stored_root_offset: Quat::IDENTITY,
            smoothing: OneEuroFilter::new(OneEuroConfig::DEFAULT),
            mount: Transform::IDENTITY,
            mounted: false,
            stock_lerp: 0.0,
            release_relative: Transform::IDENTITY,
            recoil_storage: Transform::IDENTITY,
            recoil_target: Transform::IDENTITY,
            recoil_active: false,
        }
    }
}

impl GunToolsPolicy {
    /// True while the stock is mounted to the shoulder.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Current shoulder mount pose.
    pub fn mount_transform(&self) -> Transform {
        self.mount
    }

    /// True while recoil is still settling.
    pub fn has_active_recoil(&self) -> bool {
        self.recoil_active
    }

    /// Accumulated recoil currently applied.
    pub fn recoil_offset(&self) -> Transform {
        self.recoil_storage
    }

    /// Adds a kick, clamped to the recoil limits.
    pub fn add_recoil(&mut self, kick: &Transform) {
        if !self.recoil.enabled {
            return;
        }
        let limits = &self.recoil;
        let target = &mut self.recoil_target;

        let max_t = limits.max_translation.abs();
        target.translation = (target.translation + kick.translation).clamp(-max_t, max_t);

        let max_s = limits.max_scale.abs();
        target.scale = (target.scale * kick.scale).max(-max_s).min(max_s);

        let max_r = limits.max_rotation.abs();
        let (yaw, pitch, roll) = (kick.rotation * target.rotation).to_euler(GRIP_EULER);
        target.rotation = Quat::from_euler(
            GRIP_EULER,
            yaw.max(-max_r.x).min(max_r.x),
            pitch.max(-max_r.y).min(max_r.y),
            roll.max(-max_r.z).min(max_r.z),
        );

        self.recoil_active = !target.abs_diff_eq(&Transform::IDENTITY, 1e-4);
    }

    /// Clears all recoil immediately.
    pub fn reset_recoil(&mut self) {
        self.recoil_storage = Transform::IDENTITY;
        self.recoil_target = Transform::IDENTITY;
        self.recoil_active = false;
    }

    fn tick_recoil(&mut self, delta_time: f32) {
        if !self.recoil.enabled || !self.recoil_active {
            return;
        }
        self.recoil_storage = self.recoil_storage.blend(
            &self.recoil_target,
            (self.recoil.lerp_rate * delta_time).clamp(0.0, 1.0),
        );
        self.recoil_target = self.recoil_target.blend(
            &Transform::IDENTITY,
            (self.recoil.decay_rate * delta_time).clamp(0.0, 1.0),
        );
        if self.recoil_target.abs_diff_eq(&Transform::IDENTITY, 1e-4) {
            self.reset_recoil();
        }
    }

    fn reset_smoothing(&mut self, cx: &PolicyContext<'_>) {
        let config = if self.secondary.use_global_smoothing {
            cx.settings.secondary_smoothing
        } else {
            self.secondary.smoothing
        };
        self.smoothing = OneEuroFilter::new(config);
    }

    fn set_mounted(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord, mounted: bool) {
        if self.mounted == mounted {
            return;
        }
        self.mounted = mounted;
        if !mounted {
            self.stock_lerp = 0.0;
        }
        tracing::debug!(grip = %grip.id, mounted, "virtual stock changed");
        cx.events.push(GripEvent::VirtualStockChanged {
            grip: grip.id,
            mounted,
            mount: self.mount,
        });
    }

    fn update_virtual_stock(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord) {
        if !grip.secondary.has_attachment() {
            self.set_mounted(cx, grip, false);
            return;
        }
        if !self.use_virtual_stock {
            return;
        }

        let stock = self.virtual_stock;
        if let Some(head) = cx.target.head_transform {
            let yaw = pure_yaw(head.rotation);
            self.mount = Transform::from_translation(head.translation + yaw * stock.snap_offset)
                .with_rotation(yaw);
        }

        let hand = cx.pivot.translation;
        let snap_squared = stock.snap_distance * stock.snap_distance;
        let distance_squared = hand.distance_squared(self.mount.translation);

        if stock.distance_based_snapping && distance_squared > snap_squared {
            self.set_mounted(cx, grip, false);
            return;
        }

        let threshold_squared = stock.snap_lerp_threshold * stock.snap_lerp_threshold;
        self.stock_lerp = if threshold_squared > 0.0 {
            1.0 - ((distance_squared - (snap_squared - threshold_squared)) / threshold_squared)
                .clamp(0.0, 1.0)
        } else {
            1.0
        };

        if stock.adjust_height_to_primary_hand && self.mount.translation.y >= hand.y {
            self.mount.translation.y = hand.y;
        }
        self.set_mounted(cx, grip, true);
    }

    fn aim_pivot(&self, grip: &GripRecord, secondary_transform: &Transform, hand: Vec3) -> Vec3 {
        if !grip.is_slot_grip || self.pivot_offset == Vec3::ZERO {
            return hand;
        }
        let facing = self
            .orientation
            .map_or(Quat::IDENTITY, |orientation| orientation.rotation);
        let local = secondary_transform.inverse_transform_point_no_scale(hand)
            + self.stored_root_offset * facing * self.pivot_offset;
        secondary_transform.transform_point_no_scale(local)
    }

    fn smooth_front(&mut self, grip: &GripRecord, front: Vec3, delta_time: f32) -> Vec3 {
        let smooth = match grip.secondary.lerp_state {
            LerpState::StartLerp => self.secondary.grip_scaler < 1.0,
            _ => self.secondary.advanced && self.secondary.constant_grip_scaler,
        };
        if !smooth {
            return front;
        }
        let smoothed = self.smoothing.run(front, delta_time);
        front.lerp(smoothed, self.secondary.grip_scaler)
    }
}

impl GripPolicyBehavior for GunToolsPolicy {
    fn name(&self) -> &str {
        "gun_tools"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn transform_override(&self) -> TransformOverride {
        TransformOverride::Overrides
    }

    fn on_grip(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        if self.use_global_virtual_stock {
            self.virtual_stock = cx.settings.virtual_stock;
        }
        self.reset_smoothing(cx);
    }

    fn on_secondary_grip(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        self.reset_smoothing(cx);
    }

    fn pre_physics_handle(
        &mut self,
        _cx: &mut PolicyContext<'_>,
        grip: &GripRecord,
        handle: &mut HandleSettings,
        anchor: &mut Transform,
    ) {
        if !self.active {
            return;
        }
        self.stored_root_offset = match self.orientation {
            Some(facing) => {
                let offset = handle.root_bone_rotation.rotation.inverse() * facing.rotation;
                anchor.rotation = (anchor.rotation * offset).normalize();
                handle.com_offset.rotation = (handle.com_offset.rotation * offset).normalize();
                offset
            }
            None => Quat::IDENTITY,
        };

        if grip.is_slot_grip && self.pivot_offset != Vec3::ZERO {
            anchor.translation = anchor.transform_point(self.pivot_offset);
            handle.com_offset.translation = handle.com_offset.transform_point(self.pivot_offset);
        }
    }

    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        self.tick_recoil(cx.delta_time);

        *world = if self.recoil_active {
            let pivot = grip.relative_transform.inverse().translation + self.pivot_offset;
            translation_only(-pivot)
                .then(&self.recoil_storage)
                .then(&translation_only(pivot))
                .then(&grip.base_world_transform(&cx.pivot))
        } else {
            grip.base_world_transform(&cx.pivot)
        };

        self.update_virtual_stock(cx, grip);

        if !grip.secondary.influences_pose()
            || cx.target.secondary_grip_type == SecondaryGripType::Custom
        {
            return true;
        }

        let state = grip.secondary.lerp_state;
        let factor = grip.secondary.lerp_factor();

        if state == LerpState::EndLerp {
            let released = self.release_relative.then(&cx.pivot);
            *world = world.blend(&released, 1.0 - factor.unwrap_or(1.0));
            return true;
        }

        let Some(location) = cx.target.secondary_location else {
            return true;
        };

        let secondary_transform = grip.relative_transform.then(&cx.pivot);
        let base_point = cx.pivot.translation;
        let pivot = self.aim_pivot(grip, &secondary_transform, base_point);

        let mut front = self.smooth_front(grip, location - base_point, cx.delta_time);
        let front_orig = secondary_transform
            .transform_point(grip.secondary.relative_transform.translation)
            - base_point;
        grip.secondary.last_relative_location = front;

        let frame = SecondaryFrame {
            front,
            front_orig,
            lerp: factor.map(|factor| (state, factor)),
        };
        let secondary_type = cx.target.secondary_grip_type;
        let scaler = if secondary_type.scales() {
            secondary_scale(&frame, world.scale, grip)
        } else {
            Vec3::ONE
        };

        let distance = front_orig.distance(front);
        grip.secondary.set_distance(distance);

        if self.secondary.advanced && self.secondary.distance_influence {
            let influence = 1.0
                - ((distance - self.secondary.influence_dead_zone)
                    / self.secondary.influence_distance_to_zero.max(1.0))
                .clamp(0.0, 1.0);
            front = front_orig.lerp(front, influence);
        }

        let scale_only = |rotation: Quat| Transform {
            translation: Vec3::ZERO,
            rotation,
            scale: scaler,
        };
        let mount = self.mount.translation;
        let aimed = if self.mounted && self.use_virtual_stock {
            let mount_addition = find_between(front_orig, cx.pivot.translation - mount);
            let mounted = if secondary_type.rotates() {
                let aim = find_between(cx.pivot.translation - mount, front + base_point - mount);
                Transform::from_rotation(mount_addition).then(&scale_only(aim))
            } else {
                scale_only(mount_addition)
            };
            if self.stock_lerp < 1.0 {
                let free = if secondary_type.rotates() {
                    scale_only(find_between(front_orig, front))
                } else {
                    scale_only(Quat::IDENTITY)
                };
                free.blend(&mounted, self.stock_lerp)
            } else {
                mounted
            }
        } else if secondary_type.rotates() {
            scale_only(find_between(front_orig, front))
        } else {
            scale_only(Quat::IDENTITY)
        };

        let new_world = rotate_about_pivot(world, pivot, &aimed);
        *world = match (state, factor) {
            (LerpState::StartLerp, Some(factor)) => world.blend(&new_world, factor),
            _ => new_world,
        };

        if grip.secondary.has_attachment() {
            self.release_relative = world.relative_to(&cx.pivot);
        }
        true
    }
}
