use alloc::{string::String, vec::Vec};

use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use vr_grip_math::{TransformExt, find_between, rolling_average};

use crate::{
    ComPlacement, DriveProfile, DriveProfileTag, GripHolder, GripPair, GripPolicyBehavior,
    GripRecord, GripSettings, HandleSettings, PolicyContext, ReleaseKind, TransformOverride,
    apply_secondary,
};

/// Physical surface identifier, as reported by the physics engine.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceType(pub u8);

/// How a melee weapon reacts to a surface.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct HitSurface {
    /// The surface.
    pub surface: SurfaceType,
    /// Weapons may lodge in this surface.
    pub allows_penetration: bool,
    /// Damage multiplier for blunt hits.
    pub blunt_damage_scaler: f32,
    /// Damage multiplier for sharp hits.
    pub sharp_damage_scaler: f32,
    /// Multiplies the squared stab speed before it is compared.
    pub stab_velocity_scaler: f32,
}

impl HitSurface {
    /// A penetrable surface with neutral scalers.
    pub const DEFAULT: Self = Self {
        surface: SurfaceType(0),
        allows_penetration: true,
        blunt_damage_scaler: 1.0,
        sharp_damage_scaler: 1.0,
        stab_velocity_scaler: 1.0,
    };
}

impl Default for HitSurface {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What a lodge region reacts to.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MeleeZone {
    /// Stabs only.
    Stab,
    /// Hits only.
    Hit,
    /// Both.
    #[default]
    StabAndHit,
}

/// A region of a melee weapon that can stab or hit, such as a blade tip.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LodgeComponent {
    /// Name reported in events.
    pub name: String,
    /// Pose of the region relative to the weapon. Its +X is the stab direction.
    pub transform: Transform,
    /// Local bounds of the region. `None` accepts impacts anywhere.
    pub bounds: Option<(Vec3, Vec3)>,
    /// What the region reacts to.
    pub zone: MeleeZone,
    /// Compare the full impulse instead of its forward component for hits.
    pub ignore_forward_for_hit_impulse: bool,
    /// Damage multiplier.
    pub damage_scaler: f32,
    /// How deep a lodged weapon may sink.
    pub penetration_depth: f32,
    /// Forward speed needed to stab.
    pub penetration_velocity: f32,
    /// Speed needed to hit.
    pub minimum_hit_velocity: f32,
    /// How far from head-on a stab may be, as `1 - |normal · forward|`.
    pub forward_range: f32,
    /// How far from head-on a hit may be.
    pub forward_range_for_hits: f32,
}

impl LodgeComponent {
    /// A region with default thresholds.
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            bounds: None,
            zone: MeleeZone::StabAndHit,
            ignore_forward_for_hit_impulse: false,
            damage_scaler: 1.0,
            penetration_depth: 100.0,
            penetration_velocity: 8000.0,
            minimum_hit_velocity: 1000.0,
            forward_range: 0.1,
            forward_range_for_hits: 0.1,
        }
    }

    fn contains(&self, weapon: &Transform, point: Vec3) -> bool {
        let Some((min, max)) = self.bounds else {
            return true;
        };
        let local = self.transform.then(weapon).inverse_transform_point(point);
        local.cmpge(min).all() && local.cmple(max).all()
    }
}

/// An impact reported against a held melee weapon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeleeImpact {
    /// Surface that was hit, if known.
    pub surface: Option<SurfaceType>,
    /// World impact point.
    pub point: Vec3,
    /// Impact normal.
    pub normal: Vec3,
    /// Impact velocity. `None` uses the weapon's rolling average velocity.
    pub velocity: Option<Vec3>,
}

/// Result of checking an impact.
#[derive(Clone, Debug, PartialEq)]
pub enum ImpactOutcome {
    /// The weapon should lodge. The caller decides whether it does.
    ShouldLodge {
        /// The region that stabbed.
        component: String,
        /// The surface.
        surface: HitSurface,
    },
    /// A hit strong enough to count.
    Hit {
        /// The region that hit.
        component: String,
        /// The surface.
        surface: HitSurface,
    },
    /// Nothing to report.
    Invalid,
}

/// Where the center of mass goes while a melee weapon is held.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MeleeComType {
    /// Leave it alone.
    Normal,
    /// Midway between the hands.
    #[default]
    BetweenHands,
    /// At the primary hand.
    PrimaryHand,
}

/// Which hand leads a two-handed melee weapon.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimaryHandSelection {
    /// The hand on a grip slot.
    Slotted,
    /// The rearmost hand along the forward axis.
    #[default]
    Rear,
    /// The foremost hand along the forward axis.
    Front,
}

/// Hand roles, center of mass and impact checks for melee weapons.
#[derive(Clone, Debug)]
pub struct MeleePolicy {
    /// Disabled policies leave the pose alone.
    pub active: bool,
    /// Facing of the weapon's forward axis relative to the weapon. Forward is +X.
    pub orientation: Transform,
    /// Center of mass placement.
    pub com_type: MeleeComType,
    /// Primary hand selection.
    pub primary_hand_selection: PrimaryHandSelection,
    /// Reassign roles on every grip, release and secondary grip.
    pub auto_set_hands: bool,
    /// Drive profile of the primary hand.
    pub primary_hand_profile: DriveProfile,
    /// Drive profile of the secondary hand.
    pub secondary_hand_profile: DriveProfile,
    /// Apply the primary profile while only one hand holds the weapon.
    pub primary_profile_with_one_hand: bool,
    /// Stabs need two hands.
    pub only_penetrate_with_two_hands: bool,
    /// Check impacts even while not held.
    pub always_check_impacts: bool,
    /// Keep late updates from moving the weapon.
    pub deny_late_updates: bool,
    /// Stab and hit regions.
    pub lodge_components: Vec<LodgeComponent>,
    /// Surfaces used instead of [`GripSettings::melee_surfaces`].
    pub surface_overrides: Vec<HitSurface>,
    primary: Option<GripPair>,
    secondary: Option<GripPair>,
    has_valid_primary: bool,
    held: bool,
    lodged: bool,
    revision: u32,
    last_pose: Option<Transform>,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

impl Default for MeleePolicy {
    fn default() -> Self {
        Self {
            active: true,
            orientation: Transform::IDENTITY,
            com_type: MeleeComType::BetweenHands,
            primary_hand_selection: PrimaryHandSelection::Rear,
            auto_set_hands: true,
            primary_hand_profile: DriveProfile::DEFAULT,
            secondary_hand_profile: DriveProfile::DEFAULT,
            primary_profile_with_one_hand: false,
            only_penetrate_with_two_hands: false,
            always_check_impacts: false,
            deny_late_updates: true,
            lodge_components: Vec::new(),
            surface_overrides: Vec::new(),
            primary: None,
            secondary: None,
            has_valid_primary: false,
            held: false,
            lodged: false,
            revision: 0,
            last_pose: None,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl MeleePolicy {
    /// Adds a component that can lodge into surfaces.
    pub fn with_lodge_component(mut self, component: LodgeComponent) -> Self {
        self.lodge_components.push(component);
        self
    }

    /// The primary hand, if assigned.
    pub fn primary_hand(&self) -> Option<GripPair> {
        self.primary
    }

    /// The secondary hand, if assigned.
    pub fn secondary_hand(&self) -> Option<GripPair> {
        self.secondary
    }

    /// True if the primary hand was chosen by position or slot rather than by
    /// arrival order.
    pub fn has_valid_primary(&self) -> bool {
        self.has_valid_primary
    }

    /// Assigns hand roles by hand. Used with `auto_set_hands` off.
    pub fn set_hands(&mut self, primary: Option<GripPair>, secondary: Option<GripPair>) {
        self.primary = primary;
        self.secondary = secondary;
        self.has_valid_primary = primary.is_some();
        self.revision = self.revision.wrapping_add(1);
    }

    /// Marks the weapon as lodged, which suppresses impact checks.
    pub fn set_lodged(&mut self, lodged: bool) {
        self.lodged = lodged;
    }

    /// True while lodged.
    pub fn is_lodged(&self) -> bool {
        self.lodged
    }

    /// Rolling average linear velocity of the weapon.
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Rolling average angular velocity of the weapon, in radians per second.
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn forward(&self) -> Vec3 {
        self.orientation.rotation * Vec3::X
    }

    fn axis_position(&self, holder: &GripHolder) -> f32 {
        holder
            .relative_transform
            .inverse()
            .relative_to(&self.orientation)
            .translation
            .x
    }

    /// Reassigns roles from the current holders.
    fn update_roles(&mut self, holders: &[GripHolder]) {
        self.revision = self.revision.wrapping_add(1);
        if !self.auto_set_hands {
            return;
        }
        self.primary = None;
        self.secondary = None;
        self.has_valid_primary = false;

        if let [only] = holders {
            self.primary = Some(only.pair);
            self.has_valid_primary = true;
            return;
        }

        let rear = self.primary_hand_selection == PrimaryHandSelection::Rear;
        let mut primary_x = 0.0;
        let mut secondary_x = 0.0;
        for holder in holders {
            match self.primary_hand_selection {
                PrimaryHandSelection::Slotted => {
                    if holder.is_slot_grip {
                        self.primary = Some(holder.pair);
                        self.has_valid_primary = true;
                    } else {
                        self.primary.get_or_insert(holder.pair);
                        self.secondary = Some(holder.pair);
                    }
                }
                PrimaryHandSelection::Rear | PrimaryHandSelection::Front => {
                    let x = self.axis_position(holder);
                    let leads = if rear { x < primary_x } else { x > primary_x };
                    if leads || self.primary.is_none() {
                        self.primary = Some(holder.pair);
                        primary_x = x;
                        self.has_valid_primary = true;
                    }
                    let trails = if rear { x > secondary_x } else { x < secondary_x };
                    if trails || self.secondary.is_none() || self.secondary == self.primary {
                        self.secondary = Some(holder.pair);
                        secondary_x = x;
                    }
                }
            }
        }
        if self.secondary == self.primary {
            self.secondary = None;
        }
        tracing::trace!(primary = ?self.primary, secondary = ?self.secondary, "melee hands updated");
    }

    /// The weapon-local point the center of mass moves to.
    pub fn grip_center(&self, holders: &[GripHolder]) -> Option<Vec3> {
        let find = |pair: Option<GripPair>| {
            pair.and_then(|pair| holders.iter().find(|holder| holder.pair == pair))
        };
        match (self.com_type, find(self.primary), find(self.secondary)) {
            (MeleeComType::Normal, _, _) => None,
            (MeleeComType::BetweenHands, Some(primary), Some(secondary)) => {
                Some((primary.hand_location() + secondary.hand_location()) / 2.0)
            }
            (MeleeComType::PrimaryHand, Some(primary), Some(_)) => Some(primary.hand_location()),
            (com_type, Some(primary), None) => {
                let second = primary.secondary_location?;
                Some(match com_type {
                    MeleeComType::PrimaryHand => primary.hand_location(),
                    _ => (primary.hand_location() + second) / 2.0,
                })
            }
            _ => None,
        }
    }

    fn set_com_between_hands(&self, cx: &PolicyContext<'_>, handle: &mut HandleSettings) {
        if let Some(center) = self.grip_center(&cx.target.holders) {
            handle.com_override = Some(handle.root_bone_rotation.transform_point(center));
            handle.set_com = true;
            handle.skip_resetting_com = true;
        }
    }

    /// Checks an impact against the lodge regions.
    pub fn check_impact(
        &self,
        weapon: &Transform,
        impact: &MeleeImpact,
        settings: &GripSettings,
    ) -> ImpactOutcome {
        if !self.active || self.lodged || !(self.held || self.always_check_impacts) {
            return ImpactOutcome::Invalid;
        }

        let surfaces = if self.surface_overrides.is_empty() {
            &settings.melee_surfaces
        } else {
            &self.surface_overrides
        };
        let mut surface = HitSurface {
            surface: impact.surface.unwrap_or_default(),
            ..HitSurface::DEFAULT
        };
        if !surfaces.is_empty() {
            let Some(kind) = impact.surface else {
                return ImpactOutcome::Invalid;
            };
            match surfaces.iter().find(|entry| entry.surface == kind) {
                Some(entry) => surface = *entry,
                None => surface.allows_penetration = false,
            }
        }

        let velocity = impact.velocity.unwrap_or(self.linear_velocity);
        let full_squared = velocity.length_squared();
        let may_stab = surface.allows_penetration
            && (!self.only_penetrate_with_two_hands || self.secondary.is_some());

        let mut first_hit = None;
        for component in &self.lodge_components {
            if !component.contains(weapon, impact.point) {
                continue;
            }
            let forward = (weapon.rotation * component.transform.rotation * Vec3::X).normalize_or_zero();
            let facing = impact.normal.dot(forward).abs();
            let forward_squared = velocity.project_onto_normalized(forward).length_squared();

            if may_stab
                && component.zone != MeleeZone::Hit
                && facing >= 1.0 - component.forward_range
                && forward_squared * surface.stab_velocity_scaler
                    >= component.penetration_velocity * component.penetration_velocity
            {
                return ImpactOutcome::ShouldLodge {
                    component: component.name.clone(),
                    surface,
                };
            }

            let hit_squared = if component.ignore_forward_for_hit_impulse {
                full_squared
            } else {
                forward_squared
            };
            if first_hit.is_none()
                && component.zone != MeleeZone::Stab
                && facing >= 1.0 - component.forward_range_for_hits
                && hit_squared >= component.minimum_hit_velocity * component.minimum_hit_velocity
            {
                first_hit = Some(component);
            }
        }

        match first_hit {
            Some(component) => ImpactOutcome::Hit {
                component: component.name.clone(),
                surface,
            },
            None => ImpactOutcome::Invalid,
        }
    }

    fn track_velocity(&mut self, pose: &Transform, delta_time: f32, samples: u32) {
        if delta_time <= 0.0 {
            return;
        }
        if let Some(last) = self.last_pose {
            let linear = (pose.translation - last.translation) / delta_time;
            let (axis, angle) = (pose.rotation * last.rotation.inverse()).to_axis_angle();
            let angle = if angle > core::f32::consts::PI {
                angle - core::f32::consts::TAU
            } else {
                angle
            };
            let angular = axis * angle / delta_time;
            self.linear_velocity = rolling_average(self.linear_velocity, linear, samples);
            self.angular_velocity = rolling_average(self.angular_velocity, angular, samples);
        }
        self.last_pose = Some(*pose);
    }
}

fn plane_project(vector: Vec3, normal: Vec3) -> Vec3 {
    vector - vector.project_onto_normalized(normal)
}

impl GripPolicyBehavior for MeleePolicy {
    fn name(&self) -> &str {
        "melee"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn transform_override(&self) -> TransformOverride {
        TransformOverride::Overrides
    }

    fn wants_deny_late_update(&self) -> bool {
        self.deny_late_updates
    }

    fn on_grip(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        if !self.active {
            return;
        }
        self.held = true;
        self.update_roles(&cx.target.holders);
    }

    fn on_grip_release(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord, _kind: ReleaseKind) {
        if !self.active {
            return;
        }
        self.held = !cx.target.holders.is_empty();
        if !self.held {
            self.last_pose = None;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.update_roles(&cx.target.holders);
    }

    fn on_secondary_grip(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        if self.active {
            self.update_roles(&cx.target.holders);
        }
    }

    fn on_secondary_grip_release(&mut self, cx: &mut PolicyContext<'_>, _grip: &GripRecord) {
        if self.active {
            self.update_roles(&cx.target.holders);
        }
    }

    fn com_placement(&self, cx: &PolicyContext<'_>, grip: &GripRecord) -> Option<ComPlacement> {
        if !self.active {
            return None;
        }
        if self.secondary.is_none() {
            return None;
        }
        let pair = GripPair::new(cx.controller, grip.id);
        if Some(pair) == self.secondary {
            Some(ComPlacement::GripAtControllerLoc)
        } else if Some(pair) == self.primary {
            Some(match self.com_type {
                MeleeComType::PrimaryHand => ComPlacement::SetAndGripAt,
                _ => ComPlacement::GripAtControllerLoc,
            })
        } else {
            None
        }
    }

    fn pre_physics_handle(
        &mut self,
        _cx: &mut PolicyContext<'_>,
        _grip: &GripRecord,
        handle: &mut HandleSettings,
        anchor: &mut Transform,
    ) {
        if !self.active || self.orientation.rotation == Quat::IDENTITY {
            return;
        }
        let delta = handle.root_bone_rotation.rotation.inverse() * self.orientation.rotation;
        anchor.rotation = (anchor.rotation * delta).normalize();
        handle.com_offset.rotation = (handle.com_offset.rotation * delta).normalize();
    }

    fn post_physics_handle(&mut self, cx: &mut PolicyContext<'_>, grip: &GripRecord, handle: &mut HandleSettings) {
        if !self.active {
            return;
        }
        let pair = GripPair::new(cx.controller, grip.id);
        if self.secondary.is_some() {
            if Some(pair) == self.secondary {
                self.secondary_hand_profile.fill_to(&mut handle.drive);
                handle.profile = DriveProfileTag::SecondaryHand;
            } else if Some(pair) == self.primary {
                if self.has_valid_primary {
                    self.primary_hand_profile.fill_to(&mut handle.drive);
                    handle.profile = DriveProfileTag::PrimaryHand;
                } else {
                    self.secondary_hand_profile.fill_to(&mut handle.drive);
                    handle.profile = DriveProfileTag::SecondaryHand;
                }
            }
        } else if self.primary_profile_with_one_hand {
            self.primary_hand_profile.fill_to(&mut handle.drive);
            handle.profile = DriveProfileTag::PrimaryHand;
        }
        if self.com_type != MeleeComType::Normal {
            self.set_com_between_hands(cx, handle);
        }
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn world_transform(
        &mut self,
        cx: &mut PolicyContext<'_>,
        world: &mut Transform,
        grip: &mut GripRecord,
    ) -> bool {
        *world = grip.base_world_transform(&cx.pivot);

        if grip.secondary.influences_pose() {
            if grip.secondary.has_attachment()
                && let Some(location) = cx.target.secondary_location
            {
                world.translation = (cx.pivot.translation + location) / 2.0;
            }

            let secondary_transform = grip.relative_transform.then(&cx.pivot);
            let smoothing = grip.advanced.secondary.smoothing;
            apply_secondary(
                cx,
                grip,
                world,
                cx.pivot.translation,
                &secondary_transform,
                smoothing,
            );

            // Roll the weapon about its forward axis so it stays aligned with
            // the primary hand.
            let forward = self.forward();
            let original = plane_project(grip.relative_transform.inverse().translation, forward);
            let current = plane_project(world.inverse_transform_point(cx.pivot.translation), forward);
            let delta = find_between(original, current);
            world.rotation = (world.rotation * delta).normalize();
        }

        let tracks = self.primary.is_none_or(|pair| pair == GripPair::new(cx.controller, grip.id));
        if tracks {
            self.track_velocity(world, cx.delta_time, cx.settings.velocity.samples);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_parts, holder_at, record_with};
    use crate::{ControllerId, GripCollisionType, HandleDrive};

    fn blade() -> LodgeComponent {
        LodgeComponent::new("tip", Transform::IDENTITY)
    }

    fn sword() -> MeleePolicy {
        let mut sword = MeleePolicy {
            lodge_components: alloc::vec![blade()],
            ..Default::default()
        };
        sword.held = true;
        sword
    }

    #[test]
    fn rear_hand_becomes_primary() {
        let mut melee = MeleePolicy::default();
        // Hands at x = 0.2 and x = -0.3 along the weapon.
        let front = holder_at(1, 1, Vec3::new(0.2, 0.0, 0.0));
        let rear = holder_at(2, 1, Vec3::new(-0.3, 0.0, 0.0));
        melee.update_roles(&[front.clone(), rear.clone()]);
        assert_eq!(melee.primary_hand(), Some(rear.pair));
        assert_eq!(melee.secondary_hand(), Some(front.pair));
        assert!(melee.has_valid_primary());

        melee.primary_hand_selection = PrimaryHandSelection::Front;
        melee.update_roles(&[front.clone(), rear.clone()]);
        assert_eq!(melee.primary_hand(), Some(front.pair));
        assert_eq!(melee.secondary_hand(), Some(rear.pair));
    }

    #[test]
    fn slotted_primary_needs_a_slot() {
        let mut melee = MeleePolicy {
            primary_hand_selection: PrimaryHandSelection::Slotted,
            ..Default::default()
        };
        let a = holder_at(1, 1, Vec3::X);
        let b = holder_at(2, 1, -Vec3::X);
        melee.update_roles(&[a.clone(), b.clone()]);
        assert!(!melee.has_valid_primary());
        assert_eq!(melee.primary_hand(), Some(a.pair));
        assert_eq!(melee.secondary_hand(), Some(b.pair));

        let mut slotted = b.clone();
        slotted.is_slot_grip = true;
        melee.update_roles(&[a.clone(), slotted.clone()]);
        assert!(melee.has_valid_primary());
        assert_eq!(melee.primary_hand(), Some(slotted.pair));
        assert_eq!(melee.secondary_hand(), Some(a.pair));
    }

    #[test]
    fn center_of_mass_moves_between_hands() {
        let mut melee = MeleePolicy::default();
        let a = holder_at(1, 1, Vec3::new(0.4, 0.0, 0.0));
        let b = holder_at(2, 1, Vec3::new(-0.2, 0.0, 0.0));
        melee.update_roles(&[a.clone(), b.clone()]);
        let center = melee.grip_center(&[a.clone(), b.clone()]);
        assert!(center.is_some_and(|c| c.abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), 1e-5)));

        let (mut snapshot, settings, mut events) = context_parts();
        snapshot.holders = alloc::vec![a.clone(), b.clone()];
        let mut cx = PolicyContext {
            controller: ControllerId(2),
            delta_time: 0.016,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let grip = GripRecord::new(b.pair.grip, snapshot.id, GripCollisionType::InteractiveCollisionWithPhysics);
        melee.primary_hand_profile.linear_stiffness = 9000.0;
        let mut handle = HandleSettings::new(HandleDrive::DEFAULT);
        melee.post_physics_handle(&mut cx, &grip, &mut handle);
        assert_eq!(handle.profile, DriveProfileTag::PrimaryHand);
        assert_eq!(handle.drive.linear.stiffness, 9000.0);
        assert!(handle.set_com && handle.skip_resetting_com);
        assert!(handle.com_override.is_some_and(|c| c.abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), 1e-5)));
        assert_eq!(
            melee.com_placement(&cx, &grip),
            Some(ComPlacement::GripAtControllerLoc)
        );
    }

    #[test]
    fn head_on_fast_impact_should_lodge() {
        let sword = sword();
        let impact = MeleeImpact {
            surface: None,
            point: Vec3::ZERO,
            normal: -Vec3::X,
            velocity: Some(Vec3::new(9000.0, 0.0, 0.0)),
        };
        let outcome = sword.check_impact(&Transform::IDENTITY, &impact, &GripSettings::DEFAULT);
        assert!(matches!(outcome, ImpactOutcome::ShouldLodge { .. }));
    }

    #[test]
    fn glancing_or_slow_impacts_only_hit() {
        let sword = sword();
        let slow = MeleeImpact {
            surface: None,
            point: Vec3::ZERO,
            normal: Vec3::X,
            velocity: Some(Vec3::new(2000.0, 0.0, 0.0)),
        };
        let outcome = sword.check_impact(&Transform::IDENTITY, &slow, &GripSettings::DEFAULT);
        assert!(matches!(outcome, ImpactOutcome::Hit { .. }));

        let glancing = MeleeImpact {
            normal: Vec3::Y,
            ..slow
        };
        let outcome = sword.check_impact(&Transform::IDENTITY, &glancing, &GripSettings::DEFAULT);
        assert_eq!(outcome, ImpactOutcome::Invalid);
    }

    #[test]
    fn unlisted_surface_blocks_penetration() {
        let sword = sword();
        let mut settings = GripSettings::DEFAULT;
        settings.melee_surfaces.push(HitSurface {
            surface: SurfaceType(3),
            ..HitSurface::DEFAULT
        });
        let impact = MeleeImpact {
            surface: Some(SurfaceType(4)),
            point: Vec3::ZERO,
            normal: Vec3::X,
            velocity: Some(Vec3::new(9000.0, 0.0, 0.0)),
        };
        let outcome = sword.check_impact(&Transform::IDENTITY, &impact, &settings);
        assert!(matches!(outcome, ImpactOutcome::Hit { .. }));

        let unknown = MeleeImpact {
            surface: None,
            ..impact
        };
        assert_eq!(
            sword.check_impact(&Transform::IDENTITY, &unknown, &settings),
            ImpactOutcome::Invalid
        );
    }

    #[test]
    fn lodged_weapons_ignore_impacts() {
        let mut sword = sword();
        sword.set_lodged(true);
        let impact = MeleeImpact {
            surface: None,
            point: Vec3::ZERO,
            normal: Vec3::X,
            velocity: Some(Vec3::new(9000.0, 0.0, 0.0)),
        };
        assert_eq!(
            sword.check_impact(&Transform::IDENTITY, &impact, &GripSettings::DEFAULT),
            ImpactOutcome::Invalid
        );
    }

    #[test]
    fn velocity_is_averaged_while_held() {
        let mut melee = MeleePolicy::default();
        let grip = record_with(GripCollisionType::InteractiveCollisionWithSweep);
        let (snapshot, settings, mut events) = context_parts();
        let mut cx = PolicyContext {
            controller: ControllerId(0),
            delta_time: 0.5,
            pivot: Transform::IDENTITY,
            target: &snapshot,
            settings: &settings,
            for_teleport: false,
            events: &mut events,
        };
        let mut grip = grip;
        let mut world = Transform::IDENTITY;
        melee.world_transform(&mut cx, &mut world, &mut grip);
        cx.pivot = Transform::from_xyz(1.0, 0.0, 0.0);
        melee.world_transform(&mut cx, &mut world, &mut grip);
        assert!(melee.linear_velocity().x > 0.0);
    }
}
