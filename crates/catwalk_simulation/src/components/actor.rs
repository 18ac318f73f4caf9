//! Actor components: Player, Guard, Facing, SpawnPose

use bevy::prelude::*;

use crate::abilities::PlayerAbilities;
use crate::ai::{GuardBrain, GuardConfig, GuardState, PatrolRoute};
use crate::components::{MovementCommand, MovementProfile, NavigationState};
use crate::vision::{AlertLevel, VisionCone, VisionSensor};

/// The cat. Exactly one is expected; systems degrade gracefully when it is missing.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Transform, Facing, SpawnPose, PlayerAbilities)]
pub struct Player;

/// Guard marker. Required components give a working guard with default
/// tuning; spawn helpers overwrite config, route and sensor.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(
    Transform,
    Facing,
    SpawnPose,
    GuardState,
    GuardBrain,
    GuardConfig,
    PatrolRoute,
    VisionSensor,
    VisionCone,
    AlertLevel,
    MovementCommand,
    MovementProfile,
    NavigationState
)]
pub struct Guard;

/// Look direction (unit vector). Guards start facing down the screen.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Facing(pub Vec2);

impl Default for Facing {
    fn default() -> Self {
        Self(Vec2::NEG_Y)
    }
}

impl Facing {
    /// Normalized facing; zero vectors fall back to the default.
    pub fn new(direction: Vec2) -> Self {
        Self(direction.try_normalize().unwrap_or(Vec2::NEG_Y))
    }

    pub fn from_angle(radians: f32) -> Self {
        Self(Vec2::from_angle(radians))
    }

    pub fn angle(&self) -> f32 {
        self.0.to_angle()
    }

    /// Interpolates the heading towards `target` by fraction `t` (0..=1)
    /// along the shortest arc.
    pub fn turn_towards(&mut self, target: Vec2, t: f32) {
        let Some(target) = target.try_normalize() else {
            return;
        };
        let delta = self.0.angle_to(target);
        self.0 = Vec2::from_angle(delta * t.clamp(0.0, 1.0)).rotate(self.0).normalize_or(target);
    }

    /// Facing rotated by `degrees` (counter-clockwise).
    pub fn rotated(&self, degrees: f32) -> Vec2 {
        Vec2::from_angle(degrees.to_radians()).rotate(self.0)
    }
}

/// Spawn position/facing, captured when the guard is first simulated.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SpawnPose {
    pub position: Vec2,
    pub facing: Vec2,
}

impl Default for SpawnPose {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            facing: Vec2::NEG_Y,
        }
    }
}
