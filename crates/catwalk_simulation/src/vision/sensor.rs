//! Line-of-sight visibility test.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::physics::{ObstacleQuery, LAYER_PLAYER, MASK_VISION_BLOCKERS};

/// Slack on the half-angle test so a target exactly on the cone edge counts as inside.
const ANGLE_EPSILON: f32 = 1e-4;

/// Slack on "the ray hit something at/after the target".
const DISTANCE_EPSILON: f32 = 1e-4;

/// Vision sensor attached to guards and security cameras.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct VisionSensor {
    /// Max distance (inclusive)
    pub range: f32,
    /// Full field of view in degrees
    pub angle_degrees: f32,
    /// Layers that block sight
    pub blockers: u32,
    /// Layers that count as "the target itself" when hit
    pub targets: u32,
}

impl Default for VisionSensor {
    fn default() -> Self {
        Self::new(8.0, 90.0)
    }
}

impl VisionSensor {
    pub fn new(range: f32, angle_degrees: f32) -> Self {
        Self {
            range,
            angle_degrees,
            blockers: MASK_VISION_BLOCKERS,
            targets: LAYER_PLAYER,
        }
    }

    /// Zero range or zero angle: sees nothing, draws nothing.
    pub fn is_degenerate(&self) -> bool {
        !(self.range > 0.0 && self.angle_degrees > 0.0)
    }

    pub fn half_angle(&self) -> f32 {
        (self.angle_degrees * 0.5).to_radians()
    }

    /// Visible iff within range, within the half-angle of `facing`, and the
    /// segment origin→target is not blocked before reaching the target.
    pub fn can_see(&self, origin: Vec2, facing: Vec2, target: Vec2, obstacles: &dyn ObstacleQuery) -> bool {
        if self.is_degenerate() {
            return false;
        }

        let to_target = target - origin;
        let distance = to_target.length();
        if distance > self.range {
            return false;
        }
        // Standing on the sensor
        if distance <= f32::EPSILON {
            return true;
        }

        let Some(facing) = facing.try_normalize() else {
            return false;
        };
        if facing.angle_to(to_target).abs() > self.half_angle() + ANGLE_EPSILON {
            return false;
        }

        match obstacles.raycast(origin, to_target, distance, self.blockers | self.targets) {
            None => true,
            Some(hit) => hit.layers & self.targets != 0 || hit.distance >= distance - DISTANCE_EPSILON,
        }
    }
}

/// Sensor tuning shared by the polygon builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConeConfig {
    /// Rays per full 360 degrees
    pub resolution: usize,
    /// Distance jump between neighbouring rays that counts as an edge
    pub edge_distance_threshold: f32,
    /// Bisection steps per detected edge
    pub edge_resolve_iterations: usize,
}

impl Default for VisionConeConfig {
    fn default() -> Self {
        Self {
            resolution: 80,
            edge_distance_threshold: 0.05,
            edge_resolve_iterations: 8,
        }
    }
}
