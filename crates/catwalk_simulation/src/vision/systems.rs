//! Vision presentation systems (polygon + alert level).

use bevy::prelude::*;

use super::{VisionCone, VisionPolygon, VisionSensor};
use crate::ai::{GuardBrain, GuardState};
use crate::components::Facing;
use crate::physics::ObstacleWorld;

/// Coarse alertness for presentation (replaces per-state cone colours).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
#[reflect(Component)]
pub enum AlertLevel {
    #[default]
    Passive,
    Alert,
    Aggressive,
}

impl From<GuardState> for AlertLevel {
    fn from(state: GuardState) -> Self {
        match state {
            GuardState::Chasing | GuardState::Flanking => AlertLevel::Aggressive,
            GuardState::Investigating | GuardState::Searching | GuardState::Ambushing => AlertLevel::Alert,
            GuardState::Patrolling
            | GuardState::Rotating
            | GuardState::ReturningToSpawn
            | GuardState::Stunned => AlertLevel::Passive,
        }
    }
}

/// System: rebuild vision polygons.
///
/// Stunned or disabled guards get an empty polygon (cone hidden).
pub fn update_vision_polygons(
    obstacles: Res<ObstacleWorld>,
    mut cones: Query<(
        &Transform,
        &Facing,
        &VisionSensor,
        &VisionCone,
        &mut VisionPolygon,
        Option<&GuardState>,
        Option<&GuardBrain>,
        Option<&mut AlertLevel>,
    )>,
) {
    for (transform, facing, sensor, cone, mut polygon, state, brain, alert) in cones.iter_mut() {
        if let (Some(state), Some(mut alert)) = (state, alert) {
            alert.set_if_neq(AlertLevel::from(*state));
        }

        let hidden = matches!(state, Some(GuardState::Stunned)) || brain.is_some_and(|b| b.disabled);
        if hidden {
            if !polygon.is_empty() {
                polygon.clear();
            }
            continue;
        }

        *polygon = cone.build_polygon(sensor, transform.translation.truncate(), facing.0, obstacles.query());
    }
}
