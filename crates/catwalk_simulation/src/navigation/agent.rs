//! Kinematic navigation agent: executes `MovementCommand` along planned paths.

use bevy::prelude::*;

use super::{NavigationMesh, NavigationQuery};
use crate::components::{MovementCommand, MovementProfile, NavigationState};

/// Remaining distance under which the agent snaps onto the final waypoint.
const SNAP_DISTANCE: f32 = 1e-3;

/// Navigation Plugin
///
/// Runs after the AI (`SimulationSet::Movement`), so commands issued this
/// tick are planned this tick and the AI reads fresh feedback next tick.
pub struct NavigationPlugin;

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, drive_agents.in_set(crate::SimulationSet::Movement));
    }
}

/// System: move every navigation agent one fixed step.
pub fn drive_agents(
    navigation: Res<NavigationMesh>,
    time: Res<Time<Fixed>>,
    mut agents: Query<(
        &mut Transform,
        &mut MovementCommand,
        &MovementProfile,
        &mut NavigationState,
    )>,
) {
    let dt = time.delta_secs();

    for (mut transform, mut command, profile, mut nav) in agents.iter_mut() {
        let position = transform.translation.truncate();
        let moved = step_agent(position, &mut command, profile, &mut nav, navigation.query(), dt);
        if moved != position {
            transform.translation.x = moved.x;
            transform.translation.y = moved.y;
        }
    }
}

/// One agent step. Returns the new position.
///
/// - `MoveTo`: (re)plan on a new destination or when pending, accelerate
///   towards the profile speed, brake before the last waypoint, follow the path
/// - `Stop`: zero velocity, keep destination and path
/// - `Idle`: drop the path and decelerate in place
/// - `Warp`: teleport, clear the path, command back to `Idle`
pub fn step_agent(
    position: Vec2,
    command: &mut MovementCommand,
    profile: &MovementProfile,
    nav: &mut NavigationState,
    navigation: &dyn NavigationQuery,
    dt: f32,
) -> Vec2 {
    match *command {
        MovementCommand::Warp { position: target } => {
            nav.warp();
            *command = MovementCommand::Idle;
            target
        }

        MovementCommand::Stop => {
            nav.velocity = Vec2::ZERO;
            nav.stopped = true;
            nav.path_pending = false;
            nav.remaining_distance = path_length(position, &nav.path);
            position
        }

        MovementCommand::Idle => {
            nav.destination = None;
            nav.path.clear();
            nav.path_pending = false;
            nav.remaining_distance = 0.0;
            nav.stopped = false;

            let speed = approach(nav.velocity.length(), 0.0, profile.acceleration, dt);
            nav.velocity = nav.velocity.normalize_or_zero() * speed;
            position + nav.velocity * dt
        }

        MovementCommand::MoveTo { target } => {
            if nav.path_pending || nav.destination != Some(target) {
                plan(position, target, nav, navigation);
            }
            nav.stopped = false;
            follow_path(position, profile, nav, dt)
        }
    }
}

fn plan(position: Vec2, target: Vec2, nav: &mut NavigationState, navigation: &dyn NavigationQuery) {
    nav.destination = Some(target);
    nav.path_pending = false;

    match navigation.find_path(position, target) {
        Some(path) => {
            nav.path_complete = path.complete;
            nav.path = path.waypoints;
        }
        None => {
            crate::log_warning(&format!("Navigation: no path from {:?} to {:?}", position, target));
            nav.path_complete = false;
            nav.path.clear();
        }
    }
}

fn follow_path(mut position: Vec2, profile: &MovementProfile, nav: &mut NavigationState, dt: f32) -> Vec2 {
    let start = position;
    let remaining = path_length(position, &nav.path);

    let mut desired = profile.speed.max(0.0);
    if profile.auto_braking && profile.acceleration > 0.0 {
        desired = desired.min((2.0 * profile.acceleration * remaining).sqrt());
    }
    let speed = approach(nav.velocity.length(), desired, profile.acceleration, dt);

    let mut budget = speed * dt;
    if remaining - budget < SNAP_DISTANCE {
        budget = remaining;
    }

    while budget > 0.0 {
        let Some(&next) = nav.path.first() else {
            break;
        };
        let to_next = position.distance(next);
        if to_next <= budget {
            position = next;
            budget -= to_next;
            nav.path.remove(0);
        } else {
            position += (next - position) / to_next * budget;
            budget = 0.0;
        }
    }

    nav.remaining_distance = path_length(position, &nav.path);
    nav.velocity = if nav.path.is_empty() {
        Vec2::ZERO
    } else {
        (position - start).normalize_or_zero() * speed
    };
    position
}

/// Moves `current` towards `target` by at most `acceleration * dt`
/// (instantly when acceleration is not positive).
fn approach(current: f32, target: f32, acceleration: f32, dt: f32) -> f32 {
    if acceleration <= 0.0 {
        return target;
    }
    let step = acceleration * dt;
    if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}

fn path_length(from: Vec2, path: &[Vec2]) -> f32 {
    let mut length = 0.0;
    let mut previous = from;
    for waypoint in path {
        length += previous.distance(*waypoint);
        previous = *waypoint;
    }
    length
}
