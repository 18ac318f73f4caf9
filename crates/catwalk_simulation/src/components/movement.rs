//! Movement components: navigation intent, speed profile, agent feedback.

use bevy::prelude::*;

/// Movement order for a navigation agent (executed by `NavigationPlugin`).
///
/// Architecture:
/// - AI writes a `MovementCommand` (high-level intent)
/// - the agent backend plans a path and moves the `Transform`
/// - feedback comes back through `NavigationState`
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub enum MovementCommand {
    /// No order: decelerate and stand
    #[default]
    Idle,
    /// Path to a world position
    MoveTo { target: Vec2 },
    /// Halt immediately (velocity = 0), keep the destination
    Stop,
    /// Teleport and drop the current path; the backend resets the command to `Idle`
    Warp { position: Vec2 },
}

/// Speed/acceleration profile, changed by the guard FSM per state.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MovementProfile {
    /// Max speed (m/s)
    pub speed: f32,
    /// Speed change per second; <= 0 means instant
    pub acceleration: f32,
    /// Decelerate on approach to the final waypoint
    pub auto_braking: bool,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            speed: 2.0,
            acceleration: 8.0,
            auto_braking: true,
        }
    }
}

/// Agent feedback (the engine nav agent's queryable state).
///
/// `path_pending` is raised by whoever issues a new `MoveTo` and cleared by
/// the backend once the path is planned, so arrival checks never read a
/// `remaining_distance` that belongs to the previous destination.
#[derive(Component, Debug, Clone, PartialEq, Default)]
pub struct NavigationState {
    pub destination: Option<Vec2>,
    pub path_pending: bool,
    /// Distance left along the current path; 0.0 without a destination
    pub remaining_distance: f32,
    pub velocity: Vec2,
    pub stopped: bool,
    /// false when the destination was unreachable and the path is partial
    pub path_complete: bool,
    /// Waypoints still ahead of the agent
    pub path: Vec<Vec2>,
}

impl NavigationState {
    /// Arrival test used by the FSM: path planned and within `threshold`.
    pub fn has_arrived(&self, threshold: f32) -> bool {
        !self.path_pending && self.remaining_distance < threshold
    }

    /// Drops path and velocity after a teleport.
    pub fn warp(&mut self) {
        self.destination = None;
        self.path_pending = false;
        self.remaining_distance = 0.0;
        self.velocity = Vec2::ZERO;
        self.stopped = false;
        self.path_complete = true;
        self.path.clear();
    }
}
