//! Navigation: pathfinding port + built-in kinematic agent backend.
//!
//! Architecture (intent/feedback split):
//! - AI writes `MovementCommand` + `MovementProfile` (high-level intent)
//! - `NavigationPlugin` plans through `NavigationMesh` and moves the `Transform`
//! - AI reads `NavigationState` back (path_pending, remaining_distance, velocity)
//!
//! The query side is a trait so a host engine can plug in its own navmesh;
//! `NavGrid` (grid + A*) and `OpenNavigation` (no obstacles) ship with the crate.

use bevy::prelude::*;

pub mod agent;
pub mod grid;

pub use agent::*;
pub use grid::*;

/// Planned route. `waypoints` excludes the start and ends at the reached goal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavPath {
    pub waypoints: Vec<Vec2>,
    /// false when the goal was unreachable and the path stops at the closest reachable point
    pub complete: bool,
}

impl NavPath {
    pub fn straight(to: Vec2) -> Self {
        Self {
            waypoints: vec![to],
            complete: true,
        }
    }

    pub fn end(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }

    /// Polyline length starting from `from`.
    pub fn length_from(&self, from: Vec2) -> f32 {
        let mut length = 0.0;
        let mut previous = from;
        for waypoint in &self.waypoints {
            length += previous.distance(*waypoint);
            previous = *waypoint;
        }
        length
    }
}

/// Pathfinding service (engine navmesh equivalent).
pub trait NavigationQuery: Send + Sync {
    /// `point` itself when navigable, else the nearest navigable point within `max_distance`.
    fn sample_position(&self, point: Vec2, max_distance: f32) -> Option<Vec2>;

    /// Path from `from` towards `to`. Unreachable goals give a partial path
    /// (`complete == false`); `None` only when `from` is off the mesh.
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<NavPath>;

    /// True when a complete path exists.
    fn path_exists(&self, from: Vec2, to: Vec2) -> bool {
        self.find_path(from, to).is_some_and(|path| path.complete)
    }
}

/// Resource: the navigation query shared by AI and the agent backend.
#[derive(Resource)]
pub struct NavigationMesh(pub Box<dyn NavigationQuery>);

impl NavigationMesh {
    pub fn new(query: impl NavigationQuery + 'static) -> Self {
        Self(Box::new(query))
    }

    pub fn query(&self) -> &dyn NavigationQuery {
        self.0.as_ref()
    }
}

impl Default for NavigationMesh {
    fn default() -> Self {
        Self::new(OpenNavigation)
    }
}

/// Unbounded open floor: every point is navigable, every path is a straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenNavigation;

impl NavigationQuery for OpenNavigation {
    fn sample_position(&self, point: Vec2, _max_distance: f32) -> Option<Vec2> {
        Some(point)
    }

    fn find_path(&self, _from: Vec2, to: Vec2) -> Option<NavPath> {
        Some(NavPath::straight(to))
    }
}
