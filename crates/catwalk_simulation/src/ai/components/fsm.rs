//! Guard FSM components (state, config, patrol route, per-guard brain).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::memory::TrackingMemory;
use crate::ai::search::SearchPlan;

/// Guard FSM states. Exactly one is active per guard.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
#[reflect(Component)]
pub enum GuardState {
    /// Walk the patrol route, dwell at each waypoint
    #[default]
    Patrolling,
    /// Turn in place towards the next heading before moving
    Rotating,
    /// Pursue the player (true or predicted position)
    Chasing,
    /// Move to a point beside the last known position
    Flanking,
    /// Stand at the flank point and watch
    Ambushing,
    /// Visit a ring of points around the last known position
    Searching,
    /// Walk to a reported position and look around
    Investigating,
    /// Walk back to the spawn point
    ReturningToSpawn,
    /// Frozen by an external effect
    Stunned,
}

/// Guard tuning. Defaults match the shipped level design.
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct GuardConfig {
    // Patrol
    pub patrol_speed: f32,
    /// Dwell time at each waypoint (seconds)
    pub wait_at_point: f32,
    /// Degrees per second while Rotating
    pub rotation_speed: f32,
    /// Turns smaller than this (degrees) are skipped
    pub rotation_skip_threshold: f32,
    pub destination_threshold: f32,

    // Vision
    pub vision_range: f32,
    /// Full field of view (degrees)
    pub vision_angle: f32,
    /// Facing slerp rate towards a visible player
    pub vision_turn_speed: f32,

    // Chase
    pub chase_speed: f32,
    pub arrest_distance: f32,
    /// Seconds unseen before the chase turns into a search
    pub max_chase_time: f32,
    pub lose_pursuit_distance: f32,

    // Investigate
    pub investigate_speed: f32,
    pub investigate_time: f32,
    pub look_around_interval: f32,

    // Search
    pub search_radius: f32,
    /// How far a ring point may be moved to land on the nav mesh
    pub search_snap_radius: f32,
    pub max_search_points: usize,
    pub search_speed_multiplier: f32,

    // Flank / ambush
    pub flanking_enabled: bool,
    pub flanking_distance: f32,
    /// Chasing guard closer than this to the last known position considers a flank
    pub flank_trigger_distance: f32,
    pub flank_give_up_time: f32,
    pub flank_snap_radius: f32,
    pub flank_speed_multiplier: f32,
    pub ambush_wait: f32,

    // Prediction
    pub prediction_time: f32,
    pub history_capacity: usize,

    // Agent profile
    pub patrol_acceleration: f32,
    pub chase_acceleration: f32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            patrol_speed: 2.0,
            wait_at_point: 2.0,
            rotation_speed: 90.0,
            rotation_skip_threshold: 5.0,
            destination_threshold: 0.5,

            vision_range: 8.0,
            vision_angle: 90.0,
            vision_turn_speed: 10.0,

            chase_speed: 4.0,
            arrest_distance: 1.5,
            max_chase_time: 8.0,
            lose_pursuit_distance: 15.0,

            investigate_speed: 1.5,
            investigate_time: 10.0,
            look_around_interval: 1.5,

            search_radius: 5.0,
            search_snap_radius: 1.0,
            max_search_points: 8,
            search_speed_multiplier: 1.2,

            flanking_enabled: true,
            flanking_distance: 4.0,
            flank_trigger_distance: 2.0,
            flank_give_up_time: 5.0,
            flank_snap_radius: 2.0,
            flank_speed_multiplier: 0.8,
            ambush_wait: 5.0,

            prediction_time: 2.0,
            history_capacity: 10,

            patrol_acceleration: 8.0,
            chase_acceleration: 20.0,
        }
    }
}

/// Cyclic patrol route. Empty = stationary guard.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PatrolRoute(pub Vec<Vec2>);

impl PatrolRoute {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.0.get(index).copied()
    }

    /// Index of the waypoint closest to `position`.
    pub fn closest_index(&self, position: Vec2) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_squared(position).total_cmp(&b.distance_squared(position)))
            .map(|(index, _)| index)
    }
}

/// Phases of the investigation routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvestigatePhase {
    /// Walking to the reported position
    Approach,
    /// Standing still, scanning +fov / -fov / straight every interval
    LookAround {
        elapsed: f32,
        scans: u32,
        initial_facing: Vec2,
    },
}

/// The single timed sequence owned by the current state activation.
///
/// Cancelled (never resumed) by every state change.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Routine {
    #[default]
    None,
    WaitAtWaypoint {
        elapsed: f32,
    },
    Rotate {
        /// Radians
        from: f32,
        to: f32,
        elapsed: f32,
        duration: f32,
    },
    Investigate(InvestigatePhase),
}

/// Active stun. Time is measured on the fixed clock so the guard stays
/// stunned for the full duration regardless of which system applied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StunTimer {
    pub started_at: f64,
    pub duration: f32,
    /// State re-entered on expiry
    pub resume: GuardState,
}

impl StunTimer {
    pub fn elapsed(&self, now: f64) -> f32 {
        (now - self.started_at).max(0.0) as f32
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now - self.started_at >= self.duration as f64
    }
}

/// Per-guard mutable FSM data.
///
/// Invariant (enabled guards): `stun.is_some()` iff the state is `Stunned`.
#[derive(Component, Debug, Clone, Default)]
pub struct GuardBrain {
    pub patrol_index: usize,
    pub memory: TrackingMemory,
    pub search: SearchPlan,
    /// Chosen flank point; cleared on every transition
    pub flank_target: Option<Vec2>,
    pub routine: Routine,
    pub stun: Option<StunTimer>,
    /// Frozen after an arrest until `reset_to_spawn`
    pub disabled: bool,
    /// Patrol arrival latch (one dwell per waypoint)
    pub reached_destination: bool,
    /// Total transitions performed (diagnostics/tests)
    pub transitions: u32,
}

impl GuardBrain {
    pub fn is_stunned(&self) -> bool {
        self.stun.is_some()
    }
}
