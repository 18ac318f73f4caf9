//! AI events: stimuli consumed by guards and notifications they raise.
//!
//! Producers: abilities (Distraction, StunGuard), cameras (CameraAlert,
//! PlayerArrested), guards themselves (GuardStateChanged, PlayerArrested).

use bevy::prelude::*;

use super::components::GuardState;

/// Guard FSM transition (from != to).
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardStateChanged {
    pub guard: Entity,
    pub from: GuardState,
    pub to: GuardState,
}

/// Sound broadcast. Every guard within `radius` of `origin` investigates it
/// (unless chasing, stunned or disabled).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Distraction {
    /// Player that made the call
    pub source: Entity,
    pub origin: Vec2,
    pub radius: f32,
}

/// Camera report addressed to a single guard.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CameraAlert {
    pub guard: Entity,
    pub player_position: Vec2,
}

/// Stun request (hairball hit).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct StunGuard {
    pub guard: Entity,
    pub duration: f32,
}

/// Player caught. `source` is the guard or camera that made the arrest.
///
/// Consumed by the session, the only place that mutates lives/phase.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerArrested {
    pub source: Entity,
}
