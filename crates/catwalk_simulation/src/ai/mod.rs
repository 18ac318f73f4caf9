//! Guard AI
//!
//! Hierarchical FSM per guard: `GuardState` + `GuardBrain` (memory, search
//! plan, routine, stun) driven by `GuardMachine`. Stimuli arrive as events,
//! movement leaves as `MovementCommand`.

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod machine;
pub mod search;
pub mod systems;

// Re-export main types
pub use components::*;
pub use events::*;
pub use machine::{GuardEnv, GuardMachine, GuardQuery, GuardTransition};
pub use search::SearchPlan;

/// AI Plugin
///
/// Registers the AI systems in FixedUpdate (`SimulationSet::Ai`).
/// Execution order:
/// 1. initialize_spawned_guards: spawn pose + enter Patrolling
/// 2. apply_guard_stimuli: Distraction → CameraAlert → StunGuard
/// 3. guard_fsm_tick: perception, routines, per-state logic
/// 4. detect_player_contact: arrest within reach
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<GuardStateChanged>()
            .add_event::<Distraction>()
            .add_event::<CameraAlert>()
            .add_event::<StunGuard>()
            .add_event::<PlayerArrested>()
            .add_systems(
                FixedUpdate,
                (
                    systems::initialize_spawned_guards,
                    systems::apply_guard_stimuli,
                    systems::guard_fsm_tick,
                    systems::detect_player_contact,
                )
                    .chain() // Sequential for determinism
                    .in_set(crate::SimulationSet::Ai),
            );
    }
}
