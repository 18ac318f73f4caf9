//! Player abilities: chargeable call (distraction) and hairball (stun trap).

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod systems;


// Re-export all components and events
pub use components::*;
pub use events::*;
pub use systems::*;

/// Abilities Plugin
///
/// - handle_player_actions (`SimulationSet::Input`): input → Distraction / Hairball spawn
/// - update_hairballs (`SimulationSet::Hazards`): flight, landing, StunGuard
///
/// Both run before the AI so guards react within the same tick.
pub struct AbilitiesPlugin;

impl Plugin for AbilitiesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlayerAction>()
            .add_systems(FixedUpdate, handle_player_actions.in_set(crate::SimulationSet::Input))
            .add_systems(FixedUpdate, update_hairballs.in_set(crate::SimulationSet::Hazards));
    }
}
