//! Player input events.

use bevy::prelude::*;

/// Ability input for the player (host input layer → simulation).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    /// Start charging the call
    BeginCall,
    /// Release the call: broadcast a distraction with the charged radius
    ReleaseCall,
    /// Throw towards `aim`, or drop a static trap at the feet when None
    Hairball { aim: Option<Vec2> },
}
