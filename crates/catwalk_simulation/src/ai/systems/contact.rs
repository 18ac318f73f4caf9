//! Arrest on contact.

use bevy::prelude::*;

use crate::ai::{GuardMachine, GuardQuery, GuardStateChanged, PlayerArrested};
use crate::components::{Guard, Player};
use crate::session::GameSession;

/// System: a guard within arrest distance catches the player
///
/// Only enabled, un-stunned guards arrest, so the player can brush past a
/// guard knocked out by a hairball. The catching guard freezes
/// immediately; the session disables the rest. At most one arrest per tick,
/// and none while the session would ignore it (otherwise the guard would
/// stay frozen with nobody to reset it).
pub fn detect_player_contact(
    mut guards: Query<GuardQuery, With<Guard>>,
    players: Query<&Transform, (With<Player>, Without<Guard>)>,
    session: Res<GameSession>,
    time: Res<Time<Fixed>>,
    mut arrests: EventWriter<PlayerArrested>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    let Some(player) = players.iter().next().map(|transform| transform.translation.truncate()) else {
        return;
    };
    if !session.accepts_arrests(time.elapsed_secs_f64()) {
        return;
    }

    for mut item in guards.iter_mut() {
        let mut machine = GuardMachine::from_query(&mut item);
        if machine.brain.disabled || machine.brain.is_stunned() {
            continue;
        }
        if machine.position().distance(player) >= machine.config.arrest_distance {
            continue;
        }

        crate::log_info(&format!(
            "Guard {:?} caught the player ({:?})",
            machine.entity,
            machine.current_state()
        ));
        machine.disable();
        arrests.write(PlayerArrested { source: machine.entity });
        machine.flush(&mut transitions);
        break;
    }
}
