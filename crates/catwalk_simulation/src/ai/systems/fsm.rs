//! Guard FSM systems (initialization, per-tick update).

use bevy::prelude::*;

use crate::ai::{GuardEnv, GuardMachine, GuardQuery, GuardStateChanged};
use crate::components::{Guard, Player};
use crate::navigation::NavigationMesh;
use crate::physics::ObstacleWorld;
use crate::DeterministicRng;

/// System: first tick of a freshly spawned guard
///
/// Captures the spawn pose from the placed Transform/Facing, sizes the
/// sighting history from the config and enters Patrolling.
pub fn initialize_spawned_guards(
    mut guards: Query<GuardQuery, (With<Guard>, Added<crate::ai::GuardBrain>)>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    for mut item in guards.iter_mut() {
        let mut machine = GuardMachine::from_query(&mut item);
        machine.initialize();
        crate::log(&format!(
            "Guard {:?} ready at {:?} ({} waypoints)",
            machine.entity,
            machine.spawn.position,
            machine.route.len()
        ));
        machine.flush(&mut transitions);
    }
}

/// System: guard FSM tick
///
/// Player position is read once; the player may be missing (guards then
/// never see anything and chasing guards fall back).
pub fn guard_fsm_tick(
    mut guards: Query<GuardQuery, With<Guard>>,
    players: Query<&Transform, (With<Player>, Without<Guard>)>,
    obstacles: Res<ObstacleWorld>,
    navigation: Res<NavigationMesh>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    let player = players.iter().next().map(|transform| transform.translation.truncate());
    let dt = time.delta_secs();
    let now = time.elapsed_secs_f64();

    for mut item in guards.iter_mut() {
        let mut env = GuardEnv {
            dt,
            now,
            player,
            obstacles: obstacles.query(),
            navigation: navigation.query(),
            rng: &mut rng.rng,
        };

        let mut machine = GuardMachine::from_query(&mut item);
        machine.tick(&mut env);
        machine.flush(&mut transitions);
    }
}
