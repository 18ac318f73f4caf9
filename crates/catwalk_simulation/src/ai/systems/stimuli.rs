//! AI reaction systems (distractions, camera alerts, stuns).

use bevy::prelude::*;

use crate::abilities::PlayerAbilities;
use crate::ai::{CameraAlert, Distraction, GuardMachine, GuardQuery, GuardStateChanged, StunGuard};
use crate::components::Guard;

/// System: external stimuli → guard FSM
///
/// Order within a tick: distractions, camera alerts, stuns. A stun applied
/// in the same tick as a distraction wins (the guard ends up Stunned and
/// resumes Investigating afterwards).
pub fn apply_guard_stimuli(
    mut distractions: EventReader<Distraction>,
    mut camera_alerts: EventReader<CameraAlert>,
    mut stuns: EventReader<StunGuard>,
    mut guards: Query<GuardQuery, With<Guard>>,
    mut callers: Query<&mut PlayerAbilities>,
    time: Res<Time<Fixed>>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    for distraction in distractions.read() {
        let mut affected = 0u32;

        for mut item in guards.iter_mut() {
            let mut machine = GuardMachine::from_query(&mut item);
            if machine.position().distance(distraction.origin) > distraction.radius {
                continue;
            }
            if machine.hear_sound(distraction.origin) {
                affected += 1;
            }
            machine.flush(&mut transitions);
        }

        if let Ok(mut abilities) = callers.get_mut(distraction.source) {
            abilities.guards_distracted += affected;
        }

        crate::log(&format!(
            "Distraction at {:?} (radius {:.1}) → {} guard(s) investigating",
            distraction.origin, distraction.radius, affected
        ));
    }

    for alert in camera_alerts.read() {
        let Ok(mut item) = guards.get_mut(alert.guard) else {
            crate::log_warning(&format!("CameraAlert for missing guard {:?}", alert.guard));
            continue;
        };
        let mut machine = GuardMachine::from_query(&mut item);
        machine.camera_alert(alert.player_position);
        machine.flush(&mut transitions);
    }

    let now = time.elapsed_secs_f64();
    for stun in stuns.read() {
        let Ok(mut item) = guards.get_mut(stun.guard) else {
            continue;
        };
        let mut machine = GuardMachine::from_query(&mut item);
        machine.apply_stun(stun.duration, now);
        machine.flush(&mut transitions);
    }
}
