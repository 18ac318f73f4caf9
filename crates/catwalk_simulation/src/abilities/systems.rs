//! Ability systems: player input → distraction / hairball; hairball flight and traps.

use bevy::prelude::*;

use super::{Hairball, PlayerAbilities, PlayerAction};
use crate::ai::{Distraction, GuardBrain, StunGuard};
use crate::components::{Guard, Player};
use crate::physics::{ObstacleWorld, MASK_PROJECTILE_BLOCKERS};
use crate::session::GameSession;

/// Pull-back from the wall when a flying hairball lands.
const LANDING_OFFSET: f32 = 0.05;

/// System: handle player ability input
///
/// Input is dropped while the session is resetting after an arrest or the
/// game is over. Charge feedback (hold time, radius) is refreshed every tick.
pub fn handle_player_actions(
    mut commands: Commands,
    mut actions: EventReader<PlayerAction>,
    mut players: Query<(Entity, &Transform, &mut PlayerAbilities), With<Player>>,
    hairballs: Query<&Hairball>,
    session: Res<GameSession>,
    time: Res<Time<Fixed>>,
    mut distractions: EventWriter<Distraction>,
) {
    let now = time.elapsed_secs_f64();
    let Some((player, transform, mut abilities)) = players.iter_mut().next() else {
        actions.clear();
        return;
    };
    let position = transform.translation.truncate();

    if !session.accepts_player_input() {
        actions.clear();
        abilities.charge_started_at = None;
        abilities.hold_time = 0.0;
        return;
    }

    for action in actions.read() {
        match *action {
            PlayerAction::BeginCall => {
                if abilities.is_charging() {
                    continue;
                }
                if !abilities.call_ready(now) {
                    crate::log("Call on cooldown");
                    continue;
                }
                abilities.charge_started_at = Some(now);
                abilities.hold_time = 0.0;
                abilities.current_radius = abilities.config.min_call_radius;
            }

            PlayerAction::ReleaseCall => {
                let Some(started_at) = abilities.charge_started_at.take() else {
                    continue;
                };
                let hold = (now - started_at) as f32;
                let radius = abilities.config.call_radius(hold);

                distractions.write(Distraction {
                    source: player,
                    origin: position,
                    radius,
                });
                abilities.last_call_at = Some(now);
                abilities.calls_used += 1;
                abilities.hold_time = 0.0;
                abilities.current_radius = 0.0;
                crate::log(&format!("Call released after {:.2}s → radius {:.1}", hold, radius));
            }

            PlayerAction::Hairball { aim } => {
                if !abilities.hairball_ready(now) {
                    crate::log("Hairball on cooldown");
                    continue;
                }
                let active = hairballs.iter().filter(|hairball| hairball.owner == player).count();
                if active >= abilities.config.max_active_hairballs {
                    crate::log(&format!("Hairball refused: {} already active", active));
                    continue;
                }

                let hairball = match aim.and_then(|aim| aim.try_normalize()) {
                    Some(direction) => Hairball::thrown(player, direction, abilities.hairball),
                    None => Hairball::dropped(player, abilities.hairball),
                };
                commands.spawn((hairball, Transform::from_xyz(position.x, position.y, 0.0)));
                abilities.last_hairball_at = Some(now);
                abilities.hairballs_thrown += 1;
            }
        }
    }

    if let Some(started_at) = abilities.charge_started_at {
        abilities.hold_time = (now - started_at) as f32;
        abilities.current_radius = abilities.config.call_radius(abilities.hold_time);
    }
}

/// System: hairball flight, landing, trap trigger, expiry
///
/// Flying: swept raycast against projectile blockers, land at the hit.
/// Contact (flying: contact radius, landed: stun radius) stuns the nearest
/// un-stunned guard and consumes the hairball. Each guard is claimed by at
/// most one hairball per tick.
pub fn update_hairballs(
    mut commands: Commands,
    mut hairballs: Query<(Entity, &mut Transform, &mut Hairball), Without<Guard>>,
    guards: Query<(Entity, &Transform, &GuardBrain), With<Guard>>,
    obstacles: Res<ObstacleWorld>,
    time: Res<Time<Fixed>>,
    mut stuns: EventWriter<StunGuard>,
) {
    let dt = time.delta_secs();
    let mut claimed: Vec<Entity> = Vec::new();

    for (entity, mut transform, mut hairball) in hairballs.iter_mut() {
        hairball.age += dt;
        if hairball.age >= hairball.config.lifetime {
            crate::log(&format!("Hairball {:?} expired", entity));
            commands.entity(entity).despawn();
            continue;
        }

        let mut position = transform.translation.truncate();
        if hairball.is_flying() {
            let step = hairball.velocity * dt;
            let travel = step.length();
            match obstacles.query().raycast(position, step, travel, MASK_PROJECTILE_BLOCKERS) {
                Some(hit) => {
                    let back = step.normalize_or_zero() * LANDING_OFFSET.min(hit.distance);
                    position = hit.point - back;
                    hairball.landed = true;
                    hairball.velocity = Vec2::ZERO;
                    crate::log(&format!("Hairball {:?} landed at {:?}", entity, position));
                }
                None => position += step,
            }
            transform.translation.x = position.x;
            transform.translation.y = position.y;
        }

        let radius = if hairball.landed {
            hairball.config.stun_radius
        } else {
            hairball.config.contact_radius
        };

        let target = guards
            .iter()
            .filter(|(guard, _, brain)| !brain.is_stunned() && !brain.disabled && !claimed.contains(guard))
            .map(|(guard, guard_transform, _)| (guard, guard_transform.translation.truncate().distance(position)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((guard, _)) = target {
            claimed.push(guard);
            stuns.write(StunGuard {
                guard,
                duration: hairball.config.stun_duration,
            });
            commands.entity(entity).despawn();
            crate::log_info(&format!("Hairball {:?} stunned guard {:?}", entity, guard));
        }
    }
}
