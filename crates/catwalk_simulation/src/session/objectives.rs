//! Objectives and the exit point.
//!
//! Objectives are picked up by walking within `collection_range`; the count
//! lives on `GameSession` and survives arrests. An exit that requires
//! objectives stays locked until one is held. Entering an open exit ends the
//! session as a victory, complete once every objective was collected.

use bevy::prelude::*;

use super::{GameSession, SessionEnded};
use crate::ai::{GuardMachine, GuardQuery, GuardStateChanged};
use crate::components::{Guard, Player};

pub const DEFAULT_COLLECTION_RANGE: f32 = 1.0;
pub const DEFAULT_ACTIVATION_RANGE: f32 = 1.5;

#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Objective {
    /// Slot in the host's objective list
    pub index: u32,
    pub collection_range: f32,
    pub collected: bool,
}

impl Objective {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            collection_range: DEFAULT_COLLECTION_RANGE,
            collected: false,
        }
    }

    fn in_reach(&self, objective: Vec2, player: Vec2) -> bool {
        !self.collected && objective.distance(player) <= self.collection_range
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ExitPoint {
    pub activation_range: f32,
    /// Locked until at least one objective is collected
    pub requires_objectives: bool,
    /// Player was inside the range last tick (the exit fires on entry)
    pub player_in_range: bool,
    /// A used exit never fires again
    pub used: bool,
}

impl Default for ExitPoint {
    fn default() -> Self {
        Self {
            activation_range: DEFAULT_ACTIVATION_RANGE,
            requires_objectives: true,
            player_in_range: false,
            used: false,
        }
    }
}

impl ExitPoint {
    pub fn is_open(&self, objectives_collected: u32) -> bool {
        !self.used && (!self.requires_objectives || objectives_collected > 0)
    }
}

/// An objective was picked up.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveCollected {
    pub objective: Entity,
    pub index: u32,
    /// Running count after this pickup
    pub collected: u32,
    pub total: u32,
}

/// System: objective pickup + exit trigger (after `process_arrests`)
///
/// Does nothing unless the session is playing, so a pickup or an escape can
/// never land in the same tick as an arrest.
pub fn update_objectives(
    mut session: ResMut<GameSession>,
    players: Query<&Transform, (With<Player>, Without<Guard>)>,
    mut objectives: Query<(Entity, &Transform, &mut Objective), Without<Guard>>,
    mut exits: Query<(Entity, &Transform, &mut ExitPoint), Without<Guard>>,
    mut guards: Query<GuardQuery, With<Guard>>,
    mut collected: EventWriter<ObjectiveCollected>,
    mut ended: EventWriter<SessionEnded>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    if !session.is_playing() {
        return;
    }
    let Some(player) = players.iter().next().map(|transform| transform.translation.truncate()) else {
        return;
    };

    for (entity, transform, mut objective) in objectives.iter_mut() {
        if !objective.in_reach(transform.translation.truncate(), player) {
            continue;
        }
        objective.collected = true;
        let count = session.register_objective();
        crate::log_info(&format!(
            "Objective {} collected ({}/{})",
            objective.index, count, session.config.total_objectives
        ));
        collected.write(ObjectiveCollected {
            objective: entity,
            index: objective.index,
            collected: count,
            total: session.config.total_objectives,
        });
    }

    for (entity, transform, mut exit) in exits.iter_mut() {
        let in_range = transform.translation.truncate().distance(player) <= exit.activation_range;
        let entered = in_range && !exit.player_in_range;
        exit.player_in_range = in_range;
        if !entered || exit.used {
            continue;
        }
        if !exit.is_open(session.objectives_collected) {
            crate::log(&format!("Exit {:?} is locked: no objective collected yet", entity));
            continue;
        }

        exit.used = true;
        let outcome = session.register_escape();
        for mut item in guards.iter_mut() {
            let mut machine = GuardMachine::from_query(&mut item);
            machine.disable();
            machine.flush(&mut transitions);
        }
        crate::log_info(&format!(
            "Player escaped through {:?} with {}/{} objectives: {:?}",
            entity, session.objectives_collected, session.config.total_objectives, outcome
        ));
        ended.write(SessionEnded {
            arrests: session.arrests,
            objectives: session.objectives_collected,
            outcome,
        });
        return;
    }
}
