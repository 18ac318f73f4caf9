//! Game session: lives, arrest handling, level reset, objectives and escape.
//!
//! `PlayerArrested` is funnelled through `process_arrests`, the only system
//! that changes lives. The session ends either there (last life) or in
//! `objectives::update_objectives` (exit reached).

pub mod objectives;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::{GuardMachine, GuardQuery, GuardStateChanged, PlayerArrested};
use crate::components::{Guard, MovementCommand, NavigationState, Player, SpawnPose};

pub use objectives::{update_objectives, ExitPoint, Objective, ObjectiveCollected};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lives: u32,
    /// Arrests closer together than this are ignored (seconds)
    pub arrest_cooldown: f32,
    /// Frozen time between an arrest and the level reset
    pub reset_delay: f32,
    /// Objectives needed for a complete victory
    pub total_objectives: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lives: 5,
            arrest_cooldown: 2.0,
            reset_delay: 0.8,
            total_objectives: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Playing,
    /// Everyone frozen; the level resets once `elapsed` reaches the reset delay
    ProcessingArrest { elapsed: f32 },
    /// Out of lives
    GameOver,
    /// Escaped through an exit
    Victory { complete: bool },
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Escaped; `complete` when every objective was collected
    Victory { complete: bool },
    /// Last life lost
    Defeat,
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameSession {
    pub config: SessionConfig,
    pub lives: u32,
    pub phase: SessionPhase,
    pub arrests: u32,
    pub last_arrest_at: Option<f64>,
    pub objectives_collected: u32,
}

/// Built from the `SimulationConfig` resource when present.
impl FromWorld for GameSession {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<crate::SimulationConfig>()
            .map(|config| config.session)
            .unwrap_or_default();
        Self::new(config)
    }
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            lives: config.lives,
            phase: SessionPhase::Playing,
            arrests: 0,
            last_arrest_at: None,
            objectives_collected: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    /// Ended by defeat or by escape.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, SessionPhase::GameOver | SessionPhase::Victory { .. })
    }

    pub fn mission_complete(&self) -> bool {
        self.objectives_collected >= self.config.total_objectives
    }

    /// Playing and outside the arrest cooldown.
    pub fn accepts_arrests(&self, now: f64) -> bool {
        self.is_playing()
            && self
                .last_arrest_at
                .is_none_or(|at| now - at >= self.config.arrest_cooldown as f64)
    }

    pub fn accepts_player_input(&self) -> bool {
        self.is_playing()
    }

    /// Registers an arrest. Returns the phase entered.
    fn register_arrest(&mut self, now: f64) -> SessionPhase {
        self.last_arrest_at = Some(now);
        self.arrests += 1;
        self.lives = self.lives.saturating_sub(1);
        self.phase = if self.lives == 0 {
            SessionPhase::GameOver
        } else {
            SessionPhase::ProcessingArrest { elapsed: 0.0 }
        };
        self.phase
    }

    /// Counts one objective. Returns the new total collected.
    fn register_objective(&mut self) -> u32 {
        self.objectives_collected += 1;
        self.objectives_collected
    }

    /// Ends the session through an exit.
    fn register_escape(&mut self) -> SessionOutcome {
        let complete = self.mission_complete();
        self.phase = SessionPhase::Victory { complete };
        SessionOutcome::Victory { complete }
    }
}

/// Sent once, when the session ends either way.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded {
    pub arrests: u32,
    pub objectives: u32,
    pub outcome: SessionOutcome,
}

/// Session Plugin (`SimulationSet::Session`, after movement).
pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameSession>()
            .add_event::<SessionEnded>()
            .add_event::<ObjectiveCollected>()
            .add_systems(
                FixedUpdate,
                (process_arrests, update_objectives)
                    .chain()
                    .in_set(crate::SimulationSet::Session),
            );
    }
}

/// System: arrest funnel + delayed level reset
///
/// - Playing + outside cooldown: freeze every guard, take a life, then
///   GameOver (`SessionEnded`) or ProcessingArrest
/// - ProcessingArrest: after the reset delay, player back to spawn, every
///   guard `reset_to_spawn()`, Playing again
pub fn process_arrests(
    mut arrests: EventReader<PlayerArrested>,
    mut session: ResMut<GameSession>,
    mut guards: Query<GuardQuery, With<Guard>>,
    mut players: Query<
        (
            &mut Transform,
            &SpawnPose,
            Option<&mut MovementCommand>,
            Option<&mut NavigationState>,
        ),
        (With<Player>, Without<Guard>),
    >,
    time: Res<Time<Fixed>>,
    mut ended: EventWriter<SessionEnded>,
    mut transitions: EventWriter<GuardStateChanged>,
) {
    let now = time.elapsed_secs_f64();

    for arrest in arrests.read() {
        if !session.accepts_arrests(now) {
            crate::log(&format!("Arrest by {:?} ignored ({:?})", arrest.source, session.phase));
            continue;
        }

        for mut item in guards.iter_mut() {
            let mut machine = GuardMachine::from_query(&mut item);
            machine.disable();
            machine.flush(&mut transitions);
        }

        match session.register_arrest(now) {
            SessionPhase::GameOver => {
                crate::log_info(&format!("Player arrested by {:?}: game over", arrest.source));
                ended.write(SessionEnded {
                    arrests: session.arrests,
                    objectives: session.objectives_collected,
                    outcome: SessionOutcome::Defeat,
                });
            }
            _ => crate::log_info(&format!(
                "Player arrested by {:?}: {} lives left",
                arrest.source, session.lives
            )),
        }
    }

    let SessionPhase::ProcessingArrest { elapsed } = session.phase else {
        return;
    };
    let elapsed = elapsed + time.delta_secs();
    if elapsed < session.config.reset_delay {
        session.phase = SessionPhase::ProcessingArrest { elapsed };
        return;
    }

    for (mut transform, spawn, command, nav) in players.iter_mut() {
        transform.translation.x = spawn.position.x;
        transform.translation.y = spawn.position.y;
        if let Some(mut command) = command {
            *command = MovementCommand::Warp {
                position: spawn.position,
            };
        }
        if let Some(mut nav) = nav {
            nav.warp();
        }
    }

    for mut item in guards.iter_mut() {
        let mut machine = GuardMachine::from_query(&mut item);
        machine.reset_to_spawn();
        machine.flush(&mut transitions);
    }

    session.phase = SessionPhase::Playing;
    crate::log_info("Level reset after arrest");
}
