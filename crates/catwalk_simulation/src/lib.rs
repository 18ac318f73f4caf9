//! Catwalk Simulation Core
//!
//! Headless ECS simulation (Bevy 0.16) of a stealth game: guards patrol,
//! see, chase, flank, search and investigate; the player distracts them with
//! a call and stuns them with hairballs; cameras report; arrests cost lives
//! and the level is won by carrying objectives to an exit.
//!
//! Tick (FixedUpdate, 60 Hz), see `SimulationSet`:
//! Input → Hazards → Ai → Movement → Session → Presentation

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Public modules
pub mod abilities;
pub mod ai;
pub mod components;
pub mod config;
pub mod logger;
pub mod navigation;
pub mod physics;
pub mod session;
pub mod surveillance;
pub mod vision;

// Re-export main types for convenience
pub use abilities::{AbilitiesPlugin, AbilityConfig, Hairball, HairballConfig, PlayerAbilities, PlayerAction};
pub use ai::{
    AIPlugin, CameraAlert, Distraction, GuardBrain, GuardConfig, GuardState, GuardStateChanged, PatrolRoute,
    PlayerArrested, StunGuard,
};
pub use components::*;
pub use config::{ConfigError, SimulationConfig};
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};
pub use navigation::{NavGrid, NavigationMesh, NavigationPlugin, NavigationQuery, OpenNavigation};
pub use physics::{ObstacleMap, ObstacleQuery, ObstacleWorld};
pub use session::{
    ExitPoint, GameSession, Objective, ObjectiveCollected, SessionConfig, SessionEnded, SessionOutcome, SessionPhase,
    SessionPlugin,
};
pub use surveillance::{SecurityCamera, SecurityCameraConfig, SurveillancePlugin};
pub use vision::{AlertLevel, VisionCone, VisionConeConfig, VisionPlugin, VisionPolygon, VisionSensor};

/// Fixed-tick phases, chained in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Player input → distractions, hairball spawns
    Input,
    /// Hairballs and cameras → stun requests, camera alerts
    Hazards,
    /// Guard FSM
    Ai,
    /// Navigation agents execute movement commands
    Movement,
    /// Arrest funnel, level reset, objectives and exits
    Session,
    /// Vision polygons, alert levels
    Presentation,
}

/// Main simulation plugin (all subsystems).
///
/// Insert `SimulationConfig`, `ObstacleWorld` and `NavigationMesh` before
/// adding the plugin to override the defaults (default config, empty level,
/// open navigation).
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz for the simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<DeterministicRng>()
            .init_resource::<SimulationConfig>()
            .init_resource::<ObstacleWorld>()
            .init_resource::<NavigationMesh>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Input,
                    SimulationSet::Hazards,
                    SimulationSet::Ai,
                    SimulationSet::Movement,
                    SimulationSet::Session,
                    SimulationSet::Presentation,
                )
                    .chain(),
            )
            .add_plugins((
                SessionPlugin,
                AbilitiesPlugin,
                SurveillancePlugin,
                AIPlugin,
                NavigationPlugin,
                VisionPlugin,
            ));
    }
}

/// Deterministic RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Creates a minimal Bevy App for headless simulation (add `SimulationPlugin` on top).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// World snapshot for determinism comparisons
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Sort by Entity index for determinism
    entities.sort_by_key(|(entity, _)| entity.index());

    // Debug formatting is enough to compare runs
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

// ============================================================================
// Spawn helpers
// ============================================================================

/// Spawns a guard placed at `position` looking along `facing`, walking
/// `route` (empty = stationary). Tuning comes from `config.guard`.
pub fn spawn_guard(
    commands: &mut Commands,
    config: &SimulationConfig,
    position: Vec2,
    facing: Vec2,
    route: Vec<Vec2>,
) -> Entity {
    let guard = &config.guard;
    let facing = Facing::new(facing);

    commands
        .spawn((
            Guard,
            Transform::from_xyz(position.x, position.y, 0.0),
            facing,
            SpawnPose {
                position,
                facing: facing.0,
            },
            PatrolRoute(route),
            guard.clone(),
            GuardBrain {
                memory: ai::TrackingMemory::with_capacity(guard.history_capacity),
                ..default()
            },
            VisionSensor::new(guard.vision_range, guard.vision_angle),
            VisionCone::new(config.vision),
            MovementProfile {
                speed: guard.patrol_speed,
                acceleration: guard.patrol_acceleration,
                auto_braking: true,
            },
        ))
        .id()
}

/// Player walking speed when driven through `MovementCommand`.
pub const PLAYER_SPEED: f32 = 3.0;

/// Spawns the player. It is also a navigation agent, so hosts can move it
/// with `MovementCommand` or write its `Transform` directly.
pub fn spawn_player(commands: &mut Commands, config: &SimulationConfig, position: Vec2) -> Entity {
    commands
        .spawn((
            Player,
            Transform::from_xyz(position.x, position.y, 0.0),
            SpawnPose {
                position,
                facing: Facing::default().0,
            },
            PlayerAbilities::new(config.abilities, config.hairball),
            MovementCommand::Idle,
            MovementProfile {
                speed: PLAYER_SPEED,
                acceleration: 0.0,
                auto_braking: false,
            },
            NavigationState::default(),
        ))
        .id()
}

/// Spawns a sweeping security camera centred on `heading`.
pub fn spawn_camera(commands: &mut Commands, config: &SimulationConfig, position: Vec2, heading: Vec2) -> Entity {
    let camera = SecurityCamera::new(config.camera, heading);
    let facing = Facing::new(camera.heading());

    commands
        .spawn((
            Transform::from_xyz(position.x, position.y, 0.0),
            facing,
            VisionSensor::new(config.camera.vision_range, config.camera.vision_angle),
            VisionCone::new(config.vision),
            camera,
        ))
        .id()
}

/// Spawns objective number `index` (pickup range `DEFAULT_COLLECTION_RANGE`).
pub fn spawn_objective(commands: &mut Commands, index: u32, position: Vec2) -> Entity {
    commands
        .spawn((Transform::from_xyz(position.x, position.y, 0.0), Objective::new(index)))
        .id()
}

/// Spawns an exit that opens once an objective is held.
pub fn spawn_exit(commands: &mut Commands, position: Vec2) -> Entity {
    commands
        .spawn((Transform::from_xyz(position.x, position.y, 0.0), ExitPoint::default()))
        .id()
}
