//! Headless Catwalk demo
//!
//! Small walled room: one patrolling guard, one sweeping camera, and a cat
//! walking a scripted path past both, picking up an objective on the way to
//! the exit. Prints guard transitions, pickups and the outcome.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use catwalk_simulation::physics::LAYER_OBSTACLE;
use catwalk_simulation::*;

const TICKS: usize = 1200;

fn build_level() -> Result<(ObstacleMap, NavGrid), navigation::NavGridError> {
    let mut map = ObstacleMap::new();
    map.add_box(Vec2::new(-12.0, -8.0), Vec2::new(12.0, -7.0), LAYER_OBSTACLE)
        .add_box(Vec2::new(-12.0, 7.0), Vec2::new(12.0, 8.0), LAYER_OBSTACLE)
        .add_box(Vec2::new(-12.0, -8.0), Vec2::new(-11.0, 8.0), LAYER_OBSTACLE)
        .add_box(Vec2::new(11.0, -8.0), Vec2::new(12.0, 8.0), LAYER_OBSTACLE)
        // Crate in the middle of the room
        .add_box(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0), LAYER_OBSTACLE);

    let grid = NavGrid::from_obstacles(&map, LAYER_OBSTACLE, Vec2::new(-12.0, -8.0), Vec2::new(12.0, 8.0), 0.5, 0.3)?;
    Ok((map, grid))
}

fn main() {
    let seed = 42;
    println!("Starting Catwalk headless simulation (seed: {})", seed);

    let (map, grid) = match build_level() {
        Ok(level) => level,
        Err(error) => {
            eprintln!("Failed to build level: {}", error);
            return;
        }
    };

    let mut app = create_headless_app(seed);
    app.insert_resource(ObstacleWorld::new(map))
        .insert_resource(NavigationMesh::new(grid))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .add_plugins(SimulationPlugin);

    let config = SimulationConfig::default();
    let world = app.world_mut();
    let (guard, player) = {
        let mut commands = world.commands();
        let guard = spawn_guard(
            &mut commands,
            &config,
            Vec2::new(-8.0, 4.0),
            Vec2::X,
            vec![Vec2::new(-8.0, 4.0), Vec2::new(8.0, 4.0), Vec2::new(8.0, -4.0), Vec2::new(-8.0, -4.0)],
        );
        spawn_camera(&mut commands, &config, Vec2::new(10.0, 6.0), Vec2::new(-1.0, -1.0));
        spawn_objective(&mut commands, 0, Vec2::new(0.0, -6.0));
        spawn_exit(&mut commands, Vec2::new(9.5, 5.0));
        let player = spawn_player(&mut commands, &config, Vec2::new(-9.0, -6.0));
        (guard, player)
    };
    world.flush();

    // Scripted walk along the bottom wall, then up the right side
    let script = [(60, Vec2::new(8.0, -6.0)), (500, Vec2::new(9.5, 5.0)), (800, Vec2::new(-9.0, -6.0))];
    let mut transitions = 0usize;

    for tick in 0..TICKS {
        for (at, target) in script {
            if tick == at {
                if let Some(mut command) = app.world_mut().get_mut::<MovementCommand>(player) {
                    *command = MovementCommand::MoveTo { target };
                }
            }
        }
        if tick == 300 {
            app.world_mut().send_event(PlayerAction::Hairball { aim: None });
        }

        app.update();

        let events = app.world().resource::<Events<GuardStateChanged>>();
        for change in events.iter_current_update_events() {
            transitions += 1;
            println!("Tick {}: guard {:?} {:?} → {:?}", tick, change.guard, change.from, change.to);
        }
        let pickups = app.world().resource::<Events<ObjectiveCollected>>();
        for pickup in pickups.iter_current_update_events() {
            println!("Tick {}: objective {} collected ({}/{})", tick, pickup.index, pickup.collected, pickup.total);
        }
        let ended = app.world().resource::<Events<SessionEnded>>();
        if let Some(end) = ended.iter_current_update_events().next() {
            println!("Tick {}: session ended: {:?}", tick, end.outcome);
        }
    }

    let session = app.world().resource::<GameSession>();
    let state = app.world().get::<GuardState>(guard).copied();
    println!(
        "Simulation complete: {} transitions, final guard state {:?}, lives {}, arrests {}, objectives {}, phase {:?}",
        transitions, state, session.lives, session.arrests, session.objectives_collected, session.phase
    );
}
