//! Player abilities against live guards
//!
//! - thrown hairball lands on a wall and stuns the first guard walking past
//! - call distracts guards inside its charged radius, never a chasing one

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use catwalk_simulation::physics::LAYER_OBSTACLE;
use catwalk_simulation::*;

#[derive(Resource, Default)]
struct StunLog(Vec<Entity>);

fn record_stuns(mut events: EventReader<GuardStateChanged>, mut log: ResMut<StunLog>) {
    for event in events.read() {
        if event.to == GuardState::Stunned {
            log.0.push(event.guard);
        }
    }
}

fn create_test_app(obstacles: ObstacleMap) -> App {
    let mut app = create_headless_app(7);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .insert_resource(ObstacleWorld::new(obstacles))
        .add_plugins(SimulationPlugin)
        .init_resource::<StunLog>()
        .add_systems(FixedUpdate, record_stuns.after(SimulationSet::Presentation));
    app.update();
    app
}

fn spawn(app: &mut App, f: impl FnOnce(&mut Commands, &SimulationConfig) -> Entity) -> Entity {
    let config = app.world().resource::<SimulationConfig>().clone();
    let entity = f(&mut app.world_mut().commands(), &config);
    app.world_mut().flush();
    entity
}

fn hairballs(app: &mut App) -> Vec<(Vec2, Hairball)> {
    let mut query = app.world_mut().query::<(&Transform, &Hairball)>();
    query
        .iter(app.world())
        .map(|(transform, hairball)| (transform.translation.truncate(), hairball.clone()))
        .collect()
}

fn state(app: &App, guard: Entity) -> GuardState {
    *app.world().get::<GuardState>(guard).expect("guard state")
}

#[test]
fn test_thrown_hairball_lands_and_stuns_passing_guard() {
    let wall = ObstacleMap::new().with_box(Vec2::new(-3.0, 4.0), Vec2::new(3.0, 5.0), LAYER_OBSTACLE);
    let mut app = create_test_app(wall);

    // Patrols along the wall, far outside sight of the player
    let guard = spawn(&mut app, |c, cfg| {
        spawn_guard(
            c,
            cfg,
            Vec2::new(8.0, 3.0),
            Vec2::NEG_X,
            vec![Vec2::new(-8.0, 3.0), Vec2::new(8.0, 3.0)],
        )
    });
    let player = spawn(&mut app, |c, cfg| spawn_player(c, cfg, Vec2::new(0.0, -10.0)));

    app.world_mut().send_event(PlayerAction::Hairball { aim: Some(Vec2::Y) });
    app.update();
    assert_eq!(hairballs(&mut app).len(), 1, "hairball spawned");
    let abilities = app.world().get::<PlayerAbilities>(player).expect("abilities");
    assert_eq!(abilities.hairballs_thrown, 1);

    // 14 m at 8 m/s
    for _ in 0..115 {
        app.update();
    }
    let flying = hairballs(&mut app);
    assert_eq!(flying.len(), 1);
    let (position, hairball) = &flying[0];
    assert!(hairball.landed, "hairball must have hit the wall");
    assert!((position.y - 3.95).abs() < 1e-3, "lands just short of the wall, got {:?}", position);
    assert!(position.x.abs() < 1e-3);
    assert!(app.world().resource::<StunLog>().0.is_empty(), "guard not reached yet");

    let mut stunned_at_tick = None;
    for tick in 0..300 {
        app.update();
        if stunned_at_tick.is_none() && state(&app, guard) == GuardState::Stunned {
            stunned_at_tick = Some(tick);
        }
    }

    let stunned_at_tick = stunned_at_tick.expect("guard walking past the trap must be stunned");
    assert!(stunned_at_tick + 116 < 300, "stun must happen within the hairball lifetime");
    assert_eq!(app.world().resource::<StunLog>().0, vec![guard], "stunned exactly once");
    assert!(hairballs(&mut app).is_empty(), "hairball consumed");
    assert_eq!(state(&app, guard), GuardState::Patrolling, "patrol resumes after the stun");
}

#[test]
fn test_hairball_expires_without_guards() {
    let mut app = create_test_app(ObstacleMap::new());
    spawn(&mut app, |c, cfg| spawn_player(c, cfg, Vec2::ZERO));

    app.world_mut().send_event(PlayerAction::Hairball { aim: None });
    app.update();
    assert_eq!(hairballs(&mut app).len(), 1);

    for _ in 0..310 {
        app.update();
    }
    assert!(hairballs(&mut app).is_empty(), "hairball despawns after its lifetime");
}

#[test]
fn test_hairball_cooldown_refuses_second_throw() {
    let mut app = create_test_app(ObstacleMap::new());
    spawn(&mut app, |c, cfg| spawn_player(c, cfg, Vec2::ZERO));

    app.world_mut().send_event(PlayerAction::Hairball { aim: None });
    app.update();
    app.world_mut().send_event(PlayerAction::Hairball { aim: None });
    app.update();

    assert_eq!(hairballs(&mut app).len(), 1, "second throw is on cooldown");
}

#[test]
fn test_call_distracts_guards_in_radius_except_chasers() {
    let mut app = create_test_app(ObstacleMap::new());
    let player = spawn(&mut app, |c, cfg| spawn_player(c, cfg, Vec2::ZERO));
    // Both face away from the player
    let near = spawn(&mut app, |c, cfg| spawn_guard(c, cfg, Vec2::new(3.0, 0.0), Vec2::X, vec![]));
    let far = spawn(&mut app, |c, cfg| spawn_guard(c, cfg, Vec2::new(12.0, 0.0), Vec2::X, vec![]));
    // Looks straight at the player
    let chaser = spawn(&mut app, |c, cfg| spawn_guard(c, cfg, Vec2::new(0.0, 7.0), Vec2::NEG_Y, vec![]));

    app.world_mut().send_event(PlayerAction::BeginCall);
    app.update();
    assert_eq!(state(&app, chaser), GuardState::Chasing);

    // 0.75 s hold → radius 6
    for _ in 0..44 {
        app.update();
    }
    let abilities = app.world().get::<PlayerAbilities>(player).expect("abilities");
    assert!(abilities.is_charging());
    assert!(abilities.current_radius > 5.5 && abilities.current_radius < 6.0);

    app.world_mut().send_event(PlayerAction::ReleaseCall);
    app.update();

    assert_eq!(state(&app, near), GuardState::Investigating, "guard inside the radius investigates");
    assert_eq!(state(&app, far), GuardState::Patrolling, "guard outside the radius ignores the call");
    assert_eq!(state(&app, chaser), GuardState::Chasing, "chasing guard ignores the call");

    let brain = app.world().get::<GuardBrain>(near).expect("brain");
    assert!(brain.memory.last_known_position.length() < 1e-3, "investigates the call origin");

    let abilities = app.world().get::<PlayerAbilities>(player).expect("abilities");
    assert!(!abilities.is_charging());
    assert_eq!(abilities.calls_used, 1);
    assert_eq!(abilities.guards_distracted, 1);
}
