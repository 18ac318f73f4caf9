//! Guard state machine.
//!
//! `GuardMachine` borrows one guard's components and runs transitions and
//! per-tick logic on them. Every transition is teardown → setup:
//! - teardown: cancel the running routine, clear transient flags
//! - setup: movement profile + initial destination of the new state
//!
//! Tick order: perception → facing → chase preemption → routine → state update.

use std::f32::consts::PI;

use bevy::ecs::query::QueryItem;
use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ai::components::{
    GuardBrain, GuardConfig, GuardState, InvestigatePhase, PatrolRoute, Routine, StunTimer, TrackingMemory,
};
use crate::ai::events::GuardStateChanged;
use crate::ai::search::SearchPlan;
use crate::components::{Facing, MovementCommand, MovementProfile, NavigationState, SpawnPose};
use crate::navigation::NavigationQuery;
use crate::physics::ObstacleQuery;
use crate::vision::VisionSensor;

/// Velocity below which the facing is not updated from movement.
const FACING_VELOCITY_THRESHOLD: f32 = 0.1;

/// Components of one guard, as fetched by the AI systems.
pub type GuardQuery = (
    Entity,
    &'static mut Transform,
    &'static mut Facing,
    &'static mut GuardState,
    &'static mut GuardBrain,
    &'static GuardConfig,
    &'static PatrolRoute,
    &'static mut SpawnPose,
    &'static VisionSensor,
    &'static mut MovementCommand,
    &'static mut MovementProfile,
    &'static mut NavigationState,
);

/// Read-only world view for one guard tick (plus the shared RNG).
pub struct GuardEnv<'a> {
    pub dt: f32,
    /// Fixed-clock seconds since startup
    pub now: f64,
    /// None when there is no player in the world
    pub player: Option<Vec2>,
    pub obstacles: &'a dyn ObstacleQuery,
    pub navigation: &'a dyn NavigationQuery,
    pub rng: &'a mut ChaCha8Rng,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardTransition {
    pub from: GuardState,
    pub to: GuardState,
}

pub struct GuardMachine<'a> {
    pub entity: Entity,
    pub transform: &'a mut Transform,
    pub facing: &'a mut Facing,
    pub state: &'a mut GuardState,
    pub brain: &'a mut GuardBrain,
    pub config: &'a GuardConfig,
    pub route: &'a PatrolRoute,
    pub spawn: &'a mut SpawnPose,
    pub sensor: &'a VisionSensor,
    pub command: &'a mut MovementCommand,
    pub profile: &'a mut MovementProfile,
    pub nav: &'a mut NavigationState,
    /// Transitions performed through this machine, drained by the driving system
    pub transitions: Vec<GuardTransition>,
}

impl<'a> GuardMachine<'a> {
    pub fn from_query(item: &'a mut QueryItem<'_, GuardQuery>) -> Self {
        let (entity, transform, facing, state, brain, config, route, spawn, sensor, command, profile, nav) = item;
        Self {
            entity: *entity,
            transform: &mut **transform,
            facing: &mut **facing,
            state: &mut **state,
            brain: &mut **brain,
            config: *config,
            route: *route,
            spawn: &mut **spawn,
            sensor: *sensor,
            command: &mut **command,
            profile: &mut **profile,
            nav: &mut **nav,
            transitions: Vec::new(),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.transform.translation.truncate()
    }

    pub fn current_state(&self) -> GuardState {
        *self.state
    }

    /// Publishes the recorded transitions as `GuardStateChanged` events.
    pub fn flush(self, events: &mut EventWriter<GuardStateChanged>) {
        let guard = self.entity;
        for GuardTransition { from, to } in self.transitions {
            events.write(GuardStateChanged { guard, from, to });
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// First simulated tick: capture the spawn pose and enter Patrolling.
    pub fn initialize(&mut self) {
        self.spawn.position = self.position();
        self.spawn.facing = self.facing.0;
        self.brain.memory = TrackingMemory::with_capacity(self.config.history_capacity);
        self.force_state(GuardState::Patrolling);
    }

    /// Freeze after an arrest: sensor and FSM off until `reset_to_spawn`.
    pub fn disable(&mut self) {
        self.brain.disabled = true;
        self.brain.stun = None;
        self.brain.routine = Routine::None;
        self.stop();
    }

    /// Back to the spawn pose with a clean memory, (re)entering Patrolling
    /// even when already Patrolling.
    pub fn reset_to_spawn(&mut self) {
        self.brain.disabled = false;
        self.brain.stun = None;
        self.brain.routine = Routine::None;

        let spawn = *self.spawn;
        self.transform.translation.x = spawn.position.x;
        self.transform.translation.y = spawn.position.y;
        *self.facing = Facing::new(spawn.facing);
        self.nav.warp();
        *self.command = MovementCommand::Idle;

        self.brain.patrol_index = 0;
        self.brain.memory.clear();
        self.brain.search.clear();
        self.brain.flank_target = None;
        self.brain.reached_destination = false;

        self.force_state(GuardState::Patrolling);
    }

    // ========================================================================
    // External stimuli
    // ========================================================================

    /// Distraction heard at `position`. Returns false when ignored
    /// (chasing, stunned or disabled).
    pub fn hear_sound(&mut self, position: Vec2) -> bool {
        if !self.accepts_stimulus() {
            return false;
        }
        crate::log(&format!("Guard {:?} heard a sound at {:?}", self.entity, position));
        self.investigate(position);
        true
    }

    /// Security camera spotted the player at `player_position`.
    pub fn camera_alert(&mut self, player_position: Vec2) -> bool {
        if !self.accepts_stimulus() {
            return false;
        }
        crate::log_info(&format!(
            "Guard {:?} alerted by camera, player at {:?}",
            self.entity, player_position
        ));
        self.investigate(player_position);
        true
    }

    /// Returns false (no-op) when disabled or already stunned.
    pub fn apply_stun(&mut self, duration: f32, now: f64) -> bool {
        if self.brain.disabled || self.brain.stun.is_some() {
            return false;
        }

        let resume = *self.state;
        self.change_state(GuardState::Stunned);
        self.brain.stun = Some(StunTimer {
            started_at: now,
            duration,
            resume,
        });

        crate::log_info(&format!(
            "Guard {:?} stunned for {:.1}s (was {:?})",
            self.entity, duration, resume
        ));
        true
    }

    fn accepts_stimulus(&self) -> bool {
        !self.brain.disabled && self.brain.stun.is_none() && *self.state != GuardState::Chasing
    }

    fn investigate(&mut self, position: Vec2) {
        self.brain.memory.last_known_position = position;
        // A new report while investigating retargets the investigation
        if *self.state == GuardState::Investigating {
            self.force_state(GuardState::Investigating);
        } else {
            self.change_state(GuardState::Investigating);
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// No-op when `new` is the current state or the guard is disabled.
    pub fn change_state(&mut self, new: GuardState) {
        if *self.state == new || self.brain.disabled {
            return;
        }
        self.transition(new);
    }

    /// Teardown + setup even when `new` equals the current state.
    pub fn force_state(&mut self, new: GuardState) {
        if self.brain.disabled {
            return;
        }
        self.transition(new);
    }

    fn transition(&mut self, new: GuardState) {
        // Teardown
        self.brain.routine = Routine::None;
        self.brain.reached_destination = false;
        self.brain.flank_target = None;

        let from = *self.state;
        *self.state = new;
        self.brain.transitions = self.brain.transitions.wrapping_add(1);
        if from != new {
            self.transitions.push(GuardTransition { from, to: new });
            crate::log(&format!("Guard {:?}: {:?} → {:?}", self.entity, from, new));
        }

        // Setup
        match new {
            GuardState::Patrolling => self.start_patrolling(),
            GuardState::Rotating => self.start_rotating(),
            GuardState::Chasing => {
                // `time_since_seen` is left alone: only a sighting resets it
                self.set_profile(self.config.chase_speed, self.config.chase_acceleration, false);
            }
            GuardState::Flanking => {
                self.set_profile(
                    self.config.chase_speed * self.config.flank_speed_multiplier,
                    self.config.chase_acceleration,
                    false,
                );
            }
            GuardState::Ambushing | GuardState::Stunned => self.stop(),
            GuardState::Searching => {
                self.set_profile(
                    self.config.investigate_speed * self.config.search_speed_multiplier,
                    self.config.patrol_acceleration,
                    true,
                );
                if let Some(point) = self.brain.search.current() {
                    self.move_to(point);
                }
            }
            GuardState::Investigating => {
                self.set_profile(self.config.investigate_speed, self.config.patrol_acceleration, true);
                self.move_to(self.brain.memory.last_known_position);
                self.brain.routine = Routine::Investigate(InvestigatePhase::Approach);
            }
            GuardState::ReturningToSpawn => {
                self.set_profile(self.config.patrol_speed, self.config.patrol_acceleration, true);
                self.move_to(self.spawn.position);
            }
        }
    }

    fn start_patrolling(&mut self) {
        if self.route.is_empty() {
            self.stop();
            return;
        }

        self.set_profile(self.config.patrol_speed, self.config.patrol_acceleration, true);
        if self.brain.patrol_index >= self.route.len() {
            self.brain.patrol_index = self.route.closest_index(self.position()).unwrap_or(0);
        }
        if let Some(waypoint) = self.route.get(self.brain.patrol_index) {
            self.move_to(waypoint);
        }
    }

    fn start_rotating(&mut self) {
        self.stop();

        let heading = if self.route.is_empty() {
            self.spawn.facing
        } else {
            if self.brain.patrol_index >= self.route.len() {
                self.brain.patrol_index = self.route.closest_index(self.position()).unwrap_or(0);
            }
            let offset = self
                .route
                .get(self.brain.patrol_index)
                .map(|waypoint| waypoint - self.position())
                .unwrap_or(Vec2::ZERO);
            // Already standing on the waypoint: the residual offset is noise
            if offset.length() < self.config.destination_threshold {
                self.change_state(GuardState::Patrolling);
                return;
            }
            offset
        };

        let Some(heading) = heading.try_normalize() else {
            self.change_state(GuardState::Patrolling);
            return;
        };

        let from = self.facing.angle();
        let delta = wrap_angle(heading.to_angle() - from);
        let delta_degrees = delta.abs().to_degrees();
        if delta_degrees < self.config.rotation_skip_threshold {
            self.change_state(GuardState::Patrolling);
            return;
        }
        if self.config.rotation_speed <= 0.0 {
            *self.facing = Facing::from_angle(from + delta);
            self.change_state(GuardState::Patrolling);
            return;
        }

        self.brain.routine = Routine::Rotate {
            from,
            to: from + delta,
            elapsed: 0.0,
            duration: delta_degrees / self.config.rotation_speed,
        };
    }

    // ========================================================================
    // Movement helpers
    // ========================================================================

    fn set_profile(&mut self, speed: f32, acceleration: f32, auto_braking: bool) {
        *self.profile = MovementProfile {
            speed,
            acceleration,
            auto_braking,
        };
    }

    /// Issue a destination. A new destination marks the path pending so the
    /// arrival check cannot fire on the previous path's distance.
    fn move_to(&mut self, target: Vec2) {
        *self.command = MovementCommand::MoveTo { target };
        if self.nav.destination != Some(target) {
            self.nav.path_pending = true;
        }
    }

    fn stop(&mut self) {
        *self.command = MovementCommand::Stop;
        self.nav.velocity = Vec2::ZERO;
    }

    fn arrived(&self) -> bool {
        self.nav.has_arrived(self.config.destination_threshold)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick(&mut self, env: &mut GuardEnv) {
        if self.brain.disabled {
            return;
        }

        if let Some(stun) = self.brain.stun {
            if stun.is_expired(env.now) {
                self.brain.stun = None;
                crate::log_info(&format!(
                    "Guard {:?} recovered from stun → {:?}",
                    self.entity, stun.resume
                ));
                self.change_state(stun.resume);
            }
            return;
        }
        if *self.state == GuardState::Stunned {
            // Stunned without a timer can only come from outside tampering
            crate::log_warning(&format!("Guard {:?} stunned without a timer, resuming patrol", self.entity));
            self.change_state(GuardState::Patrolling);
            return;
        }

        let visible = self.perceive(env);
        self.update_facing(env, visible);

        if visible && *self.state != GuardState::Chasing {
            self.change_state(GuardState::Chasing);
        }

        self.advance_routine(env);

        match *self.state {
            GuardState::Patrolling => self.update_patrolling(),
            GuardState::Chasing => self.update_chasing(env, visible),
            GuardState::Flanking => self.update_flanking(env),
            GuardState::Ambushing => self.update_ambushing(env),
            GuardState::Searching => self.update_searching(),
            GuardState::ReturningToSpawn => self.update_returning(),
            GuardState::Rotating | GuardState::Investigating | GuardState::Stunned => {}
        }
    }

    /// Sensor + tracking memory. Returns whether the player is visible now.
    fn perceive(&mut self, env: &GuardEnv) -> bool {
        let position = self.position();
        let sighting = env
            .player
            .filter(|player| self.sensor.can_see(position, self.facing.0, *player, env.obstacles));

        let Some(player) = sighting else {
            self.brain.memory.unseen(env.dt);
            return false;
        };

        self.brain.memory.observe(player, env.now);
        if let Some(raw) = self.brain.memory.history.extrapolate(self.config.prediction_time) {
            let snapped = env
                .navigation
                .sample_position(raw, self.config.search_snap_radius)
                .unwrap_or(player);
            self.brain.memory.predicted_position = Some(snapped);
        }
        true
    }

    fn update_facing(&mut self, env: &GuardEnv, visible: bool) {
        let aggressive = matches!(*self.state, GuardState::Chasing | GuardState::Flanking);
        if aggressive && visible {
            if let Some(player) = env.player {
                let t = env.dt * self.config.vision_turn_speed;
                self.facing.turn_towards(player - self.position(), t);
            }
        } else if self.nav.velocity.length() > FACING_VELOCITY_THRESHOLD {
            self.facing.0 = self.nav.velocity.normalize();
        }
    }

    fn advance_routine(&mut self, env: &GuardEnv) {
        match self.brain.routine {
            Routine::None => {}

            Routine::WaitAtWaypoint { elapsed } => {
                let elapsed = elapsed + env.dt;
                if elapsed < self.config.wait_at_point {
                    self.brain.routine = Routine::WaitAtWaypoint { elapsed };
                    return;
                }
                self.brain.routine = Routine::None;
                if !self.route.is_empty() {
                    self.brain.patrol_index = (self.brain.patrol_index + 1) % self.route.len();
                }
                self.change_state(GuardState::Rotating);
            }

            Routine::Rotate {
                from,
                to,
                elapsed,
                duration,
            } => {
                let elapsed = elapsed + env.dt;
                if elapsed < duration {
                    let t = elapsed / duration;
                    *self.facing = Facing::from_angle(from + (to - from) * t);
                    self.brain.routine = Routine::Rotate {
                        from,
                        to,
                        elapsed,
                        duration,
                    };
                    return;
                }
                *self.facing = Facing::from_angle(to);
                self.brain.routine = Routine::None;
                self.change_state(GuardState::Patrolling);
            }

            Routine::Investigate(InvestigatePhase::Approach) => {
                if self.arrived() {
                    self.stop();
                    self.brain.routine = Routine::Investigate(InvestigatePhase::LookAround {
                        elapsed: 0.0,
                        scans: 0,
                        initial_facing: self.facing.0,
                    });
                }
            }

            Routine::Investigate(InvestigatePhase::LookAround {
                elapsed,
                mut scans,
                initial_facing,
            }) => {
                let elapsed = elapsed + env.dt;
                let interval = self.config.look_around_interval;
                if interval > 0.0 && (elapsed / interval) as u32 > scans {
                    scans += 1;
                    let fov = self.sensor.angle_degrees;
                    let scan_angle = match scans % 3 {
                        1 => fov,
                        2 => -fov,
                        _ => 0.0,
                    };
                    self.facing.0 = Facing::new(initial_facing).rotated(scan_angle);
                }

                if elapsed >= self.config.investigate_time {
                    *self.facing = Facing::new(initial_facing);
                    self.brain.routine = Routine::None;
                    self.change_state(GuardState::ReturningToSpawn);
                    return;
                }
                self.brain.routine = Routine::Investigate(InvestigatePhase::LookAround {
                    elapsed,
                    scans,
                    initial_facing,
                });
            }
        }
    }

    // ========================================================================
    // Per-state updates
    // ========================================================================

    fn update_patrolling(&mut self) {
        if self.route.is_empty() || matches!(self.brain.routine, Routine::WaitAtWaypoint { .. }) {
            return;
        }
        if self.arrived() && !self.brain.reached_destination {
            self.brain.reached_destination = true;
            self.stop();
            self.brain.routine = Routine::WaitAtWaypoint { elapsed: 0.0 };
        }
    }

    fn update_chasing(&mut self, env: &mut GuardEnv, visible: bool) {
        let Some(player) = env.player else {
            crate::log_warning(&format!("Guard {:?} lost the player reference, resuming patrol", self.entity));
            self.change_state(GuardState::Patrolling);
            return;
        };

        if self.position().distance(player) > self.config.lose_pursuit_distance {
            self.begin_search(env);
            return;
        }

        if visible {
            let target = self.brain.memory.predicted_position.unwrap_or(player);
            self.move_to(target);
            self.brain.memory.time_since_seen = 0.0;
            return;
        }

        if self.brain.memory.time_since_seen >= self.config.max_chase_time {
            self.begin_search(env);
            return;
        }

        let last_known = self.brain.memory.last_known_position;
        self.move_to(last_known);
        if self.config.flanking_enabled
            && self.position().distance(last_known) < self.config.flank_trigger_distance
            && !self.flank_candidates(env).is_empty()
        {
            self.change_state(GuardState::Flanking);
        }
    }

    fn update_flanking(&mut self, env: &mut GuardEnv) {
        if env.player.is_none() {
            crate::log_warning(&format!("Guard {:?} lost the player while flanking", self.entity));
            self.begin_search(env);
            return;
        }

        if self.brain.flank_target.is_none() {
            let Some(target) = self.plan_flank(env) else {
                crate::log(&format!("Guard {:?}: no flank point, back to chase", self.entity));
                self.change_state(GuardState::Chasing);
                return;
            };
            self.brain.flank_target = Some(target);
            self.move_to(target);
        }

        if self.arrived() {
            self.change_state(GuardState::Ambushing);
            return;
        }

        if self.brain.memory.time_since_seen > self.config.flank_give_up_time {
            self.begin_search(env);
        }
    }

    fn update_ambushing(&mut self, env: &mut GuardEnv) {
        if self.brain.memory.time_since_seen > self.config.ambush_wait {
            self.begin_search(env);
        }
    }

    fn update_searching(&mut self) {
        if self.brain.search.is_empty() || self.brain.search.exhausted {
            self.change_state(GuardState::Investigating);
            return;
        }
        if self.arrived() {
            if let Some(point) = self.brain.search.advance() {
                self.move_to(point);
            }
        }
    }

    fn update_returning(&mut self) {
        if !self.arrived() {
            return;
        }
        if self.route.is_empty() {
            self.change_state(GuardState::Rotating);
        } else {
            self.change_state(GuardState::Patrolling);
        }
    }

    // ========================================================================
    // Planning
    // ========================================================================

    fn begin_search(&mut self, env: &GuardEnv) {
        self.brain.search = SearchPlan::generate(
            self.brain.memory.last_known_position,
            self.position(),
            self.config.search_radius,
            self.config.max_search_points,
            self.config.search_snap_radius,
            env.navigation,
        );
        crate::log(&format!(
            "Guard {:?}: searching {} points around {:?}",
            self.entity,
            self.brain.search.points.len(),
            self.brain.memory.last_known_position
        ));
        self.change_state(GuardState::Searching);
    }

    /// Points beside the last known position (perpendicular to the
    /// guard→target line, both sides) that have a complete path.
    pub fn flank_candidates(&self, env: &GuardEnv) -> Vec<Vec2> {
        let position = self.position();
        let last_known = self.brain.memory.last_known_position;
        let toward = (last_known - position).try_normalize().unwrap_or(self.facing.0);
        let offset = toward.perp() * self.config.flanking_distance;

        [last_known + offset, last_known - offset]
            .into_iter()
            .filter(|candidate| env.navigation.path_exists(position, *candidate))
            .collect()
    }

    fn plan_flank(&self, env: &mut GuardEnv) -> Option<Vec2> {
        let candidates = self.flank_candidates(env);
        if candidates.is_empty() {
            return None;
        }
        let choice = candidates[env.rng.gen_range(0..candidates.len())];
        env.navigation.sample_position(choice, self.config.flank_snap_radius)
    }
}

/// Wraps an angle into (-π, π].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::OpenNavigation;
    use crate::physics::ObstacleMap;
    use rand::SeedableRng;

    /// Owned components of one guard for machine-level tests.
    struct Rig {
        transform: Transform,
        facing: Facing,
        state: GuardState,
        brain: GuardBrain,
        config: GuardConfig,
        route: PatrolRoute,
        spawn: SpawnPose,
        sensor: VisionSensor,
        command: MovementCommand,
        profile: MovementProfile,
        nav: NavigationState,
    }

    impl Rig {
        fn new(position: Vec2, facing: Vec2, route: Vec<Vec2>) -> Self {
            Self {
                transform: Transform::from_xyz(position.x, position.y, 0.0),
                facing: Facing::new(facing),
                state: GuardState::default(),
                brain: GuardBrain::default(),
                config: GuardConfig::default(),
                route: PatrolRoute(route),
                spawn: SpawnPose::default(),
                sensor: VisionSensor::default(),
                command: MovementCommand::default(),
                profile: MovementProfile::default(),
                nav: NavigationState::default(),
            }
        }

        fn machine(&mut self) -> GuardMachine<'_> {
            GuardMachine {
                entity: Entity::PLACEHOLDER,
                transform: &mut self.transform,
                facing: &mut self.facing,
                state: &mut self.state,
                brain: &mut self.brain,
                config: &self.config,
                route: &self.route,
                spawn: &mut self.spawn,
                sensor: &self.sensor,
                command: &mut self.command,
                profile: &mut self.profile,
                nav: &mut self.nav,
                transitions: Vec::new(),
            }
        }

        /// Pretend the agent backend planned and reached its destination.
        fn arrive(&mut self) {
            self.nav.path_pending = false;
            self.nav.remaining_distance = 0.0;
            self.nav.velocity = Vec2::ZERO;
        }
    }

    fn tick(rig: &mut Rig, player: Option<Vec2>, now: f64) -> Vec<GuardTransition> {
        let obstacles = ObstacleMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut env = GuardEnv {
            dt: 1.0 / 60.0,
            now,
            player,
            obstacles: &obstacles,
            navigation: &OpenNavigation,
            rng: &mut rng,
        };
        let mut machine = rig.machine();
        machine.tick(&mut env);
        machine.transitions
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_initialize_captures_spawn_and_moves_to_first_waypoint() {
        let mut rig = Rig::new(Vec2::new(1.0, 1.0), Vec2::X, vec![Vec2::new(5.0, 1.0), Vec2::new(5.0, 5.0)]);
        rig.machine().initialize();

        assert_eq!(rig.spawn.position, Vec2::new(1.0, 1.0));
        assert_eq!(rig.state, GuardState::Patrolling);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(5.0, 1.0) });
        assert!(rig.nav.path_pending, "a new destination must be marked pending");
        assert_eq!(rig.profile.speed, rig.config.patrol_speed);
    }

    #[test]
    fn test_change_state_to_same_state_is_noop() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        let before = rig.brain.transitions;

        let mut machine = rig.machine();
        machine.change_state(GuardState::Patrolling);
        assert!(machine.transitions.is_empty());
        assert_eq!(rig.brain.transitions, before);
    }

    #[test]
    fn test_transition_cancels_routine() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![Vec2::new(3.0, 0.0)]);
        rig.machine().initialize();
        rig.brain.routine = Routine::WaitAtWaypoint { elapsed: 1.0 };
        rig.brain.flank_target = Some(Vec2::ONE);

        rig.machine().change_state(GuardState::Ambushing);
        assert_eq!(rig.brain.routine, Routine::None);
        assert_eq!(rig.brain.flank_target, None);
        assert_eq!(rig.command, MovementCommand::Stop);
    }

    #[test]
    fn test_patrol_wait_then_rotate_then_next_waypoint() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![Vec2::new(4.0, 0.0), Vec2::new(4.0, 4.0)]);
        rig.machine().initialize();

        // Reach the first waypoint
        rig.transform.translation = Vec3::new(4.0, 0.0, 0.0);
        rig.arrive();
        tick(&mut rig, None, 1.0);
        assert!(matches!(rig.brain.routine, Routine::WaitAtWaypoint { .. }));
        assert_eq!(rig.command, MovementCommand::Stop);

        // Dwell
        let mut rotated = false;
        for i in 0..(2.0 * 60.0) as usize + 2 {
            let transitions = tick(&mut rig, None, 1.0 + i as f64 / 60.0);
            if transitions.iter().any(|t| t.to == GuardState::Rotating) {
                rotated = true;
                break;
            }
        }
        assert!(rotated, "dwell must end in Rotating");
        assert_eq!(rig.brain.patrol_index, 1);

        // Facing +X, next waypoint is straight up: 90 degrees at 90 deg/s
        let mut ticks = 0;
        while rig.state == GuardState::Rotating && ticks < 200 {
            tick(&mut rig, None, 5.0);
            ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Patrolling);
        assert!((59..=62).contains(&ticks), "rotation took {} ticks", ticks);
        assert!((rig.facing.0 - Vec2::Y).length() < 1e-3);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(4.0, 4.0) });
    }

    #[test]
    fn test_sight_preempts_into_chase_same_tick() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();

        let transitions = tick(&mut rig, Some(Vec2::new(5.0, 0.0)), 0.0);
        assert_eq!(
            transitions,
            vec![GuardTransition {
                from: GuardState::Patrolling,
                to: GuardState::Chasing
            }]
        );
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(5.0, 0.0) });
    }

    #[test]
    fn test_sound_ignored_while_chasing() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);

        assert!(!rig.machine().hear_sound(Vec2::new(3.0, 3.0)));
        assert_eq!(rig.state, GuardState::Chasing);
    }

    #[test]
    fn test_sound_starts_investigation() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();

        assert!(rig.machine().hear_sound(Vec2::new(3.0, 3.0)));
        assert_eq!(rig.state, GuardState::Investigating);
        assert_eq!(rig.brain.memory.last_known_position, Vec2::new(3.0, 3.0));
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(3.0, 3.0) });
    }

    #[test]
    fn test_lost_target_close_by_turns_into_flank_then_ambush() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);
        rig.brain.memory.last_known_position = Vec2::new(1.0, 0.0);

        // Player hid behind the guard
        let transitions = tick(&mut rig, Some(Vec2::new(-5.0, 0.0)), 0.0);
        assert!(transitions.iter().any(|t| t.to == GuardState::Flanking));

        tick(&mut rig, Some(Vec2::new(-5.0, 0.0)), 0.0);
        let target = rig.brain.flank_target.expect("flank point planned");
        assert!(
            target == Vec2::new(1.0, 4.0) || target == Vec2::new(1.0, -4.0),
            "flank point beside the last known position, got {:?}",
            target
        );
        assert_eq!(rig.command, MovementCommand::MoveTo { target });

        rig.transform.translation = target.extend(0.0);
        rig.arrive();
        tick(&mut rig, Some(Vec2::new(-5.0, 0.0)), 0.0);
        assert_eq!(rig.state, GuardState::Ambushing);
    }

    #[test]
    fn test_look_around_scans_then_returns_to_spawn() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().hear_sound(Vec2::new(-3.0, 0.0));

        rig.transform.translation = Vec3::new(-3.0, 0.0, 0.0);
        rig.arrive();
        tick(&mut rig, None, 0.0);
        let Routine::Investigate(InvestigatePhase::LookAround { initial_facing, .. }) = rig.brain.routine else {
            panic!("expected look-around, got {:?}", rig.brain.routine);
        };

        // First scan after one interval turns by +fov
        for _ in 0..91 {
            tick(&mut rig, None, 0.0);
        }
        let expected = Facing::new(initial_facing).rotated(rig.sensor.angle_degrees);
        assert!((rig.facing.0 - expected).length() < 1e-4);

        // Timeout → ReturningToSpawn with the facing restored
        let mut returned = false;
        for _ in 0..700 {
            if tick(&mut rig, None, 0.0)
                .iter()
                .any(|t| t.to == GuardState::ReturningToSpawn)
            {
                returned = true;
                break;
            }
        }
        assert!(returned);
        assert!((rig.facing.0 - initial_facing).length() < 1e-4);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::ZERO });
    }

    #[test]
    fn test_stun_gating() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();

        assert!(rig.machine().apply_stun(2.0, 0.0));
        assert_eq!(rig.state, GuardState::Stunned);
        assert!(!rig.machine().apply_stun(2.0, 0.5), "no re-stun while stunned");

        rig.machine().disable();
        assert!(!rig.machine().apply_stun(2.0, 1.0), "no stun while disabled");
        assert!(rig.brain.stun.is_none());
    }

    #[test]
    fn test_disabled_guard_ignores_everything() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().disable();

        let transitions = tick(&mut rig, Some(Vec2::new(3.0, 0.0)), 0.0);
        assert!(transitions.is_empty());
        assert_eq!(rig.state, GuardState::Patrolling);
        assert!(!rig.machine().hear_sound(Vec2::ONE));
    }

    #[test]
    fn test_reset_reenters_patrolling_even_when_patrolling() {
        let mut rig = Rig::new(Vec2::new(2.0, 2.0), Vec2::X, vec![Vec2::new(6.0, 2.0)]);
        rig.machine().initialize();
        rig.transform.translation = Vec3::new(9.0, 9.0, 0.0);
        rig.brain.reached_destination = true;
        rig.brain.routine = Routine::WaitAtWaypoint { elapsed: 0.3 };
        rig.machine().disable();

        let before = rig.brain.transitions;
        rig.machine().reset_to_spawn();

        assert!(!rig.brain.disabled);
        assert_eq!(rig.state, GuardState::Patrolling);
        assert_eq!(rig.brain.transitions, before + 1, "setup must run again");
        assert_eq!(rig.transform.translation.truncate(), Vec2::new(2.0, 2.0));
        assert_eq!(rig.brain.routine, Routine::None);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(6.0, 2.0) });
    }

    #[test]
    fn test_single_waypoint_route_skips_rotation() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![Vec2::new(4.0, 0.0)]);
        rig.machine().initialize();

        // Stopped a little off the waypoint, facing away from the offset
        rig.transform.translation = Vec3::new(4.2, -0.3, 0.0);
        rig.facing = Facing::new(Vec2::X);
        rig.arrive();
        tick(&mut rig, None, 0.0);
        assert!(matches!(rig.brain.routine, Routine::WaitAtWaypoint { .. }));

        let mut log = Vec::new();
        for _ in 0..200 {
            log.extend(tick(&mut rig, None, 0.0));
            if log.iter().any(|t| t.to == GuardState::Rotating) {
                break;
            }
        }
        assert_eq!(
            log,
            vec![
                GuardTransition {
                    from: GuardState::Patrolling,
                    to: GuardState::Rotating
                },
                GuardTransition {
                    from: GuardState::Rotating,
                    to: GuardState::Patrolling
                },
            ]
        );
        assert_eq!(rig.brain.routine, Routine::None);
        assert!((rig.facing.0 - Vec2::X).length() < 1e-6, "facing must not snap to the residual offset");
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(4.0, 0.0) });
    }

    #[test]
    fn test_stun_does_not_refill_chase_time() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.config.flanking_enabled = false;
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);
        rig.brain.memory.last_known_position = Vec2::new(1.0, 0.0);
        let behind = Some(Vec2::new(-5.0, 0.0));

        // 7 s of blind pursuit
        let mut now = 0.0;
        for _ in 0..420 {
            now += 1.0 / 60.0;
            tick(&mut rig, behind, now);
        }
        assert_eq!(rig.state, GuardState::Chasing);
        let spent = rig.brain.memory.time_since_seen;
        assert!((spent - 7.0).abs() < 0.05, "unseen for {}", spent);

        assert!(rig.machine().apply_stun(2.0, now));
        let mut stunned_ticks = 0;
        while rig.state == GuardState::Stunned && stunned_ticks < 300 {
            now += 1.0 / 60.0;
            tick(&mut rig, behind, now);
            stunned_ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Chasing, "resumes the pre-stun state");
        assert!(
            (rig.brain.memory.time_since_seen - spent).abs() < 1e-6,
            "stun resume must keep the unseen time"
        );

        // Only the remaining second of the budget is left
        let mut ticks = 0;
        while rig.state == GuardState::Chasing && ticks < 600 {
            now += 1.0 / 60.0;
            tick(&mut rig, behind, now);
            ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Searching);
        assert!(ticks <= 62, "chase continued {} ticks after resume", ticks);
    }

    #[test]
    fn test_stun_resume_then_sighting_chases() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().hear_sound(Vec2::new(3.0, 3.0));
        assert!(rig.machine().apply_stun(1.0, 0.0));

        let player = Some(Vec2::new(5.0, 0.0));
        assert!(tick(&mut rig, player, 0.5).is_empty(), "stunned guards see nothing");
        assert_eq!(rig.brain.memory.last_known_position, Vec2::new(3.0, 3.0));

        let resumed = tick(&mut rig, player, 1.0);
        assert_eq!(
            resumed,
            vec![GuardTransition {
                from: GuardState::Stunned,
                to: GuardState::Investigating
            }]
        );

        let chased = tick(&mut rig, player, 1.0 + 1.0 / 60.0);
        assert_eq!(
            chased,
            vec![GuardTransition {
                from: GuardState::Investigating,
                to: GuardState::Chasing
            }]
        );
    }

    #[test]
    fn test_sight_preempts_search_and_investigation() {
        for state in [GuardState::Searching, GuardState::Investigating] {
            let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
            rig.machine().initialize();
            rig.brain.memory.last_known_position = Vec2::new(-3.0, 0.0);
            rig.brain.search = SearchPlan::generate(Vec2::new(-3.0, 0.0), Vec2::ZERO, 5.0, 8, 1.0, &OpenNavigation);
            rig.machine().change_state(state);
            assert_eq!(rig.state, state);

            let transitions = tick(&mut rig, Some(Vec2::new(5.0, 0.0)), 0.0);
            assert_eq!(transitions, vec![GuardTransition { from: state, to: GuardState::Chasing }]);
            assert_eq!(rig.brain.routine, Routine::None);
            assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(5.0, 0.0) });
        }
    }

    #[test]
    fn test_chase_without_player_falls_back_to_patrol() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);

        let transitions = tick(&mut rig, None, 0.0);
        assert_eq!(
            transitions,
            vec![GuardTransition {
                from: GuardState::Chasing,
                to: GuardState::Patrolling
            }]
        );
    }

    #[test]
    fn test_player_beyond_pursuit_distance_starts_search() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);
        rig.brain.memory.last_known_position = Vec2::new(2.0, 0.0);

        let far = rig.config.lose_pursuit_distance + 5.0;
        let transitions = tick(&mut rig, Some(Vec2::new(-far, 0.0)), 0.0);
        assert_eq!(
            transitions,
            vec![GuardTransition {
                from: GuardState::Chasing,
                to: GuardState::Searching
            }]
        );
        assert_eq!(rig.brain.search.points.len(), rig.config.max_search_points);
        let first = rig.brain.search.current().expect("search point");
        assert_eq!(rig.command, MovementCommand::MoveTo { target: first });
        assert!(first.distance(Vec2::new(2.0, 0.0)) <= rig.config.search_radius + 0.01);
    }

    #[test]
    fn test_flank_gives_up_into_search() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::Chasing);
        rig.brain.memory.last_known_position = Vec2::new(1.0, 0.0);
        let behind = Some(Vec2::new(-5.0, 0.0));

        tick(&mut rig, behind, 0.0);
        assert_eq!(rig.state, GuardState::Flanking);

        // Never arrives: the path stays pending
        let mut ticks = 0;
        while rig.state == GuardState::Flanking && ticks < 600 {
            tick(&mut rig, behind, 0.0);
            ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Searching);
        assert!(rig.brain.memory.time_since_seen > rig.config.flank_give_up_time);
        assert!(rig.brain.memory.time_since_seen < rig.config.flank_give_up_time + 0.05);
    }

    #[test]
    fn test_ambush_times_out_into_search() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.brain.memory.last_known_position = Vec2::new(-2.0, 0.0);
        rig.machine().change_state(GuardState::Ambushing);
        assert_eq!(rig.command, MovementCommand::Stop);

        let mut ticks = 0;
        while rig.state == GuardState::Ambushing && ticks < 600 {
            tick(&mut rig, None, 0.0);
            ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Searching);
        let waited = ticks as f32 / 60.0;
        assert!(
            waited >= rig.config.ambush_wait - 0.02 && waited < rig.config.ambush_wait + 0.05,
            "ambush lasted {}s",
            waited
        );
    }

    #[test]
    fn test_exhausted_search_turns_into_investigation() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.brain.memory.last_known_position = Vec2::new(3.0, 0.0);
        rig.brain.search = SearchPlan::generate(Vec2::new(3.0, 0.0), Vec2::ZERO, 5.0, 8, 1.0, &OpenNavigation);
        rig.machine().change_state(GuardState::Searching);

        let mut visited = Vec::new();
        for _ in 0..20 {
            let MovementCommand::MoveTo { target } = rig.command else {
                panic!("searching guard must be walking, got {:?}", rig.command);
            };
            rig.transform.translation = target.extend(0.0);
            rig.arrive();
            if !visited.contains(&target) {
                visited.push(target);
            }
            if tick(&mut rig, None, 0.0)
                .iter()
                .any(|t| t.to == GuardState::Investigating)
            {
                break;
            }
        }

        assert_eq!(rig.state, GuardState::Investigating);
        assert_eq!(visited.len(), 8, "every ring point visited once");
        assert!(rig.brain.search.exhausted);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(3.0, 0.0) });
    }

    #[test]
    fn test_empty_search_plan_investigates_immediately() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.brain.memory.last_known_position = Vec2::new(3.0, 0.0);
        rig.machine().change_state(GuardState::Searching);

        tick(&mut rig, None, 0.0);
        assert_eq!(rig.state, GuardState::Investigating);
    }

    #[test]
    fn test_return_to_spawn_resumes_route() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![Vec2::new(4.0, 0.0), Vec2::new(4.0, 4.0)]);
        rig.machine().initialize();
        rig.transform.translation = Vec3::new(-3.0, 2.0, 0.0);
        rig.machine().change_state(GuardState::ReturningToSpawn);
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::ZERO });

        rig.transform.translation = Vec3::ZERO;
        rig.arrive();
        let transitions = tick(&mut rig, None, 0.0);
        assert_eq!(
            transitions,
            vec![GuardTransition {
                from: GuardState::ReturningToSpawn,
                to: GuardState::Patrolling
            }]
        );
        assert_eq!(rig.command, MovementCommand::MoveTo { target: Vec2::new(4.0, 0.0) });
    }

    #[test]
    fn test_stationary_guard_turns_back_to_spawn_facing() {
        let mut rig = Rig::new(Vec2::ZERO, Vec2::X, vec![]);
        rig.machine().initialize();
        rig.machine().change_state(GuardState::ReturningToSpawn);
        rig.facing = Facing::new(Vec2::Y);

        rig.arrive();
        let transitions = tick(&mut rig, None, 0.0);
        assert_eq!(
            transitions,
            vec![GuardTransition {
                from: GuardState::ReturningToSpawn,
                to: GuardState::Rotating
            }]
        );
        assert!(matches!(rig.brain.routine, Routine::Rotate { .. }));

        let mut ticks = 0;
        while rig.state == GuardState::Rotating && ticks < 200 {
            tick(&mut rig, None, 0.0);
            ticks += 1;
        }
        assert_eq!(rig.state, GuardState::Patrolling);
        assert!((rig.facing.0 - Vec2::X).length() < 1e-3);
        assert_eq!(rig.command, MovementCommand::Stop);
    }
}
