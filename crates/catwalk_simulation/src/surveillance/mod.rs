//! Security cameras: sweeping vision sensors that report the player to guards.
//!
//! A camera sweeps between `heading ± arc/2`, pausing at both ends. A player
//! visible for `detection_delay` seconds of one continuous sighting raises a
//! single alert: the nearest available guard within `alert_radius` gets a
//! `CameraAlert`, and with `arrest_immediately` the player is arrested.
//!
//! `disable` switches a camera off, either for good or for a number of
//! seconds counted down by `update_security_cameras`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::{CameraAlert, GuardBrain, PlayerArrested};
use crate::components::{Facing, Guard, Player};
use crate::physics::ObstacleWorld;
use crate::vision::{VisionCone, VisionSensor};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityCameraConfig {
    pub vision_range: f32,
    /// Full field of view (degrees)
    pub vision_angle: f32,
    /// Degrees per second
    pub sweep_speed: f32,
    /// Total sweep (degrees), centred on the initial heading
    pub sweep_arc: f32,
    pub pause_at_ends: f32,
    pub detection_delay: f32,
    pub alert_radius: f32,
    pub arrest_immediately: bool,
}

impl Default for SecurityCameraConfig {
    fn default() -> Self {
        Self {
            vision_range: 6.0,
            vision_angle: 60.0,
            sweep_speed: 30.0,
            sweep_arc: 90.0,
            pause_at_ends: 1.0,
            detection_delay: 0.5,
            alert_radius: 20.0,
            arrest_immediately: false,
        }
    }
}

/// Sweep + detection state of one camera. Angles in degrees.
#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform, Facing, VisionSensor, VisionCone)]
pub struct SecurityCamera {
    pub config: SecurityCameraConfig,
    pub base_angle: f32,
    pub current_angle: f32,
    pub sweeping: bool,
    /// Sweep direction: true = counter-clockwise (increasing angle)
    pub increasing: bool,
    pub pause_left: f32,
    pub detecting: bool,
    pub detection_time: f32,
    /// Alert already fired for the current sighting
    pub alerted: bool,
    pub active: bool,
    /// Seconds until a timed disable ends; None while active or off for good
    pub disabled_left: Option<f32>,
}

impl SecurityCamera {
    pub fn new(config: SecurityCameraConfig, heading: Vec2) -> Self {
        let base_angle = heading.try_normalize().unwrap_or(Vec2::X).to_angle().to_degrees();
        Self {
            config,
            base_angle,
            current_angle: base_angle,
            sweeping: true,
            increasing: true,
            pause_left: 0.0,
            detecting: false,
            detection_time: 0.0,
            alerted: false,
            active: true,
            disabled_left: None,
        }
    }

    /// Fixed camera (no sweep).
    pub fn fixed(config: SecurityCameraConfig, heading: Vec2) -> Self {
        Self {
            sweeping: false,
            ..Self::new(config, heading)
        }
    }

    pub fn heading(&self) -> Vec2 {
        Vec2::from_angle(self.current_angle.to_radians())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_left > 0.0
    }

    /// Advances the sweep by `dt`. Reaching an end clamps, pauses, and
    /// flips the direction when the pause runs out.
    pub fn sweep(&mut self, dt: f32) {
        if !self.sweeping {
            return;
        }
        if self.is_paused() {
            self.pause_left -= dt;
            if self.pause_left <= 0.0 {
                self.pause_left = 0.0;
                self.increasing = !self.increasing;
            }
            return;
        }

        let half = self.config.sweep_arc * 0.5;
        let sign = if self.increasing { 1.0 } else { -1.0 };
        let mut angle = self.current_angle + self.config.sweep_speed * sign * dt;

        if self.increasing && angle >= self.base_angle + half {
            angle = self.base_angle + half;
            self.start_pause();
        } else if !self.increasing && angle <= self.base_angle - half {
            angle = self.base_angle - half;
            self.start_pause();
        }
        self.current_angle = angle;
    }

    fn start_pause(&mut self) {
        self.pause_left = self.config.pause_at_ends;
        if self.pause_left <= 0.0 {
            self.increasing = !self.increasing;
        }
    }

    /// Switches the camera off and forgets the current sighting.
    /// `Some(seconds)` re-enables it after that long; `None` (or a
    /// non-positive duration) keeps it off until `enable`.
    pub fn disable(&mut self, duration: Option<f32>) {
        self.active = false;
        self.disabled_left = duration.filter(|seconds| *seconds > 0.0);
        self.detecting = false;
        self.detection_time = 0.0;
        self.alerted = false;
    }

    pub fn enable(&mut self) {
        self.active = true;
        self.disabled_left = None;
    }

    /// Counts a timed disable down. Returns true on the tick the camera
    /// comes back.
    fn tick_disabled(&mut self, dt: f32) -> bool {
        let Some(left) = self.disabled_left else {
            return false;
        };
        let left = left - dt;
        if left > 0.0 {
            self.disabled_left = Some(left);
            return false;
        }
        self.enable();
        true
    }

    /// Feeds one tick of sensor output. Returns true on the tick the alert fires.
    pub fn detect(&mut self, visible: bool, dt: f32) -> bool {
        if !visible {
            self.detecting = false;
            self.detection_time = 0.0;
            self.alerted = false;
            return false;
        }

        if !self.detecting {
            self.detecting = true;
            self.detection_time = 0.0;
        }
        self.detection_time += dt;

        if self.detection_time >= self.config.detection_delay && !self.alerted {
            self.alerted = true;
            return true;
        }
        false
    }

    /// 0..1 progress of the current sighting towards the alert.
    pub fn detection_progress(&self) -> f32 {
        if !self.detecting {
            return 0.0;
        }
        if self.config.detection_delay <= 0.0 {
            return 1.0;
        }
        (self.detection_time / self.config.detection_delay).min(1.0)
    }
}

/// Surveillance Plugin
///
/// Cameras run in `SimulationSet::Hazards` so the alerted guard reacts in
/// the same tick.
pub struct SurveillancePlugin;

impl Plugin for SurveillancePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_security_cameras.in_set(crate::SimulationSet::Hazards),
        );
    }
}

/// System: sweep, detect, alert
pub fn update_security_cameras(
    mut cameras: Query<(Entity, &Transform, &mut Facing, &VisionSensor, &mut SecurityCamera), Without<Guard>>,
    players: Query<&Transform, (With<Player>, Without<SecurityCamera>)>,
    guards: Query<(Entity, &Transform, &GuardBrain), With<Guard>>,
    obstacles: Res<ObstacleWorld>,
    time: Res<Time<Fixed>>,
    mut alerts: EventWriter<CameraAlert>,
    mut arrests: EventWriter<PlayerArrested>,
) {
    let dt = time.delta_secs();
    let player = players.iter().next().map(|transform| transform.translation.truncate());

    for (entity, transform, mut facing, sensor, mut camera) in cameras.iter_mut() {
        if !camera.active {
            if camera.tick_disabled(dt) {
                crate::log(&format!("Camera {:?} back online", entity));
            }
            continue;
        }

        camera.sweep(dt);
        facing.0 = camera.heading();

        let origin = transform.translation.truncate();
        let visible = player.is_some_and(|player| sensor.can_see(origin, facing.0, player, obstacles.query()));
        if !camera.detect(visible, dt) {
            continue;
        }
        let Some(player) = player else {
            continue;
        };

        crate::log_info(&format!("Camera {:?} detected the player at {:?}", entity, player));

        let nearest = guards
            .iter()
            .filter(|(_, _, brain)| !brain.is_stunned() && !brain.disabled)
            .map(|(guard, guard_transform, _)| (guard, guard_transform.translation.truncate().distance(origin)))
            .filter(|(_, distance)| *distance <= camera.config.alert_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((guard, distance)) => {
                crate::log(&format!("Camera {:?} alerting guard {:?} ({:.1}m)", entity, guard, distance));
                alerts.write(CameraAlert {
                    guard,
                    player_position: player,
                });
            }
            None => crate::log(&format!(
                "Camera {:?}: no guard available within {:.0}m",
                entity, camera.config.alert_radius
            )),
        }

        if camera.config.arrest_immediately {
            arrests.write(PlayerArrested { source: entity });
        }
    }
}
