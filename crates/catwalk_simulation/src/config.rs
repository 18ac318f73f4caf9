//! Simulation configuration (TOML → `SimulationConfig` resource).
//!
//! Every section is `#[serde(default)]`, so a file only needs the values it
//! overrides:
//!
//! ```toml
//! [guard]
//! chase_speed = 5.0
//! max_search_points = 6
//!
//! [abilities]
//! call_cooldown = 2.0
//! ```

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abilities::{AbilityConfig, HairballConfig};
use crate::ai::GuardConfig;
use crate::session::SessionConfig;
use crate::surveillance::SecurityCameraConfig;
use crate::vision::VisionConeConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// All tunables of the simulation in one place.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub guard: GuardConfig,
    pub vision: VisionConeConfig,
    pub abilities: AbilityConfig,
    pub hairball: HairballConfig,
    pub camera: SecurityCameraConfig,
    pub session: SessionConfig,
}

impl SimulationConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let guard = &self.guard;
        non_negative("guard.patrol_speed", guard.patrol_speed)?;
        non_negative("guard.chase_speed", guard.chase_speed)?;
        non_negative("guard.investigate_speed", guard.investigate_speed)?;
        non_negative("guard.wait_at_point", guard.wait_at_point)?;
        non_negative("guard.max_chase_time", guard.max_chase_time)?;
        non_negative("guard.search_radius", guard.search_radius)?;
        non_negative("guard.prediction_time", guard.prediction_time)?;
        positive("guard.destination_threshold", guard.destination_threshold)?;
        positive("guard.look_around_interval", guard.look_around_interval)?;
        at_least_one("guard.history_capacity", guard.history_capacity)?;
        at_least_one("guard.max_search_points", guard.max_search_points)?;
        non_negative("guard.vision_range", guard.vision_range)?;
        if !(0.0..=360.0).contains(&guard.vision_angle) {
            return Err(invalid("guard.vision_angle", "must be within 0..=360 degrees"));
        }

        at_least_one("vision.resolution", self.vision.resolution)?;

        let abilities = &self.abilities;
        non_negative("abilities.min_call_radius", abilities.min_call_radius)?;
        if abilities.min_call_radius > abilities.max_call_radius {
            return Err(invalid(
                "abilities.max_call_radius",
                "must not be smaller than min_call_radius",
            ));
        }
        positive("abilities.call_charge_time", abilities.call_charge_time)?;
        at_least_one("abilities.max_active_hairballs", abilities.max_active_hairballs)?;

        non_negative("hairball.lifetime", self.hairball.lifetime)?;
        non_negative("hairball.stun_radius", self.hairball.stun_radius)?;
        non_negative("hairball.stun_duration", self.hairball.stun_duration)?;

        non_negative("camera.detection_delay", self.camera.detection_delay)?;
        non_negative("camera.alert_radius", self.camera.alert_radius)?;

        if self.session.lives == 0 {
            return Err(invalid("session.lives", "must be at least 1"));
        }
        non_negative("session.arrest_cooldown", self.session.arrest_cooldown)?;
        non_negative("session.reset_delay", self.session.reset_delay)?;

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected a finite value >= 0, got {}", value)))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected a finite value > 0, got {}", value)))
    }
}

fn at_least_one(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(invalid(field, "must be at least 1"))
    }
}
